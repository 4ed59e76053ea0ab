// =============================================================================
// fetchers/mod.rs — TWO WAYS TO GET A PAGE, ONE WAY TO READ IT
// =============================================================================
//
// A scan needs three strings from an explorer page: the holders line, the
// price line, and the labels of the page's buttons. How the page got here is
// somebody else's problem:
//
//   static    one HTTP GET per network, HTML walked in-process
//   rendered  a real browser over WebDriver, elements queried live
//
// Both hand back text in document order. Everything positional downstream
// depends on that order, so neither strategy is allowed to reorder.
// =============================================================================

pub mod rendered_fetcher;
pub mod static_fetcher;
pub mod webdriver;

use async_trait::async_trait;

use crate::config::NetworkConfig;
use crate::error::ScanError;

pub use rendered_fetcher::RenderedFetcher;
pub use static_fetcher::StaticFetcher;
pub use webdriver::WebDriverSession;

/// Opens one network's token page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Page: TokenPage;

    async fn open(&self, network: &NetworkConfig) -> Result<Self::Page, ScanError>;
}

/// A loaded token page. Lookups that find nothing are `FetchFailed`.
#[async_trait]
pub trait TokenPage: Send + Sync {
    /// Text of the holders element, e.g. `"1,234,567 addresses"`.
    async fn fetch_holder_fragment(&self) -> Result<String, ScanError>;

    /// The price line, e.g. `"$0.0832 @ 0.000041 Eth (+4.21%)"`.
    async fn fetch_price_fragment(&self) -> Result<String, ScanError>;

    /// Text of every button on the page, in document order.
    async fn fetch_market_cap_labels(&self) -> Result<Vec<String>, ScanError>;
}
