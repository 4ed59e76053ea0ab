// =============================================================================
// fetchers/static_fetcher.rs — HTTP GET AND A HAND-ROLLED MARKUP WALK
// =============================================================================
//
// One request per network. The explorers serve the numbers we want in the
// initial HTML, so there is no need to run their JavaScript. They do reject
// obvious bots, hence the custom User-Agent, and they can be slow, hence the
// hard timeout. A timeout is a failed scan, not a retry.
// =============================================================================

use async_trait::async_trait;
use tracing::debug;

use crate::config::{Config, NetworkConfig};
use crate::error::ScanError;
use crate::fetchers::{PageFetcher, TokenPage};
use crate::markup;
use crate::models::Network;

/// Position of the price line among the price container's children.
const PRICE_CHILD_INDEX: usize = 3;

pub struct StaticFetcher {
    client: reqwest::Client,
}

impl StaticFetcher {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    type Page = StaticPage;

    async fn open(&self, network: &NetworkConfig) -> Result<StaticPage, ScanError> {
        let net = network.network;
        debug!(network = net.key(), url = %network.url, "Fetching token page");

        let response = self
            .client
            .get(network.url.clone())
            .send()
            .await
            .map_err(|e| ScanError::fetch_failed(net, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::fetch_failed(
                net,
                format!("{} answered HTTP {}", network.url, status),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScanError::fetch_failed(net, e))?;

        debug!(network = net.key(), bytes = html.len(), "Token page received");
        Ok(StaticPage::from_html(network, html))
    }
}

/// A token page as raw HTML.
#[derive(Debug, Clone)]
pub struct StaticPage {
    network: Network,
    holder_class: String,
    price_container_class: String,
    html: String,
}

impl StaticPage {
    pub fn from_html(network: &NetworkConfig, html: impl Into<String>) -> Self {
        Self {
            network: network.network,
            holder_class: network.holder_class.clone(),
            price_container_class: network.price_container_class.clone(),
            html: html.into(),
        }
    }

    fn missing(&self, what: impl std::fmt::Display) -> ScanError {
        ScanError::fetch_failed(self.network, what)
    }
}

#[async_trait]
impl TokenPage for StaticPage {
    async fn fetch_holder_fragment(&self) -> Result<String, ScanError> {
        markup::find_by_class(&self.html, Some("div"), &self.holder_class)
            .map(|el| el.text())
            .ok_or_else(|| self.missing(format!("no <div class=\"{}\"> on page", self.holder_class)))
    }

    async fn fetch_price_fragment(&self) -> Result<String, ScanError> {
        let container = markup::find_by_class(&self.html, Some("div"), &self.price_container_class)
            .ok_or_else(|| {
                self.missing(format!("no <div class=\"{}\"> on page", self.price_container_class))
            })?;

        let mut children = container.child_texts();
        if children.len() <= PRICE_CHILD_INDEX {
            return Err(self.missing(format!(
                "<div class=\"{}\"> has {} children, price line expected at index {}",
                self.price_container_class,
                children.len(),
                PRICE_CHILD_INDEX
            )));
        }
        Ok(children.swap_remove(PRICE_CHILD_INDEX))
    }

    async fn fetch_market_cap_labels(&self) -> Result<Vec<String>, ScanError> {
        Ok(markup::texts_of_tag(&self.html, "button"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const PAGE: &str = r#"<html><body>
<div class="card-body">
  <div class="row">
    <div class="col-6">
<h6 class="text-muted">Price</h6>
<span class="d-block">$0.0832 @ 0.000041 Eth (+4.21%)</span>
</div>
  </div>
  <div class="d-flex"><div class="mr-3"><i class="fa fa-user"></i> 1,234,567 addresses</div></div>
</div>
<button>Overview</button><button>Contract</button><button>$ 2,345,678.90</button>
</body></html>"#;

    fn network() -> NetworkConfig {
        NetworkConfig::new(
            Network::Bsc,
            Url::parse("https://bscscan.com/token/0xbf05").unwrap(),
            None,
        )
    }

    #[tokio::test]
    async fn test_holder_fragment() {
        let page = StaticPage::from_html(&network(), PAGE);
        let text = page.fetch_holder_fragment().await.unwrap();
        assert_eq!(text.trim(), "1,234,567 addresses");
    }

    #[tokio::test]
    async fn test_price_fragment_is_fourth_child() {
        let page = StaticPage::from_html(&network(), PAGE);
        let text = page.fetch_price_fragment().await.unwrap();
        assert_eq!(text, "$0.0832 @ 0.000041 Eth (+4.21%)");
    }

    #[tokio::test]
    async fn test_market_cap_labels() {
        let page = StaticPage::from_html(&network(), PAGE);
        let labels = page.fetch_market_cap_labels().await.unwrap();
        assert_eq!(labels, vec!["Overview", "Contract", "$ 2,345,678.90"]);
    }

    #[tokio::test]
    async fn test_missing_holder_element_is_fetch_failure() {
        let page = StaticPage::from_html(&network(), "<html><body>Just a moment...</body></html>");
        match page.fetch_holder_fragment().await {
            Err(ScanError::FetchFailed { network, cause }) => {
                assert_eq!(network, Network::Bsc);
                assert!(cause.contains("mr-3"));
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_short_price_container_is_fetch_failure() {
        let page = StaticPage::from_html(&network(), r#"<div class="col-6"><h6>Price</h6></div>"#);
        assert!(matches!(
            page.fetch_price_fragment().await,
            Err(ScanError::FetchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_custom_selectors() {
        let mut net = network();
        net.holder_class = "holders".into();
        let page = StaticPage::from_html(&net, r#"<div class="holders">77 addresses</div>"#);
        assert_eq!(page.fetch_holder_fragment().await.unwrap(), "77 addresses");
    }
}
