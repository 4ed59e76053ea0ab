// =============================================================================
// scanners/mod.rs — ONE FULL SCAN CYCLE
// =============================================================================
//
// A cycle is: pick a fetch strategy, scan Ethereum, BSC and Polygon in that
// order, combine. Sequential on purpose: the rendered strategy drives a
// single browser tab, and three requests do not need a thread pool.
//
// The browser session (rendered strategy) is started here and quit here,
// whatever happened in between.
// =============================================================================

pub mod network_scanner;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use crate::aggregator;
use crate::config::{Config, FetchStrategy};
use crate::error::ScanError;
use crate::fetchers::{PageFetcher, RenderedFetcher, StaticFetcher, WebDriverSession};
use crate::models::ScanReport;

pub use network_scanner::scan_all;

/// Run one complete scan cycle with the configured strategy.
pub async fn run_cycle(config: &Config) -> anyhow::Result<ScanReport> {
    info!(
        strategy = %config.strategy,
        networks = config.networks.len(),
        timeout_secs = config.request_timeout.as_secs(),
        "Scan cycle starting"
    );

    match config.strategy {
        FetchStrategy::Static => {
            let fetcher = StaticFetcher::new(config).context("building HTTP client")?;
            Ok(cycle(&fetcher, config).await?)
        }
        FetchStrategy::Rendered => {
            // The WebDriver server sits next to the browser; talk to it directly.
            let client = reqwest::Client::builder()
                .timeout(config.request_timeout)
                .no_proxy()
                .build()
                .context("building WebDriver client")?;
            let session = WebDriverSession::start(client, &config.webdriver_url, config.headless)
                .await
                .with_context(|| format!("starting WebDriver session at {}", config.webdriver_url))?;

            let fetcher = RenderedFetcher::new(session.clone());
            let outcome = cycle(&fetcher, config).await;

            let id = session.id().to_string();
            if let Err(e) = session.quit().await {
                warn!(session = %id, error = %e, "Could not close WebDriver session");
            }
            Ok(outcome?)
        }
    }
}

/// Scan every configured network with `fetcher` and combine the results.
pub async fn cycle<F: PageFetcher>(fetcher: &F, config: &Config) -> Result<ScanReport, ScanError> {
    let records = scan_all(fetcher, &config.networks, config.eur_rate).await?;
    let summary = aggregator::combine(&records)?;

    info!(
        total_market_cap = %summary.total_market_cap_display,
        total_holders = summary.total_holders,
        "Scan cycle complete"
    );

    Ok(ScanReport {
        scanned_at: Utc::now(),
        strategy: config.strategy.to_string(),
        networks: records.into_values().collect(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::network_scanner::tests::{healthy_fetcher, networks, Canned, FakeFetcher};
    use super::*;
    use crate::error::Field;
    use crate::fetchers::rendered_fetcher::tests::{FakeDriver, SESSION};
    use crate::models::Network;
    use rust_decimal::Decimal;

    fn test_config() -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.networks = networks();
        config
    }

    #[tokio::test]
    async fn test_cycle_produces_records_and_summary() {
        let report = cycle(&healthy_fetcher(), &test_config()).await.unwrap();

        let order: Vec<Network> = report.networks.iter().map(|s| s.network()).collect();
        assert_eq!(order, Network::ALL.to_vec());
        assert_eq!(report.strategy, "static");
        assert_eq!(report.summary.total_market_cap, Decimal::from(1_000_000));
        assert_eq!(report.summary.total_market_cap_display, "$1.0M");
        assert_eq!(report.summary.total_holders, 1234 + 2000 + 30);
    }

    #[tokio::test]
    async fn test_cycle_fails_when_a_network_is_unconfigured() {
        let mut config = test_config();
        config.networks.retain(|n| n.network != Network::Polygon);
        let err = cycle(&healthy_fetcher(), &config).await.unwrap_err();
        assert!(matches!(err, ScanError::IncompleteInput { .. }));
    }

    #[tokio::test]
    async fn test_cycle_surfaces_malformed_market_cap() {
        let fetcher = healthy_fetcher().with(
            Network::Bsc,
            Canned::new("2,000 addresses", "$0.0830 @ 0.00021 BNB (-0.50%)", "$ N/A"),
        );
        let err = cycle(&fetcher, &test_config()).await.unwrap_err();
        assert_eq!(err.network(), Some(Network::Bsc));
        assert!(matches!(err, ScanError::MalformedFragment { .. }));
    }

    #[tokio::test]
    async fn test_cycle_with_no_pages_fails_on_first_network() {
        let err = cycle(&FakeFetcher::default(), &test_config()).await.unwrap_err();
        assert_eq!(err.network(), Some(Network::Ethereum));
    }

    fn rendered_config(driver: &FakeDriver) -> Config {
        let server = driver.url.to_string();
        Config::from_lookup(|key| match key {
            "TOKEN_SCAN_STRATEGY" => Some("rendered".to_string()),
            "TOKEN_SCAN_WEBDRIVER_URL" => Some(server.clone()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_rendered_cycle_quits_session_after_parse_failure() {
        let driver = FakeDriver::start("$N/A @ 0.1 Eth (+1%)").await;
        let err = run_cycle(&rendered_config(&driver)).await.unwrap_err();

        match err.downcast_ref::<ScanError>() {
            Some(ScanError::MalformedFragment { network, field, .. }) => {
                assert_eq!(*network, Network::Ethereum);
                assert_eq!(*field, Field::PriceUsd);
            }
            other => panic!("expected MalformedFragment, got {other:?}"),
        }
        let requests = driver.requests();
        assert_eq!(requests.last().unwrap(), &format!("DELETE /session/{SESSION}"));
    }

    #[tokio::test]
    async fn test_rendered_cycle_quits_session_after_success() {
        let driver = FakeDriver::start("$0.0832 @ 0.000041 Eth (+4.21%)").await;
        let report = run_cycle(&rendered_config(&driver)).await.unwrap();

        assert_eq!(report.strategy, "rendered");
        assert_eq!(report.summary.total_market_cap_display, "$1.5M");
        assert_eq!(report.summary.total_holders, 3 * 1234);

        let requests = driver.requests();
        let navigations = requests
            .iter()
            .filter(|r| *r == &format!("POST /session/{SESSION}/url"))
            .count();
        assert_eq!(navigations, 3);
        assert_eq!(requests.last().unwrap(), &format!("DELETE /session/{SESSION}"));
    }
}
