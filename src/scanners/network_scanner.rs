// =============================================================================
// scanners/network_scanner.rs — ONE SCANNER, THREE EXPLORERS
// =============================================================================
//
// Etherscan, BscScan and PolygonScan are the same website wearing three
// different logos. One scanner handles all of them; the only things that
// change per network live in its NetworkConfig.
//
// Per network:
//   1. open the page
//   2. holders fragment      -> holder count
//   3. price fragment        -> USD price, delta
//      button labels         -> market cap
//   4. build the record, derived fields included
//
// First error wins. No partial record, no retry, no default values.
// =============================================================================

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::ScanError;
use crate::fetchers::{PageFetcher, TokenPage};
use crate::models::{Network, NetworkStatistics};
use crate::parser;

pub struct NetworkScanner<'a, F: PageFetcher> {
    fetcher: &'a F,
    eur_rate: Decimal,
}

impl<'a, F: PageFetcher> NetworkScanner<'a, F> {
    pub fn new(fetcher: &'a F, eur_rate: Decimal) -> Self {
        Self { fetcher, eur_rate }
    }

    /// Scrape one network into a complete record.
    pub async fn scan(&self, network: &NetworkConfig) -> Result<NetworkStatistics, ScanError> {
        let net = network.network;
        let page = self.fetcher.open(network).await?;

        let holders_text = page.fetch_holder_fragment().await?;
        let holders = parser::parse_holder_count(&holders_text)
            .map_err(|e| ScanError::malformed(net, e))?;
        debug!(network = net.key(), holders, "Holder count read");

        let price_text = page.fetch_price_fragment().await?;
        let (price_usd, price_delta) = parser::parse_price_and_delta(&price_text)
            .map_err(|e| ScanError::malformed(net, e))?;

        let labels = page.fetch_market_cap_labels().await?;
        let market_cap_f =
            parser::parse_market_cap(&labels).map_err(|e| ScanError::malformed(net, e))?;

        let stats = NetworkStatistics::new(
            net,
            price_usd,
            price_delta,
            market_cap_f,
            holders,
            self.eur_rate,
        )
        .with_holders(holders);

        info!(
            network = net.key(),
            price_usd = %stats.price_usd(),
            price_delta = stats.price_delta(),
            market_cap = stats.market_cap(),
            holders = stats.holders(),
            "Network scanned"
        );
        Ok(stats)
    }
}

/// Scan every configured network in order. Stops at the first failure.
pub async fn scan_all<F: PageFetcher>(
    fetcher: &F,
    networks: &[NetworkConfig],
    eur_rate: Decimal,
) -> Result<BTreeMap<Network, NetworkStatistics>, ScanError> {
    let scanner = NetworkScanner::new(fetcher, eur_rate);
    let mut records = BTreeMap::new();
    for network in networks {
        let stats = scanner.scan(network).await?;
        records.insert(network.network, stats);
    }
    Ok(records)
}
