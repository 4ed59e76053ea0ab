// =============================================================================
// models.rs — THE SHAPES EVERYONE ELSE IS ALLOWED TO DEPEND ON
// =============================================================================
//
// Two records leave the core: one `NetworkStatistics` per explorer, and one
// `CombinedSummary` across all three. The dashboard, the CLI, the JSON dump,
// all of them consume these and nothing else.
//
// The derived fields (EUR price, "$1.23M" label) are computed once, at
// construction, from the scraped numbers. There are no setters for the
// scraped numbers, so the derived fields cannot drift away from them.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// USD to EUR, as configured when the dashboard was first built.
pub const EUR_RATE: Decimal = Decimal::from_parts(8843, 0, 0, false, 4);

/// One blockchain whose explorer we scrape. There are exactly three.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// Etherscan. The primary chain.
    Ethereum,
    /// BscScan. EVM-compatible, cheaper gas, same markup.
    Bsc,
    /// PolygonScan. The sidechain.
    Polygon,
}

impl Network {
    /// Fixed scan and display order.
    pub const ALL: [Network; 3] = [Network::Ethereum, Network::Bsc, Network::Polygon];

    /// Short lowercase key used in config and JSON.
    pub fn key(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Bsc => "bsc",
            Network::Polygon => "polygon",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum",
            Network::Bsc => "Binance Smart Chain",
            Network::Polygon => "Polygon",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ethereum" | "eth" | "etherscan" => Ok(Network::Ethereum),
            "bsc" | "binance" | "binance smart chain" | "bscscan" => Ok(Network::Bsc),
            "polygon" | "poly" | "polygon network" | "polygonscan" => Ok(Network::Polygon),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

/// What one explorer says about the token right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkStatistics {
    network: Network,
    #[serde(with = "rust_decimal::serde::str")]
    price_usd: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    price_eur: Decimal,
    price_delta: String,
    #[serde(with = "rust_decimal::serde::str")]
    market_cap_f: Decimal,
    market_cap: String,
    holders: u64,
}

impl NetworkStatistics {
    /// Build a record from scraped values. `price_eur` and `market_cap` are
    /// derived here and nowhere else.
    pub fn new(
        network: Network,
        price_usd: Decimal,
        price_delta: String,
        market_cap_f: Decimal,
        holders: u64,
        eur_rate: Decimal,
    ) -> Self {
        Self {
            network,
            price_usd,
            price_eur: (price_usd * eur_rate).round_dp(2),
            price_delta,
            market_cap_f,
            market_cap: format_millions(market_cap_f),
            holders,
        }
    }

    /// Back-fill the holder count from the dedicated holders fetch.
    pub fn with_holders(mut self, holders: u64) -> Self {
        self.holders = holders;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn price_usd(&self) -> Decimal {
        self.price_usd
    }

    pub fn price_eur(&self) -> Decimal {
        self.price_eur
    }

    pub fn price_delta(&self) -> &str {
        &self.price_delta
    }

    pub fn market_cap_f(&self) -> Decimal {
        self.market_cap_f
    }

    pub fn market_cap(&self) -> &str {
        &self.market_cap
    }

    pub fn holders(&self) -> u64 {
        self.holders
    }
}

/// One line of the cross-network table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub network: Network,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub market_cap_f: Decimal,
    pub holders: u64,
}

/// All three networks, side by side, plus the sums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedSummary {
    pub rows: Vec<SummaryRow>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_market_cap: Decimal,
    pub total_market_cap_display: String,
    pub total_holders: u64,
}

/// Everything one scan cycle produced, stamped with when it finished.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scanned_at: DateTime<Utc>,
    pub strategy: String,
    /// In scan order.
    pub networks: Vec<NetworkStatistics>,
    pub summary: CombinedSummary,
}

/// `$<value / 1e6, 2 dp>M`. Trailing zeros go, but one fractional digit
/// always stays, so a round million prints as `$1.0M`. Rounding is half to
/// even on the exact decimal: `1015000` is `$1.02M`, not a float's `$1.01M`.
pub fn format_millions(value: Decimal) -> String {
    let millions = (value / Decimal::from(1_000_000)).round_dp(2).normalize();
    if millions.scale() == 0 {
        format!("${millions}.0M")
    } else {
        format!("${millions}M")
    }
}
