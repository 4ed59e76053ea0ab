// =============================================================================
// config.rs — KNOBS, DIALS, AND THREE HARDCODED TOKEN PAGES
// =============================================================================
//
// Every value here can be overridden from the environment (prefix
// TOKEN_SCAN_), and a `.env` file is picked up if one is lying around.
// Numbers that fail to parse quietly fall back to their defaults. Things that
// would make the scan meaningless (an unknown strategy, a URL that is not a
// URL) are refused at start-up instead.
//
// The three explorer pages are constants in spirit: one token, three chains,
// one contract address per chain. The env overrides exist for mirrors and for
// pointing a scan at a local fixture server.
// =============================================================================

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use url::Url;

use crate::models::{Network, EUR_RATE};

const ETHERSCAN_URL: &str = "https://etherscan.io/token/0x6b4c7a5e3f0b99fcd83e9c089bddd6c7fce5c611";
const BSCSCAN_URL: &str = "https://bscscan.com/token/0xbf05279f9bf1ce69bbfed670813b7e431142afa4";
const POLYGONSCAN_URL: &str =
    "https://polygonscan.com/token/0x5647Fe4281F8F6F01E84BCE775AD4b828A7b8927";

const ETHEREUM_CHART_URL: &str =
    "https://www.defined.fi/eth/0x24dbedb4699eb996a8ceb2baef4a4ae057cf0294?cache=1c067";
const BSC_CHART_URL: &str =
    "https://www.defined.fi/bsc/0x7cb5e7048215f7c225a8248b4c33fd32ca579c75?cache=6ad2c";

/// How explorer pages are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Plain HTTP GET of the server-rendered HTML.
    Static,
    /// A real browser driven over the WebDriver protocol.
    Rendered,
}

impl FromStr for FetchStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "http" => Ok(FetchStrategy::Static),
            "rendered" | "browser" | "webdriver" => Ok(FetchStrategy::Rendered),
            other => bail!("unknown fetch strategy '{other}' (expected 'static' or 'rendered')"),
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Static => write!(f, "static"),
            FetchStrategy::Rendered => write!(f, "rendered"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Which per-network panels the report shows. The combined table is always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSelection {
    All,
    One(Network),
}

impl NetworkSelection {
    pub fn includes(&self, network: Network) -> bool {
        match self {
            NetworkSelection::All => true,
            NetworkSelection::One(n) => *n == network,
        }
    }
}

/// Where one network's numbers live and how to find them on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub network: Network,
    /// The token's page on this network's explorer.
    pub url: Url,
    /// External price chart, shown next to the stats.
    pub chart_url: Option<String>,
    /// Class of the element whose first word is the holder count.
    pub holder_class: String,
    /// Class of the container whose 4th child is the price line (static pages).
    pub price_container_class: String,
    /// Class of the spans whose first is the price line (rendered pages).
    pub price_span_class: String,
}

impl NetworkConfig {
    /// Explorer defaults: all three explorers share one markup template.
    pub fn new(network: Network, url: Url, chart_url: Option<String>) -> Self {
        Self {
            network,
            url,
            chart_url,
            holder_class: "mr-3".to_string(),
            price_container_class: "col-6".to_string(),
            price_span_class: "d-block".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: FetchStrategy,

    /// WebDriver server (geckodriver, chromedriver, selenium) for the rendered strategy.
    pub webdriver_url: Url,
    pub headless: bool,

    /// Hard per-request timeout. Hitting it fails that network's scan.
    pub request_timeout: Duration,

    /// Explorers turn away the default client string, so we send our own.
    pub user_agent: String,

    pub eur_rate: Decimal,

    pub output: OutputFormat,
    pub selection: NetworkSelection,
    pub log_json: bool,

    /// In scan order.
    pub networks: Vec<NetworkConfig>,
}

impl Config {
    /// Load configuration from the environment (and `.env`), with defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let strategy: FetchStrategy = get("TOKEN_SCAN_STRATEGY", "static").parse()?;

        let webdriver_url = parse_url(
            "TOKEN_SCAN_WEBDRIVER_URL",
            &get("TOKEN_SCAN_WEBDRIVER_URL", "http://localhost:4444"),
        )?;

        let output = match get("TOKEN_SCAN_OUTPUT", "text").trim().to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        };

        let selection = match get("TOKEN_SCAN_NETWORK", "all").trim() {
            s if s.eq_ignore_ascii_case("all") || s.is_empty() => NetworkSelection::All,
            s => NetworkSelection::One(
                s.parse::<Network>()
                    .map_err(|e| anyhow!("TOKEN_SCAN_NETWORK: {e}"))?,
            ),
        };

        let networks = vec![
            NetworkConfig::new(
                Network::Ethereum,
                parse_url("TOKEN_SCAN_ETHERSCAN_URL", &get("TOKEN_SCAN_ETHERSCAN_URL", ETHERSCAN_URL))?,
                Some(ETHEREUM_CHART_URL.to_string()),
            ),
            NetworkConfig::new(
                Network::Bsc,
                parse_url("TOKEN_SCAN_BSCSCAN_URL", &get("TOKEN_SCAN_BSCSCAN_URL", BSCSCAN_URL))?,
                Some(BSC_CHART_URL.to_string()),
            ),
            NetworkConfig::new(
                Network::Polygon,
                parse_url(
                    "TOKEN_SCAN_POLYGONSCAN_URL",
                    &get("TOKEN_SCAN_POLYGONSCAN_URL", POLYGONSCAN_URL),
                )?,
                None,
            ),
        ];

        Ok(Config {
            strategy,
            webdriver_url,
            headless: parse_bool(&get("TOKEN_SCAN_HEADLESS", "true"), true),
            request_timeout: Duration::from_secs(
                get("TOKEN_SCAN_REQUEST_TIMEOUT_SECS", "20").parse().unwrap_or(20),
            ),
            user_agent: get("TOKEN_SCAN_USER_AGENT", "XYZ/3.0"),
            eur_rate: get("TOKEN_SCAN_EUR_RATE", "0.8843").parse().unwrap_or(EUR_RATE),
            output,
            selection,
            log_json: parse_bool(&get("TOKEN_SCAN_LOG_JSON", "false"), false),
            networks,
        })
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).with_context(|| format!("{key}: '{raw}' is not a valid URL"))
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
