// =============================================================================
// error.rs — EVERYTHING THAT CAN GO WRONG BETWEEN US AND A BLOCK EXPLORER
// =============================================================================
//
// Three ways a scan cycle dies, and none of them are quiet:
//
//   FetchFailed        the explorer did not answer, answered late, or answered
//                      with a page that no longer has the element we want
//   MalformedFragment  we found the element but its text is not the shape we
//                      parse. A zero here would poison the totals downstream.
//   IncompleteInput    somebody asked for a cross-network total without all
//                      three networks
//
// Nothing in the core catches these. They go up to whoever asked.
// =============================================================================

use std::fmt;

use thiserror::Error;

use crate::models::Network;

/// Which value a parser was trying to pull out of the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Holders,
    PriceUsd,
    MarketCap,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Holders => write!(f, "holders"),
            Field::PriceUsd => write!(f, "price_usd"),
            Field::MarketCap => write!(f, "market_cap"),
        }
    }
}

/// Raised by the text parser. It does not know which network the text came
/// from; the scanner attaches that when it lifts this into a [`ScanError`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot read {field} from {raw_text:?}")]
pub struct FragmentError {
    pub field: Field,
    pub raw_text: String,
}

impl FragmentError {
    pub fn new(field: Field, raw_text: impl Into<String>) -> Self {
        Self {
            field,
            raw_text: raw_text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{network}: fetch failed: {cause}")]
    FetchFailed { network: Network, cause: String },

    #[error("{network}: malformed {field} fragment: {raw_text:?}")]
    MalformedFragment {
        network: Network,
        field: Field,
        raw_text: String,
    },

    #[error("cannot combine networks, missing: {}", join_networks(.missing_networks))]
    IncompleteInput { missing_networks: Vec<Network> },
}

impl ScanError {
    pub fn fetch_failed(network: Network, cause: impl fmt::Display) -> Self {
        ScanError::FetchFailed {
            network,
            cause: cause.to_string(),
        }
    }

    pub fn malformed(network: Network, err: FragmentError) -> Self {
        ScanError::MalformedFragment {
            network,
            field: err.field,
            raw_text: err.raw_text,
        }
    }

    /// The network this error belongs to, if it belongs to exactly one.
    pub fn network(&self) -> Option<Network> {
        match self {
            ScanError::FetchFailed { network, .. } => Some(*network),
            ScanError::MalformedFragment { network, .. } => Some(*network),
            ScanError::IncompleteInput { .. } => None,
        }
    }
}

fn join_networks(networks: &[Network]) -> String {
    networks
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
