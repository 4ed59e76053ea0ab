// =============================================================================
// aggregator.rs — ADDING UP THREE EXPLORERS
// =============================================================================
//
// All three networks or nothing. A total market cap with a network silently
// missing is a smaller number that looks exactly like a real one, so a
// missing record fails the whole combine. Same for a sum that no longer fits:
// the network that pushed it over is reported instead of wrapping or panicking.
// =============================================================================

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::{Field, FragmentError, ScanError};
use crate::models::{format_millions, CombinedSummary, Network, NetworkStatistics, SummaryRow};

/// Roll the three per-network records into one table plus totals.
/// Rows come out in [`Network::ALL`] order regardless of map order.
pub fn combine(
    records: &BTreeMap<Network, NetworkStatistics>,
) -> Result<CombinedSummary, ScanError> {
    let missing: Vec<Network> = Network::ALL
        .iter()
        .copied()
        .filter(|n| !records.contains_key(n))
        .collect();
    if !missing.is_empty() {
        return Err(ScanError::IncompleteInput {
            missing_networks: missing,
        });
    }

    let rows: Vec<SummaryRow> = Network::ALL
        .iter()
        .filter_map(|n| records.get(n))
        .map(|stats| SummaryRow {
            network: stats.network(),
            price: stats.price_usd(),
            market_cap_f: stats.market_cap_f(),
            holders: stats.holders(),
        })
        .collect();

    let total_market_cap = rows.iter().try_fold(Decimal::ZERO, |acc, r| {
        acc.checked_add(r.market_cap_f)
            .ok_or_else(|| overflow(r.network, Field::MarketCap, r.market_cap_f))
    })?;
    let total_holders = rows.iter().try_fold(0u64, |acc, r| {
        acc.checked_add(r.holders)
            .ok_or_else(|| overflow(r.network, Field::Holders, r.holders))
    })?;

    Ok(CombinedSummary {
        total_market_cap_display: format_millions(total_market_cap),
        total_market_cap,
        total_holders,
        rows,
    })
}

fn overflow(network: Network, field: Field, value: impl ToString) -> ScanError {
    ScanError::malformed(network, FragmentError::new(field, value.to_string()))
}
