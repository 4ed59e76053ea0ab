// =============================================================================
// report.rs — THE DASHBOARD, MINUS THE DASH
// =============================================================================
//
// Presentation only. Takes a finished ScanReport and turns it into either a
// terminal-friendly dashboard or JSON. Nothing here parses, fetches or sums.
// =============================================================================

use std::fmt::{self, Write};

use crate::config::{NetworkConfig, NetworkSelection};
use crate::models::{NetworkStatistics, ScanReport};

/// Render the per-network panels picked by `selection`, then the combined table.
pub fn render_text(
    report: &ScanReport,
    networks: &[NetworkConfig],
    selection: NetworkSelection,
) -> Result<String, fmt::Error> {
    let mut out = String::new();

    for stats in report
        .networks
        .iter()
        .filter(|s| selection.includes(s.network()))
    {
        let chart = networks
            .iter()
            .find(|n| n.network == stats.network())
            .and_then(|n| n.chart_url.as_deref());
        render_network(&mut out, stats, chart)?;
        writeln!(out)?;
    }

    render_combined(&mut out, report)?;
    Ok(out)
}

pub fn render_json(report: &ScanReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn render_network(
    out: &mut impl Write,
    stats: &NetworkStatistics,
    chart_url: Option<&str>,
) -> fmt::Result {
    writeln!(out, "{} Statistics", stats.network())?;
    writeln!(
        out,
        "  {:<24}{:<16}{}\n  {:<24}{:<16}{}",
        "Price ($)",
        stats.price_usd().to_string(),
        stats.price_delta(),
        "Price (€)",
        stats.price_eur().to_string(),
        stats.price_delta()
    )?;
    writeln!(
        out,
        "  {:<24}{}\n  {:<24}{}",
        "Market Capitalization",
        stats.market_cap(),
        "Holders",
        stats.holders()
    )?;
    match chart_url {
        Some(url) => writeln!(out, "  To see the chart, visit {url}"),
        None => Ok(()),
    }
}

fn render_combined(out: &mut impl Write, report: &ScanReport) -> fmt::Result {
    let summary = &report.summary;
    writeln!(
        out,
        "All Networks\n  {:<22}{:>14}{:>26}{:>12}",
        "", "Price", "Market Capitalization", "Holders"
    )?;
    for row in &summary.rows {
        writeln!(
            out,
            "  {:<22}{:>14}{:>26}{:>12}",
            row.network.display_name(),
            row.price.to_string(),
            row.market_cap_f.to_string(),
            row.holders
        )?;
    }
    writeln!(
        out,
        "\n  {:<30}{}\n  {:<30}{}\n  scanned {} via {} fetch",
        "Total Market Capitalization",
        summary.total_market_cap_display,
        "Holders",
        summary.total_holders,
        report.scanned_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.strategy
    )
}
