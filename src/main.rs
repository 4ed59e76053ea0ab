// ████████╗ ██████╗ ██╗  ██╗███████╗███╗   ██╗
// ╚══██╔══╝██╔═══██╗██║ ██╔╝██╔════╝████╗  ██║
//    ██║   ██║   ██║█████╔╝ █████╗  ██╔██╗ ██║
//    ██║   ██║   ██║██╔═██╗ ██╔══╝  ██║╚██╗██║
//    ██║   ╚██████╔╝██║  ██╗███████╗██║ ╚████║
//    ╚═╝    ╚═════╝ ╚═╝  ╚═╝╚══════╝╚═╝  ╚═══╝
//
// S C A N   E N G I N E
//
// One token, three block explorers, one table.
// Etherscan + BscScan + PolygonScan, scraped and added up.

mod aggregator;
mod config;
mod error;
mod fetchers;
mod markup;
mod models;
mod parser;
mod report;
mod scanners;

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, OutputFormat};
use crate::error::ScanError;

fn print_banner() {
    let banner = r#"
    ╔══════════════════════════════════════════════════════════╗
    ║              T O K E N   S C A N   E N G I N E           ║
    ║                                                          ║
    ║   Explorers:  Etherscan | BscScan | PolygonScan          ║
    ║   Fetch:      static HTML or WebDriver-rendered          ║
    ╚══════════════════════════════════════════════════════════╝
    "#;
    // stdout is reserved for the report itself.
    eprintln!("{}", banner);
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(true).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_json);
    if !config.log_json {
        print_banner();
    }

    info!(
        strategy = %config.strategy,
        selection = ?config.selection,
        output = ?config.output,
        "Token scan engine initializing"
    );

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let network = e.downcast_ref::<ScanError>().and_then(ScanError::network);
            error!(network = ?network, error = %format!("{e:#}"), "Scan failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let report = scanners::run_cycle(config).await?;

    let rendered = match config.output {
        OutputFormat::Text => report::render_text(&report, &config.networks, config.selection)?,
        OutputFormat::Json => report::render_json(&report)?,
    };
    println!("{rendered}");
    Ok(())
}
