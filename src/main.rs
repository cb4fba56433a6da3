// src/main.rs
// =============================================================================
// Entry point of the web-analyzer CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and the shared cancellation token (Ctrl-C cancels it)
// 3. Dispatch to the subcommand handler
// 4. Exit with proper code (0 = all links reachable, 1 = inaccessible links,
//    2 = error)
// =============================================================================

mod analyzer; // src/analyzer/ - page fetching and HTML inspection
mod checker; // src/checker/ - link probing and the worker pool
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - retry/timeout/worker settings
mod logging; // src/logging.rs - tracing subscriber setup

use analyzer::AnalysisResult;
use anyhow::Result;
use checker::{FailureSet, LinkSet, Validator};
use clap::Parser;
use cli::{Cli, Commands};
use config::ProbeConfig;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.log_json)?;
    let config = cli.probe.to_config()?;

    // One token for the whole run: every fetch, probe and backoff watches it
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Analyze { url, json } => handle_analyze(&config, &cancel, &url, json).await,
        Commands::Check { urls, json } => handle_check(&config, &cancel, urls, json).await,
    }
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling outstanding requests");
            cancel.cancel();
        }
    });
}

// Handles the 'analyze' subcommand
async fn handle_analyze(
    config: &ProbeConfig,
    cancel: &CancellationToken,
    url: &str,
    json: bool,
) -> Result<i32> {
    if !json {
        println!("🔍 Analyzing page: {}", url);
    }

    let client = config.build_client()?;
    let result = analyzer::analyze_page(&client, config, cancel, url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }

    Ok(exit_code(result.links.inaccessible_count))
}

// Handles the 'check' subcommand
async fn handle_check(
    config: &ProbeConfig,
    cancel: &CancellationToken,
    urls: Vec<String>,
    json: bool,
) -> Result<i32> {
    let links = LinkSet::new(urls, Vec::new());

    if !json {
        println!("🌐 Checking {} link(s)...\n", links.len());
    }

    let validator = Validator::from_config(config)?;
    let failures = validator.validate(cancel, &links).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&failures)?);
    } else {
        print_failures(&failures, links.len());
    }

    Ok(exit_code(failures.len()))
}

fn exit_code(inaccessible: usize) -> i32 {
    if inaccessible > 0 {
        1 // Exit code 1 = inaccessible links found
    } else {
        0
    }
}

// Prints the analysis as a human-readable table
fn print_report(result: &AnalysisResult) {
    println!();
    println!("{:<22} {}", "URL", result.url);
    println!("{}", "=".repeat(80));
    println!("{:<22} {}", "HTML version", result.html_version);
    println!("{:<22} {}", "Title", result.title);
    println!("{:<22} {}", "Headings", format_headings(&result.headings));
    println!("{:<22} {}", "Internal links", result.links.internal_count);
    println!("{:<22} {}", "External links", result.links.external_count);
    println!("{:<22} {}", "Inaccessible links", result.links.inaccessible_count);
    if result.links.unchecked_count > 0 {
        println!("{:<22} {}", "Unchecked links", result.links.unchecked_count);
    }
    if result.links.invalid_hrefs > 0 {
        println!("{:<22} {}", "Invalid hrefs", result.links.invalid_hrefs);
    }
    println!(
        "{:<22} {}",
        "Login form",
        if result.contains_login_form { "yes" } else { "no" }
    );
    if result.is_degraded() {
        println!("{:<22} {}", "⚠️  Incomplete facets", result.degraded.join(", "));
    }

    if !result.links.inaccessible.is_empty() {
        println!();
        println!("❌ Inaccessible:");
        for url in &result.links.inaccessible {
            println!("   {}", url);
        }
    }
}

fn print_failures(failures: &FailureSet, total: usize) {
    for url in &failures.urls {
        println!("❌ {}", url);
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Accessible: {}", failures.checked - failures.len());
    println!("   ❌ Inaccessible: {}", failures.len());
    if failures.checked < total {
        println!("   ❔ Unchecked: {}", total - failures.checked);
    }
    println!("   📋 Total: {}", total);
}

// "h1: 1, h2: 3" - or "none"
fn format_headings(headings: &BTreeMap<String, usize>) -> String {
    if headings.is_empty() {
        return "none".to_string();
    }

    headings
        .iter()
        .map(|(tag, count)| format!("{}: {}", tag, count))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(0), 0);
        assert_eq!(exit_code(3), 1);
    }

    #[test]
    fn test_format_headings() {
        let mut headings = BTreeMap::new();
        assert_eq!(format_headings(&headings), "none");

        headings.insert("h2".to_string(), 3);
        headings.insert("h1".to_string(), 1);
        assert_eq!(format_headings(&headings), "h1: 1, h2: 3");
    }
}
