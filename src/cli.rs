// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
//   web-analyzer analyze https://example.com
//   web-analyzer check https://a.example https://b.example --json
//
// The probe tuning flags and logging flags are global, so they can be
// given before or after the subcommand.
// =============================================================================

use crate::config::{ProbeConfig, INITIAL_BACKOFF, MAX_RETRIES, MAX_WORKERS, REQUEST_TIMEOUT};
use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "web-analyzer",
    version,
    about = "Analyze a web page and find out which of its links are reachable",
    long_about = "web-analyzer fetches a page, reports its HTML version, title, headings, \
                  internal/external links and whether it has a login form, then checks \
                  every link concurrently (with retries) and lists the inaccessible ones."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub probe: ProbeArgs,

    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log events as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a page: structure, links, login form, and link accessibility
    ///
    /// Example: web-analyzer analyze https://example.com
    Analyze {
        /// URL of the page to analyze
        url: String,

        /// Output the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check whether the given URLs are reachable, without fetching a page
    ///
    /// Example: web-analyzer check https://example.com https://example.org
    Check {
        /// URLs to check (duplicates are checked once per occurrence)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Output the inaccessible URLs as JSON
        #[arg(long)]
        json: bool,
    },
}

// Flags that tune fetching and link probing
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Maximum number of links checked at the same time
    #[arg(long, default_value_t = MAX_WORKERS, global = true)]
    pub max_workers: usize,

    /// Attempts per link before it is reported inaccessible
    #[arg(long, default_value_t = MAX_RETRIES, global = true)]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds (doubles per retry)
    #[arg(long, default_value_t = INITIAL_BACKOFF.as_millis() as u64, global = true)]
    pub initial_backoff_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = REQUEST_TIMEOUT.as_secs(), global = true)]
    pub timeout_secs: u64,
}

impl ProbeArgs {
    pub fn to_config(&self) -> Result<ProbeConfig> {
        ProbeConfig::new(
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_secs(self.timeout_secs),
            self.max_workers,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_defaults() {
        let cli = Cli::try_parse_from(["web-analyzer", "analyze", "https://example.com"]).unwrap();

        match cli.command {
            Commands::Analyze { url, json } => {
                assert_eq!(url, "https://example.com");
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.probe.to_config().unwrap(), ProbeConfig::default());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "web-analyzer",
            "check",
            "https://a.test",
            "https://b.test",
            "--max-workers",
            "2",
            "--initial-backoff-ms",
            "250",
            "-vv",
        ])
        .unwrap();

        match &cli.command {
            Commands::Check { urls, json } => {
                assert_eq!(urls.len(), 2);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        let config = cli.probe.to_config().unwrap();
        assert_eq!(config.max_workers(), 2);
        assert_eq!(config.initial_backoff(), Duration::from_millis(250));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_check_requires_urls() {
        assert!(Cli::try_parse_from(["web-analyzer", "check"]).is_err());
    }

    #[test]
    fn test_zero_retries_rejected() {
        let cli = Cli::try_parse_from([
            "web-analyzer",
            "analyze",
            "https://example.com",
            "--max-retries",
            "0",
        ])
        .unwrap();
        assert!(cli.probe.to_config().is_err());
    }
}
