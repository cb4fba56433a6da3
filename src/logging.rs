// src/logging.rs
// =============================================================================
// Log output setup.
//
// Logs go to stderr so `--json` reports on stdout stay machine-readable.
// RUST_LOG, when set, wins over the -v flags:
//
//   RUST_LOG=web_analyzer=debug web-analyzer analyze https://example.com
// =============================================================================

use anyhow::{anyhow, Result};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Filter directives for each -v level
fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "warn,web_analyzer=info",
        2 => "info,web_analyzer=debug",
        _ => "debug,web_analyzer=trace",
    }
}

pub fn init_logging(verbose: u8, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    };

    result.map_err(|e| anyhow!("failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for verbose in 0..5 {
            assert!(EnvFilter::try_new(default_directives(verbose)).is_ok());
        }
    }

    #[test]
    fn test_more_verbose_enables_crate_debug() {
        assert!(default_directives(2).contains("web_analyzer=debug"));
        assert!(default_directives(7).contains("trace"));
    }
}
