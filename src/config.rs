// src/config.rs
// =============================================================================
// Process-wide settings for fetching and probing.
//
// The constants below are the defaults. A ProbeConfig is built once at
// startup (from CLI flags) and handed to everything that makes requests.
// Nothing here is global: tests build their own ProbeConfig with tiny
// backoffs and timeouts.
// =============================================================================

use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;

/// How many attempts a probe makes before giving up on a URL
pub const MAX_RETRIES: u32 = 3;

/// Delay before the second attempt; doubles for each attempt after that
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Per-request timeout, independent of the backoff schedule
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on concurrently running probes
pub const MAX_WORKERS: usize = 10;

/// How many redirects the client follows before treating it as an error
pub const MAX_REDIRECTS: usize = 10;

// Settings shared by the page loader, every probe and the validator.
//
// Fields are private so the invariants (max_retries >= 1, max_workers >= 1)
// can only be established through ProbeConfig::new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    max_retries: u32,
    initial_backoff: Duration,
    request_timeout: Duration,
    max_workers: usize,
    max_redirects: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
            request_timeout: REQUEST_TIMEOUT,
            max_workers: MAX_WORKERS,
            max_redirects: MAX_REDIRECTS,
        }
    }
}

impl ProbeConfig {
    /// Builds a config, rejecting values that would make a probe or the
    /// worker pool do nothing at all.
    pub fn new(
        max_retries: u32,
        initial_backoff: Duration,
        request_timeout: Duration,
        max_workers: usize,
    ) -> Result<Self> {
        if max_retries == 0 {
            return Err(anyhow!("max retries must be at least 1"));
        }
        if max_workers == 0 {
            return Err(anyhow!("max workers must be at least 1"));
        }

        Ok(Self {
            max_retries,
            initial_backoff,
            request_timeout,
            max_workers,
            ..Self::default()
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    // Delay to wait after the given (1-based) failed attempt.
    //
    // attempt 1 -> initial_backoff, attempt 2 -> 2x, attempt 3 -> 4x, ...
    // Saturates instead of overflowing on absurd attempt counts.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff().saturating_mul(factor)
    }

    /// Builds the HTTP client shared (read-only) by every worker.
    ///
    /// reqwest::Client is reference counted internally, so cloning it into
    /// each worker shares one connection pool.
    pub fn build_client(&self) -> Result<Client> {
        let client = Client::builder()
            .timeout(self.request_timeout())
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects()))
            .build()?;
        Ok(client)
    }
}
