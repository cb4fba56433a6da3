// src/checker/probe.rs
// =============================================================================
// Decides whether ONE link is reachable.
//
// How it works:
// - Issue a GET for the URL (cancellable via the shared token)
// - 2xx = reachable, everything else (transport error, 3xx, 4xx, 5xx) = failed
// - On failure, wait initial_backoff * 2^(attempt-1) and try again
// - Give up after max_retries attempts and report the URL as inaccessible
//
// Malformed URLs and requests reqwest refuses to build (unsupported scheme,
// no host) are terminal on the first attempt - retrying cannot fix them.
// Cancellation is terminal from any stage: before an attempt, while the
// request is in flight, or during the backoff sleep.
// =============================================================================

use crate::config::ProbeConfig;
use reqwest::{Client, StatusCode, Url};
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    /// DNS failure, refused connection, TLS failure, timeout, redirect loop...
    #[error("transport error ({kind}): {source}")]
    Transport {
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered, but not with a 2xx status
    #[error("HTTP {0}")]
    Status(StatusCode),
}

// Result of one attempt against a URL
#[derive(Debug)]
pub enum ProbeOutcome {
    Reachable { status: StatusCode },
    Unreachable { cause: AttemptError, attempt: u32 },
}

// Final verdict for a URL after all attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Accessible,
    /// Holds the URL that could not be reached
    Inaccessible(String),
}

/// Anything that can decide whether a single URL is reachable.
///
/// The validator is generic over this so its worker pool can be exercised
/// without a network.
pub trait LinkProbe: Send + Sync + 'static {
    fn probe(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> impl Future<Output = ProbeResult> + Send;
}

/// Reachability check backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct Probe {
    client: Client,
    config: ProbeConfig,
}

impl LinkProbe for Probe {
    fn probe(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> impl Future<Output = ProbeResult> + Send {
        self.check(cancel, url)
    }
}

impl Probe {
    pub fn new(client: Client, config: ProbeConfig) -> Self {
        Self { client, config }
    }

    /// Runs the full retry loop for one URL.
    pub async fn check(&self, cancel: &CancellationToken, url: &str) -> ProbeResult {
        debug!(url, "Starting link check");

        let target = match Url::parse(url) {
            Ok(target) => target,
            Err(e) => {
                error!(url, attempt = 1, error = %e, "Could not build request for link");
                return ProbeResult::Inaccessible(url.to_string());
            }
        };

        let max_retries = self.config.max_retries();

        for attempt in 1..=max_retries {
            if cancel.is_cancelled() {
                warn!(url, attempt, "Link check cancelled before attempt");
                return ProbeResult::Inaccessible(url.to_string());
            }

            // The request races the token so a cancelled run does not wait
            // out the full request timeout
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(url, attempt, "Link check cancelled during request");
                    return ProbeResult::Inaccessible(url.to_string());
                }
                response = self.client.get(target.clone()).send() => response,
            };

            let outcome = match response {
                Ok(response) => classify_status(response.status(), attempt),
                Err(e) if e.is_builder() => {
                    // reqwest rejected the request itself; no attempt can succeed
                    error!(url, attempt, error = %e, "Could not build request for link");
                    return ProbeResult::Inaccessible(url.to_string());
                }
                Err(e) => ProbeOutcome::Unreachable {
                    cause: AttemptError::Transport {
                        kind: describe_transport_error(&e),
                        source: e,
                    },
                    attempt,
                },
            };

            match outcome {
                ProbeOutcome::Reachable { status } => {
                    info!(
                        url,
                        attempt,
                        status_code = status.as_u16(),
                        "Link is accessible"
                    );
                    return ProbeResult::Accessible;
                }
                ProbeOutcome::Unreachable { cause, attempt } => {
                    if attempt >= max_retries {
                        warn!(url, attempt, error = %cause, "Link check attempt failed");
                        break;
                    }

                    let backoff = self.config.backoff_after(attempt);
                    warn!(
                        url,
                        attempt,
                        error = %cause,
                        backoff_ms = backoff.as_millis() as u64,
                        "Link check attempt failed, retrying"
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            warn!(url, attempt, "Link check cancelled during backoff");
                            return ProbeResult::Inaccessible(url.to_string());
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        error!(url, max_retries, "Link is inaccessible after all retries");
        ProbeResult::Inaccessible(url.to_string())
    }
}

// Only 2xx counts. Redirects that reqwest did not follow (no Location,
// 304, ...) land here as failures too.
fn classify_status(status: StatusCode, attempt: u32) -> ProbeOutcome {
    if status.is_success() {
        ProbeOutcome::Reachable { status }
    } else {
        ProbeOutcome::Unreachable {
            cause: AttemptError::Status(status),
            attempt,
        }
    }
}

// Short label for a transport failure, used in log events.
// Every kind is retried the same way; this is only for humans.
fn describe_transport_error(error: &reqwest::Error) -> &'static str {
    let error_string = error.to_string().to_lowercase();

    if error.is_timeout() {
        "timeout"
    } else if error.is_redirect() {
        "too many redirects"
    } else if error.is_connect() {
        if error_string.contains("dns") {
            "dns"
        } else {
            "connect"
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "tls"
    } else {
        "other"
    }
}
