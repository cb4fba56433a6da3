// src/analyzer/fetch.rs
// =============================================================================
// Loads the page that is being analyzed.
//
// Uses the same retry policy as link probing (max_retries attempts,
// exponential backoff) but, unlike a probe, a failure here is an error:
// without the page there is nothing to analyze.
// =============================================================================

use crate::config::ProbeConfig;
use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Fetches a web page and returns its HTML content
//
// Retries on transport errors and non-2xx statuses. Gives up immediately if
// reqwest cannot even build the request (bad scheme, no host) or if the run
// is cancelled.
pub async fn fetch_page(
    client: &Client,
    cancel: &CancellationToken,
    config: &ProbeConfig,
    page_url: &str,
) -> Result<String> {
    debug!(page_url, "Starting to load web page");

    let max_retries = config.max_retries();
    let mut last_error = anyhow!("no attempt was made");

    for attempt in 1..=max_retries {
        if cancel.is_cancelled() {
            bail!("loading {} was cancelled", page_url);
        }

        debug!(page_url, attempt, "Attempting to fetch page");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("loading {} was cancelled", page_url),
            result = fetch_once(client, page_url) => result,
        };

        match result {
            Ok(html) => {
                info!(page_url, attempt, bytes = html.len(), "Successfully fetched page");
                return Ok(html);
            }
            Err(e) if is_unbuildable(&e) => {
                error!(page_url, error = %e, "Could not build request for page");
                return Err(e.context(format!("invalid page URL '{}'", page_url)));
            }
            Err(e) => last_error = e,
        }

        if attempt < max_retries {
            let backoff = config.backoff_after(attempt);
            warn!(
                page_url,
                attempt,
                error = %last_error,
                backoff_ms = backoff.as_millis() as u64,
                "Fetch attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => bail!("loading {} was cancelled", page_url),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    error!(
        page_url,
        max_retries,
        last_error = %last_error,
        "Failed to fetch page after all attempts"
    );
    Err(last_error.context(format!(
        "failed to fetch {} after {} attempts",
        page_url, max_retries
    )))
}

async fn fetch_once(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP {}", response.status()));
    }

    let html = response.text().await?;
    Ok(html)
}

fn is_unbuildable(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_builder())
}
