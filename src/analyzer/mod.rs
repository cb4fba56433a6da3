// src/analyzer/mod.rs
// =============================================================================
// Page analysis: fetch one page and report what it is made of.
//
// Submodules:
// - fetch: loads the page with retries
// - html: doctype, title, headings, link extraction
// - login: login-form heuristic
//
// analyze_page ties them together with the link validator. Loading the page
// is the only hard requirement. Every other facet is best effort: if one
// fails, the report still comes back, with that facet's default value and
// its name listed in `degraded`.
// =============================================================================

mod fetch;
mod html;
mod login;

pub use fetch::fetch_page;
pub use html::{count_headings, extract_links, find_html_version, find_title, LinkAnalysis};
pub use login::detect_login_form;

use crate::checker::{FailureSet, Probe, Validator};
use crate::config::ProbeConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub internal_count: usize,
    pub external_count: usize,
    pub inaccessible_count: usize,
    /// Links that were never probed because the run was cancelled
    pub unchecked_count: usize,
    /// hrefs that could not be resolved against the page URL
    pub invalid_hrefs: usize,
    pub inaccessible: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub url: String,
    pub html_version: String,
    pub title: String,
    pub headings: BTreeMap<String, usize>,
    pub links: LinkSummary,
    pub contains_login_form: bool,
    /// Facets that failed and were reported with empty values
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}

impl AnalysisResult {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

// Everything read out of the parsed document. scraper::Html is not Send,
// so the document never lives across an await.
struct PageFacets {
    html_version: String,
    title: String,
    headings: BTreeMap<String, usize>,
    links: LinkAnalysis,
    contains_login_form: bool,
}

/// Fetches `page_url`, inspects it, and checks every link on it.
pub async fn analyze_page(
    client: &Client,
    config: &ProbeConfig,
    cancel: &CancellationToken,
    page_url: &str,
) -> Result<AnalysisResult> {
    debug!(page_url, "Starting page analysis");

    let base = Url::parse(page_url).with_context(|| format!("Invalid URL '{}'", page_url))?;

    let body = fetch_page(client, cancel, config, page_url)
        .await
        .context("failed to load web page")?;

    let mut degraded = Vec::new();
    let facets = inspect_document(&body, &base, &mut degraded);

    let validator = Validator::new(
        Probe::new(client.clone(), config.clone()),
        config.max_workers(),
    );
    let link_set = facets.links.to_link_set();
    let (failures, unchecked_count) = match validator.validate(cancel, &link_set).await {
        Ok(failures) => {
            let unchecked = link_set.len() - failures.checked;
            (failures, unchecked)
        }
        Err(e) => {
            warn!(facet = "link_validation", error = %e, "Page analysis facet failed");
            degraded.push("link_validation".to_string());
            (FailureSet::default(), 0)
        }
    };

    let result = AnalysisResult {
        url: page_url.to_string(),
        html_version: facets.html_version,
        title: facets.title,
        headings: facets.headings,
        links: LinkSummary {
            internal_count: facets.links.internal.len(),
            external_count: facets.links.external.len(),
            inaccessible_count: failures.len(),
            unchecked_count,
            invalid_hrefs: facets.links.invalid_hrefs,
            inaccessible: failures.urls,
        },
        contains_login_form: facets.contains_login_form,
        degraded,
    };

    info!(
        html_version = %result.html_version,
        title = %result.title,
        internal_links = result.links.internal_count,
        external_links = result.links.external_count,
        inaccessible_links = result.links.inaccessible_count,
        has_login_form = result.contains_login_form,
        degraded = ?result.degraded,
        "Page analysis complete"
    );

    Ok(result)
}

fn inspect_document(body: &str, base: &Url, degraded: &mut Vec<String>) -> PageFacets {
    let document = Html::parse_document(body);
    debug!("Beginning individual analyses");

    PageFacets {
        html_version: facet("html_version", find_html_version(&document), degraded),
        title: facet("title", find_title(&document), degraded),
        headings: facet("headings", count_headings(&document), degraded),
        links: facet("links", extract_links(&document, base), degraded),
        contains_login_form: facet("login_form", detect_login_form(&document), degraded),
    }
}

// Unwraps a facet result, falling back to the empty value and recording
// the facet as degraded
fn facet<T: Default>(name: &str, result: Result<T>, degraded: &mut Vec<String>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(facet = name, error = %e, "Page analysis facet failed");
            degraded.push(name.to_string());
            T::default()
        }
    }
}
