// src/analyzer/html.rs
// =============================================================================
// Structural facts about a parsed HTML page.
//
// - find_html_version: classify the doctype (HTML5, XHTML 1.0, HTML 4.01...)
// - find_title: text of the <title> element
// - count_headings: how many h1..h6 elements the page has
// - extract_links: every <a href> resolved against the page URL, split into
//   internal (same host) and external links
//
// We use the `scraper` crate for parsing and CSS selectors, and the `url`
// crate to resolve relative links the way a browser does.
// =============================================================================

use crate::checker::LinkSet;
use anyhow::{anyhow, Result};
use scraper::{Html, Node, Selector};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use url::Url;

pub const HTML5: &str = "HTML5";
pub const XHTML_1_0: &str = "XHTML 1.0";
pub const HTML_4_01: &str = "HTML 4.01";
pub const UNKNOWN_PRE_HTML5: &str = "Unknown (Pre-HTML5)";
pub const UNKNOWN_OR_NO_DOCTYPE: &str = "Unknown or No Doctype";

const HEADING_LEVELS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

// Links found on a page, in document order, duplicates kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkAnalysis {
    pub internal: Vec<String>,
    pub external: Vec<String>,
    /// hrefs that could not be resolved to a URL
    pub invalid_hrefs: usize,
}

impl LinkAnalysis {
    pub fn to_link_set(&self) -> LinkSet {
        LinkSet::new(self.internal.clone(), self.external.clone())
    }
}

// Parses a CSS selector, turning a bad one into an error instead of a panic
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

/// Classifies the page's doctype.
///
/// `<!DOCTYPE html>` with no public or system identifier is HTML5. Anything
/// with a public identifier is matched on that identifier.
pub fn find_html_version(document: &Html) -> Result<String> {
    debug!("Starting to determine HTML version");

    let doctype = document.tree.root().children().find_map(|node| match node.value() {
        Node::Doctype(doctype) => Some(doctype),
        _ => None,
    });

    let version = match doctype {
        Some(doctype) => {
            debug!(name = doctype.name(), "Found doctype node");
            let public_id = doctype.public_id().to_lowercase();

            if !public_id.is_empty() {
                debug!(public_id = %public_id, "Found public identifier");
                if public_id.contains("xhtml 1.0") {
                    XHTML_1_0
                } else if public_id.contains("html 4.01") {
                    HTML_4_01
                } else {
                    UNKNOWN_PRE_HTML5
                }
            } else if doctype.name().eq_ignore_ascii_case("html") && doctype.system_id().is_empty()
            {
                HTML5
            } else {
                UNKNOWN_OR_NO_DOCTYPE
            }
        }
        None => UNKNOWN_OR_NO_DOCTYPE,
    };

    if version == UNKNOWN_OR_NO_DOCTYPE {
        warn!(result = version, "Could not determine HTML version");
    } else {
        info!(version, "Successfully determined HTML version");
    }

    Ok(version.to_string())
}

/// Text of the page's `<title>`, trimmed. Empty when there is none.
pub fn find_title(document: &Html) -> Result<String> {
    let title_selector = selector("title")?;
    let title: String = document
        .select(&title_selector)
        .flat_map(|element| element.text())
        .collect();
    Ok(title.trim().to_string())
}

/// Heading counts keyed by tag name; levels that never occur are left out.
pub fn count_headings(document: &Html) -> Result<BTreeMap<String, usize>> {
    debug!("Starting to count headings");

    let mut headings = BTreeMap::new();
    for tag in HEADING_LEVELS {
        let count = document.select(&selector(tag)?).count();
        if count > 0 {
            debug!(tag, count, "Found heading tag");
            headings.insert(tag.to_string(), count);
        }
    }

    info!(heading_counts = ?headings, "Successfully counted all headings");
    Ok(headings)
}

// Extracts all links from the page
//
// Parameters:
//   document: the parsed page
//   base: the URL of the page (for resolving relative links and deciding
//         internal vs external)
//
// Skips empty hrefs, in-page anchors (#...), mailto: and tel: links.
// Everything else is kept, including schemes we cannot probe: the
// validator reports those as inaccessible.
pub fn extract_links(document: &Html, base: &Url) -> Result<LinkAnalysis> {
    debug!(page = %base, "Starting to extract links");

    let anchor_selector = selector("a[href]")?;
    let mut analysis = LinkAnalysis::default();

    for element in document.select(&anchor_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if is_skippable(href) {
            debug!(href, "Skipping irrelevant link");
            continue;
        }

        // join() handles both absolute and relative hrefs
        let absolute = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn!(href, error = %e, "Failed to parse link href");
                analysis.invalid_hrefs += 1;
                continue;
            }
        };

        if is_same_host(base, &absolute) {
            debug!(link = %absolute, "Found internal link");
            analysis.internal.push(absolute.to_string());
        } else {
            debug!(link = %absolute, "Found external link");
            analysis.external.push(absolute.to_string());
        }
    }

    info!(
        internal_links_found = analysis.internal.len(),
        external_links_found = analysis.external.len(),
        parsing_errors = analysis.invalid_hrefs,
        "Finished extracting links"
    );

    Ok(analysis)
}

fn is_skippable(href: &str) -> bool {
    href.is_empty() || href.starts_with('#') || href.starts_with("mailto:") || href.starts_with("tel:")
}

// Same host and same (effective) port
fn is_same_host(base: &Url, link: &Url) -> bool {
    base.host_str().is_some()
        && base.host_str() == link.host_str()
        && base.port_or_known_default() == link.port_or_known_default()
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is document.tree?
//    - scraper keeps the parsed page as a tree of nodes (ego_tree)
//    - The doctype is not an element, so CSS selectors cannot find it;
//      we look at the root's children directly instead
//
// 2. What does base.join(href) do?
//    - Resolves href like a browser would
//    - "/docs" on https://example.com/page -> https://example.com/docs
//    - An absolute href replaces the base entirely
//
// 3. Why BTreeMap for headings?
//    - Keys come out sorted (h1, h2, ...), so output is stable
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn version_of(html: &str) -> String {
        find_html_version(&Html::parse_document(html)).unwrap()
    }

    fn links_of(html: &str, base: &str) -> LinkAnalysis {
        let base = Url::parse(base).unwrap();
        extract_links(&Html::parse_document(html), &base).unwrap()
    }

    #[test]
    fn test_html5_doctype() {
        assert_eq!(
            version_of("<!DOCTYPE html><html><head></head><body></body></html>"),
            HTML5
        );
    }

    #[test]
    fn test_xhtml_doctype() {
        let html = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd"><html></html>"#;
        assert_eq!(version_of(html), XHTML_1_0);
    }

    #[test]
    fn test_html401_doctype() {
        let html = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd"><html></html>"#;
        assert_eq!(version_of(html), HTML_4_01);
    }

    #[test]
    fn test_unknown_legacy_doctype() {
        let html = r#"<!DOCTYPE HTML PUBLIC "-//IETF//DTD HTML 2.0//EN"><html></html>"#;
        assert_eq!(version_of(html), UNKNOWN_PRE_HTML5);
    }

    #[test]
    fn test_missing_doctype() {
        assert_eq!(version_of("<html><body><h1>Hello</h1></body></html>"), UNKNOWN_OR_NO_DOCTYPE);
        assert_eq!(version_of(""), UNKNOWN_OR_NO_DOCTYPE);
    }

    #[test]
    fn test_title() {
        let document = Html::parse_document("<html><head><title> My Page </title></head></html>");
        assert_eq!(find_title(&document).unwrap(), "My Page");

        let untitled = Html::parse_document("<html><body></body></html>");
        assert_eq!(find_title(&untitled).unwrap(), "");
    }

    #[test]
    fn test_count_headings() {
        let document = Html::parse_document(
            "<h1>A</h1><h2>B</h2><h2>C</h2><h4>D</h4><div><h4>E</h4><h4>F</h4></div>",
        );
        let headings = count_headings(&document).unwrap();

        assert_eq!(headings.get("h1"), Some(&1));
        assert_eq!(headings.get("h2"), Some(&2));
        assert_eq!(headings.get("h4"), Some(&3));
        assert_eq!(headings.get("h3"), None);
        assert_eq!(headings.len(), 3);
    }

    #[test]
    fn test_count_headings_none() {
        let document = Html::parse_document("<p>no headings</p>");
        assert!(count_headings(&document).unwrap().is_empty());
    }

    #[test]
    fn test_internal_and_external_links() {
        let html = r#"
            <a href="/about">About</a>
            <a href="contact">Contact</a>
            <a href="https://example.com/blog">Blog</a>
            <a href="https://www.rust-lang.org">Rust</a>
        "#;
        let links = links_of(html, "https://example.com/home/");

        assert_eq!(
            links.internal,
            vec![
                "https://example.com/about",
                "https://example.com/home/contact",
                "https://example.com/blog"
            ]
        );
        assert_eq!(links.external, vec!["https://www.rust-lang.org/"]);
        assert_eq!(links.invalid_hrefs, 0);
    }

    #[test]
    fn test_skips_anchors_mail_and_phone() {
        let html = r##"
            <a href="">Empty</a>
            <a href="   ">Blank</a>
            <a href="#top">Top</a>
            <a href="mailto:test@example.com">Email</a>
            <a href="tel:+123456">Call</a>
            <a>No href</a>
        "##;
        let links = links_of(html, "https://example.com");
        assert!(links.internal.is_empty());
        assert!(links.external.is_empty());
    }

    #[test]
    fn test_different_port_is_external() {
        let html = r#"<a href="http://127.0.0.1:9999/x">Other service</a><a href="/y">Here</a>"#;
        let links = links_of(html, "http://127.0.0.1:8080/");
        assert_eq!(links.internal, vec!["http://127.0.0.1:8080/y"]);
        assert_eq!(links.external, vec!["http://127.0.0.1:9999/x"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let html = r#"<a href="/a">1</a><a href="/a">2</a>"#;
        let links = links_of(html, "https://example.com");
        assert_eq!(links.internal.len(), 2);
    }

    #[test]
    fn test_unresolvable_href_is_counted() {
        let html = r#"<a href="http://[::1">Broken</a><a href="/ok">Ok</a>"#;
        let links = links_of(html, "https://example.com");
        assert_eq!(links.invalid_hrefs, 1);
        assert_eq!(links.internal, vec!["https://example.com/ok"]);
    }

    #[test]
    fn test_to_link_set() {
        let analysis = LinkAnalysis {
            internal: vec!["https://example.com/a".into()],
            external: vec!["https://other.test/".into()],
            invalid_hrefs: 0,
        };
        let links = analysis.to_link_set();
        assert_eq!(links.len(), 2);
        assert_eq!(links.internal, analysis.internal);
    }
}
