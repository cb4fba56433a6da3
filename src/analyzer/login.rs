// src/analyzer/login.rs
// =============================================================================
// Heuristic: does this page contain a login form?
//
// A <form> is a login form when it has a password field AND either
//   - a field that looks like a user identifier (type=email, or a
//     name/id/placeholder mentioning "user" or "email"), or
//   - a submit control whose text says "log in" or "sign in".
//
// Pages that build their login UI without a <form> (JavaScript-driven
// logins) get a looser fallback check over the whole document.
// =============================================================================

use super::html::selector;
use anyhow::Result;
use scraper::{ElementRef, Html};
use tracing::{debug, info};

const USER_HINTS: [&str; 2] = ["user", "email"];
const BUTTON_PHRASES: [&str; 2] = ["log in", "sign in"];

pub fn detect_login_form(document: &Html) -> Result<bool> {
    debug!("Starting login form detection");

    let form_selector = selector("form")?;
    let password_selector = selector("input[type='password']")?;
    let input_selector = selector("input")?;
    let button_selector = selector("button, input[type='submit']")?;

    let mut found = false;

    for (form_index, form) in document.select(&form_selector).enumerate() {
        if form.select(&password_selector).next().is_none() {
            debug!(form_index, "Skipping form: no password field found");
            continue;
        }

        let has_user_identifier = form.select(&input_selector).any(is_user_identifier);
        let has_login_button = form.select(&button_selector).any(is_login_button);

        debug!(
            form_index,
            has_user_identifier, has_login_button, "Form analysis criteria"
        );

        if has_user_identifier || has_login_button {
            debug!(form_index, "Confirmed as login form");
            found = true;
            break;
        }
    }

    if !found {
        found = fallback_check(document)?;
    }

    info!(login_form_found = found, "Login form detection finished");
    Ok(found)
}

fn is_user_identifier(input: ElementRef<'_>) -> bool {
    let element = input.value();
    if element
        .attr("type")
        .is_some_and(|t| t.eq_ignore_ascii_case("email"))
    {
        return true;
    }

    ["name", "id", "placeholder"].iter().any(|attr| {
        let value = element.attr(attr).unwrap_or("").to_lowercase();
        USER_HINTS.iter().any(|hint| value.contains(hint))
    })
}

fn is_login_button(button: ElementRef<'_>) -> bool {
    let mut label: String = button.text().collect();
    label.push_str(button.value().attr("value").unwrap_or(""));
    let label = label.to_lowercase();
    BUTTON_PHRASES.iter().any(|phrase| label.contains(phrase))
}

// For logins that live outside a <form> element
fn fallback_check(document: &Html) -> Result<bool> {
    debug!("No traditional login form found, running fallback check");

    let has_password_input = document
        .select(&selector("input[type='password']")?)
        .next()
        .is_some();
    let has_email_input = document
        .select(&selector("input[type='email']")?)
        .next()
        .is_some();
    let has_text_input = document
        .select(&selector(
            "input[id*='user'], input[id*='login'], input[name*='user'], input[name*='login']",
        )?)
        .next()
        .is_some();

    debug!(
        has_password_input,
        has_email_input, has_text_input, "Fallback analysis criteria"
    );

    Ok(has_password_input && (has_email_input || has_text_input))
}
