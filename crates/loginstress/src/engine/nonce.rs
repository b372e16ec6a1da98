//! Login-form nonce acquisition.
//!
//! Every attempt fetches the login page fresh and pulls the one-time
//! `login-form-nonce` token out of the form markup. Tokens are never cached.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Number of body characters exposed in debug mode.
pub const DEBUG_SNIPPET_CHARS: usize = 500;

static NONCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"name="login-form-nonce" value="([a-zA-Z0-9]+)""#)
        .expect("nonce pattern is valid")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NonceError {
    #[error("login page returned status {0}")]
    Status(u16),

    #[error("login page request failed: {0}")]
    Transport(String),

    #[error("nonce not found in the login page")]
    Missing,
}

/// Returns the first nonce embedded in `html`, if any.
pub fn extract_nonce(html: &str) -> Option<&str> {
    NONCE_PATTERN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub(crate) fn snippet(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Issues exactly one GET against the login page and extracts its nonce.
pub async fn fetch_nonce(
    client: &reqwest::Client,
    page_url: &str,
    debug_enabled: bool,
) -> Result<String, NonceError> {
    debug!(url = %page_url, "Fetching nonce");

    let response = client
        .get(page_url)
        .send()
        .await
        .map_err(|e| NonceError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        debug!(url = %page_url, status = status.as_u16(), "Failed to fetch the login page");
        return Err(NonceError::Status(status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| NonceError::Transport(e.to_string()))?;

    if debug_enabled {
        debug!(
            url = %page_url,
            html = %snippet(&body, DEBUG_SNIPPET_CHARS),
            "Login page HTML content"
        );
    }

    match extract_nonce(&body) {
        Some(nonce) => Ok(nonce.to_string()),
        None => {
            debug!(url = %page_url, "Nonce not found in the page");
            Err(NonceError::Missing)
        }
    }
}
