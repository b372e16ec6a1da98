//! Credential list loading.
//!
//! The credential file holds one `identity:secret` record per line. Lines
//! with zero or more than one `:` are skipped and reported by line number;
//! their content is never logged since it may contain a secret.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read credential file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ParsedCredentials {
    pub credentials: Vec<Credential>,
    /// 1-based line numbers of records that were not `identity:secret`.
    pub skipped: Vec<usize>,
}

/// Parses a single record. Surrounding whitespace is trimmed first.
pub fn parse_line(line: &str) -> Option<Credential> {
    let mut parts = line.trim().split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(username), Some(password), None) => Some(Credential::new(username, password)),
        _ => None,
    }
}

pub fn parse_credentials(content: &str) -> ParsedCredentials {
    let mut parsed = ParsedCredentials::default();

    for (idx, line) in content.lines().enumerate() {
        match parse_line(line) {
            Some(credential) => parsed.credentials.push(credential),
            None => {
                let line_no = idx + 1;
                if line.trim().is_empty() {
                    debug!(line = line_no, "Skipping blank credential line");
                } else {
                    warn!(line = line_no, "Skipping invalid credential line");
                }
                crate::metrics::SKIPPED_CREDENTIALS.inc();
                parsed.skipped.push(line_no);
            }
        }
    }

    parsed
}

pub async fn load_credentials(path: &Path) -> Result<ParsedCredentials, CredentialError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let parsed = parse_credentials(&content);
    info!(
        path = %path.display(),
        loaded = parsed.credentials.len(),
        skipped = parsed.skipped.len(),
        "Credentials loaded"
    );
    Ok(parsed)
}
