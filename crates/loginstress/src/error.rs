//! Error types for run setup.
//!
//! Failures of individual attempts are not errors; they are
//! [`LoginOutcome`](crate::LoginOutcome) values. Only problems that prevent
//! the run from starting end up here.

use crate::engine::credentials::CredentialError;
use loginstress_common::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid user agent {value:?}: {reason}")]
    InvalidUserAgent { value: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
