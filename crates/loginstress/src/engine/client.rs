use crate::engine::attempt::Endpoints;
use crate::error::ClientError;
use loginstress_common::RunConfig;
use reqwest::header::HeaderValue;
use reqwest::Url;

/// Builds the HTTP client shared by every worker.
///
/// The configured user agent is checked here as well: a value that cannot
/// be sent as a header would otherwise fail every login submission.
pub fn build_client(config: &RunConfig) -> Result<reqwest::Client, ClientError> {
    check_user_agent(&config.user_agent)?;

    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| ClientError::Build(e.to_string()))
}

fn check_user_agent(value: &str) -> Result<(), ClientError> {
    HeaderValue::from_str(value)
        .map(|_| ())
        .map_err(|e| ClientError::InvalidUserAgent {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn check_url(raw: &str) -> Result<(), ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

impl Endpoints {
    /// Validates both URLs up front so a typo fails the run before any request.
    pub fn new(
        login_url: impl Into<String>,
        login_page_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let login_url = login_url.into();
        let login_page_url = login_page_url.into();
        check_url(&login_url)?;
        check_url(&login_page_url)?;
        Ok(Self {
            login_url,
            login_page_url,
        })
    }
}
