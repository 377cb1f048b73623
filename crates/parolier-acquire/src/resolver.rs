use std::time::Duration;

use async_trait::async_trait;
use parolier_model::HttpConfig;
use thiserror::Error;

/// Failure to load a page.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("timed out loading {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("webdriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),
}

impl ResolveError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResolveError::Timeout { .. })
    }
}

/// Something that turns a URL into page markup.
///
/// Listing pages and lyric pages are loaded through this one capability so
/// the pipeline does not care whether a browser or a plain HTTP client sits
/// behind it.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<String, ResolveError>;
}

/// Plain HTTP GET resolver. One client (and connection pool) is shared by
/// every concurrent request.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate validation is disabled for lyric requests");
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, url: &str) -> Result<String, ResolveError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| request_error(url, e))
    }
}

fn request_error(url: &str, err: reqwest::Error) -> ResolveError {
    if err.is_timeout() {
        ResolveError::Timeout {
            url: url.to_string(),
        }
    } else {
        ResolveError::Request(err)
    }
}
