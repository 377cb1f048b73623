use std::time::Duration;

use async_trait::async_trait;
use fantoccini::error::{CmdError, NewSessionError};
use fantoccini::{Client, ClientBuilder, Locator};
use parolier_model::{BrowserConfig, BrowserKind};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::resolver::{ResolveError, Resolver};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("could not start a browser session at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: NewSessionError,
    },
}

/// A WebDriver browser session used to load listing pages.
///
/// Each `resolve` navigates to the page, waits for the song elements to be
/// present, and returns the rendered DOM. The session is released by
/// [`BrowserSession::close`]; if that is skipped (early return, panic) it is
/// released when the value is dropped.
pub struct BrowserSession {
    client: Client,
    closed: bool,
    ready_selector: String,
    wait_timeout: Duration,
}

impl BrowserSession {
    /// Start a session. `ready_selector` is the element whose presence marks
    /// a listing page as loaded.
    pub async fn connect(config: &BrowserConfig, ready_selector: &str) -> Result<Self, BrowserError> {
        let client = ClientBuilder::native()
            .capabilities(capabilities(config))
            .connect(&config.webdriver_url)
            .await
            .map_err(|source| BrowserError::Connect {
                url: config.webdriver_url.clone(),
                source,
            })?;

        tracing::info!(
            webdriver = %config.webdriver_url,
            browser = ?config.kind,
            headless = config.headless,
            "Started browser session"
        );

        Ok(Self {
            client,
            closed: false,
            ready_selector: ready_selector.to_string(),
            wait_timeout: Duration::from_secs(config.wait_timeout_secs),
        })
    }

    /// End the session and shut the browser down.
    pub async fn close(mut self) {
        self.closed = true;
        match self.client.clone().close().await {
            Ok(()) => tracing::info!("Closed browser session"),
            Err(e) => tracing::warn!(error = %e, "Failed to close browser session"),
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let client = self.client.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("Releasing browser session on drop");
                handle.spawn(async move {
                    if let Err(e) = client.close().await {
                        tracing::warn!(error = %e, "Failed to close browser session");
                    }
                });
            }
            Err(_) => tracing::warn!("Browser session dropped outside a runtime; it was not closed"),
        }
    }
}

#[async_trait]
impl Resolver for BrowserSession {
    async fn resolve(&self, url: &str) -> Result<String, ResolveError> {
        self.client.goto(url).await?;

        match self
            .client
            .wait()
            .at_most(self.wait_timeout)
            .for_element(Locator::Css(&self.ready_selector))
            .await
        {
            Ok(_) => {}
            Err(CmdError::WaitTimeout) => {
                return Err(ResolveError::Timeout {
                    url: url.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }

        Ok(self.client.source().await?)
    }
}

/// W3C capabilities for the configured browser.
fn capabilities(config: &BrowserConfig) -> Map<String, Value> {
    let (browser_name, options_key, headless_arg) = match config.kind {
        BrowserKind::Edge => ("MicrosoftEdge", "ms:edgeOptions", "--headless"),
        BrowserKind::Chrome => ("chrome", "goog:chromeOptions", "--headless"),
        BrowserKind::Firefox => ("firefox", "moz:firefoxOptions", "-headless"),
    };

    let args: Vec<&str> = if config.headless { vec![headless_arg] } else { Vec::new() };

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!(browser_name));
    caps.insert(options_key.to_string(), json!({ "args": args }));
    caps
}
