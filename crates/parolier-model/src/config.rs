use scraper::Selector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder substituted with the page number in a listing URL template.
pub const PAGE_PLACEHOLDER: &str = "{page}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("listing URL template '{template}' does not produce a valid URL: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid CSS selector for {field}: '{selector}'")]
    InvalidSelector { field: &'static str, selector: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Everything a scrape run needs, handed to the pipeline at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Artist name; also names the output file.
    pub subject: String,
    /// Listing page URL. `{page}` is replaced by the page number; without
    /// the placeholder the number is appended.
    pub listing_url_template: String,
    /// Pages `1..=page_count` are visited.
    pub page_count: u32,
    pub output_dir: String,
    pub listing_transport: ListingTransport,
    pub browser: BrowserConfig,
    pub http: HttpConfig,
    pub listing_selectors: ListingSelectors,
    pub lyrics_selectors: LyricsSelectors,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            subject: String::new(),
            listing_url_template: String::new(),
            page_count: 1,
            output_dir: ".".to_string(),
            listing_transport: ListingTransport::default(),
            browser: BrowserConfig::default(),
            http: HttpConfig::default(),
            listing_selectors: ListingSelectors::default(),
            lyrics_selectors: LyricsSelectors::default(),
        }
    }
}

/// How listing pages are loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingTransport {
    /// Through a WebDriver-controlled browser (pages rendered client-side).
    #[default]
    Browser,
    /// With a plain HTTP GET.
    Http,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Edge,
    Chrome,
    Firefox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub kind: BrowserKind,
    pub headless: bool,
    /// Upper bound on waiting for the song containers of a listing page.
    pub wait_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            kind: BrowserKind::default(),
            headless: true,
            wait_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Skip TLS certificate validation. On by default: the lyrics site has
    /// been served with certificates that fail validation.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            accept_invalid_certs: true,
            user_agent: concat!("parolier/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// CSS selectors locating songs on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// One element per listed song.
    pub song: String,
    /// Title element, relative to a song element.
    pub title: String,
    /// Link element carrying the lyric page `href`, relative to a song element.
    pub link: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            song: "[class*='flex flex-row items-center gap-2 py-2']".to_string(),
            title: "a.text-gray-700".to_string(),
            link: "a[href]".to_string(),
        }
    }
}

/// CSS selectors locating the lyric text on a song page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsSelectors {
    /// The lyric container.
    pub container: String,
    /// Text-bearing nodes inside the container.
    pub line: String,
}

impl Default for LyricsSelectors {
    fn default() -> Self {
        Self {
            container: "p.text-center".to_string(),
            line: "div".to_string(),
        }
    }
}

impl ScrapeConfig {
    /// URL of listing page `page` (1-based).
    pub fn page_url(&self, page: u32) -> String {
        if self.listing_url_template.contains(PAGE_PLACEHOLDER) {
            self.listing_url_template
                .replace(PAGE_PLACEHOLDER, &page.to_string())
        } else {
            format!("{}{page}", self.listing_url_template)
        }
    }

    /// Check the settings that don't need the HTML layer. Selector syntax is
    /// checked where the selectors are compiled.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.subject.trim().is_empty() {
            errors.push(ConfigError::Missing("subject"));
        }

        if self.listing_url_template.trim().is_empty() {
            errors.push(ConfigError::Missing("listing_url_template"));
        } else if let Err(e) = url::Url::parse(&self.page_url(1)) {
            errors.push(ConfigError::InvalidTemplate {
                template: self.listing_url_template.clone(),
                reason: e.to_string(),
            });
        }

        let selectors = [
            ("listing_selectors.song", &self.listing_selectors.song),
            ("listing_selectors.title", &self.listing_selectors.title),
            ("listing_selectors.link", &self.listing_selectors.link),
            ("lyrics_selectors.container", &self.lyrics_selectors.container),
            ("lyrics_selectors.line", &self.lyrics_selectors.line),
        ];
        errors.extend(
            selectors
                .into_iter()
                .filter_map(|(field, selector)| compile_selector(field, selector).err()),
        );

        if self.http.timeout_secs == 0 {
            errors.push(ConfigError::ZeroTimeout("http.timeout_secs"));
        }
        if self.listing_transport == ListingTransport::Browser && self.browser.wait_timeout_secs == 0 {
            errors.push(ConfigError::ZeroTimeout("browser.wait_timeout_secs"));
        }

        errors
    }
}

/// Parse a CSS selector from the settings, naming the field on failure.
pub fn compile_selector(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}
