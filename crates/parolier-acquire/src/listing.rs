use parolier_model::{compile_selector, ConfigError, ListingSelectors, SongReference};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::normalize;
use crate::resolver::{ResolveError, Resolver};

/// Songs found on one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub references: Vec<SongReference>,
    /// Song elements that were present but lacked a usable title or link.
    pub skipped: usize,
}

/// Why a song element on a listing page was not turned into a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SkipReason {
    MissingTitle,
    MissingLink,
    InvalidLink(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingTitle => write!(f, "no title element"),
            SkipReason::MissingLink => write!(f, "no link element"),
            SkipReason::InvalidLink(href) => write!(f, "unusable link '{href}'"),
        }
    }
}

/// Compiled listing selectors.
#[derive(Debug, Clone)]
pub struct ListingParser {
    song: Selector,
    title: Selector,
    link: Selector,
}

impl ListingParser {
    pub fn new(selectors: &ListingSelectors) -> Result<Self, ConfigError> {
        Ok(Self {
            song: compile_selector("listing_selectors.song", &selectors.song)?,
            title: compile_selector("listing_selectors.title", &selectors.title)?,
            link: compile_selector("listing_selectors.link", &selectors.link)?,
        })
    }

    /// Extract song references from listing page markup, in document order.
    ///
    /// Relative links are resolved against `page_url`.
    pub fn parse(&self, html: &str, page_url: &str) -> ListingPage {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();

        let mut page = ListingPage::default();
        for (index, song) in document.select(&self.song).enumerate() {
            match self.extract(song, base.as_ref()) {
                Ok(reference) => page.references.push(reference),
                Err(reason) => {
                    tracing::warn!(element = index, page_url, %reason, "Skipping song element");
                    page.skipped += 1;
                }
            }
        }
        page
    }

    fn extract(&self, song: ElementRef, base: Option<&Url>) -> Result<SongReference, SkipReason> {
        let title = song
            .select(&self.title)
            .next()
            .map(|el| normalize::clean_label(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .ok_or(SkipReason::MissingTitle)?;

        let href = song
            .select(&self.link)
            .find_map(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SkipReason::MissingLink)?;

        let url = resolve_href(base, href).ok_or_else(|| SkipReason::InvalidLink(href.to_string()))?;

        Ok(SongReference::new(title, url))
    }
}

/// Load one listing page and enumerate its songs.
///
/// Failures to load the page (including waiting too long for the song
/// elements) propagate; per-element problems only skip that element.
pub async fn enumerate<R: Resolver + ?Sized>(
    resolver: &R,
    page_url: &str,
    parser: &ListingParser,
) -> Result<ListingPage, ResolveError> {
    let html = resolver.resolve(page_url).await?;
    tracing::debug!(page_url, bytes = html.len(), "Received listing HTML");
    Ok(parser.parse(&html, page_url))
}

fn resolve_href(base: Option<&Url>, href: &str) -> Option<String> {
    let url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
