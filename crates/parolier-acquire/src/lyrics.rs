use ego_tree::NodeRef;
use parolier_model::{compile_selector, ConfigError, LyricsOutcome, LyricsSelectors};
use scraper::{ElementRef, Html, Node, Selector};

use crate::normalize;
use crate::resolver::{ResolveError, Resolver};

/// Compiled lyric selectors.
#[derive(Debug, Clone)]
pub struct LyricsParser {
    container: Selector,
    line: Selector,
}

impl LyricsParser {
    pub fn new(selectors: &LyricsSelectors) -> Result<Self, ConfigError> {
        Ok(Self {
            container: compile_selector("lyrics_selectors.container", &selectors.container)?,
            line: compile_selector("lyrics_selectors.line", &selectors.line)?,
        })
    }

    /// Extract the normalized lyric text from a song page. Empty when the
    /// page has no lyric container or the container holds no text.
    pub fn parse(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let mut fragments: Vec<String> = Vec::new();
        for container in document.select(&self.container) {
            let mut lines: Vec<ElementRef> = container.select(&self.line).collect();
            if lines.is_empty() && is_vacated(container) {
                lines = self.hoisted_lines(*container);
            }
            fragments.extend(lines.iter().map(|el| el.text().collect::<String>()));
        }

        normalize::join_fragments(fragments.iter().map(String::as_str))
    }

    /// Line elements the HTML parser moved out of the container.
    ///
    /// A `<div>` start tag closes an open `<p>`, so `<p><div>..</div></p>`
    /// parses as an empty `<p>` followed by the divs as siblings. Collect the
    /// run of matching elements right after the container, skipping the
    /// whitespace text between them.
    fn hoisted_lines<'a>(&self, container: NodeRef<'a, Node>) -> Vec<ElementRef<'a>> {
        let mut lines = Vec::new();
        for sibling in container.next_siblings() {
            match sibling.value() {
                Node::Text(text) if text.trim().is_empty() => continue,
                Node::Comment(_) => continue,
                Node::Element(_) => match ElementRef::wrap(sibling) {
                    Some(el) if self.line.matches(&el) => lines.push(el),
                    _ => break,
                },
                _ => break,
            }
        }
        lines
    }
}

/// True when the container holds nothing but whitespace and comments,
/// which is what is left of a `<p>` whose lines were hoisted out.
fn is_vacated(container: ElementRef) -> bool {
    container.children().all(|child| match child.value() {
        Node::Text(text) => text.trim().is_empty(),
        Node::Comment(_) => true,
        _ => false,
    })
}

/// Fetch one song page and extract its lyrics.
///
/// Never fails: any problem yields empty lyrics, with the reason in the
/// returned outcome. There is no retry.
pub async fn fetch_lyrics<R: Resolver + ?Sized>(
    resolver: &R,
    url: &str,
    parser: &LyricsParser,
) -> (String, LyricsOutcome) {
    match resolver.resolve(url).await {
        Ok(html) => {
            let lyrics = parser.parse(&html);
            if lyrics.is_empty() {
                tracing::warn!(url, "No lyrics found on page");
                (lyrics, LyricsOutcome::ParseEmpty)
            } else {
                (lyrics, LyricsOutcome::Found)
            }
        }
        Err(err) => {
            tracing::warn!(url, error = %err, "Failed to fetch lyrics");
            (String::new(), outcome_for(&err))
        }
    }
}

fn outcome_for(err: &ResolveError) -> LyricsOutcome {
    match err {
        ResolveError::Timeout { .. } => LyricsOutcome::FetchTimeout,
        other => LyricsOutcome::FetchFailed(other.to_string()),
    }
}
