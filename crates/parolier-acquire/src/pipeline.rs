// The pipeline driver: visit listing pages in order, fetch every song's
// lyrics concurrently within a page, and accumulate records.
//
// Pages are strictly sequential. Within a page all lyric fetches are in
// flight together and the page completes when the last one does. The first
// page failure ends the run; whatever was accumulated is kept for
// persistence.

use futures::future::join_all;
use parolier_model::{LyricsOutcome, ResultSet, ScrapeConfig, SongRecord};
use serde::Serialize;

use crate::listing::{self, ListingParser};
use crate::lyrics::{self, LyricsParser};
use crate::resolver::{ResolveError, Resolver};

/// A page whose listing could not be loaded; it ended the run.
#[derive(Debug)]
pub struct PageFailure {
    pub page: u32,
    pub url: String,
    pub error: ResolveError,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pages_requested: u32,
    pub pages_completed: u32,
    pub songs_listed: usize,
    pub elements_skipped: usize,
    pub lyrics_found: usize,
    pub lyrics_empty: usize,
    pub fetch_timeouts: usize,
    pub fetch_failures: usize,
}

impl RunSummary {
    fn count(&mut self, outcome: &LyricsOutcome) {
        match outcome {
            LyricsOutcome::Found => self.lyrics_found += 1,
            LyricsOutcome::ParseEmpty => self.lyrics_empty += 1,
            LyricsOutcome::FetchTimeout => self.fetch_timeouts += 1,
            LyricsOutcome::FetchFailed(_) => self.fetch_failures += 1,
        }
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct ScrapeRun {
    pub results: ResultSet,
    pub summary: RunSummary,
    /// Set when a page failure abandoned the remaining pages.
    pub aborted: Option<PageFailure>,
}

pub struct Pipeline<'a, L: ?Sized, F: ?Sized> {
    config: &'a ScrapeConfig,
    listing: &'a L,
    lyrics: &'a F,
    listing_parser: ListingParser,
    lyrics_parser: LyricsParser,
}

impl<'a, L, F> Pipeline<'a, L, F>
where
    L: Resolver + ?Sized,
    F: Resolver + ?Sized,
{
    /// `listing` loads listing pages, `lyrics` loads song pages.
    pub fn new(config: &'a ScrapeConfig, listing: &'a L, lyrics: &'a F) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            listing,
            lyrics,
            listing_parser: ListingParser::new(&config.listing_selectors)?,
            lyrics_parser: LyricsParser::new(&config.lyrics_selectors)?,
        })
    }

    pub async fn run(&self) -> ScrapeRun {
        let mut results = ResultSet::new();
        let mut summary = RunSummary {
            pages_requested: self.config.page_count,
            ..RunSummary::default()
        };
        let mut aborted = None;

        for page in 1..=self.config.page_count {
            let url = self.config.page_url(page);
            tracing::info!(page, url = %url, "Processing page");

            let scraped = self.scrape_page(page, &url, &mut summary).await;
            match scraped {
                Ok(records) => {
                    tracing::info!(page, songs = records.len(), "Page done");
                    results.extend_page(records);
                    summary.pages_completed += 1;
                }
                Err(error) => {
                    tracing::error!(page, url = %url, error = %error, "Page failed, abandoning remaining pages");
                    aborted = Some(PageFailure { page, url, error });
                    break;
                }
            }
        }

        ScrapeRun {
            results,
            summary,
            aborted,
        }
    }

    async fn scrape_page(
        &self,
        page: u32,
        url: &str,
        summary: &mut RunSummary,
    ) -> Result<Vec<SongRecord>, ResolveError> {
        let listing = listing::enumerate(self.listing, url, &self.listing_parser).await?;
        summary.songs_listed += listing.references.len();
        summary.elements_skipped += listing.skipped;

        // join_all yields results in submission order, whatever order the
        // fetches complete in.
        let fetched = join_all(
            listing
                .references
                .iter()
                .map(|r| lyrics::fetch_lyrics(self.lyrics, &r.url, &self.lyrics_parser)),
        )
        .await;

        let mut records = Vec::with_capacity(fetched.len());
        for (reference, (lyrics, outcome)) in listing.references.into_iter().zip(fetched) {
            summary.count(&outcome);
            tracing::info!(page, title = %reference.title, found = outcome.is_found(), "Fetched song");
            records.push(SongRecord::from_reference(reference, lyrics));
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::fake::FakeResolver;
    use parolier_model::{ListingTransport, SongReference};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const BASE: &str = "https://paroles.example.com";

    fn config(pages: u32) -> ScrapeConfig {
        ScrapeConfig {
            subject: "Test Artist".into(),
            listing_url_template: format!("{BASE}/paroles-test-artist?page="),
            page_count: pages,
            listing_transport: ListingTransport::Http,
            ..ScrapeConfig::default()
        }
    }

    fn listing_html(songs: &[(&str, &str)]) -> String {
        let items: String = songs
            .iter()
            .map(|(title, href)| {
                format!(
                    r#"<div class="flex flex-row items-center gap-2 py-2"><a class="text-gray-700" href="{href}">{title}</a></div>"#
                )
            })
            .collect();
        format!("<html><body>{items}</body></html>")
    }

    fn lyrics_html(text: &str) -> String {
        format!(r#"<html><body><p class="text-center"><div>{text}</div></p></body></html>"#)
    }

    fn page_url(page: u32) -> String {
        format!("{BASE}/paroles-test-artist?page={page}")
    }

    #[tokio::test]
    async fn test_two_song_page() {
        let cfg = config(1);
        let listing = FakeResolver::new().page(&page_url(1), &listing_html(&[("Title A", "/a"), ("Title B", "/b")]));
        let songs = FakeResolver::new()
            .page(&format!("{BASE}/a"), &lyrics_html("Hello"))
            .page(&format!("{BASE}/b"), &lyrics_html("World"));

        let run = Pipeline::new(&cfg, &listing, &songs).unwrap().run().await;

        assert!(run.aborted.is_none());
        assert_eq!(
            run.results.records(),
            &[
                SongRecord { title: "Title A".into(), url: format!("{BASE}/a"), lyrics: "Hello".into() },
                SongRecord { title: "Title B".into(), url: format!("{BASE}/b"), lyrics: "World".into() },
            ]
        );
        assert_eq!(run.summary.lyrics_found, 2);
        assert_eq!(run.summary.pages_completed, 1);
    }

    #[tokio::test]
    async fn test_pages_visited_in_order_once() {
        let cfg = config(4);
        let mut listing = FakeResolver::new();
        for page in 1..=4 {
            listing = listing.page(&page_url(page), &listing_html(&[]));
        }
        let songs = FakeResolver::new();

        let run = Pipeline::new(&cfg, &listing, &songs).unwrap().run().await;

        assert_eq!(listing.requests(), (1..=4).map(page_url).collect::<Vec<_>>());
        assert!(run.results.is_empty());
        assert_eq!(run.summary.pages_completed, 4);
        assert!(songs.requests().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_on_page_two_keeps_page_one() {
        let cfg = config(3);
        let first: Vec<(String, String)> = (1..=5)
            .map(|i| (format!("Song {i}"), format!("/song-{i}")))
            .collect();
        let first_refs: Vec<(&str, &str)> = first.iter().map(|(t, h)| (t.as_str(), h.as_str())).collect();

        let listing = FakeResolver::new()
            .page(&page_url(1), &listing_html(&first_refs))
            .timeout(&page_url(2))
            .page(&page_url(3), &listing_html(&[("Never", "/never")]));
        let mut songs = FakeResolver::new();
        for i in 1..=5 {
            songs = songs.page(&format!("{BASE}/song-{i}"), &lyrics_html(&format!("Lyrics {i}")));
        }

        let run = Pipeline::new(&cfg, &listing, &songs).unwrap().run().await;

        assert_eq!(run.results.len(), 5);
        for (i, record) in run.results.iter().enumerate() {
            assert_eq!(record.title, format!("Song {}", i + 1));
            assert_eq!(record.lyrics, format!("Lyrics {}", i + 1));
        }
        let failure = run.aborted.expect("run should be aborted");
        assert_eq!(failure.page, 2);
        assert!(failure.error.is_timeout());
        assert_eq!(listing.requests(), vec![page_url(1), page_url(2)]);
        assert_eq!(run.summary.pages_completed, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_yields_empty_lyrics() {
        let cfg = config(1);
        let listing = FakeResolver::new().page(
            &page_url(1),
            &listing_html(&[("Ok", "/ok"), ("Slow", "/slow"), ("Gone", "/gone"), ("Blank", "/blank")]),
        );
        let songs = FakeResolver::new()
            .page(&format!("{BASE}/ok"), &lyrics_html("Bonjour"))
            .timeout(&format!("{BASE}/slow"))
            .status(&format!("{BASE}/gone"), 404)
            .page(&format!("{BASE}/blank"), "<html><body></body></html>");

        let run = Pipeline::new(&cfg, &listing, &songs).unwrap().run().await;

        let lyrics: Vec<&str> = run.results.iter().map(|r| r.lyrics.as_str()).collect();
        assert_eq!(lyrics, vec!["Bonjour", "", "", ""]);
        assert_eq!(run.summary.lyrics_found, 1);
        assert_eq!(run.summary.fetch_timeouts, 1);
        assert_eq!(run.summary.fetch_failures, 1);
        assert_eq!(run.summary.lyrics_empty, 1);
        assert!(run.aborted.is_none());
    }

    #[tokio::test]
    async fn test_zero_pages() {
        let cfg = config(0);
        let listing = FakeResolver::new();
        let songs = FakeResolver::new();

        let run = Pipeline::new(&cfg, &listing, &songs).unwrap().run().await;

        assert!(run.results.is_empty());
        assert!(listing.requests().is_empty());
        assert_eq!(run.summary, RunSummary::default());
    }

    /// Resolver whose responses arrive in reverse order of the requests.
    struct ReverseDelayResolver {
        delays: HashMap<String, u64>,
        completed: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Resolver for ReverseDelayResolver {
        async fn resolve(&self, url: &str) -> Result<String, ResolveError> {
            let delay = self.delays.get(url).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.completed.lock().unwrap().push(url.to_string());
            Ok(lyrics_html(url.rsplit('/').next().unwrap_or_default()))
        }
    }

    #[tokio::test]
    async fn test_results_follow_listing_order_not_completion_order() {
        let cfg = config(1);
        let names = ["one", "two", "three", "four"];
        let refs: Vec<(&str, String)> = names.iter().map(|n| (*n, format!("/{n}"))).collect();
        let refs: Vec<(&str, &str)> = refs.iter().map(|(t, h)| (*t, h.as_str())).collect();
        let listing = FakeResolver::new().page(&page_url(1), &listing_html(&refs));
        let songs = ReverseDelayResolver {
            delays: names
                .iter()
                .enumerate()
                .map(|(i, n)| (format!("{BASE}/{n}"), 10 * (names.len() - i) as u64))
                .collect(),
            completed: Mutex::new(Vec::new()),
        };

        let run = Pipeline::new(&cfg, &listing, &songs).unwrap().run().await;

        let completed = songs.completed.lock().unwrap().clone();
        assert_eq!(completed.first().map(String::as_str), Some(format!("{BASE}/four").as_str()));

        let expected: Vec<SongReference> = names
            .iter()
            .map(|n| SongReference::new(*n, format!("{BASE}/{n}")))
            .collect();
        for (record, reference) in run.results.iter().zip(&expected) {
            assert_eq!(record.title, reference.title);
            assert_eq!(record.url, reference.url);
            assert_eq!(record.lyrics, reference.title);
        }
        assert_eq!(run.results.len(), expected.len());
    }
}
