use anyhow::{Context, Result};
use parolier_model::{ListingTransport, ScrapeConfig};
use std::path::PathBuf;

pub mod browser;
pub mod listing;
pub mod lyrics;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod resolver;

use browser::BrowserSession;
use pipeline::{Pipeline, RunSummary, ScrapeRun};
use resolver::{HttpResolver, Resolver};

/// Result of a scrape job.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub records: usize,
    pub summary: RunSummary,
    /// Path of the written artifact; `None` when nothing was collected.
    pub saved: Option<PathBuf>,
    /// Page that ended the run early, if any.
    pub aborted_at: Option<u32>,
}

/// Run a complete scrape job: enumerate listing pages, fetch lyrics, and
/// save the collected songs.
///
/// Saving happens whether or not a page failed along the way. The browser
/// session, when one is used, is closed before returning.
pub async fn scrape(config: &ScrapeConfig) -> Result<ScrapeOutcome> {
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            tracing::error!("{e}");
        }
        anyhow::bail!("{} configuration errors", errors.len());
    }

    let http = HttpResolver::new(&config.http).context("Failed to build HTTP client")?;

    match config.listing_transport {
        ListingTransport::Http => {
            let run = run_pipeline(config, &http, &http).await?;
            finish(config, run)
        }
        ListingTransport::Browser => {
            let session = BrowserSession::connect(&config.browser, &config.listing_selectors.song).await?;
            let outcome = run_pipeline(config, &session, &http)
                .await
                .and_then(|run| finish(config, run));
            session.close().await;
            outcome
        }
    }
}

async fn run_pipeline<L: Resolver + ?Sized, F: Resolver + ?Sized>(
    config: &ScrapeConfig,
    listing: &L,
    lyrics: &F,
) -> Result<ScrapeRun> {
    let pipeline = Pipeline::new(config, listing, lyrics)?;
    Ok(pipeline.run().await)
}

/// Cleanup phase: persist whatever was collected and report.
fn finish(config: &ScrapeConfig, run: ScrapeRun) -> Result<ScrapeOutcome> {
    let aborted_at = run.aborted.as_ref().map(|f| f.page);
    if let Some(failure) = &run.aborted {
        tracing::error!(
            page = failure.page,
            url = %failure.url,
            error = %failure.error,
            kept = run.results.len(),
            "Run ended early"
        );
    }

    let saved = output::write_songs(&run.results, &config.output_dir, &config.subject)?;

    Ok(ScrapeOutcome {
        records: run.results.len(),
        summary: run.summary,
        saved,
        aborted_at,
    })
}
