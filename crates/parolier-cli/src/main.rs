use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use parolier_model::{BrowserKind, ListingTransport, ScrapeConfig};
use parolier_report::ReportOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parolier")]
#[command(about = "Song lyrics acquisition and sentiment reporting tool")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape song titles, URLs and lyrics for one artist into <artist>.csv
    Scrape(ScrapeArgs),

    /// Summarize the enriched <artist>_sentiments.xlsx artifact
    Report(ReportArgs),
}

#[derive(Args)]
struct ScrapeArgs {
    /// JSON file with scrape settings; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Artist name (e.g., "Charles Aznavour")
    #[arg(short, long)]
    subject: Option<String>,

    /// Listing page URL; "{page}" is replaced by the page number, otherwise the number is appended
    #[arg(short, long)]
    listing_url: Option<String>,

    /// Number of listing pages to visit
    #[arg(short, long)]
    pages: Option<u32>,

    /// Output directory for the CSV file
    #[arg(short = 'O', long)]
    output_dir: Option<String>,

    /// How listing pages are loaded
    #[arg(long, value_enum)]
    listing_transport: Option<TransportArg>,

    /// Browser driven through WebDriver
    #[arg(long, value_enum)]
    browser: Option<BrowserArg>,

    /// WebDriver server URL (msedgedriver, chromedriver, geckodriver)
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Seconds to wait for song elements on a listing page
    #[arg(long)]
    wait_timeout: Option<u64>,

    /// Seconds before a lyric request times out
    #[arg(long)]
    http_timeout: Option<u64>,

    /// Validate TLS certificates of lyric pages (off by default)
    #[arg(long)]
    verify_tls: bool,

    /// CSS selector for one song on a listing page
    #[arg(long)]
    song_selector: Option<String>,

    /// CSS selector for the lyric container on a song page
    #[arg(long)]
    lyrics_container: Option<String>,

    /// CSS selector for lyric lines inside the container
    #[arg(long)]
    lyrics_line: Option<String>,
}

#[derive(Args)]
struct ReportArgs {
    /// Artist name; locates <artist>_sentiments.xlsx
    #[arg(short, long)]
    subject: String,

    /// Enrichment artifact path (default: <artist>_sentiments.xlsx in the input directory)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory holding the enrichment artifact
    #[arg(short = 'I', long, default_value = ".")]
    input_dir: PathBuf,

    /// Song list: keep only this sentiment (repeatable)
    #[arg(long = "sentiment")]
    sentiments: Vec<String>,

    /// Song list: keep only this language code (repeatable)
    #[arg(long = "language")]
    languages: Vec<String>,

    /// Word frequencies: only count lyrics with this sentiment
    #[arg(long)]
    words_sentiment: Option<String>,

    /// Number of most frequent words to show
    #[arg(long, default_value_t = 30)]
    top_words: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: ReportFormat,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum TransportArg {
    /// WebDriver-controlled browser (client-rendered listings)
    Browser,
    /// Plain HTTP GET (server-rendered listings)
    Http,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum BrowserArg {
    Edge,
    Chrome,
    Firefox,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

impl ScrapeArgs {
    /// Defaults, then the config file, then flags.
    fn into_config(self) -> Result<ScrapeConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => ScrapeConfig::default(),
        };

        if let Some(subject) = self.subject {
            config.subject = subject;
        }
        if let Some(url) = self.listing_url {
            config.listing_url_template = url;
        }
        if let Some(pages) = self.pages {
            config.page_count = pages;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(transport) = self.listing_transport {
            config.listing_transport = match transport {
                TransportArg::Browser => ListingTransport::Browser,
                TransportArg::Http => ListingTransport::Http,
            };
        }
        if let Some(browser) = self.browser {
            config.browser.kind = match browser {
                BrowserArg::Edge => BrowserKind::Edge,
                BrowserArg::Chrome => BrowserKind::Chrome,
                BrowserArg::Firefox => BrowserKind::Firefox,
            };
        }
        if let Some(url) = self.webdriver_url {
            config.browser.webdriver_url = url;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(secs) = self.wait_timeout {
            config.browser.wait_timeout_secs = secs;
        }
        if let Some(secs) = self.http_timeout {
            config.http.timeout_secs = secs;
        }
        if self.verify_tls {
            config.http.accept_invalid_certs = false;
        }
        if let Some(selector) = self.song_selector {
            config.listing_selectors.song = selector;
        }
        if let Some(selector) = self.lyrics_container {
            config.lyrics_selectors.container = selector;
        }
        if let Some(selector) = self.lyrics_line {
            config.lyrics_selectors.line = selector;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map log level, suppressing noisy HTML-parsing crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn,hyper=info",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn,hyper=info",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    match cli.command {
        Commands::Scrape(args) => {
            let config = args.into_config()?;
            tracing::info!(
                subject = %config.subject,
                pages = config.page_count,
                transport = ?config.listing_transport,
                "Scraping lyrics"
            );

            let outcome = parolier_acquire::scrape(&config).await?;
            let s = &outcome.summary;
            tracing::info!(
                pages = s.pages_completed,
                songs = s.songs_listed,
                skipped = s.elements_skipped,
                lyrics = s.lyrics_found,
                empty = s.lyrics_empty,
                timeouts = s.fetch_timeouts,
                failures = s.fetch_failures,
                "Run summary"
            );
            match &outcome.saved {
                Some(path) => tracing::info!(
                    records = outcome.records,
                    path = %path.display(),
                    "Saved {} songs",
                    outcome.records
                ),
                None => tracing::info!("Nothing saved"),
            }
        }
        Commands::Report(args) => {
            let path = args
                .input
                .clone()
                .unwrap_or_else(|| args.input_dir.join(parolier_model::sentiments_file_name(&args.subject)));
            tracing::info!(subject = %args.subject, path = %path.display(), "Building report");

            let options = ReportOptions {
                sentiments: args.sentiments.into_iter().collect(),
                languages: args.languages.into_iter().collect(),
                word_sentiment: args.words_sentiment,
                top_words: args.top_words,
            };
            let report = parolier_report::report(&args.subject, &path, &options)?;

            match args.format {
                ReportFormat::Text => print!("{}", report.to_text()),
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "parolier",
            "scrape",
            "--subject",
            "Charles Aznavour",
            "--listing-url",
            "https://paroles.example.com/paroles-charles-aznavour?page=",
            "--pages",
            "15",
            "--listing-transport",
            "http",
            "--verify-tls",
        ])
        .unwrap();
        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };

        let config = args.into_config().unwrap();
        assert_eq!(config.subject, "Charles Aznavour");
        assert_eq!(config.page_count, 15);
        assert_eq!(config.listing_transport, ListingTransport::Http);
        assert!(!config.http.accept_invalid_certs);
        assert!(config.browser.headless);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scrape.json");
        std::fs::write(
            &path,
            r#"{"subject": "Barbara", "listing_url_template": "https://x.test/?p=", "page_count": 3}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "parolier",
            "scrape",
            "--config",
            path.to_str().unwrap(),
            "--pages",
            "7",
        ])
        .unwrap();
        let Commands::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        let config = args.into_config().unwrap();

        assert_eq!(config.subject, "Barbara");
        assert_eq!(config.page_count, 7);
    }
}
