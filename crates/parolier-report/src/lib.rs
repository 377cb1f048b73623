use anyhow::Result;
use parolier_model::EnrichedSong;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

pub mod load;
pub mod stats;
pub mod words;

use stats::{LabelShare, LanguageStats, Overview, ScoreSpread, ScoredSong, SongRow};
use words::WordCount;

/// Filters and limits applied when building a report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Song table: keep these sentiments only (empty keeps all).
    pub sentiments: BTreeSet<String>,
    /// Song table: keep these languages only (empty keeps all).
    pub languages: BTreeSet<String>,
    /// Word frequencies: count lyrics of this sentiment only.
    pub word_sentiment: Option<String>,
    pub top_words: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            sentiments: BTreeSet::new(),
            languages: BTreeSet::new(),
            word_sentiment: None,
            top_words: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub subject: String,
    pub generated_at: String,
    pub overview: Overview,
    pub sentiments: Vec<LabelShare>,
    pub score_spread: Vec<ScoreSpread>,
    pub most_positive: Vec<ScoredSong>,
    pub most_negative: Vec<ScoredSong>,
    pub languages: Vec<LanguageStats>,
    pub words: Vec<WordCount>,
    pub songs: Vec<SongRow>,
}

/// Build every report view from already-loaded songs.
pub fn build_report(subject: &str, songs: &[EnrichedSong], options: &ReportOptions) -> Report {
    Report {
        subject: subject.to_string(),
        generated_at: chrono::Local::now().to_rfc3339(),
        overview: stats::overview(songs),
        sentiments: stats::sentiment_distribution(songs),
        score_spread: stats::score_spread(songs),
        most_positive: stats::most_positive(songs),
        most_negative: stats::most_negative(songs),
        languages: stats::by_language(songs),
        words: words::word_frequencies(songs, options.word_sentiment.as_deref(), options.top_words),
        songs: stats::song_table(songs, &options.sentiments, &options.languages),
    }
}

/// Load the enrichment artifact at `path` and build the report.
pub fn report(subject: &str, path: &Path, options: &ReportOptions) -> Result<Report> {
    let songs = load::load_songs(path)?;
    if songs.is_empty() {
        tracing::warn!(path = %path.display(), "Enrichment artifact has no songs");
    }
    Ok(build_report(subject, &songs, options))
}

impl Report {
    /// Plain-text rendering for the terminal.
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "L'univers musical de {}", self.subject);
        let _ = writeln!(out);

        let o = &self.overview;
        let _ = writeln!(out, "Total des chansons    {}", o.total);
        let _ = writeln!(out, "Chansons positives    {}", o.positive);
        let _ = writeln!(out, "Chansons négatives    {}", o.negative);
        match o.mean_score {
            Some(mean) => {
                let _ = writeln!(out, "Score moyen           {mean:.2}");
            }
            None => {
                let _ = writeln!(out, "Score moyen           -");
            }
        }

        section(&mut out, "Répartition des sentiments");
        for share in &self.sentiments {
            let _ = writeln!(out, "  {:<12} {:>5}  {:>5.1}%", share.label, share.count, share.percent);
        }

        section(&mut out, "Distribution des scores par sentiment");
        for spread in &self.score_spread {
            let _ = writeln!(
                out,
                "  {:<12} {:>5}  min {:>6.2}  moyen {:>6.2}  max {:>6.2}",
                spread.sentiment, spread.count, spread.min, spread.mean, spread.max
            );
        }

        section(&mut out, "Top 5 des chansons les plus positives");
        for song in &self.most_positive {
            let _ = writeln!(out, "  {:>6.2}  {}", song.score, song.titre);
        }

        section(&mut out, "Top 5 des chansons les plus négatives");
        for song in &self.most_negative {
            let _ = writeln!(out, "  {:>6.2}  {}", song.score, song.titre);
        }

        section(&mut out, "Analyse par langue");
        for lang in &self.languages {
            let _ = writeln!(out, "  {:<6} {:>5}  score moyen {:>6.2}", lang.langue, lang.count, lang.mean_score);
        }

        section(&mut out, "Mots les plus fréquents");
        for word in &self.words {
            let _ = writeln!(out, "  {:<20} {:>5}", word.word, word.count);
        }

        section(&mut out, "Liste des chansons");
        for song in &self.songs {
            let _ = writeln!(
                out,
                "  {:<40} {:<6} {:>6.2}  {}",
                song.titre, song.langue, song.score, song.sentiment
            );
        }

        out
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::catalog;

    #[test]
    fn test_build_report() {
        let options = ReportOptions {
            languages: ["en".to_string()].into(),
            top_words: 5,
            ..ReportOptions::default()
        };
        let report = build_report("Charles Aznavour", &catalog(), &options);

        assert_eq!(report.overview.total, 7);
        assert_eq!(report.words.len(), 5);
        assert_eq!(report.songs.len(), 2);
        assert!(report.songs.iter().all(|s| s.langue == "en"));
    }

    #[test]
    fn test_text_rendering() {
        let report = build_report("Charles Aznavour", &catalog(), &ReportOptions::default());
        let text = report.to_text();

        assert!(text.starts_with("L'univers musical de Charles Aznavour\n"));
        assert!(text.contains("Total des chansons    7\n"));
        assert!(text.contains("Score moyen           0.00\n"));
        assert!(text.contains("Top 5 des chansons les plus positives\n-------------------------------------\n"));
        assert!(text.contains("    0.75  La Bohème\n"));
        assert!(text.contains("  Positif          3  min   0.25  moyen   0.50  max   0.75\n"));
    }

    #[test]
    fn test_empty_report_renders() {
        let report = build_report("Personne", &[], &ReportOptions::default());
        assert!(report.to_text().contains("Score moyen           -\n"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overview"]["mean_score"], serde_json::Value::Null);
    }

    #[test]
    fn test_report_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_sentiments.csv");
        std::fs::write(
            &path,
            "titre,langue,score,sentiment,parole\nA,fr,0.5,Positif,bonjour\nB,la,0.9,Positif,ave\n",
        )
        .unwrap();

        let report = report("X", &path, &ReportOptions::default()).unwrap();
        assert_eq!(report.overview.total, 1);
        assert_eq!(report.words, vec![WordCount { word: "bonjour".into(), count: 1 }]);
    }
}
