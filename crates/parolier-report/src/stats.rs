use std::collections::{BTreeMap, BTreeSet};

use parolier_model::EnrichedSong;
use serde::Serialize;

pub const POSITIVE: &str = "Positif";
pub const NEGATIVE: &str = "Négatif";

/// Number of songs in each top/bottom list.
pub const TOP_SONGS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    /// `None` when there are no songs.
    pub mean_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelShare {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSong {
    pub titre: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageStats {
    pub langue: String,
    pub count: usize,
    pub mean_score: f64,
}

/// Range of scores within one sentiment label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSpread {
    pub sentiment: String,
    pub count: usize,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// One row of the song table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongRow {
    pub titre: String,
    pub langue: String,
    pub score: f64,
    pub sentiment: String,
}

pub fn overview(songs: &[EnrichedSong]) -> Overview {
    Overview {
        total: songs.len(),
        positive: songs.iter().filter(|s| s.sentiment == POSITIVE).count(),
        negative: songs.iter().filter(|s| s.sentiment == NEGATIVE).count(),
        mean_score: mean(songs.iter().map(|s| s.score)),
    }
}

/// Share of each sentiment label, largest first.
pub fn sentiment_distribution(songs: &[EnrichedSong]) -> Vec<LabelShare> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for song in songs {
        *counts.entry(song.sentiment.as_str()).or_default() += 1;
    }

    let total = songs.len() as f64;
    let mut shares: Vec<LabelShare> = counts
        .into_iter()
        .map(|(label, count)| LabelShare {
            label: label.to_string(),
            count,
            percent: 100.0 * count as f64 / total,
        })
        .collect();
    // BTreeMap order breaks ties by label.
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

/// The `TOP_SONGS` highest scoring songs, best first.
pub fn most_positive(songs: &[EnrichedSong]) -> Vec<ScoredSong> {
    let mut ranked: Vec<&EnrichedSong> = songs.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.into_iter().take(TOP_SONGS).map(scored).collect()
}

/// The `TOP_SONGS` lowest scoring songs, worst first.
pub fn most_negative(songs: &[EnrichedSong]) -> Vec<ScoredSong> {
    let mut ranked: Vec<&EnrichedSong> = songs.iter().collect();
    ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
    ranked.into_iter().take(TOP_SONGS).map(scored).collect()
}

/// Score range per sentiment label, by label.
pub fn score_spread(songs: &[EnrichedSong]) -> Vec<ScoreSpread> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for song in songs {
        groups.entry(song.sentiment.as_str()).or_default().push(song.score);
    }

    groups
        .into_iter()
        .map(|(sentiment, scores)| ScoreSpread {
            sentiment: sentiment.to_string(),
            count: scores.len(),
            min: scores.iter().copied().fold(f64::INFINITY, f64::min),
            mean: mean(scores.iter().copied()).unwrap_or_default(),
            max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect()
}

/// Song count and mean score per language, most songs first.
pub fn by_language(songs: &[EnrichedSong]) -> Vec<LanguageStats> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for song in songs {
        groups.entry(song.langue.as_str()).or_default().push(song.score);
    }

    let mut stats: Vec<LanguageStats> = groups
        .into_iter()
        .map(|(langue, scores)| LanguageStats {
            langue: langue.to_string(),
            count: scores.len(),
            mean_score: mean(scores.iter().copied()).unwrap_or_default(),
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

/// Songs matching the filters, sorted by title. An empty filter set
/// matches everything.
pub fn song_table(songs: &[EnrichedSong], sentiments: &BTreeSet<String>, languages: &BTreeSet<String>) -> Vec<SongRow> {
    let mut rows: Vec<SongRow> = songs
        .iter()
        .filter(|s| sentiments.is_empty() || sentiments.contains(&s.sentiment))
        .filter(|s| languages.is_empty() || languages.contains(&s.langue))
        .map(|s| SongRow {
            titre: s.titre.clone(),
            langue: s.langue.clone(),
            score: s.score,
            sentiment: s.sentiment.clone(),
        })
        .collect();
    rows.sort_by(|a, b| a.titre.cmp(&b.titre));
    rows
}

fn scored(song: &EnrichedSong) -> ScoredSong {
    ScoredSong {
        titre: song.titre.clone(),
        score: song.score,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
