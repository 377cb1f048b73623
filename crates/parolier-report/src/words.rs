use std::collections::HashMap;
use std::sync::OnceLock;

use parolier_model::EnrichedSong;
use regex::Regex;
use serde::Serialize;

/// Words shorter than this are not counted.
pub const MIN_WORD_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"))
}

/// Most frequent words across the lyrics of `songs`, optionally limited to
/// one sentiment label. Sorted by count descending, then alphabetically.
pub fn word_frequencies(songs: &[EnrichedSong], sentiment: Option<&str>, limit: usize) -> Vec<WordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for song in songs.iter().filter(|s| sentiment.map_or(true, |wanted| s.sentiment == wanted)) {
        let lowered = song.parole.to_lowercase();
        for word in word_pattern().find_iter(&lowered) {
            let word = word.as_str();
            if word.chars().count() >= MIN_WORD_CHARS {
                *counts.entry(word.to_string()).or_default() += 1;
            }
        }
    }

    let mut words: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words.truncate(limit);
    words
}
