use serde::{Deserialize, Serialize};

/// Language code of rows left out of every report view.
pub const EXCLUDED_LANGUAGE: &str = "la";

/// One row of the enrichment artifact: a song with its detected language and
/// sentiment. Column names are matched literally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSong {
    pub titre: String,
    pub langue: String,
    pub score: f64,
    pub sentiment: String,
    #[serde(default)]
    pub parole: String,
}

impl EnrichedSong {
    pub fn is_excluded(&self) -> bool {
        self.langue == EXCLUDED_LANGUAGE
    }
}
