use serde::{Deserialize, Serialize};

/// A song as listed on a listing page: its display title and the URL of its
/// lyric page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongReference {
    pub title: String,
    pub url: String,
}

impl SongReference {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A listed song joined with its fetched lyric text.
///
/// Field order is the column order of the acquisition artifact
/// (`title,url,lyrics`). `lyrics` is empty when nothing could be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub title: String,
    pub url: String,
    pub lyrics: String,
}

impl SongRecord {
    /// Build the record for a reference. Title and URL are always taken from
    /// the reference the lyrics were fetched for.
    pub fn from_reference(reference: SongReference, lyrics: String) -> Self {
        Self {
            title: reference.title,
            url: reference.url,
            lyrics,
        }
    }
}

/// Append-only, ordered collection of records accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    records: Vec<SongRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: SongRecord) {
        self.records.push(record);
    }

    /// Append one page's worth of records, keeping their order.
    pub fn extend_page(&mut self, records: impl IntoIterator<Item = SongRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SongRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[SongRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a SongRecord;
    type IntoIter = std::slice::Iter<'a, SongRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// How the lyric fetch for one song ended.
///
/// The artifact only ever stores the lyric text (empty on every non-`Found`
/// outcome); the outcome is kept for logging and run summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum LyricsOutcome {
    /// At least one lyric node with text was found.
    Found,
    /// The page was fetched but the lyric container held no text.
    ParseEmpty,
    /// The request timed out.
    FetchTimeout,
    /// The request failed for any other reason.
    FetchFailed(String),
}

impl LyricsOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, LyricsOutcome::Found)
    }
}

/// Normalize a subject name into the stem used for artifact file names:
/// trimmed, lowercased, spaces replaced by underscores.
pub fn artifact_slug(subject: &str) -> String {
    subject.trim().to_lowercase().replace(' ', "_")
}

/// File name of the acquisition artifact for a subject.
pub fn songs_file_name(subject: &str) -> String {
    format!("{}.csv", artifact_slug(subject))
}

/// File name of the enrichment artifact for a subject.
pub fn sentiments_file_name(subject: &str) -> String {
    format!("{}_sentiments.xlsx", artifact_slug(subject))
}
