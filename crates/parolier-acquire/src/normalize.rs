use unicode_normalization::UnicodeNormalization;

/// Join extracted lyric fragments into one line of text.
///
/// Each fragment is trimmed and empty ones are dropped. The result is NFC
/// normalized (so accented French characters compare equal however the page
/// encoded them) and every whitespace run, newlines included, becomes a
/// single space.
pub fn join_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    let joined = fragments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_lyrics(&joined)
}

/// NFC-normalize and collapse whitespace. Idempotent.
pub fn normalize_lyrics(input: &str) -> String {
    let nfc: String = input.nfc().collect();
    nfc.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim and collapse whitespace in a short label such as a song title.
pub fn clean_label(input: &str) -> String {
    normalize_lyrics(input)
}
