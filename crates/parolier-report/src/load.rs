use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use parolier_model::EnrichedSong;
use std::path::Path;
use thiserror::Error;

/// Columns the report reads from the enrichment artifact.
pub const REQUIRED_COLUMNS: [&str; 5] = ["titre", "langue", "score", "sentiment", "parole"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("enrichment artifact is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("workbook has no worksheet")]
    NoWorksheet,

    #[error("row {row}: score {value:?} is not a number")]
    BadScore { row: usize, value: String },
}

/// Read the enrichment artifact, dropping rows in the excluded language.
///
/// Spreadsheets (`.xlsx`, `.xls`, `.ods`) are read from their first
/// worksheet; anything else is read as CSV.
pub fn load_songs(path: &Path) -> Result<Vec<EnrichedSong>> {
    let is_workbook = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls" | "ods"));

    let rows = if is_workbook {
        read_workbook(path)
    } else {
        read_csv(path)
    }
    .with_context(|| format!("Cannot read {}", path.display()))?;

    let total = rows.len();
    let songs: Vec<EnrichedSong> = rows.into_iter().filter(|s| !s.is_excluded()).collect();

    tracing::info!(
        path = %path.display(),
        songs = songs.len(),
        excluded = total - songs.len(),
        "Loaded enrichment artifact"
    );
    Ok(songs)
}

fn check_columns(headers: &[&str]) -> Result<(), ArtifactError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.contains(c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ArtifactError::MissingColumns(missing))
    }
}

fn read_csv(path: &Path) -> Result<Vec<EnrichedSong>> {
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV")?;
    let headers = reader.headers()?.clone();
    check_columns(&headers.iter().collect::<Vec<_>>())?;

    reader
        .deserialize::<EnrichedSong>()
        .enumerate()
        .map(|(line, row)| row.with_context(|| format!("Bad row {}", line + 2)))
        .collect()
}

fn read_workbook(path: &Path) -> Result<Vec<EnrichedSong>> {
    let mut workbook = open_workbook_auto(path).context("Failed to open workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ArtifactError::NoWorksheet)?
        .context("Failed to read worksheet")?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();
    check_columns(&headers.iter().map(String::as_str).collect::<Vec<_>>())?;

    // Present, checked above.
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
    let (titre, langue, score, sentiment, parole) = (
        column("titre"),
        column("langue"),
        column("score"),
        column("sentiment"),
        column("parole"),
    );

    let mut songs = Vec::new();
    for (i, row) in rows.enumerate() {
        let text = |col: usize| row.get(col).map(|c| c.to_string()).unwrap_or_default();
        // Blank trailing rows are common in edited workbooks.
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        songs.push(EnrichedSong {
            titre: text(titre),
            langue: text(langue),
            score: cell_score(row.get(score), i + 2)?,
            sentiment: text(sentiment),
            parole: text(parole),
        });
    }
    Ok(songs)
}

fn cell_score(cell: Option<&Data>, row: usize) -> Result<f64, ArtifactError> {
    match cell {
        Some(Data::Float(f)) => Ok(*f),
        Some(Data::Int(i)) => Ok(*i as f64),
        Some(Data::String(s)) => s.trim().parse().map_err(|_| ArtifactError::BadScore {
            row,
            value: s.clone(),
        }),
        other => Err(ArtifactError::BadScore {
            row,
            value: other.map(|c| c.to_string()).unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::fs;

    #[test]
    fn test_load_skips_excluded_language_and_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_sentiments.csv");
        fs::write(
            &path,
            "titre,url,langue,score,sentiment,parole\n\
             La Bohème,https://x.test/1,fr,0.8,Positif,je vous parle\n\
             Ave Maria,https://x.test/2,la,0.1,Neutre,ave maria\n\
             She,https://x.test/3,en,-0.4,Négatif,\"she, may be\"\n",
        )
        .unwrap();

        let songs = load_songs(&path).unwrap();

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].titre, "La Bohème");
        assert_eq!(songs[1].parole, "she, may be");
        assert!((songs[1].score + 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b_sentiments.csv");
        fs::write(&path, "titre,score\nA,0.5\n").unwrap();

        let err = load_songs(&path).unwrap_err();
        let root = err.downcast_ref::<ArtifactError>().unwrap();
        assert_eq!(
            root,
            &ArtifactError::MissingColumns(vec!["langue".into(), "sentiment".into(), "parole".into()])
        );
    }

    #[test]
    fn test_load_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_sentiments.xlsx");

        // Same layout as a pandas export: unnamed index column first.
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in ["", "titre", "url", "langue", "score", "sentiment", "parole"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        let rows = [
            ("La Bohème", "fr", 0.8, "Positif", "je vous parle"),
            ("Ave Maria", "la", 0.1, "Neutre", "ave maria"),
            ("She", "en", -0.4, "Négatif", "she, may be"),
        ];
        for (i, (titre, langue, score, sentiment, parole)) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            sheet.write_number(r, 0, i as f64).unwrap();
            sheet.write_string(r, 1, *titre).unwrap();
            sheet.write_string(r, 2, "https://x.test/").unwrap();
            sheet.write_string(r, 3, *langue).unwrap();
            sheet.write_number(r, 4, *score).unwrap();
            sheet.write_string(r, 5, *sentiment).unwrap();
            sheet.write_string(r, 6, *parole).unwrap();
        }
        workbook.save(&path).unwrap();

        let songs = load_songs(&path).unwrap();

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].titre, "La Bohème");
        assert_eq!(songs[0].langue, "fr");
        assert_eq!(songs[1].sentiment, "Négatif");
        assert_eq!(songs[1].parole, "she, may be");
        assert!((songs[1].score + 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_workbook_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b_sentiments.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "titre").unwrap();
        sheet.write_string(0, 1, "score").unwrap();
        workbook.save(&path).unwrap();

        let err = load_songs(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ArtifactError>(),
            Some(&ArtifactError::MissingColumns(vec![
                "langue".into(),
                "sentiment".into(),
                "parole".into()
            ]))
        );
    }

    #[test]
    fn test_cell_score() {
        assert_eq!(cell_score(Some(&Data::Float(0.5)), 2), Ok(0.5));
        assert_eq!(cell_score(Some(&Data::Int(-1)), 2), Ok(-1.0));
        assert_eq!(cell_score(Some(&Data::String(" 0.25 ".into())), 2), Ok(0.25));
        assert_eq!(
            cell_score(Some(&Data::Empty), 7),
            Err(ArtifactError::BadScore { row: 7, value: String::new() })
        );
    }
}
