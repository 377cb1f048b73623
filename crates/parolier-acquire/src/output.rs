use anyhow::{Context, Result};
use parolier_model::{songs_file_name, ResultSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Write the accumulated records as `<output_dir>/<subject slug>.csv`.
///
/// Columns are `title,url,lyrics`, UTF-8, one row per record, no index
/// column. When there are no records nothing is written and `None` is
/// returned.
pub fn write_songs(results: &ResultSet, output_dir: &str, subject: &str) -> Result<Option<PathBuf>> {
    if results.is_empty() {
        tracing::info!("No songs collected, nothing saved");
        return Ok(None);
    }

    let dir = Path::new(output_dir);
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(songs_file_name(subject));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in results {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), records = results.len(), "Saved songs");
    Ok(Some(path))
}
