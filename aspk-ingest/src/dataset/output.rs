//! Persisted output dataset
//!
//! Every write replaces the whole file through a temp file + rename, so a
//! reader (or a crashed run) only ever sees a complete snapshot.

use super::DatasetFormat;
use crate::error::DatasetError;
use crate::models::OutputRow;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tabular output columns: `species, caption, url, description, path`
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    species: &'a str,
    caption: &'a str,
    url: &'a str,
    description: &'a str,
    path: String,
}

impl<'a> From<&'a OutputRow> for CsvRow<'a> {
    fn from(row: &'a OutputRow) -> Self {
        Self {
            species: &row.label,
            caption: &row.caption,
            url: &row.url,
            description: row.description.as_deref().unwrap_or(""),
            path: row.asset_path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetWriter {
    path: PathBuf,
    format: DatasetFormat,
}

impl DatasetWriter {
    /// Writer for `path`, format chosen by extension
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let path = path.into();
        let format = DatasetFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the dataset with `rows`
    pub fn write_all(&self, rows: &[OutputRow]) -> Result<(), DatasetError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(&self.path);
        let result = match self.format {
            DatasetFormat::Csv => write_csv(&tmp, rows),
            DatasetFormat::JsonLines => write_jsonl(&tmp, rows),
        };
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }

        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), rows = rows.len(), "Dataset written");
        Ok(())
    }
}

/// Sibling temp file used for atomic replacement
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_csv(path: &Path, rows: &[OutputRow]) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(["species", "caption", "url", "description", "path"])?;
    }
    for row in rows {
        writer.serialize(CsvRow::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_jsonl(path: &Path, rows: &[OutputRow]) -> Result<(), DatasetError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    for (index, row) in rows.iter().enumerate() {
        serde_json::to_writer(&mut writer, row).map_err(|source| DatasetError::Json {
            line: index + 1,
            source,
        })?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CaptionSource;
    use tempfile::TempDir;

    fn output_row(i: usize) -> OutputRow {
        OutputRow {
            dataset_name: "inaturalist".to_string(),
            asset_path: PathBuf::from(format!("/audios/{}_0.wav", i)),
            caption: format!("caption, with comma {}", i),
            label: "Gray Seal".to_string(),
            description: None,
            url: format!("https://x/{}.m4a", i),
            needs_recaptioning: i % 2 == 0,
            caption_source: CaptionSource::Existing,
            scientific_caption: None,
        }
    }

    #[test]
    fn test_csv_has_expected_columns() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.csv");
        let writer = DatasetWriter::new(&path).unwrap();
        writer.write_all(&[output_row(1), output_row(2)]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["species", "caption", "url", "description", "path"]
        );
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][1], "caption, with comma 1");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_overwrite_replaces_previous_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("out.jsonl");
        let writer = DatasetWriter::new(&path).unwrap();

        writer.write_all(&[output_row(1), output_row(2), output_row(3)]).unwrap();
        writer.write_all(&[output_row(4)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<OutputRow> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows, vec![output_row(4)]);
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.csv");
        DatasetWriter::new(&path).unwrap().write_all(&[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim(),
            "species,caption,url,description,path"
        );
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(matches!(
            DatasetWriter::new("out.parquet"),
            Err(DatasetError::Format(_))
        ));
    }
}
