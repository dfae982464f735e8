//! Input dataset loading
//!
//! Accepts scraped / API-sourced tables in CSV or JSON Lines. Column names
//! vary between sources, so the common spellings are accepted as aliases.
//! Rows are validated into fixed-schema [`Record`]s here and nowhere else.

use super::DatasetFormat;
use crate::error::DatasetError;
use crate::models::Record;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

/// Licenses the dataset may be redistributed under
pub const ALLOWED_LICENSES: [&str; 3] = ["CC0", "CC-BY", "CC-BY-NC"];

/// One loosely-typed input row, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(default, alias = "species", alias = "common_name")]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "sound_url")]
    pub url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(
        default,
        alias = "speciesCount",
        alias = "count",
        deserialize_with = "csv::invalid_option"
    )]
    pub species_count: Option<u64>,
}

/// Prior observation counts per label
#[derive(Debug, Clone, Default)]
pub struct SpeciesCounts {
    counts: HashMap<String, u64>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    species: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    count: Option<u64>,
}

impl SpeciesCounts {
    /// Load a `species,count` CSV table
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut counts = HashMap::new();
        for row in reader.deserialize::<CountRow>() {
            let row = row?;
            counts.insert(row.species, row.count.unwrap_or(0));
        }
        info!(path = %path.display(), labels = counts.len(), "Loaded species counts");
        Ok(Self { counts })
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            counts: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Count for `label`, 0 when unknown
    pub fn get(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

/// Read every row of `path` without validation
pub fn read_raw_rows(path: &Path) -> Result<Vec<RawRow>, DatasetError> {
    match DatasetFormat::from_path(path)? {
        DatasetFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)?;
            let rows = reader
                .deserialize::<RawRow>()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }
        DatasetFormat::JsonLines => {
            let file = std::fs::File::open(path)?;
            let mut rows = Vec::new();
            for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let row = serde_json::from_str(&line).map_err(|source| DatasetError::Json {
                    line: index + 1,
                    source,
                })?;
                rows.push(row);
            }
            Ok(rows)
        }
    }
}

/// Whether a row may be ingested: licensed for reuse and pointing at audio
///
/// Rows without license information are not filtered.
pub fn is_applicable(row: &RawRow) -> bool {
    match row.license.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(license) => {
            ALLOWED_LICENSES.contains(&license)
                && row.url.as_deref().is_some_and(|u| !u.trim().is_empty())
        }
    }
}

/// Keep only applicable rows, preserving their original indices
pub fn filter_applicable(rows: Vec<RawRow>) -> Vec<(usize, RawRow)> {
    let before = rows.len();
    let kept: Vec<(usize, RawRow)> = rows
        .into_iter()
        .enumerate()
        .filter(|(_, row)| is_applicable(row))
        .collect();
    info!(before, after = kept.len(), "Applied license filter");
    kept
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validate one row into a [`Record`], joining its species count
pub fn to_record(
    row_index: usize,
    row: RawRow,
    counts: &SpeciesCounts,
) -> Result<Record, DatasetError> {
    let label = non_blank(row.label).ok_or(DatasetError::Schema {
        row: row_index,
        field: "label",
    })?;
    let url = non_blank(row.url).ok_or(DatasetError::Schema {
        row: row_index,
        field: "url",
    })?;

    let species_count = match counts.get(&label) {
        0 => row.species_count.unwrap_or(0),
        n => n,
    };

    Ok(Record {
        id: row_index,
        label,
        description: non_blank(row.description),
        url,
        current_caption: non_blank(row.caption),
        species_count,
        scientific_name: non_blank(row.scientific_name),
    })
}

/// Load, filter and validate the input dataset
///
/// Fails on the first row missing a required field.
pub fn load_records(path: &Path, counts: &SpeciesCounts) -> Result<Vec<Record>, DatasetError> {
    let rows = read_raw_rows(path)?;
    let records = filter_applicable(rows)
        .into_iter()
        .map(|(index, row)| to_record(index, row, counts))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(path = %path.display(), records = records.len(), "Validated input records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(label: Option<&str>, url: Option<&str>, license: Option<&str>) -> RawRow {
        RawRow {
            label: label.map(String::from),
            url: url.map(String::from),
            license: license.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_license_filter() {
        assert!(is_applicable(&row(Some("a"), Some("http://x/1.mp3"), Some("CC-BY"))));
        assert!(is_applicable(&row(Some("a"), Some("http://x/1.mp3"), None)));
        assert!(!is_applicable(&row(Some("a"), Some("http://x/1.mp3"), Some("CC-BY-ND"))));
        assert!(!is_applicable(&row(Some("a"), None, Some("CC0"))));
    }

    #[test]
    fn test_missing_url_is_schema_error() {
        let err = to_record(4, row(Some("Gray Seal"), Some("  "), None), &SpeciesCounts::default())
            .unwrap_err();
        assert!(matches!(err, DatasetError::Schema { row: 4, field: "url" }));
    }

    #[test]
    fn test_counts_join_by_label() {
        let counts = SpeciesCounts::from_pairs([("Gray Seal", 42)]);
        let record = to_record(0, row(Some("Gray Seal"), Some("http://x/1.mp3"), None), &counts)
            .unwrap();
        assert_eq!(record.species_count, 42);

        let record = to_record(1, row(Some("Harp Seal"), Some("http://x/2.mp3"), None), &counts)
            .unwrap();
        assert_eq!(record.species_count, 0);
    }

    #[test]
    fn test_csv_aliases_and_extra_columns() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("inat.csv");
        std::fs::write(
            &path,
            ",common_name,description,sound_url,license,caption\n\
             0,Gray Seal,barking on rocks,https://x/1.m4a,CC0,A gray seal barking\n\
             1,Harp Seal,,https://x/2.m4a,CC-BY-SA,\n\
             2,Bearded Seal,,https://x/3.m4a,CC-BY-NC,\n",
        )
        .unwrap();

        let records = load_records(&path, &SpeciesCounts::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, "Gray Seal");
        assert_eq!(records[0].description.as_deref(), Some("barking on rocks"));
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].description, None);
        assert_eq!(records[1].current_caption, None);
    }

    #[test]
    fn test_jsonl_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rows.jsonl");
        std::fs::write(
            &path,
            "{\"species\": \"Gray Seal\", \"url\": \"https://x/1.wav\", \"speciesCount\": 7}\n\n\
             {\"label\": \"Harp Seal\", \"url\": \"https://x/2.wav\"}\n",
        )
        .unwrap();

        let records = load_records(&path, &SpeciesCounts::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].species_count, 7);
        assert_eq!(records[1].label, "Harp Seal");
    }

    #[test]
    fn test_species_counts_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counts.csv");
        std::fs::write(&path, "species,count\nGray Seal,31\nHarp Seal,\n").unwrap();

        let counts = SpeciesCounts::load(&path).unwrap();
        assert_eq!(counts.get("Gray Seal"), 31);
        assert_eq!(counts.get("Harp Seal"), 0);
        assert_eq!(counts.get("Walrus"), 0);
    }
}
