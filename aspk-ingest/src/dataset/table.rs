//! Column-preserving table access for in-place caption edits

use super::output::temp_path;
use super::DatasetFormat;
use crate::error::DatasetError;
use serde_json::{Map, Value};
use std::io::{BufRead, Write};
use std::path::Path;

/// A dataset whose columns are kept verbatim; only `caption` is edited
#[derive(Debug, Clone)]
pub enum CaptionTable {
    Csv {
        headers: csv::StringRecord,
        caption_column: usize,
        rows: Vec<csv::StringRecord>,
    },
    JsonLines(Vec<Map<String, Value>>),
}

impl CaptionTable {
    /// Read a table that already carries a `caption` column
    pub fn read(path: &Path) -> Result<Self, DatasetError> {
        Self::read_inner(path, false)
    }

    /// Read a table, appending an empty `caption` column to CSV input that
    /// has none
    pub fn read_adding_caption(path: &Path) -> Result<Self, DatasetError> {
        Self::read_inner(path, true)
    }

    fn read_inner(path: &Path, add_caption: bool) -> Result<Self, DatasetError> {
        match DatasetFormat::from_path(path)? {
            DatasetFormat::Csv => {
                let mut reader = csv::Reader::from_path(path)?;
                let mut headers = reader.headers()?.clone();
                let mut rows = reader.records().collect::<Result<Vec<_>, _>>()?;

                let caption_column = match headers.iter().position(|h| h == "caption") {
                    Some(column) => column,
                    None if add_caption => {
                        headers.push_field("caption");
                        for row in &mut rows {
                            row.push_field("");
                        }
                        headers.len() - 1
                    }
                    None => {
                        return Err(DatasetError::Schema {
                            row: 0,
                            field: "caption",
                        })
                    }
                };

                Ok(Self::Csv {
                    headers,
                    caption_column,
                    rows,
                })
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
                Ok(Self::JsonLines(rows))
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Csv { rows, .. } => rows.len(),
            Self::JsonLines(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Caption of row `index`; empty when the cell is missing
    pub fn caption(&self, index: usize) -> &str {
        match self {
            Self::Csv {
                caption_column,
                rows,
                ..
            } => rows
                .get(index)
                .and_then(|r| r.get(*caption_column))
                .unwrap_or(""),
            Self::JsonLines(rows) => rows
                .get(index)
                .and_then(|r| r.get("caption"))
                .and_then(Value::as_str)
                .unwrap_or(""),
        }
    }

    /// Any column of row `index` as text; empty when missing or null
    pub fn field(&self, index: usize, name: &str) -> String {
        match self {
            Self::Csv { headers, rows, .. } => headers
                .iter()
                .position(|h| h == name)
                .and_then(|column| rows.get(index).and_then(|r| r.get(column)))
                .unwrap_or("")
                .to_string(),
            Self::JsonLines(rows) => match rows.get(index).and_then(|r| r.get(name)) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        }
    }

    pub fn set_caption(&mut self, index: usize, caption: &str) {
        match self {
            Self::Csv {
                caption_column,
                rows,
                ..
            } => {
                if let Some(row) = rows.get_mut(index) {
                    let mut updated = csv::StringRecord::new();
                    for (col, field) in row.iter().enumerate() {
                        updated.push_field(if col == *caption_column { caption } else { field });
                    }
                    *row = updated;
                }
            }
            Self::JsonLines(rows) => {
                if let Some(row) = rows.get_mut(index) {
                    row.insert("caption".to_string(), Value::String(caption.to_string()));
                }
            }
        }
    }

    /// Write the table to `path` atomically, in `path`'s format
    pub fn write(&self, path: &Path) -> Result<(), DatasetError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(path);

        match (self, DatasetFormat::from_path(path)?) {
            (Self::Csv { headers, rows, .. }, DatasetFormat::Csv) => {
                let mut writer = csv::Writer::from_path(&tmp)?;
                writer.write_record(headers)?;
                for row in rows {
                    writer.write_record(row)?;
                }
                writer.flush()?;
            }
            (Self::JsonLines(rows), DatasetFormat::JsonLines) => {
                let mut writer = std::io::BufWriter::new(std::fs::File::create(&tmp)?);
                for (index, row) in rows.iter().enumerate() {
                    serde_json::to_writer(&mut writer, row).map_err(|source| {
                        DatasetError::Json {
                            line: index + 1,
                            source,
                        }
                    })?;
                    writer.write_all(b"\n")?;
                }
                writer.flush()?;
            }
            _ => {
                return Err(DatasetError::Format(format!(
                    "{} must use the input's format",
                    path.display()
                )))
            }
        }

        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_csv_edit_preserves_other_columns() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("watkins.csv");
        std::fs::write(
            &input,
            "id,caption,path\n7,\"Whale, from CD 3\",a.wav\n8,Seal trills,b.wav\n",
        )
        .unwrap();

        let mut table = CaptionTable::read(&input).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.caption(0), "Whale, from CD 3");

        table.set_caption(0, "A whale moaning");
        let output = temp_dir.path().join("out.csv");
        table.write(&output).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content, "id,caption,path\n7,A whale moaning,a.wav\n8,Seal trills,b.wav\n");
    }

    #[test]
    fn test_csv_without_caption_column() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("bad.csv");
        std::fs::write(&input, "id,text\n1,x\n").unwrap();
        assert!(matches!(
            CaptionTable::read(&input),
            Err(DatasetError::Schema { field: "caption", .. })
        ));
    }

    #[test]
    fn test_jsonl_edit() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("rows.jsonl");
        std::fs::write(&input, "{\"caption\": \"old\", \"extra\": 1}\n").unwrap();

        let mut table = CaptionTable::read(&input).unwrap();
        table.set_caption(0, "new");
        table.write(&input).unwrap();

        let value: Value =
            serde_json::from_str(std::fs::read_to_string(&input).unwrap().trim()).unwrap();
        assert_eq!(value["caption"], "new");
        assert_eq!(value["extra"], 1);
    }

    #[test]
    fn test_missing_caption_column_appended_on_request() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("meta.csv");
        std::fs::write(&input, "path,species,num_animals\na.wav,Walrus,3\n").unwrap();

        let mut table = CaptionTable::read_adding_caption(&input).unwrap();
        assert_eq!(table.caption(0), "");
        assert_eq!(table.field(0, "species"), "Walrus");
        assert_eq!(table.field(0, "behavior"), "");

        table.set_caption(0, "Walrus knocking");
        let output = temp_dir.path().join("out.csv");
        table.write(&output).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "path,species,num_animals,caption\na.wav,Walrus,3,Walrus knocking\n"
        );
    }

    #[test]
    fn test_jsonl_numeric_field_as_text() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("meta.jsonl");
        std::fs::write(
            &input,
            "{\"species\": \"Walrus\", \"num_animals\": 2, \"notes\": null}\n",
        )
        .unwrap();

        let table = CaptionTable::read_adding_caption(&input).unwrap();
        assert_eq!(table.field(0, "num_animals"), "2");
        assert_eq!(table.field(0, "notes"), "");
    }
}
