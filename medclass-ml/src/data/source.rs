//! Dataset adapters: load a corpus into an in-memory table.

use crate::error::MlError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A loaded tabular corpus. Cells are JSON values; `Null` means missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build a `title`/`abstract`/`group` table from string triples.
    pub fn from_records<'a>(records: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let rows = records
            .into_iter()
            .map(|(title, abstract_text, group)| {
                vec![
                    serde_json::Value::String(title.to_string()),
                    serde_json::Value::String(abstract_text.to_string()),
                    serde_json::Value::String(group.to_string()),
                ]
            })
            .collect();
        Self {
            columns: vec!["title".into(), "abstract".into(), "group".into()],
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (`row`, `column`); out-of-range cells read as `Null`.
    pub fn cell(&self, row: usize, column: usize) -> &serde_json::Value {
        static NULL: serde_json::Value = serde_json::Value::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }
}

/// Information about where a corpus came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
}

/// Capability to load a corpus.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn load(&self) -> Result<DataTable, MlError>;

    fn source_info(&self) -> DataSourceInfo;
}

// ---------------------------------------------------------------------------
// InMemorySource
// ---------------------------------------------------------------------------

/// A corpus already held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    table: DataTable,
}

impl InMemorySource {
    pub fn new(table: DataTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl DatasetSource for InMemorySource {
    async fn load(&self) -> Result<DataTable, MlError> {
        Ok(self.table.clone())
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "memory".to_string(),
            location: format!("{} rows", self.table.row_count()),
            accessed_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// A single delimited text file with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: char,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }
}

#[async_trait]
impl DatasetSource for CsvSource {
    async fn load(&self) -> Result<DataTable, MlError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            MlError::dataset(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        let table = parse_delimited(&content, self.delimiter)?;
        tracing::debug!(
            path = %self.path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Loaded CSV corpus"
        );
        Ok(table)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// LatestCsvSource
// ---------------------------------------------------------------------------

/// Loads the most recently modified `.csv` file in a directory.
#[derive(Debug, Clone)]
pub struct LatestCsvSource {
    pub dir: PathBuf,
    pub delimiter: char,
}

impl LatestCsvSource {
    pub fn new(dir: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            dir: dir.into(),
            delimiter,
        }
    }

    /// Path of the newest CSV file, if any.
    pub async fn locate(&self) -> Result<PathBuf, MlError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            MlError::dataset(format!(
                "Corpus directory {} not readable: {e}",
                self.dir.display()
            ))
        })?;

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_csv(&path) {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            let is_newer = newest.as_ref().is_none_or(|(best, best_path)| {
                modified > *best || (modified == *best && path > *best_path)
            });
            if is_newer {
                newest = Some((modified, path));
            }
        }

        newest.map(|(_, path)| path).ok_or_else(|| {
            MlError::dataset(format!("No CSV corpus found in {}", self.dir.display()))
        })
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

#[async_trait]
impl DatasetSource for LatestCsvSource {
    async fn load(&self) -> Result<DataTable, MlError> {
        let path = self.locate().await?;
        tracing::info!(path = %path.display(), "Using latest corpus");
        CsvSource::new(path, self.delimiter).load().await
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv_dir".to_string(),
            location: self.dir.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse delimited text with a header row and double-quote escaping.
///
/// Quoted fields may contain the delimiter, newlines and `""` escapes. Empty
/// unquoted cells and missing trailing cells become `Null`; a row with more
/// cells than the header is rejected.
pub fn parse_delimited(content: &str, delimiter: char) -> Result<DataTable, MlError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut records = split_records(content, delimiter).into_iter();

    let header = records
        .next()
        .ok_or_else(|| MlError::dataset("Empty CSV file"))?;
    let columns: Vec<String> = header
        .into_iter()
        .map(|(cell, _)| cell.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (record_idx, record) in records.enumerate() {
        if record.len() == 1 && record[0].0.trim().is_empty() && !record[0].1 {
            continue;
        }
        if record.len() > columns.len() {
            return Err(MlError::dataset(format!(
                "Record {} has {} fields, header has {}",
                record_idx + 1,
                record.len(),
                columns.len()
            )));
        }
        let mut row: Vec<serde_json::Value> = record
            .into_iter()
            .map(|(cell, quoted)| {
                if !quoted && cell.trim().is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(cell)
                }
            })
            .collect();
        row.resize(columns.len(), serde_json::Value::Null);
        rows.push(row);
    }

    Ok(DataTable { columns, rows })
}

/// Split into records of `(cell, was_quoted)`.
fn split_records(content: &str, delimiter: char) -> Vec<Vec<(String, bool)>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    cell.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' if cell.trim().is_empty() => {
                cell.clear();
                quoted = true;
                in_quotes = true;
            }
            c if c == delimiter => {
                record.push((std::mem::take(&mut cell), quoted));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push((std::mem::take(&mut cell), quoted));
                quoted = false;
                records.push(std::mem::take(&mut record));
            }
            _ => cell.push(c),
        }
    }

    if !cell.is_empty() || quoted || !record.is_empty() {
        record.push((cell, quoted));
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_semicolon_with_quotes() {
        let content = "title;abstract;group\n\"A; B\";\"He said \"\"hi\"\"\nnext line\";Cardiovascular\n";
        let table = parse_delimited(content, ';').unwrap();
        assert_eq!(table.columns, vec!["title", "abstract", "group"]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0][0], json!("A; B"));
        assert_eq!(table.rows[0][1], json!("He said \"hi\"\nnext line"));
        assert_eq!(table.rows[0][2], json!("Cardiovascular"));
    }

    #[test]
    fn test_parse_empty_cells_are_null() {
        let table = parse_delimited("title,abstract,group\r\nx,,Oncological\r\ny\r\n", ',').unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0][1], serde_json::Value::Null);
        assert_eq!(table.rows[1][1], serde_json::Value::Null);
        assert_eq!(table.rows[1][2], serde_json::Value::Null);
    }

    #[test]
    fn test_parse_quoted_empty_is_string() {
        let table = parse_delimited("title;abstract;group\n\"\";x;y", ';').unwrap();
        assert_eq!(table.rows[0][0], json!(""));
    }

    #[test]
    fn test_parse_rejects_extra_fields() {
        let err = parse_delimited("a;b\n1;2;3\n", ';').unwrap_err();
        assert!(err.to_string().contains("3 fields"));
    }

    #[test]
    fn test_parse_skips_blank_lines_and_bom() {
        let table = parse_delimited("\u{feff}title;abstract;group\n\nt;a;g\n\n", ';').unwrap();
        assert_eq!(table.columns[0], "title");
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_parse_empty_file() {
        assert!(parse_delimited("", ';').is_err());
    }

    #[tokio::test]
    async fn test_csv_source_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.csv");
        std::fs::write(&path, "title;abstract;group\nt;a;Neurological\n").unwrap();
        let table = CsvSource::new(&path, ';').load().await.unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, 2), &json!("Neurological"));
        assert_eq!(table.cell(5, 5), &serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_latest_csv_source_picks_newest() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("a_old.csv");
        let new = dir.path().join("b_new.csv");
        std::fs::write(&old, "title;abstract;group\nold;a;X\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(&new, "title;abstract;group\nnew;a;Y\n").unwrap();
        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let source = LatestCsvSource::new(dir.path(), ';');
        assert_eq!(source.locate().await.unwrap(), new);
        let table = source.load().await.unwrap();
        assert_eq!(table.cell(0, 0), &json!("new"));
    }

    #[tokio::test]
    async fn test_latest_csv_source_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = LatestCsvSource::new(dir.path(), ';').load().await.unwrap_err();
        assert!(err.to_string().contains("No CSV corpus"));
    }
}
