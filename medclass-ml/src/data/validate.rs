//! Corpus validation: turn a raw table into documents or explain why not.

use crate::data::document::{Document, RawRecord};
use crate::data::source::DataTable;
use crate::error::ValidationError;

/// Columns every corpus must provide.
pub const REQUIRED_COLUMNS: [&str; 3] = ["title", "abstract", "group"];

/// Validate `table` and convert each row into a [`Document`].
///
/// Checks run cheapest-first and stop at the first failing kind; each error
/// lists every offending row for that kind.
pub fn validate_table(table: &DataTable) -> Result<Vec<Document>, ValidationError> {
    let indices = required_indices(table)?;

    if table.rows.is_empty() {
        return Err(ValidationError::EmptyCorpus);
    }

    for (name, &col) in REQUIRED_COLUMNS.iter().zip(indices.iter()) {
        let rows: Vec<usize> = (0..table.row_count())
            .filter(|&row| {
                let cell = table.cell(row, col);
                !cell.is_null() && !cell.is_string()
            })
            .collect();
        if !rows.is_empty() {
            return Err(ValidationError::NonTextColumn {
                column: name.to_string(),
                rows,
            });
        }
    }

    for (name, &col) in REQUIRED_COLUMNS.iter().zip(indices.iter()) {
        let rows: Vec<usize> = (0..table.row_count())
            .filter(|&row| table.cell(row, col).is_null())
            .collect();
        if !rows.is_empty() {
            return Err(ValidationError::NullValues {
                column: name.to_string(),
                rows,
            });
        }
    }

    let [title_col, abstract_col, group_col] = indices;
    let documents: Vec<Document> = (0..table.row_count())
        .map(|row| {
            Document::from_group(
                row,
                text_at(table, row, title_col),
                text_at(table, row, abstract_col),
                text_at(table, row, group_col),
            )
        })
        .collect();

    let unlabeled: Vec<usize> = documents
        .iter()
        .filter(|doc| doc.labels.is_empty())
        .map(|doc| doc.id)
        .collect();
    if !unlabeled.is_empty() {
        return Err(ValidationError::EmptyLabels { rows: unlabeled });
    }

    Ok(documents)
}

/// Read rows leniently: missing columns or non-text cells become `None`.
pub fn raw_records(table: &DataTable) -> Vec<RawRecord> {
    let lookup = |row: usize, name: &str| {
        table
            .column_index(name)
            .and_then(|col| table.cell(row, col).as_str())
            .map(str::to_string)
    };
    (0..table.row_count())
        .map(|row| RawRecord {
            title: lookup(row, "title"),
            abstract_text: lookup(row, "abstract"),
            group: lookup(row, "group"),
        })
        .collect()
}

fn required_indices(table: &DataTable) -> Result<[usize; 3], ValidationError> {
    let found: Vec<Option<usize>> = REQUIRED_COLUMNS
        .iter()
        .map(|name| table.column_index(name))
        .collect();
    match found.as_slice() {
        [Some(t), Some(a), Some(g)] => Ok([*t, *a, *g]),
        _ => Err(ValidationError::MissingColumns {
            missing: REQUIRED_COLUMNS
                .iter()
                .zip(&found)
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_string())
                .collect(),
            found: table.columns.clone(),
        }),
    }
}

fn text_at(table: &DataTable, row: usize, col: usize) -> &str {
    table.cell(row, col).as_str().unwrap_or_default()
}
