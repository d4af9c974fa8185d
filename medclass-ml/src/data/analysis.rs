//! Corpus analysis report: label distribution, text statistics and data quality.

use crate::data::document::split_labels;
use crate::data::source::DataTable;
use crate::data::validate::{REQUIRED_COLUMNS, raw_records};
use crate::error::MlError;
use crate::persistence::atomic_write_json;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// How many distinct label combinations are listed as examples.
const COMBINATION_EXAMPLES: usize = 10;

/// Full analysis of a loaded corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAnalysis {
    pub total_records: usize,
    pub columns: Vec<String>,
    pub labels: LabelAnalysis,
    /// Per label: documents carrying it and their share of the corpus.
    pub label_distribution: BTreeMap<String, LabelShare>,
    pub text: TextStatistics,
    pub quality: DataQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAnalysis {
    pub unique_combinations: usize,
    pub single_label_count: usize,
    pub multi_label_count: usize,
    pub single_label_percentage: f64,
    pub multi_label_percentage: f64,
    /// First distinct raw `group` values, in corpus order.
    pub combination_examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelShare {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStatistics {
    pub avg_title_length: f64,
    pub avg_abstract_length: f64,
    pub max_title_length: usize,
    pub max_abstract_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub missing_values: BTreeMap<String, usize>,
    pub duplicate_rows: usize,
    pub empty_strings: BTreeMap<String, usize>,
}

impl DatasetAnalysis {
    /// Analyze `table` without requiring it to pass validation.
    pub fn from_table(table: &DataTable) -> Self {
        let records = raw_records(table);
        let total = records.len();

        let mut single = 0;
        let mut multi = 0;
        let mut seen_groups = HashSet::new();
        let mut combination_examples = Vec::new();
        let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();

        for group in records.iter().filter_map(|r| r.group.as_deref()) {
            let unique: HashSet<String> = split_labels(group).into_iter().collect();
            if unique.len() > 1 {
                multi += 1;
            } else {
                single += 1;
            }
            if seen_groups.insert(group) && combination_examples.len() < COMBINATION_EXAMPLES {
                combination_examples.push(group.to_string());
            }
            for label in unique {
                *label_counts.entry(label).or_default() += 1;
            }
        }

        let label_distribution = label_counts
            .into_iter()
            .map(|(label, count)| {
                let share = LabelShare {
                    count,
                    percentage: percentage(count, total),
                };
                (label, share)
            })
            .collect();

        let title_lengths: Vec<usize> = records
            .iter()
            .filter_map(|r| r.title.as_deref())
            .map(|t| t.chars().count())
            .collect();
        let abstract_lengths: Vec<usize> = records
            .iter()
            .filter_map(|r| r.abstract_text.as_deref())
            .map(|a| a.chars().count())
            .collect();

        Self {
            total_records: total,
            columns: table.columns.clone(),
            labels: LabelAnalysis {
                unique_combinations: seen_groups.len(),
                single_label_count: single,
                multi_label_count: multi,
                single_label_percentage: percentage(single, total),
                multi_label_percentage: percentage(multi, total),
                combination_examples,
            },
            label_distribution,
            text: TextStatistics {
                avg_title_length: mean(&title_lengths),
                avg_abstract_length: mean(&abstract_lengths),
                max_title_length: title_lengths.iter().copied().max().unwrap_or(0),
                max_abstract_length: abstract_lengths.iter().copied().max().unwrap_or(0),
            },
            quality: data_quality(table),
        }
    }

    /// Write the report as pretty JSON.
    pub fn export(&self, path: &Path) -> Result<(), MlError> {
        atomic_write_json(path, self)?;
        tracing::info!(path = %path.display(), "Exported dataset analysis");
        Ok(())
    }
}

fn data_quality(table: &DataTable) -> DataQuality {
    let missing_values = table
        .columns
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let nulls = (0..table.row_count())
                .filter(|&row| table.cell(row, col).is_null())
                .count();
            (name.clone(), nulls)
        })
        .collect();

    let mut seen = HashSet::new();
    let duplicate_rows = table
        .rows
        .iter()
        .filter(|row| !seen.insert(serde_json::to_string(row).unwrap_or_default()))
        .count();

    let empty_strings = REQUIRED_COLUMNS
        .iter()
        .filter_map(|name| table.column_index(name).map(|col| (*name, col)))
        .map(|(name, col)| {
            let empty = (0..table.row_count())
                .filter(|&row| table.cell(row, col).as_str() == Some(""))
                .count();
            (name.to_string(), empty)
        })
        .collect();

    DataQuality {
        missing_values,
        duplicate_rows,
        empty_strings,
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}
