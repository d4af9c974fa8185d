//! Corpus ingestion: loading, validation, analysis and partitioning.

pub mod analysis;
pub mod document;
pub mod source;
pub mod split;
pub mod validate;

pub use analysis::DatasetAnalysis;
pub use document::{Document, DocumentText, NormalizedDocument, RawRecord, split_labels};
pub use source::{CsvSource, DataSourceInfo, DataTable, DatasetSource, InMemorySource, LatestCsvSource};
pub use split::TrainTestSplit;
pub use validate::{raw_records, validate_table};
