//! Numeric features: TF-IDF text vectors, metadata vectors and label encoding.

pub mod extractor;
pub mod labels;
pub mod matrix;
pub mod metadata;
pub mod processed;
pub mod vectorizer;

pub use extractor::{FeatureExtractor, FeatureKind, TextFeatures};
pub use labels::{LabelEncoding, LabelOrder, MultiLabelEncoder, UnknownLabel};
pub use matrix::FeatureMatrix;
pub use metadata::{METADATA_FEATURES, METADATA_WIDTH, metadata_row};
pub use processed::ProcessedCorpus;
pub use vectorizer::{TfidfVectorizer, VectorizerParams};
