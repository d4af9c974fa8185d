//! # medclass-ml: biomedical abstract classification
//!
//! Turns `{title, abstract, group}` records into numeric features and trains a
//! multi-class classifier on them, one background run at a time.
//!
//! ## Pipeline
//!
//! 1. **Data**: load a corpus through a [`data::DatasetSource`], validate it
//!    into [`data::Document`]s
//! 2. **Text**: normalize titles and abstracts with a [`text::NormalizerChain`]
//! 3. **Features**: TF-IDF text vectors, metadata vectors and multi-label
//!    indicators from a [`features::FeatureExtractor`]
//! 4. **Training**: a [`training::TrainingJob`] drives the steps and publishes
//!    progress to a [`training::StatusBoard`]

// Foundation
pub mod config;
pub mod error;
pub mod persistence;

// Data and features
pub mod data;
pub mod features;
pub mod text;

// Training
pub mod algorithms;
pub mod training;

// Re-exports
pub use config::{MedclassConfig, load_config};
pub use error::{FeatureExtractionError, MlError, ValidationError};
pub use training::{TrainingJob, TrainingSettings, TrainingStatus};
