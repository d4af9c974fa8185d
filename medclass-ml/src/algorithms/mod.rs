//! Built-in trainable classifiers.

pub mod centroid;

pub use centroid::{CentroidParams, NearestCentroidClassifier};
