//! How multi-label documents become single-label training targets.

use crate::data::document::LABEL_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Train on each document's first label.
    #[default]
    FirstLabel,
    /// Train on the sorted, `|`-joined label combination.
    LabelSet,
}

impl LabelPolicy {
    /// Training target for one document's labels.
    pub fn target(self, labels: &[String]) -> String {
        match self {
            Self::FirstLabel => labels.first().cloned().unwrap_or_default(),
            Self::LabelSet => {
                let sorted: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
                sorted
                    .into_iter()
                    .collect::<Vec<_>>()
                    .join(&LABEL_SEPARATOR.to_string())
            }
        }
    }

    /// The sorted class list that confusion matrices are indexed by.
    ///
    /// Under `FirstLabel` this is the whole label vocabulary, so labels that
    /// never occur first still get a row and column.
    pub fn canonical_classes(self, targets: &[String], label_vocabulary: &[String]) -> Vec<String> {
        let classes: BTreeSet<&String> = match self {
            Self::FirstLabel => label_vocabulary.iter().chain(targets).collect(),
            Self::LabelSet => targets.iter().collect(),
        };
        classes.into_iter().cloned().collect()
    }
}
