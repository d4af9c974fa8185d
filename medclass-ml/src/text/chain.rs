//! The normalizer chain: an ordered list of stages applied by one driver loop.

use crate::data::document::{Document, DocumentText, NormalizedDocument};
use crate::text::stages::{AbbreviationExpander, Cleaner, StopWordFilter, TextStage};

/// Ordered sequence of [`TextStage`]s, itself usable as a single stage.
pub struct NormalizerChain {
    stages: Vec<Box<dyn TextStage>>,
}

impl NormalizerChain {
    /// An empty chain (identity function).
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// clean → expand abbreviations → remove stop words.
    pub fn biomedical<S: AsRef<str>>(extra_stop_words: &[S]) -> Self {
        Self::new()
            .push(Cleaner)
            .push(AbbreviationExpander::new())
            .push(StopWordFilter::new(extra_stop_words))
    }

    /// The biomedical chain with caller-supplied abbreviations added to the
    /// default dictionary.
    pub fn with_additions<'a, S: AsRef<str>>(
        abbreviations: impl IntoIterator<Item = (&'a str, &'a str)>,
        extra_stop_words: &[S],
    ) -> Self {
        let mut expander = AbbreviationExpander::new();
        for (abbreviation, expansion) in abbreviations {
            expander.insert(abbreviation, expansion);
        }
        Self::new()
            .push(Cleaner)
            .push(expander)
            .push(StopWordFilter::new(extra_stop_words))
    }

    /// Append a stage after the existing ones.
    pub fn push(mut self, stage: impl TextStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run `text` through every stage in order.
    pub fn normalize(&self, text: &str) -> String {
        let mut current = text.to_string();
        for stage in &self.stages {
            current = stage.apply(&current);
        }
        current
    }

    /// Absent input normalizes to an empty string.
    pub fn normalize_opt(&self, text: Option<&str>) -> String {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }

    pub fn normalize_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|t| self.normalize(t.as_ref())).collect()
    }

    /// Apply the chain independently to the title and abstract of every document.
    pub fn normalize_documents(&self, documents: &[Document]) -> Vec<NormalizedDocument> {
        documents
            .iter()
            .map(|doc| NormalizedDocument {
                id: doc.id,
                normalized_title: self.normalize(&doc.title),
                normalized_abstract: self.normalize(&doc.abstract_text),
            })
            .collect()
    }

    /// Like [`Self::normalize_documents`] for rows whose fields may be absent;
    /// ids are positions in `records`.
    pub fn normalize_records<D: DocumentText>(&self, records: &[D]) -> Vec<NormalizedDocument> {
        records
            .iter()
            .enumerate()
            .map(|(id, record)| NormalizedDocument {
                id,
                normalized_title: self.normalize_opt(record.title()),
                normalized_abstract: self.normalize_opt(record.abstract_text()),
            })
            .collect()
    }
}

impl Default for NormalizerChain {
    fn default() -> Self {
        Self::biomedical::<&str>(&[])
    }
}

impl TextStage for NormalizerChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn apply(&self, text: &str) -> String {
        self.normalize(text)
    }
}

impl std::fmt::Debug for NormalizerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}
