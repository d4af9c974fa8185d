//! TF-IDF vectorizer over n-grams of word tokens.

use crate::error::FeatureExtractionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

/// Tokens are runs of two or more word characters.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// Vectorizer hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    pub max_features: usize,
    /// Inclusive `(min, max)` n-gram lengths.
    pub ngram_range: (usize, usize),
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in.
    pub max_df: f64,
    pub stop_words: Vec<String>,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: 5000,
            ngram_range: (1, 2),
            min_df: 1,
            max_df: 1.0,
            stop_words: Vec::new(),
        }
    }
}

impl VectorizerParams {
    pub fn validate(&self) -> Result<(), FeatureExtractionError> {
        if self.max_features == 0 {
            return Err(FeatureExtractionError::InvalidMaxFeatures);
        }
        let (min, max) = self.ngram_range;
        if min == 0 || min > max {
            return Err(FeatureExtractionError::InvalidNgramRange { min, max });
        }
        if self.min_df == 0 || !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(self.df_error());
        }
        Ok(())
    }

    fn df_error(&self) -> FeatureExtractionError {
        FeatureExtractionError::InvalidDocumentFrequency {
            min_df: self.min_df,
            max_df: self.max_df,
        }
    }
}

/// A fitted (or not yet fitted) TF-IDF vectorizer.
///
/// Columns are the retained terms in alphabetical order. Weights are raw term
/// counts times the smoothed idf `ln((1 + n) / (1 + df)) + 1`, and every row
/// is L2-normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    #[serde(skip)]
    stop_set: Option<HashSet<String>>,
}

impl TfidfVectorizer {
    pub fn new(params: VectorizerParams) -> Self {
        Self {
            params,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
            stop_set: None,
        }
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    /// Number of output columns.
    pub fn width(&self) -> usize {
        self.vocabulary.len()
    }

    /// Terms in column order.
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabulary.keys().cloned().collect()
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Learn the vocabulary and idf weights from `texts`, replacing any
    /// previous fit.
    pub fn fit(&mut self, texts: &[String]) -> Result<(), FeatureExtractionError> {
        self.params.validate()?;
        if texts.is_empty() {
            return Err(FeatureExtractionError::EmptyInput {
                what: "text features",
            });
        }

        let n_docs = texts.len();
        let max_doc_count = self.params.max_df * n_docs as f64;
        if max_doc_count < self.params.min_df as f64 {
            return Err(self.params.df_error());
        }

        let stop = self.stop_words();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut corpus_freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let terms = analyze(text, self.params.ngram_range, &stop);
            let mut unique = HashSet::new();
            for term in terms {
                *corpus_freq.entry(term.clone()).or_default() += 1;
                if unique.insert(term.clone()) {
                    *doc_freq.entry(term).or_default() += 1;
                }
            }
        }

        let mut candidates: Vec<(String, usize)> = corpus_freq
            .into_iter()
            .filter(|(term, _)| {
                let df = doc_freq[term];
                df >= self.params.min_df && df as f64 <= max_doc_count
            })
            .collect();
        if candidates.is_empty() {
            return Err(FeatureExtractionError::EmptyVocabulary);
        }
        candidates.sort_by(|(ta, fa), (tb, fb)| fb.cmp(fa).then_with(|| ta.cmp(tb)));
        candidates.truncate(self.params.max_features);

        let mut terms: Vec<String> = candidates.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let n = n_docs as f64;
        self.idf = terms
            .iter()
            .map(|term| ((1.0 + n) / (1.0 + doc_freq[term] as f64)).ln() + 1.0)
            .collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term, idx))
            .collect();
        self.stop_set = Some(stop);
        Ok(())
    }

    /// Project `texts` onto the fitted vocabulary.
    ///
    /// Returns the rows and the number of analyzed terms that had no column.
    pub fn transform(&self, texts: &[String]) -> Result<(Vec<Vec<f64>>, usize), FeatureExtractionError> {
        if !self.is_fitted() {
            return Err(FeatureExtractionError::NotFitted { what: "vectorizer" });
        }
        let stop = match &self.stop_set {
            Some(set) => set.clone(),
            None => self.stop_words(),
        };

        let mut out_of_vocabulary = 0;
        let rows = texts
            .iter()
            .map(|text| {
                let mut row = vec![0.0; self.width()];
                for term in analyze(text, self.params.ngram_range, &stop) {
                    match self.vocabulary.get(&term) {
                        Some(&idx) => row[idx] += 1.0,
                        None => out_of_vocabulary += 1,
                    }
                }
                for (value, idf) in row.iter_mut().zip(&self.idf) {
                    *value *= idf;
                }
                l2_normalize(&mut row);
                row
            })
            .collect();
        Ok((rows, out_of_vocabulary))
    }

    fn stop_words(&self) -> HashSet<String> {
        self.params
            .stop_words
            .iter()
            .map(|w| w.to_lowercase())
            .collect()
    }
}

/// Lowercase, tokenize, drop stop words, then emit every n-gram in range.
fn analyze(text: &str, (min_n, max_n): (usize, usize), stop: &HashSet<String>) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !stop.contains(*t))
        .collect();

    let mut terms = Vec::new();
    for n in min_n..=max_n.min(tokens.len()) {
        terms.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    terms
}

fn l2_normalize(row: &mut [f64]) {
    let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in row.iter_mut() {
            *value /= norm;
        }
    }
}
