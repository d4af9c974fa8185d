//! Text normalization as a chain of `text -> text` stages.

pub mod chain;
pub mod stages;

pub use chain::NormalizerChain;
pub use stages::{AbbreviationExpander, Cleaner, StopWordFilter, TextStage};
