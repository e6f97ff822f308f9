//! The n-gram engine.
//!
//! Data flows leaf-first through the submodules:
//! tokenized lines → `trie` (one count trie per order) → `vocabulary`
//! (one shared vocabulary) → `smoothing` (add-one, per order, backed by
//! `fill`) → `interpolation` (weighted scoring) and `continuation`.

/// Interpolation weights and model configuration.
///
/// Weights validate themselves on construction and on deserialization.
pub mod config;

/// Continuation probability from distinct preceding contexts.
pub mod continuation;

/// Uniform fallback probabilities for sequences never seen in the corpus.
pub mod fill;

/// Weighted combination of per-order smoothed estimates.
///
/// Owns all per-order tries; also scores lines and samples tokens.
pub mod interpolation;

/// Bigram count matrices for reporting.
pub mod report;

/// Add-one smoothing of count tries and conversion to probabilities.
pub mod smoothing;

/// Recursive token tries of fixed depth, forward or backward keyed.
pub mod trie;

/// Vocabulary sets and their derivation from tries.
pub mod vocabulary;
