//! N-gram language-model engine.
//!
//! This crate provides:
//! - Count tries of any order, keyed forward or backward
//! - Vocabulary derivation shared across orders
//! - Laplace (add-one) smoothing at every trie depth
//! - Linear interpolation across orders and continuation probability
//!
//! All structures are built once from a corpus and read-only afterwards.
//! The crate performs no I/O: lines come in as strings, through a
//! [`Tokenizer`](tokenizer::Tokenizer).

/// Typed failures of the engine.
pub mod error;

/// Core n-gram models.
pub mod model;

/// Line tokenization seam and sentence-boundary markers.
pub mod tokenizer;

pub use error::{NgramError, Result};
pub use model::config::{ModelConfig, Weights};
pub use model::interpolation::InterpolationModel;
pub use model::smoothing::LaplaceSmoother;
pub use model::trie::{CountTrie, NgramTrie, Orientation, ProbabilityTrie};
pub use model::vocabulary::Vocabulary;
