use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::vocabulary::Vocabulary;
use crate::error::{NgramError, Result};

/// One level of a fill trie.
///
/// Inner levels point every vocabulary word at the same shared child,
/// so an order-`k` fill costs `k * |V|` entries rather than `|V|^k`.
#[derive(Debug, PartialEq)]
pub enum FillLevel {
	Leaves(HashMap<String, f64>),
	Inner(HashMap<String, Arc<FillLevel>>),
}

/// Probabilities for token sequences the corpus never produced.
///
/// `level(1)` assigns `1/|V|` to each word; `level(k)` maps every word to
/// `level(k - 1)`. Only read as a fallback during lookups over raw counts,
/// never used to build counts.
#[derive(Debug, Clone)]
pub struct FillTable {
	uniform: f64,
	/// `levels[k - 1]` is the order-`k` fill.
	levels: Vec<Arc<FillLevel>>,
}

impl FillTable {
	/// # Errors
	/// - `EmptyVocabulary` if `vocab` is empty
	/// - `InvalidOrder` if `max_order == 0`
	pub fn build(vocab: &Vocabulary, max_order: usize) -> Result<Self> {
		vocab.require_non_empty()?;
		if max_order == 0 {
			return Err(NgramError::InvalidOrder { order: max_order, min: 1, max: usize::MAX });
		}

		let uniform = 1.0 / vocab.len() as f64;
		let mut levels = Vec::with_capacity(max_order);
		let mut current = Arc::new(FillLevel::Leaves(vocab.iter().map(|w| (w.to_owned(), uniform)).collect()));
		levels.push(Arc::clone(&current));
		for _ in 1..max_order {
			current = Arc::new(FillLevel::Inner(
				vocab.iter().map(|w| (w.to_owned(), Arc::clone(&current))).collect(),
			));
			levels.push(Arc::clone(&current));
		}

		debug!("fill table built: |V| = {}, max order {max_order}", vocab.len());
		Ok(Self { uniform, levels })
	}

	pub fn max_order(&self) -> usize {
		self.levels.len()
	}

	/// The per-word probability at the leaf level, `1/|V|`.
	pub fn uniform(&self) -> f64 {
		self.uniform
	}

	/// # Errors
	/// `InvalidOrder` if `order` is 0 or above [`Self::max_order`].
	pub fn level(&self, order: usize) -> Result<&Arc<FillLevel>> {
		order
			.checked_sub(1)
			.and_then(|i| self.levels.get(i))
			.ok_or(NgramError::InvalidOrder { order, min: 1, max: self.max_order() })
	}

	/// Fill probability for a sequence of `suffix.len()` tokens (trie order).
	///
	/// # Errors
	/// - `InvalidOrder` if the suffix is empty or longer than the table
	/// - `UnknownWord` if a token is outside the vocabulary
	pub fn probability<S: AsRef<str>>(&self, suffix: &[S]) -> Result<f64> {
		let mut level: &FillLevel = Arc::as_ref(self.level(suffix.len())?);
		for token in suffix {
			let token = token.as_ref();
			match level {
				FillLevel::Inner(map) => {
					level = map
						.get(token)
						.map(Arc::as_ref)
						.ok_or_else(|| NgramError::UnknownWord(token.to_owned()))?;
				}
				FillLevel::Leaves(map) => {
					return map.get(token).copied().ok_or_else(|| NgramError::UnknownWord(token.to_owned()));
				}
			}
		}
		// Unreachable for a well-formed table: the walk ends on a leaf level.
		Err(NgramError::OrderMismatch { expected: self.max_order(), got: suffix.len() })
	}
}
