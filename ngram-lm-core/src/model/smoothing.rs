use log::debug;

use super::fill::FillTable;
use super::trie::{CountTrie, Level, NgramTrie, ProbabilityTrie};
use super::vocabulary::Vocabulary;
use crate::error::{NgramError, Result};

/// Add-one (Laplace) smoothing against a fixed vocabulary.
///
/// Two ways to get a smoothed probability:
/// - [`smooth_probabilities`](Self::smooth_probabilities) materializes the
///   full table: every vocabulary word is present at every depth, so each
///   leaf level sums to 1. This is the canonical path, used for scoring.
/// - [`lookup_probability`](Self::lookup_probability) reads raw counts and
///   falls back on the [`FillTable`] when a prefix was never seen. It gives
///   the same numbers without allocating `|V|^n` leaves.
///
/// Both treat an in-vocabulary token the corpus never produced as ordinary
/// smoothing mass and a token outside the vocabulary as `UnknownWord`.
#[derive(Debug, Clone)]
pub struct LaplaceSmoother {
	vocab: Vocabulary,
	fill: FillTable,
}

impl LaplaceSmoother {
	/// # Errors
	/// - `EmptyVocabulary` if `vocab` is empty
	/// - `InvalidOrder` if `max_order == 0`
	pub fn new(vocab: Vocabulary, max_order: usize) -> Result<Self> {
		let fill = FillTable::build(&vocab, max_order)?;
		Ok(Self { vocab, fill })
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocab
	}

	pub fn fill_table(&self) -> &FillTable {
		&self.fill
	}

	/// Adds one to every vocabulary word at every depth of a raw count trie.
	///
	/// Absent words are inserted with count 1 and absent children are
	/// created empty before recursing, so the result holds `|V|^order` leaves.
	///
	/// # Errors
	/// - `AlreadySmoothed` if `trie` is already the output of a smoothing pass
	/// - `UnknownWord` if `trie` holds a key outside the vocabulary
	pub fn smooth_counts(&self, trie: &CountTrie) -> Result<CountTrie> {
		if trie.smoothing_passes() > 0 {
			return Err(NgramError::AlreadySmoothed { passes: trie.smoothing_passes() });
		}
		self.add_one_pass(trie)
	}

	/// Applies another add-one pass to an already smoothed trie.
	///
	/// Smoothing is not idempotent: every pass adds one again.
	pub fn resmooth_counts(&self, trie: &CountTrie) -> Result<CountTrie> {
		self.add_one_pass(trie)
	}

	/// Smoothed conditional probabilities for every path of `trie`.
	///
	/// A raw trie is smoothed once first; a trie that already went through
	/// smoothing is normalized as-is.
	///
	/// # Errors
	/// - `EmptyVocabulary` if the vocabulary is empty
	/// - `UnknownWord` if `trie` holds a key outside the vocabulary
	/// - `InvalidConfig` if an already smoothed `trie` lacks a vocabulary word
	///   at some depth (it was smoothed against another vocabulary)
	pub fn smooth_probabilities(&self, trie: &CountTrie) -> Result<ProbabilityTrie> {
		let smoothed;
		let counts = if trie.smoothing_passes() == 0 {
			smoothed = self.smooth_counts(trie)?;
			&smoothed
		} else {
			self.check_level(trie.root())?;
			self.check_complete(trie.root())?;
			trie
		};

		let root = normalize(counts.root());
		debug!("normalized order {} over |V| = {}", counts.order(), self.vocab.len());
		Ok(NgramTrie::from_parts(counts.order(), counts.orientation(), root, counts.smoothing_passes()))
	}

	/// Smoothed probability of `ngram` (token order) read from raw counts.
	///
	/// Equal to the value [`smooth_probabilities`](Self::smooth_probabilities)
	/// stores for the same n-gram. Like that path, it rejects a trie holding
	/// any key outside the vocabulary, so every call walks the whole trie once.
	///
	/// # Errors
	/// - `AlreadySmoothed` if `raw` is not a raw count trie
	/// - `OrderMismatch` if `ngram` does not have `raw.order()` tokens
	/// - `InvalidOrder` if `raw.order()` exceeds the fill table
	/// - `UnknownWord` if a token of `ngram` or a key of `raw` is outside the vocabulary
	pub fn lookup_probability<S: AsRef<str>>(&self, raw: &CountTrie, ngram: &[S]) -> Result<f64> {
		if raw.smoothing_passes() > 0 {
			return Err(NgramError::AlreadySmoothed { passes: raw.smoothing_passes() });
		}
		if ngram.len() != raw.order() {
			return Err(NgramError::OrderMismatch { expected: raw.order(), got: ngram.len() });
		}
		if raw.order() > self.fill.max_order() {
			return Err(NgramError::InvalidOrder { order: raw.order(), min: 1, max: self.fill.max_order() });
		}

		let path = raw.orientation().path(ngram);
		for token in &path {
			self.vocab.check(token)?;
		}
		self.check_level(raw.root())?;
		let Some((last, prefix)) = path.split_last() else {
			return Err(NgramError::OrderMismatch { expected: raw.order(), got: 0 });
		};

		let mut level = raw.root();
		for (depth, token) in prefix.iter().enumerate() {
			match level.as_inner().and_then(|children| children.get(*token)) {
				Some(child) => level = child,
				// The rest of the path was never seen: uniform over the suffix.
				None => return self.fill.probability(&path[depth..]),
			}
		}

		let leaves = level
			.as_leaves()
			.ok_or(NgramError::OrderMismatch { expected: raw.order(), got: path.len() })?;
		let total: u64 = leaves.values().sum::<u64>() + self.vocab.len() as u64;
		let count = leaves.get(*last).copied().unwrap_or(0) + 1;
		Ok(count as f64 / total as f64)
	}

	fn add_one_pass(&self, trie: &CountTrie) -> Result<CountTrie> {
		self.vocab.require_non_empty()?;
		let passes = trie.smoothing_passes() + 1;
		let order = trie.order();
		let orientation = trie.orientation();

		let mut root = trie.clone().into_root();
		self.add_one(&mut root, order)?;
		debug!("smoothed order {order} (pass {passes}) over |V| = {}", self.vocab.len());
		Ok(NgramTrie::from_parts(order, orientation, root, passes))
	}

	/// `depth` is the number of levels from `level` down to the leaves, inclusive.
	fn add_one(&self, level: &mut Level<u64>, depth: usize) -> Result<()> {
		self.check_keys(level)?;
		match level {
			Level::Leaves(leaves) => {
				for word in self.vocab.iter() {
					*leaves.entry(word.to_owned()).or_insert(0) += 1;
				}
			}
			Level::Inner(children) => {
				for word in self.vocab.iter() {
					let child = children.entry(word.to_owned()).or_insert_with(|| Level::empty(depth - 1));
					self.add_one(child, depth - 1)?;
				}
			}
		}
		Ok(())
	}

	/// Every key at every depth must belong to the vocabulary.
	fn check_level(&self, level: &Level<u64>) -> Result<()> {
		self.check_keys(level)?;
		if let Some(children) = level.as_inner() {
			for child in children.values() {
				self.check_level(child)?;
			}
		}
		Ok(())
	}

	/// Every vocabulary word must be present at every depth.
	fn check_complete(&self, level: &Level<u64>) -> Result<()> {
		if let Some(missing) = self.vocab.iter().find(|word| !level.contains_key(word)) {
			return Err(NgramError::InvalidConfig(format!(
				"smoothed trie has no entry for {missing:?}; it was smoothed against another vocabulary"
			)));
		}
		if let Some(children) = level.as_inner() {
			for child in children.values() {
				self.check_complete(child)?;
			}
		}
		Ok(())
	}

	fn check_keys<V>(&self, level: &Level<V>) -> Result<()> {
		match level.keys().find(|key| !self.vocab.contains(key)) {
			Some(stray) => Err(NgramError::UnknownWord(stray.clone())),
			None => Ok(()),
		}
	}
}

/// Divides each count by the sum of its sibling counts.
fn normalize(level: &Level<u64>) -> Level<f64> {
	match level {
		Level::Leaves(counts) => {
			let total: u64 = counts.values().sum();
			Level::Leaves(
				counts
					.iter()
					.map(|(word, count)| (word.clone(), *count as f64 / total as f64))
					.collect(),
			)
		}
		Level::Inner(children) => Level::Inner(
			children
				.iter()
				.map(|(word, child)| (word.clone(), normalize(child)))
				.collect(),
		),
	}
}

impl ProbabilityTrie {
	/// Probability stored for `ngram` (token order).
	///
	/// # Errors
	/// - `OrderMismatch` if `ngram` does not have `order()` tokens
	/// - `UnknownWord` naming the first token with no entry on the path
	pub fn probability<S: AsRef<str>>(&self, ngram: &[S]) -> Result<f64> {
		if ngram.len() != self.order() {
			return Err(NgramError::OrderMismatch { expected: self.order(), got: ngram.len() });
		}
		let path = self.orientation().path(ngram);
		let mut level = self.root();
		for token in &path {
			match level {
				Level::Inner(children) => {
					level = children.get(*token).ok_or_else(|| NgramError::UnknownWord((*token).to_owned()))?;
				}
				Level::Leaves(leaves) => {
					return leaves.get(*token).copied().ok_or_else(|| NgramError::UnknownWord((*token).to_owned()));
				}
			}
		}
		Err(NgramError::OrderMismatch { expected: self.order(), got: path.len() })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::trie::Orientation;
	use crate::model::vocabulary::{self, WordScope};
	use crate::tokenizer::WhitespaceTokenizer;

	const EPS: f64 = 1e-9;

	fn vocab(words: &[&str]) -> Vocabulary {
		words.iter().copied().collect()
	}

	#[test]
	fn unigram_scenario() {
		let raw = CountTrie::from_counts(1, Orientation::Forward, vec![(vec!["a"], 2)]).unwrap();
		let smoother = LaplaceSmoother::new(vocab(&["a", "b"]), 1).unwrap();

		let counts = smoother.smooth_counts(&raw).unwrap();
		assert_eq!(counts.count(&["a"]), 3);
		assert_eq!(counts.count(&["b"]), 1);
		assert_eq!(counts.total(), 4);

		let probs = smoother.smooth_probabilities(&raw).unwrap();
		assert!((probs.probability(&["a"]).unwrap() - 0.75).abs() < EPS);
		assert!((probs.probability(&["b"]).unwrap() - 0.25).abs() < EPS);
	}

	#[test]
	fn every_word_present_at_every_depth() {
		let raw = CountTrie::build(&["a b a"], 3, Orientation::Forward, &WhitespaceTokenizer).unwrap();
		let vocab = vocabulary::resolve(&raw, None, false);
		let smoother = LaplaceSmoother::new(vocab.clone(), 3).unwrap();
		let counts = smoother.smooth_counts(&raw).unwrap();

		let n = vocab.len();
		assert_eq!(counts.len_ngrams(), n * n * n);
		assert!(counts.entries().iter().all(|(_, count)| **count >= 1));
		assert_eq!(counts.total(), raw.total() + (n * n * n) as u64);
	}

	#[test]
	fn leaf_levels_sum_to_one() {
		let raw = CountTrie::build(&["a b c a b", "c c a"], 2, Orientation::Backward, &WhitespaceTokenizer).unwrap();
		let vocab = vocabulary::resolve(&raw, None, false);
		let smoother = LaplaceSmoother::new(vocab.clone(), 2).unwrap();
		let probs = smoother.smooth_probabilities(&raw).unwrap();

		for prefix in vocab.iter() {
			let sum: f64 = vocab.iter().map(|w| probs.get(&[prefix, w]).copied().unwrap()).sum();
			assert!((sum - 1.0).abs() < EPS, "prefix {prefix} sums to {sum}");
		}
	}

	#[test]
	fn smoothing_twice_is_guarded() {
		let raw = CountTrie::from_counts(1, Orientation::Forward, vec![(vec!["a"], 2)]).unwrap();
		let smoother = LaplaceSmoother::new(vocab(&["a", "b"]), 1).unwrap();
		let once = smoother.smooth_counts(&raw).unwrap();

		assert_eq!(smoother.smooth_counts(&once).unwrap_err(), NgramError::AlreadySmoothed { passes: 1 });

		let twice = smoother.resmooth_counts(&once).unwrap();
		assert_eq!(twice.smoothing_passes(), 2);
		assert_eq!(twice.count(&["a"]), 4);
		assert_eq!(twice.count(&["b"]), 2);
		assert_ne!(once, twice);
	}

	#[test]
	fn smoothed_input_is_normalized_without_another_pass() {
		let raw = CountTrie::from_counts(1, Orientation::Forward, vec![(vec!["a"], 2)]).unwrap();
		let smoother = LaplaceSmoother::new(vocab(&["a", "b"]), 1).unwrap();
		let once = smoother.smooth_counts(&raw).unwrap();
		assert_eq!(smoother.smooth_probabilities(&once).unwrap(), smoother.smooth_probabilities(&raw).unwrap());
	}

	#[test]
	fn smoothed_against_a_smaller_vocabulary_is_rejected() {
		let raw = CountTrie::from_counts(1, Orientation::Forward, vec![(vec!["a"], 2)]).unwrap();
		let narrow = LaplaceSmoother::new(vocab(&["a"]), 1).unwrap().smooth_counts(&raw).unwrap();
		let wide = LaplaceSmoother::new(vocab(&["a", "b"]), 1).unwrap();
		assert!(matches!(wide.smooth_probabilities(&narrow), Err(NgramError::InvalidConfig(_))));
	}

	#[test]
	fn incomplete_inner_level_is_rejected() {
		let raw = CountTrie::from_counts(2, Orientation::Forward, vec![(vec!["a", "b"], 1)]).unwrap();
		let narrow = LaplaceSmoother::new(vocab(&["a", "b"]), 2).unwrap().smooth_counts(&raw).unwrap();
		let wide = LaplaceSmoother::new(vocab(&["a", "b", "c"]), 2).unwrap();
		let err = wide.smooth_probabilities(&narrow).unwrap_err();
		assert!(matches!(err, NgramError::InvalidConfig(ref reason) if reason.contains("\"c\"")));
	}

	#[test]
	fn stray_key_is_unknown_word() {
		let raw = CountTrie::from_counts(2, Orientation::Forward, vec![(vec!["a", "x"], 1)]).unwrap();
		let smoother = LaplaceSmoother::new(vocab(&["a", "b"]), 2).unwrap();
		assert_eq!(smoother.smooth_counts(&raw).unwrap_err(), NgramError::UnknownWord("x".to_owned()));
	}

	#[test]
	fn lookup_matches_materialized() {
		let raw = CountTrie::build(&["a b c", "b b a c"], 3, Orientation::Forward, &WhitespaceTokenizer).unwrap();
		let vocab = vocabulary::resolve(&raw, Some(&vocab(&["d"])), true);
		let smoother = LaplaceSmoother::new(vocab.clone(), 3).unwrap();
		let probs = smoother.smooth_probabilities(&raw).unwrap();

		for (path, expected) in probs.entries() {
			let actual = smoother.lookup_probability(&raw, &path).unwrap();
			assert_eq!(actual, *expected, "path {path:?}");
		}
	}

	#[test]
	fn lookup_uses_fill_for_unseen_prefix() {
		let raw = CountTrie::from_counts(2, Orientation::Forward, vec![(vec!["a", "b"], 5)]).unwrap();
		let smoother = LaplaceSmoother::new(vocab(&["a", "b", "c", "d"]), 2).unwrap();
		assert_eq!(smoother.lookup_probability(&raw, &["c", "a"]).unwrap(), 0.25);
		assert_eq!(smoother.lookup_probability(&raw, &["a", "b"]).unwrap(), 6.0 / 9.0);
		assert_eq!(
			smoother.lookup_probability(&raw, &["a", "q"]).unwrap_err(),
			NgramError::UnknownWord("q".to_owned())
		);
	}

	#[test]
	fn lookup_rejects_stray_keys_like_the_materialized_path() {
		let raw = CountTrie::from_counts(2, Orientation::Forward, vec![(vec!["x", "a"], 1), (vec!["a", "b"], 1)]).unwrap();
		let smoother = LaplaceSmoother::new(vocab(&["a", "b"]), 2).unwrap();
		let unknown = NgramError::UnknownWord("x".to_owned());
		assert_eq!(smoother.smooth_probabilities(&raw).unwrap_err(), unknown);
		assert_eq!(smoother.lookup_probability(&raw, &["a", "b"]).unwrap_err(), unknown);
	}

	#[test]
	fn probability_names_the_missing_token() {
		let raw = CountTrie::from_counts(2, Orientation::Forward, vec![(vec!["a", "b"], 1)]).unwrap();
		let smoother = LaplaceSmoother::new(vocab(&["a", "b"]), 2).unwrap();
		let probs = smoother.smooth_probabilities(&raw).unwrap();
		assert_eq!(probs.probability(&["z", "a"]).unwrap_err(), NgramError::UnknownWord("z".to_owned()));
		assert_eq!(probs.probability(&["a", "z"]).unwrap_err(), NgramError::UnknownWord("z".to_owned()));
		assert!(matches!(probs.probability(&["a"]), Err(NgramError::OrderMismatch { expected: 2, got: 1 })));
	}

	#[test]
	fn empty_vocabulary_is_rejected() {
		assert_eq!(LaplaceSmoother::new(Vocabulary::new(), 2).unwrap_err(), NgramError::EmptyVocabulary);
	}

	#[test]
	fn vocabulary_from_top_level_is_too_small_to_smooth() {
		let raw = CountTrie::from_counts(2, Orientation::Forward, vec![(vec!["a", "b"], 1)]).unwrap();
		let top = vocabulary::words_in(&raw, WordScope::TopLevel);
		let smoother = LaplaceSmoother::new(top, 2).unwrap();
		assert_eq!(smoother.smooth_counts(&raw).unwrap_err(), NgramError::UnknownWord("b".to_owned()));
	}
}
