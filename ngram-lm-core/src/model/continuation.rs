//! Continuation probability: how readily a word completes contexts it was
//! not counted in, estimated from how many distinct contexts precede it.
//!
//! A context token of an n-gram is any of its tokens except the final word.
//! On a backward trie the final word is the root key, so the contexts of `w`
//! are the keys nested under `w` and the set of all contexts is every key
//! below the root level. A forward trie yields the same sets by reading the
//! leaf level as the final word, so the result does not depend on orientation.

use std::collections::HashSet;

use super::trie::{CountTrie, Level, Orientation};
use super::vocabulary::{self, Vocabulary, WordScope};
use crate::error::{NgramError, Result};

/// Distinct context tokens seen before `word`.
///
/// A word absent from the trie has no contexts. A word that precedes itself
/// (`y y`) counts itself once as a context: contexts are the keys nested
/// under `word`, never the root key being queried.
///
/// # Errors
/// `InvalidOrder` if the trie has order 1 (unigrams carry no context).
pub fn continuation_count(trie: &CountTrie, word: &str) -> Result<usize> {
	require_context(trie)?;
	let contexts = match trie.orientation() {
		Orientation::Backward => {
			let mut contexts = Vocabulary::new();
			if let Some(subtree) = trie.subtrie(&[word]) {
				vocabulary::collect_keys(subtree, &mut contexts);
			}
			contexts.len()
		}
		Orientation::Forward => {
			let mut contexts: HashSet<&str> = HashSet::new();
			let mut prefix = Vec::with_capacity(trie.order());
			trie.root().for_each_leaf(&mut prefix, &mut |path, _| {
				if let Some((last, context)) = path.split_last() {
					if *last == word {
						contexts.extend(context.iter().copied());
					}
				}
			});
			contexts.len()
		}
	};
	Ok(contexts)
}

/// Distinct context tokens across the whole trie.
///
/// # Errors
/// `InvalidOrder` if the trie has order 1.
pub fn total_contexts(trie: &CountTrie) -> Result<usize> {
	require_context(trie)?;
	let total = match trie.orientation() {
		Orientation::Backward => vocabulary::words_in(trie, WordScope::Nested).len(),
		Orientation::Forward => {
			let mut contexts = Vocabulary::new();
			collect_inner_keys(trie.root(), &mut contexts);
			contexts.len()
		}
	};
	Ok(total)
}

/// `continuation_count(word) / total_contexts`.
///
/// `total` overrides the denominator; when `None` it is computed from the
/// trie. A zero denominator gives 0.
pub fn continuation_probability(trie: &CountTrie, word: &str, total: Option<usize>) -> Result<f64> {
	let count = continuation_count(trie, word)?;
	let total = match total {
		Some(total) => total,
		None => total_contexts(trie)?,
	};
	if total == 0 {
		return Ok(0.0);
	}
	Ok(count as f64 / total as f64)
}

fn require_context(trie: &CountTrie) -> Result<()> {
	if trie.order() < 2 {
		return Err(NgramError::InvalidOrder { order: trie.order(), min: 2, max: usize::MAX });
	}
	Ok(())
}

/// Keys of every level except the leaf level.
fn collect_inner_keys<V>(level: &Level<V>, out: &mut Vocabulary) {
	if let Some(children) = level.as_inner() {
		out.extend(children.keys().cloned());
		for child in children.values() {
			collect_inner_keys(child, out);
		}
	}
}
