use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::trie::{Level, NgramTrie};
use crate::error::{NgramError, Result};

/// A deduplicated set of tokens.
///
/// Backed by an ordered set so that iteration order is deterministic:
/// every place that normalizes over the vocabulary sees the words in the
/// same (sorted) order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Vocabulary {
	words: BTreeSet<String>,
}

impl Vocabulary {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	pub fn contains(&self, token: &str) -> bool {
		self.words.contains(token)
	}

	/// Words in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.words.iter().map(String::as_str)
	}

	/// `self ∪ other`.
	pub fn union(&self, other: &Vocabulary) -> Vocabulary {
		Self { words: self.words.union(&other.words).cloned().collect() }
	}

	/// # Errors
	/// `EmptyVocabulary` if there is nothing to normalize over.
	pub fn require_non_empty(&self) -> Result<()> {
		if self.is_empty() {
			return Err(NgramError::EmptyVocabulary);
		}
		Ok(())
	}

	/// # Errors
	/// `UnknownWord` if `token` is not part of the vocabulary.
	pub fn check(&self, token: &str) -> Result<()> {
		if !self.contains(token) {
			return Err(NgramError::UnknownWord(token.to_owned()));
		}
		Ok(())
	}
}

impl<S: Into<String>> FromIterator<S> for Vocabulary {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self { words: iter.into_iter().map(Into::into).collect() }
	}
}

impl<S: Into<String>> Extend<S> for Vocabulary {
	fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
		self.words.extend(iter.into_iter().map(Into::into));
	}
}

/// Which trie levels contribute words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordScope {
	/// Keys at every depth, root included. This is the smoothing vocabulary.
	All,
	/// Root keys only (one axis of a count matrix).
	TopLevel,
	/// Keys strictly below the root.
	Nested,
}

/// Collects the keys of `trie` found in `scope`.
pub fn words_in<V>(trie: &NgramTrie<V>, scope: WordScope) -> Vocabulary {
	let mut vocab = Vocabulary::new();
	match scope {
		WordScope::TopLevel => vocab.extend(trie.root().keys().cloned()),
		WordScope::All => collect_keys(trie.root(), &mut vocab),
		WordScope::Nested => {
			if let Some(children) = trie.root().as_inner() {
				for child in children.values() {
					collect_keys(child, &mut vocab);
				}
			}
		}
	}
	vocab
}

/// Adds every key at or below `level` to `out`.
pub fn collect_keys<V>(level: &Level<V>, out: &mut Vocabulary) {
	out.extend(level.keys().cloned());
	if let Some(children) = level.as_inner() {
		for child in children.values() {
			collect_keys(child, out);
		}
	}
}

/// Derives the working vocabulary for one trie.
///
/// - `explicit` given, `extend == false`: `explicit` is used as-is
/// - `explicit` given, `extend == true`: `explicit ∪ words_in(trie, All)`
/// - no `explicit`: `words_in(trie, All)`
pub fn resolve<V>(trie: &NgramTrie<V>, explicit: Option<&Vocabulary>, extend: bool) -> Vocabulary {
	resolve_all([trie], explicit, extend)
}

/// Same as [`resolve`] but over several tries (one per order), so that a
/// single vocabulary can be shared by all of them.
pub fn resolve_all<'a, V, I>(tries: I, explicit: Option<&Vocabulary>, extend: bool) -> Vocabulary
where
	V: 'a,
	I: IntoIterator<Item = &'a NgramTrie<V>>,
{
	match explicit {
		Some(vocab) if !extend => vocab.clone(),
		_ => {
			let mut vocab = explicit.cloned().unwrap_or_default();
			for trie in tries {
				collect_keys(trie.root(), &mut vocab);
			}
			vocab
		}
	}
}
