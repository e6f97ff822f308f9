use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{NgramError, Result};
use crate::tokenizer::Tokenizer;

/// Which token of an n-gram becomes the root key of the trie.
///
/// - `Forward`: path order is token order (`a b c` → `a`, `b`, `c`)
/// - `Backward`: path order is reversed (`a b c` → `c`, `b`, `a`)
///
/// Both orientations hold the same multiset of n-grams; they only differ
/// in which token is resolved first during a lookup.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
	#[default]
	Forward,
	Backward,
}

impl Orientation {
	/// Converts an n-gram (in token order) into a trie path.
	pub fn path<'a, S: AsRef<str>>(self, ngram: &'a [S]) -> Vec<&'a str> {
		let tokens = ngram.iter().map(AsRef::as_ref);
		match self {
			Orientation::Forward => tokens.collect(),
			Orientation::Backward => tokens.rev().collect(),
		}
	}
}

impl std::str::FromStr for Orientation {
	type Err = NgramError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"forward" => Ok(Orientation::Forward),
			"backward" => Ok(Orientation::Backward),
			other => Err(NgramError::InvalidConfig(format!(
				"orientation must be 'forward' or 'backward', got {other:?}"
			))),
		}
	}
}

/// One level of a trie.
///
/// The last level (`Leaves`) maps a token to its value; every level above
/// it (`Inner`) maps a token to the next level down. An order-`n` trie is
/// `n - 1` nested `Inner` levels over a `Leaves` level.
#[derive(Clone, Debug, PartialEq)]
pub enum Level<V> {
	Leaves(HashMap<String, V>),
	Inner(HashMap<String, Level<V>>),
}

impl<V> Level<V> {
	/// An empty level with `depth` levels remaining (`depth == 1` is a leaf level).
	pub fn empty(depth: usize) -> Self {
		if depth <= 1 {
			Level::Leaves(HashMap::new())
		} else {
			Level::Inner(HashMap::new())
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Level::Leaves(map) => map.len(),
			Level::Inner(map) => map.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains_key(&self, token: &str) -> bool {
		match self {
			Level::Leaves(map) => map.contains_key(token),
			Level::Inner(map) => map.contains_key(token),
		}
	}

	/// Keys of this level, in no particular order.
	pub fn keys(&self) -> Box<dyn Iterator<Item = &String> + '_> {
		match self {
			Level::Leaves(map) => Box::new(map.keys()),
			Level::Inner(map) => Box::new(map.keys()),
		}
	}

	/// Keys of this level, sorted.
	pub fn sorted_keys(&self) -> Vec<&str> {
		let mut keys: Vec<&str> = self.keys().map(String::as_str).collect();
		keys.sort_unstable();
		keys
	}

	pub fn as_leaves(&self) -> Option<&HashMap<String, V>> {
		match self {
			Level::Leaves(map) => Some(map),
			Level::Inner(_) => None,
		}
	}

	pub fn as_inner(&self) -> Option<&HashMap<String, Level<V>>> {
		match self {
			Level::Inner(map) => Some(map),
			Level::Leaves(_) => None,
		}
	}

	/// Follows `path` downward and returns the level reached.
	pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<&Level<V>> {
		let mut level = self;
		for token in path {
			level = level.as_inner()?.get(token.as_ref())?;
		}
		Some(level)
	}

	/// Value at the end of `path`; `path` must reach exactly the leaf level.
	pub fn value<S: AsRef<str>>(&self, path: &[S]) -> Option<&V> {
		let (last, prefix) = path.split_last()?;
		self.descend(prefix)?.as_leaves()?.get(last.as_ref())
	}

	/// Calls `f` with every `(path, value)` pair below this level.
	pub fn for_each_leaf<'a, F>(&'a self, prefix: &mut Vec<&'a str>, f: &mut F)
	where
		F: FnMut(&[&'a str], &'a V),
	{
		match self {
			Level::Leaves(map) => {
				for (token, value) in map {
					prefix.push(token);
					f(prefix.as_slice(), value);
					prefix.pop();
				}
			}
			Level::Inner(map) => {
				for (token, child) in map {
					prefix.push(token);
					child.for_each_leaf(prefix, f);
					prefix.pop();
				}
			}
		}
	}

	/// Number of leaf entries (distinct complete paths) below this level.
	pub fn leaf_count(&self) -> usize {
		match self {
			Level::Leaves(map) => map.len(),
			Level::Inner(map) => map.values().map(Level::leaf_count).sum(),
		}
	}
}

impl Level<u64> {
	fn increment(&mut self, path: &[&str], by: u64) {
		let Some((head, rest)) = path.split_first() else {
			return;
		};
		match self {
			Level::Leaves(map) => *map.entry((*head).to_owned()).or_insert(0) += by,
			Level::Inner(map) => map
				.entry((*head).to_owned())
				.or_insert_with(|| Level::empty(rest.len()))
				.increment(rest, by),
		}
	}

	/// Sum of all counts below this level.
	pub fn total(&self) -> u64 {
		match self {
			Level::Leaves(map) => map.values().sum(),
			Level::Inner(map) => map.values().map(Level::total).sum(),
		}
	}
}

/// A trie of depth `order` over token sequences.
///
/// # Invariants
/// - every root-to-leaf path has exactly `order` tokens
/// - paths follow `orientation`
/// - the trie is never mutated after construction; smoothing returns a new trie
#[derive(Clone, Debug, PartialEq)]
pub struct NgramTrie<V> {
	order: usize,
	orientation: Orientation,
	root: Level<V>,
	/// How many add-one passes produced this trie (0 for raw counts).
	smoothing_passes: u32,
}

/// Raw or smoothed n-gram counts.
pub type CountTrie = NgramTrie<u64>;

/// Smoothed conditional probabilities.
pub type ProbabilityTrie = NgramTrie<f64>;

impl<V> NgramTrie<V> {
	/// Creates an empty trie of the given order.
	///
	/// # Errors
	/// `InvalidOrder` if `order == 0`.
	pub fn new(order: usize, orientation: Orientation) -> Result<Self> {
		if order == 0 {
			return Err(NgramError::InvalidOrder { order, min: 1, max: usize::MAX });
		}
		Ok(Self { order, orientation, root: Level::empty(order), smoothing_passes: 0 })
	}

	pub(crate) fn from_parts(order: usize, orientation: Orientation, root: Level<V>, smoothing_passes: u32) -> Self {
		Self { order, orientation, root, smoothing_passes }
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn orientation(&self) -> Orientation {
		self.orientation
	}

	pub fn root(&self) -> &Level<V> {
		&self.root
	}

	pub fn smoothing_passes(&self) -> u32 {
		self.smoothing_passes
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_empty()
	}

	/// Value stored for a path given in trie order.
	pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&V> {
		if path.len() != self.order {
			return None;
		}
		self.root.value(path)
	}

	/// Value stored for an n-gram given in token order.
	pub fn get_ngram<S: AsRef<str>>(&self, ngram: &[S]) -> Option<&V> {
		self.get(&self.orientation.path(ngram))
	}

	/// The level reached by following `path` (trie order) from the root.
	pub fn subtrie<S: AsRef<str>>(&self, path: &[S]) -> Option<&Level<V>> {
		if path.len() > self.order {
			return None;
		}
		self.root.descend(path)
	}

	/// Root keys, sorted.
	pub fn keys_at_root(&self) -> Vec<&str> {
		self.root.sorted_keys()
	}

	/// Number of distinct paths stored.
	pub fn len_ngrams(&self) -> usize {
		self.root.leaf_count()
	}

	/// All `(path, value)` pairs in trie order, sorted by path.
	pub fn entries(&self) -> Vec<(Vec<&str>, &V)> {
		let mut out = Vec::with_capacity(self.len_ngrams());
		let mut prefix = Vec::with_capacity(self.order);
		self.root.for_each_leaf(&mut prefix, &mut |path, value| out.push((path.to_vec(), value)));
		out.sort_by(|a, b| a.0.cmp(&b.0));
		out
	}

	pub(crate) fn into_root(self) -> Level<V> {
		self.root
	}
}

/// Sliding windows of length `order` with stride 1.
///
/// Only `tokens.len() - order` windows are produced: the window ending on
/// the last token is dropped. For `<s> a b </s>` at order 2 this yields
/// `[<s>, a]` and `[a, b]` but not `[b, </s>]`. Callers that need the final
/// window must pad the sequence themselves.
pub fn windows<S>(tokens: &[S], order: usize) -> impl Iterator<Item = &[S]> {
	let count = if order == 0 { 0 } else { tokens.len().saturating_sub(order) };
	(0..count).map(move |i| &tokens[i..i + order])
}

impl CountTrie {
	/// Builds a count trie from raw lines.
	///
	/// Each line is tokenized independently (the tokenizer adds the
	/// boundary markers) and its windows are counted, see [`windows`].
	///
	/// # Errors
	/// `InvalidOrder` if `order == 0`. Empty input is not an error.
	pub fn build<S, T>(lines: &[S], order: usize, orientation: Orientation, tokenizer: &T) -> Result<Self>
	where
		S: AsRef<str>,
		T: Tokenizer + ?Sized,
	{
		let tokenized: Vec<Vec<String>> = lines.iter().map(|line| tokenizer.tokenize(line.as_ref())).collect();
		Self::from_token_lines(&tokenized, order, orientation)
	}

	/// Builds a count trie from already tokenized lines.
	pub fn from_token_lines<S: AsRef<str>>(lines: &[Vec<S>], order: usize, orientation: Orientation) -> Result<Self> {
		let mut trie = Self::new(order, orientation)?;
		let mut extracted = 0usize;
		for tokens in lines {
			for ngram in windows(tokens.as_slice(), order) {
				let path = orientation.path(ngram);
				trie.root.increment(&path, 1);
				extracted += 1;
			}
		}
		if trie.is_empty() && !lines.is_empty() {
			warn!("order {order} produced no n-grams from {} line(s)", lines.len());
		}
		debug!(
			"order {order} ({orientation:?}): {extracted} n-grams, {} distinct",
			trie.len_ngrams()
		);
		Ok(trie)
	}

	/// Builds a count trie from explicit `(ngram, count)` pairs given in token order.
	///
	/// # Errors
	/// - `InvalidOrder` if `order == 0`
	/// - `OrderMismatch` if an n-gram does not have `order` tokens
	pub fn from_counts<I, S>(order: usize, orientation: Orientation, counts: I) -> Result<Self>
	where
		I: IntoIterator<Item = (Vec<S>, u64)>,
		S: AsRef<str>,
	{
		let mut trie = Self::new(order, orientation)?;
		for (ngram, count) in counts {
			if ngram.len() != order {
				return Err(NgramError::OrderMismatch { expected: order, got: ngram.len() });
			}
			trie.root.increment(&orientation.path(&ngram), count);
		}
		Ok(trie)
	}

	/// Occurrences of an n-gram given in token order (0 when never seen).
	pub fn count<S: AsRef<str>>(&self, ngram: &[S]) -> u64 {
		self.get_ngram(ngram).copied().unwrap_or(0)
	}

	/// Sum of every leaf count: the number of n-grams extracted.
	pub fn total(&self) -> u64 {
		self.root.total()
	}
}
