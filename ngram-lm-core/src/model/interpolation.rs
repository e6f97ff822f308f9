use log::{debug, info};
use rand::Rng;

use super::config::{ModelConfig, Weights};
use super::continuation;
use super::smoothing::LaplaceSmoother;
use super::trie::{windows, CountTrie, Orientation, ProbabilityTrie};
use super::vocabulary::{self, Vocabulary};
use crate::error::{NgramError, Result};
use crate::tokenizer::{Tokenizer, SENTENCE_START};

/// Linear interpolation of Laplace-smoothed estimates of orders `1..=n`.
///
/// Owns one raw count trie and one smoothed probability trie per order,
/// all built from the same corpus against one shared vocabulary.
///
/// `P(w | context) = Σ_k weight[k] · P_k(last k tokens)`
///
/// Each `P_k` is normalized over the leaf level of its trie. With forward
/// keys that is the last token given the ones before it; with backward keys
/// it is the first token of the suffix given the ones after it.
///
/// The model is read-only once built.
#[derive(Debug, Clone)]
pub struct InterpolationModel {
	order: usize,
	orientation: Orientation,
	/// `counts[k - 1]` holds the order-`k` counts.
	counts: Vec<CountTrie>,
	/// `probabilities[k - 1]` holds the order-`k` smoothed probabilities.
	probabilities: Vec<ProbabilityTrie>,
	smoother: LaplaceSmoother,
	weights: Option<Weights>,
}

impl InterpolationModel {
	/// Tokenizes `lines` once and builds every order from them.
	pub fn train<S, T>(lines: &[S], config: &ModelConfig, tokenizer: &T) -> Result<Self>
	where
		S: AsRef<str>,
		T: Tokenizer + ?Sized,
	{
		let tokenized: Vec<Vec<String>> = lines.iter().map(|line| tokenizer.tokenize(line.as_ref())).collect();
		Self::from_token_lines(&tokenized, config)
	}

	/// Builds every order from already tokenized lines.
	///
	/// # Errors
	/// Any failure aborts the whole build: invalid configuration, an empty
	/// vocabulary, or corpus words missing from an explicit vocabulary.
	pub fn from_token_lines<S: AsRef<str>>(lines: &[Vec<S>], config: &ModelConfig) -> Result<Self> {
		config.validate()?;
		let order = config.order();
		let orientation = config.orientation;

		let counts = (1..=order)
			.map(|k| CountTrie::from_token_lines(lines, k, orientation))
			.collect::<Result<Vec<_>>>()?;

		let vocab = vocabulary::resolve_all(&counts, config.vocabulary.as_ref(), config.extend_vocabulary);
		let smoother = LaplaceSmoother::new(vocab, order)?;

		let probabilities = counts
			.iter()
			.map(|trie| smoother.smooth_probabilities(trie))
			.collect::<Result<Vec<_>>>()?;

		info!(
			"built order-{order} {orientation:?} model from {} line(s), |V| = {}",
			lines.len(),
			smoother.vocabulary().len()
		);
		Ok(Self { order, orientation, counts, probabilities, smoother, weights: config.weights().cloned() })
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn orientation(&self) -> Orientation {
		self.orientation
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		self.smoother.vocabulary()
	}

	pub fn weights(&self) -> Option<&Weights> {
		self.weights.as_ref()
	}

	pub fn smoother(&self) -> &LaplaceSmoother {
		&self.smoother
	}

	/// Raw counts of order `k`.
	pub fn counts(&self, k: usize) -> Result<&CountTrie> {
		self.index(k).map(|i| &self.counts[i])
	}

	/// Smoothed probabilities of order `k`.
	pub fn probabilities(&self, k: usize) -> Result<&ProbabilityTrie> {
		self.index(k).map(|i| &self.probabilities[i])
	}

	fn index(&self, k: usize) -> Result<usize> {
		if k == 0 || k > self.order {
			return Err(NgramError::InvalidOrder { order: k, min: 1, max: self.order });
		}
		Ok(k - 1)
	}

	/// Smoothed probability of order `suffix.len()` for `suffix` (token order).
	pub fn order_probability<S: AsRef<str>>(&self, suffix: &[S]) -> Result<f64> {
		self.probabilities(suffix.len())?.probability(suffix)
	}

	/// Interpolated probability of `ngram` (token order), one term per suffix length.
	///
	/// # Errors
	/// - `OrderMismatch` if `ngram` does not have `order()` tokens
	/// - `UnknownWord` if a token is outside the vocabulary
	/// - `InvalidWeights` if the model was built without weights
	pub fn predict<S: AsRef<str>>(&self, ngram: &[S]) -> Result<f64> {
		let weights = self
			.weights
			.as_ref()
			.ok_or_else(|| NgramError::InvalidWeights("no interpolation weights configured".to_owned()))?;
		weights.require_order(self.order)?;
		if ngram.len() != self.order {
			return Err(NgramError::OrderMismatch { expected: self.order, got: ngram.len() });
		}
		for token in ngram {
			self.vocabulary().check(token.as_ref())?;
		}

		let mut total = 0.0;
		for (i, weight) in weights.as_slice().iter().enumerate() {
			let k = i + 1;
			let p = self.order_probability(&ngram[self.order - k..])?;
			total += weight * p;
		}
		Ok(total)
	}

	/// Continuation probability of `word` measured on the order-`k` counts.
	///
	/// # Errors
	/// - `InvalidOrder` if `k` is not in `2..=order()`
	/// - `UnknownWord` if `word` is outside the vocabulary
	pub fn continuation_probability(&self, word: &str, k: usize, total_contexts: Option<usize>) -> Result<f64> {
		self.vocabulary().check(word)?;
		continuation::continuation_probability(self.counts(k)?, word, total_contexts)
	}

	/// Natural-log probability of a tokenized line: the sum over its
	/// order-`n` windows (same windowing as training).
	pub fn log_probability<S: AsRef<str>>(&self, tokens: &[S]) -> Result<f64> {
		windows(tokens, self.order).map(|ngram| self.predict(ngram).map(f64::ln)).sum()
	}

	/// `exp(-mean log-probability)` over every window of every line.
	///
	/// # Errors
	/// `InvalidConfig` if the lines contain no window to score.
	pub fn perplexity<S: AsRef<str>>(&self, lines: &[Vec<S>]) -> Result<f64> {
		let mut log_sum = 0.0;
		let mut scored = 0usize;
		for tokens in lines {
			log_sum += self.log_probability(tokens.as_slice())?;
			scored += windows(tokens.as_slice(), self.order).count();
		}
		if scored == 0 {
			return Err(NgramError::InvalidConfig("no n-grams to score".to_owned()));
		}
		debug!("perplexity over {scored} n-gram(s)");
		Ok((-log_sum / scored as f64).exp())
	}

	/// Draws the token that follows `context` from the interpolated distribution.
	///
	/// Only the last `order() - 1` tokens of `context` are used; a shorter
	/// context is padded on the left with `<s>`.
	///
	/// This method performs:
	/// - one `predict` per vocabulary word
	/// - a cumulative subtraction to select a bucket
	pub fn sample_next<S, R>(&self, context: &[S], rng: &mut R) -> Result<String>
	where
		S: AsRef<str>,
		R: Rng,
	{
		let width = self.order - 1;
		let kept = &context[context.len().saturating_sub(width)..];
		let mut ngram: Vec<&str> = vec![SENTENCE_START; width - kept.len()];
		ngram.extend(kept.iter().map(AsRef::as_ref));
		ngram.push("");

		let mut candidates = Vec::with_capacity(self.vocabulary().len());
		for word in self.vocabulary().iter() {
			ngram[width] = word;
			candidates.push((word, self.predict(&ngram)?));
		}

		let total: f64 = candidates.iter().map(|(_, p)| p).sum();
		let mut r = rng.random::<f64>() * total;
		let mut fallback = None;
		for (word, p) in candidates {
			if r < p {
				return Ok(word.to_owned());
			}
			r -= p;
			fallback = Some(word);
		}
		// Rounding can leave `r` just above the last bucket.
		fallback
			.map(str::to_owned)
			.ok_or(NgramError::EmptyVocabulary)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::WhitespaceTokenizer;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	const CORPUS: [&str; 3] = ["the cat sat on the mat", "the dog sat on the log", "a cat ran"];

	fn model(weights: Option<Vec<f64>>) -> InterpolationModel {
		let mut config = ModelConfig::new(3).unwrap();
		if let Some(weights) = weights {
			config.set_weights(weights).unwrap();
		}
		InterpolationModel::train(&CORPUS, &config, &WhitespaceTokenizer).unwrap()
	}

	#[test]
	fn predict_is_weighted_sum_of_orders() {
		let model = model(Some(vec![0.5, 0.3, 0.2]));
		let ngram = ["the", "cat", "sat"];
		let expected = 0.5 * model.order_probability(&ngram[2..]).unwrap()
			+ 0.3 * model.order_probability(&ngram[1..]).unwrap()
			+ 0.2 * model.order_probability(&ngram[..]).unwrap();
		let p = model.predict(&ngram).unwrap();
		assert!((p - expected).abs() < 1e-12);
		assert!(p > 0.0 && p < 1.0);
	}

	#[test]
	fn interpolated_distribution_sums_to_one() {
		let model = model(Some(vec![0.2, 0.3, 0.5]));
		let sum: f64 = model.vocabulary().iter().map(|w| model.predict(&["on", "the", w]).unwrap()).sum();
		assert!((sum - 1.0).abs() < 1e-9);
	}

	#[test]
	fn unknown_word_is_reported() {
		let model = model(Some(vec![0.5, 0.3, 0.2]));
		assert_eq!(
			model.predict(&["the", "cat", "zebra"]).unwrap_err(),
			NgramError::UnknownWord("zebra".to_owned())
		);
	}

	#[test]
	fn missing_weights_fail_at_prediction() {
		let model = model(None);
		assert!(matches!(model.predict(&["the", "cat", "sat"]), Err(NgramError::InvalidWeights(_))));
		assert!(model.order_probability(&["cat", "sat"]).is_ok());
	}

	#[test]
	fn wrong_ngram_length_is_rejected() {
		let model = model(Some(vec![0.5, 0.3, 0.2]));
		assert_eq!(
			model.predict(&["cat", "sat"]).unwrap_err(),
			NgramError::OrderMismatch { expected: 3, got: 2 }
		);
		assert!(matches!(model.counts(4), Err(NgramError::InvalidOrder { order: 4, max: 3, .. })));
	}

	#[test]
	fn explicit_vocabulary_missing_corpus_words_aborts_build() {
		let mut config = ModelConfig::new(2).unwrap();
		config.set_vocabulary(["<s>", "the", "cat"].into_iter().collect(), false);
		let err = InterpolationModel::train(&CORPUS, &config, &WhitespaceTokenizer).unwrap_err();
		assert!(matches!(err, NgramError::UnknownWord(_)));
	}

	#[test]
	fn continuation_goes_through_the_vocabulary() {
		let model = model(None);
		let p = model.continuation_probability("sat", 2, None).unwrap();
		assert!(p > 0.0 && p <= 1.0);
		assert!(matches!(model.continuation_probability("zebra", 2, None), Err(NgramError::UnknownWord(_))));
		assert!(matches!(model.continuation_probability("sat", 1, None), Err(NgramError::InvalidOrder { .. })));
	}

	#[test]
	fn perplexity_is_finite_and_at_least_one() {
		let model = model(Some(vec![0.2, 0.3, 0.5]));
		let lines: Vec<Vec<String>> = CORPUS.iter().map(|l| WhitespaceTokenizer.tokenize(l)).collect();
		let pp = model.perplexity(&lines).unwrap();
		assert!(pp.is_finite());
		assert!(pp >= 1.0);
		assert!(pp < model.vocabulary().len() as f64);
	}

	#[test]
	fn sampling_is_reproducible_and_in_vocabulary() {
		let model = model(Some(vec![0.1, 0.2, 0.7]));
		let mut a = StdRng::seed_from_u64(7);
		let mut b = StdRng::seed_from_u64(7);
		for _ in 0..20 {
			let x = model.sample_next(&["<s>"], &mut a).unwrap();
			let y = model.sample_next(&["<s>"], &mut b).unwrap();
			assert_eq!(x, y);
			assert!(model.vocabulary().contains(&x));
		}
	}
}
