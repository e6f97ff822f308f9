use thiserror::Error;

/// Failures reported by the n-gram engine.
///
/// Every variant is a caller-visible failure: nothing in the engine
/// substitutes a default value for a missing word or an unset weight.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NgramError {
	#[error("invalid order {order}: must be between {min} and {max}")]
	InvalidOrder { order: usize, min: usize, max: usize },

	#[error("unknown word: {0:?} is not in the vocabulary")]
	UnknownWord(String),

	#[error("invalid interpolation weights: {0}")]
	InvalidWeights(String),

	#[error("vocabulary is empty")]
	EmptyVocabulary,

	#[error("order mismatch: expected {expected}, got {got}")]
	OrderMismatch { expected: usize, got: usize },

	#[error("trie was already smoothed {passes} time(s); use resmooth_counts to add one again")]
	AlreadySmoothed { passes: u32 },

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, NgramError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_name_the_offending_value() {
		let err = NgramError::UnknownWord("zebra".to_owned());
		assert!(err.to_string().contains("zebra"));

		let err = NgramError::InvalidOrder { order: 0, min: 1, max: usize::MAX };
		assert!(err.to_string().starts_with("invalid order 0"));

		let err = NgramError::AlreadySmoothed { passes: 2 };
		assert!(err.to_string().contains("2 time(s)"));
	}
}
