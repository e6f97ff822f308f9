use serde::{Deserialize, Serialize};

use super::trie::Orientation;
use super::vocabulary::Vocabulary;
use crate::error::{NgramError, Result};

/// Allowed distance between the weight sum and 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Interpolation weights, one per order (index 0 is order 1).
///
/// # Invariants
/// - at least one weight
/// - every weight is finite and in `[0, 1]`
/// - the weights sum to 1 within [`WEIGHT_TOLERANCE`]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Weights(Vec<f64>);

impl Weights {
	/// # Errors
	/// `InvalidWeights` if any invariant is violated.
	pub fn new(weights: Vec<f64>) -> Result<Self> {
		if weights.is_empty() {
			return Err(NgramError::InvalidWeights("no weights given".to_owned()));
		}
		if let Some(bad) = weights.iter().find(|w| !w.is_finite() || !(0.0..=1.0).contains(*w)) {
			return Err(NgramError::InvalidWeights(format!("weight {bad} is outside [0, 1]")));
		}
		let sum: f64 = weights.iter().sum();
		if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
			return Err(NgramError::InvalidWeights(format!("weights sum to {sum}, expected 1")));
		}
		Ok(Self(weights))
	}

	/// Uniform weights for orders `1..=order`.
	pub fn uniform(order: usize) -> Result<Self> {
		if order == 0 {
			return Err(NgramError::InvalidOrder { order, min: 1, max: usize::MAX });
		}
		Self::new(vec![1.0 / order as f64; order])
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn as_slice(&self) -> &[f64] {
		&self.0
	}

	/// Weight of the order-`k` estimate.
	pub fn for_order(&self, k: usize) -> Option<f64> {
		k.checked_sub(1).and_then(|i| self.0.get(i)).copied()
	}

	/// # Errors
	/// `InvalidWeights` unless there is exactly one weight per order.
	pub fn require_order(&self, order: usize) -> Result<()> {
		if self.len() != order {
			return Err(NgramError::InvalidWeights(format!(
				"{} weight(s) given for an order-{order} model",
				self.len()
			)));
		}
		Ok(())
	}
}

impl TryFrom<Vec<f64>> for Weights {
	type Error = NgramError;

	fn try_from(weights: Vec<f64>) -> Result<Self> {
		Self::new(weights)
	}
}

impl From<Weights> for Vec<f64> {
	fn from(weights: Weights) -> Self {
		weights.0
	}
}

/// Everything needed to build an [`InterpolationModel`](super::interpolation::InterpolationModel).
///
/// Can be deserialized from a config file; call [`validate`](Self::validate)
/// (the model does it on construction) before relying on the values.
///
/// # Fields
/// - `order`: highest n-gram order, tries are built for `1..=order`
/// - `orientation`: key order of every trie
/// - `vocabulary`: explicit vocabulary, derived from the corpus when `None`
/// - `extend_vocabulary`: union the explicit vocabulary with corpus words
/// - `weights`: interpolation weights, required by `predict`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelConfig {
	order: usize,

	#[serde(default)]
	pub orientation: Orientation,

	#[serde(default)]
	pub vocabulary: Option<Vocabulary>,

	#[serde(default)]
	pub extend_vocabulary: bool,

	#[serde(default)]
	weights: Option<Weights>,
}

impl ModelConfig {
	/// Forward orientation, corpus-derived vocabulary, no weights.
	///
	/// # Errors
	/// `InvalidOrder` if `order == 0`.
	pub fn new(order: usize) -> Result<Self> {
		if order == 0 {
			return Err(NgramError::InvalidOrder { order, min: 1, max: usize::MAX });
		}
		Ok(Self {
			order,
			orientation: Orientation::Forward,
			vocabulary: None,
			extend_vocabulary: false,
			weights: None,
		})
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn weights(&self) -> Option<&Weights> {
		self.weights.as_ref()
	}

	/// Sets the interpolation weights (one per order).
	///
	/// # Errors
	/// `InvalidWeights` if the weights are invalid or their count differs from the order.
	pub fn set_weights(&mut self, weights: Vec<f64>) -> Result<()> {
		let weights = Weights::new(weights)?;
		weights.require_order(self.order)?;
		self.weights = Some(weights);
		Ok(())
	}

	pub fn set_orientation(&mut self, orientation: Orientation) {
		self.orientation = orientation;
	}

	/// Uses `vocabulary` instead of the corpus words, or in addition to them when `extend` is set.
	pub fn set_vocabulary(&mut self, vocabulary: Vocabulary, extend: bool) {
		self.vocabulary = Some(vocabulary);
		self.extend_vocabulary = extend;
	}

	/// # Errors
	/// - `InvalidOrder` if `order == 0`
	/// - `InvalidWeights` if weights are set but do not match the order
	pub fn validate(&self) -> Result<()> {
		if self.order == 0 {
			return Err(NgramError::InvalidOrder { order: self.order, min: 1, max: usize::MAX });
		}
		if let Some(weights) = &self.weights {
			weights.require_order(self.order)?;
		}
		Ok(())
	}
}
