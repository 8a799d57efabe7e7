use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::labels::{Vocabulary, collapse_gender};

/// Output of one backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum PredictionResult {
    /// Hard decision, no probabilities (tree ensemble).
    Label {
        /// Winning class index.
        index: usize,
        /// Vocabulary the index refers to.
        vocabulary: Vocabulary,
    },
    /// Softmax distribution, one entry per class.
    Distribution {
        /// Class probabilities.
        probs: Vec<f32>,
        /// Vocabulary of `probs`.
        vocabulary: Vocabulary,
    },
}

impl PredictionResult {
    /// Distribution over the vocabulary implied by `probs.len()`.
    ///
    /// # Errors
    /// Returns `VocabularyMismatch` if the length is neither 8 nor 16.
    pub fn distribution(probs: Vec<f32>) -> Result<Self, CoreError> {
        let vocabulary = Vocabulary::from_len(probs.len()).ok_or(CoreError::VocabularyMismatch {
            expected: Vocabulary::GenderCrossed.len(),
            actual: probs.len(),
        })?;
        Ok(Self::Distribution { probs, vocabulary })
    }

    /// Vocabulary the result is expressed in.
    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        match self {
            Self::Label { vocabulary, .. } | Self::Distribution { vocabulary, .. } => *vocabulary,
        }
    }

    /// Most likely class (first one on ties).
    #[must_use]
    pub fn top_class(&self) -> usize {
        match self {
            Self::Label { index, .. } => *index,
            Self::Distribution { probs, .. } => argmax(probs),
        }
    }

    /// One-hot vector of a hard label.
    ///
    /// This is an approximation: a hard label carries no confidence, so the
    /// winning class gets `1.0` and every other class `0.0`.
    ///
    /// # Example
    /// ```
    /// use eb_core::labels::Vocabulary;
    /// use eb_core::prediction::PredictionResult;
    /// let p = PredictionResult::Label { index: 3, vocabulary: Vocabulary::GenderCrossed };
    /// let v = p.dense();
    /// assert_eq!(v.len(), 16);
    /// assert_eq!(v[3], 1.0);
    /// ```
    #[must_use]
    pub fn dense(&self) -> Vec<f32> {
        match self {
            Self::Label { index, vocabulary } => one_hot(*index, vocabulary.len()),
            Self::Distribution { probs, .. } => probs.clone(),
        }
    }

    /// Dense intensities expressed in `target`.
    ///
    /// 16 → 8 sums each female/male pair; 8 → 16 is not representable.
    ///
    /// # Errors
    /// Returns `VocabularyMismatch` when converting a basic result to the
    /// gender-crossed vocabulary.
    pub fn intensities(&self, target: Vocabulary) -> Result<Vec<f32>, CoreError> {
        let dense = self.dense();
        match (self.vocabulary(), target) {
            (a, b) if a == b => Ok(dense),
            (Vocabulary::GenderCrossed, Vocabulary::Basic) => {
                collapse_gender(&dense).ok_or(CoreError::VocabularyMismatch {
                    expected: Vocabulary::GenderCrossed.len(),
                    actual: dense.len(),
                })
            }
            (source, target) => Err(CoreError::VocabularyMismatch {
                expected: target.len(),
                actual: source.len(),
            }),
        }
    }
}

/// Vector of `len` zeros with `1.0` at `index` (all zeros if out of range).
#[must_use]
pub fn one_hot(index: usize, len: usize) -> Vec<f32> {
    let mut v = vec![0.0; len];
    if let Some(slot) = v.get_mut(index) {
        *slot = 1.0;
    }
    v
}

/// Index of the largest finite value; 0 for empty or all-NaN input.
#[must_use]
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

/// Block index → prediction, ordered by block index.
///
/// Append-only while the segmenter runs; keys always form `0..len()`.
///
/// # Example
/// ```
/// use eb_core::labels::Vocabulary;
/// use eb_core::prediction::{PredictionResult, StreamingOutput};
/// let mut out = StreamingOutput::new();
/// let p = PredictionResult::Label { index: 0, vocabulary: Vocabulary::GenderCrossed };
/// out.push(0, p.clone()).unwrap();
/// assert!(out.push(2, p).is_err());
/// assert_eq!(out.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamingOutput {
    blocks: BTreeMap<usize, PredictionResult>,
}

impl StreamingOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next block in arrival order.
    ///
    /// # Errors
    /// Returns `IncompleteStream` if `index` is not the next expected block.
    pub fn push(&mut self, index: usize, result: PredictionResult) -> Result<(), CoreError> {
        let expected = self.blocks.len();
        if index != expected {
            return Err(CoreError::IncompleteStream { missing: expected });
        }
        self.blocks.insert(index, result);
        Ok(())
    }

    /// Assemble results that finished out of order (parallel workers).
    ///
    /// # Errors
    /// Returns `IncompleteStream` naming the first gap in `0..n`, including
    /// a duplicated index.
    pub fn from_unordered(results: Vec<(usize, PredictionResult)>) -> Result<Self, CoreError> {
        let total = results.len();
        let blocks: BTreeMap<usize, PredictionResult> = results.into_iter().collect();
        if let Some(missing) = (0..total).find(|i| !blocks.contains_key(i)) {
            return Err(CoreError::IncompleteStream { missing });
        }
        Ok(Self { blocks })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PredictionResult> {
        self.blocks.get(&index)
    }

    /// Blocks in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PredictionResult)> {
        self.blocks.iter().map(|(k, v)| (*k, v))
    }
}
