use serde::{Deserialize, Serialize};

/// Base emotion vocabulary, in class-index order.
pub const EMOTIONS: [&str; 8] = [
    "neutral",
    "calm",
    "happy",
    "sad",
    "angry",
    "fearful",
    "disgust",
    "surprised",
];

/// Voice-actor attribute prefixes, in gender-index order.
pub const GENDERS: [&str; 2] = ["female", "male"];

/// Gender-crossed vocabulary: `index = 2 * emotion + gender`.
pub const ID2EMOTIONS: [&str; 16] = [
    "female_neutral",
    "male_neutral",
    "female_calm",
    "male_calm",
    "female_happy",
    "male_happy",
    "female_sad",
    "male_sad",
    "female_angry",
    "male_angry",
    "female_fearful",
    "male_fearful",
    "female_disgust",
    "male_disgust",
    "female_surprised",
    "male_surprised",
];

/// Label vocabulary a model predicts over.
///
/// # Example
/// ```
/// use eb_core::labels::Vocabulary;
/// assert_eq!(Vocabulary::Basic.len(), 8);
/// assert_eq!(Vocabulary::GenderCrossed.len(), 16);
/// assert_eq!(Vocabulary::from_len(16), Some(Vocabulary::GenderCrossed));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vocabulary {
    /// The 8 base emotions.
    Basic,
    /// The 16 emotion × gender classes.
    GenderCrossed,
}

impl Vocabulary {
    /// Number of classes.
    #[must_use]
    pub fn len(self) -> usize {
        match self {
            Self::Basic => EMOTIONS.len(),
            Self::GenderCrossed => ID2EMOTIONS.len(),
        }
    }

    /// Always false; a vocabulary is never empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        false
    }

    /// Class names in index order.
    #[must_use]
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Self::Basic => &EMOTIONS,
            Self::GenderCrossed => &ID2EMOTIONS,
        }
    }

    /// Vocabulary with exactly `len` classes, if any.
    #[must_use]
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            8 => Some(Self::Basic),
            16 => Some(Self::GenderCrossed),
            _ => None,
        }
    }

    /// Parse the configuration spelling.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "basic" | "8" => Some(Self::Basic),
            "gender_crossed" | "gendered" | "16" => Some(Self::GenderCrossed),
            _ => None,
        }
    }
}

/// Gender-crossed class index of `(emotion, gender)`.
///
/// # Example
/// ```
/// use eb_core::labels::{crossed_index, ID2EMOTIONS};
/// assert_eq!(ID2EMOTIONS[crossed_index(2, 1)], "male_happy");
/// ```
#[must_use]
pub const fn crossed_index(emotion: usize, gender: usize) -> usize {
    2 * emotion + gender
}

/// Base emotion index of a gender-crossed class.
#[must_use]
pub const fn base_emotion(crossed: usize) -> usize {
    crossed / 2
}

/// Fold a 16-way vector into 8 base emotions by summing each female/male pair.
///
/// Returns `None` if `values` is not 16 long.
#[must_use]
pub fn collapse_gender(values: &[f32]) -> Option<Vec<f32>> {
    if values.len() != ID2EMOTIONS.len() {
        return None;
    }
    Some(values.chunks_exact(2).map(|pair| pair[0] + pair[1]).collect())
}
