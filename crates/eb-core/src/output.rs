//! Canonical artifact consumed by the animation side.
//!
//! Single-shot: `{"neutral": 0.0, "calm": 1.0, ...}` over the 8 base emotions.
//! Streaming: `{"0": [16 floats], "1": [...], ...}` in block order.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::CoreError;
use crate::labels::{Vocabulary, collapse_gender};
use crate::prediction::{PredictionResult, StreamingOutput};

/// Clamp an intensity into `[0, 1]`; non-finite values become `0.0`.
///
/// # Example
/// ```
/// use eb_core::output::clip_01;
/// assert_eq!(clip_01(1.5), 1.0);
/// assert_eq!(clip_01(-0.2), 0.0);
/// assert_eq!(clip_01(f32::NAN), 0.0);
/// assert_eq!(clip_01(0.25), 0.25);
/// ```
#[inline]
#[must_use]
pub fn clip_01(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

/// Apply [`clip_01`], or fail on the first bad value when `strict`.
fn sanitize(values: Vec<f32>, strict: bool, what: &str) -> Result<Vec<f32>, CoreError> {
    if let Some((i, v)) = values
        .iter()
        .enumerate()
        .find(|&(_, v)| !v.is_finite() || !(0.0..=1.0).contains(v))
    {
        if strict {
            return Err(CoreError::NumericDegeneracy(format!(
                "{what} : intensité {v} hors [0,1] à l'indice {i}"
            )));
        }
        log::debug!("{what}: intensity {v} at {i} clipped into [0,1]");
    }
    Ok(values.into_iter().map(clip_01).collect())
}

/// `{emotion_name: intensity}` over the base vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionIntensities {
    values: Vec<f32>,
}

impl EmotionIntensities {
    /// Encode a single-shot result.
    ///
    /// # Errors
    /// Vocabulary mismatch, or a bad intensity under `strict`.
    ///
    /// # Example
    /// ```
    /// use eb_core::labels::Vocabulary;
    /// use eb_core::output::EmotionIntensities;
    /// use eb_core::prediction::PredictionResult;
    /// let p = PredictionResult::Label { index: 2, vocabulary: Vocabulary::Basic };
    /// let out = EmotionIntensities::encode(&p, false).unwrap();
    /// assert_eq!(out.get("happy"), Some(1.0));
    /// assert_eq!(out.get("sad"), Some(0.0));
    /// ```
    pub fn encode(result: &PredictionResult, strict: bool) -> Result<Self, CoreError> {
        let values = match result.vocabulary() {
            Vocabulary::Basic => sanitize(result.dense(), strict, "single-shot")?,
            Vocabulary::GenderCrossed => {
                // Chaque moitié est corrigée avant la somme : un NaN ne doit
                // pas effacer l'autre genre.
                let crossed = sanitize(result.dense(), strict, "single-shot")?;
                collapse_gender(&crossed)
                    .ok_or(CoreError::VocabularyMismatch {
                        expected: Vocabulary::GenderCrossed.len(),
                        actual: crossed.len(),
                    })?
                    .into_iter()
                    .map(clip_01)
                    .collect()
            }
        };
        Ok(Self { values })
    }

    /// Intensity of a named emotion.
    #[must_use]
    pub fn get(&self, emotion: &str) -> Option<f32> {
        Vocabulary::Basic
            .names()
            .iter()
            .position(|n| *n == emotion)
            .map(|i| self.values[i])
    }

    /// `(name, intensity)` in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        Vocabulary::Basic
            .names()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

impl Serialize for EmotionIntensities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Ordre du vocabulaire, pas l'ordre alphabétique.
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, v) in self.iter() {
            map.serialize_entry(name, &v)?;
        }
        map.end()
    }
}

/// `{block_index: [16 floats]}` for a streaming run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmotionTimeline {
    frames: BTreeMap<usize, Vec<f32>>,
}

impl EmotionTimeline {
    /// Encode a complete streaming output over the gender-crossed vocabulary.
    ///
    /// Hard labels (tree backend) become one-hot rows.
    ///
    /// # Errors
    /// Vocabulary mismatch, or a bad intensity under `strict`.
    pub fn encode(output: &StreamingOutput, strict: bool) -> Result<Self, CoreError> {
        let mut frames = BTreeMap::new();
        for (index, result) in output.iter() {
            let dense = result.intensities(Vocabulary::GenderCrossed)?;
            frames.insert(index, sanitize(dense, strict, "streaming")?);
        }
        Ok(Self { frames })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&[f32]> {
        self.frames.get(&index).map(Vec::as_slice)
    }
}

/// Terminal artifact of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Artifact {
    Single(EmotionIntensities),
    Streaming(EmotionTimeline),
}

impl Artifact {
    /// Pretty JSON text.
    ///
    /// # Errors
    /// Serialization failure.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Sérialisation JSON impossible")
    }

    /// Écrit l'artefact de façon atomique (fichier temporaire puis renommage).
    ///
    /// # Errors
    /// Returns an error if the destination directory is not writable.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Impossible de créer un fichier dans {}", dir.display()))?;
        tmp.write_all(self.to_json()?.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        log::info!("Artefact écrit : {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossed(probs: Vec<f32>) -> PredictionResult {
        PredictionResult::Distribution {
            probs,
            vocabulary: Vocabulary::GenderCrossed,
        }
    }

    #[test]
    fn single_shot_keys_in_vocabulary_order() {
        let p = PredictionResult::Label {
            index: 7,
            vocabulary: Vocabulary::Basic,
        };
        let json = Artifact::Single(EmotionIntensities::encode(&p, false).unwrap())
            .to_json()
            .unwrap();
        let neutral = json.find("neutral").unwrap();
        let surprised = json.find("surprised").unwrap();
        assert!(neutral < surprised, "{json}");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["surprised"], 1.0);
        assert_eq!(parsed.as_object().map(serde_json::Map::len), Some(8));
    }

    #[test]
    fn out_of_range_clipped_unless_strict() {
        let mut probs = vec![0.0; 16];
        probs[0] = f32::NAN;
        probs[1] = 1.7;
        let p = crossed(probs);
        let lenient = EmotionIntensities::encode(&p, false).unwrap();
        assert_eq!(lenient.get("neutral"), Some(1.0));
        assert!(matches!(
            EmotionIntensities::encode(&p, true),
            Err(CoreError::NumericDegeneracy(_))
        ));
    }

    #[test]
    fn nan_half_keeps_other_gender() {
        let mut probs = vec![0.0; 16];
        probs[2] = f32::NAN;
        probs[3] = 0.4;
        probs[4] = 0.7;
        probs[5] = 0.6;
        let out = EmotionIntensities::encode(&crossed(probs), false).unwrap();
        assert_eq!(out.get("calm"), Some(0.4));
        // Somme des deux moitiés recoupée dans [0,1].
        assert_eq!(out.get("happy"), Some(1.0));
        assert_eq!(out.get("neutral"), Some(0.0));
    }

    #[test]
    fn timeline_keys_are_block_indices() {
        let mut out = StreamingOutput::new();
        for i in 0..3 {
            let mut probs = vec![0.0; 16];
            probs[i] = 1.0;
            out.push(i, crossed(probs)).unwrap();
        }
        let timeline = EmotionTimeline::encode(&out, true).unwrap();
        assert_eq!(timeline.len(), 3);
        let parsed: serde_json::Value =
            serde_json::from_str(&Artifact::Streaming(timeline).to_json().unwrap())
                .unwrap();
        assert_eq!(parsed["2"].as_array().map(Vec::len), Some(16));
        assert_eq!(parsed["2"][2], 1.0);
    }

    #[test]
    fn basic_stream_rejected() {
        let mut out = StreamingOutput::new();
        out.push(
            0,
            PredictionResult::Label {
                index: 0,
                vocabulary: Vocabulary::Basic,
            },
        )
        .unwrap();
        assert!(EmotionTimeline::encode(&out, false).is_err());
    }

    #[test]
    fn write_json_persists_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emotion.json");
        let p = PredictionResult::Label {
            index: 0,
            vocabulary: Vocabulary::Basic,
        };
        let artifact = Artifact::Single(EmotionIntensities::encode(&p, false).unwrap());
        artifact.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"neutral\": 1.0"), "{text}");
    }
}
