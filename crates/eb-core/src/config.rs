use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::labels::Vocabulary;

/// Fixed sample rate every extractor assumes.
pub const SAMPLE_RATE: u32 = 44_100;
/// Single-shot offset into the clip, seconds.
pub const DEFAULT_OFFSET_SECS: f64 = 0.25;
/// Single-shot segment duration, seconds.
pub const DEFAULT_DURATION_SECS: f64 = 2.5;
/// Streaming block length, samples (2.5 s).
pub const DEFAULT_BLOCK_LENGTH: usize = 110_250;
/// Streaming hop, samples (0.5 s).
pub const DEFAULT_HOP_LENGTH: usize = 22_050;
/// Upper bound on any configured offset, window or block (one hour).
pub const MAX_WINDOW_SECS: f64 = 3600.0;
const MAX_WINDOW_SAMPLES: usize = 3600 * SAMPLE_RATE as usize;

/// Backend family, selected once from the `model_name` discriminator.
///
/// # Example
/// ```
/// use eb_core::config::ModelFamily;
/// assert_eq!(ModelFamily::parse("LSTM"), Some(ModelFamily::Recurrent));
/// assert_eq!(ModelFamily::parse("xgb"), Some(ModelFamily::Tree));
/// assert_eq!(ModelFamily::parse("svm"), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum ModelFamily {
    /// Gradient-boosted tree ensemble.
    Tree,
    /// Stacked LSTM sequence classifier.
    Recurrent,
    /// Convolutional mel-spectrogram classifier.
    Convolutional,
}

impl ModelFamily {
    /// Accepted `model_name` spellings.
    pub const EXPECTED: &'static str = "tree | xgb | gbt | lstm | cnn";

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tree" | "xgb" | "xgboost" | "gbt" => Some(Self::Tree),
            "lstm" | "rnn" | "recurrent" => Some(Self::Recurrent),
            "cnn" | "conv" | "convolutional" => Some(Self::Convolutional),
            _ => None,
        }
    }

    /// Canonical name for logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Recurrent => "lstm",
            Self::Convolutional => "cnn",
        }
    }

    /// Normalization the family was trained with; `None` for the mel
    /// image, already scaled to `[0, 1]`.
    #[must_use]
    pub fn default_normalization(self) -> Option<NormalizationPolicy> {
        match self {
            Self::Tree => Some(NormalizationPolicy::MinMax),
            Self::Recurrent => Some(NormalizationPolicy::Standardize),
            Self::Convolutional => None,
        }
    }
}

/// Per-row rescaling policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum NormalizationPolicy {
    /// `2*(x-min)/(max-min) - 1`, per row.
    #[default]
    MinMax,
    /// `(x-mean)/std`, per row.
    Standardize,
}

impl NormalizationPolicy {
    pub const EXPECTED: &'static str = "minmax | standardize";

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "minmax" => Some(Self::MinMax),
            "standardize" | "standard" | "zscore" => Some(Self::Standardize),
            _ => None,
        }
    }
}

/// Single clip or overlapping blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum RunMode {
    /// One fixed-duration segment → `{emotion: intensity}`.
    #[default]
    Single,
    /// Block/hop segmentation → `{block: [16 floats]}`.
    Streaming,
}

impl RunMode {
    pub const EXPECTED: &'static str = "single | streaming";

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "single" | "single_shot" | "oneshot" => Some(Self::Single),
            "streaming" | "stream" => Some(Self::Streaming),
            _ => None,
        }
    }
}

/// Resolved pipeline configuration. Read once, never mutated by the core.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub model_family: ModelFamily,
    /// Tree JSON or safetensors weights.
    pub model_file: PathBuf,
    pub input_audio_file: PathBuf,
    pub output_json_file: PathBuf,
    pub mode: RunMode,
    /// Row normalization of MFCC features; always `None` for `cnn`.
    pub normalization: Option<NormalizationPolicy>,
    /// Explicit label vocabulary; `None` = backend default.
    pub vocabulary: Option<Vocabulary>,
    pub offset_secs: f64,
    pub duration_secs: f64,
    pub block_length: usize,
    pub hop_length: usize,
    /// 0 = rayon default pool, 1 = sequential loop.
    pub workers: usize,
    /// Wall-clock budget of a streaming run.
    pub deadline: Option<Duration>,
    /// Surface numeric degeneracies as errors.
    pub strict: bool,
}

impl PipelineConfig {
    /// Samples in a single-shot segment at [`SAMPLE_RATE`].
    #[must_use]
    pub fn segment_samples(&self) -> usize {
        secs_to_samples(self.duration_secs)
    }

    /// Offset of a single-shot segment, in samples.
    #[must_use]
    pub fn offset_samples(&self) -> usize {
        secs_to_samples(self.offset_secs)
    }

    /// Samples each model input covers for the configured mode.
    #[must_use]
    pub fn input_samples(&self) -> usize {
        match self.mode {
            RunMode::Single => self.segment_samples(),
            RunMode::Streaming => self.block_length,
        }
    }
}

fn secs_to_samples(secs: f64) -> usize {
    (secs * f64::from(SAMPLE_RATE)).round() as usize
}

/// Flat key-value file, every key optional.
///
/// CLI overrides are applied on this struct before [`ConfigFile::resolve`].
/// Unknown keys (scene paths used by the animation side) are ignored.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ConfigFile {
    pub model_name: Option<String>,
    pub model_file: Option<PathBuf>,
    pub input_audio_file: Option<PathBuf>,
    pub output_json_file: Option<PathBuf>,
    pub mode: Option<String>,
    pub normalization: Option<String>,
    pub vocabulary: Option<String>,
    pub offset_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub block_length: Option<usize>,
    pub hop_length: Option<usize>,
    pub workers: Option<usize>,
    pub deadline_secs: Option<f64>,
    pub strict: Option<bool>,
}

impl ConfigFile {
    /// Parse TOML or JSON text. `json` selects the legacy `config.json` layout.
    ///
    /// # Errors
    /// Returns an error on malformed input.
    ///
    /// # Example
    /// ```
    /// use eb_core::config::ConfigFile;
    /// let file = ConfigFile::parse("model_name = \"cnn\"\nstrict = true\n", false).unwrap();
    /// assert_eq!(file.model_name.as_deref(), Some("cnn"));
    /// assert_eq!(file.strict, Some(true));
    /// ```
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            serde_json::from_str(content).context("Erreur de parsing JSON")
        } else {
            toml::from_str(content).context("Erreur de parsing TOML")
        }
    }

    /// Validate and merge with defaults.
    ///
    /// # Errors
    /// Names the first missing or invalid field.
    pub fn resolve(self) -> Result<PipelineConfig, CoreError> {
        let name = self.model_name.ok_or(CoreError::MissingField {
            field: "model_name",
        })?;
        let model_family = ModelFamily::parse(&name).ok_or_else(|| CoreError::UnknownValue {
            field: "model_name",
            value: name.clone(),
            expected: ModelFamily::EXPECTED,
        })?;
        let model_file = self.model_file.ok_or(CoreError::MissingField {
            field: "model_file",
        })?;
        let input_audio_file = self.input_audio_file.ok_or(CoreError::MissingField {
            field: "input_audio_file",
        })?;
        let output_json_file = self.output_json_file.ok_or(CoreError::MissingField {
            field: "output_json_file",
        })?;

        let mode = match self.mode {
            Some(v) => RunMode::parse(&v).ok_or(CoreError::UnknownValue {
                field: "mode",
                value: v,
                expected: RunMode::EXPECTED,
            })?,
            None => RunMode::default(),
        };
        let normalization = match self.normalization {
            Some(v) => {
                let policy = NormalizationPolicy::parse(&v).ok_or(CoreError::UnknownValue {
                    field: "normalization",
                    value: v,
                    expected: NormalizationPolicy::EXPECTED,
                })?;
                if model_family == ModelFamily::Convolutional {
                    log::warn!(
                        "normalization = {policy:?} ignoré : l'image mel du backend cnn est déjà dans [0, 1]"
                    );
                    None
                } else {
                    Some(policy)
                }
            }
            None => model_family.default_normalization(),
        };
        let vocabulary = match self.vocabulary {
            Some(v) => Some(Vocabulary::parse(&v).ok_or(CoreError::UnknownValue {
                field: "vocabulary",
                value: v,
                expected: "basic | gender_crossed",
            })?),
            None => None,
        };

        let offset_secs = self.offset_secs.unwrap_or(DEFAULT_OFFSET_SECS);
        if !(0.0..=MAX_WINDOW_SECS).contains(&offset_secs) {
            return Err(CoreError::Config(format!(
                "offset_secs doit être dans [0, {MAX_WINDOW_SECS}] (reçu {offset_secs})"
            )));
        }
        let duration_secs = self.duration_secs.unwrap_or(DEFAULT_DURATION_SECS);
        if duration_secs <= 0.0 || !(..=MAX_WINDOW_SECS).contains(&duration_secs) {
            return Err(CoreError::Config(format!(
                "duration_secs doit être dans ]0, {MAX_WINDOW_SECS}] (reçu {duration_secs})"
            )));
        }
        let block_length = self.block_length.unwrap_or(DEFAULT_BLOCK_LENGTH);
        if block_length == 0 || block_length > MAX_WINDOW_SAMPLES {
            return Err(CoreError::Config(format!(
                "block_length doit être dans [1, {MAX_WINDOW_SAMPLES}] (reçu {block_length})"
            )));
        }
        let hop_length = self.hop_length.unwrap_or(DEFAULT_HOP_LENGTH);
        if hop_length == 0 || hop_length > MAX_WINDOW_SAMPLES {
            return Err(CoreError::Config(format!(
                "hop_length doit être dans [1, {MAX_WINDOW_SAMPLES}] (reçu {hop_length})"
            )));
        }
        let deadline = match self.deadline_secs {
            // Négatif, NaN ou trop grand pour une `Duration` : refusé.
            Some(s) => Some(
                Duration::try_from_secs_f64(s)
                    .ok()
                    .filter(|d| !d.is_zero())
                    .ok_or_else(|| {
                        CoreError::Config(format!("deadline_secs doit être > 0 (reçu {s})"))
                    })?,
            ),
            None => None,
        };

        Ok(PipelineConfig {
            model_family,
            model_file,
            input_audio_file,
            output_json_file,
            mode,
            normalization,
            vocabulary,
            offset_secs,
            duration_secs,
            block_length,
            hop_length,
            workers: self.workers.unwrap_or(0),
            deadline,
            strict: self.strict.unwrap_or(false),
        })
    }
}

/// Lit un fichier de configuration plat (TOML, ou JSON si extension `.json`).
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use eb_core::config::load_config_file;
/// use std::path::Path;
/// let file = load_config_file(Path::new("config.toml")).unwrap();
/// ```
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    ConfigFile::parse(&content, json).with_context(|| format!("Dans {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CFG: &str = r#"
model_name = "lstm"
model_file = "models/lstm.safetensors"
input_audio_file = "clip.wav"
output_json_file = "out.json"
fbx_model_file = "head.fbx"
"#;

    const JSON_CFG: &str = r#"{
    "model_name": "lstm",
    "model_file": "models/lstm.safetensors",
    "input_audio_file": "clip.wav",
    "output_json_file": "out.json",
    "fbx_model_name": "Head"
}"#;

    #[test]
    fn toml_and_json_resolve_identically() {
        let a = ConfigFile::parse(TOML_CFG, false).unwrap().resolve().unwrap();
        let b = ConfigFile::parse(JSON_CFG, true).unwrap().resolve().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.model_family, ModelFamily::Recurrent);
        assert_eq!(a.normalization, Some(NormalizationPolicy::Standardize));
        assert_eq!(a.mode, RunMode::Single);
        assert_eq!(a.block_length, DEFAULT_BLOCK_LENGTH);
        assert_eq!(a.segment_samples(), 110_250);
        assert_eq!(a.offset_samples(), 11_025);
    }

    #[test]
    fn oversized_windows_name_their_field() {
        let base = ConfigFile {
            model_name: Some("lstm".into()),
            model_file: Some("w.safetensors".into()),
            input_audio_file: Some("a.wav".into()),
            output_json_file: Some("o.json".into()),
            ..ConfigFile::default()
        };
        let cases = [
            (
                "duration_secs",
                ConfigFile {
                    duration_secs: Some(1e300),
                    ..base.clone()
                },
            ),
            (
                "offset_secs",
                ConfigFile {
                    offset_secs: Some(1e18),
                    ..base.clone()
                },
            ),
            (
                "block_length",
                ConfigFile {
                    block_length: Some(usize::MAX),
                    ..base.clone()
                },
            ),
            (
                "deadline_secs",
                ConfigFile {
                    deadline_secs: Some(1e30),
                    ..base.clone()
                },
            ),
        ];
        for (field, file) in cases {
            match file.resolve() {
                Err(CoreError::Config(msg)) => assert!(msg.starts_with(field), "{msg}"),
                other => panic!("{field}: {other:?}"),
            }
        }
        let max = ConfigFile {
            duration_secs: Some(MAX_WINDOW_SECS),
            ..base
        };
        assert_eq!(max.resolve().unwrap().segment_samples(), MAX_WINDOW_SAMPLES);
    }

    #[test]
    fn missing_field_is_named() {
        let file = ConfigFile {
            model_name: Some("cnn".into()),
            model_file: Some("w.safetensors".into()),
            input_audio_file: Some("a.wav".into()),
            ..ConfigFile::default()
        };
        match file.resolve() {
            Err(CoreError::MissingField { field }) => assert_eq!(field, "output_json_file"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_backend_rejected() {
        let file = ConfigFile {
            model_name: Some("svm".into()),
            ..ConfigFile::default()
        };
        let err = file.resolve().err().map(|e| e.to_string()).unwrap();
        assert!(err.contains("model_name"), "{err}");
        assert!(err.contains("svm"), "{err}");
    }

    #[test]
    fn invalid_numbers_rejected() {
        let base = ConfigFile::parse(TOML_CFG, false).unwrap();
        let zero_hop = ConfigFile {
            hop_length: Some(0),
            ..base.clone()
        };
        assert!(matches!(zero_hop.resolve(), Err(CoreError::Config(_))));
        let negative = ConfigFile {
            duration_secs: Some(-1.0),
            ..base.clone()
        };
        assert!(matches!(negative.resolve(), Err(CoreError::Config(_))));
        let deadline = ConfigFile {
            deadline_secs: Some(0.0),
            ..base
        };
        assert!(matches!(deadline.resolve(), Err(CoreError::Config(_))));
    }

    #[test]
    fn cnn_ignores_configured_normalization() {
        let file = ConfigFile {
            model_name: Some("cnn".into()),
            model_file: Some("w.safetensors".into()),
            input_audio_file: Some("a.wav".into()),
            output_json_file: Some("o.json".into()),
            normalization: Some("minmax".into()),
            ..ConfigFile::default()
        };
        assert_eq!(file.clone().resolve().unwrap().normalization, None);
        // La valeur reste validée.
        let bad = ConfigFile {
            normalization: Some("l2".into()),
            ..file
        };
        assert!(matches!(
            bad.resolve(),
            Err(CoreError::UnknownValue {
                field: "normalization",
                ..
            })
        ));
    }

    #[test]
    fn streaming_overrides() {
        let mut file = ConfigFile::parse(TOML_CFG, false).unwrap();
        file.mode = Some("streaming".into());
        file.normalization = Some("min-max".into());
        file.deadline_secs = Some(1.5);
        file.workers = Some(1);
        let cfg = file.resolve().unwrap();
        assert_eq!(cfg.mode, RunMode::Streaming);
        assert_eq!(cfg.normalization, Some(NormalizationPolicy::MinMax));
        assert_eq!(cfg.deadline, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.input_samples(), DEFAULT_BLOCK_LENGTH);
    }
}
