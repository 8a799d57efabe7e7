use anyhow::{Context, Result};
use eb_audio::features::FeatureExtractor;
use eb_audio::normalize::normalize;
use eb_audio::segment::AudioSegment;
use eb_core::config::{ModelFamily, PipelineConfig, RunMode, SAMPLE_RATE};
use eb_core::features::{FeatureMatrix, InputShape, ModelInput};
use eb_core::labels::Vocabulary;
use eb_core::output::{Artifact, EmotionIntensities};
use eb_core::prediction::PredictionResult;
use eb_core::traits::EmotionModel;
use eb_core::{CoreError, NormalizationPolicy};
use eb_model::Backend;

/// How a feature matrix is laid out for the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Row-major flattened (tree).
    Flat,
    /// Frames × coefficients (LSTM).
    TimeMajor,
    /// One-channel image (CNN).
    Image,
}

impl Layout {
    #[must_use]
    pub fn for_family(family: ModelFamily) -> Self {
        match family {
            ModelFamily::Tree => Self::Flat,
            ModelFamily::Recurrent => Self::TimeMajor,
            ModelFamily::Convolutional => Self::Image,
        }
    }

    /// Shape a `(rows, cols)` matrix takes in this layout.
    #[must_use]
    pub fn shape(self, rows: usize, cols: usize) -> InputShape {
        match self {
            Self::Flat => InputShape::Flat { len: rows * cols },
            Self::TimeMajor => InputShape::TimeMajor {
                frames: cols,
                coeffs: rows,
            },
            Self::Image => InputShape::Image {
                channels: 1,
                height: rows,
                width: cols,
            },
        }
    }

    #[must_use]
    pub fn input(self, matrix: &FeatureMatrix) -> ModelInput {
        match self {
            Self::Flat => ModelInput::flat(matrix),
            Self::TimeMajor => ModelInput::time_major(matrix),
            Self::Image => ModelInput::image(matrix),
        }
    }
}

/// Extractor → normalizer → model, for one segment at a time.
///
/// Holds no per-block state: `infer` takes `&self` and the same pipeline is
/// shared by every streaming worker.
pub struct Pipeline<M> {
    extractor: FeatureExtractor,
    /// `None` for the mel image, already scaled to `[0, 1]`.
    normalization: Option<NormalizationPolicy>,
    layout: Layout,
    model: M,
    strict: bool,
}

impl Pipeline<Backend> {
    /// Build extractor and backend from the configuration.
    ///
    /// # Errors
    /// Backend load failure, a model whose input shape disagrees with the
    /// extractor output, or an 8-way model in streaming mode.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let extractor = match config.model_family {
            ModelFamily::Tree | ModelFamily::Recurrent => FeatureExtractor::mfcc(SAMPLE_RATE),
            ModelFamily::Convolutional => FeatureExtractor::mel_image(SAMPLE_RATE),
        };
        let (_, frames) = extractor.output_shape(config.input_samples());
        let model = Backend::load(config, frames)
            .with_context(|| format!("model_file = {}", config.model_file.display()))?;

        if config.mode == RunMode::Streaming && model.vocabulary() != Vocabulary::GenderCrossed {
            return Err(CoreError::Config(format!(
                "le mode streaming requiert un modèle à 16 classes ({} en prédit {})",
                model.name(),
                model.vocabulary().len()
            ))
            .into());
        }

        let pipeline = Self::new(
            extractor,
            config.normalization,
            Layout::for_family(config.model_family),
            model,
            config.strict,
        );
        pipeline.check_shapes(config.input_samples())?;
        Ok(pipeline)
    }
}

impl<M: EmotionModel> Pipeline<M> {
    #[must_use]
    pub fn new(
        extractor: FeatureExtractor,
        normalization: Option<NormalizationPolicy>,
        layout: Layout,
        model: M,
        strict: bool,
    ) -> Self {
        Self {
            extractor,
            normalization,
            layout,
            model,
            strict,
        }
    }

    /// Fail before any audio is touched if segments of `samples` length
    /// cannot feed the model.
    ///
    /// # Errors
    /// `ShapeMismatch` naming both shapes.
    pub fn check_shapes(&self, samples: usize) -> Result<(), CoreError> {
        let (rows, cols) = self.extractor.output_shape(samples);
        let produced = self.layout.shape(rows, cols);
        let expected = self.model.input_shape();
        if produced == expected {
            Ok(())
        } else {
            Err(CoreError::ShapeMismatch {
                backend: self.model.name(),
                expected: expected.to_string(),
                actual: produced.to_string(),
            })
        }
    }

    /// Run one segment through the whole chain.
    ///
    /// # Errors
    /// Extraction failure, shape mismatch, model failure, or a degenerate
    /// feature row under strict validation.
    pub fn infer(&self, segment: &AudioSegment) -> Result<PredictionResult> {
        let mut features = self.extractor.extract(segment)?;
        if let Some(policy) = self.normalization {
            normalize(&mut features, policy).check(self.strict)?;
        }
        let input = self.layout.input(&features);
        self.model.predict(&input)
    }

    /// Single-shot run: one segment → `{emotion: intensity}`.
    ///
    /// # Errors
    /// See [`Pipeline::infer`]; intensity errors under strict validation.
    pub fn run_single(&self, segment: &AudioSegment) -> Result<Artifact> {
        let result = self.infer(segment)?;
        log::info!(
            "Prédiction {} : classe {} ({:?})",
            self.model.name(),
            result.top_class(),
            result.vocabulary()
        );
        Ok(Artifact::Single(EmotionIntensities::encode(
            &result,
            self.strict,
        )?))
    }

    #[must_use]
    pub fn strict(&self) -> bool {
        self.strict
    }
}
