use anyhow::{Context, Result};
use eb_core::CoreError;
use eb_core::config::{ModelFamily, PipelineConfig};
use eb_core::features::{InputShape, ModelInput};
use eb_core::labels::Vocabulary;
use eb_core::prediction::PredictionResult;
use eb_core::traits::EmotionModel;

use crate::cnn::ConvClassifier;
use crate::lstm::RecurrentClassifier;
use crate::tree::TreeEnsemble;

/// The one backend active for a run, chosen once from `model_name`.
///
/// Dispatch is a `match` on the variant, never on a string.
pub enum Backend {
    Tree(TreeEnsemble),
    Recurrent(RecurrentClassifier),
    Convolutional(ConvClassifier),
}

impl Backend {
    /// Load the configured backend.
    ///
    /// `feature_frames` is the number of MFCC frames the pipeline will feed a
    /// sequence model; the other backends fix their own input shape.
    ///
    /// # Errors
    /// Load failure, or a configured vocabulary that contradicts the model.
    pub fn load(config: &PipelineConfig, feature_frames: usize) -> Result<Self> {
        let path = config.model_file.as_path();
        let vocabulary = config.vocabulary.unwrap_or(Vocabulary::GenderCrossed);
        let backend = match config.model_family {
            ModelFamily::Tree => {
                let tree = TreeEnsemble::load(path)?;
                if let Some(wanted) = config.vocabulary
                    && wanted != tree.vocabulary()
                {
                    return Err(CoreError::Config(format!(
                        "vocabulary = {wanted:?} mais le modèle {} prédit {} classes",
                        path.display(),
                        tree.vocabulary().len()
                    ))
                    .into());
                }
                Self::Tree(tree)
            }
            ModelFamily::Recurrent => Self::Recurrent(
                RecurrentClassifier::load(path, feature_frames, vocabulary)
                    .with_context(|| format!("Chargement LSTM : {}", path.display()))?,
            ),
            ModelFamily::Convolutional => Self::Convolutional(
                ConvClassifier::load(path, vocabulary)
                    .with_context(|| format!("Chargement CNN : {}", path.display()))?,
            ),
        };
        log::info!(
            "Backend {} prêt : entrée {}, {} classes",
            backend.name(),
            backend.input_shape(),
            backend.vocabulary().len()
        );
        Ok(backend)
    }

    fn inner(&self) -> &dyn EmotionModel {
        match self {
            Self::Tree(m) => m,
            Self::Recurrent(m) => m,
            Self::Convolutional(m) => m,
        }
    }
}

impl EmotionModel for Backend {
    fn predict(&self, input: &ModelInput) -> Result<PredictionResult> {
        self.inner().predict(input)
    }

    fn input_shape(&self) -> InputShape {
        self.inner().input_shape()
    }

    fn vocabulary(&self) -> Vocabulary {
        self.inner().vocabulary()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use eb_core::config::ConfigFile;

    use super::*;

    fn config(model_name: &str, model_file: &Path, vocabulary: Option<&str>) -> PipelineConfig {
        ConfigFile {
            model_name: Some(model_name.into()),
            model_file: Some(model_file.to_path_buf()),
            input_audio_file: Some("clip.wav".into()),
            output_json_file: Some("out.json".into()),
            vocabulary: vocabulary.map(Into::into),
            ..ConfigFile::default()
        }
        .resolve()
        .unwrap()
    }

    const TREE: &str = r#"{"num_features": 4, "num_classes": 8,
        "trees": [{"class_id": 1, "nodes": [{"leaf": 1.0}]}]}"#;

    #[test]
    fn tree_selected_from_discriminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgb.json");
        std::fs::write(&path, TREE).unwrap();

        let backend = Backend::load(&config("xgb", &path, None), 216).unwrap();
        assert!(matches!(backend, Backend::Tree(_)));
        assert_eq!(backend.name(), "tree");
        assert_eq!(backend.input_shape(), InputShape::Flat { len: 4 });

        let input = ModelInput::new(InputShape::Flat { len: 4 }, vec![0.0; 4])
            .unwrap();
        let p = backend.predict(&input).unwrap();
        assert_eq!(p.top_class(), 1);
    }

    #[test]
    fn tree_vocabulary_conflict_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xgb.json");
        std::fs::write(&path, TREE).unwrap();
        let err = Backend::load(&config("tree", &path, Some("gender_crossed")), 216)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::Config(_))
        ));
    }

    #[test]
    fn missing_weights_reported() {
        let err = Backend::load(&config("cnn", Path::new("/nonexistent/cnn.safetensors"), None), 0)
            .err()
            .unwrap();
        assert!(
            err.chain()
                .any(|e| matches!(e.downcast_ref::<CoreError>(), Some(CoreError::FileNotFound { .. }))),
            "{err:#}"
        );
    }
}
