/// Configuration, types, and shared structures for emoblend.
///
/// This crate contains the label vocabularies, feature containers,
/// prediction results, the backend trait and the output encoder
/// used across the emoblend workspace.

pub mod config;
pub mod error;
pub mod features;
pub mod labels;
pub mod output;
pub mod prediction;
pub mod traits;

pub use config::{ModelFamily, NormalizationPolicy, PipelineConfig, RunMode};
pub use error::CoreError;
pub use features::{FeatureMatrix, InputShape, ModelInput};
pub use labels::Vocabulary;
pub use prediction::{PredictionResult, StreamingOutput};
pub use traits::EmotionModel;
