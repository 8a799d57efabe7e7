use crate::error::CoreError;
use crate::features::{InputShape, ModelInput};
use crate::labels::Vocabulary;
use crate::prediction::PredictionResult;

/// Classifie un bloc de features en émotion.
///
/// Implémenté par : `TreeEnsemble`, `RecurrentClassifier`, `ConvClassifier`.
/// Weights are loaded once; `predict` takes `&self` so one instance can be
/// shared across streaming workers.
///
/// # Example
/// ```
/// use eb_core::features::{InputShape, ModelInput};
/// use eb_core::labels::Vocabulary;
/// use eb_core::prediction::PredictionResult;
/// use eb_core::traits::EmotionModel;
///
/// struct Always;
/// impl EmotionModel for Always {
///     fn predict(&self, input: &ModelInput) -> anyhow::Result<PredictionResult> {
///         self.check_shape(input)?;
///         Ok(PredictionResult::Label { index: 0, vocabulary: Vocabulary::Basic })
///     }
///     fn input_shape(&self) -> InputShape { InputShape::Flat { len: 2 } }
///     fn vocabulary(&self) -> Vocabulary { Vocabulary::Basic }
///     fn name(&self) -> &'static str { "always" }
/// }
///
/// let input = ModelInput::new(InputShape::Flat { len: 3 }, vec![0.0; 3]).unwrap();
/// assert!(Always.predict(&input).is_err());
/// ```
pub trait EmotionModel: Send + Sync {
    /// Run inference on one feature block.
    ///
    /// CONTRAT : l'entrée doit avoir exactement `input_shape()`, sinon
    /// `CoreError::ShapeMismatch`. Jamais de troncature ni de padding.
    ///
    /// # Errors
    /// Shape mismatch or backend failure.
    fn predict(&self, input: &ModelInput) -> anyhow::Result<PredictionResult>;

    /// Declared input layout.
    fn input_shape(&self) -> InputShape;

    /// Label vocabulary of the output.
    fn vocabulary(&self) -> Vocabulary;

    /// Nom lisible pour les logs.
    fn name(&self) -> &'static str;

    /// Reject inputs whose shape differs from `input_shape()`.
    ///
    /// # Errors
    /// Returns `CoreError::ShapeMismatch` describing both shapes.
    fn check_shape(&self, input: &ModelInput) -> Result<(), CoreError> {
        let expected = self.input_shape();
        if input.shape() == expected {
            Ok(())
        } else {
            Err(CoreError::ShapeMismatch {
                backend: self.name(),
                expected: expected.to_string(),
                actual: input.shape().to_string(),
            })
        }
    }
}
