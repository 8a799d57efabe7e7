use std::path::Path;

use anyhow::Result;
use candle_core::{D, Device, Tensor};
use candle_nn::{
    BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, Linear, Module, ModuleT, VarBuilder,
};
use eb_core::features::{InputShape, ModelInput};
use eb_core::labels::Vocabulary;
use eb_core::prediction::PredictionResult;
use eb_core::traits::EmotionModel;

/// Mel bands of the input image.
pub const IMAGE_HEIGHT: usize = 128;
/// Frames of the input image.
pub const IMAGE_WIDTH: usize = 320;
/// Flattened feature count after the last pooling stage (128 × 3 × 9).
pub const FLAT_FEATURES: usize = 128 * 3 * 9;

const BN_EPS: f64 = 1e-5;

/// Conv(k3, s2) → BatchNorm → ReLU.
struct ConvStage {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvStage {
    fn new(in_c: usize, out_c: usize, conv_vb: VarBuilder, bn_vb: VarBuilder) -> Result<Self> {
        let cfg = Conv2dConfig {
            stride: 2,
            ..Conv2dConfig::default()
        };
        let conv = candle_nn::conv2d(in_c, out_c, 3, cfg, conv_vb)?;
        let bn = candle_nn::batch_norm(
            out_c,
            BatchNormConfig {
                eps: BN_EPS,
                ..BatchNormConfig::default()
            },
            bn_vb,
        )?;
        Ok(Self { conv, bn })
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.conv.forward(x)?;
        // Statistiques courantes : mode inférence.
        let x = self.bn.forward_t(&x, false)?;
        Ok(x.relu()?)
    }
}

/// Three-stage CNN over a `1 × 128 × 320` mel image.
///
/// ```text
/// [1,128,320] → conv s2 → [32,63,159] → conv s2 → [64,31,79] → pool → [64,15,39]
///             → conv s2 → [128,7,19]  → pool → [128,3,9] → flatten → linear → N
/// ```
///
/// Weight names follow the PyTorch `Sequential` indices: convolutions at
/// `0`, `3`, `7`, batch norms at `1`, `4`, `8`, the classifier at `12`.
pub struct ConvClassifier {
    stages: [ConvStage; 3],
    classifier: Linear,
    vocabulary: Vocabulary,
    device: Device,
}

impl ConvClassifier {
    /// Build from a `VarBuilder` rooted at the `Sequential`.
    ///
    /// # Errors
    /// Missing or mis-shaped tensor.
    pub fn new(vb: &VarBuilder, vocabulary: Vocabulary) -> Result<Self> {
        let stages = [
            ConvStage::new(1, 32, vb.pp("0"), vb.pp("1"))?,
            ConvStage::new(32, 64, vb.pp("3"), vb.pp("4"))?,
            ConvStage::new(64, 128, vb.pp("7"), vb.pp("8"))?,
        ];
        let classifier = candle_nn::linear(FLAT_FEATURES, vocabulary.len(), vb.pp("12"))?;
        Ok(Self {
            stages,
            classifier,
            vocabulary,
            device: vb.device().clone(),
        })
    }

    /// Load weights from a safetensors file.
    ///
    /// # Errors
    /// Missing file or incompatible weights.
    pub fn load(path: &Path, vocabulary: Vocabulary) -> Result<Self> {
        let vb = crate::load_weights(path)?;
        let model = Self::new(&vb, vocabulary)?;
        log::info!(
            "CNN chargé depuis {} ({} classes)",
            path.display(),
            vocabulary.len()
        );
        Ok(model)
    }

    fn logits(&self, x: &Tensor) -> Result<Tensor> {
        let [s1, s2, s3] = &self.stages;
        let x = s1.forward(x)?;
        let x = s2.forward(&x)?.max_pool2d(2)?;
        let x = s3.forward(&x)?.max_pool2d(2)?;
        let x = x.flatten_from(1)?;
        Ok(self.classifier.forward(&x)?)
    }
}

impl EmotionModel for ConvClassifier {
    fn predict(&self, input: &ModelInput) -> Result<PredictionResult> {
        self.check_shape(input)?;
        let x = Tensor::from_slice(
            input.data(),
            (1, 1, IMAGE_HEIGHT, IMAGE_WIDTH),
            &self.device,
        )?;
        let probs = candle_nn::ops::softmax(&self.logits(&x)?, D::Minus1)?;
        let probs = probs.squeeze(0)?.to_vec1::<f32>()?;
        Ok(PredictionResult::Distribution {
            probs,
            vocabulary: self.vocabulary,
        })
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Image {
            channels: 1,
            height: IMAGE_HEIGHT,
            width: IMAGE_WIDTH,
        }
    }

    fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    fn name(&self) -> &'static str {
        "cnn"
    }
}
