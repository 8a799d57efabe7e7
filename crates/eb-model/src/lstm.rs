use std::path::Path;

use anyhow::Result;
use candle_core::{D, Device, Tensor};
use candle_nn::rnn::{LSTM, LSTMConfig, RNN, lstm};
use candle_nn::{Linear, Module, VarBuilder};
use eb_core::features::{InputShape, ModelInput};
use eb_core::labels::Vocabulary;
use eb_core::prediction::PredictionResult;
use eb_core::traits::EmotionModel;

/// MFCC coefficients per time step.
pub const INPUT_COEFFS: usize = 20;
/// Stacked LSTM layers.
pub const NUM_LAYERS: usize = 3;
/// LSTM hidden width.
pub const HIDDEN: usize = 64;
/// Width of the hidden projection in the head.
pub const HEAD_HIDDEN: usize = 32;

/// 3-layer LSTM over `frames × 20` MFCC sequences.
///
/// Only the last time step of the top layer feeds the head
/// `Linear(64→32) → ReLU → Linear(32→N) → softmax`. The training-time
/// inter-layer dropout (0.2) is an identity at inference and has no weights.
///
/// Weight names follow a PyTorch `Sequential`: `0.weight_ih_l{k}`,
/// `0.weight_hh_l{k}`, `0.bias_ih_l{k}`, `0.bias_hh_l{k}`, `2.*`, `4.*`.
pub struct RecurrentClassifier {
    layers: Vec<LSTM>,
    fc1: Linear,
    fc2: Linear,
    frames: usize,
    vocabulary: Vocabulary,
    device: Device,
}

impl RecurrentClassifier {
    /// Build from a `VarBuilder` rooted at the `Sequential`.
    ///
    /// # Errors
    /// Missing or mis-shaped tensor.
    pub fn new(vb: &VarBuilder, frames: usize, vocabulary: Vocabulary) -> Result<Self> {
        let layers = (0..NUM_LAYERS)
            .map(|k| {
                let in_dim = if k == 0 { INPUT_COEFFS } else { HIDDEN };
                let cfg = LSTMConfig {
                    layer_idx: k,
                    ..LSTMConfig::default()
                };
                lstm(in_dim, HIDDEN, cfg, vb.pp("0"))
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        let fc1 = candle_nn::linear(HIDDEN, HEAD_HIDDEN, vb.pp("2"))?;
        let fc2 = candle_nn::linear(HEAD_HIDDEN, vocabulary.len(), vb.pp("4"))?;
        Ok(Self {
            layers,
            fc1,
            fc2,
            frames,
            vocabulary,
            device: vb.device().clone(),
        })
    }

    /// Load weights from a safetensors file.
    ///
    /// # Errors
    /// Missing file or incompatible weights.
    pub fn load(path: &Path, frames: usize, vocabulary: Vocabulary) -> Result<Self> {
        let vb = crate::load_weights(path)?;
        let model = Self::new(&vb, frames, vocabulary)?;
        log::info!(
            "LSTM chargé depuis {} ({} classes, {} trames)",
            path.display(),
            vocabulary.len(),
            frames
        );
        Ok(model)
    }

    /// Logits for a `(1, frames, 20)` batch.
    fn logits(&self, x: &Tensor) -> Result<Tensor> {
        let mut seq = x.clone();
        let mut last = None;
        for layer in &self.layers {
            let states = layer.seq(&seq)?;
            seq = layer.states_to_tensor(&states)?;
            last = states.last().map(|s| s.h().clone());
        }
        let h = last.ok_or_else(|| anyhow::anyhow!("séquence vide"))?;
        let h = self.fc1.forward(&h)?.relu()?;
        Ok(self.fc2.forward(&h)?)
    }
}

impl EmotionModel for RecurrentClassifier {
    fn predict(&self, input: &ModelInput) -> Result<PredictionResult> {
        self.check_shape(input)?;
        let x = Tensor::from_slice(input.data(), (1, self.frames, INPUT_COEFFS), &self.device)?;
        let probs = candle_nn::ops::softmax(&self.logits(&x)?, D::Minus1)?;
        let probs = probs.squeeze(0)?.to_vec1::<f32>()?;
        Ok(PredictionResult::Distribution {
            probs,
            vocabulary: self.vocabulary,
        })
    }

    fn input_shape(&self) -> InputShape {
        InputShape::TimeMajor {
            frames: self.frames,
            coeffs: INPUT_COEFFS,
        }
    }

    fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    fn name(&self) -> &'static str {
        "lstm"
    }
}
