// Emotion classifier backends for emoblend.

pub mod backend;
pub mod cnn;
pub mod lstm;
pub mod tree;

pub use backend::Backend;
pub use cnn::ConvClassifier;
pub use lstm::RecurrentClassifier;
pub use tree::TreeEnsemble;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use eb_core::CoreError;

/// Load a safetensors file into a CPU `VarBuilder`.
///
/// Reads the whole file rather than mapping it, so no `unsafe` is needed.
///
/// # Errors
/// `FileNotFound` if the path is absent, or a read/format error.
pub(crate) fn load_weights(path: &Path) -> Result<VarBuilder<'static>> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let device = Device::Cpu;
    let tensors: HashMap<String, candle_core::Tensor> = candle_core::safetensors::load(path, &device)
        .with_context(|| format!("Poids illisibles : {}", path.display()))?;
    log::debug!("{} tenseurs chargés depuis {}", tensors.len(), path.display());
    Ok(VarBuilder::from_tensors(tensors, DType::F32, &device))
}
