use std::path::Path;

use anyhow::Result;

use eb_core::config::SAMPLE_RATE;

use crate::decode::decode_to_rate;
use crate::error::AudioError;

/// Fixed-rate mono samples, immutable once built.
///
/// # Example
/// ```
/// use eb_audio::segment::AudioSegment;
/// let seg = AudioSegment::new(vec![0.0; 44100], 44100);
/// assert!((seg.duration_secs() - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Copy `len` samples starting at `start`, zero-filling past the source end.
    #[must_use]
    pub fn padded(source: &[f32], start: usize, len: usize, sample_rate: u32) -> Self {
        let mut samples = vec![0.0; len];
        if start < source.len() {
            let end = (start + len).min(source.len());
            samples[..end - start].copy_from_slice(&source[start..end]);
        }
        Self::new(samples, sample_rate)
    }

    /// Single-shot window: `duration` samples taken at `offset`.
    ///
    /// A clip ending before `offset + duration` is zero-padded to full length
    /// (with a warning) so the feature shape stays fixed.
    ///
    /// # Errors
    /// Returns `EmptySegment` if the clip has no sample past `offset`.
    pub fn window(
        source: &[f32],
        sample_rate: u32,
        offset: usize,
        duration: usize,
    ) -> Result<Self, AudioError> {
        if offset >= source.len() || duration == 0 {
            return Err(AudioError::EmptySegment);
        }
        let available = source.len() - offset;
        if available < duration {
            log::warn!(
                "Clip trop court : {available} échantillons après l'offset, complété à {duration}"
            );
        }
        Ok(Self::padded(source, offset, duration, sample_rate))
    }

    /// Decode `path` at the pipeline rate and cut the single-shot window.
    ///
    /// `offset` and `duration` count samples at [`SAMPLE_RATE`].
    ///
    /// # Errors
    /// Decode failure or empty window.
    pub fn load(path: &Path, offset: usize, duration: usize) -> Result<Self> {
        let samples = decode_to_rate(path, SAMPLE_RATE)?;
        Ok(Self::window(&samples, SAMPLE_RATE, offset, duration)?)
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}
