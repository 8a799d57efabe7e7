use eb_core::FeatureMatrix;

use crate::fft::Stft;
use crate::mel::{MelFilterbank, power_to_db};

/// STFT window of the spectrogram image.
pub const IMAGE_N_FFT: usize = 1380;
/// STFT hop of the spectrogram image.
pub const IMAGE_HOP: usize = 345;
/// Image height (mel bands).
pub const IMAGE_N_MELS: usize = 128;

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// Log-mel spectrogram rendered as an 8-bit grayscale image scaled to `[0, 1]`.
///
/// dB relative to the segment peak, floored at `-80 dB`, then quantized to
/// `0..=255` and divided by 255. Rows are mel bands (low frequencies first),
/// columns are frames.
///
/// # Example
/// ```
/// use eb_audio::spectrogram::MelImageExtractor;
/// let ex = MelImageExtractor::new(44100);
/// assert_eq!(ex.output_shape(110_250), (128, 320));
/// ```
pub struct MelImageExtractor {
    stft: Stft,
    mel: MelFilterbank,
}

impl MelImageExtractor {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stft: Stft::new(IMAGE_N_FFT, IMAGE_HOP),
            mel: MelFilterbank::new(sample_rate, IMAGE_N_FFT, IMAGE_N_MELS, 0.0, None),
        }
    }

    /// `(mel bands, frames)` for `len` samples.
    #[must_use]
    pub fn output_shape(&self, len: usize) -> (usize, usize) {
        (self.mel.n_mels(), self.stft.num_frames(len))
    }

    /// Mel × frame image with pixel values in `[0, 1]`.
    #[must_use]
    pub fn compute(&self, samples: &[f32]) -> FeatureMatrix {
        let mut mel: Vec<Vec<f32>> = self
            .stft
            .power(samples)
            .iter()
            .map(|frame| self.mel.apply(frame))
            .collect();
        let peak = mel.iter().flatten().fold(0.0f32, |m, &v| m.max(v));
        power_to_db(&mut mel, peak, AMIN, Some(TOP_DB));

        let (rows, cols) = (self.mel.n_mels(), mel.len());
        let mut out = FeatureMatrix::zeros(rows, cols);
        for (t, frame) in mel.iter().enumerate() {
            for (m, &db) in frame.iter().enumerate() {
                if let Some(slot) = out.get_mut(m, t) {
                    *slot = to_pixel(db) / 255.0;
                }
            }
        }
        out
    }
}

/// dB in `[-TOP_DB, 0]` → 8-bit level.
fn to_pixel(db: f32) -> f32 {
    if !db.is_finite() {
        return 0.0;
    }
    ((db + TOP_DB) / TOP_DB * 255.0).round().clamp(0.0, 255.0)
}
