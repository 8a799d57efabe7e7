use eb_core::FeatureMatrix;

use crate::fft::Stft;
use crate::mel::{MelFilterbank, power_to_db};

/// MFCC coefficients kept per frame.
pub const N_MFCC: usize = 20;
/// STFT window for MFCC.
pub const MFCC_N_FFT: usize = 2048;
/// STFT hop for MFCC.
pub const MFCC_HOP: usize = 512;
/// Mel bands fed into the DCT.
pub const MFCC_N_MELS: usize = 128;

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// Orthonormal DCT-II basis, `n_out` rows of `n_in` weights.
#[must_use]
pub fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| {
                    (scale * (std::f64::consts::PI * k as f64 * (i as f64 + 0.5) / n).cos()) as f32
                })
                .collect()
        })
        .collect()
}

/// Log-mel cepstrum: STFT → mel → dB → DCT-II, first [`N_MFCC`] coefficients.
///
/// # Example
/// ```
/// use eb_audio::mfcc::MfccExtractor;
/// let mfcc = MfccExtractor::new(44100);
/// let m = mfcc.compute(&vec![0.0; 110_250]);
/// assert_eq!(m.shape(), (20, 216));
/// ```
pub struct MfccExtractor {
    stft: Stft,
    mel: MelFilterbank,
    dct: Vec<Vec<f32>>,
}

impl MfccExtractor {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self::with_params(sample_rate, N_MFCC, MFCC_N_FFT, MFCC_HOP, MFCC_N_MELS)
    }

    /// # Panics
    /// Panics if `n_fft` or `hop` is 0.
    #[must_use]
    pub fn with_params(
        sample_rate: u32,
        n_mfcc: usize,
        n_fft: usize,
        hop: usize,
        n_mels: usize,
    ) -> Self {
        Self {
            stft: Stft::new(n_fft, hop),
            mel: MelFilterbank::new(sample_rate, n_fft, n_mels, 0.0, None),
            dct: dct_basis(n_mfcc, n_mels),
        }
    }

    /// `(coefficients, frames)` for `len` samples.
    #[must_use]
    pub fn output_shape(&self, len: usize) -> (usize, usize) {
        (self.dct.len(), self.stft.num_frames(len))
    }

    /// Coefficient × frame matrix.
    #[must_use]
    pub fn compute(&self, samples: &[f32]) -> FeatureMatrix {
        let mut mel: Vec<Vec<f32>> = self
            .stft
            .power(samples)
            .iter()
            .map(|frame| self.mel.apply(frame))
            .collect();
        power_to_db(&mut mel, 1.0, AMIN, Some(TOP_DB));

        let (rows, cols) = (self.dct.len(), mel.len());
        let mut out = FeatureMatrix::zeros(rows, cols);
        for (t, frame) in mel.iter().enumerate() {
            for (k, basis) in self.dct.iter().enumerate() {
                let c: f32 = basis.iter().zip(frame).map(|(w, x)| w * x).sum();
                if let Some(slot) = out.get_mut(k, t) {
                    *slot = c;
                }
            }
        }
        out
    }
}
