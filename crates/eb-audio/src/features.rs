use eb_core::FeatureMatrix;

use crate::error::AudioError;
use crate::mfcc::MfccExtractor;
use crate::segment::AudioSegment;
use crate::spectrogram::MelImageExtractor;

/// Fixed transform from an audio segment to a feature matrix.
///
/// Both variants assume one sample rate, fixed at construction. Decoding
/// resamples to that rate; a segment built at any other rate is rejected.
///
/// # Example
/// ```
/// use eb_audio::features::FeatureExtractor;
/// use eb_audio::segment::AudioSegment;
/// let ex = FeatureExtractor::mfcc(44100);
/// let seg = AudioSegment::new(vec![0.0; 110_250], 44100);
/// let m = ex.extract(&seg).unwrap();
/// assert_eq!(m.shape(), (20, 216));
/// assert!(ex.extract(&AudioSegment::new(vec![0.0; 100], 16000)).is_err());
/// ```
pub enum FeatureExtractor {
    /// 20 MFCC × frames (tree and recurrent backends).
    Mfcc {
        sample_rate: u32,
        inner: MfccExtractor,
    },
    /// 128 mel × 320 frames image (convolutional backend).
    MelImage {
        sample_rate: u32,
        inner: MelImageExtractor,
    },
}

impl FeatureExtractor {
    #[must_use]
    pub fn mfcc(sample_rate: u32) -> Self {
        Self::Mfcc {
            sample_rate,
            inner: MfccExtractor::new(sample_rate),
        }
    }

    #[must_use]
    pub fn mel_image(sample_rate: u32) -> Self {
        Self::MelImage {
            sample_rate,
            inner: MelImageExtractor::new(sample_rate),
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Mfcc { sample_rate, .. } | Self::MelImage { sample_rate, .. } => *sample_rate,
        }
    }

    /// `(rows, cols)` produced for a segment of `len` samples.
    #[must_use]
    pub fn output_shape(&self, len: usize) -> (usize, usize) {
        match self {
            Self::Mfcc { inner, .. } => inner.output_shape(len),
            Self::MelImage { inner, .. } => inner.output_shape(len),
        }
    }

    /// Extract features from one segment. Pure: no state is kept.
    ///
    /// # Errors
    /// `EmptySegment` or `SampleRateMismatch`.
    pub fn extract(&self, segment: &AudioSegment) -> Result<FeatureMatrix, AudioError> {
        if segment.is_empty() {
            return Err(AudioError::EmptySegment);
        }
        if segment.sample_rate() != self.sample_rate() {
            return Err(AudioError::SampleRateMismatch {
                expected: self.sample_rate(),
                actual: segment.sample_rate(),
            });
        }
        Ok(match self {
            Self::Mfcc { inner, .. } => inner.compute(segment.samples()),
            Self::MelImage { inner, .. } => inner.compute(segment.samples()),
        })
    }
}
