// Audio decoding, segmentation, and feature extraction for emoblend.

pub mod decode;
pub mod error;
pub mod features;
pub mod fft;
pub mod mel;
pub mod mfcc;
pub mod normalize;
pub mod resample;
pub mod segment;
pub mod spectrogram;
pub mod stream;

pub use error::AudioError;
pub use features::FeatureExtractor;
pub use segment::AudioSegment;
