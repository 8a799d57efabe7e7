use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Segment holds no samples.
    #[error("Segment audio vide")]
    EmptySegment,

    /// Sample rate differs from what the extractor was built for.
    #[error("Fréquence d'échantillonnage {actual} Hz, attendu {expected} Hz")]
    SampleRateMismatch {
        /// Rate the extractor assumes.
        expected: u32,
        /// Rate of the input.
        actual: u32,
    },

    /// Unsupported audio format.
    #[error("Format audio non supporté : {0}")]
    UnsupportedFormat(String),

    /// Audio decode error.
    #[error("Erreur de décodage : {0}")]
    DecodeError(String),
}
