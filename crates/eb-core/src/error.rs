use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// A required configuration key is absent.
    #[error("Champ de configuration manquant : {field}")]
    MissingField {
        /// Name of the missing key.
        field: &'static str,
    },

    /// A configuration key holds a value outside its vocabulary.
    #[error("Valeur inconnue pour {field} : '{value}' (attendu : {expected})")]
    UnknownValue {
        /// Name of the offending key.
        field: &'static str,
        /// Raw value found in the file.
        value: String,
        /// Accepted values.
        expected: &'static str,
    },

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Feature shape disagrees with the backend's declared input shape.
    #[error("Forme d'entrée invalide pour {backend} : attendu {expected}, reçu {actual}")]
    ShapeMismatch {
        /// Backend name.
        backend: &'static str,
        /// Declared input shape.
        expected: String,
        /// Shape actually provided.
        actual: String,
    },

    /// Prediction cannot be expressed in the requested label vocabulary.
    #[error("Vocabulaire incompatible : {actual} classes, attendu {expected}")]
    VocabularyMismatch {
        /// Number of classes expected by the consumer.
        expected: usize,
        /// Number of classes produced.
        actual: usize,
    },

    /// NaN, Inf, zero-variance or out-of-range value under strict validation.
    #[error("Dégénérescence numérique : {0}")]
    NumericDegeneracy(String),

    /// Streaming run exceeded its wall-clock budget.
    #[error("Délai dépassé après {completed}/{total} blocs")]
    DeadlineExceeded {
        /// Blocks fully processed before the deadline.
        completed: usize,
        /// Blocks in the source.
        total: usize,
    },

    /// Streaming results do not cover a contiguous block range.
    #[error("Sortie de flux incomplète : bloc {missing} absent")]
    IncompleteStream {
        /// First missing block index.
        missing: usize,
    },
}
