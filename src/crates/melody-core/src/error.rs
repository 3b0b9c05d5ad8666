use crate::duration::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Any failure raised by the core pipeline
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Duration(#[from] DurationError),

    #[error(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("duration denominator cannot be zero")]
    ZeroDenominator,

    #[error("invalid duration '{0}'")]
    Invalid(String),

    #[error("duration '{0}' is out of range")]
    Overflow(String),
}

/// A surface form that is not a pitch, rest, hold or boundary symbol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid token symbol '{0}'")]
pub struct SymbolError(pub String);

/// Reasons a piece cannot be tokenized. All of them skip the piece only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("unsupported duration {duration} at event {position}")]
    UnsupportedDuration { position: usize, duration: Duration },

    #[error("key could not be determined")]
    KeyUndetermined,

    #[error("pitch {pitch} transposed by {interval} semitones leaves the MIDI range")]
    PitchOutOfRange { pitch: u8, interval: i8 },
}

#[derive(Debug, thiserror::Error)]
pub enum VocabularyError {
    #[error("symbol '{0}' is not in the vocabulary")]
    UnknownSymbol(String),

    #[error("id {0} is not in the vocabulary")]
    UnknownId(usize),

    #[error("symbol '{0}' appears more than once")]
    DuplicateSymbol(String),

    #[error("unsupported vocabulary format version {0}")]
    UnsupportedVersion(u32),

    #[error("vocabulary holds an invalid symbol: {0}")]
    InvalidSymbol(#[from] SymbolError),

    #[error("failed to access vocabulary {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed vocabulary {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Broken contract between the sampler and the predictor or caller
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplingError {
    #[error("temperature must be positive and finite, got {0}")]
    InvalidTemperature(f64),

    #[error("probability vector has {found} entries, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("probability vector is empty")]
    Empty,

    #[error("probability {value} at index {index} is not finite")]
    NonFinite { index: usize, value: f64 },

    #[error("probability {value} at index {index} is negative")]
    Negative { index: usize, value: f64 },

    #[error("probability {value} at index {index} underflows the log domain")]
    Underflow { index: usize, value: f64 },

    #[error("distribution sums to {0} after normalization")]
    NotNormalized(f64),

    #[error("context id {id} is outside a vocabulary of {vocab_size}")]
    IdOutOfRange { id: usize, vocab_size: usize },

    #[error("predictor emits {predictor} classes but the vocabulary has {vocabulary}")]
    VocabularyMismatch { predictor: usize, vocabulary: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("boundary marker at position {0} inside a melody")]
    UnexpectedBoundary(usize),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("time step must be non-zero")]
    ZeroTimeStep,

    #[error("window length must be at least 1")]
    ZeroWindow,

    #[error("temperature must be positive and finite, got {0}")]
    InvalidTemperature(f64),

    #[error("learning rate must be positive and finite, got {0}")]
    InvalidLearningRate(f64),

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("at least one acceptable duration is required")]
    NoAcceptableDurations,

    #[error("acceptable duration {duration} is not a multiple of the time step {step}")]
    IncompatibleDuration { duration: Duration, step: Duration },
}
