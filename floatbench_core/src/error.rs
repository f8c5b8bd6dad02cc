//! Error types shared by every codec and by the benchmark engine.
//!
//! Configuration problems are reported at construction time as [`ConfigError`];
//! anything that goes wrong while transforming data is a [`CodecError`]. The
//! benchmark engine wraps both into [`BenchError`] together with the chunk
//! that was being processed.

use thiserror::Error;

/// Invalid or missing configuration. Always fatal to the construction attempt.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A key the codec requires is absent from the option map.
    #[error("{codec} config is missing required key '{key}'")]
    MissingKey { codec: &'static str, key: &'static str },

    /// The value could not be parsed into the expected type or enumeration.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The value parsed but lies outside its valid domain.
    #[error("'{key}' must be in [{min}, {max}], got {value}")]
    OutOfRange {
        key: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The codec name does not match any supported codec.
    #[error("unknown codec '{0}'; supported codecs: BitTruncation, BoundedError (alias SZ3)")]
    UnknownCodec(String),

    /// A chunk must be able to hold at least one 4-byte float.
    #[error("chunk size must be at least 4 bytes, got {0}")]
    InvalidChunkSize(usize),
}

/// Failure inside a codec's encode or decode path.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("deflate failed: {0}")]
    Deflate(#[source] std::io::Error),

    #[error("inflate failed: {0}")]
    Inflate(#[source] std::io::Error),

    /// Decode produced a different amount of data than the container declared.
    #[error("size mismatch: expected {expected} bytes, decoded {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The bounded-error engine reported a failure.
    #[error("{engine} engine failed: {msg}")]
    Engine { engine: &'static str, msg: String },

    /// The container's self-describing configuration is not valid for this codec.
    #[error("payload configuration rejected: {0}")]
    Config(#[from] ConfigError),
}

/// Failure of a whole benchmark run.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("chunk {chunk} failed during {stage}: {source}")]
    Codec {
        chunk: usize,
        stage: &'static str,
        #[source]
        source: CodecError,
    },
}
