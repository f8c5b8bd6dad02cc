mod bounded;
mod quantize;
mod truncation;
mod zlib;

pub use bounded::BoundedErrorCodec;
pub use quantize::QuantizingEngine;
pub use truncation::{truncate_bits, truncate_mantissas, truncate_value, BitTruncationCodec};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use floatbench_core::config::{
    KEY_ALGORITHM, KEY_COMPRESSION_LEVEL, KEY_ERROR_BOUND_MODE, KEY_ERROR_BOUND_VALUE, KEY_MANTISSA_BITS,
};
use floatbench_core::{BoundedErrorConfig, BoundedErrorEngine, Codec, CodecConfig, ConfigError, TruncationConfig};

/// The codec families a benchmark can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    BitTruncation,
    BoundedError,
}

impl CodecKind {
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::BitTruncation => TruncationConfig::CODEC,
            CodecKind::BoundedError => BoundedErrorConfig::CODEC,
        }
    }

    /// Option keys in the order positional values are given on the command line.
    pub fn option_keys(self) -> &'static [&'static str] {
        match self {
            CodecKind::BitTruncation => &[KEY_MANTISSA_BITS, KEY_COMPRESSION_LEVEL],
            CodecKind::BoundedError => &[KEY_ALGORITHM, KEY_ERROR_BOUND_MODE, KEY_ERROR_BOUND_VALUE],
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bittruncation" | "bit-truncation" => Ok(CodecKind::BitTruncation),
            "boundederror" | "bounded-error" | "sz3" => Ok(CodecKind::BoundedError),
            _ => Err(ConfigError::UnknownCodec(s.trim().to_string())),
        }
    }
}

/// The engine used when no external bounded-error engine is supplied.
pub fn default_engine() -> Arc<dyn BoundedErrorEngine> {
    Arc::new(QuantizingEngine::default())
}

/// Build a fully validated codec of `kind` from its option map.
pub fn build_codec(
    kind: CodecKind,
    options: &CodecConfig,
    engine: Arc<dyn BoundedErrorEngine>,
) -> Result<Box<dyn Codec>, ConfigError> {
    Ok(match kind {
        CodecKind::BitTruncation => Box::new(BitTruncationCodec::from_options(options)?),
        CodecKind::BoundedError => Box::new(BoundedErrorCodec::from_options(options, engine)?),
    })
}

/// Resolve a codec by name; unknown names are a [`ConfigError::UnknownCodec`].
pub fn codec_from_name(
    name: &str,
    options: &CodecConfig,
    engine: Arc<dyn BoundedErrorEngine>,
) -> Result<Box<dyn Codec>, ConfigError> {
    build_codec(name.parse()?, options, engine)
}

/// Which codec family wrote a container, judged by its configuration keys.
pub fn infer_kind(config: &CodecConfig) -> Option<CodecKind> {
    [CodecKind::BitTruncation, CodecKind::BoundedError]
        .into_iter()
        .find(|kind| kind.option_keys().iter().all(|k| config.contains_key(*k)))
}

/// Codec able to decode a stored container, configured from the container itself.
///
/// Used when opening a container file, so decompression needs no flags beyond
/// the file path.
pub fn codec_for_container(
    config: &CodecConfig,
    engine: Arc<dyn BoundedErrorEngine>,
) -> Result<Box<dyn Codec>, ConfigError> {
    let kind = infer_kind(config).ok_or_else(|| {
        let keys: Vec<&str> = config.keys().map(String::as_str).collect();
        ConfigError::UnknownCodec(format!("<container with keys {}>", keys.join(",")))
    })?;
    build_codec(kind, config, engine)
}
