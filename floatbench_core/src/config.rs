//! Typed codec configuration.
//!
//! Options cross the CLI/codec boundary as a string map ([`CodecConfig`]).
//! They are parsed into [`TruncationConfig`] or [`BoundedErrorConfig`] right
//! at construction; the string form only survives as the self-description
//! echoed into every [`CompressedData`](crate::CompressedData).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// String-keyed codec options, ordered so the echo is deterministic.
pub type CodecConfig = BTreeMap<String, String>;

// ── Keys ───────────────────────────────────────────────────────────────────

pub const KEY_MANTISSA_BITS: &str = "mantissaBits";
pub const KEY_COMPRESSION_LEVEL: &str = "compressionLevel";
pub const KEY_ALGORITHM: &str = "algorithm";
pub const KEY_ERROR_BOUND_MODE: &str = "errorBoundMode";
pub const KEY_ERROR_BOUND_VALUE: &str = "errorBoundValue";

/// Number of explicit mantissa bits in an IEEE-754 binary32.
pub const F32_MANTISSA_BITS: u8 = 23;

/// Highest deflate compression level.
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

// ── Helpers ────────────────────────────────────────────────────────────────

fn require<'a>(
    options: &'a CodecConfig,
    codec: &'static str,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    options
        .get(key)
        .map(|v| v.trim())
        .ok_or(ConfigError::MissingKey { codec, key })
}

fn parse_int_in_range(
    options: &CodecConfig,
    codec: &'static str,
    key: &'static str,
    min: i64,
    max: i64,
) -> Result<i64, ConfigError> {
    let raw = require(options, codec, key)?;
    let value: i64 = raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange { key, value, min, max });
    }
    Ok(value)
}

// ── Bit truncation ─────────────────────────────────────────────────────────

/// Configuration of the mantissa-truncation codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncationConfig {
    mantissa_bits: u8,
    compression_level: u8,
}

impl TruncationConfig {
    pub const CODEC: &'static str = "BitTruncation";

    /// Validate both fields; nothing is clamped.
    pub fn new(mantissa_bits: i64, compression_level: i64) -> Result<Self, ConfigError> {
        let max_bits = F32_MANTISSA_BITS as i64;
        if !(0..=max_bits).contains(&mantissa_bits) {
            return Err(ConfigError::OutOfRange {
                key: KEY_MANTISSA_BITS,
                value: mantissa_bits,
                min: 0,
                max: max_bits,
            });
        }
        let max_level = MAX_COMPRESSION_LEVEL as i64;
        if !(0..=max_level).contains(&compression_level) {
            return Err(ConfigError::OutOfRange {
                key: KEY_COMPRESSION_LEVEL,
                value: compression_level,
                min: 0,
                max: max_level,
            });
        }
        Ok(Self {
            mantissa_bits: mantissa_bits as u8,
            compression_level: compression_level as u8,
        })
    }

    pub fn from_map(options: &CodecConfig) -> Result<Self, ConfigError> {
        let mantissa_bits = parse_int_in_range(
            options,
            Self::CODEC,
            KEY_MANTISSA_BITS,
            0,
            F32_MANTISSA_BITS as i64,
        )?;
        let compression_level = parse_int_in_range(
            options,
            Self::CODEC,
            KEY_COMPRESSION_LEVEL,
            0,
            MAX_COMPRESSION_LEVEL as i64,
        )?;
        Self::new(mantissa_bits, compression_level)
    }

    pub fn to_map(&self) -> CodecConfig {
        let mut map = CodecConfig::new();
        map.insert(KEY_MANTISSA_BITS.into(), self.mantissa_bits.to_string());
        map.insert(KEY_COMPRESSION_LEVEL.into(), self.compression_level.to_string());
        map
    }

    #[inline]
    pub fn mantissa_bits(&self) -> u8 {
        self.mantissa_bits
    }

    #[inline]
    pub fn compression_level(&self) -> u8 {
        self.compression_level
    }

    /// True when no mantissa bits are discarded.
    #[inline]
    pub fn is_lossless(&self) -> bool {
        self.mantissa_bits == F32_MANTISSA_BITS
    }
}

// ── Bounded error ──────────────────────────────────────────────────────────

/// Prediction scheme requested from a bounded-error engine.
///
/// Numeric ids follow the ordering used by SZ3-style engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    LorenzoRegression,
    InterpLorenzo,
    Interp,
    NoPrediction,
    Lossless,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::LorenzoRegression,
        Algorithm::InterpLorenzo,
        Algorithm::Interp,
        Algorithm::NoPrediction,
        Algorithm::Lossless,
    ];

    pub fn id(self) -> u8 {
        match self {
            Algorithm::LorenzoRegression => 0,
            Algorithm::InterpLorenzo => 1,
            Algorithm::Interp => 2,
            Algorithm::NoPrediction => 3,
            Algorithm::Lossless => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::LorenzoRegression => "lorenzo-regression",
            Algorithm::InterpLorenzo => "interp-lorenzo",
            Algorithm::Interp => "interp",
            Algorithm::NoPrediction => "no-prediction",
            Algorithm::Lossless => "lossless",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| ConfigError::InvalidValue {
                key: KEY_ALGORITHM,
                value: s.to_string(),
                reason: "unsupported algorithm id (expected 0-4)".into(),
            });
        }
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::InvalidValue {
                key: KEY_ALGORITHM,
                value: s.to_string(),
                reason: "unknown algorithm name".into(),
            })
    }
}

/// How the error bound is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBoundMode {
    /// `|original - decoded| <= bound`
    Absolute,
    /// `|original - decoded| / |original| <= bound`
    Relative,
}

impl ErrorBoundMode {
    pub fn name(self) -> &'static str {
        match self {
            ErrorBoundMode::Absolute => "absolute",
            ErrorBoundMode::Relative => "relative",
        }
    }
}

impl fmt::Display for ErrorBoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorBoundMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" | "abs" | "0" => Ok(ErrorBoundMode::Absolute),
            "relative" | "rel" | "1" => Ok(ErrorBoundMode::Relative),
            _ => Err(ConfigError::InvalidValue {
                key: KEY_ERROR_BOUND_MODE,
                value: s.trim().to_string(),
                reason: "expected absolute|relative".into(),
            }),
        }
    }
}

/// Configuration forwarded to a bounded-error engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundedErrorConfig {
    algorithm: Algorithm,
    mode: ErrorBoundMode,
    bound: f64,
}

impl BoundedErrorConfig {
    pub const CODEC: &'static str = "BoundedError";

    pub fn new(algorithm: Algorithm, mode: ErrorBoundMode, bound: f64) -> Result<Self, ConfigError> {
        if !bound.is_finite() || bound <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: KEY_ERROR_BOUND_VALUE,
                value: bound.to_string(),
                reason: "error bound must be a finite positive number".into(),
            });
        }
        Ok(Self {
            algorithm,
            mode,
            bound,
        })
    }

    pub fn from_map(options: &CodecConfig) -> Result<Self, ConfigError> {
        let algorithm: Algorithm = require(options, Self::CODEC, KEY_ALGORITHM)?.parse()?;
        let mode: ErrorBoundMode = require(options, Self::CODEC, KEY_ERROR_BOUND_MODE)?.parse()?;
        let raw = require(options, Self::CODEC, KEY_ERROR_BOUND_VALUE)?;
        let bound: f64 = raw.parse().map_err(|e: std::num::ParseFloatError| {
            ConfigError::InvalidValue {
                key: KEY_ERROR_BOUND_VALUE,
                value: raw.to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::new(algorithm, mode, bound)
    }

    pub fn to_map(&self) -> CodecConfig {
        let mut map = CodecConfig::new();
        map.insert(KEY_ALGORITHM.into(), self.algorithm.id().to_string());
        map.insert(KEY_ERROR_BOUND_MODE.into(), self.mode.name().to_string());
        // `{}` on f64 is the shortest string that parses back to the same value.
        map.insert(KEY_ERROR_BOUND_VALUE.into(), format!("{}", self.bound));
        map
    }

    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[inline]
    pub fn mode(&self) -> ErrorBoundMode {
        self.mode
    }

    #[inline]
    pub fn bound(&self) -> f64 {
        self.bound
    }
}
