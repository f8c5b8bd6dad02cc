//! In-process error-bounded engine.
//!
//! A small SZ-style compressor that honours [`BoundedErrorConfig`] without
//! linking an external library:
//!
//! - `lossless`: the raw floats, zlib-compressed.
//! - absolute bound: linear quantization with bin width `2·bound` around a
//!   prediction, either the previous reconstructed value (Lorenzo) or zero
//!   (`no-prediction`). The interpolation algorithms have no 1-D meaning here
//!   and predict with Lorenzo. Values that cannot be quantized within the bound
//!   are stored verbatim as outliers.
//! - relative bound: mantissa rounding to the fewest bits that keep every
//!   normal value within the bound, re-checked per element.
//!
//! Payload: zlib of `[scheme u8][body]`.

use floatbench_core::{Algorithm, BoundedErrorConfig, BoundedErrorEngine, CodecError, ErrorBoundMode};

use crate::truncation::truncate_value;
use crate::zlib;

const SCHEME_RAW: u8 = 0;
const SCHEME_QUANTIZED: u8 = 1;
const SCHEME_MANTISSA: u8 = 2;

/// Code marking an element stored verbatim in the outlier table.
const OUTLIER: i32 = i32::MIN;
/// Largest quantization code magnitude; anything further away is an outlier.
const MAX_CODE: f64 = (1u32 << 30) as f64;

const ENGINE: &str = "quantizer";

#[derive(Debug, Clone, Copy)]
pub struct QuantizingEngine {
    level: u8,
}

impl QuantizingEngine {
    /// `level` is the zlib level of the final stage, clamped to 0..=9.
    pub fn new(level: u8) -> Self {
        Self { level: level.min(9) }
    }
}

impl Default for QuantizingEngine {
    fn default() -> Self {
        Self::new(6)
    }
}

fn scheme_for(config: &BoundedErrorConfig) -> u8 {
    match (config.algorithm(), config.mode()) {
        (Algorithm::Lossless, _) => SCHEME_RAW,
        (_, ErrorBoundMode::Absolute) => SCHEME_QUANTIZED,
        (_, ErrorBoundMode::Relative) => SCHEME_MANTISSA,
    }
}

fn malformed(msg: impl Into<String>) -> CodecError {
    CodecError::MalformedPayload(msg.into())
}

fn read_f32s(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Fewest mantissa bits whose half-ulp relative error stays within `bound`.
fn mantissa_bits_for(bound: f64) -> u8 {
    (0..23u8).find(|&k| 0.5f64.powi(k as i32 + 1) <= bound).unwrap_or(23)
}

// ── Absolute-bound quantizer ───────────────────────────────────────────────

struct Quantizer {
    step: f64,
    bound: f64,
    predict: bool,
    prev: f32,
}

impl Quantizer {
    fn new(config: &BoundedErrorConfig) -> Self {
        Self {
            // a bound above f64::MAX / 2 would make the step infinite
            step: (2.0 * config.bound()).min(f64::MAX),
            bound: config.bound(),
            predict: config.algorithm() != Algorithm::NoPrediction,
            prev: 0.0,
        }
    }

    fn prediction(&self) -> f64 {
        if self.predict {
            self.prev as f64
        } else {
            0.0
        }
    }

    fn reconstruct(&self, pred: f64, code: i32) -> f32 {
        (pred + code as f64 * self.step) as f32
    }

    /// Quantization code for `x`, or `None` when `x` must be an outlier.
    fn quantize(&self, x: f32, pred: f64) -> Option<(i32, f32)> {
        if !x.is_finite() {
            return None;
        }
        let q = ((x as f64 - pred) / self.step).round();
        if !q.is_finite() || q.abs() > MAX_CODE {
            return None;
        }
        let code = q as i32;
        let recon = self.reconstruct(pred, code);
        let err = (x as f64 - recon as f64).abs();
        if err.is_nan() || err > self.bound {
            return None;
        }
        Some((code, recon))
    }

    fn advance(&mut self, value: f32) {
        if value.is_finite() {
            self.prev = value;
        }
    }
}

fn compress_quantized(config: &BoundedErrorConfig, values: &[f32]) -> Result<Vec<u8>, CodecError> {
    let mut quantizer = Quantizer::new(config);
    let mut codes = Vec::with_capacity(values.len() * 4);
    let mut outliers = Vec::new();

    for &x in values {
        let pred = quantizer.prediction();
        let value = match quantizer.quantize(x, pred) {
            Some((code, recon)) => {
                codes.extend_from_slice(&code.to_le_bytes());
                recon
            }
            None => {
                codes.extend_from_slice(&OUTLIER.to_le_bytes());
                outliers.extend_from_slice(&x.to_le_bytes());
                x
            }
        };
        quantizer.advance(value);
    }

    let n_outliers = u32::try_from(outliers.len() / 4).map_err(|_| CodecError::Engine {
        engine: ENGINE,
        msg: "too many outliers".into(),
    })?;
    let mut body = Vec::with_capacity(5 + outliers.len() + codes.len());
    body.push(SCHEME_QUANTIZED);
    body.extend_from_slice(&n_outliers.to_le_bytes());
    body.extend_from_slice(&outliers);
    body.extend_from_slice(&codes);
    Ok(body)
}

fn decompress_quantized(
    config: &BoundedErrorConfig,
    body: &[u8],
    element_count: usize,
) -> Result<Vec<f32>, CodecError> {
    let header: [u8; 4] = body
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| malformed("quantized body is missing its outlier count"))?;
    let n_outliers = u32::from_le_bytes(header) as usize;
    let outlier_len = n_outliers
        .checked_mul(4)
        .ok_or_else(|| malformed("outlier count overflows"))?;
    let rest = &body[4..];
    if rest.len() != outlier_len + element_count * 4 {
        return Err(malformed(format!(
            "quantized body holds {} bytes, expected {} outliers and {} codes",
            rest.len(),
            n_outliers,
            element_count
        )));
    }
    let (outlier_bytes, code_bytes) = rest.split_at(outlier_len);
    let mut outliers = read_f32s(outlier_bytes);

    let mut quantizer = Quantizer::new(config);
    let mut out = Vec::with_capacity(element_count);
    for b in code_bytes.chunks_exact(4) {
        let code = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        let value = if code == OUTLIER {
            outliers
                .next()
                .ok_or_else(|| malformed("more outlier codes than outliers"))?
        } else {
            quantizer.reconstruct(quantizer.prediction(), code)
        };
        quantizer.advance(value);
        out.push(value);
    }
    if outliers.next().is_some() {
        return Err(malformed("unused outliers"));
    }
    Ok(out)
}

// ── Relative-bound mantissa rounding ───────────────────────────────────────

fn compress_mantissa(config: &BoundedErrorConfig, values: &[f32]) -> Vec<u8> {
    let bound = config.bound();
    let bits = mantissa_bits_for(bound);
    let mut body = Vec::with_capacity(2 + values.len() * 4);
    body.push(SCHEME_MANTISSA);
    body.push(bits);
    for &x in values {
        let y = truncate_value(x, bits);
        // subnormals and rounding into infinity can exceed the bound; keep those exact
        let within = x == 0.0 || {
            let rel = (x as f64 - y as f64).abs() / (x as f64).abs();
            rel <= bound
        };
        let stored = if x.is_finite() && within { y } else { x };
        body.extend_from_slice(&stored.to_le_bytes());
    }
    body
}

fn decompress_mantissa(body: &[u8], element_count: usize) -> Result<Vec<f32>, CodecError> {
    match body.split_first() {
        Some((&bits, floats)) if bits <= 23 && floats.len() == element_count * 4 => {
            Ok(read_f32s(floats).collect())
        }
        _ => Err(malformed("mantissa body has the wrong length or bit count")),
    }
}

impl BoundedErrorEngine for QuantizingEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn compress(&self, config: &BoundedErrorConfig, values: &[f32]) -> Result<Vec<u8>, CodecError> {
        let body = match scheme_for(config) {
            SCHEME_RAW => {
                let mut body = Vec::with_capacity(1 + values.len() * 4);
                body.push(SCHEME_RAW);
                body.extend(values.iter().flat_map(|v| v.to_le_bytes()));
                body
            }
            SCHEME_QUANTIZED => compress_quantized(config, values)?,
            _ => compress_mantissa(config, values),
        };
        zlib::deflate(&body, self.level)
    }

    fn decompress(
        &self,
        config: &BoundedErrorConfig,
        payload: &[u8],
        element_count: usize,
    ) -> Result<Vec<f32>, CodecError> {
        // the largest body is the quantized one with every element an outlier
        let limit = element_count
            .checked_mul(8)
            .and_then(|n| n.checked_add(16))
            .ok_or_else(|| malformed("element count overflows"))?;
        let body = zlib::inflate_capped(payload, limit)?;

        let (&scheme, rest) = body
            .split_first()
            .ok_or_else(|| malformed("empty payload"))?;
        let expected = scheme_for(config);
        if scheme != expected {
            return Err(malformed(format!(
                "payload scheme {scheme} does not match {} / {} (scheme {expected})",
                config.algorithm(),
                config.mode()
            )));
        }

        match scheme {
            SCHEME_RAW => {
                if rest.len() != element_count * 4 {
                    return Err(CodecError::SizeMismatch {
                        expected: element_count * 4,
                        actual: rest.len(),
                    });
                }
                Ok(read_f32s(rest).collect())
            }
            SCHEME_QUANTIZED => decompress_quantized(config, rest, element_count),
            _ => decompress_mantissa(rest, element_count),
        }
    }
}
