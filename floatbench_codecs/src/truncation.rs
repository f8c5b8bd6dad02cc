use floatbench_core::config::F32_MANTISSA_BITS;
use floatbench_core::{Codec, CodecConfig, CodecError, CompressedData, ConfigError, TruncationConfig};

use crate::zlib;

const EXP_MASK: u32 = 0x7F80_0000;
const MANTISSA_MASK: u32 = 0x007F_FFFF;
const QUIET_BIT: u32 = 0x0040_0000;

/// Round the mantissa of a raw binary32 pattern to `mantissa_bits` bits.
///
/// Round-to-nearest is done by adding half of the discarded range to the whole
/// 32-bit pattern before masking. The add may carry into the exponent (e.g.
/// `1.111…1 × 2^e` becomes `1.0 × 2^(e+1)`, and `f32::MAX` becomes infinity),
/// which is the correctly rounded result.
///
/// Infinities and NaNs are masked without the rounding add, which could
/// otherwise carry through the exponent into the sign. A NaN whose surviving
/// mantissa bits are all zero gets the quiet bit so it stays NaN; with no
/// mantissa bits left it becomes an infinity of the same sign.
#[inline]
pub fn truncate_bits(bits: u32, mantissa_bits: u8) -> u32 {
    if mantissa_bits >= F32_MANTISSA_BITS {
        return bits;
    }
    let shift = (F32_MANTISSA_BITS - mantissa_bits) as u32;
    let round = 1u32 << (shift - 1);
    // sign, exponent and the top `mantissa_bits` mantissa bits
    let keep = 0xFF80_0000 | !((1u32 << shift) - 1);

    if bits & EXP_MASK != EXP_MASK {
        return bits.wrapping_add(round) & keep;
    }
    let masked = bits & keep;
    if bits & MANTISSA_MASK != 0 && masked & MANTISSA_MASK == 0 && mantissa_bits > 0 {
        masked | QUIET_BIT
    } else {
        masked
    }
}

/// [`truncate_bits`] on a float.
#[inline]
pub fn truncate_value(value: f32, mantissa_bits: u8) -> f32 {
    f32::from_bits(truncate_bits(value.to_bits(), mantissa_bits))
}

pub fn truncate_mantissas(values: &[f32], mantissa_bits: u8) -> Vec<f32> {
    values.iter().map(|&v| truncate_value(v, mantissa_bits)).collect()
}

/// Lossy float codec: mantissa truncation followed by zlib.
///
/// Decode only inflates; the truncated values are the reconstruction.
/// `mantissaBits = 23` keeps every bit and makes the codec lossless.
#[derive(Debug, Clone, Copy)]
pub struct BitTruncationCodec {
    config: TruncationConfig,
}

impl BitTruncationCodec {
    pub fn new(config: TruncationConfig) -> Self {
        Self { config }
    }

    pub fn from_options(options: &CodecConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(TruncationConfig::from_map(options)?))
    }

    pub fn config(&self) -> &TruncationConfig {
        &self.config
    }
}

impl Codec for BitTruncationCodec {
    fn name(&self) -> &'static str {
        TruncationConfig::CODEC
    }

    fn display_name(&self) -> String {
        format!(
            "BitTruncation({},{})",
            self.config.mantissa_bits(),
            self.config.compression_level()
        )
    }

    fn describe_config(&self) -> CodecConfig {
        self.config.to_map()
    }

    fn encode(&self, values: &[f32]) -> Result<CompressedData, CodecError> {
        let bits = self.config.mantissa_bits();
        let raw: Vec<u8> = values
            .iter()
            .flat_map(|&v| truncate_value(v, bits).to_le_bytes())
            .collect();
        let bytes = zlib::deflate(&raw, self.config.compression_level())?;
        Ok(CompressedData::new(bytes, values.len(), self.describe_config()))
    }

    fn decode(&self, compressed: &CompressedData) -> Result<Vec<f32>, CodecError> {
        // The payload must describe itself as a truncation stream.
        TruncationConfig::from_map(&compressed.codec_config)?;

        let expected = compressed
            .element_count
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or_else(|| {
                CodecError::MalformedPayload(format!(
                    "element count {} overflows the byte length",
                    compressed.element_count
                ))
            })?;
        let raw = zlib::inflate_exact(&compressed.bytes, expected)?;
        Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn codec(mantissa_bits: i64, level: i64) -> BitTruncationCodec {
        BitTruncationCodec::new(TruncationConfig::new(mantissa_bits, level).unwrap())
    }

    fn uniform(n: usize, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(0.0f32..10.0)).collect()
    }

    fn mean_abs_error(a: &[f32], b: &[f32]) -> f64 {
        a.iter().zip(b).map(|(&x, &y)| (x as f64 - y as f64).abs()).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn full_mantissa_is_identity() {
        let specials = [
            0.0f32,
            -0.0,
            1.0,
            -1.5,
            f32::MAX,
            f32::MIN,
            f32::MIN_POSITIVE,
            f32::from_bits(1), // smallest subnormal
            f32::EPSILON,
            std::f32::consts::PI,
        ];
        for v in specials {
            assert_eq!(truncate_value(v, 23).to_bits(), v.to_bits());
        }

        let data = uniform(5000, 7);
        let c = codec(23, 6);
        let decoded = c.decode(&c.encode(&data).unwrap()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn rounds_to_nearest() {
        let one_plus = |pow: i32| 1.0f32 + 2.0f32.powi(pow);
        // keep 10 bits: 2^-11 is exactly half an ulp and rounds up, 2^-12 rounds down
        assert_eq!(truncate_value(one_plus(-11), 10), one_plus(-10));
        assert_eq!(truncate_value(one_plus(-12), 10), 1.0);
        assert_eq!(truncate_value(-one_plus(-11), 10), -one_plus(-10));
    }

    #[test]
    fn rounding_carries_into_exponent() {
        // 1.99999988 has an all-ones mantissa; rounding it up lands on 2.0
        let almost_two = f32::from_bits(0x3FFF_FFFF);
        assert_eq!(truncate_value(almost_two, 10), 2.0);
        assert_eq!(truncate_bits(0x3FFF_FFFF, 10), 0x4000_0000);
        // and the largest finite value rounds up to infinity
        assert_eq!(truncate_value(f32::MAX, 10), f32::INFINITY);
    }

    #[test]
    fn zero_mantissa_bits_leaves_powers_of_two() {
        assert_eq!(truncate_value(1.25, 0), 1.0);
        assert_eq!(truncate_value(1.5, 0), 2.0);
        assert_eq!(truncate_value(-3.0, 0), -4.0);
        for v in truncate_mantissas(&uniform(1000, 3), 0) {
            assert_eq!(v.to_bits() & 0x007F_FFFF, 0, "{v} has mantissa bits left");
        }
    }

    #[test]
    fn non_finite_values_are_masked_and_keep_their_class() {
        assert_eq!(truncate_bits(0x7FC0_0001, 10), 0x7FC0_0000);
        // payload entirely below the cut: forced quiet
        assert_eq!(truncate_bits(0x7F80_0001, 10), 0x7FC0_0000);
        assert_eq!(truncate_bits(0xFF80_0001, 10), 0xFFC0_0000);
        // all-ones mantissa must not carry into the sign
        let y = f32::from_bits(truncate_bits(0x7FFF_FFFF, 5));
        assert!(y.is_nan() && y.is_sign_positive());
        assert_eq!(y.to_bits() & ((1 << 18) - 1), 0);

        assert!(truncate_value(f32::NAN, 4).is_nan());
        assert_eq!(truncate_value(f32::NAN, 0), f32::INFINITY);
        assert_eq!(truncate_value(-f32::NAN, 0), f32::NEG_INFINITY);
        assert_eq!(truncate_value(f32::INFINITY, 4), f32::INFINITY);
        assert_eq!(truncate_value(f32::NEG_INFINITY, 0), f32::NEG_INFINITY);
        assert_eq!(truncate_bits(0x7FC0_0001, 23), 0x7FC0_0001);
    }

    #[test]
    fn nan_payload_below_the_cut_is_cleared_by_the_codec() {
        let c = codec(10, 6);
        let input = [1.5, f32::from_bits(0x7FC0_0001), f32::INFINITY];
        let decoded = c.decode(&c.encode(&input).unwrap()).unwrap();
        assert_eq!(decoded[0], 1.5);
        assert!(decoded[1].is_nan());
        assert_eq!(decoded[1].to_bits(), 0x7FC0_0000);
        assert_eq!(decoded[2], f32::INFINITY);
        let low = (1u32 << 13) - 1;
        assert!(decoded.iter().all(|v| v.to_bits() & low == 0));
    }

    #[test]
    fn decoded_low_bits_are_cleared() {
        let data = uniform(2000, 11);
        for k in [0u8, 1, 8, 13, 22] {
            let c = codec(k as i64, 1);
            let decoded = c.decode(&c.encode(&data).unwrap()).unwrap();
            let low = (1u32 << (23 - k)) - 1;
            assert!(decoded.iter().all(|v| v.to_bits() & low == 0), "k={k}");
        }
    }

    #[test]
    fn seeded_uniform_round_trip_is_bit_exact_truncation() {
        let data = uniform(10_000, 42);
        let c = codec(13, 5);
        let compressed = c.encode(&data).unwrap();
        assert_eq!(compressed.element_count, 10_000);
        assert_eq!(compressed.codec_config["mantissaBits"], "13");
        assert_eq!(compressed.codec_config["compressionLevel"], "5");

        let decoded = c.decode(&compressed).unwrap();
        let expected = truncate_mantissas(&data, 13);
        assert_eq!(decoded.len(), data.len());
        for ((d, e), x) in decoded.iter().zip(&expected).zip(&data) {
            assert_eq!(d.to_bits(), e.to_bits());
            // half an ulp at 13 bits: 2^-14 relative
            assert!(((x - d).abs() as f64) <= (*x as f64).abs() * 2f64.powi(-14));
        }
    }

    #[test]
    fn fewer_bits_never_lose_less() {
        let data = uniform(20_000, 99);
        let errors: Vec<f64> = (0..=23u8)
            .map(|k| mean_abs_error(&data, &truncate_mantissas(&data, k)))
            .collect();
        for k in 1..errors.len() {
            assert!(
                errors[k - 1] >= errors[k],
                "MAE at {} bits ({}) < MAE at {} bits ({})",
                k - 1,
                errors[k - 1],
                k,
                errors[k]
            );
        }
        assert_eq!(errors[23], 0.0);
    }

    #[test]
    fn smooth_signal_compresses() {
        let data: Vec<f32> = (0..8192).map(|i| (i as f32 * 0.01).sin() * 100.0).collect();
        for level in 1..=9 {
            let compressed = codec(10, level).encode(&data).unwrap();
            assert!(compressed.ratio() >= 1.0, "level {level}: ratio {}", compressed.ratio());
        }
    }

    #[test]
    fn encode_is_stateless() {
        let data = uniform(1000, 5);
        let c = codec(12, 6);
        assert_eq!(c.encode(&data).unwrap(), c.encode(&data).unwrap());
    }

    #[test]
    fn empty_input_round_trips() {
        let c = codec(8, 9);
        let compressed = c.encode(&[]).unwrap();
        assert_eq!(compressed.element_count, 0);
        assert!(c.decode(&compressed).unwrap().is_empty());
    }

    #[test]
    fn wrong_element_count_is_a_size_mismatch() {
        let c = codec(16, 6);
        let mut compressed = c.encode(&uniform(100, 1)).unwrap();
        compressed.element_count = 99;
        assert!(matches!(
            c.decode(&compressed),
            Err(CodecError::SizeMismatch { expected: 396, .. })
        ));
        compressed.element_count = 101;
        assert!(matches!(
            c.decode(&compressed),
            Err(CodecError::SizeMismatch { expected: 404, actual: 400 })
        ));
    }

    #[test]
    fn corrupt_or_truncated_payload_fails() {
        let c = codec(16, 6);
        let good = c.encode(&uniform(500, 2)).unwrap();

        let mut truncated = good.clone();
        truncated.bytes.truncate(good.bytes.len() / 2);
        assert!(c.decode(&truncated).is_err());

        let mut garbage = good.clone();
        garbage.bytes = vec![0xff; 64];
        assert!(c.decode(&garbage).is_err());
    }

    #[test]
    fn foreign_config_is_rejected() {
        let c = codec(16, 6);
        let mut compressed = c.encode(&[1.0, 2.0]).unwrap();
        compressed.codec_config.remove("mantissaBits");
        assert!(matches!(
            c.decode(&compressed),
            Err(CodecError::Config(ConfigError::MissingKey { key: "mantissaBits", .. }))
        ));
    }

    #[test]
    fn out_of_range_options_never_build_a_codec() {
        let opts = |m: &str, l: &str| -> CodecConfig {
            [("mantissaBits", m), ("compressionLevel", l)]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        assert!(BitTruncationCodec::from_options(&opts("24", "5")).is_err());
        assert!(BitTruncationCodec::from_options(&opts("8", "-1")).is_err());
        assert!(BitTruncationCodec::from_options(&opts("8", "10")).is_err());
        assert!(BitTruncationCodec::from_options(&opts("0", "0")).is_ok());
    }
}
