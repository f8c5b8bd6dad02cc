use std::sync::Arc;

use floatbench_codecs::{truncate_value, BitTruncationCodec, BoundedErrorCodec, QuantizingEngine};
use floatbench_core::{Algorithm, BoundedErrorConfig, Codec, ErrorBoundMode, TruncationConfig};
use proptest::prelude::*;

fn finite_f32() -> impl Strategy<Value = f32> {
    prop::num::f32::NORMAL | prop::num::f32::ZERO | prop::num::f32::SUBNORMAL
}

proptest! {
    #[test]
    fn truncation_keeps_length_and_clears_low_bits(
        data in prop::collection::vec(any::<f32>(), 0..512),
        bits in 0i64..=23,
        level in 0i64..=9,
    ) {
        let codec = BitTruncationCodec::new(TruncationConfig::new(bits, level).unwrap());
        let decoded = codec.decode(&codec.encode(&data).unwrap()).unwrap();
        prop_assert_eq!(decoded.len(), data.len());
        let low = (1u32 << (23 - bits as u32)) - 1;
        for (x, y) in data.iter().zip(&decoded) {
            prop_assert_eq!(y.to_bits() & low, 0, "{:08x} -> {:08x}", x.to_bits(), y.to_bits());
            if x.is_infinite() {
                prop_assert_eq!(y.to_bits(), x.to_bits());
            }
            if x.is_nan() && bits > 0 {
                prop_assert!(y.is_nan());
            }
        }
    }

    #[test]
    fn truncation_error_is_at_most_half_an_ulp(x in prop::num::f32::NORMAL, bits in 0u8..23) {
        let y = truncate_value(x, bits);
        prop_assume!(y.is_finite());
        let rel = (x as f64 - y as f64).abs() / (x as f64).abs();
        prop_assert!(rel <= 0.5f64.powi(bits as i32 + 1), "{} -> {} ({})", x, y, rel);
    }

    #[test]
    fn truncation_is_idempotent(x in any::<f32>(), bits in 0u8..=23) {
        let once = truncate_value(x, bits);
        prop_assert_eq!(truncate_value(once, bits).to_bits(), once.to_bits());
    }

    #[test]
    fn quantizer_respects_absolute_bound(
        data in prop::collection::vec(finite_f32(), 0..512),
        exp in -6i32..2,
        algorithm in 0u8..4,
    ) {
        let bound = 10f64.powi(exp);
        let algorithm = Algorithm::from_id(algorithm).unwrap();
        let config = BoundedErrorConfig::new(algorithm, ErrorBoundMode::Absolute, bound).unwrap();
        let codec = BoundedErrorCodec::new(config, Arc::new(QuantizingEngine::default()));
        let decoded = codec.decode(&codec.encode(&data).unwrap()).unwrap();
        prop_assert_eq!(decoded.len(), data.len());
        for (x, y) in data.iter().zip(&decoded) {
            prop_assert!((*x as f64 - *y as f64).abs() <= bound, "{} -> {}", x, y);
        }
    }

    #[test]
    fn quantizer_respects_relative_bound(
        data in prop::collection::vec(finite_f32(), 0..512),
        exp in -7i32..0,
    ) {
        let bound = 10f64.powi(exp);
        let config = BoundedErrorConfig::new(Algorithm::InterpLorenzo, ErrorBoundMode::Relative, bound).unwrap();
        let codec = BoundedErrorCodec::new(config, Arc::new(QuantizingEngine::default()));
        let decoded = codec.decode(&codec.encode(&data).unwrap()).unwrap();
        prop_assert_eq!(decoded.len(), data.len());
        for (x, y) in data.iter().zip(&decoded) {
            let err = (*x as f64 - *y as f64).abs();
            prop_assert!(err <= bound * (*x as f64).abs(), "{} -> {}", x, y);
        }
    }
}
