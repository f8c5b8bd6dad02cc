use crate::config::BoundedErrorConfig;
use crate::error::CodecError;

/// Contract for an external error-bounded compression engine.
///
/// A conforming engine guarantees, for every element `i` of the input,
/// `|x[i] - y[i]| <= bound` in absolute mode and
/// `|x[i] - y[i]| / |x[i]| <= bound` in relative mode, where `y` is what
/// [`decompress`](Self::decompress) returns. The guarantee is the engine's;
/// callers only observe it through post-hoc error metrics.
///
/// Engines must be stateless across calls: the same `(config, bytes)` always
/// decodes the same way, regardless of what was compressed before.
pub trait BoundedErrorEngine: Send + Sync {
    /// Engine identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Compress `values` under `config`, returning the raw payload.
    fn compress(&self, config: &BoundedErrorConfig, values: &[f32]) -> Result<Vec<u8>, CodecError>;

    /// Decompress a payload produced by [`compress`](Self::compress) with the
    /// same `config` back into `element_count` floats.
    fn decompress(
        &self,
        config: &BoundedErrorConfig,
        payload: &[u8],
        element_count: usize,
    ) -> Result<Vec<f32>, CodecError>;
}
