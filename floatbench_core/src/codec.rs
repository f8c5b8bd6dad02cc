use crate::config::CodecConfig;
use crate::data::CompressedData;
use crate::error::CodecError;

/// Core compression abstraction for float sequences.
///
/// Each `Codec` implementation:
/// - Is fully configured at construction; invalid configuration never produces
///   an instance.
/// - Must keep `decode(encode(x)).len() == x.len()` for every input.
/// - Holds no state between calls. Every `encode`/`decode` is independent given
///   the fixed configuration, which is what lets the benchmark treat chunks as
///   independent units.
pub trait Codec: Send + Sync {
    /// Stable codec family name ("BitTruncation", "BoundedError").
    fn name(&self) -> &'static str;

    /// Human-readable name including the configuration, for logs and reports.
    fn display_name(&self) -> String;

    /// Canonical configuration, echoed into every [`CompressedData`].
    fn describe_config(&self) -> CodecConfig;

    /// Compress a sequence of floats into a self-describing container.
    fn encode(&self, values: &[f32]) -> Result<CompressedData, CodecError>;

    /// Decompress a container into exactly `compressed.element_count` floats.
    fn decode(&self, compressed: &CompressedData) -> Result<Vec<f32>, CodecError>;
}
