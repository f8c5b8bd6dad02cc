use crate::config::CodecConfig;

/// Self-describing output of one codec `encode` call.
///
/// `codec_config` carries every parameter the issuing codec needs to decode
/// `bytes`; `element_count` is how many floats decode must hand back,
/// independent of how many bytes compression produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedData {
    pub bytes: Vec<u8>,
    pub element_count: usize,
    pub codec_config: CodecConfig,
}

impl CompressedData {
    pub fn new(bytes: Vec<u8>, element_count: usize, codec_config: CodecConfig) -> Self {
        Self {
            bytes,
            element_count,
            codec_config,
        }
    }

    /// Size of the payload in bytes (excludes the configuration echo).
    #[inline]
    pub fn compressed_len(&self) -> usize {
        self.bytes.len()
    }

    /// Size of the floats this container decodes to.
    #[inline]
    pub fn raw_len(&self) -> usize {
        self.element_count * std::mem::size_of::<f32>()
    }

    /// Raw bytes ÷ payload bytes; NaN for an empty payload.
    pub fn ratio(&self) -> f64 {
        if self.bytes.is_empty() {
            return f64::NAN;
        }
        self.raw_len() as f64 / self.bytes.len() as f64
    }
}
