use std::sync::Arc;

use log::trace;

use floatbench_core::{
    BoundedErrorConfig, BoundedErrorEngine, Codec, CodecConfig, CodecError, CompressedData, ConfigError,
};

/// Adapter from the [`Codec`] interface to an error-bounded engine.
///
/// Encode forwards the values with this codec's configuration. Decode uses the
/// configuration carried by the container, so a payload written by a codec with
/// different settings still decodes under the settings it was written with.
#[derive(Clone)]
pub struct BoundedErrorCodec {
    config: BoundedErrorConfig,
    engine: Arc<dyn BoundedErrorEngine>,
}

impl BoundedErrorCodec {
    pub fn new(config: BoundedErrorConfig, engine: Arc<dyn BoundedErrorEngine>) -> Self {
        Self { config, engine }
    }

    pub fn from_options(options: &CodecConfig, engine: Arc<dyn BoundedErrorEngine>) -> Result<Self, ConfigError> {
        Ok(Self::new(BoundedErrorConfig::from_map(options)?, engine))
    }

    pub fn config(&self) -> &BoundedErrorConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }
}

impl std::fmt::Debug for BoundedErrorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedErrorCodec")
            .field("config", &self.config)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Codec for BoundedErrorCodec {
    fn name(&self) -> &'static str {
        BoundedErrorConfig::CODEC
    }

    fn display_name(&self) -> String {
        format!(
            "BoundedError({},{},{})",
            self.config.algorithm(),
            self.config.mode(),
            self.config.bound()
        )
    }

    fn describe_config(&self) -> CodecConfig {
        self.config.to_map()
    }

    fn encode(&self, values: &[f32]) -> Result<CompressedData, CodecError> {
        let bytes = self.engine.compress(&self.config, values)?;
        trace!(
            "{}: {} floats -> {} bytes",
            self.engine.name(),
            values.len(),
            bytes.len()
        );
        Ok(CompressedData::new(bytes, values.len(), self.describe_config()))
    }

    fn decode(&self, compressed: &CompressedData) -> Result<Vec<f32>, CodecError> {
        let config = BoundedErrorConfig::from_map(&compressed.codec_config)?;
        let values = self
            .engine
            .decompress(&config, &compressed.bytes, compressed.element_count)?;
        if values.len() != compressed.element_count {
            return Err(CodecError::SizeMismatch {
                expected: compressed.element_count * std::mem::size_of::<f32>(),
                actual: values.len() * std::mem::size_of::<f32>(),
            });
        }
        Ok(values)
    }
}
