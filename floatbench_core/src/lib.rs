pub mod bench;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod format;
pub mod metrics;

pub use bench::{BenchPhase, BenchmarkEngine, BenchmarkResult, ChunkStats};
pub use chunk::ChunkPlan;
pub use codec::Codec;
pub use config::{Algorithm, BoundedErrorConfig, CodecConfig, ErrorBoundMode, TruncationConfig};
pub use data::CompressedData;
pub use engine::BoundedErrorEngine;
pub use error::{BenchError, CodecError, ConfigError};
pub use format::FormatError;
pub use metrics::{ErrorMetrics, PsnrFormula};
