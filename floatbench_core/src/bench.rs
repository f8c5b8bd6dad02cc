use std::time::{Duration, Instant};

use serde::Serialize;

use crate::chunk::ChunkPlan;
use crate::codec::Codec;
use crate::error::{BenchError, ConfigError};
use crate::metrics::{ErrorMetrics, PsnrFormula};

const MIB: f64 = 1024.0 * 1024.0;

/// Where a [`BenchmarkEngine`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchPhase {
    Idle,
    Chunking,
    Encoding { chunk: usize },
    Decoding { chunk: usize },
    Aggregating,
    Done,
    /// Terminal after an unrecovered codec or config error.
    Failed,
}

/// Timings and sizes of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkStats {
    pub index: usize,
    pub elements: usize,
    pub compressed_bytes: usize,
    pub encode_seconds: f64,
    pub decode_seconds: f64,
}

/// Aggregate outcome of one [`BenchmarkEngine::run`].
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    /// Concatenated reconstruction, present only when requested.
    #[serde(skip)]
    pub decompressed_data: Option<Vec<f32>>,

    #[serde(rename = "compressionThroughputMBps")]
    pub compression_throughput_mbps: f64,
    #[serde(rename = "decompressionThroughputMBps")]
    pub decompression_throughput_mbps: f64,
    #[serde(rename = "compressionRatio")]
    pub compression_ratio: f64,

    #[serde(flatten)]
    pub errors: ErrorMetrics,

    #[serde(rename = "totalBytes")]
    pub total_bytes: usize,
    #[serde(rename = "compressedBytes")]
    pub compressed_bytes: usize,
    #[serde(rename = "chunkCount")]
    pub chunk_count: usize,
    #[serde(rename = "encodeSeconds")]
    pub encode_seconds: f64,
    #[serde(rename = "decodeSeconds")]
    pub decode_seconds: f64,

    #[serde(skip)]
    pub chunks: Vec<ChunkStats>,
}

/// Raw bytes per second in MiB/s; NaN when nothing was processed or no time elapsed.
fn throughput_mbps(bytes: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs <= 0.0 {
        return f64::NAN;
    }
    bytes as f64 / secs / MIB
}

/// Drives a codec over an input in byte-budgeted chunks and measures it.
///
/// # Run sequence
/// 1. Plan `ceil(total_bytes / chunk_size)` chunks.
/// 2. For each chunk in order: time `encode`, time `decode`, accumulate the
///    compressed size and append the decoded floats.
/// 3. Derive throughput and compression ratio from the totals.
/// 4. Compare the reconstruction against the input. A length mismatch does
///    not fail the run; the error metrics are reported as NaN instead.
///
/// Any codec error aborts the run and leaves the engine in
/// [`BenchPhase::Failed`]. There is no retry and no partial result.
pub struct BenchmarkEngine {
    codec: Box<dyn Codec>,
    chunk_size: usize,
    psnr_formula: PsnrFormula,
    phase: BenchPhase,
}

impl BenchmarkEngine {
    /// `chunk_size` is in bytes and must hold at least one float.
    pub fn new(chunk_size: usize, codec: Box<dyn Codec>) -> Result<Self, ConfigError> {
        if chunk_size < std::mem::size_of::<f32>() {
            return Err(ConfigError::InvalidChunkSize(chunk_size));
        }
        Ok(Self {
            codec,
            chunk_size,
            psnr_formula: PsnrFormula::default(),
            phase: BenchPhase::Idle,
        })
    }

    pub fn with_psnr_formula(mut self, formula: PsnrFormula) -> Self {
        self.psnr_formula = formula;
        self
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn phase(&self) -> BenchPhase {
        self.phase
    }

    /// Benchmark the codec over `data`.
    ///
    /// When `keep_decoded` is set the reconstruction is returned in
    /// [`BenchmarkResult::decompressed_data`].
    pub fn run(&mut self, data: &[f32], keep_decoded: bool) -> Result<BenchmarkResult, BenchError> {
        match self.run_chunks(data, keep_decoded) {
            Ok(result) => {
                self.enter(BenchPhase::Done);
                Ok(result)
            }
            Err(err) => {
                self.enter(BenchPhase::Failed);
                log::error!("benchmark of '{}' failed: {}", self.codec.display_name(), err);
                Err(err)
            }
        }
    }

    fn enter(&mut self, phase: BenchPhase) {
        log::trace!("benchmark phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn run_chunks(&mut self, data: &[f32], keep_decoded: bool) -> Result<BenchmarkResult, BenchError> {
        self.enter(BenchPhase::Chunking);
        let plan = ChunkPlan::new(data.len(), self.chunk_size)?;

        log::info!(
            "running benchmark for codec '{}' with chunk size {} bytes ({} chunks, {} floats)",
            self.codec.display_name(),
            self.chunk_size,
            plan.chunk_count(),
            data.len()
        );

        let mut encode_time = Duration::ZERO;
        let mut decode_time = Duration::ZERO;
        let mut compressed_bytes = 0usize;
        let mut decoded = Vec::with_capacity(data.len());
        let mut chunks = Vec::with_capacity(plan.chunk_count());

        for (index, range) in plan.ranges().enumerate() {
            let chunk = &data[range];

            self.enter(BenchPhase::Encoding { chunk: index });
            let t0 = Instant::now();
            let compressed = self.codec.encode(chunk).map_err(|source| BenchError::Codec {
                chunk: index,
                stage: "encode",
                source,
            })?;
            let chunk_encode = t0.elapsed();

            self.enter(BenchPhase::Decoding { chunk: index });
            let t1 = Instant::now();
            let values = self.codec.decode(&compressed).map_err(|source| BenchError::Codec {
                chunk: index,
                stage: "decode",
                source,
            })?;
            let chunk_decode = t1.elapsed();

            encode_time += chunk_encode;
            decode_time += chunk_decode;
            compressed_bytes += compressed.compressed_len();

            log::debug!(
                "chunk {}: {} floats -> {} bytes, encode {:.3}ms, decode {:.3}ms",
                index,
                chunk.len(),
                compressed.compressed_len(),
                chunk_encode.as_secs_f64() * 1000.0,
                chunk_decode.as_secs_f64() * 1000.0
            );

            chunks.push(ChunkStats {
                index,
                elements: chunk.len(),
                compressed_bytes: compressed.compressed_len(),
                encode_seconds: chunk_encode.as_secs_f64(),
                decode_seconds: chunk_decode.as_secs_f64(),
            });
            decoded.extend(values);
        }

        self.enter(BenchPhase::Aggregating);
        let total_bytes = plan.total_bytes();
        let compression_ratio = if compressed_bytes == 0 {
            f64::NAN
        } else {
            total_bytes as f64 / compressed_bytes as f64
        };

        let errors = if decoded.len() != data.len() {
            log::warn!(
                "decoded {} floats but input has {}; error metrics set to NaN",
                decoded.len(),
                data.len()
            );
            ErrorMetrics::nan()
        } else {
            ErrorMetrics::compute(data, &decoded, self.psnr_formula)
        };

        let result = BenchmarkResult {
            decompressed_data: keep_decoded.then_some(decoded),
            compression_throughput_mbps: throughput_mbps(total_bytes, encode_time),
            decompression_throughput_mbps: throughput_mbps(total_bytes, decode_time),
            compression_ratio,
            errors,
            total_bytes,
            compressed_bytes,
            chunk_count: plan.chunk_count(),
            encode_seconds: encode_time.as_secs_f64(),
            decode_seconds: decode_time.as_secs_f64(),
            chunks,
        };

        log::info!(
            "ratio {:.3}x, compress {:.2} MB/s, decompress {:.2} MB/s, MSE {:e}, max abs error {:e}",
            result.compression_ratio,
            result.compression_throughput_mbps,
            result.decompression_throughput_mbps,
            result.errors.mse,
            result.errors.max_abs_error
        );

        Ok(result)
    }
}
