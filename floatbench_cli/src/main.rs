mod codec_arg;
mod results;
mod store;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use floatbench_codecs::{build_codec, codec_for_container, default_engine, infer_kind};
use floatbench_core::format::FORMAT_VERSION;
use floatbench_core::{BenchmarkEngine, CompressedData, PsnrFormula};

use codec_arg::CodecArg;
use results::{append_record, input_digest, ResultRecord, RunArgs};
use store::DEFAULT_MAX_BYTES;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "floatbench",
    about = "Benchmark lossy float codecs over columnar scientific data",
    version
)]
struct Cli {
    /// Log at debug level (per-chunk timings)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PsnrArg {
    RangeOffset,
    Conventional,
}

impl From<PsnrArg> for PsnrFormula {
    fn from(arg: PsnrArg) -> Self {
        match arg {
            PsnrArg::RangeOffset => PsnrFormula::RangeOffset,
            PsnrArg::Conventional => PsnrFormula::Conventional,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark a codec over one or more columns and append the results
    Run {
        /// Dataset directory
        #[arg(long)]
        data: PathBuf,
        /// Table within the dataset
        #[arg(long)]
        table: String,
        /// Comma-separated column names
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
        /// Bytes of raw floats per chunk
        #[arg(long)]
        chunk_size: usize,
        /// Codec and options: BitTruncation,<bits>,<level> | BoundedError,<alg>,<mode>,<bound> (alias SZ3)
        #[arg(long)]
        codec: CodecArg,
        /// JSON results file to append to
        #[arg(long)]
        results: PathBuf,
        /// Stop reading a column before it exceeds this many bytes
        #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
        max_bytes: u64,
        /// Write the reconstruction as a column under this dataset directory
        #[arg(long)]
        write_decompressed: Option<PathBuf>,
        /// PSNR formula
        #[arg(long, value_enum, default_value_t = PsnrArg::RangeOffset)]
        psnr: PsnrArg,
    },
    /// Write a synthetic column of uniformly distributed floats
    Generate {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        table: String,
        #[arg(long)]
        column: String,
        /// Number of entries
        #[arg(long)]
        entries: usize,
        /// Floats per entry
        #[arg(long)]
        entry_len: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        low: f32,
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        high: f32,
    },
    /// Compress a raw little-endian f32 file into a container
    Compress {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        codec: CodecArg,
    },
    /// Decode a container back to raw little-endian f32
    Decompress {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print container metadata
    Inspect {
        /// Container file
        file: PathBuf,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_env(env_logger::Env::default());
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

/// Payload bytes of `entries × entry_len` floats, saturating at `u64::MAX`.
fn column_bytes(entries: usize, entry_len: usize) -> u64 {
    (entries as u64).saturating_mul(entry_len as u64).saturating_mul(4)
}

fn read_raw_floats(path: &Path) -> anyhow::Result<Vec<f32>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading input file {:?}", path))?;
    if bytes.len() % 4 != 0 {
        bail!("{:?} is {} bytes, not a whole number of f32 values", path, bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn read_container(path: &Path) -> anyhow::Result<CompressedData> {
    let bytes = std::fs::read(path).with_context(|| format!("reading container {:?}", path))?;
    CompressedData::from_bytes(&bytes).with_context(|| format!("decoding container {:?}", path))
}

// ── Subcommand implementations ─────────────────────────────────────────────

struct RunOptions {
    data: PathBuf,
    table: String,
    columns: Vec<String>,
    chunk_size: usize,
    codec: CodecArg,
    results: PathBuf,
    max_bytes: u64,
    write_decompressed: Option<PathBuf>,
    psnr: PsnrFormula,
}

fn run_benchmark(opts: RunOptions) -> anyhow::Result<()> {
    let data_file = opts
        .data
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| opts.data.display().to_string());

    for column in &opts.columns {
        log::info!("reading {}/{}/{}", data_file, opts.table, column);
        let entries = store::read_column(&opts.data, &opts.table, column, opts.max_bytes)?;
        let flat: Vec<f32> = entries.concat();
        log::info!(
            "{} entries, {} floats ({})",
            entries.len(),
            flat.len(),
            human_bytes(flat.len() as u64 * 4)
        );

        let codec = build_codec(opts.codec.kind, &opts.codec.options, default_engine())
            .with_context(|| format!("configuring codec '{}'", opts.codec))?;
        let codec_options = codec.describe_config();
        let mut engine = BenchmarkEngine::new(opts.chunk_size, codec)?.with_psnr_formula(opts.psnr);
        let result = engine
            .run(&flat, opts.write_decompressed.is_some())
            .with_context(|| format!("benchmarking column '{}'", column))?;

        println!("=== {} / {} ===", column, engine.codec().display_name());
        println!("  chunks       : {}", result.chunk_count);
        println!("  raw size     : {}", human_bytes(result.total_bytes as u64));
        println!("  compressed   : {}", human_bytes(result.compressed_bytes as u64));
        println!("  ratio        : {:.3}x", result.compression_ratio);
        println!("  compress     : {:.2} MB/s", result.compression_throughput_mbps);
        println!("  decompress   : {:.2} MB/s", result.decompression_throughput_mbps);
        println!("  MSE          : {:e}", result.errors.mse);
        println!("  PSNR         : {:.3}", result.errors.psnr);
        println!("  rel error    : mean {:.6}%  max {:.6}%", result.errors.mean_rel_error, result.errors.max_rel_error);
        println!("  abs error    : mean {:e}  max {:e}", result.errors.mean_abs_error, result.errors.max_abs_error);

        let args = RunArgs {
            data_file: data_file.clone(),
            table: opts.table.clone(),
            column: column.clone(),
            chunk_size: opts.chunk_size,
            codec: opts.codec.kind.to_string(),
            codec_options,
            write_decompressed: opts.write_decompressed.is_some(),
            input_digest: input_digest(&flat),
        };
        append_record(&opts.results, &ResultRecord::new(args, &result))?;

        if let (Some(dir), Some(decoded)) = (&opts.write_decompressed, result.decompressed_data.as_deref()) {
            let parts = store::split_like(decoded, &entries)?;
            let path = store::write_column(dir, &opts.table, column, parts)?;
            log::info!("wrote reconstruction to {:?}", path);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    data: PathBuf,
    table: String,
    column: String,
    entries: usize,
    entry_len: usize,
    seed: u64,
    low: f32,
    high: f32,
) -> anyhow::Result<()> {
    if !low.is_finite() || !high.is_finite() || low >= high {
        bail!("--low must be below --high and both finite (got {low}, {high})");
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<f32>> = (0..entries)
        .map(|_| (0..entry_len).map(|_| rng.gen_range(low..high)).collect())
        .collect();
    let path = store::write_column(&data, &table, &column, rows.iter().map(Vec::as_slice))?;
    eprintln!("  column      : {:?}", path);
    eprintln!("  entries     : {}", entries);
    eprintln!("  raw size    : {}", human_bytes(column_bytes(entries, entry_len)));
    Ok(())
}

fn run_compress(input: PathBuf, output: PathBuf, codec: CodecArg) -> anyhow::Result<()> {
    let values = read_raw_floats(&input)?;
    let codec = build_codec(codec.kind, &codec.options, default_engine())?;

    let t0 = Instant::now();
    let compressed = codec.encode(&values)?;
    let elapsed = t0.elapsed();

    let bytes = compressed.to_bytes()?;
    std::fs::write(&output, &bytes).with_context(|| format!("writing container {:?}", output))?;

    let raw = compressed.raw_len() as u64;
    eprintln!("  codec       : {}", codec.display_name());
    eprintln!("  floats      : {}", compressed.element_count);
    eprintln!("  raw size    : {}", human_bytes(raw));
    eprintln!("  compressed  : {}", human_bytes(bytes.len() as u64));
    eprintln!("  ratio       : {:.2}x", compressed.ratio());
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((raw as f64 / elapsed.as_secs_f64()) as u64)
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let container = read_container(&input)?;
    let codec = codec_for_container(&container.codec_config, default_engine())?;

    let t0 = Instant::now();
    let values = codec.decode(&container)?;
    let elapsed = t0.elapsed();

    let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(&output, &raw).with_context(|| format!("creating output file {:?}", output))?;

    eprintln!("  codec       : {}", codec.display_name());
    eprintln!("  floats      : {}", values.len());
    eprintln!("  raw size    : {}", human_bytes(raw.len() as u64));
    eprintln!(
        "  throughput  : {}/s",
        human_bytes((raw.len() as f64 / elapsed.as_secs_f64()) as u64)
    );
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf) -> anyhow::Result<()> {
    let container = read_container(&file)?;
    let file_size = std::fs::metadata(&file)?.len();
    let kind = infer_kind(&container.codec_config)
        .map(|k| k.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("=== floatbench container: {:?} ===", file);
    println!();
    println!("  format version : {}", FORMAT_VERSION);
    println!("  codec          : {}", kind);
    println!("  floats         : {}", container.element_count);
    println!("  raw size       : {}", human_bytes(container.raw_len() as u64));
    println!("  payload        : {}", human_bytes(container.compressed_len() as u64));
    println!("  file on disk   : {}", human_bytes(file_size));
    println!("  ratio          : {:.2}x", container.ratio());
    println!("  config:");
    for (key, value) in &container.codec_config {
        println!("    {:<18} {}", key, value);
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Run {
            data,
            table,
            columns,
            chunk_size,
            codec,
            results,
            max_bytes,
            write_decompressed,
            psnr,
        } => run_benchmark(RunOptions {
            data,
            table,
            columns,
            chunk_size,
            codec,
            results,
            max_bytes,
            write_decompressed,
            psnr: psnr.into(),
        }),
        Commands::Generate {
            data,
            table,
            column,
            entries,
            entry_len,
            seed,
            low,
            high,
        } => run_generate(data, table, column, entries, entry_len, seed, low, high),
        Commands::Compress { input, output, codec } => run_compress(input, output, codec),
        Commands::Decompress { input, output } => run_decompress(input, output),
        Commands::Inspect { file } => run_inspect(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_bytes_saturates_instead_of_wrapping() {
        assert_eq!(column_bytes(3, 256), 3072);
        assert_eq!(column_bytes(0, usize::MAX), 0);
        assert_eq!(column_bytes(usize::MAX, usize::MAX), u64::MAX);
        assert_eq!(human_bytes(column_bytes(1024, 256)), "1.00 MB");
    }
}
