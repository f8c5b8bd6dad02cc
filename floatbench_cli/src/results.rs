//! Append-only JSON results file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use xxhash_rust::xxh3::Xxh3;

use floatbench_core::{BenchmarkResult, CodecConfig};

/// The invocation that produced a result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunArgs {
    pub data_file: String,
    pub table: String,
    pub column: String,
    pub chunk_size: usize,
    pub codec: String,
    pub codec_options: CodecConfig,
    pub write_decompressed: bool,
    /// xxh3-64 of the benchmarked floats, hex.
    pub input_digest: String,
}

#[derive(Debug, Serialize)]
pub struct ResultRecord<'a> {
    pub timestamp: String,
    pub host: String,
    pub args: RunArgs,
    pub results: &'a BenchmarkResult,
}

impl<'a> ResultRecord<'a> {
    pub fn new(args: RunArgs, results: &'a BenchmarkResult) -> Self {
        Self {
            timestamp: timestamp(),
            host: host_name(),
            args,
            results,
        }
    }
}

/// Filename-safe local time.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

pub fn host_name() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }
    fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown_host".to_string())
}

/// xxh3-64 over the little-endian bytes of `values`, as 16 hex digits.
pub fn input_digest(values: &[f32]) -> String {
    let mut hasher = Xxh3::new();
    let mut buf = Vec::with_capacity(4096 * 4);
    for block in values.chunks(4096) {
        buf.clear();
        buf.extend(block.iter().flat_map(|v| v.to_le_bytes()));
        hasher.update(&buf);
    }
    format!("{:016x}", hasher.digest())
}

/// Append `record` to the JSON array in `path`.
///
/// A missing file, or one whose top level is not an array, starts a new array.
/// A file that is not JSON at all is an error and is left untouched.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> anyhow::Result<()> {
    let mut records = match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Vec::new(),
        Ok(text) => {
            let existing: Value =
                serde_json::from_str(&text).with_context(|| format!("parsing results file {:?}", path))?;
            match existing {
                Value::Array(items) => items,
                _ => {
                    log::warn!("{:?} does not hold a JSON array; starting a new one", path);
                    Vec::new()
                }
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e).with_context(|| format!("reading results file {:?}", path)),
    };

    records.push(serde_json::to_value(record).context("serializing result record")?);

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    Value::Array(records)
        .serialize(&mut ser)
        .context("serializing results file")?;
    out.push(b'\n');

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    }
    fs::write(path, out).with_context(|| format!("writing results file {:?}", path))?;
    log::info!("appended result to {:?}", path);
    Ok(())
}
