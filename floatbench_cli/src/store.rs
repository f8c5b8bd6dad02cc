//! Columnar float store: `<dataset>/<table>/<column>.col`.
//!
//! ```text
//! magic[8]   "FBCOL1\n\0"
//! entries    (len u32 LE, len × f32 LE)*
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

pub const COLUMN_MAGIC: &[u8; 8] = b"FBCOL1\n\x00";

/// Default read budget: 1 GiB of float payload.
pub const DEFAULT_MAX_BYTES: u64 = 1 << 30;

pub fn column_path(dataset: &Path, table: &str, column: &str) -> PathBuf {
    dataset.join(table).join(format!("{column}.col"))
}

/// Read every entry of a column, stopping before the first entry that would
/// push the total payload above `max_bytes`.
pub fn read_column(dataset: &Path, table: &str, column: &str, max_bytes: u64) -> anyhow::Result<Vec<Vec<f32>>> {
    let path = column_path(dataset, table, column);
    let file = File::open(&path).with_context(|| format!("opening column {:?}", path))?;
    let mut src = BufReader::new(file);

    let mut magic = [0u8; 8];
    src.read_exact(&mut magic)
        .with_context(|| format!("reading column header of {:?}", path))?;
    if &magic != COLUMN_MAGIC {
        bail!("{:?} is not a floatbench column file", path);
    }

    let mut entries = Vec::new();
    let mut total = 0u64;
    loop {
        if src.fill_buf()?.is_empty() {
            break;
        }
        let mut len_buf = [0u8; 4];
        src.read_exact(&mut len_buf)
            .with_context(|| format!("reading entry {} length in {:?}", entries.len(), path))?;
        let len = u32::from_le_bytes(len_buf) as usize;
        let entry_bytes = len as u64 * 4;
        if total + entry_bytes > max_bytes {
            log::info!(
                "stopping {}/{} after {} entries: next entry would exceed {} bytes",
                table,
                column,
                entries.len(),
                max_bytes
            );
            break;
        }

        let mut raw = vec![0u8; len * 4];
        src.read_exact(&mut raw)
            .with_context(|| format!("reading entry {} of {:?}", entries.len(), path))?;
        entries.push(
            raw.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        );
        total += entry_bytes;
    }

    log::debug!("read {} entries ({} bytes) from {:?}", entries.len(), total, path);
    Ok(entries)
}

/// Write a column, creating the table directory if needed.
pub fn write_column<'a, I>(dataset: &Path, table: &str, column: &str, entries: I) -> anyhow::Result<PathBuf>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let dir = dataset.join(table);
    fs::create_dir_all(&dir).with_context(|| format!("creating table directory {:?}", dir))?;
    let path = column_path(dataset, table, column);
    let file = File::create(&path).with_context(|| format!("creating column {:?}", path))?;
    let mut dst = BufWriter::new(file);

    dst.write_all(COLUMN_MAGIC)?;
    for entry in entries {
        let len = u32::try_from(entry.len()).context("entry longer than u32::MAX floats")?;
        dst.write_all(&len.to_le_bytes())?;
        for v in entry {
            dst.write_all(&v.to_le_bytes())?;
        }
    }
    dst.flush()?;
    Ok(path)
}

/// Cut `flat` into slices with the same lengths as `entries`.
pub fn split_like<'a>(flat: &'a [f32], entries: &[Vec<f32>]) -> anyhow::Result<Vec<&'a [f32]>> {
    let total: usize = entries.iter().map(Vec::len).sum();
    if total != flat.len() {
        bail!("cannot split {} floats into entries totalling {}", flat.len(), total);
    }
    let mut rest = flat;
    Ok(entries
        .iter()
        .map(|e| {
            let (head, tail) = rest.split_at(e.len());
            rest = tail;
            head
        })
        .collect())
}
