//! zlib (deflate) stage shared by the native codecs, via flate2.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use floatbench_core::CodecError;

/// Compress `raw` as one independent zlib stream at `level` (0 = stored, 9 = best).
pub(crate) fn deflate(raw: &[u8], level: u8) -> Result<Vec<u8>, CodecError> {
    let mut enc = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2 + 64), Compression::new(level as u32));
    enc.write_all(raw).map_err(CodecError::Deflate)?;
    enc.finish().map_err(CodecError::Deflate)
}

/// Inflate at most `limit + 1` bytes so a hostile stream cannot balloon memory.
fn inflate_up_to(compressed: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(limit.min(1 << 24));
    ZlibDecoder::new(compressed)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(CodecError::Inflate)?;
    Ok(out)
}

/// Inflate a stream that must decode to exactly `expected` bytes.
///
/// When the stream is longer, `actual` in the error is `expected + 1`: decoding
/// stops as soon as the overrun is detected.
pub(crate) fn inflate_exact(compressed: &[u8], expected: usize) -> Result<Vec<u8>, CodecError> {
    let out = inflate_up_to(compressed, expected)?;
    if out.len() != expected {
        return Err(CodecError::SizeMismatch {
            expected,
            actual: out.len(),
        });
    }
    Ok(out)
}

/// Inflate a stream whose length is only known to be at most `limit` bytes.
pub(crate) fn inflate_capped(compressed: &[u8], limit: usize) -> Result<Vec<u8>, CodecError> {
    let out = inflate_up_to(compressed, limit)?;
    if out.len() > limit {
        return Err(CodecError::MalformedPayload(format!(
            "inflated payload exceeds {limit} bytes"
        )));
    }
    Ok(out)
}
