//! Standalone byte framing for [`CompressedData`].
//!
//! ```text
//! magic[8]          "FBCD1\n\0\0"
//! version           u16 LE
//! element_count     u64 LE
//! config_entries    u16 LE
//!   key_len u16 LE, key bytes, value_len u16 LE, value bytes   (× config_entries)
//! payload_len       u64 LE
//! payload_checksum  u64 LE  (xxh3-64 of payload)
//! payload bytes
//! ```

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

use crate::config::CodecConfig;
use crate::data::CompressedData;

/// Magic bytes for a framed container, version 1.
pub const MAGIC: &[u8; 8] = b"FBCD1\n\x00\x00";

pub const FORMAT_VERSION: u16 = 1;

/// Bytes before the first config entry: magic + version + element_count + config_entries.
pub const PREAMBLE_SIZE: usize = 8 + 2 + 8 + 2;

/// Bytes between the last config entry and the payload: payload_len + checksum.
pub const PAYLOAD_HEADER_SIZE: usize = 8 + 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid magic bytes: not a floatbench container")]
    BadMagic,

    #[error("unsupported container version {0} (only version 1 is supported)")]
    UnsupportedVersion(u16),

    #[error("container truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("config {what} is not valid UTF-8")]
    NonUtf8 { what: &'static str },

    #[error("config {what} too long to frame: {len} bytes")]
    TooLong { what: &'static str, len: usize },

    #[error("payload checksum mismatch: expected {expected:016x}, got {actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

impl CompressedData {
    /// Serialize into a standalone byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        if self.codec_config.len() > u16::MAX as usize {
            return Err(FormatError::TooLong {
                what: "entry count",
                len: self.codec_config.len(),
            });
        }
        let mut buf = Vec::with_capacity(PREAMBLE_SIZE + PAYLOAD_HEADER_SIZE + self.bytes.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.element_count as u64).to_le_bytes());
        buf.extend_from_slice(&(self.codec_config.len() as u16).to_le_bytes());
        for (key, value) in &self.codec_config {
            put_str(&mut buf, key, "key")?;
            put_str(&mut buf, value, "value")?;
        }
        buf.extend_from_slice(&(self.bytes.len() as u64).to_le_bytes());
        buf.extend_from_slice(&xxh3_64(&self.bytes).to_le_bytes());
        buf.extend_from_slice(&self.bytes);
        Ok(buf)
    }

    /// Deserialize a buffer produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(buf: &[u8]) -> Result<Self, FormatError> {
        let mut cur = Cursor { buf, pos: 0 };

        if cur.take(MAGIC.len())? != MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = cur.u16()?;
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let element_count = cur.u64()? as usize;
        let entries = cur.u16()?;

        let mut codec_config = CodecConfig::new();
        for _ in 0..entries {
            let key = cur.str("key")?;
            let value = cur.str("value")?;
            codec_config.insert(key, value);
        }

        let payload_len = cur.u64()? as usize;
        let expected = cur.u64()?;
        let bytes = cur.take(payload_len)?.to_vec();
        let actual = xxh3_64(&bytes);
        if actual != expected {
            return Err(FormatError::ChecksumMismatch { expected, actual });
        }
        let trailing = buf.len() - cur.pos;
        if trailing != 0 {
            return Err(FormatError::TrailingBytes(trailing));
        }

        Ok(Self {
            bytes,
            element_count,
            codec_config,
        })
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str, what: &'static str) -> Result<(), FormatError> {
    let len = u16::try_from(s.len()).map_err(|_| FormatError::TooLong { what, len: s.len() })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: n - remaining,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16, FormatError> {
        let mut b = [0u8; 2];
        b.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(b))
    }

    fn u64(&mut self) -> Result<u64, FormatError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    fn str(&mut self, what: &'static str) -> Result<String, FormatError> {
        let len = self.u16()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| FormatError::NonUtf8 { what })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompressedData {
        let mut cfg = CodecConfig::new();
        cfg.insert("mantissaBits".into(), "12".into());
        cfg.insert("compressionLevel".into(), "6".into());
        CompressedData::new(vec![0x78, 0x9c, 1, 2, 3, 4, 5], 42, cfg)
    }

    #[test]
    fn framed_container_restores_every_field() {
        let data = sample();
        let framed = data.to_bytes().unwrap();
        assert_eq!(&framed[..8], MAGIC);
        assert_eq!(CompressedData::from_bytes(&framed).unwrap(), data);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut framed = sample().to_bytes().unwrap();
        framed[0] = b'X';
        assert_eq!(CompressedData::from_bytes(&framed), Err(FormatError::BadMagic));

        let mut framed = sample().to_bytes().unwrap();
        framed[8..10].copy_from_slice(&7u16.to_le_bytes());
        assert_eq!(
            CompressedData::from_bytes(&framed),
            Err(FormatError::UnsupportedVersion(7))
        );
    }

    #[test]
    fn detects_payload_corruption() {
        let mut framed = sample().to_bytes().unwrap();
        let last = framed.len() - 1;
        framed[last] ^= 0xff;
        assert!(matches!(
            CompressedData::from_bytes(&framed),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn detects_truncation_and_trailing_bytes() {
        let framed = sample().to_bytes().unwrap();
        assert!(matches!(
            CompressedData::from_bytes(&framed[..framed.len() - 3]),
            Err(FormatError::Truncated { .. })
        ));

        let mut padded = framed.clone();
        padded.extend_from_slice(&[0, 0]);
        assert_eq!(
            CompressedData::from_bytes(&padded),
            Err(FormatError::TrailingBytes(2))
        );
    }

    #[test]
    fn empty_payload_and_config_frame_cleanly() {
        let data = CompressedData::new(Vec::new(), 0, CodecConfig::new());
        let framed = data.to_bytes().unwrap();
        assert_eq!(framed.len(), PREAMBLE_SIZE + PAYLOAD_HEADER_SIZE);
        assert_eq!(CompressedData::from_bytes(&framed).unwrap(), data);
    }
}
