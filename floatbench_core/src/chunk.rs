use std::ops::Range;

use crate::error::ConfigError;

const FLOAT_SIZE: usize = std::mem::size_of::<f32>();

/// Byte-budgeted split of an input sequence into contiguous chunks.
///
/// Every chunk holds `floor(chunk_size_bytes / 4)` elements except the last,
/// which takes whatever remains. The chunk count is
/// `ceil(total_bytes / chunk_size_bytes)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    element_count: usize,
    chunk_size_bytes: usize,
    per_chunk: usize,
    chunk_count: usize,
}

impl ChunkPlan {
    pub fn new(element_count: usize, chunk_size_bytes: usize) -> Result<Self, ConfigError> {
        let per_chunk = chunk_size_bytes / FLOAT_SIZE;
        if per_chunk == 0 {
            return Err(ConfigError::InvalidChunkSize(chunk_size_bytes));
        }
        let total_bytes = element_count * FLOAT_SIZE;
        Ok(Self {
            element_count,
            chunk_size_bytes,
            per_chunk,
            chunk_count: total_bytes.div_ceil(chunk_size_bytes),
        })
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    #[inline]
    pub fn elements_per_chunk(&self) -> usize {
        self.per_chunk
    }

    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.element_count * FLOAT_SIZE
    }

    #[inline]
    pub fn chunk_size_bytes(&self) -> usize {
        self.chunk_size_bytes
    }

    /// Element range of chunk `index`; `None` past the last chunk.
    pub fn range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.chunk_count {
            return None;
        }
        let start = (index * self.per_chunk).min(self.element_count);
        let end = if index + 1 == self.chunk_count {
            self.element_count
        } else {
            (start + self.per_chunk).min(self.element_count)
        };
        Some(start..end)
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.chunk_count).filter_map(move |i| self.range(i))
    }
}
