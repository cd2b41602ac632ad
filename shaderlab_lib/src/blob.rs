//! Compressed subprogram data attached to Unity shader assets.
//!
//! The blob is a concatenation of LZ4 compressed segments.
//! Each decompressed segment starts with an index of subprogram byte ranges.
//!
//! | Offset | Type | Description |
//! | --- | --- | --- |
//! | 0 | u32 | subprogram count `n` |
//! | 4 | `n` x (u32, u32) | subprogram offset and length in the segment |
use std::io::Cursor;

use binrw::{args, binread, BinRead};
use log::trace;

use crate::error::ContainerCorrupt;

/// The compressed subprograms for a single shader asset.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ShaderAsset {
    /// The shader's path like name such as `Hidden/Internal-Colored`.
    pub name: String,
    /// LZ4 compressed segments stored back to back.
    pub blob: Vec<u8>,
    pub compressed_sizes: Vec<u32>,
    pub decompressed_sizes: Vec<u32>,
    /// The start of each segment in [blob](#structfield.blob).
    pub compressed_offsets: Vec<u32>,
}

/// The location of a subprogram in a decompressed [Segment].
#[derive(Debug, PartialEq, Eq, Clone, Copy, BinRead)]
pub struct SubProgramRange {
    pub offset: u32,
    pub length: u32,
}

impl SubProgramRange {
    fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }
}

/// A decompressed segment and the subprograms it contains.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Segment {
    pub data: Vec<u8>,
    /// Subprogram ranges in stored order.
    pub subprograms: Vec<SubProgramRange>,
}

#[binread]
#[derive(Debug)]
#[br(import { segment_len: usize })]
struct SubProgramIndex {
    #[br(temp)]
    #[br(assert(
        4 + count as u64 * 8 <= segment_len as u64,
        "subprogram count {} does not fit in {} bytes", count, segment_len
    ))]
    count: u32,

    #[br(count = count)]
    ranges: Vec<SubProgramRange>,
}

impl ShaderAsset {
    /// Check the segment table against the blob without decompressing anything.
    pub fn validate(&self) -> Result<(), ContainerCorrupt> {
        let count = self.compressed_sizes.len();
        if self.decompressed_sizes.len() != count || self.compressed_offsets.len() != count {
            return Err(ContainerCorrupt::SegmentCountMismatch {
                compressed_sizes: self.compressed_sizes.len(),
                decompressed_sizes: self.decompressed_sizes.len(),
                compressed_offsets: self.compressed_offsets.len(),
            });
        }

        let sum: u64 = self.compressed_sizes.iter().map(|s| *s as u64).sum();
        if sum != self.blob.len() as u64 {
            return Err(ContainerCorrupt::BlobSizeMismatch {
                sum,
                blob_len: self.blob.len(),
            });
        }

        Ok(())
    }

    /// Decompress every segment and read its subprogram index.
    pub fn segments(&self) -> Result<Vec<Segment>, ContainerCorrupt> {
        self.validate()?;

        self.compressed_offsets
            .iter()
            .zip(&self.compressed_sizes)
            .zip(&self.decompressed_sizes)
            .enumerate()
            .map(|(i, ((offset, size), decompressed_size))| {
                self.segment(i, *offset, *size, *decompressed_size)
            })
            .collect()
    }

    fn segment(
        &self,
        segment: usize,
        offset: u32,
        size: u32,
        decompressed_size: u32,
    ) -> Result<Segment, ContainerCorrupt> {
        let start = offset as u64;
        let end = start + size as u64;
        let compressed = self
            .blob
            .get(start as usize..end as usize)
            .ok_or(ContainerCorrupt::SegmentOutOfRange {
                segment,
                start,
                end,
                blob_len: self.blob.len(),
            })?;

        let data = lz4_flex::block::decompress(compressed, decompressed_size as usize)
            .map_err(|source| ContainerCorrupt::Decompress { segment, source })?;
        if data.len() != decompressed_size as usize {
            return Err(ContainerCorrupt::DecompressedSize {
                segment,
                expected: decompressed_size as usize,
                actual: data.len(),
            });
        }

        let index = SubProgramIndex::read_le_args(
            &mut Cursor::new(&data),
            args! { segment_len: data.len() },
        )
        .map_err(|source| ContainerCorrupt::SubProgramIndex { segment, source })?;

        for (i, range) in index.ranges.iter().enumerate() {
            trace!(
                "segment {segment} subprogram {i}: offset {}, length {}",
                range.offset,
                range.length
            );
            if range.end() > data.len() as u64 {
                return Err(ContainerCorrupt::SubProgramOutOfRange {
                    segment,
                    index: i,
                    start: range.offset as u64,
                    end: range.end(),
                    segment_len: data.len(),
                });
            }
        }

        Ok(Segment {
            data,
            subprograms: index.ranges,
        })
    }
}

impl Segment {
    /// The bytes for `range`.
    /// Ranges from [ShaderAsset::segments] are always in bounds.
    pub fn subprogram_bytes(&self, range: &SubProgramRange) -> &[u8] {
        &self.data[range.offset as usize..range.end() as usize]
    }
}
