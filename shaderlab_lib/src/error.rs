use thiserror::Error;

use crate::subprogram::ShaderType;

#[derive(Debug, Error)]
pub enum ContainerCorrupt {
    #[error(
        "expected matching segment table lengths but found {compressed_sizes} compressed sizes, \
         {decompressed_sizes} decompressed sizes, and {compressed_offsets} offsets"
    )]
    SegmentCountMismatch {
        compressed_sizes: usize,
        decompressed_sizes: usize,
        compressed_offsets: usize,
    },

    #[error("compressed sizes sum to {sum} bytes but the blob has {blob_len} bytes")]
    BlobSizeMismatch { sum: u64, blob_len: usize },

    #[error("segment {segment} range {start}..{end} is out of range for a blob of {blob_len} bytes")]
    SegmentOutOfRange {
        segment: usize,
        start: u64,
        end: u64,
        blob_len: usize,
    },

    #[error("error decompressing segment {segment}: {source}")]
    Decompress {
        segment: usize,
        #[source]
        source: lz4_flex::block::DecompressError,
    },

    #[error("segment {segment} decompressed to {actual} bytes instead of {expected} bytes")]
    DecompressedSize {
        segment: usize,
        expected: usize,
        actual: usize,
    },

    #[error("error reading subprogram index for segment {segment}: {source}")]
    SubProgramIndex {
        segment: usize,
        #[source]
        source: binrw::Error,
    },

    #[error(
        "subprogram {index} range {start}..{end} is out of range for segment {segment} of {segment_len} bytes"
    )]
    SubProgramOutOfRange {
        segment: usize,
        index: usize,
        start: u64,
        end: u64,
        segment_len: usize,
    },
}

/// A subprogram that was compiled for a graphics API that can't be normalized.
#[derive(Debug, Error, PartialEq)]
#[error("unsupported shader type ({id})")]
pub struct UnsupportedShaderType {
    pub id: u32,
    /// The known type for `id` or `None` for unrecognized ids.
    pub shader_type: Option<ShaderType>,
}
