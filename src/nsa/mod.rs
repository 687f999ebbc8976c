//! # NSA Format
//!
//! NSA is the per-chromosome supplementary annotation database.
//! Every annotated position holds one [`SaPosition`](crate::SaPosition) aggregating
//! the records of all sources that cover it.
//!
//! ## Overview
//!
//! A database is a pair of files: the primary `<ref>.nsa` and its companion
//! `<ref>.nsa.idx`. Either missing invalidates the pair.
//!
//! The primary file opens with the database header and the side-channel
//! sections (three interval lists and the reference-minor list), which are
//! small and always read whole. Position records follow in zstd-compressed
//! blocks of a fixed uncompressed byte budget.
//!
//! The index holds one [`IndexEntry`] per block so that a position lookup is a
//! binary search followed by the decompression of a single block.
//!
//! ## File Structure
//!
//! ```text
//! ┌────────────────────────┐
//! │      File Preamble     │ 16 bytes
//! ├────────────────────────┤
//! │    Database Header     │ Variable size
//! ├────────────────────────┤
//! │ Small-variant Intervals│ Section
//! ├────────────────────────┤
//! │      SV Intervals      │ Section
//! ├────────────────────────┤
//! │ All-variant Intervals  │ Section
//! ├────────────────────────┤
//! │ Global Major Alleles   │ Section
//! ├────────────────────────┤
//! │      Block Header      │ 32 bytes
//! ├────────────────────────┤
//! │ Compressed Positions   │ Variable size
//! ├────────────────────────┤
//! │          ...           │ More blocks
//! └────────────────────────┘
//! ```
//!
//! Each section is `[tag: u8][count: u32][len: u64]` followed by `len` bytes
//! of entries, so readers can skip a section without decoding it.
//!
//! The index file is an [`IndexHeader`] followed by the zstd-compressed
//! [`IndexEntry`] array.
//!
//! ## Block Format
//!
//! An uncompressed block is a run of framed records:
//!
//! ```text
//! [position: u32][len: u32][record bytes][position: u32][len: u32][record bytes]...
//! ```

mod block;
mod files;
mod index;
mod reader;
mod writer;

pub use block::BlockHeader;
pub use files::{index_path, PendingDatabase};
pub use index::{IndexEntry, IndexHeader, SaIndex};
pub use reader::{IntervalIter, RefMinorIter, SaReader};
pub use writer::{RefMinorPolicy, SaWriter, SaWriterBuilder};

pub const FILE_MAGIC: &[u8; 7] = b"SADBNSA";
pub const GENE_FILE_MAGIC: &[u8; 7] = b"SADBNGA";
pub const BLOCK_MAGIC: &[u8; 3] = b"BLK";
pub const INDEX_MAGIC: &[u8; 8] = b"SADBIDX1";

/// Binary layout version of the primary and index files
pub const FORMAT_VERSION: u8 = 1;
/// Version of the annotation content; databases of another version are refused
pub const DATA_VERSION: u16 = 3;

pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

pub const DATABASE_EXTENSION: &str = "nsa";
pub const INDEX_EXTENSION: &str = "idx";
pub const GENE_DATABASE_FILE_NAME: &str = "genes.nga";

/// Tags of the side-channel sections in their on-disk order
pub(crate) mod section {
    pub const SMALL_VARIANT_INTERVALS: u8 = 1;
    pub const SV_INTERVALS: u8 = 2;
    pub const ALL_VARIANT_INTERVALS: u8 = 3;
    pub const GLOBAL_MAJOR_ALLELES: u8 = 4;

    /// `[tag: u8][count: u32][len: u64]`
    pub const SECTION_HEADER_SIZE: usize = 13;
}

/// Fixed-size preamble at the start of every primary file
///
/// This is stored identically in memory and on disk.
#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
pub struct FilePreamble {
    magic: [u8; 7],
    pub format_version: u8,
    pub data_version: u16,
    reserved: [u8; 6],
}
impl FilePreamble {
    #[must_use]
    pub fn new(magic: [u8; 7]) -> Self {
        Self {
            magic,
            format_version: FORMAT_VERSION,
            data_version: DATA_VERSION,
            reserved: [0; 6],
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Parses and validates a preamble against the expected magic
    pub fn from_bytes(bytes: &[u8], magic: &[u8; 7]) -> crate::Result<Self> {
        use crate::error::HeaderError;

        if bytes.len() < size_of::<Self>() {
            return Err(crate::error::ReadError::FileTruncation(bytes.len()).into());
        }
        let preamble: Self = bytemuck::pod_read_unaligned(&bytes[..size_of::<Self>()]);
        if preamble.magic != *magic {
            return Err(HeaderError::InvalidMagic(preamble.magic.to_vec()).into());
        }
        if preamble.format_version != FORMAT_VERSION {
            return Err(HeaderError::InvalidFormatVersion {
                expected: FORMAT_VERSION,
                found: preamble.format_version,
            }
            .into());
        }
        if preamble.data_version != DATA_VERSION {
            return Err(HeaderError::DataVersionMismatch {
                expected: DATA_VERSION,
                found: preamble.data_version,
            }
            .into());
        }
        Ok(preamble)
    }
}
