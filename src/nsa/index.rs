use std::io::{Read, Write};

use bytemuck::{Pod, Zeroable};
use zstd::stream::{copy_decode, copy_encode};

use super::{BlockHeader, DATA_VERSION, FORMAT_VERSION, INDEX_MAGIC};
use crate::{error::IndexError, Result};

/// The header of the companion `.idx` stream
///
/// This is stored identically in memory and on disk.
#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
pub struct IndexHeader {
    /// Magic number identifying the index format
    magic: [u8; 8],

    /// Data version of the database this index belongs to
    pub data_version: u16,

    /// Binary layout version
    pub format_version: u8,

    reserved: [u8; 5],

    /// Number of blocks in the index
    pub num_blocks: u64,

    /// Number of bytes in the uncompressed index
    pub u_bytes: u64,

    /// Number of bytes in the compressed index
    pub z_bytes: u64,
}
impl IndexHeader {
    #[must_use]
    pub fn new(num_blocks: u64, u_bytes: u64, z_bytes: u64) -> Self {
        Self {
            magic: *INDEX_MAGIC,
            data_version: DATA_VERSION,
            format_version: FORMAT_VERSION,
            reserved: [0; 5],
            num_blocks,
            u_bytes,
            z_bytes,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: Self = bytemuck::pod_read_unaligned(bytes);
        if header.magic != *INDEX_MAGIC {
            return Err(IndexError::InvalidMagic(header.magic).into());
        }
        if header.data_version != DATA_VERSION {
            return Err(IndexError::UnsupportedVersion {
                expected: DATA_VERSION,
                found: header.data_version,
            }
            .into());
        }
        if header.format_version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedFormat {
                expected: FORMAT_VERSION,
                found: header.format_version,
            }
            .into());
        }
        Ok(header)
    }
}

/// Location and position span of one block in the primary stream
///
/// This is stored identically in memory and on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod, Default)]
#[repr(C)]
pub struct IndexEntry {
    /// First position in the block
    pub first_position: u32,
    /// Last position in the block
    pub last_position: u32,
    /// Number of positions in the block
    pub num_positions: u32,
    reserved: u32,
    /// Byte offset of the block header in the primary stream
    pub offset: u64,
}
impl IndexEntry {
    #[must_use]
    pub fn from_block_header(header: &BlockHeader, offset: u64) -> Self {
        Self {
            first_position: header.first_position,
            last_position: header.last_position,
            num_positions: header.num_positions,
            reserved: 0,
            offset,
        }
    }
}

/// Block index enabling binary search from a position to its block
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaIndex {
    entries: Vec<IndexEntry>,
}
impl SaIndex {
    #[must_use]
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// Returns the byte representation of the index
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }

    /// Number of blocks in the index
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.entries.len()
    }

    /// Number of positions across all blocks
    #[must_use]
    pub fn num_positions(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.num_positions as usize)
            .sum()
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Finds the last block whose first position is at or before `position`
    ///
    /// Returns `None` when the position precedes every block or lies past the
    /// end of the block that would contain it.
    #[must_use]
    pub fn find_block(&self, position: u32) -> Option<usize> {
        let idx = self
            .entries
            .partition_point(|entry| entry.first_position <= position)
            .checked_sub(1)?;
        (position <= self.entries[idx].last_position).then_some(idx)
    }

    /// Writes the header and zstd-compressed entries
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut z_index = Vec::default();
        copy_encode(self.as_bytes(), &mut z_index, 0)?;
        let header = IndexHeader::new(
            self.entries.len() as u64,
            self.as_bytes().len() as u64,
            z_index.len() as u64,
        );
        writer.write_all(header.as_bytes())?;
        writer.write_all(&z_index)?;
        Ok(())
    }

    pub fn read_bytes<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header_buf = [0u8; size_of::<IndexHeader>()];
        reader.read_exact(&mut header_buf)?;
        let header = IndexHeader::from_bytes(&header_buf)?;

        let mut z_index = Vec::new();
        reader.take(header.z_bytes).read_to_end(&mut z_index)?;
        let mut index_buf = Vec::new();
        copy_decode(z_index.as_slice(), &mut index_buf)?;

        if index_buf.len() % size_of::<IndexEntry>() != 0 {
            return Err(IndexError::IndexCastingError(index_buf.len()).into());
        }
        let entries: Vec<IndexEntry> = bytemuck::pod_collect_to_vec(&index_buf);
        if entries.len() as u64 != header.num_blocks {
            return Err(IndexError::EntryCountMismatch {
                expected: header.num_blocks,
                found: entries.len() as u64,
            }
            .into());
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(first: u32, last: u32, offset: u64) -> IndexEntry {
        IndexEntry {
            first_position: first,
            last_position: last,
            num_positions: last - first + 1,
            reserved: 0,
            offset,
        }
    }

    fn index() -> SaIndex {
        SaIndex::new(vec![entry(10, 50, 100), entry(60, 90, 400), entry(200, 250, 900)])
    }

    #[test]
    fn test_struct_sizes() {
        assert_eq!(size_of::<IndexHeader>(), 40);
        assert_eq!(size_of::<IndexEntry>(), 24);
    }

    #[test]
    fn test_find_block() {
        let index = index();
        assert_eq!(index.find_block(5), None);
        assert_eq!(index.find_block(10), Some(0));
        assert_eq!(index.find_block(50), Some(0));
        assert_eq!(index.find_block(55), None);
        assert_eq!(index.find_block(60), Some(1));
        assert_eq!(index.find_block(199), None);
        assert_eq!(index.find_block(250), Some(2));
        assert_eq!(index.find_block(251), None);
        assert_eq!(SaIndex::default().find_block(1), None);
    }

    #[test]
    fn test_index_bytes() -> Result<()> {
        let index = index();
        let mut buf = Vec::new();
        index.write_bytes(&mut buf)?;
        let decoded = SaIndex::read_bytes(&mut buf.as_slice())?;
        assert_eq!(decoded, index);
        assert_eq!(decoded.num_positions(), 41 + 31 + 51);
        Ok(())
    }

    #[test]
    fn test_index_version_refused() -> Result<()> {
        let mut buf = Vec::new();
        index().write_bytes(&mut buf)?;
        // data_version lives right after the 8-byte magic
        buf[8] = buf[8].wrapping_add(1);
        let err = SaIndex::read_bytes(&mut buf.as_slice()).unwrap_err();
        assert!(err.is_version_mismatch());
        Ok(())
    }

    #[test]
    fn test_index_format_version_refused() -> Result<()> {
        let mut buf = Vec::new();
        index().write_bytes(&mut buf)?;
        // format_version follows the 2-byte data version
        buf[10] = buf[10].wrapping_add(7);
        let err = SaIndex::read_bytes(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::IndexError(IndexError::UnsupportedFormat { found: 8, .. })
        ));
        assert!(err.is_version_mismatch());
        Ok(())
    }

    #[test]
    fn test_index_magic_refused() -> Result<()> {
        let mut buf = Vec::new();
        index().write_bytes(&mut buf)?;
        buf[0] = b'X';
        assert!(SaIndex::read_bytes(&mut buf.as_slice()).is_err());
        Ok(())
    }
}
