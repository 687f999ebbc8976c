use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use bytemuck::{Pod, Zeroable};
use zstd::stream::{copy_decode, copy_encode};

use super::BLOCK_MAGIC;
use crate::{
    core::utils::slice_and_increment,
    error::{ReadError, WriteError},
    Result,
};

/// Bytes of per-position framing inside a block (position + record length)
pub(crate) const SIZE_POSITION_FRAME: usize = 8;

/// Header written ahead of every compressed position block
///
/// This is stored identically in memory and on disk.
#[derive(Copy, Clone, Pod, Zeroable, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct BlockHeader {
    magic: [u8; 3],
    version: u8,

    /// Number of positions encoded in the block
    pub num_positions: u32,
    /// First position in the block
    pub first_position: u32,
    /// Last position in the block
    pub last_position: u32,

    /// Number of bytes in the uncompressed block
    pub u_bytes: u64,
    /// Number of bytes in the compressed block
    pub z_bytes: u64,
}
impl BlockHeader {
    fn new(num_positions: u32, first_position: u32, last_position: u32, u_bytes: u64, z_bytes: u64) -> Self {
        Self {
            magic: *BLOCK_MAGIC,
            version: 1,
            num_positions,
            first_position,
            last_position,
            u_bytes,
            z_bytes,
        }
    }

    /// Length of the block on disk including this header
    #[must_use]
    pub fn size_with_header(&self) -> u64 {
        size_of::<Self>() as u64 + self.z_bytes
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Parses a block header found at byte `offset` of the primary stream
    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self> {
        if bytes.len() < size_of::<Self>() {
            return Err(ReadError::FileTruncation(offset as usize).into());
        }
        let header: Self = bytemuck::pod_read_unaligned(&bytes[..size_of::<Self>()]);
        if header.magic != *BLOCK_MAGIC {
            return Err(ReadError::InvalidBlockMagic(offset).into());
        }
        Ok(header)
    }
}

/// Accumulates consecutive positions until the block budget is reached
pub(crate) struct BlockBuilder {
    /// Virtual block size (uncompressed bytes)
    block_size: usize,
    /// Compression level
    level: i32,
    /// Uncompressed buffer
    ubuf: Vec<u8>,
    /// Compressed buffer
    zbuf: Vec<u8>,
    num_positions: u32,
    first_position: u32,
    last_position: u32,
}
impl BlockBuilder {
    pub(crate) fn new(block_size: usize, level: i32) -> Self {
        Self {
            block_size,
            level,
            ubuf: Vec::with_capacity(block_size),
            zbuf: Vec::new(),
            num_positions: 0,
            first_position: 0,
            last_position: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.num_positions == 0
    }

    /// Checks whether a record of `record_size` bytes would overflow the current block
    pub(crate) fn exceeds_block_size(&self, record_size: usize) -> Result<bool> {
        let framed = record_size + SIZE_POSITION_FRAME;
        if framed > self.block_size {
            return Err(WriteError::RecordSizeExceedsMaximumBlockSize(framed, self.block_size).into());
        }
        Ok(self.ubuf.len() + framed > self.block_size)
    }

    pub(crate) fn push(&mut self, position: u32, record: &[u8]) -> Result<()> {
        if self.is_empty() {
            self.first_position = position;
        }
        self.ubuf.write_u32::<LittleEndian>(position)?;
        self.ubuf.write_u32::<LittleEndian>(record.len() as u32)?;
        self.ubuf.write_all(record)?;
        self.last_position = position;
        self.num_positions += 1;
        Ok(())
    }

    /// Compresses and writes the block, returning its header (or `None` if empty)
    pub(crate) fn flush<W: Write>(&mut self, inner: &mut W) -> Result<Option<BlockHeader>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.zbuf.clear();
        copy_encode(self.ubuf.as_slice(), &mut self.zbuf, self.level)?;

        let header = BlockHeader::new(
            self.num_positions,
            self.first_position,
            self.last_position,
            self.ubuf.len() as u64,
            self.zbuf.len() as u64,
        );
        inner.write_all(header.as_bytes())?;
        inner.write_all(&self.zbuf)?;

        self.clear();
        Ok(Some(header))
    }

    fn clear(&mut self) {
        self.ubuf.clear();
        self.zbuf.clear();
        self.num_positions = 0;
        self.first_position = 0;
        self.last_position = 0;
    }
}

/// A decompressed block with the location of every record in it
#[derive(Default)]
pub(crate) struct DecodedBlock {
    ubuf: Vec<u8>,
    /// (position, start, len) of each record in `ubuf`
    entries: Vec<(u32, usize, usize)>,
}
impl DecodedBlock {
    /// Decompresses the block whose header starts at `offset` in `bytes`
    pub(crate) fn load(&mut self, bytes: &[u8], offset: u64) -> Result<()> {
        self.ubuf.clear();
        self.entries.clear();

        let start = offset as usize;
        if start > bytes.len() {
            return Err(ReadError::FileTruncation(start).into());
        }
        let header = BlockHeader::from_bytes(&bytes[start..], offset)?;
        let data_start = start + size_of::<BlockHeader>();
        let data_end = usize::try_from(header.z_bytes)
            .ok()
            .and_then(|z_bytes| data_start.checked_add(z_bytes))
            .filter(|&end| end <= bytes.len())
            .ok_or(ReadError::FileTruncation(bytes.len()))?;
        copy_decode(&bytes[data_start..data_end], &mut self.ubuf)?;
        if self.ubuf.len() as u64 != header.u_bytes {
            return Err(ReadError::CorruptBlock {
                offset,
                expected: header.u_bytes,
                found: self.ubuf.len() as u64,
            }
            .into());
        }

        let mut pos = 0;
        for _ in 0..header.num_positions {
            if pos + SIZE_POSITION_FRAME > self.ubuf.len() {
                return Err(ReadError::CorruptBlock {
                    offset,
                    expected: header.u_bytes,
                    found: pos as u64,
                }
                .into());
            }
            let frame = slice_and_increment(&mut pos, SIZE_POSITION_FRAME, &self.ubuf);
            let position = LittleEndian::read_u32(&frame[..4]);
            let len = LittleEndian::read_u32(&frame[4..]) as usize;
            if pos.saturating_add(len) > self.ubuf.len() {
                return Err(ReadError::CorruptBlock {
                    offset,
                    expected: header.u_bytes,
                    found: pos.saturating_add(len) as u64,
                }
                .into());
            }
            self.entries.push((position, pos, len));
            pos += len;
        }
        Ok(())
    }

    /// Linear scan for the record at `position`
    pub(crate) fn find(&self, position: u32) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(p, _, _)| *p == position)
            .map(|&(_, start, len)| &self.ubuf[start..start + len])
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_header_size() {
        assert_eq!(size_of::<BlockHeader>(), 32);
    }

    #[test]
    fn test_flush_and_load() -> Result<()> {
        let mut builder = BlockBuilder::new(1024, 3);
        builder.push(100, b"first")?;
        builder.push(150, b"")?;
        builder.push(300, b"third")?;

        // leading junk to exercise a non-zero offset
        let mut out = vec![0u8; 5];
        let header = builder.flush(&mut out)?.unwrap();
        assert_eq!(header.num_positions, 3);
        assert_eq!(header.first_position, 100);
        assert_eq!(header.last_position, 300);
        assert_eq!(out.len() as u64, 5 + header.size_with_header());
        assert!(builder.is_empty());

        let mut block = DecodedBlock::default();
        block.load(&out, 5)?;
        assert_eq!(block.len(), 3);
        assert_eq!(block.find(100), Some(&b"first"[..]));
        assert_eq!(block.find(150), Some(&b""[..]));
        assert_eq!(block.find(300), Some(&b"third"[..]));
        assert_eq!(block.find(200), None);
        Ok(())
    }

    #[test]
    fn test_empty_flush_writes_nothing() -> Result<()> {
        let mut builder = BlockBuilder::new(1024, 3);
        let mut out = Vec::new();
        assert!(builder.flush(&mut out)?.is_none());
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn test_exceeds_block_size() -> Result<()> {
        let mut builder = BlockBuilder::new(32, 3);
        assert!(!builder.exceeds_block_size(10)?);
        builder.push(1, &[0; 10])?;
        assert!(builder.exceeds_block_size(10)?);
        assert!(builder.exceeds_block_size(64).is_err());
        Ok(())
    }

    #[test]
    fn test_oversized_compressed_length_is_truncation() -> Result<()> {
        let mut builder = BlockBuilder::new(1024, 3);
        builder.push(7, b"record")?;
        let mut out = Vec::new();
        builder.flush(&mut out)?;

        // z_bytes is the last header field
        out[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        let mut block = DecodedBlock::default();
        let err = block.load(&out, 0).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ReadError(ReadError::FileTruncation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_bad_magic() {
        let bytes = vec![0u8; 64];
        assert!(BlockHeader::from_bytes(&bytes, 0).is_err());
        let mut block = DecodedBlock::default();
        assert!(block.load(&bytes, 0).is_err());
    }
}
