use std::{
    fs::File,
    io::{BufReader, Read},
    ops::Range,
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;

use super::{
    block::DecodedBlock, index_path, section, FilePreamble, SaIndex, DATA_VERSION, FILE_MAGIC,
};
use crate::{
    error::{HeaderError, IoContext, ReadError},
    GlobalMajorAllele, Result, SaPosition, SupplementaryAnnotationHeader, SupplementaryInterval,
};

/// Location of one side-channel section body within the primary bytes
#[derive(Clone, Debug, Default)]
struct Section {
    count: u32,
    range: Range<usize>,
}

/// Random-access reader over one chromosome's annotation database
///
/// The primary bytes are usually a memory map of the `.nsa` file. The index is
/// decoded once on open and the last decompressed block is kept, so lookups
/// of nearby positions decode each block only once.
pub struct SaReader<B: AsRef<[u8]> = Mmap> {
    bytes: B,
    header: SupplementaryAnnotationHeader,
    index: SaIndex,

    small_variant_intervals: Section,
    sv_intervals: Section,
    all_variant_intervals: Section,
    global_major_alleles: Section,

    /// Most recently decoded block
    block: DecodedBlock,
    /// Index of the block held in `block`
    cached_block: Option<usize>,
}

impl SaReader<Mmap> {
    /// Opens the database at `path` and its companion `.idx` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_path("open", path)?;
        if !file.metadata().with_path("stat", path)?.is_file() {
            return Err(ReadError::IncompatibleFile.into());
        }

        // SAFETY: the database is write-once and never modified after it is promoted
        let bytes = unsafe { Mmap::map(&file) }.with_path("memory map", path)?;

        let idx_path = index_path(path);
        let index_file = File::open(&idx_path).with_path("open", &idx_path)?;
        Self::new(bytes, BufReader::new(index_file))
    }
}

impl<B: AsRef<[u8]>> SaReader<B> {
    /// Opens a database over its primary bytes and an index stream
    pub fn new<R: Read>(bytes: B, mut index_reader: R) -> Result<Self> {
        let index = SaIndex::read_bytes(&mut index_reader)?;

        let total = bytes.as_ref().len();
        let mut cursor = bytes.as_ref();
        let header = Self::read_header(&mut cursor)?;

        let small_variant_intervals =
            read_section(&mut cursor, total, section::SMALL_VARIANT_INTERVALS)?;
        let sv_intervals = read_section(&mut cursor, total, section::SV_INTERVALS)?;
        let all_variant_intervals =
            read_section(&mut cursor, total, section::ALL_VARIANT_INTERVALS)?;
        let global_major_alleles = read_section(&mut cursor, total, section::GLOBAL_MAJOR_ALLELES)?;

        Ok(Self {
            bytes,
            header,
            index,
            small_variant_intervals,
            sv_intervals,
            all_variant_intervals,
            global_major_alleles,
            block: DecodedBlock::default(),
            cached_block: None,
        })
    }

    /// Reads only the database header from the start of a primary stream
    ///
    /// Fails if the stream is not a database of this format and data version.
    pub fn read_header<R: Read>(reader: &mut R) -> Result<SupplementaryAnnotationHeader> {
        let mut preamble = [0u8; size_of::<FilePreamble>()];
        reader.read_exact(&mut preamble)?;
        FilePreamble::from_bytes(&preamble, FILE_MAGIC)?;

        let header = SupplementaryAnnotationHeader::read_bytes(reader)?;
        if header.data_version != DATA_VERSION {
            return Err(HeaderError::DataVersionMismatch {
                expected: DATA_VERSION,
                found: header.data_version,
            }
            .into());
        }
        Ok(header)
    }

    #[must_use]
    pub fn header(&self) -> &SupplementaryAnnotationHeader {
        &self.header
    }

    #[must_use]
    pub fn index(&self) -> &SaIndex {
        &self.index
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.index.num_blocks()
    }

    /// Number of annotated positions in the database
    #[must_use]
    pub fn num_positions(&self) -> usize {
        self.index.num_positions()
    }

    /// Returns the annotation at `position`, or `None` if it was never written
    pub fn get_annotation(&mut self, position: u32) -> Result<Option<SaPosition>> {
        let Some(block_idx) = self.index.find_block(position) else {
            return Ok(None);
        };
        if self.cached_block != Some(block_idx) {
            self.cached_block = None;
            let offset = self.index.entries()[block_idx].offset;
            self.block.load(self.bytes.as_ref(), offset)?;
            self.cached_block = Some(block_idx);
        }
        self.block
            .find(position)
            .map(|mut record| SaPosition::read_bytes(&mut record))
            .transpose()
    }

    /// Intervals reported for small variants, in stored order
    #[must_use]
    pub fn small_variant_intervals(&self) -> IntervalIter<'_> {
        IntervalIter::new(self.section_bytes(&self.small_variant_intervals), self.small_variant_intervals.count)
    }

    /// Intervals reported for structural variants, in stored order
    #[must_use]
    pub fn sv_intervals(&self) -> IntervalIter<'_> {
        IntervalIter::new(self.section_bytes(&self.sv_intervals), self.sv_intervals.count)
    }

    /// Intervals reported for all variants, in stored order
    #[must_use]
    pub fn all_variant_intervals(&self) -> IntervalIter<'_> {
        IntervalIter::new(self.section_bytes(&self.all_variant_intervals), self.all_variant_intervals.count)
    }

    /// Reference-minor positions in increasing order
    #[must_use]
    pub fn global_major_alleles(&self) -> RefMinorIter<'_> {
        RefMinorIter {
            bytes: self.section_bytes(&self.global_major_alleles),
            remaining: self.global_major_alleles.count,
        }
    }

    fn section_bytes(&self, section: &Section) -> &[u8] {
        &self.bytes.as_ref()[section.range.clone()]
    }
}

/// Reads a section header from `cursor` and skips over its body
fn read_section(cursor: &mut &[u8], total: usize, expected: u8) -> Result<Section> {
    if cursor.len() < section::SECTION_HEADER_SIZE {
        return Err(ReadError::FileTruncation(total - cursor.len()).into());
    }
    let tag = cursor.read_u8()?;
    if tag != expected {
        return Err(ReadError::UnexpectedSection {
            expected,
            found: tag,
        }
        .into());
    }
    let count = cursor.read_u32::<LittleEndian>()?;
    let len = cursor.read_u64::<LittleEndian>()? as usize;
    if len > cursor.len() {
        return Err(ReadError::FileTruncation(total).into());
    }
    let start = total - cursor.len();
    *cursor = &cursor[len..];
    Ok(Section {
        count,
        range: start..start + len,
    })
}

/// Lazily decodes the intervals of one section
pub struct IntervalIter<'a> {
    bytes: &'a [u8],
    remaining: u32,
}
impl<'a> IntervalIter<'a> {
    fn new(bytes: &'a [u8], remaining: u32) -> Self {
        Self { bytes, remaining }
    }
}
impl Iterator for IntervalIter<'_> {
    type Item = Result<SupplementaryInterval>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let interval = SupplementaryInterval::read_bytes(&mut self.bytes);
        if interval.is_err() {
            self.remaining = 0;
        }
        Some(interval)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

/// Lazily decodes the reference-minor section
pub struct RefMinorIter<'a> {
    bytes: &'a [u8],
    remaining: u32,
}
impl Iterator for RefMinorIter<'_> {
    type Item = Result<GlobalMajorAllele>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let gma = GlobalMajorAllele::read_bytes(&mut self.bytes);
        if gma.is_err() {
            self.remaining = 0;
        }
        Some(gma)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}
