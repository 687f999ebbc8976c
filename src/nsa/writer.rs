use std::collections::VecDeque;
use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use super::{
    block::BlockBuilder, section, FilePreamble, IndexEntry, SaIndex, DATA_VERSION,
    DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL, FILE_MAGIC,
};
use crate::{
    error::{HeaderError, WriteError},
    GlobalMajorAllele, ReportFor, Result, SaPosition, SupplementaryAnnotationHeader,
    SupplementaryInterval,
};

/// What the writer does when a reference-minor position is also a variant position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefMinorPolicy {
    /// Attach the global major allele to the variant record
    #[default]
    Merge,
    /// Write the variant record unchanged and drop the reference-minor entry
    Suppress,
}

/// A builder for creating configured `SaWriter` instances
///
/// Unset options fall back to [`DEFAULT_BLOCK_SIZE`], [`DEFAULT_COMPRESSION_LEVEL`]
/// and [`RefMinorPolicy::Merge`].
#[derive(Default)]
pub struct SaWriterBuilder {
    block_size: Option<usize>,
    compression_level: Option<i32>,
    ref_minor_policy: Option<RefMinorPolicy>,
    small_variant_intervals: Vec<SupplementaryInterval>,
    sv_intervals: Vec<SupplementaryInterval>,
    all_variant_intervals: Vec<SupplementaryInterval>,
    global_major_alleles: Vec<GlobalMajorAllele>,
}
impl SaWriterBuilder {
    /// Sets the uncompressed byte budget of each block
    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Sets the zstd compression level
    #[must_use]
    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    #[must_use]
    pub fn ref_minor_policy(mut self, policy: RefMinorPolicy) -> Self {
        self.ref_minor_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn small_variant_intervals(mut self, intervals: Vec<SupplementaryInterval>) -> Self {
        self.small_variant_intervals = intervals;
        self
    }

    #[must_use]
    pub fn sv_intervals(mut self, intervals: Vec<SupplementaryInterval>) -> Self {
        self.sv_intervals = intervals;
        self
    }

    #[must_use]
    pub fn all_variant_intervals(mut self, intervals: Vec<SupplementaryInterval>) -> Self {
        self.all_variant_intervals = intervals;
        self
    }

    /// Routes each interval to the list of its category
    #[must_use]
    pub fn intervals(mut self, intervals: impl IntoIterator<Item = SupplementaryInterval>) -> Self {
        for interval in intervals {
            match interval.category {
                ReportFor::SmallVariants => self.small_variant_intervals.push(interval),
                ReportFor::StructuralVariants => self.sv_intervals.push(interval),
                ReportFor::AllVariants => self.all_variant_intervals.push(interval),
            }
        }
        self
    }

    #[must_use]
    pub fn global_major_alleles(mut self, alleles: Vec<GlobalMajorAllele>) -> Self {
        self.global_major_alleles = alleles;
        self
    }

    /// Opens a writer session over a primary and an index stream
    ///
    /// The header and the side-channel sections are written immediately.
    pub fn build<W: Write, X: Write>(
        self,
        inner: W,
        index_out: X,
        header: &SupplementaryAnnotationHeader,
    ) -> Result<SaWriter<W, X>> {
        if header.data_version != DATA_VERSION {
            return Err(HeaderError::DataVersionMismatch {
                expected: DATA_VERSION,
                found: header.data_version,
            }
            .into());
        }

        let mut global_major_alleles = self.global_major_alleles;
        global_major_alleles.sort_by_key(|gma| gma.position);
        global_major_alleles.dedup_by_key(|gma| gma.position);

        let mut writer = SaWriter {
            inner,
            index_out,
            block: BlockBuilder::new(
                self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
                self.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL),
            ),
            index: SaIndex::default(),
            policy: self.ref_minor_policy.unwrap_or_default(),
            pending_ref_minors: VecDeque::new(),
            rbuf: Vec::new(),
            bytes_written: 0,
            last_position: None,
            positions_written: 0,
            ref_minor_count: 0,
            finished: false,
        };
        writer.write_preamble(header)?;
        writer.write_interval_section(section::SMALL_VARIANT_INTERVALS, &self.small_variant_intervals)?;
        writer.write_interval_section(section::SV_INTERVALS, &self.sv_intervals)?;
        writer.write_interval_section(section::ALL_VARIANT_INTERVALS, &self.all_variant_intervals)?;
        writer.write_ref_minor_section(&global_major_alleles)?;
        writer.pending_ref_minors = global_major_alleles.into();
        Ok(writer)
    }
}

/// Writes one chromosome's annotation database
///
/// Positions must be written in strictly increasing order. Reference-minor
/// positions supplied to the builder are interleaved automatically.
///
/// The writer is finished on drop, but errors are only reported by an
/// explicit [`finish`](SaWriter::finish).
pub struct SaWriter<W: Write, X: Write> {
    inner: W,
    index_out: X,
    block: BlockBuilder,
    index: SaIndex,
    policy: RefMinorPolicy,

    /// Reference-minor positions not yet reached
    pending_ref_minors: VecDeque<GlobalMajorAllele>,

    /// Reusable record buffer
    rbuf: Vec<u8>,

    /// Bytes written to the primary stream so far
    bytes_written: u64,
    last_position: Option<u32>,
    positions_written: usize,
    ref_minor_count: usize,
    finished: bool,
}
impl<W: Write, X: Write> SaWriter<W, X> {
    fn write_preamble(&mut self, header: &SupplementaryAnnotationHeader) -> Result<()> {
        let mut buf = FilePreamble::new(*FILE_MAGIC).as_bytes().to_vec();
        header.write_bytes(&mut buf)?;
        self.write_raw(&buf)
    }

    fn write_interval_section(&mut self, tag: u8, intervals: &[SupplementaryInterval]) -> Result<()> {
        let mut body = Vec::new();
        for interval in intervals {
            interval.write_bytes(&mut body)?;
        }
        self.write_section(tag, intervals.len(), &body)
    }

    fn write_ref_minor_section(&mut self, alleles: &[GlobalMajorAllele]) -> Result<()> {
        let mut body = Vec::new();
        for gma in alleles {
            gma.write_bytes(&mut body)?;
        }
        self.write_section(section::GLOBAL_MAJOR_ALLELES, alleles.len(), &body)
    }

    fn write_section(&mut self, tag: u8, count: usize, body: &[u8]) -> Result<()> {
        let mut buf = Vec::with_capacity(section::SECTION_HEADER_SIZE + body.len());
        buf.write_u8(tag)?;
        buf.write_u32::<LittleEndian>(count as u32)?;
        buf.write_u64::<LittleEndian>(body.len() as u64)?;
        buf.extend_from_slice(body);
        self.write_raw(&buf)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Writes the annotation for `position`
    ///
    /// Any pending reference-minor positions before `position` are written
    /// first as allele-only records.
    pub fn write(&mut self, record: &SaPosition, position: u32) -> Result<()> {
        if self.finished {
            return Err(WriteError::AlreadyFinished.into());
        }
        if position == 0 {
            return Err(WriteError::ZeroPosition.into());
        }
        if let Some(previous) = self.last_position {
            if position <= previous {
                return Err(WriteError::NonIncreasingPosition { previous, position }.into());
            }
        }

        self.emit_ref_minors_before(position)?;

        let coinciding = self
            .pending_ref_minors
            .front()
            .is_some_and(|gma| gma.position == position);
        if coinciding {
            if let Some(gma) = self.pending_ref_minors.pop_front() {
                if self.policy == RefMinorPolicy::Merge && record.global_major_allele.is_none() {
                    let mut merged = record.clone();
                    merged.global_major_allele = Some(gma.allele);
                    return self.write_record(&merged, position);
                }
            }
        }
        self.write_record(record, position)
    }

    fn emit_ref_minors_before(&mut self, position: u32) -> Result<()> {
        while self
            .pending_ref_minors
            .front()
            .is_some_and(|gma| gma.position < position)
        {
            if let Some(gma) = self.pending_ref_minors.pop_front() {
                self.write_record(&SaPosition::ref_minor(gma.allele), gma.position)?;
                self.ref_minor_count += 1;
            }
        }
        Ok(())
    }

    fn write_record(&mut self, record: &SaPosition, position: u32) -> Result<()> {
        self.rbuf.clear();
        record.write_bytes(&mut self.rbuf)?;
        if self.block.exceeds_block_size(self.rbuf.len())? {
            self.flush_block()?;
        }
        self.block.push(position, &self.rbuf)?;
        self.last_position = Some(position);
        self.positions_written += 1;
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        let offset = self.bytes_written;
        if let Some(header) = self.block.flush(&mut self.inner)? {
            log::debug!(
                "flushed block of {} positions ({}..={}) at offset {offset}",
                header.num_positions,
                header.first_position,
                header.last_position
            );
            self.bytes_written += header.size_with_header();
            self.index.push(IndexEntry::from_block_header(&header, offset));
        }
        Ok(())
    }

    /// Number of positions written only because they are reference-minor
    #[must_use]
    pub fn ref_minor_count(&self) -> usize {
        self.ref_minor_count
    }

    /// Number of positions written, including reference-minor positions
    #[must_use]
    pub fn positions_written(&self) -> usize {
        self.positions_written
    }

    /// Finishes the database
    ///
    /// Remaining reference-minor positions are written, the last block is
    /// flushed, the index is written, and both streams are flushed. Calling
    /// this more than once is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.emit_ref_minors_before(u32::MAX)?;
        if let Some(gma) = self.pending_ref_minors.pop_front() {
            self.write_record(&SaPosition::ref_minor(gma.allele), gma.position)?;
            self.ref_minor_count += 1;
        }
        self.flush_block()?;
        self.inner.flush()?;

        self.index.write_bytes(&mut self.index_out)?;
        self.index_out.flush()?;
        self.finished = true;
        Ok(())
    }
}
impl<W: Write, X: Write> Drop for SaWriter<W, X> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("failed to finish annotation database: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nsa::SaIndex, GenomeAssembly, SaDataRecord};

    fn header() -> SupplementaryAnnotationHeader {
        SupplementaryAnnotationHeader::new("chr1", DATA_VERSION, Vec::new(), GenomeAssembly::GRCh37)
    }

    fn record(source: &str) -> SaPosition {
        SaPosition::new(vec![SaDataRecord::new(source, b"payload".to_vec())])
    }

    #[test]
    fn test_positions_must_increase() -> Result<()> {
        let (mut primary, mut index) = (Vec::new(), Vec::new());
        let mut writer = SaWriterBuilder::default().build(&mut primary, &mut index, &header())?;
        writer.write(&record("A"), 150)?;
        assert!(matches!(
            writer.write(&record("A"), 100),
            Err(crate::Error::WriteError(WriteError::NonIncreasingPosition {
                previous: 150,
                position: 100
            }))
        ));
        assert!(writer.write(&record("A"), 150).is_err());
        assert!(writer.write(&record("A"), 0).is_err());
        writer.write(&record("A"), 151)?;
        assert_eq!(writer.positions_written(), 2);
        Ok(())
    }

    #[test]
    fn test_write_after_finish() -> Result<()> {
        let (mut primary, mut index) = (Vec::new(), Vec::new());
        let mut writer = SaWriterBuilder::default().build(&mut primary, &mut index, &header())?;
        writer.finish()?;
        writer.finish()?;
        assert!(writer.write(&record("A"), 1).is_err());
        Ok(())
    }

    #[test]
    fn test_stale_header_is_refused() {
        let (mut primary, mut index) = (Vec::new(), Vec::new());
        let mut stale = header();
        stale.data_version = DATA_VERSION + 1;
        let err = SaWriterBuilder::default()
            .build(&mut primary, &mut index, &stale)
            .err()
            .unwrap();
        assert!(err.is_version_mismatch());
    }

    #[test]
    fn test_ref_minor_interleaving() -> Result<()> {
        let (mut primary, mut index) = (Vec::new(), Vec::new());
        {
            let mut writer = SaWriterBuilder::default()
                .global_major_alleles(vec![
                    GlobalMajorAllele::new(400, "G"),
                    GlobalMajorAllele::new(5, "A"),
                    GlobalMajorAllele::new(20, "C"),
                ])
                .build(&mut primary, &mut index, &header())?;
            writer.write(&record("A"), 10)?;
            writer.write(&record("A"), 20)?;
            // 5 was emitted before 10; 20 coincided; 400 is emitted at finish
            assert_eq!(writer.ref_minor_count(), 1);
            writer.finish()?;
            assert_eq!(writer.ref_minor_count(), 2);
            assert_eq!(writer.positions_written(), 4);
        }
        let index = SaIndex::read_bytes(&mut index.as_slice())?;
        assert_eq!(index.num_positions(), 4);
        Ok(())
    }

    #[test]
    fn test_block_splitting() -> Result<()> {
        let (mut primary, mut index) = (Vec::new(), Vec::new());
        {
            let mut writer = SaWriterBuilder::default()
                .block_size(64)
                .build(&mut primary, &mut index, &header())?;
            for position in 1..=20 {
                writer.write(&record("A"), position)?;
            }
        }
        let index = SaIndex::read_bytes(&mut index.as_slice())?;
        assert!(index.num_blocks() > 1);
        assert_eq!(index.num_positions(), 20);
        let entries = index.entries();
        assert_eq!(entries[0].first_position, 1);
        assert_eq!(entries[entries.len() - 1].last_position, 20);
        for pair in entries.windows(2) {
            assert!(pair[0].last_position < pair[1].first_position);
            assert!(pair[0].offset < pair[1].offset);
        }
        Ok(())
    }

    #[test]
    fn test_oversized_record() -> Result<()> {
        let (mut primary, mut index) = (Vec::new(), Vec::new());
        let mut writer = SaWriterBuilder::default()
            .block_size(16)
            .build(&mut primary, &mut index, &header())?;
        assert!(writer.write(&record("a-long-source-name"), 1).is_err());
        Ok(())
    }
}
