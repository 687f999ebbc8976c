//! Extraction of a position range into a smaller database

use std::{fs::File, io::BufReader, path::PathBuf};

use crate::{
    error::{IoContext, MergeError, ReadError},
    nsa::{PendingDatabase, RefMinorPolicy, SaReader, SaWriterBuilder, DATABASE_EXTENSION},
    ReferenceLookup, Result, SupplementaryAnnotationHeader, SupplementaryInterval,
};

/// Counts of what an extraction kept
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Primary file of the extracted database
    pub path: PathBuf,
    /// Positions written
    pub positions: usize,
    pub small_variant_intervals: usize,
    pub sv_intervals: usize,
    pub all_variant_intervals: usize,
    pub ref_minors: usize,
}

/// Copies the positions `begin..=end` of a database into a new database
///
/// Intervals overlapping the range and reference-minor positions inside it
/// are kept; every record keeps its absolute position and is otherwise
/// unchanged.
pub struct RangeExtractor<L: ReferenceLookup> {
    reference: L,
    database: PathBuf,
    begin: u32,
    end: u32,
    data_source: Option<String>,
    output_dir: Option<PathBuf>,
}
impl<L: ReferenceLookup> RangeExtractor<L> {
    pub fn new<P: Into<PathBuf>>(reference: L, database: P, begin: u32, end: u32) -> Result<Self> {
        if begin == 0 || end < begin {
            return Err(ReadError::InvalidRange { begin, end }.into());
        }
        Ok(Self {
            reference,
            database: database.into(),
            begin,
            end,
            data_source: None,
            output_dir: None,
        })
    }

    /// Adds a data source name to the output file name
    #[must_use]
    pub fn data_source(mut self, name: impl Into<String>) -> Self {
        self.data_source = Some(name.into());
        self
    }

    /// Writes the output inside `dir` instead of the working directory
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Reads the database header without loading any blocks
    pub fn read_header(&self) -> Result<SupplementaryAnnotationHeader> {
        let file = File::open(&self.database).with_path("open", &self.database)?;
        SaReader::<Vec<u8>>::read_header(&mut BufReader::new(file))
    }

    /// `<ref>_<begin>_<end>[_<source>].nsa` for the chromosome named in `header`
    pub fn output_path(&self, header: &SupplementaryAnnotationHeader) -> Result<PathBuf> {
        let display_name = self
            .reference
            .display_name(&header.reference_name)
            .ok_or_else(|| MergeError::UnknownReference(header.reference_name.clone()))?;
        let mut name = format!("{display_name}_{}_{}", self.begin, self.end);
        if let Some(source) = &self.data_source {
            name.push('_');
            name.push_str(source);
        }
        name.push('.');
        name.push_str(DATABASE_EXTENSION);
        Ok(match &self.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        })
    }

    fn keep_overlapping(
        &self,
        intervals: impl Iterator<Item = Result<SupplementaryInterval>>,
    ) -> Result<Vec<SupplementaryInterval>> {
        let (begin, end) = (self.begin, self.end);
        intervals
            .filter(|interval| {
                interval
                    .as_ref()
                    .map_or(true, |interval| interval.interval().overlaps(begin, end))
            })
            .collect()
    }

    /// Runs the extraction, returning what was written
    pub fn extract(&self) -> Result<ExtractionSummary> {
        let header = self.read_header()?;
        let path = self.output_path(&header)?;
        let mut reader = SaReader::from_path(&self.database)?;

        let small_variant_intervals = self.keep_overlapping(reader.small_variant_intervals())?;
        let sv_intervals = self.keep_overlapping(reader.sv_intervals())?;
        let all_variant_intervals = self.keep_overlapping(reader.all_variant_intervals())?;
        log::info!(
            "found {} small variant, {} SV and {} all variant intervals overlapping {}-{}",
            small_variant_intervals.len(),
            sv_intervals.len(),
            all_variant_intervals.len(),
            self.begin,
            self.end
        );

        let global_major_alleles = reader
            .global_major_alleles()
            .filter(|gma| {
                gma.as_ref()
                    .map_or(true, |gma| (self.begin..=self.end).contains(&gma.position))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut summary = ExtractionSummary {
            path: path.clone(),
            positions: 0,
            small_variant_intervals: small_variant_intervals.len(),
            sv_intervals: sv_intervals.len(),
            all_variant_intervals: all_variant_intervals.len(),
            ref_minors: global_major_alleles.len(),
        };

        let pending = PendingDatabase::new(path);
        let (primary, index) = pending.create()?;
        {
            // records at reference-minor positions already carry their allele
            let mut writer = SaWriterBuilder::default()
                .ref_minor_policy(RefMinorPolicy::Suppress)
                .small_variant_intervals(small_variant_intervals)
                .sv_intervals(sv_intervals)
                .all_variant_intervals(all_variant_intervals)
                .global_major_alleles(global_major_alleles)
                .build(primary, index, reader.header())?;

            for position in self.begin..=self.end {
                if let Some(record) = reader.get_annotation(position)? {
                    writer.write(&record, position)?;
                    summary.positions += 1;
                }
            }
            writer.finish()?;
        }
        drop(reader);
        pending.commit()?;

        log::info!(
            "wrote {} positions to {}",
            summary.positions,
            summary.path.display()
        );
        Ok(summary)
    }
}
