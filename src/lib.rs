//! # sadb
//!
//! Builds and queries per-chromosome supplementary annotation databases.
//!
//! Each database aggregates, for every annotated genomic position, the
//! records of several independently produced annotation sources, together
//! with range annotations and the positions where the reference base is the
//! population minor allele.
//!
//! ## Building
//!
//! Sources are sorted per chromosome. A [`KWayMerger`] combines them into one
//! ordered stream of grouped records, which an [`SaWriter`](nsa::SaWriter)
//! persists as a blocked, zstd-compressed `.nsa` file with a companion `.idx`
//! block index. [`SaMerger`] runs this for every chromosome on a bounded pool
//! of worker threads and writes a whole-genome gene database alongside.
//!
//! ## Reading
//!
//! [`SaReader`](nsa::SaReader) memory maps a database and answers position
//! lookups by binary search over the index followed by a single block
//! decompression. [`RangeExtractor`] copies a position range of a database
//! into a smaller, self-contained database.

mod core;
mod error;
mod extract;
pub mod gene;
pub mod merge;
pub mod nsa;
mod orchestrator;
mod reference;
pub mod report;
pub mod source;

pub use core::{
    AnnotatedGene, DataSourceVersion, GeneAnnotation, GenomeAssembly, GlobalMajorAllele, Interval,
    InterimSaItem, InterimSaPosition, ReportFor, SaDataRecord, SaHeader, SaPosition,
    SupplementaryAnnotationHeader, SupplementaryInterval,
};
pub use error::{Error, HeaderError, IndexError, MergeError, ReadError, Result, SourceError, WriteError};
pub use extract::{ExtractionSummary, RangeExtractor};
pub use merge::{KWayMerger, MergeKey, SourceCursor};
pub use orchestrator::{check_assembly_consistency, MergeConfig, MergeSummary, SaMerger, DEFAULT_CONCURRENCY};
pub use reference::{ChromosomeDictionary, ReferenceLookup};
