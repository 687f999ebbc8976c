//! # Annotation sources
//!
//! Traits at the boundary between upstream annotation files and the merge,
//! with tab-separated implementations for each kind of source.
//!
//! Every source carries a [`SaHeader`] and can enumerate the reference
//! sequences it covers. Position sources hand out a fresh forward iterator per
//! chromosome on each call so the same source can feed several chromosome
//! tasks concurrently.

mod gene;
mod interim;
mod interval;
mod misc;
mod tsv;

pub use gene::GeneTsvReader;
pub use interim::InterimTsvReader;
pub use interval::IntervalTsvReader;
pub use misc::MiscTsvReader;

use crate::{AnnotatedGene, GlobalMajorAllele, InterimSaItem, Result, SaHeader, SupplementaryInterval};

/// A boxed forward iterator over the records of one source
pub type SourceIter<'a, T> = Box<dyn Iterator<Item = Result<T>> + Send + 'a>;

/// A per-position annotation source, sorted by position within each chromosome
pub trait InterimSaSource: Send + Sync {
    fn header(&self) -> &SaHeader;

    /// Reference sequence names present in the source
    fn ref_names(&self) -> Vec<String>;

    /// Items on `reference` in non-decreasing position order
    ///
    /// Returns an empty iterator for chromosomes the source does not cover.
    fn items(&self, reference: &str) -> Result<SourceIter<'_, InterimSaItem>>;
}

/// A source of range annotations
pub trait IntervalSource: Send + Sync {
    fn header(&self) -> &SaHeader;

    fn ref_names(&self) -> Vec<String>;

    fn intervals(&self, reference: &str) -> Result<Vec<SupplementaryInterval>>;
}

/// A source of reference-minor positions
pub trait RefMinorSource: Send + Sync {
    fn header(&self) -> &SaHeader;

    fn ref_names(&self) -> Vec<String>;

    /// Reference-minor positions on `reference` in increasing order
    fn global_major_alleles(&self, reference: &str) -> Result<Vec<GlobalMajorAllele>>;
}

/// A gene-level annotation source, sorted by gene symbol
pub trait GeneSource: Send + Sync {
    fn header(&self) -> &SaHeader;

    fn genes(&self) -> Result<SourceIter<'_, AnnotatedGene>>;
}
