//! # K-way merge
//!
//! Combines independently sorted per-source streams into one ordered stream
//! of aggregated groups. Positions key the per-chromosome merge of
//! [`InterimSaItem`](crate::InterimSaItem)s and gene symbols key the
//! whole-genome merge of [`AnnotatedGene`](crate::AnnotatedGene)s.

mod cursor;
mod engine;

pub use cursor::{MergeKey, SourceCursor};
pub use engine::KWayMerger;
