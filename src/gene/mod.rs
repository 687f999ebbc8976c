//! # Gene database
//!
//! Gene-level annotations merged across sources and keyed by gene symbol.
//! Unlike the per-chromosome position databases there is a single gene
//! database per build.
//!
//! ```text
//! [FilePreamble][Database Header][count: u32][u_bytes: u64][z_bytes: u64][compressed genes]
//! ```
//!
//! Genes are stored in increasing symbol order as one zstd frame.

mod read;
mod write;

pub use read::GeneDatabaseReader;
pub use write::GeneDatabaseWriter;
