//! Progress reporting for database builds

use std::{fmt, time::Duration};

use auto_impl::auto_impl;

use crate::DataSourceVersion;

/// Per-chromosome outcome of a merge
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChromosomeStats {
    /// Display name of the chromosome
    pub name: String,
    /// Positions written with at least one source record
    pub annotations: usize,
    pub intervals: usize,
    /// Positions written only because they are reference-minor
    pub ref_minors: usize,
    pub elapsed: Duration,
}
impl ChromosomeStats {
    /// Column titles matching the [`Display`](fmt::Display) layout
    pub const TITLE: &'static str = "Name         Annotations   Intervals   RefMinors       Time";
}
impl fmt::Display for ChromosomeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs();
        write!(
            f,
            "{:<12} {:>11} {:>11} {:>11} {:>4}:{:02}:{:02}.{:01}",
            self.name,
            self.annotations,
            self.intervals,
            self.ref_minors,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            self.elapsed.subsec_millis() / 100,
        )
    }
}

/// Receives progress from a database build
///
/// Called from worker threads; implementations must be thread safe.
#[auto_impl(&, Box, Arc)]
pub trait MergeReporter: Send + Sync {
    /// Called once before any output is written
    fn data_sources(&self, _sources: &[DataSourceVersion]) {}

    fn genes_merged(&self, _num_genes: usize, _elapsed: Duration) {}

    /// Called once per completed chromosome
    fn chromosome_merged(&self, stats: &ChromosomeStats);
}

/// Reports through the `log` facade
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;
impl MergeReporter for LogReporter {
    fn data_sources(&self, sources: &[DataSourceVersion]) {
        log::info!("Data sources:");
        log::info!("{:<24} {:<13} {:<21} Misc", "Name", "Version", "Release Date");
        for source in sources {
            log::info!("{source}");
        }
        log::info!("{}", ChromosomeStats::TITLE);
    }

    fn genes_merged(&self, num_genes: usize, elapsed: Duration) {
        log::info!("merged {num_genes} genes in {:.1}s", elapsed.as_secs_f64());
    }

    fn chromosome_merged(&self, stats: &ChromosomeStats) {
        log::info!("{stats}");
    }
}
