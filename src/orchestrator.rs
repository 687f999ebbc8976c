//! Whole-genome database builds
//!
//! [`SaMerger`] validates the sources once, merges the gene annotations, then
//! builds one position database per chromosome on a bounded pool of worker
//! threads.

use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    fs,
    io::BufWriter,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{
    error::{IoContext, MergeError},
    gene::GeneDatabaseWriter,
    merge::{KWayMerger, SourceCursor},
    nsa::{
        PendingDatabase, RefMinorPolicy, SaWriterBuilder, DATABASE_EXTENSION, DATA_VERSION,
        DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL, GENE_DATABASE_FILE_NAME,
    },
    report::{ChromosomeStats, MergeReporter},
    source::{GeneSource, InterimSaSource, IntervalSource, RefMinorSource},
    AnnotatedGene, DataSourceVersion, Error, GenomeAssembly, InterimSaPosition, ReferenceLookup,
    Result, SaHeader, SupplementaryAnnotationHeader,
};

/// Default number of chromosomes merged at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Settings of a database build
#[derive(Clone, Debug)]
pub struct MergeConfig {
    /// Maximum number of chromosomes merged at once (0 uses every CPU)
    pub concurrency: usize,
    pub block_size: usize,
    pub compression_level: i32,
    /// Assemblies that never conflict with another source's assembly
    pub exempt_assemblies: HashSet<GenomeAssembly>,
    pub ref_minor_policy: RefMinorPolicy,
    pub output_dir: PathBuf,
}
impl MergeConfig {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            block_size: DEFAULT_BLOCK_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            exempt_assemblies: GenomeAssembly::default_exempt(),
            ref_minor_policy: RefMinorPolicy::default(),
            output_dir: output_dir.into(),
        }
    }

    /// Number of worker threads
    ///
    /// An explicit concurrency is used as given; 0 uses every CPU.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        if self.concurrency == 0 {
            num_cpus::get()
        } else {
            self.concurrency
        }
    }
}

/// Outcome of a full build
#[derive(Clone, Debug, Default)]
pub struct MergeSummary {
    /// Per-chromosome statistics in chromosome name order
    pub chromosomes: Vec<ChromosomeStats>,
    /// Number of genes in the gene database, if one was written
    pub num_genes: Option<usize>,
    pub elapsed: Duration,
}

/// One chromosome and every source name that refers to it
#[derive(Clone, Debug)]
struct ChromosomeTask {
    display_name: String,
    aliases: Vec<String>,
}

/// Builds the annotation databases of a set of sources
pub struct SaMerger<L: ReferenceLookup, R: MergeReporter> {
    reference: L,
    reporter: R,
    config: MergeConfig,
    sources: Vec<Box<dyn InterimSaSource>>,
    interval_sources: Vec<Box<dyn IntervalSource>>,
    misc_source: Option<Box<dyn RefMinorSource>>,
    gene_sources: Vec<Box<dyn GeneSource>>,
}
impl<L: ReferenceLookup, R: MergeReporter> SaMerger<L, R> {
    #[must_use]
    pub fn new(reference: L, reporter: R, config: MergeConfig) -> Self {
        Self {
            reference,
            reporter,
            config,
            sources: Vec::new(),
            interval_sources: Vec::new(),
            misc_source: None,
            gene_sources: Vec::new(),
        }
    }

    pub fn add_source(&mut self, source: impl InterimSaSource + 'static) {
        self.sources.push(Box::new(source));
    }

    pub fn add_interval_source(&mut self, source: impl IntervalSource + 'static) {
        self.interval_sources.push(Box::new(source));
    }

    pub fn set_misc_source(&mut self, source: impl RefMinorSource + 'static) {
        self.misc_source = Some(Box::new(source));
    }

    pub fn add_gene_source(&mut self, source: impl GeneSource + 'static) {
        self.gene_sources.push(Box::new(source));
    }

    /// Headers of every position, interval and reference-minor source
    fn position_headers(&self) -> Vec<&SaHeader> {
        self.sources
            .iter()
            .map(|source| source.header())
            .chain(self.interval_sources.iter().map(|source| source.header()))
            .chain(self.misc_source.iter().map(|source| source.header()))
            .collect()
    }

    /// Groups the union of source chromosome names by display name
    fn chromosome_tasks(&self) -> Result<Vec<ChromosomeTask>> {
        let names = self
            .sources
            .iter()
            .flat_map(|source| source.ref_names())
            .chain(self.interval_sources.iter().flat_map(|source| source.ref_names()))
            .chain(self.misc_source.iter().flat_map(|source| source.ref_names()))
            .collect::<HashSet<_>>();

        let mut tasks: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in names {
            let display = self
                .reference
                .display_name(&name)
                .ok_or_else(|| MergeError::UnknownReference(name.clone()))?;
            tasks.entry(display.to_string()).or_default().push(name);
        }
        Ok(tasks
            .into_iter()
            .map(|(display_name, mut aliases)| {
                aliases.sort();
                ChromosomeTask {
                    display_name,
                    aliases,
                }
            })
            .collect())
    }

    /// Runs the full build
    ///
    /// Sources must agree on one assembly, but every header is written with
    /// the reference's assembly. Fatal configuration problems are reported
    /// before any output is written. A failing chromosome does not stop the others; the first
    /// failure is returned once every worker has finished.
    pub fn run(&self) -> Result<MergeSummary> {
        let start = Instant::now();

        let headers = self.position_headers();
        check_assembly_consistency(&headers, &self.config.exempt_assemblies)?;
        // the reference decides the assembly written into every header
        let assembly = self.reference.assembly();
        let tasks = self.chromosome_tasks()?;

        let mut data_sources = headers
            .iter()
            .map(|header| header.data_source.clone())
            .collect::<Vec<_>>();
        let mut listed = data_sources.clone();
        listed.extend(self.gene_sources.iter().map(|source| source.header().data_source.clone()));
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        self.reporter.data_sources(&listed);
        let mut seen = HashSet::new();
        data_sources.retain(|source| seen.insert(source.name.clone()));

        let num_genes = if self.gene_sources.is_empty() {
            None
        } else {
            Some(self.merge_genes(assembly)?)
        };

        let chromosomes = self.merge_chromosomes(tasks, &data_sources, assembly)?;
        Ok(MergeSummary {
            chromosomes,
            num_genes,
            elapsed: start.elapsed(),
        })
    }

    fn merge_chromosomes(
        &self,
        tasks: Vec<ChromosomeTask>,
        data_sources: &[DataSourceVersion],
        assembly: GenomeAssembly,
    ) -> Result<Vec<ChromosomeStats>> {
        let num_threads = self.config.num_threads().min(tasks.len());
        let queue = Mutex::new(tasks.into_iter().collect::<VecDeque<_>>());
        let completed = Mutex::new(Vec::new());
        let first_error: Mutex<Option<Error>> = Mutex::new(None);

        thread::scope(|scope| {
            let (queue, completed, first_error) = (&queue, &completed, &first_error);
            let mut handles = Vec::with_capacity(num_threads);
            for _ in 0..num_threads {
                handles.push(scope.spawn(move || loop {
                    let Some(task) = queue.lock().pop_front() else {
                        break;
                    };
                    match self.merge_chromosome(&task, data_sources, assembly) {
                        Ok(stats) => {
                            self.reporter.chromosome_merged(&stats);
                            completed.lock().push(stats);
                        }
                        Err(e) => {
                            log::error!("failed to merge {}: {e}", task.display_name);
                            first_error.lock().get_or_insert(
                                MergeError::ChromosomeFailed {
                                    reference: task.display_name,
                                    source: Box::new(e),
                                }
                                .into(),
                            );
                        }
                    }
                }));
            }
            for handle in handles {
                if handle.join().is_err() {
                    first_error.lock().get_or_insert(MergeError::WorkerPanicked.into());
                }
            }
        });

        if let Some(e) = first_error.into_inner() {
            return Err(e);
        }
        let mut completed = completed.into_inner();
        completed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(completed)
    }

    /// Merges one chromosome and promotes its database pair
    fn merge_chromosome(
        &self,
        task: &ChromosomeTask,
        data_sources: &[DataSourceVersion],
        assembly: GenomeAssembly,
    ) -> Result<ChromosomeStats> {
        let start = Instant::now();

        let mut cursors = Vec::new();
        for source in &self.sources {
            for alias in &task.aliases {
                if let Some(cursor) =
                    SourceCursor::new(source.header().name(), alias.as_str(), source.items(alias)?)?
                {
                    cursors.push(cursor);
                }
            }
        }

        let mut intervals = Vec::new();
        for source in &self.interval_sources {
            for alias in &task.aliases {
                intervals.extend(source.intervals(alias)?);
            }
        }
        intervals.sort_by_key(|interval| (interval.begin, interval.end));
        let num_intervals = intervals.len();

        let mut global_major_alleles = Vec::new();
        if let Some(source) = &self.misc_source {
            for alias in &task.aliases {
                global_major_alleles.extend(source.global_major_alleles(alias)?);
            }
        }

        let header = SupplementaryAnnotationHeader::new(
            task.display_name.as_str(),
            DATA_VERSION,
            data_sources.to_vec(),
            assembly,
        );
        let path = self
            .config
            .output_dir
            .join(format!("{}.{DATABASE_EXTENSION}", task.display_name));
        let pending = PendingDatabase::new(path);
        let (primary, index) = pending.create()?;

        let (annotations, ref_minors) = {
            let mut writer = SaWriterBuilder::default()
                .block_size(self.config.block_size)
                .compression_level(self.config.compression_level)
                .ref_minor_policy(self.config.ref_minor_policy)
                .intervals(intervals)
                .global_major_alleles(global_major_alleles)
                .build(primary, index, &header)?;

            for group in KWayMerger::new(cursors) {
                let (position, items) = group?;
                if let Some(merged) = InterimSaPosition::from_items(items) {
                    writer.write(&merged.into_sa_position(), position)?;
                }
            }
            writer.finish()?;
            (
                writer.positions_written() - writer.ref_minor_count(),
                writer.ref_minor_count(),
            )
        };
        pending.commit()?;

        Ok(ChromosomeStats {
            name: task.display_name.clone(),
            annotations,
            intervals: num_intervals,
            ref_minors,
            elapsed: start.elapsed(),
        })
    }

    /// Writes the whole-genome gene database and returns its gene count
    fn merge_genes(&self, assembly: GenomeAssembly) -> Result<usize> {
        let start = Instant::now();
        let path = self.config.output_dir.join(GENE_DATABASE_FILE_NAME);
        let tmp_path = path.with_extension("nga.tmp");

        let result = self.write_gene_database(&tmp_path, assembly);
        let num_genes = match result {
            Ok(num_genes) => num_genes,
            Err(e) => {
                if tmp_path.exists() {
                    if let Err(remove_err) = fs::remove_file(&tmp_path) {
                        log::warn!("unable to remove partial output {}: {remove_err}", tmp_path.display());
                    }
                }
                return Err(e);
            }
        };
        fs::rename(&tmp_path, &path).with_path("rename", &tmp_path)?;
        self.reporter.genes_merged(num_genes, start.elapsed());
        Ok(num_genes)
    }

    fn write_gene_database(&self, path: &Path, assembly: GenomeAssembly) -> Result<usize> {
        let header = SupplementaryAnnotationHeader::new(
            "",
            DATA_VERSION,
            self.gene_sources
                .iter()
                .map(|source| source.header().data_source.clone())
                .collect(),
            assembly,
        );

        let mut cursors = Vec::new();
        for source in &self.gene_sources {
            if let Some(cursor) = SourceCursor::new(source.header().name(), "genes", source.genes()?)? {
                cursors.push(cursor);
            }
        }

        let file = fs::File::create(path).with_path("create", path)?;
        let mut writer = GeneDatabaseWriter::new(BufWriter::new(file), header)?;
        for group in KWayMerger::new(cursors) {
            let (_, genes) = group?;
            if let Some(gene) = AnnotatedGene::merge(genes) {
                writer.write(&gene)?;
            }
        }
        writer.finish()?;
        Ok(writer.num_genes())
    }
}

/// Checks that all non-exempt sources agree on one genome assembly
///
/// Returns the shared assembly, or the first exempt one when every source is
/// exempt (`Unknown` without sources).
pub fn check_assembly_consistency(
    headers: &[&SaHeader],
    exempt: &HashSet<GenomeAssembly>,
) -> Result<GenomeAssembly> {
    let mut shared: Option<&SaHeader> = None;
    for &header in headers {
        if exempt.contains(&header.assembly) {
            continue;
        }
        match shared {
            None => shared = Some(header),
            Some(first) if first.assembly != header.assembly => {
                return Err(MergeError::AssemblyMismatch {
                    first_source: first.name().to_string(),
                    first: first.assembly.to_string(),
                    other_source: header.name().to_string(),
                    other: header.assembly.to_string(),
                }
                .into());
            }
            Some(_) => {}
        }
    }
    Ok(shared
        .or(headers.first().copied())
        .map_or(GenomeAssembly::Unknown, |header| header.assembly))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, assembly: GenomeAssembly) -> SaHeader {
        SaHeader::new(
            DataSourceVersion::new(name, "1", 0, "", false),
            "",
            assembly,
            DATA_VERSION,
        )
    }

    #[test]
    fn test_assembly_consistency() -> Result<()> {
        let exempt = GenomeAssembly::default_exempt();
        let a = header("a", GenomeAssembly::GRCh37);
        let b = header("b", GenomeAssembly::GRCh37);
        let mito = header("mito", GenomeAssembly::RCrs);
        let unknown = header("misc", GenomeAssembly::Unknown);
        assert_eq!(
            check_assembly_consistency(&[&unknown, &a, &mito, &b], &exempt)?,
            GenomeAssembly::GRCh37
        );
        assert_eq!(check_assembly_consistency(&[&mito], &exempt)?, GenomeAssembly::RCrs);
        assert_eq!(check_assembly_consistency(&[], &exempt)?, GenomeAssembly::Unknown);
        Ok(())
    }

    #[test]
    fn test_assembly_mismatch() {
        let exempt = GenomeAssembly::default_exempt();
        let a = header("gnomAD", GenomeAssembly::GRCh37);
        let b = header("ClinVar", GenomeAssembly::GRCh38);
        let err = check_assembly_consistency(&[&a, &b], &exempt).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("gnomAD"));
        assert!(message.contains("ClinVar"));

        // an empty exempt set turns rCRS into a conflict
        let mito = header("mito", GenomeAssembly::RCrs);
        assert!(check_assembly_consistency(&[&a, &mito], &HashSet::new()).is_err());
    }

    #[test]
    fn test_num_threads() {
        let mut config = MergeConfig::new("/tmp");
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        config.concurrency = 0;
        assert_eq!(config.num_threads(), num_cpus::get());
        config.concurrency = 1;
        assert_eq!(config.num_threads(), 1);
        // explicit limits are not capped by the CPU count
        config.concurrency = num_cpus::get() + 8;
        assert_eq!(config.num_threads(), num_cpus::get() + 8);
    }
}
