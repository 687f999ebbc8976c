use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use sadb::{
    nsa::{RefMinorPolicy, DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL},
    report::LogReporter,
    source::{GeneTsvReader, InterimTsvReader, IntervalTsvReader, MiscTsvReader},
    ChromosomeDictionary, MergeConfig, RangeExtractor, SaMerger, DEFAULT_CONCURRENCY,
};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge sorted annotation sources into per-chromosome databases
    Merge(MergeArgs),
    /// Copy a position range of a database into a smaller database
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
struct MergeArgs {
    /// Chromosome dictionary of the genome assembly
    #[arg(short, long)]
    reference: PathBuf,

    /// Output directory
    #[arg(short, long)]
    out: PathBuf,

    /// Per-position source (repeatable)
    #[arg(short, long = "source")]
    sources: Vec<PathBuf>,

    /// Interval source (repeatable)
    #[arg(short, long = "interval")]
    intervals: Vec<PathBuf>,

    /// Reference-minor source
    #[arg(short, long)]
    misc: Option<PathBuf>,

    /// Gene source (repeatable)
    #[arg(short, long = "gene")]
    genes: Vec<PathBuf>,

    /// Chromosomes merged at once (0 uses every CPU)
    #[arg(short = 'T', long, default_value_t = DEFAULT_CONCURRENCY)]
    threads: usize,

    /// Uncompressed bytes per block
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// zstd compression level
    #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    level: i32,

    /// Handling of reference-minor positions that are also annotated
    #[arg(long, value_enum, default_value_t = PolicyArg::Merge)]
    ref_minor_policy: PolicyArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Merge,
    Suppress,
}
impl From<PolicyArg> for RefMinorPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Merge => Self::Merge,
            PolicyArg::Suppress => Self::Suppress,
        }
    }
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Chromosome dictionary of the genome assembly
    #[arg(short, long)]
    reference: PathBuf,

    /// Database (`.nsa`) to extract from
    #[arg(short, long)]
    database: PathBuf,

    /// First position to keep (1-based)
    #[arg(short, long)]
    begin: u32,

    /// Last position to keep (inclusive)
    #[arg(short, long)]
    end: u32,

    /// Data source name added to the output file name
    #[arg(short, long)]
    name: Option<String>,

    /// Output directory
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn merge(args: MergeArgs) -> Result<()> {
    if args.sources.is_empty() && args.intervals.is_empty() && args.misc.is_none() {
        bail!("at least one --source, --interval or --misc file is required");
    }
    std::fs::create_dir_all(&args.out)?;

    let reference = ChromosomeDictionary::from_path(&args.reference)?;
    let mut config = MergeConfig::new(&args.out);
    config.concurrency = args.threads;
    config.block_size = args.block_size;
    config.compression_level = args.level;
    config.ref_minor_policy = args.ref_minor_policy.into();

    let mut merger = SaMerger::new(reference, LogReporter, config);
    for path in &args.sources {
        merger.add_source(InterimTsvReader::from_path(path)?);
    }
    for path in &args.intervals {
        merger.add_interval_source(IntervalTsvReader::from_path(path)?);
    }
    if let Some(path) = &args.misc {
        merger.set_misc_source(MiscTsvReader::from_path(path)?);
    }
    for path in &args.genes {
        merger.add_gene_source(GeneTsvReader::from_path(path)?);
    }

    let summary = merger.run()?;
    info!(
        "built {} databases in {:.1}s",
        summary.chromosomes.len(),
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

fn extract(args: ExtractArgs) -> Result<()> {
    let reference = ChromosomeDictionary::from_path(&args.reference)?;
    let mut extractor = RangeExtractor::new(reference, &args.database, args.begin, args.end)?;
    if let Some(name) = args.name {
        extractor = extractor.data_source(name);
    }
    if let Some(out) = args.out {
        std::fs::create_dir_all(&out)?;
        extractor = extractor.output_dir(out);
    }
    extractor.extract()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Command::Merge(args) => merge(args),
        Command::Extract(args) => extract(args),
    }
}
