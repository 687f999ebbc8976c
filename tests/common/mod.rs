#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use sadb::{
    nsa::{index_path, SaWriterBuilder, DATA_VERSION},
    ChromosomeDictionary, DataSourceVersion, GenomeAssembly, GlobalMajorAllele, ReportFor, Result,
    SaDataRecord, SaPosition, SupplementaryAnnotationHeader, SupplementaryInterval,
};

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// An interim source file with the given body lines
pub fn interim_tsv(dir: &Path, name: &str, assembly: &str, body: &[(&str, u32, &str)]) -> PathBuf {
    let mut contents = format!("#name={name}\n#version=1\n#releaseDate=0\n#assembly={assembly}\n");
    for (chrom, position, payload) in body {
        contents.push_str(&format!("{chrom}\t{position}\t{payload}\n"));
    }
    write_file(dir, &format!("{name}.tsv"), &contents)
}

pub fn dictionary() -> ChromosomeDictionary {
    let mut dictionary = ChromosomeDictionary::new(GenomeAssembly::GRCh37);
    dictionary.insert("chr1", ["1"]);
    dictionary.insert("chr2", ["2"]);
    dictionary.insert("chrM", ["MT"]);
    dictionary
}

pub fn record(source: &str, payload: &str) -> SaPosition {
    SaPosition::new(vec![SaDataRecord::new(source, payload.as_bytes())])
}

pub fn header(reference: &str) -> SupplementaryAnnotationHeader {
    SupplementaryAnnotationHeader::new(
        reference,
        DATA_VERSION,
        vec![DataSourceVersion::new("dbSNP", "151", 0, "", false)],
        GenomeAssembly::GRCh37,
    )
}

pub fn sv(begin: u32, end: u32) -> SupplementaryInterval {
    SupplementaryInterval::new(begin, end, ReportFor::StructuralVariants, "ClinGen", b"cnv".to_vec())
}

/// Writes a database pair at `path` holding `positions`
pub fn build_database(
    path: &Path,
    positions: &[u32],
    intervals: Vec<SupplementaryInterval>,
    global_major_alleles: Vec<GlobalMajorAllele>,
    block_size: usize,
) -> Result<()> {
    let primary = fs::File::create(path)?;
    let index = fs::File::create(index_path(path))?;
    let mut writer = SaWriterBuilder::default()
        .block_size(block_size)
        .intervals(intervals)
        .global_major_alleles(global_major_alleles)
        .build(primary, index, &header("chr1"))?;
    for &position in positions {
        writer.write(&record("dbSNP", &format!("rs{position}")), position)?;
    }
    writer.finish()
}
