use std::path::Path;

use super::{
    tsv::{parse_position, split_fields, TsvFile},
    RefMinorSource,
};
use crate::{GlobalMajorAllele, Result, SaHeader};

/// Reference-minor source stored as `chrom\tposition\tglobalMajorAllele` lines
pub struct MiscTsvReader {
    tsv: TsvFile,
}
impl MiscTsvReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            tsv: TsvFile::open(path.as_ref(), true)?,
        })
    }
}
impl RefMinorSource for MiscTsvReader {
    fn header(&self) -> &SaHeader {
        self.tsv.header()
    }

    fn ref_names(&self) -> Vec<String> {
        self.tsv.chromosome_names()
    }

    fn global_major_alleles(&self, reference: &str) -> Result<Vec<GlobalMajorAllele>> {
        let Some(lines) = self.tsv.chromosome_lines(reference)? else {
            return Ok(Vec::new());
        };
        let path = self.tsv.path();
        lines
            .map(|line| -> Result<GlobalMajorAllele> {
                let (line_no, line) = line?;
                let [_, position, allele] = split_fields::<3>(path, line_no, &line)?;
                Ok(GlobalMajorAllele::new(
                    parse_position(path, line_no, position)?,
                    allele.trim(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tsv::testing::write_file;

    #[test]
    fn test_global_major_alleles() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            dir.path(),
            "misc.tsv",
            "#name=GlobalAlleles\n#isMisc=true\n#assembly=GRCh37\nchr1\t7\tT\nchr1\t90\tG\n",
        );
        let reader = MiscTsvReader::from_path(path)?;
        assert!(reader.header().data_source.is_misc);
        assert_eq!(
            reader.global_major_alleles("chr1")?,
            vec![GlobalMajorAllele::new(7, "T"), GlobalMajorAllele::new(90, "G")]
        );
        assert!(reader.global_major_alleles("chr2")?.is_empty());
        Ok(())
    }
}
