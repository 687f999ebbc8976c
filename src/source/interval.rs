use std::path::Path;

use super::{
    tsv::{malformed, parse_position, split_fields, TsvFile},
    IntervalSource,
};
use crate::{ReportFor, Result, SaHeader, SupplementaryInterval};

/// Range source stored as `chrom\tbegin\tend\tcategory\tpayload` lines
pub struct IntervalTsvReader {
    tsv: TsvFile,
}
impl IntervalTsvReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            tsv: TsvFile::open(path.as_ref(), true)?,
        })
    }
}
impl IntervalSource for IntervalTsvReader {
    fn header(&self) -> &SaHeader {
        self.tsv.header()
    }

    fn ref_names(&self) -> Vec<String> {
        self.tsv.chromosome_names()
    }

    fn intervals(&self, reference: &str) -> Result<Vec<SupplementaryInterval>> {
        let Some(lines) = self.tsv.chromosome_lines(reference)? else {
            return Ok(Vec::new());
        };
        let path = self.tsv.path();
        lines
            .map(|line| -> Result<SupplementaryInterval> {
                let (line_no, line) = line?;
                let [_, begin, end, category, payload] = split_fields::<5>(path, line_no, &line)?;
                let begin = parse_position(path, line_no, begin)?;
                let end = parse_position(path, line_no, end)?;
                if end < begin {
                    return Err(malformed(path, line_no, format!("interval end {end} precedes begin {begin}")));
                }
                let category = category
                    .parse::<ReportFor>()
                    .map_err(|e| malformed(path, line_no, e))?;
                Ok(SupplementaryInterval::new(
                    begin,
                    end,
                    category,
                    self.header().name(),
                    payload.as_bytes().to_vec(),
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
    fn test_intervals() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            dir.path(),
            "clingen.tsv",
            "#name=ClinGen\n#assembly=GRCh37\n\
             chr1\t120\t160\tsv\tgain\nchr1\t500\t600\tStructuralVariants\tloss\nchr2\t1\t9\tall\tx\n",
        );
        let reader = IntervalTsvReader::from_path(path)?;
        let intervals = reader.intervals("chr1")?;
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].interval(), crate::Interval::new(120, 160));
        assert_eq!(intervals[0].source, "ClinGen");
        assert_eq!(intervals[1].payload, b"loss");
        assert_eq!(reader.intervals("chr2")?[0].category, ReportFor::AllVariants);
        assert!(reader.intervals("chrM")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_inverted_interval() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            dir.path(),
            "bad.tsv",
            "#name=x\n#assembly=GRCh37\nchr1\t200\t100\tsv\t\n",
        );
        let reader = IntervalTsvReader::from_path(path)?;
        assert!(reader.intervals("chr1").is_err());
        Ok(())
    }
}
