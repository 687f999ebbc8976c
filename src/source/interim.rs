use std::path::Path;

use super::{
    tsv::{parse_position, split_fields, TsvFile},
    InterimSaSource, SourceIter,
};
use crate::{InterimSaItem, Result, SaHeader};

/// Per-position source stored as `chrom\tposition\tpayload` lines
///
/// Lines must be grouped by chromosome and sorted by position within each
/// chromosome. Sorting is checked as the items are merged.
pub struct InterimTsvReader {
    tsv: TsvFile,
}
impl InterimTsvReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            tsv: TsvFile::open(path.as_ref(), true)?,
        })
    }
}
impl InterimSaSource for InterimTsvReader {
    fn header(&self) -> &SaHeader {
        self.tsv.header()
    }

    fn ref_names(&self) -> Vec<String> {
        self.tsv.chromosome_names()
    }

    fn items(&self, reference: &str) -> Result<SourceIter<'_, InterimSaItem>> {
        let Some(lines) = self.tsv.chromosome_lines(reference)? else {
            return Ok(Box::new(std::iter::empty()));
        };
        let path = self.tsv.path();
        let source = self.header().name();
        Ok(Box::new(lines.map(move |line| -> Result<InterimSaItem> {
            let (line_no, line) = line?;
            let [_, position, payload] = split_fields::<3>(path, line_no, &line)?;
            Ok(InterimSaItem::new(
                parse_position(path, line_no, position)?,
                source,
                payload.as_bytes(),
            ))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tsv::testing::write_file;

    const CONTENTS: &str = "#name=gnomAD\n#version=2.1\n#assembly=GRCh37\n\
                            1\t10\tAF=0.1\n1\t20\tAF=0.2\n2\t7\tAF=0.3\n";

    #[test]
    fn test_items_per_chromosome() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let reader = InterimTsvReader::from_path(write_file(dir.path(), "gnomad.tsv", CONTENTS))?;
        assert_eq!(reader.ref_names(), vec!["1", "2"]);

        let items = reader.items("1")?.collect::<Result<Vec<_>>>()?;
        assert_eq!(
            items,
            vec![
                InterimSaItem::new(10, "gnomAD", "AF=0.1"),
                InterimSaItem::new(20, "gnomAD", "AF=0.2"),
            ]
        );
        assert_eq!(reader.items("2")?.count(), 1);
        assert_eq!(reader.items("X")?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_items_is_repeatable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let reader = InterimTsvReader::from_path(write_file(dir.path(), "gnomad.tsv", CONTENTS))?;
        let mut first = reader.items("1")?;
        let mut second = reader.items("1")?;
        assert_eq!(first.next().transpose()?, second.next().transpose()?);
        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
        Ok(())
    }

    #[test]
    fn test_malformed_position() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_file(
            dir.path(),
            "bad.tsv",
            "#name=x\n#assembly=GRCh37\n1\tten\tpayload\n",
        );
        let reader = InterimTsvReader::from_path(path)?;
        let err = reader.items("1")?.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("bad.tsv:3"));
        Ok(())
    }
}
