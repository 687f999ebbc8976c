use std::path::Path;

use super::{
    tsv::{split_fields, TsvFile},
    GeneSource, SourceIter,
};
use crate::{AnnotatedGene, Result, SaHeader};

/// Gene source stored as `gene\tpayload` lines sorted by gene symbol
pub struct GeneTsvReader {
    tsv: TsvFile,
}
impl GeneTsvReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            tsv: TsvFile::open(path.as_ref(), false)?,
        })
    }
}
impl GeneSource for GeneTsvReader {
    fn header(&self) -> &SaHeader {
        self.tsv.header()
    }

    fn genes(&self) -> Result<SourceIter<'_, AnnotatedGene>> {
        let lines = self.tsv.body_lines()?;
        let path = self.tsv.path();
        let source = self.header().name();
        Ok(Box::new(lines.map(move |line| -> Result<AnnotatedGene> {
            let (line_no, line) = line?;
            let [symbol, payload] = split_fields::<2>(path, line_no, &line)?;
            Ok(AnnotatedGene::new(symbol, source, payload.as_bytes()))
        })))
    }
}
