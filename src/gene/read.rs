use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt};
use zstd::stream::copy_decode;

use crate::{
    error::{IoContext, ReadError},
    nsa::{FilePreamble, GENE_FILE_MAGIC},
    AnnotatedGene, Result, SupplementaryAnnotationHeader,
};

/// Fully decoded gene database
pub struct GeneDatabaseReader {
    header: SupplementaryAnnotationHeader,
    genes: Vec<AnnotatedGene>,
}
impl GeneDatabaseReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_path("open", path)?;
        Self::new(BufReader::new(file))
    }

    pub fn new<R: Read>(mut reader: R) -> Result<Self> {
        let mut preamble = [0u8; size_of::<FilePreamble>()];
        reader.read_exact(&mut preamble)?;
        FilePreamble::from_bytes(&preamble, GENE_FILE_MAGIC)?;
        let header = SupplementaryAnnotationHeader::read_bytes(&mut reader)?;

        let num_genes = reader.read_u32::<LittleEndian>()?;
        let u_bytes = reader.read_u64::<LittleEndian>()?;
        let z_bytes = reader.read_u64::<LittleEndian>()?;

        let mut zbuf = Vec::new();
        reader.take(z_bytes).read_to_end(&mut zbuf)?;
        if zbuf.len() as u64 != z_bytes {
            return Err(ReadError::FileTruncation(zbuf.len()).into());
        }
        let mut ubuf = Vec::new();
        copy_decode(zbuf.as_slice(), &mut ubuf)?;
        if ubuf.len() as u64 != u_bytes {
            return Err(ReadError::CorruptBlock {
                offset: 0,
                expected: u_bytes,
                found: ubuf.len() as u64,
            }
            .into());
        }

        let mut cursor = ubuf.as_slice();
        let genes = (0..num_genes)
            .map(|_| AnnotatedGene::read_bytes(&mut cursor))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { header, genes })
    }

    #[must_use]
    pub fn header(&self) -> &SupplementaryAnnotationHeader {
        &self.header
    }

    #[must_use]
    pub fn genes(&self) -> &[AnnotatedGene] {
        &self.genes
    }

    /// Looks up a gene by symbol
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<&AnnotatedGene> {
        self.genes
            .binary_search_by(|gene| gene.symbol.as_str().cmp(symbol))
            .ok()
            .map(|idx| &self.genes[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gene::GeneDatabaseWriter, nsa::DATA_VERSION, GenomeAssembly};

    fn header() -> SupplementaryAnnotationHeader {
        SupplementaryAnnotationHeader::new("", DATA_VERSION, Vec::new(), GenomeAssembly::GRCh38)
    }

    #[test]
    fn test_gene_database() -> Result<()> {
        let mut buf = Vec::new();
        {
            let mut writer = GeneDatabaseWriter::new(&mut buf, header())?;
            writer.write(&AnnotatedGene::new("BRCA1", "OMIM", "113705"))?;
            writer.write(&AnnotatedGene::new("TP53", "OMIM", "191170"))?;
            assert!(writer.write(&AnnotatedGene::new("EGFR", "OMIM", "131550")).is_err());
            assert_eq!(writer.num_genes(), 2);
            writer.finish()?;
        }
        let reader = GeneDatabaseReader::new(buf.as_slice())?;
        assert_eq!(reader.genes().len(), 2);
        assert_eq!(reader.get("TP53").unwrap().annotations[0].source, "OMIM");
        assert!(reader.get("EGFR").is_none());
        assert_eq!(reader.header().assembly, GenomeAssembly::GRCh38);
        Ok(())
    }

    #[test]
    fn test_empty_gene_database() -> Result<()> {
        let mut buf = Vec::new();
        GeneDatabaseWriter::new(&mut buf, header())?.finish()?;
        let reader = GeneDatabaseReader::new(buf.as_slice())?;
        assert!(reader.genes().is_empty());
        Ok(())
    }

    #[test]
    fn test_position_database_is_not_a_gene_database() {
        let preamble = FilePreamble::new(*crate::nsa::FILE_MAGIC);
        assert!(GeneDatabaseReader::new(preamble.as_bytes()).is_err());
    }
}
