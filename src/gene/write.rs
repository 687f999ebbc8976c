use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use zstd::stream::copy_encode;

use crate::{
    error::{HeaderError, MergeError, WriteError},
    nsa::{FilePreamble, DATA_VERSION, DEFAULT_COMPRESSION_LEVEL, GENE_FILE_MAGIC},
    AnnotatedGene, Result, SupplementaryAnnotationHeader,
};

/// Writes the merged gene annotations
///
/// Genes are buffered and compressed as a single frame on
/// [`finish`](GeneDatabaseWriter::finish), which is also attempted on drop.
pub struct GeneDatabaseWriter<W: Write> {
    inner: W,
    header: SupplementaryAnnotationHeader,
    level: i32,
    ubuf: Vec<u8>,
    last_symbol: Option<String>,
    num_genes: u32,
    finished: bool,
}
impl<W: Write> GeneDatabaseWriter<W> {
    pub fn new(inner: W, header: SupplementaryAnnotationHeader) -> Result<Self> {
        if header.data_version != DATA_VERSION {
            return Err(HeaderError::DataVersionMismatch {
                expected: DATA_VERSION,
                found: header.data_version,
            }
            .into());
        }
        Ok(Self {
            inner,
            header,
            level: DEFAULT_COMPRESSION_LEVEL,
            ubuf: Vec::new(),
            last_symbol: None,
            num_genes: 0,
            finished: false,
        })
    }

    /// Appends a gene; symbols must be strictly increasing
    pub fn write(&mut self, gene: &AnnotatedGene) -> Result<()> {
        if self.finished {
            return Err(WriteError::AlreadyFinished.into());
        }
        if let Some(previous) = &self.last_symbol {
            if gene.symbol <= *previous {
                return Err(MergeError::UnsortedSource {
                    source_name: "gene database".to_string(),
                    reference: String::new(),
                    previous: previous.clone(),
                    found: gene.symbol.clone(),
                }
                .into());
            }
        }
        gene.write_bytes(&mut self.ubuf)?;
        self.last_symbol = Some(gene.symbol.clone());
        self.num_genes += 1;
        Ok(())
    }

    #[must_use]
    pub fn num_genes(&self) -> usize {
        self.num_genes as usize
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let mut zbuf = Vec::new();
        copy_encode(self.ubuf.as_slice(), &mut zbuf, self.level)?;

        let mut buf = FilePreamble::new(*GENE_FILE_MAGIC).as_bytes().to_vec();
        self.header.write_bytes(&mut buf)?;
        buf.write_u32::<LittleEndian>(self.num_genes)?;
        buf.write_u64::<LittleEndian>(self.ubuf.len() as u64)?;
        buf.write_u64::<LittleEndian>(zbuf.len() as u64)?;
        self.inner.write_all(&buf)?;
        self.inner.write_all(&zbuf)?;
        self.inner.flush()?;
        self.finished = true;
        Ok(())
    }
}
impl<W: Write> Drop for GeneDatabaseWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("failed to finish gene database: {e}");
        }
    }
}
