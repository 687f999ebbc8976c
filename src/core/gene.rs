use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::utils::{read_blob, read_string, write_blob, write_str};
use crate::{merge::MergeKey, Result};

/// One source's annotation of a gene
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneAnnotation {
    pub source: String,
    pub payload: Vec<u8>,
}

/// Gene-level annotations keyed by gene symbol
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotatedGene {
    pub symbol: String,
    pub annotations: Vec<GeneAnnotation>,
}
impl AnnotatedGene {
    #[must_use]
    pub fn new(symbol: impl Into<String>, source: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            symbol: symbol.into(),
            annotations: vec![GeneAnnotation {
                source: source.into(),
                payload: payload.into(),
            }],
        }
    }

    /// Combines annotations of the same gene from different sources
    ///
    /// Returns `None` when given nothing to merge.
    #[must_use]
    pub fn merge(genes: Vec<AnnotatedGene>) -> Option<Self> {
        let mut genes = genes.into_iter();
        let mut merged = genes.next()?;
        for gene in genes {
            debug_assert_eq!(gene.symbol, merged.symbol);
            merged.annotations.extend(gene.annotations);
        }
        Some(merged)
    }

    pub fn write_bytes<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_str(writer, &self.symbol)?;
        writer.write_u32::<LittleEndian>(self.annotations.len() as u32)?;
        for annotation in &self.annotations {
            write_str(writer, &annotation.source)?;
            write_blob(writer, &annotation.payload)?;
        }
        Ok(())
    }

    pub fn read_bytes<R: io::Read>(reader: &mut R) -> Result<Self> {
        let symbol = read_string(reader)?;
        let num_annotations = reader.read_u32::<LittleEndian>()?;
        let annotations = (0..num_annotations)
            .map(|_| {
                Ok(GeneAnnotation {
                    source: read_string(reader)?,
                    payload: read_blob(reader)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            symbol,
            annotations,
        })
    }
}
impl MergeKey for AnnotatedGene {
    type Key = String;

    fn merge_key(&self) -> String {
        self.symbol.clone()
    }
}
