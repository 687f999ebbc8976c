use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::utils::{read_blob, read_string, write_blob, write_str};
use crate::{merge::MergeKey, Result};

/// One not-yet-merged record from one source at one position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterimSaItem {
    /// 1-based genomic coordinate
    pub position: u32,
    /// Tag of the source that produced the record
    pub source: String,
    /// Opaque source-specific annotation
    pub payload: Vec<u8>,
}
impl InterimSaItem {
    #[must_use]
    pub fn new(position: u32, source: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            position,
            source: source.into(),
            payload: payload.into(),
        }
    }
}
impl MergeKey for InterimSaItem {
    type Key = u32;

    fn merge_key(&self) -> u32 {
        self.position
    }
}

/// Every interim item sharing a single position on one chromosome
///
/// Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterimSaPosition {
    position: u32,
    items: Vec<InterimSaItem>,
}
impl InterimSaPosition {
    /// Groups items at one position, returning `None` if there are no items
    #[must_use]
    pub fn from_items(items: Vec<InterimSaItem>) -> Option<Self> {
        let position = items.first()?.position;
        debug_assert!(items.iter().all(|item| item.position == position));
        Some(Self { position, items })
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn items(&self) -> &[InterimSaItem] {
        &self.items
    }

    /// Finalizes the aggregate into the record stored in the database
    #[must_use]
    pub fn into_sa_position(self) -> SaPosition {
        SaPosition {
            global_major_allele: None,
            records: self
                .items
                .into_iter()
                .map(|item| SaDataRecord {
                    source: item.source,
                    payload: item.payload,
                })
                .collect(),
        }
    }
}

/// One source's contribution to a finalized position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaDataRecord {
    pub source: String,
    pub payload: Vec<u8>,
}
impl SaDataRecord {
    #[must_use]
    pub fn new(source: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            payload: payload.into(),
        }
    }
}

/// The finalized annotation stored for a single position
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaPosition {
    /// Set when the reference base is the population minor allele
    pub global_major_allele: Option<String>,
    pub records: Vec<SaDataRecord>,
}
impl SaPosition {
    #[must_use]
    pub fn new(records: Vec<SaDataRecord>) -> Self {
        Self {
            global_major_allele: None,
            records,
        }
    }

    /// A record that exists only because its position is reference-minor
    #[must_use]
    pub fn ref_minor(allele: impl Into<String>) -> Self {
        Self {
            global_major_allele: Some(allele.into()),
            records: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_ref_minor_only(&self) -> bool {
        self.records.is_empty() && self.global_major_allele.is_some()
    }

    pub fn write_bytes<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match &self.global_major_allele {
            Some(allele) => {
                writer.write_u8(1)?;
                write_str(writer, allele)?;
            }
            None => writer.write_u8(0)?,
        }
        writer.write_u32::<LittleEndian>(self.records.len() as u32)?;
        for record in &self.records {
            write_str(writer, &record.source)?;
            write_blob(writer, &record.payload)?;
        }
        Ok(())
    }

    pub fn read_bytes<R: io::Read>(reader: &mut R) -> Result<Self> {
        let global_major_allele = if reader.read_u8()? == 0 {
            None
        } else {
            Some(read_string(reader)?)
        };
        let num_records = reader.read_u32::<LittleEndian>()?;
        let records = (0..num_records)
            .map(|_| {
                Ok(SaDataRecord {
                    source: read_string(reader)?,
                    payload: read_blob(reader)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            global_major_allele,
            records,
        })
    }
}

/// A reference-minor position and the allele that is globally major there
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalMajorAllele {
    pub position: u32,
    pub allele: String,
}
impl GlobalMajorAllele {
    #[must_use]
    pub fn new(position: u32, allele: impl Into<String>) -> Self {
        Self {
            position,
            allele: allele.into(),
        }
    }

    pub fn write_bytes<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.position)?;
        write_str(writer, &self.allele)?;
        Ok(())
    }

    pub fn read_bytes<R: io::Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            position: reader.read_u32::<LittleEndian>()?,
            allele: read_string(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interim_position_requires_items() {
        assert!(InterimSaPosition::from_items(Vec::new()).is_none());
        let grouped = InterimSaPosition::from_items(vec![
            InterimSaItem::new(20, "A", "y"),
            InterimSaItem::new(20, "B", "z"),
        ])
        .unwrap();
        assert_eq!(grouped.position(), 20);
        assert_eq!(grouped.items().len(), 2);
    }

    #[test]
    fn test_into_sa_position_keeps_every_source() {
        let grouped = InterimSaPosition::from_items(vec![
            InterimSaItem::new(20, "A", "y"),
            InterimSaItem::new(20, "B", "z"),
        ])
        .unwrap();
        let record = grouped.into_sa_position();
        assert_eq!(
            record.records,
            vec![SaDataRecord::new("A", "y"), SaDataRecord::new("B", "z")]
        );
        assert!(record.global_major_allele.is_none());
    }

    #[test]
    fn test_sa_position_bytes() -> Result<()> {
        let mut record = SaPosition::new(vec![
            SaDataRecord::new("gnomAD", b"AF=0.01".to_vec()),
            SaDataRecord::new("ClinVar", Vec::new()),
        ]);
        record.global_major_allele = Some("T".to_string());

        let mut buf = Vec::new();
        record.write_bytes(&mut buf)?;
        assert_eq!(SaPosition::read_bytes(&mut buf.as_slice())?, record);
        Ok(())
    }

    #[test]
    fn test_ref_minor_only() {
        assert!(SaPosition::ref_minor("A").is_ref_minor_only());
        assert!(!SaPosition::new(vec![SaDataRecord::new("x", "y")]).is_ref_minor_only());
        assert!(!SaPosition::default().is_ref_minor_only());
    }
}
