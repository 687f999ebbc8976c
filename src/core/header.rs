use std::{
    io,
    time::{SystemTime, UNIX_EPOCH},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{
    utils::{read_string, write_str},
    DataSourceVersion, GenomeAssembly,
};
use crate::Result;

/// Header of a single opened annotation source
///
/// One per source file, read-only after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaHeader {
    pub data_source: DataSourceVersion,
    pub reference_name: String,
    pub assembly: GenomeAssembly,
    pub data_version: u16,
}
impl SaHeader {
    #[must_use]
    pub fn new(
        data_source: DataSourceVersion,
        reference_name: impl Into<String>,
        assembly: GenomeAssembly,
        data_version: u16,
    ) -> Self {
        Self {
            data_source,
            reference_name: reference_name.into(),
            assembly,
            data_version,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.data_source.name
    }
}

/// Database-level header written once at the start of every `.nsa` file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupplementaryAnnotationHeader {
    /// Chromosome (display) name the database covers
    pub reference_name: String,
    /// Creation time as seconds since the unix epoch
    pub creation_time: i64,
    pub data_version: u16,
    pub data_sources: Vec<DataSourceVersion>,
    pub assembly: GenomeAssembly,
}
impl SupplementaryAnnotationHeader {
    /// Builds a header stamped with the current time
    #[must_use]
    pub fn new(
        reference_name: impl Into<String>,
        data_version: u16,
        data_sources: Vec<DataSourceVersion>,
        assembly: GenomeAssembly,
    ) -> Self {
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64);
        Self {
            reference_name: reference_name.into(),
            creation_time,
            data_version,
            data_sources,
            assembly,
        }
    }

    pub fn write_bytes<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_str(writer, &self.reference_name)?;
        writer.write_i64::<LittleEndian>(self.creation_time)?;
        writer.write_u16::<LittleEndian>(self.data_version)?;
        writer.write_u8(self.assembly.code())?;
        writer.write_u32::<LittleEndian>(self.data_sources.len() as u32)?;
        for source in &self.data_sources {
            source.write_bytes(writer)?;
        }
        Ok(())
    }

    pub fn read_bytes<R: io::Read>(reader: &mut R) -> Result<Self> {
        let reference_name = read_string(reader)?;
        let creation_time = reader.read_i64::<LittleEndian>()?;
        let data_version = reader.read_u16::<LittleEndian>()?;
        let assembly = GenomeAssembly::from_code(reader.read_u8()?)?;
        let num_sources = reader.read_u32::<LittleEndian>()?;
        let data_sources = (0..num_sources)
            .map(|_| DataSourceVersion::read_bytes(reader))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            reference_name,
            creation_time,
            data_version,
            data_sources,
            assembly,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes() -> Result<()> {
        let header = SupplementaryAnnotationHeader::new(
            "chr1",
            3,
            vec![
                DataSourceVersion::new("gnomAD", "2.1", 1, "frequencies", false),
                DataSourceVersion::new("GlobalAllele", "1", 2, "ref minor", true),
            ],
            GenomeAssembly::GRCh37,
        );
        let mut buf = Vec::new();
        header.write_bytes(&mut buf)?;
        let decoded = SupplementaryAnnotationHeader::read_bytes(&mut buf.as_slice())?;
        assert_eq!(decoded, header);
        Ok(())
    }

    #[test]
    fn test_header_creation_time_is_set() {
        let header = SupplementaryAnnotationHeader::new("chrM", 3, Vec::new(), GenomeAssembly::RCrs);
        assert!(header.creation_time > 0);
    }
}
