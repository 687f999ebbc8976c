use std::{fmt, io};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::utils::{read_string, write_str};
use crate::Result;

/// Name, version, and release of one upstream annotation source
///
/// Identity is the source name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSourceVersion {
    pub name: String,
    pub version: String,
    /// Release date as seconds since the unix epoch
    pub release_date: i64,
    pub description: String,
    /// Set for miscellaneous (global-allele) sources
    pub is_misc: bool,
}
impl DataSourceVersion {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release_date: i64,
        description: impl Into<String>,
        is_misc: bool,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            release_date,
            description: description.into(),
            is_misc,
        }
    }

    pub fn write_bytes<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_str(writer, &self.name)?;
        write_str(writer, &self.version)?;
        writer.write_i64::<LittleEndian>(self.release_date)?;
        write_str(writer, &self.description)?;
        writer.write_u8(u8::from(self.is_misc))?;
        Ok(())
    }

    pub fn read_bytes<R: io::Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            name: read_string(reader)?,
            version: read_string(reader)?,
            release_date: reader.read_i64::<LittleEndian>()?,
            description: read_string(reader)?,
            is_misc: reader.read_u8()? != 0,
        })
    }
}
impl fmt::Display for DataSourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} {:<13} {:<21} {}",
            self.name,
            self.version,
            self.release_date,
            if self.is_misc { "yes" } else { "no" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_round_trip() -> Result<()> {
        let version = DataSourceVersion::new("ClinVar", "20240101", 1_704_067_200, "clinical", false);
        let mut buf = Vec::new();
        version.write_bytes(&mut buf)?;
        let decoded = DataSourceVersion::read_bytes(&mut buf.as_slice())?;
        assert_eq!(decoded, version);
        Ok(())
    }

    #[test]
    fn test_display_columns() {
        let version = DataSourceVersion::new("dbSNP", "151", 0, "", true);
        let line = version.to_string();
        assert!(line.starts_with("dbSNP"));
        assert!(line.ends_with("yes"));
    }
}
