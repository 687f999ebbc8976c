use std::{fmt, io, str::FromStr};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::utils::{read_blob, read_string, write_blob, write_str};
use crate::{error::HeaderError, Result};

/// The variant class an interval annotation is reported for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportFor {
    SmallVariants,
    StructuralVariants,
    AllVariants,
}
impl ReportFor {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::SmallVariants => 0,
            Self::StructuralVariants => 1,
            Self::AllVariants => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::SmallVariants),
            1 => Ok(Self::StructuralVariants),
            2 => Ok(Self::AllVariants),
            _ => Err(HeaderError::UnknownCategory(code).into()),
        }
    }
}
impl fmt::Display for ReportFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SmallVariants => "small variants",
            Self::StructuralVariants => "SVs",
            Self::AllVariants => "all variants",
        })
    }
}
impl FromStr for ReportFor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SmallVariants" | "small" => Ok(Self::SmallVariants),
            "StructuralVariants" | "sv" => Ok(Self::StructuralVariants),
            "AllVariants" | "all" => Ok(Self::AllVariants),
            _ => Err(format!("unrecognized interval category: {s}")),
        }
    }
}

/// A closed genomic range `[begin, end]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub begin: u32,
    pub end: u32,
}
impl Interval {
    #[must_use]
    pub fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }

    /// Closed-interval overlap: boundaries touching counts as overlapping
    #[must_use]
    pub fn overlaps(&self, begin: u32, end: u32) -> bool {
        self.begin <= end && self.end >= begin
    }

    #[must_use]
    pub fn contains(&self, position: u32) -> bool {
        self.begin <= position && position <= self.end
    }
}

/// An annotation that applies to a range of positions rather than a single one
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupplementaryInterval {
    pub begin: u32,
    pub end: u32,
    pub category: ReportFor,
    pub source: String,
    pub payload: Vec<u8>,
}
impl SupplementaryInterval {
    #[must_use]
    pub fn new(
        begin: u32,
        end: u32,
        category: ReportFor,
        source: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            begin,
            end,
            category,
            source: source.into(),
            payload,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Interval {
        Interval::new(self.begin, self.end)
    }

    pub fn write_bytes<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.begin)?;
        writer.write_u32::<LittleEndian>(self.end)?;
        writer.write_u8(self.category.code())?;
        write_str(writer, &self.source)?;
        write_blob(writer, &self.payload)?;
        Ok(())
    }

    pub fn read_bytes<R: io::Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            begin: reader.read_u32::<LittleEndian>()?,
            end: reader.read_u32::<LittleEndian>()?,
            category: ReportFor::from_code(reader.read_u8()?)?,
            source: read_string(reader)?,
            payload: read_blob(reader)?,
        })
    }
}
