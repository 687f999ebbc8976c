use std::{collections::HashSet, fmt, str::FromStr};

use crate::{error::HeaderError, Result};

/// Reference genome build that every merged source must agree on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GenomeAssembly {
    #[default]
    Unknown,
    GRCh37,
    GRCh38,
    HG19,
    /// Revised Cambridge Reference Sequence (mitochondria)
    RCrs,
}
impl GenomeAssembly {
    /// Assemblies exempt from the cross-source consistency check by default
    #[must_use]
    pub fn default_exempt() -> HashSet<Self> {
        [Self::Unknown, Self::RCrs].into_iter().collect()
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::GRCh37 => 1,
            Self::GRCh38 => 2,
            Self::HG19 => 3,
            Self::RCrs => 4,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::GRCh37),
            2 => Ok(Self::GRCh38),
            3 => Ok(Self::HG19),
            4 => Ok(Self::RCrs),
            _ => Err(HeaderError::UnknownAssembly(code).into()),
        }
    }
}
impl fmt::Display for GenomeAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::GRCh37 => "GRCh37",
            Self::GRCh38 => "GRCh38",
            Self::HG19 => "hg19",
            Self::RCrs => "rCRS",
        };
        f.write_str(name)
    }
}
impl FromStr for GenomeAssembly {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" | "" => Ok(Self::Unknown),
            "grch37" => Ok(Self::GRCh37),
            "grch38" => Ok(Self::GRCh38),
            "hg19" => Ok(Self::HG19),
            "rcrs" => Ok(Self::RCrs),
            _ => Err(format!("unrecognized genome assembly: {s}")),
        }
    }
}
