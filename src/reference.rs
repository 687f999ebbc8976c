//! Resolution of the chromosome names used by sources to display names

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use auto_impl::auto_impl;

use crate::{
    error::{IoContext, SourceError},
    GenomeAssembly, Result,
};

/// Maps any known name of a reference sequence to its display name
#[auto_impl(&, Box, Arc)]
pub trait ReferenceLookup: Send + Sync {
    /// Display (UCSC-style) name for `name`, or `None` if unknown
    fn display_name(&self, name: &str) -> Option<&str>;

    fn assembly(&self) -> GenomeAssembly;
}

/// Chromosome names of one genome assembly
///
/// Loaded from a text file with an `#assembly=` line and one row per
/// chromosome: `ucscName\tensemblName[\trefSeqName]`. Every column maps to
/// the UCSC name.
#[derive(Clone, Debug, Default)]
pub struct ChromosomeDictionary {
    assembly: GenomeAssembly,
    names: HashMap<String, String>,
    /// Display names in file order
    display_names: Vec<String>,
}
impl ChromosomeDictionary {
    #[must_use]
    pub fn new(assembly: GenomeAssembly) -> Self {
        Self {
            assembly,
            ..Default::default()
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_path("open", path)?;
        let mut dictionary = Self::default();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_path("read", path)?;
            let line = line.trim_end();
            if let Some(field) = line.strip_prefix('#') {
                if let Some(("assembly", value)) = field.split_once('=') {
                    dictionary.assembly = value.trim().parse().map_err(|message| {
                        SourceError::Malformed {
                            path: path.display().to_string(),
                            line: idx + 1,
                            message,
                        }
                    })?;
                }
                continue;
            }
            let mut columns = line.split('\t').filter(|column| !column.is_empty());
            if let Some(display) = columns.next() {
                dictionary.insert(display, columns);
            }
        }
        Ok(dictionary)
    }

    /// Registers a chromosome under its display name and any aliases
    pub fn insert<'a>(&mut self, display: &str, aliases: impl IntoIterator<Item = &'a str>) {
        self.names.insert(display.to_string(), display.to_string());
        for alias in aliases {
            self.names.insert(alias.to_string(), display.to_string());
        }
        self.display_names.push(display.to_string());
    }

    /// Display names in the order they were registered
    #[must_use]
    pub fn display_names(&self) -> &[String] {
        &self.display_names
    }
}
impl ReferenceLookup for ChromosomeDictionary {
    fn display_name(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    fn assembly(&self) -> GenomeAssembly {
        self.assembly
    }
}
