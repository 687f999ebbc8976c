use std::{
    ffi::OsString,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use super::INDEX_EXTENSION;
use crate::{error::IoContext, Result};

const PENDING_SUFFIX: &str = "tmp";

/// Path of the index that accompanies the database at `path`
#[must_use]
pub fn index_path(path: &Path) -> PathBuf {
    with_suffix(path, INDEX_EXTENSION)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// A database pair being written under temporary names
///
/// Both files are promoted to their final names by [`commit`](Self::commit).
/// If the guard is dropped without committing, both temporary files are removed
/// so no partial database is ever visible under the final name.
#[derive(Debug)]
pub struct PendingDatabase {
    path: PathBuf,
    tmp_path: PathBuf,
    tmp_index_path: PathBuf,
    committed: bool,
}
impl PendingDatabase {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let tmp_path = with_suffix(&path, PENDING_SUFFIX);
        let tmp_index_path = with_suffix(&index_path(&path), PENDING_SUFFIX);
        Self {
            path,
            tmp_path,
            tmp_index_path,
            committed: false,
        }
    }

    /// Final path of the primary file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the temporary primary and index files
    pub fn create(&self) -> Result<(BufWriter<File>, BufWriter<File>)> {
        let primary = File::create(&self.tmp_path).with_path("create", &self.tmp_path)?;
        let index = File::create(&self.tmp_index_path).with_path("create", &self.tmp_index_path)?;
        Ok((BufWriter::new(primary), BufWriter::new(index)))
    }

    /// Renames both files to their final names
    ///
    /// The writers returned by [`create`](Self::create) must be finished and
    /// dropped before committing.
    pub fn commit(mut self) -> Result<PathBuf> {
        let final_index = index_path(&self.path);
        fs::rename(&self.tmp_index_path, &final_index).with_path("rename", &self.tmp_index_path)?;
        fs::rename(&self.tmp_path, &self.path).with_path("rename", &self.tmp_path)?;
        self.committed = true;
        Ok(self.path.clone())
    }
}
impl Drop for PendingDatabase {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in [&self.tmp_path, &self.tmp_index_path] {
            if path.exists() {
                match fs::remove_file(path) {
                    Ok(()) => log::warn!("removed partial output {}", path.display()),
                    Err(e) => log::warn!("unable to remove partial output {}: {e}", path.display()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_index_path() {
        assert_eq!(
            index_path(Path::new("/data/chr1.nsa")),
            PathBuf::from("/data/chr1.nsa.idx")
        );
    }

    #[test]
    fn test_commit_promotes_both_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("chr2.nsa");
        let pending = PendingDatabase::new(&target);
        {
            let (mut primary, mut index) = pending.create()?;
            primary.write_all(b"primary")?;
            index.write_all(b"index")?;
        }
        assert!(!target.exists());
        let path = pending.commit()?;
        assert_eq!(path, target);
        assert_eq!(fs::read(&target)?, b"primary");
        assert_eq!(fs::read(index_path(&target))?, b"index");
        assert_eq!(fs::read_dir(dir.path())?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_drop_removes_partial_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("chrX.nsa");
        {
            let pending = PendingDatabase::new(&target);
            let (mut primary, _index) = pending.create()?;
            primary.write_all(b"half")?;
        }
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }
}
