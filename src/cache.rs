//! Memoises replacement file contents so repeated scene loads don't hit the disk again.

use cached::{Cached, UnboundCache};
use eyre::{Context, Result};
use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

/// Raw file bytes keyed by absolute path. Entries are never invalidated; a replacement file that
/// changes on disk mid-session keeps its old contents until the cache is dropped.
pub struct ByteCache {
    files: UnboundCache<PathBuf, Rc<[u8]>>,

    /// The number of reads that actually went to disk.
    disk_reads: usize,
}

impl ByteCache {
    pub fn new() -> ByteCache {
        ByteCache {
            files: UnboundCache::new(),
            disk_reads: 0,
        }
    }

    /// Returns the contents of the file at `path`, reading it from disk the first time only.
    pub fn read(&mut self, path: impl AsRef<Path>) -> Result<Rc<[u8]>> {
        let path = absolute(path.as_ref());

        if let Some(bytes) = self.files.cache_get(&path) {
            return Ok(bytes.clone());
        }

        let bytes: Rc<[u8]> = std::fs::read(&path)
            .wrap_err_with(|| format!("Unable to read replacement file {:?}", path))?
            .into();

        self.disk_reads += 1;
        self.files.cache_set(path, bytes.clone());

        Ok(bytes)
    }

    /// Returns the number of files held in the cache.
    pub fn len(&self) -> usize {
        self.files.cache_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn disk_reads(&self) -> usize {
        self.disk_reads
    }
}

impl Default for ByteCache {
    fn default() -> Self {
        ByteCache::new()
    }
}

/// Makes `path` absolute so that different spellings of a relative path share an entry.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    match std::env::current_dir() {
        Ok(dir) => dir.join(path),
        Err(err) => {
            log::warn!("Unable to resolve {:?} against the working directory: {}", path, err);
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        std::fs::write(&path, [1, 2, 3]).unwrap();

        let mut cache = ByteCache::new();
        assert_eq!(&*cache.read(&path).unwrap(), &[1, 2, 3]);

        // Changing the file doesn't matter any more.
        std::fs::write(&path, [9]).unwrap();
        assert_eq!(&*cache.read(&path).unwrap(), &[1, 2, 3]);

        assert_eq!(cache.disk_reads(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_files_are_errors_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ByteCache::new();

        assert!(cache.read(dir.path().join("missing.png")).is_err());
        assert!(cache.is_empty());
    }
}
