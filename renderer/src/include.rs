use std::io;
use std::path::{Path, PathBuf};

/// Source of the files pulled in by `!include`.
pub trait FileReader {
    fn read(&self, path: &str) -> io::Result<String>;
}

/// Reads included files from disk, relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsReader {
    base_dir: PathBuf,
}

impl FsReader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FsReader {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve paths against the directory containing `source`.
    pub fn beside(source: &Path) -> Self {
        let base_dir = source
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        FsReader { base_dir }
    }
}

impl Default for FsReader {
    fn default() -> Self {
        FsReader::new(".")
    }
}

impl FileReader for FsReader {
    fn read(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.base_dir.join(path))
    }
}
