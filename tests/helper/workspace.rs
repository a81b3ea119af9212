//! Temporary Go source trees for tests

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct GoWorkspace {
    root: TempDir,
}

impl GoWorkspace {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    /// Writes `content` to `relative`, creating parent directories
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn file(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.file(relative)).unwrap()
    }
}
