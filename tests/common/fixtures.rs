use std::path::PathBuf;

use tempfile::TempDir;

/// A file in its own temporary directory, removed on drop
pub struct TestFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestFixture {
    pub fn new(name: &str, content: &str) -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join(name);
        std::fs::write(&path, content)?;
        Ok(Self { _dir: dir, path })
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}
