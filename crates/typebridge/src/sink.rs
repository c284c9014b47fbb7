//! Write destinations for generated artifacts.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("refusing to write outside the output root: {0}")]
    OutsideRoot(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where generated files go. Paths are relative and `/`-separated.
pub trait Sink {
    /// Create or overwrite a file.
    fn write_file(&mut self, relative_path: &str, contents: &[u8]) -> Result<(), SinkError>;

    fn create_dir_all(&mut self, _relative_path: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes below a directory on disk, replacing earlier output in place.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, SinkError> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.is_empty() {
            return Err(SinkError::OutsideRoot(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl Sink for FsSink {
    fn write_file(&mut self, relative_path: &str, contents: &[u8]) -> Result<(), SinkError> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, contents).map_err(|source| SinkError::Io { path, source })?;
        tracing::debug!(path = relative_path, bytes = contents.len(), "wrote file");
        Ok(())
    }

    fn create_dir_all(&mut self, relative_path: &str) -> Result<(), SinkError> {
        let path = self.resolve(relative_path)?;
        std::fs::create_dir_all(&path).map_err(|source| SinkError::Io { path, source })
    }
}

/// Keeps files in memory, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    /// A file's contents as UTF-8, if present and valid.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.files
            .get(path)
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

impl Sink for MemorySink {
    fn write_file(&mut self, relative_path: &str, contents: &[u8]) -> Result<(), SinkError> {
        self.files
            .insert(relative_path.to_string(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fs_sink_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let mut sink = FsSink::new(dir.path());
        sink.write_file("nested/types.ts", b"one").unwrap();
        sink.write_file("nested/types.ts", b"two").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("nested/types.ts")).unwrap(),
            "two"
        );
    }

    #[test]
    fn fs_sink_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let mut sink = FsSink::new(dir.path());
        assert!(matches!(
            sink.write_file("../evil.ts", b""),
            Err(SinkError::OutsideRoot(_))
        ));
        assert!(matches!(
            sink.write_file("/etc/evil.ts", b""),
            Err(SinkError::OutsideRoot(_))
        ));
    }

    #[test]
    fn memory_sink_exposes_files() {
        let mut sink = MemorySink::new();
        sink.write_file("types.ts", b"export {};\n").unwrap();
        assert_eq!(sink.files().len(), 1);
        assert_eq!(sink.text("types.ts"), Some("export {};\n"));
        assert_eq!(sink.text("missing.ts"), None);
    }
}
