use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Content carried by a [`SourceFile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// Empty placeholder, passed through untouched
    Null,
    /// Streaming placeholder, which the expander cannot rewrite
    Stream,
    /// Fully buffered bytes
    Buffer(Vec<u8>),
}

/// A top-level file handed to the expander by the build pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    /// Replaced wholesale when an expansion succeeds
    pub contents: Contents,
}

impl SourceFile {
    /// Wraps already loaded contents. `path` should be absolute and canonical so
    /// it compares equal to the paths the resolver hands back.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: Contents) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }

    /// Loads a file from disk, canonicalizing its path.
    ///
    /// # Errors
    ///
    /// Returns `ExpandError::Io` if the path cannot be canonicalized or read.
    pub fn open(path: &Path) -> Result<Self> {
        let path = path.canonicalize()?;
        let contents = Contents::Buffer(fs::read(&path)?);
        Ok(Self { path, contents })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative references in this file are resolved against.
    #[must_use]
    pub fn directory(&self) -> &Path {
        parent_dir(&self.path)
    }

    #[must_use]
    pub fn is_empty_placeholder(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    #[must_use]
    pub fn is_streaming_placeholder(&self) -> bool {
        matches!(self.contents, Contents::Stream)
    }

    /// The buffered bytes, if any.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Writes the buffered bytes back to `self.path()`. Placeholders are not written.
    ///
    /// # Errors
    ///
    /// Returns `ExpandError::Io` if the write fails.
    pub fn write_back(&self) -> Result<()> {
        if let Some(bytes) = self.bytes() {
            fs::write(&self.path, bytes)?;
        }
        Ok(())
    }
}

/// Directory containing `path`, or `.` for a bare file name.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_and_write_back() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("main.js");
        fs::write(&file_path, "var a;").unwrap();

        let mut file = SourceFile::open(&file_path).unwrap();
        assert_eq!(file.path(), file_path.canonicalize().unwrap());
        assert_eq!(file.directory(), temp_dir.path().canonicalize().unwrap());
        assert_eq!(file.bytes(), Some(&b"var a;"[..]));

        file.contents = Contents::Buffer(b"var b;".to_vec());
        file.write_back().unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "var b;");
    }

    #[test]
    fn test_open_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = SourceFile::open(&temp_dir.path().join("missing.js"));
        assert!(matches!(result, Err(crate::ExpandError::Io(_))));
    }

    #[test]
    fn test_placeholders() {
        let null = SourceFile::new("/a.js", Contents::Null);
        assert!(null.is_empty_placeholder());
        assert!(!null.is_streaming_placeholder());
        assert_eq!(null.bytes(), None);

        let stream = SourceFile::new("/a.js", Contents::Stream);
        assert!(stream.is_streaming_placeholder());
        assert!(!stream.is_empty_placeholder());
        // Writing a placeholder is a no-op.
        stream.write_back().unwrap();
    }
}
