use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for jsexpand operations
#[derive(Error, Debug)]
pub enum ExpandError {
    /// A file tried to inline itself
    #[error("unable to embed file [{}] into itself.", .path.display())]
    SelfEmbed { path: PathBuf },

    /// An inline chain came back to a file that is still being expanded
    #[error("circular dependency on [{}].", format_chain(.chain))]
    CircularDependency { chain: Vec<PathBuf> },

    /// `__inline` argument does not name an existing regular file. `literal` keeps its quotes.
    #[error("unable to inline non-existent file [{literal}]")]
    NonExistentInlineTarget { literal: String },

    /// Input is a streaming placeholder rather than a buffer
    #[error("Streaming not supported")]
    StreamingUnsupported,

    /// Error raised while expanding a file inlined by `path`
    #[error("{inner} in [{}]", .path.display())]
    Nested {
        path: PathBuf,
        inner: Box<ExpandError>,
    },

    /// Error reported against a top-level file
    #[error("{}: {inner}", .path.display())]
    File {
        path: PathBuf,
        inner: Box<ExpandError>,
    },

    /// Content could not be decoded as UTF-8
    #[error("File is not valid UTF-8: {}", .path.display())]
    NotUtf8 { path: PathBuf },

    /// IO error when reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// `WalkDir` error when traversing input directories
    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Invalid include glob
    #[error("Glob error: {0}")]
    Glob(#[from] globset::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExpandError {
    /// Wraps `self` with the path of the file whose expansion it interrupted.
    #[must_use]
    pub fn nested_in(self, path: &Path) -> Self {
        Self::Nested {
            path: path.to_path_buf(),
            inner: Box::new(self),
        }
    }

    /// Reports `self` against the top-level file at `path`.
    #[must_use]
    pub fn in_file(self, path: &Path) -> Self {
        Self::File {
            path: path.to_path_buf(),
            inner: Box::new(self),
        }
    }

    /// The error that started the unwinding, with every path annotation peeled off.
    #[must_use]
    pub fn innermost(&self) -> &Self {
        match self {
            Self::Nested { inner, .. } | Self::File { inner, .. } => inner.innermost(),
            other => other,
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("] -> [")
}

pub type Result<T> = std::result::Result<T, ExpandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExpandError::SelfEmbed {
            path: PathBuf::from("/src/x.js"),
        };
        assert_eq!(
            format!("{err}"),
            "unable to embed file [/src/x.js] into itself."
        );

        let err = ExpandError::CircularDependency {
            chain: vec![
                PathBuf::from("/b.js"),
                PathBuf::from("/a.js"),
                PathBuf::from("/b.js"),
            ],
        };
        assert_eq!(
            format!("{err}"),
            "circular dependency on [/b.js] -> [/a.js] -> [/b.js]."
        );

        let err = ExpandError::NonExistentInlineTarget {
            literal: "\"missing.js\"".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "unable to inline non-existent file [\"missing.js\"]"
        );

        assert_eq!(
            format!("{}", ExpandError::StreamingUnsupported),
            "Streaming not supported"
        );
    }

    #[test]
    fn test_nested_annotations() {
        let err = ExpandError::SelfEmbed {
            path: PathBuf::from("/c.js"),
        }
        .nested_in(Path::new("/b.js"))
        .nested_in(Path::new("/a.js"))
        .in_file(Path::new("/a.js"));

        assert_eq!(
            format!("{err}"),
            "/a.js: unable to embed file [/c.js] into itself. in [/b.js] in [/a.js]"
        );
        assert!(matches!(err.innermost(), ExpandError::SelfEmbed { .. }));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: ExpandError = io_err.into();
        assert!(matches!(err, ExpandError::Io(_)));
        assert!(matches!(err.innermost(), ExpandError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: ExpandError = json_err.into();
        assert!(matches!(err, ExpandError::Json(_)));
    }
}
