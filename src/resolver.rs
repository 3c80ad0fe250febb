use crate::error::{ExpandError, Result};
use crate::scanner::{DirectiveKind, DirectiveMatch};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Number of hex characters of the content hash used as a URL fingerprint
pub const FINGERPRINT_LEN: usize = 8;

/// Maps directive arguments to files and files to public URLs
pub trait AssetResolver {
    /// Resolves `reference` (quotes already stripped) against `base_dir`.
    /// Returns `None` when the reference does not name a known asset.
    fn resolve(&self, reference: &str, base_dir: &Path) -> Option<PathBuf>;

    /// Whether `path` is an existing regular file.
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Reads the raw content of `path`.
    ///
    /// # Errors
    ///
    /// Returns `ExpandError::Io` if the file cannot be read.
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    /// Public URL of `path` as referenced by `reference`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file has to be read for fingerprinting and cannot be.
    fn public_url(&self, path: &Path, reference: &str, use_hash: bool) -> Result<String>;
}

/// What a directive expands to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the call with the fully expanded content of this file
    Inline(PathBuf),
    /// Replace the call with this text as is
    Substitute(String),
}

/// Resolves one directive call found in a file located in `base_dir`.
///
/// A `__uri` that names no file falls back to its bare argument; an `__inline`
/// that names no file is fatal.
///
/// # Errors
///
/// - `ExpandError::NonExistentInlineTarget` for an `__inline` argument that is not an
///   existing file.
/// - Errors from [`AssetResolver::public_url`].
pub fn resolve_directive<R: AssetResolver + ?Sized>(
    resolver: &R,
    directive: &DirectiveMatch<'_>,
    base_dir: &Path,
    use_hash: bool,
) -> Result<Resolution> {
    let reference = directive.value();
    let target = resolver
        .resolve(reference, base_dir)
        .filter(|path| resolver.is_file(path));

    match (directive.kind, target) {
        (DirectiveKind::Inline, Some(path)) => Ok(Resolution::Inline(path)),
        (DirectiveKind::Inline, None) => Err(ExpandError::NonExistentInlineTarget {
            literal: directive.literal.to_string(),
        }),
        (DirectiveKind::Uri, Some(path)) => {
            let url = resolver.public_url(&path, reference, use_hash)?;
            Ok(Resolution::Substitute(format!(
                "{quote}{url}{quote}",
                quote = directive.quote
            )))
        }
        (DirectiveKind::Uri, None) => Ok(Resolution::Substitute(reference.to_string())),
    }
}

/// Splits `a/b.png?x=1#top` into `("a/b.png", "x=1", "#top")`.
fn split_reference(reference: &str) -> (&str, Option<&str>, &str) {
    let (rest, fragment) = reference
        .find('#')
        .map_or((reference, ""), |i| reference.split_at(i));
    match rest.split_once('?') {
        Some((path, query)) => (path, Some(query), fragment),
        None => (rest, None, fragment),
    }
}

/// Filesystem resolver rooted at a project directory
#[derive(Debug, Clone)]
pub struct FsResolver {
    root: PathBuf,
    url_prefix: String,
}

impl FsResolver {
    /// Creates a resolver for the project at `root`.
    ///
    /// # Errors
    ///
    /// Returns `ExpandError::Io` if `root` cannot be canonicalized.
    pub fn new(root: &Path, url_prefix: impl Into<String>) -> Result<Self> {
        let mut url_prefix = url_prefix.into();
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }
        Ok(Self {
            root: root.canonicalize()?,
            url_prefix,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_url_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    fn fingerprint(&self, path: &Path) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.read(path)?);
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(FINGERPRINT_LEN);
        Ok(digest)
    }
}

impl AssetResolver for FsResolver {
    fn resolve(&self, reference: &str, base_dir: &Path) -> Option<PathBuf> {
        let (path_part, _, _) = split_reference(reference);
        if path_part.is_empty() {
            return None;
        }

        let full_path = match path_part.strip_prefix('/') {
            Some(from_root) => self.root.join(from_root),
            None => base_dir.join(path_part),
        };

        // Canonicalization fails for missing files, which are unknown assets.
        let canonical = full_path.canonicalize().ok()?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(
                reference,
                path = %canonical.display(),
                "reference resolves outside the project root"
            );
            return None;
        }

        Some(canonical)
    }

    fn public_url(&self, path: &Path, reference: &str, use_hash: bool) -> Result<String> {
        let (_, query, fragment) = split_reference(reference);
        let mut url = format!("{}{}", self.url_prefix, self.relative_url_path(path));

        let fingerprint = if use_hash {
            Some(format!("v={}", self.fingerprint(path)?))
        } else {
            None
        };
        let params: Vec<&str> = fingerprint.as_deref().into_iter().chain(query).collect();
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        url.push_str(fragment);
        Ok(url)
    }
}
