use crate::error::{ExpandError, Result};
use crate::resolver::{AssetResolver, Resolution, resolve_directive};
use crate::scanner::{Scanner, Token};
use crate::source::{Contents, SourceFile, parent_dir};
use crate::tracker::CycleTracker;
use std::path::Path;

/// Configuration for directive expansion
#[derive(Debug, Clone, Default)]
pub struct ExpandConfig {
    /// Fingerprint `__uri` URLs with a content hash
    pub use_hash: bool,
}

/// Expands `__inline` and `__uri` directives in source files.
///
/// An `Expander` holds no per-file state: every top-level expansion gets its own
/// [`CycleTracker`], so one expander can serve any number of files, including
/// from several threads at once.
#[derive(Debug, Clone)]
pub struct Expander<R> {
    resolver: R,
    scanner: Scanner,
    config: ExpandConfig,
}

impl<R: AssetResolver> Expander<R> {
    /// Creates an expander on top of `resolver`.
    ///
    /// # Errors
    ///
    /// Returns `ExpandError::Regex` if the scanner fails to build.
    pub fn new(resolver: R, config: ExpandConfig) -> Result<Self> {
        Ok(Self {
            resolver,
            scanner: Scanner::new()?,
            config,
        })
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Expands every directive in `file` and replaces its contents with the result.
    ///
    /// Empty placeholders pass through untouched. On failure the contents are left
    /// as they were.
    ///
    /// # Errors
    ///
    /// Any failure is returned as `ExpandError::File` naming `file`, wrapping one of
    /// `StreamingUnsupported`, `SelfEmbed`, `CircularDependency`,
    /// `NonExistentInlineTarget`, `NotUtf8` or `Io`.
    pub fn expand(&self, file: &mut SourceFile) -> Result<()> {
        self.expand_with(file, &mut CycleTracker::new())
    }

    /// Like [`Expander::expand`] with a caller-owned tracker. The tracker is left
    /// empty on every return, including for empty placeholders.
    ///
    /// # Errors
    ///
    /// See [`Expander::expand`].
    pub fn expand_with(&self, file: &mut SourceFile, tracker: &mut CycleTracker) -> Result<()> {
        let result = match &file.contents {
            Contents::Null => {
                tracker.clear();
                return Ok(());
            }
            Contents::Stream => Err(ExpandError::StreamingUnsupported),
            Contents::Buffer(bytes) => decode(file.path(), bytes)
                .and_then(|text| self.embed(file.path(), text, tracker)),
        };

        match result {
            Ok(expanded) => {
                tracker.unlock(file.path());
                tracker.clear();
                tracing::debug!(file = %file.path().display(), "expanded");
                file.contents = Contents::Buffer(expanded.into_bytes());
                Ok(())
            }
            Err(e) => {
                tracker.clear();
                Err(e.in_file(file.path()))
            }
        }
    }

    /// Rewrites `text`, the content of the file at `path`, and returns the result.
    fn embed(&self, path: &Path, text: &str, tracker: &mut CycleTracker) -> Result<String> {
        let base_dir = parent_dir(path);
        let mut output = String::with_capacity(text.len());
        let mut last = 0;

        for token in self.scanner.tokens(text) {
            // Strings and comments are copied through with the surrounding text.
            let Token::Directive(directive) = token else {
                continue;
            };

            tracing::debug!(
                file = %path.display(),
                directive = directive.kind.name(),
                reference = directive.value(),
                "expanding directive"
            );

            let resolution =
                resolve_directive(&self.resolver, &directive, base_dir, self.config.use_hash)?;
            let replacement = match resolution {
                Resolution::Substitute(substitution) => substitution,
                Resolution::Inline(target) => self.inline(path, &target, tracker)?,
            };

            output.push_str(&text[last..directive.span.start]);
            output.push_str(&replacement);
            last = directive.span.end;
        }

        output.push_str(&text[last..]);
        Ok(output)
    }

    /// Fully expands `target` for inclusion into `embedding`.
    fn inline(
        &self,
        embedding: &Path,
        target: &Path,
        tracker: &mut CycleTracker,
    ) -> Result<String> {
        match self.embed_locked(embedding, target, tracker) {
            Ok(expanded) => {
                tracker.unlock(target);
                Ok(expanded)
            }
            Err(e) => {
                tracker.clear();
                Err(e.nested_in(embedding))
            }
        }
    }

    fn embed_locked(
        &self,
        embedding: &Path,
        target: &Path,
        tracker: &mut CycleTracker,
    ) -> Result<String> {
        tracker.lock(embedding, target)?;
        let bytes = self.resolver.read(target)?;
        let text = decode(target, &bytes)?;
        self.embed(target, text, tracker)
    }
}

fn decode<'a>(path: &Path, bytes: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|_| ExpandError::NotUtf8 {
        path: path.to_path_buf(),
    })
}
