use crate::error::{ExpandError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Records which file is embedding each file whose expansion is in progress.
///
/// A tracker belongs to one top-level expansion. Keys are embedded files, values
/// the file that inlined them, so following the values from any key walks back
/// up the current inline chain.
#[derive(Debug, Default, Clone)]
pub struct CycleTracker {
    embedded_by: HashMap<PathBuf, PathBuf>,
}

impl CycleTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the in-progress lock on `embedded` on behalf of `embedding`.
    ///
    /// # Errors
    ///
    /// - `ExpandError::SelfEmbed` if both paths are the same file.
    /// - `ExpandError::CircularDependency` if `embedded` is already being expanded
    ///   further up the chain. The error carries the inline chain from `embedded`
    ///   down to `embedding` and back to `embedded`.
    pub fn lock(&mut self, embedding: &Path, embedded: &Path) -> Result<()> {
        if embedding == embedded {
            return Err(ExpandError::SelfEmbed {
                path: embedded.to_path_buf(),
            });
        }

        if self.embedded_by.contains_key(embedded) {
            return Err(ExpandError::CircularDependency {
                chain: self.cycle_chain(embedding, embedded),
            });
        }

        self.embedded_by
            .insert(embedded.to_path_buf(), embedding.to_path_buf());
        Ok(())
    }

    /// Releases the lock on `file` once its own expansion has completed.
    pub fn unlock(&mut self, file: &Path) {
        self.embedded_by.remove(file);
    }

    /// Drops every lock. Used when an expansion is aborted.
    pub fn clear(&mut self) {
        self.embedded_by.clear();
    }

    #[must_use]
    pub fn is_locked(&self, file: &Path) -> bool {
        self.embedded_by.contains_key(file)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embedded_by.is_empty()
    }

    /// Chain of inlines from `embedded` around to `embedding` and back to `embedded`.
    fn cycle_chain(&self, embedding: &Path, embedded: &Path) -> Vec<PathBuf> {
        let mut ancestors = vec![embedding.to_path_buf()];
        let mut next = self.embedded_by.get(embedding);

        // Bounded by the map size so a malformed map can never spin forever.
        while let Some(current) = next {
            if current == embedded || ancestors.len() > self.embedded_by.len() {
                break;
            }
            ancestors.push(current.clone());
            next = self.embedded_by.get(current);
        }

        let mut chain = Vec::with_capacity(ancestors.len() + 2);
        chain.push(embedded.to_path_buf());
        chain.extend(ancestors.into_iter().rev());
        chain.push(embedded.to_path_buf());
        chain
    }
}
