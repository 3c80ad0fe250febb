//! # jsexpand
//!
//! A build-time preprocessor for JavaScript sources. It rewrites two directive
//! calls in place:
//!
//! - `__inline("path/to/file.js")` is replaced with the content of that file,
//!   itself fully expanded first
//! - `__uri('path/to/asset.png')` is replaced with the public URL of that asset,
//!   optionally fingerprinted with a content hash
//!
//! Directive calls written inside string literals or comments are left alone.
//! Inline chains that loop back on themselves are reported with the full chain.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use jsexpand::{ExpandConfig, Expander, FsResolver, SourceFile};
//! use std::path::Path;
//!
//! let resolver = FsResolver::new(Path::new("."), "/")?;
//! let expander = Expander::new(resolver, ExpandConfig::default())?;
//!
//! let mut file = SourceFile::open(Path::new("js/main.js"))?;
//! match expander.expand(&mut file) {
//!     Ok(()) => file.write_back()?,
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # Ok::<(), jsexpand::ExpandError>(())
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Rewrite files in place
//! jsexpand js/main.js js/admin.js
//!
//! # Expand every .js file under a directory, fingerprinting URLs
//! jsexpand --use-hash js/
//!
//! # Print the result instead of rewriting
//! jsexpand --stdout js/main.js
//! ```

pub mod error;
pub mod expander;
pub mod resolver;
pub mod scanner;
pub mod source;
pub mod tracker;

// Re-export main types and functions for convenience
pub use error::{ExpandError, Result};
pub use expander::{ExpandConfig, Expander};
pub use resolver::{AssetResolver, FsResolver, Resolution, resolve_directive};
pub use scanner::{DirectiveKind, DirectiveMatch, Scanner, Token};
pub use source::{Contents, SourceFile};
pub use tracker::CycleTracker;
