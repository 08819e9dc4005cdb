//! The browser-path scan: enumerate the gallery grid, walk the lightbox, and
//! record every image the reviewer commented on.
//!
//! Page structure is probed rather than known; see [`probe`].

pub mod comments;
pub mod enumerate;
pub mod filename;
pub mod lightbox;
pub mod probe;
pub mod scanner;

pub use comments::{CommentExtractor, MatchMode, ReviewerMatcher};
pub use enumerate::{Enumeration, GalleryEnumerator, LazyLoadPolicy};
pub use filename::{FilenameResolver, FilenameSource, ResolvedFilename};
pub use lightbox::{CommentInspector, ImageInspector, LightboxWalker};
pub use scanner::{GalleryScanner, PageInspection, ScanOutcome};

use crate::browser::BrowserError;
use crate::config::ConfigError;
use crate::report::ReportError;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
