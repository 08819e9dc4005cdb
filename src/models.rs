use serde::{Deserialize, Serialize};
use std::fmt;

/// One protected gallery to scan
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GalleryTarget {
    pub url: String,
    pub password: Option<String>,
    /// Album/gallery name used in the report header and file name
    pub label: String,
}

impl GalleryTarget {
    pub fn new(url: impl Into<String>, password: Option<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            password: password.filter(|p| !p.is_empty()),
            label: label.into(),
        }
    }
}

/// Which attribute identifies an image in the grid
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Detail-page link (`href` containing `/i-`)
    Link,
    /// Image source URL, used when the grid exposes no links
    Source,
}

/// Deduplicated handle to one displayed image
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub key: String,
    pub kind: ReferenceKind,
    /// 1-based order of discovery in the grid
    pub position: usize,
}

/// Where a comment was found
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum CommentSource {
    /// Structured match through the named CSS selector
    Selector(String),
    /// Fallback line search over the full page text
    TextSearch,
    /// Returned by the REST API
    Api,
}

impl fmt::Display for CommentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentSource::Selector(selector) => write!(f, "selector {}", selector),
            CommentSource::TextSearch => write!(f, "text_search"),
            CommentSource::Api => write!(f, "api"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub author: String,
    pub text: String,
    pub timestamp: Option<String>,
    pub source: CommentSource,
}

/// A commented image. Only built when `comments` is non-empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub filename: String,
    pub comments: Vec<CommentRecord>,
    /// 1-based position within the gallery
    pub position: usize,
}

impl ScanResult {
    /// Returns `None` for an empty comment set so uncommented images never
    /// turn into results.
    pub fn new(filename: String, comments: Vec<CommentRecord>, position: usize) -> Option<Self> {
        if comments.is_empty() {
            return None;
        }
        Some(Self {
            filename,
            comments,
            position,
        })
    }
}
