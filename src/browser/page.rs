use serde::Deserialize;
use std::path::Path;

use super::manager::BrowserError;

/// Key that advances the lightbox to the next image
pub const KEY_NEXT: &str = "ArrowRight";
pub const KEY_ENTER: &str = "Enter";

/// What a query reports about one matched element
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementInfo {
    /// Rendered text (`innerText` on a live page)
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    /// Distance from the top of the viewport, when the backend has layout
    #[serde(default)]
    pub top: Option<f64>,
}

impl ElementInfo {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// The browser capabilities the gallery scan needs.
///
/// Implemented by [`super::BrowserScraper`] for a live Chrome tab and by
/// [`super::SnapshotPage`] for saved HTML. Selectors are CSS selectors.
pub trait Page {
    fn goto(&self, url: &str) -> Result<(), BrowserError>;

    fn current_url(&self) -> Result<String, BrowserError>;

    fn title(&self) -> Result<String, BrowserError>;

    /// Full visible text of the document body
    fn body_text(&self) -> Result<String, BrowserError>;

    /// All elements matching `selector`, in document order
    fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>, BrowserError>;

    fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        Ok(self.query_all(selector)?.len())
    }

    /// Click the `index`-th element matching `selector`
    fn click(&self, selector: &str, index: usize) -> Result<(), BrowserError>;

    /// Type `value` into the first element matching `selector`
    fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    fn press_key(&self, key: &str) -> Result<(), BrowserError>;

    fn scroll_to_bottom(&self) -> Result<(), BrowserError>;

    fn screenshot(&self, path: &Path) -> Result<(), BrowserError>;
}
