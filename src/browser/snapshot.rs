//! [`Page`] over saved HTML documents.
//!
//! A snapshot set stands in for a gallery: clicking a link moves to the
//! snapshot whose URL matches the link target, and the next-image key moves
//! to the following snapshot in the set. There is no layout, so elements never
//! report a position, and nothing can be rendered to a screenshot.

use scraper::{ElementRef, Html, Selector};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use super::manager::BrowserError;
use super::page::{ElementInfo, Page, KEY_NEXT};

/// One saved page
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub url: String,
    pub html: String,
}

impl Snapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

pub struct SnapshotPage {
    snapshots: Vec<Snapshot>,
    documents: Vec<Html>,
    current: Cell<usize>,
    keys: RefCell<Vec<String>>,
    filled: RefCell<Vec<(String, String)>>,
    screenshots: RefCell<Vec<PathBuf>>,
}

impl SnapshotPage {
    /// The first snapshot is the page shown initially
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        let documents = snapshots
            .iter()
            .map(|s| Html::parse_document(&s.html))
            .collect();

        Self {
            snapshots,
            documents,
            current: Cell::new(0),
            keys: RefCell::new(Vec::new()),
            filled: RefCell::new(Vec::new()),
            screenshots: RefCell::new(Vec::new()),
        }
    }

    /// Load a single saved page from disk
    pub fn from_file(path: &Path, url: Option<&str>) -> std::io::Result<Self> {
        let html = std::fs::read_to_string(path)?;
        let url = url
            .map(str::to_string)
            .unwrap_or_else(|| format!("file://{}", path.display()));
        Ok(Self::new(vec![Snapshot::new(url, html)]))
    }

    /// Index of the snapshot currently shown
    pub fn current_index(&self) -> usize {
        self.current.get()
    }

    /// Keys pressed so far, in order
    pub fn pressed_keys(&self) -> Vec<String> {
        self.keys.borrow().clone()
    }

    /// `(selector, value)` pairs typed so far
    pub fn filled_values(&self) -> Vec<(String, String)> {
        self.filled.borrow().clone()
    }

    /// Paths screenshots were requested for. None is ever written.
    pub fn screenshot_requests(&self) -> Vec<PathBuf> {
        self.screenshots.borrow().clone()
    }

    fn document(&self) -> Result<&Html, BrowserError> {
        self.documents
            .get(self.current.get())
            .ok_or_else(|| BrowserError::NavigationError("No snapshot loaded".to_string()))
    }

    fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
        Selector::parse(selector)
            .map_err(|e| BrowserError::InvalidSelector(format!("{}: {:?}", selector, e)))
    }

    fn find_snapshot(&self, target: &str) -> Option<usize> {
        let target = target.trim_end_matches('/');
        if target.is_empty() {
            return None;
        }
        self.snapshots.iter().position(|s| {
            let url = s.url.trim_end_matches('/');
            url == target || url.ends_with(target)
        })
    }

    fn element_text(element: &ElementRef<'_>) -> String {
        element
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Page for SnapshotPage {
    fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let index = self
            .find_snapshot(url)
            .ok_or_else(|| BrowserError::NavigationError(format!("No snapshot for {}", url)))?;
        self.current.set(index);
        Ok(())
    }

    fn current_url(&self) -> Result<String, BrowserError> {
        self.snapshots
            .get(self.current.get())
            .map(|s| s.url.clone())
            .ok_or_else(|| BrowserError::NavigationError("No snapshot loaded".to_string()))
    }

    fn title(&self) -> Result<String, BrowserError> {
        let selector = Self::parse_selector("title")?;
        Ok(self
            .document()?
            .select(&selector)
            .next()
            .map(|t| Self::element_text(&t))
            .unwrap_or_default())
    }

    fn body_text(&self) -> Result<String, BrowserError> {
        let selector = Self::parse_selector("body")?;
        let document = self.document()?;
        let root = document
            .select(&selector)
            .next()
            .unwrap_or_else(|| document.root_element());

        Ok(root
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>, BrowserError> {
        let parsed = Self::parse_selector(selector)?;
        Ok(self
            .document()?
            .select(&parsed)
            .map(|el| ElementInfo {
                text: Self::element_text(&el),
                href: el.value().attr("href").map(str::to_string),
                src: el.value().attr("src").map(str::to_string),
                top: None,
            })
            .collect())
    }

    fn click(&self, selector: &str, index: usize) -> Result<(), BrowserError> {
        let element = self
            .query_all(selector)?
            .into_iter()
            .nth(index)
            .ok_or_else(|| BrowserError::ElementNotFound(format!("{} [{}]", selector, index)))?;

        // Links navigate; anything else is a control on the current page
        if let Some(href) = element.href {
            let target = self
                .find_snapshot(&href)
                .ok_or_else(|| BrowserError::NavigationError(format!("No snapshot for {}", href)))?;
            self.current.set(target);
        }
        Ok(())
    }

    fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        if self.count(selector)? == 0 {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        self.filled
            .borrow_mut()
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        self.keys.borrow_mut().push(key.to_string());
        if key == KEY_NEXT {
            let next = self.current.get() + 1;
            if next < self.snapshots.len() {
                self.current.set(next);
            }
        }
        Ok(())
    }

    fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    fn screenshot(&self, path: &Path) -> Result<(), BrowserError> {
        self.screenshots.borrow_mut().push(path.to_path_buf());
        Err(BrowserError::ScreenshotError(format!(
            "snapshot pages cannot be rendered ({})",
            path.display()
        )))
    }
}
