use regex::Regex;
use std::fmt;

use super::probe;
use crate::browser::{BrowserError, Page};

/// Overlay and caption elements that often carry the original filename
pub const OVERLAY_SELECTORS: &[&str] = &[
    ".sm-lightbox-overlay-text",
    ".sm-image-overlay",
    ".sm-filename-overlay",
    r#"[class*="overlay"][class*="text"]"#,
    r#"[class*="filename"]"#,
    ".sm-lightbox-info",
    ".sm-image-title",
    ".sm-image-name",
];

const LOWER_REGION_SELECTOR: &str = "div, span, p";
const IMAGE_SOURCE_SELECTOR: &str = r#"img[src*="smugmug"]"#;

/// Lower-region text this long is body copy, not a filename
const MAX_LOWER_TEXT_LEN: usize = 100;

/// Which method produced a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameSource {
    Overlay(String),
    LowerText,
    Title,
    UrlToken,
    ImageSource,
    Placeholder,
}

impl fmt::Display for FilenameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilenameSource::Overlay(selector) => write!(f, "overlay {}", selector),
            FilenameSource::LowerText => write!(f, "lower_text"),
            FilenameSource::Title => write!(f, "title"),
            FilenameSource::UrlToken => write!(f, "url_token"),
            FilenameSource::ImageSource => write!(f, "image_source"),
            FilenameSource::Placeholder => write!(f, "placeholder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilename {
    pub name: String,
    pub method: FilenameSource,
}

/// Best-effort filename lookup for the image shown in the lightbox
pub struct FilenameResolver {
    overlay_selectors: Vec<String>,
    overlay_min_top: f64,
    site_title: String,
    filename_re: Regex,
    token_re: Regex,
    source_re: Regex,
}

impl FilenameResolver {
    pub fn new(overlay_min_top: f64, site_title: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            overlay_selectors: OVERLAY_SELECTORS.iter().map(|s| s.to_string()).collect(),
            overlay_min_top,
            site_title: site_title.into(),
            filename_re: Regex::new(
                r#"(?i)([^/\\:\s"'<>]+\.(?:jpg|jpeg|png|gif|raw|dng|tiff|bmp|cr2|nef|arw))\b"#,
            )?,
            token_re: Regex::new(r"/i-([a-zA-Z0-9]+)")?,
            source_re: Regex::new(r"(?i)/([^/?#]+\.(?:jpg|jpeg|png|gif|raw|dng|tiff|bmp))")?,
        })
    }

    pub fn with_overlay_selectors(mut self, selectors: Vec<String>) -> Self {
        self.overlay_selectors = selectors;
        self
    }

    /// First filename-looking token in `text`
    pub fn find_filename(&self, text: &str) -> Option<String> {
        self.filename_re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Never fails; the worst case is an `Unknown_<HHMMSS>` placeholder
    pub fn resolve<P>(&self, page: &P) -> ResolvedFilename
    where
        P: Page + ?Sized,
    {
        if let Some(found) = self.from_overlay(page) {
            return found;
        }

        let methods: [(FilenameSource, fn(&Self, &P) -> Result<Option<String>, BrowserError>); 4] = [
            (FilenameSource::LowerText, Self::from_lower_text),
            (FilenameSource::Title, Self::from_title),
            (FilenameSource::UrlToken, Self::from_url),
            (FilenameSource::ImageSource, Self::from_image_source),
        ];

        for (method, lookup) in methods {
            match lookup(self, page) {
                Ok(Some(name)) if !name.is_empty() => {
                    log::debug!("    Filename {} from {}", name, method);
                    return ResolvedFilename { name, method };
                }
                Ok(_) => {}
                Err(e) => log::debug!("    Filename method {} failed: {}", method, e),
            }
        }

        let name = format!("Unknown_{}", chrono::Local::now().format("%H%M%S"));
        log::warn!("    Could not determine filename, using {}", name);
        ResolvedFilename {
            name,
            method: FilenameSource::Placeholder,
        }
    }

    fn from_overlay<P>(&self, page: &P) -> Option<ResolvedFilename>
    where
        P: Page + ?Sized,
    {
        let hit = probe::first_match(page, self.overlay_selectors.as_slice(), |el| {
            self.find_filename(&el.text).is_some()
        })?;
        let name = hit.elements.iter().find_map(|el| self.find_filename(&el.text))?;
        Some(ResolvedFilename {
            name,
            method: FilenameSource::Overlay(hit.selector.to_string()),
        })
    }

    fn from_lower_text<P>(&self, page: &P) -> Result<Option<String>, BrowserError>
    where
        P: Page + ?Sized,
    {
        Ok(page
            .query_all(LOWER_REGION_SELECTOR)?
            .iter()
            .filter(|el| el.top.is_some_and(|top| top > self.overlay_min_top))
            .filter(|el| el.text.chars().count() < MAX_LOWER_TEXT_LEN)
            .find_map(|el| self.find_filename(&el.text)))
    }

    fn from_title<P>(&self, page: &P) -> Result<Option<String>, BrowserError>
    where
        P: Page + ?Sized,
    {
        let title = page.title()?;
        let title = title.trim();
        if title.is_empty() || title == self.site_title {
            return Ok(None);
        }
        Ok(self.find_filename(title))
    }

    fn from_url<P>(&self, page: &P) -> Result<Option<String>, BrowserError>
    where
        P: Page + ?Sized,
    {
        let url = page.current_url()?;
        Ok(self
            .token_re
            .captures(&url)
            .and_then(|c| c.get(1))
            .map(|m| format!("Image_{}", m.as_str())))
    }

    fn from_image_source<P>(&self, page: &P) -> Result<Option<String>, BrowserError>
    where
        P: Page + ?Sized,
    {
        let images = page.query_all(IMAGE_SOURCE_SELECTOR)?;
        Ok(images
            .first()
            .and_then(|img| img.src.as_deref())
            .and_then(|src| self.source_re.captures(src))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()))
    }
}
