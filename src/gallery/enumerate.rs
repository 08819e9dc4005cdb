//! Gallery enumeration: scroll until lazy loading stops, then collect one
//! reference per displayed image.

use std::collections::HashSet;
use std::time::Duration;

use crate::browser::{BrowserError, ElementInfo, Page};
use crate::clock::Clock;
use crate::config::ScanConfig;
use crate::models::{ImageReference, ReferenceKind};

/// Everything that counts as a loaded grid image
pub const GRID_SELECTOR: &str = r#"a[href*="/i-"], img[src*="smugmug"]"#;
/// Detail-page links, preferred as references
pub const LINK_SELECTOR: &str = r#"a[href*="/i-"]"#;
/// Used when the grid exposes no links
pub const IMAGE_FALLBACK_SELECTOR: &str = r#"img[src*="smugmug"], .sm-tile img, .sm-gallery-image img"#;

/// When to stop scrolling a lazily loading grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LazyLoadPolicy {
    /// Consecutive unchanged counts that mean loading has finished
    pub stable_reads: u32,
    pub max_attempts: u32,
    pub settle: Duration,
}

impl Default for LazyLoadPolicy {
    fn default() -> Self {
        Self {
            stable_reads: 3,
            max_attempts: 20,
            settle: Duration::from_secs(2),
        }
    }
}

impl LazyLoadPolicy {
    pub fn from_scan_config(config: &ScanConfig) -> Self {
        Self {
            stable_reads: config.stable_reads,
            max_attempts: config.max_scroll_attempts,
            settle: config.scroll_settle(),
        }
    }
}

/// References found in the grid and how to open the first one
#[derive(Debug, Clone, PartialEq)]
pub struct Enumeration {
    pub references: Vec<ImageReference>,
    /// Selector whose elements the references came from
    pub selector: &'static str,
    /// Index among `selector` matches of the element to click to open the
    /// lightbox on the first reference
    pub entry_index: usize,
}

impl Enumeration {
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

pub struct GalleryEnumerator {
    policy: LazyLoadPolicy,
}

impl GalleryEnumerator {
    pub fn new(policy: LazyLoadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LazyLoadPolicy {
        &self.policy
    }

    /// Scroll to the bottom until the image count stops changing.
    ///
    /// Returns the last count seen. Always terminates within
    /// `max_attempts` scrolls.
    pub fn load_all<P, C>(&self, page: &P, clock: &C) -> Result<usize, BrowserError>
    where
        P: Page + ?Sized,
        C: Clock + ?Sized,
    {
        log::info!("Loading all images...");

        let mut count = page.count(GRID_SELECTOR)?;
        let mut unchanged = 0;

        for attempt in 1..=self.policy.max_attempts {
            if unchanged >= self.policy.stable_reads {
                break;
            }

            page.scroll_to_bottom()?;
            clock.sleep(self.policy.settle);

            let current = page.count(GRID_SELECTOR)?;
            if current == count {
                unchanged += 1;
            } else {
                log::debug!("Scroll {}: {} -> {} images", attempt, count, current);
                unchanged = 0;
                count = current;
            }
        }

        log::info!("Lazy loading settled at {} image elements", count);
        Ok(count)
    }

    /// Load the whole grid and return its deduplicated references
    pub fn enumerate<P, C>(&self, page: &P, clock: &C) -> Result<Enumeration, BrowserError>
    where
        P: Page + ?Sized,
        C: Clock + ?Sized,
    {
        self.load_all(page, clock)?;

        let links = page.query_all(LINK_SELECTOR)?;
        let (selector, elements) = if links.is_empty() {
            log::debug!("No image links, falling back to image sources");
            (IMAGE_FALLBACK_SELECTOR, page.query_all(IMAGE_FALLBACK_SELECTOR)?)
        } else {
            (LINK_SELECTOR, links)
        };

        let (references, entry_index) = collect_references(&elements);
        log::info!("Found {} unique images", references.len());

        Ok(Enumeration {
            references,
            selector,
            entry_index: entry_index.unwrap_or(0),
        })
    }
}

/// Deduplicate elements into references, keyed by detail link when present
/// and by image source otherwise. Also returns the element index of the
/// first reference.
pub fn collect_references(elements: &[ElementInfo]) -> (Vec<ImageReference>, Option<usize>) {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    let mut first = None;

    for (index, element) in elements.iter().enumerate() {
        let identity = match (&element.href, &element.src) {
            (Some(href), _) if href.contains("/i-") => (href.clone(), ReferenceKind::Link),
            (_, Some(src)) if !src.is_empty() => (src.clone(), ReferenceKind::Source),
            _ => continue,
        };

        if !seen.insert(identity.0.clone()) {
            continue;
        }

        first.get_or_insert(index);
        references.push(ImageReference {
            key: identity.0,
            kind: identity.1,
            position: references.len() + 1,
        });
    }

    (references, first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Snapshot, SnapshotPage};
    use crate::clock::ManualClock;

    fn link(href: &str) -> ElementInfo {
        ElementInfo {
            href: Some(href.to_string()),
            ..ElementInfo::default()
        }
    }

    fn image(src: &str) -> ElementInfo {
        ElementInfo {
            src: Some(src.to_string()),
            ..ElementInfo::default()
        }
    }

    #[test]
    fn test_collect_dedupes_and_numbers() {
        let elements = vec![
            ElementInfo::default(),
            link("/g/i-aaa"),
            link("/g/i-bbb"),
            link("/g/i-aaa"),
            image("https://photos.smugmug.com/c.jpg"),
        ];
        let (refs, first) = collect_references(&elements);

        assert_eq!(first, Some(1));
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].key, "/g/i-aaa");
        assert_eq!(refs[1].position, 2);
        assert_eq!(refs[2].kind, ReferenceKind::Source);
        assert_eq!(refs[2].position, 3);
    }

    #[test]
    fn test_link_without_image_marker_uses_src() {
        let elements = vec![ElementInfo {
            href: Some("/about".to_string()),
            src: Some("https://photos.smugmug.com/d.jpg".to_string()),
            ..ElementInfo::default()
        }];
        let (refs, _) = collect_references(&elements);
        assert_eq!(refs[0].kind, ReferenceKind::Source);
    }

    #[test]
    fn test_empty_grid_is_empty_enumeration() {
        let page = SnapshotPage::new(vec![Snapshot::new(
            "https://example.com/g",
            "<html><body><p>Private gallery</p></body></html>",
        )]);
        let clock = ManualClock::new();
        let enumeration = GalleryEnumerator::new(LazyLoadPolicy::default())
            .enumerate(&page, &clock)
            .unwrap();

        assert!(enumeration.is_empty());
        // Count never changes, so exactly `stable_reads` scrolls happen
        assert_eq!(clock.sleep_count(), 3);
    }

    #[test]
    fn test_image_fallback() {
        let page = SnapshotPage::new(vec![Snapshot::new(
            "https://example.com/g",
            r#"<html><body>
                <div class="sm-tile"><img src="https://cdn.example.com/1.jpg"></div>
                <div class="sm-tile"><img src="https://cdn.example.com/2.jpg"></div>
            </body></html>"#,
        )]);
        let policy = LazyLoadPolicy {
            settle: Duration::ZERO,
            ..LazyLoadPolicy::default()
        };
        let enumeration = GalleryEnumerator::new(policy)
            .enumerate(&page, &ManualClock::new())
            .unwrap();

        assert_eq!(enumeration.selector, IMAGE_FALLBACK_SELECTOR);
        assert_eq!(enumeration.len(), 2);
    }
}
