/// Lazy-loading enumeration tests
/// A scripted page reveals more images on every scroll until it runs out

use client_selection::browser::{BrowserError, ElementInfo, Page};
use client_selection::clock::{Clock, ManualClock};
use client_selection::gallery::{GalleryEnumerator, LazyLoadPolicy};
use client_selection::models::ReferenceKind;
use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Grid that shows `step` more images per scroll, up to `total`. Every image
/// appears as a thumbnail and as two identical links.
struct LazyGrid {
    loaded: Cell<usize>,
    total: usize,
    step: usize,
    /// Scroll numbers (1-based) on which nothing new loads
    stalls: Vec<usize>,
    scrolls: Cell<usize>,
}

impl LazyGrid {
    fn new(initial: usize, step: usize, total: usize) -> Self {
        Self {
            loaded: Cell::new(initial.min(total)),
            total,
            step,
            stalls: Vec::new(),
            scrolls: Cell::new(0),
        }
    }

    fn stalling_on(mut self, stalls: Vec<usize>) -> Self {
        self.stalls = stalls;
        self
    }

    fn links(&self) -> Vec<ElementInfo> {
        (0..self.loaded.get())
            .flat_map(|i| {
                let link = ElementInfo {
                    href: Some(format!("/Gallery/i-{:04}", i)),
                    ..ElementInfo::default()
                };
                vec![link.clone(), link]
            })
            .collect()
    }

    fn thumbnails(&self) -> Vec<ElementInfo> {
        (0..self.loaded.get())
            .map(|i| ElementInfo {
                src: Some(format!("https://photos.smugmug.com/{:04}-Th.jpg", i)),
                ..ElementInfo::default()
            })
            .collect()
    }
}

impl Page for LazyGrid {
    fn goto(&self, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    fn current_url(&self) -> Result<String, BrowserError> {
        Ok("https://example.com/Gallery".to_string())
    }

    fn title(&self) -> Result<String, BrowserError> {
        Ok("Gallery".to_string())
    }

    fn body_text(&self) -> Result<String, BrowserError> {
        Ok(String::new())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>, BrowserError> {
        match selector {
            r#"a[href*="/i-"]"# => Ok(self.links()),
            r#"a[href*="/i-"], img[src*="smugmug"]"# => {
                let mut all = self.links();
                all.extend(self.thumbnails());
                Ok(all)
            }
            _ => Ok(self.thumbnails()),
        }
    }

    fn click(&self, _selector: &str, _index: usize) -> Result<(), BrowserError> {
        Ok(())
    }

    fn fill(&self, _selector: &str, _value: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    fn press_key(&self, _key: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.scrolls.set(self.scrolls.get() + 1);
        if !self.stalls.contains(&self.scrolls.get()) {
            self.loaded.set(self.loaded.get().saturating_add(self.step).min(self.total));
        }
        Ok(())
    }

    fn screenshot(&self, _path: &Path) -> Result<(), BrowserError> {
        Err(BrowserError::ScreenshotError("not rendered".to_string()))
    }
}

fn enumerator(stable_reads: u32, max_attempts: u32) -> GalleryEnumerator {
    GalleryEnumerator::new(LazyLoadPolicy {
        stable_reads,
        max_attempts,
        settle: Duration::from_millis(100),
    })
}

#[test]
fn test_enumerates_every_image_once() {
    // 268 images arriving 40 per scroll are all loaded after 6 scrolls
    let grid = LazyGrid::new(40, 40, 268);
    let enumeration = enumerator(3, 20).enumerate(&grid, &ManualClock::new()).unwrap();

    assert_eq!(enumeration.len(), 268);
    let keys: HashSet<&str> = enumeration.references.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys.len(), 268);
    assert!(enumeration
        .references
        .iter()
        .all(|r| r.kind == ReferenceKind::Link));
    assert_eq!(
        enumeration.references.iter().map(|r| r.position).collect::<Vec<_>>(),
        (1..=268).collect::<Vec<_>>()
    );

    // 6 growing scrolls, then 3 unchanged reads
    assert_eq!(grid.scrolls.get(), 6 + 3);
}

#[test]
fn test_terminates_for_every_small_gallery() {
    for total in 0..12 {
        let grid = LazyGrid::new(2, 3, total);
        let enumeration = enumerator(3, 20).enumerate(&grid, &ManualClock::new()).unwrap();
        assert_eq!(enumeration.len(), total, "gallery of {}", total);
    }
}

#[test]
fn test_scroll_ceiling_bounds_endless_loading() {
    let grid = LazyGrid::new(0, 5, usize::MAX);
    let clock = ManualClock::new();
    let enumeration = enumerator(3, 20).enumerate(&grid, &clock).unwrap();

    assert_eq!(grid.scrolls.get(), 20);
    assert_eq!(enumeration.len(), 100);
    assert_eq!(clock.elapsed(), Duration::from_secs(2));
}

#[test]
fn test_unchanged_streak_resets_on_growth() {
    // The first scroll loads nothing; growth afterwards must restart the count
    let grid = LazyGrid::new(10, 10, 30).stalling_on(vec![1]);
    let enumeration = enumerator(2, 20).enumerate(&grid, &ManualClock::new()).unwrap();

    assert_eq!(enumeration.len(), 30);
    // stall, two growing scrolls, two unchanged reads
    assert_eq!(grid.scrolls.get(), 5);
}
