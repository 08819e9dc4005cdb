use std::time::Duration;

use super::comments::CommentExtractor;
use super::enumerate::Enumeration;
use super::filename::FilenameResolver;
use super::probe;
use super::ScanError;
use crate::browser::{Page, KEY_NEXT};
use crate::clock::Clock;
use crate::metrics::ScanMetrics;
use crate::models::ScanResult;
use crate::report::ResultSink;

/// Controls that open the comments panel, most specific first
pub const COMMENT_TOGGLE_SELECTORS: &[&str] = &[
    r#"button[aria-label*="omment"]"#,
    r#"[data-testid*="comment"]"#,
    ".sm-lightbox-comments-button",
    r#"[class*="comment"]"#,
];

/// Work done on the lightbox view at one position
pub trait ImageInspector {
    /// `Ok(None)` means the image has no reviewer comments
    fn inspect(
        &mut self,
        page: &dyn Page,
        clock: &dyn Clock,
        position: usize,
    ) -> Result<Option<ScanResult>, ScanError>;
}

/// Steps through the lightbox one image at a time
pub struct LightboxWalker {
    entry_settle: Duration,
    navigation_settle: Duration,
}

impl LightboxWalker {
    pub fn new(entry_settle: Duration, navigation_settle: Duration) -> Self {
        Self {
            entry_settle,
            navigation_settle,
        }
    }

    /// Open the lightbox on the first enumerated image
    pub fn enter(
        &self,
        page: &dyn Page,
        clock: &dyn Clock,
        enumeration: &Enumeration,
    ) -> Result<(), ScanError> {
        log::info!("Opening lightbox on the first image...");
        page.click(enumeration.selector, enumeration.entry_index)?;
        clock.sleep(self.entry_settle);
        Ok(())
    }

    /// Visit positions `1..=total` in order.
    ///
    /// A failing position is logged and skipped over; the walk always
    /// advances to the next image so every position is visited exactly once.
    pub fn walk(
        &self,
        page: &dyn Page,
        clock: &dyn Clock,
        total: usize,
        inspector: &mut dyn ImageInspector,
        sink: &mut dyn ResultSink,
    ) -> (Vec<ScanResult>, ScanMetrics) {
        let mut results = Vec::new();
        let mut metrics = ScanMetrics::new();

        for position in 1..=total {
            log::info!("Checking image {}/{}", position, total);
            let started = clock.elapsed();

            match inspector.inspect(page, clock, position) {
                Ok(Some(result)) => {
                    metrics.record_checked(clock.elapsed().saturating_sub(started), true);
                    log::info!("  Image {} has comments: {}", position, result.filename);
                    if let Err(e) = sink.record(&result) {
                        log::error!("  Failed to save {}: {}", result.filename, e);
                        metrics.record_write_failure(e.to_string());
                    }
                    results.push(result);
                }
                Ok(None) => {
                    metrics.record_checked(clock.elapsed().saturating_sub(started), false);
                }
                Err(e) => {
                    log::warn!("  Error checking image {}: {}", position, e);
                    metrics.record_failure(clock.elapsed().saturating_sub(started), e.to_string());
                }
            }

            if position < total {
                if let Err(e) = page.press_key(KEY_NEXT) {
                    log::warn!("  Failed to advance past image {}: {}", position, e);
                }
                clock.sleep(self.navigation_settle);
            }
        }

        metrics.finish();
        metrics.log_summary();
        log::debug!("Walk metrics: {}", metrics.export_json());
        (results, metrics)
    }
}

/// Reveals the comments panel, extracts reviewer comments and, for
/// commented images, resolves the filename
pub struct CommentInspector {
    toggle_selectors: Vec<String>,
    panel_settle: Duration,
    extractor: CommentExtractor,
    resolver: FilenameResolver,
}

impl CommentInspector {
    pub fn new(extractor: CommentExtractor, resolver: FilenameResolver, panel_settle: Duration) -> Self {
        Self {
            toggle_selectors: COMMENT_TOGGLE_SELECTORS.iter().map(|s| s.to_string()).collect(),
            panel_settle,
            extractor,
            resolver,
        }
    }

    pub fn extractor(&self) -> &CommentExtractor {
        &self.extractor
    }

    pub fn resolver(&self) -> &FilenameResolver {
        &self.resolver
    }

    /// Click the first comments control present. Returns whether one was
    /// clicked; a missing control is normal.
    pub fn reveal_comments(&self, page: &dyn Page, clock: &dyn Clock) -> bool {
        let Some(selector) = probe::first_present(page, self.toggle_selectors.as_slice()) else {
            log::debug!("    No comments control found");
            return false;
        };

        match page.click(selector, 0) {
            Ok(()) => {
                log::debug!("    Opened comments with {}", selector);
                clock.sleep(self.panel_settle);
                true
            }
            Err(e) => {
                log::debug!("    Comments control {} not clickable: {}", selector, e);
                false
            }
        }
    }
}

impl ImageInspector for CommentInspector {
    fn inspect(
        &mut self,
        page: &dyn Page,
        clock: &dyn Clock,
        position: usize,
    ) -> Result<Option<ScanResult>, ScanError> {
        self.reveal_comments(page, clock);

        let comments = self.extractor.extract(page, clock)?;
        if comments.is_empty() {
            return Ok(None);
        }

        let filename = self.resolver.resolve(page);
        log::debug!("    Filename via {}", filename.method);
        Ok(ScanResult::new(filename.name, comments, position))
    }
}
