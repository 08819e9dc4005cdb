use std::path::{Path, PathBuf};
use std::time::Duration;

use super::comments::{CommentExtractor, ReviewerMatcher};
use super::enumerate::{GalleryEnumerator, LazyLoadPolicy};
use super::filename::{FilenameResolver, ResolvedFilename};
use super::lightbox::{CommentInspector, LightboxWalker};
use super::{probe, ScanError};
use crate::browser::{Page, KEY_ENTER};
use crate::clock::{poll_until, Clock};
use crate::config::{Config, ReviewerConfig, ScanConfig};
use crate::metrics::ScanMetrics;
use crate::models::{CommentRecord, GalleryTarget, ScanResult};
use crate::report::{ReportKind, ReportWriter};

pub const PASSWORD_SELECTOR: &str = r#"input[type="password"]"#;
pub const SUBMIT_SELECTORS: &[&str] = &[r#"button[type="submit"], input[type="submit"]"#];
/// Any of these means the gallery grid has started rendering
pub const READY_SELECTOR: &str = "img, .sm-tile, .sm-gallery-image";

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const EMPTY_GALLERY_SCREENSHOT: &str = "debug_gallery.png";
const ERROR_SCREENSHOT: &str = "debug_error.png";

/// What a gallery scan produced
#[derive(Debug)]
pub struct ScanOutcome {
    pub results: Vec<ScanResult>,
    pub report_path: PathBuf,
    pub images_found: usize,
    /// False when the session stopped early; the report then holds only the
    /// results found before the error
    pub completed: bool,
    pub error: Option<String>,
    pub metrics: Option<ScanMetrics>,
}

/// What the comment and filename probes see on one page
#[derive(Debug)]
pub struct PageInspection {
    pub comment_selector_counts: Vec<(String, Option<usize>)>,
    pub comments: Vec<CommentRecord>,
    pub filename: ResolvedFilename,
}

/// Runs one scan of one gallery over a [`Page`]
pub struct GalleryScanner {
    scan: ScanConfig,
    reviewer: ReviewerConfig,
    output_dir: PathBuf,
}

impl GalleryScanner {
    pub fn new(config: &Config) -> Self {
        Self {
            scan: config.scan.clone(),
            reviewer: config.reviewer.clone(),
            output_dir: config.output.dir.clone(),
        }
    }

    pub fn with_scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn inspector(&self) -> Result<CommentInspector, ScanError> {
        let matcher = ReviewerMatcher::new(&self.reviewer.name, self.reviewer.match_mode)?;
        let extractor = CommentExtractor::new(matcher).with_settle(self.scan.comment_settle());
        let resolver = FilenameResolver::new(self.scan.overlay_min_top, self.scan.site_title.clone())?;
        Ok(CommentInspector::new(extractor, resolver, self.scan.panel_settle()))
    }

    /// Scan `target` and write its report.
    ///
    /// Only report creation and invalid reviewer settings are errors. A
    /// failure during the browser session is logged, a debug screenshot is
    /// attempted, and the partial outcome is returned with `completed` unset.
    pub fn scan(
        &self,
        page: &dyn Page,
        clock: &dyn Clock,
        target: &GalleryTarget,
    ) -> Result<ScanOutcome, ScanError> {
        let mut inspector = self.inspector()?;
        let mut report = ReportWriter::create(
            &self.output_dir,
            &target.label,
            Some(&target.url),
            ReportKind::WebScrape,
        )?;

        let mut images_found = 0;
        match self.run_session(page, clock, target, &mut inspector, &mut report, &mut images_found) {
            Ok((results, metrics)) => {
                log::info!("Scan complete! Found {} images with comments", results.len());
                let report_path = report.finalize()?;
                Ok(ScanOutcome {
                    results,
                    report_path,
                    images_found,
                    completed: true,
                    error: None,
                    metrics,
                })
            }
            Err(e) => {
                log::error!("Error during scraping: {}", e);
                self.save_screenshot(page, ERROR_SCREENSHOT);
                Ok(ScanOutcome {
                    results: report.results().to_vec(),
                    report_path: report.path().to_path_buf(),
                    images_found,
                    completed: false,
                    error: Some(e.to_string()),
                    metrics: None,
                })
            }
        }
    }

    fn run_session(
        &self,
        page: &dyn Page,
        clock: &dyn Clock,
        target: &GalleryTarget,
        inspector: &mut CommentInspector,
        report: &mut ReportWriter,
        images_found: &mut usize,
    ) -> Result<(Vec<ScanResult>, Option<ScanMetrics>), ScanError> {
        log::info!("Navigating to gallery: {}", target.url);
        page.goto(&target.url)?;
        clock.sleep(self.scan.page_settle());

        self.unlock(page, clock, target)?;

        let ready = poll_until(clock, self.scan.gallery_ready_timeout(), READY_POLL_INTERVAL, || {
            page.count(READY_SELECTOR).map(|n| n > 0).unwrap_or(false)
        });
        if !ready {
            log::warn!(
                "Gallery not ready after {:?}, scanning anyway",
                self.scan.gallery_ready_timeout()
            );
        }

        let enumerator = GalleryEnumerator::new(LazyLoadPolicy::from_scan_config(&self.scan));
        let enumeration = enumerator.enumerate(page, clock)?;
        *images_found = enumeration.len();

        if enumeration.is_empty() {
            log::error!("No image elements found. The gallery structure may be different than expected.");
            self.save_screenshot(page, EMPTY_GALLERY_SCREENSHOT);
            return Ok((Vec::new(), None));
        }

        let walker = LightboxWalker::new(self.scan.page_settle(), self.scan.navigation_settle());
        walker.enter(page, clock, &enumeration)?;
        let (results, metrics) = walker.walk(page, clock, enumeration.len(), inspector, report);
        Ok((results, Some(metrics)))
    }

    /// Fill the password form when the gallery shows one
    fn unlock(&self, page: &dyn Page, clock: &dyn Clock, target: &GalleryTarget) -> Result<(), ScanError> {
        if page.count(PASSWORD_SELECTOR)? == 0 {
            return Ok(());
        }

        let Some(password) = target.password.as_deref() else {
            log::warn!("Gallery asks for a password but none is configured");
            return Ok(());
        };

        log::info!("Password required - entering password...");
        page.fill(PASSWORD_SELECTOR, password)?;
        match probe::first_present(page, SUBMIT_SELECTORS) {
            Some(selector) => page.click(selector, 0)?,
            None => page.press_key(KEY_ENTER)?,
        }
        clock.sleep(self.scan.page_settle());
        Ok(())
    }

    fn save_screenshot(&self, page: &dyn Page, name: &str) {
        let path = self.output_dir.join(name);
        match page.screenshot(&path) {
            Ok(()) => log::info!("Debug screenshot saved to {}", path.display()),
            Err(e) => log::warn!("Could not save debug screenshot: {}", e),
        }
    }

    /// Run the comment and filename probes against the page as it is now
    pub fn inspect_page(&self, page: &dyn Page, clock: &dyn Clock) -> Result<PageInspection, ScanError> {
        let inspector = self.inspector()?;
        let comment_selector_counts = probe::survey(page, inspector.extractor().selectors());
        let comments = inspector.extractor().extract(page, clock)?;
        let filename = inspector.resolver().resolve(page);

        Ok(PageInspection {
            comment_selector_counts,
            comments,
            filename,
        })
    }
}
