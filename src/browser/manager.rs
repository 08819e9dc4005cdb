use super::config::BrowserConfig;
use super::scraper::BrowserScraper;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;

/// Owns the Chrome process for one scan. Dropping it closes the browser,
/// including when the scan bails out with an error.
pub struct BrowserManager {
    browser: Browser,
    config: BrowserConfig,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Result<Self, BrowserError> {
        let args = config.chrome_args();
        let options = launch_options(&config, &args)?;

        log::info!(
            "Launching Chrome ({}, {}x{})",
            if config.headless { "headless" } else { "visible" },
            config.window_size.0,
            config.window_size.1
        );

        let browser = Browser::new(options).map_err(|e| BrowserError::InitializationError(e.to_string()))?;
        Ok(Self { browser, config })
    }

    /// Open a tab with the configured timeout and viewport
    pub fn new_page(&self) -> Result<BrowserScraper, BrowserError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| BrowserError::TabCreationError(e.to_string()))?;

        let (width, height) = self.config.window_size;
        tab.set_default_timeout(self.config.timeout);
        tab.set_bounds(Bounds::Normal {
            left: Some(0),
            top: Some(0),
            width: Some(f64::from(width)),
            height: Some(f64::from(height)),
        })
        .map_err(|e| BrowserError::TabCreationError(format!("Could not size tab: {}", e)))?;

        Ok(BrowserScraper::new(tab))
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

impl Drop for BrowserManager {
    fn drop(&mut self) {
        log::debug!("Closing Chrome");
    }
}

fn launch_options<'a>(config: &BrowserConfig, args: &'a [String]) -> Result<LaunchOptions<'a>, BrowserError> {
    LaunchOptions::default_builder()
        .headless(config.headless)
        .window_size(Some(config.window_size))
        .idle_browser_timeout(config.idle_timeout)
        .args(args.iter().map(OsStr::new).collect())
        .build()
        .map_err(|e| BrowserError::ConfigurationError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Could not launch Chrome: {0}")]
    InitializationError(String),

    #[error("Invalid launch options: {0}")]
    ConfigurationError(String),

    #[error("Could not open tab: {0}")]
    TabCreationError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Input failed: {0}")]
    InputError(String),

    #[error("Script failed: {0}")]
    JavaScriptError(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotError(String),
}
