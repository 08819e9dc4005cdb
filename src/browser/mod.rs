//! Browser access for the gallery scan.
//!
//! The scan talks to a [`Page`]; two implementations exist. [`BrowserScraper`]
//! drives a headless Chrome tab, [`SnapshotPage`] answers from saved HTML.
//!
//! # Example
//!
//! ```no_run
//! use client_selection::browser::{BrowserConfig, BrowserManager, Page};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = BrowserManager::new(BrowserConfig::default())?;
//! let page = manager.new_page()?;
//!
//! page.goto("https://example.com")?;
//! let headings = page.query_all("h1")?;
//!
//! println!("Found {} headings", headings.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod page;
pub mod scraper;
pub mod snapshot;

pub use self::config::BrowserConfig;
pub use self::manager::{BrowserError, BrowserManager};
pub use self::page::{ElementInfo, Page, KEY_ENTER, KEY_NEXT};
pub use self::scraper::BrowserScraper;
pub use self::snapshot::{Snapshot, SnapshotPage};
