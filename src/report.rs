//! Append-only text report of commented images.
//!
//! The header is written when the report is created and every result is
//! appended and synced as soon as it is recorded, so the file stays readable
//! if the run dies before [`ReportWriter::finalize`].

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::models::ScanResult;

const RULE_WIDTH: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to create report {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("Failed to write report {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Which acquisition path produced the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    WebScrape,
    Api,
}

/// Destination for results as they are found
pub trait ResultSink {
    fn record(&mut self, result: &ScanResult) -> Result<(), ReportError>;
}

impl ResultSink for Vec<ScanResult> {
    fn record(&mut self, result: &ScanResult) -> Result<(), ReportError> {
        self.push(result.clone());
        Ok(())
    }
}

pub struct ReportWriter {
    path: PathBuf,
    file: File,
    kind: ReportKind,
    results: Vec<ScanResult>,
}

/// Keep alphanumerics, space, `-` and `_`
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "gallery".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `commented_images_<label>[_webscrape]_<YYYYmmdd_HHMMSS>`, without extension
pub fn report_stem(label: &str, kind: ReportKind, stamp: &str) -> String {
    let label = sanitize_label(label);
    match kind {
        ReportKind::WebScrape => format!("commented_images_{}_webscrape_{}", label, stamp),
        ReportKind::Api => format!("commented_images_{}_{}", label, stamp),
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl ReportWriter {
    /// Create the output directory and a fresh report file with its header.
    ///
    /// `source_url` is the gallery URL for web scrapes and the album URL (if
    /// known) for API runs.
    pub fn create(
        dir: &Path,
        label: &str,
        source_url: Option<&str>,
        kind: ReportKind,
    ) -> Result<Self, ReportError> {
        fs::create_dir_all(dir).map_err(|source| ReportError::Create {
            path: dir.to_path_buf(),
            source,
        })?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let stem = report_stem(label, kind, &stamp);
        let (path, file) = Self::open_unique(dir, &stem)?;

        let mut writer = Self {
            path,
            file,
            kind,
            results: Vec::new(),
        };
        writer.write_header(label, source_url)?;
        log::info!("Results will be saved to: {}", writer.path.display());
        Ok(writer)
    }

    // Two runs in the same second must not share a file
    fn open_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File), ReportError> {
        let mut suffix = 1;
        loop {
            let name = if suffix == 1 {
                format!("{}.txt", stem)
            } else {
                format!("{}_{}.txt", stem, suffix)
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
                Err(source) => return Err(ReportError::Create { path, source }),
            }
        }
    }

    fn write_header(&mut self, label: &str, source_url: Option<&str>) -> Result<(), ReportError> {
        let mut header = match self.kind {
            ReportKind::WebScrape => format!("Images with Comments - {} (Web Scrape)\n", label),
            ReportKind::Api => format!("Images with Comments - {}\n", label),
        };
        header.push_str(&format!("Generated: {}\n", now()));
        if let Some(url) = source_url {
            let heading = match self.kind {
                ReportKind::WebScrape => "Gallery URL",
                ReportKind::Api => "Album URL",
            };
            header.push_str(&format!("{}: {}\n", heading, url));
        }
        header.push_str(&format!("{}\nLIVE RESULTS (written as found):\n{}\n\n", rule(), rule()));

        self.append(&header)
            .map_err(|source| ReportError::Create {
                path: self.path.clone(),
                source,
            })
    }

    fn append(&mut self, text: &str) -> io::Result<()> {
        self.file.write_all(text.as_bytes())?;
        self.file.sync_data()
    }

    /// Append the result's filename and sync before returning
    pub fn record_result(&mut self, result: &ScanResult) -> Result<(), ReportError> {
        let line = format!("{}\n", result.filename);
        self.append(&line).map_err(|source| ReportError::Write {
            path: self.path.clone(),
            source,
        })?;
        log::info!("    Saved to file: {}", result.filename);
        self.results.push(result.clone());
        Ok(())
    }

    /// Append the comment details and the closing summary
    pub fn finalize(mut self) -> Result<PathBuf, ReportError> {
        let mut tail = format!("\n{}\nCOMMENT DETAILS:\n{}\n\n", rule(), rule());
        for result in &self.results {
            tail.push_str(&format!("File: {}\n", result.filename));
            tail.push_str(&format!("Comments ({}):\n", result.comments.len()));
            for comment in &result.comments {
                let text = comment.text.replace('\n', "\n    ");
                tail.push_str(&format!("  - {}: {}\n", comment.author, text));
                if let Some(timestamp) = &comment.timestamp {
                    tail.push_str(&format!("    {}\n", timestamp));
                }
            }
            tail.push('\n');
        }

        tail.push_str(&format!("{}\nFINAL SUMMARY:\n{}\n", rule(), rule()));
        tail.push_str(&format!("Total: {} images with comments\n", self.results.len()));
        tail.push_str(&format!("Scan completed: {}\n", now()));

        self.append(&tail).map_err(|source| ReportError::Write {
            path: self.path.clone(),
            source,
        })?;
        log::info!("Final results saved to: {}", self.path.display());
        Ok(self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Results recorded so far, in order
    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }
}

impl ResultSink for ReportWriter {
    fn record(&mut self, result: &ScanResult) -> Result<(), ReportError> {
        self.record_result(result)
    }
}
