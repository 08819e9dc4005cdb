//! Counters for one gallery walk: positions checked, positions with
//! reviewer comments, and failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub images_checked: u64,
    pub images_with_comments: u64,
    pub failed_images: u64,
    /// Results found but not appended to the report
    pub write_failures: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub total_image_time_ms: u64,
    pub average_image_time_ms: f64,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// A position that was inspected without error
    pub fn record_checked(&mut self, elapsed: Duration, commented: bool) {
        self.images_checked += 1;
        if commented {
            self.images_with_comments += 1;
        }
        self.record_time(elapsed);
    }

    pub fn record_failure(&mut self, elapsed: Duration, error: String) {
        self.images_checked += 1;
        self.failed_images += 1;
        self.last_error = Some(error);
        self.record_time(elapsed);
    }

    pub fn record_write_failure(&mut self, error: String) {
        self.write_failures += 1;
        self.last_error = Some(error);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Share of checked images that did not fail, in percent
    pub fn success_rate(&self) -> f64 {
        if self.images_checked == 0 {
            0.0
        } else {
            ((self.images_checked - self.failed_images) as f64 / self.images_checked as f64) * 100.0
        }
    }

    fn record_time(&mut self, elapsed: Duration) {
        self.total_image_time_ms += elapsed.as_millis() as u64;
        self.average_image_time_ms = self.total_image_time_ms as f64 / self.images_checked as f64;
    }

    pub fn log_summary(&self) {
        log::info!(
            "Walk finished - Checked: {} - With comments: {} - Failed: {} - Success rate: {:.2}% - Avg time: {:.0}ms",
            self.images_checked,
            self.images_with_comments,
            self.failed_images,
            self.success_rate(),
            self.average_image_time_ms
        );
        if self.write_failures > 0 {
            log::warn!("{} result(s) could not be written to the report", self.write_failures);
        }
        if let Some(last_error) = &self.last_error {
            log::warn!("Last error: {}", last_error);
        }
    }

    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ScanMetrics::new();
        assert_eq!(metrics.images_checked, 0);
        assert_eq!(metrics.success_rate(), 0.0);
        assert!(metrics.started_at.is_some());
    }

    #[test]
    fn test_success_rate_calculation() {
        let mut metrics = ScanMetrics::new();

        metrics.record_checked(Duration::from_millis(100), true);
        metrics.record_checked(Duration::from_millis(200), false);
        metrics.record_failure(Duration::from_millis(300), "Error".to_string());

        assert_eq!(metrics.images_checked, 3);
        assert_eq!(metrics.images_with_comments, 1);
        assert_eq!(metrics.failed_images, 1);
        assert!((metrics.success_rate() - 66.66).abs() < 0.1);
        assert_eq!(metrics.average_image_time_ms, 200.0);
        assert_eq!(metrics.last_error, Some("Error".to_string()));
    }

    #[test]
    fn test_write_failure_not_counted_as_image() {
        let mut metrics = ScanMetrics::new();
        metrics.record_write_failure("disk full".to_string());
        assert_eq!(metrics.images_checked, 0);
        assert_eq!(metrics.write_failures, 1);
    }

    #[test]
    fn test_export_json() {
        let mut metrics = ScanMetrics::new();
        metrics.record_checked(Duration::from_millis(10), true);
        let json = metrics.export_json();
        assert!(json.contains("\"images_with_comments\": 1"));
    }
}
