//! Throttled download progress reporting

use std::time::{Duration, Instant};
use tracing::info;

/// Minimum gap between two progress lines for the same download.
pub const REPORT_INTERVAL: Duration = Duration::from_millis(500);

const MB: f64 = 1024.0 * 1024.0;

/// Tracks bytes received for one asset and decides when to report.
#[derive(Debug)]
pub struct DownloadProgress {
    name: String,
    total: Option<u64>,
    downloaded: u64,
    last_pct: Option<u64>,
    last_report: Option<Instant>,
}

impl DownloadProgress {
    pub fn new(name: impl Into<String>, total: Option<u64>) -> Self {
        Self {
            name: name.into(),
            // A zero length header carries no usable total.
            total: total.filter(|t| *t > 0),
            downloaded: 0,
            last_pct: None,
            last_report: None,
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn percent(&self) -> Option<u64> {
        self.total
            .map(|total| (self.downloaded.saturating_mul(100) / total).min(100))
    }

    /// Record `bytes` more received. Returns true when a progress line was emitted.
    pub fn advance(&mut self, bytes: u64) -> bool {
        self.advance_at(bytes, Instant::now())
    }

    pub fn advance_at(&mut self, bytes: u64, now: Instant) -> bool {
        self.downloaded += bytes;
        if !self.is_due(now) {
            return false;
        }
        self.report();
        self.last_pct = self.percent();
        self.last_report = Some(now);
        true
    }

    fn is_due(&self, now: Instant) -> bool {
        let pct = self.percent();
        if pct == Some(100) && self.last_pct != Some(100) {
            return true;
        }
        if pct.is_some() && pct == self.last_pct {
            return false;
        }
        match self.last_report {
            Some(at) => now.duration_since(at) >= REPORT_INTERVAL,
            None => true,
        }
    }

    fn report(&self) {
        let mb = self.downloaded as f64 / MB;
        match (self.total, self.percent()) {
            (Some(total), Some(pct)) => info!(
                "📥 {}: {:.0}/{:.0} MB ({}%)",
                self.name,
                mb,
                total as f64 / MB,
                pct
            ),
            _ => info!("📥 {}: {:.0} MB", self.name, mb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_chunk_reports() {
        let mut p = DownloadProgress::new("model", Some(1000));
        assert!(p.advance_at(10, Instant::now()));
        assert_eq!(p.percent(), Some(1));
    }

    #[test]
    fn test_reports_are_throttled() {
        let start = Instant::now();
        let mut p = DownloadProgress::new("model", Some(10_000));
        assert!(p.advance_at(100, start));

        // Many small chunks inside the interval stay silent
        let mut emitted = 0;
        for i in 1..50 {
            if p.advance_at(100, start + Duration::from_millis(i)) {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 0);

        assert!(p.advance_at(100, start + REPORT_INTERVAL + Duration::from_millis(1)));
    }

    #[test]
    fn test_completion_always_reports_once() {
        let start = Instant::now();
        let mut p = DownloadProgress::new("voices", Some(200));
        assert!(p.advance_at(100, start));
        assert!(p.advance_at(100, start + Duration::from_millis(1)));
        assert_eq!(p.percent(), Some(100));
        assert!(!p.advance_at(0, start + Duration::from_secs(5)));
    }

    #[test]
    fn test_unknown_total() {
        let start = Instant::now();
        let mut p = DownloadProgress::new("voices", None);
        assert!(p.advance_at(1, start));
        assert!(!p.advance_at(1, start + Duration::from_millis(10)));
        assert!(p.advance_at(1, start + REPORT_INTERVAL));
        assert_eq!(p.percent(), None);
        assert_eq!(p.downloaded(), 3);
    }

    #[test]
    fn test_zero_total_treated_as_unknown() {
        let p = DownloadProgress::new("voices", Some(0));
        assert_eq!(p.total(), None);
    }
}
