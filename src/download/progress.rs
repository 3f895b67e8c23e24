use std::time::{Duration, Instant};

const MIB: f64 = 1024.0 * 1024.0;
const BAR_WIDTH: usize = 30;
pub const REPORT_EVERY: Duration = Duration::from_secs(2);

/// Throttled progress reporting for a single transfer.
pub struct Progress {
    started: Instant,
    last_report: Instant,
    resumed_from: u64,
    downloaded: u64,
    total: u64,
}

impl Progress {
    pub fn new(resumed_from: u64, total: u64) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_report: now,
            resumed_from,
            downloaded: resumed_from,
            total,
        }
    }

    pub fn advance(&mut self, bytes: u64) {
        self.downloaded += bytes;

        if self.total > 0 && self.last_report.elapsed() >= REPORT_EVERY {
            self.last_report = Instant::now();
            tracing::info!("{}", self.line(self.started.elapsed()));
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn finish(&self) {
        if self.total == 0 {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            tracing::info!(
                "Download completed: {:.1}MB in {:.1}s ({:.1}MB/s)",
                self.downloaded as f64 / MIB,
                elapsed,
                (self.downloaded - self.resumed_from) as f64 / MIB / elapsed
            );
        }
    }

    fn line(&self, elapsed: Duration) -> String {
        // speed only counts bytes fetched in this session, not the resumed prefix
        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 {
            (self.downloaded - self.resumed_from) as f64 / secs
        } else {
            0.0
        };

        let eta = if speed > 0.0 {
            format_eta(self.total.saturating_sub(self.downloaded) as f64 / speed)
        } else {
            "--:--".to_string()
        };

        let ratio = (self.downloaded as f64 / self.total as f64).min(1.0);
        let filled = (BAR_WIDTH as f64 * ratio) as usize;

        format!(
            "Downloading: [{}{}] {:5.1}% | {:.1}/{:.1} MB | {:.1} MB/s | ETA: {}",
            "=".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            ratio * 100.0,
            self.downloaded as f64 / MIB,
            self.total as f64 / MIB,
            speed / MIB,
            eta
        )
    }
}

/// Minutes and seconds of the remaining time, wrapping past an hour.
fn format_eta(seconds: f64) -> String {
    let secs = seconds as u64 % 3600;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
