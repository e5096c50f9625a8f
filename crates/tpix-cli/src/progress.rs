//! Progress reporting for downloads.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tpix_pm::resolver::DownloadObserver;
use tpix_pm::{PackageRef, ProgressUpdate};

const DOWNLOAD_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}";
const COUNTER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";

/// Progress bars shown while packages and releases download.
///
/// A disabled manager hands out hidden bars, so callers never branch on
/// `--quiet` themselves.
pub struct ProgressManager {
    multi: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled,
        }
    }

    /// Bar for a download of `total` bytes
    pub fn create_download_bar(&self, name: &str, total: u64) -> ProgressBar {
        self.add(ProgressBar::new(total), DOWNLOAD_TEMPLATE, name)
    }

    /// Spinner that shows received bytes when the size is unknown
    pub fn create_byte_counter(&self, name: &str) -> ProgressBar {
        self.add(ProgressBar::new_spinner(), COUNTER_TEMPLATE, name)
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        self.add(ProgressBar::new_spinner(), SPINNER_TEMPLATE, message)
    }

    /// Bar for a download whose size may only be known from the first update
    pub fn bar_for(&self, name: &str, update: &ProgressUpdate) -> ProgressBar {
        if update.total > 0 {
            self.create_download_bar(name, update.total)
        } else {
            self.create_byte_counter(name)
        }
    }

    fn add(&self, bar: ProgressBar, template: &str, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = self.multi.add(bar.with_style(style));
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

/// One progress bar per package fetched by the resolver
pub struct PackageProgress {
    manager: ProgressManager,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl PackageProgress {
    pub fn new(manager: ProgressManager) -> Self {
        Self {
            manager,
            bars: Mutex::new(HashMap::new()),
        }
    }
}

impl DownloadObserver for PackageProgress {
    fn progress(&self, pkg: &PackageRef, update: ProgressUpdate) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };

        let bar = bars
            .entry(pkg.key())
            .or_insert_with(|| self.manager.bar_for(&pkg.key(), &update));
        bar.set_position(update.received);
    }

    fn finished(&self, pkg: &PackageRef, success: bool) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };

        if let Some(bar) = bars.remove(&pkg.key()) {
            if success {
                bar.finish_with_message(format!("{} done", pkg));
            } else {
                bar.abandon_with_message(format!("{} failed", pkg));
            }
        }
    }
}

/// Human readable size using binary units, e.g. `1.50 KiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
