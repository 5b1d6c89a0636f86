use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar on stderr, shown while results are buffered for sorted output.
pub struct ProgressMonitor {
    bar: ProgressBar,
    enabled: bool,
    failed: u64,
}

impl ProgressMonitor {
    /// Create a new progress monitor
    ///
    /// # Arguments
    ///
    /// * `total_targets` - Number of results expected
    /// * `enabled` - Whether to draw anything (off when stderr is not a tty)
    pub fn new(total_targets: usize, enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
                enabled: false,
                failed: 0,
            };
        }

        let bar = ProgressBar::with_draw_target(
            Some(total_targets as u64),
            ProgressDrawTarget::stderr(),
        );
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} targets {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }

        Self {
            bar,
            enabled: true,
            failed: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one finished target.
    pub fn complete_target(&mut self, label: &str, success: bool) {
        if !self.enabled {
            return;
        }

        if !success {
            self.failed += 1;
            self.bar.set_message(format!("({} failed)", self.failed));
        }
        self.bar.inc(1);
        tracing::trace!(target_label = label, success, "progress");
    }

    /// Remove the bar so buffered output starts on a clean line.
    pub fn clear(&self) {
        if self.enabled {
            self.bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        if self.enabled && !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_monitor_disabled() {
        let mut monitor = ProgressMonitor::new(3, false);

        // Should not panic when disabled
        monitor.complete_target("z1", true);
        monitor.complete_target("z2", false);
        monitor.clear();
        assert!(!monitor.is_enabled());
    }

    #[test]
    fn test_progress_monitor_enabled() {
        let mut monitor = ProgressMonitor::new(2, true);

        monitor.complete_target("z1", true);
        monitor.complete_target("z2", false);
        assert_eq!(monitor.failed, 1);
        monitor.clear();
    }
}
