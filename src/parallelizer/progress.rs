use tracing::info;

/// Observes dispatch progress; called from the draining task only.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);
}

/// Discards progress.
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Logs at every 10% step and on completion.
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ProgressObserver for LogProgress {
    fn on_progress(&self, completed: usize, total: usize) {
        if total == 0 || completed == 0 {
            return;
        }
        let step = completed * 10 / total;
        let previous = (completed - 1) * 10 / total;
        if step != previous || completed == total {
            info!(
                task = self.label.as_str(),
                completed,
                total,
                "{}% of API calls done",
                completed * 100 / total
            );
        }
    }
}
