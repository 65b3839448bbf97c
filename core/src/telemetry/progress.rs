use std::sync::Mutex;

/// Snapshot of the spectral matching loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    pub iteration: usize,
    pub max_iterations: usize,
    pub rmse: f64,
}

/// Thread-safe progress of a long calculation, readable from another thread.
#[derive(Debug)]
pub struct ProgressRecorder {
    inner: Mutex<Progress>,
}

impl ProgressRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Progress::default()),
        }
    }

    pub fn start(&self, max_iterations: usize) {
        if let Ok(mut progress) = self.inner.lock() {
            *progress = Progress {
                iteration: 0,
                max_iterations,
                rmse: 1.0,
            };
        }
    }

    pub fn record_iteration(&self, iteration: usize, rmse: f64) {
        if let Ok(mut progress) = self.inner.lock() {
            progress.iteration = iteration;
            progress.rmse = rmse;
        }
    }

    pub fn snapshot(&self) -> Progress {
        self.inner.lock().map(|p| *p).unwrap_or_default()
    }
}

impl Default for ProgressRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn snapshot_reflects_latest_iteration() {
        let recorder = Arc::new(ProgressRecorder::new());
        recorder.start(30);
        let writer = Arc::clone(&recorder);
        std::thread::spawn(move || writer.record_iteration(4, 0.02))
            .join()
            .unwrap();
        let progress = recorder.snapshot();
        assert_eq!(progress.iteration, 4);
        assert_eq!(progress.max_iterations, 30);
        assert!((progress.rmse - 0.02).abs() < 1e-12);
    }
}
