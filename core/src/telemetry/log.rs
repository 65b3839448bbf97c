use log::{debug, info, warn};

/// Thin wrapper over the `log` facade that tags every record with a component name.
#[derive(Debug, Clone)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }

    pub fn warning(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("rvtcore")
    }
}
