pub mod log;
pub mod progress;

pub use log::LogManager;
pub use progress::{Progress, ProgressRecorder};
