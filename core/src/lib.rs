//! Random-vibration-theory ground-motion core.
//!
//! Converts Fourier amplitude spectra into expected peak responses through
//! extreme-value statistics, builds frequency-domain motions from user tables,
//! point-source theory or a target response spectrum, and runs time-domain
//! motions through FFT-based oscillator filtering.

pub mod crustal;
pub mod math;
pub mod motion;
pub mod peak;
pub mod prelude;
pub mod telemetry;
pub mod units;

pub use prelude::{
    CancellationToken, Motion, MotionError, MotionResult, Oscillator, Region, Scenario,
};
