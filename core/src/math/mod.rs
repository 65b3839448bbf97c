pub mod fft;
pub mod grid;
pub mod interp;
pub mod matrix;
pub mod quad;
pub mod stats;

pub use fft::FftHelper;
pub use grid::{FrequencyGrid, Spacing};
pub use interp::CubicSpline;
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
