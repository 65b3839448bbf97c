//! Physical models feeding the source-theory motion.

pub mod amplification;
pub mod model;
pub mod path_duration;

pub use amplification::{AmplificationSource, CrustalAmplification};
pub use model::{CrustalLayer, CrustalModel};
pub use path_duration::{DurationSource, PathDurationModel};
