use serde::{Deserialize, Serialize};

/// Unit system used to scale velocities and displacements of motions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnitSystem {
    #[default]
    Metric,
    English,
}

impl UnitSystem {
    /// Gravitational acceleration in m/s² or ft/s².
    pub fn gravity(&self) -> f64 {
        match self {
            UnitSystem::Metric => 9.80665,
            UnitSystem::English => 32.174,
        }
    }

    /// Converts g-based time series into cm/s (metric) or in/s (English).
    pub fn ts_conv(&self) -> f64 {
        match self {
            UnitSystem::Metric => self.gravity() * 100.0,
            UnitSystem::English => self.gravity() * 12.0,
        }
    }

    pub fn vel_ts_label(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "cm/s",
            UnitSystem::English => "in/s",
        }
    }
}
