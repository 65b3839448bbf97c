use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    Linear,
    #[default]
    Log,
}

/// Engineering frequency (or period) axis described by its bounds, size and spacing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FrequencyGrid {
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub spacing: Spacing,
}

impl Default for FrequencyGrid {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 50.0,
            count: 1024,
            spacing: Spacing::Log,
        }
    }
}

impl FrequencyGrid {
    pub fn new(min: f64, max: f64, count: usize, spacing: Spacing) -> Self {
        Self {
            min,
            max,
            count,
            spacing,
        }
    }

    pub fn data(&self) -> Vec<f64> {
        match self.spacing {
            Spacing::Linear => lin_space(self.min, self.max, self.count),
            Spacing::Log => log_space(self.min, self.max, self.count),
        }
    }
}

pub fn lin_space(min: f64, max: f64, size: usize) -> Vec<f64> {
    match size {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let delta = (max - min) / (size - 1) as f64;
            (0..size).map(|i| min + i as f64 * delta).collect()
        }
    }
}

pub fn log_space(min: f64, max: f64, size: usize) -> Vec<f64> {
    match size {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let log_min = min.log10();
            let delta = (max.log10() - log_min) / (size - 1) as f64;
            (0..size)
                .map(|i| 10f64.powf(log_min + i as f64 * delta))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_hits_both_ends() {
        let values = log_space(0.01, 5.0, 60);
        assert_eq!(values.len(), 60);
        assert!((values[0] - 0.01).abs() < 1e-12);
        assert!((values[59] - 5.0).abs() < 1e-9);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn linear_grid_is_evenly_spaced() {
        let grid = FrequencyGrid::new(1.0, 3.0, 5, Spacing::Linear);
        assert_eq!(grid.data(), vec![1.0, 1.5, 2.0, 2.5, 3.0]);
    }
}
