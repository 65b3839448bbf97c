use serde::{Deserialize, Serialize};

use crate::prelude::{MotionError, MotionResult, Region};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DurationSource {
    #[default]
    Default,
    Specified,
}

/// Path contribution to the ground-motion duration.
///
/// `rate[i]` (s/km) applies from `distance[i]` up to the next breakpoint; the
/// last rate continues indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathDurationModel {
    source: DurationSource,
    distance: Vec<f64>,
    rate: Vec<f64>,
}

impl Default for PathDurationModel {
    fn default() -> Self {
        Self::for_region(Region::Wus)
    }
}

impl PathDurationModel {
    pub fn for_region(region: Region) -> Self {
        let mut model = Self {
            source: DurationSource::Default,
            distance: vec![0.0],
            rate: vec![0.05],
        };
        model.set_region(region);
        model
    }

    pub fn source(&self) -> DurationSource {
        self.source
    }

    pub fn set_source(&mut self, source: DurationSource) {
        self.source = source;
    }

    /// Loads the regional breakpoints unless the table was specified.
    pub fn set_region(&mut self, region: Region) {
        if self.source != DurationSource::Default {
            return;
        }
        match region {
            Region::Wus => {
                self.distance = vec![0.0];
                self.rate = vec![0.05];
            }
            Region::Ceus => {
                self.distance = vec![0.0, 10.0, 70.0, 130.0];
                self.rate = vec![0.0, 0.16, -0.03, 0.04];
            }
            Region::Unknown => {}
        }
    }

    pub fn set_table(&mut self, distance: Vec<f64>, rate: Vec<f64>) -> MotionResult<()> {
        if distance.len() != rate.len() || distance.is_empty() {
            return Err(MotionError::InvalidInput(
                "path duration needs matching, non-empty columns".into(),
            ));
        }
        if distance.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MotionError::InvalidInput(
                "path duration breakpoints must increase".into(),
            ));
        }
        self.source = DurationSource::Specified;
        self.distance = distance;
        self.rate = rate;
        Ok(())
    }

    pub fn insert_row(&mut self, row: usize, distance: f64, rate: f64) {
        let row = row.min(self.distance.len());
        self.source = DurationSource::Specified;
        self.distance.insert(row, distance);
        self.rate.insert(row, rate);
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) {
        let start = row.min(self.distance.len());
        let end = (row + count).min(self.distance.len());
        self.source = DurationSource::Specified;
        self.distance.drain(start..end);
        self.rate.drain(start..end);
    }

    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    pub fn rate(&self) -> &[f64] {
        &self.rate
    }

    /// Integral of the rate over `[0, distance]`.
    pub fn duration(&self, distance: f64) -> f64 {
        let mut total = 0.0;
        for (i, (&start, &rate)) in self.distance.iter().zip(&self.rate).enumerate() {
            if distance <= start {
                break;
            }
            let end = self
                .distance
                .get(i + 1)
                .map_or(distance, |&next| next.min(distance));
            total += (end - start) * rate;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceus_duration_accumulates_each_segment() {
        let model = PathDurationModel::for_region(Region::Ceus);
        let expected = 10.0 * 0.0 + 60.0 * 0.16 + 30.0 * -0.03;
        assert!((model.duration(100.0) - expected).abs() < 1e-12);
        let beyond = 60.0 * 0.16 + 60.0 * -0.03 + 20.0 * 0.04;
        assert!((model.duration(150.0) - beyond).abs() < 1e-12);
    }

    #[test]
    fn wus_duration_is_linear() {
        let model = PathDurationModel::for_region(Region::Wus);
        assert!((model.duration(40.0) - 2.0).abs() < 1e-12);
        assert_eq!(model.duration(0.0), 0.0);
    }

    #[test]
    fn duration_is_continuous_at_breakpoints() {
        let model = PathDurationModel::for_region(Region::Ceus);
        for &point in &[10.0, 70.0, 130.0] {
            let left = model.duration(point - 1e-9);
            let right = model.duration(point + 1e-9);
            assert!((left - right).abs() < 1e-8);
        }
    }

    #[test]
    fn specified_table_rejects_unsorted_breakpoints() {
        let mut model = PathDurationModel::default();
        assert!(model.set_table(vec![0.0, 20.0, 10.0], vec![0.1; 3]).is_err());
        model.set_table(vec![0.0, 20.0], vec![0.1, 0.2]).unwrap();
        model.set_region(Region::Ceus);
        assert!((model.duration(30.0) - 4.0).abs() < 1e-12);
    }
}
