use serde::{Deserialize, Serialize};

use super::CrustalModel;
use crate::math::grid::log_space;
use crate::math::interp::linear_clamped;
use crate::prelude::{MotionError, MotionResult, Region};

// Campbell (2003) generic rock amplification.
const WUS_FREQ: [f64; 12] = [
    0.01, 0.09, 0.16, 0.51, 0.84, 1.25, 2.26, 3.17, 6.05, 16.60, 61.20, 100.0,
];
const WUS_AMP: [f64; 12] = [
    1.00, 1.10, 1.18, 1.42, 1.58, 1.74, 2.06, 2.25, 2.58, 3.13, 4.00, 4.40,
];
const CEUS_FREQ: [f64; 15] = [
    0.01, 0.10, 0.20, 0.30, 0.50, 0.90, 1.25, 1.80, 3.00, 5.30, 8.00, 14.00, 30.00, 60.00, 100.00,
];
const CEUS_AMP: [f64; 15] = [
    1.00, 1.02, 1.03, 1.05, 1.07, 1.09, 1.11, 1.12, 1.13, 1.14, 1.15, 1.15, 1.15, 1.15, 1.15,
];

const CALCULATED_POINTS: usize = 20;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AmplificationSource {
    /// Regional default table.
    #[default]
    Default,
    /// User-edited table.
    Specified,
    /// Quarter-wavelength evaluation of a [`CrustalModel`].
    Calculated,
}

/// Frequency-dependent crustal amplification applied to the source-theory spectrum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrustalAmplification {
    source: AmplificationSource,
    freq: Vec<f64>,
    amp: Vec<f64>,
    crustal_model: CrustalModel,
}

impl Default for CrustalAmplification {
    fn default() -> Self {
        Self::for_region(Region::Wus)
    }
}

impl CrustalAmplification {
    pub fn for_region(region: Region) -> Self {
        let mut amplification = Self {
            source: AmplificationSource::Default,
            freq: Vec::new(),
            amp: Vec::new(),
            crustal_model: CrustalModel::default(),
        };
        amplification.set_region(region);
        amplification
    }

    pub fn source(&self) -> AmplificationSource {
        self.source
    }

    pub fn set_source(&mut self, source: AmplificationSource) {
        self.source = source;
    }

    /// Loads the regional table when the source is [`AmplificationSource::Default`].
    pub fn set_region(&mut self, region: Region) {
        if self.source != AmplificationSource::Default {
            return;
        }
        let (freq, amp): (&[f64], &[f64]) = match region {
            Region::Wus => (&WUS_FREQ, &WUS_AMP),
            Region::Ceus => (&CEUS_FREQ, &CEUS_AMP),
            Region::Unknown => return,
        };
        self.freq = freq.to_vec();
        self.amp = amp.to_vec();
    }

    /// Replaces the table and switches to [`AmplificationSource::Specified`].
    pub fn set_table(&mut self, freq: Vec<f64>, amp: Vec<f64>) -> MotionResult<()> {
        if freq.len() != amp.len() || freq.is_empty() {
            return Err(MotionError::InvalidInput(
                "amplification table needs matching, non-empty columns".into(),
            ));
        }
        self.source = AmplificationSource::Specified;
        self.freq = freq;
        self.amp = amp;
        Ok(())
    }

    pub fn insert_row(&mut self, row: usize, freq: f64, amp: f64) {
        let row = row.min(self.freq.len());
        self.source = AmplificationSource::Specified;
        self.freq.insert(row, freq);
        self.amp.insert(row, amp);
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) {
        let start = row.min(self.freq.len());
        let end = (row + count).min(self.freq.len());
        self.source = AmplificationSource::Specified;
        self.freq.drain(start..end);
        self.amp.drain(start..end);
    }

    pub fn crustal_model(&self) -> &CrustalModel {
        &self.crustal_model
    }

    pub fn crustal_model_mut(&mut self) -> &mut CrustalModel {
        &mut self.crustal_model
    }

    pub fn freq(&self) -> &[f64] {
        &self.freq
    }

    pub fn amp(&self) -> &[f64] {
        &self.amp
    }

    /// Re-evaluates the crustal model when the source is [`AmplificationSource::Calculated`].
    pub fn calculate(&mut self) -> MotionResult<()> {
        if self.source == AmplificationSource::Calculated {
            let freq = log_space(0.01, 100.0, CALCULATED_POINTS);
            self.amp = self.crustal_model.calculate(&freq)?;
            self.freq = freq;
        }
        Ok(())
    }

    /// Amplification at `freq`, held constant beyond the tabulated range.
    pub fn interp_amp_at(&self, freq: f64) -> f64 {
        if self.freq.is_empty() {
            return 1.0;
        }
        linear_clamped(&self.freq, &self.amp, freq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crustal::CrustalLayer;

    #[test]
    fn regional_tables_are_clamped_at_the_ends() {
        let wus = CrustalAmplification::for_region(Region::Wus);
        assert_eq!(wus.interp_amp_at(0.001), 1.0);
        assert_eq!(wus.interp_amp_at(500.0), 4.4);
        let mid = wus.interp_amp_at(1.0);
        assert!(mid > 1.58 && mid < 1.74);

        let ceus = CrustalAmplification::for_region(Region::Ceus);
        assert!((ceus.interp_amp_at(0.4) - 1.06).abs() < 1e-12);
    }

    #[test]
    fn specified_table_survives_region_change() {
        let mut amp = CrustalAmplification::for_region(Region::Wus);
        amp.set_table(vec![1.0, 10.0], vec![2.0, 3.0]).unwrap();
        amp.set_region(Region::Ceus);
        assert_eq!(amp.source(), AmplificationSource::Specified);
        assert_eq!(amp.interp_amp_at(5.5), 2.5);
    }

    #[test]
    fn calculated_source_uses_crustal_model() {
        let mut amp = CrustalAmplification::for_region(Region::Wus);
        *amp.crustal_model_mut() = CrustalModel::new(vec![CrustalLayer::new(0.0, 3.5, 2.8)]);
        amp.set_source(AmplificationSource::Calculated);
        amp.calculate().unwrap();
        assert_eq!(amp.freq().len(), 20);
        assert!((amp.interp_amp_at(3.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn row_edits_switch_to_specified() {
        let mut amp = CrustalAmplification::for_region(Region::Ceus);
        amp.remove_rows(0, 14);
        amp.insert_row(0, 0.5, 1.0);
        assert_eq!(amp.source(), AmplificationSource::Specified);
        assert_eq!(amp.freq(), &[0.5, 100.0]);
    }
}
