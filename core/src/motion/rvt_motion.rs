use super::{FasMotion, RvtBase};
use crate::math::interp::{log_log_interp, smooth};
use crate::peak::PeakCalculator;
use crate::prelude::{MotionError, MotionResult};

/// Motion defined directly by a user-edited Fourier amplitude spectrum table.
#[derive(Debug)]
pub struct RvtMotion {
    base: RvtBase,
}

impl RvtMotion {
    pub fn new() -> MotionResult<Self> {
        Ok(Self::from_base(RvtBase::new("rvt-motion")?))
    }

    pub fn with_peak_calculator(peak_calculator: PeakCalculator) -> Self {
        Self::from_base(RvtBase::with_peak_calculator("rvt-motion", peak_calculator))
    }

    fn from_base(mut base: RvtBase) -> Self {
        base.set_duration(5.0);
        base.set_name("RVT Motion (M $mag @ $dist km)");
        Self { base }
    }

    pub fn set_row(&mut self, row: usize, freq: f64, amplitude: f64) -> MotionResult<()> {
        if row >= self.base.freq().len() {
            return Err(MotionError::InvalidInput(format!("no spectrum row {}", row)));
        }
        self.base.freq_mut()[row] = freq;
        self.base.fourier_acc_mut()[row] = amplitude;
        Ok(())
    }

    /// Inserts `count` zeroed rows before `row`.
    pub fn insert_rows(&mut self, row: usize, count: usize) {
        let row = row.min(self.base.freq().len());
        for _ in 0..count {
            self.base.freq_mut().insert(row, 0.0);
            self.base.fourier_acc_mut().insert(row, 0.0);
        }
    }

    pub fn remove_rows(&mut self, row: usize, count: usize) {
        let len = self.base.freq().len();
        let (start, end) = (row.min(len), (row + count).min(len));
        self.base.freq_mut().drain(start..end);
        self.base.fourier_acc_mut().drain(start..end);
    }

    /// Re-samples the spectrum onto `freq` by log–log interpolation.
    pub fn resample(&mut self, freq: Vec<f64>) -> MotionResult<()> {
        if self.base.freq().len() < 2 {
            return Err(MotionError::InvalidInput(
                "resampling needs at least two spectrum rows".into(),
            ));
        }
        let amps = log_log_interp(self.base.freq(), self.base.fourier_acc(), &freq);
        self.base.set_spectrum(freq, amps)
    }

    /// Moving-average smoothing of the amplitudes over `window` points either side.
    pub fn smooth(&mut self, window: usize) {
        let smoothed = smooth(self.base.fourier_acc(), window);
        *self.base.fourier_acc_mut() = smoothed;
    }
}

impl FasMotion for RvtMotion {
    fn base(&self) -> &RvtBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RvtBase {
        &mut self.base
    }

    fn prepare(&mut self) -> MotionResult<()> {
        if self.base.freq().windows(2).any(|w| w[1] <= w[0]) {
            return Err(MotionError::InvalidInput(
                "spectrum frequencies must increase".into(),
            ));
        }
        Ok(())
    }
}
