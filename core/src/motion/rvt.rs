use num_complex::Complex64;
use std::f64::consts::PI;

use super::{sdof_transfer_function, ResponseSpectrum};
use crate::peak::{PeakCalculator, PeakCalculatorKind};
use crate::prelude::{Motion, MotionError, MotionResult, MotionType, Oscillator, Scenario};
use crate::telemetry::LogManager;
use crate::units::UnitSystem;

/// State shared by every motion represented by a Fourier amplitude spectrum.
#[derive(Debug)]
pub struct RvtBase {
    name: String,
    description: String,
    motion_type: MotionType,
    freq: Vec<f64>,
    fourier_acc: Vec<f64>,
    duration: f64,
    scenario: Scenario,
    peak_calculator: PeakCalculator,
    response_spectrum: ResponseSpectrum,
    units: UnitSystem,
    pga: f64,
    pgv: f64,
    logger: LogManager,
}

impl RvtBase {
    /// Base with the default (Vanmarcke) peak calculator and the default scenario.
    pub fn new(component: &'static str) -> MotionResult<Self> {
        let calculator = PeakCalculator::new(PeakCalculatorKind::default())?;
        Ok(Self::with_peak_calculator(component, calculator))
    }

    pub fn with_peak_calculator(component: &'static str, peak_calculator: PeakCalculator) -> Self {
        let mut base = Self {
            name: String::new(),
            description: String::new(),
            motion_type: MotionType::Outcrop,
            freq: Vec::new(),
            fourier_acc: Vec::new(),
            duration: 0.0,
            scenario: Scenario::default(),
            peak_calculator,
            response_spectrum: ResponseSpectrum::default(),
            units: UnitSystem::default(),
            pga: 0.0,
            pgv: 0.0,
            logger: LogManager::new(component),
        };
        base.peak_calculator.set_scenario(&base.scenario);
        base
    }

    /// Name with `$mag` and `$dist` replaced by the scenario values.
    pub fn name(&self) -> String {
        self.name
            .replace("$mag", &format!("{:.1}", self.scenario.magnitude))
            .replace("$dist", &format!("{:.1}", self.scenario.distance))
    }

    pub fn name_template(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    pub fn set_motion_type(&mut self, motion_type: MotionType) {
        self.motion_type = motion_type;
    }

    pub fn freq(&self) -> &[f64] {
        &self.freq
    }

    pub fn fourier_acc(&self) -> &[f64] {
        &self.fourier_acc
    }

    /// Replaces the spectrum; both columns must have the same length.
    pub fn set_spectrum(&mut self, freq: Vec<f64>, fourier_acc: Vec<f64>) -> MotionResult<()> {
        if freq.len() != fourier_acc.len() {
            return Err(MotionError::InvalidInput(format!(
                "{} frequencies but {} amplitudes",
                freq.len(),
                fourier_acc.len()
            )));
        }
        self.freq = freq;
        self.fourier_acc = fourier_acc;
        Ok(())
    }

    pub(crate) fn fourier_acc_mut(&mut self) -> &mut Vec<f64> {
        &mut self.fourier_acc
    }

    pub(crate) fn freq_mut(&mut self) -> &mut Vec<f64> {
        &mut self.freq
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn set_scenario(&mut self, scenario: Scenario) {
        self.scenario = scenario;
        self.peak_calculator.set_scenario(&scenario);
    }

    pub fn peak_calculator(&self) -> &PeakCalculator {
        &self.peak_calculator
    }

    pub fn set_peak_calculator(&mut self, mut peak_calculator: PeakCalculator) {
        peak_calculator.set_scenario(&self.scenario);
        self.peak_calculator = peak_calculator;
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn set_units(&mut self, units: UnitSystem) {
        self.units = units;
    }

    pub fn logger(&self) -> &LogManager {
        &self.logger
    }

    pub fn response_spectrum(&self) -> &ResponseSpectrum {
        &self.response_spectrum
    }

    pub fn response_spectrum_mut(&mut self) -> &mut ResponseSpectrum {
        &mut self.response_spectrum
    }

    pub fn pga(&self) -> f64 {
        self.pga
    }

    pub fn pgv(&self) -> f64 {
        self.pgv
    }

    pub fn abs_fourier_acc(&self, tf: &[Complex64]) -> Vec<f64> {
        if tf.is_empty() {
            return self.fourier_acc.clone();
        }
        self.fourier_acc
            .iter()
            .zip(tf)
            .map(|(fa, t)| fa * t.norm())
            .collect()
    }

    pub fn abs_fourier_vel(&self, tf: &[Complex64]) -> Vec<f64> {
        self.scaled_by_ang_freq(tf, 1)
    }

    pub fn abs_fourier_disp(&self, tf: &[Complex64]) -> Vec<f64> {
        self.scaled_by_ang_freq(tf, 2)
    }

    fn scaled_by_ang_freq(&self, tf: &[Complex64], power: i32) -> Vec<f64> {
        self.abs_fourier_acc(tf)
            .into_iter()
            .zip(&self.freq)
            .map(|(fa, f)| fa / (2.0 * PI * f).powi(power))
            .collect()
    }

    fn calc_max(&self, fourier_amps: &[f64]) -> f64 {
        self.peak_calculator
            .calc_peak(self.duration, &self.freq, fourier_amps, Oscillator::NONE, &[])
    }

    pub fn max_accel(&self, tf: &[Complex64]) -> f64 {
        self.calc_max(&self.abs_fourier_acc(tf))
    }

    pub fn max_vel(&self, tf: &[Complex64]) -> f64 {
        self.units.ts_conv() * self.calc_max(&self.abs_fourier_vel(tf))
    }

    pub fn max_disp(&self, tf: &[Complex64]) -> f64 {
        self.units.ts_conv() * self.calc_max(&self.abs_fourier_disp(tf))
    }

    /// Peak velocity without the time-series unit conversion.
    pub fn calc_max_strain(&self, tf: &[Complex64]) -> f64 {
        self.calc_max(&self.abs_fourier_vel(tf))
    }

    /// Expected oscillator peak at each period, optionally through `accel_tf`.
    pub fn compute_sa(&self, periods: &[f64], damping: f64, accel_tf: &[Complex64]) -> Vec<f64> {
        periods
            .iter()
            .map(|&period| {
                let sdof = sdof_transfer_function(&self.freq, period, damping);
                let amps: Vec<f64> = self
                    .fourier_acc
                    .iter()
                    .enumerate()
                    .map(|(i, fa)| {
                        let site = accel_tf.get(i).map_or(1.0, |t| t.norm());
                        sdof[i].norm() * fa * site
                    })
                    .collect();
                self.peak_calculator.calc_peak(
                    self.duration,
                    &self.freq,
                    &amps,
                    Oscillator::new(1.0 / period, damping),
                    accel_tf,
                )
            })
            .collect()
    }

    /// Peak ground motions followed by the response spectrum.
    pub fn calculate(&mut self) -> MotionResult<()> {
        if self.freq.is_empty() || self.freq.len() != self.fourier_acc.len() {
            return Err(MotionError::InvalidInput(
                "motion needs a non-empty Fourier amplitude spectrum".into(),
            ));
        }
        self.pga = self.max_accel(&[]);
        self.pgv = self.max_vel(&[]);
        let sa = self.compute_sa(
            self.response_spectrum.period(),
            self.response_spectrum.damping(),
            &[],
        );
        self.response_spectrum.set_sa(sa);
        self.logger.detail(&format!("PGA {:.4} g, PGV {:.3}", self.pga, self.pgv));
        Ok(())
    }
}

/// A motion whose spectrum lives in an [`RvtBase`].
///
/// `prepare` builds the spectrum before the shared peak calculations run.
pub trait FasMotion {
    fn base(&self) -> &RvtBase;
    fn base_mut(&mut self) -> &mut RvtBase;

    fn prepare(&mut self) -> MotionResult<()> {
        Ok(())
    }
}

impl<T: FasMotion> Motion for T {
    fn name(&self) -> String {
        self.base().name()
    }

    fn freq(&self) -> &[f64] {
        self.base().freq()
    }

    fn calculate(&mut self) -> MotionResult<()> {
        self.prepare()?;
        self.base_mut().calculate()
    }

    fn pga(&self) -> f64 {
        self.base().pga()
    }

    fn pgv(&self) -> f64 {
        self.base().pgv()
    }

    fn response_spectrum(&self) -> &ResponseSpectrum {
        self.base().response_spectrum()
    }

    fn response_spectrum_mut(&mut self) -> &mut ResponseSpectrum {
        self.base_mut().response_spectrum_mut()
    }

    fn max_accel(&self, tf: &[Complex64]) -> f64 {
        self.base().max_accel(tf)
    }

    fn max_vel(&self, tf: &[Complex64]) -> f64 {
        self.base().max_vel(tf)
    }

    fn max_disp(&self, tf: &[Complex64]) -> f64 {
        self.base().max_disp(tf)
    }

    fn calc_max_strain(&self, tf: &[Complex64]) -> f64 {
        self.base().calc_max_strain(tf)
    }

    fn compute_sa(&self, periods: &[f64], damping: f64, accel_tf: &[Complex64]) -> Vec<f64> {
        self.base().compute_sa(periods, damping, accel_tf)
    }

    fn abs_fourier_acc(&self, tf: &[Complex64]) -> Vec<f64> {
        self.base().abs_fourier_acc(tf)
    }

    fn abs_fourier_vel(&self, tf: &[Complex64]) -> Vec<f64> {
        self.base().abs_fourier_vel(tf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::Region;

    fn flat_base() -> RvtBase {
        let mut base = RvtBase::with_peak_calculator("test", PeakCalculator::vanmarcke());
        let freq: Vec<f64> = (1..=500).map(|i| i as f64 * 0.1).collect();
        let fas = vec![0.01; freq.len()];
        base.set_spectrum(freq, fas).unwrap();
        base.set_duration(10.0);
        base
    }

    #[test]
    fn name_template_substitutes_scenario() {
        let mut base = flat_base();
        base.set_name("M$mag at $dist km");
        base.set_scenario(Scenario::new(6.54, 35.0, Region::Ceus));
        assert_eq!(base.name(), "M6.5 at 35.0 km");
        assert_eq!(base.name_template(), "M$mag at $dist km");
    }

    #[test]
    fn velocity_spectrum_divides_by_angular_frequency() {
        let base = flat_base();
        let vel = base.abs_fourier_vel(&[]);
        let disp = base.abs_fourier_disp(&[]);
        let w = 2.0 * PI * base.freq()[9];
        assert!((vel[9] - 0.01 / w).abs() < 1e-15);
        assert!((disp[9] - 0.01 / (w * w)).abs() < 1e-15);
    }

    #[test]
    fn transfer_function_scales_peak_linearly() {
        let base = flat_base();
        let tf = vec![Complex64::new(0.0, 2.0); base.freq().len()];
        let plain = base.max_accel(&[]);
        let amplified = base.max_accel(&tf);
        assert!((amplified / plain - 2.0).abs() < 1e-9);
        assert!((base.max_vel(&[]) / base.calc_max_strain(&[]) - 980.665).abs() < 1e-6);
    }

    #[test]
    fn calculate_fills_response_spectrum() {
        let mut base = flat_base();
        base.calculate().unwrap();
        assert!(base.pga() > 0.0);
        let rs = base.response_spectrum();
        assert_eq!(rs.sa().len(), rs.period().len());
        // Short-period oscillators follow the ground.
        assert!((rs.sa()[0] / base.pga() - 1.0).abs() < 0.2);
    }

    #[test]
    fn empty_spectrum_is_rejected() {
        let mut base = RvtBase::with_peak_calculator("test", PeakCalculator::vanmarcke());
        assert!(base.calculate().is_err());
    }
}
