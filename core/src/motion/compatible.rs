use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{FasMotion, ResponseSpectrum, RvtBase};
use crate::math::grid::{log_space, FrequencyGrid};
use crate::math::interp::{log_log_interp, CubicSpline};
use crate::math::StatsHelper;
use crate::peak::PeakCalculator;
use crate::prelude::{CancellationToken, MotionError, MotionResult, Oscillator};
use crate::telemetry::ProgressRecorder;

/// Peak factor assumed by the Vanmarcke seed.
const SEED_PEAK_FACTOR: f64 = 2.5;
/// Log–log slope of the seed below the lowest target frequency.
const SEED_LOW_SLOPE: f64 = 1.92;
/// Low-frequency slope enforced when the FAS shape is limited.
const LIMITED_LOW_SLOPE: f64 = 2.0;
const MIN_TARGET_POINTS: usize = 10;

/// Convergence controls of the spectral matching loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompatibleSettings {
    pub max_iterations: usize,
    pub min_rmse: f64,
    pub min_rmse_change: f64,
    /// Forces a slope of 2 at low frequencies and a decaying high-frequency tail.
    pub limit_fas: bool,
}

impl Default for CompatibleSettings {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            min_rmse: 0.005,
            min_rmse_change: 0.0002,
            limit_fas: false,
        }
    }
}

/// Outcome of a matching run. Neither non-convergence nor cancellation is an error.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MatchReport {
    pub iterations: usize,
    pub rmse: f64,
    /// Largest signed relative error `(computed - target) / target`.
    pub max_error: f64,
    pub converged: bool,
    pub cancelled: bool,
}

/// Fourier amplitude spectrum inverted from a target response spectrum.
#[derive(Debug)]
pub struct CompatibleRvtMotion {
    base: RvtBase,
    target: ResponseSpectrum,
    settings: CompatibleSettings,
    grid: FrequencyGrid,
    progress: Arc<ProgressRecorder>,
    cancel: CancellationToken,
    report: Option<MatchReport>,
}

impl CompatibleRvtMotion {
    pub fn new() -> MotionResult<Self> {
        Ok(Self::from_base(RvtBase::new("compatible")?))
    }

    pub fn with_peak_calculator(peak_calculator: PeakCalculator) -> Self {
        Self::from_base(RvtBase::with_peak_calculator("compatible", peak_calculator))
    }

    fn from_base(mut base: RvtBase) -> Self {
        base.set_duration(5.0);
        base.set_name("Compatible RVT Motion (M $mag @ $dist km)");
        Self {
            base,
            target: ResponseSpectrum::new(Vec::new(), 5.0),
            settings: CompatibleSettings::default(),
            grid: FrequencyGrid::default(),
            progress: Arc::new(ProgressRecorder::new()),
            cancel: CancellationToken::new(),
            report: None,
        }
    }

    pub fn target(&self) -> &ResponseSpectrum {
        &self.target
    }

    /// Validated target; periods must be positive and increasing.
    pub fn set_target(&mut self, target: ResponseSpectrum) -> MotionResult<()> {
        validate_target(&target)?;
        self.target = target;
        self.report = None;
        Ok(())
    }

    pub fn settings(&self) -> &CompatibleSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: CompatibleSettings) {
        self.settings = settings;
    }

    pub fn frequency_grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    pub fn set_frequency_grid(&mut self, grid: FrequencyGrid) {
        self.grid = grid;
    }

    pub fn duration(&self) -> f64 {
        self.base.duration()
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.base.set_duration(duration);
    }

    /// Shared progress of the matching loop.
    pub fn progress(&self) -> Arc<ProgressRecorder> {
        Arc::clone(&self.progress)
    }

    /// Token checked before each iteration; cancelling it stops the loop with the current FAS.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    pub fn last_report(&self) -> Option<MatchReport> {
        self.report
    }

    /// Squared-FAS estimate at each target period, walking from the longest period down.
    ///
    /// Sparse targets are first resampled to ten log-spaced points per decade
    /// and the resampled spectrum replaces the target.
    pub fn vanmarcke_inversion(&mut self) -> MotionResult<Vec<f64>> {
        validate_target(&self.target)?;
        if self.target.len() < MIN_TARGET_POINTS {
            self.resample_target()?;
        }

        let period = self.target.period();
        let sa = self.target.sa();
        let damping = self.target.damping();
        let sdof_factor = std::f64::consts::PI / (4.0 * damping / 100.0) - 1.0;
        let calculator = self.base.peak_calculator();
        let duration = self.base.duration();

        let n = period.len();
        let mut fas = vec![0.0; n];
        let mut prev = 0.0;
        let mut sum = 0.0;
        for i in (0..n).rev() {
            let freq = 1.0 / period[i];
            let rms_duration =
                calculator.duration_rms(duration, Oscillator::new(freq, damping), &[], &[]);
            let mut fas_sqr = (rms_duration * sa[i].powi(2)
                / (2.0 * SEED_PEAK_FACTOR.powi(2))
                - sum)
                / (freq * sdof_factor);
            if fas_sqr < 0.0 {
                self.base.logger().detail(&format!(
                    "negative spectral density at {:.3} s, keeping previous value",
                    period[i]
                ));
                fas_sqr = prev;
            }
            fas[i] = fas_sqr.sqrt();
            if i == n - 1 {
                sum = fas_sqr * freq / 2.0;
            } else {
                sum += (fas_sqr - prev) / 2.0 * (freq - 1.0 / period[i + 1]);
            }
            prev = fas_sqr;
        }
        Ok(fas)
    }

    fn resample_target(&mut self) -> MotionResult<()> {
        let period = self.target.period();
        let (first, last) = (period[0], period[period.len() - 1]);
        let decades = (last / first).log10();
        let count = ((10.0 * decades) as usize).max(MIN_TARGET_POINTS);
        let resampled = log_space(first, last, count);
        let sa = log_log_interp(period, self.target.sa(), &resampled);
        self.base.logger().detail(&format!(
            "resampled target from {} to {} periods",
            period.len(),
            count
        ));
        self.target = ResponseSpectrum::with_values(resampled, sa, self.target.damping())?;
        Ok(())
    }

    /// Seeds the FAS from the Vanmarcke inversion and iterates until the
    /// response spectrum matches the target.
    ///
    /// The cancellation token is cleared on entry, so only a cancel issued
    /// during this run stops it.
    pub fn match_target(&mut self) -> MotionResult<MatchReport> {
        self.cancel.reset();
        let seed = self.vanmarcke_inversion()?;
        let period = self.target.period().to_vec();
        let target_sa = self.target.sa().to_vec();
        let damping = self.target.damping();
        let freq = self.grid.data();
        if freq.len() < 2 {
            return Err(MotionError::InvalidInput(
                "matching needs at least two frequencies".into(),
            ));
        }

        let (mut fas, offset) = seed_on_grid(&period, &seed, &freq)?;
        self.base.set_spectrum(freq.clone(), fas.clone())?;

        let response = self.base.response_spectrum_mut();
        response.set_damping(damping);
        response.set_period(period.clone());
        let mut sa = self.base.compute_sa(&period, damping, &[]);

        let settings = self.settings;
        self.progress.start(settings.max_iterations);
        let (seed_rmse, seed_max_error) = StatsHelper::relative_errors(&sa, &target_sa);
        let mut report = MatchReport {
            rmse: seed_rmse,
            max_error: seed_max_error,
            ..MatchReport::default()
        };
        let mut old_rmse = 1.0;
        while report.iterations < settings.max_iterations {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let ratio: Vec<f64> = target_sa.iter().zip(&sa).map(|(t, c)| t / c).collect();
            let correction = RatioCurve::new(&period, &ratio)?;
            for i in offset..freq.len() {
                fas[i] = (fas[i] * correction.at_freq(freq[i])).max(f64::MIN_POSITIVE);
            }

            extrapolate_low(&freq, &mut fas, offset, settings.limit_fas);
            if settings.limit_fas {
                limit_high_tail(&freq, &mut fas, offset);
            }

            self.base.set_spectrum(freq.clone(), fas.clone())?;
            sa = self.base.compute_sa(&period, damping, &[]);
            let (rmse, max_error) = StatsHelper::relative_errors(&sa, &target_sa);
            report.iterations += 1;
            report.rmse = rmse;
            report.max_error = max_error;
            self.progress.record_iteration(report.iterations, rmse);
            self.base.logger().detail(&format!(
                "iteration {}: rmse {:.5}, max error {:.4}",
                report.iterations, rmse, max_error
            ));

            if rmse < settings.min_rmse || (old_rmse - rmse).abs() < settings.min_rmse_change {
                report.converged = rmse < settings.min_rmse;
                break;
            }
            old_rmse = rmse;
        }

        self.base.response_spectrum_mut().set_sa(sa);
        self.progress
            .record_iteration(settings.max_iterations, report.rmse);
        if report.cancelled {
            self.base
                .logger()
                .warning(&format!("matching cancelled after {} iterations", report.iterations));
        } else if !report.converged {
            self.base.logger().warning(&format!(
                "matching stopped at rmse {:.4} after {} iterations",
                report.rmse, report.iterations
            ));
        } else {
            self.base.logger().record(&format!(
                "matched target in {} iterations, rmse {:.4}",
                report.iterations, report.rmse
            ));
        }
        self.report = Some(report);
        Ok(report)
    }
}

impl FasMotion for CompatibleRvtMotion {
    fn base(&self) -> &RvtBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RvtBase {
        &mut self.base
    }

    fn prepare(&mut self) -> MotionResult<()> {
        self.match_target().map(|_| ())
    }
}

fn validate_target(target: &ResponseSpectrum) -> MotionResult<()> {
    let period = target.period();
    if period.is_empty() || target.sa().len() != period.len() {
        return Err(MotionError::InvalidInput(
            "target needs matching, non-empty period and sa columns".into(),
        ));
    }
    if period.iter().any(|&p| p <= 0.0) {
        return Err(MotionError::InvalidInput(
            "target periods must be greater than zero".into(),
        ));
    }
    if period.windows(2).any(|w| w[1] <= w[0]) {
        return Err(MotionError::InvalidInput(
            "target periods must increase".into(),
        ));
    }
    if target.sa().iter().any(|&v| v <= 0.0) {
        return Err(MotionError::InvalidInput(
            "target spectral accelerations must be positive".into(),
        ));
    }
    Ok(())
}

/// Spline over period, evaluated at `1 / f` and held constant beyond the end periods.
struct RatioCurve {
    spline: Option<CubicSpline>,
    first: f64,
    last: f64,
    constant: f64,
}

impl RatioCurve {
    fn new(period: &[f64], values: &[f64]) -> MotionResult<Self> {
        let spline = if period.len() > 1 {
            Some(CubicSpline::new(period, values)?)
        } else {
            None
        };
        Ok(Self {
            spline,
            first: period[0],
            last: period[period.len() - 1],
            constant: values[0],
        })
    }

    fn at_freq(&self, freq: f64) -> f64 {
        match &self.spline {
            Some(spline) => spline.eval((1.0 / freq).clamp(self.first, self.last)),
            None => self.constant,
        }
    }
}

/// Seed FAS on `freq` and the first index updated by the ratio correction.
fn seed_on_grid(period: &[f64], seed: &[f64], freq: &[f64]) -> MotionResult<(Vec<f64>, usize)> {
    let curve = RatioCurve::new(period, seed)?;
    let low_freq = 1.0 / period[period.len() - 1];
    let low_fas = seed[seed.len() - 1].max(f64::MIN_POSITIVE).ln();
    let mut offset = 0;
    let fas = freq
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            let value = if f < low_freq {
                offset = i;
                (SEED_LOW_SLOPE * (f / low_freq).ln() + low_fas).exp()
            } else {
                curve.at_freq(f)
            };
            value.max(f64::MIN_POSITIVE)
        })
        .collect();
    Ok((fas, (offset + 1).min(freq.len() - 1)))
}

fn log_slope(freq: &[f64], fas: &[f64], i: usize) -> f64 {
    (fas[i] / fas[i + 1]).ln() / (freq[i] / freq[i + 1]).ln()
}

/// Straight log–log line below `offset`.
fn extrapolate_low(freq: &[f64], fas: &mut [f64], offset: usize, limit_fas: bool) {
    if offset + 1 >= freq.len() {
        return;
    }
    let slope = if limit_fas {
        LIMITED_LOW_SLOPE
    } else {
        log_slope(freq, fas, offset)
    };
    let (x0, y0) = (freq[offset].ln(), fas[offset].ln());
    for i in 0..offset {
        fas[i] = (slope * (freq[i].ln() - x0) + y0).exp();
    }
}

/// Continues the steepest descending segment beyond `offset` to the end of the grid.
fn limit_high_tail(freq: &[f64], fas: &mut [f64], offset: usize) {
    let mut min_slope = 0.0;
    let mut min_index = None;
    for i in offset..freq.len().saturating_sub(1) {
        let slope = log_slope(freq, fas, i);
        if slope < min_slope {
            min_slope = slope;
            min_index = Some(i);
        }
    }
    if let Some(index) = min_index {
        let (x0, y0) = (freq[index].ln(), fas[index].ln());
        for i in index + 1..freq.len() {
            fas[i] = (min_slope * (freq[i].ln() - x0) + y0).exp();
        }
    }
}
