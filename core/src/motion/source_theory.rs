use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};

use super::{FasMotion, RvtBase};
use crate::crustal::{CrustalAmplification, PathDurationModel};
use crate::math::grid::FrequencyGrid;
use crate::peak::PeakCalculator;
use crate::prelude::{MotionError, MotionResult, Region, Scenario};

/// Dyne-cm to g-s.
const CONVERSION: f64 = 1e-20 / 981.0;

/// Empirical constants of the point-source model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SourceParameters {
    /// Stress drop (bar).
    pub stress_drop: f64,
    /// Quality factor coefficient `Q0` of `Q(f) = Q0 f^η`.
    pub path_atten_coeff: f64,
    /// Quality factor exponent `η`.
    pub path_atten_power: f64,
    /// Shear-wave velocity at the source (km/s).
    pub shear_velocity: f64,
    /// Density at the source (g/cm³).
    pub density: f64,
    /// Site attenuation `κ0` (s).
    pub site_atten: f64,
}

impl SourceParameters {
    pub fn for_region(region: Region) -> Option<Self> {
        match region {
            Region::Wus => Some(Self {
                stress_drop: 100.0,
                path_atten_coeff: 180.0,
                path_atten_power: 0.45,
                shear_velocity: 3.5,
                density: 2.8,
                site_atten: 0.04,
            }),
            Region::Ceus => Some(Self {
                stress_drop: 150.0,
                path_atten_coeff: 680.0,
                path_atten_power: 0.36,
                shear_velocity: 3.6,
                density: 2.8,
                site_atten: 0.006,
            }),
            Region::Unknown => None,
        }
    }
}

impl Default for SourceParameters {
    fn default() -> Self {
        Self {
            stress_drop: 100.0,
            path_atten_coeff: 180.0,
            path_atten_power: 0.45,
            shear_velocity: 3.5,
            density: 2.8,
            site_atten: 0.04,
        }
    }
}

/// Piecewise geometric spreading of the region at hypocentral distance `hypo` (km).
pub fn geometric_attenuation(region: Region, hypo: f64) -> Option<f64> {
    match region {
        Region::Wus => Some(if hypo < 40.0 {
            1.0 / hypo
        } else {
            1.0 / 40.0 * (40.0 / hypo).sqrt()
        }),
        Region::Ceus => Some(if hypo < 70.0 {
            1.0 / hypo
        } else if hypo < 130.0 {
            1.0 / 70.0
        } else {
            1.0 / 70.0 * (130.0 / hypo).sqrt()
        }),
        Region::Unknown => None,
    }
}

/// Brune point-source spectrum with path and site filters.
#[derive(Debug)]
pub struct SourceTheoryRvtMotion {
    base: RvtBase,
    depth: f64,
    params: SourceParameters,
    customized: bool,
    seismic_moment: f64,
    corner_freq: f64,
    hypo_distance: f64,
    geo_atten: f64,
    grid: FrequencyGrid,
    crustal_amp: CrustalAmplification,
    path_duration: PathDurationModel,
}

impl SourceTheoryRvtMotion {
    pub fn new() -> MotionResult<Self> {
        Ok(Self::from_base(RvtBase::new("source-theory")?))
    }

    pub fn with_peak_calculator(peak_calculator: PeakCalculator) -> Self {
        Self::from_base(RvtBase::with_peak_calculator(
            "source-theory",
            peak_calculator,
        ))
    }

    fn from_base(mut base: RvtBase) -> Self {
        base.set_name("Source Theory (M= $mag, R= $dist km)");
        let mut motion = Self {
            base,
            depth: 8.0,
            params: SourceParameters::default(),
            customized: false,
            seismic_moment: 0.0,
            corner_freq: 0.0,
            hypo_distance: 0.0,
            geo_atten: 0.0,
            grid: FrequencyGrid::default(),
            crustal_amp: CrustalAmplification::for_region(Region::Wus),
            path_duration: PathDurationModel::for_region(Region::Wus),
        };
        motion.set_scenario(Scenario::new(6.5, 20.0, Region::Wus));
        motion
    }

    /// Updates magnitude, distance and region; regional constants reload unless customized.
    pub fn set_scenario(&mut self, scenario: Scenario) {
        if !self.customized {
            if let Some(params) = SourceParameters::for_region(scenario.region) {
                self.params = params;
            }
        }
        self.crustal_amp.set_region(scenario.region);
        self.path_duration.set_region(scenario.region);
        self.base.set_scenario(scenario);
        self.update_derived();
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth;
        self.update_derived();
    }

    pub fn parameters(&self) -> &SourceParameters {
        &self.params
    }

    /// Overrides the regional constants and freezes them against region changes.
    pub fn set_parameters(&mut self, params: SourceParameters) {
        self.params = params;
        self.customized = true;
        self.update_derived();
    }

    pub fn is_customized(&self) -> bool {
        self.customized
    }

    /// Returning to regional defaults reloads every derived constant.
    pub fn set_customized(&mut self, customized: bool) {
        self.customized = customized;
        if !customized {
            let scenario = *self.base.scenario();
            self.set_scenario(scenario);
        }
    }

    pub fn geo_atten(&self) -> f64 {
        self.geo_atten
    }

    pub fn set_geo_atten(&mut self, geo_atten: f64) {
        self.customized = true;
        self.geo_atten = geo_atten;
    }

    pub fn seismic_moment(&self) -> f64 {
        self.seismic_moment
    }

    pub fn corner_freq(&self) -> f64 {
        self.corner_freq
    }

    pub fn hypo_distance(&self) -> f64 {
        self.hypo_distance
    }

    pub fn duration(&self) -> f64 {
        self.base.duration()
    }

    pub fn frequency_grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    pub fn set_frequency_grid(&mut self, grid: FrequencyGrid) {
        self.grid = grid;
    }

    pub fn crustal_amp(&self) -> &CrustalAmplification {
        &self.crustal_amp
    }

    pub fn crustal_amp_mut(&mut self) -> &mut CrustalAmplification {
        &mut self.crustal_amp
    }

    pub fn path_duration(&self) -> &PathDurationModel {
        &self.path_duration
    }

    pub fn path_duration_mut(&mut self) -> &mut PathDurationModel {
        &mut self.path_duration
    }

    fn update_derived(&mut self) {
        let scenario = *self.base.scenario();
        self.seismic_moment = 10f64.powf(1.5 * (scenario.magnitude + 10.7));
        if self.params.shear_velocity > 0.0 && self.params.stress_drop > 0.0 {
            self.corner_freq = 4.9e6
                * self.params.shear_velocity
                * (self.params.stress_drop / self.seismic_moment).cbrt();
        }
        if self.depth > 0.0 && scenario.distance > 0.0 {
            self.hypo_distance = self.depth.hypot(scenario.distance);
            if !self.customized {
                if let Some(geo) = geometric_attenuation(scenario.region, self.hypo_distance) {
                    self.geo_atten = geo;
                }
            }
        }
        if self.corner_freq > 0.0 {
            let duration = 1.0 / self.corner_freq + self.path_duration.duration(self.hypo_distance);
            self.base.set_duration(duration);
        }
    }

    /// Fourier amplitude (g-s) at frequency `f`.
    pub fn fourier_amplitude(&self, f: f64) -> f64 {
        let p = &self.params;
        let radiation = (0.55 * 2.0) / (SQRT_2 * 4.0 * PI * p.density * p.shear_velocity.powi(3));
        let source = radiation * self.seismic_moment / (1.0 + (f / self.corner_freq).powi(2));
        let quality = p.path_atten_coeff * f.powf(p.path_atten_power);
        let path =
            self.geo_atten * (-PI * f * self.hypo_distance / (quality * p.shear_velocity)).exp();
        let site = self.crustal_amp.interp_amp_at(f) * (-PI * p.site_atten * f).exp();
        CONVERSION * (2.0 * PI * f).powi(2) * source * path * site
    }
}

impl FasMotion for SourceTheoryRvtMotion {
    fn base(&self) -> &RvtBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RvtBase {
        &mut self.base
    }

    fn prepare(&mut self) -> MotionResult<()> {
        if self.corner_freq <= 0.0 || self.hypo_distance <= 0.0 {
            return Err(MotionError::InvalidInput(
                "source model needs positive depth, distance and stress drop".into(),
            ));
        }
        self.crustal_amp.calculate()?;
        self.update_derived();
        let freq = self.grid.data();
        let fas = freq.iter().map(|&f| self.fourier_amplitude(f)).collect();
        self.base.set_spectrum(freq, fas)
    }
}
