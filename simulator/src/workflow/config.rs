use anyhow::Context;
use clap::ValueEnum;
use rvtcore::math::FrequencyGrid;
use rvtcore::motion::{CompatibleSettings, TimeSeriesLayout};
use rvtcore::peak::PeakCalculatorKind;
use rvtcore::units::UnitSystem;
use rvtcore::{Region, Scenario};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::profile::GeneratorConfig;

/// Motion family driven by a workflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    #[default]
    SourceTheory,
    Rvt,
    Compatible,
    TimeSeries,
    Synthetic,
}

/// Boore–Thompson coefficient files, e.g. `wna_bt15_trms4osc.json` and `cena_bt15_trms4osc.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoefficientFiles {
    pub wus: PathBuf,
    pub ceus: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub motion: MotionKind,
    pub scenario: Scenario,
    /// Hypocentral depth (km) of the source-theory motion.
    pub depth: f64,
    /// Response spectrum damping (%).
    pub damping: f64,
    pub calculator: PeakCalculatorKind,
    /// Required by the duration-corrected calculators.
    pub coefficients: Option<CoefficientFiles>,
    pub units: UnitSystem,
    /// Spectrum, target or record file for file-based motions.
    pub input: Option<PathBuf>,
    /// Scale applied to imported amplitudes.
    pub scale: f64,
    pub grid: FrequencyGrid,
    pub compatible: CompatibleSettings,
    /// Record layout for time series that are not AT2 files.
    pub layout: TimeSeriesLayout,
    pub generator: GeneratorConfig,
    pub report: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            motion: MotionKind::SourceTheory,
            scenario: Scenario::new(6.5, 20.0, Region::Wus),
            depth: 8.0,
            damping: 5.0,
            calculator: PeakCalculatorKind::default(),
            coefficients: None,
            units: UnitSystem::default(),
            input: None,
            scale: 1.0,
            grid: FrequencyGrid::default(),
            compatible: CompatibleSettings::default(),
            layout: TimeSeriesLayout::default(),
            generator: GeneratorConfig::default(),
            report: None,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_args(motion: MotionKind, scenario: Scenario, depth: f64, damping: f64) -> Self {
        Self {
            motion,
            scenario,
            depth,
            damping,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.damping <= 0.0 {
            anyhow::bail!("damping must be positive, got {}", self.damping);
        }
        let needs_input = matches!(
            self.motion,
            MotionKind::Rvt | MotionKind::Compatible | MotionKind::TimeSeries
        );
        if needs_input && self.input.is_none() {
            anyhow::bail!("{:?} motions need an input file", self.motion);
        }
        let uses_calculator = !matches!(self.motion, MotionKind::TimeSeries | MotionKind::Synthetic);
        if uses_calculator && self.calculator.needs_tables() && self.coefficients.is_none() {
            anyhow::bail!(
                "the {} calculator needs wus and ceus coefficient files",
                self.calculator.label()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_keeps_defaults() {
        let cfg = WorkflowConfig::from_args(
            MotionKind::SourceTheory,
            Scenario::new(7.0, 50.0, Region::Ceus),
            10.0,
            5.0,
        );
        assert_eq!(cfg.scenario.region, Region::Ceus);
        assert_eq!(cfg.grid.count, 1024);
        assert_eq!(cfg.compatible.max_iterations, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"motion: compatible\ninput: target.csv\nscenario:\n  magnitude: 5.5\n  distance: 12.0\n  region: CEUS\ncompatible:\n  limit_fas: true\nunits: English\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.motion, MotionKind::Compatible);
        assert_eq!(cfg.scenario.magnitude, 5.5);
        assert!(cfg.compatible.limit_fas);
        assert_eq!(cfg.units, UnitSystem::English);
        assert_eq!(cfg.compatible.min_rmse, 0.005);
    }

    #[test]
    fn file_motions_require_input() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"motion: time_series\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());
    }

    #[test]
    fn corrected_calculators_require_coefficient_files() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"calculator: BooreThompson
").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());

        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"calculator: WangRathje
coefficients:
  wus: wna_bt15_trms4osc.json
  ceus: cena_bt15_trms4osc.json
",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.calculator, PeakCalculatorKind::WangRathje);
        assert_eq!(
            cfg.coefficients.unwrap().ceus,
            PathBuf::from("cena_bt15_trms4osc.json")
        );
        assert_eq!(WorkflowConfig::default().calculator, PeakCalculatorKind::Vanmarcke);
    }
}
