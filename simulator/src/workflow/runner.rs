use crate::generator::profile::build_accelerogram;
use crate::workflow::config::{MotionKind, WorkflowConfig};
use anyhow::Context;
use rvtcore::motion::import::{self, ImportedRvtMotion};
use rvtcore::motion::{
    CompatibleRvtMotion, FasMotion, MatchReport, SourceTheoryRvtMotion, TimeSeriesMotion,
};
use rvtcore::peak::{DurationTables, PeakCalculator};
use rvtcore::units::UnitSystem;
use rvtcore::{CancellationToken, Motion};
use serde::Serialize;
use std::path::Path;

/// Summary of one calculated motion, written as the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub name: String,
    pub motion: MotionKind,
    pub pga: f64,
    pub pgv: f64,
    pub velocity_units: &'static str,
    /// RVT duration (s); absent for time-domain motions.
    pub duration: Option<f64>,
    pub damping: f64,
    pub period: Vec<f64>,
    pub sa: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchReport>,
}

impl WorkflowResult {
    fn from_motion(
        motion: &dyn Motion,
        kind: MotionKind,
        units: UnitSystem,
        duration: Option<f64>,
    ) -> Self {
        let spectrum = motion.response_spectrum();
        Self {
            name: motion.name(),
            motion: kind,
            pga: motion.pga(),
            pgv: motion.pgv(),
            velocity_units: units.vel_ts_label(),
            duration,
            damping: spectrum.damping(),
            period: spectrum.period().to_vec(),
            sa: spectrum.sa().to_vec(),
            matching: None,
        }
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    fn peak_calculator(&self) -> anyhow::Result<PeakCalculator> {
        let kind = self.config.calculator;
        match &self.config.coefficients {
            Some(files) if kind.needs_tables() => {
                let tables = DurationTables::read(&files.wus, &files.ceus)
                    .context("loading duration coefficient tables")?;
                Ok(PeakCalculator::with_tables(kind, &tables))
            }
            _ => PeakCalculator::new(kind).context("building peak calculator"),
        }
    }

    fn input(&self) -> anyhow::Result<&Path> {
        self.config
            .input
            .as_deref()
            .context("workflow needs an input file")
    }

    /// Builds and calculates the configured motion; `cancel` stops spectral matching early.
    pub fn execute(&self, cancel: &CancellationToken) -> anyhow::Result<WorkflowResult> {
        self.config.validate()?;
        match self.config.motion {
            MotionKind::SourceTheory => self.run_source_theory(),
            MotionKind::Rvt => self.run_rvt(),
            MotionKind::Compatible => self.run_compatible(cancel),
            MotionKind::TimeSeries => {
                let path = self.input()?;
                let is_at2 = path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("at2"));
                let motion = if is_at2 {
                    import::read_at2(path, self.config.scale)
                } else {
                    import::read_time_series(path, &self.config.layout)
                }
                .with_context(|| format!("loading record {}", path.display()))?;
                self.run_time_series(motion)
            }
            MotionKind::Synthetic => {
                let generator = &self.config.generator;
                let accel = build_accelerogram(generator).context("generating accelerogram")?;
                let motion = TimeSeriesMotion::new("synthetic", generator.time_step, accel)
                    .context("building synthetic record")?;
                self.run_time_series(motion)
            }
        }
    }

    fn run_source_theory(&self) -> anyhow::Result<WorkflowResult> {
        let mut motion = SourceTheoryRvtMotion::with_peak_calculator(self.peak_calculator()?);
        motion.set_scenario(self.config.scenario);
        motion.set_depth(self.config.depth);
        motion.set_frequency_grid(self.config.grid);
        motion.base_mut().set_units(self.config.units);
        motion.response_spectrum_mut().set_damping(self.config.damping);
        motion.calculate().context("calculating source-theory motion")?;
        log::info!(
            "corner frequency {:.3} Hz, duration {:.2} s",
            motion.corner_freq(),
            motion.duration()
        );
        Ok(WorkflowResult::from_motion(
            &motion,
            MotionKind::SourceTheory,
            self.config.units,
            Some(motion.duration()),
        ))
    }

    fn run_rvt(&self) -> anyhow::Result<WorkflowResult> {
        let path = self.input()?;
        let imported = import::read_rvt_text(path, self.config.scale)
            .with_context(|| format!("loading RVT motion {}", path.display()))?;
        let mut motion = match imported {
            ImportedRvtMotion::Rvt(motion) => motion,
            ImportedRvtMotion::Compatible(_) => {
                anyhow::bail!("{} holds a compatible target, not a spectrum", path.display())
            }
        };
        let base = motion.base_mut();
        base.set_peak_calculator(self.peak_calculator()?);
        base.set_scenario(self.config.scenario);
        base.set_units(self.config.units);
        base.response_spectrum_mut().set_damping(self.config.damping);
        motion.calculate().context("calculating RVT motion")?;
        let duration = motion.base().duration();
        Ok(WorkflowResult::from_motion(
            &motion,
            MotionKind::Rvt,
            self.config.units,
            Some(duration),
        ))
    }

    fn run_compatible(&self, cancel: &CancellationToken) -> anyhow::Result<WorkflowResult> {
        let path = self.input()?;
        let imported = import::read_rvt_text(path, self.config.scale)
            .with_context(|| format!("loading target spectrum {}", path.display()))?;
        let mut motion: CompatibleRvtMotion = match imported {
            ImportedRvtMotion::Compatible(motion) => motion,
            ImportedRvtMotion::Rvt(_) => {
                anyhow::bail!("{} holds a spectrum, not a compatible target", path.display())
            }
        };
        let base = motion.base_mut();
        base.set_peak_calculator(self.peak_calculator()?);
        base.set_scenario(self.config.scenario);
        base.set_units(self.config.units);
        motion.set_frequency_grid(self.config.grid);
        motion.set_settings(self.config.compatible);
        motion.set_cancellation_token(cancel.clone());
        motion.calculate().context("matching target spectrum")?;

        let mut result = WorkflowResult::from_motion(
            &motion,
            MotionKind::Compatible,
            self.config.units,
            Some(motion.duration()),
        );
        result.matching = motion.last_report();
        Ok(result)
    }

    fn run_time_series(&self, mut motion: TimeSeriesMotion) -> anyhow::Result<WorkflowResult> {
        motion.set_units(self.config.units);
        motion.response_spectrum_mut().set_damping(self.config.damping);
        motion.calculate().context("calculating time-series motion")?;
        Ok(WorkflowResult::from_motion(
            &motion,
            self.config.motion,
            self.config.units,
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvtcore::math::{FrequencyGrid, Spacing};
    use crate::workflow::config::CoefficientFiles;
    use rvtcore::peak::PeakCalculatorKind;
    use rvtcore::{Region, Scenario};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn small(config: WorkflowConfig) -> WorkflowConfig {
        WorkflowConfig {
            calculator: PeakCalculatorKind::Vanmarcke,
            grid: FrequencyGrid::new(0.1, 50.0, 256, Spacing::Log),
            ..config
        }
    }

    #[test]
    fn runner_executes_source_theory() {
        let cfg = small(WorkflowConfig::from_args(
            MotionKind::SourceTheory,
            Scenario::new(6.0, 25.0, Region::Wus),
            8.0,
            5.0,
        ));
        let result = Runner::new(cfg).execute(&CancellationToken::new()).unwrap();
        assert!(result.pga > 0.0);
        assert_eq!(result.sa.len(), result.period.len());
        assert!(result.duration.unwrap() > 0.0);
    }

    #[test]
    fn runner_executes_synthetic_record() {
        let cfg = WorkflowConfig {
            motion: MotionKind::Synthetic,
            ..WorkflowConfig::default()
        };
        let result = Runner::new(cfg).execute(&CancellationToken::new()).unwrap();
        assert!((result.pga - 0.2).abs() < 1e-9);
        assert!(result.duration.is_none());
    }

    #[test]
    fn runner_reports_compatible_matching() {
        let mut target = NamedTempFile::new().unwrap();
        target
            .write_all(
                b"kind,CompatibleRvtMotion\nname,Design\ndescription,\ntype,Outcrop\nduration,8\n\
0.02,0.30\n0.05,0.45\n0.1,0.65\n0.2,0.70\n0.3,0.62\n0.5,0.45\n0.75,0.32\n1.0,0.24\n2.0,0.11\n3.0,0.07\n",
            )
            .unwrap();
        let path = target.into_temp_path();
        let cfg = small(WorkflowConfig {
            motion: MotionKind::Compatible,
            input: Some(path.to_path_buf()),
            ..WorkflowConfig::default()
        });
        let result = Runner::new(cfg).execute(&CancellationToken::new()).unwrap();
        let report = result.matching.unwrap();
        assert!(report.iterations >= 1);
        assert!(report.rmse.is_finite());
        assert_eq!(result.period.len(), 10);
    }

    #[test]
    fn runner_rejects_missing_input() {
        let cfg = WorkflowConfig {
            motion: MotionKind::Rvt,
            ..WorkflowConfig::default()
        };
        assert!(Runner::new(cfg).execute(&CancellationToken::new()).is_err());
    }

    #[test]
    fn runner_loads_duration_tables_for_corrected_calculators() {
        let mut table = NamedTempFile::new().unwrap();
        table
            .write_all(
                br#"{"M":[4.0,8.0,4.0,8.0],"R":[1.0,1.0,500.0,500.0],
"c1":[1.2,1.2,1.2,1.2],"c2":[0,0,0,0],"c3":[1,1,1,1],"c4":[0,0,0,0],
"c5":[0,0,0,0],"c6":[1,1,1,1],"c7":[1,1,1,1]}"#,
            )
            .unwrap();
        let path = table.into_temp_path();
        let base = WorkflowConfig::from_args(
            MotionKind::SourceTheory,
            Scenario::new(6.0, 25.0, Region::Wus),
            8.0,
            5.0,
        );
        let plain = Runner::new(small(base.clone()))
            .execute(&CancellationToken::new())
            .unwrap();
        let corrected = Runner::new(WorkflowConfig {
            calculator: PeakCalculatorKind::BooreThompson,
            coefficients: Some(CoefficientFiles {
                wus: path.to_path_buf(),
                ceus: path.to_path_buf(),
            }),
            grid: FrequencyGrid::new(0.1, 50.0, 256, Spacing::Log),
            ..base
        })
        .execute(&CancellationToken::new())
        .unwrap();

        // A longer oscillator duration lowers Sa but leaves PGA alone.
        assert!((corrected.pga - plain.pga).abs() < 1e-12);
        let index = corrected.period.len() / 2;
        assert!(corrected.sa[index] < plain.sa[index]);
    }
}
