use anyhow::Context;
use clap::{Parser, ValueEnum};
use rvtcore::peak::PeakCalculatorKind;
use rvtcore::{CancellationToken, Region, Scenario};
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{CoefficientFiles, MotionKind, WorkflowConfig};
use workflow::runner::{Runner, WorkflowResult};

mod generator {
    pub mod profile;
}
mod workflow {
    pub mod config;
    pub mod runner;
}

#[derive(Clone, Copy, ValueEnum)]
enum RegionArg {
    Wus,
    Ceus,
}

impl From<RegionArg> for Region {
    fn from(arg: RegionArg) -> Self {
        match arg {
            RegionArg::Wus => Region::Wus,
            RegionArg::Ceus => Region::Ceus,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CalculatorArg {
    Vanmarcke,
    BooreThompson,
    WangRathje,
}

impl From<CalculatorArg> for PeakCalculatorKind {
    fn from(arg: CalculatorArg) -> Self {
        match arg {
            CalculatorArg::Vanmarcke => PeakCalculatorKind::Vanmarcke,
            CalculatorArg::BooreThompson => PeakCalculatorKind::BooreThompson,
            CalculatorArg::WangRathje => PeakCalculatorKind::WangRathje,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Ground-motion driver for RVT and recorded motions")]
struct Args {
    /// Load a workflow config from YAML; the scenario flags are then ignored
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = MotionKind::SourceTheory)]
    motion: MotionKind,
    #[arg(long, default_value_t = 6.5)]
    magnitude: f64,
    /// Epicentral distance (km)
    #[arg(long, default_value_t = 20.0)]
    distance: f64,
    #[arg(long, value_enum, default_value_t = RegionArg::Wus)]
    region: RegionArg,
    /// Hypocentral depth (km)
    #[arg(long, default_value_t = 8.0)]
    depth: f64,
    /// Oscillator damping (%)
    #[arg(long, default_value_t = 5.0)]
    damping: f64,
    #[arg(long, value_enum)]
    calculator: Option<CalculatorArg>,
    /// Boore–Thompson coefficients for western North America
    #[arg(long, requires = "ceus_coefficients")]
    wus_coefficients: Option<PathBuf>,
    /// Boore–Thompson coefficients for central and eastern North America
    #[arg(long, requires = "wus_coefficients")]
    ceus_coefficients: Option<PathBuf>,
    /// Spectrum, target or record file
    #[arg(long)]
    input: Option<PathBuf>,
    /// Write the result as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn print_summary(result: &WorkflowResult) {
    println!("{}", result.name);
    println!(
        "  PGA {:.4} g, PGV {:.3} {}",
        result.pga, result.pgv, result.velocity_units
    );
    if let Some(duration) = result.duration {
        println!("  duration {:.2} s", duration);
    }
    if let Some(report) = &result.matching {
        println!(
            "  matching: {} iterations, rmse {:.4}, max error {:.4}{}",
            report.iterations,
            report.rmse,
            report.max_error,
            if report.cancelled { " (cancelled)" } else { "" }
        );
    }
    println!("  {:>10} {:>10}", "period", "Sa (g)");
    for (period, sa) in result.period.iter().zip(&result.sa) {
        println!("  {:>10.4} {:>10.4}", period, sa);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        let scenario = Scenario::new(args.magnitude, args.distance, args.region.into());
        WorkflowConfig::from_args(args.motion, scenario, args.depth, args.damping)
    };
    if let Some(calculator) = args.calculator {
        workflow_config.calculator = calculator.into();
    }
    if let (Some(wus), Some(ceus)) = (args.wus_coefficients, args.ceus_coefficients) {
        workflow_config.coefficients = Some(CoefficientFiles { wus, ceus });
    }
    if args.input.is_some() {
        workflow_config.input = args.input;
    }
    if args.report.is_some() {
        workflow_config.report = args.report;
    }

    let report_path = workflow_config.report.clone();
    let runner = Runner::new(workflow_config);
    let token = CancellationToken::new();

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    let result = runtime.block_on(async {
        let worker_token = token.clone();
        let mut work = tokio::task::spawn_blocking(move || runner.execute(&worker_token));
        tokio::select! {
            joined = &mut work => joined.context("joining workflow task")?,
            interrupted = signal::ctrl_c() => {
                interrupted.context("awaiting Ctrl+C")?;
                log::warn!("interrupt received, stopping after the current iteration");
                token.cancel();
                work.await.context("joining workflow task")?
            }
        }
    })?;

    print_summary(&result);

    if let Some(path) = report_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&result).context("serializing report")?;
        fs::write(&path, json).with_context(|| format!("writing report {}", path.display()))?;
        log::info!("report written to {}", path.display());
    }

    Ok(())
}
