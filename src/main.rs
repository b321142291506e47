// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inflation_sdp::config::{load_and_validate_config, RunConfig};
use inflation_sdp::engine::{
    build_relaxation, default_concurrency, scan_visibility, BatchRunner, RunReport,
};
use inflation_sdp::scenario::InflationProblem;

#[derive(Parser)]
#[command(name = "inflation-sdp")]
#[command(version)]
#[command(about = "Inflation relaxations of causal scenarios as semidefinite programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one or more run configurations concurrently
    Run {
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Maximum number of relaxations solved at once
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a run configuration and show the resolved scenario
    Validate { config: PathBuf },

    /// Write the relaxation of a run configuration to .dat-s, .csv or .json
    Export { config: PathBuf, path: PathBuf },

    /// Bisect the visibility of the configured distribution family
    Scan {
        config: PathBuf,

        #[arg(long)]
        low: Option<f64>,

        #[arg(long)]
        high: Option<f64>,

        #[arg(long)]
        precision: Option<f64>,
    },
}

fn load(path: &Path) -> anyhow::Result<RunConfig> {
    load_and_validate_config(path).with_context(|| format!("loading {}", path.display()))
}

fn print_report(report: &RunReport) {
    println!("📋 {}", report.name);
    println!("   status:    {}", report.status);
    println!("   solver:    {}", report.solver);
    match report.objective_value {
        Some(value) => println!("   objective: {:.8}", value),
        None => println!("   lambda:    {:.8e}", report.primal_objective),
    }
    if let Some(inequality) = &report.certificate_inequality {
        println!("   certificate: {}", inequality);
    }
    if let Some(path) = &report.export {
        println!("   exported:  {}", path.display());
    }
    println!("   time:      {:?}", report.duration);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            configs,
            max_concurrency,
            json,
        } => {
            let loaded = configs.iter().map(|path| load(path)).collect::<anyhow::Result<Vec<_>>>()?;
            let runner = BatchRunner::new(max_concurrency.unwrap_or_else(default_concurrency));
            let results = runner.run(loaded).await;

            let mut failures = 0;
            let mut reports = Vec::new();
            for (name, outcome) in results {
                match outcome {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        failures += 1;
                        eprintln!("❌ {}: {}", name, e);
                    }
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_report(report);
                }
            }
            if failures > 0 {
                bail!("{} of {} runs failed", failures, configs.len());
            }
        }
        Commands::Validate { config } => {
            let cfg = load(&config)?;
            let problem = InflationProblem::from_config(&cfg.scenario)?;
            println!("✅ {} is valid", config.display());
            println!("{}", problem);
        }
        Commands::Export { config, path } => {
            let cfg = load(&config)?;
            let written = tokio::task::spawn_blocking(move || -> anyhow::Result<PathBuf> {
                let sdp = build_relaxation(&cfg)?;
                Ok(sdp.write_to_file(&path)?)
            })
            .await??;
            println!("💾 wrote {}", written.display());
        }
        Commands::Scan {
            config,
            low,
            high,
            precision,
        } => {
            let cfg = load(&config)?;
            let mut window = cfg.scan.clone();
            window.low = low.unwrap_or(window.low);
            window.high = high.unwrap_or(window.high);
            window.precision = precision.or(window.precision);

            let report = tokio::task::spawn_blocking(move || scan_visibility(&cfg, &window)).await??;
            for step in &report.steps {
                println!(
                    "   v = {:.6}  {:<12} lambda = {:.3e}",
                    step.visibility, step.status.to_string(), step.lambda
                );
            }
            println!(
                "🎯 {}: critical visibility {:.6}",
                report.name, report.critical_visibility
            );
        }
    }
    Ok(())
}
