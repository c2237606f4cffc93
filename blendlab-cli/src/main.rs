//! BlendLab CLI — run, optimize and sweep commands.
//!
//! Commands:
//! - `run` — evaluate one parameter vector from a TOML config
//! - `optimize` — minimize the objective with Powell or random search
//! - `sweep` — evaluate the configured parameter grid in parallel

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use blendlab_runner::config::{CombinationConfig, OptimizerMethod};
use blendlab_runner::export::{export_sweep_csv, write_artifacts};
use blendlab_runner::runner::{self, RunReport};
use blendlab_runner::{LoadedFeed, PARAM_COUNT};

#[derive(Parser)]
#[command(
    name = "blendlab",
    about = "BlendLab CLI — combined SMA crossover and mean-reversion signal study"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
struct StudyArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: PathBuf,

    /// Override instrument.start (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// Override instrument.end (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,

    /// Use a seeded synthetic random walk instead of the configured CSV.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for --synthetic.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one parameter vector.
    Run {
        #[command(flatten)]
        study: StudyArgs,

        /// Comma-separated sma_short,sma_long,mr_window,mr_deviation.
        /// Defaults to params.start.
        #[arg(long)]
        params: Option<String>,

        /// Output directory for report.json and curves.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Minimize the negated final multiple from params.start.
    Optimize {
        #[command(flatten)]
        study: StudyArgs,

        /// Override optimizer.method: powell or random.
        #[arg(long)]
        method: Option<String>,

        /// Output directory for report.json and curves.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Evaluate every point of the configured grid.
    Sweep {
        #[command(flatten)]
        study: StudyArgs,

        /// Number of best entries to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Write all entries to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the top entries as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            study,
            params,
            output_dir,
        } => run_cmd(&study, params.as_deref(), &output_dir),
        Commands::Optimize {
            study,
            method,
            output_dir,
        } => optimize_cmd(&study, method.as_deref(), &output_dir),
        Commands::Sweep {
            study,
            top,
            output,
            json,
        } => sweep_cmd(&study, top, output.as_deref(), json),
    }
}

fn load_study(study: &StudyArgs) -> Result<(CombinationConfig, LoadedFeed)> {
    let mut config = CombinationConfig::load(&study.config)
        .with_context(|| format!("loading {}", study.config.display()))?;

    if let Some(start) = &study.start {
        config.instrument.start = parse_date(start)?;
    }
    if let Some(end) = &study.end {
        config.instrument.end = parse_date(end)?;
    }
    // Overrides go through the same checks as the file.
    config.validate()?;

    let loaded = runner::load_feed(&config, study.synthetic, study.seed)?;
    Ok((config, loaded))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn parse_params(s: &str) -> Result<Vec<f64>> {
    let values = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid parameter '{v}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    if values.len() != PARAM_COUNT {
        bail!(
            "expected {PARAM_COUNT} comma-separated parameters, got {}",
            values.len()
        );
    }
    Ok(values)
}

fn run_cmd(study: &StudyArgs, params: Option<&str>, output_dir: &Path) -> Result<()> {
    let (config, loaded) = load_study(study)?;
    let params = match params {
        Some(s) => parse_params(s)?,
        None => config.params.start.to_vec(),
    };

    let (report, run) = runner::run_combination(&config, &loaded, &params)?;
    print_summary(&report);

    let run_dir = write_artifacts(output_dir, &report, &run)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn optimize_cmd(study: &StudyArgs, method: Option<&str>, output_dir: &Path) -> Result<()> {
    let (config, loaded) = load_study(study)?;
    let mut optimizer = config.optimizer.clone();
    if let Some(name) = method {
        optimizer.method = match name {
            "powell" => OptimizerMethod::Powell,
            "random" => OptimizerMethod::Random,
            _ => bail!("unknown method '{name}'. Valid: powell, random"),
        };
    }

    let (report, run) = runner::optimize(&config, &optimizer, &loaded)?;
    print_summary(&report);

    let run_dir = write_artifacts(output_dir, &report, &run)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn sweep_cmd(study: &StudyArgs, top: usize, output: Option<&Path>, json: bool) -> Result<()> {
    let (config, loaded) = load_study(study)?;
    let results = runner::sweep(&config, &loaded)?;

    if json {
        println!("{}", serde_json::to_string_pretty(results.top(top))?);
    } else {
        println!();
        println!(
            "=== Sweep: {} evaluated, {} skipped, {} rejected ===",
            results.entries.len(),
            results.skipped,
            results.rejected
        );
        println!(
            "{:>4} {:>6} {:>6} {:>6} {:>8} {:>12} {:>8}",
            "Rank", "Short", "Long", "MRWin", "MRDev", "Multiple", "Trades"
        );
        println!("{}", "-".repeat(56));
        for (i, e) in results.top(top).iter().enumerate() {
            println!(
                "{:>4} {:>6} {:>6} {:>6} {:>8.3} {:>12.6} {:>8}",
                i + 1,
                e.params.sma_short,
                e.params.sma_long,
                e.params.mr_window,
                e.params.mr_deviation,
                e.final_multiple,
                e.total_trades
            );
        }
        println!();
    }

    if let Some(path) = output {
        std::fs::write(path, export_sweep_csv(&results)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Sweep table saved to: {}", path.display());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    let m = &report.metrics;
    println!();
    println!("=== Combination Result ===");
    println!("Instrument:     {}", report.instrument);
    println!(
        "Period:         {} to {}",
        report.start_date, report.end_date
    );
    println!("Mode:           {:?}", report.mode);
    println!(
        "Params:         sma {}/{}, mr {} @ {:.3}",
        report.params.sma_short,
        report.params.sma_long,
        report.params.mr_window,
        report.params.mr_deviation
    );
    println!("Bars:           {}", m.bars);
    println!(
        "Trades:         {} (units {})",
        m.total_trades,
        m.trades.units()
    );
    println!();
    println!("--- Performance ---");
    println!("Final Multiple: {:.6}", m.final_multiple);
    println!("Market:         {:.6}", m.market_multiple);
    println!("Outperformance: {:+.6}", m.outperformance);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Sharpe/bar:     {:.4}", m.sharpe_per_bar);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    for source in &report.sources {
        println!(
            "  {:<16} {:.6} ({} trades)",
            source.name, source.final_multiple, source.total_trades
        );
    }
    if let Some(opt) = &report.optimization {
        println!();
        println!("--- Optimization ---");
        println!("Objective:      {:.6}", opt.value);
        println!("Evaluations:    {}", opt.evaluations);
        println!("Iterations:     {}", opt.iterations);
        println!("Converged:      {}", opt.converged);
    }
    if report.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}
