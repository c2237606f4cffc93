//! Reporting and export — JSON and CSV artifact generation.
//!
//! - **JSON**: the run report, with schema versioning
//! - **CSV**: per-bar curves of the combined evaluation, and sweep tables
//!
//! All persisted reports include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::objective::CombinationRun;
use crate::runner::{RunReport, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the combined evaluation bar by bar.
///
/// Columns: time, returns, strategy, trades, creturns, cstrategy, position
pub fn export_curves_csv(run: &CombinationRun) -> Result<String> {
    let ev = &run.output.evaluation;
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "time",
        "returns",
        "strategy",
        "trades",
        "creturns",
        "cstrategy",
        "position",
    ])?;

    for (i, time) in ev.index().as_slice().iter().enumerate() {
        wtr.write_record([
            &time.to_rfc3339(),
            &format!("{:.10}", ev.returns()[i]),
            &format!("{:.10}", ev.strategy()[i]),
            &ev.trades()[i].to_string(),
            &format!("{:.10}", ev.creturns()[i]),
            &format!("{:.10}", ev.cstrategy()[i]),
            &ev.positions()[i].to_string(),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Export sweep entries, best first.
///
/// Columns: rank, sma_short, sma_long, mr_window, mr_deviation, objective,
/// final_multiple, total_trades
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "sma_short",
        "sma_long",
        "mr_window",
        "mr_deviation",
        "objective",
        "final_multiple",
        "total_trades",
    ])?;
    for (rank, e) in results.entries.iter().enumerate() {
        wtr.write_record([
            &(rank + 1).to_string(),
            &e.params.sma_short.to_string(),
            &e.params.sma_long.to_string(),
            &e.params.mr_window.to_string(),
            &e.params.mr_deviation.to_string(),
            &format!("{:.10}", e.objective),
            &format!("{:.10}", e.final_multiple),
            &e.total_trades.to_string(),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

// ─── Artifact directory ─────────────────────────────────────────────

/// Write `report.json` and `curves.csv` under `dir/<run_id prefix>/`.
pub fn write_artifacts(dir: &Path, report: &RunReport, run: &CombinationRun) -> Result<PathBuf> {
    let short_id: String = report.run_id.chars().take(12).collect();
    let out = dir.join(short_id);
    std::fs::create_dir_all(&out)
        .with_context(|| format!("failed to create {}", out.display()))?;

    let json_path = out.join("report.json");
    std::fs::write(&json_path, export_json(report)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let csv_path = out.join("curves.csv");
    std::fs::write(&csv_path, export_curves_csv(run)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    Ok(out)
}
