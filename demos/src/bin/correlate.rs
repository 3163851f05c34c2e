//! Score Correlation Tool
//!
//! Reads predicted quality scores and mean opinion scores (MOS) from a CSV
//! file and reports every registered correlation metric. Scores stay in
//! `f64` unless `--via-backend` feeds them through the selected backend in
//! batches, where they take the backend's float precision.
//!
//! ## Usage
//!
//! ```bash
//! # Table output
//! cargo run --bin correlate -- scores.csv --prediction-column pred --mos-column mos
//!
//! # Logistic rescale before RMSE/PLCC, JSON output
//! cargo run --bin correlate -- scores.csv --fit-scale --curve-type 5params --json
//! ```

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use iqa_burn::{CurveType, METRICS};
use iqa_demos::{
    collect_exact, collect_via_backend, create_device, get_backend_name, SelectedBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV file with a header row
    input: PathBuf,

    /// Header of the predicted-score column
    #[arg(long, default_value = "pred")]
    prediction_column: String,

    /// Header of the ground-truth MOS column
    #[arg(long, default_value = "mos")]
    mos_column: String,

    /// Map predictions onto the MOS scale before RMSE and PLCC
    #[arg(long)]
    fit_scale: bool,

    /// Logistic curve used by --fit-scale (4params or 5params)
    #[arg(long, default_value = "4params")]
    curve_type: CurveType,

    /// Round-trip the scores through backend tensors, as an evaluation loop would
    #[arg(long)]
    via_backend: bool,

    /// Rows per tensor batch with --via-backend
    #[arg(long, default_value = "256")]
    batch_size: usize,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let (predictions, mos) = read_scores(&args)?;
    log::info!(
        "Read {} score pairs from {}",
        predictions.len(),
        args.input.display()
    );

    let collector = if args.via_backend {
        collect_via_backend::<SelectedBackend>(
            &predictions,
            &mos,
            args.batch_size,
            &create_device(),
        )?
    } else {
        collect_exact::<SelectedBackend>(&predictions, &mos)?
    };

    let curve_type = args.fit_scale.then_some(args.curve_type);
    let mut results = BTreeMap::new();
    for (name, metric) in METRICS.iter() {
        let value = metric
            .compute_with_curve(collector.predictions(), collector.targets(), curve_type)
            .with_context(|| format!("Failed to compute {name}"))?;
        results.insert(metric.label(), value);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        if args.via_backend {
            println!("Using backend: {}", get_backend_name());
        }
        println!("Samples: {}", collector.len());
        if let Some(curve_type) = curve_type {
            println!("Fit scale: {curve_type}");
        }
        println!("{:<6} {:>10}", "Metric", "Value");
        for (label, value) in &results {
            println!("{label:<6} {value:>10.4}");
        }
    }

    Ok(())
}

/// Read the two score columns, located by header name
fn read_scores(args: &Args) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&args.input)
        .with_context(|| format!("Failed to open CSV file: {}", args.input.display()))?;

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .with_context(|| format!("Column '{name}' not found in header: {headers:?}"))
    };
    let pred_idx = column(&args.prediction_column)?;
    let mos_idx = column(&args.mos_column)?;

    let mut predictions = Vec::new();
    let mut mos = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", row + 1))?;
        predictions.push(parse_field(&record, pred_idx, row)?);
        mos.push(parse_field(&record, mos_idx, row)?);
    }

    Ok((predictions, mos))
}

fn parse_field(record: &csv::StringRecord, index: usize, row: usize) -> Result<f64> {
    let field = record
        .get(index)
        .with_context(|| format!("Row {} has no column {index}", row + 1))?;
    field
        .trim()
        .parse()
        .with_context(|| format!("Row {}: '{field}' is not a number", row + 1))
}
