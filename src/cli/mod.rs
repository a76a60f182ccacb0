//! smartprice CLI module
//!
//! Command-line interface for training both models, one-off predictions and
//! source data inspection.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::export::{
    ModelStore, FRAUD_MODEL, FRAUD_PREPROCESSOR, PRICE_MODEL, PRICE_PREPROCESSOR,
};
use crate::inference::{
    FraudDetectionResponse, Prediction, PricePredictionResponse, Predictor, ProductRecord,
};
use crate::preprocessing::ProductSchema;
use crate::training::{FraudTrainer, FraudTrainingReport, PriceTrainer, PriceTrainingReport};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(235, 110, 110) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn step_failed() {
    println!("{}", bad("failed"));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "smartprice")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Price estimation and fraud flagging for product listings")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON config file; flags below override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Source CSV of product listings
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Artifact directory
    #[arg(short, long, global = true)]
    pub models: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the price model and the fraud detector
    Train,

    /// Train only the price model
    TrainPrice,

    /// Train only the fraud detector
    TrainFraud,

    /// Estimate the price of one listing
    PredictPrice(RecordArgs),

    /// Check one listing for fraud
    PredictFraud(RecordArgs),

    /// Summarize the source data and the artifact directory
    Info,
}

/// One listing given on the command line
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    #[arg(long)]
    pub brand: String,

    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub material: String,

    #[arg(long)]
    pub rating: f64,

    #[arg(long)]
    pub transactions: i64,

    /// Listed price (fraud checks treat a missing price as 0)
    #[arg(long)]
    pub price: Option<f64>,
}

impl From<RecordArgs> for ProductRecord {
    fn from(args: RecordArgs) -> Self {
        ProductRecord {
            brand: args.brand,
            category: args.category,
            material: args.material,
            rating: args.rating,
            transactions: args.transactions,
            price: args.price,
        }
    }
}

/// Merge the config file (or defaults) with command-line overrides
pub fn resolve_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if let Some(models) = &cli.models {
        config.model_dir = models.clone();
    }
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(config: &PipelineConfig) -> anyhow::Result<()> {
    cmd_train_price(config)?;
    cmd_train_fraud(config)
}

pub fn cmd_train_price(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Train price model");
    kv("Data", &config.data_path.display().to_string());

    step_run("Fitting candidates");
    let start = Instant::now();
    let trainer = PriceTrainer::new(ModelStore::new(&config.model_dir))
        .with_config(config.price.clone())
        .with_split(config.split.clone());
    let report = trainer
        .train_from_path(&config.data_path)
        .inspect_err(|_| step_failed())?;
    step_done(&format!("{:?}", start.elapsed()));

    print_price_report(&report);
    Ok(())
}

fn print_price_report(report: &PriceTrainingReport) {
    println!();
    kv("Rows", &format!("{} raw, {} clean", report.n_rows_raw, report.n_rows_clean));
    kv("Split", &format!("{} train / {} test", report.n_train, report.n_test));
    kv("Features", &report.n_features.to_string());
    println!();
    println!(
        "  {:<20} {:>12} {:>10}",
        muted("Candidate"),
        muted("MSE"),
        muted("R²")
    );
    println!("  {}", dim(&"─".repeat(44)));
    for candidate in &report.candidates {
        let marker = if candidate.name == report.selected { ok("●") } else { dim("○") };
        println!(
            "  {} {:<18} {:>12.2} {:>10.4}",
            marker,
            candidate.name,
            candidate.metrics.mse.unwrap_or(f64::NAN),
            candidate.metrics.r2.unwrap_or(f64::NAN)
        );
    }
    println!();
    for path in &report.artifacts {
        println!("  {} {}", ok("✓"), path.display());
    }
    println!();
}

pub fn cmd_train_fraud(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Train fraud detector");
    kv("Data", &config.data_path.display().to_string());

    step_run("Fitting isolation forest");
    let start = Instant::now();
    let trainer = FraudTrainer::new(ModelStore::new(&config.model_dir))
        .with_config(config.fraud.clone())
        .with_split(config.split.clone());
    let report = trainer
        .train_from_path(&config.data_path)
        .inspect_err(|_| step_failed())?;
    step_done(&format!("{:?}", start.elapsed()));

    print_fraud_report(&report);
    Ok(())
}

fn print_fraud_report(report: &FraudTrainingReport) {
    let pct = |v: Option<f64>| format!("{:.1}%", v.unwrap_or(0.0) * 100.0);
    println!();
    kv("Split", &format!("{} train / {} test", report.n_train, report.n_test));
    kv("Weak positives", &report.n_weak_positive.to_string());
    if report.forced_label {
        println!("  {}", "no row matched the heuristics; first row labelled fraud".yellow());
    }
    kv("Flagged (test)", &report.n_flagged.to_string());
    kv("Accuracy", &pct(report.metrics.accuracy));
    println!();
    println!(
        "  {:<16} {:>10} {:>10} {:>10} {:>8}",
        muted("Class"),
        muted("Precision"),
        muted("Recall"),
        muted("F1"),
        muted("Support")
    );
    println!("  {}", dim(&"─".repeat(58)));
    let classes = &report.classes;
    for (label, row) in [
        ("fraud", &classes.positive),
        ("normal", &classes.negative),
        ("macro avg", &classes.macro_avg),
        ("weighted avg", &classes.weighted_avg),
    ] {
        println!(
            "  {:<16} {:>10.3} {:>10.3} {:>10.3} {:>8}",
            label, row.precision, row.recall, row.f1_score, row.support
        );
    }
    println!();
    for path in &report.artifacts {
        println!("  {} {}", ok("✓"), path.display());
    }
    println!();
}

pub fn cmd_predict_price(config: &PipelineConfig, record: ProductRecord) -> anyhow::Result<()> {
    let predictor = Predictor::new(ModelStore::new(&config.model_dir));
    match predictor.predict_price(&record) {
        Prediction::Value(predicted_price) => {
            println!(
                "{}",
                serde_json::to_string(&PricePredictionResponse { predicted_price })?
            );
            Ok(())
        }
        Prediction::Unavailable(reason) => anyhow::bail!("price model unavailable: {}", reason),
        Prediction::Fault(reason) => anyhow::bail!("price prediction failed: {}", reason),
    }
}

pub fn cmd_predict_fraud(config: &PipelineConfig, record: ProductRecord) -> anyhow::Result<()> {
    let predictor = Predictor::new(ModelStore::new(&config.model_dir));
    match predictor.predict_fraud(&record) {
        Prediction::Value(is_fraud) => {
            println!("{}", serde_json::to_string(&FraudDetectionResponse { is_fraud })?);
            Ok(())
        }
        Prediction::Unavailable(reason) => anyhow::bail!("fraud model unavailable: {}", reason),
        Prediction::Fault(reason) => anyhow::bail!("fraud check failed: {}", reason),
    }
}

pub fn cmd_info(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Data info");

    let schema = ProductSchema::products();
    let info = DataLoader::new().inspect(&config.data_path, &schema)?;

    kv("File", &info.path);
    kv("Size", &format!("{:.2} KB", info.file_size as f64 / 1024.0));
    kv("Rows", &info.n_rows.to_string());
    kv("Columns", &info.columns.join(", "));
    kv("Incomplete rows", &info.null_rows.to_string());
    if info.missing_columns.is_empty() {
        println!("  {} {}", ok("✓"), "all required columns present");
    } else {
        println!(
            "  {} missing: {}",
            bad("✗"),
            info.missing_columns.join(", ")
        );
    }

    section("Artifacts");
    let store = ModelStore::new(&config.model_dir);
    for name in [PRICE_PREPROCESSOR, PRICE_MODEL, FRAUD_PREPROCESSOR, FRAUD_MODEL] {
        let status = if store.exists(name) { ok("present") } else { dim("absent") };
        println!("  {:<22} {}", muted(name), status);
    }
    println!();
    Ok(())
}
