use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledgerlens_core::ReceiptData;
use ledgerlens_engine::{diagnose, find_matches, format_explanation, format_explanation_json};
use ledgerlens_import::read_transactions_file;

/// Reconcile one extracted receipt against a bank transaction export.
///
/// The receipt is a JSON file as produced by the extraction stage; the
/// transactions are a CSV with `merchant`, `amount`, and `date` columns
/// (`description` and `transaction_id` optional).
#[derive(Debug, Parser)]
#[command(name = "ledgerlens", version, about = "Receipt-to-transaction reconciliation")]
struct Args {
    /// Path to the extracted receipt JSON.
    #[arg(long)]
    receipt: PathBuf,

    /// Path to the bank transaction CSV export.
    #[arg(long)]
    csv: PathBuf,

    /// Emit the structured JSON report instead of the text block.
    #[arg(long)]
    json: bool,

    /// Debug-level diagnostics on stderr (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let receipt_raw = fs::read_to_string(&args.receipt)
        .with_context(|| format!("reading receipt file {}", args.receipt.display()))?;
    let receipt: ReceiptData = serde_json::from_str(&receipt_raw)
        .with_context(|| format!("parsing receipt JSON {}", args.receipt.display()))?;
    receipt.validate().context("invalid receipt data")?;
    info!(vendor = %receipt.vendor, total = receipt.total, "receipt loaded");

    let rows = read_transactions_file(&args.csv)
        .with_context(|| format!("reading transaction CSV {}", args.csv.display()))?;

    let matches = find_matches(&receipt, &rows);
    let mut diagnosis = diagnose(&matches, Some(&receipt));

    if args.json {
        let report = format_explanation_json(Some(&diagnosis));
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        diagnosis.explanation = format_explanation(Some(&diagnosis));
        print!("{}", diagnosis.explanation);
    }

    Ok(())
}
