use clap::{Parser, Subcommand};
use receipt_scan::config::{Config, DEFAULT_CONFIG_PATH};
use receipt_scan::heuristics::{self, TextObservation};
use receipt_scan::ocr_client::HttpOcrEngine;
use receipt_scan::receipt_db::{ReceiptStore, StoredReceipt};
use receipt_scan::receipt_processor::{ReceiptProcessor, content_type_for};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "receipt-scan", about = "Pull merchant and total out of receipt images")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the text heuristics on a saved OCR observation list (JSON)
    Interpret { observations: PathBuf },
    /// Send an image through the OCR service and print the extraction
    Scan { image: PathBuf },
    /// Scan an image, store it and award points
    Submit { image: PathBuf },
    /// List stored receipts, or show one with its raw OCR text
    Receipts { id: Option<i64> },
    /// Show the points balance
    Points,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Command::Interpret { observations } => {
            let content = std::fs::read_to_string(&observations)?;
            let observations: Vec<TextObservation> = serde_json::from_str(&content)?;
            let result = heuristics::interpret_with_threshold(&observations, cfg.ocr.min_confidence);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Scan { image } => {
            let processor = build_processor(&cfg)?;
            let bytes = std::fs::read(&image)?;
            match processor.process(&bytes, content_type_for(&image)).await {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(e) => {
                    error!(error = %e, client_error = e.is_client_error(), "Processing failed");
                    return Err(e.into());
                }
            }
        }
        Command::Submit { image } => {
            let processor = build_processor(&cfg)?;
            let store = open_store(&cfg.store.db_path)?;
            let bytes = std::fs::read(&image)?;
            match processor.submit(&store, &bytes, content_type_for(&image)).await {
                Ok(receipt) => {
                    println!(
                        "Receipt processed successfully! +{} points earned.",
                        receipt.points_awarded
                    );
                    println!(
                        "  #{}  {}  ${:.2}  ({:.1}% confidence)",
                        receipt.id.unwrap_or_default(),
                        receipt.merchant,
                        receipt.total_amount,
                        receipt.confidence
                    );
                }
                Err(e) => {
                    error!(error = %e, client_error = e.is_client_error(), "Submission failed");
                    return Err(e.into());
                }
            }
        }
        Command::Receipts { id: Some(id) } => {
            let store = open_store(&cfg.store.db_path)?;
            let Some(r) = store.get_receipt_by_id(id)? else {
                return Err(format!("No receipt found with id {id}").into());
            };
            println!("{}", receipt_row(&r));
            println!("  confidence: {:.1}%", r.confidence);
            println!("--- Raw OCR text ---\n{}\n--- End ---", r.raw_ocr_text);
        }
        Command::Receipts { id: None } => {
            let store = open_store(&cfg.store.db_path)?;
            let receipts = store.get_all_receipts()?;
            info!(count = receipts.len(), "Stored receipts");
            for r in &receipts {
                println!("{}", receipt_row(r));
            }
        }
        Command::Points => {
            let store = open_store(&cfg.store.db_path)?;
            println!("{}", store.get_total_points()?);
        }
    }

    Ok(())
}

fn receipt_row(r: &StoredReceipt) -> String {
    format!(
        "#{:<5} {:<20} {:<30} ${:>9.2} {:>4} pts",
        r.id.unwrap_or_default(),
        r.processed_at.as_deref().unwrap_or("-"),
        r.merchant,
        r.total_amount,
        r.points_awarded
    )
}

/// The OCR engine handle is built once here and shared by the processor.
fn build_processor(cfg: &Config) -> Result<ReceiptProcessor, Box<dyn std::error::Error>> {
    let engine = HttpOcrEngine::new(&cfg.ocr)?;
    Ok(ReceiptProcessor::new(
        Arc::new(engine),
        cfg.ocr.clone(),
        cfg.rewards.clone(),
    ))
}

fn open_store(db_path: &str) -> Result<ReceiptStore, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    info!(db_path = %db_path, "Opening receipt store");
    Ok(ReceiptStore::new(db_path)?)
}
