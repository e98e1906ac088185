//! PriceTagScanner - Multi-frame price tag reader
//!
//! Samples a camera feed, locates the price and product name on a shelf
//! label in each frame, and settles on a single answer by majority vote.

mod analysis;
mod app;
mod capture;
mod config;
mod session;
mod shared;
mod storage;
mod vision;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::ScannerApp;
use crate::capture::Rotation;
use crate::config::ScannerConfig;
use crate::storage::{ScanHistory, ScannedProduct};
use crate::vision::ReplayOcr;

const CONFIG_FILE: &str = "config.toml";

/// PriceTagScanner - read shelf price tags from camera frames
#[derive(Parser, Debug)]
#[command(name = "pricetag-scanner")]
#[command(about = "Reads the price and product name off a shelf price tag")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a directory of frames replayed as a camera feed
    Scan {
        /// Directory of frame images, played back in file name order
        #[arg(long)]
        frames: PathBuf,

        /// JSON file of recorded OCR results keyed by frame file stem
        #[arg(long)]
        ocr: PathBuf,

        /// Configuration file (defaults to config.toml in the config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Frame rotation in degrees (0, 90, 180 or 270)
        #[arg(long)]
        rotation: Option<u32>,

        /// Replay frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Save the result to the scan history
        #[arg(long)]
        save: bool,

        /// Quantity recorded with a saved result
        #[arg(long, default_value = "1")]
        multiplier: u32,
    },

    /// List saved scans, newest first
    History,

    /// Delete one saved scan by its history index
    Remove {
        index: usize,
    },

    /// Delete all saved scans
    ClearHistory,

    /// Write the default configuration file
    InitConfig {
        /// Destination (defaults to config.toml in the config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    match args.command {
        Command::Scan {
            frames,
            ocr,
            config,
            rotation,
            fps,
            save,
            multiplier,
        } => {
            let mut scanner_config = load_or_default_config(config.as_deref())?;
            if let Some(degrees) = rotation {
                scanner_config.capture.rotation = Rotation::try_from(degrees)?;
            }
            if let Some(fps) = fps {
                scanner_config.capture.fps = fps;
            }
            scanner_config.validate()?;
            run_scan(scanner_config, &frames, &ocr, save, multiplier)
        }
        Command::History => show_history(),
        Command::Remove { index } => {
            let removed = ScanHistory::open_default()?.remove(index)?;
            info!(
                "Removed {}",
                removed.product_name.as_deref().unwrap_or("(unknown product)")
            );
            Ok(())
        }
        Command::ClearHistory => {
            ScanHistory::open_default()?.clear()?;
            info!("Scan history cleared");
            Ok(())
        }
        Command::InitConfig { path, force } => init_config(path, force),
    }
}

/// Load configuration from an explicit path, the config directory, or defaults
fn load_or_default_config(path: Option<&Path>) -> Result<ScannerConfig> {
    if let Some(path) = path {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let config = config::load_config(&config_path)?;
            info!("Loaded configuration from {:?}", config_path);
            return Ok(config);
        }
    }

    info!("Using default configuration");
    Ok(ScannerConfig::default())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => storage::get_config_dir()?.join(CONFIG_FILE),
    };
    if path.exists() && !force {
        bail!("{:?} already exists (use --force to overwrite)", path);
    }

    config::save_config(&ScannerConfig::default(), &path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_scan(config: ScannerConfig, frames: &Path, ocr: &Path, save: bool, multiplier: u32) -> Result<()> {
    let engine = ReplayOcr::from_file(ocr)?;
    let app = ScannerApp::new(config, Arc::new(engine));

    let outcome = app
        .scan_directory(frames)
        .with_context(|| format!("Scan of {:?} did not complete", frames))?;

    let Some(outcome) = outcome else {
        println!("No price found");
        return Ok(());
    };

    println!(
        "{:.2}  {}",
        outcome.price,
        outcome.product_name.as_deref().unwrap_or("(unknown product)")
    );

    if save {
        let mut history = ScanHistory::open_default()?;
        history.add(ScannedProduct::from_outcome(&outcome, multiplier))?;
        info!("Saved to {:?}", history.path());
    }

    Ok(())
}

fn show_history() -> Result<()> {
    let history = ScanHistory::open_default()?;
    if history.products().is_empty() {
        println!("No saved scans");
        return Ok(());
    }

    for (position, product) in history.products().iter().enumerate() {
        println!(
            "[{}] {}x {}  {:.2} x {} = {:.2}",
            position,
            product.multiplier,
            product.product_name.as_deref().unwrap_or("(unknown product)"),
            product.price,
            product.multiplier,
            product.subtotal()
        );
    }
    println!("Total: {:.2}", history.total());

    Ok(())
}
