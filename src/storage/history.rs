//! History of accepted scans

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analysis::ScanOutcome;

/// File name of the history inside the data directory
pub const HISTORY_FILE: &str = "scanned_products.json";

/// An accepted scan result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedProduct {
    /// Position in the history, 0 is the newest. Older files may carry `null`
    #[serde(default)]
    pub index: Option<usize>,
    pub product_name: Option<String>,
    pub price: f64,
    /// How many units were picked
    pub multiplier: u32,
}

impl ScannedProduct {
    pub fn from_outcome(outcome: &ScanOutcome, multiplier: u32) -> Self {
        Self {
            index: None,
            product_name: outcome.product_name.clone(),
            price: outcome.price,
            multiplier,
        }
    }

    /// Price times multiplier
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.multiplier)
    }
}

/// Newest-first list of scanned products stored as a JSON array
#[derive(Debug)]
pub struct ScanHistory {
    path: PathBuf,
    products: Vec<ScannedProduct>,
}

impl ScanHistory {
    /// Open the history in the default data directory
    pub fn open_default() -> Result<Self> {
        Self::load(&super::get_data_dir()?.join(HISTORY_FILE))
    }

    /// Load from `path`; a missing file is an empty history
    pub fn load(path: &Path) -> Result<Self> {
        let mut products: Vec<ScannedProduct> = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read history: {:?}", path))?;
            serde_json::from_str(&content).with_context(|| format!("Failed to parse history: {:?}", path))?
        } else {
            Vec::new()
        };
        // Unindexed entries sort first; stable so file order breaks ties
        products.sort_by_key(|p| p.index);

        debug!("Loaded {} scanned products from {:?}", products.len(), path);
        let mut history = Self {
            path: path.to_path_buf(),
            products,
        };
        history.reindex();
        Ok(history)
    }

    pub fn products(&self) -> &[ScannedProduct] {
        &self.products
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sum of all subtotals
    pub fn total(&self) -> f64 {
        self.products.iter().map(ScannedProduct::subtotal).sum()
    }

    /// Insert at the front, re-index and persist
    pub fn add(&mut self, product: ScannedProduct) -> Result<()> {
        if product.multiplier == 0 {
            bail!("Multiplier must be at least 1");
        }

        info!(
            "Saving {}x {} at {:.2}",
            product.multiplier,
            product.product_name.as_deref().unwrap_or("unknown product"),
            product.price
        );
        self.products.insert(0, product);
        self.reindex();
        self.save()
    }

    /// Remove the entry at `index`, re-index and persist
    pub fn remove(&mut self, index: usize) -> Result<ScannedProduct> {
        if index >= self.products.len() {
            bail!("No scanned product at index {} ({} stored)", index, self.products.len());
        }

        let removed = self.products.remove(index);
        self.reindex();
        self.save()?;
        Ok(removed)
    }

    /// Drop every entry and persist
    pub fn clear(&mut self) -> Result<()> {
        self.products.clear();
        self.save()
    }

    fn reindex(&mut self) {
        for (index, product) in self.products.iter_mut().enumerate() {
            product.index = Some(index);
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory: {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(&self.products)?;
        std::fs::write(&self.path, content).with_context(|| format!("Failed to write history: {:?}", self.path))?;
        Ok(())
    }
}
