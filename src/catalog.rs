/// Tour catalog module
///
/// This module handles:
/// - Loading the static tour list from a JSON file at startup
/// - Keyword search over destination and category
/// - The two fixed orderings offered by the menu (cheapest, most satisfying)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Number of tours shown by the "cheapest" and "top" menu buttons
pub const MENU_RANK_LIMIT: usize = 3;

/// A single travel package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourRecord {
    pub destination: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Price in Toman
    pub price: u64,
    pub duration: String,
    /// Customer satisfaction on a 0-5 scale. Older catalogs call this `rating`
    #[serde(alias = "rating")]
    pub satisfaction: f64,
    pub details: String,
}

impl TourRecord {
    /// Case-insensitive substring match against destination or category.
    /// `needle` must already be lowercased.
    fn matches(&self, needle: &str) -> bool {
        if !self.destination.is_empty() && self.destination.to_lowercase().contains(needle) {
            return true;
        }
        self.category
            .as_deref()
            .map(|category| category.to_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

/// Ordering used by `Catalog::rank`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    PriceAscending,
    SatisfactionDescending,
}

/// What happens when the catalog file can't be read or parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogLoadPolicy {
    /// Refuse to start
    #[default]
    Strict,
    /// Log a warning and serve an empty catalog
    Empty,
}

impl FromStr for CatalogLoadPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "empty" => Ok(Self::Empty),
            other => anyhow::bail!(
                "CATALOG_LOAD_POLICY must be 'strict' or 'empty', got '{}'",
                other
            ),
        }
    }
}

/// Immutable, insertion-ordered list of tours loaded once per process
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tours: Vec<TourRecord>,
}

impl Catalog {
    pub fn new(tours: Vec<TourRecord>) -> Self {
        Self { tours }
    }

    /// Parse a catalog from JSON text (an array of tour objects)
    pub fn from_json(json: &str) -> Result<Self> {
        let tours: Vec<TourRecord> =
            serde_json::from_str(json).context("Malformed tour catalog")?;
        Ok(Self::new(tours))
    }

    /// Load the catalog file, applying `policy` when it is missing or malformed
    pub fn load(path: &Path, policy: CatalogLoadPolicy) -> Result<Self> {
        log::info!("Loading tour catalog from {}", path.display());

        let loaded = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tour catalog {}", path.display()))
            .and_then(|json| Self::from_json(&json));

        match (loaded, policy) {
            (Ok(catalog), _) => {
                log::info!("Loaded {} tours", catalog.len());
                Ok(catalog)
            }
            (Err(e), CatalogLoadPolicy::Strict) => Err(e),
            (Err(e), CatalogLoadPolicy::Empty) => {
                log::warn!("{:#} - continuing with an empty catalog", e);
                Ok(Self::default())
            }
        }
    }

    pub fn records(&self) -> &[TourRecord] {
        &self.tours
    }

    pub fn len(&self) -> usize {
        self.tours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tours.is_empty()
    }

    /// Every tour whose destination or category contains `query`, ignoring case,
    /// in catalog order.
    ///
    /// The query is not trimmed, and an empty query matches every tour with a
    /// non-empty destination.
    pub fn search(&self, query: &str) -> Vec<&TourRecord> {
        let needle = query.to_lowercase();
        self.tours.iter().filter(|tour| tour.matches(&needle)).collect()
    }

    /// The first `limit` tours under the requested ordering. Ties keep catalog order.
    pub fn rank(&self, by: RankBy, limit: usize) -> Vec<&TourRecord> {
        let mut ranked: Vec<&TourRecord> = self.tours.iter().collect();

        // sort_by is stable
        match by {
            RankBy::PriceAscending => ranked.sort_by(|a, b| a.price.cmp(&b.price)),
            RankBy::SatisfactionDescending => {
                ranked.sort_by(|a, b| b.satisfaction.total_cmp(&a.satisfaction))
            }
        }

        ranked.truncate(limit);
        ranked
    }
}
