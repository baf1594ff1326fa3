#[cfg(feature = "catalog")]
pub mod client;
pub mod dump;

#[cfg(feature = "catalog")]
pub use client::*;
pub use dump::*;

use crate::schema::{CatalogEntry, CatalogProduct, EnrichedTransaction, ProductMapping, Transaction};
use crate::utils::percentage;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Indexes catalog products by id. Products without an id are skipped; a
/// later duplicate id replaces an earlier one.
pub fn create_product_mapping(products: &[CatalogProduct]) -> ProductMapping {
    let mut mapping = ProductMapping::new();
    let mut skipped = 0;

    for product in products {
        let Some(id) = product.id else {
            skipped += 1;
            continue;
        };

        mapping.insert(
            id,
            CatalogEntry {
                title: product.title.clone(),
                category: product.category.clone(),
                brand: product.brand.clone(),
                rating: product.rating,
            },
        );
    }

    if skipped > 0 {
        debug!("Skipped {} catalog products without an id", skipped);
    }

    mapping
}

/// Catalog key of a product id: everything after the one-character prefix,
/// parsed as an integer. `"P2001"` gives `Some(2001)`.
pub fn catalog_key(product_id: &str) -> Option<u64> {
    let mut chars = product_id.chars();
    chars.next()?;
    chars.as_str().trim().parse().ok()
}

pub fn enrich_transaction(tx: &Transaction, mapping: &ProductMapping) -> EnrichedTransaction {
    match catalog_key(&tx.product_id).and_then(|key| mapping.get(&key)) {
        Some(entry) => EnrichedTransaction {
            transaction: tx.clone(),
            api_category: entry.category.clone(),
            api_brand: entry.brand.clone(),
            api_rating: entry.rating,
            api_match: true,
        },
        None => EnrichedTransaction {
            transaction: tx.clone(),
            api_category: None,
            api_brand: None,
            api_rating: None,
            api_match: false,
        },
    }
}

pub fn enrich_sales_data(
    transactions: &[Transaction],
    mapping: &ProductMapping,
) -> Vec<EnrichedTransaction> {
    let enriched: Vec<EnrichedTransaction> = transactions
        .iter()
        .map(|tx| enrich_transaction(tx, mapping))
        .collect();

    debug!(
        "Enriched {} of {} transactions against {} catalog entries",
        enriched.iter().filter(|e| e.api_match).count(),
        enriched.len(),
        mapping.len()
    );

    enriched
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub total: usize,
    pub matched: usize,
    /// Percentage of matched records; 0.0 when there are none.
    pub success_rate: f64,
    /// Product names that found no catalog entry, first-seen order, no
    /// duplicates.
    pub failed_products: Vec<String>,
}

impl EnrichmentSummary {
    pub fn from_enriched(enriched: &[EnrichedTransaction]) -> Self {
        let matched = enriched.iter().filter(|e| e.api_match).count();

        let mut seen = HashSet::new();
        let failed_products = enriched
            .iter()
            .filter(|e| !e.api_match)
            .map(|e| e.transaction.product_name.as_str())
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect();

        Self {
            total: enriched.len(),
            matched,
            success_rate: percentage(matched as f64, enriched.len() as f64),
            failed_products,
        }
    }
}
