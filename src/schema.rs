use crate::error::{Result, SalesAnalyticsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const TRANSACTION_ID_PREFIX: char = 'T';
pub const PRODUCT_ID_PREFIX: char = 'P';
pub const CUSTOMER_ID_PREFIX: char = 'C';

/// One sales line item as read from the pipe-delimited input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    pub date: String,
    #[serde(rename = "ProductID")]
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    pub region: String,
}

impl Transaction {
    /// Quantity × unit price. Always recomputed so aggregates never drift
    /// from the source fields.
    pub fn amount(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// A transaction joined against the product catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(rename = "API_Category")]
    pub api_category: Option<String>,
    #[serde(rename = "API_Brand")]
    pub api_brand: Option<String>,
    #[serde(rename = "API_Rating")]
    pub api_rating: Option<f64>,
    #[serde(rename = "API_Match")]
    pub api_match: bool,
}

/// A product as returned by the catalog endpoint. Every field is optional in
/// the wire format; products without an `id` are dropped when the mapping is
/// built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Top-level body of the product-listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductListing {
    pub products: Vec<CatalogProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub rating: Option<f64>,
}

/// Catalog key → metadata. Built once per run, read-only afterwards.
pub type ProductMapping = BTreeMap<u64, CatalogEntry>;

/// User-supplied filters. `None` means the filter is not applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub region: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.min_amount.is_none() && self.max_amount.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NonPositiveQuantityOrPrice,
    BadTransactionId,
    BadProductId,
    BadCustomerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub total_input: usize,
    pub invalid: usize,
    pub rejections: BTreeMap<RejectionReason, usize>,
    pub filtered_by_region: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// Valid records excluded by the user filters. Never part of `invalid`.
    pub filtered_out: usize,
    pub final_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub total_sales: f64,
    pub transaction_count: usize,
    /// Share of total revenue, rounded to 2 decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub customer_id: String,
    pub total_spent: f64,
    pub purchase_count: usize,
    pub avg_order_value: f64,
    pub products_bought: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: String,
    pub revenue: f64,
    pub transaction_count: usize,
    pub unique_customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakDay {
    pub date: String,
    pub revenue: f64,
    pub transaction_count: usize,
}

pub const DEFAULT_CATALOG_URL: &str = "https://dummyjson.com/products?limit=100";

/// Run configuration. Every field has a default so a partial JSON file is
/// enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub report_path: PathBuf,
    pub enriched_path: PathBuf,
    pub catalog_url: String,
    pub catalog_timeout_secs: u64,
    pub catalog_retries: u32,
    pub top_n: usize,
    pub low_stock_threshold: i64,
    pub currency_symbol: String,
    /// Allowed grouping difference as a fraction of total revenue.
    pub reconciliation_tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/sales_data.txt"),
            report_path: PathBuf::from("output/sales_report.txt"),
            enriched_path: PathBuf::from("data/enriched_sales_data.txt"),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_timeout_secs: 10,
            catalog_retries: 2,
            top_n: 5,
            low_stock_threshold: 10,
            currency_symbol: "₹".to_string(),
            reconciliation_tolerance: 1e-6,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(SalesAnalyticsError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.catalog_timeout_secs == 0 {
            return Err(SalesAnalyticsError::InvalidConfig(
                "catalog_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.reconciliation_tolerance.is_nan() || self.reconciliation_tolerance < 0.0 {
            return Err(SalesAnalyticsError::InvalidConfig(format!(
                "reconciliation_tolerance must be non-negative, got {}",
                self.reconciliation_tolerance
            )));
        }
        Ok(())
    }
}
