//! # Sales Analytics
//!
//! A batch pipeline that turns a pipe-delimited file of sales transactions
//! into a text report.
//!
//! ## Stages
//!
//! - **Ingestion**: raw lines are parsed into typed [`Transaction`]s; malformed rows are dropped
//! - **Validation**: business rules reject bad records, optional region/amount filters narrow the set
//! - **Aggregation**: revenue by region, product, customer and day, plus peak-day and low-performer detection
//! - **Enrichment**: transactions are joined against a product catalog keyed by the numeric part of the product id
//! - **Reporting**: a fixed-section text report is rendered from the aggregates
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_analytics::*;
//!
//! let lines = read_sales_data(std::path::Path::new("data/sales_data.txt"))?;
//! let transactions = parse_transactions(&lines);
//! let mapping = create_product_mapping(&[]);
//!
//! let outcome = SalesAnalyticsProcessor::process(
//!     &transactions,
//!     &FilterCriteria::default(),
//!     &mapping,
//!     &AnalysisOptions::default(),
//! );
//!
//! let report = outcome.report(&ReportOptions::default());
//! println!("{}", report.render(chrono::Local::now().naive_local()));
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod prompt;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod utils;
pub mod validation;

pub use catalog::*;
pub use engine::*;
pub use error::{Result, SalesAnalyticsError};
pub use ingestion::*;
pub use prompt::FilterPrompt;
pub use reconcile::{
    verify_revenue_conservation, GroupingCheck, ReconciliationReport, RevenueReconciler,
};
pub use report::{RenderedReport, ReportOptions, SalesReport};
pub use schema::*;
pub use utils::*;
pub use validation::*;

use log::{debug, info};

/// Everything one pipeline run produces before the report is written.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub validation: ValidationOutcome,
    pub analysis: SalesAnalysis,
    pub enriched: Vec<EnrichedTransaction>,
    pub enrichment: EnrichmentSummary,
}

impl PipelineOutcome {
    pub fn valid(&self) -> &[Transaction] {
        &self.validation.valid
    }

    pub fn report(&self, options: &ReportOptions) -> SalesReport {
        SalesReport::from_parts(self.analysis.clone(), self.enrichment.clone(), options)
    }
}

pub struct SalesAnalyticsProcessor;

impl SalesAnalyticsProcessor {
    /// Runs validate → aggregate → enrich over parsed transactions.
    pub fn process(
        transactions: &[Transaction],
        criteria: &FilterCriteria,
        mapping: &ProductMapping,
        options: &AnalysisOptions,
    ) -> PipelineOutcome {
        let validation = validate_and_filter(transactions, criteria);
        info!(
            "Valid: {} | Invalid: {}",
            validation.valid.len(),
            validation.invalid_count
        );

        let analysis = SalesAnalysis::compute(&validation.valid, options);
        debug!(
            "Analysis: revenue {:.2} across {} regions, {} customers, {} days",
            analysis.total_revenue,
            analysis.regions.len(),
            analysis.customers.len(),
            analysis.daily_trend.len()
        );

        let enriched = enrich_sales_data(&validation.valid, mapping);
        let enrichment = EnrichmentSummary::from_enriched(&enriched);
        info!(
            "Enriched {} records ({:.2}%)",
            enrichment.matched, enrichment.success_rate
        );

        PipelineOutcome {
            validation,
            analysis,
            enriched,
            enrichment,
        }
    }

    /// Like [`process`](Self::process), then checks that every grouping
    /// conserves total revenue within `tolerance`, a fraction of that total.
    pub fn process_with_verification(
        transactions: &[Transaction],
        criteria: &FilterCriteria,
        mapping: &ProductMapping,
        options: &AnalysisOptions,
        tolerance: f64,
    ) -> Result<PipelineOutcome> {
        let outcome = Self::process(transactions, criteria, mapping, options);

        let reconciliation = verify_revenue_conservation(outcome.valid(), tolerance)?;
        debug!(
            "Revenue reconciled across {} groupings (max difference {:e})",
            reconciliation.checks.len(),
            reconciliation.max_difference()
        );

        Ok(outcome)
    }
}
