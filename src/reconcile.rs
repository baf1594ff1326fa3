use crate::engine::{
    calculate_total_revenue, customer_analysis, daily_sales_trend, product_totals,
    region_wise_sales,
};
use crate::error::{Result, SalesAnalyticsError};
use crate::schema::Transaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingCheck {
    pub grouping: String,
    pub grouped_total: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub total_revenue: f64,
    pub checks: Vec<GroupingCheck>,
}

impl ReconciliationReport {
    pub fn max_difference(&self) -> f64 {
        self.checks
            .iter()
            .map(|c| c.difference)
            .fold(0.0, f64::max)
    }
}

/// Checks that every grouping of the aggregation engine conserves revenue:
/// summed over its keys, each must equal the total of the transaction set.
pub struct RevenueReconciler<'a> {
    transactions: &'a [Transaction],
}

impl<'a> RevenueReconciler<'a> {
    pub fn new(transactions: &'a [Transaction]) -> Self {
        Self { transactions }
    }

    pub fn reconcile(&self) -> ReconciliationReport {
        let total_revenue = calculate_total_revenue(self.transactions);

        let grouped = [
            (
                "region",
                region_wise_sales(self.transactions)
                    .iter()
                    .map(|r| r.total_sales)
                    .sum::<f64>(),
            ),
            (
                "product",
                product_totals(self.transactions)
                    .iter()
                    .map(|p| p.revenue)
                    .sum::<f64>(),
            ),
            (
                "customer",
                customer_analysis(self.transactions)
                    .iter()
                    .map(|c| c.total_spent)
                    .sum::<f64>(),
            ),
            (
                "date",
                daily_sales_trend(self.transactions)
                    .iter()
                    .map(|d| d.revenue)
                    .sum::<f64>(),
            ),
        ];

        let checks = grouped
            .into_iter()
            .map(|(grouping, grouped_total)| GroupingCheck {
                grouping: grouping.to_string(),
                grouped_total,
                difference: (grouped_total - total_revenue).abs(),
            })
            .collect();

        ReconciliationReport {
            total_revenue,
            checks,
        }
    }

    /// Fails on the first grouping whose difference exceeds `tolerance`
    /// times the total revenue. Totals below one are compared against
    /// `tolerance` directly.
    pub fn verify(&self, tolerance: f64) -> Result<ReconciliationReport> {
        let report = self.reconcile();
        let allowed = tolerance * report.total_revenue.abs().max(1.0);

        if let Some(check) = report.checks.iter().find(|c| c.difference > allowed) {
            return Err(SalesAnalyticsError::RevenueConservationViolation {
                grouping: check.grouping.clone(),
                expected: report.total_revenue,
                actual: check.grouped_total,
                difference: check.difference,
            });
        }

        Ok(report)
    }
}

pub fn verify_revenue_conservation(
    transactions: &[Transaction],
    tolerance: f64,
) -> Result<ReconciliationReport> {
    RevenueReconciler::new(transactions).verify(tolerance)
}
