use crate::schema::{
    FilterCriteria, FilterSummary, RejectionReason, Transaction, CUSTOMER_ID_PREFIX,
    PRODUCT_ID_PREFIX, TRANSACTION_ID_PREFIX,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: Vec<Transaction>,
    pub invalid_count: usize,
    pub summary: FilterSummary,
}

/// What the user can filter on, shown before the filter prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    /// `(min, max)` transaction amount; `None` when there are no records.
    pub amount_range: Option<(f64, f64)>,
}

impl FilterOptions {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let regions: BTreeSet<&str> = transactions.iter().map(|t| t.region.as_str()).collect();

        let amount_range = transactions.iter().map(Transaction::amount).fold(
            None,
            |range: Option<(f64, f64)>, amount| match range {
                None => Some((amount, amount)),
                Some((lo, hi)) => Some((lo.min(amount), hi.max(amount))),
            },
        );

        Self {
            regions: regions.into_iter().map(str::to_string).collect(),
            amount_range,
        }
    }
}

/// Returns the first business rule the transaction breaks, if any.
pub fn check_transaction(tx: &Transaction) -> Option<RejectionReason> {
    if tx.quantity <= 0 || tx.unit_price <= 0.0 {
        return Some(RejectionReason::NonPositiveQuantityOrPrice);
    }
    if !tx.transaction_id.starts_with(TRANSACTION_ID_PREFIX) {
        return Some(RejectionReason::BadTransactionId);
    }
    if !tx.product_id.starts_with(PRODUCT_ID_PREFIX) {
        return Some(RejectionReason::BadProductId);
    }
    if !tx.customer_id.starts_with(CUSTOMER_ID_PREFIX) {
        return Some(RejectionReason::BadCustomerId);
    }
    None
}

fn passes_filters(tx: &Transaction, criteria: &FilterCriteria) -> bool {
    if let Some(region) = &criteria.region {
        if tx.region != *region {
            return false;
        }
    }

    let amount = tx.amount();
    if let Some(min) = criteria.min_amount {
        if amount < min {
            return false;
        }
    }
    if let Some(max) = criteria.max_amount {
        if amount > max {
            return false;
        }
    }

    true
}

/// Applies the business rules, then the user filters.
///
/// Records breaking a rule count as invalid. Valid records removed by a
/// filter only count towards `filtered_out`.
pub fn validate_and_filter(
    transactions: &[Transaction],
    criteria: &FilterCriteria,
) -> ValidationOutcome {
    let mut valid = Vec::with_capacity(transactions.len());
    let mut rejections: BTreeMap<RejectionReason, usize> = BTreeMap::new();
    let mut filtered_out = 0;

    for tx in transactions {
        if let Some(reason) = check_transaction(tx) {
            *rejections.entry(reason).or_default() += 1;
            continue;
        }

        if !passes_filters(tx, criteria) {
            filtered_out += 1;
            continue;
        }

        valid.push(tx.clone());
    }

    let invalid_count: usize = rejections.values().sum();

    debug!(
        "Validation: {} input, {} invalid, {} filtered out, {} kept",
        transactions.len(),
        invalid_count,
        filtered_out,
        valid.len()
    );

    let summary = FilterSummary {
        total_input: transactions.len(),
        invalid: invalid_count,
        rejections,
        filtered_by_region: criteria.region.clone(),
        min_amount: criteria.min_amount,
        max_amount: criteria.max_amount,
        filtered_out,
        final_count: valid.len(),
    };

    ValidationOutcome {
        valid,
        invalid_count,
        summary,
    }
}
