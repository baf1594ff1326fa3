use crate::schema::{
    CustomerSummary, DailySummary, PeakDay, ProductSummary, RegionSummary, Transaction,
};
use crate::utils::{compare_sales_dates, percentage, round2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub top_n: usize,
    pub low_stock_threshold: i64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// Groups transactions by a string key, keeping groups in first-seen order,
/// and folds each transaction into its group's accumulator.
fn group_in_order<'a, V, K, F>(transactions: &'a [Transaction], key: K, mut fold: F) -> Vec<(&'a str, V)>
where
    V: Default,
    K: Fn(&'a Transaction) -> &'a str,
    F: FnMut(&mut V, &'a Transaction),
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(&'a str, V)> = Vec::new();

    for tx in transactions {
        let k = key(tx);
        let slot = *index.entry(k).or_insert_with(|| {
            groups.push((k, V::default()));
            groups.len() - 1
        });
        fold(&mut groups[slot].1, tx);
    }

    groups
}

pub fn calculate_total_revenue(transactions: &[Transaction]) -> f64 {
    transactions.iter().map(Transaction::amount).sum()
}

#[derive(Default)]
struct RegionTally {
    sales: f64,
    count: usize,
}

/// Revenue per region, highest first. Percentages are 0.0 when total revenue
/// is zero.
pub fn region_wise_sales(transactions: &[Transaction]) -> Vec<RegionSummary> {
    let total = calculate_total_revenue(transactions);

    let groups = group_in_order(transactions, |t| t.region.as_str(), |acc: &mut RegionTally, t| {
        acc.sales += t.amount();
        acc.count += 1;
    });

    let mut regions: Vec<RegionSummary> = groups
        .into_iter()
        .map(|(region, tally)| RegionSummary {
            region: region.to_string(),
            total_sales: tally.sales,
            transaction_count: tally.count,
            percentage: round2(percentage(tally.sales, total)),
        })
        .collect();

    regions.sort_by(|a, b| b.total_sales.total_cmp(&a.total_sales));
    regions
}

#[derive(Default)]
struct ProductTally {
    quantity: i64,
    revenue: f64,
}

/// Quantity and revenue per product name, in first-seen order. Quantity
/// totals saturate at the `i64` bounds.
pub fn product_totals(transactions: &[Transaction]) -> Vec<ProductSummary> {
    group_in_order(transactions, |t| t.product_name.as_str(), |acc: &mut ProductTally, t| {
        acc.quantity = acc.quantity.saturating_add(t.quantity);
        acc.revenue += t.amount();
    })
    .into_iter()
    .map(|(name, tally)| ProductSummary {
        name: name.to_string(),
        quantity: tally.quantity,
        revenue: tally.revenue,
    })
    .collect()
}

pub fn top_selling_products(transactions: &[Transaction], n: usize) -> Vec<ProductSummary> {
    let mut products = product_totals(transactions);
    products.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    products.truncate(n);
    products
}

/// Every product whose total quantity is strictly below `threshold`,
/// lowest quantity first.
pub fn low_performing_products(transactions: &[Transaction], threshold: i64) -> Vec<ProductSummary> {
    let mut products: Vec<ProductSummary> = product_totals(transactions)
        .into_iter()
        .filter(|p| p.quantity < threshold)
        .collect();
    products.sort_by_key(|p| p.quantity);
    products
}

#[derive(Default)]
struct CustomerTally<'a> {
    spent: f64,
    orders: usize,
    products: BTreeSet<&'a str>,
}

pub fn customer_analysis(transactions: &[Transaction]) -> Vec<CustomerSummary> {
    let groups = group_in_order(transactions, |t| t.customer_id.as_str(), |acc: &mut CustomerTally, t| {
        acc.spent += t.amount();
        acc.orders += 1;
        acc.products.insert(t.product_name.as_str());
    });

    let mut customers: Vec<CustomerSummary> = groups
        .into_iter()
        .map(|(customer_id, tally)| CustomerSummary {
            customer_id: customer_id.to_string(),
            total_spent: tally.spent,
            purchase_count: tally.orders,
            avg_order_value: round2(tally.spent / tally.orders as f64),
            products_bought: tally.products.into_iter().map(str::to_string).collect(),
        })
        .collect();

    customers.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));
    customers
}

#[derive(Default)]
struct DailyTally<'a> {
    revenue: f64,
    count: usize,
    customers: HashSet<&'a str>,
}

/// Revenue, transaction count and distinct customers per date, oldest first.
pub fn daily_sales_trend(transactions: &[Transaction]) -> Vec<DailySummary> {
    let groups = group_in_order(transactions, |t| t.date.as_str(), |acc: &mut DailyTally, t| {
        acc.revenue += t.amount();
        acc.count += 1;
        acc.customers.insert(t.customer_id.as_str());
    });

    let mut days: Vec<DailySummary> = groups
        .into_iter()
        .map(|(date, tally)| DailySummary {
            date: date.to_string(),
            revenue: tally.revenue,
            transaction_count: tally.count,
            unique_customers: tally.customers.len(),
        })
        .collect();

    days.sort_by(|a, b| compare_sales_dates(&a.date, &b.date));
    days
}

/// The day with the highest revenue. Ties go to the earliest date; `None`
/// when there are no transactions.
pub fn find_peak_sales_day(transactions: &[Transaction]) -> Option<PeakDay> {
    let mut peak: Option<DailySummary> = None;

    for day in daily_sales_trend(transactions) {
        let beats_peak = peak
            .as_ref()
            .map_or(true, |best| day.revenue > best.revenue);
        if beats_peak {
            peak = Some(day);
        }
    }

    peak.map(|day| PeakDay {
        date: day.date,
        revenue: day.revenue,
        transaction_count: day.transaction_count,
    })
}

/// Earliest and latest transaction date.
pub fn date_range(transactions: &[Transaction]) -> Option<(String, String)> {
    let first = transactions
        .iter()
        .map(|t| t.date.as_str())
        .min_by(|a, b| compare_sales_dates(a, b))?;
    let last = transactions
        .iter()
        .map(|t| t.date.as_str())
        .max_by(|a, b| compare_sales_dates(a, b))?;
    Some((first.to_string(), last.to_string()))
}

/// Every aggregate of one validated transaction set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesAnalysis {
    pub total_revenue: f64,
    pub transaction_count: usize,
    pub average_order_value: f64,
    pub date_range: Option<(String, String)>,
    pub regions: Vec<RegionSummary>,
    pub top_products: Vec<ProductSummary>,
    pub low_performing_products: Vec<ProductSummary>,
    pub customers: Vec<CustomerSummary>,
    pub daily_trend: Vec<DailySummary>,
    pub peak_day: Option<PeakDay>,
}

impl SalesAnalysis {
    pub fn compute(transactions: &[Transaction], options: &AnalysisOptions) -> Self {
        let total_revenue = calculate_total_revenue(transactions);
        let transaction_count = transactions.len();
        let average_order_value = if transaction_count == 0 {
            0.0
        } else {
            total_revenue / transaction_count as f64
        };

        Self {
            total_revenue,
            transaction_count,
            average_order_value,
            date_range: date_range(transactions),
            regions: region_wise_sales(transactions),
            top_products: top_selling_products(transactions, options.top_n),
            low_performing_products: low_performing_products(
                transactions,
                options.low_stock_threshold,
            ),
            customers: customer_analysis(transactions),
            daily_trend: daily_sales_trend(transactions),
            peak_day: find_peak_sales_day(transactions),
        }
    }
}
