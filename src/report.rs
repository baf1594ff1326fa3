use crate::catalog::EnrichmentSummary;
use crate::engine::{AnalysisOptions, SalesAnalysis};
use crate::error::Result;
use crate::schema::{EnrichedTransaction, PipelineConfig, Transaction};
use crate::utils::{format_amount, percentage};
use chrono::NaiveDateTime;
use log::info;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const RULE_WIDTH: usize = 50;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub analysis: AnalysisOptions,
    pub currency_symbol: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            analysis: AnalysisOptions::default(),
            currency_symbol: "₹".to_string(),
        }
    }
}

impl ReportOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            analysis: AnalysisOptions {
                top_n: config.top_n,
                low_stock_threshold: config.low_stock_threshold,
            },
            currency_symbol: config.currency_symbol.clone(),
        }
    }
}

/// The text sales report. Aggregates come from the same engine used for the
/// rest of the pipeline.
pub struct SalesReport {
    analysis: SalesAnalysis,
    enrichment: EnrichmentSummary,
    top_n: usize,
    currency_symbol: String,
}

impl SalesReport {
    pub fn new(
        transactions: &[Transaction],
        enriched: &[EnrichedTransaction],
        options: &ReportOptions,
    ) -> Self {
        Self::from_parts(
            SalesAnalysis::compute(transactions, &options.analysis),
            EnrichmentSummary::from_enriched(enriched),
            options,
        )
    }

    /// Builds the report from aggregates that were already computed.
    pub fn from_parts(
        analysis: SalesAnalysis,
        enrichment: EnrichmentSummary,
        options: &ReportOptions,
    ) -> Self {
        Self {
            analysis,
            enrichment,
            top_n: options.analysis.top_n,
            currency_symbol: options.currency_symbol.clone(),
        }
    }

    fn money(&self, value: f64) -> String {
        format!("{}{}", self.currency_symbol, format_amount(value))
    }

    /// The report stamped with `generated_at`, ready for `{}` formatting.
    pub fn display(&self, generated_at: NaiveDateTime) -> RenderedReport<'_> {
        RenderedReport {
            report: self,
            generated_at,
        }
    }

    pub fn render(&self, generated_at: NaiveDateTime) -> String {
        self.display(generated_at).to_string()
    }

    fn write_sections(&self, out: &mut fmt::Formatter<'_>, generated_at: NaiveDateTime) -> fmt::Result {
        let a = &self.analysis;
        let rule = "-".repeat(RULE_WIDTH);

        writeln!(out, "SALES ANALYTICS REPORT")?;
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
        writeln!(out, "Generated On: {}", generated_at.format(TIMESTAMP_FORMAT))?;
        writeln!(out, "Records Processed: {}", a.transaction_count)?;
        writeln!(out)?;

        writeln!(out, "OVERALL SUMMARY")?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "Total Revenue: {}", self.money(a.total_revenue))?;
        writeln!(out, "Total Transactions: {}", a.transaction_count)?;
        writeln!(out, "Average Order Value: {}", self.money(a.average_order_value))?;
        match &a.date_range {
            Some((start, end)) => writeln!(out, "Date Range: {} to {}", start, end)?,
            None => writeln!(out, "Date Range: N/A")?,
        }
        writeln!(out)?;

        writeln!(out, "REGION-WISE PERFORMANCE")?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "Region | Total Sales | % of Transactions")?;
        for region in &a.regions {
            let share = percentage(region.transaction_count as f64, a.transaction_count as f64);
            writeln!(
                out,
                "{} | {} | {:.2}%",
                region.region,
                self.money(region.total_sales),
                share
            )?;
        }
        writeln!(out)?;

        writeln!(out, "TOP PRODUCTS")?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "Rank | Product | Quantity Sold | Revenue")?;
        for (rank, product) in a.top_products.iter().enumerate() {
            writeln!(
                out,
                "{} | {} | {} | {}",
                rank + 1,
                product.name,
                product.quantity,
                self.money(product.revenue)
            )?;
        }
        writeln!(out)?;

        writeln!(out, "TOP CUSTOMERS")?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "Rank | CustomerID | Total Spent | Orders")?;
        for (rank, customer) in a.customers.iter().take(self.top_n).enumerate() {
            writeln!(
                out,
                "{} | {} | {} | {}",
                rank + 1,
                customer.customer_id,
                self.money(customer.total_spent),
                customer.purchase_count
            )?;
        }
        writeln!(out)?;

        writeln!(out, "DAILY SALES TREND")?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "Date | Revenue | Transactions | Unique Customers")?;
        for day in &a.daily_trend {
            writeln!(
                out,
                "{} | {} | {} | {}",
                day.date,
                self.money(day.revenue),
                day.transaction_count,
                day.unique_customers
            )?;
        }
        writeln!(out)?;

        writeln!(out, "PRODUCT PERFORMANCE ANALYSIS")?;
        writeln!(out, "{}", rule)?;
        if a.low_performing_products.is_empty() {
            writeln!(out, "No low performing products found.")?;
        } else {
            writeln!(out, "Low Performing Products:")?;
            for product in &a.low_performing_products {
                writeln!(
                    out,
                    "{} - Qty: {}, Revenue: {}",
                    product.name,
                    product.quantity,
                    self.money(product.revenue)
                )?;
            }
        }
        writeln!(out)?;

        let e = &self.enrichment;
        writeln!(out, "API ENRICHMENT SUMMARY")?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "Total Records Enriched: {}", e.matched)?;
        writeln!(out, "Success Rate: {:.2}%", e.success_rate)?;
        if !e.failed_products.is_empty() {
            writeln!(out, "Products Not Enriched:")?;
            for name in &e.failed_products {
                writeln!(out, "- {}", name)?;
            }
        }

        Ok(())
    }

    pub fn write_to(&self, path: &Path, generated_at: NaiveDateTime) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::new(File::create(path)?);
        write!(file, "{}", self.display(generated_at))?;
        file.flush()?;
        info!("Sales report written to {}", path.display());
        Ok(())
    }
}

pub struct RenderedReport<'a> {
    report: &'a SalesReport,
    generated_at: NaiveDateTime,
}

impl fmt::Display for RenderedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.report.write_sections(f, self.generated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{create_product_mapping, enrich_sales_data};
    use crate::schema::CatalogProduct;
    use chrono::NaiveDate;

    fn tx(id: &str, date: &str, product_id: &str, name: &str, qty: i64, price: f64, customer: &str, region: &str) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            date: date.to_string(),
            product_id: product_id.to_string(),
            product_name: name.to_string(),
            quantity: qty,
            unit_price: price,
            customer_id: customer.to_string(),
            region: region.to_string(),
        }
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn render(transactions: &[Transaction], products: &[CatalogProduct]) -> String {
        let enriched = enrich_sales_data(transactions, &create_product_mapping(products));
        SalesReport::new(transactions, &enriched, &ReportOptions::default()).render(generated_at())
    }

    #[test]
    fn test_sections_appear_in_order() {
        let transactions = vec![
            tx("T1", "2024-01-01", "P1", "Laptop", 2, 45000.0, "C1", "North"),
            tx("T2", "2024-01-02", "P2", "Mouse", 12, 500.0, "C2", "South"),
        ];
        let report = render(&transactions, &[]);

        let headings = [
            "SALES ANALYTICS REPORT",
            "Generated On: 2024-02-01 09:30:00",
            "Records Processed: 2",
            "OVERALL SUMMARY",
            "REGION-WISE PERFORMANCE",
            "TOP PRODUCTS",
            "TOP CUSTOMERS",
            "DAILY SALES TREND",
            "PRODUCT PERFORMANCE ANALYSIS",
            "API ENRICHMENT SUMMARY",
        ];
        let mut cursor = 0;
        for heading in headings {
            let found = report[cursor..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing or out of order: {}", heading));
            cursor += found + heading.len();
        }
    }

    #[test]
    fn test_report_figures() {
        let transactions = vec![
            tx("T1", "2024-01-01", "P1", "Laptop", 2, 45000.0, "C1", "North"),
            tx("T2", "2024-01-02", "P2", "Mouse", 12, 500.0, "C2", "South"),
            tx("T3", "2024-01-02", "P2", "Mouse", 3, 500.0, "C1", "North"),
        ];
        let products = vec![CatalogProduct {
            id: Some(1),
            title: Some("Laptop".to_string()),
            category: Some("laptops".to_string()),
            ..CatalogProduct::default()
        }];
        let report = render(&transactions, &products);

        assert!(report.contains("Total Revenue: ₹97,500.00"));
        assert!(report.contains("Average Order Value: ₹32,500.00"));
        assert!(report.contains("Date Range: 2024-01-01 to 2024-01-02"));
        assert!(report.contains("North | ₹91,500.00 | 66.67%"));
        assert!(report.contains("1 | Mouse | 15 | ₹7,500.00"));
        assert!(report.contains("1 | C1 | ₹91,500.00 | 2"));
        assert!(report.contains("2024-01-02 | ₹7,500.00 | 2 | 2"));
        assert!(report.contains("Laptop - Qty: 2, Revenue: ₹90,000.00"));
        assert!(report.contains("Total Records Enriched: 1"));
        assert!(report.contains("Success Rate: 33.33%"));
        assert!(report.contains("Products Not Enriched:\n- Mouse\n"));
        assert_eq!(report.matches("- Mouse").count(), 1);
    }

    #[test]
    fn test_no_low_performers_line() {
        let transactions = vec![tx("T1", "2024-01-01", "P1", "Mouse", 50, 10.0, "C1", "North")];
        let report = render(&transactions, &[]);
        assert!(report.contains("No low performing products found."));
    }

    #[test]
    fn test_empty_report_has_placeholders() {
        let report = render(&[], &[]);
        assert!(report.contains("Records Processed: 0"));
        assert!(report.contains("Total Revenue: ₹0.00"));
        assert!(report.contains("Average Order Value: ₹0.00"));
        assert!(report.contains("Date Range: N/A"));
        assert!(report.contains("Success Rate: 0.00%"));
        assert!(!report.contains("Products Not Enriched"));
    }

    #[test]
    fn test_custom_currency_and_top_n() {
        let transactions: Vec<Transaction> = (1..=7)
            .map(|i| tx("T1", "2024-01-01", "P1", &format!("Item{}", i), i, 1.0, &format!("C{}", i), "North"))
            .collect();
        let options = ReportOptions {
            analysis: AnalysisOptions {
                top_n: 3,
                low_stock_threshold: 10,
            },
            currency_symbol: "$".to_string(),
        };
        let enriched = enrich_sales_data(&transactions, &Default::default());
        let report = SalesReport::new(&transactions, &enriched, &options).render(generated_at());

        assert!(report.contains("1 | Item7 | 7 | $7.00"));
        assert!(report.contains("3 | Item5 | 5 | $5.00"));
        assert!(!report.contains("4 | Item4"));
        assert!(report.contains("3 | C5 | $5.00 | 1"));
        assert!(!report.contains("4 | C4"));
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join("sales_report.txt");
        let report = SalesReport::new(&[], &[], &ReportOptions::default());

        report.write_to(&path, generated_at()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("SALES ANALYTICS REPORT\n"));
        assert_eq!(content, report.render(generated_at()));
    }

    #[test]
    fn test_display_matches_render() {
        let transactions = vec![tx("T1", "2024-01-01", "P1", "Mouse", 5, 10.0, "C1", "North")];
        let report = SalesReport::new(&transactions, &[], &ReportOptions::default());

        let shown = format!("{}", report.display(generated_at()));
        assert_eq!(shown, report.render(generated_at()));
        assert!(shown.ends_with("Success Rate: 0.00%\n"));
    }
}
