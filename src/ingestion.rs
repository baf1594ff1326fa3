use crate::error::{Result, SalesAnalyticsError};
use crate::schema::Transaction;
use csv::StringRecord;
use log::{debug, warn};
use std::io::{ErrorKind, Read};
use std::path::Path;

pub const FIELD_DELIMITER: u8 = b'|';
pub const FIELD_COUNT: usize = 8;

/// Reads the raw sales file and returns its data lines: header dropped,
/// each line trimmed, blank lines removed.
///
/// Bytes that are not valid UTF-8 are decoded as Windows-1252, which also
/// covers Latin-1 exports.
pub fn read_sales_data(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let content = decode_bytes(bytes);

    let lines: Vec<String> = content
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    debug!("Read {} data lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Like [`read_sales_data`], but a missing file yields no lines instead of
/// an error.
pub fn read_sales_data_or_empty(path: &Path) -> Result<Vec<String>> {
    match read_sales_data(path) {
        Ok(lines) => Ok(lines),
        Err(SalesAnalyticsError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
            warn!("File not found: {}", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

fn decode_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(mut s) => {
            if s.starts_with('\u{feff}') {
                s.remove(0);
            }
            s
        }
        Err(e) => {
            let bytes = e.into_bytes();
            debug!("Input is not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// Parses data lines into transactions. Rows with the wrong field count or
/// non-numeric quantity/price are skipped.
pub fn parse_transactions<S: AsRef<str>>(lines: &[S]) -> Vec<Transaction> {
    let transactions: Vec<Transaction> = lines
        .iter()
        .filter_map(|line| parse_transaction_line(line.as_ref()))
        .collect();

    let skipped = lines.len() - transactions.len();
    if skipped > 0 {
        debug!("Skipped {} unparseable lines", skipped);
    }

    transactions
}

pub fn parse_transaction_line(line: &str) -> Option<Transaction> {
    let record = read_single_record(line)?;
    if record.len() != FIELD_COUNT {
        return None;
    }

    parse_record(&record)
}

/// Reader over pipe-delimited rows. Quotes are literal characters and rows
/// of any width come back, so callers check the field count themselves.
pub(crate) fn pipe_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(input)
}

pub(crate) fn read_single_record(line: &str) -> Option<StringRecord> {
    let mut record = StringRecord::new();
    match pipe_reader(line.as_bytes()).read_record(&mut record) {
        Ok(true) => Some(record),
        _ => None,
    }
}

/// Builds a transaction from the first eight fields of a record.
pub(crate) fn parse_record(record: &StringRecord) -> Option<Transaction> {
    let quantity = strip_commas(record.get(4)?).trim().parse::<i64>().ok()?;
    let unit_price = strip_commas(record.get(5)?).trim().parse::<f64>().ok()?;
    if !unit_price.is_finite() {
        return None;
    }

    Some(Transaction {
        transaction_id: record.get(0)?.to_string(),
        date: record.get(1)?.to_string(),
        product_id: record.get(2)?.to_string(),
        product_name: strip_commas(record.get(3)?),
        quantity,
        unit_price,
        customer_id: record.get(6)?.to_string(),
        region: record.get(7)?.to_string(),
    })
}

fn strip_commas(value: &str) -> String {
    value.replace(',', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_example_row() {
        let tx = parse_transaction_line("T1001|2024-01-05|P2001|Widget,  |3|250.0|C501|North").unwrap();
        assert_eq!(tx.transaction_id, "T1001");
        assert_eq!(tx.date, "2024-01-05");
        assert_eq!(tx.product_id, "P2001");
        assert_eq!(tx.product_name, "Widget  ");
        assert_eq!(tx.quantity, 3);
        assert!((tx.unit_price - 250.0).abs() < 1e-9);
        assert_eq!(tx.customer_id, "C501");
        assert_eq!(tx.region, "North");
        assert!((tx.amount() - 750.0).abs() < 1e-9);
    }

    #[test]
    fn test_thousands_separators_are_stripped() {
        let tx = parse_transaction_line("T1|2024-01-01|P1|Laptop|1,000|45,000.50|C1|East").unwrap();
        assert_eq!(tx.quantity, 1000);
        assert!((tx.unit_price - 45000.5).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let lines = vec![
            "T1|2024-01-01|P1|Mouse|2|10.0|C1|East",
            "T2|2024-01-01|P1|Mouse|2|10.0|C1",
            "T3|2024-01-01|P1|Mouse|2|10.0|C1|East|extra",
            "T4|2024-01-01|P1|Mouse|two|10.0|C1|East",
            "T5|2024-01-01|P1|Mouse|2|ten|C1|East",
            "T6|2024-01-01|P1|Mouse|2.5|10.0|C1|East",
            "T7|2024-01-01|P1|Mouse|2|NaN|C1|East",
        ];

        let parsed = parse_transactions(&lines);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].transaction_id, "T1");
    }

    #[test]
    fn test_quotes_are_kept_literally() {
        let tx = parse_transaction_line("T1|2024-01-01|P1|\"Pro\" Mouse|2|10.0|C1|East").unwrap();
        assert_eq!(tx.product_name, "\"Pro\" Mouse");

        assert!(parse_transaction_line("T1|2024-01-01|P1|\"Mouse|Pad\"|2|10.0|C1|East").is_none());
    }

    #[test]
    fn test_empty_fields_are_kept() {
        let tx = parse_transaction_line("T1|2024-01-01|P1|Mouse|2|10.0|C1|").unwrap();
        assert_eq!(tx.region, "");
        assert!(parse_transaction_line("").is_none());
    }

    #[test]
    fn test_negative_quantity_still_parses() {
        let tx = parse_transaction_line("T1|2024-01-01|P1|Mouse|-1|10.0|C1|East").unwrap();
        assert_eq!(tx.quantity, -1);
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        let lines: Vec<String> = Vec::new();
        assert!(parse_transactions(&lines).is_empty());
    }

    #[test]
    fn test_read_drops_header_and_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "TransactionID|Date|ProductID|ProductName|Quantity|UnitPrice|CustomerID|Region").unwrap();
        writeln!(file, "  T1|2024-01-01|P1|Mouse|2|10.0|C1|East  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "T2|2024-01-02|P2|Cable|1|5.0|C2|West").unwrap();

        let lines = read_sales_data(file.path()).unwrap();
        assert_eq!(
            lines,
            vec![
                "T1|2024-01-01|P1|Mouse|2|10.0|C1|East".to_string(),
                "T2|2024-01-02|P2|Cable|1|5.0|C2|West".to_string(),
            ]
        );
    }

    #[test]
    fn test_read_falls_back_to_windows_1252() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"header\nT1|2024-01-01|P1|Caf\xe9 Mug|1|5.0|C1|South\n")
            .unwrap();

        let lines = read_sales_data(file.path()).unwrap();
        assert_eq!(lines, vec!["T1|2024-01-01|P1|Café Mug|1|5.0|C1|South".to_string()]);
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lines = read_sales_data_or_empty(&dir.path().join("missing.txt")).unwrap();
        assert!(lines.is_empty());
        assert!(read_sales_data(&dir.path().join("missing.txt")).is_err());
    }
}
