//! Pipe-delimited dump of enriched transactions.
//!
//! Missing values are written as `None` and the match flag as `True` or
//! `False`, so files stay readable by the tools that already consume them.

use crate::error::{Result, SalesAnalyticsError};
use crate::ingestion::{parse_record, pipe_reader, read_single_record, FIELD_COUNT, FIELD_DELIMITER};
use crate::schema::EnrichedTransaction;
use csv::{QuoteStyle, StringRecord, Terminator, WriterBuilder};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

pub const DUMP_COLUMNS: [&str; 12] = [
    "TransactionID",
    "Date",
    "ProductID",
    "ProductName",
    "Quantity",
    "UnitPrice",
    "CustomerID",
    "Region",
    "API_Category",
    "API_Brand",
    "API_Rating",
    "API_Match",
];
pub const NULL_TOKEN: &str = "None";
const DUMP_FIELD_COUNT: usize = FIELD_COUNT + 4;

fn text_or_null(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NULL_TOKEN)
}

fn bool_token(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// The twelve dump fields of one record.
pub fn enriched_record(record: &EnrichedTransaction) -> StringRecord {
    let tx = &record.transaction;
    let rating = record
        .api_rating
        .map(|r| format!("{:?}", r))
        .unwrap_or_else(|| NULL_TOKEN.to_string());

    let mut fields = StringRecord::with_capacity(128, DUMP_FIELD_COUNT);
    fields.push_field(&tx.transaction_id);
    fields.push_field(&tx.date);
    fields.push_field(&tx.product_id);
    fields.push_field(&tx.product_name);
    fields.push_field(&tx.quantity.to_string());
    fields.push_field(&format!("{:?}", tx.unit_price));
    fields.push_field(&tx.customer_id);
    fields.push_field(&tx.region);
    fields.push_field(text_or_null(&record.api_category));
    fields.push_field(text_or_null(&record.api_brand));
    fields.push_field(&rating);
    fields.push_field(bool_token(record.api_match));
    fields
}

/// Writes the header and one line per record. Fields are never quoted.
pub fn write_enriched_data<W: Write>(writer: W, records: &[EnrichedTransaction]) -> Result<()> {
    let mut out = WriterBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    out.write_record(DUMP_COLUMNS)?;
    for record in records {
        out.write_record(&enriched_record(record))?;
    }
    out.flush()?;
    Ok(())
}

pub fn save_enriched_data(path: &Path, records: &[EnrichedTransaction]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    write_enriched_data(&mut writer, records)?;
    writer.flush()?;

    info!("Enriched data saved to {}", path.display());
    Ok(())
}

fn null_or_text(token: &str) -> Option<String> {
    if token == NULL_TOKEN {
        None
    } else {
        Some(token.to_string())
    }
}

fn from_record(record: &StringRecord) -> Result<EnrichedTransaction> {
    let malformed = || {
        SalesAnalyticsError::MalformedDumpLine(record.iter().collect::<Vec<_>>().join("|"))
    };

    if record.len() != DUMP_FIELD_COUNT {
        return Err(malformed());
    }

    let transaction = parse_record(record).ok_or_else(malformed)?;

    let api_rating = match &record[10] {
        NULL_TOKEN => None,
        raw => Some(raw.parse::<f64>().map_err(|_| malformed())?),
    };

    let api_match = match &record[11] {
        "True" => true,
        "False" => false,
        _ => return Err(malformed()),
    };

    Ok(EnrichedTransaction {
        transaction,
        api_category: null_or_text(&record[8]),
        api_brand: null_or_text(&record[9]),
        api_rating,
        api_match,
    })
}

/// Reads a single dump line back into an enriched transaction.
pub fn parse_enriched_line(line: &str) -> Result<EnrichedTransaction> {
    let record = read_single_record(line)
        .ok_or_else(|| SalesAnalyticsError::MalformedDumpLine(line.to_string()))?;
    from_record(&record)
}

/// Reads a whole dump, header included. An empty input has no records.
pub fn read_enriched_data<R: Read>(input: R) -> Result<Vec<EnrichedTransaction>> {
    let mut reader = pipe_reader(input);
    let mut records = reader.records();

    match records.next() {
        None => return Ok(Vec::new()),
        Some(header) => {
            let header = header?;
            if header.iter().ne(DUMP_COLUMNS) {
                return Err(SalesAnalyticsError::MalformedDumpLine(
                    header.iter().collect::<Vec<_>>().join("|"),
                ));
            }
        }
    }

    records.map(|record| from_record(&record?)).collect()
}
