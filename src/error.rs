use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesAnalyticsError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid filter input for {field}: '{value}'")]
    InvalidFilterInput { field: String, value: String },

    #[error("Revenue conservation violation in {grouping}: expected {expected}, grouped total {actual} (difference {difference})")]
    RevenueConservationViolation {
        grouping: String,
        expected: f64,
        actual: f64,
        difference: f64,
    },

    #[error("Malformed enriched record: {0}")]
    MalformedDumpLine(String),

    #[cfg(feature = "catalog")]
    #[error("Catalog request failed: {0}")]
    CatalogRequest(#[from] reqwest::Error),

    #[error("Catalog returned status {0}")]
    CatalogStatus(u16),

    #[error("Catalog response malformed: {0}")]
    CatalogMalformed(String),

    #[error("Delimited data error: {0}")]
    DelimitedData(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SalesAnalyticsError {
    /// Failures of the catalog fetch that the pipeline survives by running
    /// with an empty catalog.
    pub fn is_catalog_degradation(&self) -> bool {
        match self {
            #[cfg(feature = "catalog")]
            SalesAnalyticsError::CatalogRequest(_) => true,
            SalesAnalyticsError::CatalogStatus(_) | SalesAnalyticsError::CatalogMalformed(_) => {
                true
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SalesAnalyticsError>;
