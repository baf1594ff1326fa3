use crate::error::{Result, SalesAnalyticsError};
use crate::schema::{CatalogProduct, PipelineConfig, ProductListing};
use log::{debug, info, warn};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

const USER_AGENT: &str = concat!("sales-analytics/", env!("CARGO_PKG_VERSION"));
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    url: String,
    retries: u32,
    backoff: Duration,
}

impl CatalogClient {
    pub fn new(url: impl Into<String>, timeout: Duration, retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            retries,
            backoff: INITIAL_BACKOFF,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            config.catalog_url.clone(),
            Duration::from_secs(config.catalog_timeout_secs),
            config.catalog_retries,
        )
    }

    /// Delay before the first retry; doubles on every further attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self) -> Result<Vec<CatalogProduct>> {
        let res = self.client.get(&self.url).send().await?;
        let status = res.status();
        debug!("Catalog responded with status {}", status);

        if !status.is_success() {
            return Err(SalesAnalyticsError::CatalogStatus(status.as_u16()));
        }

        let body = res.text().await?;
        let listing: ProductListing = serde_json::from_str(body.trim_start_matches('\u{feff}'))
            .map_err(|e| SalesAnalyticsError::CatalogMalformed(e.to_string()))?;

        Ok(listing.products)
    }

    /// Fetches the product list. Network errors, 429 and 5xx responses are
    /// retried; any other failure is returned straight away.
    pub async fn fetch_products(&self) -> Result<Vec<CatalogProduct>> {
        let mut backoff = self.backoff;
        let mut attempt = 0;

        loop {
            match self.fetch_once().await {
                Ok(products) => {
                    info!("Fetched {} products from {}", products.len(), self.url);
                    return Ok(products);
                }
                Err(e) if attempt < self.retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!(
                        "Catalog fetch failed ({}), retry {}/{} in {:?}",
                        e, attempt, self.retries, backoff
                    );
                    sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Like [`fetch_products`](Self::fetch_products), but network, status and
    /// malformed-body failures yield an empty list so enrichment simply
    /// misses. Other errors still propagate.
    pub async fn fetch_products_or_empty(&self) -> Result<Vec<CatalogProduct>> {
        match self.fetch_products().await {
            Ok(products) => Ok(products),
            Err(e) if e.is_catalog_degradation() => {
                warn!("Catalog fetch failed, continuing without enrichment: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn is_retryable(error: &SalesAnalyticsError) -> bool {
    match error {
        SalesAnalyticsError::CatalogRequest(_) => true,
        SalesAnalyticsError::CatalogStatus(status) => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(is_retryable(&SalesAnalyticsError::CatalogStatus(503)));
        assert!(is_retryable(&SalesAnalyticsError::CatalogStatus(429)));
        assert!(!is_retryable(&SalesAnalyticsError::CatalogStatus(404)));
        assert!(!is_retryable(&SalesAnalyticsError::CatalogMalformed(
            "expected `products`".to_string()
        )));
    }

    #[test]
    fn test_client_from_config() {
        let config = PipelineConfig {
            catalog_url: "http://localhost:1/products".to_string(),
            ..PipelineConfig::default()
        };
        let client = CatalogClient::from_config(&config).unwrap();
        assert_eq!(client.url(), "http://localhost:1/products");
        assert_eq!(client.retries, 2);
    }

    /// Serves `response` verbatim to every connection on a loopback port.
    async fn serve(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}/products", addr)
    }

    fn test_client(url: &str) -> CatalogClient {
        CatalogClient::new(url, Duration::from_secs(5), 1)
            .unwrap()
            .with_backoff(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_fetch_parses_product_listing() {
        let url = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 77\r\nConnection: close\r\n\r\n\
             {\"products\":[{\"id\":1,\"title\":\"Phone\",\"category\":\"smartphones\",\"rating\":4.5}]}",
        )
        .await;

        let products = test_client(&url).fetch_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, Some(1));
        assert_eq!(products[0].brand, None);
        assert_eq!(products[0].rating, Some(4.5));
    }

    #[tokio::test]
    async fn test_non_success_status_degrades_to_empty() {
        let url = serve(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let client = test_client(&url);

        assert!(matches!(
            client.fetch_products().await,
            Err(SalesAnalyticsError::CatalogStatus(404))
        ));
        assert!(client.fetch_products_or_empty().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_degrades_to_empty() {
        let url = serve(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 13\r\nConnection: close\r\n\r\n\
             {\"items\": []}",
        )
        .await;
        let client = test_client(&url);

        assert!(matches!(
            client.fetch_products().await,
            Err(SalesAnalyticsError::CatalogMalformed(_))
        ));
        assert!(client.fetch_products_or_empty().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_catalog_degrades_to_empty() {
        // Bind then drop a listener so the port refuses connections.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = test_client(&format!("http://{}/products", addr));

        assert!(matches!(
            client.fetch_products().await,
            Err(SalesAnalyticsError::CatalogRequest(_))
        ));

        let products = client.fetch_products_or_empty().await.unwrap();
        assert!(products.is_empty());
    }
}
