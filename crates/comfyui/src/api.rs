//! REST client for the ComfyUI node catalog endpoint.
//!
//! Fetches the `object_info` document using [`reqwest`] and parses it into a
//! [`NodeCatalog`].

use wflens_core::catalog::NodeCatalog;
use wflens_core::error::CoreError;

/// Errors from loading the node catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogFetchError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Catalog endpoint error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A local catalog snapshot could not be read.
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document was fetched but is not a valid catalog.
    #[error(transparent)]
    Invalid(#[from] CoreError),
}

/// HTTP client for a node catalog endpoint.
pub struct NodeCatalogApi {
    client: reqwest::Client,
    catalog_url: String,
}

impl NodeCatalogApi {
    /// * `catalog_url` - Full URL of the catalog document, e.g.
    ///   `http://host:8188/object_info` or a static `object_info.json`.
    pub fn new(catalog_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            catalog_url,
        }
    }

    /// Fetch and parse the catalog. Not retried.
    pub async fn fetch_catalog(&self) -> Result<NodeCatalog, CatalogFetchError> {
        let response = self.client.get(&self.catalog_url).send().await?;
        let response = Self::ensure_success(response).await?;
        let document = response.json::<serde_json::Value>().await?;
        let catalog = NodeCatalog::from_value(document)?;

        tracing::info!(
            url = %self.catalog_url,
            entries = catalog.len(),
            "Fetched node catalog"
        );
        Ok(catalog)
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`CatalogFetchError::ApiError`] carrying the status and body.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CatalogFetchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CatalogFetchError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
