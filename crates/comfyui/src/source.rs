//! Where the node catalog comes from.

use std::path::PathBuf;

use wflens_core::catalog::NodeCatalog;

use crate::api::{CatalogFetchError, NodeCatalogApi};

/// Catalog location chosen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Fetch over HTTP.
    Url(String),
    /// Read a local `object_info.json` snapshot (offline use).
    File(PathBuf),
}

impl CatalogSource {
    /// Load the catalog once. Failures are not retried.
    pub async fn load(&self) -> Result<NodeCatalog, CatalogFetchError> {
        match self {
            CatalogSource::Url(url) => NodeCatalogApi::new(url.clone()).fetch_catalog().await,
            CatalogSource::File(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|source| {
                    CatalogFetchError::Io {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
                let catalog = NodeCatalog::from_json(&text)?;
                tracing::info!(
                    path = %path.display(),
                    entries = catalog.len(),
                    "Loaded node catalog from file"
                );
                Ok(catalog)
            }
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogSource::Url(url) => write!(f, "{url}"),
            CatalogSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}
