use std::sync::Arc;

use wflens_core::catalog::NodeCatalog;
use wflens_core::container::ContainerReader;
use wflens_core::pipeline::WorkflowExtractor;
use wflens_core::registry::NodeTypeRegistry;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Node-type catalog, loaded once before the listener binds.
    pub catalog: Arc<NodeCatalog>,
    /// Extraction pipeline bound to `catalog`.
    pub extractor: Arc<WorkflowExtractor>,
    /// Node types known to the graph renderer; grows as subgraphs are found.
    pub registry: Arc<NodeTypeRegistry>,
}

impl AppState {
    /// Wire up the pipeline and registry around an already-loaded catalog.
    ///
    /// The registry is seeded from the catalog here, so it is ready before
    /// the first request.
    pub async fn new(config: ServerConfig, catalog: NodeCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let reader = ContainerReader::new(config.ffprobe_path.clone());
        let extractor = WorkflowExtractor::new(Arc::clone(&catalog), reader);

        let registry = NodeTypeRegistry::new();
        registry.register_catalog(&catalog).await;

        Self {
            config: Arc::new(config),
            catalog,
            extractor: Arc::new(extractor),
            registry: Arc::new(registry),
        }
    }
}
