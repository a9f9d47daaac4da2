pub mod health;
pub mod node_types;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /workflows/extract                               extract workflow from upload (POST)
///
/// /node-types                                      list registered node types
/// /node-types/{id}                                 get one node type
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/workflows", workflows::router())
        .nest("/node-types", node_types::router())
}
