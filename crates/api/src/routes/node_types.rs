//! Route definitions for the node-type registry.
//!
//! ```text
//! GET    /                                 list_node_types
//! GET    /{id}                             get_node_type
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::node_types;
use crate::state::AppState;

/// Node-type routes, nested under `/node-types`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(node_types::list_node_types))
        .route("/{id}", get(node_types::get_node_type))
}
