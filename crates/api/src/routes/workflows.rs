//! Route definitions for workflow extraction.
//!
//! ```text
//! POST   /extract                          extract_workflow (multipart: file, content_type?)
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::workflows;
use crate::state::AppState;

/// Workflow routes, nested under `/workflows`.
pub fn router() -> Router<AppState> {
    Router::new().route("/extract", post(workflows::extract_workflow))
}
