//! Handlers for the node-type registry.

use axum::extract::{Path, State};
use axum::Json;
use wflens_core::registry::NodeTypeDefinition;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/node-types
///
/// List every registered node type, sorted by id.
pub async fn list_node_types(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<NodeTypeDefinition>>>> {
    let types = state.registry.list().await;
    Ok(Json(DataResponse { data: types }))
}

/// GET /api/v1/node-types/{id}
pub async fn get_node_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<NodeTypeDefinition>>> {
    let definition = state.registry.get(&id).await;
    let definition = definition.ok_or(AppError::NotFound {
        entity: "Node type",
        id,
    })?;
    Ok(Json(DataResponse { data: definition }))
}
