//! Handlers for workflow extraction.

use axum::extract::{Multipart, State};
use axum::Json;
use wflens_core::container::{ContainerKind, MediaFile};
use wflens_core::error::CoreError;
use wflens_core::pipeline::{Extraction, NormalizedWorkflow};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Content type assumed when neither the form nor the file part declares one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// POST /api/v1/workflows/extract
///
/// Accepts a multipart form with a required `file` field and an optional
/// `content_type` field overriding the file part's declared type. Returns
/// the normalized workflow, or 422 `NO_WORKFLOW` when the file carries none.
pub async fn extract_workflow(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<NormalizedWorkflow>>> {
    let mut upload: Option<(Option<String>, Option<String>, Vec<u8>)> = None;
    let mut content_type_override: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let declared = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload = Some((file_name, declared, data.to_vec()));
            }
            "content_type" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    content_type_override = Some(text.to_string());
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    let (file_name, declared, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;

    let content_type = content_type_override
        .or(declared)
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
    if ContainerKind::from_mime(&content_type).is_none() {
        return Err(AppError::Core(CoreError::UnsupportedMedia(format!(
            "Unsupported content type: {content_type}"
        ))));
    }

    let mut file = MediaFile::new(bytes, content_type);
    if let Some(file_name) = file_name {
        file = file.with_file_name(file_name);
    }

    tracing::debug!(
        file_name = file.file_name.as_deref().unwrap_or("<unnamed>"),
        content_type = %file.content_type,
        size = file.bytes.len(),
        "Extracting workflow"
    );

    match state.extractor.extract(&file, state.registry.as_ref()).await? {
        Extraction::Found(workflow) => Ok(Json(DataResponse { data: workflow })),
        Extraction::NotFound => Err(AppError::NoWorkflow),
    }
}
