#![allow(dead_code)]

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use wflens_api::app::build_router;
use wflens_api::config::ServerConfig;
use wflens_api::state::AppState;
use wflens_comfyui::source::CatalogSource;
use wflens_core::catalog::NodeCatalog;

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "wflens-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 10 * 1024 * 1024,
        catalog_source: CatalogSource::File(PathBuf::from("object_info.json")),
        ffprobe_path: PathBuf::from("/nonexistent/ffprobe"),
    }
}

/// A small catalog covering the node types used in the fixtures.
pub fn test_catalog() -> NodeCatalog {
    NodeCatalog::from_value(json!({
        "KSampler": {
            "input": {"required": {
                "model": ["MODEL"],
                "seed": ["INT", {"default": 0}],
                "sampler_name": [["euler", "dpmpp_2m"]]
            }},
            "output": ["LATENT"],
            "output_name": ["LATENT"],
            "name": "KSampler",
            "display_name": "KSampler",
            "category": "sampling"
        },
        "CLIPTextEncode": {
            "input": {"required": {"text": ["STRING", {"multiline": true}], "clip": ["CLIP"]}},
            "output": ["CONDITIONING"],
            "name": "CLIPTextEncode",
            "display_name": "CLIP Text Encode (Prompt)",
            "category": "conditioning"
        },
        "CheckpointLoaderSimple": {
            "input": {"required": {"ckpt_name": [["v1-5-pruned-emaonly.safetensors"]]}},
            "output": ["MODEL", "CLIP", "VAE"],
            "name": "CheckpointLoaderSimple",
            "display_name": "Load Checkpoint",
            "category": "loaders"
        }
    }))
    .expect("test catalog is valid")
}

/// Build the full application router with all middleware layers.
pub async fn build_test_app() -> Router {
    let state = AppState::new(test_config(), test_catalog()).await;
    build_router(state)
}

/// Issue a GET request against the router.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// One part of a multipart form.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

/// Encode parts as a `multipart/form-data` body delimited by [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n",
                part.name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart form to the router.
pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a single uploaded file to the extraction endpoint.
pub async fn extract(app: Router, file_name: &str, content_type: &str, data: &[u8]) -> Response {
    post_multipart(
        app,
        "/api/v1/workflows/extract",
        &[Part {
            name: "file",
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }],
    )
    .await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
