use std::path::PathBuf;

use wflens_comfyui::source::CatalogSource;
use wflens_core::container::DEFAULT_FFPROBE_PATH;

/// Default catalog location: a local ComfyUI instance.
pub const DEFAULT_NODE_CATALOG_URL: &str = "http://127.0.0.1:8188/object_info";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest accepted upload in bytes (default: 256 MiB).
    pub max_upload_bytes: usize,
    /// Where the node catalog is loaded from at startup.
    pub catalog_source: CatalogSource,
    /// ffprobe binary used for audio/video metadata (default: `ffprobe`).
    pub ffprobe_path: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                               |
    /// |------------------------|---------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                             |
    /// | `PORT`                 | `3000`                                |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`               |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                  |
    /// | `MAX_UPLOAD_BYTES`     | `268435456`                           |
    /// | `NODE_CATALOG_PATH`    | unset (takes precedence over the URL) |
    /// | `NODE_CATALOG_URL`     | `http://127.0.0.1:8188/object_info`   |
    /// | `FFPROBE_PATH`         | `ffprobe`                             |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "268435456".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let catalog_source = match std::env::var("NODE_CATALOG_PATH") {
            Ok(path) if !path.trim().is_empty() => CatalogSource::File(PathBuf::from(path)),
            _ => CatalogSource::Url(
                std::env::var("NODE_CATALOG_URL")
                    .unwrap_or_else(|_| DEFAULT_NODE_CATALOG_URL.into()),
            ),
        };

        let ffprobe_path = std::env::var("FFPROBE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FFPROBE_PATH));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            catalog_source,
            ffprobe_path,
        }
    }
}
