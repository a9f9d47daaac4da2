//! Container metadata reading.
//!
//! Locates the embedded workflow text inside an uploaded file. Which reader
//! runs is decided by the declared content type, not by sniffing.

mod ffprobe;
mod image_meta;

use std::path::PathBuf;

use crate::error::CoreError;

/// Default name of the ffprobe binary, resolved through `PATH`.
pub const DEFAULT_FFPROBE_PATH: &str = "ffprobe";

/// MIME type of workflow documents uploaded as-is.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Error type for container parsing. Never escapes the reader: every variant
/// except temporary-file staging is reported as "nothing found".
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("unrecognized image format")]
    UnknownImageFormat,

    #[error("truncated {0} data")]
    Truncated(&'static str),

    #[error("ffprobe binary not found: {0}")]
    FfprobeNotFound(std::io::Error),

    #[error("ffprobe execution failed (exit code {exit_code:?}): {stderr}")]
    FfprobeFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    FfprobeOutput(String),
}

/// Broad file category, derived from the declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Image,
    AudioVideo,
    Json,
}

impl ContainerKind {
    /// Map a MIME type (parameters such as `; charset=utf-8` allowed) to a
    /// container kind. Returns `None` for unsupported types.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == JSON_CONTENT_TYPE {
            Some(Self::Json)
        } else if essence.starts_with("image/") {
            Some(Self::Image)
        } else if essence.starts_with("audio/") || essence.starts_with("video/") {
            Some(Self::AudioVideo)
        } else {
            None
        }
    }
}

/// An uploaded file plus its declared content type.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl MediaFile {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Extension of the original file name, including the leading dot.
    fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        (!ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .then(|| format!(".{ext}"))
    }
}

/// Reads embedded workflow text out of uploaded files.
#[derive(Debug, Clone)]
pub struct ContainerReader {
    ffprobe_path: PathBuf,
}

impl Default for ContainerReader {
    fn default() -> Self {
        Self::new(DEFAULT_FFPROBE_PATH)
    }
}

impl ContainerReader {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Return the embedded workflow text, or `None` when the file carries
    /// none or cannot be read as its declared kind.
    pub async fn extract_raw_text(&self, file: &MediaFile) -> Result<Option<String>, CoreError> {
        let kind = ContainerKind::from_mime(&file.content_type).ok_or_else(|| {
            CoreError::UnsupportedMedia(format!("Unsupported content type: {}", file.content_type))
        })?;

        let result = match kind {
            ContainerKind::Json => Ok(Some(String::from_utf8_lossy(&file.bytes).into_owned())),
            ContainerKind::Image => image_meta::read_workflow_text(&file.bytes),
            ContainerKind::AudioVideo => self.read_audio_video(file).await?,
        };

        match result {
            Ok(text) => {
                if text.is_none() {
                    tracing::debug!(content_type = %file.content_type, "No embedded workflow text");
                }
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(
                    content_type = %file.content_type,
                    error = %e,
                    "Failed to read container metadata"
                );
                Ok(None)
            }
        }
    }

    /// Stage the upload in a temporary file and probe it.
    ///
    /// The outer error covers staging only; probe failures are returned in
    /// the inner result.
    async fn read_audio_video(
        &self,
        file: &MediaFile,
    ) -> Result<Result<Option<String>, ContainerError>, CoreError> {
        let staged = stage_temp_file(file)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to stage upload: {e}")))?;

        let probed = ffprobe::probe(&self.ffprobe_path, staged.path()).await;
        Ok(probed.map(|output| ffprobe::find_workflow_tag(&output)))
    }
}

/// Copy the upload to a named temporary file, removed when dropped.
async fn stage_temp_file(file: &MediaFile) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = file.extension().unwrap_or_default();
    let staged = tempfile::Builder::new()
        .prefix("wflens-")
        .suffix(&suffix)
        .tempfile()?;
    tokio::fs::write(staged.path(), &file.bytes).await?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn mime_types_map_to_kinds() {
        assert_eq!(ContainerKind::from_mime("image/png"), Some(ContainerKind::Image));
        assert_eq!(ContainerKind::from_mime("video/mp4"), Some(ContainerKind::AudioVideo));
        assert_eq!(ContainerKind::from_mime("audio/flac"), Some(ContainerKind::AudioVideo));
        assert_eq!(
            ContainerKind::from_mime("application/json; charset=utf-8"),
            Some(ContainerKind::Json)
        );
        assert_eq!(ContainerKind::from_mime("text/plain"), None);
        assert_eq!(ContainerKind::from_mime(""), None);
    }

    #[test]
    fn extension_is_taken_from_file_name() {
        let file = MediaFile::new(b"".to_vec(), "video/mp4").with_file_name("clip.final.mp4");
        assert_eq!(file.extension().as_deref(), Some(".mp4"));
        let file = MediaFile::new(b"".to_vec(), "video/mp4").with_file_name("../weird/name");
        assert_eq!(file.extension(), None);
    }

    #[tokio::test]
    async fn staged_upload_keeps_bytes_and_extension() {
        let file = MediaFile::new(b"fLaC\0\0\0\x22".to_vec(), "audio/flac")
            .with_file_name("take.flac");
        let staged = stage_temp_file(&file).await.unwrap();
        assert!(staged.path().to_string_lossy().ends_with(".flac"));
        assert_eq!(tokio::fs::read(staged.path()).await.unwrap(), file.bytes);
    }

    #[tokio::test]
    async fn json_upload_is_returned_verbatim() {
        let file = MediaFile::new(br#"  {"nodes": []}  "#.to_vec(), JSON_CONTENT_TYPE);
        let text = ContainerReader::default().extract_raw_text(&file).await.unwrap();
        assert_eq!(text.as_deref(), Some(r#"  {"nodes": []}  "#));
    }

    #[tokio::test]
    async fn unsupported_content_type_is_rejected() {
        let file = MediaFile::new(b"hello".to_vec(), "text/plain");
        let result = ContainerReader::default().extract_raw_text(&file).await;
        assert_matches!(result, Err(CoreError::UnsupportedMedia(_)));
    }

    #[tokio::test]
    async fn unreadable_image_is_not_found() {
        let file = MediaFile::new(b"definitely not an image".to_vec(), "image/png");
        let text = ContainerReader::default().extract_raw_text(&file).await.unwrap();
        assert_eq!(text, None);
    }

    #[tokio::test]
    async fn missing_ffprobe_binary_is_not_found() {
        let reader = ContainerReader::new("/nonexistent/wflens-ffprobe");
        let file = MediaFile::new(b"RIFF....".to_vec(), "video/webm").with_file_name("a.webm");
        let text = reader.extract_raw_text(&file).await.unwrap();
        assert_eq!(text, None);
    }
}
