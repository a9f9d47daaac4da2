//! Audio/video tag reading through `ffprobe`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::ContainerError;

/// Free-form comment tag; only used when it holds a JSON object.
const COMMENT_TAG: &str = "comment";

/// Dedicated tags written by ComfyUI audio/video savers, in lookup order.
const WORKFLOW_TAGS: &[&str] = &["WORKFLOW", "PROMPT"];

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    #[serde(default)]
    pub format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
pub struct FfprobeStream {
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FfprobeFormat {
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl FfprobeOutput {
    /// Tag maps in lookup order: container first, then each stream.
    fn tag_sets(&self) -> impl Iterator<Item = &HashMap<String, String>> {
        std::iter::once(&self.format.tags).chain(self.streams.iter().map(|s| &s.tags))
    }
}

// ---------------------------------------------------------------------------
// Probing
// ---------------------------------------------------------------------------

/// Run ffprobe on a file and return the parsed JSON output.
pub async fn probe(ffprobe: &Path, path: &Path) -> Result<FfprobeOutput, ContainerError> {
    let output = tokio::process::Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(ContainerError::FfprobeNotFound)?;

    if !output.status.success() {
        return Err(ContainerError::FfprobeFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    parse_output(&output.stdout)
}

fn parse_output(stdout: &[u8]) -> Result<FfprobeOutput, ContainerError> {
    serde_json::from_slice(stdout).map_err(|e| ContainerError::FfprobeOutput(e.to_string()))
}

/// Pick the workflow text out of the probed tags.
///
/// A `comment` holding a JSON object wins, then `WORKFLOW`, then `PROMPT`.
/// Tag names compare case-insensitively.
pub fn find_workflow_tag(output: &FfprobeOutput) -> Option<String> {
    let comment = output
        .tag_sets()
        .filter_map(|tags| tag_value(tags, COMMENT_TAG))
        .find(|value| value.trim_start().starts_with('{'));
    if let Some(comment) = comment {
        return Some(comment.to_string());
    }

    WORKFLOW_TAGS.iter().find_map(|name| {
        output
            .tag_sets()
            .find_map(|tags| tag_value(tags, name))
            .map(str::to_string)
    })
}

fn tag_value<'a>(tags: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output(value: serde_json::Value) -> FfprobeOutput {
        parse_output(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn json_comment_is_preferred() {
        let probed = output(json!({
            "format": {"format_name": "mov,mp4", "tags": {
                "comment": "{\"prompt\": {}}",
                "WORKFLOW": "{\"nodes\": []}"
            }},
            "streams": []
        }));
        assert_eq!(find_workflow_tag(&probed).as_deref(), Some("{\"prompt\": {}}"));
    }

    #[test]
    fn plain_comment_is_ignored() {
        let probed = output(json!({
            "format": {"tags": {"comment": "made with love", "PROMPT": "{\"1\": {}}"}}
        }));
        assert_eq!(find_workflow_tag(&probed).as_deref(), Some("{\"1\": {}}"));
    }

    #[test]
    fn stream_vorbis_tags_are_searched() {
        let probed = output(json!({
            "format": {"format_name": "ogg", "tags": {"encoder": "Lavf"}},
            "streams": [
                {"index": 0, "codec_type": "audio", "tags": {
                    "prompt": "{\"3\": {}}",
                    "workflow": "{\"nodes\": []}"
                }}
            ]
        }));
        assert_eq!(find_workflow_tag(&probed).as_deref(), Some("{\"nodes\": []}"));
    }

    #[test]
    fn missing_tags_yield_nothing() {
        let probed = output(json!({"format": {"format_name": "flac"}, "streams": [{"index": 0}]}));
        assert_eq!(find_workflow_tag(&probed), None);
    }

    #[test]
    fn garbage_output_is_an_error() {
        assert!(parse_output(b"not json").is_err());
    }
}
