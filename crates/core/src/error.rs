#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Node catalog error: {0}")]
    Catalog(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
