#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Invalid input document {path}: {reason}")]
    InvalidInput { path: String, reason: String },

    #[error("No input documents found in {0}")]
    EmptyBatch(String),

    #[error("Unknown section type: {0}")]
    UnknownSection(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),
}
