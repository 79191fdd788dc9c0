use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsonLdError {
    #[error("Document is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Expansion or RDF conversion rejected the document
    #[error("{0}")]
    Conversion(String),
}

pub type Result<T> = std::result::Result<T, JsonLdError>;
