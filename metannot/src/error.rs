use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetannotError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Core(#[from] metcore::error::MetcoreError),
    #[error("reference database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog snapshot write error: {0}")]
    SnapshotEncode(#[from] bincode::error::EncodeError),
    #[error("catalog snapshot read error: {0}")]
    SnapshotDecode(#[from] bincode::error::DecodeError),
    #[error("sample input error: {0}")]
    Sample(String),
    #[error("taxon resolution for '{organism}' failed after {attempts} attempts: {reason}")]
    TaxonResolution {
        organism: String,
        attempts: u32,
        reason: String,
    },
}
