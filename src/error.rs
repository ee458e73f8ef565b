use thiserror::Error;

/// Failures loading an exercise catalog from disk
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read exercise catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid exercise catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("exercise catalog is empty")]
    Empty,
    #[error("exercise '{0}' has no image urls")]
    MissingImage(String),
    #[error("duplicate exercise id '{0}'")]
    DuplicateId(String),
}

/// Failures resolving an exercise illustration
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image not available (status {status}) at {url}")]
    Unavailable { url: String, status: u16 },
    #[error("exercise '{0}' has no image source")]
    NoSource(String),
}

/// Failures handing the finished session to an export sink
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid form url: {0}")]
    Url(#[from] url::ParseError),
    #[error("no browser available to open the form")]
    NoBrowser,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures from the access-gating dialog
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("no browser available to select a key")]
    NoBrowser,
    #[error("failed to open key selection: {0}")]
    Io(#[from] std::io::Error),
}
