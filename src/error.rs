use thiserror::Error;

/// Errors surfaced by the formatting pass, the render pass and the PDF backend.
///
/// Recoverable resource problems (a missing image, an unknown font) are not
/// represented here; they degrade into placeholders and log warnings.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid property combination or a missing mandatory property.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Broken internal invariant; aborts the whole formatting pass.
    #[error("internal layout error: {0}")]
    Internal(String),

    #[error("formatting was cancelled")]
    Cancelled,

    #[error("document has not been prepared; call prepare_document first")]
    NotPrepared,

    #[error("page {0} is out of range")]
    PageOutOfRange(usize),

    #[error("PDF error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, Error>;
