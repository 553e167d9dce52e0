use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A field with no safe default is absent from an API-origin record.
    #[error("malformed record: missing required field `{0}`")]
    MalformedRecord(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("expected a JSON object for {0}")]
    NotAnObject(&'static str),
    /// The normalized map was rejected by the domain constructor.
    #[error("conversion failed: {0}")]
    Conversion(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NormalizeError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn conversion(reason: impl Into<String>) -> Self {
        Self::Conversion(reason.into())
    }
}

pub type Result<T, E = NormalizeError> = std::result::Result<T, E>;
