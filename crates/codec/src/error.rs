use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("missing required field '{0}'")]
    Missing(String),
    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("field '{field}' is out of range: {detail}")]
    OutOfRange { field: String, detail: String },
    #[error("field '{field}' is not valid: {detail}")]
    InvalidJson { field: String, detail: String },
    #[error("cannot interpret '{0}' as a camera update")]
    UnknownCameraUpdate(String),
}

impl CodecError {
    pub fn wrong_type(field: &str, expected: &'static str) -> Self {
        Self::WrongType {
            field: field.to_string(),
            expected,
        }
    }

    pub fn out_of_range(field: &str, detail: impl Into<String>) -> Self {
        Self::OutOfRange {
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    pub fn invalid(field: &str, detail: impl ToString) -> Self {
        Self::InvalidJson {
            field: field.to_string(),
            detail: detail.to_string(),
        }
    }

    /// The offending field, when the error is about one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Missing(field)
            | Self::WrongType { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::InvalidJson { field, .. } => Some(field),
            Self::UnknownCameraUpdate(_) => None,
        }
    }
}
