use codec::CodecError;
use engine::EngineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MalformedArgument,
    StyleNotReady,
    MapNotReady,
    Disposed,
    UnrecognizedCameraUpdate,
    UnsupportedLayerOperation,
    EngineReportedFailure,
    Unimplemented,
}

impl ErrorKind {
    /// Stable snake_case name, used for metric keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedArgument => "malformed_argument",
            Self::StyleNotReady => "style_not_ready",
            Self::MapNotReady => "map_not_ready",
            Self::Disposed => "disposed",
            Self::UnrecognizedCameraUpdate => "unrecognized_camera_update",
            Self::UnsupportedLayerOperation => "unsupported_layer_operation",
            Self::EngineReportedFailure => "engine_reported_failure",
            Self::Unimplemented => "unimplemented",
        }
    }
}

/// Reply-level failure of one command.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind:?}: {message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn style_not_ready() -> Self {
        Self::new(
            ErrorKind::StyleNotReady,
            "the style has not finished loading",
        )
    }

    pub fn map_not_ready() -> Self {
        Self::new(ErrorKind::MapNotReady, "the map is not ready yet")
    }

    pub fn disposed() -> Self {
        Self::new(ErrorKind::Disposed, "the controller has been disposed")
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EngineReportedFailure, message)
    }

    pub fn unimplemented(method: &str) -> Self {
        Self::new(ErrorKind::Unimplemented, format!("unknown method '{method}'"))
    }
}

impl From<CodecError> for CommandError {
    fn from(err: CodecError) -> Self {
        let kind = match err {
            CodecError::UnknownCameraUpdate(_) => ErrorKind::UnrecognizedCameraUpdate,
            _ => ErrorKind::MalformedArgument,
        };
        let field = err.field().map(str::to_string);
        let error = Self::new(kind, err.to_string());
        match field {
            Some(field) => error.with_detail(field),
            None => error,
        }
    }
}

impl From<EngineError> for CommandError {
    fn from(err: EngineError) -> Self {
        Self::engine(err.to_string())
    }
}
