use thiserror::Error;

/// Failures reported by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("source '{0}' not found")]
    SourceNotFound(String),
    #[error("layer '{0}' not found")]
    LayerNotFound(String),
    #[error("source '{0}' already exists")]
    DuplicateSource(String),
    #[error("layer '{0}' already exists")]
    DuplicateLayer(String),
    #[error("invalid geojson: {0}")]
    InvalidGeoJson(String),
    #[error("{0} is unavailable")]
    Unavailable(&'static str),
    #[error("{0}")]
    Failure(String),
}
