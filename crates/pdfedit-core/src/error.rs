use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported text encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Font could not be resolved: {0}")]
    FontResolutionFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Buffer is no longer available (snapshot released)")]
    BufferDetached,

    #[error("Buffer is empty")]
    EmptyBuffer,

    #[error("Page {0} not found")]
    PageNotFound(u32),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid zoom factor: {0}")]
    InvalidZoom(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Annotation {0} already exists")]
    DuplicateAnnotation(String),

    #[error("Annotation {0} not found")]
    AnnotationNotFound(String),

    #[error("Text run was extracted from a different document snapshot")]
    StaleTextRun,

    #[error("Edit session is closed")]
    SessionClosed,

    #[error("Invalid session state: {0}")]
    InvalidState(String),
}

impl EngineError {
    /// Whole-call failures abort the call; everything else is reported per item
    /// next to a best-effort result.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EngineError::UnsupportedEncoding(_)
                | EngineError::FontResolutionFailure(_)
                | EngineError::PageNotFound(_)
                | EngineError::InvalidGeometry(_)
                | EngineError::DuplicateAnnotation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
