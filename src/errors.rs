// restoretool/src/errors.rs
use thiserror::Error;

/// Failures the restore pipeline can surface. Each stage maps onto one
/// variant; the orchestration layer flattens these into the uniform
/// `{error, message, code?}` outcome shape.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Invalid Configuration")]
    InvalidConfiguration,

    #[error(transparent)]
    ConnectionString(#[from] crate::config::UriParseError),

    #[error("connection descriptor is missing a {0}")]
    Descriptor(&'static str),

    #[error("{message}")]
    Store {
        code: Option<String>,
        message: String,
    },

    #[error("failed to extract archive {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("{message}")]
    RestoreProcess {
        code: Option<i32>,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RestoreError {
    /// Provider or process failure code carried by this error, if any.
    pub fn code(&self) -> Option<String> {
        match self {
            RestoreError::Store { code, .. } => code.clone(),
            RestoreError::RestoreProcess { code, .. } => code.map(|c| c.to_string()),
            _ => None,
        }
    }
}
