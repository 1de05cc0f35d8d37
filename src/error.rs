//! Error types for the notebook pipeline

use thiserror::Error;

/// Result type alias for notebook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the capture pipeline an export failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorKind {
    Clone,
    Measure,
    Rasterize,
    Encode,
    Download,
}

impl std::fmt::Display for ExportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExportErrorKind::Clone => "clone",
            ExportErrorKind::Measure => "measure",
            ExportErrorKind::Rasterize => "rasterize",
            ExportErrorKind::Encode => "encode",
            ExportErrorKind::Download => "download",
        };
        f.write_str(s)
    }
}

/// Errors that can occur while transforming, rendering or exporting a page
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or otherwise unusable input, recovered locally
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transport failure or non-success status from the transform service
    #[error("Network error: {0}")]
    Network(String),

    /// The transform service answered without the expected payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The rasterizer never reported ready within the polling budget
    #[error("Rasterizer unavailable after {attempts} attempts")]
    DependencyUnavailable { attempts: u32 },

    /// Failure during clone/measure/rasterize/encode/download
    #[error("Export failed during {kind}: {message}")]
    Export { kind: ExportErrorKind, message: String },

    /// Another export currently owns the capture pipeline
    #[error("An export is already in progress")]
    ExportInProgress,

    /// The print window could not be opened
    #[error("Print window was blocked")]
    PopupBlocked,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn export(kind: ExportErrorKind, message: impl Into<String>) -> Self {
        Error::Export {
            kind,
            message: message.into(),
        }
    }

    /// Short taxonomy tag, stable across message changes
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Network(_) => "network",
            Error::Protocol(_) => "protocol",
            Error::DependencyUnavailable { .. } => "dependency_unavailable",
            Error::Export { .. } => "export",
            Error::ExportInProgress => "export_in_progress",
            Error::PopupBlocked => "popup_blocked",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }

    /// Whether the failure came from the transform round-trip
    pub fn is_transform_failure(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Protocol(_))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
