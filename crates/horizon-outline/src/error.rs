//! Error types for the outline table controller.

use std::path::PathBuf;

use crate::drag::DropRejection;

/// Result type alias for outline operations.
pub type Result<T> = std::result::Result<T, OutlineError>;

/// Errors that can occur while manipulating outline tables.
#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    /// Encoding or decoding a snapshot failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Compression or another I/O step failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a file failed.
    #[error("failed to access '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload was written by a newer version of the codec.
    #[error("unsupported data version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The payload holds a different kind of list.
    #[error("expected '{expected}' data, found '{found}'")]
    WrongFileType { expected: String, found: String },

    /// A record key, table, window or document no longer exists.
    #[error("unknown {what}")]
    Unknown { what: &'static str },

    /// Children were offered to a record that cannot hold them.
    #[error("record {0} is not a container")]
    NotAContainer(String),

    /// A child list rewrite would create a cycle or duplicate a record.
    #[error("invalid tree edit: {0}")]
    InvalidTreeEdit(String),

    /// A table does not hold the provider type the caller expected.
    #[error("provider contract violation: {0}")]
    ContractViolation(String),

    /// A drop was refused before anything was changed.
    #[error("drop rejected: {0}")]
    DropRejected(DropRejection),

    /// Settings could not be parsed.
    #[error("invalid settings: {0}")]
    SettingsParse(#[from] toml::de::Error),

    /// Settings could not be written.
    #[error("failed to serialize settings: {0}")]
    SettingsWrite(#[from] toml::ser::Error),

    /// The background runtime or UI queue failed.
    #[error(transparent)]
    Core(#[from] horizon_outline_core::CoreError),
}

impl OutlineError {
    /// Create a file access error.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown-entity error.
    pub fn unknown(what: &'static str) -> Self {
        Self::Unknown { what }
    }

    /// Create a contract violation error.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// Create an invalid tree edit error.
    pub fn invalid_edit(message: impl Into<String>) -> Self {
        Self::InvalidTreeEdit(message.into())
    }

    /// Returns true if this is a rejected drop.
    pub fn is_drop_rejection(&self) -> bool {
        matches!(self, Self::DropRejected(_))
    }
}

impl From<DropRejection> for OutlineError {
    fn from(rejection: DropRejection) -> Self {
        Self::DropRejected(rejection)
    }
}
