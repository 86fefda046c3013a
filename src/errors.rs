use thiserror::Error;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx {
        #[from]
        source: sqlx::Error,
    },

    /// Represents a failure to read or write the local storage block.
    #[error("local storage I/O error")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Represents a local storage block that could not be parsed.
    #[error("local storage is corrupt")]
    CorruptStorage { source: serde_json::Error },

    /// Represents a local storage block that could not be serialized for
    /// writing.
    #[error("could not encode local storage")]
    StorageEncoding { source: serde_json::Error },

    /// Represents a local storage block written by an unknown format version.
    #[error("unsupported local storage version {version}")]
    UnsupportedStorageVersion { version: u32 },

    /// Represents a blocking storage task that panicked or was cancelled.
    #[error("storage task failed")]
    BlockingTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Represents a submission lacking one of the required fields.
    #[error("missing required fields")]
    MissingFields,

    /// Represents a submission with an age below zero.
    #[error("age must not be negative")]
    NegativeAge(i32),

    /// Represents an ID that is not an integer.
    #[error("invalid ID {0}")]
    InvalidId(String),

    /// Represents an ID that does not exist in the store.
    #[error("animal not found")]
    NonExistentId(i64),

    /// Represents a request body that is not valid JSON for this route.
    #[error("malformed request body")]
    MalformedBody,

    /// Represents a failed call from the client service to the API.
    #[error("{message}")]
    Network { message: String },
}

impl BackendError {
    /// Whether the error stems from the caller's input rather than from
    /// the store.
    pub fn is_client_error(&self) -> bool {
        use BackendError::*;

        matches!(
            self,
            MissingFields | NegativeAge(..) | InvalidId(..) | NonExistentId(..) | MalformedBody
        )
    }
}
