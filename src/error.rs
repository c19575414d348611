// Error taxonomy for the release workflow. Declined prompts are not errors;
// they are reported through `release::ReleaseOutcome`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReleaseError>;

#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Wrong command line shape. Raised before anything is touched.
    #[error("usage error: {0}")]
    Usage(String),

    /// Missing mod directory or metadata file.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Metadata JSON that does not have the expected shape.
    #[error("malformed {}: {reason}", path.display())]
    MalformedData { path: PathBuf, reason: String },

    /// Copy, zip, write or delete failure.
    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The registry answered with something other than what the protocol expects.
    /// The raw body is kept so it can be shown to the user.
    #[error("registry protocol error: {message}; response body: {body}")]
    Protocol { message: String, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid credentials: {0}")]
    Credentials(String),

    #[error("failed to read answer from terminal: {0}")]
    Prompt(#[source] io::Error),
}

impl ReleaseError {
    pub(crate) fn filesystem(context: impl Into<String>, source: io::Error) -> Self {
        ReleaseError::Filesystem {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ReleaseError::MalformedData {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
