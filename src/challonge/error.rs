//! Failures raised while talking to the Challonge API.

use thiserror::Error;

/// Convenient result alias returning [`ChallongeError`] failures.
pub type ChallongeResult<T> = Result<T, ChallongeError>;

/// Errors returned by [`super::Challonge`] implementations.
#[derive(Debug, Error)]
pub enum ChallongeError {
    /// Building the HTTP client failed.
    #[cfg(feature = "challonge")]
    #[error("failed to build Challonge client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request never got an HTTP answer.
    #[cfg(feature = "challonge")]
    #[error("failed to reach Challonge at `{path}`")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Challonge has no resource at this path.
    #[error("Challonge resource `{path}` not found")]
    NotFound { path: String },
    /// Challonge refused the request, usually with validation messages.
    #[error("Challonge rejected `{path}` ({status}): {message}")]
    Rejected {
        path: String,
        status: u16,
        message: String,
    },
    /// The body did not have the expected shape.
    #[error("unexpected Challonge payload for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
