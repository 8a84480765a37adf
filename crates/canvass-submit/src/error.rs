use thiserror::Error;

/// Failure talking to the photo or visit store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error during {context}: {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context} returned HTTP {status}: {body}")]
    UnexpectedStatus {
        context: String,
        status: u16,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Google OAuth token refresh failed: {0}")]
    Auth(String),

    #[error("{context} response is missing `{field}`")]
    MissingField { context: String, field: String },
}

impl StorageError {
    pub(crate) fn http(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            context: context.into(),
            source,
        }
    }
}

/// Every required field missing from a submission, by form label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<String>,
}

/// Outcome of a failed [`crate::Submitter::submit`].
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Nothing was sent anywhere.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The photo upload failed, so no record was written.
    #[error("photo upload failed: {0}")]
    Upload(#[source] StorageError),

    /// The photo is stored at `photo_link` but the visit row was not written.
    #[error("visit could not be saved (photo already stored at {photo_link}): {source}")]
    Persist {
        photo_link: String,
        #[source]
        source: StorageError,
    },
}
