use reqwest::StatusCode;
use thiserror::Error;

/// Why a request to the backend did not produce usable data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend answered with a non-success status.
    #[error("{resource} request failed with status {status}: {body}")]
    Status {
        resource: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The request could not be sent or its body could not be read.
    #[error("Failed to reach {resource}: {source}")]
    Transport {
        resource: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The body was not the JSON shape expected for the resource.
    #[error("Failed to parse {resource} JSON: {source}")]
    Parse {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn resource(&self) -> &'static str {
        match self {
            FetchError::Status { resource, .. }
            | FetchError::Transport { resource, .. }
            | FetchError::Parse { resource, .. } => resource,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
