use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage API is not configured")]
    NotConfigured,
    #[error("{0} ID is required")]
    MissingId(&'static str),
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {path} returned {status}")]
    Status { path: String, status: StatusCode },
    #[error("no data received from {path}")]
    EmptyResponse { path: String },
    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn transport(path: &str, source: reqwest::Error) -> Self {
        if let Some(status) = source.status() {
            return ApiError::Status {
                path: path.to_string(),
                status,
            };
        }
        ApiError::Transport {
            path: path.to_string(),
            source,
        }
    }

    /// Rejected credential, as opposed to a network or server problem
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ApiError::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    /// Short message suitable for the status bar
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotConfigured => "Not connected. Enter your API token first.".to_string(),
            ApiError::MissingId(what) => format!("{} ID is required", what),
            _ if self.is_auth() => {
                "The API token was rejected. Check your credentials.".to_string()
            }
            ApiError::Transport { source, .. } if source.is_timeout() => {
                "The storage API did not respond in time.".to_string()
            }
            ApiError::Transport { .. } => {
                "Could not reach the storage API. Check the instance URL.".to_string()
            }
            ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND => {
                "The requested bucket or table no longer exists.".to_string()
            }
            ApiError::Status { status, .. } => format!("Storage API error ({})", status),
            ApiError::EmptyResponse { .. } => "No data received from the storage API.".to_string(),
            ApiError::Decode { .. } => "The storage API returned data bdm cannot read.".to_string(),
        }
    }
}
