use thiserror::Error;

/// Errors talking to the remote table store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The store answered with a non-success status.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Rate limited by the store.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The change feed connection failed.
    #[error("Change feed error: {0}")]
    Realtime(#[from] sqlx::Error),

    /// No database connection is configured for the change feed.
    #[error("Change feed unavailable: no database URL configured")]
    RealtimeUnavailable,

    /// The store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A configured or derived URL did not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl StoreError {
    /// Message suitable for showing to a shop operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::RateLimited(secs) => format!("Too many requests, try again in {secs}s"),
            Self::Http(_) | Self::Unavailable(_) => "The store could not be reached".to_string(),
            Self::Parse(_) => "The store sent an unexpected response".to_string(),
            Self::Realtime(_) | Self::RealtimeUnavailable => {
                "Live updates are unavailable".to_string()
            }
            Self::InvalidUrl(_) => "The store address is misconfigured".to_string(),
        }
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_surfaces_remote_message() {
        let err = StoreError::Rejected {
            status: 400,
            message: "null value in column \"name\"".to_string(),
        };
        assert_eq!(err.user_message(), "null value in column \"name\"");
        assert!(err.to_string().contains("400"));
    }

    #[test]
    fn test_rate_limited_message() {
        assert_eq!(
            StoreError::RateLimited(3).user_message(),
            "Too many requests, try again in 3s"
        );
    }
}
