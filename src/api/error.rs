use thiserror::Error;

/// Errors returned by the storefront HTTP collaborators.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 404 Not Found
    #[error("Not found")]
    NotFound,
    /// 410 Gone
    #[error("Gone")]
    Gone,
    /// Any other non-2xx response. `message` is the server's `{"message": ...}` if it sent one.
    #[error("HTTP error: status {status}")]
    HttpStatus {
        status: u16,
        message: Option<String>,
    },
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body could not be decoded as the expected JSON shape
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] crate::util::BaseUrlError),
}

impl ApiError {
    /// True for 404/410: the product has been deleted from the catalog.
    pub fn is_missing_product(&self) -> bool {
        matches!(self, ApiError::NotFound | ApiError::Gone)
    }

    /// Server-provided message, when the error response carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::HttpStatus { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            404 => ApiError::NotFound,
            410 => ApiError::Gone,
            _ => ApiError::HttpStatus { status, message },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }
}
