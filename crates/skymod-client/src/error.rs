//! XRPC client error types.

use skymod_core::DirectoryError;

/// XRPC error codes that mean the credentials or session were rejected.
const AUTH_ERROR_CODES: &[&str] = &[
    "AuthenticationRequired",
    "AuthFactorTokenRequired",
    "AccountTakedown",
    "ExpiredToken",
    "InvalidToken",
];

/// Errors from XRPC calls.
#[derive(Debug, thiserror::Error)]
pub enum XrpcError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The service returned a non-2xx status.
    #[error("XRPC {endpoint} returned {status}: {}", describe(.code, .message))]
    Api {
        endpoint: String,
        status: u16,
        /// XRPC error code from the response envelope, if any.
        code: Option<String>,
        /// Envelope message, or the raw body when there is no envelope.
        message: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
}

fn describe(code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) if message.is_empty() => code.clone(),
        Some(code) => format!("{code}: {message}"),
        None => message.to_string(),
    }
}

impl XrpcError {
    /// Whether the service rejected the credentials or the session token.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Api { status: 401, .. } => true,
            Self::Api {
                code: Some(code), ..
            } => AUTH_ERROR_CODES.contains(&code.as_str()),
            _ => false,
        }
    }
}

impl From<XrpcError> for DirectoryError {
    fn from(err: XrpcError) -> Self {
        if err.is_auth() {
            return DirectoryError::Unauthorized {
                reason: err.to_string(),
            };
        }
        match err {
            XrpcError::Http { endpoint, source } => DirectoryError::Transport {
                endpoint,
                reason: source.to_string(),
            },
            XrpcError::Api {
                endpoint,
                status,
                code,
                message,
            } => DirectoryError::Rejected {
                endpoint,
                status,
                body: describe(&code, &message),
            },
            XrpcError::Deserialization { endpoint, source } => DirectoryError::Malformed {
                endpoint,
                reason: source.to_string(),
            },
        }
    }
}
