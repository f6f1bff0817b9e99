use std::io::Error as IoError;

use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors that end a request before file content is sent.
///
/// Every variant maps to one status code. None of these are fatal to the server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The request path escapes the content root.
    #[error("path escapes the content root")]
    PathRejected,

    /// The operating system refused access to the file.
    #[error("permission denied")]
    PermissionDenied,

    /// The access policy refused the file's extension.
    #[error("file type is not allowed")]
    ExtensionForbidden,

    /// The path does not name a regular file.
    #[error("file not found")]
    NotFound,

    /// The request method is not `GET` or `HEAD`.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The access policy refused the file's size.
    #[error("file of {size} bytes is too large to serve")]
    TooLarge {
        /// Size of the file in bytes.
        size: u64,
    },

    /// The requested range starts past the end of the file.
    #[error("range not satisfiable for a file of {size} bytes")]
    RangeUnsatisfiable {
        /// Size of the file in bytes.
        size: u64,
    },

    /// Unexpected I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The response could not be assembled.
    #[error("failed to build response: {0}")]
    Http(#[from] http::Error),
}

impl ServeError {
    /// The status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::PathRejected
            | ServeError::PermissionDenied
            | ServeError::ExtensionForbidden => StatusCode::FORBIDDEN,
            ServeError::NotFound => StatusCode::NOT_FOUND,
            ServeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServeError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServeError::RangeUnsatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            ServeError::Io(_) | ServeError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ServeError::PathRejected | ServeError::PermissionDenied => "forbidden",
            ServeError::ExtensionForbidden => "forbidden_file_type",
            ServeError::NotFound => "not_found",
            ServeError::MethodNotAllowed => "method_not_allowed",
            ServeError::TooLarge { .. } => "file_too_large",
            ServeError::RangeUnsatisfiable { .. } => "range_not_satisfiable",
            ServeError::Io(_) | ServeError::Http(_) => "internal_error",
        }
    }

    /// Whether this is an unexpected failure rather than a refusal.
    pub fn is_internal(&self) -> bool {
        matches!(self, ServeError::Io(_) | ServeError::Http(_))
    }

    /// The JSON body describing this error to the client.
    ///
    /// Internal failures are reported generically.
    pub fn body(&self) -> ErrorBody {
        let message = if self.is_internal() {
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        ErrorBody {
            error: self.code(),
            message,
        }
    }
}

/// Wire shape of an error response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Stable error code.
    pub error: &'static str,
    /// Human-readable description.
    pub message: String,
}
