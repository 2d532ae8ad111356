//! Error types for dmis services.

use thiserror::Error;

/// Result type alias using DmisError.
pub type DmisResult<T> = Result<T, DmisError>;

/// Primary error type for dmis operations.
#[derive(Debug, Error)]
pub enum DmisError {
    // === Request Errors ===
    #[error("{0}")]
    ClientError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // === Feed Errors ===
    #[error("No data found: {0}")]
    NoDataFound(String),

    #[error("Remote store error: {0}")]
    RemoteStoreError(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    // === Geometry Errors ===
    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl DmisError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            DmisError::ClientError(_) => 400,

            DmisError::NotFound(_) | DmisError::NoDataFound(_) => 404,

            DmisError::RemoteStoreError(_)
            | DmisError::MalformedRecord(_)
            | DmisError::UnsupportedGeometry(_)
            | DmisError::InvalidGeometry(_)
            | DmisError::StorageError(_)
            | DmisError::InternalError(_) => 500,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for DmisError {
    fn from(err: std::io::Error) -> Self {
        DmisError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for DmisError {
    fn from(err: serde_json::Error) -> Self {
        DmisError::InternalError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        let err = DmisError::ClientError("Unknown map protocol: wfs".to_string());
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_missing_data_maps_to_404() {
        assert_eq!(
            DmisError::NoDataFound("lightning".to_string()).http_status_code(),
            404
        );
        assert_eq!(
            DmisError::NotFound("river-gauge".to_string()).http_status_code(),
            404
        );
    }

    #[test]
    fn test_server_side_errors_map_to_500() {
        assert_eq!(
            DmisError::RemoteStoreError("timeout".to_string()).http_status_code(),
            500
        );
        assert_eq!(
            DmisError::MalformedRecord("row 3".to_string()).http_status_code(),
            500
        );
        assert_eq!(
            DmisError::UnsupportedGeometry("bezier".to_string()).http_status_code(),
            500
        );
        assert_eq!(
            DmisError::StorageError("pool closed".to_string()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DmisError = io_err.into();
        assert!(matches!(err, DmisError::InternalError(_)));
    }
}
