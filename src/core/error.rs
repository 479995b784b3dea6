//! Typed error handling for the odm toolkit
//!
//! This module provides an error hierarchy that lets callers react to specific
//! failures instead of dealing with generic `anyhow::Error` values.
//!
//! # Error Categories
//!
//! - [`BuilderError`]: Errors related to builder handles (unknown backend kinds)
//! - [`FilterError`]: Errors raised while dispatching criteria to filter handlers
//! - [`ValidationError`]: Errors related to input validation
//! - [`StorageError`]: Errors raised by document stores while executing queries
//! - [`ConfigError`]: Errors related to configuration parsing
//!
//! # Example
//!
//! ```rust,ignore
//! use odm::prelude::*;
//!
//! match paginator.paginate(builder, page).await {
//!     Ok(result) => println!("{} documents", result.total),
//!     Err(OdmError::Storage(e)) => eprintln!("store failed: {}", e),
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type of the toolkit
///
/// Each variant wraps a more specific error type for that category.
#[derive(Debug)]
pub enum OdmError {
    /// Builder handle errors
    Builder(BuilderError),

    /// Filter dispatch errors
    Filter(FilterError),

    /// Validation errors
    Validation(ValidationError),

    /// Document store errors
    Storage(StorageError),

    /// Configuration errors
    Config(ConfigError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for OdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OdmError::Builder(e) => write!(f, "{}", e),
            OdmError::Filter(e) => write!(f, "{}", e),
            OdmError::Validation(e) => write!(f, "{}", e),
            OdmError::Storage(e) => write!(f, "{}", e),
            OdmError::Config(e) => write!(f, "{}", e),
            OdmError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for OdmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OdmError::Builder(e) => Some(e),
            OdmError::Filter(e) => Some(e),
            OdmError::Validation(e) => Some(e),
            OdmError::Storage(e) => Some(e),
            OdmError::Config(e) => Some(e),
            OdmError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl OdmError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            OdmError::Builder(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OdmError::Filter(_) => StatusCode::BAD_REQUEST,
            OdmError::Validation(e) => e.status_code(),
            OdmError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OdmError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OdmError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            OdmError::Builder(e) => e.error_code(),
            OdmError::Filter(e) => e.error_code(),
            OdmError::Validation(e) => e.error_code(),
            OdmError::Storage(_) => "STORAGE_ERROR",
            OdmError::Config(_) => "CONFIG_ERROR",
            OdmError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            OdmError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "violations": errors }))
            }
            OdmError::Filter(FilterError::InvalidValue { property, .. }) => {
                Some(serde_json::json!({ "property": property }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for OdmError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Builder Errors
// =============================================================================

/// Errors related to builder handles
#[derive(Debug)]
pub enum BuilderError {
    /// The value is neither a document-query builder nor an aggregation builder
    UnsupportedKind { kind: String },
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderError::UnsupportedKind { kind } => {
                write!(f, "Valid MongoDB builder is required, got '{}'", kind)
            }
        }
    }
}

impl std::error::Error for BuilderError {}

impl BuilderError {
    pub fn error_code(&self) -> &'static str {
        match self {
            BuilderError::UnsupportedKind { .. } => "UNSUPPORTED_BUILDER_KIND",
        }
    }
}

impl From<BuilderError> for OdmError {
    fn from(err: BuilderError) -> Self {
        OdmError::Builder(err)
    }
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors raised while applying criteria to a builder
#[derive(Debug)]
pub enum FilterError {
    /// A criteria value does not have the shape its handler expects
    InvalidValue { property: String, message: String },

    /// A sort token is empty or carries no field name
    InvalidSortToken { token: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::InvalidValue { property, message } => {
                write!(f, "Invalid value for filter '{}': {}", property, message)
            }
            FilterError::InvalidSortToken { token } => {
                write!(f, "Invalid sort token: '{}'", token)
            }
        }
    }
}

impl std::error::Error for FilterError {}

impl FilterError {
    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::InvalidValue { .. } => "INVALID_FILTER_VALUE",
            FilterError::InvalidSortToken { .. } => "INVALID_SORT_TOKEN",
        }
    }
}

impl From<FilterError> for OdmError {
    fn from(err: FilterError) -> Self {
        OdmError::Filter(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// One or more constraint violations, each with a stable code
    FieldErrors(Vec<FieldValidationError>),

    /// A value has the wrong type for its validator (a contract violation)
    UnexpectedType { expected: String, actual: String },

    /// Invalid JSON format
    InvalidJson { message: String },

    /// An argument is outside its allowed domain
    InvalidArgument { argument: String, message: String },
}

/// A single constraint violation attached to a field path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.code))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            ValidationError::UnexpectedType { expected, actual } => {
                write!(f, "Expected a value of type {}, got {}", expected, actual)
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
            ValidationError::InvalidArgument { argument, message } => {
                write!(f, "Invalid argument '{}': {}", argument, message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::FieldErrors(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::FieldErrors(_) => "VALIDATION_FAILED",
            ValidationError::UnexpectedType { .. } => "UNEXPECTED_TYPE",
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
            ValidationError::InvalidArgument { .. } => "INVALID_ARGUMENT",
        }
    }
}

impl From<ValidationError> for OdmError {
    fn from(err: ValidationError) -> Self {
        OdmError::Validation(err)
    }
}

/// Flatten `validator` errors into field violations, nested paths joined by `.`
impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut violations = Vec::new();
        collect_violations(&errors, "", &mut violations);
        ValidationError::FieldErrors(violations)
    }
}

fn collect_violations(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<FieldValidationError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    out.push(FieldValidationError {
                        field: path.clone(),
                        code: error.code.to_string(),
                        message: error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| error.code.to_string()),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_violations(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_violations(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by document stores
#[derive(Debug)]
pub enum StorageError {
    /// Connection error
    ConnectionError { backend: String, message: String },

    /// Query or aggregation execution error
    QueryError { backend: String, message: String },

    /// The store answered with a result of the wrong shape
    UnexpectedOutcome { expected: String },

    /// A document could not be converted to or from BSON
    SerializationError { message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionError { backend, message } => {
                write!(f, "Failed to connect to {}: {}", backend, message)
            }
            StorageError::QueryError { backend, message } => {
                write!(f, "{} query error: {}", backend, message)
            }
            StorageError::UnexpectedOutcome { expected } => {
                write!(f, "Store returned an unexpected result, expected {}", expected)
            }
            StorageError::SerializationError { message } => {
                write!(f, "Document serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for OdmError {
    fn from(err: StorageError) -> Self {
        OdmError::Storage(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for OdmError {
    fn from(err: ConfigError) -> Self {
        OdmError::Config(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for OdmError {
    fn from(err: serde_json::Error) -> Self {
        OdmError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for OdmError {
    fn from(err: serde_yaml::Error) -> Self {
        OdmError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::QueryError {
            backend: "MongoDB".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for OdmError {
    fn from(err: mongodb::error::Error) -> Self {
        OdmError::Storage(err.into())
    }
}

impl From<mongodb::bson::de::Error> for OdmError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        OdmError::Storage(StorageError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<mongodb::bson::ser::Error> for OdmError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        OdmError::Storage(StorageError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for OdmError {
    fn from(err: anyhow::Error) -> Self {
        OdmError::Internal(err.to_string())
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for toolkit operations
pub type OdmResult<T> = Result<T, OdmError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_builder_display() {
        let err = BuilderError::UnsupportedKind {
            kind: "plain".to_string(),
        };
        assert!(err.to_string().contains("plain"));
        assert!(err.to_string().contains("builder is required"));
    }

    #[test]
    fn test_odm_error_conversion() {
        let err: OdmError = BuilderError::UnsupportedKind {
            kind: "plain".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "UNSUPPORTED_BUILDER_KIND");
    }

    #[test]
    fn test_filter_error_is_bad_request() {
        let err: OdmError = FilterError::InvalidSortToken {
            token: "-".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_SORT_TOKEN");
    }

    #[test]
    fn test_field_errors_response_carries_violations() {
        let err = OdmError::Validation(ValidationError::FieldErrors(vec![FieldValidationError {
            field: "date".to_string(),
            code: "validation.date_range.invalid_format".to_string(),
            message: "validation.date_range.invalid_format".to_string(),
        }]));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = err.to_response();
        assert_eq!(response.code, "VALIDATION_FAILED");
        let details = response.details.expect("details should be present");
        assert_eq!(details["violations"][0]["field"], "date");
    }

    #[test]
    fn test_validator_errors_are_flattened() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "date",
            validator::ValidationError::new("validation.date_range.from_greater_to"),
        );

        let flattened: ValidationError = errors.into();
        match flattened {
            ValidationError::FieldErrors(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].field, "date");
                assert_eq!(list[0].code, "validation.date_range.from_greater_to");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::QueryError {
            backend: "MongoDB".to_string(),
            message: "cursor killed".to_string(),
        };
        assert!(err.to_string().contains("MongoDB"));
        assert!(err.to_string().contains("cursor killed"));
    }

    #[test]
    fn test_config_error() {
        let err = ConfigError::FileNotFound {
            path: "/etc/odm.yaml".to_string(),
        };
        assert!(err.to_string().contains("/etc/odm.yaml"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: OdmError = json_err.into();
        assert!(matches!(
            err,
            OdmError::Validation(ValidationError::InvalidJson { .. })
        ));
    }
}
