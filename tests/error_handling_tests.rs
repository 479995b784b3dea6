//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses carry stable codes and details
//! - External errors convert into the right category

use axum::http::StatusCode;
use axum::response::IntoResponse;
use odm::core::error::{ConfigError, FieldValidationError};
use odm::prelude::*;

fn violation(field: &str, code: &str) -> FieldValidationError {
    FieldValidationError {
        field: field.to_string(),
        code: code.to_string(),
        message: code.to_string(),
    }
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_unsupported_builder_returns_500() {
        let err = OdmError::Builder(BuilderError::UnsupportedKind {
            kind: "plain".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_filter_errors_return_400() {
        let err = OdmError::Filter(FilterError::InvalidSortToken {
            token: "-".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_violations_return_422() {
        let err = OdmError::Validation(ValidationError::FieldErrors(vec![violation(
            "date",
            messages::DATE_RANGE_FROM_GREATER_TO,
        )]));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_invalid_argument_returns_400() {
        let err: OdmError = OffsetPaginator::new(0, 0).unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn test_storage_error_returns_500() {
        let err = OdmError::Storage(StorageError::QueryError {
            backend: "MongoDB".to_string(),
            message: "connection reset".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }
}

// =============================================================================
// Response Format Tests
// =============================================================================

mod response_tests {
    use super::*;

    #[test]
    fn test_violation_details() {
        let err = OdmError::Validation(ValidationError::FieldErrors(vec![
            violation("email", messages::NOT_EXISTS),
            violation("tenantId", messages::EXISTS),
        ]));

        let response = err.to_response();
        assert_eq!(response.code, "VALIDATION_FAILED");

        let details = response.details.unwrap();
        assert_eq!(details["violations"].as_array().unwrap().len(), 2);
        assert_eq!(details["violations"][1]["field"], "tenantId");
    }

    #[test]
    fn test_unsupported_builder_message() {
        let err = OdmError::Builder(BuilderError::UnsupportedKind {
            kind: "plain".to_string(),
        });
        let response = err.to_response();

        assert_eq!(response.code, "UNSUPPORTED_BUILDER_KIND");
        assert!(response.message.contains("Valid MongoDB builder is required"));
        assert!(response.details.is_none());
    }

    #[test]
    fn test_into_response_status() {
        let err = OdmError::Filter(FilterError::InvalidValue {
            property: "date".to_string(),
            message: "expected a range object".to_string(),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Conversion Tests
// =============================================================================

mod conversion_tests {
    use super::*;

    #[test]
    fn test_validator_errors_flatten_to_field_paths() {
        #[derive(Debug, Validate)]
        struct Search {
            #[validate(custom(function = "valid_strict_date_range"))]
            date: RangeValue,
        }

        let search = Search {
            date: RangeValue::new(Some("2025-01-01"), Some("2025-01-01")),
        };
        let err = ValidationError::from(search.validate().unwrap_err());

        match err {
            ValidationError::FieldErrors(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "date");
                assert_eq!(violations[0].code, messages::DATE_RANGE_FROM_EQUALS_TO);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_serde_json_error_is_invalid_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: OdmError = json_err.into();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }

    #[test]
    fn test_yaml_error_is_config_error() {
        let yaml_err = serde_yaml::from_str::<OdmConfig>("pagination: [").unwrap_err();
        let err: OdmError = yaml_err.into();
        assert!(matches!(err, OdmError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_anyhow_error_is_internal() {
        let err: OdmError = anyhow::anyhow!("boom").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_builder_kind_parse_error() {
        let err: OdmError = "plain".parse::<BuilderKind>().unwrap_err().into();
        assert_eq!(err.error_code(), "UNSUPPORTED_BUILDER_KIND");
    }
}
