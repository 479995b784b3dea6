//! Document existence constraints
//!
//! An [`ExistenceConstraint`] maps fields of a value object onto fields of a
//! collection. The validator builds lookup criteria from those fields, runs
//! one `find_one_by` against the store and reports a violation at the
//! constraint's error path:
//!
//! - [`ExistenceMode::Exists`]: violated when no document matches
//! - [`ExistenceMode::NotExists`]: violated when a document matches, unless
//!   it is the value's own stored record (same `id`)
//!
//! ```rust,ignore
//! let constraint = ExistenceConstraint::not_exists("users")
//!     .field("email", "email")
//!     .error_path("email");
//!
//! ExistenceValidator::new(store).validate(&payload, &[constraint]).await?;
//! ```

use super::messages;
use crate::core::document::{DOCUMENT_ID, STORED_ID};
use crate::core::error::{
    ConfigError, FieldValidationError, OdmError, StorageError, ValidationError,
};
use crate::core::store::DocumentStore;
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::Value;

/// Default path violations are reported at
pub const DEFAULT_ERROR_PATH: &str = "odm";

/// Which lookup result is a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistenceMode {
    Exists,
    NotExists,
}

impl ExistenceMode {
    pub fn default_message(&self) -> &'static str {
        match self {
            ExistenceMode::Exists => messages::EXISTS,
            ExistenceMode::NotExists => messages::NOT_EXISTS,
        }
    }
}

/// A constraint that cannot be evaluated as declared
#[derive(Debug, thiserror::Error)]
pub enum ConstraintDefinitionError {
    #[error("At least one field has to be specified for collection '{collection}'")]
    NoFields { collection: String },

    #[error("Existence constraint has no collection")]
    MissingCollection,
}

impl From<ConstraintDefinitionError> for OdmError {
    fn from(err: ConstraintDefinitionError) -> Self {
        let field = match &err {
            ConstraintDefinitionError::NoFields { .. } => "fields",
            ConstraintDefinitionError::MissingCollection => "collection",
        };

        OdmError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: String::new(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExistenceConstraint {
    collection: String,
    /// (value field, document field) pairs, in declaration order
    fields: Vec<(String, String)>,
    ignore_null: bool,
    error_path: String,
    message: String,
    mode: ExistenceMode,
}

impl ExistenceConstraint {
    pub fn new(mode: ExistenceMode, collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            fields: Vec::new(),
            ignore_null: true,
            error_path: DEFAULT_ERROR_PATH.to_string(),
            message: mode.default_message().to_string(),
            mode,
        }
    }

    pub fn exists(collection: impl Into<String>) -> Self {
        Self::new(ExistenceMode::Exists, collection)
    }

    pub fn not_exists(collection: impl Into<String>) -> Self {
        Self::new(ExistenceMode::NotExists, collection)
    }

    /// Match `document_field` against the value's `value_field`
    pub fn field(
        mut self,
        value_field: impl Into<String>,
        document_field: impl Into<String>,
    ) -> Self {
        self.fields.push((value_field.into(), document_field.into()));
        self
    }

    /// Leave null value fields out of the lookup criteria (default `true`)
    pub fn ignore_null(mut self, ignore: bool) -> Self {
        self.ignore_null = ignore;
        self
    }

    pub fn error_path(mut self, path: impl Into<String>) -> Self {
        self.error_path = path.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn mode(&self) -> ExistenceMode {
        self.mode
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn check_definition(&self) -> Result<(), ConstraintDefinitionError> {
        if self.collection.is_empty() {
            return Err(ConstraintDefinitionError::MissingCollection);
        }
        if self.fields.is_empty() {
            return Err(ConstraintDefinitionError::NoFields {
                collection: self.collection.clone(),
            });
        }
        Ok(())
    }

    /// Lookup criteria for a serialized value object
    ///
    /// A missing value field reads as null.
    pub fn criteria(
        &self,
        value: &serde_json::Map<String, Value>,
    ) -> Result<Document, StorageError> {
        let mut criteria = Document::new();

        for (value_field, document_field) in &self.fields {
            let field_value = value.get(value_field).unwrap_or(&Value::Null);
            if self.ignore_null && field_value.is_null() {
                continue;
            }

            let bson = mongodb::bson::to_bson(field_value).map_err(|e| {
                StorageError::SerializationError {
                    message: e.to_string(),
                }
            })?;
            criteria.insert(document_field.clone(), bson);
        }

        Ok(criteria)
    }

    fn violation(&self) -> FieldValidationError {
        FieldValidationError {
            field: self.error_path.clone(),
            code: self.mode.default_message().to_string(),
            message: self.message.clone(),
        }
    }
}

/// Evaluates existence constraints against a [`DocumentStore`]
#[derive(Debug, Clone)]
pub struct ExistenceValidator<S> {
    store: S,
}

impl<S: DocumentStore> ExistenceValidator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Evaluate one constraint; `Ok(None)` means satisfied
    ///
    /// A null value is always satisfied. With `ignore_null`, a value whose
    /// constrained fields are all null is satisfied without a lookup.
    pub async fn check<T: Serialize + ?Sized>(
        &self,
        value: &T,
        constraint: &ExistenceConstraint,
    ) -> Result<Option<FieldValidationError>, OdmError> {
        constraint.check_definition()?;

        let object = match serde_json::to_value(value)? {
            Value::Null => return Ok(None),
            Value::Object(map) => map,
            other => {
                return Err(ValidationError::UnexpectedType {
                    expected: "object".to_string(),
                    actual: crate::core::criteria::json_type_name(&other).to_string(),
                }
                .into());
            }
        };

        let criteria = constraint.criteria(&object)?;
        if constraint.ignore_null && criteria.is_empty() {
            return Ok(None);
        }

        let found = self
            .store
            .find_one_by(constraint.collection(), criteria)
            .await?;
        let own_record = found
            .as_ref()
            .is_some_and(|doc| is_same_document(doc, &object));

        tracing::debug!(
            collection = %constraint.collection(),
            mode = ?constraint.mode(),
            found = found.is_some(),
            own_record,
            "Existence lookup"
        );

        let violated = match constraint.mode() {
            ExistenceMode::Exists => found.is_none(),
            ExistenceMode::NotExists => found.is_some() && !own_record,
        };

        Ok(violated.then(|| constraint.violation()))
    }

    /// Evaluate every constraint and collect the violations
    pub async fn validate<T: Serialize + ?Sized>(
        &self,
        value: &T,
        constraints: &[ExistenceConstraint],
    ) -> Result<(), OdmError> {
        let mut violations = Vec::new();

        for constraint in constraints {
            if let Some(violation) = self.check(value, constraint).await? {
                violations.push(violation);
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::FieldErrors(violations).into())
        }
    }
}

/// Whether a stored document carries the value's own identifier
fn is_same_document(found: &Document, value: &serde_json::Map<String, Value>) -> bool {
    let Some(id) = value.get(DOCUMENT_ID).filter(|id| !id.is_null()) else {
        return false;
    };

    match (found.get(STORED_ID).or_else(|| found.get(DOCUMENT_ID)), id) {
        (Some(Bson::String(stored)), Value::String(id)) => stored == id,
        (Some(Bson::ObjectId(stored)), Value::String(id)) => stored.to_hex() == *id,
        (Some(stored), id) => mongodb::bson::to_bson(id).is_ok_and(|id| &id == stored),
        (None, _) => false,
    }
}
