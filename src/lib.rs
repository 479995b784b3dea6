//! # ODM Toolkit
//!
//! Document-mapping helpers for MongoDB backed services.
//!
//! ## Features
//!
//! - **Builder-Aware Filters**: one filter table drives both `find` queries and aggregation
//!   pipelines
//! - **Sort Tokens**: `-createdAt` style tokens become sort directives, in order
//! - **Pagination**: count-then-fetch over either builder kind, with `{ total, items }` results
//! - **Date Ranges**: structural validation of `{from, to}` pairs against a date format
//! - **Existence Constraints**: `exists` / `not_exists` lookups reported as validation errors
//! - **Request Binding**: an axum extractor turning `filter[...]` parameters into validated
//!   criteria
//! - **Documents**: identifier generation and timestamp hooks via `impl_document!`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use odm::prelude::*;
//!
//! #[derive(Debug, Serialize, Deserialize, Validate, Default)]
//! struct OrderCriteria {
//!     #[validate(custom(function = "valid_date_range"))]
//!     date: Option<RangeValue>,
//!     sort: Option<Vec<String>>,
//! }
//!
//! impl Criteria for OrderCriteria {
//!     fn accepts_sort() -> bool {
//!         true
//!     }
//! }
//!
//! let dispatcher = FilterDispatcher::new()
//!     .range("date", "createdAt")
//!     .sort("sort");
//!
//! let mut builder = BuilderHandle::aggregation("orders");
//! dispatcher.dispatch_criteria(&mut builder, &criteria)?;
//!
//! let page = BuilderAwarePaginator::new(store)
//!     .paginate(builder, OffsetPaginator::new(0, 20)?)
//!     .await?;
//! ```

// Lets `impl_document!` expansions name this crate inside serde attributes
extern crate self as odm;

pub mod config;
pub mod core;
pub mod documents;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Builders ===
    pub use crate::core::builder::{
        AggregationBuilder, BuilderHandle, BuilderKind, ConditionTarget, MatchStage, QueryBuilder,
        Stage,
    };

    // === Filters & Sort ===
    pub use crate::core::{
        criteria::{Criteria, FilterCriteria, RangeValue, to_filter_criteria},
        date_format::DateFormat,
        filter::{BoundConversion, FilterDispatcher, apply_range, apply_sort},
        sort::{SortDirection, SortSpec},
    };

    // === Pagination ===
    pub use crate::core::{
        paginator::BuilderAwarePaginator,
        query::{OffsetPaginator, PageParams, PageResult, PaginatedResponse, PaginationMeta},
    };

    // === Validation ===
    pub use crate::core::validation::{
        DateRangeOutcome, DateRangeRule, ExistenceConstraint, ExistenceMode, ExistenceValidator,
        messages, valid_date_range, valid_strict_date_range,
    };

    // === Documents ===
    pub use crate::core::document::{
        CreatedAt, HasId, IdGenerator, OdmDocument, UpdatedAt, UuidGenerator,
    };
    pub use crate::impl_document;

    // === Request binding ===
    pub use crate::core::extractors::FilterQuery;

    // === Errors ===
    pub use crate::core::error::{
        BuilderError, FilterError, OdmError, OdmResult, StorageError, ValidationError,
    };

    // === Storage ===
    pub use crate::core::store::{DocumentStore, QueryOutcome};
    pub use crate::storage::{InMemoryStore, MongoRepository, MongoStore};

    // === Config ===
    pub use crate::config::{DateRangeConfig, MongoConfig, OdmConfig, PaginationConfig};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use mongodb::bson::{Document, doc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
    pub use validator::Validate;
}
