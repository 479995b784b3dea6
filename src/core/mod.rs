//! Core module containing the builders, filter dispatch, pagination and validation

pub mod builder;
pub mod criteria;
pub mod date_format;
pub mod document;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod paginator;
pub mod query;
pub mod sort;
pub mod store;
pub mod validation;

pub use builder::{
    AggregationBuilder, BuilderHandle, BuilderKind, ConditionTarget, FieldCondition, MatchStage,
    QueryBuilder, Stage,
};
pub use criteria::{Criteria, FilterCriteria, RangeValue};
pub use date_format::DateFormat;
pub use document::{CreatedAt, HasId, IdGenerator, OdmDocument, UpdatedAt, UuidGenerator};
pub use error::{OdmError, OdmResult};
pub use extractors::FilterQuery;
pub use filter::{BoundConversion, FilterDispatcher};
pub use paginator::BuilderAwarePaginator;
pub use query::{OffsetPaginator, PageParams, PageResult, PaginatedResponse, PaginationMeta};
pub use sort::{SortDirection, SortSpec};
pub use store::{DocumentStore, QueryOutcome};
