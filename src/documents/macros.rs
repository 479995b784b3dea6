//! Macros for reducing boilerplate when defining documents
//!
//! `impl_document!` generates the identifier and timestamp fields every
//! document carries, plus the trait implementations wiring the lifecycle hooks.

/// Complete macro to create a document with automatic trait implementations
///
/// Fields are stored in camelCase (`createdAt`, `updatedAt`). Timestamps are
/// stored as BSON dates, so date range filters compare them natively.
///
/// # Example
///
/// ```rust,ignore
/// use odm::prelude::*;
///
/// impl_document!(
///     Order,
///     "orders",
///     {
///         number: String,
///         total: f64,
///     }
/// );
///
/// // Usage
/// let order = Order::new("A-1001".to_string(), 49.90);
/// let order = repository.persist(order).await?; // id and timestamps set
/// ```
#[macro_export]
macro_rules! impl_document {
    (
        $type:ident,
        $collection:expr,
        {
            $( $specific_field:ident : $specific_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $type {
            /// Identifier, generated on first persist when absent
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub id: Option<String>,

            /// When this document was first persisted
            #[serde(
                default,
                skip_serializing_if = "Option::is_none",
                with = "::odm::core::document::bson_datetime"
            )]
            pub created_at: Option<::chrono::DateTime<::chrono::Utc>>,

            /// When this document was last persisted
            #[serde(
                default,
                skip_serializing_if = "Option::is_none",
                with = "::odm::core::document::bson_datetime"
            )]
            pub updated_at: Option<::chrono::DateTime<::chrono::Utc>>,

            $( pub $specific_field : $specific_type ),*
        }

        impl $type {
            /// Create a document that has not been persisted yet
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $specific_field : $specific_type ),*) -> Self {
                Self {
                    id: None,
                    created_at: None,
                    updated_at: None,
                    $( $specific_field ),*
                }
            }
        }

        impl $crate::core::document::HasId for $type {
            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn set_id(&mut self, id: String) {
                self.id = Some(id);
            }
        }

        impl $crate::core::document::CreatedAt for $type {
            fn created_at(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.created_at
            }

            fn set_created_at(&mut self, at: ::chrono::DateTime<::chrono::Utc>) {
                self.created_at = Some(at);
            }
        }

        impl $crate::core::document::UpdatedAt for $type {
            fn updated_at(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.updated_at
            }

            fn set_updated_at(&mut self, at: ::chrono::DateTime<::chrono::Utc>) {
                self.updated_at = Some(at);
            }
        }

        impl $crate::core::document::OdmDocument for $type {
            fn collection_name() -> &'static str {
                $collection
            }

            fn pre_persist(&mut self, now: ::chrono::DateTime<::chrono::Utc>) {
                $crate::core::document::CreatedAt::pre_persist_created_at(self, now);
                $crate::core::document::UpdatedAt::pre_persist_updated_at(self, now);
            }

            fn pre_update(&mut self, now: ::chrono::DateTime<::chrono::Utc>) {
                $crate::core::document::UpdatedAt::pre_update_updated_at(self, now);
            }
        }
    };
}
