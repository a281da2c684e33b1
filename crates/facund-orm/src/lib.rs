//! # facund
//!
//! A declarative record mapper. One [`ModelDef`](model::ModelDef) per
//! logical entity binds it to a backing table and carries all of its policy:
//! which fields bulk assignment may touch, which stay out of serialized
//! views, how stored values are coerced on read, per-field read/write
//! transforms, declared relations, named query scopes and lifecycle
//! callbacks. Records themselves are schemaless attribute maps; the
//! definition, not the Rust type, is the contract.
//!
//! Definitions are registered and verified once at startup
//! ([`registry::RegistryBuilder`]), then a [`manager::Database`] pairs the
//! registry with a row-level storage executor
//! ([`connection::DatabaseExecutor`]) and hands out per-model managers.
//!
//! ```
//! use facund_orm::casts::CastType;
//! use facund_orm::connection::MemoryBackend;
//! use facund_orm::manager::Database;
//! use facund_orm::model::ModelDef;
//! use facund_orm::query::{Direction, FilterOperator};
//! use facund_orm::registry::RegistryBuilder;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RegistryBuilder::new()
//!     .register(
//!         ModelDef::builder("article")
//!             .guard(["id", "user_id"])
//!             .hide(["click_num"])
//!             .cast("status", CastType::Boolean)
//!             .scope("popular", |q| {
//!                 q.filter("click_num", FilterOperator::Gte, 10)
//!             })
//!             .build(),
//!     )
//!     .build()?;
//!
//! let backend = MemoryBackend::with_tables(["article"]);
//! let db = Database::new(registry, Arc::new(backend));
//! let articles = db.model("article")?;
//!
//! let record = articles
//!     .create(json!({"title": "hello", "status": "1"}).as_object().unwrap().clone())
//!     .await?;
//! assert_eq!(record.get("status"), Some(json!(true)));
//!
//! let popular = articles.scope("popular")?.order_by("id", Direction::Asc);
//! let hits = articles.fetch(popular).await?;
//! # let _ = hits;
//! # Ok(())
//! # }
//! ```

pub mod casts;
pub mod connection;
pub mod error;
pub mod events;
pub mod manager;
pub mod model;
pub mod query;
pub mod record;
pub mod registry;
pub mod relations;
pub mod serializer;

pub use casts::CastType;
pub use connection::{BackendError, DatabaseExecutor, MemoryBackend, Row};
pub use error::{Error, Result};
pub use events::ModelEvent;
pub use facund_hooks::HookOutcome;
pub use manager::{Database, Manager, Related};
pub use model::{ModelDef, ModelDefBuilder};
pub use query::{Direction, Filter, FilterOperator, FilterValue, QuerySet, SelectQuery};
pub use record::{Attributes, Record};
pub use registry::{Registry, RegistryBuilder};
pub use relations::{BelongsTo, HasManyThrough, Relation};

pub mod prelude {
    pub use crate::casts::CastType;
    pub use crate::connection::{DatabaseExecutor, MemoryBackend};
    pub use crate::error::{Error, Result};
    pub use crate::events::ModelEvent;
    pub use crate::manager::{Database, Manager, Related};
    pub use crate::model::{ModelDef, ModelDefBuilder};
    pub use crate::query::{Direction, FilterOperator, FilterValue};
    pub use crate::record::{Attributes, Record};
    pub use crate::registry::RegistryBuilder;
    pub use crate::relations::{BelongsTo, HasManyThrough, Relation};
    pub use facund_hooks::HookOutcome;
}
