//! Error taxonomy for the record mapper.
//!
//! Two families of failures exist: caller misuse (rejected before any storage
//! interaction) and storage failures, which are propagated unchanged from the
//! backend. There is no retry policy here; retries belong to whatever sits
//! behind the storage boundary.

use crate::connection::BackendError;
use crate::events::ModelEvent;

/// Result type alias for mapper operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("model `{0}` is not registered")]
    UnknownModel(String),

    #[error("model `{0}` is registered twice")]
    DuplicateModel(String),

    #[error("relation `{relation}` is not defined on model `{model}`")]
    UnknownRelation { model: String, relation: String },

    #[error("relation `{relation}` on model `{model}` points at unregistered model `{target}`")]
    DanglingRelation {
        model: String,
        relation: String,
        target: String,
    },

    #[error("scope `{scope}` is not defined on model `{model}`")]
    UnknownScope { model: String, scope: String },

    #[error("cannot create `{model}`: identifier field `{field}` already carries a value")]
    IdentifierAlreadySet { model: String, field: String },

    #[error("`{event}` hook halted the `{model}` operation")]
    Halted { model: String, event: ModelEvent },

    #[error("record of `{model}` has no primary key value")]
    MissingPrimaryKey { model: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
