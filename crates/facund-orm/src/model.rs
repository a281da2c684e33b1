//! Declarative model definitions.
//!
//! A [`ModelDef`] carries everything the mapper knows about one logical
//! entity: the backing table, the identifier column, which fields bulk
//! assignment may touch, which fields stay out of the external
//! representation, cast rules, read/write transforms, relations, named
//! scopes and lifecycle callbacks. Definitions are built once at startup
//! through [`ModelDefBuilder`] and are immutable afterwards; records hold
//! them behind an `Arc`.

use crate::casts::CastType;
use crate::events::{LifecycleHooks, ModelEvent};
use crate::query::QuerySet;
use crate::record::Record;
use crate::relations::Relation;
use facund_hooks::HookOutcome;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// A per-field read or write transform.
pub type AttributeTransform = Box<dyn Fn(Value) -> Value + Send + Sync>;

/// A named, reusable query predicate.
pub type ScopeFn = std::sync::Arc<dyn Fn(QuerySet) -> QuerySet + Send + Sync>;

/// Everything the mapper knows about one logical entity.
pub struct ModelDef {
    /// Registry key ("article").
    pub name: String,
    /// Backing table name.
    pub table: String,
    /// Identifier column name.
    pub primary_key: String,
    /// Fields bulk assignment silently ignores.
    pub guarded: HashSet<String>,
    /// Allowlist consulted instead of `guarded` when present.
    pub fillable: Option<HashSet<String>>,
    /// Fields excluded from the external representation.
    pub hidden: HashSet<String>,
    /// Per-field coercions applied on read.
    pub casts: HashMap<String, CastType>,
    /// Fields rendered as structured datetimes on read.
    pub dates: HashSet<String>,
    /// Stamp `created_at` / `updated_at` around storage writes.
    pub timestamps: bool,
    /// Read transforms, applied when no cast matches.
    pub accessors: HashMap<String, AttributeTransform>,
    /// Write transforms.
    pub mutators: HashMap<String, AttributeTransform>,
    /// Declared relations.
    pub relations: HashMap<String, Relation>,
    /// Named query scopes.
    pub scopes: HashMap<String, ScopeFn>,
    /// Lifecycle callbacks.
    pub hooks: LifecycleHooks,
}

impl ModelDef {
    pub fn builder(name: impl Into<String>) -> ModelDefBuilder {
        ModelDefBuilder::new(name)
    }

    /// Whether bulk assignment may set `field`.
    ///
    /// The allowlist wins when present; otherwise any field outside
    /// `guarded` is assignable.
    pub fn is_fillable(&self, field: &str) -> bool {
        match &self.fillable {
            Some(fillable) => fillable.contains(field),
            None => !self.guarded.contains(field),
        }
    }
}

impl std::fmt::Debug for ModelDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDef")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("guarded", &self.guarded)
            .field("hidden", &self.hidden)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Chainable builder for [`ModelDef`].
///
/// # Examples
///
/// ```
/// use facund_orm::casts::CastType;
/// use facund_orm::model::ModelDef;
///
/// let article = ModelDef::builder("article")
///     .table("article")
///     .guard(["id", "user_id"])
///     .hide(["click_num"])
///     .cast("status", CastType::Boolean)
///     .dates(["created_at", "updated_at"])
///     .build();
///
/// assert!(!article.is_fillable("user_id"));
/// assert!(article.is_fillable("title"));
/// ```
pub struct ModelDefBuilder {
    def: ModelDef,
}

impl ModelDefBuilder {
    /// Starts a definition; the table defaults to the model name and the
    /// primary key to `id`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            def: ModelDef {
                table: name.clone(),
                name,
                primary_key: "id".to_string(),
                guarded: HashSet::new(),
                fillable: None,
                hidden: HashSet::new(),
                casts: HashMap::new(),
                dates: HashSet::new(),
                timestamps: false,
                accessors: HashMap::new(),
                mutators: HashMap::new(),
                relations: HashMap::new(),
                scopes: HashMap::new(),
                hooks: LifecycleHooks::new(),
            },
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.def.table = table.into();
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.def.primary_key = field.into();
        self
    }

    /// Declares fields bulk assignment must silently ignore.
    pub fn guard<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.guarded.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declares the bulk-assignment allowlist; takes precedence over
    /// [`guard`](Self::guard) when set.
    pub fn fillable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def
            .fillable
            .get_or_insert_with(HashSet::new)
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declares fields excluded from every serialized view.
    pub fn hide<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.hidden.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn cast(mut self, field: impl Into<String>, cast: CastType) -> Self {
        self.def.casts.insert(field.into(), cast);
        self
    }

    /// Declares fields whose stored value is a timestamp, rendered as an
    /// RFC 3339 datetime on read.
    pub fn dates<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.dates.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Enables `created_at` / `updated_at` stamping around storage writes.
    pub fn timestamps(mut self) -> Self {
        self.def.timestamps = true;
        self
    }

    /// Registers a read transform, applied when no cast matches the field.
    pub fn accessor<F>(mut self, field: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.def.accessors.insert(field.into(), Box::new(transform));
        self
    }

    /// Registers a write transform applied before the value is stored.
    pub fn mutator<F>(mut self, field: impl Into<String>, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.def.mutators.insert(field.into(), Box::new(transform));
        self
    }

    pub fn relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.def.relations.insert(name.into(), relation);
        self
    }

    /// Registers a named, reusable query predicate.
    pub fn scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(QuerySet) -> QuerySet + Send + Sync + 'static,
    {
        self.def.scopes.insert(name.into(), std::sync::Arc::new(scope));
        self
    }

    /// Registers a lifecycle callback that may halt the operation.
    pub fn hook<F>(mut self, event: ModelEvent, hook: F) -> Self
    where
        F: Fn(&mut Record) -> HookOutcome + Send + Sync + 'static,
    {
        self.def.hooks.register(event, hook);
        self
    }

    /// Registers a lifecycle callback that only observes the record.
    pub fn observer<F>(mut self, event: ModelEvent, hook: F) -> Self
    where
        F: Fn(&mut Record) + Send + Sync + 'static,
    {
        self.def.hooks.observe(event, hook);
        self
    }

    pub fn build(self) -> ModelDef {
        self.def
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let def = ModelDef::builder("article").build();
        assert_eq!(def.table, "article");
        assert_eq!(def.primary_key, "id");
        assert!(!def.timestamps);
        assert!(def.is_fillable("anything"));
    }

    #[test]
    fn fillable_allowlist_wins_over_guarded() {
        let def = ModelDef::builder("article")
            .guard(["title"])
            .fillable(["title"])
            .build();
        assert!(def.is_fillable("title"));
        assert!(!def.is_fillable("body"));
    }

    #[test]
    fn guarded_fields_are_not_fillable() {
        let def = ModelDef::builder("article").guard(["id", "user_id"]).build();
        assert!(!def.is_fillable("id"));
        assert!(!def.is_fillable("user_id"));
        assert!(def.is_fillable("title"));
    }
}
