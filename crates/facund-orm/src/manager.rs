//! Persistence orchestration.
//!
//! A [`Database`] ties the verified model registry to a storage executor and
//! hands out per-model [`Manager`]s. The manager owns every flow that
//! touches storage: create (with the identifier-misuse rejection), update,
//! save, delete, lookups, query execution and relation resolution. Lifecycle
//! events fire synchronously around each write and every emission is logged
//! at debug level.

use crate::casts;
use crate::connection::DatabaseExecutor;
use crate::error::{Error, Result};
use crate::events::ModelEvent;
use crate::model::ModelDef;
use crate::query::{Filter, FilterOperator, FilterValue, QuerySet, SelectQuery};
use crate::record::{Attributes, Record, is_empty_value};
use crate::registry::Registry;
use crate::relations::Relation;
use chrono::Utc;
use facund_hooks::HookOutcome;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry point: verified registry plus a storage executor.
#[derive(Clone)]
pub struct Database {
	registry: Arc<Registry>,
	executor: Arc<dyn DatabaseExecutor>,
}

impl Database {
	pub fn new(registry: Registry, executor: Arc<dyn DatabaseExecutor>) -> Self {
		Self {
			registry: Arc::new(registry),
			executor,
		}
	}

	/// The manager for a registered model.
	pub fn model(&self, name: &str) -> Result<Manager> {
		Ok(Manager {
			def: self.registry.get(name)?,
			registry: Arc::clone(&self.registry),
			executor: Arc::clone(&self.executor),
		})
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	pub fn executor(&self) -> &Arc<dyn DatabaseExecutor> {
		&self.executor
	}
}

/// Records resolved through a relation: one owner, or many related rows.
#[derive(Debug)]
pub enum Related {
	One(Option<Record>),
	Many(Vec<Record>),
}

impl Related {
	pub fn one(self) -> Option<Record> {
		match self {
			Self::One(record) => record,
			Self::Many(mut records) => {
				if records.is_empty() {
					None
				} else {
					Some(records.remove(0))
				}
			}
		}
	}

	pub fn many(self) -> Vec<Record> {
		match self {
			Self::One(record) => record.into_iter().collect(),
			Self::Many(records) => records,
		}
	}
}

/// Database operations for one model.
pub struct Manager {
	def: Arc<ModelDef>,
	registry: Arc<Registry>,
	executor: Arc<dyn DatabaseExecutor>,
}

impl Manager {
	pub fn def(&self) -> &Arc<ModelDef> {
		&self.def
	}

	/// A fresh, unsaved record of this model.
	pub fn new_record(&self) -> Record {
		Record::new(Arc::clone(&self.def))
	}

	/// An unconstrained query over this model.
	pub fn query(&self) -> QuerySet {
		QuerySet::new(Arc::clone(&self.def))
	}

	/// A query with the named scope already applied.
	pub fn scope(&self, name: &str) -> Result<QuerySet> {
		self.query().scope(name)
	}

	/// Creates a record from an untrusted attribute map.
	///
	/// Rejects the call, before any storage interaction, when the map
	/// carries a non-empty value for the identifier field: a populated
	/// identifier on a record being created signals caller misuse. Note
	/// this checks the identifier only, not whether a row actually exists
	/// in storage.
	///
	/// Fires `saving`, `creating`, the insert, `created`, `saved`.
	pub async fn create(&self, attributes: Attributes) -> Result<Record> {
		if let Some(value) = attributes.get(&self.def.primary_key) {
			if !is_empty_value(value) {
				return Err(Error::IdentifierAlreadySet {
					model: self.def.name.clone(),
					field: self.def.primary_key.clone(),
				});
			}
		}

		let mut record = self.new_record();
		record.fill(attributes);
		self.perform_insert(&mut record).await?;
		Ok(record)
	}

	/// Applies an untrusted attribute map (guarded fields stripped) and
	/// persists the changes.
	///
	/// Fires `saving`, `updating`, the write, `updated`, `saved`.
	pub async fn update(&self, record: &mut Record, attributes: Attributes) -> Result<()> {
		record.fill(attributes);
		self.perform_update(record).await
	}

	/// Persists the record as-is: inserts when it is not yet backed by a
	/// storage row, otherwise writes the changed attributes. Direct saves
	/// skip bulk-assignment guarding: whatever was `set` on the record is
	/// written.
	pub async fn save(&self, record: &mut Record) -> Result<()> {
		if record.exists() {
			self.perform_update(record).await
		} else {
			self.perform_insert(record).await
		}
	}

	/// Removes the record's row.
	///
	/// Fires `deleting`, the removal, `deleted`.
	pub async fn delete(&self, record: &mut Record) -> Result<()> {
		let key = record
			.primary_key()
			.cloned()
			.ok_or_else(|| Error::MissingPrimaryKey {
				model: self.def.name.clone(),
			})?;

		self.fire(ModelEvent::Deleting, record)?;
		self.executor
			.delete(&self.def.table, &self.def.primary_key, &key)
			.await?;
		record.mark_removed();
		self.notify(ModelEvent::Deleted, record);
		Ok(())
	}

	/// Fetches a record by primary key.
	pub async fn find(&self, key: impl Into<Value> + Send) -> Result<Option<Record>> {
		let key = key.into();
		let row = self
			.executor
			.find(&self.def.table, &self.def.primary_key, &key)
			.await?;
		Ok(row.map(|row| Record::hydrate(Arc::clone(&self.def), row.data)))
	}

	/// Fetches every record of this model.
	pub async fn all(&self) -> Result<Vec<Record>> {
		self.fetch(self.query()).await
	}

	/// Executes a query set built from [`query`](Self::query) or
	/// [`scope`](Self::scope).
	pub async fn fetch(&self, query: QuerySet) -> Result<Vec<Record>> {
		let rows = self
			.executor
			.select(&self.def.table, &query.into_select_query())
			.await?;
		Ok(rows
			.into_iter()
			.map(|row| Record::hydrate(Arc::clone(&self.def), row.data))
			.collect())
	}

	pub async fn first(&self, query: QuerySet) -> Result<Option<Record>> {
		Ok(self.fetch(query.limit(1)).await?.into_iter().next())
	}

	pub async fn count(&self, query: QuerySet) -> Result<usize> {
		Ok(self.fetch(query).await?.len())
	}

	/// Resolves a declared relation on `record`.
	pub async fn related(&self, record: &Record, name: &str) -> Result<Related> {
		let relation = self
			.def
			.relations
			.get(name)
			.ok_or_else(|| Error::UnknownRelation {
				model: self.def.name.clone(),
				relation: name.to_string(),
			})?;

		match relation {
			Relation::BelongsTo(rel) => {
				let owner_def = self.registry.get(&rel.related)?;
				let foreign = match record.get_raw(&rel.foreign_key) {
					Some(value) if !is_empty_value(value) => value.clone(),
					_ => return Ok(Related::One(None)),
				};
				let row = self
					.executor
					.find(&owner_def.table, &rel.owner_key, &foreign)
					.await?;
				Ok(Related::One(
					row.map(|row| Record::hydrate(owner_def, row.data)),
				))
			}
			Relation::HasManyThrough(rel) => {
				let related_def = self.registry.get(&rel.related)?;
				let local = match record.get_raw(&rel.local_key) {
					Some(value) if !is_empty_value(value) => value.clone(),
					_ => return Ok(Related::Many(Vec::new())),
				};

				let through_query = SelectQuery {
					filters: vec![Filter::new(
						&rel.first_key,
						FilterOperator::Eq,
						FilterValue::from_value(&local),
					)],
					..SelectQuery::default()
				};
				let through_rows = self.executor.select(&rel.through, &through_query).await?;

				let through_keys: Vec<FilterValue> = through_rows
					.iter()
					.filter_map(|row| row.data.get(&rel.through_local_key))
					.filter(|value| !is_empty_value(value))
					.map(FilterValue::from_value)
					.collect();
				if through_keys.is_empty() {
					return Ok(Related::Many(Vec::new()));
				}

				let related_query = SelectQuery {
					filters: vec![Filter::new(
						&rel.second_key,
						FilterOperator::In,
						FilterValue::List(through_keys),
					)],
					..SelectQuery::default()
				};
				let rows = self
					.executor
					.select(&related_def.table, &related_query)
					.await?;
				Ok(Related::Many(
					rows.into_iter()
						.map(|row| Record::hydrate(Arc::clone(&related_def), row.data))
						.collect(),
				))
			}
		}
	}

	async fn perform_insert(&self, record: &mut Record) -> Result<()> {
		self.fire(ModelEvent::Saving, record)?;
		self.fire(ModelEvent::Creating, record)?;

		if self.def.timestamps {
			let now = Value::String(casts::render_datetime(&Utc::now()));
			record.set_raw("created_at", now.clone());
			record.set_raw("updated_at", now);
		}

		let row = self
			.executor
			.insert(
				&self.def.table,
				&self.def.primary_key,
				record.attributes().clone(),
			)
			.await?;
		record.merge_row(row.data);

		self.notify(ModelEvent::Created, record);
		self.notify(ModelEvent::Saved, record);
		Ok(())
	}

	async fn perform_update(&self, record: &mut Record) -> Result<()> {
		let key = record
			.primary_key()
			.cloned()
			.ok_or_else(|| Error::MissingPrimaryKey {
				model: self.def.name.clone(),
			})?;

		self.fire(ModelEvent::Saving, record)?;
		self.fire(ModelEvent::Updating, record)?;

		if self.def.timestamps && record.is_dirty() {
			record.set_raw(
				"updated_at",
				Value::String(casts::render_datetime(&Utc::now())),
			);
		}

		let changes = record.dirty();
		if changes.is_empty() {
			record.sync_original();
		} else {
			let row = self
				.executor
				.update(&self.def.table, &self.def.primary_key, &key, changes)
				.await?;
			record.merge_row(row.data);
		}

		self.notify(ModelEvent::Updated, record);
		self.notify(ModelEvent::Saved, record);
		Ok(())
	}

	/// Runs the callbacks for a vetoable event; a halt aborts the operation
	/// before the storage write.
	fn fire(&self, event: ModelEvent, record: &mut Record) -> Result<()> {
		debug_assert!(event.can_halt());
		debug!(model = %self.def.name, event = %event, "lifecycle event");
		match self.def.hooks.fire(event, record) {
			HookOutcome::Proceed => Ok(()),
			HookOutcome::Halt => {
				warn!(model = %self.def.name, event = %event, "operation halted by hook");
				Err(Error::Halted {
					model: self.def.name.clone(),
					event,
				})
			}
		}
	}

	/// Runs the callbacks for a past-tense event; outcomes are ignored
	/// because the write already happened.
	fn notify(&self, event: ModelEvent, record: &mut Record) {
		debug_assert!(!event.can_halt());
		debug!(model = %self.def.name, event = %event, "lifecycle event");
		let _ = self.def.hooks.fire(event, record);
	}
}
