//! Record instances.
//!
//! A [`Record`] is an attribute map bound to a [`ModelDef`]. The map holds
//! raw stored values; policy (guarding, casts, accessors, mutators, hiding)
//! is applied at the edges: [`fill`](Record::fill) and [`set`](Record::set)
//! on the way in, [`get`](Record::get) and serialization on the way out.

use crate::casts::{self, CastType};
use crate::model::ModelDef;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Raw attribute storage: field name to stored value.
pub type Attributes = serde_json::Map<String, Value>;

/// Whether a value counts as "empty" for identifier checks: null, `false`,
/// zero and the empty string all do.
pub(crate) fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::Number(n) => n.as_f64() == Some(0.0),
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}

/// One entity instance: raw attributes plus the definition that governs them.
pub struct Record {
	def: Arc<ModelDef>,
	attributes: Attributes,
	original: Attributes,
	exists: bool,
}

impl Record {
	/// A fresh, empty record not yet backed by a storage row.
	pub fn new(def: Arc<ModelDef>) -> Self {
		Self {
			def,
			attributes: Attributes::new(),
			original: Attributes::new(),
			exists: false,
		}
	}

	/// A record rebuilt from a storage row.
	pub(crate) fn hydrate(def: Arc<ModelDef>, row: Attributes) -> Self {
		Self {
			def,
			original: row.clone(),
			attributes: row,
			exists: true,
		}
	}

	pub fn def(&self) -> &Arc<ModelDef> {
		&self.def
	}

	pub fn model(&self) -> &str {
		&self.def.name
	}

	/// Whether the record is backed by a storage row.
	pub fn exists(&self) -> bool {
		self.exists
	}

	/// Bulk assignment from an untrusted attribute map.
	///
	/// Fields the definition does not allow (guarded, or outside the
	/// allowlist) are silently discarded; everything else goes through
	/// [`set`](Record::set) and therefore through registered mutators.
	pub fn fill(&mut self, attributes: Attributes) -> &mut Self {
		for (field, value) in attributes {
			if self.def.is_fillable(&field) {
				self.set(&field, value);
			} else {
				debug!(
					model = %self.def.name,
					field = %field,
					"discarding non-fillable attribute"
				);
			}
		}
		self
	}

	/// Single-field assignment. Bypasses guarding; applies the registered
	/// mutator when one exists.
	pub fn set(&mut self, field: &str, value: Value) -> &mut Self {
		let value = match self.def.mutators.get(field) {
			Some(mutator) => mutator(value),
			None => value,
		};
		self.attributes.insert(field.to_string(), value);
		self
	}

	/// Stores a value without running mutators. Used when synchronizing
	/// with storage rows and for stamping bookkeeping fields.
	pub(crate) fn set_raw(&mut self, field: &str, value: Value) {
		self.attributes.insert(field.to_string(), value);
	}

	/// Reads a field through the declared pipeline: the cast rule when one
	/// exists, else date rendering, else the registered accessor, else the
	/// raw value.
	pub fn get(&self, field: &str) -> Option<Value> {
		let raw = self.attributes.get(field)?;
		if let Some(cast) = self.def.casts.get(field) {
			return Some(cast.apply(raw));
		}
		if self.def.dates.contains(field) {
			return Some(CastType::DateTime.apply(raw));
		}
		if let Some(accessor) = self.def.accessors.get(field) {
			return Some(accessor(raw.clone()));
		}
		Some(raw.clone())
	}

	/// The raw stored value, no pipeline.
	pub fn get_raw(&self, field: &str) -> Option<&Value> {
		self.attributes.get(field)
	}

	/// Reads a date field as a structured datetime.
	pub fn date(&self, field: &str) -> Option<DateTime<Utc>> {
		casts::parse_datetime(self.attributes.get(field)?)
	}

	/// The primary key value, when present and non-empty.
	pub fn primary_key(&self) -> Option<&Value> {
		self.attributes
			.get(&self.def.primary_key)
			.filter(|value| !is_empty_value(value))
	}

	pub fn attributes(&self) -> &Attributes {
		&self.attributes
	}

	/// Attributes changed since the last synchronization with storage.
	pub fn dirty(&self) -> Attributes {
		let mut changed = Attributes::new();
		for (field, value) in &self.attributes {
			if self.original.get(field) != Some(value) {
				changed.insert(field.clone(), value.clone());
			}
		}
		changed
	}

	pub fn is_dirty(&self) -> bool {
		self.attributes
			.iter()
			.any(|(field, value)| self.original.get(field) != Some(value))
	}

	/// Overlays a storage row onto the record and marks it clean.
	pub(crate) fn merge_row(&mut self, row: Attributes) {
		for (field, value) in row {
			self.attributes.insert(field, value);
		}
		self.sync_original();
		self.exists = true;
	}

	/// Marks the current attributes as the stored state.
	pub(crate) fn sync_original(&mut self) {
		self.original = self.attributes.clone();
	}

	pub(crate) fn mark_removed(&mut self) {
		self.exists = false;
	}
}

impl std::fmt::Debug for Record {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Record")
			.field("model", &self.def.name)
			.field("exists", &self.exists)
			.field("attributes", &self.attributes)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ModelDef;
	use serde_json::json;

	fn attrs(value: Value) -> Attributes {
		value.as_object().unwrap().clone()
	}

	fn article_def() -> Arc<ModelDef> {
		Arc::new(
			ModelDef::builder("article")
				.guard(["id", "user_id"])
				.cast("status", CastType::Boolean)
				.accessor("title", |value| match value {
					Value::String(s) => {
						let mut chars = s.chars();
						let capitalized = match chars.next() {
							Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
							None => s,
						};
						Value::String(capitalized)
					}
					other => other,
				})
				.mutator("title", |value| match value {
					Value::String(s) => Value::String(s.to_lowercase()),
					other => other,
				})
				.build(),
		)
	}

	#[test]
	fn fill_discards_guarded_fields() {
		let mut record = Record::new(article_def());
		record.fill(attrs(json!({"id": 5, "user_id": 9, "title": "Hi"})));

		assert_eq!(record.get_raw("id"), None);
		assert_eq!(record.get_raw("user_id"), None);
		assert_eq!(record.get_raw("title"), Some(&json!("hi")));
	}

	#[test]
	fn set_bypasses_guarding() {
		let mut record = Record::new(article_def());
		record.set("user_id", json!(9));
		assert_eq!(record.get_raw("user_id"), Some(&json!(9)));
	}

	#[test]
	fn mutator_then_accessor_round_trip() {
		let mut record = Record::new(article_def());
		record.set("title", json!("HELLO"));

		// Stored lowercased by the mutator, capitalized on the way out.
		assert_eq!(record.get_raw("title"), Some(&json!("hello")));
		assert_eq!(record.get("title"), Some(json!("Hello")));
	}

	#[test]
	fn cast_wins_over_accessor() {
		let mut record = Record::new(article_def());
		record.set("status", json!("1"));
		assert_eq!(record.get("status"), Some(json!(true)));
	}

	#[test]
	fn empty_identifier_values_do_not_count() {
		let mut record = Record::new(article_def());
		assert!(record.primary_key().is_none());
		record.set_raw("id", json!(null));
		assert!(record.primary_key().is_none());
		record.set_raw("id", json!(0));
		assert!(record.primary_key().is_none());
		record.set_raw("id", json!(7));
		assert_eq!(record.primary_key(), Some(&json!(7)));
	}

	#[test]
	fn dirty_tracks_changes_since_sync() {
		let def = article_def();
		let mut record = Record::hydrate(def, attrs(json!({"id": 1, "title": "old"})));
		assert!(!record.is_dirty());

		record.set("title", json!("new"));
		assert!(record.is_dirty());
		assert_eq!(record.dirty(), attrs(json!({"title": "new"})));

		record.sync_original();
		assert!(!record.is_dirty());
	}
}
