//! The external representation of a record.
//!
//! External consumers never see raw attribute storage: hidden fields are
//! removed and every remaining field goes through the read pipeline (casts,
//! date rendering, accessors) before it leaves the mapper.

use crate::record::{Attributes, Record};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// The attribute map handed to external consumers.
pub fn external_attributes(record: &Record) -> Attributes {
	let mut out = Attributes::new();
	for field in record.attributes().keys() {
		if record.def().hidden.contains(field) {
			continue;
		}
		if let Some(value) = record.get(field) {
			out.insert(field.clone(), value);
		}
	}
	out
}

impl Serialize for Record {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let attributes = external_attributes(self);
		let mut map = serializer.serialize_map(Some(attributes.len()))?;
		for (field, value) in &attributes {
			map.serialize_entry(field, value)?;
		}
		map.end()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::casts::CastType;
	use crate::model::ModelDef;
	use serde_json::{Value, json};
	use std::sync::Arc;

	fn def() -> Arc<ModelDef> {
		Arc::new(
			ModelDef::builder("article")
				.hide(["click_num"])
				.cast("status", CastType::Boolean)
				.dates(["created_at"])
				.build(),
		)
	}

	#[test]
	fn hidden_fields_never_serialize() {
		let mut record = Record::new(def());
		record.set("title", json!("hi"));
		record.set("click_num", json!(250));

		let snapshot = serde_json::to_value(&record).unwrap();
		assert_eq!(snapshot, json!({"title": "hi"}));
	}

	#[test]
	fn casts_and_dates_apply_in_snapshots() {
		let mut record = Record::new(def());
		record.set("status", json!("1"));
		record.set("created_at", json!("2023-04-01 12:30:00"));

		let snapshot = serde_json::to_value(&record).unwrap();
		assert_eq!(
			snapshot,
			json!({"status": true, "created_at": "2023-04-01T12:30:00Z"})
		);
	}

	#[test]
	fn external_attributes_is_a_plain_map() {
		let mut record = Record::new(def());
		record.set("title", json!("hi"));
		record.set("click_num", json!(9));

		let map = external_attributes(&record);
		assert_eq!(map.get("title"), Some(&Value::String("hi".into())));
		assert!(!map.contains_key("click_num"));
	}
}
