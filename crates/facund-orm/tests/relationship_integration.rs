//! Relationship Integration Tests
//!
//! Tests relation resolution against seeded tables:
//! - belongs-to: local foreign key matched against the owner key
//! - belongs-to with an empty foreign key resolves to nothing
//! - has-many-through: traversal of an intermediate table with explicit keys
//! - Unknown relation names are reported as errors

use facund_orm::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn attrs(value: Value) -> Attributes {
	value.as_object().unwrap().clone()
}

fn registry() -> RegistryBuilder {
	RegistryBuilder::new()
		.register(
			ModelDef::builder("article")
				.table("article")
				.guard(["id", "user_id"])
				.relation(
					"user",
					Relation::BelongsTo(BelongsTo::new("user", "user_id", "id")),
				)
				.build(),
		)
		.register(ModelDef::builder("user").table("users").build())
		.register(
			ModelDef::builder("business")
				.table("business")
				.relation(
					"orders",
					Relation::HasManyThrough(HasManyThrough::new(
						"order",
						"goods",
						"business_id",
						"goods_id",
					)),
				)
				.build(),
		)
		.register(ModelDef::builder("order").table("orders").build())
}

fn database() -> (Database, Arc<MemoryBackend>) {
	let backend = Arc::new(MemoryBackend::with_tables([
		"article", "users", "business", "goods", "orders",
	]));
	let executor: Arc<dyn DatabaseExecutor> = backend.clone();
	(
		Database::new(registry().build().unwrap(), executor),
		backend,
	)
}

#[tokio::test]
async fn belongs_to_resolves_the_owner() {
	let (db, backend) = database();
	backend
		.seed("users", vec![attrs(json!({"id": 1, "name": "sam"}))])
		.unwrap();
	backend
		.seed(
			"article",
			vec![attrs(json!({"id": 1, "user_id": 1, "title": "owned"}))],
		)
		.unwrap();

	let articles = db.model("article").unwrap();
	let record = articles.find(1).await.unwrap().unwrap();

	let owner = articles.related(&record, "user").await.unwrap().one();
	assert_eq!(owner.unwrap().get_raw("name"), Some(&json!("sam")));
}

#[tokio::test]
async fn belongs_to_without_foreign_key_resolves_to_none() {
	let (db, backend) = database();
	backend
		.seed(
			"article",
			vec![attrs(json!({"id": 1, "user_id": null, "title": "orphan"}))],
		)
		.unwrap();

	let articles = db.model("article").unwrap();
	let record = articles.find(1).await.unwrap().unwrap();

	assert!(articles.related(&record, "user").await.unwrap().one().is_none());
}

#[tokio::test]
async fn has_many_through_traverses_the_intermediate_table() {
	let (db, backend) = database();
	backend
		.seed(
			"business",
			vec![
				attrs(json!({"id": 1, "name": "acme"})),
				attrs(json!({"id": 2, "name": "globex"})),
			],
		)
		.unwrap();
	backend
		.seed(
			"goods",
			vec![
				attrs(json!({"id": 1, "business_id": 1})),
				attrs(json!({"id": 2, "business_id": 1})),
				attrs(json!({"id": 3, "business_id": 2})),
			],
		)
		.unwrap();
	backend
		.seed(
			"orders",
			vec![
				attrs(json!({"id": 1, "goods_id": 1})),
				attrs(json!({"id": 2, "goods_id": 1})),
				attrs(json!({"id": 3, "goods_id": 3})),
				attrs(json!({"id": 4, "goods_id": 2})),
			],
		)
		.unwrap();

	let businesses = db.model("business").unwrap();
	let acme = businesses.find(1).await.unwrap().unwrap();

	let orders = businesses.related(&acme, "orders").await.unwrap().many();
	let mut ids: Vec<i64> = orders
		.iter()
		.filter_map(|o| o.get_raw("id").and_then(Value::as_i64))
		.collect();
	ids.sort_unstable();
	assert_eq!(ids, vec![1, 2, 4]);

	// The other business only reaches its own orders.
	let globex = businesses.find(2).await.unwrap().unwrap();
	let orders = businesses.related(&globex, "orders").await.unwrap().many();
	let ids: Vec<i64> = orders
		.iter()
		.filter_map(|o| o.get_raw("id").and_then(Value::as_i64))
		.collect();
	assert_eq!(ids, vec![3]);
}

#[tokio::test]
async fn has_many_through_with_no_intermediate_rows_is_empty() {
	let (db, backend) = database();
	backend
		.seed("business", vec![attrs(json!({"id": 7, "name": "lone"}))])
		.unwrap();

	let businesses = db.model("business").unwrap();
	let record = businesses.find(7).await.unwrap().unwrap();

	assert!(businesses
		.related(&record, "orders")
		.await
		.unwrap()
		.many()
		.is_empty());
}

#[tokio::test]
async fn unknown_relation_names_are_rejected() {
	let (db, backend) = database();
	backend
		.seed("article", vec![attrs(json!({"id": 1, "title": "x"}))])
		.unwrap();

	let articles = db.model("article").unwrap();
	let record = articles.find(1).await.unwrap().unwrap();

	let err = articles.related(&record, "comments").await.unwrap_err();
	assert!(matches!(
		err,
		Error::UnknownRelation { relation, .. } if relation == "comments"
	));
}
