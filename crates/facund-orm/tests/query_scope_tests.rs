//! Query Scope Tests
//!
//! Tests named scopes and query-set chaining:
//! - A scope applies its registered predicate
//! - Scopes compose with further filters, ordering and limits
//! - Scopes stack with other scopes
//! - Unknown scope names are reported as errors

use facund_orm::prelude::*;
use rstest::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn attrs(value: Value) -> Attributes {
	value.as_object().unwrap().clone()
}

#[fixture]
fn db() -> Database {
	let registry = RegistryBuilder::new()
		.register(
			ModelDef::builder("article")
				.table("article")
				.guard(["id", "user_id"])
				.cast("status", CastType::Boolean)
				.scope("popular", |q| q.filter("click_num", FilterOperator::Gte, 10))
				.scope("published", |q| q.filter("status", FilterOperator::Eq, true))
				.build(),
		)
		.build()
		.unwrap();

	let backend = Arc::new(MemoryBackend::with_tables(["article"]));
	backend
		.seed(
			"article",
			vec![
				attrs(json!({"id": 1, "title": "a", "click_num": 5, "status": true})),
				attrs(json!({"id": 2, "title": "b", "click_num": 10, "status": false})),
				attrs(json!({"id": 3, "title": "c", "click_num": 25, "status": true})),
				attrs(json!({"id": 4, "title": "d", "click_num": 8, "status": true})),
				attrs(json!({"id": 5, "title": "e", "click_num": 42, "status": false})),
			],
		)
		.unwrap();

	let executor: Arc<dyn DatabaseExecutor> = backend;
	Database::new(registry, executor)
}

fn ids(records: &[Record]) -> Vec<i64> {
	records
		.iter()
		.filter_map(|r| r.get_raw("id").and_then(Value::as_i64))
		.collect()
}

#[rstest]
#[tokio::test]
async fn scope_applies_its_predicate(db: Database) {
	let articles = db.model("article").unwrap();

	let popular = articles
		.fetch(articles.scope("popular").unwrap())
		.await
		.unwrap();
	assert_eq!(ids(&popular), vec![2, 3, 5]);
}

#[rstest]
#[tokio::test]
async fn scope_chains_with_ordering_and_limit(db: Database) {
	let articles = db.model("article").unwrap();

	let query = articles
		.scope("popular")
		.unwrap()
		.order_by("click_num", Direction::Desc)
		.limit(2);
	let top = articles.fetch(query).await.unwrap();
	assert_eq!(ids(&top), vec![5, 3]);
}

#[rstest]
#[tokio::test]
async fn scope_composes_with_further_filters(db: Database) {
	let articles = db.model("article").unwrap();

	let query = articles
		.scope("popular")
		.unwrap()
		.filter("status", FilterOperator::Eq, true);
	let hits = articles.fetch(query).await.unwrap();
	assert_eq!(ids(&hits), vec![3]);
}

#[rstest]
#[tokio::test]
async fn scopes_stack(db: Database) {
	let articles = db.model("article").unwrap();

	let query = articles
		.scope("published")
		.unwrap()
		.scope("popular")
		.unwrap();
	let hits = articles.fetch(query).await.unwrap();
	assert_eq!(ids(&hits), vec![3]);
}

#[rstest]
#[tokio::test]
async fn count_and_first_execute_query_sets(db: Database) {
	let articles = db.model("article").unwrap();

	assert_eq!(
		articles.count(articles.scope("popular").unwrap()).await.unwrap(),
		3
	);

	let first = articles
		.first(
			articles
				.scope("popular")
				.unwrap()
				.order_by("click_num", Direction::Desc),
		)
		.await
		.unwrap()
		.unwrap();
	assert_eq!(first.get_raw("id"), Some(&json!(5)));
}

#[rstest]
#[tokio::test]
async fn unknown_scope_is_rejected(db: Database) {
	let articles = db.model("article").unwrap();

	let err = articles.scope("trending").unwrap_err();
	assert!(matches!(
		err,
		Error::UnknownScope { scope, .. } if scope == "trending"
	));
}
