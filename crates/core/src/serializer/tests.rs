use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::identity::{IdentityToken, Tagged};
use crate::node::{CompositeField, PlainField};
use crate::schema::{FieldConfig, PlainConfig};

fn plain(path: &str, value: Value) -> Arc<FieldNode> {
	Arc::new(FieldNode::Plain(PlainField::new(path, value, Arc::new(PlainConfig::new("input")))))
}

fn list(path: &str, items: &[(IdentityToken, Value)]) -> Arc<FieldNode> {
	let children = items
		.iter()
		.map(|(token, value)| (*token, plain(&format!("{path}.{token}"), value.clone())))
		.collect();
	Arc::new(FieldNode::Repeatable(RepeatableField::new(path, Arc::new(FieldConfig::input(json!(""))), children)))
}

#[test]
fn merges_over_previous_data() {
	let tree = FieldTree::new(IndexMap::from([
		("name".to_string(), plain("name", json!("Tester"))),
		(
			"address".to_string(),
			Arc::new(FieldNode::Composite(CompositeField::new(
				"address",
				IndexMap::from([("city".to_string(), plain("address.city", json!("Oslo")))]),
			))),
		),
	]));
	let previous = FormData::new(json!({ "extra": 1, "address": { "zip": "0150" } }));

	let data = to_external_data(&tree, &previous);
	assert_eq!(
		data.value(),
		&json!({ "extra": 1, "address": { "zip": "0150", "city": "Oslo" }, "name": "Tester" })
	);
}

#[test]
fn repeatables_carry_tokens_and_truncate() {
	let a = IdentityToken::generate();
	let b = IdentityToken::generate();
	let tree = FieldTree::new(IndexMap::from([("tags".to_string(), list("tags", &[(a, json!("x")), (b, json!("y"))]))]));
	let previous = FormData::new(json!({ "tags": ["x", "y", "stale"] }));

	let data = to_external_data(&tree, &previous);
	assert_eq!(data.value(), &json!({ "tags": ["x", "y"] }));
	assert_eq!(data.identity_at("tags.0").unwrap(), Some(a));
	assert_eq!(data.identity_at("tags.1").unwrap(), Some(b));
	assert_eq!(serde_json::to_string(&data).unwrap(), r#"{"tags":["x","y"]}"#);
}

#[test]
fn reordered_items_keep_their_own_nested_data() {
	let a = IdentityToken::generate();
	let b = IdentityToken::generate();
	let mut previous = FormData::default();
	previous
		.set_items(
			"people",
			vec![
				Tagged::with_identity(json!({ "name": "Ann", "note": "first" }), a),
				Tagged::with_identity(json!({ "name": "Bob", "note": "second" }), b),
			],
		)
		.unwrap();

	let person = |token: IdentityToken, name: &str| {
		let path = format!("people.{token}");
		Arc::new(FieldNode::Composite(CompositeField::new(
			path.clone(),
			IndexMap::from([("name".to_string(), plain(&format!("{path}.name"), json!(name)))]),
		)))
	};
	let people = RepeatableField::new(
		"people",
		Arc::new(FieldConfig::composite(Default::default())),
		IndexMap::from([(b, person(b, "Bob")), (a, person(a, "Ann"))]),
	);
	let tree = FieldTree::new(IndexMap::from([("people".to_string(), Arc::new(FieldNode::Repeatable(people)))]));

	let data = to_external_data(&tree, &previous);
	assert_eq!(
		data.value(),
		&json!({ "people": [{ "name": "Bob", "note": "second" }, { "name": "Ann", "note": "first" }] })
	);
	assert_eq!(data.identity_at("people.0").unwrap(), Some(b));
}

#[test]
fn empty_tree_returns_previous() {
	let previous = FormData::new(json!({ "kept": true }));
	assert_eq!(to_external_data(&FieldTree::default(), &previous), previous);
}
