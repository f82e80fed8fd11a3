use serde_json::json;

use super::*;
use crate::status::StatusFlag;

fn input() -> Arc<PlainConfig> {
	Arc::new(PlainConfig::new("input"))
}

fn plain(path: &str, value: Value) -> Arc<FieldNode> {
	Arc::new(FieldNode::Plain(PlainField::new(path, value, input())))
}

/// `{ name, profile: { password, confirm }, emails: [a, b] }`
fn sample() -> (FieldTree, [IdentityToken; 2]) {
	let tokens = [IdentityToken::generate(), IdentityToken::generate()];
	let profile = CompositeField::new(
		"profile",
		IndexMap::from([
			("password".to_string(), plain("profile.password", json!("hunter2"))),
			("confirm".to_string(), plain("profile.confirm", json!(""))),
		]),
	);
	let emails = RepeatableField::new(
		"emails",
		Arc::new(FieldConfig::input(json!(""))),
		tokens.iter().zip(["a@x.io", "b@x.io"]).map(|(t, v)| (*t, plain(&format!("emails.{t}"), json!(v)))).collect(),
	);
	let tree = FieldTree::new(IndexMap::from([
		("name".to_string(), plain("name", json!("Tester"))),
		("profile".to_string(), Arc::new(FieldNode::Composite(profile))),
		("emails".to_string(), Arc::new(FieldNode::Repeatable(emails))),
	]));
	(tree, tokens)
}

#[test]
fn lookup_by_path_token_and_index() {
	let (tree, tokens) = sample();
	assert_eq!(tree.plain("name").unwrap().value(), &json!("Tester"));
	assert_eq!(tree.plain("profile.confirm").unwrap().name(), "confirm");
	assert_eq!(tree.plain(&format!("emails.{}", tokens[1])).unwrap().value(), &json!("b@x.io"));
	assert_eq!(tree.plain("emails.0").unwrap().path(), format!("emails.{}", tokens[0]));
	assert_eq!(tree.repeatable("emails").unwrap().position(&tokens[1]), Some(1));
}

#[test]
fn lookup_errors() {
	let (tree, _) = sample();
	assert_eq!(tree.node("missing").unwrap_err(), FormError::FieldNotFound("missing".into()));
	assert_eq!(tree.node("name.inner").unwrap_err(), FormError::FieldNotFound("name.inner".into()));
	assert_eq!(tree.plain("profile").unwrap_err(), FormError::NotAPlainField("profile".into()));
	assert_eq!(tree.repeatable("profile").unwrap_err(), FormError::NotARepeatable("profile".into()));
	assert!(matches!(tree.node(""), Err(FormError::MalformedPath(_))));
}

#[test]
fn resolve_maps_indices_to_tokens() {
	let (tree, tokens) = sample();
	assert_eq!(tree.resolve("emails.1").unwrap(), format!("emails.{}", tokens[1]));
	assert_eq!(tree.resolve("profile.password").unwrap(), "profile.password");
	assert_eq!(
		tree.resolve("emails.7").unwrap_err(),
		FormError::ItemOutOfBounds {
			path: "emails".into(),
			index: 7
		}
	);
}

#[test]
fn external_path_maps_tokens_to_indices() {
	let (tree, tokens) = sample();
	assert_eq!(tree.external_path(&format!("emails.{}", tokens[1])).unwrap(), "emails.1");
	assert_eq!(tree.external_path("emails.0").unwrap(), "emails.0");
	assert_eq!(tree.external_path("profile.confirm").unwrap(), "profile.confirm");
	assert!(tree.external_path("emails.9").is_err());
}

#[test]
fn plain_mut_copies_on_write() {
	let (tree, _) = sample();
	let mut next = tree.clone();
	next.plain_mut("emails.0").unwrap().set_value(json!("c@x.io"));

	assert_eq!(tree.plain("emails.0").unwrap().value(), &json!("a@x.io"));
	assert_eq!(next.plain("emails.0").unwrap().value(), &json!("c@x.io"));
	assert!(Arc::ptr_eq(&tree.fields()["profile"], &next.fields()["profile"]));
	assert!(!Arc::ptr_eq(&tree.fields()["emails"], &next.fields()["emails"]));
	assert_eq!(next.plain_mut("profile").unwrap_err(), FormError::NotAPlainField("profile".into()));
}

#[test]
fn resolve_keeps_errors_aligned_with_invalid() {
	let mut field = PlainField::new("name", json!(""), input());
	field.resolve(vec!["can't be blank".into()]);
	assert!(field.status().is_invalid());
	assert_eq!(field.errors().len(), 1);

	field.resolve(vec!["first".into(), "second".into()]);
	assert_eq!(field.errors(), ["first", "second"]);

	field.resolve(Vec::new());
	assert!(field.status().is_valid());
	assert!(field.errors().is_empty());
	assert_eq!(field.status().to_flags(), vec![StatusFlag::Dirty, StatusFlag::Touched, StatusFlag::Valid]);
}

#[test]
fn mark_pending_needs_touch() {
	let mut field = PlainField::new("name", json!(""), input());
	assert!(!field.mark_pending());
	field.apply(Transition::Blurred).unwrap();
	field.resolve(vec!["bad".into()]);
	assert!(field.mark_pending());
	assert!(field.status().is_pending());
	assert!(field.errors().is_empty());
	assert!(field.apply(Transition::Pending).is_err());
}

#[test]
fn siblings_only_under_composites() {
	let (tree, _) = sample();
	let siblings = tree.siblings_of("profile.confirm").unwrap().unwrap();
	assert_eq!(Value::Object(siblings), json!({ "password": "hunter2", "confirm": "" }));
	assert_eq!(tree.siblings_of("name").unwrap(), None);
	assert_eq!(tree.siblings_of("emails.0").unwrap(), None);
}

#[test]
fn materialize_and_paths() {
	let (tree, tokens) = sample();
	assert_eq!(
		tree.materialize(),
		json!({
			"name": "Tester",
			"profile": { "password": "hunter2", "confirm": "" },
			"emails": ["a@x.io", "b@x.io"],
		})
	);
	assert_eq!(
		tree.plain_paths(),
		vec![
			"name".to_string(),
			"profile.password".into(),
			"profile.confirm".into(),
			format!("emails.{}", tokens[0]),
			format!("emails.{}", tokens[1]),
		]
	);
}

#[test]
fn has_errors_descends() {
	let (mut tree, _) = sample();
	assert!(!tree.has_errors());
	tree.plain_mut("emails.1").unwrap().resolve(vec!["is not a valid email".into()]);
	assert!(tree.has_errors());
	assert!(tree.fields()["emails"].has_errors());
	assert!(!tree.fields()["profile"].has_errors());
}
