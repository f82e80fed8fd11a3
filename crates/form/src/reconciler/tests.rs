use arbor_core::{PlainField, Tagged};
use arbor_validate::ValidationRun;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

/// Records every validation request instead of evaluating anything.
#[derive(Default)]
struct Recorder {
	calls: Vec<(String, Option<Map<String, Value>>)>,
}

impl Recorder {
	fn paths(&self) -> Vec<&str> {
		self.calls.iter().map(|(path, _)| path.as_str()).collect()
	}
}

impl FieldValidator for Recorder {
	fn validate(&mut self, field: &mut PlainField, siblings: Option<&Map<String, Value>>, _: ValidationMode) -> ValidationRun {
		self.calls.push((field.path().to_string(), siblings.cloned()));
		ValidationRun::Completed
	}
}

fn schema() -> Schema {
	Schema::new()
		.with("name", FieldConfig::input(json!("")))
		.with(
			"account",
			FieldConfig::composite(Schema::new().with("password", FieldConfig::input(json!(""))).with("confirm", FieldConfig::input(json!("")))),
		)
		.with("emails", FieldConfig::repeatable(FieldConfig::input(json!(""))))
}

fn reconcile(recorder: &mut Recorder, data: &FormData, schema: &Schema, previous: Option<&FieldTree>) -> FieldTree {
	Reconciler::new(recorder).reconcile(data, schema, previous)
}

fn tokens(tree: &FieldTree, path: &str) -> Vec<IdentityToken> {
	tree.repeatable(path).unwrap().children().keys().copied().collect()
}

#[test]
fn first_pass_uses_initial_values_without_validating() {
	let mut recorder = Recorder::default();
	let tree = reconcile(&mut recorder, &FormData::default(), &schema(), None);

	assert_eq!(tree.materialize(), json!({ "name": "", "account": { "password": "", "confirm": "" }, "emails": [""] }));
	assert!(recorder.calls.is_empty());
	assert_eq!(tree.plain("emails.0").unwrap().status(), arbor_core::Status::new());
}

#[test]
fn unchanged_inputs_reuse_every_node() {
	let mut recorder = Recorder::default();
	let schema = schema();
	let data = FormData::new(json!({ "name": "Ann", "emails": ["a@x.io", "b@x.io"] }));
	let first = reconcile(&mut recorder, &data, &schema, None);
	let second = reconcile(&mut recorder, &data, &schema, Some(&first));

	for (name, node) in first.fields() {
		assert!(Arc::ptr_eq(node, &second.fields()[name]), "{name} was rebuilt");
	}
	assert!(recorder.calls.is_empty());
}

#[test]
fn changed_plain_fields_validate_and_untouched_subtrees_are_shared() {
	let mut recorder = Recorder::default();
	let schema = schema();
	let first = reconcile(&mut recorder, &FormData::default(), &schema, None);
	let second = reconcile(&mut recorder, &FormData::new(json!({ "name": "Ann" })), &schema, Some(&first));

	assert_eq!(recorder.calls, vec![("name".to_string(), None)]);
	assert!(Arc::ptr_eq(&first.fields()["account"], &second.fields()["account"]));
	assert_eq!(first.plain("name").unwrap().value(), &json!(""), "previous version is untouched");
}

#[test]
fn composite_children_validate_against_sibling_values() {
	let mut recorder = Recorder::default();
	let schema = schema();
	let mut first = reconcile(&mut recorder, &FormData::default(), &schema, None);
	first.plain_mut("account.password").unwrap().resolve(vec!["is too short".into()]);

	let data = FormData::new(json!({ "account": { "password": "", "confirm": "hunter2" } }));
	reconcile(&mut recorder, &data, &schema, Some(&first));

	let siblings = json!({ "password": "", "confirm": "hunter2" }).as_object().cloned();
	assert_eq!(
		recorder.calls,
		vec![("account.password".to_string(), siblings.clone()), ("account.confirm".to_string(), siblings)],
		"the invalid sibling is revalidated with the new snapshot"
	);
}

#[test]
fn fields_missing_from_the_schema_are_dropped() {
	let mut recorder = Recorder::default();
	let first = reconcile(&mut recorder, &FormData::default(), &schema(), None);
	let narrowed = Schema::new().with("name", FieldConfig::input(json!("")));
	let second = reconcile(&mut recorder, &FormData::default(), &narrowed, Some(&first));

	assert_eq!(second.fields().keys().collect::<Vec<_>>(), ["name"]);
	assert!(Arc::ptr_eq(&first.fields()["name"], &second.fields()["name"]));
}

#[test]
fn untagged_items_are_matched_by_value() {
	let mut recorder = Recorder::default();
	let schema = schema();
	let first = reconcile(&mut recorder, &FormData::new(json!({ "emails": ["a", "b"] })), &schema, None);
	let [a, b] = tokens(&first, "emails")[..] else {
		panic!("expected two items");
	};

	let second = reconcile(&mut recorder, &FormData::new(json!({ "emails": ["b", "a"] })), &schema, Some(&first));
	assert_eq!(tokens(&second, "emails"), [b, a]);
	assert!(recorder.calls.is_empty());

	let third = reconcile(&mut recorder, &FormData::new(json!({ "emails": ["b", "c"] })), &schema, Some(&second));
	assert_eq!(tokens(&third, "emails"), [b, a], "unmatched items fall back to position");
	assert_eq!(recorder.paths(), [format!("emails.{a}")]);
	assert_eq!(recorder.calls[0].1, None);
}

#[test]
fn tagged_items_keep_their_identity() {
	let mut recorder = Recorder::default();
	let schema = schema();
	let first = reconcile(&mut recorder, &FormData::new(json!({ "emails": ["a", "b"] })), &schema, None);
	let [a, b] = tokens(&first, "emails")[..] else {
		panic!("expected two items");
	};

	let mut data = FormData::default();
	data.set_items("emails", vec![Tagged::with_identity(json!("b2"), b), Tagged::with_identity(json!("a"), a), Tagged::new(json!("new"))])
		.unwrap();
	let second = reconcile(&mut recorder, &data, &schema, Some(&first));

	let order = tokens(&second, "emails");
	assert_eq!(order[..2], [b, a]);
	assert!(order[2] != a && order[2] != b);
	assert_eq!(recorder.paths(), [format!("emails.{b}")]);
	assert!(Arc::ptr_eq(&first.repeatable("emails").unwrap().children()[&a], &second.repeatable("emails").unwrap().children()[&a]));
}

#[test]
fn non_list_repeatables_are_seeded_from_the_template() {
	let mut recorder = Recorder::default();
	let counted = Schema::new().with(
		"rows",
		FieldConfig::repeatable(PlainConfig::new("input").with_initial_fn(|items| json!(items.as_array().map_or(0, Vec::len)))),
	);

	let tree = reconcile(&mut recorder, &FormData::new(json!({ "rows": "oops" })), &counted, None);
	assert_eq!(tree.materialize(), json!({ "rows": [0] }));

	let tree = reconcile(&mut recorder, &FormData::new(json!({ "rows": [5, 6] })), &counted, Some(&tree));
	let tree = reconcile(&mut recorder, &FormData::default(), &counted, Some(&tree));
	assert_eq!(tree.materialize(), json!({ "rows": [2] }));
}

#[test]
fn config_changes_alone_do_not_validate() {
	let mut recorder = Recorder::default();
	let first = reconcile(&mut recorder, &FormData::default(), &schema(), None);
	let retyped = Schema::new().with("name", PlainConfig::new("textarea").initial(json!("")));
	let second = reconcile(&mut recorder, &FormData::default(), &retyped, Some(&first));

	assert!(!Arc::ptr_eq(&first.fields()["name"], &second.fields()["name"]));
	assert_eq!(second.plain("name").unwrap().config().kind, "textarea");
	assert!(recorder.calls.is_empty());
}
