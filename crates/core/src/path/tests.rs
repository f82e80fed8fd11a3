use proptest::prelude::*;

use super::*;

#[test]
fn field_name_is_last_segment() {
	assert_eq!(field_name_from_path("profile.address.city").unwrap(), "city");
	assert_eq!(field_name_from_path("firstName").unwrap(), "firstName");
}

#[test]
fn empty_paths_are_malformed() {
	assert_eq!(field_name_from_path(""), Err(FormError::MalformedPath(String::new())));
	assert!(matches!(to_tree_path("a..b", None), Err(FormError::MalformedPath(_))));
	assert!(matches!(to_tree_path(".a", None), Err(FormError::MalformedPath(_))));
	assert!(matches!(parent_path("a."), Err(FormError::MalformedPath(_))));
}

#[test]
fn tree_path_inserts_container_steps() {
	let path = to_tree_path("profile.emails.0", None).unwrap();
	assert_eq!(
		path.steps(),
		&[
			TreeStep::Key("profile".into()),
			TreeStep::Children,
			TreeStep::Key("emails".into()),
			TreeStep::Children,
			TreeStep::Key("0".into()),
		]
	);
	assert_eq!(path.to_string(), "profile/*/emails/*/0");
}

#[test]
fn single_segment_tree_path_has_no_container_step() {
	let path = to_tree_path("firstName", None).unwrap();
	assert_eq!(path.steps(), &[TreeStep::Key("firstName".into())]);
}

#[test]
fn identity_override_replaces_final_segment() {
	let token = IdentityToken::generate();
	let path = to_tree_path("emails.3", Some(&token)).unwrap();
	let keys: Vec<_> = path.keys().collect();
	assert_eq!(keys, vec!["emails".to_string(), token.to_string()]);
}

#[test]
fn parent_and_child_paths() {
	assert_eq!(parent_path("a.b.c").unwrap(), Some("a.b"));
	assert_eq!(parent_path("a").unwrap(), None);
	assert_eq!(child_path(Some("a.b"), "c"), "a.b.c");
	assert_eq!(child_path(None, "c"), "c");
}

proptest! {
	#[test]
	fn tree_path_keys_round_trip(parts in prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..6)) {
		let joined = parts.join(".");
		let path = to_tree_path(&joined, None).unwrap();
		let keys: Vec<&str> = path.keys().collect();
		prop_assert_eq!(keys, parts.iter().map(String::as_str).collect::<Vec<_>>());
		prop_assert_eq!(path.len(), parts.len() * 2 - 1);
		prop_assert_eq!(field_name_from_path(&joined).unwrap(), parts[parts.len() - 1].as_str());
	}
}
