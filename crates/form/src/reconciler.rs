//! Reconciliation of schema and data into the next field tree.
//!
//! [`Reconciler::reconcile`] walks the schema and pairs every entry with its
//! slice of the external data and with the node at the same key in the
//! previous tree. Nodes whose inputs did not change are reused as they are, so
//! consecutive trees share every untouched subtree and reconciling twice with
//! the same inputs yields pointer-equal nodes. Plain fields whose value
//! changed are validated during the pass.

use std::sync::Arc;

use arbor_core::{
	CompositeConfig, CompositeField, DataView, FieldConfig, FieldNode, FieldTree, FormData, IdentityToken, PlainConfig, PlainField, RepeatableConfig,
	RepeatableField, Schema, child_path,
};
use arbor_validate::{FieldValidator, ValidationMode};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use tracing::{trace, warn};

type Children = IndexMap<String, Arc<FieldNode>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
	Root,
	Composite,
}

struct Reconciled {
	node: Arc<FieldNode>,
	/// Set for a plain field whose value differs from the previous tree.
	changed: bool,
}

impl Reconciled {
	fn kept(node: Arc<FieldNode>) -> Self {
		Self { node, changed: false }
	}
}

/// Builds the next field tree from data, schema and the previous tree.
pub struct Reconciler<'a> {
	validator: &'a mut dyn FieldValidator,
}

impl<'a> Reconciler<'a> {
	pub fn new(validator: &'a mut dyn FieldValidator) -> Self {
		Self { validator }
	}

	/// Reconciles `data` against `schema`.
	///
	/// Fields of `previous` that the schema no longer names are dropped.
	pub fn reconcile(&mut self, data: &FormData, schema: &Schema, previous: Option<&FieldTree>) -> FieldTree {
		FieldTree::new(self.level(None, data.view(), schema, previous.map(FieldTree::fields), Scope::Root))
	}

	fn level(&mut self, parent: Option<&str>, data: DataView<'_>, schema: &Schema, previous: Option<&Children>, scope: Scope) -> Children {
		if let Some(previous) = previous {
			for name in previous.keys().filter(|name| !schema.contains_key(name)) {
				trace!(path = %child_path(parent, name), "reconcile.drop");
			}
		}

		let mut children = Children::with_capacity(schema.len());
		let mut changed = Vec::new();
		for (name, config) in schema {
			let path = child_path(parent, name);
			let reconciled = self.node(&path, data.child(name), config, previous.and_then(|p| p.get(name)));
			if reconciled.changed {
				changed.push(name.clone());
			}
			children.insert(name.clone(), reconciled.node);
		}
		self.validate_level(&mut children, &changed, scope);
		children
	}

	/// Validates the plain fields of one level that changed. Under a composite,
	/// fields currently invalid are revalidated too, against the new sibling
	/// values.
	fn validate_level(&mut self, children: &mut Children, changed: &[String], scope: Scope) {
		if changed.is_empty() {
			return;
		}
		let siblings = (scope == Scope::Composite).then(|| plain_values(children));
		for (name, node) in children.iter_mut() {
			let invalid = node.as_plain().is_some_and(|field| field.status().is_invalid());
			if !changed.contains(name) && !(siblings.is_some() && invalid) {
				continue;
			}
			if let FieldNode::Plain(field) = Arc::make_mut(node) {
				self.validator.validate(field, siblings.as_ref(), ValidationMode::Change);
			}
		}
	}

	fn node(&mut self, path: &str, data: DataView<'_>, config: &FieldConfig, previous: Option<&Arc<FieldNode>>) -> Reconciled {
		match config {
			FieldConfig::Plain(config) => self.plain(path, data, config, previous),
			FieldConfig::Composite(config) => self.composite(path, data, config, previous),
			FieldConfig::Repeatable(config) => self.repeatable(path, data, config, previous),
		}
	}

	fn plain(&mut self, path: &str, data: DataView<'_>, config: &PlainConfig, previous: Option<&Arc<FieldNode>>) -> Reconciled {
		let value = match data.value() {
			Some(value) => value.clone(),
			None => config.initial_value.resolve_standalone(),
		};
		let Some((node, field)) = previous.and_then(|node| node.as_plain().map(|field| (node, field))) else {
			trace!(path, "reconcile.plain.new");
			return Reconciled::kept(Arc::new(FieldNode::Plain(PlainField::new(path, value, Arc::new(config.clone())))));
		};

		let same_config = **field.config() == *config;
		if *field.value() == value {
			if same_config {
				return Reconciled::kept(Arc::clone(node));
			}
			trace!(path, "reconcile.plain.config");
			let mut field = field.clone();
			field.set_config(Arc::new(config.clone()));
			return Reconciled::kept(Arc::new(FieldNode::Plain(field)));
		}

		trace!(path, "reconcile.plain.changed");
		let mut field = field.clone();
		field.set_value(value);
		if !same_config {
			field.set_config(Arc::new(config.clone()));
		}
		Reconciled {
			node: Arc::new(FieldNode::Plain(field)),
			changed: true,
		}
	}

	fn composite(&mut self, path: &str, data: DataView<'_>, config: &CompositeConfig, previous: Option<&Arc<FieldNode>>) -> Reconciled {
		let previous = previous.and_then(|node| node.as_composite().map(|field| (node, field)));
		let children = self.level(Some(path), data, &config.fields, previous.map(|(_, field)| field.children()), Scope::Composite);
		match previous {
			Some((node, field)) if same_children(field.children(), &children) => Reconciled::kept(Arc::clone(node)),
			_ => Reconciled::kept(Arc::new(FieldNode::Composite(CompositeField::new(path, children)))),
		}
	}

	fn repeatable(&mut self, path: &str, data: DataView<'_>, config: &RepeatableConfig, previous: Option<&Arc<FieldNode>>) -> Reconciled {
		let previous = previous.and_then(|node| node.as_repeatable().map(|list| (node, list)));
		let template = match previous {
			Some((_, list)) if **list.template() == *config.field => Arc::clone(list.template()),
			_ => Arc::new((*config.field).clone()),
		};

		let seed;
		let items = match data.items() {
			Some(items) => items,
			None => {
				if data.value().is_some_and(|value| !value.is_null()) {
					warn!(path, "reconcile.repeatable.not_a_list");
				}
				let current = previous.map_or_else(|| Value::Array(Vec::new()), |(_, list)| list.materialize_items());
				seed = template.seed(&current);
				vec![(None, DataView::detached(&seed))]
			}
		};

		let previous_items = previous.map(|(_, list)| list.children());
		let tokens = assign_tokens(path, &items, previous_items);
		let mut children = IndexMap::with_capacity(items.len());
		for ((_, item), token) in items.iter().zip(tokens) {
			let item_path = child_path(Some(path), &token.to_string());
			let reconciled = self.node(&item_path, *item, &template, previous_items.and_then(|p| p.get(&token)));
			let mut node = reconciled.node;
			if reconciled.changed
				&& let FieldNode::Plain(field) = Arc::make_mut(&mut node)
			{
				self.validator.validate(field, None, ValidationMode::Change);
			}
			children.insert(token, node);
		}

		match previous {
			Some((node, list)) if Arc::ptr_eq(list.template(), &template) && same_children(list.children(), &children) => Reconciled::kept(Arc::clone(node)),
			_ => Reconciled::kept(Arc::new(FieldNode::Repeatable(RepeatableField::new(path, template, children)))),
		}
	}
}

/// Picks the identity token of every list item.
///
/// Tagged items keep their token. An untagged item claims an unclaimed
/// previous child holding an equal value, preferring the one at its own
/// position, and otherwise the previous child at its position. Anything left
/// gets a fresh token.
fn assign_tokens(path: &str, items: &[(Option<IdentityToken>, DataView<'_>)], previous: Option<&IndexMap<IdentityToken, Arc<FieldNode>>>) -> Vec<IdentityToken> {
	let mut claimed = FxHashSet::default();
	let mut tokens: Vec<Option<IdentityToken>> = items.iter().map(|(token, _)| token.filter(|token| claimed.insert(*token))).collect();

	if tokens.iter().any(Option::is_none)
		&& let Some(previous) = previous
	{
		let previous: Vec<(IdentityToken, Value)> = previous.iter().map(|(token, node)| (*token, node.materialize())).collect();

		for (index, (slot, (_, item))) in tokens.iter_mut().zip(items).enumerate() {
			if slot.is_some() {
				continue;
			}
			let value = item.value().unwrap_or(&Value::Null);
			let unclaimed_equal = |(token, prev): &&(IdentityToken, Value)| !claimed.contains(token) && prev == value;
			let matched = previous
				.get(index)
				.filter(unclaimed_equal)
				.or_else(|| previous.iter().find(unclaimed_equal))
				.map(|(token, _)| *token);
			if let Some(token) = matched {
				claimed.insert(token);
				*slot = Some(token);
			}
		}

		for (index, slot) in tokens.iter_mut().enumerate() {
			if slot.is_none()
				&& let Some((token, _)) = previous.get(index)
				&& claimed.insert(*token)
			{
				*slot = Some(*token);
			}
		}
	}

	tokens
		.into_iter()
		.map(|token| {
			token.unwrap_or_else(|| {
				let token = IdentityToken::generate();
				trace!(path, token = %token, "reconcile.item.mint");
				token
			})
		})
		.collect()
}

fn plain_values(children: &Children) -> Map<String, Value> {
	children
		.iter()
		.filter_map(|(name, node)| node.as_plain().map(|field| (name.clone(), field.value().clone())))
		.collect()
}

fn same_children<K: PartialEq>(before: &IndexMap<K, Arc<FieldNode>>, after: &IndexMap<K, Arc<FieldNode>>) -> bool {
	before.len() == after.len() && before.iter().zip(after).all(|((a, x), (b, y))| a == b && Arc::ptr_eq(x, y))
}

#[cfg(test)]
mod tests;
