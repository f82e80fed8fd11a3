//! Field tree nodes.
//!
//! A [`FieldTree`] is an ordered map of root field name to node. Children are
//! held behind [`Arc`] so successive tree versions share every subtree that did
//! not change; mutation through [`FieldTree::plain_mut`] copies only the nodes
//! on the path to the target.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{DisallowedTransition, FormError};
use crate::identity::IdentityToken;
use crate::path::{self, SEPARATOR, TreeStep, child_path};
use crate::schema::{FieldConfig, PlainConfig};
use crate::status::{Status, Transition};

/// One node of the field tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldNode {
	Plain(PlainField),
	Composite(CompositeField),
	Repeatable(RepeatableField),
}

impl FieldNode {
	/// Dotted path of this node. Repeatable items are keyed by identity token.
	pub fn path(&self) -> &str {
		match self {
			Self::Plain(field) => &field.path,
			Self::Composite(field) => &field.path,
			Self::Repeatable(field) => &field.path,
		}
	}

	/// Node kind, for logs and error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Plain(_) => "plain",
			Self::Composite(_) => "composite",
			Self::Repeatable(_) => "repeatable",
		}
	}

	pub fn as_plain(&self) -> Option<&PlainField> {
		match self {
			Self::Plain(field) => Some(field),
			_ => None,
		}
	}

	pub fn as_composite(&self) -> Option<&CompositeField> {
		match self {
			Self::Composite(field) => Some(field),
			_ => None,
		}
	}

	pub fn as_repeatable(&self) -> Option<&RepeatableField> {
		match self {
			Self::Repeatable(field) => Some(field),
			_ => None,
		}
	}

	/// Projects the subtree to plain values: objects for composites, arrays for
	/// repeatables.
	pub fn materialize(&self) -> Value {
		match self {
			Self::Plain(field) => field.value.clone(),
			Self::Composite(field) => Value::Object(materialize_map(&field.children)),
			Self::Repeatable(field) => field.materialize_items(),
		}
	}

	/// Returns `true` if any plain field in the subtree carries errors.
	pub fn has_errors(&self) -> bool {
		match self {
			Self::Plain(field) => !field.errors.is_empty(),
			Self::Composite(field) => field.children.values().any(|child| child.has_errors()),
			Self::Repeatable(field) => field.children.values().any(|child| child.has_errors()),
		}
	}

	/// Looks up a direct child.
	///
	/// Composite children are addressed by name. Repeatable children accept an
	/// identity token or a list index.
	pub fn child(&self, key: &str) -> Option<&Arc<FieldNode>> {
		match self {
			Self::Plain(_) => None,
			Self::Composite(field) => field.children.get(key),
			Self::Repeatable(field) => field.item_token(key).and_then(|token| field.children.get(&token)),
		}
	}

	fn child_mut(&mut self, key: &str) -> Option<&mut Arc<FieldNode>> {
		match self {
			Self::Plain(_) => None,
			Self::Composite(field) => field.children.get_mut(key),
			Self::Repeatable(field) => {
				let token = field.item_token(key)?;
				field.children.get_mut(&token)
			}
		}
	}

	/// Canonical internal key for a child given by name, token or index.
	fn child_key(&self, key: &str) -> Option<String> {
		match self {
			Self::Plain(_) => None,
			Self::Composite(field) => field.children.contains_key(key).then(|| key.to_string()),
			Self::Repeatable(field) => field.item_token(key).filter(|t| field.children.contains_key(t)).map(|t| t.to_string()),
		}
	}

	/// Visits every plain field in the subtree, depth first.
	pub fn visit_plain<'a>(&'a self, f: &mut impl FnMut(&'a PlainField)) {
		match self {
			Self::Plain(field) => f(field),
			Self::Composite(field) => field.children.values().for_each(|child| child.visit_plain(f)),
			Self::Repeatable(field) => field.children.values().for_each(|child| child.visit_plain(f)),
		}
	}
}

fn materialize_map(children: &IndexMap<String, Arc<FieldNode>>) -> Map<String, Value> {
	children.iter().map(|(name, child)| (name.clone(), child.materialize())).collect()
}

/// Leaf input state.
///
/// `errors` is non-empty exactly while the status carries `Invalid`; the only
/// way to change either is [`resolve`](Self::resolve) and [`mark_pending`](Self::mark_pending).
#[derive(Debug, Clone, PartialEq)]
pub struct PlainField {
	path: String,
	value: Value,
	errors: Vec<String>,
	status: Status,
	config: Arc<PlainConfig>,
}

impl PlainField {
	/// Creates a field in the initial `{Clean, Untouched}` state.
	pub fn new(path: impl Into<String>, value: Value, config: Arc<PlainConfig>) -> Self {
		Self {
			path: path.into(),
			value,
			errors: Vec::new(),
			status: Status::new(),
			config,
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// Last path segment: the field name, or the identity token of a list item.
	pub fn name(&self) -> &str {
		self.path.rsplit(SEPARATOR).next().unwrap_or(&self.path)
	}

	pub fn value(&self) -> &Value {
		&self.value
	}

	pub fn errors(&self) -> &[String] {
		&self.errors
	}

	pub fn status(&self) -> Status {
		self.status
	}

	pub fn config(&self) -> &Arc<PlainConfig> {
		&self.config
	}

	pub fn set_value(&mut self, value: Value) {
		self.value = value;
	}

	pub fn set_config(&mut self, config: Arc<PlainConfig>) {
		self.config = config;
	}

	/// Applies a status transition. A disallowed transition leaves the field
	/// untouched and is reported back.
	pub fn apply(&mut self, transition: Transition) -> Result<(), DisallowedTransition> {
		match self.status.apply(transition) {
			Ok(next) => {
				trace!(path = %self.path, transition = transition.as_str(), flags = ?next.flags(), "field.transition");
				self.status = next;
				Ok(())
			}
			Err(err) => {
				debug!(path = %self.path, transition = transition.as_str(), from = ?err.from, "field.transition.rejected");
				Err(err)
			}
		}
	}

	/// Moves the field to `Pending`, dropping any previous error list.
	///
	/// Returns `false` when the transition is not allowed (untouched fields).
	pub fn mark_pending(&mut self) -> bool {
		let moved = self.apply(Transition::Pending).is_ok();
		if moved {
			self.errors.clear();
		}
		moved
	}

	/// Records a validation outcome: an empty list drives `valid`, anything
	/// else drives `invalid` and becomes the error list.
	pub fn resolve(&mut self, errors: Vec<String>) {
		if errors.is_empty() {
			let _ = self.apply(Transition::Valid);
			self.errors.clear();
		} else {
			let _ = self.apply(Transition::Invalid);
			self.errors = errors;
		}
	}
}

/// Fixed-shape nested group.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeField {
	path: String,
	children: IndexMap<String, Arc<FieldNode>>,
}

impl CompositeField {
	pub fn new(path: impl Into<String>, children: IndexMap<String, Arc<FieldNode>>) -> Self {
		Self { path: path.into(), children }
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn children(&self) -> &IndexMap<String, Arc<FieldNode>> {
		&self.children
	}

	pub fn get(&self, name: &str) -> Option<&Arc<FieldNode>> {
		self.children.get(name)
	}

	/// Current values of the plain children, keyed by name.
	pub fn plain_values(&self) -> Map<String, Value> {
		self.children
			.iter()
			.filter_map(|(name, child)| child.as_plain().map(|field| (name.clone(), field.value.clone())))
			.collect()
	}
}

/// Variable-length list of independently identified items.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatableField {
	path: String,
	children: IndexMap<IdentityToken, Arc<FieldNode>>,
	template: Arc<FieldConfig>,
}

impl RepeatableField {
	pub fn new(path: impl Into<String>, template: Arc<FieldConfig>, children: IndexMap<IdentityToken, Arc<FieldNode>>) -> Self {
		Self {
			path: path.into(),
			children,
			template,
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// Items in list order.
	pub fn children(&self) -> &IndexMap<IdentityToken, Arc<FieldNode>> {
		&self.children
	}

	pub fn template(&self) -> &Arc<FieldConfig> {
		&self.template
	}

	pub fn len(&self) -> usize {
		self.children.len()
	}

	pub fn is_empty(&self) -> bool {
		self.children.is_empty()
	}

	/// Token of the item at a list index.
	pub fn token_at(&self, index: usize) -> Option<IdentityToken> {
		self.children.get_index(index).map(|(token, _)| *token)
	}

	/// List index of the item carrying `token`.
	pub fn position(&self, token: &IdentityToken) -> Option<usize> {
		self.children.get_index_of(token)
	}

	/// Materialized item values, in list order.
	pub fn materialize_items(&self) -> Value {
		Value::Array(self.children.values().map(|child| child.materialize()).collect())
	}

	fn item_token(&self, key: &str) -> Option<IdentityToken> {
		IdentityToken::parse(key).or_else(|| key.parse::<usize>().ok().and_then(|index| self.token_at(index)))
	}
}

/// Root of a field tree: the per-version state of a whole form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTree {
	fields: IndexMap<String, Arc<FieldNode>>,
}

impl FieldTree {
	pub fn new(fields: IndexMap<String, Arc<FieldNode>>) -> Self {
		Self { fields }
	}

	/// Root fields in schema order.
	pub fn fields(&self) -> &IndexMap<String, Arc<FieldNode>> {
		&self.fields
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Locates a node by dotted path. List items may be given by identity
	/// token or by index.
	pub fn node(&self, path: &str) -> Result<&Arc<FieldNode>, FormError> {
		let tree_path = path::to_tree_path(path, None)?;
		let not_found = || FormError::FieldNotFound(path.to_string());
		let mut current: Option<&Arc<FieldNode>> = None;
		for step in tree_path.steps() {
			match (step, current) {
				(TreeStep::Key(key), None) => current = Some(self.fields.get(key).ok_or_else(not_found)?),
				(TreeStep::Key(key), Some(parent)) => current = Some(parent.child(key).ok_or_else(not_found)?),
				(TreeStep::Children, Some(parent)) if matches!(**parent, FieldNode::Plain(_)) => return Err(not_found()),
				(TreeStep::Children, _) => {}
			}
		}
		current.ok_or_else(not_found)
	}

	/// Locates a plain field by dotted path.
	pub fn plain(&self, path: &str) -> Result<&PlainField, FormError> {
		self.node(path)?.as_plain().ok_or_else(|| FormError::NotAPlainField(path.to_string()))
	}

	/// Locates a repeatable field by dotted path.
	pub fn repeatable(&self, path: &str) -> Result<&RepeatableField, FormError> {
		self.node(path)?.as_repeatable().ok_or_else(|| FormError::NotARepeatable(path.to_string()))
	}

	/// Returns `true` if a node exists at `path`.
	pub fn contains(&self, path: &str) -> bool {
		self.node(path).is_ok()
	}

	/// Rewrites a path that may use list indices into the internal form where
	/// every repeatable item is keyed by its identity token.
	pub fn resolve(&self, path: &str) -> Result<String, FormError> {
		let parts = path::segments(path)?;
		let not_found = || FormError::FieldNotFound(path.to_string());
		let (first, rest) = parts.split_first().ok_or_else(not_found)?;
		let mut node = self.fields.get(*first).ok_or_else(not_found)?;
		let mut resolved = (*first).to_string();
		for key in rest {
			let canonical = match node.child_key(key) {
				Some(canonical) => canonical,
				None => {
					return Err(match (&**node, key.parse::<usize>()) {
						(FieldNode::Repeatable(list), Ok(index)) if IdentityToken::parse(key).is_none() => FormError::ItemOutOfBounds {
							path: list.path.clone(),
							index,
						},
						_ => not_found(),
					});
				}
			};
			node = node.child(&canonical).ok_or_else(not_found)?;
			resolved = child_path(Some(&resolved), &canonical);
		}
		Ok(resolved)
	}

	/// Rewrites a path into the external form where every repeatable item is
	/// addressed by its list index, as in [`FormData`](crate::FormData).
	pub fn external_path(&self, path: &str) -> Result<String, FormError> {
		let resolved = self.resolve(path)?;
		let parts = path::segments(&resolved)?;
		let not_found = || FormError::FieldNotFound(path.to_string());
		let (first, rest) = parts.split_first().ok_or_else(not_found)?;
		let mut node = self.fields.get(*first).ok_or_else(not_found)?;
		let mut external = (*first).to_string();
		for key in rest {
			let segment = match &**node {
				FieldNode::Repeatable(list) => IdentityToken::parse(key).and_then(|token| list.position(&token)).ok_or_else(not_found)?.to_string(),
				_ => (*key).to_string(),
			};
			node = node.child(key).ok_or_else(not_found)?;
			external = child_path(Some(&external), &segment);
		}
		Ok(external)
	}

	/// Mutable access to a plain field, copying every shared node on the way
	/// down so other versions of the tree are unaffected.
	pub fn plain_mut(&mut self, path: &str) -> Result<&mut PlainField, FormError> {
		let parts = path::segments(path)?;
		let not_found = || FormError::FieldNotFound(path.to_string());
		let (first, rest) = parts.split_first().ok_or_else(not_found)?;
		let mut node = Arc::make_mut(self.fields.get_mut(*first).ok_or_else(not_found)?);
		for key in rest {
			node = Arc::make_mut(node.child_mut(key).ok_or_else(not_found)?);
		}
		match node {
			FieldNode::Plain(field) => Ok(field),
			_ => Err(FormError::NotAPlainField(path.to_string())),
		}
	}

	/// Values of the plain siblings of the field at `path`, itself included,
	/// when its parent is a composite. `None` for root fields and list items.
	pub fn siblings_of(&self, path: &str) -> Result<Option<Map<String, Value>>, FormError> {
		let Some(parent) = path::parent_path(path)? else {
			return Ok(None);
		};
		Ok(self.node(parent)?.as_composite().map(CompositeField::plain_values))
	}

	/// Paths of every plain field, depth first in tree order.
	pub fn plain_paths(&self) -> Vec<String> {
		let mut paths = Vec::new();
		for node in self.fields.values() {
			node.visit_plain(&mut |field| paths.push(field.path.clone()));
		}
		paths
	}

	/// Returns `true` if any plain field carries errors.
	pub fn has_errors(&self) -> bool {
		self.fields.values().any(|node| node.has_errors())
	}

	/// Projects the tree to plain values.
	pub fn materialize(&self) -> Value {
		Value::Object(materialize_map(&self.fields))
	}
}

#[cfg(test)]
mod tests;
