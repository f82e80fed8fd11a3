//! External data object.
//!
//! [`FormData`] is what the embedding application reads and writes: a plain
//! JSON object. Identity tokens of list items travel beside it in an
//! [`IdentityTable`] so they survive a round trip through the application
//! without ever appearing in the value itself.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::FormError;
use crate::identity::{IdentityTable, IdentityToken, Slot, Tagged, UNTRACKED};
use crate::path;

/// Plain data object plus the identity side table for its lists.
///
/// Serialization and equality only see the plain value.
#[derive(Debug, Clone)]
pub struct FormData {
	value: Value,
	identities: IdentityTable,
}

impl Default for FormData {
	fn default() -> Self {
		Self::new(Value::Object(Map::new()))
	}
}

impl From<Value> for FormData {
	fn from(value: Value) -> Self {
		Self::new(value)
	}
}

impl PartialEq for FormData {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}

impl Serialize for FormData {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.value.serialize(serializer)
	}
}

impl FormData {
	/// Wraps a plain value with no identities recorded.
	pub fn new(value: Value) -> Self {
		Self {
			value,
			identities: IdentityTable::Untracked,
		}
	}

	pub fn with_identities(value: Value, identities: IdentityTable) -> Self {
		Self { value, identities }
	}

	pub fn value(&self) -> &Value {
		&self.value
	}

	pub fn into_value(self) -> Value {
		self.value
	}

	pub fn identities(&self) -> &IdentityTable {
		&self.identities
	}

	/// Read-only cursor at the root.
	pub fn view(&self) -> DataView<'_> {
		DataView {
			value: Some(&self.value),
			ids: &self.identities,
		}
	}

	/// Reads the value at a dotted path. Numeric segments index lists.
	pub fn get(&self, path: &str) -> Result<Option<&Value>, FormError> {
		Ok(self.view_at(path)?.value)
	}

	/// Token of the list item at `path`, if `path` ends in a list index.
	pub fn identity_at(&self, path: &str) -> Result<Option<IdentityToken>, FormError> {
		let Some(parent) = path::parent_path(path)? else {
			return Ok(None);
		};
		let name = path::field_name_from_path(path)?;
		let Ok(index) = name.parse::<usize>() else {
			return Ok(None);
		};
		Ok(self.view_at(parent)?.ids.token(index))
	}

	/// Writes `value` at a dotted path, creating intermediate objects and lists
	/// as needed. Overwriting a list item keeps its identity token.
	pub fn set(&mut self, path: &str, value: Value) -> Result<(), FormError> {
		let parts = path::segments(path)?;
		set_in(&mut self.value, &mut self.identities, &parts, value, IdentityTable::Untracked);
		Ok(())
	}

	/// Reads the list at `path` as tagged items. `None` if there is no list.
	pub fn items(&self, path: &str) -> Result<Option<Vec<Tagged>>, FormError> {
		Ok(self.view_at(path)?.items().map(|items| {
			items
				.into_iter()
				.map(|(token, item)| {
					let value = item.value.cloned().unwrap_or(Value::Null);
					match token {
						Some(token) => Tagged::with_identity(value, token),
						None => Tagged::new(value),
					}
				})
				.collect()
		}))
	}

	/// Replaces the list at `path`, recording each item's token.
	pub fn set_items(&mut self, path: &str, items: Vec<Tagged>) -> Result<(), FormError> {
		let parts = path::segments(path)?;
		let (values, slots): (Vec<_>, Vec<_>) = items
			.into_iter()
			.map(|item| {
				let (value, token) = item.into_parts();
				(value, Slot { token, inner: IdentityTable::Untracked })
			})
			.unzip();
		set_in(&mut self.value, &mut self.identities, &parts, Value::Array(values), IdentityTable::List(slots));
		Ok(())
	}

	/// Appends an item to the list at `path`, creating the list if absent.
	/// Returns the new item's index.
	pub fn push_item(&mut self, path: &str, item: Tagged) -> Result<usize, FormError> {
		let mut items = self.items(path)?.unwrap_or_default();
		items.push(item);
		let index = items.len() - 1;
		self.set_items(path, items)?;
		Ok(index)
	}

	/// Removes and returns the list item at `index`.
	pub fn remove_item(&mut self, path: &str, index: usize) -> Result<Tagged, FormError> {
		let mut items = self.items(path)?.ok_or_else(|| FormError::NotARepeatable(path.to_string()))?;
		if index >= items.len() {
			return Err(FormError::ItemOutOfBounds {
				path: path.to_string(),
				index,
			});
		}
		let removed = items.remove(index);
		self.set_items(path, items)?;
		Ok(removed)
	}

	fn view_at(&self, path: &str) -> Result<DataView<'_>, FormError> {
		let parts = path::segments(path)?;
		Ok(parts.iter().fold(self.view(), |view, key| view.step(key)))
	}
}

fn set_in(target: &mut Value, table: &mut IdentityTable, parts: &[&str], new: Value, new_table: IdentityTable) {
	let Some((key, rest)) = parts.split_first() else {
		*target = new;
		*table = new_table;
		return;
	};

	if let (Ok(index), false) = (key.parse::<usize>(), target.is_object()) {
		if !target.is_array() {
			*target = Value::Array(Vec::new());
			*table = IdentityTable::Untracked;
		}
		if let Value::Array(items) = target {
			if items.len() <= index {
				items.resize(index + 1, Value::Null);
			}
			let slots = table.list_mut();
			if slots.len() < items.len() {
				slots.resize_with(items.len(), Slot::default);
			}
			set_in(&mut items[index], &mut slots[index].inner, rest, new, new_table);
		}
		return;
	}

	if !target.is_object() {
		*target = Value::Object(Map::new());
		*table = IdentityTable::Untracked;
	}
	if let Value::Object(map) = target {
		let child = map.entry(key.to_string()).or_insert(Value::Null);
		let child_table = table.object_mut().entry(key.to_string()).or_default();
		set_in(child, child_table, rest, new, new_table);
	}
}

/// Read-only cursor into a [`FormData`], pairing a value with its identities.
#[derive(Debug, Clone, Copy)]
pub struct DataView<'a> {
	value: Option<&'a Value>,
	ids: &'a IdentityTable,
}

impl<'a> DataView<'a> {
	/// Cursor over a value that has no identities recorded.
	pub fn detached(value: &'a Value) -> Self {
		Self {
			value: Some(value),
			ids: &UNTRACKED,
		}
	}

	/// Value at this location, `None` when absent.
	pub fn value(&self) -> Option<&'a Value> {
		self.value
	}

	/// Cursor at an object key.
	pub fn child(&self, key: &str) -> DataView<'a> {
		DataView {
			value: self.value.and_then(|value| value.get(key)),
			ids: self.ids.child(key),
		}
	}

	/// List items with their tokens, or `None` when the value is not a list.
	pub fn items(&self) -> Option<Vec<(Option<IdentityToken>, DataView<'a>)>> {
		let items = self.value?.as_array()?;
		Some(
			items
				.iter()
				.enumerate()
				.map(|(index, item)| {
					let view = DataView {
						value: Some(item),
						ids: self.ids.item(index),
					};
					(self.ids.token(index), view)
				})
				.collect(),
		)
	}

	fn step(self, key: &str) -> DataView<'a> {
		match (self.value, key.parse::<usize>()) {
			(Some(Value::Array(items)), Ok(index)) => DataView {
				value: items.get(index),
				ids: self.ids.item(index),
			},
			_ => self.child(key),
		}
	}
}
