//! Projection of a field tree back into external data.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::data::FormData;
use crate::identity::{IdentityTable, Slot};
use crate::node::{FieldNode, FieldTree, RepeatableField};

/// Deep-merges the tree's values over a copy of `previous`.
///
/// Keys the tree does not know about are carried over. Repeatables become
/// lists in tree order, each slot tagged with the item's identity token, so a
/// later reconciliation re-identifies every item.
pub fn to_external_data(tree: &FieldTree, previous: &FormData) -> FormData {
	let mut value = previous.value().clone();
	let mut identities = previous.identities().clone();
	merge_object(tree.fields(), &mut value, &mut identities);
	FormData::with_identities(value, identities)
}

fn merge_node(node: &FieldNode, target: &mut Value, table: &mut IdentityTable) {
	match node {
		FieldNode::Plain(field) => {
			*target = field.value().clone();
			*table = IdentityTable::Untracked;
		}
		FieldNode::Composite(field) => merge_object(field.children(), target, table),
		FieldNode::Repeatable(field) => merge_list(field, target, table),
	}
}

fn merge_object(children: &IndexMap<String, Arc<FieldNode>>, target: &mut Value, table: &mut IdentityTable) {
	if !target.is_object() {
		*target = Value::Object(Map::new());
		*table = IdentityTable::Untracked;
	}
	let Value::Object(map) = target else {
		return;
	};
	let tables = table.object_mut();
	for (key, child) in children {
		let slot = map.entry(key.clone()).or_insert(Value::Null);
		merge_node(child, slot, tables.entry(key.clone()).or_default());
	}
}

fn merge_list(field: &RepeatableField, target: &mut Value, table: &mut IdentityTable) {
	let previous_items = match target {
		Value::Array(items) => std::mem::take(items),
		_ => Vec::new(),
	};
	let previous_slots = match table {
		IdentityTable::List(slots) => std::mem::take(slots),
		_ => Vec::new(),
	};

	let mut items = Vec::with_capacity(field.len());
	let mut slots = Vec::with_capacity(field.len());
	for (index, (token, child)) in field.children().iter().enumerate() {
		// Reuse the previous entry for this item as the merge base: matched by
		// token, or by position while the item was still untagged.
		let base = previous_slots
			.iter()
			.position(|slot| slot.token == Some(*token))
			.or_else(|| {
				let untagged = previous_slots.get(index).is_none_or(|slot| slot.token.is_none());
				(index < previous_items.len() && untagged).then_some(index)
			});
		let (mut value, mut inner) = match base {
			Some(i) => (
				previous_items.get(i).cloned().unwrap_or(Value::Null),
				previous_slots.get(i).map(|slot| slot.inner.clone()).unwrap_or_default(),
			),
			None => (Value::Null, IdentityTable::Untracked),
		};
		merge_node(child, &mut value, &mut inner);
		items.push(value);
		slots.push(Slot { token: Some(*token), inner });
	}

	*target = Value::Array(items);
	*table = IdentityTable::List(slots);
}

#[cfg(test)]
mod tests;
