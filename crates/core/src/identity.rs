//! Identity tokens for repeatable items.
//!
//! List items in external data have no natural key, so each one is tracked by
//! an opaque [`IdentityToken`] minted on first observation. Tokens never live
//! inside the plain values: they are kept out of band, either on a [`Tagged`]
//! wrapper for a single item or in an [`IdentityTable`] that mirrors the shape
//! of a whole data object. Neither participates in value equality.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque, globally unique key for one logical list item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityToken(Uuid);

impl IdentityToken {
	/// Mints a new random token.
	pub fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	/// Parses a token from its string form, returning `None` for anything else.
	pub fn parse(s: &str) -> Option<Self> {
		Uuid::parse_str(s).ok().map(Self)
	}
}

impl fmt::Display for IdentityToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl fmt::Debug for IdentityToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "IdentityToken({})", self.0)
	}
}

impl FromStr for IdentityToken {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s).map(Self)
	}
}

/// A value paired with an optional identity token.
///
/// Equality compares only the value.
#[derive(Debug, Clone, Default)]
pub struct Tagged {
	value: Value,
	identity: Option<IdentityToken>,
}

impl Tagged {
	/// Wraps an untagged value.
	pub fn new(value: Value) -> Self {
		Self { value, identity: None }
	}

	/// Wraps a value with the given token.
	pub fn with_identity(value: Value, token: IdentityToken) -> Self {
		Self { value, identity: Some(token) }
	}

	/// Wraps a value with a freshly minted token.
	pub fn fresh(value: Value) -> Self {
		Self::with_identity(value, IdentityToken::generate())
	}

	/// Returns `true` if a token is attached.
	pub fn has_identity(&self) -> bool {
		self.identity.is_some()
	}

	/// Returns the attached token.
	pub fn identity(&self) -> Option<IdentityToken> {
		self.identity
	}

	/// Attaches `token`, overwriting any previous one.
	pub fn assign_identity(mut self, token: IdentityToken) -> Self {
		self.identity = Some(token);
		self
	}

	/// Returns the wrapped value.
	pub fn value(&self) -> &Value {
		&self.value
	}

	/// Unwraps the plain value, dropping the token.
	pub fn into_value(self) -> Value {
		self.value
	}

	/// Splits into value and token.
	pub fn into_parts(self) -> (Value, Option<IdentityToken>) {
		(self.value, self.identity)
	}
}

impl PartialEq for Tagged {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}

impl From<Value> for Tagged {
	fn from(value: Value) -> Self {
		Self::new(value)
	}
}

/// Identity side table mirroring the shape of a data value.
///
/// Only lists carry tokens; objects exist so nested lists can be reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentityTable {
	/// Nothing tracked at or below this location.
	#[default]
	Untracked,
	/// Per-key tables of an object.
	Object(IndexMap<String, IdentityTable>),
	/// Per-item slots of a list.
	List(Vec<Slot>),
}

/// Identity of one list item plus the table for its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
	pub token: Option<IdentityToken>,
	pub inner: IdentityTable,
}

impl Slot {
	/// Slot for an item carrying `token`.
	pub fn tagged(token: IdentityToken) -> Self {
		Self {
			token: Some(token),
			inner: IdentityTable::Untracked,
		}
	}
}

pub(crate) static UNTRACKED: IdentityTable = IdentityTable::Untracked;

impl IdentityTable {
	/// Returns the table under an object key, or an untracked table.
	pub fn child(&self, key: &str) -> &IdentityTable {
		match self {
			Self::Object(map) => map.get(key).unwrap_or(&UNTRACKED),
			_ => &UNTRACKED,
		}
	}

	/// Returns the slot at a list index.
	pub fn slot(&self, index: usize) -> Option<&Slot> {
		match self {
			Self::List(slots) => slots.get(index),
			_ => None,
		}
	}

	/// Returns the table for the contents of the list item at `index`.
	pub fn item(&self, index: usize) -> &IdentityTable {
		self.slot(index).map_or(&UNTRACKED, |slot| &slot.inner)
	}

	/// Returns the token of the list item at `index`.
	pub fn token(&self, index: usize) -> Option<IdentityToken> {
		self.slot(index).and_then(|slot| slot.token)
	}

	/// Returns the object map, converting this table into one if needed.
	pub fn object_mut(&mut self) -> &mut IndexMap<String, IdentityTable> {
		if !matches!(self, Self::Object(_)) {
			*self = Self::Object(IndexMap::new());
		}
		match self {
			Self::Object(map) => map,
			_ => unreachable!(),
		}
	}

	/// Returns the slot list, converting this table into one if needed.
	pub fn list_mut(&mut self) -> &mut Vec<Slot> {
		if !matches!(self, Self::List(_)) {
			*self = Self::List(Vec::new());
		}
		match self {
			Self::List(slots) => slots,
			_ => unreachable!(),
		}
	}

	/// Returns `true` if no token is recorded anywhere in this table.
	pub fn is_untracked(&self) -> bool {
		match self {
			Self::Untracked => true,
			Self::Object(map) => map.values().all(Self::is_untracked),
			Self::List(slots) => slots.iter().all(|slot| slot.token.is_none() && slot.inner.is_untracked()),
		}
	}
}
