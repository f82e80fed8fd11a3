use thiserror::Error;

use crate::status::{StatusFlags, Transition};

/// Structural errors raised by path addressing and tree updates.
///
/// These are programmer or caller mistakes and are always surfaced to the
/// immediate caller. Validation outcomes never travel through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
	/// The path was empty or contained an empty segment.
	#[error("malformed path: {0:?}")]
	MalformedPath(String),
	/// No field exists at the given path.
	#[error("field not found: {0}")]
	FieldNotFound(String),
	/// The field at the given path is a container, not a plain field.
	#[error("not a plain field: {0}")]
	NotAPlainField(String),
	/// The field at the given path is not a repeatable list.
	#[error("not a repeatable field: {0}")]
	NotARepeatable(String),
	/// A list index pointed past the end of a repeatable list.
	#[error("item {index} out of bounds in {path}")]
	ItemOutOfBounds { path: String, index: usize },
}

/// A status transition was requested from a state that does not permit it.
///
/// Non-fatal: callers treat it as a no-op.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("transition `{}` not allowed from {from:?}", transition.as_str())]
pub struct DisallowedTransition {
	pub transition: Transition,
	pub from: StatusFlags,
}

/// Errors produced while loading a schema from configuration text.
#[derive(Error, Debug)]
pub enum SchemaError {
	/// JSON schema text failed to parse.
	#[error("invalid JSON schema: {0}")]
	Json(#[from] serde_json::Error),
	/// TOML schema text failed to parse.
	#[error("invalid TOML schema: {0}")]
	Toml(#[from] toml::de::Error),
	/// A composite field was declared without `fields`.
	#[error("composite field is missing `fields`")]
	MissingFields,
	/// A repeatable field was declared without an item `field`.
	#[error("repeatable field is missing its item `field`")]
	MissingTemplate,
	/// A reserved constraint key (`async`, `debounce`) had an unexpected shape.
	#[error("invalid constraint options: {0}")]
	Constraint(String),
}
