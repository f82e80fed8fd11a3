//! Declarative field configuration.
//!
//! A [`Schema`] is an ordered map of field name to [`FieldConfig`]. Schemas are
//! usually loaded from JSON or TOML:
//!
//! ```json
//! {
//!   "firstName": { "type": "input", "constraints": { "presence": true } },
//!   "profile": {
//!     "type": "composite",
//!     "fields": {
//!       "password": { "type": "input" },
//!       "confirm": { "type": "input", "constraints": { "equality": "password" } }
//!     }
//!   },
//!   "emails": {
//!     "type": "repeatable",
//!     "field": { "type": "input", "initialValue": "", "constraints": { "email": true } }
//!   }
//! }
//! ```
//!
//! Any `type` other than `composite` or `repeatable` is a plain field. The
//! constraint keys `async` and `debounce` are scheduling hints, not rules, and
//! are split out of the rule set on load.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Rule name to rule options, as handed to a constraint evaluator.
pub type RuleSet = Map<String, Value>;

/// Ordered field name to field configuration map.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Schema(IndexMap<String, FieldConfig>);

impl Schema {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces a field, builder style.
	pub fn with(mut self, name: impl Into<String>, config: impl Into<FieldConfig>) -> Self {
		self.0.insert(name.into(), config.into());
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, config: impl Into<FieldConfig>) -> Option<FieldConfig> {
		self.0.insert(name.into(), config.into())
	}

	pub fn get(&self, name: &str) -> Option<&FieldConfig> {
		self.0.get(name)
	}

	pub fn contains_key(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn iter(&self) -> indexmap::map::Iter<'_, String, FieldConfig> {
		self.0.iter()
	}

	pub fn keys(&self) -> indexmap::map::Keys<'_, String, FieldConfig> {
		self.0.keys()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Parses a schema from JSON text.
	pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
		Ok(serde_json::from_str(text)?)
	}

	/// Parses a schema from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, SchemaError> {
		Ok(toml::from_str(text)?)
	}
}

impl<'a> IntoIterator for &'a Schema {
	type Item = (&'a String, &'a FieldConfig);
	type IntoIter = indexmap::map::Iter<'a, String, FieldConfig>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

impl FromIterator<(String, FieldConfig)> for Schema {
	fn from_iter<I: IntoIterator<Item = (String, FieldConfig)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// Configuration of one field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFieldConfig")]
pub enum FieldConfig {
	/// Leaf input.
	Plain(PlainConfig),
	/// Fixed-shape nested group.
	Composite(CompositeConfig),
	/// Variable-length list of one item template.
	Repeatable(RepeatableConfig),
}

impl FieldConfig {
	/// Plain `input` field with a literal initial value.
	pub fn input(initial: Value) -> Self {
		Self::Plain(PlainConfig::new("input").initial(initial))
	}

	pub fn composite(fields: Schema) -> Self {
		Self::Composite(CompositeConfig { fields })
	}

	pub fn repeatable(item: impl Into<FieldConfig>) -> Self {
		Self::Repeatable(RepeatableConfig { field: Box::new(item.into()) })
	}

	/// Type name as written in configuration.
	pub fn kind(&self) -> &str {
		match self {
			Self::Plain(plain) => &plain.kind,
			Self::Composite(_) => "composite",
			Self::Repeatable(_) => "repeatable",
		}
	}

	/// Value a freshly added list item of this template starts with.
	///
	/// `items` holds the materialized values of the list the item joins, which
	/// computed initial values may inspect.
	pub fn seed(&self, items: &Value) -> Value {
		match self {
			Self::Plain(plain) => plain.initial_value.resolve(items),
			Self::Composite(_) => Value::Object(Map::new()),
			Self::Repeatable(_) => Value::Array(Vec::new()),
		}
	}
}

impl From<PlainConfig> for FieldConfig {
	fn from(config: PlainConfig) -> Self {
		Self::Plain(config)
	}
}

/// Plain field configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlainConfig {
	/// Presentation type name (`input`, `select`, ...). Opaque to the engine.
	pub kind: String,
	pub initial_value: InitialValue,
	pub constraints: Option<Constraints>,
}

impl PlainConfig {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			initial_value: InitialValue::default(),
			constraints: None,
		}
	}

	/// Sets a literal initial value.
	pub fn initial(mut self, value: Value) -> Self {
		self.initial_value = InitialValue::Literal(value);
		self
	}

	/// Sets an initial value computed from the materialized values of the
	/// enclosing list.
	pub fn with_initial_fn<F>(mut self, f: F) -> Self
	where
		F: Fn(&Value) -> Value + Send + Sync + 'static,
	{
		self.initial_value = InitialValue::Computed(Arc::new(f));
		self
	}

	pub fn constraints(mut self, constraints: Constraints) -> Self {
		self.constraints = Some(constraints);
		self
	}

	/// Returns `true` if validation of this field runs asynchronously.
	pub fn is_async(&self) -> bool {
		self.constraints.as_ref().is_some_and(|c| c.is_async)
	}

	/// Returns the debounce policy, if any.
	pub fn debounce(&self) -> Option<&DebouncePolicy> {
		self.constraints.as_ref().and_then(|c| c.debounce.as_ref())
	}

	/// Returns the rule set, or `None` when there is nothing to check.
	pub fn rules(&self) -> Option<&RuleSet> {
		self.constraints.as_ref().map(|c| &c.rules).filter(|rules| !rules.is_empty())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeConfig {
	pub fields: Schema,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatableConfig {
	/// Item template.
	pub field: Box<FieldConfig>,
}

/// Function computing an initial value from list contents.
pub type InitialFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Initial value of a plain field.
#[derive(Clone)]
pub enum InitialValue {
	Literal(Value),
	/// Computed from the materialized values of the enclosing list.
	Computed(InitialFn),
}

impl Default for InitialValue {
	fn default() -> Self {
		Self::Literal(Value::Null)
	}
}

impl InitialValue {
	/// Resolves against the current list contents (`null` outside lists).
	pub fn resolve(&self, items: &Value) -> Value {
		match self {
			Self::Literal(value) => value.clone(),
			Self::Computed(f) => f(items),
		}
	}

	/// Value used for a field with no list context.
	pub fn resolve_standalone(&self) -> Value {
		self.resolve(&Value::Null)
	}
}

impl PartialEq for InitialValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Literal(a), Self::Literal(b)) => a == b,
			(Self::Computed(a), Self::Computed(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for InitialValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
			Self::Computed(_) => f.write_str("Computed(..)"),
		}
	}
}

/// Rules plus scheduling hints for one plain field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RuleSet")]
pub struct Constraints {
	pub rules: RuleSet,
	/// Evaluate through the asynchronous path.
	pub is_async: bool,
	pub debounce: Option<DebouncePolicy>,
}

impl Constraints {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a rule with its options.
	pub fn rule(mut self, name: impl Into<String>, options: Value) -> Self {
		self.rules.insert(name.into(), options);
		self
	}

	pub fn asynchronous(mut self) -> Self {
		self.is_async = true;
		self
	}

	pub fn debounce(mut self, policy: DebouncePolicy) -> Self {
		self.debounce = Some(policy);
		self
	}
}

impl TryFrom<RuleSet> for Constraints {
	type Error = SchemaError;

	fn try_from(mut rules: RuleSet) -> Result<Self, Self::Error> {
		let is_async = match rules.remove("async") {
			None | Some(Value::Null) => false,
			Some(Value::Bool(flag)) => flag,
			Some(other) => return Err(SchemaError::Constraint(format!("`async` must be a boolean, got {other}"))),
		};
		let debounce = match rules.remove("debounce") {
			None | Some(Value::Null) => None,
			Some(raw) => Some(DebouncePolicy::from_value(raw)?),
		};
		Ok(Self { rules, is_async, debounce })
	}
}

/// Debounce policy for one field's validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
	pub wait: Duration,
	/// Longest a call may be deferred. Never shorter than `wait`.
	pub max_wait: Option<Duration>,
	/// Invoke on the leading edge of a burst.
	pub leading: bool,
	/// Invoke on the trailing edge of a burst.
	pub trailing: bool,
}

impl DebouncePolicy {
	/// Trailing-edge debounce with the given wait.
	pub fn wait(wait: Duration) -> Self {
		Self {
			wait,
			max_wait: None,
			leading: false,
			trailing: true,
		}
	}

	pub fn max_wait(mut self, max_wait: Duration) -> Self {
		self.max_wait = Some(max_wait.max(self.wait));
		self
	}

	pub fn leading(mut self, leading: bool) -> Self {
		self.leading = leading;
		self
	}

	pub fn trailing(mut self, trailing: bool) -> Self {
		self.trailing = trailing;
		self
	}

	fn from_value(raw: Value) -> Result<Self, SchemaError> {
		#[derive(Deserialize)]
		#[serde(rename_all = "camelCase", deny_unknown_fields)]
		struct RawDebounce {
			#[serde(default)]
			wait: u64,
			max_wait: Option<u64>,
			#[serde(default)]
			leading: bool,
			#[serde(default = "default_trailing")]
			trailing: bool,
		}

		fn default_trailing() -> bool {
			true
		}

		let raw: RawDebounce = serde_json::from_value(raw).map_err(|e| SchemaError::Constraint(format!("`debounce`: {e}")))?;
		let mut policy = Self::wait(Duration::from_millis(raw.wait)).leading(raw.leading).trailing(raw.trailing);
		if let Some(max_wait) = raw.max_wait {
			policy = policy.max_wait(Duration::from_millis(max_wait));
		}
		Ok(policy)
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldConfig {
	#[serde(rename = "type")]
	kind: String,
	fields: Option<Schema>,
	field: Option<Box<FieldConfig>>,
	#[serde(default)]
	initial_value: Value,
	constraints: Option<Constraints>,
}

impl TryFrom<RawFieldConfig> for FieldConfig {
	type Error = SchemaError;

	fn try_from(raw: RawFieldConfig) -> Result<Self, Self::Error> {
		match raw.kind.as_str() {
			"composite" => raw.fields.map(FieldConfig::composite).ok_or(SchemaError::MissingFields),
			"repeatable" => raw
				.field
				.map(|field| FieldConfig::Repeatable(RepeatableConfig { field }))
				.ok_or(SchemaError::MissingTemplate),
			_ => Ok(FieldConfig::Plain(PlainConfig {
				kind: raw.kind,
				initial_value: InitialValue::Literal(raw.initial_value),
				constraints: raw.constraints,
			})),
		}
	}
}
