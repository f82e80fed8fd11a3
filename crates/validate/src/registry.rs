//! Per-evaluator dictionary of custom rule validators.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

/// A pinned, boxed future that is required to be Send and 'static.
pub type BoxFutureStatic<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Where a rule is being evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext<'a> {
	/// Attribute name when evaluating keyed constraints.
	pub attribute: Option<&'a str>,
	/// All attribute values when evaluating keyed constraints.
	pub attributes: Option<&'a Map<String, Value>>,
}

impl<'a> RuleContext<'a> {
	/// Value of another attribute in the same keyed evaluation.
	pub fn sibling(&self, name: &str) -> Option<&'a Value> {
		self.attributes.and_then(|attrs| attrs.get(name))
	}
}

/// Synchronous custom rule. Returns an error message, or `None` when the
/// value passes.
pub trait RuleValidator: Send + Sync {
	fn check(&self, value: &Value, options: &Value, cx: &RuleContext<'_>) -> Option<String>;
}

impl<F> RuleValidator for F
where
	F: Fn(&Value, &Value, &RuleContext<'_>) -> Option<String> + Send + Sync,
{
	fn check(&self, value: &Value, options: &Value, cx: &RuleContext<'_>) -> Option<String> {
		self(value, options, cx)
	}
}

/// Asynchronous custom rule. Only consulted on the asynchronous path.
pub trait AsyncRuleValidator: Send + Sync {
	fn check(&self, value: Value, options: Value) -> BoxFutureStatic<Option<String>>;
}

impl<F, Fut> AsyncRuleValidator for F
where
	F: Fn(Value, Value) -> Fut + Send + Sync,
	Fut: Future<Output = Option<String>> + Send + 'static,
{
	fn check(&self, value: Value, options: Value) -> BoxFutureStatic<Option<String>> {
		Box::pin(self(value, options))
	}
}

#[derive(Clone)]
pub(crate) enum Registered {
	Sync(Arc<dyn RuleValidator>),
	Async(Arc<dyn AsyncRuleValidator>),
}

/// Custom validators keyed by rule name.
///
/// A registered name shadows the built-in rule of the same name.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
	validators: FxHashMap<String, Registered>,
}

impl ValidatorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a synchronous rule.
	pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
	where
		F: Fn(&Value, &Value, &RuleContext<'_>) -> Option<String> + Send + Sync + 'static,
	{
		self.register_validator(name, Arc::new(f))
	}

	pub fn register_validator(&mut self, name: impl Into<String>, validator: Arc<dyn RuleValidator>) -> &mut Self {
		self.validators.insert(name.into(), Registered::Sync(validator));
		self
	}

	/// Registers an asynchronous rule.
	pub fn register_async<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
	where
		F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Option<String>> + Send + 'static,
	{
		self.validators.insert(name.into(), Registered::Async(Arc::new(f)));
		self
	}

	pub fn contains(&self, name: &str) -> bool {
		self.validators.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.validators.len()
	}

	pub fn is_empty(&self) -> bool {
		self.validators.is_empty()
	}

	pub(crate) fn get(&self, name: &str) -> Option<&Registered> {
		self.validators.get(name)
	}
}

impl fmt::Debug for ValidatorRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut names: Vec<_> = self.validators.keys().collect();
		names.sort();
		f.debug_struct("ValidatorRegistry").field("validators", &names).finish()
	}
}
