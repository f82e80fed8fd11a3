//! Constraint evaluation.

use arbor_core::RuleSet;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::registry::{Registered, RuleContext, ValidatorRegistry};
use crate::rules;

/// Rules to check, for a single value or per attribute of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintSet {
	/// Rules for one value.
	Single(RuleSet),
	/// Rules per attribute; the value is an object of attribute values.
	Keyed(IndexMap<String, RuleSet>),
}

/// Checks values against constraint sets.
///
/// Errors come back as one flat, ordered list. An empty list means valid.
#[async_trait]
pub trait ConstraintEvaluator: Send + Sync {
	/// Evaluates synchronously.
	fn evaluate(&self, value: &Value, constraints: &ConstraintSet) -> Vec<String>;

	/// Evaluates on the asynchronous path. `None` and an empty list both mean
	/// valid.
	async fn evaluate_async(&self, value: &Value, constraints: &ConstraintSet) -> Option<Vec<String>>;
}

/// Default evaluator: built-in rules plus a per-instance registry.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
	registry: ValidatorRegistry,
}

impl RuleEvaluator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_registry(registry: ValidatorRegistry) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &ValidatorRegistry {
		&self.registry
	}

	fn check_sync(&self, name: &str, value: &Value, options: &Value, cx: &RuleContext<'_>) -> Vec<String> {
		match self.registry.get(name) {
			Some(Registered::Sync(validator)) => validator.check(value, options, cx).into_iter().collect(),
			Some(Registered::Async(_)) => {
				warn!(rule = name, "validation.async_rule_on_sync_path");
				Vec::new()
			}
			None => match rules::builtin(name) {
				Some(rule) => rule(value, options, cx),
				None => {
					debug!(rule = name, "validation.unknown_rule");
					Vec::new()
				}
			},
		}
	}

	async fn check_async(&self, name: &str, value: &Value, options: &Value, cx: &RuleContext<'_>) -> Vec<String> {
		match self.registry.get(name) {
			Some(Registered::Async(validator)) => validator.check(value.clone(), options.clone()).await.into_iter().collect(),
			_ => self.check_sync(name, value, options, cx),
		}
	}
}

/// Expands a constraint set into `(value, rule name, options, context)` checks
/// in evaluation order, skipping disabled rules.
fn plan<'a>(value: &'a Value, constraints: &'a ConstraintSet) -> Vec<(&'a Value, &'a str, &'a Value, RuleContext<'a>)> {
	static EMPTY: std::sync::LazyLock<Map<String, Value>> = std::sync::LazyLock::new(Map::new);

	match constraints {
		ConstraintSet::Single(rule_set) => rule_set
			.iter()
			.filter(|(_, options)| rules::is_enabled(options))
			.map(|(name, options)| (value, name.as_str(), options, RuleContext::default()))
			.collect(),
		ConstraintSet::Keyed(per_attribute) => {
			let attributes = value.as_object().unwrap_or(&EMPTY);
			per_attribute
				.iter()
				.flat_map(|(attribute, rule_set)| {
					let attr_value = attributes.get(attribute).unwrap_or(&Value::Null);
					let cx = RuleContext {
						attribute: Some(attribute.as_str()),
						attributes: Some(attributes),
					};
					rule_set
						.iter()
						.filter(|(_, options)| rules::is_enabled(options))
						.map(move |(name, options)| (attr_value, name.as_str(), options, cx))
				})
				.collect()
		}
	}
}

#[async_trait]
impl ConstraintEvaluator for RuleEvaluator {
	fn evaluate(&self, value: &Value, constraints: &ConstraintSet) -> Vec<String> {
		plan(value, constraints)
			.into_iter()
			.flat_map(|(value, name, options, cx)| self.check_sync(name, value, options, &cx))
			.collect()
	}

	async fn evaluate_async(&self, value: &Value, constraints: &ConstraintSet) -> Option<Vec<String>> {
		let mut errors = Vec::new();
		for (value, name, options, cx) in plan(value, constraints) {
			errors.extend(self.check_async(name, value, options, &cx).await);
		}
		(!errors.is_empty()).then_some(errors)
	}
}
