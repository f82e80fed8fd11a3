//! Validation for Arbor forms.
//!
//! [`ConstraintEvaluator`] checks a value against a rule set; [`RuleEvaluator`]
//! is the default implementation with the built-in rules plus whatever a
//! [`ValidatorRegistry`] adds. [`ValidationScheduler`] decides when a plain
//! field is validated, runs synchronous checks inline and keeps at most one
//! asynchronous check in flight per field path.

mod debounce;
mod evaluator;
mod registry;
mod rules;
mod scheduler;
mod spawn;
mod token;

pub use debounce::{DebounceDecision, Debouncer};
pub use evaluator::{ConstraintEvaluator, ConstraintSet, RuleEvaluator};
pub use registry::{AsyncRuleValidator, BoxFutureStatic, RuleContext, RuleValidator, ValidatorRegistry};
pub use scheduler::{FieldValidator, SettledValidation, Settlement, ValidationMode, ValidationRun, ValidationScheduler, should_validate};
