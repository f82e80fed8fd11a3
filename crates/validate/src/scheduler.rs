//! Validation scheduling.
//!
//! [`ValidationScheduler`] runs one validation attempt per plain field:
//! synchronous constraints are evaluated inline, asynchronous ones are spawned
//! as cancelable tasks. At most one asynchronous attempt is in flight per field
//! path; issuing a new one cancels the previous attempt rather than queueing
//! behind it. Settlements travel back over a channel and are applied to the
//! tree by path once the caller polls for them, so a superseded or disposed
//! attempt never touches the tree.

use std::sync::Arc;

use arbor_core::{FieldTree, PlainField, StatusFlag};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::debounce::{DebounceDecision, Debouncer};
use crate::evaluator::{ConstraintEvaluator, ConstraintSet};
use crate::spawn;
use crate::token::{GenerationClock, GenerationToken};

/// Returns `false` exactly when the field is untouched and not invalid.
pub fn should_validate(field: &PlainField) -> bool {
	let status = field.status();
	!status.has(StatusFlag::Untouched) || status.has(StatusFlag::Invalid)
}

/// Why a validation is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
	/// Value changed or field blurred. Gated by [`should_validate`] and the
	/// field's debounce policy.
	Change,
	/// A debounced request came due. Gated by [`should_validate`] only.
	Flush,
	/// Whole-form submission. Always runs.
	Force,
}

/// What a validation request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRun {
	/// Nothing to do: the field is silent or has no constraints.
	Skipped,
	/// Held by the debounce policy.
	Deferred,
	/// Evaluated synchronously; status and errors are updated.
	Completed,
	/// Spawned asynchronously; the field is pending.
	Scheduled,
}

/// Outcome of an asynchronous attempt.
///
/// `Canceled` is distinct from a successful empty result and is never applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
	Settled(Vec<String>),
	Canceled,
}

impl Settlement {
	pub fn is_canceled(&self) -> bool {
		matches!(self, Self::Canceled)
	}
}

/// An asynchronous result ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledValidation {
	pub path: String,
	pub errors: Vec<String>,
}

/// Runs validation for plain fields.
pub trait FieldValidator {
	/// Validates `field` in place. `siblings` holds the values of the plain
	/// siblings under a composite parent, keyed by name.
	fn validate(&mut self, field: &mut PlainField, siblings: Option<&Map<String, Value>>, mode: ValidationMode) -> ValidationRun;
}

struct Completion {
	path: String,
	generation: u64,
	settlement: Settlement,
}

/// Sends exactly one [`Completion`] per attempt. An attempt that unwinds or is
/// dropped by its runtime before settling reports [`Settlement::Canceled`].
struct Reply {
	tx: mpsc::UnboundedSender<Completion>,
	path: String,
	generation: u64,
	sent: bool,
}

impl Reply {
	fn send(&mut self, settlement: Settlement) {
		self.sent = true;
		let _ = self.tx.send(Completion {
			path: std::mem::take(&mut self.path),
			generation: self.generation,
			settlement,
		});
	}
}

impl Drop for Reply {
	fn drop(&mut self) {
		if !self.sent {
			self.send(Settlement::Canceled);
		}
	}
}

struct PendingValidation {
	token: GenerationToken,
}

/// Owner of all in-flight asynchronous validations for one form.
pub struct ValidationScheduler {
	evaluator: Arc<dyn ConstraintEvaluator>,
	pending: FxHashMap<String, PendingValidation>,
	clock: GenerationClock,
	debouncer: Debouncer,
	completion_tx: mpsc::UnboundedSender<Completion>,
	completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ValidationScheduler {
	pub fn new(evaluator: Arc<dyn ConstraintEvaluator>) -> Self {
		let (completion_tx, completion_rx) = mpsc::unbounded_channel();
		Self {
			evaluator,
			pending: FxHashMap::default(),
			clock: GenerationClock::default(),
			debouncer: Debouncer::new(),
			completion_tx,
			completion_rx,
		}
	}

	pub fn evaluator(&self) -> &Arc<dyn ConstraintEvaluator> {
		&self.evaluator
	}

	/// Swaps the evaluator. In-flight attempts keep the one they started with.
	pub fn set_evaluator(&mut self, evaluator: Arc<dyn ConstraintEvaluator>) {
		self.evaluator = evaluator;
	}

	/// Validates `field` in place at time `now`.
	pub fn validate_at(&mut self, field: &mut PlainField, siblings: Option<&Map<String, Value>>, mode: ValidationMode, now: Instant) -> ValidationRun {
		if mode != ValidationMode::Force && !should_validate(field) {
			trace!(path = field.path(), "validation.skip.silent");
			return ValidationRun::Skipped;
		}
		let config = Arc::clone(field.config());
		let Some(constraints) = config.constraints.as_ref() else {
			return ValidationRun::Skipped;
		};

		if mode == ValidationMode::Change
			&& let Some(policy) = constraints.debounce.as_ref()
			&& self.debouncer.call(field.path(), policy, now) == DebounceDecision::Deferred
		{
			debug!(path = field.path(), "validation.debounce.defer");
			return ValidationRun::Deferred;
		}

		let (value, set) = match siblings {
			Some(siblings) => {
				let mut attributes = siblings.clone();
				attributes.insert(field.name().to_string(), field.value().clone());
				let keyed = IndexMap::from([(field.name().to_string(), constraints.rules.clone())]);
				(Value::Object(attributes), ConstraintSet::Keyed(keyed))
			}
			None => (field.value().clone(), ConstraintSet::Single(constraints.rules.clone())),
		};

		if constraints.is_async {
			self.spawn_async(field, value, set);
			return ValidationRun::Scheduled;
		}

		self.cancel_in_flight(field.path());
		let errors = self.evaluator.evaluate(&value, &set);
		trace!(path = field.path(), errors = errors.len(), "validation.sync");
		field.resolve(errors);
		ValidationRun::Completed
	}

	fn spawn_async(&mut self, field: &mut PlainField, value: Value, set: ConstraintSet) {
		let path = field.path().to_string();
		self.cancel_in_flight(&path);
		if !field.mark_pending() {
			debug!(path = %path, "validation.pending.rejected");
		}

		let token = GenerationToken::new(self.clock.next());
		let generation = token.generation();
		let task_token = token.clone();
		let evaluator = Arc::clone(&self.evaluator);
		let mut reply = Reply {
			tx: self.completion_tx.clone(),
			path: path.clone(),
			generation,
			sent: false,
		};
		spawn::spawn_attempt(&path, generation, async move {
			let settlement = tokio::select! {
				biased;
				_ = task_token.cancelled() => Settlement::Canceled,
				errors = evaluator.evaluate_async(&value, &set) => Settlement::Settled(errors.unwrap_or_default()),
			};
			reply.send(settlement);
		});

		debug!(path = %path, generation, "validation.async.start");
		self.pending.insert(path, PendingValidation { token });
	}

	/// Keeps a completion only if it settles the current attempt for its path.
	fn accept(&mut self, completion: Completion) -> Option<SettledValidation> {
		let Completion { path, generation, settlement } = completion;
		let current = self.pending.get(&path).is_some_and(|p| p.token.generation() == generation && !p.token.is_cancelled());
		match settlement {
			Settlement::Settled(errors) if current => {
				self.pending.remove(&path);
				debug!(path = %path, generation, errors = errors.len(), "validation.async.settled");
				Some(SettledValidation { path, errors })
			}
			Settlement::Canceled if current => {
				self.pending.remove(&path);
				warn!(path = %path, generation, "validation.async.abandoned");
				None
			}
			settlement => {
				debug!(path = %path, generation, canceled = settlement.is_canceled(), "validation.async.discard");
				None
			}
		}
	}

	/// Drains settlements that already arrived, dropping stale ones.
	pub fn poll_settled(&mut self) -> Vec<SettledValidation> {
		let mut settled = Vec::new();
		while let Ok(completion) = self.completion_rx.try_recv() {
			settled.extend(self.accept(completion));
		}
		settled
	}

	/// Waits for the next applicable settlement. `None` once nothing is in
	/// flight.
	pub async fn next_settled(&mut self) -> Option<SettledValidation> {
		while !self.pending.is_empty() {
			let completion = self.completion_rx.recv().await?;
			if let Some(settled) = self.accept(completion) {
				return Some(settled);
			}
		}
		None
	}

	/// Applies settled results to `tree`. Returns the paths that changed.
	pub fn apply_settled(tree: &mut FieldTree, settled: Vec<SettledValidation>) -> Vec<String> {
		let mut applied = Vec::with_capacity(settled.len());
		for SettledValidation { path, errors } in settled {
			match tree.plain_mut(&path) {
				Ok(field) => {
					field.resolve(errors);
					applied.push(path);
				}
				Err(err) => debug!(path = %path, error = %err, "validation.async.orphaned"),
			}
		}
		applied
	}

	/// Paths whose debounced request came due at `now`.
	pub fn due_debounced(&mut self, now: Instant) -> Vec<String> {
		self.debouncer.due(now)
	}

	/// Earliest instant a debounced request may come due.
	pub fn next_debounce_deadline(&self) -> Option<Instant> {
		self.debouncer.next_deadline()
	}

	fn cancel_in_flight(&mut self, path: &str) -> bool {
		let Some(pending) = self.pending.remove(path) else {
			return false;
		};
		pending.token.cancel();
		debug!(path, generation = pending.token.generation(), "validation.cancel");
		true
	}

	/// Cancels the in-flight attempt and any held debounced request for `path`.
	pub fn cancel(&mut self, path: &str) -> bool {
		let debounced = self.debouncer.cancel(path);
		self.cancel_in_flight(path) || debounced
	}

	/// Cancels everything for paths that fail `keep`.
	pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
		let dropped: Vec<String> = self.pending.keys().filter(|path| !keep(path)).cloned().collect();
		for path in dropped {
			self.cancel(&path);
		}
		self.debouncer.retain(keep);
	}

	/// Cancels every in-flight attempt and held request.
	pub fn cancel_all(&mut self) {
		for (path, pending) in self.pending.drain() {
			pending.token.cancel();
			debug!(path = %path, generation = pending.token.generation(), "validation.cancel");
		}
		self.debouncer.clear();
	}

	pub fn is_pending(&self, path: &str) -> bool {
		self.pending.contains_key(path)
	}

	/// Number of asynchronous attempts in flight.
	pub fn in_flight(&self) -> usize {
		self.pending.len()
	}

	/// Paths with an attempt in flight, sorted.
	pub fn pending_paths(&self) -> Vec<String> {
		let mut paths: Vec<_> = self.pending.keys().cloned().collect();
		paths.sort();
		paths
	}
}

impl FieldValidator for ValidationScheduler {
	fn validate(&mut self, field: &mut PlainField, siblings: Option<&Map<String, Value>>, mode: ValidationMode) -> ValidationRun {
		self.validate_at(field, siblings, mode, Instant::now())
	}
}

impl Drop for ValidationScheduler {
	fn drop(&mut self) {
		self.cancel_all();
	}
}

impl std::fmt::Debug for ValidationScheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ValidationScheduler")
			.field("pending", &self.pending_paths())
			.field("debounced", &self.debouncer.len())
			.finish_non_exhaustive()
	}
}
