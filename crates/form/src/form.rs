//! Form controller.
//!
//! [`Form`] owns the schema, the external data object, the current field tree
//! and the validation scheduler, and is the single writer of all of them.
//! Every event (data or schema replacement, blur, change, list edits,
//! submission, validation settlement) runs to completion before the next one,
//! so the tree is never observed mid-update.

use std::fmt;
use std::sync::Arc;

use arbor_core::{FieldTree, FormData, FormError, IdentityToken, PlainField, Schema, Tagged, Transition, child_path, to_external_data};
use arbor_validate::{ConstraintEvaluator, FieldValidator, ValidationMode, ValidationRun, ValidationScheduler};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::force;
use crate::observer::FormObserver;
use crate::reconciler::Reconciler;

/// A value change reported by an input.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
	/// Field path; list items by index or identity token.
	pub name: String,
	pub value: Value,
}

impl ChangeEvent {
	pub fn new(name: impl Into<String>, value: Value) -> Self {
		Self { name: name.into(), value }
	}
}

/// Result of [`Form::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// Every field passed; the handler received the data.
	Submitted,
	/// A field carries errors or is still validating; the handler was not
	/// called.
	Rejected,
}

/// Live state of one form.
pub struct Form {
	schema: Schema,
	data: FormData,
	tree: FieldTree,
	scheduler: ValidationScheduler,
	observer: Option<Box<dyn FormObserver>>,
	has_error: bool,
	is_submitted: bool,
}

impl Form {
	/// Builds the initial tree and populates `data` with initial values and
	/// list identities.
	pub fn new(schema: Schema, data: impl Into<FormData>, evaluator: Arc<dyn ConstraintEvaluator>) -> Self {
		let data = data.into();
		let mut scheduler = ValidationScheduler::new(evaluator);
		let tree = Reconciler::new(&mut scheduler).reconcile(&data, &schema, None);
		let mut form = Self {
			has_error: tree.has_errors(),
			schema,
			data,
			tree,
			scheduler,
			observer: None,
			is_submitted: false,
		};
		let _ = form.populate();
		form
	}

	pub fn with_observer(mut self, observer: impl FormObserver + 'static) -> Self {
		self.observer = Some(Box::new(observer));
		self
	}

	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	/// External data object, including list identities.
	pub fn data(&self) -> &FormData {
		&self.data
	}

	pub fn tree(&self) -> &FieldTree {
		&self.tree
	}

	/// Plain field at `path`. List items may be given by index or token.
	pub fn field(&self, path: &str) -> Result<&PlainField, FormError> {
		self.tree.plain(path)
	}

	pub fn has_error(&self) -> bool {
		self.has_error
	}

	pub fn is_submitted(&self) -> bool {
		self.is_submitted
	}

	/// Paths with an asynchronous validation in flight, sorted.
	pub fn pending_validations(&self) -> Vec<String> {
		self.scheduler.pending_paths()
	}

	/// Replaces the external data and reconciles.
	pub fn set_data(&mut self, data: impl Into<FormData>) {
		self.data = data.into();
		if self.rebuild() {
			self.notify_data();
		}
	}

	/// Replaces the schema and reconciles. Fields the new schema drops are
	/// removed along with their validations.
	pub fn set_schema(&mut self, schema: Schema) {
		self.schema = schema;
		if self.rebuild() {
			self.notify_data();
		}
	}

	/// Swaps the constraint evaluator and reconciles.
	pub fn set_evaluator(&mut self, evaluator: Arc<dyn ConstraintEvaluator>) {
		self.scheduler.set_evaluator(evaluator);
		if self.rebuild() {
			self.notify_data();
		}
	}

	/// Marks the field at `path` touched and validates it.
	pub fn blur(&mut self, path: &str) -> Result<ValidationRun, FormError> {
		let siblings = self.tree.siblings_of(path)?;
		let field = self.tree.plain_mut(path)?;
		let _ = field.apply(Transition::Blurred);
		let run = self.scheduler.validate(field, siblings.as_ref(), ValidationMode::Change);
		self.has_error = self.tree.has_errors();
		Ok(run)
	}

	/// Writes `value` into the field at `path` and reconciles, which validates
	/// the field if its value changed.
	pub fn change_value(&mut self, path: &str, value: Value) -> Result<(), FormError> {
		let external = self.tree.external_path(path)?;
		let _ = self.tree.plain_mut(path)?.apply(Transition::Typed);
		self.data.set(&external, value.clone())?;
		self.notify_field(&external, &value);
		self.rebuild();
		self.notify_data();
		Ok(())
	}

	pub fn change_event(&mut self, event: ChangeEvent) -> Result<(), FormError> {
		self.change_value(&event.name, event.value)
	}

	/// Replaces the whole list at `path`. Untagged items get fresh tokens.
	pub fn change_items(&mut self, path: &str, items: Vec<Tagged>) -> Result<(), FormError> {
		self.tree.repeatable(path)?;
		let external = self.tree.external_path(path)?;
		let items: Vec<Tagged> = items
			.into_iter()
			.map(|item| if item.has_identity() { item } else { Tagged::fresh(item.into_value()) })
			.collect();
		let value = Value::Array(items.iter().map(|item| item.value().clone()).collect());
		self.data.set_items(&external, items)?;
		self.notify_field(&external, &value);
		self.rebuild();
		self.notify_data();
		Ok(())
	}

	/// Appends an item seeded from the list's template and returns its token.
	pub fn add_item(&mut self, path: &str) -> Result<IdentityToken, FormError> {
		let list = self.tree.repeatable(path)?;
		let seed = list.template().seed(&list.materialize_items());
		let external = self.tree.external_path(path)?;
		let token = IdentityToken::generate();
		self.data.push_item(&external, Tagged::with_identity(seed, token))?;
		debug!(path = %external, token = %token, "form.item.add");
		self.rebuild();
		self.notify_data();
		Ok(token)
	}

	/// Removes the item at `index`, or the last item, and returns it.
	pub fn remove_item(&mut self, path: &str, index: Option<usize>) -> Result<Tagged, FormError> {
		let list = self.tree.repeatable(path)?;
		let out_of_bounds = |index| FormError::ItemOutOfBounds {
			path: path.to_string(),
			index,
		};
		let index = match index {
			Some(index) => index,
			None => list.len().checked_sub(1).ok_or_else(|| out_of_bounds(0))?,
		};
		let token = list.token_at(index).ok_or_else(|| out_of_bounds(index))?;
		let item_path = child_path(Some(list.path()), &token.to_string());
		let external = self.tree.external_path(path)?;

		let removed = self.data.remove_item(&external, index)?;
		let prefix = format!("{item_path}.");
		self.scheduler.retain(|pending| pending != item_path && !pending.starts_with(&prefix));
		debug!(path = %item_path, "form.item.remove");
		self.rebuild();
		self.notify_data();
		Ok(removed)
	}

	/// Validates every field and, if none carries errors, hands the data to
	/// `handler`.
	///
	/// The forced pass restarts asynchronous validations, so a form with any
	/// asynchronous constraint is rejected here until they settle. Use
	/// [`submit_settled`](Self::submit_settled) to wait for them.
	pub fn submit(&mut self, handler: impl FnOnce(&FormData)) -> SubmitOutcome {
		force::validate_all(&mut self.tree, &mut self.scheduler);
		let pending = self.scheduler.in_flight();
		if pending > 0 {
			self.has_error = true;
			warn!(pending, "form.submit.pending");
			return SubmitOutcome::Rejected;
		}
		self.finish_submit(handler)
	}

	/// Like [`submit`](Self::submit), but waits for every validation the
	/// forced pass started before checking for errors.
	pub async fn submit_settled(&mut self, handler: impl FnOnce(&FormData)) -> SubmitOutcome {
		force::validate_all(&mut self.tree, &mut self.scheduler);
		self.settle().await;
		self.finish_submit(handler)
	}

	fn finish_submit(&mut self, handler: impl FnOnce(&FormData)) -> SubmitOutcome {
		self.has_error = self.tree.has_errors();
		if self.has_error {
			warn!("form.submit.rejected");
			return SubmitOutcome::Rejected;
		}
		let _ = self.populate();
		handler(&self.data);
		self.is_submitted = true;
		debug!("form.submit");
		SubmitOutcome::Submitted
	}

	/// Applies settled asynchronous validations and runs debounced ones that
	/// came due. Returns the paths whose validation state changed.
	pub fn poll_validations(&mut self) -> Vec<String> {
		self.poll_validations_at(Instant::now())
	}

	pub fn poll_validations_at(&mut self, now: Instant) -> Vec<String> {
		let settled = self.scheduler.poll_settled();
		let mut updated = ValidationScheduler::apply_settled(&mut self.tree, settled);
		for path in self.scheduler.due_debounced(now) {
			let Ok(siblings) = self.tree.siblings_of(&path) else {
				continue;
			};
			let Ok(field) = self.tree.plain_mut(&path) else {
				continue;
			};
			if self.scheduler.validate_at(field, siblings.as_ref(), ValidationMode::Flush, now) == ValidationRun::Completed {
				updated.push(path);
			}
		}
		if !updated.is_empty() {
			self.has_error = self.tree.has_errors();
		}
		updated
	}

	/// Waits until no validation is in flight or held by a debounce policy,
	/// applying every result as it arrives.
	pub async fn settle(&mut self) {
		loop {
			while let Some(settled) = self.scheduler.next_settled().await {
				ValidationScheduler::apply_settled(&mut self.tree, vec![settled]);
			}
			let Some(deadline) = self.scheduler.next_debounce_deadline() else {
				break;
			};
			tokio::time::sleep_until(deadline).await;
			self.poll_validations_at(Instant::now());
		}
		self.has_error = self.tree.has_errors();
	}

	/// Cancels every validation in flight. Their results are never applied.
	pub fn dispose(&mut self) {
		self.scheduler.cancel_all();
		debug!("form.dispose");
	}

	/// Reconciles against the current data and schema. Returns `true` if
	/// writing the tree back changed the data's value.
	fn rebuild(&mut self) -> bool {
		self.tree = Reconciler::new(&mut self.scheduler).reconcile(&self.data, &self.schema, Some(&self.tree));
		let tree = &self.tree;
		self.scheduler.retain(|path| tree.contains(path));
		self.has_error = self.tree.has_errors();
		self.populate()
	}

	/// Writes the tree back into the external data.
	fn populate(&mut self) -> bool {
		let data = to_external_data(&self.tree, &self.data);
		let changed = data != self.data;
		self.data = data;
		changed
	}

	fn notify_data(&mut self) {
		if let Some(observer) = self.observer.as_mut() {
			observer.data_changed(&self.data);
		}
	}

	fn notify_field(&mut self, path: &str, value: &Value) {
		if let Some(observer) = self.observer.as_mut() {
			observer.field_updated(path, value);
		}
	}
}

impl Drop for Form {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl fmt::Debug for Form {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Form")
			.field("data", &self.data)
			.field("has_error", &self.has_error)
			.field("is_submitted", &self.is_submitted)
			.field("scheduler", &self.scheduler)
			.finish_non_exhaustive()
	}
}
