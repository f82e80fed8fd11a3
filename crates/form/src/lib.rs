//! Form controller for Arbor.
//!
//! [`Form`] keeps a [`FieldTree`](arbor_core::FieldTree) in step with an
//! external data object and schema: every update runs the [`Reconciler`],
//! which reuses unchanged subtrees and validates fields whose value changed
//! through an [`arbor_validate::ValidationScheduler`].

/// Whole-tree validation for submission.
pub mod force;
mod form;
mod observer;
/// Keyed reconciliation of schema and data into a field tree.
pub mod reconciler;

pub use form::{ChangeEvent, Form, SubmitOutcome};
pub use observer::FormObserver;
pub use reconciler::Reconciler;
