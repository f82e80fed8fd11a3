//! Whole-tree validation for submission.

use arbor_core::FieldTree;
use arbor_validate::{FieldValidator, ValidationMode, ValidationRun};
use tracing::debug;

/// Validates every plain field in tree order, regardless of whether it was
/// touched. Fields under a composite see their siblings' current values.
///
/// Returns the number of fields that were validated or scheduled.
pub fn validate_all(tree: &mut FieldTree, validator: &mut dyn FieldValidator) -> usize {
	let mut validated = 0;
	for path in tree.plain_paths() {
		let siblings = match tree.siblings_of(&path) {
			Ok(siblings) => siblings,
			Err(err) => {
				debug!(path = %path, error = %err, "validation.force.skip");
				continue;
			}
		};
		let Ok(field) = tree.plain_mut(&path) else {
			continue;
		};
		if validator.validate(field, siblings.as_ref(), ValidationMode::Force) != ValidationRun::Skipped {
			validated += 1;
		}
	}
	debug!(validated, "validation.force");
	validated
}
