//! Dotted path addressing.
//!
//! Every node in a field tree carries a dotted path (`profile.emails.<token>`)
//! that is unique within the tree. The same dotted form, with list indices in
//! place of identity tokens, addresses locations in the external data object.
//!
//! [`to_tree_path`] expands a dotted path into the steps needed to descend a
//! field tree: a [`TreeStep::Children`] step sits between every pair of keys,
//! standing for the descent from a container node into its child mapping.

use std::fmt;

use smallvec::SmallVec;

use crate::error::FormError;
use crate::identity::IdentityToken;

/// Segment separator for dotted paths.
pub const SEPARATOR: char = '.';

/// One step of a descent through a field tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreeStep {
	/// Select a child by name, identity token string or list index.
	Key(String),
	/// Descend from a container node into its child mapping.
	Children,
}

/// Sequence of steps locating a node in a field tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreePath(SmallVec<[TreeStep; 8]>);

impl TreePath {
	/// Returns the steps in descent order.
	pub fn steps(&self) -> &[TreeStep] {
		&self.0
	}

	/// Returns the keys only, skipping container steps.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.iter().filter_map(|step| match step {
			TreeStep::Key(key) => Some(key.as_str()),
			TreeStep::Children => None,
		})
	}

	/// Number of steps, container steps included.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` if the path has no steps.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for TreePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, step) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str("/")?;
			}
			match step {
				TreeStep::Key(key) => f.write_str(key)?,
				TreeStep::Children => f.write_str("*")?,
			}
		}
		Ok(())
	}
}

/// Splits a dotted path into its segments.
///
/// Fails on an empty path or any empty segment (`a..b`, `.a`, `a.`).
pub fn segments(path: &str) -> Result<SmallVec<[&str; 8]>, FormError> {
	if path.is_empty() {
		return Err(FormError::MalformedPath(path.to_string()));
	}
	let parts: SmallVec<[&str; 8]> = path.split(SEPARATOR).collect();
	if parts.iter().any(|part| part.is_empty()) {
		return Err(FormError::MalformedPath(path.to_string()));
	}
	Ok(parts)
}

/// Returns the last segment of a dotted path.
pub fn field_name_from_path(path: &str) -> Result<&str, FormError> {
	let parts = segments(path)?;
	Ok(parts[parts.len() - 1])
}

/// Returns the path of the parent node, or `None` for a root-level path.
pub fn parent_path(path: &str) -> Result<Option<&str>, FormError> {
	segments(path)?;
	Ok(path.rfind(SEPARATOR).map(|idx| &path[..idx]))
}

/// Joins a parent path and a child key.
pub fn child_path(parent: Option<&str>, key: &str) -> String {
	match parent {
		Some(parent) if !parent.is_empty() => format!("{parent}{SEPARATOR}{key}"),
		_ => key.to_string(),
	}
}

/// Expands a dotted path into tree descent steps.
///
/// With `identity`, the final segment is replaced by the token, mapping an
/// external list index onto the internal key of a repeatable item.
pub fn to_tree_path(path: &str, identity: Option<&IdentityToken>) -> Result<TreePath, FormError> {
	let parts = segments(path)?;
	let last = parts.len() - 1;
	let mut steps = SmallVec::with_capacity(parts.len() * 2);
	for (i, part) in parts.iter().enumerate() {
		if i > 0 {
			steps.push(TreeStep::Children);
		}
		let key = match identity {
			Some(token) if i == last => token.to_string(),
			_ => (*part).to_string(),
		};
		steps.push(TreeStep::Key(key));
	}
	Ok(TreePath(steps))
}

#[cfg(test)]
mod tests;
