use arbor_core::FormData;
use serde_json::Value;

/// Receives notifications from a [`Form`](crate::Form).
///
/// Every method defaults to doing nothing.
pub trait FormObserver: Send {
	/// The external data object was replaced.
	fn data_changed(&mut self, _data: &FormData) {}

	/// A value was written at `path` (external form, list items by index).
	fn field_updated(&mut self, _path: &str, _value: &Value) {}
}
