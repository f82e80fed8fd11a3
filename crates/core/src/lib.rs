//! Core form state types: field paths, identity tokens, status flags, schema and the field tree.

/// External data object and its identity side table.
pub mod data;
/// Error types shared by addressing and tree operations.
pub mod error;
/// Identity tokens for repeatable items without a natural key.
pub mod identity;
/// Field tree nodes and the persistent root tree.
pub mod node;
/// Dotted path addressing.
pub mod path;
/// Declarative field configuration.
pub mod schema;
/// Projection of a field tree back into external data.
pub mod serializer;
/// Touched/dirty/validity status flags and their transitions.
pub mod status;

pub use data::{DataView, FormData};
pub use error::{DisallowedTransition, FormError, SchemaError};
pub use identity::{IdentityTable, IdentityToken, Slot, Tagged};
pub use node::{CompositeField, FieldNode, FieldTree, PlainField, RepeatableField};
pub use path::{TreePath, TreeStep, child_path, field_name_from_path, parent_path, to_tree_path};
pub use schema::{CompositeConfig, Constraints, DebouncePolicy, FieldConfig, InitialValue, PlainConfig, RepeatableConfig, RuleSet, Schema};
pub use serializer::to_external_data;
pub use status::{Status, StatusFlag, StatusFlags, Transition};
