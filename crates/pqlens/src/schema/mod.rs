//! Schema tree reconstruction and leaf column descriptors.

pub mod types;

pub use types::{ColumnDescriptor, ColumnPath, NodeId, NodeKind, NodeRef, SchemaDescriptor, SchemaNode};
