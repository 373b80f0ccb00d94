//! Query tree node model.
//!
//! Nodes are immutable once built and every invariant is checked by the
//! constructor, so the emitter never sees a malformed tree.

pub mod aggregate;
pub mod fields;
pub mod predicate;
pub mod source;
pub mod values;

pub use aggregate::{AggregateFunction, AggregateNode, ScalarNode};
pub use fields::{FieldDescriptor, FieldExpr, FieldId, FieldNode, FieldSet, NodeId};
pub use predicate::{CompositeNode, CompositeOp, ContainsNode, Expr, PredicateNode};
pub use source::{
    Direction, JoinKind, JoinNode, JoinProjection, Ordering, SelectNode, SourceKind, SourceNode,
    TableNode, WhereNode,
};
pub use values::{LiteralNode, Value, ValueNode};
