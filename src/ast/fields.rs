//! Field sets and field references.
//!
//! Every source node owns an ordered [`FieldSet`]. A [`FieldNode`] points at one
//! entry of one source; two references are the same field only when they carry
//! the same [`FieldId`], whatever the column is called.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::ast::{AggregateNode, ScalarNode, SourceNode};
use crate::error::{TreeqlError, TreeqlResult};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_FIELD_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a source node. Clones of a handle share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Identity of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u64);

impl FieldId {
    fn next() -> Self {
        FieldId(NEXT_FIELD_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// What a declared field is computed from.
#[derive(Debug, Clone)]
pub enum FieldExpr {
    /// A raw column of a physical table. Only tables declare these.
    Column(String),
    /// A field of a child source.
    Field(FieldNode),
    Aggregate(AggregateNode),
    Scalar(ScalarNode),
}

impl From<FieldNode> for FieldExpr {
    fn from(field: FieldNode) -> Self {
        FieldExpr::Field(field)
    }
}

impl From<&FieldNode> for FieldExpr {
    fn from(field: &FieldNode) -> Self {
        FieldExpr::Field(field.clone())
    }
}

impl From<AggregateNode> for FieldExpr {
    fn from(aggregate: AggregateNode) -> Self {
        FieldExpr::Aggregate(aggregate)
    }
}

impl From<ScalarNode> for FieldExpr {
    fn from(scalar: ScalarNode) -> Self {
        FieldExpr::Scalar(scalar)
    }
}

/// One entry of a [`FieldSet`].
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    id: FieldId,
    ordinal: usize,
    alias: String,
    name: String,
    origin: String,
    declaring: NodeId,
    expr: FieldExpr,
}

impl FieldDescriptor {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The generated column alias (`f0`, `f1`, ...).
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Column name used when the value is materialized.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record key (table alias) the value is grouped under.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The node that declared this field.
    pub fn declaring(&self) -> NodeId {
        self.declaring
    }

    pub fn expr(&self) -> &FieldExpr {
        &self.expr
    }
}

/// Input for one field when building a [`FieldSet`].
pub(crate) struct FieldSpec {
    pub expr: FieldExpr,
    pub name: String,
    pub origin: String,
}

/// Ordered, aliased output columns of a source node.
#[derive(Debug, Clone)]
pub struct FieldSet {
    fields: Vec<FieldDescriptor>,
}

impl FieldSet {
    /// Allocate `f0..f{n-1}` in supply order.
    ///
    /// Empty sets are rejected, and so are two fields with the same name and
    /// origin: rows are materialized by origin and name, so the second column
    /// would have nowhere to go.
    pub(crate) fn build(declaring: NodeId, specs: Vec<FieldSpec>) -> TreeqlResult<Self> {
        if specs.is_empty() {
            return Err(TreeqlError::validation("field list must not be empty"));
        }
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert((spec.origin.as_str(), spec.name.as_str())) {
                return Err(TreeqlError::validation(format!(
                    "column '{}.{}' appears twice in one field list",
                    spec.origin, spec.name
                )));
            }
        }

        let fields = specs
            .into_iter()
            .enumerate()
            .map(|(ordinal, spec)| FieldDescriptor {
                id: FieldId::next(),
                ordinal,
                alias: format!("f{}", ordinal),
                name: spec.name,
                origin: spec.origin,
                declaring,
                expr: spec.expr,
            })
            .collect();

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn get(&self, ordinal: usize) -> Option<&FieldDescriptor> {
        self.fields.get(ordinal)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.find(id).is_some()
    }

    pub fn find(&self, id: FieldId) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// First field whose materialized name matches.
    pub fn find_named(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Reference to one field of one source node.
#[derive(Clone)]
pub struct FieldNode {
    source: SourceNode,
    ordinal: usize,
}

impl FieldNode {
    pub(crate) fn new(source: SourceNode, ordinal: usize) -> TreeqlResult<Self> {
        if ordinal >= source.fields().len() {
            return Err(TreeqlError::validation(format!(
                "field ordinal {} out of range for a source with {} fields",
                ordinal,
                source.fields().len()
            )));
        }
        Ok(Self { source, ordinal })
    }

    /// The source this reference was taken from.
    pub fn source(&self) -> &SourceNode {
        &self.source
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        // The ordinal is checked in `new` and field sets never change.
        &self.source.fields().fields[self.ordinal]
    }

    pub fn id(&self) -> FieldId {
        self.descriptor().id
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn alias(&self) -> &str {
        self.descriptor().alias()
    }

    pub fn name(&self) -> &str {
        self.descriptor().name()
    }

    pub fn origin(&self) -> &str {
        self.descriptor().origin()
    }

    pub fn expr(&self) -> &FieldExpr {
        self.descriptor().expr()
    }
}

impl PartialEq for FieldNode {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for FieldNode {}

impl std::fmt::Debug for FieldNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldNode")
            .field("source", &self.source.id())
            .field("alias", &self.alias())
            .field("name", &self.name())
            .finish()
    }
}
