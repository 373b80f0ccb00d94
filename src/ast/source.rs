//! Row-producing nodes: tables, selects, filters and joins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::fields::{FieldSpec, NodeId};
use crate::ast::{FieldExpr, FieldNode, FieldSet, PredicateNode};
use crate::error::{require_identifier, TreeqlError, TreeqlResult};

/// Handle to an immutable row-producing node.
///
/// Cloning the handle is cheap and keeps the node's identity. Building a node
/// with the same shape twice yields two different identities, and the emitter
/// gives each its own alias.
#[derive(Debug, Clone)]
pub struct SourceNode(Arc<SourceInner>);

#[derive(Debug)]
struct SourceInner {
    id: NodeId,
    fields: Arc<FieldSet>,
    kind: SourceKind,
}

/// The concrete node behind a [`SourceNode`].
#[derive(Debug)]
pub enum SourceKind {
    Table(TableNode),
    Select(SelectNode),
    Where(WhereNode),
    Join(JoinNode),
}

/// A physical table and the raw columns read from it.
#[derive(Debug)]
pub struct TableNode {
    name: String,
    alias: String,
    physical: NodeId,
}

impl TableNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record key for every column of this table.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Identity of the `[table] as [tN]` reference inside the derived table.
    pub fn physical_id(&self) -> NodeId {
        self.physical
    }
}

/// Projection over a source, with optional ordering and pagination.
#[derive(Debug, Clone)]
pub struct SelectNode {
    source: SourceNode,
    orderings: Vec<Ordering>,
    skip: usize,
    take: Option<usize>,
}

impl SelectNode {
    pub fn source(&self) -> &SourceNode {
        &self.source
    }

    /// Primary sort first.
    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    /// `None` means unbounded.
    pub fn take(&self) -> Option<usize> {
        self.take
    }

    pub fn is_paginated(&self) -> bool {
        self.skip > 0 || self.take.is_some()
    }
}

/// Filter over a source. Exposes the source's field set unchanged.
#[derive(Debug)]
pub struct WhereNode {
    source: SourceNode,
    predicate: PredicateNode,
}

impl WhereNode {
    pub fn source(&self) -> &SourceNode {
        &self.source
    }

    pub fn predicate(&self) -> &PredicateNode {
        &self.predicate
    }
}

#[derive(Debug)]
pub struct JoinNode {
    outer: SourceNode,
    inner: SourceNode,
    predicate: PredicateNode,
    kind: JoinKind,
}

impl JoinNode {
    pub fn outer(&self) -> &SourceNode {
        &self.outer
    }

    pub fn inner(&self) -> &SourceNode {
        &self.inner
    }

    pub fn predicate(&self) -> &PredicateNode {
        &self.predicate
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "Inner"),
            JoinKind::Left => write!(f, "Left"),
            JoinKind::Right => write!(f, "Right"),
        }
    }
}

/// Which fields a join exposes.
#[derive(Debug, Clone)]
pub enum JoinProjection {
    /// Every outer field followed by every inner field.
    Both,
    Outer,
    Inner,
    /// An explicit list drawn from either side.
    Fields(Vec<FieldNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One sort key of a select.
#[derive(Debug, Clone)]
pub struct Ordering {
    field: FieldNode,
    direction: Direction,
}

impl Ordering {
    pub fn field(&self) -> &FieldNode {
        &self.field
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl SourceNode {
    fn assemble(id: NodeId, fields: Arc<FieldSet>, kind: SourceKind) -> Self {
        SourceNode(Arc::new(SourceInner { id, fields, kind }))
    }

    /// A copy of this node under a fresh identity that keeps the field set,
    /// so field references taken from `self` stay valid.
    fn derive(&self, kind: SourceKind) -> Self {
        Self::assemble(NodeId::next(), Arc::clone(&self.0.fields), kind)
    }

    /// Scan of a physical table.
    ///
    /// `alias` is the record key rows from this table are grouped under; it
    /// never appears in the SQL text.
    pub fn table<I, S>(name: &str, alias: &str, columns: I) -> TreeqlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        require_identifier(name, "table name")?;
        require_identifier(alias, "table alias")?;

        let mut specs = Vec::new();
        for column in columns {
            let column = column.into();
            require_identifier(&column, "column name")?;
            specs.push(FieldSpec {
                expr: FieldExpr::Column(column.clone()),
                name: column,
                origin: alias.to_string(),
            });
        }

        let id = NodeId::next();
        let fields = FieldSet::build(id, specs)?;
        let table = TableNode {
            name: name.to_string(),
            alias: alias.to_string(),
            physical: NodeId::next(),
        };
        Ok(Self::assemble(id, Arc::new(fields), SourceKind::Table(table)))
    }

    /// Project fields, aggregates or scalar sub-selects of this node.
    pub fn select<I, E>(&self, projection: I) -> TreeqlResult<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<FieldExpr>,
    {
        let specs = projection
            .into_iter()
            .map(|expr| self.projection_spec(expr.into()))
            .collect::<TreeqlResult<Vec<_>>>()?;

        let id = NodeId::next();
        let fields = FieldSet::build(id, specs)?;
        let select = SelectNode {
            source: self.clone(),
            orderings: Vec::new(),
            skip: 0,
            take: None,
        };
        Ok(Self::assemble(id, Arc::new(fields), SourceKind::Select(select)))
    }

    fn projection_spec(&self, expr: FieldExpr) -> TreeqlResult<FieldSpec> {
        let (name, origin) = match &expr {
            FieldExpr::Column(column) => {
                return Err(TreeqlError::validation(format!(
                    "raw column '{}' can only be declared by a table",
                    column
                )));
            }
            FieldExpr::Field(field) => {
                require_reachable(field, &[self])?;
                (field.name().to_string(), field.origin().to_string())
            }
            FieldExpr::Aggregate(aggregate) => {
                require_reachable(aggregate.field(), &[self])?;
                (aggregate.label(), aggregate.field().origin().to_string())
            }
            FieldExpr::Scalar(scalar) => {
                let field = scalar.field();
                (field.name().to_string(), field.origin().to_string())
            }
        };
        Ok(FieldSpec { expr, name, origin })
    }

    /// Keep the rows matching `predicate`.
    pub fn filter(&self, predicate: PredicateNode) -> TreeqlResult<Self> {
        for field in predicate.fields() {
            require_reachable(field, &[self])?;
        }

        let filter = WhereNode {
            source: self.clone(),
            predicate,
        };
        Ok(Self::assemble(
            NodeId::next(),
            Arc::clone(&self.0.fields),
            SourceKind::Where(filter),
        ))
    }

    /// Join `self` (outer) with `inner`. A missing predicate joins on `true`.
    pub fn join(
        &self,
        inner: &SourceNode,
        kind: JoinKind,
        predicate: Option<PredicateNode>,
        projection: JoinProjection,
    ) -> TreeqlResult<Self> {
        if self.id() == inner.id() {
            return Err(TreeqlError::validation(
                "both sides of a join are the same node, build the source twice for a self-join",
            ));
        }
        let sides = [self, inner];
        let predicate = predicate.unwrap_or(PredicateNode::Boolean(true));
        for field in predicate.fields() {
            require_reachable(field, &sides)?;
        }

        let projected = match projection {
            JoinProjection::Both => {
                let mut fields = self.all_fields()?;
                fields.extend(inner.all_fields()?);
                fields
            }
            JoinProjection::Outer => self.all_fields()?,
            JoinProjection::Inner => inner.all_fields()?,
            JoinProjection::Fields(fields) => {
                for field in &fields {
                    require_reachable(field, &sides)?;
                }
                fields
            }
        };

        let specs = projected
            .into_iter()
            .map(|field| FieldSpec {
                name: field.name().to_string(),
                origin: field.origin().to_string(),
                expr: FieldExpr::Field(field),
            })
            .collect();

        let id = NodeId::next();
        let fields = FieldSet::build(id, specs)?;
        let join = JoinNode {
            outer: self.clone(),
            inner: inner.clone(),
            predicate,
            kind,
        };
        Ok(Self::assemble(id, Arc::new(fields), SourceKind::Join(join)))
    }

    /// Sort a select. Rejected when the select is already ordered.
    pub fn order_by(&self, field: &FieldNode, direction: Direction) -> TreeqlResult<Self> {
        let select = self.require_select("order_by")?;
        if !select.orderings.is_empty() {
            return Err(TreeqlError::validation(
                "order_by on an already ordered select, use then_by",
            ));
        }
        self.with_ordering(select, field, direction)
    }

    /// Add a secondary sort key. Rejected when the select is not ordered yet.
    pub fn then_by(&self, field: &FieldNode, direction: Direction) -> TreeqlResult<Self> {
        let select = self.require_select("then_by")?;
        if select.orderings.is_empty() {
            return Err(TreeqlError::validation(
                "then_by on an unordered select, use order_by first",
            ));
        }
        self.with_ordering(select, field, direction)
    }

    fn with_ordering(
        &self,
        select: &SelectNode,
        field: &FieldNode,
        direction: Direction,
    ) -> TreeqlResult<Self> {
        if !self.fields().contains(field.id()) {
            require_reachable(field, &[&select.source])?;
        }
        let mut next = select.clone();
        next.orderings.push(Ordering {
            field: field.clone(),
            direction,
        });
        Ok(self.derive(SourceKind::Select(next)))
    }

    /// Drop the first `count` rows of a select.
    pub fn skip(&self, count: usize) -> TreeqlResult<Self> {
        let select = self.require_select("skip")?;
        let mut next = select.clone();
        next.skip = select.skip.saturating_add(count);
        next.take = select.take.map(|take| take.saturating_sub(count));
        Ok(self.derive(SourceKind::Select(next)))
    }

    /// Keep at most `count` rows of a select.
    pub fn take(&self, count: usize) -> TreeqlResult<Self> {
        let select = self.require_select("take")?;
        let mut next = select.clone();
        next.take = Some(select.take.map_or(count, |take| take.min(count)));
        Ok(self.derive(SourceKind::Select(next)))
    }

    fn require_select(&self, operation: &str) -> TreeqlResult<&SelectNode> {
        self.as_select().ok_or_else(|| {
            TreeqlError::validation(format!(
                "{} requires a select node, got a {} node",
                operation,
                self.kind_name()
            ))
        })
    }

    fn all_fields(&self) -> TreeqlResult<Vec<FieldNode>> {
        (0..self.fields().len()).map(|i| self.field(i)).collect()
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn fields(&self) -> &FieldSet {
        &self.0.fields
    }

    pub fn kind(&self) -> &SourceKind {
        &self.0.kind
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind() {
            SourceKind::Table(_) => "table",
            SourceKind::Select(_) => "select",
            SourceKind::Where(_) => "where",
            SourceKind::Join(_) => "join",
        }
    }

    /// Immediate row-producing children.
    pub fn children(&self) -> Vec<&SourceNode> {
        match self.kind() {
            SourceKind::Table(_) => Vec::new(),
            SourceKind::Select(select) => vec![&select.source],
            SourceKind::Where(filter) => vec![&filter.source],
            SourceKind::Join(join) => vec![&join.outer, &join.inner],
        }
    }

    /// Reference the field at `ordinal`.
    pub fn field(&self, ordinal: usize) -> TreeqlResult<FieldNode> {
        FieldNode::new(self.clone(), ordinal)
    }

    /// Reference the first field with the given materialized name.
    pub fn field_named(&self, name: &str) -> TreeqlResult<FieldNode> {
        let descriptor = self.fields().find_named(name).ok_or_else(|| {
            TreeqlError::validation(format!(
                "{} node has no field named '{}'",
                self.kind_name(),
                name
            ))
        })?;
        self.field(descriptor.ordinal())
    }

    pub fn as_table(&self) -> Option<&TableNode> {
        match self.kind() {
            SourceKind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&SelectNode> {
        match self.kind() {
            SourceKind::Select(select) => Some(select),
            _ => None,
        }
    }

    pub fn as_where(&self) -> Option<&WhereNode> {
        match self.kind() {
            SourceKind::Where(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn as_join(&self) -> Option<&JoinNode> {
        match self.kind() {
            SourceKind::Join(join) => Some(join),
            _ => None,
        }
    }
}

impl PartialEq for SourceNode {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SourceNode {}

fn require_reachable(field: &FieldNode, children: &[&SourceNode]) -> TreeqlResult<()> {
    if children.iter().any(|child| child.fields().contains(field.id())) {
        return Ok(());
    }
    Err(TreeqlError::validation(format!(
        "field '{}' ({}) is not exposed by any input of this node",
        field.name(),
        field.alias()
    )))
}
