//! SQL emission visitor.
//!
//! Every source node renders as a derived table `(select ...) as [tN]`. Field
//! references render in one of two positions:
//!
//! - value position, `[tN].[fK]`: the field as seen from the active source,
//!   qualified by the alias of the child that exposes it;
//! - declaration position, `<value> as [fK]`: a node declaring one of its own
//!   output columns.
//!
//! Literals only ever become placeholders; their values go to the registry.

use serde::Serialize;
use tracing::debug;

use crate::ast::{
    AggregateFunction, AggregateNode, CompositeNode, CompositeOp, ContainsNode, Direction, Expr,
    FieldDescriptor, FieldExpr, FieldNode, JoinKind, JoinNode, LiteralNode, Ordering,
    PredicateNode, ScalarNode, SelectNode, SourceKind, SourceNode, TableNode, ValueNode,
    WhereNode,
};
use crate::error::{TreeqlError, TreeqlResult};
use crate::transpiler::dialect::Dialect;
use crate::transpiler::registry::{AliasRegistry, Parameters};
use crate::transpiler::resolve::resolve;
use crate::transpiler::traits::SqlGenerator;

/// One column of a compiled statement's result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputColumn {
    /// Column alias in the result set (`f0`, `f1`, ...).
    pub alias: String,
    /// Name the value is materialized under.
    pub name: String,
    /// Record key the value is grouped under.
    pub origin: String,
}

/// A compiled statement: SQL text, its bindings and the result layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    sql: String,
    parameters: Parameters,
    columns: Vec<OutputColumn>,
}

impl CompiledQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Result columns, in ordinal order.
    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    pub fn into_parts(self) -> (String, Parameters) {
        (self.sql, self.parameters)
    }
}

/// Walks a query tree and renders it for one dialect.
pub struct SqlEmitter {
    dialect: Dialect,
    generator: Box<dyn SqlGenerator + Send + Sync>,
}

impl Default for SqlEmitter {
    fn default() -> Self {
        Self::new(Dialect::default())
    }
}

impl SqlEmitter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            generator: dialect.generator(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compile `root` into an executable statement with a fresh registry.
    pub fn compile(&self, root: &SourceNode) -> TreeqlResult<CompiledQuery> {
        let mut registry = AliasRegistry::new();
        self.compile_with(root, &mut registry)
    }

    /// Compile with a caller-provided registry, cleared first.
    ///
    /// The root renders without its `( ... ) as [tN]` wrapper so the text is
    /// a statement rather than a derived table.
    pub fn compile_with(
        &self,
        root: &SourceNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<CompiledQuery> {
        registry.clear();
        let sql = self.source_body(root, registry)?;
        let parameters = registry.parameters();
        let columns = root
            .fields()
            .iter()
            .map(|field| OutputColumn {
                alias: field.alias().to_string(),
                name: field.name().to_string(),
                origin: field.origin().to_string(),
            })
            .collect();

        debug!(
            dialect = %self.dialect,
            parameters = parameters.len(),
            sql = %sql,
            "compiled query tree"
        );
        Ok(CompiledQuery {
            sql,
            parameters,
            columns,
        })
    }

    /// Render a source as a derived table: `(<body>) as [alias]`.
    pub fn visit_source(
        &self,
        source: &SourceNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let body = self.source_body(source, registry)?;
        let alias = registry.get_alias(source);
        Ok(format!("({}) as {}", body, self.quote(&alias)))
    }

    fn source_body(&self, source: &SourceNode, registry: &mut AliasRegistry) -> TreeqlResult<String> {
        match source.kind() {
            SourceKind::Table(table) => self.visit_table(source, table, registry),
            SourceKind::Select(select) => {
                self.scoped(source, registry, |r| self.visit_select(source, select, r))
            }
            SourceKind::Where(filter) => self.scoped(source, registry, |r| self.visit_where(filter, r)),
            SourceKind::Join(join) => self.scoped(source, registry, |r| self.visit_join(source, join, r)),
        }
    }

    /// Run `render` with `source` as the active source.
    fn scoped<F>(&self, source: &SourceNode, registry: &mut AliasRegistry, render: F) -> TreeqlResult<String>
    where
        F: FnOnce(&mut AliasRegistry) -> TreeqlResult<String>,
    {
        registry.enter(source);
        let result = render(registry);
        registry.leave();
        result
    }

    fn visit_table(
        &self,
        source: &SourceNode,
        table: &TableNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let physical = registry.alias_for(table.physical_id());
        let fields = self.declarations(source, registry)?;
        Ok(format!(
            "select {} from {} as {}",
            fields,
            self.quote(table.name()),
            self.quote(&physical)
        ))
    }

    fn visit_select(
        &self,
        source: &SourceNode,
        select: &SelectNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let from = self.visit_source(select.source(), registry)?;
        let fields = self.declarations(source, registry)?;
        let mut sql = format!("select {} from {}", fields, from);

        if !select.orderings().is_empty() {
            let keys = select
                .orderings()
                .iter()
                .map(|ordering| self.visit_ordering(source, ordering, registry))
                .collect::<TreeqlResult<Vec<_>>>()?;
            sql.push_str(" order by ");
            sql.push_str(&keys.join(","));
        }

        if select.is_paginated() {
            sql.push_str(&self.generator.limit_offset(select.skip(), select.take()));
        }

        Ok(sql)
    }

    fn visit_ordering(
        &self,
        source: &SourceNode,
        ordering: &Ordering,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let field = ordering.field();
        // Sorting on one of the select's own outputs sorts on what it projects.
        let key = match source.fields().find(field.id()) {
            Some(own) => self.field_expr_value(own.expr(), registry)?,
            None => self.field_reference(field, registry)?,
        };
        let direction = match ordering.direction() {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        Ok(format!("{} {}", key, direction))
    }

    fn visit_where(&self, filter: &WhereNode, registry: &mut AliasRegistry) -> TreeqlResult<String> {
        let from = self.visit_source(filter.source(), registry)?;
        let predicate = self.visit_predicate(filter.predicate(), registry)?;
        Ok(format!("select * from {} where {}", from, predicate))
    }

    fn visit_join(
        &self,
        source: &SourceNode,
        join: &JoinNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let outer = self.visit_source(join.outer(), registry)?;
        let inner = self.visit_source(join.inner(), registry)?;
        let predicate = self.visit_predicate(join.predicate(), registry)?;
        let fields = self.declarations(source, registry)?;
        let kind = match join.kind() {
            JoinKind::Inner => "join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
        };
        Ok(format!(
            "select {} from {} {} {} on {}",
            fields, outer, kind, inner, predicate
        ))
    }

    fn declarations(&self, owner: &SourceNode, registry: &mut AliasRegistry) -> TreeqlResult<String> {
        let fields = owner
            .fields()
            .iter()
            .map(|descriptor| self.declare(owner, descriptor, registry))
            .collect::<TreeqlResult<Vec<_>>>()?;
        Ok(fields.join(","))
    }

    /// Declaration position: `<reference> as [own-alias]`.
    pub fn field_declaration(
        &self,
        field: &FieldNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let owner = declaring_owner(field.source());
        self.scoped(owner, registry, |r| self.declare(owner, field.descriptor(), r))
    }

    fn declare(
        &self,
        owner: &SourceNode,
        descriptor: &FieldDescriptor,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let reference = match descriptor.expr() {
            FieldExpr::Column(column) => {
                let table = declaring_table(owner).ok_or_else(|| {
                    TreeqlError::invalid_state(format!(
                        "raw column '{}' reached through a {} node that is not backed by a table",
                        column,
                        owner.kind_name()
                    ))
                })?;
                let physical = registry.alias_for(table.physical_id());
                format!("{}.{}", self.quote(&physical), self.quote(column))
            }
            expr => self.field_expr_value(expr, registry)?,
        };
        Ok(format!("{} as {}", reference, self.quote(descriptor.alias())))
    }

    fn field_expr_value(&self, expr: &FieldExpr, registry: &mut AliasRegistry) -> TreeqlResult<String> {
        match expr {
            FieldExpr::Column(column) => Err(TreeqlError::invalid_state(format!(
                "raw column '{}' cannot be used in value position",
                column
            ))),
            FieldExpr::Field(field) => self.field_reference(field, registry),
            FieldExpr::Aggregate(aggregate) => self.visit_aggregate(aggregate, registry),
            FieldExpr::Scalar(scalar) => self.visit_scalar(scalar, registry),
        }
    }

    /// Value position: `[child-alias].[declared-alias]`, resolved against the
    /// active source.
    pub fn field_reference(
        &self,
        field: &FieldNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let active = registry.active_source()?.clone();
        let resolution = resolve(field, &active)?;
        let alias = registry.get_alias(resolution.child);
        Ok(format!(
            "{}.{}",
            self.quote(&alias),
            self.quote(resolution.descriptor.alias())
        ))
    }

    pub fn visit_predicate(
        &self,
        predicate: &PredicateNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        match predicate {
            PredicateNode::Boolean(value) => Ok(self.generator.bool_literal(*value)),
            PredicateNode::Composite(composite) => self.visit_composite(composite, registry),
            PredicateNode::Contains(contains) => self.visit_contains(contains, registry),
        }
    }

    fn visit_composite(
        &self,
        composite: &CompositeNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let left = self.visit_expr(composite.left(), registry)?;
        let right = self.visit_expr(composite.right(), registry)?;
        // `= null` never matches in SQL.
        let right_is_null = composite.right().is_null();
        let op = match composite.op() {
            CompositeOp::And => "and",
            CompositeOp::Or => "or",
            CompositeOp::Eq if right_is_null => "is",
            CompositeOp::Eq => "=",
            CompositeOp::Neq if right_is_null => "is not",
            CompositeOp::Neq => "<>",
            CompositeOp::Lt => "<",
            CompositeOp::Lte => "<=",
            CompositeOp::Gt => ">",
            CompositeOp::Gte => ">=",
        };
        Ok(format!("({} {} {})", left, op, right))
    }

    fn visit_contains(
        &self,
        contains: &ContainsNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let value = self.visit_expr(contains.value(), registry)?;
        match contains.set() {
            // The sub-select brings its own parentheses.
            Expr::Scalar(scalar) => Ok(format!("{} in {}", value, self.visit_scalar(scalar, registry)?)),
            set => Ok(format!("{} in ({})", value, self.visit_expr(set, registry)?)),
        }
    }

    pub fn visit_expr(&self, expr: &Expr, registry: &mut AliasRegistry) -> TreeqlResult<String> {
        match expr {
            Expr::Predicate(predicate) => self.visit_predicate(predicate, registry),
            Expr::Value(ValueNode::Literal(literal)) => Ok(self.visit_literal(literal, registry)),
            Expr::Value(ValueNode::Null) => Ok(self.generator.null_literal().to_string()),
            Expr::Field(field) => self.field_reference(field, registry),
            Expr::Aggregate(aggregate) => self.visit_aggregate(aggregate, registry),
            Expr::Scalar(scalar) => self.visit_scalar(scalar, registry),
        }
    }

    fn visit_literal(&self, literal: &LiteralNode, registry: &mut AliasRegistry) -> String {
        literal
            .values()
            .iter()
            .map(|value| self.generator.placeholder(registry.bind(value)))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn visit_aggregate(
        &self,
        aggregate: &AggregateNode,
        registry: &mut AliasRegistry,
    ) -> TreeqlResult<String> {
        let function = match aggregate.function() {
            AggregateFunction::Average => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Top => {
                return Err(TreeqlError::not_supported(format!(
                    "aggregate function '{}'",
                    aggregate.function()
                )));
            }
        };
        let field = self.field_reference(aggregate.field(), registry)?;
        Ok(format!("{}({})", function, field))
    }

    /// A one-column sub-select used as a value; no alias suffix.
    fn visit_scalar(&self, scalar: &ScalarNode, registry: &mut AliasRegistry) -> TreeqlResult<String> {
        Ok(format!("({})", self.source_body(scalar.select(), registry)?))
    }

    fn quote(&self, name: &str) -> String {
        self.generator.quote_identifier(name)
    }
}

/// The node that declares the fields `source` exposes. Filters share the
/// field set of their input and never declare anything themselves.
fn declaring_owner(source: &SourceNode) -> &SourceNode {
    let mut current = source;
    while let SourceKind::Where(filter) = current.kind() {
        current = filter.source();
    }
    current
}

fn declaring_table(owner: &SourceNode) -> Option<&TableNode> {
    declaring_owner(owner).as_table()
}
