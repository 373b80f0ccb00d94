//! Human-readable query plans.
//!
//! The explainer walks the same trees as the SQL emitter but prints one line
//! per source node with its clauses underneath, inputs indented below their
//! consumer. Literal values are printed inline; the output is never executed.

use std::fmt::{Result, Write};

use crate::ast::{
    AggregateNode, CompositeOp, Direction, Expr, FieldExpr, FieldNode, JoinKind, LiteralNode,
    PredicateNode, SourceKind, SourceNode, ValueNode,
};

pub struct Explainer {
    indent_level: usize,
    buffer: String,
}

impl Default for Explainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Explainer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            buffer: String::new(),
        }
    }

    pub fn format(mut self, root: &SourceNode) -> std::result::Result<String, std::fmt::Error> {
        self.visit_source(root)?;
        Ok(self.buffer)
    }

    fn indent(&mut self) -> Result {
        for _ in 0..self.indent_level {
            write!(self.buffer, "  ")?;
        }
        Ok(())
    }

    fn line(&mut self, text: &str) -> Result {
        self.indent()?;
        writeln!(self.buffer, "{}", text)
    }

    fn visit_source(&mut self, source: &SourceNode) -> Result {
        match source.kind() {
            SourceKind::Table(table) => {
                let columns: Vec<&str> = source.fields().iter().map(|f| f.name()).collect();
                self.line(&format!(
                    "table {} as {} [{}]",
                    table.name(),
                    table.alias(),
                    columns.join(", ")
                ))
            }
            SourceKind::Select(select) => {
                let fields = source
                    .fields()
                    .iter()
                    .map(|descriptor| field_expr(descriptor.expr()))
                    .collect::<Vec<_>>();
                self.line(&format!("select {}", fields.join(", ")))?;

                self.indent_level += 1;
                if !select.orderings().is_empty() {
                    let keys = select
                        .orderings()
                        .iter()
                        .map(|ordering| {
                            let direction = match ordering.direction() {
                                Direction::Ascending => "asc",
                                Direction::Descending => "desc",
                            };
                            format!("{} {}", field(ordering.field()), direction)
                        })
                        .collect::<Vec<_>>();
                    self.line(&format!("order by {}", keys.join(", ")))?;
                }
                if select.skip() > 0 {
                    self.line(&format!("skip {}", select.skip()))?;
                }
                if let Some(take) = select.take() {
                    self.line(&format!("take {}", take))?;
                }
                self.visit_source(select.source())?;
                self.indent_level -= 1;
                Ok(())
            }
            SourceKind::Where(filter) => {
                self.line(&format!("where {}", predicate(filter.predicate())))?;
                self.indent_level += 1;
                self.visit_source(filter.source())?;
                self.indent_level -= 1;
                Ok(())
            }
            SourceKind::Join(join) => {
                let kind = match join.kind() {
                    JoinKind::Inner => "join",
                    JoinKind::Left => "left join",
                    JoinKind::Right => "right join",
                };
                let fields = source
                    .fields()
                    .iter()
                    .map(|descriptor| field_expr(descriptor.expr()))
                    .collect::<Vec<_>>();
                self.line(&format!("{} [{}]", kind, fields.join(", ")))?;

                self.indent_level += 1;
                self.line(&format!("on {}", predicate(join.predicate())))?;
                self.visit_source(join.outer())?;
                self.visit_source(join.inner())?;
                self.indent_level -= 1;
                Ok(())
            }
        }
    }
}

fn field(field: &FieldNode) -> String {
    format!("{}.{}", field.origin(), field.name())
}

fn aggregate(node: &AggregateNode) -> String {
    format!("{}({})", node.function().label(), field(node.field()))
}

fn field_expr(expr: &FieldExpr) -> String {
    match expr {
        FieldExpr::Column(column) => column.clone(),
        FieldExpr::Field(f) => field(f),
        FieldExpr::Aggregate(node) => aggregate(node),
        FieldExpr::Scalar(scalar) => format!("scalar({})", field(scalar.field())),
    }
}

fn predicate(node: &PredicateNode) -> String {
    match node {
        PredicateNode::Boolean(value) => value.to_string(),
        PredicateNode::Composite(composite) => {
            let op = match composite.op() {
                CompositeOp::And => "and",
                CompositeOp::Or => "or",
                CompositeOp::Eq => "=",
                CompositeOp::Neq => "<>",
                CompositeOp::Lt => "<",
                CompositeOp::Lte => "<=",
                CompositeOp::Gt => ">",
                CompositeOp::Gte => ">=",
            };
            format!("({} {} {})", expr(composite.left()), op, expr(composite.right()))
        }
        PredicateNode::Contains(contains) => {
            format!("{} in {}", expr(contains.value()), expr(contains.set()))
        }
    }
}

fn expr(expr: &Expr) -> String {
    match expr {
        Expr::Predicate(node) => predicate(node),
        Expr::Value(ValueNode::Null) => "null".to_string(),
        Expr::Value(ValueNode::Literal(LiteralNode::Scalar(value))) => value.to_string(),
        Expr::Value(ValueNode::Literal(LiteralNode::Array(values))) => {
            let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            format!("({})", values.join(", "))
        }
        Expr::Field(f) => field(f),
        Expr::Aggregate(node) => aggregate(node),
        Expr::Scalar(scalar) => format!("scalar({})", field(scalar.field())),
    }
}
