use serde::{Deserialize, Serialize};

use crate::ast::{AggregateNode, FieldNode, LiteralNode, ScalarNode, ValueNode};

/// Boolean-valued node, used by filters, join conditions and composites.
#[derive(Debug, Clone)]
pub enum PredicateNode {
    Boolean(bool),
    Composite(CompositeNode),
    Contains(ContainsNode),
}

/// Binary operator node.
#[derive(Debug, Clone)]
pub struct CompositeNode {
    left: Box<Expr>,
    right: Box<Expr>,
    op: CompositeOp,
}

impl CompositeNode {
    pub fn new(left: impl Into<Expr>, op: CompositeOp, right: impl Into<Expr>) -> Self {
        Self {
            left: Box::new(left.into()),
            right: Box::new(right.into()),
            op,
        }
    }

    pub fn left(&self) -> &Expr {
        &self.left
    }

    pub fn right(&self) -> &Expr {
        &self.right
    }

    pub fn op(&self) -> CompositeOp {
        self.op
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeOp {
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl std::fmt::Display for CompositeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompositeOp::And => "And",
            CompositeOp::Or => "Or",
            CompositeOp::Eq => "Eq",
            CompositeOp::Neq => "Neq",
            CompositeOp::Lt => "Lt",
            CompositeOp::Lte => "Lte",
            CompositeOp::Gt => "Gt",
            CompositeOp::Gte => "Gte",
        };
        write!(f, "{}", name)
    }
}

/// Set membership: `value in (set)`.
#[derive(Debug, Clone)]
pub struct ContainsNode {
    set: Box<Expr>,
    value: Box<Expr>,
}

impl ContainsNode {
    pub fn new(set: impl Into<Expr>, value: impl Into<Expr>) -> Self {
        Self {
            set: Box::new(set.into()),
            value: Box::new(value.into()),
        }
    }

    pub fn set(&self) -> &Expr {
        &self.set
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }
}

/// Operand of a composite or containment test.
#[derive(Debug, Clone)]
pub enum Expr {
    Predicate(PredicateNode),
    Value(ValueNode),
    Field(FieldNode),
    Aggregate(AggregateNode),
    Scalar(ScalarNode),
}

impl Expr {
    pub fn null() -> Self {
        Expr::Value(ValueNode::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Expr::Value(ValueNode::Null))
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldNode>) {
        match self {
            Expr::Predicate(predicate) => predicate.collect_fields(out),
            Expr::Field(field) => out.push(field),
            Expr::Aggregate(aggregate) => out.push(aggregate.field()),
            // A sub-select resolves against its own sources.
            Expr::Value(_) | Expr::Scalar(_) => {}
        }
    }
}

impl PredicateNode {
    pub fn boolean(value: bool) -> Self {
        PredicateNode::Boolean(value)
    }

    pub fn composite(left: impl Into<Expr>, op: CompositeOp, right: impl Into<Expr>) -> Self {
        PredicateNode::Composite(CompositeNode::new(left, op, right))
    }

    pub fn and(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::And, right)
    }

    pub fn or(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::Or, right)
    }

    pub fn eq(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::Eq, right)
    }

    pub fn neq(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::Neq, right)
    }

    pub fn lt(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::Lt, right)
    }

    pub fn lte(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::Lte, right)
    }

    pub fn gt(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::Gt, right)
    }

    pub fn gte(left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Self::composite(left, CompositeOp::Gte, right)
    }

    /// `value in (set)`.
    pub fn contains(set: impl Into<Expr>, value: impl Into<Expr>) -> Self {
        PredicateNode::Contains(ContainsNode::new(set, value))
    }

    /// Field references that must resolve against the enclosing node.
    pub fn fields(&self) -> Vec<&FieldNode> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldNode>) {
        match self {
            PredicateNode::Boolean(_) => {}
            PredicateNode::Composite(composite) => {
                composite.left.collect_fields(out);
                composite.right.collect_fields(out);
            }
            PredicateNode::Contains(contains) => {
                contains.set.collect_fields(out);
                contains.value.collect_fields(out);
            }
        }
    }
}

impl From<PredicateNode> for Expr {
    fn from(predicate: PredicateNode) -> Self {
        Expr::Predicate(predicate)
    }
}

impl From<ValueNode> for Expr {
    fn from(value: ValueNode) -> Self {
        Expr::Value(value)
    }
}

impl From<LiteralNode> for Expr {
    fn from(literal: LiteralNode) -> Self {
        Expr::Value(ValueNode::Literal(literal))
    }
}

impl From<FieldNode> for Expr {
    fn from(field: FieldNode) -> Self {
        Expr::Field(field)
    }
}

impl From<&FieldNode> for Expr {
    fn from(field: &FieldNode) -> Self {
        Expr::Field(field.clone())
    }
}

impl From<AggregateNode> for Expr {
    fn from(aggregate: AggregateNode) -> Self {
        Expr::Aggregate(aggregate)
    }
}

impl From<ScalarNode> for Expr {
    fn from(scalar: ScalarNode) -> Self {
        Expr::Scalar(scalar)
    }
}

macro_rules! literal_expr_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Expr::from(LiteralNode::from(v))
                }
            }
        )*
    };
}

literal_expr_from!(i32, i64, f64, &str, String);

/// A bare `bool` operand is the boolean literal node, not a bound parameter.
impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Predicate(PredicateNode::Boolean(value))
    }
}
