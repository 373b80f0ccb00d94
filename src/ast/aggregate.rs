use serde::{Deserialize, Serialize};

use crate::ast::{FieldExpr, FieldNode, SourceNode};
use crate::error::{TreeqlError, TreeqlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Average,
    Count,
    Max,
    Min,
    Sum,
    Top,
}

impl AggregateFunction {
    /// Short lowercase name used in materialized column names.
    pub fn label(&self) -> &'static str {
        match self {
            AggregateFunction::Average => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Top => "top",
        }
    }
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AggregateFunction::Average => "Average",
            AggregateFunction::Count => "Count",
            AggregateFunction::Max => "Max",
            AggregateFunction::Min => "Min",
            AggregateFunction::Sum => "Sum",
            AggregateFunction::Top => "Top",
        };
        write!(f, "{}", name)
    }
}

/// An aggregate function applied to one field of a source.
#[derive(Debug, Clone)]
pub struct AggregateNode {
    source: SourceNode,
    field: FieldNode,
    function: AggregateFunction,
}

impl AggregateNode {
    pub fn new(
        source: &SourceNode,
        field: &FieldNode,
        function: AggregateFunction,
    ) -> TreeqlResult<Self> {
        if !source.fields().contains(field.id()) {
            return Err(TreeqlError::validation(format!(
                "aggregated field '{}' does not belong to the aggregate's {} source",
                field.name(),
                source.kind_name()
            )));
        }
        Ok(Self {
            source: source.clone(),
            field: field.clone(),
            function,
        })
    }

    pub fn source(&self) -> &SourceNode {
        &self.source
    }

    pub fn field(&self) -> &FieldNode {
        &self.field
    }

    pub fn function(&self) -> AggregateFunction {
        self.function
    }

    /// Materialized column name, e.g. `count(Id)`.
    pub fn label(&self) -> String {
        format!("{}({})", self.function.label(), self.field.name())
    }

    /// A select over the aggregate's source projecting only this aggregate.
    pub fn to_select(&self) -> TreeqlResult<SourceNode> {
        self.source.select([self.clone()])
    }
}

/// A select projected to exactly one field, usable as a value.
#[derive(Debug, Clone)]
pub struct ScalarNode {
    select: SourceNode,
    field: FieldNode,
}

impl ScalarNode {
    /// Select one expression of `source`.
    pub fn new(source: &SourceNode, expr: impl Into<FieldExpr>) -> TreeqlResult<Self> {
        let select = source.select([expr.into()])?;
        Self::from_select(&select)
    }

    /// Wrap an existing select. Fails unless it projects exactly one field.
    pub fn from_select(select: &SourceNode) -> TreeqlResult<Self> {
        if select.as_select().is_none() {
            return Err(TreeqlError::validation(format!(
                "a scalar must wrap a select node, got a {} node",
                select.kind_name()
            )));
        }
        if select.fields().len() != 1 {
            return Err(TreeqlError::validation(format!(
                "a scalar select must project exactly one field, got {}",
                select.fields().len()
            )));
        }
        Ok(Self {
            select: select.clone(),
            field: select.field(0)?,
        })
    }

    pub fn select(&self) -> &SourceNode {
        &self.select
    }

    /// The single projected field.
    pub fn field(&self) -> &FieldNode {
        &self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_field_must_belong_to_source() {
        let users = SourceNode::table("Users", "Users", ["Id"]).unwrap();
        let orders = SourceNode::table("Orders", "Orders", ["Id"]).unwrap();
        assert!(AggregateNode::new(&users, &orders.field(0).unwrap(), AggregateFunction::Sum).is_err());
        assert!(AggregateNode::new(&users, &users.field(0).unwrap(), AggregateFunction::Sum).is_ok());
    }

    #[test]
    fn test_scalar_arity() {
        let users = SourceNode::table("Users", "Users", ["Id", "Name"]).unwrap();
        let two = users
            .select([users.field(0).unwrap(), users.field(1).unwrap()])
            .unwrap();
        let err = ScalarNode::from_select(&two).unwrap_err();
        assert!(err.to_string().contains("exactly one field"));

        assert!(ScalarNode::from_select(&users).is_err());

        let one = ScalarNode::new(&users, users.field(1).unwrap()).unwrap();
        assert_eq!(one.field().name(), "Name");
    }

    #[test]
    fn test_aggregate_to_select() {
        let users = SourceNode::table("Users", "Users", ["Age"]).unwrap();
        let max = AggregateNode::new(&users, &users.field(0).unwrap(), AggregateFunction::Max).unwrap();
        let select = max.to_select().unwrap();
        assert_eq!(select.fields().get(0).unwrap().name(), "max(Age)");
        assert_eq!(max.function().to_string(), "Max");
    }
}
