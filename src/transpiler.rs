//! SQL Transpiler for query trees.
//!
//! Converts source nodes into parameterized SQL strings.

pub mod dialect;
pub mod emitter;
pub mod registry;
pub mod resolve;
pub mod sql;
pub mod traits;

#[cfg(test)]
mod tests;

use crate::ast::SourceNode;
use crate::error::TreeqlResult;

pub use dialect::Dialect;
pub use emitter::{CompiledQuery, OutputColumn, SqlEmitter};
pub use registry::{AliasRegistry, Parameters};
pub use traits::SqlGenerator;

/// Trait for compiling query trees to SQL.
pub trait ToSql {
    /// Compile using the default dialect.
    fn to_sql(&self) -> TreeqlResult<CompiledQuery> {
        self.to_sql_with_dialect(Dialect::default())
    }
    /// Compile using a specific dialect.
    fn to_sql_with_dialect(&self, dialect: Dialect) -> TreeqlResult<CompiledQuery>;
}

impl ToSql for SourceNode {
    fn to_sql_with_dialect(&self, dialect: Dialect) -> TreeqlResult<CompiledQuery> {
        SqlEmitter::new(dialect).compile(self)
    }
}
