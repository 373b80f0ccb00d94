//! # treeql
//!
//! > **Build the tree. Bind the values.**
//!
//! treeql compiles composable, immutable query trees into parameterized SQL
//! and materializes the result rows as records keyed by table alias.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use treeql::prelude::*;
//!
//! let users = SourceNode::table("Users", "Users", ["Id", "Name", "Age"])?;
//! let adults = users
//!     .filter(PredicateNode::gte(users.field(2)?, 18))?
//!     .select([users.field(1)?])?
//!     .take(10)?;
//!
//! let compiled = adults.to_sql_with_dialect(Dialect::Sqlite)?;
//! // select [t2].[f1] as [f0] from (select * from (...) as [t1] where ([t1].[f2] >= ?1)) as [t2] limit 10 offset 0
//!
//! let records = QueryExecutor::new(Dialect::Sqlite).query(&mut conn, &adults).await?;
//! ```
//!
//! ## Building blocks
//!
//! | Node    | Renders as                                   |
//! |---------|----------------------------------------------|
//! | `table` | `select [t0].[col] as [f0] from [T] as [t0]` |
//! | `select`| projection, `order by`, pagination           |
//! | `filter`| `select * from (...) where (...)`            |
//! | `join`  | `(...) join (...) on (...)`                  |
//!
//! Literal values never appear in the SQL text; each one becomes a
//! placeholder, and equal values share one.

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod fmt;
pub mod record;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::Settings;
    pub use crate::engine::{Database, QueryExecutor};
    pub use crate::error::*;
    pub use crate::fmt::Explainer;
    pub use crate::record::{Record, RecordItem};
    pub use crate::transpiler::{CompiledQuery, Dialect, ToSql};
}

/// Render a query tree as an indented, human-readable plan.
///
/// # Example
///
/// ```
/// use treeql::ast::SourceNode;
///
/// let users = SourceNode::table("Users", "Users", ["Id", "Name"]).unwrap();
/// assert_eq!(treeql::explain(&users), "table Users as Users [Id, Name]\n");
/// ```
pub fn explain(root: &ast::SourceNode) -> String {
    fmt::Explainer::new().format(root).unwrap_or_default()
}
