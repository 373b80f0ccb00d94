//! Transpiler test modules.
//!
//! Tests are organized by category:
//! - `core`: node rendering, predicates, parameters and scoping errors
//! - `dialects`: quoting, placeholders and pagination per dialect
//! - `positions`: value and declaration rendering for every source kind


use crate::ast::SourceNode;

pub(super) fn users() -> SourceNode {
    SourceNode::table("Users", "Users", ["Id", "Name", "Age"]).unwrap()
}

pub(super) fn orders() -> SourceNode {
    SourceNode::table("Orders", "Orders", ["Id", "UserId", "Total"]).unwrap()
}

pub(super) const USERS_SQL: &str =
    "(select [t0].[Id] as [f0],[t0].[Name] as [f1],[t0].[Age] as [f2] from [Users] as [t0]) as [t1]";
