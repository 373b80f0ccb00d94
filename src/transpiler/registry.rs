//! Per-compilation alias and parameter allocation.

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::{NodeId, SourceNode, Value};
use crate::error::{TreeqlError, TreeqlResult};

/// Placeholder name → bound value, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parameters(Vec<(String, Value)>);

impl Parameters {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Values in binding order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, v)| v)
    }
}

/// Hands out `t{n}` aliases per node identity and `p{n}` placeholders per
/// distinct value.
///
/// One registry serves one compilation. It also tracks which source is
/// currently being rendered, since a field reference carries no lexical
/// pointer to the scope it is used in.
#[derive(Debug, Default)]
pub struct AliasRegistry {
    aliases: HashMap<NodeId, usize>,
    alias_order: Vec<NodeId>,
    parameters: Vec<(String, Value)>,
    active: Vec<SourceNode>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset both counters and the active-source stack.
    pub fn clear(&mut self) {
        self.aliases.clear();
        self.alias_order.clear();
        self.parameters.clear();
        self.active.clear();
    }

    /// Alias of a source node, allocated on first sight.
    pub fn get_alias(&mut self, source: &SourceNode) -> String {
        self.alias_for(source.id())
    }

    pub(crate) fn alias_for(&mut self, id: NodeId) -> String {
        let next = self.alias_order.len();
        let index = *self.aliases.entry(id).or_insert_with(|| {
            self.alias_order.push(id);
            next
        });
        format!("t{}", index)
    }

    /// Reverse lookup of an alias handed out in this pass.
    pub fn node_for_alias(&self, alias: &str) -> Option<NodeId> {
        let index: usize = alias.strip_prefix('t')?.parse().ok()?;
        self.alias_order.get(index).copied()
    }

    /// Placeholder name for a value; equal values share one placeholder.
    pub fn create_parameter(&mut self, value: &Value) -> String {
        let index = self.bind(value);
        self.parameters[index].0.clone()
    }

    /// Index of the placeholder bound to `value`.
    pub(crate) fn bind(&mut self, value: &Value) -> usize {
        if let Some(index) = self.parameters.iter().position(|(_, v)| v == value) {
            return index;
        }
        let index = self.parameters.len();
        self.parameters.push((format!("p{}", index), value.clone()));
        index
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn parameters(&self) -> Parameters {
        Parameters(self.parameters.clone())
    }

    pub fn into_parameters(self) -> Parameters {
        Parameters(self.parameters)
    }

    /// Make `source` the scope field references resolve against.
    pub fn enter(&mut self, source: &SourceNode) {
        self.active.push(source.clone());
    }

    /// Return to the enclosing scope.
    pub fn leave(&mut self) {
        self.active.pop();
    }

    pub fn active_source(&self) -> TreeqlResult<&SourceNode> {
        self.active.last().ok_or_else(|| {
            TreeqlError::invalid_state("field referenced outside of any active source")
        })
    }
}
