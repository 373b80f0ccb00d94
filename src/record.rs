//! Materialized result rows.
//!
//! A [`Record`] is one result row, split into [`RecordItem`]s by the table
//! alias each column derives from. Joining `Users` with `Orders` yields records
//! with a `Users` item and an `Orders` item.

use std::collections::BTreeMap;
use std::ops::{BitOr, Index};

use serde::Serialize;

use crate::ast::Value;
use crate::error::{TreeqlError, TreeqlResult};
use crate::transpiler::OutputColumn;

/// Column values of one table alias within a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordItem {
    key: String,
    values: BTreeMap<String, Value>,
}

impl RecordItem {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: BTreeMap::new(),
        }
    }

    /// The table alias this item belongs to.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add a column. A name can only be set once per item.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> TreeqlResult<()> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(TreeqlError::AmbiguousKey(format!("{}.{}", self.key, name)));
        }
        self.values.insert(name, value);
        Ok(())
    }
}

impl Index<&str> for RecordItem {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.values.get(name) {
            Some(value) => value,
            None => panic!("record item '{}' has no column '{}'", self.key, name),
        }
    }
}

/// One result row, keyed by table alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    items: BTreeMap<String, RecordItem>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group one row's values by the origin of their columns.
    ///
    /// `values` are in result-column order and must line up with `columns`.
    pub fn from_row(columns: &[OutputColumn], values: Vec<Value>) -> TreeqlResult<Self> {
        if columns.len() != values.len() {
            return Err(TreeqlError::invalid_state(format!(
                "row has {} values but the query declares {} columns",
                values.len(),
                columns.len()
            )));
        }

        let mut record = Record::new();
        for (column, value) in columns.iter().zip(values) {
            record
                .items
                .entry(column.origin.clone())
                .or_insert_with(|| RecordItem::new(column.origin.as_str()))
                .insert(column.name.as_str(), value)?;
        }
        Ok(record)
    }

    pub fn get(&self, key: &str) -> Option<&RecordItem> {
        self.items.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordItem> {
        self.items.values()
    }

    /// Add an item. Fails when its key is already taken.
    pub fn insert(&mut self, item: RecordItem) -> TreeqlResult<()> {
        if self.items.contains_key(item.key()) {
            return Err(TreeqlError::AmbiguousKey(item.key.clone()));
        }
        self.items.insert(item.key.clone(), item);
        Ok(())
    }

    /// Combine the keys of two records. Both sides must have disjoint keys.
    pub fn merge(mut self, other: Record) -> TreeqlResult<Record> {
        for item in other.items.into_values() {
            self.insert(item)?;
        }
        Ok(self)
    }
}

impl BitOr for Record {
    type Output = TreeqlResult<Record>;

    fn bitor(self, rhs: Record) -> Self::Output {
        self.merge(rhs)
    }
}

impl Index<&str> for Record {
    type Output = RecordItem;

    fn index(&self, key: &str) -> &RecordItem {
        match self.items.get(key) {
            Some(item) => item,
            None => panic!("record has no key '{}'", key),
        }
    }
}
