//! Field resolution against the active source.

use crate::ast::{FieldDescriptor, FieldNode, SourceNode};
use crate::error::{TreeqlError, TreeqlResult};

/// The child of the active source that exposes a field, and the entry it is
/// exposed under.
#[derive(Debug)]
pub struct Resolution<'a> {
    pub child: &'a SourceNode,
    pub descriptor: &'a FieldDescriptor,
}

/// Find the immediate child of `active` whose field set holds `field`.
///
/// Matching is by field identity. When several children hold it (a self-join,
/// or a filter next to its own source) the child the reference was taken
/// from wins; without such a child the reference is ambiguous.
pub fn resolve<'a>(field: &FieldNode, active: &'a SourceNode) -> TreeqlResult<Resolution<'a>> {
    let mut candidates: Vec<Resolution<'a>> = active
        .children()
        .into_iter()
        .filter_map(|child| {
            child
                .fields()
                .find(field.id())
                .map(|descriptor| Resolution { child, descriptor })
        })
        .collect();

    match candidates.len() {
        0 => Err(TreeqlError::invalid_state(format!(
            "field '{}' ({}) does not belong to any input of the active {} node",
            field.name(),
            field.alias(),
            active.kind_name()
        ))),
        1 => Ok(candidates.remove(0)),
        n => candidates
            .into_iter()
            .find(|candidate| candidate.child.id() == field.source().id())
            .ok_or_else(|| {
                TreeqlError::invalid_state(format!(
                    "field '{}' ({}) is exposed by {} inputs of the active {} node and none is its own source",
                    field.name(),
                    field.alias(),
                    n,
                    active.kind_name()
                ))
            }),
    }
}
