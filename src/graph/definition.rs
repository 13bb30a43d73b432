// src/graph/definition.rs

//! Task definitions as stored in the registry.

use std::fmt;
use std::sync::Arc;

use crate::exec::{LeafUnit, SharedLeaf};
use crate::types::{TaskKind, TaskName};

/// A registered unit of work: a leaf owning an executable unit, or a
/// composite listing child task names.
///
/// Child names are resolved when the task runs, so a composite may be
/// registered before its children.
#[derive(Clone)]
pub enum TaskDefinition {
    Leaf(SharedLeaf),
    Series(Vec<TaskName>),
    Parallel(Vec<TaskName>),
}

impl TaskDefinition {
    pub fn leaf(unit: impl LeafUnit + 'static) -> Self {
        TaskDefinition::Leaf(Arc::new(unit))
    }

    pub fn series<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        TaskDefinition::Series(children.into_iter().map(Into::into).collect())
    }

    pub fn parallel<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        TaskDefinition::Parallel(children.into_iter().map(Into::into).collect())
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            TaskDefinition::Leaf(_) => TaskKind::Leaf,
            TaskDefinition::Series(_) => TaskKind::Series,
            TaskDefinition::Parallel(_) => TaskKind::Parallel,
        }
    }

    /// Child task names (empty for leaves).
    pub fn children(&self) -> &[TaskName] {
        match self {
            TaskDefinition::Leaf(_) => &[],
            TaskDefinition::Series(children) | TaskDefinition::Parallel(children) => children,
        }
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskDefinition::Leaf(unit) => f.debug_tuple("Leaf").field(&unit.describe()).finish(),
            TaskDefinition::Series(children) => f.debug_tuple("Series").field(children).finish(),
            TaskDefinition::Parallel(children) => {
                f.debug_tuple("Parallel").field(children).finish()
            }
        }
    }
}
