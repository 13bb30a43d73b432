// src/graph/registry.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::errors::{BuildweaveError, Result};
use crate::graph::definition::TaskDefinition;
use crate::types::TaskName;

/// DFS marker used while resolving a task subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// All registered tasks, keyed by name.
///
/// Registration order is remembered so listings (dry-run, diagnostics) are
/// stable.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskName, TaskDefinition>,
    order: Vec<TaskName>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `definition` under `name`.
    ///
    /// Fails with [`BuildweaveError::DuplicateTask`] if the name is taken; the
    /// existing definition is left untouched.
    pub fn register(&mut self, name: impl Into<TaskName>, definition: TaskDefinition) -> Result<()> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(BuildweaveError::DuplicateTask(name));
        }

        debug!(task = %name, kind = %definition.kind(), "registered task");
        self.order.push(name.clone());
        self.tasks.insert(name, definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Walk every task reachable from `root` and make sure the subtree can
    /// run: every name exists and nothing is its own descendant.
    ///
    /// The walk uses an explicit stack, so a cyclic graph is reported as
    /// [`BuildweaveError::CyclicGraph`] (with the offending path) instead of
    /// recursing forever.
    pub fn resolve(&self, root: &str) -> Result<()> {
        let (root, _) = self
            .tasks
            .get_key_value(root)
            .ok_or_else(|| BuildweaveError::UnknownTask(root.to_string()))?;

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        marks.insert(root.as_str(), Mark::OnStack);

        while let Some(top) = stack.len().checked_sub(1) {
            let (name, next_child) = stack[top];
            let children = self.tasks.get(name).map(|d| d.children()).unwrap_or(&[]);

            let Some(child) = children.get(next_child) else {
                marks.insert(name, Mark::Done);
                stack.pop();
                continue;
            };
            stack[top].1 += 1;

            match marks.get(child.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::OnStack) => {
                    let mut path: Vec<&str> = stack
                        .iter()
                        .map(|(n, _)| *n)
                        .skip_while(|n| *n != child.as_str())
                        .collect();
                    path.push(child.as_str());
                    return Err(BuildweaveError::CyclicGraph(path.join(" -> ")));
                }
                None => {
                    let Some((child_key, _)) = self.tasks.get_key_value(child.as_str()) else {
                        warn!(task = %name, child = %child, "reference to unregistered task");
                        return Err(BuildweaveError::UnknownTask(child.clone()));
                    };
                    marks.insert(child_key.as_str(), Mark::OnStack);
                    stack.push((child_key.as_str(), 0));
                }
            }
        }

        Ok(())
    }

    /// Check the whole registry: every child reference exists and the graph
    /// is acyclic.
    pub fn validate(&self) -> Result<()> {
        // Edge direction: parent -> child.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in self.names() {
            graph.add_node(name);
        }

        for name in self.names() {
            let children = self.tasks.get(name).map(|d| d.children()).unwrap_or(&[]);
            for child in children {
                if !self.tasks.contains_key(child) {
                    warn!(task = %name, child = %child, "reference to unregistered task");
                    return Err(BuildweaveError::UnknownTask(child.clone()));
                }
                graph.add_edge(name, child.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => {
                let node = cycle.node_id();
                // Re-resolve from the offending node to get a readable path.
                match self.resolve(node) {
                    Err(err @ BuildweaveError::CyclicGraph(_)) => Err(err),
                    _ => Err(BuildweaveError::CyclicGraph(format!(
                        "cycle involving task '{node}'"
                    ))),
                }
            }
        }
    }
}
