//! Dependency ordering of the objects in a provenance tree
//!
//! Every object below the root is discovered depth-first in recorded field order. An
//! object depends on each object directly reachable from its fields (through lists and
//! maps, but not through another object). The ordering is a topological sort of that
//! graph which breaks ties by discovery index, so it never depends on hash or
//! collection iteration order.

use super::{ObjectProvenance, ProvenanceNode};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ptr;

/// Objects of a provenance tree in dependency order
#[derive(Debug)]
pub struct ProvenanceOrdering<'a> {
    nodes: Vec<&'a ObjectProvenance>,
    /// Positions (in `nodes`) of each node's direct dependencies
    dependencies: Vec<Vec<usize>>,
}

impl<'a> ProvenanceOrdering<'a> {
    /// Number of ordered objects
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Object at `position`
    pub fn get(&self, position: usize) -> Option<&'a ObjectProvenance> {
        self.nodes.get(position).copied()
    }

    /// Component name of the object at `position`
    ///
    /// # Panics
    /// Panics if position >= len()
    pub fn name(&self, position: usize) -> String {
        compute_name(self.nodes[position].class_name(), position)
    }

    /// Positions of the direct dependencies of the object at `position`
    pub fn dependencies(&self, position: usize) -> &[usize] {
        &self.dependencies[position]
    }

    /// Position of a node of this tree, compared by identity
    pub fn position_of(&self, node: &ObjectProvenance) -> Option<usize> {
        self.nodes.iter().position(|candidate| ptr::eq(*candidate, node))
    }

    /// Iterate over `(position, object)` in dependency order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a ObjectProvenance)> + '_ {
        self.nodes.iter().copied().enumerate()
    }
}

/// Deterministic component name: lowercased short class name plus position
pub fn compute_name(class_name: &str, position: usize) -> String {
    let short = class_name
        .rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(class_name);
    format!("{}-{}", short.to_lowercase(), position)
}

/// Order the objects below `root` so that dependencies precede dependents
pub fn order(root: &ObjectProvenance) -> ProvenanceOrdering<'_> {
    let mut discovered = Vec::new();
    let mut edges = Vec::new();
    discover(root, None, &mut discovered, &mut edges);

    // dependents[d] lists the nodes waiting on d, all in discovery indices
    let n = discovered.len();
    let mut dependents = vec![Vec::new(); n];
    let mut pending = vec![0usize; n];
    for (node, deps) in edges.iter().enumerate() {
        pending[node] = deps.len();
        for &dep in deps {
            dependents[dep].push(node);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&i| pending[i] == 0)
        .map(Reverse)
        .collect();
    let mut sequence = Vec::with_capacity(n);
    while let Some(Reverse(next)) = ready.pop() {
        sequence.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }
    // A tree cannot contain cycles, so every node is emitted
    debug_assert_eq!(sequence.len(), n);

    let mut position = vec![0usize; n];
    for (pos, &node) in sequence.iter().enumerate() {
        position[node] = pos;
    }

    ProvenanceOrdering {
        nodes: sequence.iter().map(|&i| discovered[i]).collect(),
        dependencies: sequence
            .iter()
            .map(|&i| edges[i].iter().map(|&dep| position[dep]).collect())
            .collect(),
    }
}

/// Depth-first discovery below `object`; `parent` is the discovery index of `object`
fn discover<'a>(
    object: &'a ObjectProvenance,
    parent: Option<usize>,
    discovered: &mut Vec<&'a ObjectProvenance>,
    edges: &mut Vec<Vec<usize>>,
) {
    for (_, node) in object.fields() {
        discover_node(node, parent, discovered, edges);
    }
}

fn discover_node<'a>(
    node: &'a ProvenanceNode,
    parent: Option<usize>,
    discovered: &mut Vec<&'a ObjectProvenance>,
    edges: &mut Vec<Vec<usize>>,
) {
    match node {
        ProvenanceNode::Primitive(_) => {}
        ProvenanceNode::List(items) => {
            for item in items {
                discover_node(item, parent, discovered, edges);
            }
        }
        ProvenanceNode::Map(entries) => {
            for item in entries.values() {
                discover_node(item, parent, discovered, edges);
            }
        }
        ProvenanceNode::Object(child) => {
            let index = discovered.len();
            discovered.push(child);
            edges.push(Vec::new());
            if let Some(parent) = parent {
                edges[parent].push(index);
            }
            discover(child, Some(index), discovered, edges);
        }
    }
}
