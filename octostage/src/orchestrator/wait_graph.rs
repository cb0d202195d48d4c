//! Wait-for graph between in-flight artboard loads.
//!
//! While the owner of artboard A's load waits for dependency B, the graph
//! holds the edge `A → B`. An edge whose target can already reach its source
//! would close a cycle: the loads involved would wait on each other forever.
//! [`WaitGraph::enter`] refuses such an edge and reports the cycle instead.
//!
//! This covers both a component cycle inside one call chain and two
//! independent callers whose loads end up waiting on each other.

use crate::error::StageError;
use crate::ids::ArtboardId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct WaitGraph {
    /// from -> (to -> multiplicity)
    edges: Mutex<HashMap<ArtboardId, HashMap<ArtboardId, usize>>>,
}

impl WaitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `from` waits for `to` until the returned guard drops.
    ///
    /// Fails with `DependencyCycle` when the edge would close a cycle. The
    /// reported path starts and ends with `from`.
    pub fn enter(&self, from: &ArtboardId, to: &ArtboardId) -> Result<WaitEdge<'_>, StageError> {
        let mut edges = self.edges.lock();

        if let Some(path) = find_path(&edges, to, from) {
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(from.clone());
            cycle.extend(path);
            return Err(StageError::DependencyCycle(cycle));
        }

        *edges
            .entry(from.clone())
            .or_default()
            .entry(to.clone())
            .or_default() += 1;

        Ok(WaitEdge {
            graph: self,
            from: from.clone(),
            to: to.clone(),
        })
    }

    fn leave(&self, from: &ArtboardId, to: &ArtboardId) {
        let mut edges = self.edges.lock();
        if let Some(targets) = edges.get_mut(from) {
            if let Some(count) = targets.get_mut(to) {
                *count -= 1;
                if *count == 0 {
                    targets.remove(to);
                }
            }
            if targets.is_empty() {
                edges.remove(from);
            }
        }
    }

    /// Number of distinct waiting edges.
    pub fn edge_count(&self) -> usize {
        self.edges.lock().values().map(HashMap::len).sum()
    }
}

/// Breadth-first search for a path `start → ... → goal`.
///
/// The returned path includes both ends. A self-edge request (`start ==
/// goal`) yields the single-node path.
fn find_path(
    edges: &HashMap<ArtboardId, HashMap<ArtboardId, usize>>,
    start: &ArtboardId,
    goal: &ArtboardId,
) -> Option<Vec<ArtboardId>> {
    if start == goal {
        return Some(vec![start.clone()]);
    }

    let mut parents: HashMap<&ArtboardId, &ArtboardId> = HashMap::new();
    let mut seen: HashSet<&ArtboardId> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        let Some(targets) = edges.get(node) else {
            continue;
        };
        for next in targets.keys() {
            if !seen.insert(next) {
                continue;
            }
            parents.insert(next, node);
            if next == goal {
                let mut path = vec![next.clone()];
                let mut current = next;
                while let Some(parent) = parents.get(current) {
                    path.push((*parent).clone());
                    current = *parent;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }

    None
}

/// An edge in the wait-for graph, removed on drop.
#[derive(Debug)]
pub struct WaitEdge<'a> {
    graph: &'a WaitGraph,
    from: ArtboardId,
    to: ArtboardId,
}

impl Drop for WaitEdge<'_> {
    fn drop(&mut self) {
        self.graph.leave(&self.from, &self.to);
    }
}
