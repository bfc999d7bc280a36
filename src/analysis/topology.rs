use crate::store::Registry;
use std::collections::{HashSet, VecDeque};

/// Performs a Topological Sort using Depth-First Search (DFS).
///
/// Returns registry slots where every dependency appears before its consumer.
/// Slots are visited in registration order and dependencies in declared order,
/// so the result is stable for a fixed registration sequence.
///
/// On a cycle, returns the offending id chain, closed on the repeated id
/// (`["a", "b", "a"]`).
pub fn sort(registry: &Registry) -> Result<Vec<usize>, Vec<String>> {
    let count = registry.count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];
    let mut path = Vec::new();

    // Edges point Child -> Parent; DFS post-order yields [Parent, ..., Child].
    for i in 0..count {
        if state[i] == VisitState::None {
            visit(i, registry, &mut state, &mut path, &mut order)?;
        }
    }

    Ok(order)
}

#[derive(Clone, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // Used for cycle detection
    Visited,
}

fn visit(
    slot: usize,
    registry: &Registry,
    state: &mut Vec<VisitState>,
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), Vec<String>> {
    match state[slot] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => {
            let start = path.iter().position(|&s| s == slot).unwrap_or(0);
            let chain = path[start..]
                .iter()
                .chain(std::iter::once(&slot))
                .map(|&s| registry.definitions[s].id.clone())
                .collect();
            return Err(chain);
        }
        VisitState::None => state[slot] = VisitState::Visiting,
    }

    path.push(slot);
    for &parent in registry.get_parents(slot) {
        visit(parent, registry, state, path, order)?;
    }
    path.pop();

    state[slot] = VisitState::Visited;
    order.push(slot);
    Ok(())
}

/// Identifies all slots downstream from the given start slots (inclusive).
pub fn downstream_from(registry: &Registry, start: &[usize]) -> HashSet<usize> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start.to_vec());

    while let Some(slot) = queue.pop_front() {
        if visited.insert(slot) {
            let mut edge_idx = registry.first_child[slot];
            while edge_idx != u32::MAX {
                queue.push_back(registry.child_targets[edge_idx as usize]);
                edge_idx = registry.next_child[edge_idx as usize];
            }
        }
    }
    visited
}

/// Identifies all slots upstream from the given start slots (inclusive).
pub fn upstream_from(registry: &Registry, start: &[usize]) -> HashSet<usize> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start.to_vec());

    while let Some(slot) = queue.pop_front() {
        if visited.insert(slot) {
            queue.extend(registry.get_parents(slot).iter().copied());
        }
    }
    visited
}
