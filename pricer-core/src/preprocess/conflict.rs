//! Conflict graph over compound items.

/// Symmetric adjacency over compound item indices.
///
/// Invariant: no item appears in its own adjacency list, and every edge
/// is stored in both directions.
#[derive(Debug, Clone)]
pub struct ConflictGraph {
    adjacency: Vec<Vec<usize>>,
}

impl ConflictGraph {
    /// Build from canonical exclusion pairs over `num_items` items.
    pub fn new(num_items: usize, pairs: &[(usize, usize)]) -> Self {
        let mut adjacency = vec![Vec::new(); num_items];
        for &(a, b) in pairs {
            if a == b {
                continue;
            }
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
            neighbors.dedup();
        }
        Self { adjacency }
    }

    /// Items excluded by item i.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.adjacency[i]
    }

    /// Whether items a and b exclude each other.
    pub fn conflicts(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].binary_search(&b).is_ok()
    }

    /// Whether the graph has no edges.
    pub fn is_edgeless(&self) -> bool {
        self.adjacency.iter().all(|n| n.is_empty())
    }

    /// Number of items the graph is defined over.
    pub fn num_items(&self) -> usize {
        self.adjacency.len()
    }

    /// All edges as canonical (min, max) pairs.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (a, neighbors) in self.adjacency.iter().enumerate() {
            for &b in neighbors {
                if a < b {
                    out.push((a, b));
                }
            }
        }
        out
    }
}
