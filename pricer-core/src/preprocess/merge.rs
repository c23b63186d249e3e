//! Union-find item merging.

use std::collections::HashSet;

use crate::error::{PricingError, PricingResult};
use crate::model::Instance;

/// Disjoint-set forest with union by size and path compression.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    /// One singleton set per element.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Representative of the set containing x.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets containing x and y.
    pub fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        let (big, small) = if self.size[rx] >= self.size[ry] {
            (rx, ry)
        } else {
            (ry, rx)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
    }

    /// Whether x and y are in the same set.
    pub fn same(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

/// A merged view of the instance under same/differ branching pairs.
///
/// Compound indices are compact and assigned in first-encounter order
/// over the original items, so the merge is deterministic.
#[derive(Debug, Clone)]
pub struct MergedItems {
    /// Original item index to compound index.
    pub belongs: Vec<usize>,

    /// Compound index to its original members.
    pub members: Vec<Vec<usize>>,

    /// Summed linear weight per compound item.
    pub mus: Vec<f64>,

    /// Summed conic weight per compound item.
    pub bs: Vec<f64>,

    /// Exclusion pairs lifted to compound indices, canonical and
    /// deduplicated.
    pub differ: Vec<(usize, usize)>,
}

impl MergedItems {
    /// Merge items under the given branching pairs.
    ///
    /// Fails when an exclusion pair has both endpoints forced into one
    /// compound item; the branching discipline upstream never creates
    /// such a node.
    pub fn build(
        instance: &Instance,
        same_pairs: &[(usize, usize)],
        differ_pairs: &[(usize, usize)],
    ) -> PricingResult<Self> {
        let n = instance.num_items();
        for &(i, j) in same_pairs.iter().chain(differ_pairs.iter()) {
            if i >= n || j >= n {
                return Err(PricingError::InvalidInput(format!(
                    "branching pair ({}, {}) out of range for {} items",
                    i, j, n
                )));
            }
        }

        let mut uf = UnionFind::new(n);
        for &(i, j) in same_pairs {
            uf.union(i, j);
        }

        // Compact compound ids in first-encounter order.
        let mut root_to_id = vec![usize::MAX; n];
        let mut belongs = Vec::with_capacity(n);
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut mus = Vec::new();
        let mut bs = Vec::new();
        for i in 0..n {
            let root = uf.find(i);
            let id = if root_to_id[root] == usize::MAX {
                let id = members.len();
                root_to_id[root] = id;
                members.push(Vec::new());
                mus.push(0.0);
                bs.push(0.0);
                id
            } else {
                root_to_id[root]
            };
            belongs.push(id);
            members[id].push(i);
            mus[id] += instance.mus[i];
            bs[id] += instance.bs[i];
        }

        let mut seen = HashSet::new();
        let mut differ = Vec::new();
        for &(i, j) in differ_pairs {
            let a = belongs[i];
            let b = belongs[j];
            if a == b {
                return Err(PricingError::Internal(format!(
                    "items {} and {} are merged but also excluded",
                    i, j
                )));
            }
            let pair = (a.min(b), a.max(b));
            if seen.insert(pair) {
                differ.push(pair);
            }
        }

        Ok(Self {
            belongs,
            members,
            mus,
            bs,
            differ,
        })
    }

    /// Number of compound items.
    pub fn num_compound(&self) -> usize {
        self.members.len()
    }

    /// Sum original rewards into compound rewards.
    pub fn aggregate_rewards(&self, rewards: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.num_compound()];
        for (i, &id) in self.belongs.iter().enumerate() {
            out[id] += rewards[i];
        }
        out
    }

    /// Expand a compound selection back to original item indices.
    pub fn expand(&self, compound: &[usize]) -> Vec<usize> {
        let mut out: Vec<usize> = compound
            .iter()
            .flat_map(|&id| self.members[id].iter().copied())
            .collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(n: usize) -> Instance {
        let mus: Vec<f64> = (0..n).map(|i| 1.0 + i as f64).collect();
        let bs: Vec<f64> = (0..n).map(|i| 0.5 * (i as f64 + 1.0)).collect();
        Instance::new(mus, bs, 1.0, 100.0).unwrap()
    }

    #[test]
    fn test_union_find_basic() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(3, 4);
        assert!(uf.same(0, 1));
        assert!(uf.same(3, 4));
        assert!(!uf.same(1, 3));

        uf.union(1, 4);
        assert!(uf.same(0, 3));
    }

    #[test]
    fn test_merge_aggregates_weights() {
        let inst = instance(4);
        let merged = MergedItems::build(&inst, &[(0, 2)], &[]).unwrap();

        assert_eq!(merged.num_compound(), 3);
        // Every original item maps to exactly one compound id.
        assert_eq!(merged.belongs.len(), 4);
        assert_eq!(merged.belongs[0], merged.belongs[2]);

        let id = merged.belongs[0];
        assert!((merged.mus[id] - (1.0 + 3.0)).abs() < 1e-12);
        assert!((merged.bs[id] - (0.5 + 1.5)).abs() < 1e-12);
        assert_eq!(merged.members[id], vec![0, 2]);
    }

    #[test]
    fn test_differ_lifted_and_deduped() {
        let inst = instance(4);
        // 0 and 1 merge; both conflict with 3, which dedups to one pair.
        let merged = MergedItems::build(&inst, &[(0, 1)], &[(0, 3), (3, 1), (2, 3)]).unwrap();

        assert_eq!(merged.differ.len(), 2);
        for &(a, b) in &merged.differ {
            assert!(a < b);
        }
    }

    #[test]
    fn test_conflicting_merge_is_error() {
        let inst = instance(3);
        let err = MergedItems::build(&inst, &[(0, 1)], &[(0, 1)]).unwrap_err();
        assert!(matches!(err, PricingError::Internal(_)));
    }

    #[test]
    fn test_out_of_range_pair() {
        let inst = instance(3);
        assert!(MergedItems::build(&inst, &[(0, 7)], &[]).is_err());
    }

    #[test]
    fn test_reward_aggregation_and_expand() {
        let inst = instance(4);
        let merged = MergedItems::build(&inst, &[(1, 3)], &[]).unwrap();

        let rewards = merged.aggregate_rewards(&[1.0, 2.0, 3.0, 4.0]);
        let id = merged.belongs[1];
        assert!((rewards[id] - 6.0).abs() < 1e-12);

        let expanded = merged.expand(&[id]);
        assert_eq!(expanded, vec![1, 3]);
    }
}
