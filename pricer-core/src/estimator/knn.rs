//! Warm-start history mapping reward vectors to observed mu regions.
//!
//! Each solved pricing call records the direction of its reward vector
//! together with the range of aggregated linear weight its relaxation
//! explored. A later call with a similar reward direction queries the
//! history and concentrates its breakpoint sample inside the predicted
//! region.

use crate::settings::KnnMode;

/// Guard against division by a zero distance for exact matches.
const DIST_EPS: f64 = 1e-12;

struct Record {
    /// Reward direction, scaled to unit sum.
    key: Vec<f64>,
    mu_lb: f64,
    mu_ub: f64,
}

/// Nearest-neighbor history over normalized reward vectors.
pub struct History {
    dim: usize,
    records: Vec<Record>,
}

impl History {
    /// Create an empty history for reward vectors of the given length.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            records: Vec::new(),
        }
    }

    /// Number of stored observations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether any observation has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record the mu region explored for a reward vector.
    ///
    /// Vectors of the wrong length or with a vanishing norm are ignored.
    pub fn record(&mut self, rewards: &[f64], mu_lb: f64, mu_ub: f64) {
        if rewards.len() != self.dim || mu_ub < mu_lb {
            return;
        }
        let Some(key) = normalize(rewards) else {
            return;
        };
        self.records.push(Record { key, mu_lb, mu_ub });
    }

    /// Predict the mu region for a reward vector from its k nearest
    /// stored neighbors.
    ///
    /// Returns `None` when the history is empty, the mode is off, or the
    /// vector cannot be normalized.
    pub fn query(&self, rewards: &[f64], k: usize, mode: KnnMode) -> Option<(f64, f64)> {
        if mode == KnnMode::Off || k == 0 || rewards.len() != self.dim || self.records.is_empty() {
            return None;
        }
        let key = normalize(rewards)?;

        // (squared distance, record index), worst neighbor last.
        let mut nearest: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        for (idx, rec) in self.records.iter().enumerate() {
            let cutoff = if nearest.len() == k {
                nearest[k - 1].0
            } else {
                f64::INFINITY
            };
            let Some(d2) = sq_dist_below(&key, &rec.key, cutoff) else {
                continue;
            };
            let pos = nearest.partition_point(|&(d, _)| d <= d2);
            nearest.insert(pos, (d2, idx));
            if nearest.len() > k {
                nearest.pop();
            }
        }

        let mut lb = 0.0;
        let mut ub = 0.0;
        let mut weight_sum = 0.0;
        for &(d2, idx) in &nearest {
            let w = match mode {
                KnnMode::Uniform => 1.0,
                KnnMode::DistanceWeighted => 1.0 / (DIST_EPS + d2.sqrt()),
                KnnMode::Off => unreachable!(),
            };
            lb += w * self.records[idx].mu_lb;
            ub += w * self.records[idx].mu_ub;
            weight_sum += w;
        }
        Some((lb / weight_sum, ub / weight_sum))
    }
}

/// Scale a vector to unit sum; `None` for a (near-)zero vector.
fn normalize(v: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = v.iter().sum();
    if total.abs() < DIST_EPS {
        return None;
    }
    Some(v.iter().map(|x| x / total).collect())
}

/// Squared distance, abandoned early once it exceeds the cutoff.
fn sq_dist_below(a: &[f64], b: &[f64], cutoff: f64) -> Option<f64> {
    let mut d2 = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = x - y;
        d2 += d * d;
        if d2 > cutoff {
            return None;
        }
    }
    Some(d2)
}
