//! Breakpoint list approximating the capacity curve.
//!
//! The conic capacity constraint `mu + dalpha * sqrt(b) <= capacity` is
//! equivalent, for `mu <= capacity`, to `dalpha^2 * b <= (capacity - mu)^2`.
//! This module samples the curve `f(x) = (capacity - x)^2` over a domain
//! `[lb, ub]`; its secants overestimate the convex curve, so the
//! piecewise-linear bound `b_sum <= pwl(mu_sum)` relaxes the cone.

/// Minimum spacing between two breakpoints on the x axis.
const MIN_GAP: f64 = 1e-9;

/// One sampled point of the capacity curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Sample position (aggregated linear weight).
    pub x: f64,

    /// Curve value `(capacity - x)^2`.
    pub fx: f64,
}

/// Sorted breakpoint list over `[lb, ub]`.
///
/// Invariant: `x` strictly increasing and `fx` strictly decreasing over
/// the whole list (the curve is sampled left of the capacity, where it is
/// strictly decreasing).
#[derive(Debug, Clone)]
pub struct Breakpoints {
    capacity: f64,
    lb: f64,
    ub: f64,
    points: Vec<Breakpoint>,
}

impl Breakpoints {
    /// Uniform sampling over the full domain `[0, capacity]`.
    pub fn uniform(capacity: f64, num_points: usize) -> Self {
        Self::with_bounds(capacity, 0.0, capacity, num_points)
    }

    /// Uniform sampling over `[lb, ub]`.
    pub fn with_bounds(capacity: f64, lb: f64, ub: f64, num_points: usize) -> Self {
        let num_points = num_points.max(10);
        let interval = (ub - lb) / (num_points - 1) as f64;

        let mut bp = Self {
            capacity,
            lb,
            ub,
            points: Vec::with_capacity(num_points),
        };
        for i in 0..num_points {
            let x = lb + interval * i as f64;
            bp.points.push(Breakpoint { x, fx: bp.fx(x) });
        }
        debug_assert!(bp.check());
        bp
    }

    /// Build from a pre-sorted x sample.
    ///
    /// Points closer than the minimum spacing are dropped; if fewer than
    /// two distinct samples remain, falls back to uniform sampling.
    pub fn from_sorted_xs(capacity: f64, lb: f64, ub: f64, xs: &[f64]) -> Self {
        let mut bp = Self {
            capacity,
            lb,
            ub,
            points: Vec::with_capacity(xs.len()),
        };
        for &x in xs {
            if let Some(last) = bp.points.last() {
                if x - last.x < MIN_GAP {
                    continue;
                }
            }
            let fx = bp.fx(x);
            bp.points.push(Breakpoint { x, fx });
        }
        if bp.points.len() < 2 {
            return Self::with_bounds(capacity, lb, ub, 10);
        }
        debug_assert!(bp.check());
        bp
    }

    /// Sampling concentrated inside `[concen_lb, concen_ub]`.
    ///
    /// A `ratio`-amplified share of the points lands inside the window;
    /// the remainder is split between the flanks in proportion to their
    /// widths. Falls back to uniform sampling when the window is nearly
    /// empty or covers the whole domain.
    pub fn concentrated(
        capacity: f64,
        lb: f64,
        ub: f64,
        num_points: usize,
        concen_lb: f64,
        concen_ub: f64,
        ratio: f64,
    ) -> Self {
        let concen_lb = concen_lb.max(lb);
        let concen_ub = concen_ub.min(ub);
        if concen_ub - concen_lb < 1e-1 || concen_ub - concen_lb >= ub - lb - MIN_GAP {
            return Self::with_bounds(capacity, lb, ub, num_points);
        }

        let num_points = num_points.max(10);
        let total = ub - lb;
        let window = concen_ub - concen_lb;
        let left_w = concen_lb - lb;
        let right_w = ub - concen_ub;
        let flank_w = left_w + right_w;

        let frac = (window / total * ratio).min(1.0);
        let num_concen = ((num_points as f64 * frac).round() as usize).max(2);
        let rem = num_points.saturating_sub(num_concen);
        let num_left = if left_w > MIN_GAP {
            (rem as f64 * left_w / flank_w) as usize + 1
        } else {
            0
        };
        let num_right = if right_w > MIN_GAP {
            (rem as f64 * right_w / flank_w) as usize + 1
        } else {
            0
        };

        let mut xs = Vec::with_capacity(num_left + num_concen + num_right);
        if num_left >= 2 {
            let interval = left_w / (num_left - 1) as f64;
            for i in 0..num_left {
                xs.push(lb + interval * i as f64);
            }
        }
        // Skip the window start if the left flank already sampled it.
        let start = usize::from(num_left >= 2);
        let interval = window / (num_concen - 1) as f64;
        for i in start..num_concen {
            xs.push(concen_lb + interval * i as f64);
        }
        if num_right >= 2 {
            let interval = right_w / (num_right - 1) as f64;
            for i in 1..num_right {
                xs.push(concen_ub + interval * i as f64);
            }
        }

        Self::from_sorted_xs(capacity, lb, ub, &xs)
    }

    /// Curve value at x.
    pub fn fx(&self, x: f64) -> f64 {
        (self.capacity - x) * (self.capacity - x)
    }

    /// Inverse of the curve (left branch).
    pub fn x_of(&self, fx: f64) -> f64 {
        self.capacity - fx.sqrt()
    }

    /// Insert a breakpoint at `x`, plus up to `extra_per_side` points on
    /// each side by midpoint bisection in f-space.
    ///
    /// Bisecting in f rather than x concentrates resolution where the
    /// curve bends hardest, near the capacity boundary. Positions outside
    /// `(lb, ub)` and duplicates of existing samples are ignored.
    pub fn insert_x(&mut self, x: f64, extra_per_side: usize) {
        if x <= self.lb + MIN_GAP || x >= self.ub - MIN_GAP {
            return;
        }
        let idx = self.points.partition_point(|p| p.x < x);
        let duplicate = (idx < self.points.len() && self.points[idx].x - x < MIN_GAP)
            || (idx > 0 && x - self.points[idx - 1].x < MIN_GAP);
        if duplicate {
            return;
        }

        let fx = self.fx(x);
        self.points.insert(idx, Breakpoint { x, fx });

        // Fan out to the right first: those insertions leave the indices
        // of the left-side pairs untouched.
        let mut pair_lo = idx;
        for _ in 0..extra_per_side {
            if pair_lo + 1 >= self.points.len() {
                break;
            }
            if self.bisect_pair(pair_lo) {
                pair_lo += 2;
            } else {
                pair_lo += 1;
            }
        }

        let mut pair_hi = idx;
        for _ in 0..extra_per_side {
            if pair_hi == 0 {
                break;
            }
            self.bisect_pair(pair_hi - 1);
            pair_hi -= 1;
        }

        debug_assert!(self.check());
    }

    /// Insert the f-space midpoint of the pair `(i, i + 1)`.
    ///
    /// Returns false when the resulting point would sit too close to one
    /// of the pair's endpoints.
    fn bisect_pair(&mut self, i: usize) -> bool {
        let fmid = 0.5 * (self.points[i].fx + self.points[i + 1].fx);
        let xm = self.x_of(fmid);
        if xm - self.points[i].x < MIN_GAP || self.points[i + 1].x - xm < MIN_GAP {
            return false;
        }
        self.points.insert(i + 1, Breakpoint { x: xm, fx: fmid });
        true
    }

    /// Secant slope of the leftmost segment.
    pub fn left_slope(&self) -> f64 {
        let p0 = self.points[0];
        let p1 = self.points[1];
        (p1.fx - p0.fx) / (p1.x - p0.x)
    }

    /// Secant slope of the rightmost segment.
    pub fn right_slope(&self) -> f64 {
        let n = self.points.len();
        let p0 = self.points[n - 2];
        let p1 = self.points[n - 1];
        (p1.fx - p0.fx) / (p1.x - p0.x)
    }

    /// Verify the two-axis monotonicity invariant.
    pub fn check(&self) -> bool {
        if self.points.len() < 2 {
            return false;
        }
        self.points
            .windows(2)
            .all(|w| w[1].x > w[0].x && w[1].fx < w[0].fx)
    }

    /// Sampled points, x ascending.
    pub fn points(&self) -> &[Breakpoint] {
        &self.points
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the list is empty (never true for a constructed list).
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Split the sample into parallel x / f(x) arrays.
    pub fn sample_arrays(&self) -> (Vec<f64>, Vec<f64>) {
        let xs = self.points.iter().map(|p| p.x).collect();
        let fxs = self.points.iter().map(|p| p.fx).collect();
        (xs, fxs)
    }

    /// Knapsack capacity.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Domain lower bound.
    pub fn lb(&self) -> f64 {
        self.lb
    }

    /// Domain upper bound.
    pub fn ub(&self) -> f64 {
        self.ub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_monotone() {
        let bp = Breakpoints::uniform(10.0, 16);
        assert_eq!(bp.len(), 16);
        assert!(bp.check());
        assert_eq!(bp.points()[0].x, 0.0);
        assert!((bp.points()[15].x - 10.0).abs() < 1e-12);
        assert!((bp.points()[0].fx - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_minimum_point_count() {
        let bp = Breakpoints::uniform(10.0, 3);
        assert_eq!(bp.len(), 10);
    }

    #[test]
    fn test_with_bounds_monotone() {
        let bp = Breakpoints::with_bounds(10.0, 2.0, 8.0, 12);
        assert!(bp.check());
        assert_eq!(bp.lb(), 2.0);
        assert_eq!(bp.ub(), 8.0);
        assert!((bp.points()[0].x - 2.0).abs() < 1e-12);
        assert!((bp.points()[11].x - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_insert_single_point() {
        let mut bp = Breakpoints::uniform(10.0, 10);
        let before: Vec<_> = bp.points().to_vec();
        let n = bp.len();

        bp.insert_x(3.3, 0);

        assert_eq!(bp.len(), n + 1);
        assert!(bp.check());

        // Every previous point survives unchanged.
        for p in &before {
            assert!(bp.points().iter().any(|q| q == p));
        }
        let idx = bp.points().iter().position(|p| (p.x - 3.3).abs() < 1e-12);
        assert!(idx.is_some());
    }

    #[test]
    fn test_insert_with_fanout_monotone() {
        let mut bp = Breakpoints::uniform(10.0, 10);
        bp.insert_x(7.77, 2);
        assert!(bp.check());
        // The exact point plus up to two per side.
        assert!(bp.len() > 11 && bp.len() <= 15);
    }

    #[test]
    fn test_insert_outside_domain_ignored() {
        let mut bp = Breakpoints::with_bounds(10.0, 2.0, 8.0, 10);
        let n = bp.len();
        bp.insert_x(1.0, 1);
        bp.insert_x(9.0, 1);
        assert_eq!(bp.len(), n);
    }

    #[test]
    fn test_insert_duplicate_ignored() {
        let mut bp = Breakpoints::uniform(9.0, 10);
        let x = bp.points()[4].x;
        let n = bp.len();
        bp.insert_x(x, 0);
        assert_eq!(bp.len(), n);
    }

    #[test]
    fn test_fanout_bisects_in_f_space() {
        let mut bp = Breakpoints::uniform(10.0, 10);
        bp.insert_x(5.0, 1);

        // The fan-out point right of 5.0 bisects the f interval, not x.
        let idx = bp
            .points()
            .iter()
            .position(|p| (p.x - 5.0).abs() < 1e-12)
            .unwrap();
        let fmid = bp.points()[idx + 1].fx;
        let f_right = bp.points()[idx + 2].fx;
        let f_here = bp.points()[idx].fx;
        assert!((fmid - 0.5 * (f_here + f_right)).abs() < 1e-9);
    }

    #[test]
    fn test_slopes() {
        let bp = Breakpoints::uniform(10.0, 11);
        // f(x) = (10 - x)^2, secant over [0, 1]: (81 - 100) / 1 = -19.
        assert!((bp.left_slope() + 19.0).abs() < 1e-9);
        // Secant over [9, 10]: (0 - 1) / 1 = -1.
        assert!((bp.right_slope() + 1.0).abs() < 1e-9);
        assert!(bp.left_slope() < bp.right_slope());
    }

    #[test]
    fn test_concentrated_allocation() {
        let bp = Breakpoints::concentrated(10.0, 0.0, 10.0, 20, 4.0, 6.0, 3.0);
        assert!(bp.check());

        let inside = bp
            .points()
            .iter()
            .filter(|p| p.x >= 4.0 - 1e-9 && p.x <= 6.0 + 1e-9)
            .count();
        // Window is 20% of the domain; ratio 3 concentrates ~60% of the
        // points there.
        assert!(inside >= bp.len() * 2 / 5, "only {} of {} inside", inside, bp.len());
    }

    #[test]
    fn test_concentrated_thin_window_falls_back() {
        let bp = Breakpoints::concentrated(10.0, 0.0, 10.0, 12, 5.0, 5.01, 3.0);
        assert!(bp.check());
        assert_eq!(bp.len(), 12);
        // Uniform fallback: first and last points at the domain ends.
        assert!((bp.points()[0].x - 0.0).abs() < 1e-12);
        assert!((bp.points()[11].x - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_sorted_xs_dedups() {
        let xs = [1.0, 2.0, 2.0, 3.0];
        let bp = Breakpoints::from_sorted_xs(10.0, 0.0, 10.0, &xs);
        assert_eq!(bp.len(), 3);
        assert!(bp.check());
    }
}
