//! Minimum-cost path search over the pixel grid.
//!
//! # Graph model
//!
//! One node per pixel, connected to its in-bounds 8-neighbours. The edge
//! between adjacent pixels `a` and `b` weighs
//! `(cost[a] + cost[b]) / 2 * dist(a, b)` with `dist = 1` for orthogonal
//! and `sqrt(2)` for diagonal steps, so diagonal moves pay for the extra
//! distance they cover.
//!
//! # Algorithm
//!
//! Dijkstra from `from` with a binary-heap frontier and lazy deletion.
//! The search stops as soon as `to` is settled, so the work done per
//! cursor move grows with the seed-cursor distance rather than with the
//! image size.
//!
//! Output is deterministic: frontier entries with equal distance pop in
//! insertion order, neighbours are relaxed in a fixed row-major order, and
//! a tentative distance is only replaced by a strictly smaller one.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::cost::CostField;
use crate::types::{Dimensions, Pixel, PixelPath, TraceError};

/// Neighbour offsets in row-major order.
const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Counters describing a single search.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStats {
    /// Nodes removed from the frontier with their final distance.
    pub settled: usize,
    /// Entries pushed onto the frontier (including stale duplicates).
    pub pushed: usize,
    /// Accumulated cost of the returned path.
    pub total_cost: f64,
}

/// Frontier entry ordered as a min-heap on `(dist, seq)`.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    dist: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: `BinaryHeap` is a max-heap.
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Reusable per-pixel search buffers.
///
/// Entries are tagged with a generation number so starting a new search
/// is O(1) instead of clearing `W * H` slots. A workspace adapts itself
/// to whatever grid it is used with.
#[derive(Debug, Default)]
pub struct SearchWorkspace {
    generation: u32,
    stamp: Vec<u32>,
    dist: Vec<f64>,
    prev: Vec<usize>,
    settled: Vec<bool>,
    heap: BinaryHeap<Frontier>,
}

impl SearchWorkspace {
    /// Create an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&mut self, len: usize) {
        if self.stamp.len() != len {
            self.stamp = vec![0; len];
            self.dist = vec![f64::INFINITY; len];
            self.prev = vec![usize::MAX; len];
            self.settled = vec![false; len];
            self.generation = 0;
        }
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // Wrapped: every stale stamp could now collide.
            self.stamp.fill(0);
            self.generation = 1;
        }
        self.heap.clear();
    }

    fn touch(&mut self, node: usize) {
        if self.stamp[node] != self.generation {
            self.stamp[node] = self.generation;
            self.dist[node] = f64::INFINITY;
            self.prev[node] = usize::MAX;
            self.settled[node] = false;
        }
    }

    fn dist(&self, node: usize) -> f64 {
        if self.stamp[node] == self.generation {
            self.dist[node]
        } else {
            f64::INFINITY
        }
    }

    fn is_settled(&self, node: usize) -> bool {
        self.stamp[node] == self.generation && self.settled[node]
    }
}

/// Edge weight between two adjacent pixels.
#[must_use]
pub fn edge_weight(cost: &CostField, a: Pixel, b: Pixel) -> f64 {
    let mean = (f64::from(cost.at(a)) + f64::from(cost.at(b))) / 2.0;
    if a.is_diagonal_to(b) {
        mean * std::f64::consts::SQRT_2
    } else {
        mean
    }
}

/// Sum of edge weights along a path.
///
/// Consecutive pixels are assumed to be adjacent and in bounds.
#[must_use]
pub fn path_cost(cost: &CostField, path: &[Pixel]) -> f64 {
    path.windows(2).map(|w| edge_weight(cost, w[0], w[1])).sum()
}

/// Find the minimum-cost path from `from` to `to`, inclusive.
///
/// Allocates a fresh [`SearchWorkspace`]; use [`find_path_in`] to reuse
/// buffers across calls.
///
/// # Errors
///
/// Returns [`TraceError::CoordinateOutOfRange`] if either endpoint is
/// outside the grid.
pub fn find_path(cost: &CostField, from: Pixel, to: Pixel) -> Result<PixelPath, TraceError> {
    let mut workspace = SearchWorkspace::new();
    find_path_in(&mut workspace, cost, from, to).map(|(path, _)| path)
}

/// Find the minimum-cost path using caller-provided buffers.
///
/// # Errors
///
/// Returns [`TraceError::CoordinateOutOfRange`] if either endpoint is
/// outside the grid, and [`TraceError::InvariantViolation`] if the
/// frontier empties before `to` is settled (only possible with a
/// corrupt cost field).
pub fn find_path_in(
    workspace: &mut SearchWorkspace,
    cost: &CostField,
    from: Pixel,
    to: Pixel,
) -> Result<(PixelPath, SearchStats), TraceError> {
    let dims = cost.dimensions();
    dims.check(from)?;
    dims.check(to)?;

    if from == to {
        return Ok((
            PixelPath::new(vec![from]),
            SearchStats {
                settled: 1,
                pushed: 0,
                total_cost: 0.0,
            },
        ));
    }

    let start = dims.index_of(from);
    let goal = dims.index_of(to);
    let mut stats = SearchStats::default();
    let mut seq: u64 = 0;

    workspace.begin(dims.pixel_count());
    workspace.touch(start);
    workspace.dist[start] = 0.0;
    workspace.heap.push(Frontier {
        dist: 0.0,
        seq,
        node: start,
    });
    stats.pushed += 1;

    while let Some(Frontier { dist, node, .. }) = workspace.heap.pop() {
        if workspace.is_settled(node) {
            continue;
        }
        workspace.settled[node] = true;
        stats.settled += 1;

        if node == goal {
            stats.total_cost = dist;
            let path = reconstruct(workspace, dims, start, goal)?;
            log::trace!(
                "search {from} -> {to}: settled={} pushed={} cost={dist:.3}",
                stats.settled,
                stats.pushed,
            );
            return Ok((path, stats));
        }

        let here = dims.pixel_at(node);
        for neighbour in neighbours(dims, here) {
            let next = dims.index_of(neighbour);
            if workspace.is_settled(next) {
                continue;
            }
            let candidate = dist + edge_weight(cost, here, neighbour);
            if candidate < workspace.dist(next) {
                workspace.touch(next);
                workspace.dist[next] = candidate;
                workspace.prev[next] = node;
                seq += 1;
                workspace.heap.push(Frontier {
                    dist: candidate,
                    seq,
                    node: next,
                });
                stats.pushed += 1;
            }
        }
    }

    Err(TraceError::InvariantViolation(format!(
        "frontier exhausted before reaching {to} from {from}"
    )))
}

/// In-bounds 8-neighbours of `p`, in row-major order.
fn neighbours(dims: Dimensions, p: Pixel) -> impl Iterator<Item = Pixel> {
    NEIGHBOURS.iter().filter_map(move |&(dx, dy)| {
        let x = i64::from(p.x) + dx;
        let y = i64::from(p.y) + dy;
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        let q = Pixel::new(x, y);
        dims.contains(q).then_some(q)
    })
}

fn reconstruct(
    workspace: &SearchWorkspace,
    dims: Dimensions,
    start: usize,
    goal: usize,
) -> Result<PixelPath, TraceError> {
    let mut pixels = vec![dims.pixel_at(goal)];
    let mut node = goal;
    while node != start {
        node = workspace.prev[node];
        if node == usize::MAX || pixels.len() > dims.pixel_count() {
            return Err(TraceError::InvariantViolation(
                "broken predecessor chain".to_string(),
            ));
        }
        pixels.push(dims.pixel_at(node));
    }
    pixels.reverse();
    Ok(PixelPath::new(pixels))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::RgbImage;

    use super::*;
    use crate::intensity::IntensityField;

    fn cost_from_fn(w: u32, h: u32, f: impl Fn(u32, u32) -> u8) -> CostField {
        let raster = RgbImage::from_fn(w, h, |x, y| {
            let v = f(x, y);
            image::Rgb([v, v, v])
        });
        let intensity = IntensityField::build(&raster).unwrap();
        CostField::build(&intensity, 1.0).unwrap()
    }

    fn px(x: u32, y: u32) -> Pixel {
        Pixel::new(x, y)
    }

    #[test]
    fn same_endpoint_is_single_pixel() {
        let cost = cost_from_fn(4, 4, |_, _| 50);
        let path = find_path(&cost, px(2, 1), px(2, 1)).unwrap();
        assert_eq!(path.pixels(), &[px(2, 1)]);
    }

    #[test]
    fn uniform_field_prefers_diagonal() {
        let cost = cost_from_fn(5, 5, |_, _| 128);
        let path = find_path(&cost, px(0, 0), px(4, 4)).unwrap();
        assert_eq!(
            path.pixels(),
            &[px(0, 0), px(1, 1), px(2, 2), px(3, 3), px(4, 4)]
        );
    }

    #[test]
    fn straight_line_on_uniform_row() {
        let cost = cost_from_fn(6, 3, |_, _| 10);
        let path = find_path(&cost, px(0, 1), px(5, 1)).unwrap();
        let expected: Vec<Pixel> = (0..6).map(|x| px(x, 1)).collect();
        assert_eq!(path.pixels(), expected.as_slice());
    }

    #[test]
    fn path_endpoints_and_connectivity() {
        let cost = cost_from_fn(20, 15, |x, y| if (x / 4 + y / 3) % 2 == 0 { 10 } else { 240 });
        let path = find_path(&cost, px(1, 13), px(18, 2)).unwrap();
        assert_eq!(path.first(), Some(&px(1, 13)));
        assert_eq!(path.last(), Some(&px(18, 2)));
        assert!(path.is_connected());
        assert!(path.pixels().windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn out_of_range_endpoints_rejected() {
        let cost = cost_from_fn(3, 3, |_, _| 0);
        assert!(matches!(
            find_path(&cost, px(3, 0), px(0, 0)),
            Err(TraceError::CoordinateOutOfRange { x: 3, y: 0, .. })
        ));
        assert!(matches!(
            find_path(&cost, px(0, 0), px(0, 9)),
            Err(TraceError::CoordinateOutOfRange { x: 0, y: 9, .. })
        ));
    }

    #[test]
    fn reused_workspace_matches_fresh_search() {
        let cost = cost_from_fn(16, 16, |x, y| ((x * 31 + y * 17) % 200) as u8);
        let mut workspace = SearchWorkspace::new();
        for (from, to) in [
            (px(0, 0), px(15, 15)),
            (px(3, 12), px(12, 3)),
            (px(15, 0), px(0, 15)),
            (px(0, 0), px(15, 15)),
        ] {
            let (reused, stats) = find_path_in(&mut workspace, &cost, from, to).unwrap();
            let fresh = find_path(&cost, from, to).unwrap();
            assert_eq!(reused, fresh);
            assert!((stats.total_cost - path_cost(&cost, reused.pixels())).abs() < 1e-6);
        }
    }

    #[test]
    fn workspace_adapts_to_new_grid_size() {
        let small = cost_from_fn(4, 4, |_, _| 0);
        let large = cost_from_fn(9, 7, |_, _| 0);
        let mut workspace = SearchWorkspace::new();
        find_path_in(&mut workspace, &small, px(0, 0), px(3, 3)).unwrap();
        let (path, _) = find_path_in(&mut workspace, &large, px(0, 0), px(8, 6)).unwrap();
        assert_eq!(path.last(), Some(&px(8, 6)));
    }

    #[test]
    fn early_termination_skips_far_pixels() {
        let cost = cost_from_fn(200, 200, |_, _| 90);
        let (_, stats) =
            find_path_in(&mut SearchWorkspace::new(), &cost, px(100, 100), px(103, 100)).unwrap();
        assert!(
            stats.settled < 200,
            "expected a local search, settled {} nodes",
            stats.settled
        );
    }

    #[test]
    fn edge_weight_scales_diagonals() {
        let cost = cost_from_fn(3, 3, |_, _| 0);
        let orth = edge_weight(&cost, px(0, 0), px(1, 0));
        let diag = edge_weight(&cost, px(0, 0), px(1, 1));
        assert!((orth - 1.0).abs() < 1e-9);
        assert!((diag - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn frontier_orders_by_distance_then_insertion() {
        let mut heap = BinaryHeap::new();
        heap.push(Frontier {
            dist: 2.0,
            seq: 0,
            node: 0,
        });
        heap.push(Frontier {
            dist: 1.0,
            seq: 2,
            node: 1,
        });
        heap.push(Frontier {
            dist: 1.0,
            seq: 1,
            node: 2,
        });
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|f| f.node)).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }
}
