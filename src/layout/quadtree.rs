use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 12;
const MAX_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn from_points(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let center = (min + max) * 0.5;
        let span_x = (max.x - min.x).max(1.0);
        let span_y = (max.y - min.y).max(1.0);
        let half_extent = (span_x.max(span_y) * 0.5) + 1.0;

        Some(Self {
            center,
            half_extent,
        })
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };

        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        let right = point.x >= self.center.x;
        let lower = point.y >= self.center.y;
        match (right, lower) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    /// Squared gap between two cells, zero when they touch or overlap.
    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        (dx * dx) + (dy * dy)
    }
}

/// Point quadtree over node positions; leaves hold node indices.
pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    /// `None` when any position is non-finite.
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        if positions.is_empty() {
            return None;
        }
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    fn build_node(bounds: QuadBounds, indices: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mut node = Self {
            bounds,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || node.indices.len() <= LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }

        // All points in one quadrant (typically coincident): splitting gains nothing.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            node.children[quadrant] = Some(Box::new(Self::build_node(
                bounds.child(quadrant),
                bucket,
                positions,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Calls `visit(a, b)` once for every unordered pair of distinct indices
    /// whose cells lie within `max_distance` of each other. Pairs further
    /// apart than that are never reported; closer pairs always are.
    pub(super) fn for_each_pair_within(&self, max_distance: f32, visit: &mut impl FnMut(usize, usize)) {
        let max_distance_sq = max_distance * max_distance;
        Self::pairs_between(self, self, true, max_distance_sq, visit);
    }

    fn pairs_between(
        node_a: &QuadNode,
        node_b: &QuadNode,
        same_node: bool,
        max_distance_sq: f32,
        visit: &mut impl FnMut(usize, usize),
    ) {
        if !same_node && node_a.bounds.distance_sq_to(node_b.bounds) > max_distance_sq {
            return;
        }

        if node_a.is_leaf() && node_b.is_leaf() {
            if same_node {
                for (offset, &from) in node_a.indices.iter().enumerate() {
                    for &to in &node_a.indices[offset + 1..] {
                        visit(from, to);
                    }
                }
            } else {
                for &from in &node_a.indices {
                    for &to in &node_b.indices {
                        visit(from, to);
                    }
                }
            }
            return;
        }

        if same_node {
            for first in 0..4 {
                let Some(child_a) = node_a.children[first].as_deref() else {
                    continue;
                };
                Self::pairs_between(child_a, child_a, true, max_distance_sq, visit);

                for second in (first + 1)..4 {
                    let Some(child_b) = node_a.children[second].as_deref() else {
                        continue;
                    };
                    Self::pairs_between(child_a, child_b, false, max_distance_sq, visit);
                }
            }
            return;
        }

        let split_a = if node_a.is_leaf() {
            false
        } else if node_b.is_leaf() {
            true
        } else {
            node_a.bounds.half_extent >= node_b.bounds.half_extent
        };

        if split_a {
            for child in node_a.children.iter().flatten() {
                Self::pairs_between(child, node_b, false, max_distance_sq, visit);
            }
        } else {
            for child in node_b.children.iter().flatten() {
                Self::pairs_between(node_a, child, false, max_distance_sq, visit);
            }
        }
    }
}
