use eframe::egui::Vec2;

use crate::util::separation;

use super::quadtree::QuadNode;

#[derive(Clone, Copy, Debug)]
pub(super) struct PairParams {
    /// Soft repulsion reaches this far, in pixels.
    pub(super) repulsion_range: f32,
    pub(super) collision_multiplier: f32,
}

/// Spring with its rest length already resolved from ratio and degrees.
#[derive(Clone, Copy, Debug)]
pub(super) struct Spring {
    pub(super) from: usize,
    pub(super) to: usize,
    pub(super) ideal: f32,
}

/// Repulsion and collision between every pair within interaction range.
///
/// Each side of a pair is pushed with its own strength, so hubs claim more
/// room than the leaves around them.
pub(super) fn accumulate_pair_forces(
    tree: &QuadNode,
    positions: &[Vec2],
    radii: &[f32],
    strengths: &[f32],
    params: PairParams,
    forces: &mut [Vec2],
) {
    let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);
    let reach = params
        .repulsion_range
        .max(max_radius * 2.0 * params.collision_multiplier);
    if reach <= 0.0 {
        return;
    }

    tree.for_each_pair_within(reach, &mut |a, b| {
        let (direction, distance) = separation(positions[a], positions[b], a, b);
        let distance = if distance > 0.0001 { distance } else { 1.0 };
        let collision_radius = (radii[a] + radii[b]) * params.collision_multiplier;

        let magnitude = if distance < collision_radius {
            let t = (collision_radius - distance) / collision_radius;
            t * t * 2.0
        } else if distance < params.repulsion_range {
            let t = (params.repulsion_range - distance) / params.repulsion_range;
            t * t
        } else {
            return;
        };

        forces[a] += direction * (magnitude * strengths[a]);
        forces[b] -= direction * (magnitude * strengths[b]);
    });
}

/// Pulls or pushes both endpoints toward the spring's rest length.
pub(super) fn accumulate_spring_forces(
    springs: &[Spring],
    positions: &[Vec2],
    edge_force: f32,
    forces: &mut [Vec2],
) {
    for spring in springs {
        let delta = positions[spring.to] - positions[spring.from];
        let distance = delta.length();
        if distance <= 0.0001 {
            continue;
        }
        let direction = delta / distance;
        let magnitude = (distance - spring.ideal) / spring.ideal * edge_force;

        forces[spring.from] += direction * magnitude;
        forces[spring.to] -= direction * magnitude;
    }
}

/// Quadratic pull toward `center` plus a constant outward push.
pub(super) fn accumulate_center_forces(
    positions: &[Vec2],
    normalized_degrees: &[f32],
    center: Vec2,
    gravity: f32,
    expansion: f32,
    forces: &mut [Vec2],
) {
    for ((position, normalized_degree), force) in positions
        .iter()
        .zip(normalized_degrees)
        .zip(forces.iter_mut())
    {
        let to_center = center - *position;
        let distance = to_center.length();
        if distance <= 1.0 {
            continue;
        }
        let direction = to_center / distance;

        let pull = distance * distance * normalized_degree * gravity * 1e-5;
        *force += direction * pull;
        if expansion > 0.0 {
            *force -= direction * expansion;
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn params() -> PairParams {
        PairParams {
            repulsion_range: 500.0,
            collision_multiplier: 2.0,
        }
    }

    #[test]
    fn collision_zone_pushes_twice_as_hard() {
        let positions = [vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let radii = [10.0, 10.0];
        let strengths = [100.0, 100.0];
        let mut forces = [Vec2::ZERO; 2];
        let tree = QuadNode::build(&positions).unwrap();

        accumulate_pair_forces(&tree, &positions, &radii, &strengths, params(), &mut forces);

        // collision radius 40, t = 0.75
        assert!((forces[0].x + 0.75 * 0.75 * 2.0 * 100.0).abs() < 1e-3);
        assert!((forces[1].x - 0.75 * 0.75 * 2.0 * 100.0).abs() < 1e-3);
    }

    #[test]
    fn stronger_node_pushes_only_itself_harder() {
        let positions = [vec2(0.0, 0.0), vec2(100.0, 0.0)];
        let radii = [10.0, 10.0];
        let strengths = [300.0, 100.0];
        let mut forces = [Vec2::ZERO; 2];
        let tree = QuadNode::build(&positions).unwrap();

        accumulate_pair_forces(&tree, &positions, &radii, &strengths, params(), &mut forces);
        assert!(forces[0].x < 0.0 && forces[1].x > 0.0);
        assert!((forces[0].x.abs() - 3.0 * forces[1].x).abs() < 1e-3);
    }

    #[test]
    fn pairs_beyond_range_feel_nothing() {
        let positions = [vec2(0.0, 0.0), vec2(900.0, 0.0)];
        let mut forces = [Vec2::ZERO; 2];
        let tree = QuadNode::build(&positions).unwrap();

        accumulate_pair_forces(&tree, &positions, &[10.0, 10.0], &[1.0, 1.0], params(), &mut forces);
        assert_eq!(forces, [Vec2::ZERO; 2]);
    }

    #[test]
    fn stretched_spring_pulls_endpoints_together() {
        let positions = [vec2(0.0, 0.0), vec2(200.0, 0.0)];
        let springs = [Spring {
            from: 0,
            to: 1,
            ideal: 100.0,
        }];
        let mut forces = [Vec2::ZERO; 2];

        accumulate_spring_forces(&springs, &positions, 0.5, &mut forces);
        assert_eq!(forces[0], vec2(0.5, 0.0));
        assert_eq!(forces[1], vec2(-0.5, 0.0));
    }

    #[test]
    fn expansion_pushes_away_from_center() {
        let positions = [vec2(10.0, 0.0)];
        let mut forces = [Vec2::ZERO];
        accumulate_center_forces(&positions, &[1.0], Vec2::ZERO, 0.0, 0.04, &mut forces);
        assert!((forces[0].x - 0.04).abs() < 1e-6);
    }
}
