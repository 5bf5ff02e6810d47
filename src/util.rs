use eframe::egui::{Vec2, vec2};

/// Deterministic unit direction for a pair of coincident nodes.
pub fn pair_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

/// Direction from `to` towards `from`, falling back to [`pair_direction`]
/// when the points coincide. Returns the direction and the raw distance.
pub fn separation(from_pos: Vec2, to_pos: Vec2, from: usize, to: usize) -> (Vec2, f32) {
    let delta = from_pos - to_pos;
    let distance = delta.length();
    if distance > 0.0001 {
        (delta / distance, distance)
    } else {
        (pair_direction(from, to), distance)
    }
}

/// Shortens `label` to `max_chars` characters, ending in an ellipsis.
pub fn ellipsize(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_owned();
    }
    let mut shortened = label
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_direction_is_unit_length() {
        for (from, to) in [(0, 1), (3, 7), (12, 2)] {
            assert!((pair_direction(from, to).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn coincident_points_still_separate() {
        let (direction, distance) = separation(Vec2::ZERO, Vec2::ZERO, 1, 2);
        assert_eq!(distance, 0.0);
        assert!(direction.length() > 0.99);
    }

    #[test]
    fn ellipsize_counts_characters() {
        assert_eq!(ellipsize("삼성전자", 10), "삼성전자");
        assert_eq!(ellipsize("abcdefghij", 5), "abcd…");
    }
}
