use eframe::egui::{Color32, Painter, Pos2, Rect};

use super::graph::Camera;

pub(super) const CANVAS: Color32 = Color32::from_rgb(250, 250, 247);

/// Linear mix from `from` to `to`, alpha included.
pub(super) fn mix(from: Color32, to: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color32::from_rgba_unmultiplied(
        channel(from.r(), to.r()),
        channel(from.g(), to.g()),
        channel(from.b(), to.b()),
        channel(from.a(), to.a()),
    )
}

/// Washes `color` out toward the canvas.
pub(super) fn fade(color: Color32, amount: f32) -> Color32 {
    mix(color, CANVAS, amount)
}

/// Canvas fill with a dot lattice that moves with the camera.
pub(super) fn draw_canvas(painter: &Painter, canvas: Rect, camera: Camera) {
    painter.rect_filled(canvas, 0.0, CANVAS);

    let spacing = (48.0 * camera.zoom.clamp(0.6, 1.8)).max(20.0);
    let anchor = canvas.center() + camera.offset;
    let left = canvas.left() + (anchor.x - canvas.left()).rem_euclid(spacing);
    let top = canvas.top() + (anchor.y - canvas.top()).rem_euclid(spacing);
    let dot = Color32::from_rgba_unmultiplied(175, 175, 165, 120);

    let mut y = top;
    while y < canvas.bottom() {
        let mut x = left;
        while x < canvas.right() {
            painter.circle_filled(Pos2::new(x, y), 1.0, dot);
            x += spacing;
        }
        y += spacing;
    }
}

pub(super) fn disc_on_canvas(canvas: Rect, center: Pos2, radius: f32) -> bool {
    canvas.expand(radius).contains(center)
}

/// Bounding-box test; may keep a few diagonal edges that miss the canvas.
pub(super) fn segment_on_canvas(canvas: Rect, start: Pos2, end: Pos2, slack: f32) -> bool {
    Rect::from_two_pos(start, end).expand(slack).intersects(canvas)
}

/// Stroke width and alpha for an ownership edge; stronger stakes draw bolder.
pub(super) fn ratio_stroke(max_ratio: f32, zoom: f32) -> (f32, u8) {
    let t = (max_ratio / 100.0).clamp(0.0, 1.0);
    let width = ((0.8 + t * 2.6) * zoom.sqrt()).clamp(0.5, 4.5);
    let alpha = (110.0 + t * 130.0) as u8;
    (width, alpha)
}
