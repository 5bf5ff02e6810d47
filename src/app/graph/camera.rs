use eframe::egui::{PointerButton, Pos2, Rect, Response, Ui, Vec2};

const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 6.0;

/// Pan and zoom of the node-link canvas.
///
/// World coordinates are layout pixels measured from the layout center, which
/// sits on the canvas center while the camera is at rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Camera {
    pub(in crate::app) offset: Vec2,
    pub(in crate::app) zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub(in crate::app) fn to_screen(&self, canvas: Rect, world: Vec2) -> Pos2 {
        canvas.center() + self.offset + world * self.zoom
    }

    pub(in crate::app) fn to_world(&self, canvas: Rect, screen: Pos2) -> Vec2 {
        (screen - canvas.center() - self.offset) / self.zoom
    }

    /// Scales the zoom by `factor` while the world point under `anchor` stays put.
    pub(in crate::app) fn zoom_around(&mut self, canvas: Rect, anchor: Pos2, factor: f32) {
        let pinned = self.to_world(canvas, anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset = anchor - canvas.center() - pinned * self.zoom;
    }

    /// Drag with any button pans; the wheel zooms around the pointer.
    pub(in crate::app) fn follow_input(&mut self, ui: &Ui, canvas: Rect, response: &Response) {
        let dragging = [PointerButton::Primary, PointerButton::Secondary, PointerButton::Middle]
            .into_iter()
            .any(|button| response.dragged_by(button));
        if dragging {
            self.offset += response.drag_delta();
        }

        if !response.hovered() {
            return;
        }
        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll != 0.0 {
            let anchor = response.hover_pos().unwrap_or_else(|| canvas.center());
            self.zoom_around(canvas, anchor, (1.0 + scroll * 0.0018).clamp(0.85, 1.15));
        }
    }

    /// On-screen radius for a node of the given display size. Grows slower
    /// than the zoom so dense layouts stay legible.
    pub(in crate::app) fn node_radius(&self, size: f32) -> f32 {
        (size * 0.5 * self.zoom.powf(0.4)).clamp(2.5, 46.0)
    }
}
