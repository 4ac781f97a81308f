//! Small overlays drawn on top of the map: scale line and pointer's coordinates.

use egui::{Align2, Color32, FontId, Response, Stroke, Ui, pos2, vec2};

use crate::map::Plugin;
use crate::projector::Projector;

/// Scale bar is never shorter than this, in pixels.
const MIN_SCALE_WIDTH: f64 = 64.;

const MARGIN: f32 = 10.;

/// [`Plugin`] showing a scale line in the bottom left corner of the map.
#[derive(Default)]
pub struct ScaleLine;

impl Plugin for ScaleLine {
    fn run(self: Box<Self>, ui: &mut Ui, _response: &Response, projector: &Projector) -> bool {
        let Some(bar) = scale_bar(projector.meters_per_pixel(projector.center())) else {
            return false;
        };

        let rect = projector.clip_rect();
        let left = pos2(rect.left() + MARGIN, rect.bottom() - MARGIN);
        let right = left + vec2(bar.width, 0.);
        let stroke = Stroke::new(2., Color32::BLACK.gamma_multiply(0.8));
        let painter = ui.painter();

        painter.line_segment([left, right], stroke);
        painter.line_segment([left, left - vec2(0., 6.)], stroke);
        painter.line_segment([right, right - vec2(0., 6.)], stroke);
        painter.text(
            left + vec2(bar.width / 2., -4.),
            Align2::CENTER_BOTTOM,
            bar.label(),
            FontId::proportional(12.),
            Color32::BLACK,
        );

        false
    }
}

/// [`Plugin`] showing longitude and latitude under the pointer in the bottom right corner.
#[derive(Default)]
pub struct MousePosition;

impl Plugin for MousePosition {
    fn run(self: Box<Self>, ui: &mut Ui, response: &Response, projector: &Projector) -> bool {
        if let Some(pointer) = response.hover_pos() {
            let position = projector.unproject(pointer);
            let rect = projector.clip_rect();
            ui.painter().text(
                pos2(rect.right() - MARGIN, rect.bottom() - MARGIN),
                Align2::RIGHT_BOTTOM,
                format!("{:.4}, {:.4}", position.x(), position.y()),
                FontId::monospace(12.),
                Color32::BLACK,
            );
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScaleBar {
    meters: f64,
    width: f32,
}

impl ScaleBar {
    fn label(&self) -> String {
        if self.meters >= 1000. {
            format!("{} km", self.meters / 1000.)
        } else {
            format!("{} m", self.meters)
        }
    }
}

/// Round distance (1, 2 or 5 times a power of ten) which takes at least [`MIN_SCALE_WIDTH`]
/// pixels.
fn scale_bar(meters_per_pixel: f64) -> Option<ScaleBar> {
    if !meters_per_pixel.is_finite() || meters_per_pixel <= 0. {
        return None;
    }

    let min_meters = MIN_SCALE_WIDTH * meters_per_pixel;
    let magnitude = 10f64.powf(min_meters.log10().floor());
    let meters = [1., 2., 5., 10.]
        .into_iter()
        .map(|step| step * magnitude)
        .find(|meters| *meters >= min_meters)?;

    Some(ScaleBar {
        meters,
        width: (meters / meters_per_pixel) as f32,
    })
}
