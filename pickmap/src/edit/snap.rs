use egui::Pos2;

use super::Viewport;
use super::feature::Feature;
use crate::Position;

/// Pulls the pointer onto vertices and edges of the existing feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// Distance in pixels.
    tolerance: f32,
}

impl Default for Snap {
    fn default() -> Self {
        Self { tolerance: 10. }
    }
}

impl Snap {
    pub fn with_tolerance(tolerance: f32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Where the pointer should be snapped to. Vertices win over edges. Vertex number `exclude`,
    /// and the edges it belongs to, are ignored, which lets a vertex being dragged snap to the
    /// others.
    pub fn snap(
        &self,
        pointer: Pos2,
        feature: Option<&Feature>,
        viewport: &dyn Viewport,
        exclude: Option<usize>,
    ) -> Option<Position> {
        let feature = feature?;
        let vertices = feature.vertices();
        let screen: Vec<Pos2> = vertices.iter().map(|v| viewport.project(*v)).collect();

        let vertex = screen
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != exclude)
            .map(|(index, position)| (index, position.distance(pointer)))
            .filter(|(_, distance)| *distance <= self.tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((index, _)) = vertex {
            return vertices.get(index).copied();
        }

        feature
            .segments()
            .into_iter()
            .filter(|(a, b)| Some(*a) != exclude && Some(*b) != exclude)
            .filter_map(|(a, b)| {
                let closest = closest_on_segment(pointer, *screen.get(a)?, *screen.get(b)?);
                Some((closest, closest.distance(pointer)))
            })
            .filter(|(_, distance)| *distance <= self.tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(closest, _)| viewport.unproject(closest))
    }
}

/// Point of the `a`-`b` segment closest to `point`.
pub(crate) fn closest_on_segment(point: Pos2, a: Pos2, b: Pos2) -> Pos2 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq == 0. {
        return a;
    }

    let t = ((point - a).dot(ab) / length_sq).clamp(0., 1.);
    a + ab * t
}
