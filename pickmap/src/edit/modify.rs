use egui::Pos2;

use super::feature::Feature;
use super::snap::{Snap, closest_on_segment};
use super::{EditSource, Gesture, Viewport};

/// Lets the user drag vertices of the existing feature. Dragging an edge creates a new vertex
/// there.
#[derive(Debug, Clone, PartialEq)]
pub struct Modify {
    /// Distance in pixels.
    tolerance: f32,
    /// Vertex being dragged.
    dragging: Option<usize>,
}

impl Default for Modify {
    fn default() -> Self {
        Self {
            tolerance: 10.,
            dragging: None,
        }
    }
}

impl Modify {
    pub fn is_modifying(&self) -> bool {
        self.dragging.is_some()
    }

    /// React to the gesture. Returns whether the gesture was used, and the modified feature when
    /// dragging finishes.
    pub fn handle(
        &mut self,
        gesture: Gesture,
        source: &mut EditSource,
        snap: &Snap,
        viewport: &dyn Viewport,
    ) -> (bool, Option<Feature>) {
        match gesture {
            Gesture::DragStart(pointer) => {
                self.dragging = source
                    .feature_mut()
                    .and_then(|feature| self.grab(pointer, feature, viewport));
                if let Some(index) = self.dragging {
                    log::debug!("Modifying vertex {index}.");
                }
                (self.is_modifying(), None)
            }
            Gesture::DragMove(pointer) => {
                let Some(index) = self.dragging else {
                    return (false, None);
                };

                let position = snap
                    .snap(pointer, source.feature(), viewport, Some(index))
                    .unwrap_or_else(|| viewport.unproject(pointer));

                if let Some(feature) = source.feature_mut() {
                    feature.move_vertex(index, position);
                }
                (true, None)
            }
            Gesture::DragEnd(_) => match self.dragging.take() {
                Some(_) => (true, source.feature().cloned()),
                None => (false, None),
            },
            Gesture::Cancel => {
                self.dragging = None;
                (false, None)
            }
            _ => (false, None),
        }
    }

    /// Index of the vertex under the pointer. When the pointer is on an edge, a new vertex is
    /// created there.
    fn grab(&self, pointer: Pos2, feature: &mut Feature, viewport: &dyn Viewport) -> Option<usize> {
        let vertices = feature.vertices();
        let screen: Vec<Pos2> = vertices.iter().map(|v| viewport.project(*v)).collect();

        let vertex = screen
            .iter()
            .enumerate()
            .map(|(index, position)| (index, position.distance(pointer)))
            .filter(|(_, distance)| *distance <= self.tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((index, _)) = vertex {
            return Some(index);
        }

        let (after, closest) = feature
            .segments()
            .into_iter()
            .filter_map(|(a, b)| {
                let closest = closest_on_segment(pointer, *screen.get(a)?, *screen.get(b)?);
                Some((a, closest, closest.distance(pointer)))
            })
            .filter(|(_, _, distance)| *distance <= self.tolerance)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(a, closest, _)| (a, closest))?;

        feature.insert_vertex(after + 1, viewport.unproject(closest));
        Some(after + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::tests::Identity;
    use crate::lon_lat;
    use egui::pos2;

    fn line_source() -> EditSource {
        let mut source = EditSource::default();
        source.set(Feature::line_string(&[lon_lat(0., 0.), lon_lat(100., 0.)]));
        source
    }

    #[test]
    fn vertex_is_dragged() {
        let mut source = line_source();
        let mut modify = Modify::default();
        let snap = Snap::default();

        let (consumed, _) =
            modify.handle(Gesture::DragStart(pos2(98., 3.)), &mut source, &snap, &Identity);
        assert!(consumed);
        assert!(modify.is_modifying());

        modify.handle(Gesture::DragMove(pos2(100., 50.)), &mut source, &snap, &Identity);
        let (consumed, modified) =
            modify.handle(Gesture::DragEnd(pos2(100., 50.)), &mut source, &snap, &Identity);

        assert!(consumed);
        assert_eq!(modified.unwrap().coordinates_text(), "[[0,0],[100,50]]");
        assert!(!modify.is_modifying());
    }

    #[test]
    fn dragging_an_edge_adds_a_vertex() {
        let mut source = line_source();
        let mut modify = Modify::default();
        let snap = Snap::default();

        modify.handle(Gesture::DragStart(pos2(50., 4.)), &mut source, &snap, &Identity);
        modify.handle(Gesture::DragMove(pos2(50., 30.)), &mut source, &snap, &Identity);
        let (_, modified) =
            modify.handle(Gesture::DragEnd(pos2(50., 30.)), &mut source, &snap, &Identity);

        assert_eq!(modified.unwrap().coordinates_text(), "[[0,0],[50,30],[100,0]]");
    }

    #[test]
    fn dragged_vertex_snaps_to_other_vertices() {
        let mut source = EditSource::default();
        source.set(Feature::line_string(&[
            lon_lat(0., 0.),
            lon_lat(100., 0.),
            lon_lat(100., 100.),
        ]));
        let mut modify = Modify::default();
        let snap = Snap::default();

        modify.handle(Gesture::DragStart(pos2(100., 100.)), &mut source, &snap, &Identity);
        modify.handle(Gesture::DragMove(pos2(4., 3.)), &mut source, &snap, &Identity);

        assert_eq!(
            source.feature().unwrap().vertices()[2],
            lon_lat(0., 0.)
        );
    }

    #[test]
    fn dragging_far_from_feature_is_not_taken() {
        let mut source = line_source();
        let mut modify = Modify::default();
        let snap = Snap::default();

        let (consumed, _) =
            modify.handle(Gesture::DragStart(pos2(50., 50.)), &mut source, &snap, &Identity);
        assert!(!consumed);

        let (consumed, modified) =
            modify.handle(Gesture::DragEnd(pos2(60., 60.)), &mut source, &snap, &Identity);
        assert!(!consumed);
        assert!(modified.is_none());
    }
}
