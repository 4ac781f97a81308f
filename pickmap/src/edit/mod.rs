//! Editing of the single vector layer: drawing a new shape, moving vertices of the existing one
//! and snapping the pointer to it.

mod draw;
mod feature;
mod layer;
mod modify;
mod snap;

pub use draw::{Draw, DrawMode, UnknownDrawMode};
pub use feature::{Feature, Geometry};
pub use layer::EditLayer;
pub use modify::Modify;
pub use snap::Snap;

pub(crate) use feature::number_text;

use egui::Pos2;

use crate::Position;

/// Conversion between positions and screen pixels. Tolerances of the interactions are in pixels.
pub trait Viewport {
    fn project(&self, position: Position) -> Pos2;
    fn unproject(&self, position: Pos2) -> Position;
}

/// Pointer input, already recognized by the map widget. Positions are in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Click(Pos2),
    DoubleClick(Pos2),
    DragStart(Pos2),
    DragMove(Pos2),
    DragEnd(Pos2),
    Hover(Pos2),
    /// Escape key.
    Cancel,
}

impl Gesture {
    fn pointer(&self) -> Option<Pos2> {
        match self {
            Gesture::Click(pointer)
            | Gesture::DoubleClick(pointer)
            | Gesture::DragStart(pointer)
            | Gesture::DragMove(pointer)
            | Gesture::DragEnd(pointer)
            | Gesture::Hover(pointer) => Some(*pointer),
            Gesture::Cancel => None,
        }
    }
}

/// Holds at most one feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditSource {
    feature: Option<Feature>,
}

impl EditSource {
    pub fn feature(&self) -> Option<&Feature> {
        self.feature.as_ref()
    }

    pub(crate) fn feature_mut(&mut self) -> Option<&mut Feature> {
        self.feature.as_mut()
    }

    /// Replace whatever was there.
    pub fn set(&mut self, feature: Feature) {
        self.feature = Some(feature);
    }

    pub fn clear(&mut self) {
        self.feature = None;
    }

    pub fn is_empty(&self) -> bool {
        self.feature.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    /// New shape was drawn.
    DrawEnd(Feature),
    /// Existing shape was changed.
    ModifyEnd(Feature),
}

impl EditEvent {
    pub fn feature(&self) -> &Feature {
        match self {
            EditEvent::DrawEnd(feature) | EditEvent::ModifyEnd(feature) => feature,
        }
    }
}

/// Edit source together with the interactions bound to it. Snap and modify live as long as the
/// session, while draw is replaced whenever the draw mode changes.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    source: EditSource,
    snap: Snap,
    modify: Modify,
    draw: Option<Draw>,
    enabled: bool,
    events: Vec<EditEvent>,
}

impl EditSession {
    pub fn new(mode: DrawMode) -> Self {
        Self {
            source: EditSource::default(),
            snap: Snap::default(),
            modify: Modify::default(),
            draw: Some(Draw::new(mode)),
            enabled: true,
            events: Vec::new(),
        }
    }

    pub fn source(&self) -> &EditSource {
        &self.source
    }

    pub fn draw(&self) -> Option<&Draw> {
        self.draw.as_ref()
    }

    pub fn draw_mode(&self) -> Option<DrawMode> {
        self.draw.as_ref().map(Draw::mode)
    }

    pub fn is_modifying(&self) -> bool {
        self.modify.is_modifying()
    }

    /// Disabled session ignores all gestures, so the shape can be neither drawn nor modified.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Remove the draw interaction, if there is one.
    pub fn exit_draw(&mut self) {
        if let Some(draw) = self.draw.take() {
            log::debug!("{} draw removed.", draw.mode());
        }
    }

    /// Replace the draw interaction with a new one. The feature and other interactions stay.
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.exit_draw();
        self.draw = Some(Draw::new(mode));
    }

    /// Feed the gesture to the interactions. Returns `true` if it was used for modifying the
    /// feature, so it should not move the map.
    pub fn handle(&mut self, gesture: Gesture, viewport: &dyn Viewport) -> bool {
        if !self.enabled {
            return false;
        }

        let (consumed, modified) =
            self.modify
                .handle(gesture, &mut self.source, &self.snap, viewport);

        if let Some(feature) = modified {
            log::debug!("Modified: {}", feature.coordinates_text());
            self.events.push(EditEvent::ModifyEnd(feature));
        }

        if consumed {
            return true;
        }

        if let Some(draw) = &mut self.draw {
            let position = gesture.pointer().map(|pointer| {
                self.snap
                    .snap(pointer, self.source.feature(), viewport, None)
                    .unwrap_or_else(|| viewport.unproject(pointer))
            });

            if let Some(feature) = draw.handle(gesture, position, &mut self.source, viewport) {
                self.events.push(EditEvent::DrawEnd(feature));
            }
        }

        false
    }

    /// Events which happened since the last call.
    pub fn take_events(&mut self) -> Vec<EditEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lon_lat;
    use egui::pos2;

    /// Pixels are degrees.
    pub(crate) struct Identity;

    impl Viewport for Identity {
        fn project(&self, position: Position) -> Pos2 {
            pos2(position.x() as f32, position.y() as f32)
        }

        fn unproject(&self, position: Pos2) -> Position {
            lon_lat(f64::from(position.x), f64::from(position.y))
        }
    }

    #[test]
    fn point_drawn_at_click() {
        let mut session = EditSession::new(DrawMode::Point);

        session.handle(Gesture::Click(pos2(119., 23.)), &Identity);

        assert_eq!(
            session.take_events(),
            [EditEvent::DrawEnd(Feature::point(lon_lat(119., 23.)))]
        );
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn there_is_one_feature_at_a_time() {
        let mut session = EditSession::new(DrawMode::Point);

        session.handle(Gesture::Click(pos2(10., 10.)), &Identity);
        session.handle(Gesture::Click(pos2(50., 50.)), &Identity);

        assert_eq!(
            session.source().feature(),
            Some(&Feature::point(lon_lat(50., 50.)))
        );
        assert_eq!(session.take_events().len(), 2);
    }

    #[test]
    fn drawn_vertices_snap_to_existing_feature() {
        let mut session = EditSession::new(DrawMode::Point);
        session.handle(Gesture::Click(pos2(10., 10.)), &Identity);
        session.take_events();

        // Starting a line clears the point, so there is nothing to snap to afterwards.
        session.set_draw_mode(DrawMode::LineString);
        session.handle(Gesture::Click(pos2(14., 13.)), &Identity);

        assert_eq!(
            session.draw().and_then(Draw::sketch),
            Some(vec![lon_lat(10., 10.)])
        );
        assert!(session.source().is_empty());
    }

    #[test]
    fn modifying_reports_the_feature() {
        let mut session = EditSession::new(DrawMode::Point);
        session.handle(Gesture::Click(pos2(10., 10.)), &Identity);
        session.take_events();

        assert!(session.handle(Gesture::DragStart(pos2(12., 12.)), &Identity));
        assert!(session.is_modifying());
        assert!(session.handle(Gesture::DragMove(pos2(30., 40.)), &Identity));
        assert!(session.handle(Gesture::DragEnd(pos2(30., 40.)), &Identity));

        assert_eq!(
            session.take_events(),
            [EditEvent::ModifyEnd(Feature::point(lon_lat(30., 40.)))]
        );
    }

    #[test]
    fn dragging_elsewhere_moves_the_map() {
        let mut session = EditSession::new(DrawMode::Point);
        assert!(!session.handle(Gesture::DragStart(pos2(12., 12.)), &Identity));
        assert!(!session.handle(Gesture::DragMove(pos2(30., 40.)), &Identity));
        assert!(!session.handle(Gesture::DragEnd(pos2(30., 40.)), &Identity));
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn draw_mode_can_be_replaced() {
        let mut session = EditSession::new(DrawMode::Point);
        session.handle(Gesture::Click(pos2(10., 10.)), &Identity);

        session.set_draw_mode(DrawMode::Polygon);

        assert_eq!(session.draw_mode(), Some(DrawMode::Polygon));
        // Existing feature stays until the next shape is started.
        assert!(!session.source().is_empty());
    }

    #[test]
    fn disabled_session_ignores_gestures() {
        let mut session = EditSession::new(DrawMode::Point);
        session.set_enabled(false);

        assert!(!session.handle(Gesture::Click(pos2(10., 10.)), &Identity));
        assert!(session.source().is_empty());

        session.set_enabled(true);
        session.handle(Gesture::Click(pos2(10., 10.)), &Identity);
        assert!(!session.source().is_empty());
    }

    #[test]
    fn removing_missing_draw_is_harmless() {
        let mut session = EditSession::new(DrawMode::LineString);
        session.exit_draw();
        session.exit_draw();
        assert_eq!(session.draw_mode(), None);

        // Without draw, clicks do nothing, but the feature can still be modified.
        session.handle(Gesture::Click(pos2(10., 10.)), &Identity);
        assert!(session.source().is_empty());
        assert!(session.take_events().is_empty());
    }
}
