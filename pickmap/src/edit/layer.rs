use egui::{Key, Response, Ui};

use super::{DrawMode, EditSession, Gesture};
use crate::map::Plugin;
use crate::projector::Projector;
use crate::style::Style;

/// [`Plugin`] which shows the edited shape and feeds pointer gestures to the [`EditSession`].
pub struct EditLayer<'a> {
    session: &'a mut EditSession,
    style: &'a Style,
}

impl<'a> EditLayer<'a> {
    pub fn new(session: &'a mut EditSession, style: &'a Style) -> Self {
        Self { session, style }
    }
}

impl Plugin for EditLayer<'_> {
    fn run(self: Box<Self>, ui: &mut Ui, response: &Response, projector: &Projector) -> bool {
        let mut taken = false;
        for gesture in gestures(ui, response) {
            taken |= self.session.handle(gesture, projector);
        }

        let painter = ui.painter();

        if let Some(feature) = self.session.source().feature() {
            self.style.paint_feature(painter, feature, projector);
        }

        if let Some(draw) = self.session.draw()
            && let Some(sketch) = draw.sketch()
        {
            let screen: Vec<_> = sketch
                .into_iter()
                .map(|position| projector.project(position))
                .collect();
            self.style
                .paint_sketch(painter, &screen, draw.mode() == DrawMode::Polygon);
        }

        taken
    }
}

/// Translate this frame's pointer and keyboard input into gestures.
fn gestures(ui: &Ui, response: &Response) -> Vec<Gesture> {
    let mut gestures = Vec::new();

    if response.drag_started()
        && let Some(origin) = ui.input(|input| input.pointer.press_origin())
    {
        gestures.push(Gesture::DragStart(origin));
    }

    let pointer = response
        .interact_pointer_pos()
        .or_else(|| ui.input(|input| input.pointer.latest_pos()));

    if let Some(pointer) = pointer {
        if response.dragged() {
            gestures.push(Gesture::DragMove(pointer));
        }

        if response.drag_stopped() {
            gestures.push(Gesture::DragEnd(pointer));
        }

        // Second click of a double click is reported only once.
        if response.double_clicked() {
            gestures.push(Gesture::DoubleClick(pointer));
        } else if response.clicked() {
            gestures.push(Gesture::Click(pointer));
        }
    }

    if !response.dragged()
        && let Some(pointer) = response.hover_pos()
    {
        gestures.push(Gesture::Hover(pointer));
    }

    if ui.input(|input| input.key_pressed(Key::Escape)) {
        gestures.push(Gesture::Cancel);
    }

    gestures
}
