use egui::{Align2, RichText, Ui, Window};
use pickmap::MapMemory;
use pickmap::sources::Attribution;

pub fn acknowledge(ui: &Ui, attribution: Attribution) {
    Window::new("Acknowledge")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::LEFT_TOP, [10., 10.])
        .show(ui.ctx(), |ui| {
            ui.horizontal(|ui| {
                ui.label("map provided by");
                match attribution.url {
                    Some(url) => ui.hyperlink_to(attribution.text, url),
                    None => ui.label(attribution.text),
                };
            });
        });
}

/// Simple GUI to zoom in and out.
pub fn zoom(ui: &Ui, map_memory: &mut MapMemory) {
    Window::new("Map")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::RIGHT_TOP, [-10., 10.])
        .show(ui.ctx(), |ui| {
            ui.horizontal(|ui| {
                if ui.button(RichText::new("➕").heading()).clicked() {
                    let _ = map_memory.zoom_in();
                }

                if ui.button(RichText::new("➖").heading()).clicked() {
                    let _ = map_memory.zoom_out();
                }
            });
        });
}

/// When map is "detached", show a window with an option to go back to the configured center.
pub fn go_home(ui: &Ui, map_memory: &mut MapMemory) {
    if let Some(position) = map_memory.detached() {
        Window::new("Center")
            .collapsible(false)
            .resizable(false)
            .title_bar(false)
            .anchor(Align2::RIGHT_TOP, [-10., 60.])
            .show(ui.ctx(), |ui| {
                ui.label(format!("center at {:.04} {:.04}", position.x(), position.y()));
                if ui.button(RichText::new("back to start").heading()).clicked() {
                    map_memory.go_home();
                }
            });
    }
}
