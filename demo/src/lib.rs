//! Application shared by the native and the web hosts: the picking widget filling the whole
//! window, with a few utility windows on top.

mod windows;

use pickmap::PickWidget;

pub struct PickApp {
    widget: PickWidget,
}

impl PickApp {
    pub fn new(widget: PickWidget) -> Self {
        Self { widget }
    }
}

impl eframe::App for PickApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let rimless = egui::Frame {
            fill: ctx.style().visuals.panel_fill,
            ..Default::default()
        };

        egui::CentralPanel::default()
            .frame(rimless)
            .show(ctx, |ui| {
                // Draw the map widget, or a spinner while the configuration is loading.
                if self.widget.show(ui).is_some() {
                    if let Some(attribution) = self.widget.attribution() {
                        windows::acknowledge(ui, attribution);
                    }
                    windows::zoom(ui, self.widget.map_memory_mut());
                    windows::go_home(ui, self.widget.map_memory_mut());
                }
            });
    }
}
