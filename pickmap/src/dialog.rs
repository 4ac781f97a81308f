//! Confirmation dialog showing coordinates of the drawn shape, which the user may edit before
//! submitting them.

use egui::{Context, Id, Modal, TextEdit};

use crate::bridge::PickValue;
use crate::edit::{DrawMode, Feature, number_text};

/// Form fields, as they were filled from the feature and possibly edited by the user.
#[derive(Debug, Clone, PartialEq)]
pub enum FormFields {
    LonLat { lon: String, lat: String },
    /// Coordinate array as JSON text.
    Coordinates(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickForm {
    pub fields: FormFields,
}

impl PickForm {
    /// Form for the mode the feature was drawn in.
    pub fn new(feature: &Feature, mode: DrawMode) -> Self {
        let fields = match mode {
            DrawMode::Point => {
                let first = feature.vertices().first().copied();
                FormFields::LonLat {
                    lon: first.map(|p| number_text(p.x())).unwrap_or_default(),
                    lat: first.map(|p| number_text(p.y())).unwrap_or_default(),
                }
            }
            DrawMode::LineString | DrawMode::Polygon => {
                FormFields::Coordinates(feature.coordinates_text())
            }
        };
        Self { fields }
    }

    /// Value to be sent to the host. Text is not validated, `mode` decides only how the fields are
    /// put together.
    pub fn value(&self, mode: DrawMode) -> PickValue {
        match (&self.fields, mode) {
            (FormFields::LonLat { lon, lat }, DrawMode::Point) => PickValue::Point {
                lon: lon.clone(),
                lat: lat.clone(),
            },
            (FormFields::LonLat { lon, lat }, DrawMode::LineString | DrawMode::Polygon) => {
                PickValue::Coordinates(format!("[{lon},{lat}]"))
            }
            (FormFields::Coordinates(text), DrawMode::Point) => match first_pair(text) {
                Some((lon, lat)) => PickValue::Point {
                    lon: number_text(lon),
                    lat: number_text(lat),
                },
                None => PickValue::Coordinates(text.clone()),
            },
            (FormFields::Coordinates(text), DrawMode::LineString | DrawMode::Polygon) => {
                PickValue::Coordinates(text.clone())
            }
        }
    }
}

/// First `[x, y]` pair found in the JSON text, depth first.
fn first_pair(text: &str) -> Option<(f64, f64)> {
    fn find(value: &serde_json::Value) -> Option<(f64, f64)> {
        let items = value.as_array()?;
        if let [x, y, ..] = items.as_slice()
            && let (Some(x), Some(y)) = (x.as_f64(), y.as_f64())
        {
            return Some((x, y));
        }
        items.iter().find_map(find)
    }

    let value = serde_json::from_str(text)
        .inspect_err(|err| log::debug!("Coordinates are not JSON: {err}"))
        .ok()?;
    find(&value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    Submit,
    Cancel,
}

/// Modal dialog with a [`PickForm`].
#[derive(Debug, Clone, Default)]
pub struct PickDialog {
    form: Option<PickForm>,
}

impl PickDialog {
    /// Open the dialog for the feature, replacing whatever it showed.
    pub fn open(&mut self, feature: &Feature, mode: DrawMode) {
        self.form = Some(PickForm::new(feature, mode));
    }

    pub fn is_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn form(&self) -> Option<&PickForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut PickForm> {
        self.form.as_mut()
    }

    pub fn close(&mut self) {
        self.form = None;
    }

    /// Close the dialog and return the value of the form. `None` if it was not open.
    pub fn submit(&mut self, mode: DrawMode) -> Option<PickValue> {
        self.form.take().map(|form| form.value(mode))
    }

    /// Show the dialog, if open. Returns the button which was pressed.
    pub fn show(&mut self, ctx: &Context) -> Option<DialogAction> {
        let form = self.form.as_mut()?;

        let modal = Modal::new(Id::new("pickmap_dialog")).show(ctx, |ui| {
            ui.set_width(320.);

            match &mut form.fields {
                FormFields::LonLat { lon, lat } => {
                    egui::Grid::new("pickmap_lon_lat").num_columns(2).show(ui, |ui| {
                        ui.label("Longitude:");
                        ui.add(TextEdit::singleline(lon).hint_text("Longitude"));
                        ui.end_row();
                        ui.label("Latitude:");
                        ui.add(TextEdit::singleline(lat).hint_text("Latitude"));
                        ui.end_row();
                    });
                }
                FormFields::Coordinates(text) => {
                    ui.label("Coordinates:");
                    ui.add(
                        TextEdit::multiline(text)
                            .desired_rows(4)
                            .desired_width(f32::INFINITY)
                            .hint_text("Coordinates"),
                    );
                }
            }

            ui.separator();

            ui.horizontal(|ui| {
                let submit = ui.button("Submit").clicked();
                let cancel = ui.button("Cancel").clicked();
                match (submit, cancel) {
                    (true, _) => Some(DialogAction::Submit),
                    (false, true) => Some(DialogAction::Cancel),
                    (false, false) => None,
                }
            })
            .inner
        });

        modal
            .inner
            .or_else(|| modal.should_close().then_some(DialogAction::Cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lon_lat;

    fn line() -> Feature {
        Feature::line_string(&[lon_lat(119., 23.), lon_lat(120.5, 24.)])
    }

    #[test]
    fn point_form_has_longitude_then_latitude() {
        let form = PickForm::new(&Feature::point(lon_lat(119., 23.)), DrawMode::Point);
        assert_eq!(
            form.fields,
            FormFields::LonLat {
                lon: "119".to_owned(),
                lat: "23".to_owned()
            }
        );
        assert_eq!(
            form.value(DrawMode::Point),
            PickValue::Point {
                lon: "119".to_owned(),
                lat: "23".to_owned()
            }
        );
    }

    #[test]
    fn line_form_has_coordinates_text() {
        let form = PickForm::new(&line(), DrawMode::LineString);
        assert_eq!(
            form.fields,
            FormFields::Coordinates("[[119,23],[120.5,24]]".to_owned())
        );
    }

    #[test]
    fn edited_text_is_not_validated() {
        let mut form = PickForm::new(&line(), DrawMode::Polygon);
        form.fields = FormFields::Coordinates("not [really] json".to_owned());

        assert_eq!(
            form.value(DrawMode::Polygon),
            PickValue::Coordinates("not [really] json".to_owned())
        );
    }

    #[test]
    fn point_mode_takes_first_pair_of_coordinates_text() {
        let form = PickForm::new(&line(), DrawMode::LineString);
        assert_eq!(
            form.value(DrawMode::Point),
            PickValue::Point {
                lon: "119".to_owned(),
                lat: "23".to_owned()
            }
        );

        let polygon = PickForm {
            fields: FormFields::Coordinates("[[[1.5,2],[3,4],[5,6],[1.5,2]]]".to_owned()),
        };
        assert_eq!(
            polygon.value(DrawMode::Point),
            PickValue::Point {
                lon: "1.5".to_owned(),
                lat: "2".to_owned()
            }
        );
    }

    #[test]
    fn point_mode_passes_garbage_through() {
        let form = PickForm {
            fields: FormFields::Coordinates("somewhere".to_owned()),
        };
        assert_eq!(
            form.value(DrawMode::Point),
            PickValue::Coordinates("somewhere".to_owned())
        );
    }

    #[test]
    fn line_mode_assembles_pair_from_lon_lat_fields() {
        let form = PickForm {
            fields: FormFields::LonLat {
                lon: "119".to_owned(),
                lat: " 23.5".to_owned(),
            },
        };
        assert_eq!(
            form.value(DrawMode::LineString),
            PickValue::Coordinates("[119, 23.5]".to_owned())
        );
    }

    #[test]
    fn submitting_closes_the_dialog() {
        let mut dialog = PickDialog::default();
        assert_eq!(dialog.submit(DrawMode::Point), None);

        dialog.open(&Feature::point(lon_lat(1., 2.)), DrawMode::Point);
        assert!(dialog.is_open());

        if let Some(PickForm {
            fields: FormFields::LonLat { lat, .. },
        }) = dialog.form_mut()
        {
            *lat = "2.25".to_owned();
        }

        assert_eq!(
            dialog.submit(DrawMode::Point),
            Some(PickValue::Point {
                lon: "1".to_owned(),
                lat: "2.25".to_owned()
            })
        );
        assert!(!dialog.is_open());
    }

    #[test]
    fn cancel_closes_without_value() {
        let mut dialog = PickDialog::default();
        dialog.open(&line(), DrawMode::LineString);
        dialog.close();
        assert_eq!(dialog.submit(DrawMode::LineString), None);
    }
}
