//! Remote tile services the basemap can be built from. Make sure you follow terms of usage of the
//! particular service.

mod openstreetmap;
mod wmts;
mod xyz;

pub use openstreetmap::OpenStreetMap;
pub use wmts::{RequestEncoding, Wmts, WmtsOptions};
pub use xyz::Xyz;

use crate::TileId;
use crate::projection::Projection;
use crate::tile_grid::TileGrid;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attribution {
    pub text: String,
    pub url: Option<String>,
}

impl Attribution {
    pub fn new(text: impl Into<String>, url: Option<&str>) -> Self {
        Self {
            text: text.into(),
            url: url.map(ToOwned::to_owned),
        }
    }
}

/// Remote tile server definition, source for the [`crate::HttpTiles`].
pub trait TileSource {
    fn tile_url(&self, tile_id: TileId) -> String;
    fn attribution(&self) -> Attribution;

    /// How the map is cut into tiles.
    fn tile_grid(&self) -> &TileGrid;

    fn projection(&self) -> Projection {
        Projection::Epsg3857
    }
}

/// Replace every `{key}` of the template with the value returned by `lookup`. Placeholders which
/// `lookup` does not know are kept as they are.
pub(crate) fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        result.push_str(&rest[..start]);
        let placeholder = &rest[start..];

        match placeholder.find('}') {
            Some(end) => {
                let key = &placeholder[1..end];
                match lookup(key) {
                    Some(value) => result.push_str(&value),
                    None => result.push_str(&placeholder[..=end]),
                }
                rest = &placeholder[end + 1..];
            }
            None => {
                result.push_str(placeholder);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}
