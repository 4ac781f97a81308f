use std::collections::BTreeMap;

use serde::Deserialize;
use url::form_urlencoded;

use super::{Attribution, TileSource, fill_template};
use crate::TileId;
use crate::projection::Projection;
use crate::tile_grid::TileGrid;

/// Keys which are always computed from the descriptor and never taken from the options.
const COMPUTED_KEYS: [&str; 3] = ["url", "projection", "tileGrid"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RequestEncoding {
    #[default]
    #[serde(rename = "KVP", alias = "kvp")]
    Kvp,
    #[serde(rename = "REST", alias = "rest")]
    Rest,
}

/// Options of the WMTS layer, as written in the configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WmtsOptions {
    pub layer: String,
    pub style: String,
    pub format: String,
    pub version: String,
    pub matrix_set: String,
    pub request_encoding: RequestEncoding,
    /// Additional dimensions, like `TIME` or `ELEVATION`, sent with every request.
    pub dimensions: BTreeMap<String, serde_json::Value>,
    /// Everything else the configuration says about the layer.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for WmtsOptions {
    fn default() -> Self {
        Self {
            layer: String::new(),
            style: String::new(),
            format: "image/jpeg".to_owned(),
            version: "1.0.0".to_owned(),
            matrix_set: String::new(),
            request_encoding: RequestEncoding::Kvp,
            dimensions: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// OGC Web Map Tile Service layer with an explicitly computed tile grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Wmts {
    url: String,
    options: WmtsOptions,
    projection: Projection,
    tile_grid: TileGrid,
    attribution: Option<String>,
}

impl Wmts {
    pub fn new(
        url: String,
        mut options: WmtsOptions,
        projection: Projection,
        tile_grid: TileGrid,
        attribution: Option<String>,
    ) -> Self {
        options
            .extra
            .retain(|key, _| !COMPUTED_KEYS.contains(&key.as_str()));

        Self {
            url,
            options,
            projection,
            tile_grid,
            attribution,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &WmtsOptions {
        &self.options
    }

    pub fn request_encoding(&self) -> RequestEncoding {
        if self.url.to_ascii_lowercase().contains("{tilematrix}") {
            RequestEncoding::Rest
        } else {
            self.options.request_encoding
        }
    }

    fn dimension_values(&self) -> impl Iterator<Item = (&str, String)> {
        self.options
            .dimensions
            .iter()
            .map(|(key, value)| (key.as_str(), json_to_text(value)))
    }

    fn kvp_url(&self, tile_id: TileId, matrix_id: u32) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());
        params
            .append_pair("layer", &self.options.layer)
            .append_pair("style", &self.options.style)
            .append_pair("tilematrixset", &self.options.matrix_set)
            .append_pair("Service", "WMTS")
            .append_pair("Request", "GetTile")
            .append_pair("Version", &self.options.version)
            .append_pair("Format", &self.options.format)
            .append_pair("TileMatrix", &matrix_id.to_string())
            .append_pair("TileCol", &tile_id.x.to_string())
            .append_pair("TileRow", &tile_id.y.to_string());

        for (key, value) in self.dimension_values() {
            params.append_pair(key, &value);
        }

        let separator = if !self.url.contains('?') {
            "?"
        } else if self.url.ends_with('?') || self.url.ends_with('&') {
            ""
        } else {
            "&"
        };

        format!("{}{separator}{}", self.url, params.finish())
    }

    fn rest_url(&self, tile_id: TileId, matrix_id: u32) -> String {
        fill_template(&self.url, |key| {
            let value = match key.to_ascii_lowercase().as_str() {
                "layer" => self.options.layer.clone(),
                "style" => self.options.style.clone(),
                "tilematrixset" => self.options.matrix_set.clone(),
                "tilematrix" => matrix_id.to_string(),
                "tilecol" => tile_id.x.to_string(),
                "tilerow" => tile_id.y.to_string(),
                _ => {
                    return self
                        .dimension_values()
                        .find(|(dimension, _)| *dimension == key)
                        .map(|(_, value)| value);
                }
            };
            Some(value)
        })
    }
}

impl TileSource for Wmts {
    fn tile_url(&self, tile_id: TileId) -> String {
        let Some(matrix_id) = self.tile_grid.matrix_id(tile_id.zoom) else {
            log::warn!("No tile matrix for level {}.", tile_id.zoom);
            return String::new();
        };

        match self.request_encoding() {
            RequestEncoding::Kvp => self.kvp_url(tile_id, matrix_id),
            RequestEncoding::Rest => self.rest_url(tile_id, matrix_id),
        }
    }

    fn attribution(&self) -> Attribution {
        Attribution::new(self.attribution.clone().unwrap_or_default(), None)
    }

    fn tile_grid(&self) -> &TileGrid {
        &self.tile_grid
    }

    fn projection(&self) -> Projection {
        self.projection
    }
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_grid::Extent;

    fn tianditu(url: &str, options: WmtsOptions) -> Wmts {
        let extent = Extent::world_degrees();
        Wmts::new(
            url.to_owned(),
            options,
            Projection::Epsg4326,
            TileGrid::wmts(extent, 0),
            None,
        )
    }

    #[test]
    fn kvp_request_uses_matrix_id() {
        let options = WmtsOptions {
            layer: "vec".to_owned(),
            style: "default".to_owned(),
            format: "tiles".to_owned(),
            matrix_set: "c".to_owned(),
            ..Default::default()
        };
        let source = tianditu("http://t0.tianditu.gov.cn/vec_c/wmts?tk=key", options);

        assert_eq!(
            source.tile_url(TileId { x: 6, y: 1, zoom: 3 }),
            "http://t0.tianditu.gov.cn/vec_c/wmts?tk=key&layer=vec&style=default&tilematrixset=c\
             &Service=WMTS&Request=GetTile&Version=1.0.0&Format=tiles\
             &TileMatrix=3&TileCol=6&TileRow=1"
        );
    }

    #[test]
    fn kvp_request_with_shifted_matrix_ids() {
        let source = Wmts::new(
            "https://example.com/wmts".to_owned(),
            WmtsOptions::default(),
            Projection::Epsg4326,
            TileGrid::wmts(Extent::world_degrees(), 2),
            None,
        );

        let url = source.tile_url(TileId { x: 0, y: 0, zoom: 3 });
        assert!(url.starts_with("https://example.com/wmts?layer="), "{url}");
        assert!(url.contains("&TileMatrix=1&"), "{url}");
    }

    #[test]
    fn rest_template_is_filled() {
        let mut options = WmtsOptions {
            layer: "img".to_owned(),
            style: "default".to_owned(),
            matrix_set: "EPSG:4490".to_owned(),
            request_encoding: RequestEncoding::Rest,
            ..Default::default()
        };
        options
            .dimensions
            .insert("Time".to_owned(), serde_json::json!(2020));

        let source = tianditu(
            "https://example.com/{Layer}/{style}/{TileMatrixSet}/{Time}/{TileMatrix}/{TileRow}/{TileCol}.png",
            options,
        );

        assert_eq!(
            source.tile_url(TileId { x: 2, y: 1, zoom: 4 }),
            "https://example.com/img/default/EPSG:4490/2020/4/1/2.png"
        );
    }

    #[test]
    fn template_placeholders_imply_rest() {
        let source = tianditu(
            "https://example.com/{TileMatrix}/{TileRow}/{TileCol}",
            WmtsOptions::default(),
        );
        assert_eq!(source.request_encoding(), RequestEncoding::Rest);
        assert_eq!(
            source.tile_url(TileId { x: 1, y: 0, zoom: 1 }),
            "https://example.com/1/0/1"
        );
    }

    #[test]
    fn computed_keys_are_not_passed_through() {
        let options: WmtsOptions = serde_json::from_str(
            r#"{"layer": "vec", "url": "http://ignored", "tileGrid": {}, "wrapX": true}"#,
        )
        .unwrap();
        let source = tianditu("https://example.com/wmts", options);

        assert_eq!(source.url(), "https://example.com/wmts");
        assert_eq!(source.options().layer, "vec");
        assert_eq!(
            source.options().extra.keys().collect::<Vec<_>>(),
            ["wrapX"]
        );
    }

    #[test]
    fn level_without_matrix_has_no_url() {
        let source = tianditu("https://example.com/wmts", WmtsOptions::default());
        assert_eq!(source.tile_url(TileId { x: 0, y: 0, zoom: 0 }), "");
    }
}
