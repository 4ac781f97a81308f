//! Basemap descriptors, as read from the configuration or the host, and the tile sources built
//! out of them.

use serde::{Deserialize, Deserializer};

use crate::TileId;
use crate::projection::Projection;
use crate::sources::{Attribution, OpenStreetMap, TileSource, Wmts, WmtsOptions, Xyz};
use crate::tile_grid::{Extent, TileGrid};

/// Which basemap to show. Unknown or missing `type` means OpenStreetMap. Fields which are missing
/// or malformed take their defaults, so a descriptor is never rejected.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawDescriptor")]
pub enum BasemapDescriptor {
    /// `{z}/{x}/{y}` tile service.
    Xyz {
        url: String,
        attribution: Option<String>,
    },
    Wmts(WmtsDescriptor),
    #[default]
    Osm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WmtsDescriptor {
    pub url: String,
    /// Projection code as written in the configuration, e.g. `"4490"`.
    pub projection: Option<String>,
    pub extent: Extent,
    /// Shift between the grid's level and the index of its matrix. May be negative.
    pub matrix_id_offset: i64,
    pub options: WmtsOptions,
    pub attribution: Option<String>,
}

impl WmtsDescriptor {
    pub fn projection(&self) -> Projection {
        Projection::from_code(self.projection.as_deref(), self.extent)
    }

    pub fn tile_grid(&self) -> TileGrid {
        TileGrid::wmts(self.extent, self.matrix_id_offset)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectionCode {
    Text(String),
    Number(f64),
}

impl From<ProjectionCode> for String {
    fn from(code: ProjectionCode) -> Self {
        match code {
            ProjectionCode::Text(text) => text,
            ProjectionCode::Number(number) => number.to_string(),
        }
    }
}

/// Descriptor exactly as written in the configuration.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    #[serde(rename = "type", default)]
    kind: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    projection: Option<ProjectionCode>,
    #[serde(default, deserialize_with = "lenient")]
    extent: Option<Extent>,
    #[serde(default, alias = "matrixIdOffest", deserialize_with = "lenient")]
    matrix_id_offset: Option<i64>,
    #[serde(default, alias = "wmtsOption", deserialize_with = "lenient")]
    wmts_options: Option<WmtsOptions>,
    #[serde(default, deserialize_with = "lenient")]
    attribution: Option<String>,
}

/// Read an optional field, treating a value of the wrong shape as missing.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value)
        .inspect_err(|err| log::warn!("Ignoring malformed basemap field: {err}"))
        .ok())
}

fn url_or_empty(url: Option<String>, kind: &str) -> String {
    url.unwrap_or_else(|| {
        log::warn!("{kind} basemap has no url, its tiles will not load.");
        String::new()
    })
}

impl From<RawDescriptor> for BasemapDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        let kind = raw.kind.as_ref().and_then(serde_json::Value::as_str);

        match kind {
            Some("XYZ") => Self::Xyz {
                url: url_or_empty(raw.url, "XYZ"),
                attribution: raw.attribution,
            },
            Some("WMTS") => {
                let extent = match raw.extent {
                    Some(extent) if !extent.is_valid() => {
                        log::warn!("Extent {extent:?} is empty or not finite, using the world.");
                        Extent::default()
                    }
                    extent => extent.unwrap_or_default(),
                };

                Self::Wmts(WmtsDescriptor {
                    url: url_or_empty(raw.url, "WMTS"),
                    projection: raw.projection.map(String::from),
                    extent,
                    matrix_id_offset: raw.matrix_id_offset.unwrap_or_default(),
                    options: raw.wmts_options.unwrap_or_default(),
                    attribution: raw.attribution,
                })
            }
            other => {
                log::debug!("Basemap type {other:?} is not known, using OpenStreetMap.");
                Self::Osm
            }
        }
    }
}

/// Tile source built out of a [`BasemapDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub enum Basemap {
    Osm(OpenStreetMap),
    Xyz(Xyz),
    Wmts(Wmts),
}

impl Basemap {
    pub fn new(descriptor: &BasemapDescriptor) -> Self {
        match descriptor {
            BasemapDescriptor::Xyz { url, attribution } => {
                Self::Xyz(Xyz::new(url, attribution.clone()))
            }
            BasemapDescriptor::Wmts(wmts) => Self::Wmts(Wmts::new(
                wmts.url.clone(),
                wmts.options.clone(),
                wmts.projection(),
                wmts.tile_grid(),
                wmts.attribution.clone(),
            )),
            BasemapDescriptor::Osm => Self::Osm(OpenStreetMap),
        }
    }

    fn source(&self) -> &dyn TileSource {
        match self {
            Self::Osm(source) => source,
            Self::Xyz(source) => source,
            Self::Wmts(source) => source,
        }
    }
}

impl Default for Basemap {
    fn default() -> Self {
        Self::Osm(OpenStreetMap)
    }
}

impl TileSource for Basemap {
    fn tile_url(&self, tile_id: TileId) -> String {
        self.source().tile_url(tile_id)
    }

    fn attribution(&self) -> Attribution {
        self.source().attribution()
    }

    fn tile_grid(&self) -> &TileGrid {
        self.source().tile_grid()
    }

    fn projection(&self) -> Projection {
        self.source().projection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn descriptor(text: &str) -> Result<BasemapDescriptor, json5::Error> {
        json5::from_str(text)
    }

    #[test]
    fn wmts_grid_with_shifted_matrix_ids() {
        let descriptor =
            descriptor("{type: 'WMTS', extent: [-180, -90, 180, 90], matrixIdOffset: 2}").unwrap();
        let basemap = Basemap::new(&descriptor);
        let grid = basemap.tile_grid();

        assert_relative_eq!(grid.resolution(1).unwrap(), 360. / (256. * 2.));
        assert_relative_eq!(grid.resolution(1).unwrap(), 0.703125);
        assert_eq!(grid.matrix_ids()[3], Some(1));
        assert_eq!(basemap.projection(), Projection::Epsg4326);
    }

    #[test]
    fn huge_matrix_offset_leaves_no_usable_levels() {
        let descriptor =
            descriptor("{type: 'WMTS', url: 'u', matrixIdOffset: 4294967295}").unwrap();
        let basemap = Basemap::new(&descriptor);

        assert!(basemap.tile_grid().matrix_ids().len() <= 256);
        assert_eq!(basemap.tile_grid().min_level(), None);
    }

    #[test]
    fn negative_matrix_offset_is_accepted() {
        let BasemapDescriptor::Wmts(wmts) =
            descriptor("{type: 'WMTS', url: 'u', matrixIdOffset: -1}").unwrap()
        else {
            panic!("expected WMTS descriptor");
        };

        assert_eq!(wmts.matrix_id_offset, -1);
        assert_eq!(wmts.tile_grid().matrix_id(1), Some(2));
        assert_eq!(wmts.tile_grid().min_level(), Some(1));
    }

    #[test]
    fn misspelled_keys_are_understood() {
        let BasemapDescriptor::Wmts(wmts) = descriptor(
            "{type: 'WMTS', url: 'u', matrixIdOffest: 1, wmtsOption: {layer: 'img', matrixSet: 'c'}}",
        )
        .unwrap() else {
            panic!("expected WMTS descriptor");
        };

        assert_eq!(wmts.matrix_id_offset, 1);
        assert_eq!(wmts.options.layer, "img");
        assert_eq!(wmts.options.matrix_set, "c");
    }

    #[test]
    fn projection_can_be_a_number_or_text() {
        let Ok(BasemapDescriptor::Wmts(numeric)) =
            descriptor("{type: 'WMTS', url: 'u', projection: 4490}")
        else {
            panic!("expected WMTS descriptor");
        };
        let Ok(BasemapDescriptor::Wmts(textual)) =
            descriptor("{type: 'WMTS', url: 'u', projection: '3857'}")
        else {
            panic!("expected WMTS descriptor");
        };

        assert_eq!(
            numeric.projection(),
            Projection::Epsg4490 {
                extent: Extent::world_degrees()
            }
        );
        assert_eq!(textual.projection(), Projection::Epsg3857);
    }

    #[test]
    fn xyz_descriptor() {
        let descriptor = descriptor(
            "{type: 'XYZ', url: 'https://server.arcgisonline.com/ArcGIs/rest/services/World_Street_Map/MapServer/tile/{z}/{y}/{x}'}",
        )
        .unwrap();

        let basemap = Basemap::new(&descriptor);
        assert!(matches!(basemap, Basemap::Xyz(_)));
        assert_eq!(
            basemap.tile_url(TileId { x: 1, y: 2, zoom: 3 }),
            "https://server.arcgisonline.com/ArcGIs/rest/services/World_Street_Map/MapServer/tile/3/2/1"
        );
    }

    #[test]
    fn unknown_or_missing_type_means_openstreetmap() {
        assert_eq!(descriptor("{type: 'WMS'}").unwrap(), BasemapDescriptor::Osm);
        assert_eq!(descriptor("{type: 7}").unwrap(), BasemapDescriptor::Osm);
        assert_eq!(descriptor("{}").unwrap(), BasemapDescriptor::Osm);
        assert_eq!(
            Basemap::new(&BasemapDescriptor::Osm),
            Basemap::Osm(OpenStreetMap)
        );
    }

    #[test]
    fn malformed_fields_take_defaults() {
        assert_eq!(
            descriptor("{type: 'XYZ'}").unwrap(),
            BasemapDescriptor::Xyz {
                url: String::new(),
                attribution: None
            }
        );

        let BasemapDescriptor::Wmts(wmts) = descriptor(
            "{type: 'WMTS', url: 5, extent: [10, 0, 10, 5], matrixIdOffset: 'two', wmtsOptions: 1}",
        )
        .unwrap() else {
            panic!("expected WMTS descriptor");
        };

        assert_eq!(wmts.url, "");
        assert_eq!(wmts.extent, Extent::world_degrees());
        assert_eq!(wmts.matrix_id_offset, 0);
        assert_eq!(wmts.options, WmtsOptions::default());
    }
}
