//! Tile grids: per-level resolutions and matrix identifiers used to address raster tiles.

use geo_types::Coord;
use serde::Deserialize;

use crate::tiles::TileId;

/// Size of a single tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Highest level computed for WMTS grids.
const WMTS_MAX_LEVEL: u8 = 18;

/// Highest level of the OpenStreetMap-like grids.
/// <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames#Zoom_levels>
const WEB_MERCATOR_MAX_LEVEL: u8 = 19;

/// Half of the Web Mercator world width, in meters.
pub(crate) const WEB_MERCATOR_HALF_WIDTH: f64 = 20_037_508.342_789_244;

/// Rectangle in map units, written as `[min_x, min_y, max_x, max_y]` in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 4]")]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whole world in degrees.
    pub const fn world_degrees() -> Self {
        Self::new(-180., -90., 180., 90.)
    }

    /// Whole world in Web Mercator meters.
    pub const fn world_web_mercator() -> Self {
        Self::new(
            -WEB_MERCATOR_HALF_WIDTH,
            -WEB_MERCATOR_HALF_WIDTH,
            WEB_MERCATOR_HALF_WIDTH,
            WEB_MERCATOR_HALF_WIDTH,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn top_left(&self) -> Coord {
        Coord {
            x: self.min_x,
            y: self.max_y,
        }
    }

    /// Extent with positive width and height, and finite corners.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.width() > 0.
            && self.height() > 0.
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::world_degrees()
    }
}

impl From<[f64; 4]> for Extent {
    fn from([min_x, min_y, max_x, max_y]: [f64; 4]) -> Self {
        Self::new(min_x, min_y, max_x, max_y)
    }
}

/// Describes how the map is cut into tiles. Index of [`TileGrid::resolutions`] and
/// [`TileGrid::matrix_ids`] is the level (zoom) of the grid; a level is usable only when both
/// of them are defined for it.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    origin: Coord,
    extent: Extent,
    resolutions: Vec<Option<f64>>,
    matrix_ids: Vec<Option<u32>>,
    tile_size: u32,
}

impl TileGrid {
    /// Standard power-of-two pyramid used by WMTS services. Resolution of level `z` (1 to 18) is
    /// `extent width / (256 * 2^z)`, level 0 is left undefined. Matrix at index `z + offset` is
    /// identified as `z`, which lets services whose matrix set does not start at zero be
    /// addressed. Indices which are not a valid level are skipped.
    pub fn wmts(extent: Extent, matrix_id_offset: i64) -> Self {
        let width = extent.width();
        let mut resolutions = vec![None; usize::from(WMTS_MAX_LEVEL) + 1];
        let mut matrix_ids = Vec::new();

        for z in 1..=WMTS_MAX_LEVEL {
            resolutions[usize::from(z)] =
                Some(width / (f64::from(TILE_SIZE) * 2f64.powi(i32::from(z))));

            let index = i64::from(z)
                .checked_add(matrix_id_offset)
                .and_then(|index| u8::try_from(index).ok());
            if let Some(index) = index.map(usize::from) {
                if matrix_ids.len() <= index {
                    matrix_ids.resize(index + 1, None);
                }
                matrix_ids[index] = Some(u32::from(z));
            }
        }

        Self {
            origin: extent.top_left(),
            extent,
            resolutions,
            matrix_ids,
            tile_size: TILE_SIZE,
        }
    }

    /// Grid of OpenStreetMap and the other XYZ services: Web Mercator, one tile at level 0.
    pub fn web_mercator() -> Self {
        let extent = Extent::world_web_mercator();
        let levels = 0..=WEB_MERCATOR_MAX_LEVEL;

        Self {
            origin: extent.top_left(),
            extent,
            resolutions: levels
                .clone()
                .map(|z| Some(extent.width() / (f64::from(TILE_SIZE) * 2f64.powi(i32::from(z)))))
                .collect(),
            matrix_ids: levels.map(|z| Some(u32::from(z))).collect(),
            tile_size: TILE_SIZE,
        }
    }

    pub fn origin(&self) -> Coord {
        self.origin
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn resolutions(&self) -> &[Option<f64>] {
        &self.resolutions
    }

    pub fn matrix_ids(&self) -> &[Option<u32>] {
        &self.matrix_ids
    }

    pub fn resolution(&self, level: u8) -> Option<f64> {
        self.resolutions.get(usize::from(level)).copied().flatten()
    }

    pub fn matrix_id(&self, level: u8) -> Option<u32> {
        self.matrix_ids.get(usize::from(level)).copied().flatten()
    }

    /// Levels for which tiles can be requested.
    pub fn levels(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX)
            .take(self.resolutions.len().min(self.matrix_ids.len()))
            .filter(|level| self.resolution(*level).is_some() && self.matrix_id(*level).is_some())
    }

    pub fn min_level(&self) -> Option<u8> {
        self.levels().next()
    }

    pub fn max_level(&self) -> Option<u8> {
        self.levels().last()
    }

    /// Resolution (map units per pixel) of a possibly fractional zoom.
    pub fn resolution_at(&self, zoom: f64) -> f64 {
        self.extent.width() / (f64::from(self.tile_size) * 2f64.powf(zoom))
    }

    /// Usable level closest to the given zoom.
    pub fn level_for_zoom(&self, zoom: f64) -> Option<u8> {
        self.levels().min_by(|a, b| {
            (f64::from(*a) - zoom)
                .abs()
                .total_cmp(&(f64::from(*b) - zoom).abs())
        })
    }

    /// Width (and height) of a single tile of the level, in map units.
    pub fn tile_span(&self, level: u8) -> Option<f64> {
        Some(self.resolution(level)? * f64::from(self.tile_size))
    }

    /// Number of tile columns and rows of the level.
    pub fn tiles_across(&self, level: u8) -> Option<(u32, u32)> {
        let span = self.tile_span(level)?;
        // Tolerance for the floating point error of the division.
        let count = |length: f64| ((length / span) - 1e-9).ceil().max(1.) as u32;
        Some((count(self.extent.width()), count(self.extent.height())))
    }

    pub fn contains(&self, tile_id: TileId) -> bool {
        self.matrix_id(tile_id.zoom).is_some()
            && self
                .tiles_across(tile_id.zoom)
                .is_some_and(|(columns, rows)| tile_id.x < columns && tile_id.y < rows)
    }

    /// Tile of the level covering the given point.
    pub fn tile_at(&self, point: Coord, level: u8) -> Option<TileId> {
        let span = self.tile_span(level)?;
        let x = ((point.x - self.origin.x) / span).floor();
        let y = ((self.origin.y - point.y) / span).floor();

        if x < 0. || y < 0. {
            return None;
        }

        let tile_id = TileId {
            x: x as u32,
            y: y as u32,
            zoom: level,
        };

        self.contains(tile_id).then_some(tile_id)
    }

    /// Area covered by the tile, in map units.
    pub fn tile_bounds(&self, tile_id: TileId) -> Option<Extent> {
        let span = self.tile_span(tile_id.zoom)?;
        let min_x = self.origin.x + f64::from(tile_id.x) * span;
        let max_y = self.origin.y - f64::from(tile_id.y) * span;
        Some(Extent::new(min_x, max_y - span, min_x + span, max_y))
    }
}
