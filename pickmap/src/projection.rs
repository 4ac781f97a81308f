//! Map projections supported by the basemaps. Positions are always kept in EPSG:4326 degrees,
//! and are only projected into map units when they are put on screen.

use std::f64::consts::PI;

use geo_types::Coord;

use crate::Position;
use crate::tile_grid::{Extent, WEB_MERCATOR_HALF_WIDTH};

/// Web Mercator can not represent poles, it is usually cut at this latitude.
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Mean length of one degree at the equator, used for scale calculations.
const METERS_PER_DEGREE: f64 = 2. * PI * 6_378_137. / 360.;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Degrees,
    Meters,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// WGS 84 longitude and latitude.
    Epsg4326,
    /// China Geodetic Coordinate System 2000. Treated as identical to EPSG:4326 for display,
    /// but carries its own extent.
    Epsg4490 { extent: Extent },
    /// Spherical (Web) Mercator.
    Epsg3857,
}

impl Projection {
    /// Resolve projection of a WMTS layer. `"4490"` and `"3857"` (with or without the `EPSG:`
    /// prefix) are recognized, anything else means EPSG:4326.
    pub fn from_code(code: Option<&str>, extent: Extent) -> Self {
        let code = code.map(|code| code.trim().trim_start_matches("EPSG:"));
        match code {
            Some("4490") => Self::Epsg4490 { extent },
            Some("3857") => Self::Epsg3857,
            _ => Self::Epsg4326,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Epsg4326 => "EPSG:4326",
            Self::Epsg4490 { .. } => "EPSG:4490",
            Self::Epsg3857 => "EPSG:3857",
        }
    }

    pub fn units(&self) -> Units {
        match self {
            Self::Epsg4326 | Self::Epsg4490 { .. } => Units::Degrees,
            Self::Epsg3857 => Units::Meters,
        }
    }

    pub fn extent(&self) -> Extent {
        match self {
            Self::Epsg4326 => Extent::world_degrees(),
            Self::Epsg4490 { extent } => *extent,
            Self::Epsg3857 => Extent::world_web_mercator(),
        }
    }

    /// Turn longitude and latitude into map units.
    pub fn project(&self, position: Position) -> Coord {
        match self {
            Self::Epsg4326 | Self::Epsg4490 { .. } => position.0,
            Self::Epsg3857 => {
                let lat = position
                    .y()
                    .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
                Coord {
                    x: position.x() / 180. * WEB_MERCATOR_HALF_WIDTH,
                    y: (PI / 4. + lat.to_radians() / 2.).tan().ln() / PI * WEB_MERCATOR_HALF_WIDTH,
                }
            }
        }
    }

    /// Turn map units back into longitude and latitude.
    pub fn unproject(&self, point: Coord) -> Position {
        match self {
            Self::Epsg4326 | Self::Epsg4490 { .. } => Position::from(point),
            Self::Epsg3857 => {
                let lon = point.x / WEB_MERCATOR_HALF_WIDTH * 180.;
                let lat = (2. * (point.y / WEB_MERCATOR_HALF_WIDTH * PI).exp().atan() - PI / 2.)
                    .to_degrees();
                Position::new(lon, lat)
            }
        }
    }

    /// Ground distance covered by a single pixel at the given position.
    pub fn meters_per_pixel(&self, resolution: f64, position: Position) -> f64 {
        let cos_lat = position.y().to_radians().cos();
        match self.units() {
            // Average of the horizontal and vertical distances, as meridians converge.
            Units::Degrees => resolution * METERS_PER_DEGREE * (1. + cos_lat) / 2.,
            Units::Meters => resolution * cos_lat,
        }
    }
}
