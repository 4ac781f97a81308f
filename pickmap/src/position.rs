//! Types and functions for working with positions.

/// Geographical position with longitude and latitude, in degrees (EPSG:4326).
pub type Position = geo_types::Point;

/// Construct `Position` from latitude and longitude.
pub fn lat_lon(lat: f64, lon: f64) -> Position {
    Position::new(lon, lat)
}

/// Construct `Position` from longitude and latitude. This is the order in which the widget reads
/// and writes coordinates, both in the dialog and in the messages sent to the host.
pub fn lon_lat(lon: f64, lat: f64) -> Position {
    Position::new(lon, lat)
}
