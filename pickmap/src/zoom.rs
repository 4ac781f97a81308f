use std::ops::RangeInclusive;

/// Zooms the map can be put at. Tile grids rarely go past level 20.
const ZOOM_RANGE: RangeInclusive<f64> = 0.0..=20.0;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("zoom must be between 0 and 20")]
pub struct InvalidZoom;

/// Possibly fractional zoom of the map. Level `z` of the tile grid is displayed in its native
/// resolution when the zoom equals `z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Zoom(f64);

impl TryFrom<f64> for Zoom {
    type Error = InvalidZoom;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if ZOOM_RANGE.contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidZoom)
        }
    }
}

impl From<Zoom> for f64 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(4.5)
    }
}

impl Zoom {
    /// Zoom closest to `value` which is within the valid range.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            Self::default()
        } else {
            Self(value.clamp(*ZOOM_RANGE.start(), *ZOOM_RANGE.end()))
        }
    }

    pub fn zoom_in(&mut self) -> Result<(), InvalidZoom> {
        *self = Self::try_from(self.0 + 1.)?;
        Ok(())
    }

    pub fn zoom_out(&mut self) -> Result<(), InvalidZoom> {
        *self = Self::try_from(self.0 - 1.)?;
        Ok(())
    }

    /// Zoom using a relative value. Stops at the edge of the valid range.
    pub fn zoom_by(&mut self, value: f64) {
        *self = Self::clamped(self.0 + value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructing_zoom() {
        assert_eq!(4.5, f64::from(Zoom::default()));
        assert_eq!(20., f64::from(Zoom::try_from(20.).unwrap()));
        assert_eq!(InvalidZoom, Zoom::try_from(20.5).unwrap_err());
        assert_eq!(InvalidZoom, Zoom::try_from(-1.).unwrap_err());
        assert_eq!(InvalidZoom, Zoom::try_from(f64::NAN).unwrap_err());
    }

    #[test]
    fn zooming_in_and_out() {
        let mut zoom = Zoom::try_from(19.).unwrap();
        assert!(zoom.zoom_in().is_ok());
        assert_eq!(Err(InvalidZoom), zoom.zoom_in());

        let mut zoom = Zoom::try_from(0.5).unwrap();
        assert_eq!(Err(InvalidZoom), zoom.zoom_out());
        assert_eq!(0.5, f64::from(zoom));
    }

    #[test]
    fn relative_zoom_stops_at_the_edge() {
        let mut zoom = Zoom::try_from(19.5).unwrap();
        zoom.zoom_by(3.);
        assert_eq!(20., f64::from(zoom));

        zoom.zoom_by(-30.);
        assert_eq!(0., f64::from(zoom));
    }
}
