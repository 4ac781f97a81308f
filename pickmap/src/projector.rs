use egui::{Pos2, Rect, pos2};
use geo_types::Coord;

use crate::Position;
use crate::projection::Projection;
use crate::tile_grid::{Extent, TileGrid};

/// Projects geographical position into pixels on the viewport, suitable for [`egui::Painter`].
///
/// Conversion goes through the map units of the basemap's projection, where one pixel spans
/// `resolution` units.
#[derive(Debug, Clone)]
pub struct Projector {
    clip_rect: Rect,
    projection: Projection,
    /// Map's center in map units.
    center: Coord,
    resolution: f64,
    zoom: f64,
}

impl Projector {
    pub fn new(
        clip_rect: Rect,
        projection: Projection,
        tile_grid: &TileGrid,
        center: Position,
        zoom: f64,
    ) -> Self {
        Self {
            clip_rect,
            projection,
            center: projection.project(center),
            resolution: tile_grid.resolution_at(zoom),
            zoom,
        }
    }

    pub fn clip_rect(&self) -> Rect {
        self.clip_rect
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Map units per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Position at the center of the viewport.
    pub fn center(&self) -> Position {
        self.projection.unproject(self.center)
    }

    /// Project `position` into pixels on the viewport.
    pub fn project(&self, position: Position) -> Pos2 {
        self.map_to_screen(self.projection.project(position))
    }

    /// Get coordinates from viewport's pixels position.
    pub fn unproject(&self, position: Pos2) -> Position {
        self.projection.unproject(self.screen_to_map(position))
    }

    pub fn map_to_screen(&self, point: Coord) -> Pos2 {
        let screen_center = self.clip_rect.center();
        pos2(
            (f64::from(screen_center.x) + (point.x - self.center.x) / self.resolution) as f32,
            (f64::from(screen_center.y) - (point.y - self.center.y) / self.resolution) as f32,
        )
    }

    pub fn screen_to_map(&self, position: Pos2) -> Coord {
        // Map units are large, keep the arithmetic in f64.
        let screen_center = self.clip_rect.center();
        Coord {
            x: self.center.x + f64::from(position.x - screen_center.x) * self.resolution,
            y: self.center.y - f64::from(position.y - screen_center.y) * self.resolution,
        }
    }

    /// Part of the map visible in the viewport, in map units.
    pub fn visible_extent(&self) -> Extent {
        let top_left = self.screen_to_map(self.clip_rect.left_top());
        let bottom_right = self.screen_to_map(self.clip_rect.right_bottom());
        Extent::new(top_left.x, bottom_right.y, bottom_right.x, top_left.y)
    }

    /// Ground distance covered by a single pixel around the given position.
    pub fn meters_per_pixel(&self, position: Position) -> f64 {
        self.projection.meters_per_pixel(self.resolution, position)
    }
}

impl crate::edit::Viewport for Projector {
    fn project(&self, position: Position) -> Pos2 {
        Projector::project(self, position)
    }

    fn unproject(&self, position: Pos2) -> Position {
        Projector::unproject(self, position)
    }
}
