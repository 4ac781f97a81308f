use egui::{Color32, ColorImage, Context, Mesh, Rect, TextureHandle, pos2};
use image::ImageError;

use crate::projection::Projection;
use crate::projector::Projector;
use crate::sources::Attribution;
use crate::tile_grid::TileGrid;

/// More tiles than this on the screen means that the level does not fit the view.
const MAX_VISIBLE_TILES: u64 = 1024;

/// Source of tiles to be put together to render the map.
pub trait Tiles {
    fn at(&mut self, tile_id: TileId) -> Option<TextureWithUv>;
    fn attribution(&self) -> Attribution;
    fn tile_grid(&self) -> &TileGrid;
    fn projection(&self) -> Projection;
}

/// Identifies the tile in the [`TileGrid`]. `x` grows to the east and `y` to the south, starting
/// from the grid's origin.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TileId {
    /// X number of the tile.
    pub x: u32,

    /// Y number of the tile.
    pub y: u32,

    /// Level of the grid.
    pub zoom: u8,
}

#[derive(Clone)]
pub struct Texture(TextureHandle);

impl Texture {
    pub fn new(image: &[u8], ctx: &Context) -> Result<Self, ImageError> {
        let image = image::load_from_memory(image)?.to_rgba8();
        let pixels = image.as_flat_samples();
        let image = ColorImage::from_rgba_unmultiplied(
            [image.width() as _, image.height() as _],
            pixels.as_slice(),
        );

        Ok(Self::from_color_image(image, ctx))
    }

    /// Load the texture from egui's [`ColorImage`].
    pub fn from_color_image(color_image: ColorImage, ctx: &Context) -> Self {
        Self(ctx.load_texture("tile", color_image, Default::default()))
    }

    /// Draw the tile on the given `rect`. The `uv` parameter defines which part of the tile
    /// should be drawn on the `rect`.
    fn draw(&self, painter: &egui::Painter, rect: Rect, uv: Rect) {
        let mut mesh = Mesh::with_texture(self.0.id());
        mesh.add_rect_with_uv(rect, uv, Color32::WHITE);
        painter.add(egui::Shape::mesh(mesh));
    }
}

/// Texture with UV coordinates.
pub struct TextureWithUv {
    pub texture: Texture,
    pub uv: Rect,
}

/// Draw all tiles of the closest level which intersect the viewport.
pub(crate) fn draw_tiles(painter: &egui::Painter, projector: &Projector, tiles: &mut dyn Tiles) {
    let grid = tiles.tile_grid().clone();

    let Some(level) = grid.level_for_zoom(projector.zoom()) else {
        log::warn!("Tile grid has no usable levels.");
        return;
    };

    let (Some(span), Some((columns, rows))) = (grid.tile_span(level), grid.tiles_across(level))
    else {
        return;
    };

    let view = projector.visible_extent();
    let origin = grid.origin();

    let first = |distance: f64| (distance / span).floor().max(0.) as u32;
    let last = |distance: f64, count: u32| {
        let index = (distance / span).floor();
        (index >= 0.).then(|| (index as u32).min(count - 1))
    };

    let (min_x, min_y) = (first(view.min_x - origin.x), first(origin.y - view.max_y));
    let (Some(max_x), Some(max_y)) = (
        last(view.max_x - origin.x, columns),
        last(origin.y - view.min_y, rows),
    ) else {
        return;
    };

    if min_x > max_x || min_y > max_y {
        return;
    }

    let visible = u64::from(max_x - min_x + 1) * u64::from(max_y - min_y + 1);
    if visible > MAX_VISIBLE_TILES {
        log::debug!("Not drawing {visible} tiles of level {level}.");
        return;
    }

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let tile_id = TileId { x, y, zoom: level };
            let Some(bounds) = grid.tile_bounds(tile_id) else {
                continue;
            };

            if let Some(tile) = tiles.at(tile_id) {
                let rect = Rect::from_two_pos(
                    projector.map_to_screen(bounds.top_left()),
                    projector.map_to_screen(geo_types::Coord {
                        x: bounds.max_x,
                        y: bounds.min_y,
                    }),
                );
                tile.texture.draw(painter, rect, tile.uv);
            }
        }
    }
}

/// Take a piece of a tile with lower zoom level and use it as a required tile.
pub(crate) fn interpolate_from_lower_zoom(tile_id: TileId, available_zoom: u8) -> (TileId, Rect) {
    assert!(tile_id.zoom >= available_zoom);

    let dzoom = 2u32.pow(u32::from(tile_id.zoom - available_zoom));

    let x = (tile_id.x / dzoom, tile_id.x % dzoom);
    let y = (tile_id.y / dzoom, tile_id.y % dzoom);

    let zoomed_tile_id = TileId {
        x: x.0,
        y: y.0,
        zoom: available_zoom,
    };

    let z = (dzoom as f32).recip();

    let uv = Rect::from_min_max(
        pos2(x.1 as f32 * z, y.1 as f32 * z),
        pos2(x.1 as f32 * z + z, y.1 as f32 * z + z),
    );

    (zoomed_tile_id, uv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_zoom_is_not_interpolated() {
        let tile_id = TileId { x: 3, y: 1, zoom: 4 };
        let (donor, uv) = interpolate_from_lower_zoom(tile_id, 4);

        assert_eq!(donor, tile_id);
        assert_eq!(uv, Rect::from_min_max(pos2(0., 0.), pos2(1., 1.)));
    }

    #[test]
    fn quarter_of_the_parent_tile_is_used() {
        let (donor, uv) = interpolate_from_lower_zoom(TileId { x: 3, y: 1, zoom: 4 }, 3);

        assert_eq!(donor, TileId { x: 1, y: 0, zoom: 3 });
        assert_eq!(uv, Rect::from_min_max(pos2(0.5, 0.5), pos2(1., 1.)));
    }
}
