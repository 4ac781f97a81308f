use std::sync::LazyLock;

use super::{Attribution, TileSource};
use crate::TileId;
use crate::tile_grid::TileGrid;

static GRID: LazyLock<TileGrid> = LazyLock::new(TileGrid::web_mercator);

/// <https://www.openstreetmap.org/about>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenStreetMap;

impl TileSource for OpenStreetMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.openstreetmap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution::new(
            "OpenStreetMap contributors",
            Some("https://www.openstreetmap.org/copyright"),
        )
    }

    fn tile_grid(&self) -> &TileGrid {
        &GRID
    }
}
