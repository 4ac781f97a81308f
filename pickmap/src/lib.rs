#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

pub mod basemap;
pub mod bridge;
pub mod config;
mod controls;
pub mod dialog;
mod download;
pub mod edit;
mod http_tiles;
mod io;
mod map;
mod position;
pub mod projection;
mod projector;
pub mod sources;
mod style;
pub mod tile_grid;
mod tiles;
mod widget;
mod zoom;

pub use basemap::{Basemap, BasemapDescriptor};
pub use bridge::{HostBridge, HostChannel, HostEvent, PickValue};
pub use config::{Config, ConfigError};
pub use controls::{MousePosition, ScaleLine};
pub use download::{HeaderValue, HttpOptions, MaxParallelDownloads};
pub use edit::DrawMode;
pub use http_tiles::{HttpStats, HttpTiles};
pub use map::{Map, MapMemory, Plugin};
pub use position::{Position, lat_lon, lon_lat};
pub use projector::Projector;
pub use style::Style;
pub use tiles::{Texture, TextureWithUv, TileId, Tiles};
pub use widget::PickWidget;
pub use zoom::InvalidZoom;
