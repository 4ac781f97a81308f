use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use egui::Context;
use futures::channel::mpsc::{Receiver, Sender, TryRecvError, TrySendError, channel};
use lru::LruCache;

use crate::download::{HttpOptions, download_continuously};
use crate::io::Runtime;
use crate::projection::Projection;
use crate::sources::{Attribution, TileSource};
use crate::tile_grid::TileGrid;
use crate::tiles::{Texture, TextureWithUv, TileId, Tiles, interpolate_from_lower_zoom};

/// Just arbitrary value which seemed right.
const CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Downloads the tiles via HTTP. It must persist between frames.
pub struct HttpTiles {
    attribution: Attribution,
    tile_grid: TileGrid,
    projection: Projection,
    cache: LruCache<TileId, Option<Texture>>,
    http_stats: Arc<Mutex<HttpStats>>,

    /// Tiles to be downloaded by the IO thread.
    request_tx: Sender<TileId>,

    /// Tiles that got downloaded and should be put in the cache.
    tile_rx: Receiver<(TileId, Texture)>,
}

impl HttpTiles {
    /// Construct new [`Tiles`] with default [`HttpOptions`].
    pub fn new<S>(source: S, runtime: &Runtime, egui_ctx: Context) -> Self
    where
        S: TileSource + Send + Sync + 'static,
    {
        Self::with_options(source, HttpOptions::default(), runtime, egui_ctx)
    }

    /// Construct new [`Tiles`] with supplied [`HttpOptions`]. Downloads run on the `runtime`
    /// until this object is dropped.
    pub fn with_options<S>(
        source: S,
        http_options: HttpOptions,
        runtime: &Runtime,
        egui_ctx: Context,
    ) -> Self
    where
        S: TileSource + Send + Sync + 'static,
    {
        let http_stats = Arc::new(Mutex::new(HttpStats { in_progress: 0 }));

        // This ensures that newer requests are prioritized.
        let channel_size = http_options.max_parallel_downloads.0;

        let (request_tx, request_rx) = channel(channel_size);
        let (tile_tx, tile_rx) = channel(channel_size);
        let attribution = source.attribution();
        let tile_grid = source.tile_grid().clone();
        let projection = source.projection();

        // This will run concurrently in a loop, handing downloads and talk with us via channels.
        runtime.spawn(download_continuously(
            source,
            http_options,
            http_stats.clone(),
            request_rx,
            tile_tx,
            egui_ctx,
        ));

        Self {
            attribution,
            tile_grid,
            projection,
            cache: LruCache::new(CACHE_SIZE),
            http_stats,
            request_tx,
            tile_rx,
        }
    }

    pub fn stats(&self) -> HttpStats {
        if let Ok(http_stats) = self.http_stats.lock() {
            http_stats.clone()
        } else {
            HttpStats::default()
        }
    }

    fn put_single_downloaded_tile_in_cache(&mut self) {
        // This is called every frame, so take just one at the time.
        match self.tile_rx.try_recv() {
            Ok((tile_id, tile)) => {
                self.cache.put(tile_id, Some(tile));
            }
            Err(TryRecvError::Empty) => {
                // Just ignore. It means that no new tile was downloaded.
            }
            Err(TryRecvError::Closed) => {
                log::error!("IO thread is dead");
            }
        }
    }

    fn make_sure_is_downloaded(&mut self, tile_id: TileId) {
        if self
            .cache
            .try_get_or_insert(
                tile_id,
                || -> Result<Option<Texture>, TrySendError<TileId>> {
                    self.request_tx.try_send(tile_id)?;
                    log::trace!("Requested tile: {tile_id:?}");
                    Ok(None)
                },
            )
            .is_err()
        {
            log::debug!("Request queue is full.");
        }
    }

    /// Get at tile, or interpolate it from lower levels of the grid. This function does not start
    /// any downloads.
    fn get_from_cache_or_interpolate(&mut self, tile_id: TileId) -> Option<TextureWithUv> {
        let min_level = self.tile_grid.min_level()?;
        let mut zoom_candidate = tile_id.zoom;

        loop {
            let (zoomed_tile_id, uv) = interpolate_from_lower_zoom(tile_id, zoom_candidate);

            if let Some(Some(texture)) = self.cache.get(&zoomed_tile_id) {
                break Some(TextureWithUv {
                    texture: texture.clone(),
                    uv,
                });
            }

            // Keep zooming out until we find a donor or there is no more levels.
            if zoom_candidate <= min_level {
                break None;
            }
            zoom_candidate -= 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpStats {
    /// Number of tiles that are currently being downloaded.
    pub in_progress: usize,
}

impl Tiles for HttpTiles {
    /// Return a tile if already in cache, schedule a download otherwise.
    fn at(&mut self, tile_id: TileId) -> Option<TextureWithUv> {
        self.put_single_downloaded_tile_in_cache();

        if !self.tile_grid.contains(tile_id) {
            return None;
        }

        self.make_sure_is_downloaded(tile_id);
        self.get_from_cache_or_interpolate(tile_id)
    }

    /// Attribution of the source this tile cache pulls images from. Typically,
    /// this should be displayed somewhere on the top of the map widget.
    fn attribution(&self) -> Attribution {
        self.attribution.clone()
    }

    fn tile_grid(&self) -> &TileGrid {
        &self.tile_grid
    }

    fn projection(&self) -> Projection {
        self.projection
    }
}
