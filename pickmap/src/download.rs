use std::sync::{Arc, Mutex};

use egui::Context;
use futures::{
    SinkExt, StreamExt,
    channel::mpsc::{Receiver, Sender},
    future::{Either, select, select_all},
};

use crate::http_tiles::HttpStats;
use crate::sources::TileSource;
use crate::tiles::{Texture, TileId};

pub use reqwest::header::HeaderValue;

/// Controls how [`crate::HttpTiles`] and the configuration loader use the HTTP protocol.
#[derive(Clone)]
pub struct HttpOptions {
    /// User agent to be sent to the tile servers.
    ///
    /// This should be set only on native targets. The browser sets its own user agent on wasm
    /// targets.
    pub user_agent: Option<HeaderValue>,

    /// Maximum number of parallel tile downloads.
    pub max_parallel_downloads: MaxParallelDownloads,
}

impl Default for HttpOptions {
    fn default() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let user_agent = Some(HeaderValue::from_static(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION"),
        )));

        #[cfg(target_arch = "wasm32")]
        let user_agent = None;

        Self {
            user_agent,
            max_parallel_downloads: MaxParallelDownloads::default(),
        }
    }
}

impl HttpOptions {
    pub(crate) fn client(&self) -> reqwest::Client {
        let builder = reqwest::Client::builder();

        #[cfg(not(target_arch = "wasm32"))]
        let builder = match &self.user_agent {
            Some(user_agent) => builder.user_agent(user_agent.clone()),
            None => builder,
        };

        builder.build().unwrap_or_else(|err| {
            log::warn!("Could not configure the HTTP client: {err}");
            reqwest::Client::new()
        })
    }
}

/// Maximum number of parallel downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxParallelDownloads(pub usize);

impl Default for MaxParallelDownloads {
    /// Default number of parallel downloads. Following modern browsers' behavior.
    /// <https://stackoverflow.com/questions/985431/max-parallel-http-connections-in-a-browser>
    fn default() -> Self {
        Self(6)
    }
}

impl MaxParallelDownloads {
    /// Use custom value.
    ///
    /// Many services have rate limits, and exceeding them may result in throttling, bans, or
    /// degraded service. Check the Terms of Use of the particular provider you are using.
    pub fn value_manually_confirmed_with_provider_limits(value: usize) -> Self {
        Self(value.max(1))
    }
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Tile request channel from the main thread was broken.")]
    RequestChannelBroken,

    #[error("Tile channel to the main thread was broken.")]
    TileChannelClosed,

    #[error("Tile channel to the main thread was full.")]
    TileChannelFull,

    #[error("Could not download '{url}': {source}")]
    Download { url: String, source: reqwest::Error },

    #[error("Could not decode tile from '{url}': {source}")]
    Decode {
        url: String,
        source: image::ImageError,
    },

    #[error("Poison error.")]
    Poisoned,
}

impl From<futures::channel::mpsc::SendError> for Error {
    fn from(error: futures::channel::mpsc::SendError) -> Self {
        if error.is_disconnected() {
            Error::TileChannelClosed
        } else {
            Error::TileChannelFull
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Error::Poisoned
    }
}

async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = client.get(url).send().await?;
    log::debug!("Downloaded {:?}.", response.status());
    Ok(response.error_for_status()?.bytes().await?.to_vec())
}

/// Download and decode the tile.
async fn download_and_decode(
    client: &reqwest::Client,
    url: String,
    tile_id: TileId,
    egui_ctx: &Context,
) -> Result<(TileId, Texture), Error> {
    log::debug!("Getting {tile_id:?} from {url}.");

    let bytes = match download(client, &url).await {
        Ok(bytes) => bytes,
        Err(source) => return Err(Error::Download { url, source }),
    };

    match Texture::new(&bytes, egui_ctx) {
        Ok(texture) => Ok((tile_id, texture)),
        Err(source) => Err(Error::Decode { url, source }),
    }
}

async fn download_complete(
    tile_tx: &mut Sender<(TileId, Texture)>,
    egui_ctx: &Context,
    result: Result<(TileId, Texture), Error>,
) -> Result<(), Error> {
    match result {
        Ok(tile) => {
            tile_tx.send(tile).await?;
            egui_ctx.request_repaint();
        }
        Err(e) => {
            // Tile stays empty, there is no retry.
            log::warn!("{e}");
        }
    }

    Ok(())
}

async fn download_continuously_impl<S>(
    source: S,
    http_options: HttpOptions,
    stats: Arc<Mutex<HttpStats>>,
    mut request_rx: Receiver<TileId>,
    mut tile_tx: Sender<(TileId, Texture)>,
    egui_ctx: Context,
) -> Result<(), Error>
where
    S: TileSource,
{
    // Keep outside the loop to reuse it as much as possible.
    let client = http_options.client();
    let max_parallel = http_options.max_parallel_downloads.0.max(1);
    let mut outstanding = Vec::new();

    let start = |tile_id: TileId| {
        Box::pin(download_and_decode(
            &client,
            source.tile_url(tile_id),
            tile_id,
            &egui_ctx,
        ))
    };

    loop {
        if outstanding.is_empty() {
            // Only new downloads might be requested.
            let tile_id = request_rx.next().await.ok_or(Error::RequestChannelBroken)?;
            outstanding.push(start(tile_id));
        } else if outstanding.len() < max_parallel {
            // New downloads might be requested or ongoing downloads might be completed.
            match select(request_rx.next(), select_all(outstanding.drain(..))).await {
                Either::Left((request, remaining)) => {
                    let tile_id = request.ok_or(Error::RequestChannelBroken)?;
                    outstanding = remaining.into_inner();
                    outstanding.push(start(tile_id));
                }
                Either::Right(((result, _, remaining), _)) => {
                    download_complete(&mut tile_tx, &egui_ctx, result).await?;
                    outstanding = remaining;
                }
            }
        } else {
            // Only ongoing downloads might be completed.
            let (result, _, remaining) = select_all(outstanding.drain(..)).await;
            download_complete(&mut tile_tx, &egui_ctx, result).await?;
            outstanding = remaining;
        }

        stats.lock()?.in_progress = outstanding.len();
    }
}

/// Continuously download tiles requested via request channel. Finishes when the other side of
/// either channel goes away.
pub(crate) async fn download_continuously<S>(
    source: S,
    http_options: HttpOptions,
    stats: Arc<Mutex<HttpStats>>,
    request_rx: Receiver<TileId>,
    tile_tx: Sender<(TileId, Texture)>,
    egui_ctx: Context,
) where
    S: TileSource,
{
    match download_continuously_impl(source, http_options, stats, request_rx, tile_tx, egui_ctx)
        .await
    {
        Ok(()) | Err(Error::TileChannelClosed | Error::RequestChannelBroken) => {
            log::debug!("Tile download loop finished.");
        }
        Err(error) => {
            log::error!("Tile download loop failed: {error}.");
        }
    }
}
