//! Widget configuration, usually read from `config.hjson` next to the page.
//!
//! The document is relaxed JSON: comments, unquoted keys, single quoted strings and trailing
//! commas are all fine. Quoteless string values of Hjson are not supported.

use std::str::FromStr;

use futures::channel::oneshot;
use serde::Deserialize;

use crate::basemap::BasemapDescriptor;
use crate::download::HttpOptions;
use crate::io::Runtime;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not fetch the configuration: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration server responded with {0}")]
    Status(reqwest::StatusCode),
    #[error("could not parse the configuration: {0}")]
    Parse(#[from] json5::Error),
    #[error("could not read the configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration loading was interrupted")]
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub base_layer: BasemapDescriptor,
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub bridge: BridgeOptions,
}

/// Initial position of the map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct View {
    /// Longitude and latitude.
    pub center: [f64; 2],
    pub zoom: f64,
}

impl Default for View {
    fn default() -> Self {
        Self {
            center: [119., 23.],
            zoom: 4.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeOptions {
    /// Accept `initmap` messages from the host.
    pub listen: bool,
    /// Origin the results are posted to.
    pub target_origin: String,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            listen: false,
            target_origin: "*".to_owned(),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(json5::from_str(s)?)
    }
}

impl Config {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        std::fs::read_to_string(path)?.parse()
    }

    /// Fetch and parse the configuration. Anything but `200 OK` is an error.
    pub async fn load(url: &str, http_options: &HttpOptions) -> Result<Self, ConfigError> {
        let response = http_options.client().get(url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(ConfigError::Status(response.status()));
        }

        response.text().await?.parse()
    }
}

/// Configuration being loaded in the background.
pub(crate) struct ConfigLoader {
    url: String,
    result_rx: oneshot::Receiver<Result<Config, ConfigError>>,
}

impl ConfigLoader {
    pub fn spawn(
        url: String,
        http_options: HttpOptions,
        runtime: &Runtime,
        egui_ctx: egui::Context,
    ) -> Self {
        let (result_tx, result_rx) = oneshot::channel();
        let task_url = url.clone();

        runtime.spawn(async move {
            let result = Config::load(&task_url, &http_options).await;
            if result_tx.send(result).is_err() {
                log::debug!("Nobody waits for {task_url} anymore.");
            }
            egui_ctx.request_repaint();
        });

        Self { url, result_rx }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Result of the loading, if it is finished.
    pub fn poll(&mut self) -> Option<Result<Config, ConfigError>> {
        match self.result_rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::Canceled) => Some(Err(ConfigError::Canceled)),
        }
    }
}
