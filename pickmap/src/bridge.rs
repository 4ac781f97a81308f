//! Messages exchanged with the host embedding the widget.
//!
//! Host may send `{"type": "initmap", "value": <basemap descriptor>}` to switch the basemap, which
//! is ignored unless listening was enabled. Once the user confirms the dialog, widget posts
//! `{"type": "pickresult", "value": ...}` back.

use serde::{Deserialize, Serialize};

use crate::basemap::BasemapDescriptor;
use crate::config::BridgeOptions;

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum InboundMessage {
    #[serde(rename = "initmap")]
    InitMap(BasemapDescriptor),
}

impl InboundMessage {
    pub fn decode(text: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum OutboundMessage {
    #[serde(rename = "pickresult")]
    PickResult(PickValue),
}

impl OutboundMessage {
    pub fn encode(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// What the user confirmed in the dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PickValue {
    /// Longitude and latitude, exactly as typed.
    Point { lon: String, lat: String },
    /// Coordinate array, as typed.
    Coordinates(String),
}

/// Way of delivering messages to the host, e.g. `postMessage` to the parent window.
pub trait HostChannel {
    fn post(&self, message: &str, target_origin: &str);
}

/// Something which happened on the host's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Raw text of a message.
    Message(String),
    /// Host asked to submit the dialog.
    Submit,
}

pub struct HostBridge {
    channel: Box<dyn HostChannel>,
    listen: bool,
    target_origin: String,
}

impl HostBridge {
    /// Bridge which does not listen to the host and posts to any origin.
    pub fn new(channel: impl HostChannel + 'static) -> Self {
        Self::with_options(channel, &BridgeOptions::default())
    }

    pub fn with_options(channel: impl HostChannel + 'static, options: &BridgeOptions) -> Self {
        Self {
            channel: Box::new(channel),
            listen: options.listen,
            target_origin: options.target_origin.clone(),
        }
    }

    pub fn apply_options(&mut self, options: &BridgeOptions) {
        self.listen = options.listen;
        self.target_origin.clone_from(&options.target_origin);
    }

    pub fn set_listen(&mut self, listen: bool) {
        self.listen = listen;
    }

    pub fn is_listening(&self) -> bool {
        self.listen
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    /// Decode a message from the host. Anything but a valid `initmap` is dropped, as is every
    /// message when not listening.
    pub fn receive(&self, text: &str) -> Option<BasemapDescriptor> {
        if !self.listen {
            log::debug!("Not listening, message dropped.");
            return None;
        }

        match InboundMessage::decode(text) {
            Ok(InboundMessage::InitMap(descriptor)) => {
                log::info!("Host requested basemap: {descriptor:?}");
                Some(descriptor)
            }
            Err(err) => {
                log::warn!("Dropping message from host: {err}");
                None
            }
        }
    }

    pub fn post_pick_result(&self, value: PickValue) -> Result<(), MessageError> {
        let message = OutboundMessage::PickResult(value).encode()?;
        log::debug!("Posting {message} to '{}'.", self.target_origin);
        self.channel.post(&message, &self.target_origin);
        Ok(())
    }
}
