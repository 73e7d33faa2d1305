use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{info, trace, warn};

use civic_sync::hub::{Delivery, PushHub};
use civic_types::events::PushEvent;

use crate::config::ClientConfig;

/// WebSocket push channel. Every text frame is a `PushEvent` handed to the
/// hub; the hub drops whatever nobody is subscribed to.
pub struct PushSocket {
    url: String,
    token: Option<String>,
    reconnect: Duration,
    hub: PushHub,
}

impl PushSocket {
    pub fn new(config: &ClientConfig, hub: PushHub) -> Self {
        Self {
            url: config.push_url.clone(),
            token: config.token.clone(),
            reconnect: config.push_reconnect,
            hub,
        }
    }

    /// Run on the current runtime until the handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Connect, relay frames, and reconnect after `reconnect` whenever the
    /// connection drops. Never returns.
    pub async fn run(&self) {
        loop {
            match self.connect_once().await {
                Ok(()) => info!("Push channel closed by server"),
                Err(e) => warn!("Push channel error: {:#}", e),
            }
            tokio::time::sleep(self.reconnect).await;
        }
    }

    async fn connect_once(&self) -> anyhow::Result<()> {
        let mut request = self.url.as_str().into_client_request()?;
        if let Some(token) = &self.token {
            request
                .headers_mut()
                .insert("Authorization", HeaderValue::from_str(&format!("Bearer {}", token))?);
        }

        let (mut socket, _) = connect_async(request).await?;
        info!("Push channel connected to {}", self.url);

        while let Some(frame) = socket.next().await {
            match frame? {
                Message::Text(text) => {
                    handle_frame(&self.hub, text.as_str());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Parse and dispatch one text frame. Malformed frames are logged and skipped.
pub fn handle_frame(hub: &PushHub, text: &str) -> Option<Delivery> {
    match serde_json::from_str::<PushEvent>(text) {
        Ok(event) => {
            let delivery = hub.dispatch(event);
            trace!("Push frame {:?}", delivery);
            Some(delivery)
        }
        Err(e) => {
            let raw: String = text.chars().take(200).collect();
            warn!("Bad push frame: {} -- raw: {}", e, raw);
            None
        }
    }
}
