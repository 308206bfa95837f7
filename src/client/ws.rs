// src/client/ws.rs

use futures::{SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage};

use crate::client::{ResultChannel, Subscription};
use crate::errors::{IdeError, Result};
use crate::models::{FilterCommand, ResultMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to the judge's event server, one connection per run.
#[derive(Debug, Clone)]
pub struct WsChannel {
    endpoint: String,
}

impl WsChannel {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ResultChannel for WsChannel {
    type Subscription = WsSubscription;

    async fn subscribe(&self, channel: &str) -> Result<WsSubscription> {
        log::info!("🔌 Connecting to {} for channel {}", self.endpoint, channel);

        let (mut socket, _) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| IdeError::Connection(format!("connect to {} failed: {}", self.endpoint, e)))?;

        // The server only forwards events for registered channels, so nothing
        // arrives before this frame is written.
        let filter = serde_json::to_string(&FilterCommand::for_channel(channel))?;
        socket
            .send(WsMessage::Text(filter.into()))
            .await
            .map_err(|e| IdeError::Connection(format!("set-filter failed: {}", e)))?;

        Ok(WsSubscription {
            socket,
            channel: channel.to_string(),
        })
    }
}

/// Event stream for one channel. Frames that do not decode are logged and skipped.
pub struct WsSubscription {
    socket: Socket,
    channel: String,
}

impl WsSubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Stream for WsSubscription {
    type Item = Result<ResultMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let frame = match ready!(self.socket.poll_next_unpin(cx)) {
                None => return Poll::Ready(None),
                Some(Err(e)) => return Poll::Ready(Some(Err(IdeError::Connection(e.to_string())))),
                Some(Ok(frame)) => frame,
            };

            let decoded = match frame {
                WsMessage::Text(text) => ResultMessage::decode(text.as_str()),
                WsMessage::Binary(bytes) => ResultMessage::decode_slice(&bytes),
                WsMessage::Close(_) => return Poll::Ready(None),
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            match decoded {
                Ok(message) => return Poll::Ready(Some(Ok(message))),
                Err(e) => log::warn!("⚠️  Skipping undecodable frame on {}: {}", self.channel, e),
            }
        }
    }
}

impl Subscription for WsSubscription {
    async fn close(mut self) {
        if let Err(e) = self.socket.close(None).await {
            log::debug!("Closing channel {} failed: {}", self.channel, e);
        }
    }
}
