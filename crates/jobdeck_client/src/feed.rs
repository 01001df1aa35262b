//! Push half of the backend contract: Socket.IO events carried over
//! Engine.IO (protocol 4) HTTP long-polling.

use std::time::Duration;

use deck_logging::{deck_debug, deck_info, deck_warn};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::map_reqwest_error;
use crate::{ApiError, ClientEvent, ClientSettings, FailureKind, FeedEvent};

/// Packets in one polling payload are separated by the record separator.
const PACKET_SEPARATOR: char = '\u{1e}';
const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;
const DEFAULT_PING_TIMEOUT_MS: u64 = 20_000;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ClientEvent);
}

/// Engine.IO transport packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// Handshake JSON.
    Open(String),
    Close,
    Ping,
    Pong,
    /// Socket.IO packet text.
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    fn parse(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        let kind = chars.next()?;
        let body = chars.as_str();
        Some(match kind {
            '0' => Self::Open(body.to_string()),
            '1' => Self::Close,
            '2' => Self::Ping,
            '3' => Self::Pong,
            '4' => Self::Message(body.to_string()),
            '5' => Self::Upgrade,
            '6' => Self::Noop,
            _ => return None,
        })
    }
}

/// Splits a polling response body into packets; binary and unknown packets are dropped.
pub fn decode_payload(body: &str) -> Vec<EnginePacket> {
    body.split(PACKET_SEPARATOR)
        .filter(|raw| !raw.is_empty())
        .filter_map(|raw| {
            let packet = EnginePacket::parse(raw);
            if packet.is_none() {
                deck_debug!("Skipping engine packet {:?}", raw);
            }
            packet
        })
        .collect()
}

/// Socket.IO packet inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(String),
}

pub fn decode_socket_packet(message: &str) -> Option<SocketPacket> {
    let kind = message.chars().next().filter(char::is_ascii_digit)?;
    let rest = strip_namespace(&message[1..]);
    match kind {
        '0' => Some(SocketPacket::Connect),
        '1' => Some(SocketPacket::Disconnect),
        '2' => {
            // An acknowledgement id may sit between the namespace and the array.
            let array = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut values: Vec<Value> = serde_json::from_str(array).ok()?;
            if values.is_empty() {
                return None;
            }
            let name = match values.remove(0) {
                Value::String(name) => name,
                _ => return None,
            };
            let data = if values.is_empty() {
                Value::Null
            } else {
                values.swap_remove(0)
            };
            Some(SocketPacket::Event { name, data })
        }
        '4' => Some(SocketPacket::ConnectError(rest.to_string())),
        _ => None,
    }
}

fn strip_namespace(rest: &str) -> &str {
    if !rest.starts_with('/') {
        return rest;
    }
    rest.split_once(',').map_or("", |(_, tail)| tail)
}

/// Maps a named event to a feed event; unknown or malformed events yield `None`.
pub fn decode_event(name: &str, data: Value) -> Option<FeedEvent> {
    let decoded = match name {
        "job_update" => serde_json::from_value(data).map(FeedEvent::Job),
        "cnpj_update" | "item_update" => serde_json::from_value(data).map(FeedEvent::Item),
        other => {
            deck_debug!("Skipping feed event '{}'", other);
            return None;
        }
    };
    match decoded {
        Ok(event) => Some(event),
        Err(err) => {
            deck_warn!("Malformed '{}' event: {}", name, err);
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Handshake {
    sid: String,
    #[serde(default)]
    ping_interval: Option<u64>,
    #[serde(default)]
    ping_timeout: Option<u64>,
}

impl Handshake {
    /// The server pings every interval, so a poll never legitimately outlives both.
    fn poll_timeout(&self) -> Duration {
        Duration::from_millis(
            self.ping_interval.unwrap_or(DEFAULT_PING_INTERVAL_MS)
                + self.ping_timeout.unwrap_or(DEFAULT_PING_TIMEOUT_MS),
        )
    }
}

pub struct EventFeed {
    client: reqwest::Client,
    url: Url,
    reconnect_delay: Duration,
}

impl EventFeed {
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        // No overall timeout: each poll sets its own from the handshake.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            url: settings.endpoint(&settings.events_path)?,
            reconnect_delay: settings.reconnect_delay,
        })
    }

    /// Streams events into `sink`, reconnecting until `cancel` fires.
    pub async fn run(&self, sink: &dyn EventSink, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            match self.stream_once(sink, &cancel).await {
                Ok(()) => deck_info!("Event feed closed"),
                Err(err) => deck_warn!("Event feed error: {}", err),
            }
            if cancel.is_cancelled() {
                break;
            }
            sink.emit(ClientEvent::Feed(FeedEvent::Disconnected));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Runs a single session until the server closes it or `cancel` fires.
    pub async fn stream_once(
        &self,
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let handshake = self.handshake().await?;
        let session = self.polling_url(Some(&handshake.sid));
        let poll_timeout = handshake.poll_timeout();
        deck_debug!("Engine session {} opened", handshake.sid);

        // Join the default namespace; the server acknowledges on the next poll.
        self.send(&session, "40").await?;

        loop {
            let body = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = self.send(&session, "1").await;
                    return Ok(());
                }
                body = self.poll(&session, poll_timeout) => body?,
            };
            for packet in decode_payload(&body) {
                match packet {
                    EnginePacket::Ping => self.send(&session, "3").await?,
                    EnginePacket::Close => return Ok(()),
                    EnginePacket::Message(message) => match decode_socket_packet(&message) {
                        Some(SocketPacket::Connect) => {
                            deck_info!("Event feed connected to {}", self.url);
                            sink.emit(ClientEvent::Feed(FeedEvent::Connected));
                        }
                        Some(SocketPacket::Event { name, data }) => {
                            if let Some(event) = decode_event(&name, data) {
                                sink.emit(ClientEvent::Feed(event));
                            }
                        }
                        Some(SocketPacket::Disconnect) => return Ok(()),
                        Some(SocketPacket::ConnectError(reason)) => {
                            return Err(ApiError::new(FailureKind::Rejected, reason));
                        }
                        None => deck_debug!("Skipping socket packet {:?}", message),
                    },
                    EnginePacket::Open(_)
                    | EnginePacket::Pong
                    | EnginePacket::Upgrade
                    | EnginePacket::Noop => {}
                }
            }
        }
    }

    async fn handshake(&self) -> Result<Handshake, ApiError> {
        let body = self.poll(&self.polling_url(None), Duration::from_secs(30)).await?;
        match decode_payload(&body).into_iter().next() {
            Some(EnginePacket::Open(json)) => serde_json::from_str(&json)
                .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string())),
            _ => Err(ApiError::new(
                FailureKind::Decode,
                "expected an engine open packet",
            )),
        }
    }

    fn polling_url(&self, sid: Option<&str>) -> Url {
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("EIO", "4").append_pair("transport", "polling");
            if let Some(sid) = sid {
                query.append_pair("sid", sid);
            }
        }
        url
    }

    async fn poll(&self, url: &Url, timeout: Duration) -> Result<String, ApiError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        response.text().await.map_err(map_reqwest_error)
    }

    async fn send(&self, url: &Url, packet: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(packet.to_string())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(())
    }
}
