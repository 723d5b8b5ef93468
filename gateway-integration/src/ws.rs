use crate::channel::Tx;
use crate::error::IntegrationError;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// An opaque, venue-specific subscribe/unsubscribe payload. Equality is used
/// to de-duplicate against the stored subscription list before
/// transmission (spec §4.F point 2).
pub type SubDescriptor = String;

/// Produces the frames to replay immediately after a reconnect, before any
/// user-issued `subscribe` queued during `Backoff` is sent (spec §4.F
/// ordering guarantee). Implemented per venue.
pub trait ResubscribeHook: Send + Sync + 'static {
    fn resubscribe_frames(&self, subs: &[SubDescriptor]) -> Vec<String>;

    /// Venue-specific application-level ping frame sent after
    /// `ping_idle_timeout` of silence, if the transport-level ping/pong
    /// doesn't apply.
    fn heartbeat_frame(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsState {
    Disconnected,
    Connecting,
    Connected,
    Backoff,
}

#[derive(Debug, Clone, Copy)]
pub struct HeartbeatPolicy {
    pub ping_idle_timeout: Duration,
    pub ping_reply_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    pub reconnect_delay: Duration,
    pub heartbeat: Option<HeartbeatPolicy>,
}

enum Command {
    Subscribe(Vec<SubDescriptor>),
    Unsubscribe(Vec<SubDescriptor>),
    Send(String),
    Disconnect,
}

/// Handle for issuing commands to a running [`WsClient`] actor task.
#[derive(Debug, Clone)]
pub struct WsHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl WsHandle {
    pub fn subscribe(&self, descriptors: Vec<SubDescriptor>) -> Result<(), IntegrationError> {
        self.tx.send(Command::Subscribe(descriptors)).map_err(|_| IntegrationError::Disconnected)
    }

    pub fn unsubscribe(&self, descriptors: Vec<SubDescriptor>) -> Result<(), IntegrationError> {
        self.tx.send(Command::Unsubscribe(descriptors)).map_err(|_| IntegrationError::Disconnected)
    }

    pub fn send(&self, payload: impl Into<String>) -> Result<(), IntegrationError> {
        self.tx.send(Command::Send(payload.into())).map_err(|_| IntegrationError::Disconnected)
    }

    pub fn disconnect(&self) -> Result<(), IntegrationError> {
        self.tx.send(Command::Disconnect).map_err(|_| IntegrationError::Disconnected)
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Auto-reconnecting WebSocket client implementing spec §4.F's state
/// machine. Every received frame is dispatched to `on_frame`; transport
/// errors trigger a reconnect rather than propagating to the handler
/// (failure semantics, §4.F).
pub struct WsClient<R> {
    config: WsConfig,
    hook: R,
    subs: Vec<SubDescriptor>,
    state: WsState,
}

impl<R: ResubscribeHook> WsClient<R> {
    pub fn new(config: WsConfig, hook: R) -> Self {
        Self { config, hook, subs: Vec::new(), state: WsState::Disconnected }
    }

    pub fn state(&self) -> WsState {
        self.state
    }

    /// Spawns the client's actor task and returns a [`WsHandle`] to it. The
    /// handler `on_frame` runs inline inside the actor's loop — it must not
    /// block.
    pub fn spawn<Handler>(mut self, mut on_frame: Handler) -> WsHandle
    where
        Handler: FnMut(Message) + Send + 'static,
        R: Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        tokio::spawn(async move {
            'reconnect: loop {
                self.state = WsState::Connecting;
                let stream = match tokio_tungstenite::connect_async(&self.config.url).await {
                    Ok((stream, _response)) => stream,
                    Err(err) => {
                        warn!(error = %err, url = %self.config.url, "ws connect failed, backing off");
                        self.state = WsState::Backoff;
                        tokio::time::sleep(self.config.reconnect_delay).await;
                        continue 'reconnect;
                    }
                };
                self.state = WsState::Connected;
                info!(url = %self.config.url, "ws connected");

                let (mut write, mut read) = stream.split();

                for frame in self.hook.resubscribe_frames(&self.subs) {
                    if let Err(err) = write.send(Message::Text(frame)).await {
                        warn!(error = %err, "resubscribe send failed");
                        self.state = WsState::Backoff;
                        tokio::time::sleep(self.config.reconnect_delay).await;
                        continue 'reconnect;
                    }
                }

                let idle_deadline = |now: Instant| {
                    self.config.heartbeat.map(|h| now + h.ping_idle_timeout)
                };
                let mut next_idle_check = idle_deadline(Instant::now());
                let mut awaiting_pong: Option<Instant> = None;

                loop {
                    let idle_sleep = async {
                        match next_idle_check {
                            Some(deadline) => tokio::time::sleep_until(deadline).await,
                            None => std::future::pending::<()>().await,
                        }
                    };

                    tokio::select! {
                        cmd = rx.recv() => {
                            match cmd {
                                Some(Command::Subscribe(descs)) => {
                                    let fresh: Vec<_> = descs.into_iter().filter(|d| !self.subs.contains(d)).collect();
                                    if !fresh.is_empty() {
                                        let frames = self.hook.resubscribe_frames(&fresh);
                                        for frame in frames {
                                            let _ = write.send(Message::Text(frame)).await;
                                        }
                                        self.subs.extend(fresh);
                                    }
                                }
                                Some(Command::Unsubscribe(descs)) => {
                                    self.subs.retain(|d| !descs.contains(d));
                                }
                                Some(Command::Send(payload)) => {
                                    if let Err(err) = write.send(Message::Text(payload)).await {
                                        warn!(error = %err, "ws send failed");
                                        self.state = WsState::Backoff;
                                        tokio::time::sleep(self.config.reconnect_delay).await;
                                        continue 'reconnect;
                                    }
                                }
                                Some(Command::Disconnect) | None => {
                                    let _ = write.close().await;
                                    self.state = WsState::Disconnected;
                                    return;
                                }
                            }
                        }
                        frame = read.next() => {
                            match frame {
                                Some(Ok(Message::Pong(_))) => {
                                    awaiting_pong = None;
                                    next_idle_check = idle_deadline(Instant::now());
                                }
                                Some(Ok(Message::Ping(payload))) => {
                                    let _ = write.send(Message::Pong(payload)).await;
                                    next_idle_check = idle_deadline(Instant::now());
                                }
                                Some(Ok(Message::Close(_))) => {
                                    debug!("ws closed by server");
                                    self.state = WsState::Backoff;
                                    tokio::time::sleep(self.config.reconnect_delay).await;
                                    continue 'reconnect;
                                }
                                Some(Ok(msg)) => {
                                    next_idle_check = idle_deadline(Instant::now());
                                    let handled = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| on_frame(msg)));
                                    if handled.is_err() {
                                        error!("ws frame handler panicked");
                                    }
                                }
                                Some(Err(err)) => {
                                    warn!(error = %err, "ws read error");
                                    self.state = WsState::Backoff;
                                    tokio::time::sleep(self.config.reconnect_delay).await;
                                    continue 'reconnect;
                                }
                                None => {
                                    debug!("ws stream ended");
                                    self.state = WsState::Backoff;
                                    tokio::time::sleep(self.config.reconnect_delay).await;
                                    continue 'reconnect;
                                }
                            }
                        }
                        _ = idle_sleep => {
                            if let Some(policy) = self.config.heartbeat {
                                if let Some(since) = awaiting_pong {
                                    if since.elapsed() > policy.ping_reply_timeout {
                                        warn!("ws heartbeat reply timeout, reconnecting");
                                        self.state = WsState::Backoff;
                                        tokio::time::sleep(self.config.reconnect_delay).await;
                                        continue 'reconnect;
                                    }
                                } else {
                                    let frame = self.hook.heartbeat_frame();
                                    let sent = match frame {
                                        Some(text) => write.send(Message::Text(text)).await,
                                        None => write.send(Message::Ping(Vec::new())).await,
                                    };
                                    if sent.is_err() {
                                        self.state = WsState::Backoff;
                                        tokio::time::sleep(self.config.reconnect_delay).await;
                                        continue 'reconnect;
                                    }
                                    awaiting_pong = Some(Instant::now());
                                    next_idle_check = Some(Instant::now() + policy.ping_reply_timeout);
                                }
                            }
                        }
                    }
                }
            }
        });

        WsHandle { tx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHook;
    impl ResubscribeHook for NoopHook {
        fn resubscribe_frames(&self, subs: &[SubDescriptor]) -> Vec<String> {
            subs.to_vec()
        }
    }

    #[test]
    fn fresh_state_is_disconnected() {
        let client = WsClient::new(
            WsConfig { url: "wss://example.invalid".into(), reconnect_delay: Duration::from_millis(1), heartbeat: None },
            NoopHook,
        );
        assert_eq!(client.state(), WsState::Disconnected);
    }
}
