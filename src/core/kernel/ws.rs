use crate::core::errors::{BackpackError, Result};
use crate::core::kernel::codec::{StreamAuth, WsCodec};
use crate::core::kernel::dispatch::{lock, OverflowPolicy, Registry, StreamCallback, Subscriber};
use crate::core::kernel::signer::Ed25519Signer;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// WebSocket session configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Handshake timeout
    pub connect_timeout: Duration,
    /// Period of transport-level pings
    pub heartbeat_interval: Duration,
    /// A connection with no inbound frame for this long is considered dead
    pub idle_timeout: Duration,
    /// Upper bound for a single frame write
    pub write_timeout: Duration,
    /// First reconnect delay; doubles per failed attempt
    pub reconnect_min_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub auto_reconnect: bool,
    /// Signature validity window for private subscriptions, in milliseconds
    pub window: u64,
    /// Queued payloads per callback before the overflow policy applies
    pub mailbox_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),
            write_timeout: Duration::from_secs(10),
            reconnect_min_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
            auto_reconnect: true,
            window: 5000,
            mailbox_capacity: 1024,
            overflow: OverflowPolicy::DropOldest,
        }
    }
}

impl WsConfig {
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn with_reconnect_delays(mut self, min: Duration, max: Duration) -> Self {
        self.reconnect_min_delay = min;
        self.reconnect_max_delay = max.max(min);
        self
    }

    pub fn with_heartbeat(mut self, interval: Duration, idle_timeout: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }

    pub fn with_mailbox(mut self, capacity: usize, overflow: OverflowPolicy) -> Self {
        self.mailbox_capacity = capacity;
        self.overflow = overflow;
        self
    }
}

/// Lifecycle of a `WsSession`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal; entered only through `close()`
    Closed,
}

struct Connection {
    id: u64,
    sink: Arc<AsyncMutex<WsSink>>,
    stop: watch::Sender<bool>,
}

struct SessionState {
    connection: Option<Connection>,
    registry: Registry,
    next_connection_id: u64,
    reconnect_enabled: bool,
    reconnecting: bool,
    closed: bool,
}

struct Shared<C: WsCodec> {
    url: String,
    codec: C,
    signer: Option<Arc<Ed25519Signer>>,
    config: WsConfig,
    state: Mutex<SessionState>,
    // Serializes dial + install so at most one socket is ever live
    dial_lock: AsyncMutex<()>,
    status: watch::Sender<ConnectionState>,
    shutdown: watch::Sender<bool>,
}

/// Builder for `WsSession`
pub struct WsSessionBuilder<C: WsCodec> {
    url: String,
    codec: C,
    signer: Option<Arc<Ed25519Signer>>,
    config: WsConfig,
}

impl<C: WsCodec> WsSessionBuilder<C> {
    /// Credentials for private streams
    pub fn signer(mut self, signer: Arc<Ed25519Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> WsSession<C> {
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, _) = watch::channel(false);
        let reconnect_enabled = self.config.auto_reconnect;

        WsSession {
            shared: Arc::new(Shared {
                url: self.url,
                codec: self.codec,
                signer: self.signer,
                config: self.config,
                state: Mutex::new(SessionState {
                    connection: None,
                    registry: Registry::default(),
                    next_connection_id: 0,
                    reconnect_enabled,
                    reconnecting: false,
                    closed: false,
                }),
                dial_lock: AsyncMutex::new(()),
                status,
                shutdown,
            }),
        }
    }
}

/// Pub/sub session over one exchange WebSocket
///
/// Owns the socket, a read loop and a heartbeat loop per connection, and the
/// subscription registry. A dropped connection is redialed with exponential
/// backoff and every registered stream is subscribed again; payloads sent
/// while disconnected are lost.
///
/// Cloning yields another handle to the same session. Background tasks stop
/// once `close()` is called or every handle is dropped.
pub struct WsSession<C: WsCodec> {
    shared: Arc<Shared<C>>,
}

impl<C: WsCodec> Clone for WsSession<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C: WsCodec> std::fmt::Debug for WsSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSession")
            .field("url", &self.shared.url)
            .field("state", &self.state())
            .field("has_signer", &self.shared.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: WsCodec> WsSession<C> {
    pub fn builder(url: impl Into<String>, codec: C) -> WsSessionBuilder<C> {
        WsSessionBuilder {
            url: url.into(),
            codec,
            signer: None,
            config: WsConfig::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.status.borrow()
    }

    /// Receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared.state).connection.is_some()
    }

    /// Currently registered stream names, sorted
    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.shared.state).registry.streams()
    }

    /// Whether `stream` is registered as private; `None` when not registered
    pub fn is_private(&self, stream: &str) -> Option<bool> {
        lock(&self.shared.state).registry.is_private(stream)
    }

    /// Enable or disable reconnection after connection loss
    ///
    /// Has no effect once the session is closed.
    pub fn set_auto_reconnect(&self, enabled: bool) {
        let mut state = lock(&self.shared.state);
        if !state.closed {
            state.reconnect_enabled = enabled;
        }
    }

    /// Open the connection; a no-op when already connected
    ///
    /// Streams still registered from an earlier connection are subscribed
    /// again. A failed dial is returned to the caller and does not start the
    /// reconnect loop.
    #[instrument(skip(self), fields(url = %self.shared.url))]
    pub async fn connect(&self) -> Result<()> {
        let shared = &self.shared;
        let _dial = shared.dial_lock.lock().await;

        {
            let state = lock(&shared.state);
            if state.closed {
                return Err(BackpackError::SessionClosed);
            }
            if state.connection.is_some() {
                return Ok(());
            }
            shared.status.send_replace(ConnectionState::Connecting);
        }

        let stream = match shared.dial().await {
            Ok(stream) => stream,
            Err(e) => {
                let state = lock(&shared.state);
                if !state.closed && state.connection.is_none() {
                    shared.status.send_replace(if state.reconnecting {
                        ConnectionState::Reconnecting
                    } else {
                        ConnectionState::Disconnected
                    });
                }
                return Err(e);
            }
        };

        let id = Shared::install(shared, stream).await?;
        if let Err(e) = shared.resubscribe(id).await {
            shared.drop_connection(id).await;
            return Err(e);
        }
        Ok(())
    }

    /// Register `callback` on every stream in `streams` and subscribe
    ///
    /// Callbacks run on their own worker, never on the read loop, and see
    /// each stream's payloads in wire order. Registering several callbacks
    /// on one stream is allowed; each receives every payload.
    ///
    /// Private streams need a signer. When the control frame cannot be
    /// written the registration is kept and replayed after reconnecting.
    #[instrument(skip(self, streams, callback), fields(stream_count = streams.len()))]
    pub async fn subscribe<S, F>(&self, streams: &[S], callback: F, private: bool) -> Result<()>
    where
        S: AsRef<str>,
        F: Fn(Value) + Send + Sync + 'static,
    {
        let streams: Vec<String> = streams.iter().map(|s| s.as_ref().to_string()).collect();
        if streams.is_empty() {
            return Ok(());
        }

        let shared = &self.shared;
        let signer = if private {
            Some(shared.signer.as_ref().ok_or(BackpackError::AuthRequired)?)
        } else {
            None
        };
        if !self.is_connected() {
            return Err(BackpackError::NotConnected);
        }

        let auth = signer.map(|signer| shared.stream_auth(signer));
        let message = shared.codec.encode_subscription(&streams, auth.as_ref())?;

        let sink = {
            let mut state = lock(&shared.state);
            let sink = state
                .connection
                .as_ref()
                .map(|c| c.sink.clone())
                .ok_or(BackpackError::NotConnected)?;

            let callback: StreamCallback = Arc::new(callback);
            let subscriber = Subscriber::spawn(
                callback,
                shared.config.mailbox_capacity,
                shared.config.overflow,
            );
            state.registry.register(&streams, &subscriber, private);
            sink
        };

        shared.write(&sink, message).await?;
        debug!(streams = ?streams, "Subscribed");
        Ok(())
    }

    /// Subscribe to streams that require authentication
    pub async fn subscribe_private<S, F>(&self, streams: &[S], callback: F) -> Result<()>
    where
        S: AsRef<str>,
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.subscribe(streams, callback, true).await
    }

    /// Drop every callback for `streams` and unsubscribe
    ///
    /// Unknown names are ignored. While disconnected only the registry is
    /// updated, so the streams are not replayed on reconnect.
    #[instrument(skip(self, streams), fields(stream_count = streams.len()))]
    pub async fn unsubscribe<S: AsRef<str>>(&self, streams: &[S]) -> Result<()> {
        let streams: Vec<String> = streams.iter().map(|s| s.as_ref().to_string()).collect();
        if streams.is_empty() {
            return Ok(());
        }

        let shared = &self.shared;
        let sink = {
            let mut state = lock(&shared.state);
            state.registry.remove(&streams);
            state.connection.as_ref().map(|c| c.sink.clone())
        };

        let Some(sink) = sink else {
            debug!("Not connected, registry updated only");
            return Ok(());
        };

        let message = shared.codec.encode_unsubscription(&streams)?;
        shared.write(&sink, message).await?;
        debug!(streams = ?streams, "Unsubscribed");
        Ok(())
    }

    /// Close the session for good
    ///
    /// Stops reconnection, stops the background loops, sends a normal
    /// closure frame and drops the socket. Calling it again is a no-op.
    #[instrument(skip(self), fields(url = %self.shared.url))]
    pub async fn close(&self) -> Result<()> {
        let shared = &self.shared;
        let connection = {
            let mut state = lock(&shared.state);
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.reconnect_enabled = false;
            state.registry = Registry::default();
            shared.status.send_replace(ConnectionState::Closed);
            state.connection.take()
        };

        shared.shutdown.send_replace(true);

        if let Some(connection) = connection {
            let _ = connection.stop.send(true);
            teardown(&connection.sink, shared.config.write_timeout).await;
        }

        debug!("WebSocket session closed");
        Ok(())
    }
}

impl<C: WsCodec> Shared<C> {
    async fn dial(&self) -> Result<WsStream> {
        debug!(url = %self.url, "Dialing WebSocket");
        let (stream, _response) = timeout(self.config.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| {
                BackpackError::Transport(format!(
                    "WebSocket connection timed out after {:?}",
                    self.config.connect_timeout
                ))
            })?
            .map_err(|e| BackpackError::Transport(format!("WebSocket connection failed: {}", e)))?;
        Ok(stream)
    }

    /// Make `stream` the live connection and start its loops
    async fn install(shared: &Arc<Self>, stream: WsStream) -> Result<u64> {
        let (sink, source) = stream.split();
        let sink = Arc::new(AsyncMutex::new(sink));
        let (stop_tx, stop_rx) = watch::channel(false);

        let installed = {
            let mut state = lock(&shared.state);
            if state.closed {
                None
            } else {
                state.next_connection_id += 1;
                let id = state.next_connection_id;
                state.connection = Some(Connection {
                    id,
                    sink: sink.clone(),
                    stop: stop_tx,
                });
                shared.status.send_replace(ConnectionState::Connected);
                Some(id)
            }
        };

        let Some(id) = installed else {
            // close() won the race; this socket must not stay open
            teardown(&sink, shared.config.write_timeout).await;
            return Err(BackpackError::SessionClosed);
        };

        debug!(connection = id, "WebSocket connected");
        tokio::spawn(read_loop(
            Arc::downgrade(shared),
            id,
            source,
            stop_rx.clone(),
            shared.config.idle_timeout,
        ));
        tokio::spawn(heartbeat_loop(
            sink,
            stop_rx,
            shared.config.heartbeat_interval,
            shared.config.write_timeout,
        ));
        Ok(id)
    }

    /// Replay the registry on connection `id`: public streams first, then
    /// private streams under a fresh signature
    async fn resubscribe(&self, id: u64) -> Result<()> {
        let (public, private, sink) = {
            let state = lock(&self.state);
            let sink = match &state.connection {
                Some(c) if c.id == id => c.sink.clone(),
                _ => return Err(BackpackError::NotConnected),
            };
            let (public, private) = state.registry.partition();
            (public, private, sink)
        };

        if !public.is_empty() {
            let message = self.codec.encode_subscription(&public, None)?;
            self.write(&sink, message).await?;
        }

        if !private.is_empty() {
            if let Some(signer) = &self.signer {
                let auth = self.stream_auth(signer);
                let message = self.codec.encode_subscription(&private, Some(&auth))?;
                self.write(&sink, message).await?;
            } else {
                warn!(streams = ?private, "Private streams registered without credentials, skipping");
            }
        }

        if !public.is_empty() || !private.is_empty() {
            debug!(
                connection = id,
                public = public.len(),
                private = private.len(),
                "Resubscribed streams"
            );
        }
        Ok(())
    }

    fn stream_auth(&self, signer: &Ed25519Signer) -> StreamAuth {
        let (signature, timestamp) = signer.generate_stream_signature(self.config.window);
        StreamAuth {
            api_key: signer.public_key().to_string(),
            signature,
            timestamp,
            window: self.config.window,
        }
    }

    async fn write(&self, sink: &AsyncMutex<WsSink>, message: Message) -> Result<()> {
        let send = async { sink.lock().await.send(message).await };
        match timeout(self.config.write_timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BackpackError::Transport(format!(
                "Failed to send WebSocket message: {}",
                e
            ))),
            Err(_) => Err(BackpackError::Transport(format!(
                "WebSocket write timed out after {:?}",
                self.config.write_timeout
            ))),
        }
    }

    fn dispatch(&self, text: &str) {
        let Some(frame) = self.codec.decode_frame(text) else {
            trace!(bytes = text.len(), "Ignoring frame without stream");
            return;
        };

        let subscribers = lock(&self.state).registry.subscribers(&frame.stream);
        if subscribers.is_empty() {
            trace!(stream = %frame.stream, "No callbacks for stream");
            return;
        }

        for subscriber in &subscribers {
            subscriber.deliver(frame.data.clone());
        }
    }

    /// Tear down connection `id` if it is still the live one
    async fn drop_connection(&self, id: u64) {
        let connection = {
            let mut state = lock(&self.state);
            match &state.connection {
                Some(c) if c.id == id => {}
                _ => return,
            }
            let connection = state.connection.take();
            self.status.send_replace(if state.closed {
                ConnectionState::Closed
            } else if state.reconnecting {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Disconnected
            });
            connection
        };

        if let Some(connection) = connection {
            let _ = connection.stop.send(true);
            teardown(&connection.sink, self.config.write_timeout).await;
        }
    }

    /// Called by the read loop of connection `id` when it dies
    fn handle_disconnect(shared: &Arc<Self>, id: u64, reason: &str) {
        let start_reconnect = {
            let mut state = lock(&shared.state);
            match &state.connection {
                Some(c) if c.id == id => {}
                _ => return,
            }
            if let Some(connection) = state.connection.take() {
                let _ = connection.stop.send(true);
            }
            if state.closed {
                return;
            }

            let start = state.reconnect_enabled && !state.reconnecting;
            if start {
                state.reconnecting = true;
            }
            shared.status.send_replace(if state.reconnecting {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Disconnected
            });
            start
        };

        warn!(connection = id, reason, "WebSocket connection lost");
        if start_reconnect {
            tokio::spawn(reconnect_loop(Arc::downgrade(shared)));
        }
    }

    /// One reconnect attempt; `Ok` ends the reconnect loop
    async fn try_reconnect(shared: &Arc<Self>) -> Result<()> {
        let _dial = shared.dial_lock.lock().await;

        {
            let mut state = lock(&shared.state);
            if state.closed || !state.reconnect_enabled || state.connection.is_some() {
                state.reconnecting = false;
                return Ok(());
            }
        }

        let stream = shared.dial().await?;
        let id = match Self::install(shared, stream).await {
            Ok(id) => id,
            Err(BackpackError::SessionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        if let Err(e) = shared.resubscribe(id).await {
            shared.drop_connection(id).await;
            return Err(e);
        }

        let mut state = lock(&shared.state);
        let live = matches!(&state.connection, Some(c) if c.id == id);
        if live || state.closed {
            state.reconnecting = false;
            return Ok(());
        }
        Err(BackpackError::Transport(
            "Connection lost during resubscription".to_string(),
        ))
    }

    fn wants_reconnect(&self) -> bool {
        let mut state = lock(&self.state);
        if state.closed || !state.reconnect_enabled {
            state.reconnecting = false;
            return false;
        }
        true
    }
}

async fn reconnect_loop<C: WsCodec>(shared: Weak<Shared<C>>) {
    let (mut delay, max_delay) = match shared.upgrade() {
        Some(s) => (s.config.reconnect_min_delay, s.config.reconnect_max_delay),
        None => return,
    };
    let mut attempt: u32 = 0;

    loop {
        let mut shutdown = {
            let Some(s) = shared.upgrade() else { return };
            let shutdown = s.shutdown.subscribe();
            if !s.wants_reconnect() {
                return;
            }
            shutdown
        };

        tokio::select! {
            () = sleep(delay) => {}
            _ = shutdown.changed() => {}
        }

        let Some(s) = shared.upgrade() else { return };
        attempt += 1;
        match Shared::try_reconnect(&s).await {
            Ok(()) => {
                debug!(attempt, "Reconnect loop finished");
                return;
            }
            Err(e) => {
                warn!(attempt, delay = ?delay, error = %e, "Reconnect attempt failed");
                delay = (delay * 2).min(max_delay);
            }
        }
    }
}

async fn read_loop<C: WsCodec>(
    shared: Weak<Shared<C>>,
    id: u64,
    mut source: WsSource,
    mut stop: watch::Receiver<bool>,
    idle_timeout: Duration,
) {
    let reason = loop {
        tokio::select! {
            _ = stop.changed() => return,
            next = timeout(idle_timeout, source.next()) => {
                let Some(shared) = shared.upgrade() else { return };
                match next {
                    Err(_) => break format!("no traffic for {:?}", idle_timeout),
                    Ok(None) => break "stream ended".to_string(),
                    Ok(Some(Err(e))) => break format!("read error: {}", e),
                    Ok(Some(Ok(message))) => match message {
                        Message::Text(text) => shared.dispatch(&text),
                        Message::Binary(bytes) => match String::from_utf8(bytes) {
                            Ok(text) => shared.dispatch(&text),
                            Err(_) => trace!("Ignoring non-UTF-8 binary frame"),
                        },
                        // tungstenite queues the pong reply itself
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                        Message::Close(frame) => {
                            break format!("closed by peer: {:?}", frame);
                        }
                    },
                }
            }
        }
    };

    if let Some(shared) = shared.upgrade() {
        Shared::handle_disconnect(&shared, id, &reason);
    }
}

async fn heartbeat_loop(
    sink: Arc<AsyncMutex<WsSink>>,
    mut stop: watch::Receiver<bool>,
    interval: Duration,
    write_timeout: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = stop.changed() => return,
            _ = ticker.tick() => {
                let ping = async { sink.lock().await.send(Message::Ping(Vec::new())).await };
                match timeout(write_timeout, ping).await {
                    Ok(Ok(())) => trace!("Heartbeat ping sent"),
                    Ok(Err(e)) => {
                        debug!(error = %e, "Heartbeat ping failed");
                        return;
                    }
                    Err(_) => {
                        debug!("Heartbeat ping timed out");
                        return;
                    }
                }
            }
        }
    }
}

async fn teardown(sink: &AsyncMutex<WsSink>, write_timeout: Duration) {
    let close = async {
        let mut sink = sink.lock().await;
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        let _ = sink.send(Message::Close(Some(frame))).await;
        let _ = sink.close().await;
    };
    if timeout(write_timeout, close).await.is_err() {
        debug!("Timed out closing WebSocket");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::codec::StreamFrame;

    struct EchoCodec;

    impl WsCodec for EchoCodec {
        fn encode_subscription(&self, streams: &[String], _auth: Option<&StreamAuth>) -> Result<Message> {
            Ok(Message::Text(format!("sub:{}", streams.join(","))))
        }

        fn encode_unsubscription(&self, streams: &[String]) -> Result<Message> {
            Ok(Message::Text(format!("unsub:{}", streams.join(","))))
        }

        fn decode_frame(&self, _text: &str) -> Option<StreamFrame> {
            None
        }
    }

    fn session() -> WsSession<EchoCodec> {
        WsSession::builder("ws://127.0.0.1:9", EchoCodec).build()
    }

    #[test]
    fn test_default_config() {
        let config = WsConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.reconnect_min_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
        assert_eq!(config.window, 5000);
        assert!(config.auto_reconnect);
        assert_eq!(config.overflow, OverflowPolicy::DropOldest);
    }

    #[tokio::test]
    async fn test_subscribe_requires_connection() {
        let ws = session();
        let err = ws.subscribe(&["trade.SOL_USDC"], |_| {}, false).await.unwrap_err();
        assert!(matches!(err, BackpackError::NotConnected));
        assert!(ws.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_private_subscribe_requires_signer() {
        let ws = session();
        let err = ws
            .subscribe_private(&["account.orderUpdate"], |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, BackpackError::AuthRequired));
        assert!(ws.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_private_subscribe_with_signer_requires_connection() {
        let signer = Ed25519Signer::new("key", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=").unwrap();
        let ws = WsSession::builder("ws://127.0.0.1:9", EchoCodec)
            .signer(Arc::new(signer))
            .build();
        let err = ws
            .subscribe_private(&["account.orderUpdate"], |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, BackpackError::NotConnected));
        assert_eq!(ws.is_private("account.orderUpdate"), None);
    }

    #[tokio::test]
    async fn test_unsubscribe_while_disconnected_is_ok() {
        let ws = session();
        ws.unsubscribe(&["never.subscribed"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let ws = session();
        ws.close().await.unwrap();
        ws.close().await.unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert!(matches!(ws.connect().await, Err(BackpackError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_failed_dial_is_reported() {
        let config = WsConfig {
            connect_timeout: Duration::from_secs(2),
            ..WsConfig::default()
        };
        let ws = WsSession::builder("ws://127.0.0.1:1", EchoCodec)
            .config(config)
            .build();
        let err = ws.connect().await.unwrap_err();
        assert!(matches!(err, BackpackError::Transport(_)));
        assert_eq!(ws.state(), ConnectionState::Disconnected);
        assert!(!ws.is_connected());
    }
}
