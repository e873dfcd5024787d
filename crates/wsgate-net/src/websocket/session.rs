//! The WebSocket session: one client connection and its observable state.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::Instrument;
use url::Url;
use wsgate_core::Signal;
use wsgate_core::logging::{span_names, targets};

use super::config::{ReconnectConfig, SessionConfig};
use super::message::{CloseReason, SessionState};
use crate::error::{NetworkError, Result};

/// Type alias for a connected WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The single registered message observer.
type Observer = Arc<dyn Fn(&str) + Send + Sync>;

/// Command sent to the connection task.
enum Command {
    SendText(String),
    Close(CloseReason),
}

/// How an established connection ended.
enum Exit {
    /// `close()` was called or the session was dropped.
    Local,
    /// The server closed the connection or the stream ended.
    Remote(Option<CloseReason>),
    /// A transport or protocol error broke the connection.
    Failed(NetworkError),
}

/// Signals shared between the session handle and its connection task.
#[derive(Clone)]
struct Signals {
    state_changed: Arc<Signal<SessionState>>,
    opened: Arc<Signal<()>>,
    closed: Arc<Signal<Option<CloseReason>>>,
    message_received: Arc<Signal<String>>,
    error: Arc<Signal<NetworkError>>,
}

/// Mutable session state, written by the connection task.
struct SessionInner {
    state: SessionState,
    /// Bumped on every new attempt and on `close()`; tasks holding an older
    /// value may no longer touch the session.
    generation: u64,
    command_tx: Option<mpsc::UnboundedSender<Command>>,
    last_message: Option<String>,
    observer: Option<Observer>,
}

/// State reachable from both the handle and the task.
struct Shared {
    inner: Mutex<SessionInner>,
    latest_tx: watch::Sender<Option<String>>,
    signals: Signals,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    /// Move to `state` on behalf of attempt `generation`.
    ///
    /// Returns `false` if the attempt has been superseded.
    fn transition(&self, generation: u64, state: SessionState) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return false;
            }
            if inner.state == state {
                return true;
            }
            inner.state = state;
            if state == SessionState::Closed {
                inner.command_tx = None;
            }
        }
        tracing::debug!(target: targets::SESSION, %state, "state changed");
        self.signals.state_changed.emit(state);
        true
    }

    /// Record and forward an inbound text payload.
    fn deliver(&self, generation: u64, payload: String) {
        let observer = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            inner.last_message = Some(payload.clone());
            inner.observer.clone()
        };

        self.latest_tx.send_replace(Some(payload.clone()));
        if let Some(observer) = observer {
            observer(&payload);
        }
        self.signals.message_received.emit(payload);
    }

    fn report(&self, generation: u64, error: NetworkError) {
        tracing::warn!(target: targets::SESSION, %error, "session error");
        if self.is_current(generation) {
            self.signals.error.emit(error);
        }
    }
}

/// Everything needed to perform one handshake.
struct Dialer {
    endpoint: Url,
    headers: HeaderMap,
    tls: Option<Arc<rustls::ClientConfig>>,
    connect_timeout: Option<Duration>,
}

impl Dialer {
    fn request(&self) -> Result<Request> {
        let mut request = self.endpoint.as_str().into_client_request()?;
        let headers = request.headers_mut();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(request)
    }

    async fn dial(&self) -> Result<WsStream> {
        let request = self.request()?;
        let connector = self.tls.clone().map(Connector::Rustls);
        let handshake =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector);

        let (stream, response) = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| NetworkError::Timeout)??,
            None => handshake.await?,
        };
        tracing::debug!(target: targets::SESSION, status = %response.status(), "handshake complete");

        Ok(stream)
    }
}

/// A single client-initiated WebSocket connection to one endpoint.
///
/// The session moves through `Closed → Connecting → Open → Closed` and can be
/// restarted from `Closed` with [`reconnect`](Self::reconnect). The handshake
/// and all I/O run on a tokio task; every method on the handle returns
/// immediately.
///
/// Inbound text frames are delivered, in order, to:
///
/// 1. [`last_message`](Self::last_message) and the [`subscribe`](Self::subscribe) channel
/// 2. the single observer installed with [`set_observer`](Self::set_observer)
/// 3. the [`message_received`](Self::message_received) signal
///
/// Observers run on the connection task's thread. Consumers bound to a
/// particular thread should read from [`subscribe`](Self::subscribe) instead.
///
/// Dropping the session closes the connection.
///
/// # Example
///
/// ```ignore
/// let session = Session::new(SessionConfig::new("ws://localhost:9999/echo"))?;
///
/// session.set_observer(|payload| println!("Received: {payload}"));
/// session.connect();
///
/// // Later, in response to user input:
/// if session.is_open() {
///     session.send_request("ping")?;
/// } else {
///     session.reconnect();
/// }
/// ```
pub struct Session {
    config: SessionConfig,
    dialer: Arc<Dialer>,
    shared: Arc<Shared>,

    /// Signal emitted on every state transition.
    pub state_changed: Arc<Signal<SessionState>>,
    /// Signal emitted when the handshake completes.
    pub opened: Arc<Signal<()>>,
    /// Signal emitted when an open connection ends, with the close reason if
    /// one was exchanged.
    pub closed: Arc<Signal<Option<CloseReason>>>,
    /// Signal emitted for each inbound text message.
    pub message_received: Arc<Signal<String>>,
    /// Signal emitted when a handshake or transport error occurs.
    pub error: Arc<Signal<NetworkError>>,
}

impl Session {
    /// Create a session from a configuration.
    ///
    /// The endpoint, headers and TLS settings are validated here; nothing
    /// touches the network until [`connect`](Self::connect).
    pub fn new(config: SessionConfig) -> Result<Self> {
        let endpoint = parse_endpoint(&config.endpoint)?;
        let headers = build_header_map(&config)?;

        let tls = match (endpoint.scheme(), &config.tls) {
            ("wss", Some(tls)) => Some(tls.build_rustls_config()?),
            ("ws", Some(_)) => {
                tracing::debug!(target: targets::SESSION, "ignoring TLS settings for ws:// endpoint");
                None
            }
            _ => None,
        };

        let signals = Signals {
            state_changed: Arc::new(Signal::new()),
            opened: Arc::new(Signal::new()),
            closed: Arc::new(Signal::new()),
            message_received: Arc::new(Signal::new()),
            error: Arc::new(Signal::new()),
        };
        let (latest_tx, _) = watch::channel(None);

        let dialer = Dialer {
            endpoint,
            headers,
            tls,
            connect_timeout: config.connect_timeout,
        };

        Ok(Self {
            config,
            dialer: Arc::new(dialer),
            state_changed: signals.state_changed.clone(),
            opened: signals.opened.clone(),
            closed: signals.closed.clone(),
            message_received: signals.message_received.clone(),
            error: signals.error.clone(),
            shared: Arc::new(Shared {
                inner: Mutex::new(SessionInner {
                    state: SessionState::Closed,
                    generation: 0,
                    command_tx: None,
                    last_message: None,
                    observer: None,
                }),
                latest_tx,
                signals,
            }),
        })
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// Check whether the session is open and can send requests.
    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// The validated endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.dialer.endpoint
    }

    /// The headers sent with every handshake.
    pub fn headers(&self) -> &HeaderMap {
        &self.dialer.headers
    }

    /// The configuration this session was built from.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The most recently received text message, if any.
    pub fn last_message(&self) -> Option<String> {
        self.shared.inner.lock().last_message.clone()
    }

    /// Watch the most recent message from another task or thread.
    ///
    /// Only the latest value is retained; a slow reader skips intermediate
    /// messages.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.shared.latest_tx.subscribe()
    }

    /// Install the message observer, replacing any previous one.
    ///
    /// Returns `true` if an observer was replaced.
    pub fn set_observer<F>(&self, observer: F) -> bool
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared
            .inner
            .lock()
            .observer
            .replace(Arc::new(observer))
            .is_some()
    }

    /// Remove the message observer. Returns `true` if one was installed.
    pub fn clear_observer(&self) -> bool {
        self.shared.inner.lock().observer.take().is_some()
    }

    /// Start the handshake.
    ///
    /// Returns immediately; the outcome arrives as a state transition. If the
    /// session is already connecting or open this does nothing. Must be
    /// called from within a tokio runtime.
    pub fn connect(&self) {
        self.start();
    }

    /// Start a fresh handshake after the session closed.
    ///
    /// Returns `false`, doing nothing, if the session is connecting or open,
    /// so repeated calls never open a second connection.
    pub fn reconnect(&self) -> bool {
        let state = self.state();
        if state != SessionState::Closed {
            tracing::debug!(target: targets::SESSION, %state, "reconnect ignored");
            return false;
        }
        self.start()
    }

    /// Send `text` as a single text frame.
    ///
    /// Fails with [`NetworkError::SendOnClosed`] unless the session is open.
    /// Nothing is queued for later delivery.
    pub fn send_request(&self, text: impl Into<String>) -> Result<()> {
        let inner = self.shared.inner.lock();
        if inner.state != SessionState::Open {
            return Err(NetworkError::SendOnClosed);
        }
        let tx = inner.command_tx.as_ref().ok_or(NetworkError::SendOnClosed)?;
        tx.send(Command::SendText(text.into()))
            .map_err(|_| NetworkError::SendOnClosed)
    }

    /// Close the session with a normal close frame.
    pub fn close(&self) {
        self.close_with(CloseReason::normal());
    }

    /// Close the session with the given reason.
    ///
    /// Aborts a handshake in progress or a pending retry. Does nothing if
    /// the session is already closed.
    pub fn close_with(&self, reason: CloseReason) {
        let (tx, was_open) = {
            let mut inner = self.shared.inner.lock();
            if inner.state == SessionState::Closed {
                return;
            }
            let was_open = inner.state == SessionState::Open;
            inner.generation += 1;
            inner.state = SessionState::Closed;
            (inner.command_tx.take(), was_open)
        };

        if let Some(tx) = tx {
            let _ = tx.send(Command::Close(reason.clone()));
        }

        tracing::debug!(target: targets::SESSION, code = reason.code, "session closed locally");
        let signals = &self.shared.signals;
        signals.state_changed.emit(SessionState::Closed);
        if was_open {
            signals.closed.emit(Some(reason));
        }
    }

    /// Spawn a connection task. Returns `false` if none was started.
    fn start(&self) -> bool {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let error = NetworkError::Runtime(e.to_string());
                tracing::error!(target: targets::SESSION, %error, "cannot connect outside a tokio runtime");
                self.shared.signals.error.emit(error);
                return false;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let generation = {
            let mut inner = self.shared.inner.lock();
            if inner.state != SessionState::Closed {
                return false;
            }
            inner.generation += 1;
            inner.state = SessionState::Connecting;
            inner.command_tx = Some(tx);
            inner.generation
        };
        tracing::debug!(target: targets::SESSION, endpoint = %self.dialer.endpoint, generation, "connecting");
        self.shared.signals.state_changed.emit(SessionState::Connecting);

        let task = ConnectionTask {
            shared: self.shared.clone(),
            dialer: self.dialer.clone(),
            reconnect: self.config.reconnect.clone(),
            generation,
            commands: rx,
        };
        let span = tracing::debug_span!(
            target: targets::SESSION,
            span_names::CONNECTION,
            endpoint = %self.dialer.endpoint,
            generation
        );
        runtime.spawn(task.run().instrument(span));
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.clear_observer();
        self.close_with(CloseReason::away());
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.dialer.endpoint.as_str())
            .field("state", &self.state())
            .finish()
    }
}

/// Drives one `connect()`: the handshake, the open connection and any
/// automatic retries.
struct ConnectionTask {
    shared: Arc<Shared>,
    dialer: Arc<Dialer>,
    reconnect: Option<ReconnectConfig>,
    generation: u64,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut retry: u32 = 0;

        loop {
            let dialed = tokio::select! {
                result = self.dialer.dial() => result,
                _ = closed_locally(&mut self.commands) => {
                    tracing::debug!(target: targets::SESSION, "handshake abandoned");
                    return;
                }
            };

            // Set when an open connection ended, holding its close reason.
            let mut ended = None;
            match dialed {
                Ok(stream) => {
                    retry = 0;
                    if !self.shared.transition(self.generation, SessionState::Open) {
                        return;
                    }
                    self.shared.signals.opened.emit(());

                    ended = Some(match self.pump(stream).await {
                        Exit::Local => return,
                        Exit::Remote(reason) => {
                            tracing::debug!(target: targets::SESSION, ?reason, "closed by peer");
                            reason
                        }
                        Exit::Failed(error) => {
                            self.shared.report(self.generation, error);
                            None
                        }
                    });
                }
                Err(error) => self.shared.report(self.generation, error),
            }

            let delay = self.next_retry_delay(retry);
            let next = if delay.is_some() {
                SessionState::Connecting
            } else {
                SessionState::Closed
            };
            if !self.shared.transition(self.generation, next) {
                return;
            }
            if let Some(reason) = ended {
                self.shared.signals.closed.emit(reason);
            }

            let Some(delay) = delay else {
                return;
            };
            // No longer Open, so nothing new can be queued behind these.
            if !self.discard_stale_sends() {
                return;
            }
            retry += 1;
            tracing::info!(
                target: targets::SESSION,
                retry,
                delay_ms = delay.as_millis() as u64,
                "retrying"
            );
            let backoff = tokio::time::sleep(delay).instrument(tracing::debug_span!(
                target: targets::SESSION,
                span_names::BACKOFF,
                retry
            ));
            tokio::select! {
                _ = backoff => {}
                _ = closed_locally(&mut self.commands) => return,
            }
        }
    }

    /// Drop text queued for a connection that has ended.
    ///
    /// Returns `false` if a close request was found or the handle is gone.
    fn discard_stale_sends(&mut self) -> bool {
        let mut dropped = 0usize;
        loop {
            match self.commands.try_recv() {
                Ok(Command::SendText(_)) => dropped += 1,
                Ok(Command::Close(_)) | Err(mpsc::error::TryRecvError::Disconnected) => {
                    return false;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
            }
        }
        if dropped > 0 {
            tracing::debug!(target: targets::SESSION, dropped, "discarded unsent requests");
        }
        true
    }

    /// Delay before retry number `retry`, or `None` to stay closed.
    fn next_retry_delay(&self, retry: u32) -> Option<Duration> {
        let policy = self.reconnect.as_ref()?;
        if !policy.should_attempt(retry) {
            self.shared.report(
                self.generation,
                NetworkError::Connection(format!("giving up after {retry} retries")),
            );
            return None;
        }
        Some(policy.delay_for_attempt(retry))
    }

    /// Shuttle frames until the connection ends.
    async fn pump(&mut self, stream: WsStream) -> Exit {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(Command::SendText(text)) => {
                            if let Err(e) = write.send(Message::Text(text.into())).await {
                                return Exit::Failed(e.into());
                            }
                        }
                        Some(Command::Close(reason)) => {
                            let _ = write.send(Message::Close(Some(reason.to_frame()))).await;
                            return Exit::Local;
                        }
                        None => {
                            let _ = write.send(Message::Close(Some(CloseReason::away().to_frame()))).await;
                            return Exit::Local;
                        }
                    }
                }

                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            self.shared.deliver(self.generation, text.as_str().to_owned());
                        }
                        Some(Ok(Message::Binary(data))) => {
                            tracing::debug!(target: targets::SESSION, len = data.len(), "ignoring binary frame");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            return Exit::Remote(frame.as_ref().map(CloseReason::from_frame));
                        }
                        // Pongs are queued by tungstenite itself
                        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                        Some(Err(e)) => return Exit::Failed(e.into()),
                        None => return Exit::Remote(None),
                    }
                }
            }
        }
    }
}

/// Resolves once `close()` was called or the handle dropped its sender.
///
/// Stray `SendText` commands are skipped; only an explicit close ends an
/// attempt early.
async fn closed_locally(commands: &mut mpsc::UnboundedReceiver<Command>) {
    loop {
        match commands.recv().await {
            Some(Command::SendText(_)) => continue,
            Some(Command::Close(_)) | None => return,
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(NetworkError::MalformedEndpoint(format!(
                "unsupported scheme '{other}', expected ws or wss"
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(NetworkError::MalformedEndpoint(format!(
            "missing host in '{endpoint}'"
        )));
    }
    Ok(url)
}

fn build_header_map(config: &SessionConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(config.headers.len());
    for (name, value) in &config.headers {
        let name = HeaderName::try_from(name.as_str())?;
        let value = HeaderValue::try_from(value.as_str())?;
        headers.insert(name, value);
    }
    Ok(headers)
}
