//! Connection manager.
//!
//! Owns the socket, the session and the flow-controlled sender, and drives
//! the [`Engine`] from a single-task `select!` loop. One wake-up services
//! whichever source is ready: inbound bytes are decoded and every complete
//! line is processed in arrival order, queued output is flushed, due timers
//! fire. When the transport ends the engine sees a `_DISCONNECT` event and
//! the manager reconnects after a backoff delay, forever.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use slirc_proto::Event;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, warn};

use super::backoff::Backoff;
use super::replies;
use super::sender::FlowControlledSender;
use super::session::{Session, SessionState};
use crate::config::Config;
use crate::engine::Engine;
use crate::error::ConnectError;
use crate::plugins::ModuleRegistry;

const READ_CHUNK: usize = 8192;

/// Far enough ahead to never fire.
fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86_400 * 365 * 30)
}

/// Outcome of one `select!` wake-up.
enum SelectResult {
    /// Bytes appended to the read buffer.
    Read(usize),
    /// Bytes flushed from the write buffer.
    Written(usize),
    /// The earliest timer is due.
    TimerDue,
    /// Peer closed the connection.
    Eof,
    /// The transport failed.
    Failed(std::io::Error),
}

/// Reconnecting client connection.
pub struct ConnectionManager {
    config: Arc<Config>,
    session: Session,
    sender: FlowControlledSender,
    engine: Engine,
    backoff: Backoff,
}

impl ConnectionManager {
    pub fn new(config: Arc<Config>, registry: ModuleRegistry) -> Result<Self, ConnectError> {
        let session = Session::new(&config.codec.fallback_encoding)?;
        Ok(Self {
            session,
            sender: FlowControlledSender::new(&config.flood),
            engine: Engine::new(Arc::clone(&config), registry),
            backoff: Backoff::new(config.reconnect.base),
            config,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sender(&self) -> &FlowControlledSender {
        &self.sender
    }

    /// Load the modules named in the configuration.
    ///
    /// Anything the load hooks send before the first connect is dropped
    /// with the sender state when the connection opens.
    pub fn load_configured_modules(&mut self) {
        let modules = self.config.plugins.modules.clone();
        self.engine.load_modules(&modules, &mut self.sender);
    }

    /// Connect, serve and reconnect forever.
    pub async fn run(&mut self) {
        loop {
            let delay = self.run_cycle().await;
            self.wait(delay).await;
        }
    }

    /// One connect attempt and, if it succeeds, one connection lifetime.
    /// Returns the delay before the next attempt.
    pub async fn run_cycle(&mut self) -> Duration {
        match self.connect().await {
            Ok(stream) => self.serve(stream).await,
            Err(e) => {
                self.session.disconnected();
                warn!(error = %e, "Could not connect");
            }
        }

        let delay = self.backoff.next_delay(self.session.registered());
        if delay.is_zero() {
            info!("Reconnecting");
        } else {
            info!(
                delay_secs = delay.as_secs(),
                failures = self.backoff.failures(),
                "Reconnecting after delay"
            );
        }
        delay
    }

    async fn connect(&mut self) -> Result<TcpStream, ConnectError> {
        self.session.begin_connect();
        self.sender.reset();

        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        info!(%addr, "Connecting");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ConnectError::Io { addr, source })?;
        self.session.connected();

        let identity = &self.config.identity;
        self.sender.send(&format!(
            "USER {} * * :{}",
            identity.username, identity.realname
        ));
        self.sender.send(&format!("NICK {}", identity.nick));
        Ok(stream)
    }

    #[instrument(skip_all, fields(peer = ?stream.peer_addr().ok()), name = "session")]
    async fn serve(&mut self, mut stream: TcpStream) {
        let (mut reader, mut writer) = stream.split();
        let mut outgoing = BytesMut::new();

        loop {
            if outgoing.is_empty() && self.sender.has_output() {
                outgoing = self.sender.take_outbox();
            }
            let now = Instant::now();
            let deadline = self.engine.next_deadline();
            let read_buf = self.session.read_buf_mut();
            read_buf.reserve(READ_CHUNK);

            let result = tokio::select! {
                read = reader.read_buf(read_buf) => match read {
                    Ok(0) => SelectResult::Eof,
                    Ok(n) => SelectResult::Read(n),
                    Err(e) => SelectResult::Failed(e),
                },
                written = writer.write_buf(&mut outgoing), if !outgoing.is_empty() => match written {
                    Ok(0) => SelectResult::Failed(std::io::ErrorKind::WriteZero.into()),
                    Ok(n) => SelectResult::Written(n),
                    Err(e) => SelectResult::Failed(e),
                },
                _ = sleep_until(deadline.unwrap_or_else(|| far_future(now))), if deadline.is_some() => {
                    SelectResult::TimerDue
                }
            };

            match result {
                SelectResult::Read(n) => {
                    debug!(bytes = n, "Read");
                    if let Err(e) = self.process_lines() {
                        error!(error = %e, "Decode failed");
                        break;
                    }
                }
                SelectResult::Written(n) => debug!(bytes = n, "Flushed"),
                SelectResult::TimerDue => {}
                SelectResult::Eof => {
                    info!("Connection closed by server");
                    break;
                }
                SelectResult::Failed(e) => {
                    warn!(error = %e, "Connection failed");
                    break;
                }
            }

            self.engine.process_timers(Instant::now(), &mut self.sender);
        }

        if !outgoing.is_empty() {
            debug!(bytes = outgoing.len(), "Discarding unsent output");
        }
        self.session.disconnected();
        self.engine.handle_disconnect(&mut self.sender);
    }

    /// Process every complete line in the read buffer, in order.
    fn process_lines(&mut self) -> Result<(), slirc_proto::ProtocolError> {
        while let Some(event) = self.session.next_event()? {
            self.process_event(&event);
        }
        Ok(())
    }

    fn process_event(&mut self, event: &Event) {
        debug!("<- {}", event);
        self.sender.handle_event(event);
        replies::handle(
            &mut self.session,
            &self.config.identity,
            event,
            &mut self.sender,
        );
        self.engine.handle_event(event, &mut self.sender);
    }

    /// Sleep for `delay` while still firing timers.
    async fn wait(&mut self, delay: Duration) {
        let start = Instant::now();
        let until = start.checked_add(delay).unwrap_or_else(|| far_future(start));
        loop {
            let next = self.engine.process_timers(Instant::now(), &mut self.sender);
            if Instant::now() >= until {
                return;
            }
            let wake = next.map_or(until, |t| t.min(until));
            sleep_until(wake).await;
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}
