//! Network layer: the reconnecting connection manager and what it owns.
//!
//! - [`connection`]: socket lifecycle and the event loop
//! - [`sender`]: outgoing commands under a byte budget
//! - [`replies`]: keepalive and registration replies
//! - [`session`]: per-connection buffers and flags
//! - [`backoff`]: reconnect delay

mod backoff;
mod connection;
pub mod replies;
mod sender;
mod session;

pub use backoff::Backoff;
pub use connection::ConnectionManager;
pub use sender::{FlowAck, FlowControlledSender, UnknownCommandAck};
pub use session::{Session, SessionState};
