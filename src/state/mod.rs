//! State management module.
//!
//! Contains the [`StateTracker`] (the client's view of channels and nicks)
//! and the records it owns.

mod channel;
mod nick;
mod tracker;

pub use channel::{Channel, MemberModes};
pub use nick::Nick;
pub use tracker::StateTracker;
