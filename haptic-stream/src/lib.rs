//! Concurrency core of the haptic control session.
//!
//! Three workers cooperate around one duplex connection:
//!
//! - the [`Hub`] fans every inbound message out to any number of
//!   independent subscribers, evicting the ones that stop draining,
//! - the [`OutboundQueue`] decouples message production from socket writes
//!   behind a bounded buffer and a single write worker,
//! - the read loop ([`spawn_reader`]) decodes inbound frames, feeds the
//!   hub, and raises the session-ended signal when the transport dies.
//!
//! The transport itself hides behind the [`FrameSource`]/[`FrameSink`]
//! traits; [`ws`] provides the websocket implementation.

mod error;
mod hub;
mod reader;
mod sender;
mod transport;
pub mod ws;

pub use error::{HubError, SendError, TransportError};
pub use hub::{Hub, Subscription, SUBSCRIPTION_BUFFER};
pub use reader::spawn_reader;
pub use sender::{OutboundQueue, OUTBOUND_CAPACITY};
pub use transport::{FrameSink, FrameSource};
