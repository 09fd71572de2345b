//! Session Channel Registry
//!
//! Maps the opaque session token handed to each WebSocket client (`ws_id`)
//! to that connection's outbound channel, so work running outside the
//! connection's request cycle (background summarization) can find it.
//!
//! - [`registry::SessionRegistry`] - lock-guarded token table
//! - [`channel::ChannelHandle`] - outbound queue handle usable from any thread

/// Outbound channel handle and delivery-context detection.
pub mod channel;
/// Token -> channel table.
pub mod registry;

pub use channel::{ChannelHandle, DeliveryContext, OUTBOUND_CAPACITY};
pub use registry::{Session, SessionGuard, SessionRegistry};
