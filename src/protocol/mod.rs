//! Wire-level pieces of the LFG subsystem
//!
//! Request bodies are decoded into [`ClientRequest`]; responses are
//! [`ServerMessage`]s whose bodies are produced by [`ServerMessage::encode`].

pub mod codec;
pub mod listing;
pub mod messages;

pub use codec::{PacketReader, PacketWriter};
pub use listing::{ListingEntry, ListingProtocol, ListingResponse, DEFAULT_DISPLAY_LIMIT};
pub use messages::{ClientRequest, RequestKind, ServerMessage};
