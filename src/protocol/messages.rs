//! Client requests and server notifications of the LFG subsystem

use crate::error::{MatchmakingError, Result};
use crate::protocol::codec::{PacketReader, PacketWriter};
use crate::protocol::listing::ListingResponse;
use crate::types::{LfgSlot, MAX_LFG_SLOTS};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which request a raw body belongs to; framing and opcodes are handled upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    SetLfg,
    ClearLfg,
    SetLfm,
    ClearLfm,
    SetComment,
    SetAutoJoin,
    ClearAutoJoin,
    SetAutoFill,
    ClearAutoFill,
    ListQuery,
}

/// A decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// Advertise `lfg` in slot `slot`; indices past the last slot are ignored
    SetLfg { slot: u32, lfg: LfgSlot },
    ClearLfg,
    SetLfm { more: LfgSlot },
    ClearLfm,
    SetComment { comment: String },
    SetAutoJoin,
    ClearAutoJoin,
    SetAutoFill,
    ClearAutoFill,
    ListQuery { lfg_type: u32, entry: u32, unk: u32 },
}

impl ClientRequest {
    /// Decode a request body of the given kind
    pub fn decode(kind: RequestKind, body: impl Into<Bytes>) -> Result<Self> {
        let mut reader = PacketReader::new(body);

        let request = match kind {
            RequestKind::SetLfg => {
                let slot = reader.read_u32()?;
                let word = reader.read_u32()?;
                ClientRequest::SetLfg {
                    slot,
                    lfg: LfgSlot::from_word(word),
                }
            }
            RequestKind::ClearLfg => ClientRequest::ClearLfg,
            RequestKind::SetLfm => ClientRequest::SetLfm {
                more: LfgSlot::from_word(reader.read_u32()?),
            },
            RequestKind::ClearLfm => ClientRequest::ClearLfm,
            RequestKind::SetComment => ClientRequest::SetComment {
                comment: reader.read_cstring()?,
            },
            RequestKind::SetAutoJoin => ClientRequest::SetAutoJoin,
            RequestKind::ClearAutoJoin => ClientRequest::ClearAutoJoin,
            RequestKind::SetAutoFill => ClientRequest::SetAutoFill,
            RequestKind::ClearAutoFill => ClientRequest::ClearAutoFill,
            RequestKind::ListQuery => ClientRequest::ListQuery {
                lfg_type: reader.read_u32()?,
                entry: reader.read_u32()?,
                unk: reader.read_u32()?,
            },
        };

        if reader.remaining() > 0 {
            return Err(MatchmakingError::MalformedRequest {
                reason: format!("{} trailing bytes after {}", reader.remaining(), request),
            }
            .into());
        }

        Ok(request)
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            ClientRequest::SetLfg { .. } => RequestKind::SetLfg,
            ClientRequest::ClearLfg => RequestKind::ClearLfg,
            ClientRequest::SetLfm { .. } => RequestKind::SetLfm,
            ClientRequest::ClearLfm => RequestKind::ClearLfm,
            ClientRequest::SetComment { .. } => RequestKind::SetComment,
            ClientRequest::SetAutoJoin => RequestKind::SetAutoJoin,
            ClientRequest::ClearAutoJoin => RequestKind::ClearAutoJoin,
            ClientRequest::SetAutoFill => RequestKind::SetAutoFill,
            ClientRequest::ClearAutoFill => RequestKind::ClearAutoFill,
            ClientRequest::ListQuery { .. } => RequestKind::ListQuery,
        }
    }
}

impl RequestKind {
    /// Metric label
    pub fn label(self) -> &'static str {
        match self {
            RequestKind::SetLfg => "set_lfg",
            RequestKind::ClearLfg => "clear_lfg",
            RequestKind::SetLfm => "set_lfm",
            RequestKind::ClearLfm => "clear_lfm",
            RequestKind::SetComment => "set_comment",
            RequestKind::SetAutoJoin => "set_auto_join",
            RequestKind::ClearAutoJoin => "clear_auto_join",
            RequestKind::SetAutoFill => "set_auto_fill",
            RequestKind::ClearAutoFill => "clear_auto_fill",
            RequestKind::ListQuery => "list_query",
        }
    }
}

impl fmt::Display for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().label())
    }
}

/// Messages sent back to the acting character
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Listing(ListingResponse),
    /// Current LFG slots of the character
    UpdateLfg { slots: [LfgSlot; MAX_LFG_SLOTS] },
    /// Current "more" slot, `None` when cleared
    UpdateLfm { more: Option<LfgSlot> },
}

impl ServerMessage {
    pub fn update_lfm(more: LfgSlot) -> Self {
        ServerMessage::UpdateLfm {
            more: (!more.is_empty()).then_some(more),
        }
    }

    /// Wire body of the message
    pub fn encode(&self) -> Bytes {
        match self {
            ServerMessage::Listing(listing) => listing.payload.clone(),
            ServerMessage::UpdateLfg { slots } => {
                let mut writer = PacketWriter::with_capacity(4 * MAX_LFG_SLOTS);
                for slot in slots {
                    writer.put_u32(slot.to_word());
                }
                writer.freeze()
            }
            ServerMessage::UpdateLfm { more } => {
                let mut writer = PacketWriter::with_capacity(5);
                match more {
                    Some(more) => {
                        writer.put_u8(1);
                        writer.put_u32(more.to_word());
                    }
                    None => writer.put_u8(0),
                }
                writer.freeze()
            }
        }
    }
}
