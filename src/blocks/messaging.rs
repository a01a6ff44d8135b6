//! Messaging family: in-game mail and the per-player filter
//! controlling which message types get displayed.

use super::BlockCodec;
use crate::bitio::{read_u32, read_u8, write_u32, write_u8};
use crate::error::{BlockDecodeError, CoreError};
use crate::strcodec::EncodedName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlock {
    pub message_type: u8,
    pub target_player_id: u8,
    pub text: EncodedName,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for MessageBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 2 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::MESSAGE,
                reason: format!("message payload shorter than 2 bytes: {}", payload.len()),
            }));
        }
        let message_type = read_u8(payload, 0);
        let target_player_id = read_u8(payload, 1);
        let (text, consumed) = EncodedName::decode(payload, 2, 2)?;
        let cursor = 2 + consumed;
        Ok(Self {
            message_type,
            target_player_id,
            text,
            extra_tail: payload[cursor..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 2];
        write_u8(&mut buf, 0, self.message_type);
        write_u8(&mut buf, 1, self.target_player_id);
        buf.extend_from_slice(&self.text.encode());
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

/// One bit per message type (up to 32); a set bit means that type is
/// suppressed for the owning player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagesFilterBlock {
    pub suppressed_mask: u32,
    pub extra_tail: Vec<u8>,
}

impl MessagesFilterBlock {
    pub fn is_suppressed(&self, message_type: u8) -> bool {
        message_type < 32 && self.suppressed_mask & (1 << message_type) != 0
    }
}

impl BlockCodec for MessagesFilterBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 4 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::MESSAGES_FILTER,
                reason: format!("messages filter payload shorter than 4 bytes: {}", payload.len()),
            }));
        }
        Ok(Self {
            suppressed_mask: read_u32(payload, 0),
            extra_tail: payload[4..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 4];
        write_u32(&mut buf, 0, self.suppressed_mask);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn message_roundtrips() {
        let message = MessageBlock {
            message_type: 4,
            target_player_id: 2,
            text: EncodedName::new("Your fleet has arrived."),
            extra_tail: vec![],
        };
        assert_eq!(MessageBlock::decode(&message.encode()).unwrap(), message);
    }

    #[test]
    fn messages_filter_roundtrips_and_tests_bits() {
        let filter = MessagesFilterBlock {
            suppressed_mask: 0b1010,
            extra_tail: vec![],
        };
        assert!(filter.is_suppressed(1));
        assert!(!filter.is_suppressed(0));
        assert_eq!(MessagesFilterBlock::decode(&filter.encode()).unwrap(), filter);
    }

    #[test]
    fn message_preserves_unknown_trailing_bytes() {
        let message = MessageBlock {
            message_type: 4,
            target_player_id: 2,
            text: EncodedName::new("Hi"),
            extra_tail: vec![0x01, 0x02],
        };
        assert_eq!(MessageBlock::decode(&message.encode()).unwrap(), message);
    }
}
