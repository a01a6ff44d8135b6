//! Objects family: non-planet space objects — minefields,
//! mineral-packet/salvage debris, wormholes, and deep-space traders — plus
//! the running count block that precedes them in the stream.

use super::BlockCodec;
use crate::bitio::{extract_bits, read_u16, read_u32, read_u8, write_u16, write_u32, write_u8};
use crate::error::{BlockDecodeError, CoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCountBlock {
    pub count: u16,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for ObjectCountBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 2 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::OBJECT_COUNT,
                reason: format!("object count payload shorter than 2 bytes: {}", payload.len()),
            }));
        }
        Ok(Self {
            count: read_u16(payload, 0),
            extra_tail: payload[2..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = self.count.to_le_bytes().to_vec();
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

const COMMON_HEADER_SIZE: usize = 7;
const MIN_RECORD_SIZE: usize = 14;

/// Common leading fields every object record shares, ahead of its
/// variant-specific body: a flags byte (low 3 bits are the variant
/// discriminator), object id, and position.
struct CommonHeader {
    object_id: u16,
    x: u16,
    y: u16,
}

impl CommonHeader {
    fn decode(buf: &[u8]) -> Self {
        Self {
            object_id: read_u16(buf, 1),
            x: read_u16(buf, 3),
            y: read_u16(buf, 5),
        }
    }

    fn encode(&self, discriminant: u8, buf: &mut Vec<u8>) {
        buf.push(discriminant & 0b111);
        buf.extend_from_slice(&self.object_id.to_le_bytes());
        buf.extend_from_slice(&self.x.to_le_bytes());
        buf.extend_from_slice(&self.y.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRecordBlock {
    Minefield {
        object_id: u16,
        x: u16,
        y: u16,
        owner_id: u8,
        mine_count: u32,
        detonates: bool,
        extra_tail: Vec<u8>,
    },
    PacketSalvage {
        object_id: u16,
        x: u16,
        y: u16,
        ironium: u32,
        boranium: u32,
        germanium: u32,
        extra_tail: Vec<u8>,
    },
    Wormhole {
        object_id: u16,
        x: u16,
        y: u16,
        destination_object_id: u16,
        stability: u8,
        extra_tail: Vec<u8>,
    },
    Trader {
        object_id: u16,
        x: u16,
        y: u16,
        heading: u16,
        speed: u8,
        extra_tail: Vec<u8>,
    },
}

impl BlockCodec for ObjectRecordBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < MIN_RECORD_SIZE {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::OBJECT_RECORD,
                reason: format!(
                    "object record payload shorter than {MIN_RECORD_SIZE} bytes: {}",
                    payload.len()
                ),
            }));
        }
        let discriminant = extract_bits(read_u8(payload, 0) as u32, 0, 3) as u8;
        let header = CommonHeader::decode(payload);
        let body = &payload[COMMON_HEADER_SIZE..];
        let extra_tail = payload[MIN_RECORD_SIZE..].to_vec();

        Ok(match discriminant {
            0 => Self::Minefield {
                object_id: header.object_id,
                x: header.x,
                y: header.y,
                owner_id: read_u8(body, 0),
                mine_count: read_u32(body, 1),
                detonates: read_u8(body, 5) != 0,
                extra_tail,
            },
            1 => Self::PacketSalvage {
                object_id: header.object_id,
                x: header.x,
                y: header.y,
                ironium: read_u32(body, 0),
                boranium: read_u32(body, 4),
                germanium: read_u32(body, 8),
                extra_tail,
            },
            2 => Self::Wormhole {
                object_id: header.object_id,
                x: header.x,
                y: header.y,
                destination_object_id: read_u16(body, 0),
                stability: read_u8(body, 2),
                extra_tail,
            },
            3 => Self::Trader {
                object_id: header.object_id,
                x: header.x,
                y: header.y,
                heading: read_u16(body, 0),
                speed: read_u8(body, 2),
                extra_tail,
            },
            other => {
                return Err(CoreError::block_decode(BlockDecodeError {
                    offset: 0,
                    block_type: super::tags::OBJECT_RECORD,
                    reason: format!("unknown object record discriminator {other}"),
                }))
            }
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MIN_RECORD_SIZE);
        let extra_tail = match self {
            Self::Minefield {
                object_id,
                x,
                y,
                owner_id,
                mine_count,
                detonates,
                extra_tail,
            } => {
                CommonHeader { object_id: *object_id, x: *x, y: *y }.encode(0, &mut buf);
                buf.push(*owner_id);
                buf.extend_from_slice(&mine_count.to_le_bytes());
                buf.push(if *detonates { 1 } else { 0 });
                extra_tail
            }
            Self::PacketSalvage {
                object_id,
                x,
                y,
                ironium,
                boranium,
                germanium,
                extra_tail,
            } => {
                CommonHeader { object_id: *object_id, x: *x, y: *y }.encode(1, &mut buf);
                buf.extend_from_slice(&ironium.to_le_bytes());
                buf.extend_from_slice(&boranium.to_le_bytes());
                buf.extend_from_slice(&germanium.to_le_bytes());
                extra_tail
            }
            Self::Wormhole {
                object_id,
                x,
                y,
                destination_object_id,
                stability,
                extra_tail,
            } => {
                CommonHeader { object_id: *object_id, x: *x, y: *y }.encode(2, &mut buf);
                buf.extend_from_slice(&destination_object_id.to_le_bytes());
                buf.push(*stability);
                extra_tail
            }
            Self::Trader {
                object_id,
                x,
                y,
                heading,
                speed,
                extra_tail,
            } => {
                CommonHeader { object_id: *object_id, x: *x, y: *y }.encode(3, &mut buf);
                buf.extend_from_slice(&heading.to_le_bytes());
                buf.push(*speed);
                extra_tail
            }
        };
        while buf.len() < MIN_RECORD_SIZE {
            buf.push(0);
        }
        buf.extend_from_slice(extra_tail);
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object_count_roundtrips() {
        let block = ObjectCountBlock { count: 12, extra_tail: vec![] };
        assert_eq!(ObjectCountBlock::decode(&block.encode()).unwrap(), block);
    }

    #[test]
    fn minefield_roundtrips() {
        let record = ObjectRecordBlock::Minefield {
            object_id: 5,
            x: 100,
            y: 200,
            owner_id: 2,
            mine_count: 50_000,
            detonates: true,
            extra_tail: vec![],
        };
        assert_eq!(ObjectRecordBlock::decode(&record.encode()).unwrap(), record);
    }

    #[test]
    fn packet_salvage_roundtrips() {
        let record = ObjectRecordBlock::PacketSalvage {
            object_id: 9,
            x: 10,
            y: 20,
            ironium: 100,
            boranium: 200,
            germanium: 300,
            extra_tail: vec![],
        };
        assert_eq!(ObjectRecordBlock::decode(&record.encode()).unwrap(), record);
    }

    #[test]
    fn wormhole_and_trader_roundtrip_with_padding() {
        let wormhole = ObjectRecordBlock::Wormhole {
            object_id: 1,
            x: 1,
            y: 1,
            destination_object_id: 2,
            stability: 7,
            extra_tail: vec![],
        };
        let encoded = wormhole.encode();
        assert_eq!(encoded.len(), MIN_RECORD_SIZE);
        assert_eq!(ObjectRecordBlock::decode(&encoded).unwrap(), wormhole);

        let trader = ObjectRecordBlock::Trader {
            object_id: 3,
            x: 4,
            y: 5,
            heading: 270,
            speed: 6,
            extra_tail: vec![],
        };
        assert_eq!(ObjectRecordBlock::decode(&trader.encode()).unwrap(), trader);
    }

    #[test]
    fn unknown_discriminator_is_rejected() {
        let mut bytes = vec![0u8; MIN_RECORD_SIZE];
        bytes[0] = 7;
        assert!(ObjectRecordBlock::decode(&bytes).is_err());
    }

    #[test]
    fn minefield_preserves_unknown_trailing_bytes() {
        let record = ObjectRecordBlock::Minefield {
            object_id: 5,
            x: 100,
            y: 200,
            owner_id: 2,
            mine_count: 50_000,
            detonates: true,
            extra_tail: vec![0xab, 0xcd],
        };
        assert_eq!(ObjectRecordBlock::decode(&record.encode()).unwrap(), record);
    }
}
