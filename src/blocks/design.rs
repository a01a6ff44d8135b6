//! Design family: ship/starbase designs and their change
//! notifications. A design record is "brief" (name and hull only, enough
//! to label a fleet) or "full" (every mounted component) selected by bit 2
//! of its control byte — the same brief/full split the planet and fleet
//! families use, reused here rather than invented fresh.

use super::BlockCodec;
use crate::bitio::{extract_bits, read_u16, read_u32, read_u8, write_u8};
use crate::error::{BlockDecodeError, CoreError};
use crate::strcodec::EncodedName;

/// One occupied hull slot: `category` is a 16-bit part category, `item_id`
/// picks the specific part within it, `count` how many are mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignSlot {
    pub category: u16,
    pub item_id: u8,
    pub count: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignFullData {
    pub armor: u16,
    pub turn_designed: u16,
    pub total_built: u32,
    pub total_remaining: u32,
    /// One 4-byte entry per occupied hull slot: `category:16, item_id:8,
    /// count:8`.
    pub slots: Vec<DesignSlot>,
}

impl DesignFullData {
    fn decode(buf: &[u8]) -> Result<Self, CoreError> {
        if buf.len() < 13 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::DESIGN,
                reason: format!("design full-data header shorter than 13 bytes: {}", buf.len()),
            }));
        }
        let armor = read_u16(buf, 0);
        let turn_designed = read_u16(buf, 2);
        let total_built = read_u32(buf, 4);
        let total_remaining = read_u32(buf, 8);
        let slot_count = buf[12] as usize;
        let needed = 13 + slot_count * 4;
        if buf.len() < needed {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 13,
                block_type: super::tags::DESIGN,
                reason: format!("design declares {slot_count} slots but payload is too short"),
            }));
        }
        let mut slots = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            let offset = 13 + i * 4;
            slots.push(DesignSlot {
                category: read_u16(buf, offset),
                item_id: buf[offset + 2],
                count: buf[offset + 3],
            });
        }
        Ok(Self {
            armor,
            turn_designed,
            total_built,
            total_remaining,
            slots,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(13 + self.slots.len() * 4);
        buf.extend_from_slice(&self.armor.to_le_bytes());
        buf.extend_from_slice(&self.turn_designed.to_le_bytes());
        buf.extend_from_slice(&self.total_built.to_le_bytes());
        buf.extend_from_slice(&self.total_remaining.to_le_bytes());
        buf.push(self.slots.len() as u8);
        for slot in &self.slots {
            buf.extend_from_slice(&slot.category.to_le_bytes());
            buf.push(slot.item_id);
            buf.push(slot.count);
        }
        buf
    }

    /// Byte length of [`Self::decode`]'s fixed header plus its slot array,
    /// so `DesignBlock::decode` can locate the trailing `extra_tail`.
    fn wire_len(slot_count: usize) -> usize {
        13 + slot_count * 4
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignBlock {
    pub design_id: u8,
    pub owner_id: u8,
    /// Whether this design occupies the starbase slot range rather than
    /// the ship slot range — the third component of a design's identity
    ///.
    pub is_starbase: bool,
    pub hull_type: u8,
    pub name: EncodedName,
    pub full: Option<DesignFullData>,
    /// Bytes beyond the documented fields, preserved byte-for-byte.
    pub extra_tail: Vec<u8>,
}

const STARBASE_BIT: u32 = 3;
const FULL_DATA_BIT: u32 = 2;

impl BlockCodec for DesignBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 4 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::DESIGN,
                reason: format!("design payload shorter than 4 bytes: {}", payload.len()),
            }));
        }
        let design_id = read_u8(payload, 0);
        let owner_id = read_u8(payload, 1);
        let hull_type = read_u8(payload, 2);
        let control_byte = read_u8(payload, 3);
        let is_full = extract_bits(control_byte as u32, FULL_DATA_BIT, 1) == 1;
        let is_starbase = extract_bits(control_byte as u32, STARBASE_BIT, 1) == 1;

        let mut cursor = 4;
        let (name, consumed) = EncodedName::decode(payload, cursor as u64, cursor)?;
        cursor += consumed;

        let full = if is_full {
            let data = DesignFullData::decode(&payload[cursor..])?;
            cursor += DesignFullData::wire_len(data.slots.len());
            Some(data)
        } else {
            None
        };

        Ok(Self {
            design_id,
            owner_id,
            is_starbase,
            hull_type,
            name,
            full,
            extra_tail: payload[cursor..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 4];
        write_u8(&mut buf, 0, self.design_id);
        write_u8(&mut buf, 1, self.owner_id);
        write_u8(&mut buf, 2, self.hull_type);
        let mut control_byte = if self.full.is_some() { 1 << FULL_DATA_BIT } else { 0 };
        if self.is_starbase {
            control_byte |= 1 << STARBASE_BIT;
        }
        write_u8(&mut buf, 3, control_byte);
        buf.extend_from_slice(&self.name.encode());
        if let Some(full) = &self.full {
            buf.extend_from_slice(&full.encode());
        }
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

/// Wraps a design's lifecycle transition: either it was deleted, or a new
/// (brief or full) definition replaces the prior one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignChangeBlock {
    Delete { design_id: u8 },
    Updated(DesignBlock),
}

const DELETE_MARKER: u8 = 0xff;

impl BlockCodec for DesignChangeBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.is_empty() {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::DESIGN_CHANGE,
                reason: "design change payload is empty".into(),
            }));
        }
        if payload[0] == DELETE_MARKER {
            if payload.len() < 2 {
                return Err(CoreError::block_decode(BlockDecodeError {
                    offset: 1,
                    block_type: super::tags::DESIGN_CHANGE,
                    reason: "design delete marker missing design_id".into(),
                }));
            }
            return Ok(Self::Delete {
                design_id: payload[1],
            });
        }
        DesignBlock::decode(payload).map(Self::Updated)
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Self::Delete { design_id } => vec![DELETE_MARKER, *design_id],
            Self::Updated(design) => design.encode(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn brief() -> DesignBlock {
        DesignBlock {
            design_id: 1,
            owner_id: 2,
            is_starbase: false,
            hull_type: 9,
            name: EncodedName::new("Scout"),
            full: None,
            extra_tail: vec![],
        }
    }

    #[test]
    fn brief_design_roundtrips() {
        let design = brief();
        assert_eq!(DesignBlock::decode(&design.encode()).unwrap(), design);
    }

    #[test]
    fn full_design_roundtrips_with_control_bit_set() {
        let mut design = brief();
        design.full = Some(DesignFullData {
            armor: 500,
            turn_designed: 12,
            total_built: 7,
            total_remaining: 4,
            slots: vec![
                DesignSlot { category: 0, item_id: 10, count: 1 },
                DesignSlot { category: 300, item_id: 22, count: 4 },
            ],
        });
        let encoded = design.encode();
        assert_eq!(encoded[3] & 0b100, 0b100);
        assert_eq!(DesignBlock::decode(&encoded).unwrap(), design);
    }

    #[test]
    fn design_preserves_unknown_trailing_bytes() {
        let mut design = brief();
        design.extra_tail = vec![0xaa, 0xbb, 0xcc];
        let encoded = design.encode();
        assert_eq!(DesignBlock::decode(&encoded).unwrap(), design);
    }

    #[test]
    fn starbase_design_shares_a_design_id_with_a_ship_design_but_decodes_distinctly() {
        let ship = brief();
        let mut starbase = brief();
        starbase.is_starbase = true;
        let encoded = starbase.encode();
        assert_eq!(encoded[3] & 0b1000, 0b1000);
        let decoded = DesignBlock::decode(&encoded).unwrap();
        assert!(decoded.is_starbase);
        assert_eq!(decoded.design_id, ship.design_id);
        assert_ne!(decoded, ship);
    }

    #[test]
    fn design_change_delete_roundtrips() {
        let change = DesignChangeBlock::Delete { design_id: 5 };
        assert_eq!(DesignChangeBlock::decode(&change.encode()).unwrap(), change);
    }

    #[test]
    fn design_change_updated_roundtrips() {
        let change = DesignChangeBlock::Updated(brief());
        assert_eq!(DesignChangeBlock::decode(&change.encode()).unwrap(), change);
    }
}
