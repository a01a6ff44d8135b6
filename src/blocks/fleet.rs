//! Fleet family: one unified record for both the full and
//! partial fleet tags. Ship composition is a 16-bit "which slots are
//! present" bitmask followed by one count per set bit — 1 byte per count
//! normally, 2 bytes when the header's wide-counts flag is set (large
//! fleets can exceed 255 hulls of a single design).

use super::BlockCodec;
use crate::bitio::{extract_bits, read_u16, read_u8, write_u16, write_u8};
use crate::error::{BlockDecodeError, CoreError};
use crate::varint;

const HEADER_SIZE: usize = 14;
/// Cargo section field order: ironium, boranium, germanium, colonists, fuel.
const CARGO_FIELDS: usize = 5;

pub mod flags {
    pub const WIDE_COUNTS: u8 = 1 << 0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cargo {
    pub ironium: u32,
    pub boranium: u32,
    pub germanium: u32,
    pub colonists: u32,
    pub fuel: u32,
}

impl Cargo {
    fn decode(buf: &[u8], offset: usize) -> (Self, usize) {
        let (values, consumed) = varint::read_fields(buf, offset, CARGO_FIELDS);
        (
            Self {
                ironium: values[0],
                boranium: values[1],
                germanium: values[2],
                colonists: values[3],
                fuel: values[4],
            },
            consumed,
        )
    }

    fn encode(self) -> Vec<u8> {
        varint::write_fields(&[self.ironium, self.boranium, self.germanium, self.colonists, self.fuel])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetBlock {
    pub fleet_id: u16,
    pub owner_id: u8,
    pub x: u16,
    pub y: u16,
    pub warp_speed: u8,
    pub task: u8,
    pub wide_counts: bool,
    /// `(ship_type_index, count)` pairs, one per set bit of the on-wire
    /// bitmask, in ascending slot order.
    pub ship_counts: Vec<(u8, u16)>,
    pub cargo: Cargo,
    /// Task-specific trailing bytes this catalog entry doesn't interpret;
    /// preserved byte-for-byte on re-encode.
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for FleetBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < HEADER_SIZE {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::FLEET_FULL,
                reason: format!("fleet payload shorter than {HEADER_SIZE} bytes: {}", payload.len()),
            }));
        }
        let fleet_id = read_u16(payload, 0);
        let owner_id = read_u8(payload, 2);
        let x = read_u16(payload, 3);
        let y = read_u16(payload, 5);
        let warp_speed = read_u8(payload, 7);
        let task = read_u8(payload, 8);
        let flags_byte = read_u8(payload, 9);
        let wide_counts = extract_bits(flags_byte as u32, 0, 1) == 1;
        let ship_mask = read_u16(payload, 10);
        // bytes 12..14 reserved.

        let mut cursor = HEADER_SIZE;
        let count_width = if wide_counts { 2 } else { 1 };
        let mut ship_counts = Vec::new();
        for slot in 0..16u8 {
            if ship_mask & (1 << slot) == 0 {
                continue;
            }
            if cursor + count_width > payload.len() {
                return Err(CoreError::block_decode(BlockDecodeError {
                    offset: cursor as u64,
                    block_type: super::tags::FLEET_FULL,
                    reason: "fleet payload truncated inside ship-count array".into(),
                }));
            }
            let count = if wide_counts {
                read_u16(payload, cursor)
            } else {
                read_u8(payload, cursor) as u16
            };
            ship_counts.push((slot, count));
            cursor += count_width;
        }

        let (cargo, consumed) = Cargo::decode(payload, cursor);
        cursor += consumed;

        Ok(Self {
            fleet_id,
            owner_id,
            x,
            y,
            warp_speed,
            task,
            wide_counts,
            ship_counts,
            cargo,
            extra_tail: payload[cursor..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_SIZE];
        write_u16(&mut buf, 0, self.fleet_id);
        write_u8(&mut buf, 2, self.owner_id);
        write_u16(&mut buf, 3, self.x);
        write_u16(&mut buf, 5, self.y);
        write_u8(&mut buf, 7, self.warp_speed);
        write_u8(&mut buf, 8, self.task);
        write_u8(&mut buf, 9, if self.wide_counts { flags::WIDE_COUNTS } else { 0 });
        let mut ship_mask = 0u16;
        for (slot, _) in &self.ship_counts {
            ship_mask |= 1 << slot;
        }
        write_u16(&mut buf, 10, ship_mask);

        for (_, count) in &self.ship_counts {
            if self.wide_counts {
                buf.extend_from_slice(&count.to_le_bytes());
            } else {
                buf.push(*count as u8);
            }
        }
        buf.extend_from_slice(&self.cargo.encode());
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(wide_counts: bool) -> FleetBlock {
        FleetBlock {
            fleet_id: 901,
            owner_id: 2,
            x: 1500,
            y: 2200,
            warp_speed: 6,
            task: 3,
            wide_counts,
            ship_counts: vec![(0, 12), (4, 300), (15, 1)],
            cargo: Cargo {
                ironium: 40,
                boranium: 0,
                germanium: 10_000,
                colonists: 500,
                fuel: 250,
            },
            extra_tail: vec![9, 9, 9],
        }
    }

    #[test]
    fn narrow_counts_roundtrip() {
        let mut block = sample(false);
        block.ship_counts = vec![(0, 12), (4, 200), (15, 1)];
        let encoded = block.encode();
        assert_eq!(FleetBlock::decode(&encoded).unwrap(), block);
    }

    #[test]
    fn wide_counts_roundtrip_and_preserve_large_values() {
        let block = sample(true);
        let encoded = block.encode();
        let decoded = FleetBlock::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert!(decoded.ship_counts.iter().any(|&(_, c)| c == 300));
    }

    #[test]
    fn ship_mask_matches_set_slots_only() {
        let block = sample(true);
        let encoded = block.encode();
        let mask = read_u16(&encoded, 10);
        for slot in 0..16u8 {
            let expected = block.ship_counts.iter().any(|&(s, _)| s == slot);
            assert_eq!(mask & (1 << slot) != 0, expected);
        }
    }
}
