//! Universe family: the universe descriptor block (plus its unframed
//! planet-position interlude) and the running planet/fleet counters block.

use super::BlockCodec;
use crate::bitio::{extract_bits, insert_bits, read_u16, read_u32, read_u8, write_u16, write_u8};
use crate::error::{BlockDecodeError, CoreError};

pub const PLANETS_BLOCK_TAG: u8 = super::tags::PLANETS;

/// Fixed header length of the universe descriptor, not counting the
/// unframed planet-position array that follows it in the byte stream.
pub const DESCRIPTOR_HEADER_SIZE: usize = 50;

/// Reads just the planet count out of an undecoded (but already plain)
/// descriptor payload. Used by the framer to size the interlude before the
/// rest of this module ever sees the record — so it must tolerate a
/// payload that is only the fixed header (no interlude bytes yet).
pub fn planet_count_from_descriptor(payload: &[u8]) -> u16 {
    if payload.len() < 6 {
        return 0;
    }
    read_u16(payload, 4)
}

/// One entry of the unframed planet-position array: `name_id:10 | y:12 |
/// x_offset:10` packed into a little-endian 32-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanetPosition {
    pub name_id: u16,
    pub y: u16,
    pub x_offset: u16,
}

impl PlanetPosition {
    fn decode(word: u32) -> Self {
        Self {
            name_id: extract_bits(word, 0, 10) as u16,
            y: extract_bits(word, 10, 12) as u16,
            x_offset: extract_bits(word, 22, 10) as u16,
        }
    }

    fn encode(self) -> u32 {
        let mut word = 0u32;
        word = insert_bits(word, 0, 10, self.name_id as u32);
        word = insert_bits(word, 10, 12, self.y as u32);
        word = insert_bits(word, 22, 10, self.x_offset as u32);
        word
    }
}

/// Universe descriptor: size, density, player/planet counts, the
/// victory-conditions block, the game name, and the per-planet position
/// array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanetsBlock {
    pub universe_size: u16,
    pub density: u8,
    pub player_count: u8,
    pub victory_conditions: [u8; 12],
    pub game_name: [u8; 32],
    pub planet_positions: Vec<PlanetPosition>,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for PlanetsBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < DESCRIPTOR_HEADER_SIZE {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: PLANETS_BLOCK_TAG,
                reason: format!(
                    "planets descriptor shorter than {DESCRIPTOR_HEADER_SIZE} bytes: {}",
                    payload.len()
                ),
            }));
        }
        let universe_size = read_u16(payload, 0);
        let density = read_u8(payload, 2);
        let player_count = read_u8(payload, 3);
        let planet_count = read_u16(payload, 4) as usize;
        let mut victory_conditions = [0u8; 12];
        victory_conditions.copy_from_slice(&payload[6..18]);
        let mut game_name = [0u8; 32];
        game_name.copy_from_slice(&payload[18..50]);

        let needed = DESCRIPTOR_HEADER_SIZE + planet_count * 4;
        if payload.len() < needed {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: PLANETS_BLOCK_TAG,
                reason: format!(
                    "planets descriptor declares {planet_count} planets but only has {} interlude bytes",
                    payload.len() - DESCRIPTOR_HEADER_SIZE
                ),
            }));
        }

        let mut planet_positions = Vec::with_capacity(planet_count);
        for i in 0..planet_count {
            let offset = DESCRIPTOR_HEADER_SIZE + i * 4;
            let word = read_u32(payload, offset);
            planet_positions.push(PlanetPosition::decode(word));
        }

        Ok(Self {
            universe_size,
            density,
            player_count,
            victory_conditions,
            game_name,
            planet_positions,
            extra_tail: payload[needed..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; DESCRIPTOR_HEADER_SIZE];
        write_u16(&mut buf, 0, self.universe_size);
        write_u8(&mut buf, 2, self.density);
        write_u8(&mut buf, 3, self.player_count);
        write_u16(&mut buf, 4, self.planet_positions.len() as u16);
        buf[6..18].copy_from_slice(&self.victory_conditions);
        buf[18..50].copy_from_slice(&self.game_name);
        for position in &self.planet_positions {
            buf.extend_from_slice(&position.encode().to_le_bytes());
        }
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

/// Running totals of planets and fleets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersBlock {
    pub planet_count: u16,
    pub fleet_count: u16,
}

impl BlockCodec for CountersBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 4 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::COUNTERS,
                reason: format!("counters payload shorter than 4 bytes: {}", payload.len()),
            }));
        }
        Ok(Self {
            planet_count: read_u16(payload, 0),
            fleet_count: read_u16(payload, 2),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = [0u8; 4];
        write_u16(&mut buf, 0, self.planet_count);
        write_u16(&mut buf, 2, self.fleet_count);
        buf.to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> PlanetsBlock {
        PlanetsBlock {
            universe_size: 400,
            density: 2,
            player_count: 8,
            victory_conditions: [7; 12],
            game_name: {
                let mut name = [0u8; 32];
                name[..4].copy_from_slice(b"Test");
                name
            },
            planet_positions: vec![
                PlanetPosition {
                    name_id: 12,
                    y: 300,
                    x_offset: 500,
                },
                PlanetPosition {
                    name_id: 900,
                    y: 4000,
                    x_offset: 10,
                },
            ],
            extra_tail: vec![],
        }
    }

    #[test]
    fn planets_block_roundtrips() {
        let block = sample();
        let encoded = block.encode();
        let decoded = PlanetsBlock::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn planet_count_from_descriptor_matches_field() {
        let block = sample();
        let encoded = block.encode();
        assert_eq!(planet_count_from_descriptor(&encoded), 2);
    }

    #[test]
    fn planet_position_bitfields_respect_widths() {
        let position = PlanetPosition {
            name_id: 1023,
            y: 4095,
            x_offset: 1023,
        };
        let word = position.encode();
        assert_eq!(PlanetPosition::decode(word), position);
    }

    #[test]
    fn counters_roundtrip() {
        let counters = CountersBlock {
            planet_count: 256,
            fleet_count: 64,
        };
        assert_eq!(CountersBlock::decode(&counters.encode()).unwrap(), counters);
    }
}
