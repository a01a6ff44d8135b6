//! Scoreboard family: battle plans, battle reports, and the
//! per-turn event log. [`EventsBlock`] is the one sequence type in the
//! catalog: records are typed by a leading discriminant byte, and an
//! unrecognized discriminant stops parsing rather than erroring — the
//! remaining bytes are kept verbatim so a newer game version's event kinds
//! round-trip through an older implementation untouched.

use super::BlockCodec;
use crate::bitio::{read_u16, read_u8, write_u16, write_u8};
use crate::error::{BlockDecodeError, CoreError};
use crate::strcodec::EncodedName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattlePlanBlock {
    pub plan_id: u8,
    pub name: EncodedName,
    pub primary_target: u8,
    pub secondary_target: u8,
    pub tactic: u8,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for BattlePlanBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.is_empty() {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::BATTLE_PLAN,
                reason: "battle plan payload is empty".into(),
            }));
        }
        let plan_id = payload[0];
        let (name, consumed) = EncodedName::decode(payload, 1, 1)?;
        let tail_offset = 1 + consumed;
        if tail_offset + 3 > payload.len() {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: tail_offset as u64,
                block_type: super::tags::BATTLE_PLAN,
                reason: "battle plan payload truncated before targets/tactic".into(),
            }));
        }
        Ok(Self {
            plan_id,
            name,
            primary_target: payload[tail_offset],
            secondary_target: payload[tail_offset + 1],
            tactic: payload[tail_offset + 2],
            extra_tail: payload[tail_offset + 3..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![self.plan_id];
        buf.extend_from_slice(&self.name.encode());
        buf.push(self.primary_target);
        buf.push(self.secondary_target);
        buf.push(self.tactic);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleBlock {
    pub x: u16,
    pub y: u16,
    pub turn: u16,
    pub rounds: u8,
    pub participant_player_ids: Vec<u8>,
}

impl BlockCodec for BattleBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 7 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::BATTLE,
                reason: format!("battle payload shorter than 7 bytes: {}", payload.len()),
            }));
        }
        let x = read_u16(payload, 0);
        let y = read_u16(payload, 2);
        let turn = read_u16(payload, 4);
        let rounds = read_u8(payload, 6);
        Ok(Self {
            x,
            y,
            turn,
            rounds,
            participant_player_ids: payload[7..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 7];
        write_u16(&mut buf, 0, self.x);
        write_u16(&mut buf, 2, self.y);
        write_u16(&mut buf, 4, self.turn);
        write_u8(&mut buf, 6, self.rounds);
        buf.extend_from_slice(&self.participant_player_ids);
        buf
    }
}

/// One entry of the turn event log. Only a handful of kinds are given
/// semantics here; the rest of the catalog's ~20 kinds are represented
/// faithfully by [`GameEvent::Unrecognized`] wherever this implementation
/// hasn't been taught their body layout yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    PlanetDiscovered { planet_id: u16 },
    FleetDestroyed { fleet_id: u16 },
    TechLevelGained { field: u8, level: u8 },
    PlanetLost { planet_id: u16 },
    PlayerEliminated { player_id: u8 },
}

const EVENT_BODY_SIZE: usize = 4;
const EVENT_RECORD_SIZE: usize = 1 + EVENT_BODY_SIZE;

impl GameEvent {
    fn decode(discriminant: u8, body: &[u8; EVENT_BODY_SIZE]) -> Option<Self> {
        Some(match discriminant {
            0 => Self::PlanetDiscovered {
                planet_id: u16::from_le_bytes([body[0], body[1]]),
            },
            1 => Self::FleetDestroyed {
                fleet_id: u16::from_le_bytes([body[0], body[1]]),
            },
            2 => Self::TechLevelGained {
                field: body[0],
                level: body[1],
            },
            3 => Self::PlanetLost {
                planet_id: u16::from_le_bytes([body[0], body[1]]),
            },
            4 => Self::PlayerEliminated { player_id: body[0] },
            _ => return None,
        })
    }

    fn encode(self) -> (u8, [u8; EVENT_BODY_SIZE]) {
        let mut body = [0u8; EVENT_BODY_SIZE];
        let discriminant = match self {
            Self::PlanetDiscovered { planet_id } => {
                body[0..2].copy_from_slice(&planet_id.to_le_bytes());
                0
            }
            Self::FleetDestroyed { fleet_id } => {
                body[0..2].copy_from_slice(&fleet_id.to_le_bytes());
                1
            }
            Self::TechLevelGained { field, level } => {
                body[0] = field;
                body[1] = level;
                2
            }
            Self::PlanetLost { planet_id } => {
                body[0..2].copy_from_slice(&planet_id.to_le_bytes());
                3
            }
            Self::PlayerEliminated { player_id } => {
                body[0] = player_id;
                4
            }
        };
        (discriminant, body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventsBlock {
    pub events: Vec<GameEvent>,
    /// Bytes left over once an unrecognized discriminant is hit, or a
    /// dangling partial record at the end. Preserved verbatim.
    pub unparsed_tail: Vec<u8>,
}

impl BlockCodec for EventsBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let mut events = Vec::new();
        let mut cursor = 0;
        while cursor + EVENT_RECORD_SIZE <= payload.len() {
            let discriminant = payload[cursor];
            let mut body = [0u8; EVENT_BODY_SIZE];
            body.copy_from_slice(&payload[cursor + 1..cursor + EVENT_RECORD_SIZE]);
            match GameEvent::decode(discriminant, &body) {
                Some(event) => {
                    events.push(event);
                    cursor += EVENT_RECORD_SIZE;
                }
                None => break,
            }
        }
        Ok(Self {
            events,
            unparsed_tail: payload[cursor..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.events.len() * EVENT_RECORD_SIZE + self.unparsed_tail.len());
        for event in &self.events {
            let (discriminant, body) = event.encode();
            buf.push(discriminant);
            buf.extend_from_slice(&body);
        }
        buf.extend_from_slice(&self.unparsed_tail);
        buf
    }
}
