//! Orders family: every block type a player's order-submission
//! file carries. Most are small fixed-layout commands; [`WaypointBlock`]
//! alone covers seven of the catalog's tags (add/delete/change-task/repeat/
//! task-type-change/full/brief) because the game expresses them as the same
//! wire shape with a leading discriminant byte rather than as seven
//! independent layouts — the block catalog's dispatch in `mod.rs` routes
//! all seven tags through this one decoder, so the discriminant has to live
//! inside the payload rather than be inferred from the tag.

use super::BlockCodec;
use crate::bitio::{read_u16, read_u32, read_u8, write_u16, write_u32, write_u8};
use crate::error::{BlockDecodeError, CoreError};
use crate::strcodec::EncodedName;

fn truncated(block_type: u8, what: &str) -> CoreError {
    CoreError::block_decode(BlockDecodeError {
        offset: 0,
        block_type,
        reason: format!("{what} payload truncated"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointKind {
    Add,
    Delete,
    ChangeTask,
    RepeatOrders,
    TaskTypeChange,
    Full,
    Brief,
}

impl WaypointKind {
    fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::Add,
            1 => Self::Delete,
            2 => Self::ChangeTask,
            3 => Self::RepeatOrders,
            4 => Self::TaskTypeChange,
            5 => Self::Full,
            6 => Self::Brief,
            _ => return None,
        })
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Add => 0,
            Self::Delete => 1,
            Self::ChangeTask => 2,
            Self::RepeatOrders => 3,
            Self::TaskTypeChange => 4,
            Self::Full => 5,
            Self::Brief => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaypointBlock {
    pub kind: WaypointKind,
    pub fleet_id: u16,
    pub x: u16,
    pub y: u16,
    pub task: u8,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for WaypointBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 8 {
            return Err(truncated(super::tags::WAYPOINT_ADD, "waypoint"));
        }
        let kind = WaypointKind::from_byte(payload[0]).ok_or_else(|| {
            CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::WAYPOINT_ADD,
                reason: format!("unknown waypoint discriminant {}", payload[0]),
            })
        })?;
        Ok(Self {
            kind,
            fleet_id: read_u16(payload, 1),
            x: read_u16(payload, 3),
            y: read_u16(payload, 5),
            task: read_u8(payload, 7),
            extra_tail: payload[8..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        write_u8(&mut buf, 0, self.kind.to_byte());
        write_u16(&mut buf, 1, self.fleet_id);
        write_u16(&mut buf, 3, self.x);
        write_u16(&mut buf, 5, self.y);
        write_u8(&mut buf, 7, self.task);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetSplitBlock {
    pub source_fleet_id: u16,
    pub new_fleet_id: u16,
    pub ship_counts: Vec<(u8, u16)>,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for FleetSplitBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 5 {
            return Err(truncated(super::tags::FLEET_SPLIT, "fleet split"));
        }
        let source_fleet_id = read_u16(payload, 0);
        let new_fleet_id = read_u16(payload, 2);
        let count = read_u8(payload, 4) as usize;
        let mut cursor = 5;
        let mut ship_counts = Vec::with_capacity(count);
        for _ in 0..count {
            if cursor + 3 > payload.len() {
                return Err(truncated(super::tags::FLEET_SPLIT, "fleet split ship list"));
            }
            ship_counts.push((payload[cursor], read_u16(payload, cursor + 1)));
            cursor += 3;
        }
        Ok(Self {
            source_fleet_id,
            new_fleet_id,
            ship_counts,
            extra_tail: payload[cursor..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 5];
        write_u16(&mut buf, 0, self.source_fleet_id);
        write_u16(&mut buf, 2, self.new_fleet_id);
        write_u8(&mut buf, 4, self.ship_counts.len() as u8);
        for &(slot, count) in &self.ship_counts {
            buf.push(slot);
            buf.extend_from_slice(&count.to_le_bytes());
        }
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetMergeBlock {
    pub source_fleet_id: u16,
    pub target_fleet_id: u16,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for FleetMergeBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 4 {
            return Err(truncated(super::tags::FLEET_MERGE, "fleet merge"));
        }
        Ok(Self {
            source_fleet_id: read_u16(payload, 0),
            target_fleet_id: read_u16(payload, 2),
            extra_tail: payload[4..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 4];
        write_u16(&mut buf, 0, self.source_fleet_id);
        write_u16(&mut buf, 2, self.target_fleet_id);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipTransferBlock {
    pub source_fleet_id: u16,
    pub target_fleet_id: u16,
    pub ship_slot: u8,
    pub count: u16,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for ShipTransferBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 7 {
            return Err(truncated(super::tags::SHIP_TRANSFER, "ship transfer"));
        }
        Ok(Self {
            source_fleet_id: read_u16(payload, 0),
            target_fleet_id: read_u16(payload, 2),
            ship_slot: read_u8(payload, 4),
            count: read_u16(payload, 5),
            extra_tail: payload[7..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 7];
        write_u16(&mut buf, 0, self.source_fleet_id);
        write_u16(&mut buf, 2, self.target_fleet_id);
        write_u8(&mut buf, 4, self.ship_slot);
        write_u16(&mut buf, 5, self.count);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetBattlePlanBlock {
    pub fleet_id: u16,
    pub battle_plan_id: u8,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for SetBattlePlanBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 3 {
            return Err(truncated(super::tags::SET_BATTLE_PLAN, "set battle plan"));
        }
        Ok(Self {
            fleet_id: read_u16(payload, 0),
            battle_plan_id: read_u8(payload, 2),
            extra_tail: payload[3..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 3];
        write_u16(&mut buf, 0, self.fleet_id);
        write_u8(&mut buf, 2, self.battle_plan_id);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFleetBlock {
    pub fleet_id: u16,
    pub name: EncodedName,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for RenameFleetBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 2 {
            return Err(truncated(super::tags::RENAME_FLEET, "rename fleet"));
        }
        let fleet_id = read_u16(payload, 0);
        let (name, consumed) = EncodedName::decode(payload, 2, 2)?;
        let cursor = 2 + consumed;
        Ok(Self {
            fleet_id,
            name,
            extra_tail: payload[cursor..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 2];
        write_u16(&mut buf, 0, self.fleet_id);
        buf.extend_from_slice(&self.name.encode());
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchChangeBlock {
    pub primary_field: u8,
    /// Percent of resources budgeted to each of the six research fields;
    /// expected (not enforced here) to sum to 100.
    pub field_budgets: [u8; 6],
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for ResearchChangeBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 7 {
            return Err(truncated(super::tags::RESEARCH_CHANGE, "research change"));
        }
        let mut field_budgets = [0u8; 6];
        field_budgets.copy_from_slice(&payload[1..7]);
        Ok(Self {
            primary_field: payload[0],
            field_budgets,
            extra_tail: payload[7..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 7];
        buf[0] = self.primary_field;
        buf[1..7].copy_from_slice(&self.field_budgets);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanetChangeBlock {
    pub planet_id: u16,
    pub change_kind: u8,
    pub value: u32,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for PlanetChangeBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 7 {
            return Err(truncated(super::tags::PLANET_CHANGE, "planet change"));
        }
        Ok(Self {
            planet_id: read_u16(payload, 0),
            change_kind: read_u8(payload, 2),
            value: read_u32(payload, 3),
            extra_tail: payload[7..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 7];
        write_u16(&mut buf, 0, self.planet_id);
        write_u8(&mut buf, 2, self.change_kind);
        write_u32(&mut buf, 3, self.value);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChangeBlock {
    pub new_password_hash: u32,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for PasswordChangeBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 4 {
            return Err(truncated(super::tags::PASSWORD_CHANGE, "password change"));
        }
        Ok(Self {
            new_password_hash: read_u32(payload, 0),
            extra_tail: payload[4..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = self.new_password_hash.to_le_bytes().to_vec();
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayersRelationChangeBlock {
    pub target_player_id: u8,
    pub relation: u8,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for PlayersRelationChangeBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 2 {
            return Err(truncated(
                super::tags::PLAYERS_RELATION_CHANGE,
                "players relation change",
            ));
        }
        Ok(Self {
            target_player_id: payload[0],
            relation: payload[1],
            extra_tail: payload[2..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![self.target_player_id, self.relation];
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

/// Marker block closing an order-submission file: the turn it applies to
/// and the stream-level checksum that lets the host detect tampering in
/// transit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveAndSubmitBlock {
    pub turn: u16,
    pub checksum: u16,
    pub extra_tail: Vec<u8>,
}

impl BlockCodec for SaveAndSubmitBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < 4 {
            return Err(truncated(super::tags::SAVE_AND_SUBMIT, "save and submit"));
        }
        Ok(Self {
            turn: read_u16(payload, 0),
            checksum: read_u16(payload, 2),
            extra_tail: payload[4..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 4];
        write_u16(&mut buf, 0, self.turn);
        write_u16(&mut buf, 2, self.checksum);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}
