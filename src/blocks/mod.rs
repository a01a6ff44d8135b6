//! Block catalog: a closed sum type over every known block kind, plus an
//! opaque fallback for everything else.
//!
//! Each variant separates semantic fields (what the game means) from layout
//! (how bytes are packed): [`BlockCodec::decode`] produces the former,
//! [`BlockCodec::encode`] re-derives the latter, over plain byte slices
//! since the framer has already captured each record's fixed-size payload
//! before handing it to this module.

pub mod design;
pub mod fleet;
pub mod frame;
pub mod messaging;
pub mod objects;
pub mod orders;
pub mod planet;
pub mod player;
pub mod scoreboard;
pub mod universe;

use crate::error::CoreError;
use crate::framer::BlockRecord;

/// Every block type obeys the same two-way contract: decode plain bytes
/// into a typed record, and re-encode a typed record to bytes.
pub trait BlockCodec: Sized {
    fn decode(payload: &[u8]) -> Result<Self, CoreError>;
    fn encode(&self) -> Vec<u8>;
}

/// Block-type tags (6-bit). `FILE_HEADER` is fixed at 8; the rest are
/// assigned by this implementation, since the format leaves exact tag
/// values to accompanying domain documentation rather than a single
/// canonical table. Tags 15, 18, and 22 are reserved, never given
/// semantics, and always decoded as [`BlockKind::Opaque`].
pub mod tags {
    pub const FILE_FOOTER: u8 = 0;
    pub const FILE_HASH: u8 = 1;
    pub const PLANETS: u8 = 2;
    pub const COUNTERS: u8 = 3;
    pub const PLAYER: u8 = 4;
    pub const PLAYER_SCORES: u8 = 5;
    pub const PLANET_FULL: u8 = 6;
    pub const PLANET_PARTIAL: u8 = 7;
    pub const FILE_HEADER: u8 = 8;
    pub const FLEET_FULL: u8 = 9;
    pub const FLEET_PARTIAL: u8 = 10;
    pub const DESIGN: u8 = 11;
    pub const DESIGN_CHANGE: u8 = 12;
    pub const WAYPOINT_ADD: u8 = 13;
    pub const WAYPOINT_DELETE: u8 = 14;
    pub const RESERVED_15: u8 = 15;
    pub const WAYPOINT_CHANGE_TASK: u8 = 16;
    pub const WAYPOINT_REPEAT_ORDERS: u8 = 17;
    pub const RESERVED_18: u8 = 18;
    pub const WAYPOINT_TASK_TYPE_CHANGE: u8 = 19;
    pub const WAYPOINT_FULL: u8 = 20;
    pub const WAYPOINT_BRIEF: u8 = 21;
    pub const RESERVED_22: u8 = 22;
    pub const FLEET_SPLIT: u8 = 23;
    pub const FLEET_MERGE: u8 = 24;
    pub const SHIP_TRANSFER: u8 = 25;
    pub const SET_BATTLE_PLAN: u8 = 26;
    pub const RENAME_FLEET: u8 = 27;
    pub const RESEARCH_CHANGE: u8 = 28;
    pub const PLANET_CHANGE: u8 = 29;
    pub const PASSWORD_CHANGE: u8 = 30;
    pub const PLAYERS_RELATION_CHANGE: u8 = 31;
    pub const SAVE_AND_SUBMIT: u8 = 32;
    pub const MESSAGE: u8 = 33;
    pub const MESSAGES_FILTER: u8 = 34;
    pub const BATTLE_PLAN: u8 = 35;
    pub const BATTLE: u8 = 36;
    pub const EVENTS: u8 = 37;
    pub const OBJECT_COUNT: u8 = 38;
    pub const OBJECT_RECORD: u8 = 39;

    pub const RESERVED: [u8; 3] = [RESERVED_15, RESERVED_18, RESERVED_22];
}

/// A decoded block: either one of the known kinds, or an opaque payload
/// (unknown type, reserved type, or a known type whose payload failed to
/// decode).
#[derive(Debug, Clone)]
pub enum BlockKind {
    FileHeader(crate::framer::FileHeaderFields),
    FileFooter(frame::FileFooterBlock),
    FileHash(frame::FileHashBlock),
    Planets(universe::PlanetsBlock),
    Counters(universe::CountersBlock),
    Player(player::PlayerBlock),
    PlayerScores(player::PlayerScoresBlock),
    Planet(planet::PlanetBlock),
    Fleet(fleet::FleetBlock),
    Design(design::DesignBlock),
    DesignChange(design::DesignChangeBlock),
    Waypoint(orders::WaypointBlock),
    FleetSplit(orders::FleetSplitBlock),
    FleetMerge(orders::FleetMergeBlock),
    ShipTransfer(orders::ShipTransferBlock),
    SetBattlePlan(orders::SetBattlePlanBlock),
    RenameFleet(orders::RenameFleetBlock),
    ResearchChange(orders::ResearchChangeBlock),
    PlanetChange(orders::PlanetChangeBlock),
    PasswordChange(orders::PasswordChangeBlock),
    PlayersRelationChange(orders::PlayersRelationChangeBlock),
    SaveAndSubmit(orders::SaveAndSubmitBlock),
    Message(messaging::MessageBlock),
    MessagesFilter(messaging::MessagesFilterBlock),
    BattlePlan(scoreboard::BattlePlanBlock),
    Battle(scoreboard::BattleBlock),
    Events(scoreboard::EventsBlock),
    ObjectCount(objects::ObjectCountBlock),
    Object(objects::ObjectRecordBlock),
    /// Unknown type, reserved type, or failed decode. Always round-trips
    /// byte-for-byte since it is never interpreted.
    Opaque { block_type: u8, payload: Vec<u8> },
}

/// Decodes one framed record into a typed block. Never fails: a type whose
/// payload doesn't parse downgrades to [`BlockKind::Opaque`] with the
/// reason recorded on the caller-visible [`BlockRecord::malformed`] field
/// rather than aborting the stream.
pub fn decode_block(record: &mut BlockRecord) -> BlockKind {
    let payload = &record.plain_payload;
    let decoded = match record.block_type {
        tags::FILE_HEADER => crate::framer::FileHeaderFields::decode(payload).map(BlockKind::FileHeader),
        tags::FILE_FOOTER => frame::FileFooterBlock::decode(payload).map(BlockKind::FileFooter),
        tags::FILE_HASH => frame::FileHashBlock::decode(payload).map(BlockKind::FileHash),
        tags::PLANETS => universe::PlanetsBlock::decode(payload).map(BlockKind::Planets),
        tags::COUNTERS => universe::CountersBlock::decode(payload).map(BlockKind::Counters),
        tags::PLAYER => player::PlayerBlock::decode(payload).map(BlockKind::Player),
        tags::PLAYER_SCORES => player::PlayerScoresBlock::decode(payload).map(BlockKind::PlayerScores),
        tags::PLANET_FULL => planet::PlanetBlock::decode_tagged(payload, true).map(BlockKind::Planet),
        tags::PLANET_PARTIAL => planet::PlanetBlock::decode_tagged(payload, false).map(BlockKind::Planet),
        tags::FLEET_FULL | tags::FLEET_PARTIAL => {
            fleet::FleetBlock::decode(payload).map(BlockKind::Fleet)
        }
        tags::DESIGN => design::DesignBlock::decode(payload).map(BlockKind::Design),
        tags::DESIGN_CHANGE => design::DesignChangeBlock::decode(payload).map(BlockKind::DesignChange),
        tags::WAYPOINT_ADD
        | tags::WAYPOINT_DELETE
        | tags::WAYPOINT_CHANGE_TASK
        | tags::WAYPOINT_REPEAT_ORDERS
        | tags::WAYPOINT_TASK_TYPE_CHANGE
        | tags::WAYPOINT_FULL
        | tags::WAYPOINT_BRIEF => orders::WaypointBlock::decode(payload).map(BlockKind::Waypoint),
        tags::FLEET_SPLIT => orders::FleetSplitBlock::decode(payload).map(BlockKind::FleetSplit),
        tags::FLEET_MERGE => orders::FleetMergeBlock::decode(payload).map(BlockKind::FleetMerge),
        tags::SHIP_TRANSFER => orders::ShipTransferBlock::decode(payload).map(BlockKind::ShipTransfer),
        tags::SET_BATTLE_PLAN => orders::SetBattlePlanBlock::decode(payload).map(BlockKind::SetBattlePlan),
        tags::RENAME_FLEET => orders::RenameFleetBlock::decode(payload).map(BlockKind::RenameFleet),
        tags::RESEARCH_CHANGE => orders::ResearchChangeBlock::decode(payload).map(BlockKind::ResearchChange),
        tags::PLANET_CHANGE => orders::PlanetChangeBlock::decode(payload).map(BlockKind::PlanetChange),
        tags::PASSWORD_CHANGE => orders::PasswordChangeBlock::decode(payload).map(BlockKind::PasswordChange),
        tags::PLAYERS_RELATION_CHANGE => {
            orders::PlayersRelationChangeBlock::decode(payload).map(BlockKind::PlayersRelationChange)
        }
        tags::SAVE_AND_SUBMIT => orders::SaveAndSubmitBlock::decode(payload).map(BlockKind::SaveAndSubmit),
        tags::MESSAGE => messaging::MessageBlock::decode(payload).map(BlockKind::Message),
        tags::MESSAGES_FILTER => messaging::MessagesFilterBlock::decode(payload).map(BlockKind::MessagesFilter),
        tags::BATTLE_PLAN => scoreboard::BattlePlanBlock::decode(payload).map(BlockKind::BattlePlan),
        tags::BATTLE => scoreboard::BattleBlock::decode(payload).map(BlockKind::Battle),
        tags::EVENTS => scoreboard::EventsBlock::decode(payload).map(BlockKind::Events),
        tags::OBJECT_COUNT => objects::ObjectCountBlock::decode(payload).map(BlockKind::ObjectCount),
        tags::OBJECT_RECORD => objects::ObjectRecordBlock::decode(payload).map(BlockKind::Object),
        _ => Ok(BlockKind::Opaque {
            block_type: record.block_type,
            payload: payload.clone(),
        }),
    };

    match decoded {
        Ok(block) => block,
        Err(err) => {
            record.malformed = Some(err.to_string());
            BlockKind::Opaque {
                block_type: record.block_type,
                payload: payload.clone(),
            }
        }
    }
}

/// Re-encodes a typed block to its on-disk (plain, pre-cipher) byte form.
pub fn encode_block(block: &BlockKind) -> Vec<u8> {
    match block {
        BlockKind::FileHeader(fields) => fields.encode().to_vec(),
        BlockKind::FileFooter(b) => b.encode(),
        BlockKind::FileHash(b) => b.encode(),
        BlockKind::Planets(b) => b.encode(),
        BlockKind::Counters(b) => b.encode(),
        BlockKind::Player(b) => b.encode(),
        BlockKind::PlayerScores(b) => b.encode(),
        BlockKind::Planet(b) => b.encode(),
        BlockKind::Fleet(b) => b.encode(),
        BlockKind::Design(b) => b.encode(),
        BlockKind::DesignChange(b) => b.encode(),
        BlockKind::Waypoint(b) => b.encode(),
        BlockKind::FleetSplit(b) => b.encode(),
        BlockKind::FleetMerge(b) => b.encode(),
        BlockKind::ShipTransfer(b) => b.encode(),
        BlockKind::SetBattlePlan(b) => b.encode(),
        BlockKind::RenameFleet(b) => b.encode(),
        BlockKind::ResearchChange(b) => b.encode(),
        BlockKind::PlanetChange(b) => b.encode(),
        BlockKind::PasswordChange(b) => b.encode(),
        BlockKind::PlayersRelationChange(b) => b.encode(),
        BlockKind::SaveAndSubmit(b) => b.encode(),
        BlockKind::Message(b) => b.encode(),
        BlockKind::MessagesFilter(b) => b.encode(),
        BlockKind::BattlePlan(b) => b.encode(),
        BlockKind::Battle(b) => b.encode(),
        BlockKind::Events(b) => b.encode(),
        BlockKind::ObjectCount(b) => b.encode(),
        BlockKind::Object(b) => b.encode(),
        BlockKind::Opaque { payload, .. } => payload.clone(),
    }
}
