//! Player family: the per-player record and the scoreboard
//! summary. The player record's "full data" section is conditional on a
//! flag bit in its 8-byte prefix — present when the game host is writing a
//! host turn file for that player's own perspective, absent when another
//! player merely observes them.

use super::BlockCodec;
use crate::bitio::{extract_bits, read_u16, read_u32, read_u8, write_u16, write_u32, write_u8};
use crate::error::{BlockDecodeError, CoreError};
use crate::race::HabitabilityRange;
use crate::strcodec::EncodedName;

const PREFIX_SIZE: usize = 8;
const FULL_DATA_SIZE: usize = 103;

/// `player_id:u8, race_id:u8, status:u8, detail_flags:u8, home_planet:u16,
/// ai_flags:u8, full_data_flag_byte:u8` — bit 2 of the last byte gates the
/// presence of [`PlayerFullData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerBlock {
    pub player_id: u8,
    pub race_id: u8,
    pub status: u8,
    pub detail_flags: u8,
    pub home_planet: u16,
    pub ai_flags: u8,
    pub full_data: Option<PlayerFullData>,
    pub relations: Vec<u8>,
    /// Singular and plural forms of this player's race name — the pair of
    /// length-prefixed encoded names at the tail of the block, and the
    /// exact inputs the race-file checksum folds in.
    pub race_name_singular: EncodedName,
    pub race_name_plural: EncodedName,
    /// Bytes beyond the documented fields, preserved byte-for-byte.
    pub extra_tail: Vec<u8>,
}

impl PlayerBlock {
    /// Zeroes out this player's stored password hash, for a recovered-
    /// password or "just reset it" flow. A no-op when the record has no
    /// full-data section (an observer's view of another player never
    /// carries a password in the first place).
    pub fn clear_password(&mut self) {
        if let Some(full) = &mut self.full_data {
            full.password_hash = 0;
        }
    }

    /// Length of the prefix window the race checksum reads from this
    /// block's decrypted payload: 8 bytes brief, else 112 bytes plus the
    /// 1-byte relations count and the relations array itself.
    pub fn checksum_prefix_len(&self) -> usize {
        if self.full_data.is_some() {
            112 + 1 + self.relations.len()
        } else {
            8
        }
    }

    /// Recomputes the race-file footer checksum for this player's record
    /// against `decoded_payload` — the block's own decrypted payload, as
    /// produced by [`BlockCodec::encode`] before re-encryption. Recomputed
    /// unconditionally on any race-file write.
    pub fn compute_race_checksum(&self, decoded_payload: &[u8]) -> u16 {
        crate::integrity::compute_race_checksum(
            decoded_payload,
            self.race_name_singular.value(),
            self.race_name_plural.value(),
            self.full_data.is_some(),
            self.relations.len(),
        )
    }

    /// Reads this player's race definition out of the full-data section and
    /// the race names carried on the block itself. `None` when this record
    /// has no full-data section (an observer's view carries no race to
    /// recover).
    pub fn race_definition(&self) -> Option<Result<crate::race::RaceDefinition, CoreError>> {
        self.full_data.as_ref().map(|full| {
            crate::race::race_from_player_full_data(
                full,
                self.race_name_singular.clone(),
                self.race_name_plural.clone(),
            )
        })
    }

    /// Writes `def` back into this player's full-data section, leaving
    /// every other wire field (research progress, password, production
    /// queue, …) untouched. A no-op when there is no full-data section to
    /// write into.
    pub fn apply_race_definition(&mut self, def: &crate::race::RaceDefinition) {
        self.race_name_singular = def.singular_name.clone();
        self.race_name_plural = def.plural_name.clone();
        if let Some(full) = &mut self.full_data {
            crate::race::apply_race_to_player_full_data(def, full);
        }
    }
}

/// Center/low/high habitability triple as the wire actually stores it,
/// rather than [`HabitabilityRange`]'s min/max/immune shape: `low == 255 ||
/// high == 255` denotes immunity, the same sentinel the format uses for
/// gravity, temperature, and radiation alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitabilityBytes {
    pub center: u8,
    pub low: u8,
    pub high: u8,
}

const IMMUNE_SENTINEL: u8 = 255;

impl HabitabilityBytes {
    fn decode(buf: &[u8], offset: usize) -> Self {
        Self {
            center: read_u8(buf, offset),
            low: read_u8(buf, offset + 1),
            high: read_u8(buf, offset + 2),
        }
    }

    fn encode(self, buf: &mut Vec<u8>) {
        buf.push(self.center);
        buf.push(self.low);
        buf.push(self.high);
    }

    pub fn to_range(self) -> HabitabilityRange {
        if self.low == IMMUNE_SENTINEL || self.high == IMMUNE_SENTINEL {
            HabitabilityRange {
                min: 0,
                max: 100,
                immune: true,
            }
        } else {
            HabitabilityRange {
                min: self.low,
                max: self.high,
                immune: false,
            }
        }
    }

    pub fn from_range(range: HabitabilityRange) -> Self {
        if range.immune {
            Self {
                center: 50,
                low: IMMUNE_SENTINEL,
                high: IMMUNE_SENTINEL,
            }
        } else {
            Self {
                center: range.min / 2 + range.max / 2,
                low: range.min,
                high: range.max,
            }
        }
    }
}

/// Section present only when the file is this player's own view of
/// themselves: research progress, resource totals, and the player's race
/// definition as it sits on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerFullData {
    pub research_levels: [u16; 6],
    pub research_spent: [u32; 6],
    pub research_resources: u32,
    /// Field index (0-5), packed into the low nibble of the one wire byte
    /// it shares with [`Self::research_budget_percent`].
    pub current_research_field: u8,
    /// Budget, 0-100 in steps of 10 — the high nibble of that shared byte
    /// only has room for a decile (0-10), so this is stored on the wire as
    /// `percent / 10` and multiplied back out on decode.
    pub research_budget_percent: u8,
    pub leftover_resources: u32,
    pub password_hash: u32,
    pub homeworld_id: u8,
    pub rank: u8,
    pub gravity: HabitabilityBytes,
    pub temperature: HabitabilityBytes,
    pub radiation: HabitabilityBytes,
    pub growth_rate: u8,
    pub colonist_resource_factor: u8,
    /// Remaining production-settings byte the corpus doesn't further name;
    /// preserved verbatim rather than interpreted.
    pub production_flags: u8,
    /// Per-field research cost modifier, percent of baseline (100 = no
    /// modifier), in field order matching [`Self::research_levels`].
    pub research_cost_modifiers: [u8; 6],
    pub primary_trait_index: u8,
    pub lesser_traits_mask: u16,
    /// Two flag bytes, including secondary-race modifiers; the corpus
    /// doesn't name individual bits, so they round-trip opaquely.
    pub flags: [u8; 2],
    pub player_state_flags: u16,
    pub zip_production_queue: [u8; 26],
    pub reserved: u8,
}

impl PlayerFullData {
    /// An all-zero full-data section, useful as a base for callers building
    /// one up field-by-field (e.g. before calling
    /// [`crate::race::apply_race_to_player_full_data`]).
    pub fn zeroed() -> Self {
        Self {
            research_levels: [0; 6],
            research_spent: [0; 6],
            research_resources: 0,
            current_research_field: 0,
            research_budget_percent: 0,
            leftover_resources: 0,
            password_hash: 0,
            homeworld_id: 0,
            rank: 0,
            gravity: HabitabilityBytes { center: 0, low: 0, high: 0 },
            temperature: HabitabilityBytes { center: 0, low: 0, high: 0 },
            radiation: HabitabilityBytes { center: 0, low: 0, high: 0 },
            growth_rate: 0,
            colonist_resource_factor: 0,
            production_flags: 0,
            research_cost_modifiers: [0; 6],
            primary_trait_index: 0,
            lesser_traits_mask: 0,
            flags: [0; 2],
            player_state_flags: 0,
            zip_production_queue: [0; 26],
            reserved: 0,
        }
    }

    fn decode(buf: &[u8]) -> Result<Self, CoreError> {
        if buf.len() < FULL_DATA_SIZE {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::PLAYER,
                reason: format!(
                    "player full-data section shorter than {FULL_DATA_SIZE} bytes: {}",
                    buf.len()
                ),
            }));
        }
        let mut research_levels = [0u16; 6];
        for (i, slot) in research_levels.iter_mut().enumerate() {
            *slot = read_u16(buf, i * 2);
        }
        let mut research_spent = [0u32; 6];
        for (i, slot) in research_spent.iter_mut().enumerate() {
            *slot = read_u32(buf, 12 + i * 4);
        }
        let research_resources = read_u32(buf, 36);
        let research_split_byte = read_u8(buf, 40);
        let current_research_field = research_split_byte & 0x0f;
        let research_budget_percent = ((research_split_byte >> 4) & 0x0f) * 10;
        let leftover_resources = read_u32(buf, 41);
        let password_hash = read_u32(buf, 45);
        let homeworld_id = read_u8(buf, 49);
        let rank = read_u8(buf, 50);
        let gravity = HabitabilityBytes::decode(buf, 51);
        let temperature = HabitabilityBytes::decode(buf, 54);
        let radiation = HabitabilityBytes::decode(buf, 57);
        let growth_rate = read_u8(buf, 60);
        let colonist_resource_factor = read_u8(buf, 61);
        let production_flags = read_u8(buf, 62);
        let mut research_cost_modifiers = [0u8; 6];
        for (i, slot) in research_cost_modifiers.iter_mut().enumerate() {
            *slot = read_u8(buf, 63 + i);
        }
        let primary_trait_index = read_u8(buf, 69);
        let lesser_traits_mask = read_u16(buf, 70);
        let flags = [read_u8(buf, 72), read_u8(buf, 73)];
        let player_state_flags = read_u16(buf, 74);
        let mut zip_production_queue = [0u8; 26];
        zip_production_queue.copy_from_slice(&buf[76..102]);
        let reserved = read_u8(buf, 102);

        Ok(Self {
            research_levels,
            research_spent,
            research_resources,
            current_research_field,
            research_budget_percent,
            leftover_resources,
            password_hash,
            homeworld_id,
            rank,
            gravity,
            temperature,
            radiation,
            growth_rate,
            colonist_resource_factor,
            production_flags,
            research_cost_modifiers,
            primary_trait_index,
            lesser_traits_mask,
            flags,
            player_state_flags,
            zip_production_queue,
            reserved,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; FULL_DATA_SIZE];
        for (i, value) in self.research_levels.iter().enumerate() {
            write_u16(&mut buf, i * 2, *value);
        }
        for (i, value) in self.research_spent.iter().enumerate() {
            write_u32(&mut buf, 12 + i * 4, *value);
        }
        write_u32(&mut buf, 36, self.research_resources);
        let research_split_byte = (self.current_research_field & 0x0f) | (((self.research_budget_percent / 10) & 0x0f) << 4);
        write_u8(&mut buf, 40, research_split_byte);
        write_u32(&mut buf, 41, self.leftover_resources);
        write_u32(&mut buf, 45, self.password_hash);
        write_u8(&mut buf, 49, self.homeworld_id);
        write_u8(&mut buf, 50, self.rank);
        let mut section = Vec::with_capacity(9);
        self.gravity.encode(&mut section);
        self.temperature.encode(&mut section);
        self.radiation.encode(&mut section);
        buf[51..60].copy_from_slice(&section);
        write_u8(&mut buf, 60, self.growth_rate);
        write_u8(&mut buf, 61, self.colonist_resource_factor);
        write_u8(&mut buf, 62, self.production_flags);
        for (i, value) in self.research_cost_modifiers.iter().enumerate() {
            write_u8(&mut buf, 63 + i, *value);
        }
        write_u8(&mut buf, 69, self.primary_trait_index);
        write_u16(&mut buf, 70, self.lesser_traits_mask);
        write_u8(&mut buf, 72, self.flags[0]);
        write_u8(&mut buf, 73, self.flags[1]);
        write_u16(&mut buf, 74, self.player_state_flags);
        buf[76..102].copy_from_slice(&self.zip_production_queue);
        write_u8(&mut buf, 102, self.reserved);
        buf
    }

    /// Hex rendering of the stored password hash, for diagnostics and
    /// support-ticket dumps where the raw integer is harder to eyeball.
    pub fn password_hash_hex(&self) -> String {
        hex::encode(self.password_hash.to_be_bytes())
    }
}

impl BlockCodec for PlayerBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < PREFIX_SIZE {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::PLAYER,
                reason: format!("player payload shorter than {PREFIX_SIZE} bytes: {}", payload.len()),
            }));
        }
        let player_id = read_u8(payload, 0);
        let race_id = read_u8(payload, 1);
        let status = read_u8(payload, 2);
        let detail_flags = read_u8(payload, 3);
        let home_planet = read_u16(payload, 4);
        let ai_flags = read_u8(payload, 6);
        let flag_byte = read_u8(payload, 7);
        let has_full_data = extract_bits(flag_byte as u32, 2, 1) == 1;

        let mut cursor = PREFIX_SIZE;
        let full_data = if has_full_data {
            let section = PlayerFullData::decode(&payload[cursor..])?;
            cursor += FULL_DATA_SIZE;
            Some(section)
        } else {
            None
        };

        if cursor + 1 > payload.len() {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: cursor as u64,
                block_type: super::tags::PLAYER,
                reason: "player payload truncated before relations count".into(),
            }));
        }
        let relation_count = read_u8(payload, cursor) as usize;
        cursor += 1;
        if cursor + relation_count > payload.len() {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: cursor as u64,
                block_type: super::tags::PLAYER,
                reason: "player payload truncated inside relations array".into(),
            }));
        }
        let relations = payload[cursor..cursor + relation_count].to_vec();
        cursor += relation_count;

        let (race_name_singular, consumed) = EncodedName::decode(payload, cursor as u64, cursor)?;
        cursor += consumed;
        let (race_name_plural, consumed) = EncodedName::decode(payload, cursor as u64, cursor)?;
        cursor += consumed;

        Ok(Self {
            player_id,
            race_id,
            status,
            detail_flags,
            home_planet,
            ai_flags,
            full_data,
            relations,
            race_name_singular,
            race_name_plural,
            extra_tail: payload[cursor..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; PREFIX_SIZE];
        write_u8(&mut buf, 0, self.player_id);
        write_u8(&mut buf, 1, self.race_id);
        write_u8(&mut buf, 2, self.status);
        write_u8(&mut buf, 3, self.detail_flags);
        write_u16(&mut buf, 4, self.home_planet);
        write_u8(&mut buf, 6, self.ai_flags);
        let flag_byte = if self.full_data.is_some() { 0b100 } else { 0 };
        write_u8(&mut buf, 7, flag_byte);

        if let Some(full) = &self.full_data {
            buf.extend_from_slice(&full.encode());
        }
        buf.push(self.relations.len() as u8);
        buf.extend_from_slice(&self.relations);
        buf.extend_from_slice(&self.race_name_singular.encode());
        buf.extend_from_slice(&self.race_name_plural.encode());
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

/// Per-player scoreboard entry: the tallies the scoreboard
/// block reports for one player each turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerScoresBlock {
    pub player_id: u8,
    pub planets: u16,
    pub starbases: u16,
    pub unarmed_ships: u16,
    pub escort_ships: u16,
    pub capital_ships: u16,
    pub tech_levels: u16,
    pub resources: u32,
    pub score: u32,
    /// Bytes beyond the documented fields, preserved byte-for-byte.
    pub extra_tail: Vec<u8>,
}

const PLAYER_SCORES_SIZE: usize = 1 + 2 * 6 + 4 + 4;

impl BlockCodec for PlayerScoresBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < PLAYER_SCORES_SIZE {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::PLAYER_SCORES,
                reason: format!(
                    "player scores payload shorter than {PLAYER_SCORES_SIZE} bytes: {}",
                    payload.len()
                ),
            }));
        }
        Ok(Self {
            player_id: read_u8(payload, 0),
            planets: read_u16(payload, 1),
            starbases: read_u16(payload, 3),
            unarmed_ships: read_u16(payload, 5),
            escort_ships: read_u16(payload, 7),
            capital_ships: read_u16(payload, 9),
            tech_levels: read_u16(payload, 11),
            resources: read_u32(payload, 13),
            score: read_u32(payload, 17),
            extra_tail: payload[PLAYER_SCORES_SIZE..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; PLAYER_SCORES_SIZE];
        write_u8(&mut buf, 0, self.player_id);
        write_u16(&mut buf, 1, self.planets);
        write_u16(&mut buf, 3, self.starbases);
        write_u16(&mut buf, 5, self.unarmed_ships);
        write_u16(&mut buf, 7, self.escort_ships);
        write_u16(&mut buf, 9, self.capital_ships);
        write_u16(&mut buf, 11, self.tech_levels);
        write_u32(&mut buf, 13, self.resources);
        write_u32(&mut buf, 17, self.score);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn brief_sample() -> PlayerBlock {
        PlayerBlock {
            player_id: 3,
            race_id: 7,
            status: 1,
            detail_flags: 0,
            home_planet: 42,
            ai_flags: 0,
            full_data: None,
            relations: vec![0, 1, 2, 1],
            race_name_singular: EncodedName::new("Antaran"),
            race_name_plural: EncodedName::new("Antarans"),
            extra_tail: vec![],
        }
    }

    fn full_sample() -> PlayerFullData {
        PlayerFullData {
            research_levels: [1, 2, 3, 4, 5, 6],
            research_spent: [10, 20, 30, 40, 50, 60],
            research_resources: 1000,
            current_research_field: 2,
            research_budget_percent: 20,
            leftover_resources: 250,
            password_hash: 0xdead_beef,
            homeworld_id: 5,
            rank: 1,
            gravity: HabitabilityBytes { center: 50, low: 30, high: 70 },
            temperature: HabitabilityBytes { center: 50, low: 30, high: 70 },
            radiation: HabitabilityBytes { center: 50, low: 30, high: 70 },
            growth_rate: 15,
            colonist_resource_factor: 10,
            production_flags: 0,
            research_cost_modifiers: [100; 6],
            primary_trait_index: 9,
            lesser_traits_mask: 0b11,
            flags: [0, 0],
            player_state_flags: 0,
            zip_production_queue: [0; 26],
            reserved: 0,
        }
    }

    #[test]
    fn brief_player_roundtrips() {
        let block = brief_sample();
        let encoded = block.encode();
        let decoded = PlayerBlock::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn full_player_roundtrips_and_flag_is_set() {
        let mut block = brief_sample();
        block.full_data = Some(full_sample());
        let encoded = block.encode();
        assert_eq!(encoded[7] & 0b100, 0b100);
        let decoded = PlayerBlock::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn full_data_decodes_primary_race_trait_nine_for_joat_scenario() {
        let mut block = brief_sample();
        let mut full = full_sample();
        full.primary_trait_index = 9;
        block.full_data = Some(full);
        let encoded = block.encode();
        let decoded = PlayerBlock::decode(&encoded).unwrap();
        assert_eq!(decoded.full_data.unwrap().primary_trait_index, 9);
    }

    #[test]
    fn race_definition_roundtrips_through_player_block() {
        let mut block = brief_sample();
        block.full_data = Some(full_sample());
        let def = block.race_definition().unwrap().unwrap();
        assert_eq!(def.primary_trait, crate::race::PrimaryTrait::JackOfAllTrades);

        let mut modified = def.clone();
        modified.growth_rate = 19;
        block.apply_race_definition(&modified);
        let recovered = block.race_definition().unwrap().unwrap();
        assert_eq!(recovered.growth_rate, 19);
    }

    #[test]
    fn race_definition_is_none_without_full_data() {
        let block = brief_sample();
        assert!(block.race_definition().is_none());
    }

    #[test]
    fn clear_password_zeroes_hash_when_full_data_present() {
        let mut block = brief_sample();
        block.full_data = Some(full_sample());
        block.clear_password();
        assert_eq!(block.full_data.unwrap().password_hash, 0);
    }

    #[test]
    fn clear_password_is_a_no_op_without_full_data() {
        let mut block = brief_sample();
        block.clear_password();
        assert!(block.full_data.is_none());
    }

    #[test]
    fn password_hash_hex_renders_big_endian_bytes() {
        let mut full = brief_sample();
        let mut data = full_sample();
        data.password_hash = 0x0102_abcd;
        full.full_data = Some(data);
        assert_eq!(
            full.full_data.as_ref().unwrap().password_hash_hex(),
            "0102abcd"
        );
    }

    #[test]
    fn compute_race_checksum_uses_singular_and_plural_names_and_full_data_flag() {
        let brief = brief_sample();
        let brief_checksum = brief.compute_race_checksum(&brief.encode());

        let mut full = brief_sample();
        let mut data = full_sample();
        data.password_hash = 0;
        full.full_data = Some(data);
        let full_checksum = full.compute_race_checksum(&full.encode());
        assert_ne!(brief_checksum, full_checksum);

        let mut renamed = brief_sample();
        renamed.race_name_plural.set("Somethingelse");
        assert_ne!(
            renamed.compute_race_checksum(&renamed.encode()),
            brief_checksum
        );
    }

    #[test]
    fn player_scores_roundtrip() {
        let scores = PlayerScoresBlock {
            player_id: 2,
            planets: 14,
            starbases: 3,
            unarmed_ships: 40,
            escort_ships: 9,
            capital_ships: 5,
            tech_levels: 60,
            resources: 12_345,
            score: 98_765,
            extra_tail: vec![],
        };
        assert_eq!(PlayerScoresBlock::decode(&scores.encode()).unwrap(), scores);
    }

    #[test]
    fn habitability_bytes_immune_sentinel_roundtrips_through_range() {
        let immune = HabitabilityBytes { center: 50, low: 255, high: 255 };
        let range = immune.to_range();
        assert!(range.immune);
        let back = HabitabilityBytes::from_range(range);
        assert_eq!(back.low, 255);
        assert_eq!(back.high, 255);
    }
}
