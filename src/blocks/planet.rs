//! Planet family: one unified record covering both the "full"
//! and "partial" tags. Which sections are present is driven by
//! `detection_level`, a 0-7 ordinal scan level, plus independent
//! presence of the owner/starbase/route/turn-number fields — a planet can
//! be owner-known without mineral detection, or vice versa, so those are
//! tracked as separate `Option`s rather than folded into the ordinal.

use super::BlockCodec;
use crate::bitio::{extract_bits, insert_bits, read_u16, read_u32, read_u8, write_u16, write_u8};
use crate::error::{BlockDecodeError, CoreError};
use crate::varint;

/// Scan-level ordinal (3 bits), per spec: 0 = not visible, 1 = pen-scan,
/// 2 = special, 3 = normal-scan, 4 = full, 7 = max. Values 5 and 6 are
/// unused by the corpus but not rejected — an unrecognized ordinal still
/// round-trips, it just never unlocks the environment section below.
pub mod detection {
    pub const NOT_VISIBLE: u8 = 0;
    pub const PEN_SCAN: u8 = 1;
    pub const SPECIAL: u8 = 2;
    pub const NORMAL_SCAN: u8 = 3;
    pub const FULL: u8 = 4;
    pub const MAX: u8 = 7;
}

/// Presence bits packed alongside the 3-bit ordinal in the planet record's
/// 16-bit flags word. Each names a section whose presence is otherwise
/// only implied by an `Option` field being `Some`/`None` on [`PlanetBlock`]
/// — the bit exists purely to drive (de)serialization, not as separate
/// state a caller reads directly.
mod flag_bits {
    pub const DETECTION_SHIFT: u32 = 0;
    pub const DETECTION_WIDTH: u32 = 3;
    pub const OWNER_KNOWN: u32 = 3;
    pub const TERRAFORMED: u32 = 4;
    pub const FULL_DATA: u32 = 5;
    pub const STARBASE_KNOWN: u32 = 6;
    pub const ROUTE_KNOWN: u32 = 7;
    pub const TURN_NUMBER_KNOWN: u32 = 8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub gravity: u8,
    pub temperature: u8,
    pub radiation: u8,
}

impl Environment {
    fn decode(buf: &[u8], offset: usize) -> Self {
        Self {
            gravity: read_u8(buf, offset),
            temperature: read_u8(buf, offset + 1),
            radiation: read_u8(buf, offset + 2),
        }
    }

    fn encode(self, buf: &mut Vec<u8>) {
        buf.push(self.gravity);
        buf.push(self.temperature);
        buf.push(self.radiation);
    }
}

/// Everything gated on `detection_level >= SPECIAL`: the game never
/// reports mineral concentrations or absolute environment values below
/// that scan quality, so the whole section is absent together (I2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSection {
    /// Leading control byte: three 2-bit subfields, one per mineral, each
    /// giving the byte length (0-3) of that mineral's fractional-
    /// concentration prefix; their sum is the total prefix length read
    /// next. The prefix bytes themselves aren't named further by the
    /// format, so they're preserved verbatim rather than interpreted.
    pub prefix_control: u8,
    pub fractional_concentration_prefix: Vec<u8>,
    pub mineral_concentrations: [u8; 3],
    pub values: Environment,
    /// Present only when the planet has been terraformed away from its
    /// natural values, and only meaningful alongside `values` above.
    pub original_values: Option<Environment>,
}

impl EnvironmentSection {
    fn prefix_len(prefix_control: u8) -> usize {
        let a = extract_bits(prefix_control as u32, 0, 2);
        let b = extract_bits(prefix_control as u32, 2, 2);
        let c = extract_bits(prefix_control as u32, 4, 2);
        (a + b + c) as usize
    }

    fn decode(buf: &[u8], offset: usize, terraformed: bool) -> Result<(Self, usize), CoreError> {
        let mut cursor = offset;
        let overrun = |cursor: usize, need: usize| {
            CoreError::block_decode(BlockDecodeError {
                offset: cursor as u64,
                block_type: super::tags::PLANET_FULL,
                reason: format!("planet environment section truncated: need {need} more bytes at offset {cursor}"),
            })
        };
        if cursor + 1 > buf.len() {
            return Err(overrun(cursor, 1));
        }
        let prefix_control = read_u8(buf, cursor);
        cursor += 1;

        let prefix_len = Self::prefix_len(prefix_control);
        if cursor + prefix_len > buf.len() {
            return Err(overrun(cursor, prefix_len));
        }
        let fractional_concentration_prefix = buf[cursor..cursor + prefix_len].to_vec();
        cursor += prefix_len;

        if cursor + 3 > buf.len() {
            return Err(overrun(cursor, 3));
        }
        let mineral_concentrations = [
            read_u8(buf, cursor),
            read_u8(buf, cursor + 1),
            read_u8(buf, cursor + 2),
        ];
        cursor += 3;

        if cursor + 3 > buf.len() {
            return Err(overrun(cursor, 3));
        }
        let values = Environment::decode(buf, cursor);
        cursor += 3;

        let original_values = if terraformed {
            if cursor + 3 > buf.len() {
                return Err(overrun(cursor, 3));
            }
            let value = Environment::decode(buf, cursor);
            cursor += 3;
            Some(value)
        } else {
            None
        };

        Ok((
            Self {
                prefix_control,
                fractional_concentration_prefix,
                mineral_concentrations,
                values,
                original_values,
            },
            cursor - offset,
        ))
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.prefix_control);
        buf.extend_from_slice(&self.fractional_concentration_prefix);
        buf.extend_from_slice(&self.mineral_concentrations);
        self.values.encode(buf);
        if let Some(original) = self.original_values {
            original.encode(buf);
        }
    }
}

/// 4 bytes in a full planet record, 1 byte in a partial one: a partial
/// scan only ever reveals the starbase's design id, so `defense_level`,
/// `has_drydock`, and `reserved` all decode as zero/false off a partial
/// record rather than being physically present on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarbaseSection {
    pub design_id: u8,
    pub defense_level: u8,
    pub has_drydock: bool,
    pub reserved: u8,
}

impl StarbaseSection {
    const FULL_SIZE: usize = 4;
    const PARTIAL_SIZE: usize = 1;

    fn size(is_full: bool) -> usize {
        if is_full { Self::FULL_SIZE } else { Self::PARTIAL_SIZE }
    }

    fn decode(buf: &[u8], offset: usize, is_full: bool) -> Self {
        if !is_full {
            return Self {
                design_id: read_u8(buf, offset),
                defense_level: 0,
                has_drydock: false,
                reserved: 0,
            };
        }
        let flags = read_u8(buf, offset + 2);
        Self {
            design_id: read_u8(buf, offset),
            defense_level: read_u8(buf, offset + 1),
            has_drydock: flags & 1 != 0,
            reserved: read_u8(buf, offset + 3),
        }
    }

    fn encode(self, buf: &mut Vec<u8>, is_full: bool) {
        buf.push(self.design_id);
        if !is_full {
            return;
        }
        buf.push(self.defense_level);
        buf.push(if self.has_drydock { 1 } else { 0 });
        buf.push(self.reserved);
    }
}

/// Surface stockpile, varint-coded per spec §4.D: ironium, boranium,
/// germanium, and population — the same four-field group fleet cargo
/// almost shares, except population stands in for fuel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceMinerals {
    pub ironium: u32,
    pub boranium: u32,
    pub germanium: u32,
    pub population: u32,
}

impl SurfaceMinerals {
    fn decode(buf: &[u8], offset: usize) -> (Self, usize) {
        let (values, consumed) = varint::read_fields(buf, offset, 4);
        (
            Self {
                ironium: values[0],
                boranium: values[1],
                germanium: values[2],
                population: values[3],
            },
            consumed,
        )
    }

    fn encode(self) -> Vec<u8> {
        varint::write_fields(&[self.ironium, self.boranium, self.germanium, self.population])
    }
}

/// The 8-byte installations block: `delta-pop:8, mines:12, factories:12,
/// defenses:12, scanner_id:5, has_artifact:1, no_research:1`, packed as
/// two little-endian 32-bit words (the first exactly fills with
/// delta-pop/mines/factories; the second holds the rest with 13 bits left
/// over, preserved in `reserved` rather than assumed zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installations {
    pub delta_population: u8,
    pub mines: u16,
    pub factories: u16,
    pub defenses: u16,
    pub scanner_id: u8,
    pub has_artifact: bool,
    pub no_research: bool,
    pub reserved: u32,
}

impl Installations {
    fn decode(buf: &[u8], offset: usize) -> Self {
        let low = read_u32(buf, offset);
        let high = read_u32(buf, offset + 4);
        Self {
            delta_population: extract_bits(low, 0, 8) as u8,
            mines: extract_bits(low, 8, 12) as u16,
            factories: extract_bits(low, 20, 12) as u16,
            defenses: extract_bits(high, 0, 12) as u16,
            scanner_id: extract_bits(high, 12, 5) as u8,
            has_artifact: extract_bits(high, 17, 1) == 1,
            no_research: extract_bits(high, 18, 1) == 1,
            reserved: extract_bits(high, 19, 13),
        }
    }

    fn encode(self, buf: &mut Vec<u8>) {
        let mut low = 0u32;
        low = insert_bits(low, 0, 8, self.delta_population as u32);
        low = insert_bits(low, 8, 12, self.mines as u32);
        low = insert_bits(low, 20, 12, self.factories as u32);
        let mut high = 0u32;
        high = insert_bits(high, 0, 12, self.defenses as u32);
        high = insert_bits(high, 12, 5, self.scanner_id as u32);
        high = insert_bits(high, 17, 1, self.has_artifact as u32);
        high = insert_bits(high, 18, 1, self.no_research as u32);
        high = insert_bits(high, 19, 13, self.reserved);
        buf.extend_from_slice(&low.to_le_bytes());
        buf.extend_from_slice(&high.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanetBlock {
    pub planet_id: u16,
    /// `true` for the `PLANET_FULL` tag, `false` for `PLANET_PARTIAL`.
    /// Drives the wire-size of [`StarbaseSection`] (4 bytes vs. 1) and
    /// whether a route target can be present at all (full only) — both
    /// independent of which optional sections this particular record
    /// happens to carry.
    pub is_full: bool,
    /// 0-7 scan-quality ordinal (see [`detection`]). Per I2, `environment`
    /// is `None` whenever this is below [`detection::SPECIAL`].
    pub detection_level: u8,
    pub environment: Option<EnvironmentSection>,
    pub owner_id: Option<u8>,
    pub surface_minerals: Option<SurfaceMinerals>,
    pub installations: Option<Installations>,
    pub starbase: Option<StarbaseSection>,
    /// Only ever `Some` when `is_full` — a partial record has no route
    /// target field on the wire at all.
    pub route_target: Option<u16>,
    pub turn_number: Option<u16>,
    /// Bytes beyond the documented fields, preserved byte-for-byte.
    pub extra_tail: Vec<u8>,
}

impl PlanetBlock {
    pub fn decode_tagged(payload: &[u8], is_full: bool) -> Result<Self, CoreError> {
        let tag = if is_full { super::tags::PLANET_FULL } else { super::tags::PLANET_PARTIAL };
        if payload.len() < 4 {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: tag,
                reason: format!("planet payload shorter than 4 bytes: {}", payload.len()),
            }));
        }
        let planet_id = read_u16(payload, 0);
        let flags = read_u16(payload, 2);
        let detection_level = extract_bits(flags as u32, flag_bits::DETECTION_SHIFT, flag_bits::DETECTION_WIDTH) as u8;
        let terraformed = extract_bits(flags as u32, flag_bits::TERRAFORMED, 1) == 1;
        let owner_known = extract_bits(flags as u32, flag_bits::OWNER_KNOWN, 1) == 1;
        let full_data = extract_bits(flags as u32, flag_bits::FULL_DATA, 1) == 1;
        let starbase_known = extract_bits(flags as u32, flag_bits::STARBASE_KNOWN, 1) == 1;
        let route_known = is_full && extract_bits(flags as u32, flag_bits::ROUTE_KNOWN, 1) == 1;
        let turn_number_known = extract_bits(flags as u32, flag_bits::TURN_NUMBER_KNOWN, 1) == 1;

        let mut cursor = 4usize;

        let overrun = |cursor: usize, need: usize| {
            CoreError::block_decode(BlockDecodeError {
                offset: cursor as u64,
                block_type: tag,
                reason: format!("planet payload truncated: need {need} more bytes at offset {cursor}"),
            })
        };

        let environment = if detection_level >= detection::SPECIAL {
            let (section, consumed) = EnvironmentSection::decode(payload, cursor, terraformed)?;
            cursor += consumed;
            Some(section)
        } else {
            None
        };

        let owner_id = if owner_known {
            if cursor + 1 > payload.len() {
                return Err(overrun(cursor, 1));
            }
            let value = read_u8(payload, cursor);
            cursor += 1;
            Some(value)
        } else {
            None
        };

        let (surface_minerals, installations) = if full_data {
            let (minerals, consumed) = SurfaceMinerals::decode(payload, cursor);
            cursor += consumed;
            if cursor + 8 > payload.len() {
                return Err(overrun(cursor, 8));
            }
            let installations = Installations::decode(payload, cursor);
            cursor += 8;
            (Some(minerals), Some(installations))
        } else {
            (None, None)
        };

        let starbase_size = StarbaseSection::size(is_full);
        let starbase = if starbase_known {
            if cursor + starbase_size > payload.len() {
                return Err(overrun(cursor, starbase_size));
            }
            let value = StarbaseSection::decode(payload, cursor, is_full);
            cursor += starbase_size;
            Some(value)
        } else {
            None
        };

        let route_target = if route_known {
            if cursor + 2 > payload.len() {
                return Err(overrun(cursor, 2));
            }
            let value = read_u16(payload, cursor);
            cursor += 2;
            Some(value)
        } else {
            None
        };

        let turn_number = if turn_number_known {
            if cursor + 2 > payload.len() {
                return Err(overrun(cursor, 2));
            }
            let value = read_u16(payload, cursor);
            cursor += 2;
            Some(value)
        } else {
            None
        };

        Ok(Self {
            planet_id,
            is_full,
            detection_level,
            environment,
            owner_id,
            surface_minerals,
            installations,
            starbase,
            route_target,
            turn_number,
            extra_tail: payload[cursor..].to_vec(),
        })
    }

    pub fn encode_tagged(&self) -> Vec<u8> {
        let mut flags = 0u16;
        flags = insert_bits16(flags, flag_bits::DETECTION_SHIFT, flag_bits::DETECTION_WIDTH, self.detection_level as u16);
        if let Some(env) = &self.environment {
            if env.original_values.is_some() {
                flags = insert_bits16(flags, flag_bits::TERRAFORMED, 1, 1);
            }
        }
        if self.owner_id.is_some() {
            flags = insert_bits16(flags, flag_bits::OWNER_KNOWN, 1, 1);
        }
        if self.surface_minerals.is_some() || self.installations.is_some() {
            flags = insert_bits16(flags, flag_bits::FULL_DATA, 1, 1);
        }
        if self.starbase.is_some() {
            flags = insert_bits16(flags, flag_bits::STARBASE_KNOWN, 1, 1);
        }
        if self.is_full && self.route_target.is_some() {
            flags = insert_bits16(flags, flag_bits::ROUTE_KNOWN, 1, 1);
        }
        if self.turn_number.is_some() {
            flags = insert_bits16(flags, flag_bits::TURN_NUMBER_KNOWN, 1, 1);
        }

        let mut buf = Vec::new();
        write_u16_push(&mut buf, self.planet_id);
        write_u16_push(&mut buf, flags);

        if let Some(env) = &self.environment {
            env.encode(&mut buf);
        }
        if let Some(owner) = self.owner_id {
            buf.push(owner);
        }
        if let Some(minerals) = self.surface_minerals {
            buf.extend_from_slice(&minerals.encode());
        }
        if let Some(installations) = self.installations {
            installations.encode(&mut buf);
        }
        if let Some(starbase) = self.starbase {
            starbase.encode(&mut buf, self.is_full);
        }
        if self.is_full {
            if let Some(route) = self.route_target {
                write_u16_push(&mut buf, route);
            }
        }
        if let Some(turn) = self.turn_number {
            write_u16_push(&mut buf, turn);
        }
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

impl BlockCodec for PlanetBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        Self::decode_tagged(payload, true)
    }

    fn encode(&self) -> Vec<u8> {
        self.encode_tagged()
    }
}

fn insert_bits16(raw: u16, shift: u32, width: u32, value: u16) -> u16 {
    crate::bitio::insert_bits16(raw, shift, width, value)
}

fn write_u16_push(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn position_only_planet_roundtrips() {
        let block = PlanetBlock {
            planet_id: 7,
            is_full: true,
            detection_level: detection::NOT_VISIBLE,
            environment: None,
            owner_id: None,
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_number: None,
            extra_tail: vec![],
        };
        let encoded = block.encode();
        assert_eq!(encoded.len(), 4);
        assert_eq!(PlanetBlock::decode(&encoded).unwrap(), block);
    }

    #[test]
    fn pen_scan_detection_carries_no_environment_per_invariant_i2() {
        // I2: detection_level < SPECIAL (2) must leave environment absent.
        let block = PlanetBlock {
            planet_id: 1,
            is_full: true,
            detection_level: detection::PEN_SCAN,
            environment: None,
            owner_id: None,
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_number: None,
            extra_tail: vec![],
        };
        let encoded = block.encode();
        let decoded = PlanetBlock::decode(&encoded).unwrap();
        assert!(decoded.environment.is_none());
        assert_eq!(decoded.detection_level, detection::PEN_SCAN);
    }

    #[test]
    fn special_detection_unlocks_environment_section() {
        let block = PlanetBlock {
            planet_id: 1,
            is_full: true,
            detection_level: detection::SPECIAL,
            environment: Some(EnvironmentSection {
                prefix_control: 0,
                fractional_concentration_prefix: vec![],
                mineral_concentrations: [10, 20, 30],
                values: Environment {
                    gravity: 50,
                    temperature: 60,
                    radiation: 70,
                },
                original_values: None,
            }),
            owner_id: None,
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_number: None,
            extra_tail: vec![],
        };
        let encoded = block.encode();
        let decoded = PlanetBlock::decode(&encoded).unwrap();
        assert_eq!(decoded.environment, block.environment);
    }

    #[test]
    fn terraformed_planet_carries_original_values_and_fractional_prefix() {
        let block = PlanetBlock {
            planet_id: 88,
            is_full: true,
            detection_level: detection::FULL,
            environment: Some(EnvironmentSection {
                prefix_control: 0b01_01_01,
                fractional_concentration_prefix: vec![1, 2, 3],
                mineral_concentrations: [10, 20, 30],
                values: Environment {
                    gravity: 50,
                    temperature: 60,
                    radiation: 70,
                },
                original_values: Some(Environment {
                    gravity: 20,
                    temperature: 30,
                    radiation: 40,
                }),
            }),
            owner_id: Some(4),
            surface_minerals: Some(SurfaceMinerals {
                ironium: 1_000,
                boranium: 0,
                germanium: 500_000,
                population: 12_345,
            }),
            installations: Some(Installations {
                delta_population: 3,
                mines: 100,
                factories: 50,
                defenses: 10,
                scanner_id: 7,
                has_artifact: true,
                no_research: false,
                reserved: 0,
            }),
            starbase: Some(StarbaseSection {
                design_id: 2,
                defense_level: 9,
                has_drydock: true,
                reserved: 0,
            }),
            route_target: Some(55),
            turn_number: Some(12),
            extra_tail: vec![9, 9],
        };
        let encoded = block.encode();
        assert_eq!(PlanetBlock::decode(&encoded).unwrap(), block);
    }

    #[test]
    fn owner_known_without_environment_omits_environment_bytes() {
        let block = PlanetBlock {
            planet_id: 3,
            is_full: true,
            detection_level: detection::NOT_VISIBLE,
            environment: None,
            owner_id: Some(1),
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_number: None,
            extra_tail: vec![],
        };
        let encoded = block.encode();
        assert_eq!(encoded.len(), 5);
        assert_eq!(PlanetBlock::decode(&encoded).unwrap(), block);
    }

    #[test]
    fn partial_record_packs_one_byte_starbase_and_never_a_route_target() {
        let block = PlanetBlock {
            planet_id: 9,
            is_full: false,
            detection_level: detection::NORMAL_SCAN,
            environment: None,
            owner_id: None,
            surface_minerals: None,
            installations: None,
            starbase: Some(StarbaseSection {
                design_id: 4,
                defense_level: 0,
                has_drydock: false,
                reserved: 0,
            }),
            route_target: None,
            turn_number: None,
            extra_tail: vec![],
        };
        let encoded = block.encode();
        assert_eq!(encoded.len(), 5, "flags(4) + 1-byte starbase");
        let decoded = PlanetBlock::decode_tagged(&encoded, false).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn full_record_packs_four_byte_starbase_and_route_target() {
        let block = PlanetBlock {
            planet_id: 9,
            is_full: true,
            detection_level: detection::NORMAL_SCAN,
            environment: None,
            owner_id: None,
            surface_minerals: None,
            installations: None,
            starbase: Some(StarbaseSection {
                design_id: 4,
                defense_level: 6,
                has_drydock: true,
                reserved: 0,
            }),
            route_target: Some(42),
            turn_number: None,
            extra_tail: vec![],
        };
        let encoded = block.encode();
        assert_eq!(encoded.len(), 4 + 4 + 2, "flags(4) + 4-byte starbase + route target");
        let decoded = PlanetBlock::decode_tagged(&encoded, true).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn surface_minerals_round_trips_population_as_fourth_field() {
        let minerals = SurfaceMinerals {
            ironium: 10,
            boranium: 0,
            germanium: 4_000,
            population: 250_000,
        };
        let encoded = minerals.encode();
        let (decoded, consumed) = SurfaceMinerals::decode(&encoded, 0);
        assert_eq!(decoded, minerals);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn installations_bitfields_round_trip_through_two_packed_words() {
        let installations = Installations {
            delta_population: 200,
            mines: 3_000,
            factories: 2_500,
            defenses: 1_800,
            scanner_id: 17,
            has_artifact: true,
            no_research: true,
            reserved: 0,
        };
        let mut buf = Vec::new();
        installations.encode(&mut buf);
        assert_eq!(buf.len(), 8);
        assert_eq!(Installations::decode(&buf, 0), installations);
    }
}
