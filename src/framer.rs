//! Block stream framing.
//!
//! Splits a byte stream into `(type, size, payload)` records using a 16-bit
//! packed header word, locates the mandatory file-header record, and drives
//! cipher initialization for every record that follows it. The "planets
//! interlude" — an unframed array trailing the universe descriptor block —
//! is folded into that one record's payload so every other component only
//! ever sees clean `(type, size, payload)` units.

use crate::bitio::{extract_bits16, read_u16, read_u32};
use crate::blocks::universe::PLANETS_BLOCK_TAG;
use crate::cipher::{self, CipherState};
use crate::error::{CoreError, FramingError, FramingReason};
use std::path::Path;

/// The file-header record's type tag.
pub const FILE_HEADER_TAG: u8 = 8;

/// File footer size of 0 or 2; any other size at this tag is not a valid
/// footer (callers decode it as an opaque block instead).
pub const FILE_FOOTER_TAG: u8 = 0;

/// One framed `(type, size, payload)` unit.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub block_type: u8,
    pub declared_size: u16,
    /// Bytes exactly as they appear on disk (still encrypted for every
    /// non-header record).
    pub raw_payload: Vec<u8>,
    /// Bytes after the cipher transform (identical to `raw_payload` for the
    /// file header, which is never encrypted).
    pub plain_payload: Vec<u8>,
    /// Byte offset of this record's header word in the stream.
    pub offset: u64,
    /// Set when decoding this record's payload into a typed block failed;
    /// the record is retained as an opaque block and the stream continues
    ///.
    pub malformed: Option<String>,
}

impl BlockRecord {
    fn read_header(bytes: &[u8], cursor: usize) -> Result<(u8, u16), CoreError> {
        if cursor + 2 > bytes.len() {
            return Err(CoreError::framing(FramingError {
                offset: cursor as u64,
                reason: FramingReason::TruncatedHeader,
            }));
        }
        let header = read_u16(bytes, cursor);
        let block_type = extract_bits16(header, 10, 6) as u8;
        let size = extract_bits16(header, 0, 10);
        Ok((block_type, size))
    }
}

/// File-type tag. Low nibble of the header's `file_type` byte;
/// bit 7 of that byte is the shareware flag consumed by the cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTypeTag {
    HostTurn,
    PlayerTurn,
    Orders,
    Race,
    History,
    UniverseShape,
    Unknown(u8),
}

impl FileTypeTag {
    fn from_low_nibble(value: u8) -> Self {
        match value & 0x0f {
            0 => Self::HostTurn,
            1 => Self::PlayerTurn,
            2 => Self::Orders,
            3 => Self::Race,
            4 => Self::History,
            5 => Self::UniverseShape,
            other => Self::Unknown(other),
        }
    }

    fn to_low_nibble(self) -> u8 {
        match self {
            Self::HostTurn => 0,
            Self::PlayerTurn => 1,
            Self::Orders => 2,
            Self::Race => 3,
            Self::History => 4,
            Self::UniverseShape => 5,
            Self::Unknown(v) => v & 0x0f,
        }
    }

    /// Is this a race-definition file? Race files carry the recomputable
    /// footer checksum.
    pub fn is_race_file(self) -> bool {
        matches!(self, Self::Race)
    }
}

/// Parses the game's filename-extension convention (`.h`, `.m`, `.x`, `.r`,
/// `.hst`, `.xy`, each optionally followed by a 1-or-2-digit player number)
/// into a file-type tag. Pure function — the authoritative `file_type` is
/// always the header field once a file is actually parsed; this is a
/// best-effort classifier for callers holding only a path.
pub fn detect_file_type(path: &Path) -> Option<FileTypeTag> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mut chars = ext.chars();
    let letter_part: String = chars.by_ref().take_while(|c| c.is_ascii_alphabetic()).collect();
    match letter_part.as_str() {
        "h" => Some(FileTypeTag::HostTurn),
        "m" => Some(FileTypeTag::PlayerTurn),
        "x" => Some(FileTypeTag::Orders),
        "r" => Some(FileTypeTag::Race),
        "hst" => Some(FileTypeTag::History),
        "xy" => Some(FileTypeTag::UniverseShape),
        _ => None,
    }
}

/// Decoded fields of the mandatory, never-encrypted file-header record
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeaderFields {
    pub magic: [u8; 4],
    pub game_id: u32,
    pub version_major: u8,
    pub version_minor: u8,
    pub version_increment: u8,
    pub turn: u16,
    pub salt: u16,
    pub player_index: u8,
    pub file_type: FileTypeTag,
    pub shareware: bool,
    pub status_flags: u8,
    pub generation: u8,
}

pub const FILE_HEADER_SIZE: usize = 16;

impl FileHeaderFields {
    /// The game year, per the glossary: `2400 + turn`.
    pub fn year(&self) -> u32 {
        2400 + self.turn as u32
    }

    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < FILE_HEADER_SIZE {
            return Err(CoreError::framing(FramingError {
                offset: 0,
                reason: FramingReason::TruncatedHeader,
            }));
        }
        let magic = [payload[0], payload[1], payload[2], payload[3]];
        let game_id = read_u32(payload, 4);
        let version = read_u16(payload, 8);
        let version_major = extract_bits16(version, 12, 4) as u8;
        let version_minor = extract_bits16(version, 6, 6) as u8;
        let version_increment = extract_bits16(version, 0, 6) as u8;
        let turn = read_u16(payload, 10);
        let player_data = read_u16(payload, 12);
        let salt = extract_bits16(player_data, 5, 11);
        let player_index = extract_bits16(player_data, 0, 5) as u8;
        let file_type_byte = payload[14];
        let file_type = FileTypeTag::from_low_nibble(file_type_byte);
        let shareware = file_type_byte & 0x80 != 0;
        let flags_gen = payload[15];
        let status_flags = extract_bits16(flags_gen as u16, 0, 5) as u8;
        let generation = extract_bits16(flags_gen as u16, 5, 3) as u8;

        Ok(Self {
            magic,
            game_id,
            version_major,
            version_minor,
            version_increment,
            turn,
            salt,
            player_index,
            file_type,
            shareware,
            status_flags,
            generation,
        })
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.game_id.to_le_bytes());
        let version = ((self.version_major as u16 & 0xf) << 12)
            | ((self.version_minor as u16 & 0x3f) << 6)
            | (self.version_increment as u16 & 0x3f);
        buf[8..10].copy_from_slice(&version.to_le_bytes());
        buf[10..12].copy_from_slice(&self.turn.to_le_bytes());
        let player_data = ((self.salt & 0x7ff) << 5) | (self.player_index as u16 & 0x1f);
        buf[12..14].copy_from_slice(&player_data.to_le_bytes());
        let file_type_byte =
            self.file_type.to_low_nibble() | if self.shareware { 0x80 } else { 0 };
        buf[14] = file_type_byte;
        buf[15] = (self.status_flags & 0x1f) | ((self.generation & 0x7) << 5);
        buf
    }
}

/// Iterates the records of one file byte stream, initializing and driving
/// cipher state off the mandatory leading file-header record.
pub struct BlockStream<'a> {
    bytes: &'a [u8],
    cursor: usize,
    cipher: Option<CipherState>,
    pub header: Option<FileHeaderFields>,
    done: bool,
}

impl<'a> BlockStream<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: 0,
            cipher: None,
            header: None,
            done: false,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    /// Reads the next planets-interlude length, if `block_type` is the
    /// universe descriptor: the unframed per-planet position array
    /// immediately follows the block's declared payload.
    fn interlude_len(block_type: u8, plain_payload: &[u8]) -> usize {
        if block_type == PLANETS_BLOCK_TAG {
            crate::blocks::universe::planet_count_from_descriptor(plain_payload) as usize * 4
        } else {
            0
        }
    }

    /// Pulls the next record, or `None` at end of stream. The first call
    /// must yield the file-header record or the stream fails with
    /// `MissingFileHeader`.
    pub fn next_record(&mut self) -> Result<Option<BlockRecord>, CoreError> {
        if self.done || self.remaining() == 0 {
            return Ok(None);
        }
        let offset = self.cursor as u64;
        let (block_type, declared_size) = BlockRecord::read_header(self.bytes, self.cursor)?;
        let header_start = self.cursor;
        let payload_start = header_start + 2;
        let declared = declared_size as usize;

        if self.header.is_none() && block_type != FILE_HEADER_TAG {
            return Err(CoreError::framing(FramingError {
                offset,
                reason: FramingReason::MissingFileHeader,
            }));
        }

        if payload_start + declared > self.bytes.len() {
            return Err(CoreError::framing(FramingError {
                offset,
                reason: FramingReason::PayloadOverrunsStream {
                    declared,
                    remaining: self.bytes.len().saturating_sub(payload_start),
                },
            }));
        }

        let mut raw_payload = self.bytes[payload_start..payload_start + declared].to_vec();

        let plain_payload = if self.header.is_none() {
            // File header bytes are never encrypted.
            let header = FileHeaderFields::decode(&raw_payload)?;
            let shareware_flag = if header.shareware {
                cipher::SHAREWARE_FLAG_ON
            } else {
                0
            };
            let state = cipher::init(
                header.salt,
                header.game_id,
                header.turn,
                header.player_index,
                shareware_flag,
            )?;
            self.cipher = Some(state);
            self.header = Some(header);
            raw_payload.clone()
        } else {
            let mut plain = raw_payload.clone();
            self.cipher
                .as_mut()
                .expect("cipher initialized once header record is seen")
                .transform(&mut plain);
            plain
        };

        let interlude_len = Self::interlude_len(block_type, &plain_payload);
        let (raw_payload, plain_payload) = if interlude_len > 0 {
            let interlude_start = payload_start + declared;
            if interlude_start + interlude_len > self.bytes.len() {
                return Err(CoreError::framing(FramingError {
                    offset,
                    reason: FramingReason::PayloadOverrunsStream {
                        declared: interlude_len,
                        remaining: self.bytes.len().saturating_sub(interlude_start),
                    },
                }));
            }
            let raw_interlude = &self.bytes[interlude_start..interlude_start + interlude_len];
            let mut plain_interlude = raw_interlude.to_vec();
            self.cipher
                .as_mut()
                .expect("planets block never precedes the header")
                .transform(&mut plain_interlude);

            let mut raw = raw_payload;
            raw.extend_from_slice(raw_interlude);
            let mut plain = plain_payload;
            plain.extend_from_slice(&plain_interlude);
            (raw, plain)
        } else {
            (raw_payload, plain_payload)
        };

        self.cursor = payload_start + declared + interlude_len;

        if block_type == FILE_FOOTER_TAG && (declared_size == 0 || declared_size == 2) {
            self.done = true;
        }

        Ok(Some(BlockRecord {
            block_type,
            declared_size,
            raw_payload,
            plain_payload,
            offset,
            malformed: None,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_header_bytes(
        game_id: u32,
        turn: u16,
        player_index: u8,
        salt: u16,
        file_type: FileTypeTag,
    ) -> Vec<u8> {
        let fields = FileHeaderFields {
            magic: *b"STAR",
            game_id,
            version_major: 2,
            version_minor: 9,
            version_increment: 3,
            turn,
            salt,
            player_index,
            file_type,
            shareware: false,
            status_flags: 0,
            generation: 0,
        };
        let header_payload = fields.encode().to_vec();
        let header_word: u16 = ((FILE_HEADER_TAG as u16) << 10) | (header_payload.len() as u16);
        let mut out = header_word.to_le_bytes().to_vec();
        out.extend_from_slice(&header_payload);
        out
    }

    #[test]
    fn missing_file_header_is_fatal() {
        let header_word: u16 = (1u16 << 10) | 0;
        let bytes = header_word.to_le_bytes().to_vec();
        let mut stream = BlockStream::new(&bytes);
        let err = stream.next_record().unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::error::CoreErrorKind::Framing(crate::error::FramingError {
                reason: FramingReason::MissingFileHeader,
                ..
            })
        ));
    }

    #[test]
    fn header_record_is_never_encrypted_and_initializes_cipher() {
        let mut bytes = sample_header_bytes(42, 7, 3, 0x241, FileTypeTag::HostTurn);
        // Footer record: type 0, size 0.
        bytes.extend_from_slice(&0u16.to_le_bytes());

        let mut stream = BlockStream::new(&bytes);
        let header_record = stream.next_record().unwrap().unwrap();
        assert_eq!(header_record.block_type, FILE_HEADER_TAG);
        assert_eq!(header_record.raw_payload, header_record.plain_payload);
        let header = stream.header.unwrap();
        assert_eq!(header.game_id, 42);
        assert_eq!(header.turn, 7);
        assert_eq!(header.year(), 2407);

        let footer = stream.next_record().unwrap().unwrap();
        assert_eq!(footer.block_type, FILE_FOOTER_TAG);
        assert!(stream.next_record().unwrap().is_none());
    }

    #[test]
    fn header_roundtrips_through_encode_decode() {
        let fields = FileHeaderFields {
            magic: *b"STAR",
            game_id: 99,
            version_major: 1,
            version_minor: 2,
            version_increment: 3,
            turn: 400,
            salt: 0x3ff,
            player_index: 17,
            file_type: FileTypeTag::Race,
            shareware: true,
            status_flags: 0b10101,
            generation: 0b101,
        };
        let encoded = fields.encode();
        let decoded = FileHeaderFields::decode(&encoded).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn detect_file_type_from_extension() {
        assert_eq!(
            detect_file_type(Path::new("Game.m1")),
            Some(FileTypeTag::PlayerTurn)
        );
        assert_eq!(
            detect_file_type(Path::new("Game.h")),
            Some(FileTypeTag::HostTurn)
        );
        assert_eq!(
            detect_file_type(Path::new("Race.r1")),
            Some(FileTypeTag::Race)
        );
        assert_eq!(
            detect_file_type(Path::new("Game.hst")),
            Some(FileTypeTag::History)
        );
    }
}
