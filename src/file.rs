//! Whole-file orchestration: wires the framer, the block catalog, and
//! integrity checksums together into `parse`/`encode` so a caller doesn't
//! have to drive [`BlockStream`] and [`decode_block`] by hand. Bytes enter
//! the framer, which emits records and drives the cipher; records are
//! handed to the catalog for typed decoding; on write the catalog
//! re-encodes, the cipher re-encrypts, and the framer re-frames, with the
//! race-file checksum recomputed unconditionally.

use crate::blocks::{self, tags, BlockCodec, BlockKind};
use crate::cipher;
use crate::error::CoreError;
use crate::framer::{
    BlockStream, FileHeaderFields, FileTypeTag, FILE_FOOTER_TAG, FILE_HEADER_TAG,
};
use crate::store::{GameStateStore, Provenance};

/// One decoded record, kept alongside the framing facts needed to
/// re-encode it faithfully.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub block_type: u8,
    pub block: BlockKind,
    /// Set if this record's payload failed to decode into its known type
    /// and was downgraded to [`BlockKind::Opaque`].
    pub malformed: Option<String>,
}

/// A fully parsed file: the decoded header plus every record that
/// followed it, in stream order.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub header: FileHeaderFields,
    pub records: Vec<ParsedRecord>,
}

/// Parses a complete file byte buffer into typed records.
pub fn parse(bytes: &[u8]) -> Result<ParsedFile, CoreError> {
    let mut stream = BlockStream::new(bytes);
    let mut records = Vec::new();
    let mut header = None;

    while let Some(mut record) = stream.next_record()? {
        if record.block_type == FILE_HEADER_TAG && header.is_none() {
            // The header record is captured separately on `ParsedFile::header`
            // rather than duplicated into `records`.
            header = stream.header;
            continue;
        }
        let block = blocks::decode_block(&mut record);
        records.push(ParsedRecord {
            block_type: record.block_type,
            block,
            malformed: record.malformed,
        });
    }

    let header = header.ok_or_else(|| {
        CoreError::framing(crate::error::FramingError {
            offset: 0,
            reason: crate::error::FramingReason::MissingFileHeader,
        })
    })?;

    Ok(ParsedFile { header, records })
}

/// Re-encodes a parsed file back to bytes: re-derives each record's plain
/// payload, re-encrypts it, re-frames it, and — for race files — silently
/// recomputes the footer checksum regardless of what was decoded. A stale
/// or mismatched checksum on the way in is simply corrected on the way out.
pub fn encode(parsed: &ParsedFile) -> Result<Vec<u8>, CoreError> {
    let header = parsed.header;
    let shareware_flag = if header.shareware {
        cipher::SHAREWARE_FLAG_ON
    } else {
        0
    };
    let mut cipher_state = cipher::init(
        header.salt,
        header.game_id,
        header.turn,
        header.player_index,
        shareware_flag,
    )?;

    let mut out = Vec::new();
    let header_payload = header.encode();
    push_record(&mut out, FILE_HEADER_TAG, &header_payload);

    let race_checksum = if header.file_type.is_race_file() {
        parsed
            .records
            .iter()
            .find_map(|record| match &record.block {
                BlockKind::Player(player) => Some(player.compute_race_checksum(&player.encode())),
                _ => None,
            })
    } else {
        None
    };

    for record in &parsed.records {
        if record.block_type == FILE_HEADER_TAG {
            continue;
        }

        if record.block_type == tags::PLANETS {
            if let BlockKind::Planets(planets) = &record.block {
                encode_planets_record(&mut out, &mut cipher_state, planets);
                continue;
            }
        }

        let block = if record.block_type == FILE_FOOTER_TAG {
            match (&record.block, race_checksum) {
                (BlockKind::FileFooter(footer), Some(checksum)) => {
                    BlockKind::FileFooter(crate::blocks::frame::FileFooterBlock {
                        checksum: Some(checksum),
                    })
                }
                _ => record.block.clone(),
            }
        } else {
            record.block.clone()
        };

        let mut plain = blocks::encode_block(&block);
        let declared_size = plain.len() as u16;
        cipher_state.transform(&mut plain);
        push_header_word(&mut out, record.block_type, declared_size);
        out.extend_from_slice(&plain);
    }

    Ok(out)
}

fn push_header_word(out: &mut Vec<u8>, block_type: u8, size: u16) {
    let word = ((block_type as u16) << 10) | (size & 0x3ff);
    out.extend_from_slice(&word.to_le_bytes());
}

fn push_record(out: &mut Vec<u8>, block_type: u8, payload: &[u8]) {
    push_header_word(out, block_type, payload.len() as u16);
    out.extend_from_slice(payload);
}

/// Re-encodes the universe descriptor and its unframed planet-position
/// interlude as two separate keystream transforms, mirroring
/// [`BlockStream::next_record`]'s decode-time split.
fn encode_planets_record(
    out: &mut Vec<u8>,
    cipher_state: &mut cipher::CipherState,
    planets: &crate::blocks::universe::PlanetsBlock,
) {
    use crate::blocks::universe::DESCRIPTOR_HEADER_SIZE;

    // `PlanetsBlock::decode` reads the position array at a fixed offset
    // right after the 50-byte header, so a non-empty `extra_tail` can never
    // round-trip through the framer's declared/interlude split regardless
    // of byte order; every block this crate produces leaves it empty.
    let encoded = planets.encode();
    let interlude_len = planets.planet_positions.len() * 4;
    let split = DESCRIPTOR_HEADER_SIZE.min(encoded.len());
    let (mut header_bytes, mut interlude_bytes) = (
        encoded[..split].to_vec(),
        encoded[split..split + interlude_len.min(encoded.len() - split)].to_vec(),
    );

    push_header_word(out, tags::PLANETS, header_bytes.len() as u16);
    cipher_state.transform(&mut header_bytes);
    out.extend_from_slice(&header_bytes);

    cipher_state.transform(&mut interlude_bytes);
    out.extend_from_slice(&interlude_bytes);
}

/// Ingests every entity-bearing record of a parsed file into `store`,
/// tagging each with this file's provenance.
pub fn ingest_into_store(parsed: &ParsedFile, store: &mut GameStateStore) {
    let provenance = Provenance {
        file_type: parsed.header.file_type,
        turn: parsed.header.turn,
        player_index: parsed.header.player_index,
    };

    for record in &parsed.records {
        match &record.block {
            BlockKind::Player(block) => store.ingest_player(block.clone(), provenance),
            BlockKind::PlayerScores(block) => store.ingest_player_scores(block.clone(), provenance),
            BlockKind::Planet(block) => store.ingest_planet(block.clone(), provenance),
            BlockKind::Fleet(block) => store.ingest_fleet(block.clone(), provenance),
            BlockKind::Design(block) => store.ingest_design(block.clone(), provenance),
            BlockKind::Waypoint(block) => store.ingest_waypoint(block.clone(), provenance),
            BlockKind::Object(block) => {
                let id = object_id(block);
                store.ingest_object(id, block.clone(), provenance);
            }
            _ => {}
        }
    }
}

fn object_id(object: &crate::blocks::objects::ObjectRecordBlock) -> u16 {
    use crate::blocks::objects::ObjectRecordBlock::*;
    match object {
        Minefield { object_id, .. }
        | PacketSalvage { object_id, .. }
        | Wormhole { object_id, .. }
        | Trader { object_id, .. } => *object_id,
    }
}

/// Convenience entry point identical to `ingest_into_store(&parse(bytes)?,
/// store)`, for callers that only want the store and don't need the
/// intermediate [`ParsedFile`].
pub fn parse_into_store(bytes: &[u8], store: &mut GameStateStore) -> Result<(), CoreError> {
    let parsed = parse(bytes)?;
    ingest_into_store(&parsed, store);
    Ok(())
}
