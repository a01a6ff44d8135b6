//! Integrity checksums.
//!
//! Two unrelated checksums share this module because both are simple
//! XOR-based digests over a small byte window, even though they protect
//! different things: the race-file footer checksum guards a race
//! definition against corruption/tampering and this crate can recompute it
//! exactly; the generic stream-level footer (used by turn and order files)
//! is preserved byte-for-byte and never recomputed — no public algorithm
//! for it is documented anywhere, so guessing one risks writing a
//! plausible-looking but wrong value into files this crate round-trips.

use crate::error::{CoreError, IntegrityError};

const NAME_PAD_LEN: usize = 16;
const BRIEF_PREFIX_LEN: usize = 8;
const FULL_PREFIX_BASE_LEN: usize = 112;

/// Length of the prefix window extracted from the decrypted player-block
/// payload: 8 bytes if the full-data flag is clear, else
/// `112 + 1 + relations_length`.
fn prefix_len(full_data: bool, relations_length: usize) -> usize {
    if full_data {
        FULL_PREFIX_BASE_LEN + 1 + relations_length
    } else {
        BRIEF_PREFIX_LEN
    }
}

/// Pads `name` to exactly [`NAME_PAD_LEN`] bytes: a leading zero byte,
/// then up to 15 ASCII code units, zero-padded to length 16.
fn pad_name(name: &str) -> [u8; NAME_PAD_LEN] {
    let mut padded = [0u8; NAME_PAD_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_PAD_LEN - 1);
    padded[1..1 + len].copy_from_slice(&bytes[..len]);
    padded
}

/// Builds the interleave: for `i ∈ {0,2,…,14}`, emits
/// `singular[i], singular[i+1], plural[i], plural[i+1]`.
fn interleave(singular: &[u8; NAME_PAD_LEN], plural: &[u8; NAME_PAD_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(NAME_PAD_LEN * 2);
    for i in (0..NAME_PAD_LEN).step_by(2) {
        out.push(singular[i]);
        out.push(singular[i + 1]);
        out.push(plural[i]);
        out.push(plural[i + 1]);
    }
    out
}

/// Computes the 16-bit checksum: XOR every even-indexed byte of the
/// buffer into the low byte, every odd-indexed byte into the high byte
///.
fn xor_checksum(buffer: &[u8]) -> u16 {
    let mut low = 0u8;
    let mut high = 0u8;
    for (i, &byte) in buffer.iter().enumerate() {
        if i % 2 == 0 {
            low ^= byte;
        } else {
            high ^= byte;
        }
    }
    u16::from_le_bytes([low, high])
}

/// Computes the race-file footer checksum over `player_payload` (the
/// decrypted player-block payload, up to but not including the packed
/// race names) and the decoded singular/plural race names.
///
/// `relations_length` is only consulted when `full_data` is set — it's
/// the length of the variable-length diplomatic-relations array embedded
/// in the prefix.
pub fn compute_race_checksum(
    player_payload: &[u8],
    singular_name: &str,
    plural_name: &str,
    full_data: bool,
    relations_length: usize,
) -> u16 {
    let len = prefix_len(full_data, relations_length).min(player_payload.len());
    let prefix = &player_payload[..len];
    let singular = pad_name(singular_name);
    let plural = pad_name(plural_name);

    let mut buffer = Vec::with_capacity(len + NAME_PAD_LEN * 2);
    buffer.extend_from_slice(prefix);
    buffer.extend_from_slice(&interleave(&singular, &plural));
    xor_checksum(&buffer)
}

/// Recomputes the checksum and compares it against the footer's on-disk
/// value, surfacing a non-fatal [`crate::error::CoreErrorKind::Integrity`]
/// on mismatch.
pub fn verify_race_checksum(
    player_payload: &[u8],
    singular_name: &str,
    plural_name: &str,
    full_data: bool,
    relations_length: usize,
    on_disk: u16,
) -> Result<(), CoreError> {
    let computed = compute_race_checksum(
        player_payload,
        singular_name,
        plural_name,
        full_data,
        relations_length,
    );
    if computed == on_disk {
        Ok(())
    } else {
        Err(CoreError::integrity(IntegrityError {
            expected: on_disk,
            computed,
        }))
    }
}

/// Passes a generic stream-level footer checksum through unchanged. This
/// crate never recomputes it — see the module doc comment.
pub fn passthrough_stream_checksum(existing: Option<u16>) -> Option<u16> {
    existing
}
