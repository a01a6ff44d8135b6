//! File-frame family: file footer and file hash. The file
//! header itself lives in [`crate::framer::FileHeaderFields`] since the
//! framer must decode it before any cipher state exists.

use super::BlockCodec;
use crate::bitio::{read_u32, read_u8, write_u32, write_u8};
use crate::error::{BlockDecodeError, CoreError};

use crate::blocks::tags::FILE_FOOTER;

/// End-of-stream marker. For race files the 2-byte payload holds the
/// integrity checksum; one history-file family omits the
/// payload entirely and the footer is just the empty marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileFooterBlock {
    pub checksum: Option<u16>,
}

impl BlockCodec for FileFooterBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        match payload.len() {
            0 => Ok(Self { checksum: None }),
            2 => Ok(Self {
                checksum: Some(u16::from_le_bytes([payload[0], payload[1]])),
            }),
            other => Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: FILE_FOOTER,
                reason: format!("file footer payload must be 0 or 2 bytes, got {other}"),
            })),
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self.checksum {
            None => Vec::new(),
            Some(value) => value.to_le_bytes().to_vec(),
        }
    }
}

/// 11-byte machine fingerprint: two volume labels, two timestamps, and a
/// drive-size byte. Exists purely to let callers detect an identical-serial
/// file shared across two machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHashBlock {
    pub volume_label_a: u32,
    pub volume_label_b: u32,
    pub timestamp_a: u8,
    pub timestamp_b: u8,
    pub drive_size: u8,
    /// Bytes beyond the documented 11, preserved byte-for-byte.
    pub extra_tail: Vec<u8>,
}

pub const FILE_HASH_SIZE: usize = 11;

impl BlockCodec for FileHashBlock {
    fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        if payload.len() < FILE_HASH_SIZE {
            return Err(CoreError::block_decode(BlockDecodeError {
                offset: 0,
                block_type: super::tags::FILE_HASH,
                reason: format!(
                    "file hash payload shorter than {FILE_HASH_SIZE} bytes: {}",
                    payload.len()
                ),
            }));
        }
        Ok(Self {
            volume_label_a: read_u32(payload, 0),
            volume_label_b: read_u32(payload, 4),
            timestamp_a: read_u8(payload, 8),
            timestamp_b: read_u8(payload, 9),
            drive_size: read_u8(payload, 10),
            extra_tail: payload[FILE_HASH_SIZE..].to_vec(),
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = [0u8; FILE_HASH_SIZE].to_vec();
        write_u32(&mut buf, 0, self.volume_label_a);
        write_u32(&mut buf, 4, self.volume_label_b);
        write_u8(&mut buf, 8, self.timestamp_a);
        write_u8(&mut buf, 9, self.timestamp_b);
        write_u8(&mut buf, 10, self.drive_size);
        buf.extend_from_slice(&self.extra_tail);
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn footer_roundtrips_both_variants() {
        let empty = FileFooterBlock { checksum: None };
        assert_eq!(FileFooterBlock::decode(&empty.encode()).unwrap(), empty);

        let with_checksum = FileFooterBlock {
            checksum: Some(0xbeef),
        };
        assert_eq!(
            FileFooterBlock::decode(&with_checksum.encode()).unwrap(),
            with_checksum
        );
    }

    #[test]
    fn footer_rejects_other_sizes() {
        assert!(FileFooterBlock::decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn hash_roundtrips() {
        let hash = FileHashBlock {
            volume_label_a: 0x1234_5678,
            volume_label_b: 0x9abc_def0,
            timestamp_a: 12,
            timestamp_b: 200,
            drive_size: 42,
            extra_tail: vec![],
        };
        assert_eq!(FileHashBlock::decode(&hash.encode()).unwrap(), hash);
    }

    #[test]
    fn hash_preserves_unknown_trailing_bytes() {
        let hash = FileHashBlock {
            volume_label_a: 1,
            volume_label_b: 2,
            timestamp_a: 3,
            timestamp_b: 4,
            drive_size: 5,
            extra_tail: vec![0xde, 0xad],
        };
        assert_eq!(FileHashBlock::decode(&hash.encode()).unwrap(), hash);
    }
}
