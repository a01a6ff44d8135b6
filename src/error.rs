//! Crate-wide error taxonomy.
//!
//! Framing and cipher failures abort a stream. Block-decode failures on a
//! single record do not — the record is retained as malformed and parsing
//! continues (see [`crate::framer`]). Integrity mismatches are reported, not
//! fatal, at read time; merge and validation failures are always fatal to
//! the operation that raised them.

use std::fmt;
use thiserror::Error;

/// The crate's public error type. Carries a `kind` plus, where available, a
/// byte offset or entity identity pinpointing the failure.
#[derive(Error, Debug)]
#[non_exhaustive]
pub struct CoreError {
    kind: CoreErrorKind,
}

impl CoreError {
    /// The underlying error kind.
    pub fn kind(&self) -> &CoreErrorKind {
        &self.kind
    }

    pub(crate) fn framing(detail: FramingError) -> Self {
        Self {
            kind: CoreErrorKind::Framing(detail),
        }
    }

    pub(crate) fn cipher(detail: CipherError) -> Self {
        Self {
            kind: CoreErrorKind::Cipher(detail),
        }
    }

    pub(crate) fn block_decode(detail: BlockDecodeError) -> Self {
        Self {
            kind: CoreErrorKind::BlockDecode(detail),
        }
    }

    pub(crate) fn integrity(detail: IntegrityError) -> Self {
        Self {
            kind: CoreErrorKind::Integrity(detail),
        }
    }

    pub(crate) fn merge(detail: MergeError) -> Self {
        Self {
            kind: CoreErrorKind::Merge(detail),
        }
    }

    pub(crate) fn validation(field: &'static str, reason: String) -> Self {
        Self {
            kind: CoreErrorKind::Validation(ValidationError { field, reason }),
        }
    }

    pub(crate) fn io(err: std::io::Error) -> Self {
        Self {
            kind: CoreErrorKind::Io(err),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl From<std::io::Error> for CoreError {
    fn from(value: std::io::Error) -> Self {
        Self::io(value)
    }
}

/// The crate-wide error taxonomy. Not every variant is constructible by
/// callers; the non-exhaustive marker on [`CoreError`] keeps the
/// enumeration free to grow.
#[derive(Debug)]
pub enum CoreErrorKind {
    /// Truncated header, declared size overruns stream, missing file header.
    Framing(FramingError),
    /// Header fields out of range for seed derivation.
    Cipher(CipherError),
    /// Payload shorter than a fixed header, invalid discriminator, bad bit-field combination.
    BlockDecode(BlockDecodeError),
    /// Race-file checksum mismatch at read time (reported, not fatal — surfaced as an error only
    /// when the caller asks to treat repair failure as fatal).
    Integrity(IntegrityError),
    /// `game_id` or `turn` mismatch across files being merged.
    Merge(MergeError),
    /// Race definition fails a range or range-edge check.
    Validation(ValidationError),
    /// Underlying I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for CoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framing(e) => write!(f, "framing error: {e}"),
            Self::Cipher(e) => write!(f, "cipher error: {e}"),
            Self::BlockDecode(e) => write!(f, "block decode error: {e}"),
            Self::Integrity(e) => write!(f, "integrity error: {e}"),
            Self::Merge(e) => write!(f, "merge error: {e}"),
            Self::Validation(e) => write!(f, "validation error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

/// Fatal stream-level framing failure, carrying the byte offset it was
/// detected at.
#[derive(Debug)]
pub struct FramingError {
    pub offset: u64,
    pub reason: FramingReason,
}

#[derive(Debug)]
pub enum FramingReason {
    TruncatedHeader,
    PayloadOverrunsStream { declared: usize, remaining: usize },
    MissingFileHeader,
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FramingReason::TruncatedHeader => {
                write!(f, "truncated record header at offset {}", self.offset)
            }
            FramingReason::PayloadOverrunsStream {
                declared,
                remaining,
            } => write!(
                f,
                "record at offset {} declares {} payload bytes but only {} remain",
                self.offset, declared, remaining
            ),
            FramingReason::MissingFileHeader => write!(
                f,
                "first record at offset {} is not a file-header record",
                self.offset
            ),
        }
    }
}

#[derive(Debug)]
pub struct CipherError {
    pub reason: &'static str,
}

impl fmt::Display for CipherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// A single record's decode failure. These are collected onto the malformed
/// record rather than raised — see [`crate::framer::BlockRecord::malformed`].
#[derive(Debug, Clone)]
pub struct BlockDecodeError {
    pub offset: u64,
    pub block_type: u8,
    pub reason: String,
}

impl fmt::Display for BlockDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block type {} at offset {}: {}",
            self.block_type, self.offset, self.reason
        )
    }
}

#[derive(Debug)]
pub struct IntegrityError {
    pub expected: u16,
    pub computed: u16,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "race-file footer checksum mismatch: on-disk {:#06x}, computed {:#06x}",
            self.expected, self.computed
        )
    }
}

#[derive(Debug)]
pub struct MergeError {
    pub left: (u32, u16),
    pub right: (u32, u16),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot merge files with (game_id, turn) {:?} and {:?}",
            self.left, self.right
        )
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}
