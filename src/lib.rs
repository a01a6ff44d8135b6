//! Binary codec, block catalog, and game-state store for a 1990s 4X
//! space-strategy game's proprietary save files.
//!
//! This crate decodes, modifies, validates, and re-encodes the encrypted,
//! bit-packed block stream that makes up host turn files, per-player turn
//! files, player order submissions, race definitions, and history files. It
//! does not emulate game mechanics, render maps, or provide a CLI — see the
//! crate-level README for the boundary between this core and its
//! collaborators.
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
extern crate log;

/// Little-endian scalar reads/writes and bit-field extract/insert.
pub mod bitio;
/// Block catalog: typed decoders/encoders for every known block kind.
pub mod blocks;
/// Keyed XOR stream cipher used to (de)obfuscate non-header block payloads.
pub mod cipher;
/// Crate-wide error taxonomy.
pub mod error;
/// Whole-file parse/encode orchestration over the framer and block catalog.
pub mod file;
/// Block stream framing: header discovery and record iteration.
pub mod framer;
/// Race-file and stream-level integrity checksums.
pub mod integrity;
/// Cross-file entity reconciliation.
pub mod merge;
/// Weak race-password hash and parallel brute-force recovery.
pub mod password;
/// Editable race definition, advantage-point cost function, validator.
pub mod race;
/// Indexed collection of decoded entities (players, planets, fleets, …).
pub mod store;
/// 6-bit packed string codec ("encoded-name" format).
pub mod strcodec;
/// Variable-length integer codec with shared indicator-byte packing.
pub mod varint;

pub use error::{CoreError, CoreErrorKind};
pub use file::{parse, parse_into_store, ParsedFile, ParsedRecord};
pub use framer::{BlockRecord, FileHeaderFields, FileTypeTag};
pub use store::GameStateStore;
