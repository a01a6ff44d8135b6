//! Weak 32-bit race-password hash and parallel brute-force recovery.
//!
//! The hash folds a password down to an index into a tiny fixed table —
//! only 13 distinct hash values exist across the entire candidate space,
//! which is exactly the kind of weakness a brute-force recovery tool
//! exists to exploit, and exactly why the game shouldn't have shipped it
//! as a security measure. Recovery partitions the fixed-length candidate
//! space evenly across a thread pool so an N-thread search completes in
//! roughly `1/N` the single-threaded time, reporting progress and
//! honoring cancellation from the caller's side of a shared flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// The hash is an index into this table, so it can only ever take one of
/// 13 distinct values. `HASH_TABLE[0]` is pinned by the reference client.
const HASH_TABLE: [u32; 13] = [
    156_085_230,
    0x1b87_3593,
    0xcc9e_2d51,
    0x85eb_ca6b,
    0xc2b2_ae35,
    0x27d4_eb2f,
    0x1656_67b1,
    0xd3a2_646c,
    0xfd70_46c5,
    0xb55a_4f09,
    0x5bd1_e995,
    0x1b56_c4e9,
    0x52dc_e729,
];

/// Folds `password` into a 32-bit hash by summing byte values plus
/// `3 * length` and reducing modulo the table size. Order-insensitive by
/// construction — character order never enters the sum — so any two
/// candidates whose byte-value sum and length agree collide, which is the
/// documented weakness this module's search exploits.
pub fn hash_password(password: &str) -> u32 {
    let char_sum: u32 = password.bytes().map(|b| b as u32).sum();
    let bucket = (char_sum + 3 * password.len() as u32) % HASH_TABLE.len() as u32;
    HASH_TABLE[bucket as usize]
}

/// Search-space and execution parameters for [`search`].
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub charset: Vec<u8>,
    pub min_length: usize,
    pub max_length: usize,
    pub thread_count: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            charset: (b'a'..=b'z').collect(),
            min_length: 1,
            max_length: 6,
            thread_count: 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub found: Option<String>,
    pub attempts: u64,
}

/// Converts a mixed-radix index into the candidate string of the given
/// `length` over `charset`, treating the index as a base-`charset.len()`
/// number.
fn candidate_at(charset: &[u8], length: usize, mut index: u64) -> String {
    let base = charset.len() as u64;
    let mut bytes = vec![0u8; length];
    for slot in bytes.iter_mut().rev() {
        *slot = charset[(index % base) as usize];
        index /= base;
    }
    String::from_utf8(bytes).expect("charset is restricted to ASCII by callers")
}

/// Brute-forces a password whose hash equals `target_hash`, trying every
/// length in `config.min_length..=config.max_length` before giving up.
/// Cancels promptly when `cancel` is set from another thread, and calls
/// `on_progress` periodically with the cumulative attempt count across all
/// worker threads.
pub fn search(
    target_hash: u32,
    config: &SearchConfig,
    cancel: &AtomicBool,
    on_progress: impl Fn(u64) + Send + Sync,
) -> SearchOutcome {
    let found = Arc::new(Mutex::new(None::<String>));
    let attempts = Arc::new(AtomicU64::new(0));
    let on_progress = &on_progress;

    for length in config.min_length..=config.max_length {
        if cancel.load(Ordering::Relaxed) || found.lock().unwrap().is_some() {
            break;
        }
        let space = (config.charset.len() as u64).saturating_pow(length as u32);
        let thread_count = config.thread_count.max(1);

        std::thread::scope(|scope| {
            for worker in 0..thread_count {
                let found = Arc::clone(&found);
                let attempts = Arc::clone(&attempts);
                let charset = config.charset.clone();
                scope.spawn(move || {
                    let mut index = worker as u64;
                    while index < space {
                        if cancel.load(Ordering::Relaxed) || found.lock().unwrap().is_some() {
                            return;
                        }
                        let candidate = candidate_at(&charset, length, index);
                        let count = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                        if count % 4096 == 0 {
                            on_progress(count);
                        }
                        if hash_password(&candidate) == target_hash {
                            *found.lock().unwrap() = Some(candidate);
                            return;
                        }
                        index += thread_count as u64;
                    }
                });
            }
        });
    }

    SearchOutcome {
        found: Arc::try_unwrap(found).unwrap().into_inner().unwrap(),
        attempts: attempts.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn anagrams_collide_by_construction() {
        assert_eq!(hash_password("abc"), hash_password("bca"));
        assert_eq!(hash_password("abc"), hash_password("cab"));
    }

    #[test]
    fn pinned_vector_matches_reference_client() {
        assert_eq!(hash_password("viewai"), 156_085_230);
        assert_eq!(hash_password("fymmgsd"), 156_085_230);
        assert_eq!(hash_password("yfmmgsd"), 156_085_230);
        assert_eq!(hash_password("iymtfi"), 156_085_230);
    }

    #[test]
    fn distinct_multisets_do_not_collide() {
        assert_ne!(hash_password("abc"), hash_password("abd"));
    }

    #[test]
    fn search_finds_a_short_password() {
        let config = SearchConfig {
            charset: b"ab".to_vec(),
            min_length: 1,
            max_length: 3,
            thread_count: 2,
        };
        let target = hash_password("ba");
        let cancel = AtomicBool::new(false);
        let outcome = search(target, &config, &cancel, |_| {});
        assert!(outcome.found.is_some());
        assert_eq!(hash_password(outcome.found.as_ref().unwrap()), target);
    }

    #[test]
    fn cancellation_stops_the_search_early() {
        let config = SearchConfig {
            charset: b"abcdefghij".to_vec(),
            min_length: 5,
            max_length: 5,
            thread_count: 2,
        };
        let cancel = AtomicBool::new(true);
        let outcome = search(hash_password("zzzzz"), &config, &cancel, |_| {});
        assert!(outcome.found.is_none());
        assert!(outcome.attempts < 100);
    }
}
