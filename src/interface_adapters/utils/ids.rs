// Process-unique id source for connection and session correlation.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static NEXT_ID: OnceLock<AtomicU64> = OnceLock::new();

/// Process-unique, strictly increasing identifier.
///
/// Seeded from the wall clock once per process so ids stay distinct across
/// restarts, then bumped atomically so a burst of connections within one
/// instant never collides.
pub fn unique_id() -> u64 {
    let next = NEXT_ID.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        AtomicU64::new(seed)
    });
    next.fetch_add(1, Ordering::Relaxed)
}
