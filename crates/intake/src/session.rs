use getrandom::getrandom;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const SESSION_ID_BYTES: usize = 16;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Mints an opaque per-request session id: 32 lowercase hex characters.
pub fn mint_session_id() -> String {
    let bytes = random_bytes_best_effort().unwrap_or_else(fallback_bytes);
    let mut out = String::with_capacity(SESSION_ID_BYTES * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn random_bytes_best_effort() -> Option<[u8; SESSION_ID_BYTES]> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    getrandom(&mut bytes).ok()?;
    Some(bytes)
}

// Unique within the process even when the OS source is unavailable.
fn fallback_bytes() -> [u8; SESSION_ID_BYTES] {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut bytes = [0u8; SESSION_ID_BYTES];
    bytes[..8].copy_from_slice(&nanos.to_be_bytes());
    bytes[8..].copy_from_slice(&counter.to_be_bytes());
    bytes
}
