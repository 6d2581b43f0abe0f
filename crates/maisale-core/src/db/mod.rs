//! Database layer for Mai-Sale
//!
//! SQLite storage for conversations, their messages, and the embedded
//! snippets used for retrieval. Embeddings live as BLOBs and similarity is
//! computed in Rust.

mod conversations;
mod messages;
mod schema;
pub mod vectors;

pub use conversations::ConversationInfo;
pub use messages::MessageRecord;
pub use schema::Database;
use std::path::PathBuf;

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("chat.sqlite")
    }
}

/// Random-looking v4-style identifier without pulling in a uuid crate
pub(crate) fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let pid = std::process::id();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    // Counter feeds the high bits as well
    let mixed = timestamp
        ^ (pid as u128).wrapping_mul(6_364_136_223_846_793_005)
        ^ ((seq as u128) << 32)
        ^ ((seq as u128).wrapping_mul(0x9E37_79B9_7F4A_7C15) << 64);

    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (mixed >> 96) as u32,
        (mixed >> 80) as u16,
        (mixed >> 64) as u16 & 0x0FFF,
        ((mixed >> 48) as u16 & 0x3FFF) | 0x8000,
        mixed as u64 & 0xFFFF_FFFF_FFFF,
    )
}
