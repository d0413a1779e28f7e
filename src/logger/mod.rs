//! Activity logging: JSONL append-only plus optional SQLite (WAL), written
//! from a dedicated thread with graceful degradation.

pub mod dual;
pub mod jsonl;
#[cfg(feature = "sqlite")]
pub mod sqlite;
