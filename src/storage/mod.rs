//! # Storage Layer
//!
//! Persistence around the pure core: reading source files, a key-value
//! byte store, the session records built on top of it, and workspace
//! discovery.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Config | TOML | `.linefix/config.toml` |
//! | Sessions | JSON (one file per session) | `.linefix/sessions/` |
//! | Session index | JSON | `.linefix/sessions/index.json` |
//!
//! All writes are atomic (temp file + rename) and guarded with `fs2`
//! file locks held only for the duration of the byte transfer.

mod config;
mod kv;
mod session;
mod source;
mod workspace;

pub use config::Config;
pub use kv::{FileStore, KvStore, MemoryStore, StoreError};
pub use session::{AbsorbOutcome, Session, SessionError, SessionId, SessionStore, SessionSummary};
pub use source::{read_source, SourceError};
pub use workspace::{Workspace, WorkspaceError};
