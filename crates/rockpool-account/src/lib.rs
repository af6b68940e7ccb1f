//! `rockpool-account` — Account lifecycle and state migration for Rockpool.
//!
//! A state machine over pluggable key→string storage, orchestrating
//! registration, login, logout, and the export/import of the entire local
//! state (credentials + game progress) as a single encrypted portable
//! bundle. Cryptography lives in `rockpool-crypto-core`; the UI and game
//! layers are external collaborators reached only through the [`Storage`]
//! trait and the typed records in [`records`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod lifecycle;
pub mod migration;
pub mod records;
pub mod storage;

pub use error::{AccountError, ErrorKind, StorageError};
pub use lifecycle::{AccountManager, AuthState, RegisterRequest, RegisterResult};
pub use migration::{ExportRequest, ImportRequest};
pub use records::{
    generate_account_id, AccountRecord, AccountState, ExportBundle, ExportFile, ItemCounters,
    ProfileRecord, ACCOUNT_ID_LEN, ACCOUNT_RECORD_VERSION, APP_MARKER, EXPORT_FORMAT_VERSION,
};
pub use storage::{keys, JsonFileStorage, MemoryStorage, Storage};
