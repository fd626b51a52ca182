//! Persistence: registry snapshots + event log, rollback, file-backed store.
//!
//! # Invariants
//! - Event log is append-only.
//! - Snapshots carry a content hash and are verified before restore.
//! - Loading reconstructs state via snapshot + replay of later events.

mod snapshot;
mod store;

pub use snapshot::{EventLog, Snapshot, SnapshotStore};
pub use store::{IntegrityManifest, ManifestEntry, RegistryMeta, RegistryStore, StoreError};
