use landgrid_registry::{Ledger, OwnershipRegistry, RegistryConfig, RegistryEvent};
use serde::{Deserialize, Serialize};

/// A point-in-time copy of the registry ledger.
///
/// `hash` is the registry state hash at capture time, enabling corruption
/// detection on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: RegistryConfig,
    pub ledger: Ledger,
    /// Number of logged events already folded into `ledger`.
    pub log_position: u64,
    pub hash: u64,
}

impl Snapshot {
    /// Capture the registry as of `log_position` logged events.
    ///
    /// The registry's own pending event log is ignored; flush it before
    /// capturing or its effects will be replayed twice.
    pub fn capture(registry: &OwnershipRegistry, log_position: u64) -> Self {
        Self {
            config: registry.config().clone(),
            ledger: registry.ledger().clone(),
            log_position,
            hash: registry.state_hash(),
        }
    }

    /// Recompute the hash and check the balance table against the owner map.
    pub fn verify(&self) -> bool {
        self.ledger.is_consistent() && self.restore().state_hash() == self.hash
    }

    /// Rebuild a registry from this snapshot, with an empty event log.
    pub fn restore(&self) -> OwnershipRegistry {
        OwnershipRegistry::with_ledger(self.config.clone(), self.ledger.clone())
    }
}

/// Append-only event log for persistence and replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<RegistryEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events to the log. Events are never modified after writing.
    pub fn append(&mut self, events: &[RegistryEvent]) {
        self.events.extend_from_slice(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Restore the snapshot and replay every event logged after it.
    pub fn replay_from(&self, snapshot: &Snapshot) -> OwnershipRegistry {
        let mut registry = snapshot.restore();
        let start = (snapshot.log_position as usize).min(self.events.len());
        registry.apply_events(&self.events[start..]);
        registry
    }
}

/// In-memory snapshot store with rollback.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: Vec<Snapshot>,
    log: EventLog,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush pending events from the registry into the log.
    pub fn flush_events(&mut self, registry: &mut OwnershipRegistry) {
        let events = registry.drain_events();
        self.log.append(&events);
    }

    /// Flush, then snapshot the registry. Returns the snapshot index.
    pub fn take_snapshot(&mut self, registry: &mut OwnershipRegistry) -> usize {
        self.flush_events(registry);
        let snap = Snapshot::capture(registry, self.log.len() as u64);
        self.snapshots.push(snap);
        self.snapshots.len() - 1
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn get_snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// The state exactly as of a snapshot, ignoring later events.
    pub fn rollback(&self, snapshot_index: usize) -> Option<OwnershipRegistry> {
        self.snapshots.get(snapshot_index).map(Snapshot::restore)
    }

    /// The newest snapshot with every later event replayed on top.
    pub fn latest(&self) -> Option<OwnershipRegistry> {
        self.snapshots.last().map(|snap| self.log.replay_from(snap))
    }
}
