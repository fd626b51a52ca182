//! File-backed registry persistence.
//!
//! Layout inside the store directory:
//! ```text
//! registry.meta.json          - config, coordinate layout, schema versions, counters
//! snapshots/
//!   000001.snapshot.cbor.zst  - CBOR+zstd compressed ledger snapshots
//! events/
//!   000001.log.cbor.zst       - CBOR+zstd compressed event log segments
//! integrity/
//!   manifest.json             - hash chain manifest
//! ```

use crate::snapshot::Snapshot;
use landgrid_common::CoordLayout;
use landgrid_registry::{OwnershipRegistry, RegistryConfig, RegistryEvent};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Current schema versions.
const REGISTRY_SCHEMA_VERSION: u32 = 1;
const EVENT_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "registry.meta.json";

/// Errors from file-backed persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("store not initialized at {0}")]
    NotInitialized(PathBuf),
    #[error("store already initialized at {0}")]
    AlreadyInitialized(PathBuf),
}

/// Metadata stored in registry.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryMeta {
    pub registry_schema_version: u32,
    pub event_schema_version: u32,
    pub config: RegistryConfig,
    pub layout: CoordLayout,
    pub snapshot_count: u32,
    pub event_segment_count: u32,
    /// Total events across all segments.
    pub event_count: u64,
}

/// A single entry in the integrity manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Integrity manifest tracking all segment hashes in a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// File-backed registry store with schema versioning and integrity checking.
pub struct RegistryStore {
    root: PathBuf,
    meta: RegistryMeta,
    manifest: IntegrityManifest,
}

impl RegistryStore {
    /// Initialize a new, empty store for a registry.
    pub fn create(
        path: impl AsRef<Path>,
        config: RegistryConfig,
        layout: CoordLayout,
    ) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        if root.join(META_FILE).exists() {
            return Err(StoreError::AlreadyInitialized(root));
        }
        std::fs::create_dir_all(root.join("snapshots"))?;
        std::fs::create_dir_all(root.join("events"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let store = Self {
            root,
            meta: RegistryMeta {
                registry_schema_version: REGISTRY_SCHEMA_VERSION,
                event_schema_version: EVENT_SCHEMA_VERSION,
                config,
                layout,
                snapshot_count: 0,
                event_segment_count: 0,
                event_count: 0,
            },
            manifest: IntegrityManifest::default(),
        };
        store.save_meta()?;
        store.save_manifest()?;
        tracing::info!(root = %store.root.display(), name = %store.meta.config.name, "registry store created");
        Ok(store)
    }

    /// Open an existing store. Fails closed on schema mismatch.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        let meta_path = root.join(META_FILE);
        if !meta_path.exists() {
            return Err(StoreError::NotInitialized(root));
        }

        let meta: RegistryMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
        if meta.registry_schema_version != REGISTRY_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                file_version: meta.registry_schema_version,
                expected_version: REGISTRY_SCHEMA_VERSION,
            });
        }
        if meta.event_schema_version != EVENT_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                file_version: meta.event_schema_version,
                expected_version: EVENT_SCHEMA_VERSION,
            });
        }

        let manifest_path = root.join("integrity").join("manifest.json");
        let manifest: IntegrityManifest = if manifest_path.exists() {
            serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
        } else {
            IntegrityManifest::default()
        };

        tracing::debug!(
            root = %root.display(),
            snapshots = meta.snapshot_count,
            segments = meta.event_segment_count,
            "registry store opened"
        );
        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    /// Load the latest snapshot (or an empty registry) and replay later events.
    pub fn load_latest(&self) -> Result<OwnershipRegistry, StoreError> {
        let (mut registry, skip) = if self.meta.snapshot_count == 0 {
            (OwnershipRegistry::new(self.meta.config.clone()), 0)
        } else {
            let snap = self.load_snapshot(self.meta.snapshot_count)?;
            if !snap.verify() {
                return Err(StoreError::IntegrityMismatch {
                    expected: format!("{:#x}", snap.hash),
                    actual: "snapshot hash or balance mismatch".into(),
                });
            }
            (snap.restore(), snap.log_position)
        };

        let mut position = 0u64;
        for seg_idx in 1..=self.meta.event_segment_count {
            let events = self.load_event_segment(seg_idx)?;
            let seg_end = position + events.len() as u64;
            if seg_end > skip {
                let start = skip.saturating_sub(position) as usize;
                registry.apply_events(&events[start..]);
            }
            position = seg_end;
        }
        Ok(registry)
    }

    /// Append events to the store as a new segment.
    pub fn append_events(&mut self, events: &[RegistryEvent]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        let seg_idx = self.meta.event_segment_count + 1;
        let filename = format!("{:06}.log.cbor.zst", seg_idx);
        self.write_entry("events", &filename, events)?;

        self.meta.event_segment_count = seg_idx;
        self.meta.event_count += events.len() as u64;
        self.save_meta()?;
        self.save_manifest()?;
        tracing::debug!(segment = seg_idx, events = events.len(), "event segment appended");
        Ok(())
    }

    /// Write the registry's pending events as a new segment.
    ///
    /// Events leave the registry's log only once the segment is on disk, so a
    /// failed commit can be retried.
    pub fn commit(&mut self, registry: &mut OwnershipRegistry) -> Result<(), StoreError> {
        self.append_events(registry.events())?;
        registry.drain_events();
        Ok(())
    }

    /// Commit pending events, then write a snapshot of the registry.
    pub fn take_snapshot(&mut self, registry: &mut OwnershipRegistry) -> Result<(), StoreError> {
        self.commit(registry)?;
        let snap = Snapshot::capture(registry, self.meta.event_count);
        let snap_idx = self.meta.snapshot_count + 1;
        let filename = format!("{:06}.snapshot.cbor.zst", snap_idx);
        self.write_entry("snapshots", &filename, &snap)?;

        self.meta.snapshot_count = snap_idx;
        self.save_meta()?;
        self.save_manifest()?;
        tracing::info!(snapshot = snap_idx, parcels = registry.total_supply(), "snapshot written");
        Ok(())
    }

    /// Verify all integrity hashes in the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            // Check chain continuity
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }

            let data = std::fs::read(self.entry_path(&entry.filename))?;
            let actual_hash = sha256_hex(&data);
            if actual_hash != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.sha256.clone(),
                    actual: actual_hash,
                });
            }

            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &RegistryMeta {
        &self.meta
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.meta.config
    }

    pub fn layout(&self) -> CoordLayout {
        self.meta.layout
    }

    fn entry_path(&self, filename: &str) -> PathBuf {
        let dir = if filename.contains("snapshot") {
            "snapshots"
        } else {
            "events"
        };
        self.root.join(dir).join(filename)
    }

    fn write_entry<T: Serialize + ?Sized>(
        &mut self,
        dir: &str,
        filename: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let cbor_bytes = cbor_serialize(value)?;
        let compressed = zstd_compress(&cbor_bytes)?;

        let hash = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(self.root.join(dir).join(filename), &compressed)?;

        self.manifest.entries.push(ManifestEntry {
            filename: filename.to_string(),
            sha256: hash,
            prev_hash,
        });
        Ok(())
    }

    fn load_snapshot(&self, index: u32) -> Result<Snapshot, StoreError> {
        let filename = format!("{:06}.snapshot.cbor.zst", index);
        self.load_entry(&filename)
    }

    fn load_event_segment(&self, index: u32) -> Result<Vec<RegistryEvent>, StoreError> {
        let filename = format!("{:06}.log.cbor.zst", index);
        self.load_entry(&filename)
    }

    fn load_entry<T: for<'de> Deserialize<'de>>(&self, filename: &str) -> Result<T, StoreError> {
        let compressed = std::fs::read(self.entry_path(filename))?;
        self.verify_file_hash(filename, &compressed)?;
        let cbor_bytes = zstd_decompress(&compressed)?;
        cbor_deserialize(&cbor_bytes)
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let actual = sha256_hex(data);
        match self.manifest.entries.iter().find(|e| e.filename == filename) {
            Some(entry) if entry.sha256 != actual => Err(StoreError::IntegrityMismatch {
                expected: entry.sha256.clone(),
                actual,
            }),
            Some(_) => Ok(()),
            None => Err(StoreError::IntegrityMismatch {
                expected: format!("manifest entry for {filename}"),
                actual: "none".into(),
            }),
        }
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join(META_FILE);
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
