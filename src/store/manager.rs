//! File-backed swap record store
//!
//! One JSON file per action, segmented by chain and role
//! (`<root>/<chain>/<role>/<id>.json`). Ordering comes from a store-assigned
//! monotonic id captured at write time, never from filename sorting or file
//! mtimes, which fall apart under clock skew and rapid successive writes.

use dashmap::DashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::adapter::ChainAdapter;
use crate::error::{SwapError, SwapResult};
use crate::secret::Secret;
use crate::store::record::{RecordId, RecordSelector, StoredRecord, SwapRecord, TxRef};

/// Append-only store for swap records.
///
/// Safe for concurrent appends from independent tasks: id assignment is a
/// single atomic increment and each record lands in its own file.
pub struct RecordStore {
    root: PathBuf,
    /// Write-through index of every persisted record.
    records: DashMap<RecordId, StoredRecord>,
    /// Last id handed out.
    seq: AtomicU64,
}

impl RecordStore {
    /// Open a store rooted at `root`, creating it if absent and loading any
    /// existing records to seed the index and the id sequence.
    pub fn open(root: impl Into<PathBuf>) -> SwapResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let records = DashMap::new();
        let mut max_id = 0u64;

        for entry in walk_json_files(&root)? {
            let data = fs::read_to_string(&entry)?;
            let stored: StoredRecord = match serde_json::from_str(&data) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Skipping unreadable record file {:?}: {}", entry, e);
                    continue;
                }
            };
            max_id = max_id.max(stored.id.0);
            records.insert(stored.id, stored);
        }

        debug!(
            "Opened record store at {:?} with {} records",
            root,
            records.len()
        );

        Ok(Self {
            root,
            records,
            seq: AtomicU64::new(max_id),
        })
    }

    /// Persist a new immutable record and return its assigned id.
    ///
    /// Creates the chain/role namespace on demand. Existing files are never
    /// overwritten; a path collision is a hard error, not a rewrite.
    pub fn append(&self, record: SwapRecord) -> SwapResult<RecordId> {
        let id = RecordId(self.seq.fetch_add(1, Ordering::SeqCst) + 1);

        let dir = self
            .root
            .join(record.chain.as_str())
            .join(record.role().as_str());
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{:012}.json", id.0));
        let stored = StoredRecord { id, record };
        let data = serde_json::to_vec_pretty(&stored)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    SwapError::Storage(format!("record {} already exists at {:?}", id, path))
                } else {
                    SwapError::Io(e)
                }
            })?;
        file.write_all(&data)?;

        debug!(
            "Appended record {} ({} {} {:?})",
            id,
            stored.record.chain,
            stored.record.role(),
            stored.record.phase
        );

        self.records.insert(id, stored);
        Ok(id)
    }

    /// The matching record with the greatest store-assigned id.
    pub fn latest(&self, selector: &RecordSelector) -> SwapResult<StoredRecord> {
        self.records
            .iter()
            .filter(|entry| selector.matches(&entry.value().record))
            .max_by_key(|entry| entry.value().id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SwapError::NoMatchingRecord {
                selector: selector.to_string(),
            })
    }

    /// All matching records, oldest first.
    pub fn all(&self, selector: &RecordSelector) -> Vec<StoredRecord> {
        let mut matches: Vec<StoredRecord> = self
            .records
            .iter()
            .filter(|entry| selector.matches(&entry.value().record))
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|stored| stored.id);
        matches
    }

    /// Look up a record by id.
    pub fn get(&self, id: RecordId) -> Option<StoredRecord> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of persisted records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recover a secret the counterparty revealed only by claiming on the
    /// other chain: read that chain's executed claim transaction and extract
    /// the secret argument.
    pub async fn find_by_secret_reveal(
        &self,
        adapter: &dyn ChainAdapter,
        tx_ref: &TxRef,
    ) -> SwapResult<Secret> {
        adapter.extract_revealed_secret(tx_ref).await
    }
}

fn walk_json_files(root: &Path) -> SwapResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for chain_entry in fs::read_dir(root)? {
        let chain_dir = chain_entry?.path();
        if !chain_dir.is_dir() {
            continue;
        }
        for role_entry in fs::read_dir(&chain_dir)? {
            let role_dir = role_entry?.path();
            if !role_dir.is_dir() {
                continue;
            }
            for file_entry in fs::read_dir(&role_dir)? {
                let path = file_entry?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                }
            }
        }
    }
    Ok(files)
}
