use crate::error::BoardError;
use crate::history::HistoryEntry;
use crate::model::Snapshot;
use chrono::{DateTime, Utc};
use log::*;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: &str = "2.0";

/// Everything needed to resume a session: the schedule and its undo entries.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PersistedState {
    pub snapshot: Snapshot,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub version: String,
    pub saved_at: DateTime<Utc>,
    pub data: PersistedState,
}

impl Envelope {
    pub fn wrap(data: PersistedState) -> Envelope {
        Envelope {
            version: FORMAT_VERSION.to_string(),
            saved_at: Utc::now(),
            data,
        }
    }
}

pub trait SnapshotStore {
    fn save(&mut self, state: &PersistedState) -> Result<(), BoardError>;

    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedState>, BoardError>;
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileStore {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&mut self, state: &PersistedState) -> Result<(), BoardError> {
        if self.path.exists() {
            let backup = self.backup_path();
            debug!("Backing up {:?} to {:?}", self.path, backup);
            std::fs::copy(&self.path, &backup)?;
        }
        info!("Saving board to {:?}", self.path);
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &Envelope::wrap(state.clone()))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedState>, BoardError> {
        if !self.path.exists() {
            return Ok(None);
        }
        info!("Loading board from {:?}", self.path);
        let envelope: Envelope = serde_json::from_reader(File::open(&self.path)?)?;
        if envelope.version != FORMAT_VERSION {
            warn!(
                "Saved board has version {}, expected {}",
                envelope.version, FORMAT_VERSION
            );
        }
        Ok(Some(envelope.data))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    last: Option<Envelope>,
}

impl MemoryStore {
    pub fn last(&self) -> Option<&Envelope> {
        self.last.as_ref()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, state: &PersistedState) -> Result<(), BoardError> {
        self.last = Some(Envelope::wrap(state.clone()));
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedState>, BoardError> {
        Ok(self.last.as_ref().map(|e| e.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ActionKind, HistoryEngine};
    use crate::model::tests::{sample_state, train};

    fn persisted() -> PersistedState {
        let mut state = sample_state();
        let mut history = HistoryEngine::default();
        let before = state.snapshot();
        state.trains.insert(3, train(3, Some(1), 700, 730));
        history.record(ActionKind::CreateTrain, "Added train 103", before);
        PersistedState {
            snapshot: state.snapshot(),
            history: history.entries().to_vec(),
        }
    }

    #[test]
    fn memory_store_keeps_last() {
        let mut store = MemoryStore::default();
        assert_eq!(store.load().unwrap(), None);
        let data = persisted();
        store.save(&data).unwrap();
        assert_eq!(store.last().unwrap().version, "2.0");
        assert_eq!(store.load().unwrap(), Some(data));
    }

    #[test]
    fn file_store_writes_backup() {
        let dir = std::env::temp_dir().join(format!("trackboard-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut store = JsonFileStore::new(dir.join("board.json"));
        let _ = std::fs::remove_file(store.path());
        let _ = std::fs::remove_file(store.backup_path());

        assert_eq!(store.load().unwrap(), None);

        let first = persisted();
        store.save(&first).unwrap();
        assert!(!store.backup_path().exists());

        let mut second = first.clone();
        second.snapshot.trains.remove(&3);
        store.save(&second).unwrap();
        assert!(store.backup_path().exists());
        assert_eq!(store.load().unwrap(), Some(second));

        let backup = JsonFileStore::new(store.backup_path());
        assert_eq!(backup.load().unwrap(), Some(first));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn envelope_shape() {
        let json = serde_json::to_value(Envelope::wrap(persisted())).unwrap();
        assert_eq!(json["version"], "2.0");
        assert!(json["saved_at"].is_string());
        assert_eq!(json["data"]["history"][0]["kind"], "CREATE_TRAIN");
        assert_eq!(json["data"]["snapshot"]["trains"]["3"]["start"], "11:40");
    }
}
