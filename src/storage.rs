use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::errors::{FaceError, FaceResult};
use crate::identity::{parse_timestamp, IdGenerator, Identity, StoredIdentity};

/// Durable medium behind an [`IdentityStore`]
pub trait StoreBackend: Send + Sync {
    fn load(&self) -> FaceResult<Vec<StoredIdentity>>;
    fn save(&self, records: &[StoredIdentity]) -> FaceResult<()>;
    /// Human-readable location for logs
    fn location(&self) -> String;
}

/// Pretty-printed JSON array of identities in one file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&self) -> FaceResult<Vec<StoredIdentity>> {
        read_store_file(&self.path)
    }

    fn save(&self, records: &[StoredIdentity]) -> FaceResult<()> {
        write_store_file(&self.path, records)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Volatile backend; keeps the last saved snapshot
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<StoredIdentity>>,
    saves: AtomicUsize,
}

impl MemoryBackend {
    pub fn with_records(records: Vec<StoredIdentity>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Vec<StoredIdentity> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> FaceResult<Vec<StoredIdentity>> {
        Ok(self.snapshot())
    }

    fn save(&self, records: &[StoredIdentity]) -> FaceResult<()> {
        *self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

impl<B: StoreBackend + ?Sized> StoreBackend for std::sync::Arc<B> {
    fn load(&self) -> FaceResult<Vec<StoredIdentity>> {
        (**self).load()
    }

    fn save(&self, records: &[StoredIdentity]) -> FaceResult<()> {
        (**self).save(records)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// Record layout of stores keyed by id (`{"<id>": {"name": .., "face_encoding": [..]}}`)
#[derive(Debug, Deserialize)]
struct LegacyRecord {
    name: String,
    face_encoding: Vec<f64>,
    #[serde(default)]
    registered_at: Option<String>,
    #[serde(default)]
    last_login: Option<String>,
    #[serde(default)]
    login_count: Option<u64>,
    #[serde(default)]
    last_logout: Option<String>,
}

impl LegacyRecord {
    fn into_stored(self, id: String) -> StoredIdentity {
        let registered_at = self
            .registered_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(DateTime::<Utc>::default);
        StoredIdentity {
            id,
            name: self.name,
            signature: self.face_encoding,
            registered_at,
            last_login: self.last_login.as_deref().and_then(parse_timestamp),
            login_count: self.login_count.unwrap_or(0),
            last_logout: self.last_logout.as_deref().and_then(parse_timestamp),
        }
    }
}

pub fn read_store_file(path: &Path) -> FaceResult<Vec<StoredIdentity>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let data = fs::read(path).map_err(|source| FaceError::StoreRead {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |message: String| FaceError::InvalidStoreFile {
        path: path.to_path_buf(),
        message,
    };

    let value: Value = serde_json::from_slice(&data)
        .map_err(|err| invalid(format!("not valid JSON: {err}")))?;
    let records = match value {
        Value::Array(entries) => entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                serde_json::from_value::<StoredIdentity>(entry)
                    .map_err(|err| warn!("skipping stored record #{index}: {err}"))
                    .ok()
            })
            .collect(),
        Value::Object(entries) => entries
            .into_iter()
            .filter_map(|(id, entry)| {
                serde_json::from_value::<LegacyRecord>(entry)
                    .map(|record| record.into_stored(id.clone()))
                    .map_err(|err| warn!("skipping stored record {id}: {err}"))
                    .ok()
            })
            .collect(),
        _ => return Err(invalid("expected an array or object of identities".into())),
    };
    Ok(records)
}

pub fn write_store_file(path: &Path, records: &[StoredIdentity]) -> FaceResult<()> {
    let write_err = |source| FaceError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    {
        let file = tmp.as_file_mut();
        {
            let mut writer = BufWriter::new(&mut *file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n").map_err(write_err)?;
            writer.flush().map_err(write_err)?;
        }
        file.sync_all().map_err(write_err)?;
    }

    let file = tmp.persist(path).map_err(|err| write_err(err.error))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata().map_err(write_err)?.permissions();
        perms.set_mode(0o600);
        file.set_permissions(perms).map_err(write_err)?;
    }
    #[cfg(not(unix))]
    drop(file);

    Ok(())
}

/// Identities in insertion order, plus id bookkeeping.
///
/// Only reachable through an [`IdentityStore`] lock. Mutating accessors flag the
/// ledger dirty so the store knows to write it back.
#[derive(Debug, Default)]
pub struct Ledger {
    identities: Vec<Identity>,
    ids: IdGenerator,
    dirty: bool,
}

impl Ledger {
    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Signature length shared by stored identities
    pub fn dimension(&self) -> Option<usize> {
        self.identities.first().map(|identity| identity.signature.len())
    }

    pub fn get(&self, id: &str) -> Option<&Identity> {
        self.identities.iter().find(|identity| identity.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Identity> {
        let identity = self.identities.iter_mut().find(|identity| identity.id == id)?;
        self.dirty = true;
        Some(identity)
    }

    /// Insert, or overwrite in place when the id exists
    pub fn put(&mut self, identity: Identity) {
        self.ids.observe(&identity.id);
        self.dirty = true;
        match self.identities.iter_mut().find(|slot| slot.id == identity.id) {
            Some(slot) => *slot = identity,
            None => self.identities.push(identity),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Identity> {
        let pos = self.identities.iter().position(|identity| identity.id == id)?;
        self.dirty = true;
        Some(self.identities.remove(pos))
    }

    pub fn next_id(&mut self) -> String {
        self.ids.next_id()
    }

    fn to_stored(&self) -> Vec<StoredIdentity> {
        self.identities.iter().map(Identity::to_stored).collect()
    }
}

/// Shared, lock-guarded owner of every enrolled identity
pub struct IdentityStore {
    ledger: Mutex<Ledger>,
    backend: Box<dyn StoreBackend>,
}

impl IdentityStore {
    /// Empty store; nothing is read from `backend`
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            backend: Box::new(backend),
        }
    }

    /// Store populated from `backend`. Unreadable storage yields an empty store.
    pub fn open(backend: impl StoreBackend + 'static) -> Self {
        let store = Self::new(backend);
        store.reload();
        store
    }

    /// Replace in-memory state with the backend's contents; returns the count loaded
    pub fn reload(&self) -> usize {
        let records = match self.backend.load() {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "could not load identities from {}: {err}; starting empty",
                    self.backend.location()
                );
                Vec::new()
            }
        };

        let mut ledger = self.lock();
        ledger.identities.clear();
        for record in records {
            let id = record.id.clone();
            match Identity::from_stored(record, ledger.dimension()) {
                Ok(identity) => ledger.put(identity),
                Err(err) => warn!("skipping stored identity {id}: {err}"),
            }
        }
        let count = ledger.len();
        ledger.ids.seed(count as u64);
        ledger.dirty = false;
        info!(
            "loaded {count} identities from {}",
            self.backend.location()
        );
        count
    }

    /// Write the current ledger to the backend
    pub fn persist(&self) -> FaceResult<()> {
        self.write_back(&self.lock())
    }

    /// Snapshot in insertion order; later mutations are not observed
    pub fn all(&self) -> std::vec::IntoIter<Identity> {
        self.lock().identities.clone().into_iter()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, id: &str) -> FaceResult<Identity> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| FaceError::NotFound(id.to_string()))
    }

    pub fn put(&self, identity: Identity) {
        // put cannot fail, so neither can the closure
        let _ = self.exclusive(|ledger| {
            ledger.put(identity);
            Ok(())
        });
    }

    pub fn delete(&self, id: &str) -> FaceResult<Identity> {
        self.exclusive(|ledger| {
            ledger
                .remove(id)
                .ok_or_else(|| FaceError::NotFound(id.to_string()))
        })
    }

    /// Apply `mutator` under the lock and return the updated identity
    pub fn update<F>(&self, id: &str, mutator: F) -> FaceResult<Identity>
    where
        F: FnOnce(&mut Identity),
    {
        self.exclusive(|ledger| {
            let identity = ledger
                .get_mut(id)
                .ok_or_else(|| FaceError::NotFound(id.to_string()))?;
            mutator(identity);
            Ok(identity.clone())
        })
    }

    /// Run a read-only pass under the lock
    pub fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        f(&self.lock())
    }

    /// Run a read-decide-write sequence as one critical section.
    ///
    /// If `f` mutated the ledger it is written back before the lock is released.
    /// A failed write is logged; the in-memory change stands.
    pub fn exclusive<T>(&self, f: impl FnOnce(&mut Ledger) -> FaceResult<T>) -> FaceResult<T> {
        let mut ledger = self.lock();
        ledger.dirty = false;
        let result = f(&mut ledger);
        if ledger.dirty {
            if let Err(err) = self.write_back(&ledger) {
                warn!("identity store not persisted: {err}");
            }
            ledger.dirty = false;
        }
        result
    }

    fn write_back(&self, ledger: &Ledger) -> FaceResult<()> {
        self.backend.save(&ledger.to_stored())
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| {
            warn!("identity store lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signature;
    use std::io;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn identity(id: &str, name: &str, values: Vec<f64>) -> Identity {
        Identity::new(id.into(), name.into(), Signature::new(values), Utc::now())
    }

    struct FailingBackend;

    impl StoreBackend for FailingBackend {
        fn load(&self) -> FaceResult<Vec<StoredIdentity>> {
            Err(FaceError::StoreRead {
                path: PathBuf::from("/unreadable"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        fn save(&self, _records: &[StoredIdentity]) -> FaceResult<()> {
            Err(FaceError::Persistence {
                path: PathBuf::from("/unwritable"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        fn location(&self) -> String {
            "failing".into()
        }
    }

    #[test]
    fn json_file_round_trip_keeps_order_and_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("identities.json");
        let backend = JsonFileBackend::new(&path);

        let store = IdentityStore::open(backend.clone());
        store.put(identity("b", "Bea", vec![0.1, 0.2, 0.3]));
        store.put(identity("a", "Abel", vec![-0.7, 1e-9, 42.0]));

        let reopened = IdentityStore::open(backend);
        let ids: Vec<String> = reopened.all().map(|i| i.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(
            reopened.get("a").unwrap().signature,
            Signature::new(vec![-0.7, 1e-9, 42.0])
        );
    }

    #[cfg(unix)]
    #[test]
    fn json_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("identities.json");
        write_store_file(&path, &[]).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn legacy_keyed_layout_is_read_in_file_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users_data.json");
        fs::write(
            &path,
            r#"{
                "user_2_9876": {"name": "Zoe", "face_encoding": [0.5, 0.5], "registered_at": "2024-05-01T12:00:00", "login_count": 3},
                "user_1_1234": {"name": "Ana", "face_encoding": [0.1, 0.2], "registered_at": "2024-04-30T08:00:00", "last_logout": "2024-05-02T09:30:00"}
            }"#,
        )
        .unwrap();

        let records = read_store_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "user_2_9876");
        assert_eq!(records[0].login_count, 3);
        assert_eq!(records[1].name, "Ana");
        assert!(records[1].last_logout.is_some());
        assert_eq!(
            records[1].registered_at,
            parse_timestamp("2024-04-30T08:00:00Z").unwrap()
        );
    }

    #[test]
    fn corrupt_or_missing_file_yields_empty_store() {
        let tmp = TempDir::new().unwrap();
        let missing = IdentityStore::open(JsonFileBackend::new(tmp.path().join("none.json")));
        assert!(missing.is_empty());

        let path = tmp.path().join("corrupt.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            read_store_file(&path),
            Err(FaceError::InvalidStoreFile { .. })
        ));
        let corrupt = IdentityStore::open(JsonFileBackend::new(&path));
        assert!(corrupt.is_empty());
    }

    #[test]
    fn unreadable_record_is_skipped_not_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("identities.json");
        let ana = identity("user_1_aaaa0000", "Ana", vec![1.0, 1.0]).to_stored();
        let mut entries = vec![serde_json::to_value(&ana).unwrap()];
        let mut ghost = entries[0].clone();
        ghost["id"] = "user_2_bbbb0000".into();
        ghost["signature"] = serde_json::json!([null, 9.0]);
        entries.push(ghost);
        fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let records = read_store_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "user_1_aaaa0000");

        let store = IdentityStore::open(JsonFileBackend::new(&path));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("user_1_aaaa0000").unwrap().name, "Ana");
    }

    #[test]
    fn unreadable_legacy_record_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users_data.json");
        fs::write(
            &path,
            r#"{
                "user_1_1234": {"name": "Ana", "face_encoding": [0.1, 0.2]},
                "user_2_5678": {"name": "Ghost", "face_encoding": [null, 0.2]},
                "user_3_9abc": {"face_encoding": [0.3, 0.4]}
            }"#,
        )
        .unwrap();

        let records = read_store_file(&path).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["user_1_1234"]);
    }

    #[test]
    fn wrong_top_level_shape_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("identities.json");
        fs::write(&path, "42").unwrap();
        assert!(matches!(
            read_store_file(&path),
            Err(FaceError::InvalidStoreFile { .. })
        ));
    }

    #[test]
    fn save_failure_keeps_in_memory_change() {
        let store = IdentityStore::open(FailingBackend);
        store.put(identity("a", "Ana", vec![0.0, 1.0]));
        assert_eq!(store.len(), 1);
        assert!(store.persist().is_err());
    }

    #[test]
    fn reload_skips_records_with_other_dimensions() {
        let good = identity("a", "Ana", vec![0.0, 1.0]).to_stored();
        let odd = identity("b", "Bo", vec![0.0, 1.0, 2.0]).to_stored();
        let store = IdentityStore::open(MemoryBackend::with_records(vec![good, odd]));
        assert_eq!(store.len(), 1);
        assert!(store.get("b").is_err());
    }

    #[test]
    fn delete_twice_reports_not_found() {
        let backend = Arc::new(MemoryBackend::default());
        let store = IdentityStore::open(Arc::clone(&backend));
        store.put(identity("a", "Ana", vec![0.0]));

        assert_eq!(store.delete("a").unwrap().name, "Ana");
        assert!(matches!(store.get("a"), Err(FaceError::NotFound(_))));
        assert!(matches!(store.delete("a"), Err(FaceError::NotFound(_))));
        assert!(backend.snapshot().is_empty());
    }

    #[test]
    fn put_overwrites_in_place() {
        let store = IdentityStore::open(MemoryBackend::default());
        store.put(identity("a", "Ana", vec![0.0]));
        store.put(identity("b", "Bo", vec![1.0]));
        store.put(identity("a", "Ana Maria", vec![0.0]));

        let names: Vec<String> = store.all().map(|i| i.name).collect();
        assert_eq!(names, vec!["Ana Maria", "Bo"]);
    }

    #[test]
    fn update_missing_is_not_found_and_does_not_save() {
        let backend = Arc::new(MemoryBackend::default());
        let store = IdentityStore::open(Arc::clone(&backend));
        let err = store.update("ghost", |i| i.login_count += 1).unwrap_err();
        assert!(matches!(err, FaceError::NotFound(_)));
        assert_eq!(backend.save_count(), 0);
    }

    #[test]
    fn update_writes_back() {
        let backend = Arc::new(MemoryBackend::default());
        let store = IdentityStore::open(Arc::clone(&backend));
        store.put(identity("a", "Ana", vec![0.0]));
        let updated = store.update("a", |i| i.login_count += 5).unwrap();
        assert_eq!(updated.login_count, 5);
        assert_eq!(backend.snapshot()[0].login_count, 5);
    }

    #[test]
    fn ids_stay_unique_after_delete() {
        let store = IdentityStore::open(MemoryBackend::default());
        let first = store.exclusive(|ledger| Ok(ledger.next_id())).unwrap();
        store.put(identity(&first, "Ana", vec![0.0]));
        store.delete(&first).unwrap();
        let second = store.exclusive(|ledger| Ok(ledger.next_id())).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn snapshot_is_stable() {
        let store = IdentityStore::open(MemoryBackend::default());
        store.put(identity("a", "Ana", vec![0.0]));
        let snapshot = store.all();
        store.put(identity("b", "Bo", vec![1.0]));
        assert_eq!(snapshot.count(), 1);
    }
}
