//! Student record persistence.
//!
//! One JSON file per student under `<state_dir>/students/`, with an
//! in-memory cache in front. The public surface never fails: loads degrade
//! to a fresh record and saves are logged on error, so a broken disk costs
//! history but never a turn. An id that cannot safely name a file degrades
//! the same way; it is never folded to a nearby name. There is no per-user
//! locking; two concurrent turns for the same student can lose an update
//! (last writer wins).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::tutor::state::{now_millis, StudentRecord};

/// Error types for store operations. Internal only; the trait surface
/// swallows these after logging.
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StateStoreError {
    fn from(err: std::io::Error) -> Self {
        StateStoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StateStoreError {
    fn from(err: serde_json::Error) -> Self {
        StateStoreError::Serialization(err.to_string())
    }
}

/// Best-effort persistence for student records.
pub trait StateStore: Send + Sync {
    /// The stored record for a user, or a fresh default when the record is
    /// missing or unreadable. The default is not persisted.
    fn load(&self, user_id: &str) -> StudentRecord;

    /// Stamp `updated_at` and upsert the full record. Storage failures are
    /// logged and swallowed.
    fn save(&self, record: &mut StudentRecord);
}

/// File-backed [`StateStore`] with a read-through cache.
pub struct FileStateStore {
    /// Directory holding the per-student JSON files
    records_dir: PathBuf,
    /// Records already seen this process, by user id
    cache: RwLock<HashMap<String, StudentRecord>>,
}

impl FileStateStore {
    /// Store rooted at the configured state directory.
    pub fn new() -> Self {
        Self::with_base_dir(crate::config::get_state_dir())
    }

    /// Store rooted at a specific state directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            records_dir: base_dir.join("students"),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn record_path(&self, user_id: &str) -> Result<PathBuf, StateStoreError> {
        if !is_valid_user_id(user_id) {
            return Err(StateStoreError::InvalidUserId(user_id.to_string()));
        }
        Ok(self.records_dir.join(format!("{}.json", user_id)))
    }

    fn load_from_disk(&self, user_id: &str) -> Result<Option<StudentRecord>, StateStoreError> {
        let path = self.record_path(user_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let record: StudentRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    fn write_to_disk(&self, record: &StudentRecord) -> Result<(), StateStoreError> {
        let path = self.record_path(&record.user_id)?;
        if !self.records_dir.exists() {
            fs::create_dir_all(&self.records_dir)?;
        }

        // Write to a temp file first, then rename into place
        let temp_path = path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, record)?;
        }
        fs::rename(&temp_path, &path)?;

        Ok(())
    }
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for FileStateStore {
    fn load(&self, user_id: &str) -> StudentRecord {
        if let Some(cached) = self.cache.read().get(user_id) {
            return cached.clone();
        }

        match self.load_from_disk(user_id) {
            Ok(Some(record)) => {
                debug!(target: "store", user_id = %user_id, "record loaded from disk");
                self.cache
                    .write()
                    .insert(user_id.to_string(), record.clone());
                record
            }
            Ok(None) => StudentRecord::new(user_id),
            Err(err) => {
                warn!(
                    target: "store",
                    user_id = %user_id,
                    error = %err,
                    "load failed, starting from a fresh record"
                );
                StudentRecord::new(user_id)
            }
        }
    }

    fn save(&self, record: &mut StudentRecord) {
        record.updated_at = now_millis();

        // Cache first so the conversation stays coherent in-process even
        // when the disk write fails.
        self.cache
            .write()
            .insert(record.user_id.clone(), record.clone());

        if let Err(err) = self.write_to_disk(record) {
            warn!(
                target: "store",
                user_id = %record.user_id,
                error = %err,
                "save failed, record kept in memory only"
            );
        }
    }
}

/// Whether a user id can be used verbatim as a file name. Valid ids are
/// non-empty and made of ASCII alphanumerics plus `-`, `_` and `.` (a
/// dots-only name does not count). Invalid ids are rejected outright;
/// stripping the offending characters would let two distinct ids share a
/// record file.
fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !user_id.chars().all(|c| c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::state::DialogueMode;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStateStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStateStore::with_base_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_load_missing_returns_default() {
        let (store, temp_dir) = create_test_store();

        let record = store.load("alice");
        assert_eq!(record.user_id, "alice");
        assert_eq!(record.mode, DialogueMode::Idle);

        // The default is not persisted
        assert!(!temp_dir.path().join("students").join("alice.json").exists());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (store, temp_dir) = create_test_store();

        let mut record = StudentRecord::new("alice");
        record.log_user("quiz me");
        record
            .mastery
            .insert("Geometry".to_string(), "2/3".to_string());
        store.save(&mut record);

        assert!(record.updated_at >= record.created_at);
        assert!(temp_dir.path().join("students").join("alice.json").exists());

        // A fresh store instance reads it back from disk
        let reopened = FileStateStore::with_base_dir(temp_dir.path().to_path_buf());
        let loaded = reopened.load("alice");
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_cache_survives_disk_corruption() {
        let (store, temp_dir) = create_test_store();

        let mut record = StudentRecord::new("alice");
        record.log_user("hello");
        store.save(&mut record);

        let path = temp_dir.path().join("students").join("alice.json");
        fs::write(&path, "{ this is not json").unwrap();

        // Cached copy still served
        let loaded = store.load("alice");
        assert_eq!(loaded.session_log.len(), 1);
    }

    #[test]
    fn test_corrupt_file_degrades_to_default() {
        let (store, temp_dir) = create_test_store();

        let dir = temp_dir.path().join("students");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bob.json"), "{ this is not json").unwrap();

        let record = store.load("bob");
        assert_eq!(record.user_id, "bob");
        assert!(record.session_log.is_empty());
    }

    #[test]
    fn test_traversal_ids_are_rejected() {
        let (store, temp_dir) = create_test_store();

        let mut record = StudentRecord::new("../../etc/passwd");
        store.save(&mut record);

        // Nothing written, inside or outside the store dir
        let students = temp_dir.path().join("students");
        assert!(!students.exists() || fs::read_dir(&students).unwrap().next().is_none());
        assert!(!temp_dir.path().join("passwd.json").exists());
    }

    #[test]
    fn test_unusable_id_is_rejected() {
        let (store, temp_dir) = create_test_store();

        let mut record = StudentRecord::new("///");
        store.save(&mut record);

        // Nothing written, and loading still degrades to a default
        let students = temp_dir.path().join("students");
        assert!(!students.exists() || fs::read_dir(&students).unwrap().next().is_none());
        assert_eq!(store.load("///").user_id, "///");
    }

    #[test]
    fn test_invalid_id_cannot_touch_another_students_file() {
        let (store, temp_dir) = create_test_store();

        let mut record = StudentRecord::new("bob");
        record.log_user("hello");
        store.save(&mut record);

        // "bob!" is not bob: it loads fresh, and saving it leaves bob.json alone
        let mut other = store.load("bob!");
        assert!(other.session_log.is_empty());
        other.log_user("I am someone else");
        store.save(&mut other);

        let reopened = FileStateStore::with_base_dir(temp_dir.path().to_path_buf());
        let bob = reopened.load("bob");
        assert_eq!(bob.session_log.len(), 1);
        assert_eq!(bob.session_log[0].text, "hello");
    }

    #[test]
    fn test_user_id_validation() {
        assert!(is_valid_user_id("alice"));
        assert!(is_valid_user_id("user_42-x.test"));
        assert!(is_valid_user_id("..hidden"));
        assert!(!is_valid_user_id(""));
        assert!(!is_valid_user_id(".."));
        assert!(!is_valid_user_id("bob!"));
        assert!(!is_valid_user_id("user 42"));
        assert!(!is_valid_user_id("user_42社"));
    }

    #[test]
    fn test_save_stamps_updated_at() {
        let (store, _temp_dir) = create_test_store();

        let mut record = StudentRecord::new("alice");
        let created = record.created_at;
        store.save(&mut record);

        assert!(record.updated_at >= created);
    }
}
