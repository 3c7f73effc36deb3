//! FileStorage - JSON File Backend
//!
//! All live objects sit in an in-memory registry keyed by `"Type.id"`.
//! `save()` is the single flush point: the whole registry is written as one
//! JSON object (temp file in the same directory, then renamed over the
//! target, so readers never see a partial file).
//! Objects added with `new()` but never saved are lost on restart.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use super::backend::{class_filter, key_matches, key_of, Objects, StorageBackend};
use super::error::{StorageError, StorageResult};
use crate::config::BackendKind;
use crate::models::{Model, CLASS_FIELD};

/// File-backed registry.
#[derive(Debug)]
pub struct FileStorage {
    /// Durable JSON file
    path: PathBuf,
    /// Live objects
    objects: Objects,
}

impl FileStorage {
    /// Empty registry persisting to `path`. Nothing is read until `reload()`.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: Objects::new(),
        }
    }

    /// Durable file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the live registry.
    #[must_use]
    pub fn objects(&self) -> &Objects {
        &self.objects
    }

    fn read_store(&self) -> StorageResult<Option<Map<String, Value>>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(other) => Err(StorageError::malformed(
                &self.path,
                format!("top level must be an object, found {}", json_type(&other)),
            )),
            Err(e) => Err(StorageError::malformed(&self.path, e.to_string())),
        }
    }

    fn write_store(&self, bytes: &[u8]) -> StorageResult<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
                parent
            }
            None => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        tmp.write_all(bytes)
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StorageError::io(&self.path, e.error))?;
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl StorageBackend for FileStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn all(&self, cls: Option<&str>) -> StorageResult<Objects> {
        let cls = class_filter(cls);
        Ok(self
            .objects
            .iter()
            .filter(|(key, _)| key_matches(key, cls))
            .map(|(key, obj)| (key.clone(), obj.clone()))
            .collect())
    }

    fn new(&mut self, obj: Model) -> StorageResult<()> {
        let key = key_of(&obj)?;
        tracing::debug!(class = %key.kind, id = %key.id, "Registered object");
        self.objects.insert(key.to_string(), obj);
        Ok(())
    }

    fn save(&mut self) -> StorageResult<()> {
        let store: Map<String, Value> = self
            .objects
            .iter()
            .map(|(key, obj)| (key.clone(), Value::Object(obj.to_dict())))
            .collect();
        let bytes = serde_json::to_vec(&Value::Object(store))?;
        self.write_store(&bytes)?;

        tracing::info!(
            path = %self.path.display(),
            objects = self.objects.len(),
            "Saved object store"
        );
        Ok(())
    }

    fn reload(&mut self) -> StorageResult<()> {
        let Some(store) = self.read_store()? else {
            tracing::debug!(path = %self.path.display(), "Object store not found, starting empty");
            return Ok(());
        };

        let mut loaded = 0usize;
        for (key, value) in store {
            let Value::Object(dict) = value else {
                return Err(StorageError::malformed(
                    &self.path,
                    format!("entry {key} is not an object"),
                ));
            };
            if !dict.contains_key(CLASS_FIELD) {
                return Err(StorageError::malformed(
                    &self.path,
                    format!("entry {key} has no {CLASS_FIELD}"),
                ));
            }
            let obj = match Model::from_dict(dict) {
                Ok(obj) => obj,
                Err(StorageError::Serialization(e)) => {
                    return Err(StorageError::malformed(
                        &self.path,
                        format!("entry {key}: {e}"),
                    ));
                }
                Err(e) => return Err(e),
            };
            let actual = obj.key().to_string();
            if actual != key {
                return Err(StorageError::malformed(
                    &self.path,
                    format!("entry {key} holds {actual}"),
                ));
            }
            self.objects.insert(key, obj);
            loaded += 1;
        }

        tracing::info!(
            path = %self.path.display(),
            objects = loaded,
            "Loaded object store"
        );
        Ok(())
    }

    fn delete(&mut self, obj: Option<&Model>) -> StorageResult<()> {
        if let Some(obj) = obj.filter(|o| !o.id().is_empty()) {
            if self.objects.remove(&obj.key().to_string()).is_some() {
                tracing::debug!(class = %obj.kind(), id = %obj.id(), "Deleted object");
            }
        }
        Ok(())
    }

    fn get(&self, cls: &str, id: &str) -> StorageResult<Option<Model>> {
        Ok(self.objects.get(&format!("{cls}.{id}")).cloned())
    }

    fn count(&self, cls: Option<&str>) -> StorageResult<usize> {
        let cls = class_filter(cls);
        Ok(self.objects.keys().filter(|key| key_matches(key, cls)).count())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.reload()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseModel, Entity, State, User};
    use tempfile::tempdir;

    #[test]
    fn test_new_registers_under_type_dot_id() {
        let mut storage = FileStorage::with_path("unused.json");
        let model = BaseModel::new();
        storage.new(model.clone().into()).unwrap();

        let key = format!("BaseModel.{}", model.id);
        assert!(storage.objects().contains_key(&key));
        assert_eq!(storage.objects()[&key].kind(), crate::models::EntityKind::BaseModel);
    }

    #[test]
    fn test_new_twice_overwrites() {
        let mut storage = FileStorage::with_path("unused.json");
        let mut state = State::new("Texas");
        storage.new(state.clone().into()).unwrap();
        state.name = Some("Nevada".to_string());
        storage.new(state.clone().into()).unwrap();

        assert_eq!(storage.count(None).unwrap(), 1);
        let back: State = storage.get("State", state.id()).unwrap().unwrap().downcast().unwrap();
        assert_eq!(back.name.as_deref(), Some("Nevada"));
    }

    #[test]
    fn test_save_creates_json_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let mut storage = FileStorage::with_path(&path);
        storage.save().unwrap();

        let content: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert!(content.is_object());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_leaves_sibling_tmp_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        let sibling = dir.path().join("file.tmp");
        fs::write(&sibling, "keep me").unwrap();

        let mut storage = FileStorage::with_path(&path);
        storage.new(State::new("Iowa").into()).unwrap();
        storage.save().unwrap();

        assert_eq!(fs::read_to_string(&sibling).unwrap(), "keep me");
    }

    #[test]
    fn test_save_to_tmp_extension_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("objects.tmp");
        let state = State::new("Idaho");

        let mut storage = FileStorage::with_path(&path);
        storage.new(state.clone().into()).unwrap();
        storage.save().unwrap();

        let mut reader = FileStorage::with_path(&path);
        reader.reload().unwrap();
        assert!(reader.get("State", state.id()).unwrap().is_some());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/file.json");
        let mut storage = FileStorage::with_path(&path);
        storage.new(State::new("Iowa").into()).unwrap();
        storage.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reload_without_file_is_noop() {
        let dir = tempdir().unwrap();
        let mut storage = FileStorage::with_path(dir.path().join("missing.json"));
        storage.reload().unwrap();
        assert!(storage.objects().is_empty());
    }

    #[test]
    fn test_reload_merges_into_live_registry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");

        let mut writer = FileStorage::with_path(&path);
        let saved = State::new("Maine");
        writer.new(saved.clone().into()).unwrap();
        writer.save().unwrap();

        let mut reader = FileStorage::with_path(&path);
        let pending = User::new("pending@hbnb.io");
        reader.new(pending.clone().into()).unwrap();
        reader.reload().unwrap();

        assert!(reader.get("State", saved.id()).unwrap().is_some());
        assert!(reader.get("User", pending.id()).unwrap().is_some());
    }

    #[test]
    fn test_reload_rejects_non_object_top_level() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let mut storage = FileStorage::with_path(&path);
        match storage.reload() {
            Err(StorageError::Malformed { reason, .. }) => assert!(reason.contains("array")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_reload_rejects_entry_without_class() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        fs::write(&path, r#"{"State.1": {"id": "1", "name": "Texas"}}"#).unwrap();

        let mut storage = FileStorage::with_path(&path);
        assert!(matches!(
            storage.reload(),
            Err(StorageError::Malformed { .. })
        ));
    }

    #[test]
    fn test_reload_rejects_empty_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        fs::write(&path, r#"{"State.x": {"__class__": "State", "id": ""}}"#).unwrap();

        let mut storage = FileStorage::with_path(&path);
        assert!(matches!(
            storage.reload(),
            Err(StorageError::Malformed { .. })
        ));
        assert!(storage.objects().is_empty());
    }

    #[test]
    fn test_reload_rejects_key_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.json");
        fs::write(&path, r#"{"State.abc": {"__class__": "User", "id": "xyz"}}"#).unwrap();

        let mut storage = FileStorage::with_path(&path);
        match storage.reload() {
            Err(StorageError::Malformed { reason, .. }) => assert!(reason.contains("User.xyz")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_new_rejects_empty_id() {
        let mut storage = FileStorage::with_path("unused.json");
        let mut base = BaseModel::new();
        base.id.clear();
        let model: Model = base.into();

        assert!(storage.new(model.clone()).unwrap_err().is_validation());
        storage.delete(Some(&model)).unwrap();
        assert!(storage.objects().is_empty());
    }

    #[test]
    fn test_get_unknown_is_none() {
        let storage = FileStorage::with_path("unused.json");
        assert!(storage.get("User", "test").unwrap().is_none());
        assert!(storage.get("test", "random").unwrap().is_none());
    }
}
