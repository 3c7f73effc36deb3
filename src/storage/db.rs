//! DbStorage - SQLite Backend
//!
//! Each entity kind maps to a table (see [`super::schema`]). Writes are staged
//! in a session and only reach the database on `save()`, inside a single
//! transaction. Reads see committed rows overlaid with the session, so an
//! object added with `new()` is visible before it is saved.
//!
//! Connections are opened per call; the session is the only state held
//! between calls.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Transaction};
use serde_json::{Map, Value};

use super::backend::{class_filter, key_matches, key_of, Objects, RegistryKey, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{self, LinkTable, Table, TABLES};
use crate::config::BackendKind;
use crate::models::Model;

/// SQLite-backed storage with a staged write session.
#[derive(Debug)]
pub struct DbStorage {
    db_path: PathBuf,
    /// Objects added since the last commit, keyed by `"Type.id"`
    staged: Objects,
    /// Objects deleted since the last commit
    deleted: BTreeMap<String, RegistryKey>,
}

impl DbStorage {
    /// Open (creating if needed) the database at `path`.
    ///
    /// With `reset_database` every table is dropped first. Tables are
    /// (re)created by `reload()`.
    ///
    /// # Errors
    /// Fails if the database cannot be opened or the drop fails.
    pub fn connect(path: impl Into<PathBuf>, reset_database: bool) -> StorageResult<Self> {
        let storage = Self {
            db_path: path.into(),
            staged: Objects::new(),
            deleted: BTreeMap::new(),
        };

        if let Some(parent) = storage.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let conn = storage.open()?;
        if reset_database {
            conn.execute_batch(&schema::drop_all_sql())?;
            tracing::info!(path = %storage.db_path.display(), "Dropped all tables");
        }

        tracing::info!(path = %storage.db_path.display(), "Connected to database");
        Ok(storage)
    }

    /// Database file location.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Whether the session holds uncommitted changes.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        !self.staged.is_empty() || !self.deleted.is_empty()
    }

    fn open(&self) -> StorageResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    fn discard_session(&mut self) {
        self.staged.clear();
        self.deleted.clear();
    }

    /// Committed rows of `table`, all of them or the one with `id`.
    fn load(&self, conn: &Connection, table: &Table, id: Option<&str>) -> StorageResult<Vec<Model>> {
        let names: Vec<&'static str> = table.all_columns().map(|c| c.name).collect();
        let mut sql = format!("SELECT {} FROM {}", names.join(", "), table.name);
        if id.is_some() {
            sql.push_str(" WHERE id = ?1");
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(id.iter()), |row| {
            let mut dict = Map::new();
            for (i, name) in names.iter().enumerate() {
                if let Some(value) = sql_to_json(row.get_ref(i)?) {
                    dict.insert((*name).to_string(), value);
                }
            }
            Ok(dict)
        })?;

        let mut dicts = Vec::new();
        for row in rows {
            dicts.push(row?);
        }

        for link in schema::links_for(table.kind) {
            let mut linked = load_links(conn, link, id)?;
            for dict in &mut dicts {
                let owner = dict.get("id").and_then(Value::as_str).unwrap_or_default();
                let ids = linked.remove(owner).unwrap_or_default();
                dict.insert(
                    link.field.to_string(),
                    Value::Array(ids.into_iter().map(Value::String).collect()),
                );
            }
        }

        dicts
            .into_iter()
            .map(|dict| Model::from_kind_dict(table.kind, dict))
            .collect()
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn sql_to_json(value: ValueRef<'_>) -> Option<Value> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(Value::from(i)),
        ValueRef::Real(f) => Some(Value::from(f)),
        ValueRef::Text(bytes) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

fn json_to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

/// Owner id to linked ids, in insertion order.
fn load_links(
    conn: &Connection,
    link: &LinkTable,
    owner_id: Option<&str>,
) -> StorageResult<BTreeMap<String, Vec<String>>> {
    let mut sql = format!(
        "SELECT {}, {} FROM {}",
        link.owner_column, link.target_column, link.name
    );
    if owner_id.is_some() {
        sql.push_str(&format!(" WHERE {} = ?1", link.owner_column));
    }
    sql.push_str(" ORDER BY rowid");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(owner_id.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut links: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        let (owner, target) = row?;
        links.entry(owner).or_default().push(target);
    }
    Ok(links)
}

fn upsert(tx: &Transaction<'_>, table: &Table, obj: &Model) -> rusqlite::Result<()> {
    let dict = obj.to_dict();
    let names: Vec<&'static str> = table.all_columns().map(|c| c.name).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    let updates: Vec<String> = names
        .iter()
        .filter(|name| **name != "id")
        .map(|name| format!("{name} = excluded.{name}"))
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        table.name,
        names.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    );
    let values: Vec<SqlValue> = names.iter().map(|name| json_to_sql(dict.get(*name))).collect();
    tx.execute(&sql, params_from_iter(values.iter()))?;

    for link in schema::links_for(table.kind) {
        tx.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", link.name, link.owner_column),
            params![obj.id()],
        )?;
        let targets = dict
            .get(link.field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for target in targets.iter().filter_map(Value::as_str) {
            tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
                    link.name, link.owner_column, link.target_column
                ),
                params![obj.id(), target],
            )?;
        }
    }
    Ok(())
}

// =============================================================================
// StorageBackend
// =============================================================================

impl StorageBackend for DbStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Db
    }

    fn all(&self, cls: Option<&str>) -> StorageResult<Objects> {
        let cls = class_filter(cls);
        let tables: Vec<&Table> = match cls {
            None => TABLES.iter().collect(),
            Some(name) => match schema::table_for_class(name) {
                Some(table) => vec![table],
                None => return Ok(Objects::new()),
            },
        };

        let conn = self.open()?;
        let mut objects = Objects::new();
        for table in tables {
            for obj in self.load(&conn, table, None)? {
                let key = obj.key().to_string();
                if !self.deleted.contains_key(&key) {
                    objects.insert(key, obj);
                }
            }
        }
        for (key, obj) in &self.staged {
            if key_matches(key, cls) {
                objects.insert(key.clone(), obj.clone());
            }
        }
        Ok(objects)
    }

    fn new(&mut self, obj: Model) -> StorageResult<()> {
        if schema::table_for(obj.kind()).is_none() {
            return Err(StorageError::Unmapped(obj.kind()));
        }
        let key = key_of(&obj)?;
        tracing::debug!(class = %key.kind, id = %key.id, "Staged object");
        let key = key.to_string();
        self.deleted.remove(&key);
        self.staged.insert(key, obj);
        Ok(())
    }

    fn save(&mut self) -> StorageResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        for key in self.deleted.values() {
            if let Some(table) = schema::table_for(key.kind) {
                tx.execute(
                    &format!("DELETE FROM {} WHERE id = ?1", table.name),
                    params![key.id],
                )
                .map_err(StorageError::from_commit)?;
            }
        }
        for obj in self.staged.values() {
            let table = schema::table_for(obj.kind()).ok_or(StorageError::Unmapped(obj.kind()))?;
            upsert(&tx, table, obj).map_err(StorageError::from_commit)?;
        }
        tx.commit().map_err(StorageError::from_commit)?;

        tracing::info!(
            path = %self.db_path.display(),
            upserted = self.staged.len(),
            deleted = self.deleted.len(),
            "Committed session"
        );
        self.discard_session();
        Ok(())
    }

    fn reload(&mut self) -> StorageResult<()> {
        let conn = self.open()?;
        conn.execute_batch(&schema::create_all_sql())?;
        self.discard_session();
        tracing::debug!(path = %self.db_path.display(), "Schema ready, new session");
        Ok(())
    }

    fn delete(&mut self, obj: Option<&Model>) -> StorageResult<()> {
        let Some(obj) = obj else {
            return Ok(());
        };
        if schema::table_for(obj.kind()).is_none() || obj.id().is_empty() {
            return Ok(());
        }
        let key = obj.key();
        let raw = key.to_string();
        tracing::debug!(class = %key.kind, id = %key.id, "Staged deletion");
        self.staged.remove(&raw);
        self.deleted.insert(raw, key);
        Ok(())
    }

    fn get(&self, cls: &str, id: &str) -> StorageResult<Option<Model>> {
        let Some(table) = schema::table_for_class(cls) else {
            return Ok(None);
        };
        let key = format!("{cls}.{id}");
        if self.deleted.contains_key(&key) {
            return Ok(None);
        }
        if let Some(obj) = self.staged.get(&key) {
            return Ok(Some(obj.clone()));
        }

        let conn = self.open()?;
        Ok(self.load(&conn, table, Some(id))?.into_iter().next())
    }

    fn close(&mut self) -> StorageResult<()> {
        if self.has_pending_changes() {
            tracing::debug!(
                staged = self.staged.len(),
                deleted = self.deleted.len(),
                "Discarding uncommitted session"
            );
        }
        self.discard_session();
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
