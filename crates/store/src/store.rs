use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde_json::Value;
use uuid::Uuid;

use annolake_predicate::{compile, matches, Expr};

use crate::annotation::Annotation;
use crate::bridge::register_functions;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// SQLite-backed annotation store.
///
/// Keeps one `annotations` table with a JSON-encoded properties column.
/// Predicates run either compiled to SQL (`query`) or in process over the
/// decoded properties (`query_native`); both see the same records and
/// must agree on every predicate.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    column: String,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let config = StoreConfig {
            database_path: Some(path.as_ref().to_path_buf()),
            ..StoreConfig::default()
        };
        Self::from_config(&config)
    }

    /// Open an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_config(&StoreConfig::default())
    }

    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let column = config.properties_column.clone();
        if !is_identifier(&column) {
            return Err(StoreError::Config(format!(
                "'{column}' is not a valid properties column name"
            )));
        }

        let conn = match &config.database_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        register_functions(&conn)?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS annotations (
                     id TEXT PRIMARY KEY,
                     {column} TEXT NOT NULL,
                     created_at TEXT NOT NULL
                 )"
            ),
            [],
        )?;

        tracing::info!(
            path = %config
                .database_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ":memory:".to_string()),
            column,
            "opened annotation store"
        );
        Ok(Self { conn, column })
    }

    /// The underlying connection, for collaborators that combine the
    /// predicate fragment with their own query text.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The name of the properties column compiled predicates target.
    pub fn properties_column(&self) -> &str {
        &self.column
    }

    /// Insert a record under a fresh key and return it.
    pub fn append(&self, properties: &Value) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.append_with_id(&id, properties)?;
        Ok(id)
    }

    /// Insert a record under a caller-chosen key.
    pub fn append_with_id(&self, id: &str, properties: &Value) -> StoreResult<()> {
        self.conn.execute(
            &format!("INSERT INTO annotations (id, {}, created_at) VALUES (?1, ?2, ?3)", self.column),
            params![
                id,
                serde_json::to_string(properties)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Insert many records in one transaction, returning their keys.
    pub fn append_many<'a>(
        &mut self,
        properties: impl IntoIterator<Item = &'a Value>,
    ) -> StoreResult<Vec<String>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::new();
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO annotations (id, {}, created_at) VALUES (?1, ?2, ?3)",
                self.column
            ))?;
            for props in properties {
                let id = Uuid::new_v4().to_string();
                stmt.execute(params![
                    id,
                    serde_json::to_string(props)?,
                    Utc::now().to_rfc3339(),
                ])?;
                ids.push(id);
            }
        }
        tx.commit()?;
        tracing::debug!(count = ids.len(), "appended annotations");
        Ok(ids)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Annotation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, {}, created_at FROM annotations WHERE id = ?1",
            self.column
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }

    /// Replace a record's properties.
    pub fn update_properties(&self, id: &str, properties: &Value) -> StoreResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE annotations SET {} = ?2 WHERE id = ?1", self.column),
            params![id, serde_json::to_string(properties)?],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn remove(&self, id: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM annotations WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM annotations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM annotations ORDER BY id")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Run a predicate compiled to SQL over the properties column.
    pub fn query(&self, predicate: &Expr) -> StoreResult<Vec<Annotation>> {
        let fragment = compile(predicate, &self.column)?;
        tracing::debug!(fragment, "querying with compiled predicate");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, {}, created_at FROM annotations WHERE {fragment} ORDER BY id",
            self.column
        ))?;
        let mut rows = stmt.query([])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(decode_row(row)?);
        }
        Ok(results)
    }

    /// Run the same predicate in process, decoding each record's
    /// properties and evaluating natively.
    pub fn query_native(&self, predicate: &Expr) -> StoreResult<Vec<Annotation>> {
        let mut results = Vec::new();
        for annotation in self.scan()? {
            if matches(predicate, &annotation.properties)? {
                results.push(annotation);
            }
        }
        Ok(results)
    }

    /// Scan with a caller-supplied filter over decoded properties.
    pub fn query_fn(&self, predicate: impl Fn(&Value) -> bool) -> StoreResult<Vec<Annotation>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|a| predicate(&a.properties))
            .collect())
    }

    fn scan(&self) -> StoreResult<Vec<Annotation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, {}, created_at FROM annotations ORDER BY id",
            self.column
        ))?;
        let mut rows = stmt.query([])?;
        let mut annotations = Vec::new();
        while let Some(row) = rows.next()? {
            annotations.push(decode_row(row)?);
        }
        Ok(annotations)
    }
}

fn decode_row(row: &Row<'_>) -> StoreResult<Annotation> {
    let id: String = row.get(0)?;
    let properties: String = row.get(1)?;
    let created_at: String = row.get(2)?;
    Ok(Annotation {
        id,
        properties: serde_json::from_str(&properties)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
