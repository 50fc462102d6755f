use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::config::StorageOptions;
use crate::journal::{BackendError, KeyValueBackend};

mod schema;

/// Persistent key-value backend on a single SQLite table.
///
/// A connection is opened per operation; any SQLite failure surfaces as
/// [`BackendError::Unavailable`].
#[derive(Clone)]
pub struct SqliteBackend {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteBackend {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT key FROM kv_store ORDER BY key")
                .context("preparing key listing")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(keys)
        })
    }
}

impl KeyValueBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("reading key {key}"))
        })
        .map_err(unavailable)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("writing key {key}"))?;
            Ok(())
        })
        .map_err(unavailable)
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
                .with_context(|| format!("removing key {key}"))?;
            Ok(())
        })
        .map_err(unavailable)
    }
}

fn unavailable(err: anyhow::Error) -> BackendError {
    BackendError::unavailable(format!("{err:#}"))
}

pub fn init(storage: &StorageOptions) -> Result<SqliteBackend> {
    let db_path = &storage.database_path;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "key-value store ready");
    Ok(SqliteBackend {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

/// Handle onto a database whose initialisation failed. Every operation goes
/// back to SQLite and reports [`BackendError::Unavailable`] until the file
/// becomes usable.
pub fn detached(storage: &StorageOptions) -> SqliteBackend {
    SqliteBackend {
        db_path: Arc::new(storage.database_path.clone()),
        options: Arc::new(storage.clone()),
    }
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    conn.busy_timeout(std::time::Duration::from_millis(storage.busy_timeout_ms))
        .context("setting busy timeout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JournalStore, ENTRIES_KEY};
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn storage_options(root: &TempDir) -> StorageOptions {
        let mut options = StorageOptions::default();
        options.database_path = root.path().join("data").join("mindmend.db");
        options
    }

    fn init_backend() -> anyhow::Result<(TempDir, SqliteBackend)> {
        let temp = TempDir::new()?;
        let opts = storage_options(&temp);
        let backend = init(&opts)?;
        Ok((temp, backend))
    }

    #[test]
    fn set_get_remove_round_trip() -> anyhow::Result<()> {
        let (_temp, backend) = init_backend()?;
        assert_eq!(backend.get("missing")?, None);

        backend.set("k", "one")?;
        backend.set("k", "two")?;
        assert_eq!(backend.get("k")?.as_deref(), Some("two"));

        backend.remove("k")?;
        backend.remove("k")?;
        assert_eq!(backend.get("k")?, None);
        Ok(())
    }

    #[test]
    fn journal_survives_reopen() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let opts = storage_options(&temp);
        {
            let mut store = JournalStore::new(init(&opts)?);
            store.append("before restart");
            store.append("Mood: calm");
        }

        let store = JournalStore::new(init(&opts)?);
        let texts: Vec<_> = store.list().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["Mood: calm", "before restart"]);
        Ok(())
    }

    #[test]
    fn clear_deletes_row_and_probe_leaves_nothing() -> anyhow::Result<()> {
        let (_temp, backend) = init_backend()?;
        let mut store = JournalStore::new(backend.clone());
        store.append("x");
        assert!(store.probe_availability());
        assert_eq!(backend.keys()?, vec![ENTRIES_KEY.to_string()]);

        store.clear();
        assert!(backend.keys()?.is_empty());
        assert!(store.list().is_empty());
        Ok(())
    }

    #[test]
    fn unreachable_database_reports_unavailable() -> anyhow::Result<()> {
        let (temp, backend) = init_backend()?;
        let mut opts = (*backend.options).clone();
        opts.database_path = temp.path().join("no-such-dir").join("x.db");
        let broken = detached(&opts);
        assert_matches!(broken.get(ENTRIES_KEY), Err(BackendError::Unavailable { .. }));

        let store = JournalStore::new(broken);
        assert!(!store.probe_availability());
        assert!(store.list().is_empty());
        Ok(())
    }
}
