// Relational staging store for color table edits, one row per (Key, Key2).
use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::{clamp_values, ClutData, ClutKey};
use crate::error::{Error, Result};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS CharClut (
    Key INTEGER NOT NULL,
    Key2 INTEGER NOT NULL,
    CLUTData TEXT NOT NULL,
    PRIMARY KEY (Key, Key2)
)";

const UPSERT: &str = "INSERT INTO CharClut (Key, Key2, CLUTData) VALUES (?1, ?2, ?3)
    ON CONFLICT (Key, Key2) DO UPDATE SET CLUTData = excluded.CLUTData";

/// An open connection to the staging store. The connection holds the file
/// open until `release` (or drop); callers must release before replacing or
/// deleting the file.
#[derive(Debug)]
pub struct StagingStore {
    path: PathBuf,
    conn: Connection,
}

fn encode_row(values: &ClutData) -> Result<String> {
    Ok(serde_json::to_string(&values.to_vec())?)
}

fn decode_row(key: ClutKey, text: &str) -> Result<ClutData> {
    let values: Vec<i32> = serde_json::from_str(text)?;
    clamp_values(&values)
        .map_err(|e| Error::Format(format!("staged row {key} is malformed: {e}")))
}

impl StagingStore {
    /// Opens (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(StagingStore {
            path: path.to_path_buf(),
            conn,
        })
    }

    /// Opens the working store, first copying the bundled template store
    /// into place if no working store exists yet.
    pub fn open_or_seed(working: &Path, bundled: Option<&Path>) -> Result<Self> {
        if !working.exists() {
            if let Some(bundled) = bundled.filter(|p| p.exists()) {
                info!(
                    "Seeding staging store {} from {}",
                    working.display(),
                    bundled.display()
                );
                if let Some(parent) = working.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(bundled, working)?;
            }
        }
        Self::open(working)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn upsert(&self, key: ClutKey, values: &ClutData) -> Result<()> {
        debug!("staging color table entry {}", key);
        self.conn
            .execute(UPSERT, params![key.primary, key.secondary, encode_row(values)?])?;
        Ok(())
    }

    /// Upserts every entry in one transaction; nothing is stored if any fails.
    pub fn upsert_batch(&mut self, entries: &[(ClutKey, ClutData)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (key, values) in entries {
            debug!("staging color table entry {}", key);
            tx.execute(UPSERT, params![key.primary, key.secondary, encode_row(values)?])?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get(&self, key: ClutKey) -> Result<Option<ClutData>> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT CLUTData FROM CharClut WHERE Key = ?1 AND Key2 = ?2",
                params![key.primary, key.secondary],
                |row| row.get(0),
            )
            .optional()?;
        text.map(|t| decode_row(key, &t)).transpose()
    }

    pub fn entries(&self) -> Result<Vec<(ClutKey, ClutData)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT Key, Key2, CLUTData FROM CharClut ORDER BY Key, Key2")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut out = vec![];
        for row in rows {
            let (primary, secondary, text) = row?;
            let key = ClutKey::new(primary, secondary);
            out.push((key, decode_row(key, &text)?));
        }
        Ok(out)
    }

    /// Closes the connection, releasing the file.
    pub fn release(self) -> Result<()> {
        debug!("releasing staging store {}", self.path.display());
        self.conn.close().map_err(|(_, e)| Error::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(fill: u8) -> ClutData {
        [fill; 48]
    }

    #[test]
    fn upsert_replaces_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::open(&dir.path().join("clut.sqlite")).unwrap();
        let key = ClutKey::new(1, 0);
        store.upsert(key, &data(1)).unwrap();
        store.upsert(key, &data(2)).unwrap();
        assert_eq!(store.get(key).unwrap(), Some(data(2)));
        assert_eq!(store.entries().unwrap().len(), 1);
        assert_eq!(store.get(ClutKey::new(2, 0)).unwrap(), None);
    }

    #[test]
    fn rows_persist_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clut.sqlite");
        let mut store = StagingStore::open(&path).unwrap();
        store
            .upsert_batch(&[(ClutKey::new(3, 0), data(9)), (ClutKey::new(1, 0), data(4))])
            .unwrap();
        store.release().unwrap();

        let store = StagingStore::open(&path).unwrap();
        let keys: Vec<ClutKey> = store.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![ClutKey::new(1, 0), ClutKey::new(3, 0)]);
    }

    #[test]
    fn seeds_from_bundled_store_only_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join("bundled.sqlite");
        let seed = StagingStore::open(&bundled).unwrap();
        seed.upsert(ClutKey::new(254, 0), &data(7)).unwrap();
        seed.release().unwrap();

        let working = dir.path().join("user").join("clut.sqlite");
        let store = StagingStore::open_or_seed(&working, Some(&bundled)).unwrap();
        assert_eq!(store.get(ClutKey::new(254, 0)).unwrap(), Some(data(7)));
        store.upsert(ClutKey::new(254, 0), &data(8)).unwrap();
        store.release().unwrap();

        let store = StagingStore::open_or_seed(&working, Some(&bundled)).unwrap();
        assert_eq!(store.get(ClutKey::new(254, 0)).unwrap(), Some(data(8)));
    }

    #[test]
    fn missing_bundled_store_creates_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let working = dir.path().join("clut.sqlite");
        let store =
            StagingStore::open_or_seed(&working, Some(&dir.path().join("absent.sqlite"))).unwrap();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn malformed_rows_are_format_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = StagingStore::open(&dir.path().join("clut.sqlite")).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO CharClut (Key, Key2, CLUTData) VALUES (1, 0, '[1,2,3]')",
                [],
            )
            .unwrap();
        assert!(matches!(store.entries(), Err(Error::Format(_))));
    }
}
