use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::labels::domain::cluster_label_store::{
    validate_cluster_id, ClusterLabel, ClusterLabelStore, LabelStoreError,
};

/// SQLite-backed label store; one row per cluster id in `cluster_labels`.
pub struct SqliteLabelStore {
    conn: Connection,
}

impl SqliteLabelStore {
    pub fn open(path: &Path) -> Result<Self, LabelStoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, LabelStoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, LabelStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cluster_labels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cluster_id TEXT NOT NULL UNIQUE,
                label TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(backend)?;
        Ok(Self { conn })
    }
}

impl ClusterLabelStore for SqliteLabelStore {
    fn upsert(&mut self, cluster_id: &str, label: &str) -> Result<ClusterLabel, LabelStoreError> {
        upsert_row(&self.conn, cluster_id, label)
    }

    fn get(&self, cluster_id: &str) -> Result<Option<ClusterLabel>, LabelStoreError> {
        select_row(&self.conn, cluster_id)
    }

    fn list(&self) -> Result<Vec<ClusterLabel>, LabelStoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT cluster_id, label, created_at FROM cluster_labels ORDER BY id")
            .map_err(backend)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(backend)?;

        rows.map(|row| {
            let (cluster_id, label, created_at) = row.map_err(backend)?;
            to_label(cluster_id, label, created_at)
        })
        .collect()
    }

    /// Applies the batch in one transaction; a failure leaves no partial writes.
    fn upsert_all(
        &mut self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterLabel>, LabelStoreError> {
        let tx = self.conn.transaction().map_err(backend)?;
        let saved = labels
            .iter()
            .map(|(cluster_id, label)| upsert_row(&tx, cluster_id, label))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit().map_err(backend)?;
        Ok(saved)
    }
}

fn upsert_row(conn: &Connection, cluster_id: &str, label: &str) -> Result<ClusterLabel, LabelStoreError> {
    validate_cluster_id(cluster_id)?;
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    conn.execute(
        "INSERT INTO cluster_labels (cluster_id, label, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(cluster_id) DO UPDATE SET label = excluded.label",
        params![cluster_id, label, now],
    )
    .map_err(backend)?;

    select_row(conn, cluster_id)?.ok_or_else(|| {
        LabelStoreError::Backend(format!("row for cluster {cluster_id} vanished after upsert").into())
    })
}

fn select_row(conn: &Connection, cluster_id: &str) -> Result<Option<ClusterLabel>, LabelStoreError> {
    let row = conn
        .query_row(
            "SELECT cluster_id, label, created_at FROM cluster_labels WHERE cluster_id = ?1",
            params![cluster_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )
        .optional()
        .map_err(backend)?;

    row.map(|(cluster_id, label, created_at)| to_label(cluster_id, label, created_at))
        .transpose()
}

fn to_label(cluster_id: String, label: String, created_at: String) -> Result<ClusterLabel, LabelStoreError> {
    let parsed = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| LabelStoreError::Timestamp {
            cluster_id: cluster_id.clone(),
            value: created_at.clone(),
        })?
        .with_timezone(&Utc);
    Ok(ClusterLabel {
        cluster_id,
        label,
        created_at: parsed,
    })
}

fn backend(e: rusqlite::Error) -> LabelStoreError {
    LabelStoreError::Backend(Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_upsert_creates_row() {
        let mut store = SqliteLabelStore::open_in_memory().unwrap();
        let created = store.upsert("0", "orange juice").unwrap();
        assert_eq!(created.label, "orange juice");
        assert_eq!(store.get("0").unwrap(), Some(created));
    }

    #[test]
    fn test_upsert_overwrites_label_keeps_created_at() {
        let mut store = SqliteLabelStore::open_in_memory().unwrap();
        let first = store.upsert("1", "water").unwrap();
        let second = store.upsert("1", "sparkling water").unwrap();
        assert_eq!(second.label, "sparkling water");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_in_creation_order() {
        let mut store = SqliteLabelStore::open_in_memory().unwrap();
        store.upsert("z", "last alphabetically").unwrap();
        store.upsert_all(&batch(&[("a", "one"), ("m", "two")])).unwrap();
        let ids: Vec<String> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|l| l.cluster_id)
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_upsert_all_is_atomic() {
        let mut store = SqliteLabelStore::open_in_memory().unwrap();
        // "" sorts first and fails validation, so nothing is written
        let result = store.upsert_all(&batch(&[("", "bad"), ("ok", "fine")]));
        assert!(matches!(result, Err(LabelStoreError::EmptyClusterId)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.db");
        {
            let mut store = SqliteLabelStore::open(&path).unwrap();
            store.upsert("7", "cereal").unwrap();
        }
        let store = SqliteLabelStore::open(&path).unwrap();
        assert_eq!(store.get("7").unwrap().unwrap().label, "cereal");
    }

    #[test]
    fn test_corrupt_timestamp_reported() {
        let store = SqliteLabelStore::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO cluster_labels (cluster_id, label, created_at) VALUES ('x', 'y', 'yesterday')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.get("x"),
            Err(LabelStoreError::Timestamp { .. })
        ));
    }
}
