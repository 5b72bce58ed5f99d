use anyhow::Result;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::common::model::{NodeIdentifier, Reading};

pub mod read;
pub mod write;
mod tables;

#[derive(Clone)]
pub struct NodeStore {
    db: Arc<Pool<SqliteConnectionManager>>,
}

impl NodeStore {
    pub fn open(path: &str) -> Result<Self> {
        let db = if path == ":memory:" {
            //Every in-memory connection is its own database, so keep exactly one alive for good
            let builder = Pool::builder()
                .max_size(1)
                .idle_timeout(None)
                .max_lifetime(None);
            Self::build_db(builder, SqliteConnectionManager::memory())?
        } else {
            Self::build_db(Pool::builder(), SqliteConnectionManager::file(path))?
        };

        debug!("Node store {} ready", path);

        Ok(NodeStore { db: Arc::new(db) })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    #[instrument(skip_all)]
    fn build_db(
        builder: r2d2::Builder<SqliteConnectionManager>,
        manager: SqliteConnectionManager,
    ) -> Result<Pool<SqliteConnectionManager>> {
        let db_pool = builder.build(manager)?;

        let conn = db_pool.get()?;

        conn.execute(tables::READING_TABLE, [])?;
        conn.execute(tables::READING_NODE_INDEX, [])?;
        debug!("Built reading table");

        Ok(db_pool)
    }

    pub fn last_reading(&self, node_id: &NodeIdentifier) -> Result<Option<Reading>> {
        let conn = self.db.get()?;
        read::get_last_reading(&conn, node_id)
    }

    pub fn latest_readings(&self) -> Result<Vec<Reading>> {
        let conn = self.db.get()?;
        read::get_latest_readings(&conn)
    }

    pub fn count_readings(&self, node_id: &NodeIdentifier) -> Result<u64> {
        let conn = self.db.get()?;
        read::count_readings(&conn, node_id)
    }

    pub fn insert_reading(
        &self,
        node_id: &NodeIdentifier,
        value: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Reading> {
        let conn = self.db.get()?;
        let reading = write::insert_reading(&conn, node_id, value, timestamp)?;

        debug!(
            "Inserted reading {} = {} for node {} into db",
            reading.id, reading.value, reading.node_id
        );

        Ok(reading)
    }

    pub fn delete_readings(&self, node_id: &NodeIdentifier) -> Result<usize> {
        let conn = self.db.get()?;
        let deleted = write::delete_readings(&conn, node_id)?;

        debug!("Deleted {} readings of node {} from db", deleted, node_id);

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn last_reading_is_highest_id() {
        let store = NodeStore::in_memory().unwrap();
        let node = NodeIdentifier::Numeric(1);

        assert!(store.last_reading(&node).unwrap().is_none());

        let first = store.insert_reading(&node, 1.0, None).unwrap();
        let second = store.insert_reading(&node, 2.0, None).unwrap();
        assert!(second.id > first.id);

        let last = store.last_reading(&node).unwrap().unwrap();
        assert_eq!(last.id, second.id);
        assert_eq!(last.value, 2.0);
        assert_eq!(store.count_readings(&node).unwrap(), 2);
    }

    #[test]
    fn supplied_timestamp_is_kept() {
        let store = NodeStore::in_memory().unwrap();
        let node = NodeIdentifier::Numeric(5);
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        store.insert_reading(&node, 3.5, Some(timestamp)).unwrap();

        let last = store.last_reading(&node).unwrap().unwrap();
        assert_eq!(last.timestamp, timestamp);
    }

    #[test]
    fn latest_readings_one_per_node() {
        let store = NodeStore::in_memory().unwrap();
        let one = NodeIdentifier::Numeric(1);
        let two = NodeIdentifier::Numeric(2);
        let text = NodeIdentifier::Text("Tank.Level".to_string());

        store.insert_reading(&one, 1.0, None).unwrap();
        store.insert_reading(&two, 2.0, None).unwrap();
        store.insert_reading(&one, 1.5, None).unwrap();
        store.insert_reading(&text, 80.0, None).unwrap();

        let latest = store.latest_readings().unwrap();
        let values: Vec<(NodeIdentifier, f64)> = latest
            .into_iter()
            .map(|reading| (reading.node_id, reading.value))
            .collect();

        assert_eq!(values, vec![(two, 2.0), (one, 1.5), (text, 80.0)]);
    }

    #[test]
    fn numeric_and_text_ids_do_not_collide() {
        let store = NodeStore::in_memory().unwrap();

        store.insert_reading(&NodeIdentifier::Numeric(42), 1.0, None).unwrap();

        let text = NodeIdentifier::Text("42".to_string());
        assert!(store.last_reading(&text).unwrap().is_none());
    }

    #[test]
    fn delete_drops_whole_history() {
        let store = NodeStore::in_memory().unwrap();
        let node = NodeIdentifier::Numeric(9);
        let other = NodeIdentifier::Numeric(10);

        store.insert_reading(&node, 1.0, None).unwrap();
        store.insert_reading(&node, 2.0, None).unwrap();
        store.insert_reading(&other, 3.0, None).unwrap();

        assert_eq!(store.delete_readings(&node).unwrap(), 2);
        assert!(store.last_reading(&node).unwrap().is_none());
        assert_eq!(store.delete_readings(&node).unwrap(), 0);
        assert!(store.last_reading(&other).unwrap().is_some());
    }
}
