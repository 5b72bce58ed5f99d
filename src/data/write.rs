use crate::common::model::{NodeIdentifier, Reading};

use anyhow::Result;
use chrono::{DateTime, Utc};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub fn insert_reading(
    conn: &r2d2::PooledConnection<SqliteConnectionManager>,
    node_id: &NodeIdentifier,
    value: f64,
    timestamp: Option<DateTime<Utc>>,
) -> Result<Reading> {
    let query = "INSERT INTO opcua_nodes (node_id, value, timestamp) VALUES (?, ?, ?)";

    let timestamp = timestamp.unwrap_or_else(Utc::now);

    conn.execute(query, params![node_id, value, timestamp])?;

    Ok(Reading {
        id: conn.last_insert_rowid(),
        node_id: node_id.clone(),
        value,
        timestamp,
    })
}

pub fn delete_readings(
    conn: &r2d2::PooledConnection<SqliteConnectionManager>,
    node_id: &NodeIdentifier,
) -> Result<usize> {
    let rows = conn.execute("DELETE FROM opcua_nodes WHERE node_id = ?", [node_id])?;

    Ok(rows)
}
