use crate::common::model::{NodeIdentifier, Reading};

use anyhow::Result;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row};

fn reading_from_row(row: &Row) -> rusqlite::Result<Reading> {
    Ok(Reading {
        id: row.get(0)?,
        node_id: row.get(1)?,
        value: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

pub fn get_last_reading(
    conn: &r2d2::PooledConnection<SqliteConnectionManager>,
    node_id: &NodeIdentifier,
) -> Result<Option<Reading>> {
    let reading = conn
        .query_row(
            "SELECT id, node_id, value, timestamp
         FROM opcua_nodes
         WHERE node_id = ?
         ORDER BY id DESC
         LIMIT 1;",
            [node_id],
            reading_from_row,
        )
        .optional()?;

    Ok(reading)
}

//Newest reading of every node, oldest first
pub fn get_latest_readings(
    conn: &r2d2::PooledConnection<SqliteConnectionManager>,
) -> Result<Vec<Reading>> {
    let mut stmt = conn.prepare(
        "SELECT id, node_id, value, timestamp
         FROM opcua_nodes
         WHERE id IN (SELECT MAX(id) FROM opcua_nodes GROUP BY node_id)
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([], reading_from_row)?;

    let mut result = vec![];

    for reading in rows {
        result.push(reading?);
    }

    Ok(result)
}

pub fn count_readings(
    conn: &r2d2::PooledConnection<SqliteConnectionManager>,
    node_id: &NodeIdentifier,
) -> Result<u64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM opcua_nodes WHERE node_id = ?",
        [node_id],
        |row| row.get(0),
    )?;

    Ok(count)
}
