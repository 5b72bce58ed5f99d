//! Read-through / write-through cache of node readings. Entries never expire,
//! only `refresh` and `write` go back to the device for a cached node.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::comm::{FieldGateway, GatewayError};
use crate::common::model::{NodeIdentifier, Reading};
use crate::data::NodeStore;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("node unavailable: {0}")]
    NodeUnavailable(GatewayError),
    #[error("write rejected: {0}")]
    WriteRejected(GatewayError),
    #[error("node {0} not found in database")]
    NotFound(NodeIdentifier),
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct SyncPolicy {
    store: NodeStore,
    gateway: Arc<dyn FieldGateway>,
}

impl SyncPolicy {
    pub fn new(store: NodeStore, gateway: Arc<dyn FieldGateway>) -> Self {
        SyncPolicy { store, gateway }
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn fetch_current(&self, node_id: &NodeIdentifier) -> Result<Reading, SyncError> {
        if let Some(reading) = self.store.last_reading(node_id)? {
            debug!("Node {} served from store", node_id);
            return Ok(reading);
        }

        debug!("Node {} not cached, reading device", node_id);
        self.read_and_store(node_id)
    }

    pub fn refresh(&self, node_id: &NodeIdentifier) -> Result<Reading, SyncError> {
        self.read_and_store(node_id)
    }

    pub fn write(&self, node_id: &NodeIdentifier, value: f64) -> Result<Reading, SyncError> {
        self.gateway.write(node_id, value).map_err(|err| {
            warn!("Write of {} to node {} rejected", value, node_id);
            SyncError::WriteRejected(err)
        })?;

        //The gateway already verified the echo, no second read here
        let reading = self.store.insert_reading(node_id, value, None)?;
        info!("Node {} written with {}", node_id, value);

        Ok(reading)
    }

    pub fn delete(&self, node_id: &NodeIdentifier) -> Result<usize, SyncError> {
        let deleted = self.store.delete_readings(node_id)?;

        if deleted == 0 {
            return Err(SyncError::NotFound(node_id.clone()));
        }

        info!("Deleted {} readings of node {}", deleted, node_id);
        Ok(deleted)
    }

    pub fn list_all(&self) -> Result<Vec<Reading>, SyncError> {
        Ok(self.store.latest_readings()?)
    }

    fn read_and_store(&self, node_id: &NodeIdentifier) -> Result<Reading, SyncError> {
        let value = self
            .gateway
            .read(node_id)
            .map_err(SyncError::NodeUnavailable)?;

        Ok(self.store.insert_reading(node_id, value, None)?)
    }
}
