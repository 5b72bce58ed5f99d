use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::comm::{FieldGateway, GatewayError};
use crate::common::model::NodeIdentifier;

/// In-process stand-in for the field device. Nodes without a scripted value
/// behave like an unreachable device.
#[derive(Default)]
pub struct ScriptedGateway {
    values: Mutex<HashMap<NodeIdentifier, f64>>,
    reject_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl ScriptedGateway {
    pub fn set_value(&self, node_id: u32, value: f64) {
        self.values
            .lock()
            .unwrap()
            .insert(NodeIdentifier::Numeric(node_id), value);
    }

    /// Writes keep failing verification from now on.
    pub fn reject_writes(&self) {
        self.reject_writes.store(true, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl FieldGateway for ScriptedGateway {
    fn read(&self, node_id: &NodeIdentifier) -> Result<f64, GatewayError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        self.values
            .lock()
            .unwrap()
            .get(node_id)
            .copied()
            .ok_or(GatewayError::Read)
    }

    fn write(&self, node_id: &NodeIdentifier, value: f64) -> Result<(), GatewayError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::Write);
        }

        self.values.lock().unwrap().insert(node_id.clone(), value);
        Ok(())
    }
}
