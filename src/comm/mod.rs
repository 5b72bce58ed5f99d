use crate::common::model::NodeIdentifier;

mod context;
mod value_processing;

pub use context::{OpcUaConnectionParams, OpcUaGateway};

/// Failure reported by a gateway. The transport detail is logged where it
/// happens; callers only ever see these generic codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("OPCReadError")]
    Read,
    #[error("OPCWriteError")]
    Write,
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Read => "OPCReadError",
            GatewayError::Write => "OPCWriteError",
        }
    }
}

/// Single scalar access to the field device. Both calls block until the
/// whole exchange, including session setup and teardown, is finished.
pub trait FieldGateway: Send + Sync {
    fn read(&self, node_id: &NodeIdentifier) -> Result<f64, GatewayError>;

    /// Succeeds only when the device echoes back exactly `value`.
    fn write(&self, node_id: &NodeIdentifier, value: f64) -> Result<(), GatewayError>;
}
