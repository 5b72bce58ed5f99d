use anyhow::{anyhow, Result};
use opcua::client::prelude::*;
use opcua::sync::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span, warn};

use super::value_processing;
use super::{FieldGateway, GatewayError};
use crate::common::model::NodeIdentifier;

const APPLICATION_NAME: &str = "opcua-web-access";
const APPLICATION_URI: &str = "urn:opcua-web-access";

//Sessions use SecurityPolicy::None, so the client's PKI tree only needs somewhere out of the way
fn pki_dir() -> PathBuf {
    std::env::temp_dir().join(APPLICATION_NAME).join("pki")
}

#[derive(Clone, Debug)]
pub struct OpcUaConnectionParams {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub namespace: u16,
}

impl OpcUaConnectionParams {
    fn identity_token(&self) -> IdentityToken {
        match &self.username {
            Some(username) => IdentityToken::UserName(
                username.clone(),
                self.password.clone().unwrap_or_default(),
            ),
            None => IdentityToken::Anonymous,
        }
    }

    /// `ns=<namespace>;i=<id>` for numeric ids, `ns=<namespace>;s=<id>` otherwise.
    pub fn node_address(&self, node_id: &NodeIdentifier) -> NodeId {
        match node_id {
            NodeIdentifier::Numeric(id) => NodeId::new(self.namespace, *id),
            NodeIdentifier::Text(id) => NodeId::new(self.namespace, id.clone()),
        }
    }
}

//Owns a connected session and disconnects it whatever way the call ends
struct SessionGuard {
    session: Arc<RwLock<Session>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.write().disconnect();
        info!("Disconnected from OPC UA server");
    }
}

/// Gateway opening a fresh OPC UA session for every read or write.
pub struct OpcUaGateway {
    params: OpcUaConnectionParams,
}

impl OpcUaGateway {
    pub fn new(params: OpcUaConnectionParams) -> Self {
        OpcUaGateway { params }
    }

    fn connect(&self) -> Result<SessionGuard> {
        let mut client = ClientBuilder::new()
            .application_name(APPLICATION_NAME)
            .application_uri(APPLICATION_URI)
            .product_uri(APPLICATION_URI)
            .trust_server_certs(true)
            .pki_dir(pki_dir())
            .session_retry_limit(0)
            .client()
            .ok_or_else(|| anyhow!("invalid OPC UA client configuration"))?;

        info!("Connecting to OPC UA server {}", self.params.url);

        let session = client
            .connect_to_endpoint(
                (
                    self.params.url.as_str(),
                    SecurityPolicy::None.to_str(),
                    MessageSecurityMode::None,
                    UserTokenPolicy::anonymous(),
                ),
                self.params.identity_token(),
            )
            .map_err(|status| anyhow!("couldn't open session: {:?}", status))?;

        Ok(SessionGuard { session })
    }

    fn read_data_value(session: &Session, node: &NodeId) -> Result<DataValue> {
        let read_value_id = ReadValueId {
            node_id: node.clone(),
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            data_encoding: QualifiedName::null(),
        };

        let results = session
            .read(&[read_value_id], TimestampsToReturn::Neither, 0.0)
            .map_err(|status| anyhow!("read service failed: {:?}", status))?;

        results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("server returned no read result"))
    }

    fn read_value(session: &Session, node: &NodeId) -> Result<f64> {
        let data_value = Self::read_data_value(session, node)?;

        value_processing::data_value_to_f64(&data_value).map_err(|e| anyhow!(e))
    }

    fn write_value(session: &Session, node: &NodeId, value: f64) -> Result<()> {
        let write_value = WriteValue {
            node_id: node.clone(),
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            value: DataValue::value_only(Variant::Double(value)),
        };

        let results = session
            .write(&[write_value])
            .map_err(|status| anyhow!("write service failed: {:?}", status))?;

        match results.first() {
            Some(status) if status.is_good() => Ok(()),
            Some(status) => Err(anyhow!("write rejected with status {:?}", status)),
            None => Err(anyhow!("server returned no write result")),
        }
    }

    fn try_read(&self, node: &NodeId) -> Result<f64> {
        let guard = self.connect()?;
        let session = guard.session.read();

        Self::read_value(&session, node)
    }

    fn try_write(&self, node: &NodeId, value: f64) -> Result<()> {
        let guard = self.connect()?;
        let session = guard.session.read();

        Self::write_value(&session, node, value)?;

        //The write status alone doesn't prove the value landed
        let echoed = Self::read_data_value(&session, node)?;

        value_processing::verify_echo(value, &echoed).map_err(|e| anyhow!(e))
    }
}

impl FieldGateway for OpcUaGateway {
    fn read(&self, node_id: &NodeIdentifier) -> Result<f64, GatewayError> {
        let node = self.params.node_address(node_id);
        let _span = info_span!("OPC UA read", node = %node).entered();

        self.try_read(&node)
            .inspect(|value| info!("Read value {}", value))
            .map_err(|err| {
                error!("Error reading OPC data: {}", err);
                GatewayError::Read
            })
    }

    fn write(&self, node_id: &NodeIdentifier, value: f64) -> Result<(), GatewayError> {
        let node = self.params.node_address(node_id);
        let _span = info_span!("OPC UA write", node = %node).entered();

        self.try_write(&node, value)
            .inspect(|_| info!("Wrote value {}", value))
            .map_err(|err| {
                warn!("Error writing OPC data: {}", err);
                GatewayError::Write
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> OpcUaConnectionParams {
        OpcUaConnectionParams {
            url: "opc.tcp://127.0.0.1:1".to_string(),
            username: None,
            password: None,
            namespace: 2,
        }
    }

    #[test]
    fn nodes_are_addressed_in_configured_namespace() {
        let params = params();

        assert_eq!(
            params.node_address(&NodeIdentifier::Numeric(42)),
            NodeId::new(2, 42u32)
        );
        assert_eq!(
            params.node_address(&NodeIdentifier::Text("Tank.Level".to_string())),
            NodeId::new(2, "Tank.Level")
        );
    }

    #[test]
    fn unreachable_server_maps_to_generic_errors() {
        let gateway = OpcUaGateway::new(params());
        let node = NodeIdentifier::Numeric(1);

        assert_eq!(gateway.read(&node), Err(GatewayError::Read));
        assert_eq!(gateway.write(&node, 10.0), Err(GatewayError::Write));
        assert_eq!(
            gateway.read(&NodeIdentifier::Text("Tank.Level".to_string())),
            Err(GatewayError::Read)
        );
    }

    #[test]
    fn client_pki_lives_outside_working_directory() {
        assert!(pki_dir().starts_with(std::env::temp_dir()));
    }

    #[tokio::test]
    async fn unreachable_server_fails_from_blocking_pool() {
        let gateway = Arc::new(OpcUaGateway::new(params()));

        let reader = gateway.clone();
        let read = tokio::task::spawn_blocking(move || reader.read(&NodeIdentifier::Numeric(1)))
            .await
            .unwrap();
        assert_eq!(read, Err(GatewayError::Read));

        let written = tokio::task::spawn_blocking(move || {
            gateway.write(&NodeIdentifier::Numeric(1), 10.0)
        })
        .await
        .unwrap();
        assert_eq!(written, Err(GatewayError::Write));
    }

    #[test]
    fn identity_follows_credentials() {
        let mut params = params();
        assert!(matches!(params.identity_token(), IdentityToken::Anonymous));

        params.username = Some("operator".to_string());
        params.password = Some("pw".to_string());
        assert!(matches!(
            params.identity_token(),
            IdentityToken::UserName(user, pass) if user == "operator" && pass == "pw"
        ));
    }
}
