use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Identifier of an OPC UA node inside the configured namespace.
///
/// Numeric identifiers are the normal case. Anything that is not a plain
/// decimal number is kept as text so string-addressed nodes keep working.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeIdentifier {
    Numeric(u32),
    Text(String),
}

impl NodeIdentifier {
    /// Coerces digit-only strings into numeric identifiers, passes anything
    /// else through untouched. Digit strings too large for a numeric node id
    /// are rejected rather than silently addressed as string nodes.
    pub fn normalize(raw: &str) -> Result<Self, String> {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            return raw
                .parse::<u32>()
                .map(NodeIdentifier::Numeric)
                .map_err(|_| format!("Node id {} is out of range", raw));
        }

        Ok(NodeIdentifier::Text(raw.to_string()))
    }
}

impl From<u32> for NodeIdentifier {
    fn from(id: u32) -> Self {
        NodeIdentifier::Numeric(id)
    }
}

impl TryFrom<&str> for NodeIdentifier {
    type Error = String;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        NodeIdentifier::normalize(raw)
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdentifier::Numeric(id) => write!(f, "{id}"),
            NodeIdentifier::Text(id) => write!(f, "{id}"),
        }
    }
}

//Numeric ids go in as INTEGER and text ids as TEXT, so "42" as text never matches 42
impl ToSql for NodeIdentifier {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            NodeIdentifier::Numeric(id) => Ok(ToSqlOutput::from(*id)),
            NodeIdentifier::Text(id) => Ok(ToSqlOutput::from(id.as_str())),
        }
    }
}

impl FromSql for NodeIdentifier {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(id) => u32::try_from(id)
                .map(NodeIdentifier::Numeric)
                .map_err(|_| FromSqlError::OutOfRange(id)),
            ValueRef::Text(_) => value.as_str().map(|id| NodeIdentifier::Text(id.to_string())),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// One persisted observation of a node's value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub node_id: NodeIdentifier,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_strings_become_numeric() {
        assert_eq!(NodeIdentifier::normalize("42"), Ok(NodeIdentifier::Numeric(42)));
        assert_eq!(NodeIdentifier::try_from("007"), Ok(NodeIdentifier::Numeric(7)));
        assert_eq!(NodeIdentifier::try_from("42"), Ok(NodeIdentifier::from(42u32)));
        assert_eq!(
            NodeIdentifier::normalize("4294967295"),
            Ok(NodeIdentifier::Numeric(u32::MAX))
        );
    }

    #[test]
    fn other_strings_pass_through() {
        assert_eq!(
            NodeIdentifier::normalize("Boiler.Temp"),
            Ok(NodeIdentifier::Text("Boiler.Temp".to_string()))
        );
        assert_eq!(NodeIdentifier::normalize("-3"), Ok(NodeIdentifier::Text("-3".to_string())));
        assert_eq!(NodeIdentifier::normalize(""), Ok(NodeIdentifier::Text(String::new())));
        assert_eq!(NodeIdentifier::normalize("1.5"), Ok(NodeIdentifier::Text("1.5".to_string())));
    }

    #[test]
    fn digits_beyond_u32_are_rejected() {
        assert!(NodeIdentifier::normalize("99999999999").is_err());
        assert!(NodeIdentifier::normalize("4294967296").is_err());
    }

    #[test]
    fn identifiers_serialize_untagged() {
        assert_eq!(serde_json::to_string(&NodeIdentifier::Numeric(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&NodeIdentifier::Text("a".to_string())).unwrap(),
            "\"a\""
        );
    }
}
