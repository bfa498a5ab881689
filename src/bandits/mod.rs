//! Rogue device identification
//!
//! A bandit is a tracked device. Remote tracking hardware receives
//! [`RogueIdentificationCriteria`] describing how to recognise it; the
//! `configuration` map is opaque on the wire and only decoded by the
//! evaluator for its `type`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::wireless::Dot11Frame;

/// Identifier kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BanditIdentifierType {
    Ssid,
    Fingerprint,
    SignalStrength,
}

impl std::fmt::Display for BanditIdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BanditIdentifierType::Ssid => write!(f, "SSID"),
            BanditIdentifierType::Fingerprint => write!(f, "FINGERPRINT"),
            BanditIdentifierType::SignalStrength => write!(f, "SIGNAL_STRENGTH"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CriteriaError {
    #[error("invalid {identifier_type} identifier configuration: {source}")]
    InvalidConfiguration {
        identifier_type: BanditIdentifierType,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broadcast record distributed to tracking hardware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RogueIdentificationCriteria {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub identifier_type: BanditIdentifierType,
    pub configuration: Map<String, Value>,
}

impl RogueIdentificationCriteria {
    pub fn new(identifier_type: BanditIdentifierType, configuration: Map<String, Value>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            identifier_type,
            configuration,
        }
    }

    pub fn from_identifier(identifier: &BanditIdentifier) -> Self {
        Self::new(identifier.identifier_type(), identifier.configuration())
    }

    /// Decode the opaque configuration for this record's type
    pub fn identifier(&self) -> Result<BanditIdentifier, CriteriaError> {
        BanditIdentifier::decode(self.identifier_type, &self.configuration)
    }

    pub fn to_json(&self) -> Result<String, CriteriaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CriteriaError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Deserialize)]
struct SsidParameters {
    ssids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FingerprintParameters {
    fingerprint: String,
}

#[derive(Debug, Deserialize)]
struct SignalStrengthParameters {
    from: i32,
    to: i32,
}

/// Typed evaluator for one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanditIdentifier {
    /// Advertises or probes for any of these SSIDs
    Ssid { ssids: Vec<String> },
    /// Matches the decoder's transmitter fingerprint
    Fingerprint { fingerprint: String },
    /// Received signal inside an inclusive dBm range
    SignalStrength { from: i32, to: i32 },
}

impl BanditIdentifier {
    pub fn decode(identifier_type: BanditIdentifierType, configuration: &Map<String, Value>) -> Result<Self, CriteriaError> {
        let value = Value::Object(configuration.clone());
        let invalid = |source| CriteriaError::InvalidConfiguration { identifier_type, source };

        Ok(match identifier_type {
            BanditIdentifierType::Ssid => {
                let p: SsidParameters = serde_json::from_value(value).map_err(invalid)?;
                BanditIdentifier::Ssid { ssids: p.ssids }
            }
            BanditIdentifierType::Fingerprint => {
                let p: FingerprintParameters = serde_json::from_value(value).map_err(invalid)?;
                BanditIdentifier::Fingerprint {
                    fingerprint: p.fingerprint.to_lowercase(),
                }
            }
            BanditIdentifierType::SignalStrength => {
                let p: SignalStrengthParameters = serde_json::from_value(value).map_err(invalid)?;
                BanditIdentifier::SignalStrength {
                    from: p.from.min(p.to),
                    to: p.from.max(p.to),
                }
            }
        })
    }

    pub fn identifier_type(&self) -> BanditIdentifierType {
        match self {
            BanditIdentifier::Ssid { .. } => BanditIdentifierType::Ssid,
            BanditIdentifier::Fingerprint { .. } => BanditIdentifierType::Fingerprint,
            BanditIdentifier::SignalStrength { .. } => BanditIdentifierType::SignalStrength,
        }
    }

    pub fn configuration(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            BanditIdentifier::Ssid { ssids } => {
                map.insert("ssids".into(), Value::from(ssids.clone()));
            }
            BanditIdentifier::Fingerprint { fingerprint } => {
                map.insert("fingerprint".into(), Value::from(fingerprint.clone()));
            }
            BanditIdentifier::SignalStrength { from, to } => {
                map.insert("from".into(), Value::from(*from));
                map.insert("to".into(), Value::from(*to));
            }
        }
        map
    }

    pub fn description(&self) -> String {
        match self {
            BanditIdentifier::Ssid { ssids } => format!("SSIDs: {}", ssids.join(", ")),
            BanditIdentifier::Fingerprint { fingerprint } => format!("fingerprint: {}", fingerprint),
            BanditIdentifier::SignalStrength { from, to } => {
                format!("signal strength between {} dBm and {} dBm", from, to)
            }
        }
    }

    pub fn matches(&self, frame: &Dot11Frame) -> bool {
        match self {
            BanditIdentifier::Ssid { ssids } => frame
                .ssid
                .as_ref()
                .map(|ssid| !ssid.is_empty() && ssids.contains(ssid))
                .unwrap_or(false),
            BanditIdentifier::Fingerprint { fingerprint } => frame
                .fingerprint
                .as_deref()
                .map(|f| f.eq_ignore_ascii_case(fingerprint))
                .unwrap_or(false),
            BanditIdentifier::SignalStrength { from, to } => frame
                .meta
                .signal_dbm
                .map(|s| (*from..=*to).contains(&i32::from(s)))
                .unwrap_or(false),
        }
    }
}
