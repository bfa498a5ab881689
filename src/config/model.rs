//! Validated configuration model
//!
//! Built once per load and shared read-only; reloads build a new model.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use url::Url;

use crate::alerts::AlertType;
use crate::wireless::MacAddr;

/// Node role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Leader,
    Follower,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "LEADER" => Some(Role::Leader),
            "FOLLOWER" => Some(Role::Follower),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Leader => write!(f, "LEADER"),
            Role::Follower => write!(f, "FOLLOWER"),
        }
    }
}

/// A capture interface hopping across channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorDefinition {
    pub device: String,
    pub channels: Vec<u16>,
    pub hop_command: String,
    /// Hop interval in milliseconds
    pub hop_interval: u64,
}

/// An authorized transmitter for a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BssidDefinition {
    pub address: MacAddr,
    pub fingerprints: Vec<String>,
}

/// An expected, legitimate network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDefinition {
    pub ssid: String,
    pub bssids: Vec<BssidDefinition>,
    pub channels: Vec<u16>,
    pub security: Vec<String>,
    pub beacon_rate: u64,
}

impl NetworkDefinition {
    pub fn bssid(&self, address: &MacAddr) -> Option<&BssidDefinition> {
        self.bssids.iter().find(|b| b.address == *address)
    }

    pub fn is_authorized(&self, address: &MacAddr) -> bool {
        self.bssid(address).is_some()
    }

    /// Compare an advertised security set against the configured one,
    /// ignoring case and order.
    pub fn security_matches(&self, advertised: &[String]) -> bool {
        let normalize = |list: &[String]| -> BTreeSet<String> {
            list.iter().map(|s| s.trim().to_uppercase()).collect()
        };
        normalize(&self.security) == normalize(advertised)
    }
}

/// Deception trap kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrapType {
    #[serde(rename = "PROBE_REQUEST_1")]
    ProbeRequest1,
    #[serde(rename = "BEACON_1")]
    Beacon1,
}

impl TrapType {
    pub const ALL: [TrapType; 2] = [TrapType::ProbeRequest1, TrapType::Beacon1];

    pub fn name(&self) -> &'static str {
        match self {
            TrapType::ProbeRequest1 => "PROBE_REQUEST_1",
            TrapType::Beacon1 => "BEACON_1",
        }
    }

    /// Exact match on the wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }
}

/// One trap on a trap device; trap-specific keys are kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrapConfiguration {
    pub trap_type: TrapType,
    pub parameters: toml::Table,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrapDeviceDefinition {
    pub device_sender: String,
    pub channels: Vec<u16>,
    pub hop_command: String,
    pub hop_interval: u64,
    pub traps: Vec<TrapConfiguration>,
}

/// Helper-script settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSettings {
    pub executable: PathBuf,
    pub directory: PathBuf,
    pub prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertingSettings {
    /// Inactivity after which a stored alert expires
    pub retention_minutes: u64,
    /// Uptime before which alerts are withheld
    pub training_period_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceSettings {
    pub rest_listen_uri: Url,
    pub http_external_uri: Url,
    pub use_tls: bool,
    pub tls_certificate_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

/// Tracker device block; `parameters` is opaque and type-specific
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerDeviceConfiguration {
    pub device_type: String,
    pub parameters: toml::Table,
}

/// Which alert types are active
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertEnablement {
    enabled: BTreeSet<AlertType>,
}

impl AlertEnablement {
    pub fn new(enabled: impl IntoIterator<Item = AlertType>) -> Self {
        Self {
            enabled: enabled.into_iter().collect(),
        }
    }

    /// Every known alert type enabled
    pub fn all() -> Self {
        Self::new(AlertType::ALL)
    }

    pub fn is_enabled(&self, alert_type: AlertType) -> bool {
        self.enabled.contains(&alert_type)
    }

    pub fn enabled(&self) -> &BTreeSet<AlertType> {
        &self.enabled
    }

    pub fn disabled(&self) -> BTreeSet<AlertType> {
        AlertType::ALL
            .iter()
            .copied()
            .filter(|t| !self.enabled.contains(t))
            .collect()
    }
}

/// The complete, self-consistent runtime model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationModel {
    pub role: Role,
    pub id: String,
    pub admin_password_hash: String,
    pub database_path: PathBuf,
    pub versionchecks: bool,
    pub fetch_ouis: bool,
    pub scripts: ScriptSettings,
    pub alerting: AlertingSettings,
    pub interfaces: InterfaceSettings,
    pub monitors: Vec<MonitorDefinition>,
    pub networks: Vec<NetworkDefinition>,
    pub trap_devices: Vec<TrapDeviceDefinition>,
    pub alerts: AlertEnablement,
    pub tracker_device: Option<TrackerDeviceConfiguration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trap_type_names_are_exact() {
        assert_eq!(TrapType::from_name("BEACON_1"), Some(TrapType::Beacon1));
        assert_eq!(TrapType::from_name("PROBE_REQUEST_1"), Some(TrapType::ProbeRequest1));
        assert_eq!(TrapType::from_name("beacon_1"), None);
    }

    #[test]
    fn test_enablement_partitions_known_types() {
        let e = AlertEnablement::new([AlertType::UnexpectedBssidBeacon]);
        assert!(e.is_enabled(AlertType::UnexpectedBssidBeacon));
        assert!(!e.is_enabled(AlertType::UnexpectedBssidProberesp));
        assert_eq!(e.enabled().len() + e.disabled().len(), AlertType::ALL.len());
    }

    #[test]
    fn test_security_match_ignores_case_and_order() {
        let net = NetworkDefinition {
            ssid: "Corp".into(),
            bssids: vec![],
            channels: vec![1],
            security: vec!["WPA2-PSK".into(), "WPA3-SAE".into()],
            beacon_rate: 40,
        };
        assert!(net.security_matches(&["wpa3-sae".into(), "WPA2-PSK".into()]));
        assert!(!net.security_matches(&["WPA2-PSK".into()]));
        assert!(!net.security_matches(&[]));
    }
}
