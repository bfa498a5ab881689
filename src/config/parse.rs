//! Structural extraction of the raw document into typed definitions
//!
//! Strict mode turns the first malformed element into an error. Permissive
//! mode (validation bypassed) logs and skips malformed list entries instead;
//! scalar groups are required either way.

use std::path::PathBuf;

use tracing::{debug, info};
use url::Url;

use super::document::Node;
use super::error::{ConfigError, Result};
use super::keys;
use super::model::*;
use crate::alerts::AlertType;
use crate::wireless::MacAddr;

pub(crate) struct Parser<'a> {
    root: Node<'a>,
    strict: bool,
}

impl<'a> Parser<'a> {
    pub fn new(root: Node<'a>, strict: bool) -> Self {
        Self { root, strict }
    }

    pub fn parse(&self) -> Result<ConfigurationModel> {
        let general = self.root.table(keys::GENERAL)?;
        let scripts = general.table(keys::SCRIPTS)?;
        let alerting = general.table(keys::ALERTING)?;
        let interfaces = self.root.table(keys::INTERFACES)?;

        Ok(ConfigurationModel {
            role: parse_role(&general)?,
            id: general.string(keys::ID)?.to_string(),
            admin_password_hash: general.string(keys::ADMIN_PASSWORD_HASH)?.to_string(),
            database_path: PathBuf::from(general.string(keys::DATABASE_PATH)?),
            versionchecks: general.boolean(keys::VERSIONCHECKS)?,
            fetch_ouis: general.boolean(keys::FETCH_OUIS)?,
            scripts: parse_scripts(&scripts)?,
            alerting: parse_alerting(&alerting)?,
            interfaces: parse_interfaces(&interfaces)?,
            monitors: self.entries(keys::DOT11_MONITORS, "802.11 monitor", parse_monitor)?,
            networks: self.entries(keys::DOT11_NETWORKS, "802.11 network", |n| parse_network(n, self.strict))?,
            trap_devices: self.entries(keys::DOT11_TRAPS, "802.11 trap device definition", |n| {
                parse_trap_device(n, self.strict)
            })?,
            alerts: parse_alerts(&self.root)?,
            tracker_device: parse_tracker_device(&self.root)?,
        })
    }

    fn entries<T>(&self, key: &str, what: &str, parse: impl Fn(&Node<'a>) -> Result<T>) -> Result<Vec<T>> {
        collect_entries(&self.root, key, what, self.strict, parse)
    }
}

/// Parses every table in the array at `key`, skipping bad ones unless strict
fn collect_entries<'a, T>(
    parent: &Node<'a>,
    key: &str,
    what: &str,
    strict: bool,
    parse: impl Fn(&Node<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut result = Vec::new();
    for item in parent.tables(key)? {
        match item.and_then(|node| parse(&node)) {
            Ok(value) => result.push(value),
            Err(e) if strict => return Err(e),
            Err(e) => info!("Skipping {} with invalid configuration: {}", what, e),
        }
    }
    Ok(result)
}

fn parse_role(general: &Node) -> Result<Role> {
    let raw = general.string(keys::ROLE)?;
    Role::from_name(raw).ok_or_else(|| {
        ConfigError::invalid(
            general.child_path(keys::ROLE),
            format!("unknown role [{}], expected one of LEADER, FOLLOWER", raw),
        )
    })
}

fn parse_scripts(scripts: &Node) -> Result<ScriptSettings> {
    Ok(ScriptSettings {
        executable: PathBuf::from(scripts.string(keys::SCRIPT_EXECUTABLE)?),
        directory: PathBuf::from(scripts.string(keys::SCRIPT_DIRECTORY)?),
        prefix: scripts.string(keys::SCRIPT_PREFIX)?.to_string(),
    })
}

fn parse_alerting(alerting: &Node) -> Result<AlertingSettings> {
    Ok(AlertingSettings {
        retention_minutes: alerting.unsigned(keys::CLEAN_AFTER_MINUTES)?,
        training_period_seconds: alerting.unsigned(keys::TRAINING_PERIOD_SECONDS)?,
    })
}

fn parse_uri(node: &Node, key: &str) -> Result<Url> {
    let raw = node.string(key)?;
    Url::parse(raw).map_err(|e| {
        ConfigError::invalid(
            node.child_path(key),
            format!("[{}] cannot be parsed into a URI: {}", raw, e),
        )
    })
}

fn parse_interfaces(interfaces: &Node) -> Result<InterfaceSettings> {
    let rest_listen_uri = parse_uri(interfaces, keys::REST_LISTEN_URI)?;
    let http_external_uri = parse_uri(interfaces, keys::HTTP_EXTERNAL_URI)?;
    let use_tls = interfaces.boolean(keys::USE_TLS)?;

    // Certificate and key are only required once TLS is switched on.
    let (tls_certificate_path, tls_key_path) = if use_tls {
        (
            Some(interfaces.string(keys::TLS_CERTIFICATE_PATH)?),
            Some(interfaces.string(keys::TLS_KEY_PATH)?),
        )
    } else {
        (
            interfaces.opt_string(keys::TLS_CERTIFICATE_PATH)?,
            interfaces.opt_string(keys::TLS_KEY_PATH)?,
        )
    };

    Ok(InterfaceSettings {
        rest_listen_uri,
        http_external_uri,
        use_tls,
        tls_certificate_path: tls_certificate_path.map(PathBuf::from),
        tls_key_path: tls_key_path.map(PathBuf::from),
    })
}

fn parse_channels(node: &Node, key: &str) -> Result<Vec<u16>> {
    node.int_list(key)?
        .into_iter()
        .map(|c| {
            if c <= 0 {
                return Err(ConfigError::invalid(
                    node.child_path(key),
                    format!("invalid channel [{}], all channels must be integers larger than 0", c),
                ));
            }
            u16::try_from(c).map_err(|_| {
                ConfigError::invalid(
                    node.child_path(key),
                    format!("channel [{}] is out of range, the largest channel is {}", c, u16::MAX),
                )
            })
        })
        .collect()
}

fn parse_monitor(node: &Node) -> Result<MonitorDefinition> {
    Ok(MonitorDefinition {
        device: node.string(keys::DEVICE)?.to_string(),
        channels: parse_channels(node, keys::CHANNELS)?,
        hop_command: node.string(keys::HOP_COMMAND)?.to_string(),
        hop_interval: node.unsigned(keys::HOP_INTERVAL)?,
    })
}

fn parse_bssid(node: &Node) -> Result<BssidDefinition> {
    let raw = node.string(keys::ADDRESS)?;
    let address: MacAddr = raw.parse().map_err(|_| {
        ConfigError::invalid(
            node.child_path(keys::ADDRESS),
            format!("[{}] is not a MAC address", raw),
        )
    })?;

    Ok(BssidDefinition {
        address,
        fingerprints: node
            .string_list(keys::FINGERPRINTS)?
            .into_iter()
            .map(|f| f.to_lowercase())
            .collect(),
    })
}

fn parse_network(node: &Node, strict: bool) -> Result<NetworkDefinition> {
    let bssids = collect_entries(node, keys::BSSIDS, "802.11 BSSID", strict, parse_bssid)?;

    Ok(NetworkDefinition {
        ssid: node.string(keys::SSID)?.to_string(),
        bssids,
        channels: parse_channels(node, keys::CHANNELS)?,
        security: node.string_list(keys::SECURITY)?,
        beacon_rate: node.unsigned(keys::BEACON_RATE)?,
    })
}

fn parse_trap(node: &Node) -> Result<TrapConfiguration> {
    let raw = node.string(keys::TYPE)?;
    let trap_type = TrapType::from_name(raw).ok_or_else(|| {
        ConfigError::invalid(node.child_path(keys::TYPE), format!("trap is of invalid type [{}]", raw))
    })?;

    let mut parameters = node.raw().clone();
    parameters.remove(keys::TYPE);

    Ok(TrapConfiguration {
        trap_type,
        parameters,
    })
}

fn parse_trap_device(node: &Node, strict: bool) -> Result<TrapDeviceDefinition> {
    let traps = collect_entries(node, keys::TRAPS, "trap", strict, parse_trap)?;

    Ok(TrapDeviceDefinition {
        device_sender: node.string(keys::DEVICE_SENDER)?.to_string(),
        channels: parse_channels(node, keys::CHANNELS)?,
        hop_command: node.string(keys::HOP_COMMAND)?.to_string(),
        hop_interval: node.unsigned(keys::HOP_INTERVAL)?,
        traps,
    })
}

fn parse_alerts(root: &Node) -> Result<AlertEnablement> {
    let mut enabled = Vec::new();
    for name in root.string_list(keys::DOT11_ALERTS)? {
        match AlertType::from_name(&name) {
            Some(t) => enabled.push(t),
            None => debug!("Ignoring unknown alert type [{}]", name),
        }
    }
    Ok(AlertEnablement::new(enabled))
}

fn parse_tracker_device(root: &Node) -> Result<Option<TrackerDeviceConfiguration>> {
    let Some(tracker) = root.opt_table(keys::TRACKER_DEVICE)? else {
        return Ok(None);
    };

    if !tracker.has(keys::TYPE) {
        return Ok(None);
    }

    let device_type = tracker.string(keys::TYPE)?.to_string();
    let parameters = tracker.table(keys::PARAMETERS)?.raw().clone();

    Ok(Some(TrackerDeviceConfiguration {
        device_type,
        parameters,
    }))
}
