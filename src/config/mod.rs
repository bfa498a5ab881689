//! Configuration loading and validation
//!
//! The raw TOML document is parsed into an untyped tree, extracted into
//! typed definitions and then checked for logical consistency. Loading is
//! all-or-nothing unless validation is explicitly bypassed.

mod document;
pub mod error;
pub mod keys;
pub mod model;
mod parse;
mod validation;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use error::{ConfigError, ConfigErrorKind, Result};
pub use model::{
    AlertEnablement, AlertingSettings, BssidDefinition, ConfigurationModel, InterfaceSettings,
    MonitorDefinition, NetworkDefinition, Role, ScriptSettings, TrackerDeviceConfiguration,
    TrapConfiguration, TrapDeviceDefinition, TrapType,
};
pub use validation::PASSWORD_HASH_LENGTH;

use document::Node;
use parse::Parser;

/// Loads a configuration document into a [`ConfigurationModel`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: toml::Table,
    skip_validation: bool,
}

impl ConfigLoader {
    /// Read and parse a configuration file
    pub fn from_path<P: AsRef<Path>>(path: P, skip_validation: bool) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content, skip_validation)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str, skip_validation: bool) -> Result<Self> {
        let root: toml::Table = toml::from_str(content)?;
        Ok(Self {
            root,
            skip_validation,
        })
    }

    pub fn skip_validation(&self) -> bool {
        self.skip_validation
    }

    /// Build the model, validating it unless validation is bypassed
    pub fn load(&self) -> Result<ConfigurationModel> {
        let strict = !self.skip_validation;
        let model = Parser::new(Node::root(&self.root), strict).parse()?;

        if strict {
            validation::validate(&model)?;
        } else {
            warn!("Configuration validation is disabled, loading without logical checks");
        }

        info!(
            "Loaded configuration: {} monitors, {} networks, {} trap devices, {} alert types enabled",
            model.monitors.len(),
            model.networks.len(),
            model.trap_devices.len(),
            model.alerts.enabled().len()
        );

        Ok(model)
    }
}

/// Validate a document in one step
pub fn validate(content: &str) -> Result<ConfigurationModel> {
    ConfigLoader::from_str(content, false)?.load()
}

/// Load and validate a configuration file in one step
pub fn load<P: AsRef<Path>>(path: P) -> Result<ConfigurationModel> {
    ConfigLoader::from_path(path, false)?.load()
}

/// First existing file among the default configuration locations
pub fn default_config_path() -> Option<PathBuf> {
    let paths = [
        PathBuf::from("/etc/dot11guard/dot11guard.toml"),
        dirs_next::config_dir()
            .map(|p| p.join("dot11guard/dot11guard.toml"))
            .unwrap_or_default(),
        PathBuf::from("dot11guard.toml"),
    ];

    paths.into_iter().find(|p| p.is_file())
}

/// A complete sample document; helper-script paths are supplied by the caller
pub fn sample_config(script_executable: &str, script_directory: &str) -> String {
    format!(
        r#"dot11_alerts = ["unexpected_bssid_beacon", "unexpected_bssid_proberesp"]

[general]
role = "leader"
id = "sensor-1"
# SHA256 of "admin"
admin_password_hash = "8c6976e5b5410415bde908bd4dee15dfb167a9c873fc4bb8a81f6f2ab448a918"
database_path = "/var/lib/dot11guard/dot11guard.db"
versionchecks = true
fetch_ouis = true

[general.scripts]
executable = "{executable}"
directory = "{directory}"
prefix = "dot11guard_"

[general.alerting]
clean_after_minutes = 5
training_period_seconds = 300

[interfaces]
rest_listen_uri = "http://127.0.0.1:22900/"
http_external_uri = "http://127.0.0.1:22900/"
use_tls = false

[[dot11_monitors]]
device = "wlx00c0ca95686a"
channels = [1, 2, 3, 4, 5, 6]
hop_command = "sudo /sbin/iwconfig {{interface}} channel {{channel}}"
hop_interval = 1

[[dot11_monitors]]
device = "wlx00c0ca959fac"
channels = [7, 8, 9, 10, 11]
hop_command = "sudo /sbin/iwconfig {{interface}} channel {{channel}}"
hop_interval = 1

[[dot11_networks]]
ssid = "Corp"
channels = [1, 6, 11]
security = ["WPA2-PSK"]
beacon_rate = 40

[[dot11_networks.bssids]]
address = "AA:BB:CC:DD:EE:FF"
fingerprints = []

[[dot11_traps]]
device_sender = "wlx00c0ca971201"
channels = [1, 6, 11]
hop_command = "sudo /sbin/iwconfig {{interface}} channel {{channel}}"
hop_interval = 1

[[dot11_traps.traps]]
type = "PROBE_REQUEST_1"
ssids = ["Corp-Guest"]
transmit_interval = 3

[tracker_device]
type = "SX126X_LORA"

[tracker_device.parameters]
serial_port = "/dev/ttyUSB0"
"#,
        executable = script_executable,
        directory = script_directory,
    )
}


#[cfg(test)]
mod tests {
    use super::testing::{remove_key, set_key, Fixture};
    use super::*;
    use crate::alerts::AlertType;

    fn load_doc(doc: &str) -> Result<ConfigurationModel> {
        validate(doc)
    }

    fn expect_invalid(doc: &str, path: &str) {
        let err = load_doc(doc).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Invalid, "unexpected error: {}", err);
        assert_eq!(err.path(), Some(path), "unexpected error: {}", err);
    }

    #[test]
    fn test_sample_config_is_valid() {
        let fx = Fixture::new();
        let model = load_doc(&fx.document()).unwrap();

        assert_eq!(model.role, Role::Leader);
        assert_eq!(model.monitors.len(), 2);
        assert_eq!(model.networks.len(), 1);
        assert_eq!(model.networks[0].bssids[0].address.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(model.trap_devices[0].traps[0].trap_type, TrapType::ProbeRequest1);
        assert!(model.trap_devices[0].traps[0].parameters.contains_key("ssids"));
        assert!(!model.trap_devices[0].traps[0].parameters.contains_key("type"));
        assert_eq!(model.alerting.retention_minutes, 5);
        assert_eq!(model.alerting.training_period_seconds, 300);
        assert!(model.alerts.is_enabled(AlertType::UnexpectedBssidBeacon));
        assert!(model.alerts.is_enabled(AlertType::UnexpectedBssidProberesp));
        assert!(!model.alerts.is_enabled(AlertType::CryptoChangeBeacon));
        let tracker = model.tracker_device.unwrap();
        assert_eq!(tracker.device_type, "SX126X_LORA");
        assert!(tracker.parameters.contains_key("serial_port"));
    }

    #[test]
    fn test_unknown_alert_names_are_ignored() {
        let fx = Fixture::new();
        let doc = fx.document().replace(
            r#"dot11_alerts = ["unexpected_bssid_beacon", "unexpected_bssid_proberesp"]"#,
            r#"dot11_alerts = ["Unexpected_Bssid_Beacon", "no_such_alert"]"#,
        );
        let model = load_doc(&doc).unwrap();
        assert_eq!(model.alerts.enabled().len(), 1);
    }

    #[test]
    fn test_missing_general_key() {
        let fx = Fixture::new();
        let doc = remove_key(&fx.document(), "general", "database_path");
        let err = load_doc(&doc).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Missing);
        assert_eq!(err.path(), Some("general.database_path"));
    }

    #[test]
    fn test_wrong_type_alerting_key() {
        let fx = Fixture::new();
        let doc = set_key(&fx.document(), "general.alerting", "training_period_seconds", "\"soon\"");
        let err = load_doc(&doc).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::WrongType);
        assert_eq!(err.path(), Some("general.alerting.training_period_seconds"));
    }

    #[test]
    fn test_unknown_role() {
        let fx = Fixture::new();
        let doc = set_key(&fx.document(), "general", "role", "\"boss\"");
        expect_invalid(&doc, "general.role");
    }

    #[test]
    fn test_password_hash_length() {
        let fx = Fixture::new();
        for len in [0usize, 1, 32, 63, 65, 128] {
            let doc = set_key(&fx.document(), "general", "admin_password_hash", &format!("\"{}\"", "a".repeat(len)));
            expect_invalid(&doc, "general.admin_password_hash");
        }
        let doc = set_key(&fx.document(), "general", "admin_password_hash", &format!("\"{}\"", "f".repeat(64)));
        assert!(load_doc(&doc).is_ok());
    }

    #[test]
    fn test_invalid_trap_type_names_path_and_value() {
        let fx = Fixture::new();
        let doc = fx.document().replace("type = \"PROBE_REQUEST_1\"", "type = \"PROBE_REQUEST_9\"");
        let err = load_doc(&doc).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Invalid);
        assert_eq!(err.path(), Some("dot11_traps.#0.traps.#0.type"));
        assert!(err.to_string().contains("PROBE_REQUEST_9"));
    }

    #[test]
    fn test_unparsable_uri() {
        let fx = Fixture::new();
        let doc = set_key(&fx.document(), "interfaces", "rest_listen_uri", "\"not a uri\"");
        expect_invalid(&doc, "interfaces.rest_listen_uri");
    }

    fn with_tls(doc: &str, fx: &Fixture, use_tls: bool, listen: &str, external: &str) -> String {
        let cert = fx.file("cert.pem", "cert");
        let key = fx.file("key.pem", "key");
        let doc = set_key(doc, "interfaces", "use_tls", if use_tls { "true" } else { "false" });
        let doc = set_key(&doc, "interfaces", "rest_listen_uri", &format!("\"{}\"", listen));
        let doc = set_key(&doc, "interfaces", "http_external_uri", &format!("\"{}\"", external));
        doc.replace(
            "use_tls = ",
            &format!("tls_certificate_path = \"{}\"\ntls_key_path = \"{}\"\nuse_tls = ", cert, key),
        )
    }

    #[test]
    fn test_tls_scheme_combinations() {
        let fx = Fixture::new();
        let base = fx.document();
        let http = "http://127.0.0.1:22900/";
        let https = "https://127.0.0.1:22900/";

        assert!(load_doc(&with_tls(&base, &fx, true, https, https)).is_ok());
        assert!(load_doc(&with_tls(&base, &fx, false, http, http)).is_ok());
        expect_invalid(&with_tls(&base, &fx, true, http, https), "interfaces.rest_listen_uri");
        expect_invalid(&with_tls(&base, &fx, false, https, http), "interfaces.rest_listen_uri");
        expect_invalid(&with_tls(&base, &fx, true, https, http), "interfaces.http_external_uri");
        expect_invalid(&with_tls(&base, &fx, false, http, https), "interfaces.http_external_uri");
    }

    #[test]
    fn test_tls_requires_readable_files() {
        let fx = Fixture::new();
        let https = "https://127.0.0.1:22900/";
        let doc = with_tls(&fx.document(), &fx, true, https, https);
        let doc = doc.replace(&fx.file("cert.pem", "cert"), "/nonexistent/cert.pem");
        expect_invalid(&doc, "interfaces.tls_certificate_path");
    }

    #[test]
    fn test_tls_paths_required_when_enabled() {
        let fx = Fixture::new();
        let https = "\"https://127.0.0.1:22900/\"";
        let doc = set_key(&fx.document(), "interfaces", "use_tls", "true");
        let doc = set_key(&doc, "interfaces", "rest_listen_uri", https);
        let doc = set_key(&doc, "interfaces", "http_external_uri", https);
        let err = load_doc(&doc).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Missing);
        assert_eq!(err.path(), Some("interfaces.tls_certificate_path"));
    }

    #[test]
    fn test_script_paths() {
        let fx = Fixture::new();
        let not_exec = fx.file("plain.txt", "data");
        let doc = set_key(&fx.document(), "general.scripts", "executable", &format!("\"{}\"", not_exec));
        expect_invalid(&doc, "general.scripts.executable");

        let doc = set_key(&fx.document(), "general.scripts", "directory", "\"/nonexistent/dir\"");
        expect_invalid(&doc, "general.scripts.directory");

        let doc = set_key(&fx.document(), "general.scripts", "directory", &format!("\"{}\"", fx.executable));
        expect_invalid(&doc, "general.scripts.directory");
    }

    #[test]
    fn test_monitor_channel_reuse_across_monitors() {
        let fx = Fixture::new();
        let doc = fx.document().replace("channels = [7, 8, 9, 10, 11]", "channels = [6, 7, 8]");
        expect_invalid(&doc, "dot11_monitors.#1.channels");
    }

    #[test]
    fn test_monitor_channel_reuse_within_monitor() {
        let fx = Fixture::new();
        let doc = fx.document().replace("channels = [1, 2, 3, 4, 5, 6]", "channels = [1, 2, 2]");
        expect_invalid(&doc, "dot11_monitors.#0.channels");
    }

    #[test]
    fn test_monitor_channel_must_be_positive() {
        let fx = Fixture::new();
        let doc = fx.document().replace("channels = [1, 2, 3, 4, 5, 6]", "channels = [0, 2]");
        expect_invalid(&doc, "dot11_monitors.#0.channels");

        let doc = fx.document().replace("channels = [1, 2, 3, 4, 5, 6]", "channels = [-4]");
        expect_invalid(&doc, "dot11_monitors.#0.channels");
    }

    #[test]
    fn test_monitor_channel_out_of_range() {
        let fx = Fixture::new();
        let doc = fx.document().replace("channels = [1, 2, 3, 4, 5, 6]", "channels = [70000]");
        expect_invalid(&doc, "dot11_monitors.#0.channels");
        let err = load_doc(&doc).unwrap_err().to_string();
        assert!(err.contains("out of range"), "unexpected error: {}", err);
        assert!(!err.contains("larger than 0"), "unexpected error: {}", err);
    }

    #[test]
    fn test_monitor_channels_wrong_type() {
        let fx = Fixture::new();
        let doc = fx.document().replace("channels = [1, 2, 3, 4, 5, 6]", "channels = [\"one\"]");
        let err = load_doc(&doc).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::WrongType);
        assert_eq!(err.path(), Some("dot11_monitors.#0.channels"));
    }

    #[test]
    fn test_monitor_device_reuse() {
        let fx = Fixture::new();
        let doc = fx.document().replace("device = \"wlx00c0ca959fac\"", "device = \"wlx00c0ca95686a\"");
        expect_invalid(&doc, "dot11_monitors.#1.device");
    }

    #[test]
    fn test_trap_channels_may_overlap_monitors() {
        // Trap devices are not cross-checked against monitors.
        let fx = Fixture::new();
        let doc = fx.document().replace("device_sender = \"wlx00c0ca971201\"", "device_sender = \"wlx00c0ca95686a\"");
        let model = load_doc(&doc).unwrap();
        assert_eq!(model.trap_devices[0].device_sender, model.monitors[0].device);
        assert!(model.trap_devices[0].channels.contains(&1));
    }

    const SECOND_NETWORK: &str = r#"
[[dot11_networks]]
ssid = "SSID_PLACEHOLDER"
channels = [6]
security = ["WPA2-PSK"]
beacon_rate = 40

[[dot11_networks.bssids]]
address = "ADDR_PLACEHOLDER"
fingerprints = []
"#;

    fn with_second_network(doc: &str, ssid: &str, address: &str) -> String {
        let extra = SECOND_NETWORK
            .replace("SSID_PLACEHOLDER", ssid)
            .replace("ADDR_PLACEHOLDER", address);
        doc.replace("[[dot11_traps]]", &format!("{}\n[[dot11_traps]]", extra))
    }

    #[test]
    fn test_duplicate_ssid() {
        let fx = Fixture::new();
        let doc = with_second_network(&fx.document(), "Corp", "00:11:22:33:44:55");
        expect_invalid(&doc, "dot11_networks.#1.ssid");
    }

    #[test]
    fn test_empty_ssid_is_rejected() {
        let fx = Fixture::new();
        let doc = fx.document().replace("ssid = \"Corp\"", "ssid = \"\"");
        expect_invalid(&doc, "dot11_networks.#0.ssid");
    }

    #[test]
    fn test_bssid_may_repeat_across_networks() {
        let fx = Fixture::new();
        let doc = with_second_network(&fx.document(), "Corp-Guest", "aa:bb:cc:dd:ee:ff");
        let model = load_doc(&doc).unwrap();
        assert_eq!(model.networks[0].bssids[0].address, model.networks[1].bssids[0].address);
    }

    #[test]
    fn test_duplicate_bssid_within_network_is_case_insensitive() {
        let fx = Fixture::new();
        let doc = fx.document().replace(
            "[[dot11_traps]]",
            "[[dot11_networks.bssids]]\naddress = \"aa:bb:cc:dd:ee:ff\"\nfingerprints = []\n\n[[dot11_traps]]",
        );
        expect_invalid(&doc, "dot11_networks.#0.bssids.#1.address");
    }

    #[test]
    fn test_malformed_bssid_address() {
        let fx = Fixture::new();
        let doc = fx.document().replace("address = \"AA:BB:CC:DD:EE:FF\"", "address = \"not-a-mac\"");
        expect_invalid(&doc, "dot11_networks.#0.bssids.#0.address");
    }

    #[test]
    fn test_skip_validation_skips_bad_entries() {
        let fx = Fixture::new();
        let doc = fx
            .document()
            .replace("device = \"wlx00c0ca959fac\"", "device = 42")
            .replace("type = \"PROBE_REQUEST_1\"", "type = \"BOGUS\"")
            .replace("channels = [1, 2, 3, 4, 5, 6]", "channels = [1, 1]");
        let doc = set_key(&doc, "general", "admin_password_hash", "\"short\"");

        assert!(validate(&doc).is_err());

        let model = ConfigLoader::from_str(&doc, true).unwrap().load().unwrap();
        assert_eq!(model.monitors.len(), 1);
        assert_eq!(model.monitors[0].channels, vec![1, 1]);
        assert_eq!(model.trap_devices.len(), 1);
        assert!(model.trap_devices[0].traps.is_empty());
        assert_eq!(model.admin_password_hash, "short");
    }

    #[test]
    fn test_skip_validation_skips_single_bssid() {
        let fx = Fixture::new();
        let doc = fx.document().replace(
            "[[dot11_traps]]",
            "[[dot11_networks.bssids]]\naddress = \"not-a-mac\"\nfingerprints = []\n\n[[dot11_traps]]",
        );
        expect_invalid(&doc, "dot11_networks.#0.bssids.#1.address");

        let model = ConfigLoader::from_str(&doc, true).unwrap().load().unwrap();
        assert_eq!(model.networks.len(), 1);
        assert_eq!(model.networks[0].bssids.len(), 1);
        assert_eq!(model.networks[0].bssids[0].address.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_skip_validation_skips_single_trap() {
        let fx = Fixture::new();
        let doc = fx.document().replace(
            "transmit_interval = 3",
            "transmit_interval = 3\n\n[[dot11_traps.traps]]\ntype = \"BOGUS\"",
        );
        expect_invalid(&doc, "dot11_traps.#0.traps.#1.type");

        let model = ConfigLoader::from_str(&doc, true).unwrap().load().unwrap();
        assert_eq!(model.trap_devices.len(), 1);
        assert_eq!(model.trap_devices[0].traps.len(), 1);
        assert_eq!(model.trap_devices[0].traps[0].trap_type, TrapType::ProbeRequest1);
    }

    #[test]
    fn test_skip_validation_still_requires_groups() {
        let fx = Fixture::new();
        let doc = remove_key(&fx.document(), "interfaces", "use_tls");
        let err = ConfigLoader::from_str(&doc, true).unwrap().load().unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Missing);
        assert_eq!(err.path(), Some("interfaces.use_tls"));
    }

    #[test]
    fn test_tracker_device_is_optional() {
        let fx = Fixture::new();
        let doc = fx.document();
        let cut = doc.find("[tracker_device]").unwrap();
        let model = load_doc(&doc[..cut]).unwrap();
        assert!(model.tracker_device.is_none());
    }

    #[test]
    fn test_tracker_device_requires_parameters_when_typed() {
        let fx = Fixture::new();
        let doc = fx.document();
        let cut = doc.find("[tracker_device.parameters]").unwrap();
        let err = load_doc(&doc[..cut]).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Missing);
        assert_eq!(err.path(), Some("tracker_device.parameters"));
    }

    #[test]
    fn test_unreadable_file() {
        let err = ConfigLoader::from_path("/nonexistent/dot11guard.toml", false).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Unreadable);
    }

    #[test]
    fn test_malformed_document() {
        let err = ConfigLoader::from_str("[general\nrole = ", false).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
