//! Configuration document key names

pub const GENERAL: &str = "general";
pub const ROLE: &str = "role";
pub const ID: &str = "id";
pub const ADMIN_PASSWORD_HASH: &str = "admin_password_hash";
pub const DATABASE_PATH: &str = "database_path";
pub const VERSIONCHECKS: &str = "versionchecks";
pub const FETCH_OUIS: &str = "fetch_ouis";

pub const SCRIPTS: &str = "scripts";
pub const SCRIPT_EXECUTABLE: &str = "executable";
pub const SCRIPT_DIRECTORY: &str = "directory";
pub const SCRIPT_PREFIX: &str = "prefix";

pub const ALERTING: &str = "alerting";
pub const CLEAN_AFTER_MINUTES: &str = "clean_after_minutes";
pub const TRAINING_PERIOD_SECONDS: &str = "training_period_seconds";

pub const INTERFACES: &str = "interfaces";
pub const REST_LISTEN_URI: &str = "rest_listen_uri";
pub const HTTP_EXTERNAL_URI: &str = "http_external_uri";
pub const USE_TLS: &str = "use_tls";
pub const TLS_CERTIFICATE_PATH: &str = "tls_certificate_path";
pub const TLS_KEY_PATH: &str = "tls_key_path";

pub const DOT11_MONITORS: &str = "dot11_monitors";
pub const DOT11_NETWORKS: &str = "dot11_networks";
pub const DOT11_TRAPS: &str = "dot11_traps";
pub const DOT11_ALERTS: &str = "dot11_alerts";

pub const DEVICE: &str = "device";
pub const DEVICE_SENDER: &str = "device_sender";
pub const CHANNELS: &str = "channels";
pub const HOP_COMMAND: &str = "hop_command";
pub const HOP_INTERVAL: &str = "hop_interval";

pub const SSID: &str = "ssid";
pub const BSSIDS: &str = "bssids";
pub const ADDRESS: &str = "address";
pub const FINGERPRINTS: &str = "fingerprints";
pub const SECURITY: &str = "security";
pub const BEACON_RATE: &str = "beacon_rate";

pub const TRAPS: &str = "traps";
pub const TYPE: &str = "type";

pub const TRACKER_DEVICE: &str = "tracker_device";
pub const PARAMETERS: &str = "parameters";
