//! Logical validation of a structurally parsed model
//!
//! Trap-device channels and devices are not cross-checked against the
//! monitors; see DESIGN.md.

use std::collections::HashSet;
use std::path::Path;

use nix::unistd::{access, AccessFlags};

use super::error::{ConfigError, Result};
use super::keys;
use super::model::ConfigurationModel;

/// Length of a hex-encoded SHA-256 digest
pub const PASSWORD_HASH_LENGTH: usize = 64;

pub(crate) fn validate(model: &ConfigurationModel) -> Result<()> {
    validate_password_hash(model)?;
    validate_scripts(model)?;
    validate_interfaces(model)?;
    validate_monitors(model)?;
    validate_networks(model)?;
    Ok(())
}

fn path(parts: &[&str]) -> String {
    parts.join(".")
}

fn validate_password_hash(model: &ConfigurationModel) -> Result<()> {
    let len = model.admin_password_hash.chars().count();
    if len != PASSWORD_HASH_LENGTH {
        return Err(ConfigError::invalid(
            path(&[keys::GENERAL, keys::ADMIN_PASSWORD_HASH]),
            format!("must be {} characters long (a SHA256 hash), got {}", PASSWORD_HASH_LENGTH, len),
        ));
    }
    Ok(())
}

fn is_executable_file(p: &Path) -> bool {
    p.is_file() && access(p, AccessFlags::X_OK).is_ok()
}

fn is_writable_dir(p: &Path) -> bool {
    p.is_dir() && access(p, AccessFlags::W_OK).is_ok()
}

fn is_readable_file(p: &Path) -> bool {
    p.is_file() && access(p, AccessFlags::R_OK).is_ok()
}

fn validate_scripts(model: &ConfigurationModel) -> Result<()> {
    let scripts = &model.scripts;

    if !is_executable_file(&scripts.executable) {
        return Err(ConfigError::invalid(
            path(&[keys::GENERAL, keys::SCRIPTS, keys::SCRIPT_EXECUTABLE]),
            format!("does not point to an executable file: {}", scripts.executable.display()),
        ));
    }

    if !is_writable_dir(&scripts.directory) {
        return Err(ConfigError::invalid(
            path(&[keys::GENERAL, keys::SCRIPTS, keys::SCRIPT_DIRECTORY]),
            format!("does not point to a writable directory: {}", scripts.directory.display()),
        ));
    }

    Ok(())
}

fn validate_interfaces(model: &ConfigurationModel) -> Result<()> {
    let interfaces = &model.interfaces;
    let (scheme, hint) = if interfaces.use_tls {
        ("https", "TLS is enabled but the URI does not use HTTPS")
    } else {
        ("http", "TLS is disabled but the URI does not use HTTP. Do not use HTTPS")
    };

    for (key, uri) in [
        (keys::REST_LISTEN_URI, &interfaces.rest_listen_uri),
        (keys::HTTP_EXTERNAL_URI, &interfaces.http_external_uri),
    ] {
        if uri.scheme() != scheme {
            return Err(ConfigError::invalid(
                path(&[keys::INTERFACES, key]),
                format!("{}: {}", hint, uri),
            ));
        }
    }

    if interfaces.use_tls {
        for (key, file) in [
            (keys::TLS_CERTIFICATE_PATH, &interfaces.tls_certificate_path),
            (keys::TLS_KEY_PATH, &interfaces.tls_key_path),
        ] {
            let p = path(&[keys::INTERFACES, key]);
            let file = file.as_ref().ok_or_else(|| ConfigError::missing(p.clone()))?;
            if !is_readable_file(file) {
                return Err(ConfigError::invalid(
                    p,
                    format!("points to a file that is not readable: {}", file.display()),
                ));
            }
        }
    }

    Ok(())
}

fn validate_monitors(model: &ConfigurationModel) -> Result<()> {
    let mut channels = HashSet::new();
    let mut devices = HashSet::new();

    for (i, monitor) in model.monitors.iter().enumerate() {
        let where_ = format!("{}.#{}", keys::DOT11_MONITORS, i);

        for channel in &monitor.channels {
            if !channels.insert(*channel) {
                return Err(ConfigError::invalid(
                    format!("{}.{}", where_, keys::CHANNELS),
                    format!(
                        "channel [{}] is defined for multiple 802.11 monitors, \
                         channels cannot be duplicate per monitor or across monitors",
                        channel
                    ),
                ));
            }
        }

        if !devices.insert(monitor.device.as_str()) {
            return Err(ConfigError::invalid(
                format!("{}.{}", where_, keys::DEVICE),
                format!("device [{}] is defined for multiple 802.11 monitors", monitor.device),
            ));
        }
    }

    Ok(())
}

fn validate_networks(model: &ConfigurationModel) -> Result<()> {
    let mut ssids = HashSet::new();

    for (i, network) in model.networks.iter().enumerate() {
        let where_ = format!("{}.#{}", keys::DOT11_NETWORKS, i);

        // Hidden networks advertise an empty SSID and can never be matched.
        if network.ssid.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{}.{}", where_, keys::SSID),
                "SSID must not be empty",
            ));
        }

        if !ssids.insert(network.ssid.as_str()) {
            return Err(ConfigError::invalid(
                format!("{}.{}", where_, keys::SSID),
                format!("SSID [{}] is defined multiple times", network.ssid),
            ));
        }

        // Addresses are already normalized, so equality is case-insensitive.
        // The same BSSID may appear under other networks.
        let mut bssids = HashSet::new();
        for (j, bssid) in network.bssids.iter().enumerate() {
            if !bssids.insert(bssid.address) {
                return Err(ConfigError::invalid(
                    format!("{}.{}.#{}.{}", where_, keys::BSSIDS, j, keys::ADDRESS),
                    format!(
                        "network [{}] has BSSID [{}] defined more than once",
                        network.ssid, bssid.address
                    ),
                ));
            }
        }
    }

    Ok(())
}
