//! Alert types, candidates and stored instances

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wireless::{FrameMeta, MacAddr};

/// Known alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    UnexpectedBssidBeacon,
    UnexpectedBssidProberesp,
    UnexpectedSsidBeacon,
    UnexpectedSsidProberesp,
    UnexpectedChannelBeacon,
    UnexpectedChannelProberesp,
    CryptoChangeBeacon,
    CryptoChangeProberesp,
    UnexpectedFingerprintBeacon,
    UnexpectedFingerprintProberesp,
}

impl AlertType {
    pub const ALL: [AlertType; 10] = [
        AlertType::UnexpectedBssidBeacon,
        AlertType::UnexpectedBssidProberesp,
        AlertType::UnexpectedSsidBeacon,
        AlertType::UnexpectedSsidProberesp,
        AlertType::UnexpectedChannelBeacon,
        AlertType::UnexpectedChannelProberesp,
        AlertType::CryptoChangeBeacon,
        AlertType::CryptoChangeProberesp,
        AlertType::UnexpectedFingerprintBeacon,
        AlertType::UnexpectedFingerprintProberesp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlertType::UnexpectedBssidBeacon => "UNEXPECTED_BSSID_BEACON",
            AlertType::UnexpectedBssidProberesp => "UNEXPECTED_BSSID_PROBERESP",
            AlertType::UnexpectedSsidBeacon => "UNEXPECTED_SSID_BEACON",
            AlertType::UnexpectedSsidProberesp => "UNEXPECTED_SSID_PROBERESP",
            AlertType::UnexpectedChannelBeacon => "UNEXPECTED_CHANNEL_BEACON",
            AlertType::UnexpectedChannelProberesp => "UNEXPECTED_CHANNEL_PROBERESP",
            AlertType::CryptoChangeBeacon => "CRYPTO_CHANGE_BEACON",
            AlertType::CryptoChangeProberesp => "CRYPTO_CHANGE_PROBERESP",
            AlertType::UnexpectedFingerprintBeacon => "UNEXPECTED_FINGERPRINT_BEACON",
            AlertType::UnexpectedFingerprintProberesp => "UNEXPECTED_FINGERPRINT_PROBERESP",
        }
    }

    /// Case-insensitive lookup by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_uppercase();
        Self::ALL.iter().copied().find(|t| t.name() == upper)
    }

    pub fn documentation(&self) -> &'static str {
        match self {
            AlertType::UnexpectedBssidBeacon | AlertType::UnexpectedBssidProberesp => {
                "A transmitter that is not on the BSSID whitelist is advertising one of \
                 your networks. This is the signature of an evil twin or a rogue access point."
            }
            AlertType::UnexpectedSsidBeacon | AlertType::UnexpectedSsidProberesp => {
                "A whitelisted BSSID is advertising an SSID it is not configured for. The \
                 access point may have been reconfigured or its address is being spoofed."
            }
            AlertType::UnexpectedChannelBeacon | AlertType::UnexpectedChannelProberesp => {
                "One of your networks was observed on a channel it is not configured for."
            }
            AlertType::CryptoChangeBeacon | AlertType::CryptoChangeProberesp => {
                "One of your networks is advertising security protocols that differ from \
                 its configuration. A downgrade usually indicates a spoofed access point."
            }
            AlertType::UnexpectedFingerprintBeacon | AlertType::UnexpectedFingerprintProberesp => {
                "A whitelisted BSSID transmitted a frame with an unknown fingerprint. The \
                 address is likely being spoofed by different hardware."
            }
        }
    }

    /// Evidence beyond ssid + transmitter that identifies the condition
    fn key_detail(&self, channel: Option<u16>, security: &[String], fingerprint: Option<&String>) -> Option<String> {
        match self {
            AlertType::UnexpectedChannelBeacon | AlertType::UnexpectedChannelProberesp => {
                channel.map(|c| c.to_string())
            }
            AlertType::CryptoChangeBeacon | AlertType::CryptoChangeProberesp => {
                let mut security: Vec<String> = security.iter().map(|s| s.to_uppercase()).collect();
                security.sort();
                Some(security.join(","))
            }
            AlertType::UnexpectedFingerprintBeacon | AlertType::UnexpectedFingerprintProberesp => {
                fingerprint.cloned()
            }
            _ => None,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Subsystem that produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subsystem {
    Dot11,
}

/// Identifies "the same underlying condition" across repeated observations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub alert_type: AlertType,
    pub ssid: String,
    pub transmitter: MacAddr,
    pub detail: Option<String>,
}

/// Matcher output, not yet filtered or stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub alert_type: AlertType,
    pub ssid: String,
    pub transmitter: MacAddr,
    pub destination: Option<MacAddr>,
    pub channel: Option<u16>,
    pub security: Vec<String>,
    pub fingerprint: Option<String>,
    pub meta: FrameMeta,
}

impl AlertCandidate {
    pub fn new(alert_type: AlertType, ssid: &str, transmitter: MacAddr, meta: FrameMeta) -> Self {
        Self {
            alert_type,
            ssid: ssid.to_string(),
            transmitter,
            destination: None,
            channel: meta.channel,
            security: Vec::new(),
            fingerprint: None,
            meta,
        }
    }

    pub fn with_destination(mut self, destination: MacAddr) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_security(mut self, security: Vec<String>) -> Self {
        self.security = security;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey {
            alert_type: self.alert_type,
            ssid: self.ssid.clone(),
            transmitter: self.transmitter,
            detail: self
                .alert_type
                .key_detail(self.channel, &self.security, self.fingerprint.as_ref()),
        }
    }

    pub fn message(&self) -> String {
        match self.alert_type {
            AlertType::UnexpectedBssidBeacon => format!(
                "SSID [{}] was advertised by an unexpected BSSID [{}]",
                self.ssid, self.transmitter
            ),
            AlertType::UnexpectedBssidProberesp => format!(
                "SSID [{}] was advertised by an unexpected BSSID [{}] in a probe response to [{}]",
                self.ssid,
                self.transmitter,
                self.destination.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string())
            ),
            AlertType::UnexpectedSsidBeacon | AlertType::UnexpectedSsidProberesp => format!(
                "BSSID [{}] advertised an unexpected SSID [{}]",
                self.transmitter, self.ssid
            ),
            AlertType::UnexpectedChannelBeacon | AlertType::UnexpectedChannelProberesp => format!(
                "SSID [{}] was advertised on an unexpected channel [{}]",
                self.ssid,
                self.channel.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string())
            ),
            AlertType::CryptoChangeBeacon | AlertType::CryptoChangeProberesp => format!(
                "SSID [{}] on BSSID [{}] advertised unexpected security [{}]",
                self.ssid,
                self.transmitter,
                if self.security.is_empty() { "NONE".to_string() } else { self.security.join(", ") }
            ),
            AlertType::UnexpectedFingerprintBeacon | AlertType::UnexpectedFingerprintProberesp => format!(
                "SSID [{}] on BSSID [{}] was advertised with an unexpected fingerprint [{}]",
                self.ssid,
                self.transmitter,
                self.fingerprint.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

/// A stored, correlated alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertInstance {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub subsystem: Subsystem,
    pub message: String,
    pub ssid: String,
    pub transmitter: MacAddr,
    pub destination: Option<MacAddr>,
    pub channel: Option<u16>,
    pub security: Vec<String>,
    pub fingerprint: Option<String>,
    /// Metadata of the most recent merged frame
    pub meta: FrameMeta,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Number of observations merged into this alert
    pub frame_count: u64,
}

impl AlertInstance {
    pub(crate) fn from_candidate(candidate: AlertCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type: candidate.alert_type,
            subsystem: Subsystem::Dot11,
            message: candidate.message(),
            ssid: candidate.ssid,
            transmitter: candidate.transmitter,
            destination: candidate.destination,
            channel: candidate.channel,
            security: candidate.security,
            fingerprint: candidate.fingerprint,
            meta: candidate.meta,
            first_seen: now,
            last_seen: now,
            frame_count: 1,
        }
    }

    pub(crate) fn touch(&mut self, candidate: AlertCandidate, now: DateTime<Utc>) {
        if now > self.last_seen {
            self.last_seen = now;
        }
        if candidate.destination.is_some() {
            self.destination = candidate.destination;
        }
        self.meta = candidate.meta;
        self.frame_count += 1;
    }

    /// Key this alert was correlated under
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey {
            alert_type: self.alert_type,
            ssid: self.ssid.clone(),
            transmitter: self.transmitter,
            detail: self
                .alert_type
                .key_detail(self.channel, &self.security, self.fingerprint.as_ref()),
        }
    }

    pub fn documentation(&self) -> &'static str {
        self.alert_type.documentation()
    }
}
