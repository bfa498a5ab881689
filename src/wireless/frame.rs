//! Decoded 802.11 frames
//!
//! Byte-level decoding happens upstream in the capture layer; this module
//! only defines the decoded shape the interceptors consume.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2],
            self.0[3], self.0[4], self.0[5])
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid MAC address: {0}")]
pub struct MacParseError(pub String);

impl FromStr for MacAddr {
    type Err = MacParseError;

    /// Accepts `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split(|c| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(MacParseError(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(MacParseError(s.to_string()));
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| MacParseError(s.to_string()))?;
        }

        Ok(Self::new(bytes))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Frame subtype identifier.
///
/// Management subtypes carry their 802.11 subtype value; anything the
/// capture layer does not classify ends up as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSubtype {
    AssocRequest = 0x00,
    AssocResponse = 0x01,
    ReassocRequest = 0x02,
    ReassocResponse = 0x03,
    ProbeRequest = 0x04,
    ProbeResponse = 0x05,
    Beacon = 0x08,
    Disassociation = 0x0a,
    Authentication = 0x0b,
    Deauthentication = 0x0c,
    Action = 0x0d,
    Other = 0xff,
}

impl FrameSubtype {
    /// Map a raw management subtype value (lower 4 bits) to an identifier.
    pub fn from_management(subtype: u8) -> Self {
        match subtype & 0x0f {
            0 => FrameSubtype::AssocRequest,
            1 => FrameSubtype::AssocResponse,
            2 => FrameSubtype::ReassocRequest,
            3 => FrameSubtype::ReassocResponse,
            4 => FrameSubtype::ProbeRequest,
            5 => FrameSubtype::ProbeResponse,
            8 => FrameSubtype::Beacon,
            10 => FrameSubtype::Disassociation,
            11 => FrameSubtype::Authentication,
            12 => FrameSubtype::Deauthentication,
            13 => FrameSubtype::Action,
            _ => FrameSubtype::Other,
        }
    }
}

impl fmt::Display for FrameSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameSubtype::AssocRequest => "assoc-request",
            FrameSubtype::AssocResponse => "assoc-response",
            FrameSubtype::ReassocRequest => "reassoc-request",
            FrameSubtype::ReassocResponse => "reassoc-response",
            FrameSubtype::ProbeRequest => "probe-request",
            FrameSubtype::ProbeResponse => "probe-response",
            FrameSubtype::Beacon => "beacon",
            FrameSubtype::Disassociation => "disassociation",
            FrameSubtype::Authentication => "authentication",
            FrameSubtype::Deauthentication => "deauthentication",
            FrameSubtype::Action => "action",
            FrameSubtype::Other => "other",
        };
        f.write_str(name)
    }
}

/// Capture metadata attached by the radio layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    /// Capture timestamp
    pub timestamp: DateTime<Utc>,
    /// Signal strength in dBm
    #[serde(default)]
    pub signal_dbm: Option<i8>,
    /// Channel the monitor was tuned to
    #[serde(default)]
    pub channel: Option<u16>,
    /// Capturing monitor device
    #[serde(default)]
    pub device: Option<String>,
}

impl FrameMeta {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            signal_dbm: None,
            channel: None,
            device: None,
        }
    }

    pub fn with_channel(mut self, channel: u16) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_signal(mut self, signal_dbm: i8) -> Self {
        self.signal_dbm = Some(signal_dbm);
        self
    }
}

/// A decoded 802.11 frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dot11Frame {
    pub subtype: FrameSubtype,
    /// Transmitter address (the BSSID for AP-originated management frames)
    pub transmitter: MacAddr,
    #[serde(default)]
    pub destination: Option<MacAddr>,
    /// Advertised SSID; `Some("")` for hidden networks
    #[serde(default)]
    pub ssid: Option<String>,
    /// Advertised security protocols (e.g. `WPA2-PSK`)
    #[serde(default)]
    pub security: Vec<String>,
    /// Transmitter fingerprint computed by the decoder
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub meta: FrameMeta,
}

impl Dot11Frame {
    pub fn new(subtype: FrameSubtype, transmitter: MacAddr, meta: FrameMeta) -> Self {
        Self {
            subtype,
            transmitter,
            destination: None,
            ssid: None,
            security: Vec::new(),
            fingerprint: None,
            meta,
        }
    }

    pub fn beacon(ssid: &str, transmitter: MacAddr, meta: FrameMeta) -> Self {
        Self::new(FrameSubtype::Beacon, transmitter, meta).with_ssid(ssid)
    }

    pub fn probe_response(ssid: &str, transmitter: MacAddr, destination: MacAddr, meta: FrameMeta) -> Self {
        let mut frame = Self::new(FrameSubtype::ProbeResponse, transmitter, meta).with_ssid(ssid);
        frame.destination = Some(destination);
        frame
    }

    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = Some(ssid.to_string());
        self
    }

    pub fn with_security(mut self, security: &[&str]) -> Self {
        self.security = security.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: &str) -> Self {
        self.fingerprint = Some(fingerprint.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_parse_is_case_insensitive() {
        let upper: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let lower: MacAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_mac_parse_dashes() {
        let mac: MacAddr = "00-11-22-33-44-55".parse().unwrap();
        assert_eq!(mac.as_bytes(), &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    }

    #[test]
    fn test_mac_parse_rejects_garbage() {
        assert!("aa:bb:cc".parse::<MacAddr>().is_err());
        assert!("aa:bb:cc:dd:ee:gg".parse::<MacAddr>().is_err());
        assert!("aaa:bb:cc:dd:ee:f".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_subtype_from_management() {
        assert_eq!(FrameSubtype::from_management(8), FrameSubtype::Beacon);
        assert_eq!(FrameSubtype::from_management(5), FrameSubtype::ProbeResponse);
        assert_eq!(FrameSubtype::from_management(7), FrameSubtype::Other);
    }

    #[test]
    fn test_frame_json_shape() {
        let json = r#"{
            "subtype": "beacon",
            "transmitter": "AA:BB:CC:DD:EE:FF",
            "ssid": "Corp",
            "meta": { "timestamp": "2024-01-01T00:00:00Z", "channel": 6 }
        }"#;
        let frame: Dot11Frame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.subtype, FrameSubtype::Beacon);
        assert_eq!(frame.transmitter.to_string(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(frame.meta.channel, Some(6));
        assert!(frame.destination.is_none());
    }
}
