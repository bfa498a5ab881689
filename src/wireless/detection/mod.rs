//! Network-integrity matchers
//!
//! Every matcher reads beacons and probe responses through the same
//! [`Advertisement`] view and checks it against the networks of the
//! configuration generation it was built for.

mod crypto_change;
mod fingerprint;
mod unexpected_bssid;
mod unexpected_channel;
mod unexpected_ssid;

pub use crypto_change::CryptoChangeInterceptor;
pub use fingerprint::UnexpectedFingerprintInterceptor;
pub use unexpected_bssid::UnexpectedBssidInterceptor;
pub use unexpected_channel::UnexpectedChannelInterceptor;
pub use unexpected_ssid::UnexpectedSsidInterceptor;

use std::sync::Arc;

use crate::alerts::{AlertCandidate, AlertType};
use crate::config::{ConfigurationModel, NetworkDefinition};
use crate::wireless::frame::{Dot11Frame, FrameSubtype, MacAddr};
use crate::wireless::interceptor::{FrameInterceptor, FrameParseError};

/// Which advertising frame a matcher instance handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisementKind {
    Beacon,
    ProbeResponse,
}

impl AdvertisementKind {
    pub const ALL: [AdvertisementKind; 2] = [AdvertisementKind::Beacon, AdvertisementKind::ProbeResponse];

    pub fn subtype(&self) -> FrameSubtype {
        match self {
            AdvertisementKind::Beacon => FrameSubtype::Beacon,
            AdvertisementKind::ProbeResponse => FrameSubtype::ProbeResponse,
        }
    }

    /// Choose between the beacon and probe-response flavour of something
    pub fn pick<T>(&self, beacon: T, probe_response: T) -> T {
        match self {
            AdvertisementKind::Beacon => beacon,
            AdvertisementKind::ProbeResponse => probe_response,
        }
    }
}

/// The fields matchers care about, read out of a beacon or probe response
#[derive(Debug, Clone, Copy)]
pub struct Advertisement<'a> {
    pub kind: AdvertisementKind,
    pub ssid: &'a str,
    pub transmitter: MacAddr,
    /// Probe responses only
    pub destination: Option<MacAddr>,
    pub frame: &'a Dot11Frame,
}

impl<'a> Advertisement<'a> {
    pub fn read(kind: AdvertisementKind, frame: &'a Dot11Frame) -> Result<Self, FrameParseError> {
        let ssid = frame
            .ssid
            .as_deref()
            .ok_or_else(|| FrameParseError::missing(frame, "ssid"))?;

        let destination = match kind {
            AdvertisementKind::Beacon => None,
            AdvertisementKind::ProbeResponse => Some(
                frame
                    .destination
                    .ok_or_else(|| FrameParseError::missing(frame, "destination"))?,
            ),
        };

        Ok(Self {
            kind,
            ssid,
            transmitter: frame.transmitter,
            destination,
            frame,
        })
    }

    pub fn is_hidden(&self) -> bool {
        self.ssid.is_empty()
    }

    /// Configured networks advertising under this SSID; none for hidden SSIDs
    pub fn networks<'m>(&self, model: &'m ConfigurationModel) -> impl Iterator<Item = &'m NetworkDefinition> + 'm {
        let ssid = if self.is_hidden() { None } else { Some(self.ssid.to_string()) };
        model
            .networks
            .iter()
            .filter(move |n| ssid.as_deref() == Some(n.ssid.as_str()))
    }

    pub fn candidate(&self, alert_type: AlertType) -> AlertCandidate {
        let candidate = AlertCandidate::new(alert_type, self.ssid, self.transmitter, self.frame.meta.clone());
        match self.destination {
            Some(destination) => candidate.with_destination(destination),
            None => candidate,
        }
    }
}

/// Every matcher for both advertisement kinds, in dispatch order
pub fn interceptors(model: &Arc<ConfigurationModel>) -> Vec<Box<dyn FrameInterceptor>> {
    let mut list: Vec<Box<dyn FrameInterceptor>> = Vec::new();
    for kind in AdvertisementKind::ALL {
        list.push(Box::new(UnexpectedBssidInterceptor::new(kind, model.clone())));
        list.push(Box::new(UnexpectedSsidInterceptor::new(kind, model.clone())));
        list.push(Box::new(UnexpectedChannelInterceptor::new(kind, model.clone())));
        list.push(Box::new(CryptoChangeInterceptor::new(kind, model.clone())));
        list.push(Box::new(UnexpectedFingerprintInterceptor::new(kind, model.clone())));
    }
    list
}
