//! Whitelisted BSSID transmitting with unfamiliar hardware
//!
//! Only BSSIDs with at least one configured fingerprint are checked, and
//! only frames the decoder fingerprinted.

use std::sync::Arc;

use super::{Advertisement, AdvertisementKind};
use crate::alerts::{AlertCandidate, AlertType};
use crate::config::ConfigurationModel;
use crate::wireless::frame::{Dot11Frame, FrameSubtype};
use crate::wireless::interceptor::{FrameInterceptor, FrameParseError};

#[derive(Debug)]
pub struct UnexpectedFingerprintInterceptor {
    kind: AdvertisementKind,
    model: Arc<ConfigurationModel>,
}

impl UnexpectedFingerprintInterceptor {
    pub fn new(kind: AdvertisementKind, model: Arc<ConfigurationModel>) -> Self {
        Self { kind, model }
    }
}

impl FrameInterceptor for UnexpectedFingerprintInterceptor {
    fn name(&self) -> &'static str {
        self.kind.pick("unexpected-fingerprint-beacon", "unexpected-fingerprint-proberesp")
    }

    fn subtype(&self) -> FrameSubtype {
        self.kind.subtype()
    }

    fn intercept(&self, frame: &Dot11Frame) -> Result<Vec<AlertCandidate>, FrameParseError> {
        let ad = Advertisement::read(self.kind, frame)?;
        let Some(fingerprint) = frame.fingerprint.as_deref() else {
            return Ok(Vec::new());
        };
        let fingerprint = fingerprint.to_lowercase();

        let alert_type = self
            .kind
            .pick(AlertType::UnexpectedFingerprintBeacon, AlertType::UnexpectedFingerprintProberesp);

        Ok(ad
            .networks(&self.model)
            .filter_map(|network| network.bssid(&ad.transmitter))
            .filter(|bssid| !bssid.fingerprints.is_empty() && !bssid.fingerprints.contains(&fingerprint))
            .map(|_| ad.candidate(alert_type).with_fingerprint(Some(fingerprint.clone())))
            .collect())
    }
}
