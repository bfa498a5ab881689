//! Whitelisted BSSID advertising a name it is not configured for

use std::sync::Arc;

use super::{Advertisement, AdvertisementKind};
use crate::alerts::{AlertCandidate, AlertType};
use crate::config::ConfigurationModel;
use crate::wireless::frame::{Dot11Frame, FrameSubtype};
use crate::wireless::interceptor::{FrameInterceptor, FrameParseError};

#[derive(Debug)]
pub struct UnexpectedSsidInterceptor {
    kind: AdvertisementKind,
    model: Arc<ConfigurationModel>,
}

impl UnexpectedSsidInterceptor {
    pub fn new(kind: AdvertisementKind, model: Arc<ConfigurationModel>) -> Self {
        Self { kind, model }
    }
}

impl FrameInterceptor for UnexpectedSsidInterceptor {
    fn name(&self) -> &'static str {
        self.kind.pick("unexpected-ssid-beacon", "unexpected-ssid-proberesp")
    }

    fn subtype(&self) -> FrameSubtype {
        self.kind.subtype()
    }

    fn intercept(&self, frame: &Dot11Frame) -> Result<Vec<AlertCandidate>, FrameParseError> {
        let ad = Advertisement::read(self.kind, frame)?;
        if ad.is_hidden() {
            return Ok(Vec::new());
        }

        let mut owners = self
            .model
            .networks
            .iter()
            .filter(|network| network.is_authorized(&ad.transmitter))
            .peekable();

        if owners.peek().is_none() {
            return Ok(Vec::new());
        }

        if owners.any(|network| network.ssid == ad.ssid) {
            return Ok(Vec::new());
        }

        let alert_type = self
            .kind
            .pick(AlertType::UnexpectedSsidBeacon, AlertType::UnexpectedSsidProberesp);
        Ok(vec![ad.candidate(alert_type)])
    }
}
