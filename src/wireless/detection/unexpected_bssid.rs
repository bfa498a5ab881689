//! Evil twin / rogue AP detection
//!
//! A configured SSID advertised by a transmitter that is not on that
//! network's BSSID whitelist.

use std::sync::Arc;

use super::{Advertisement, AdvertisementKind};
use crate::alerts::{AlertCandidate, AlertType};
use crate::config::ConfigurationModel;
use crate::wireless::frame::{Dot11Frame, FrameSubtype};
use crate::wireless::interceptor::{FrameInterceptor, FrameParseError};

#[derive(Debug)]
pub struct UnexpectedBssidInterceptor {
    kind: AdvertisementKind,
    model: Arc<ConfigurationModel>,
}

impl UnexpectedBssidInterceptor {
    pub fn new(kind: AdvertisementKind, model: Arc<ConfigurationModel>) -> Self {
        Self { kind, model }
    }
}

impl FrameInterceptor for UnexpectedBssidInterceptor {
    fn name(&self) -> &'static str {
        self.kind.pick("unexpected-bssid-beacon", "unexpected-bssid-proberesp")
    }

    fn subtype(&self) -> FrameSubtype {
        self.kind.subtype()
    }

    fn intercept(&self, frame: &Dot11Frame) -> Result<Vec<AlertCandidate>, FrameParseError> {
        let ad = Advertisement::read(self.kind, frame)?;
        let alert_type = self
            .kind
            .pick(AlertType::UnexpectedBssidBeacon, AlertType::UnexpectedBssidProberesp);

        // One candidate per colliding network definition.
        Ok(ad
            .networks(&self.model)
            .filter(|network| !network.is_authorized(&ad.transmitter))
            .map(|_| ad.candidate(alert_type))
            .collect())
    }
}
