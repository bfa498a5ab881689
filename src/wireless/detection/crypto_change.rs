//! Security downgrade / change detection

use std::sync::Arc;

use super::{Advertisement, AdvertisementKind};
use crate::alerts::{AlertCandidate, AlertType};
use crate::config::ConfigurationModel;
use crate::wireless::frame::{Dot11Frame, FrameSubtype};
use crate::wireless::interceptor::{FrameInterceptor, FrameParseError};

#[derive(Debug)]
pub struct CryptoChangeInterceptor {
    kind: AdvertisementKind,
    model: Arc<ConfigurationModel>,
}

impl CryptoChangeInterceptor {
    pub fn new(kind: AdvertisementKind, model: Arc<ConfigurationModel>) -> Self {
        Self { kind, model }
    }
}

impl FrameInterceptor for CryptoChangeInterceptor {
    fn name(&self) -> &'static str {
        self.kind.pick("crypto-change-beacon", "crypto-change-proberesp")
    }

    fn subtype(&self) -> FrameSubtype {
        self.kind.subtype()
    }

    fn intercept(&self, frame: &Dot11Frame) -> Result<Vec<AlertCandidate>, FrameParseError> {
        let ad = Advertisement::read(self.kind, frame)?;
        let alert_type = self
            .kind
            .pick(AlertType::CryptoChangeBeacon, AlertType::CryptoChangeProberesp);

        Ok(ad
            .networks(&self.model)
            .filter(|network| network.is_authorized(&ad.transmitter))
            .filter(|network| !network.security_matches(&frame.security))
            .map(|_| ad.candidate(alert_type).with_security(frame.security.clone()))
            .collect())
    }
}
