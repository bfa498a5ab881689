//! Configured network observed on a channel it does not use

use std::sync::Arc;

use super::{Advertisement, AdvertisementKind};
use crate::alerts::{AlertCandidate, AlertType};
use crate::config::ConfigurationModel;
use crate::wireless::frame::{Dot11Frame, FrameSubtype};
use crate::wireless::interceptor::{FrameInterceptor, FrameParseError};

#[derive(Debug)]
pub struct UnexpectedChannelInterceptor {
    kind: AdvertisementKind,
    model: Arc<ConfigurationModel>,
}

impl UnexpectedChannelInterceptor {
    pub fn new(kind: AdvertisementKind, model: Arc<ConfigurationModel>) -> Self {
        Self { kind, model }
    }
}

impl FrameInterceptor for UnexpectedChannelInterceptor {
    fn name(&self) -> &'static str {
        self.kind.pick("unexpected-channel-beacon", "unexpected-channel-proberesp")
    }

    fn subtype(&self) -> FrameSubtype {
        self.kind.subtype()
    }

    fn intercept(&self, frame: &Dot11Frame) -> Result<Vec<AlertCandidate>, FrameParseError> {
        let ad = Advertisement::read(self.kind, frame)?;
        let alert_type = self
            .kind
            .pick(AlertType::UnexpectedChannelBeacon, AlertType::UnexpectedChannelProberesp);

        let mut candidates = Vec::new();
        for network in ad.networks(&self.model) {
            if !network.is_authorized(&ad.transmitter) {
                continue;
            }

            let channel = frame
                .meta
                .channel
                .ok_or_else(|| FrameParseError::missing(frame, "channel"))?;

            if !network.channels.contains(&channel) {
                candidates.push(ad.candidate(alert_type));
            }
        }

        Ok(candidates)
    }
}
