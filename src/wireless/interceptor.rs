//! Subtype-keyed interceptor dispatch

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use super::frame::{Dot11Frame, FrameSubtype, MacAddr};
use crate::alerts::AlertCandidate;

/// Recoverable failure to read an interceptor-specific field from a frame
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameParseError {
    #[error("{subtype} frame from {transmitter} has no {field}")]
    MissingField {
        subtype: FrameSubtype,
        transmitter: MacAddr,
        field: &'static str,
    },
}

impl FrameParseError {
    pub fn missing(frame: &Dot11Frame, field: &'static str) -> Self {
        FrameParseError::MissingField {
            subtype: frame.subtype,
            transmitter: frame.transmitter,
            field,
        }
    }
}

/// Inspects frames of one subtype
pub trait FrameInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn subtype(&self) -> FrameSubtype;

    fn intercept(&self, frame: &Dot11Frame) -> Result<Vec<AlertCandidate>, FrameParseError>;
}

/// Outcome of dispatching one frame
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub candidates: Vec<AlertCandidate>,
    /// Parse failures, paired with the interceptor that reported them
    pub errors: Vec<(&'static str, FrameParseError)>,
    pub interceptors_run: usize,
}

/// Routes frames to interceptors in registration order
#[derive(Default)]
pub struct Dispatcher {
    interceptors: HashMap<FrameSubtype, Vec<Box<dyn FrameInterceptor>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interceptor: Box<dyn FrameInterceptor>) {
        self.interceptors
            .entry(interceptor.subtype())
            .or_default()
            .push(interceptor);
    }

    pub fn register_all(&mut self, interceptors: impl IntoIterator<Item = Box<dyn FrameInterceptor>>) {
        for interceptor in interceptors {
            self.register(interceptor);
        }
    }

    /// Interceptor names registered for a subtype, in dispatch order
    pub fn registered(&self, subtype: FrameSubtype) -> Vec<&'static str> {
        self.interceptors
            .get(&subtype)
            .map(|list| list.iter().map(|i| i.name()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.interceptors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every interceptor for the frame's subtype.
    ///
    /// Subtypes nobody registered for are dropped silently. A parse error
    /// in one interceptor does not stop the ones after it.
    pub fn dispatch(&self, frame: &Dot11Frame) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(interceptors) = self.interceptors.get(&frame.subtype) else {
            return report;
        };

        for interceptor in interceptors {
            report.interceptors_run += 1;
            match interceptor.intercept(frame) {
                Ok(candidates) => report.candidates.extend(candidates),
                Err(e) => {
                    warn!("{} could not parse frame: {}", interceptor.name(), e);
                    report.errors.push((interceptor.name(), e));
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (subtype, list) in &self.interceptors {
            map.entry(subtype, &list.iter().map(|i| i.name()).collect::<Vec<_>>());
        }
        map.finish()
    }
}
