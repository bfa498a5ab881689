//! 802.11 frame interception
//!
//! Decoded management frames are routed by subtype to the interceptors
//! registered for them. Interceptors compare what the air advertises
//! against the configured networks and emit alert candidates:
//! - Unexpected BSSID (evil twin / rogue AP)
//! - Unexpected SSID on a whitelisted BSSID
//! - Unexpected channel
//! - Security downgrade or change
//! - Unexpected transmitter fingerprint

pub mod detection;
pub mod frame;
pub mod interceptor;

pub use detection::{
    interceptors, CryptoChangeInterceptor, UnexpectedBssidInterceptor, UnexpectedChannelInterceptor,
    UnexpectedFingerprintInterceptor, UnexpectedSsidInterceptor,
};
pub use frame::{Dot11Frame, FrameMeta, FrameSubtype, MacAddr, MacParseError};
pub use interceptor::{DispatchReport, Dispatcher, FrameInterceptor, FrameParseError};
