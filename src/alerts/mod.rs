//! Alert Correlation Engine
//!
//! Filters alert candidates by enablement and training state, collapses
//! repeated observations of the same condition into one alert, and expires
//! alerts that have not been observed for the retention period.
//!
//! # Example
//! ```ignore
//! use dot11guard::alerts::{AlertPolicy, AlertService, RaiseOutcome};
//!
//! let service = AlertService::new(AlertPolicy::from_model(&model));
//! match service.raise(candidate) {
//!     RaiseOutcome::Stored(id) => println!("New alert: {}", id),
//!     RaiseOutcome::Merged(id) => println!("Seen again: {}", id),
//!     RaiseOutcome::Suppressed(reason) => println!("Suppressed: {}", reason),
//! }
//! ```

pub mod alert;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

pub use alert::{AlertCandidate, AlertInstance, AlertType, CorrelationKey, Subsystem};

use crate::config::{AlertEnablement, ConfigurationModel};

fn seconds(secs: u64) -> Duration {
    // chrono panics above i64::MAX milliseconds
    let max = (i64::MAX / 1000) as u64;
    Duration::seconds(secs.min(max) as i64)
}

/// Enablement and timing applied to incoming candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPolicy {
    pub enabled: AlertEnablement,
    /// Uptime during which every candidate is withheld
    pub training_period: Duration,
    /// Inactivity after which a stored alert expires
    pub retention: Duration,
}

impl AlertPolicy {
    pub fn new(enabled: AlertEnablement, training_period: Duration, retention: Duration) -> Self {
        Self {
            enabled,
            training_period,
            retention,
        }
    }

    pub fn from_model(model: &ConfigurationModel) -> Self {
        Self {
            enabled: model.alerts.clone(),
            training_period: seconds(model.alerting.training_period_seconds),
            retention: seconds(model.alerting.retention_minutes.saturating_mul(60)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// Alert type is not in the enabled set
    Disabled,
    /// Engine is still inside its training period
    Training,
}

impl fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressionReason::Disabled => write!(f, "disabled"),
            SuppressionReason::Training => write!(f, "training"),
        }
    }
}

/// Result of raising a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "value")]
pub enum RaiseOutcome {
    Suppressed(SuppressionReason),
    /// New alert minted
    Stored(Uuid),
    /// Folded into an existing active alert
    Merged(Uuid),
}

impl RaiseOutcome {
    pub fn alert_id(&self) -> Option<Uuid> {
        match self {
            RaiseOutcome::Stored(id) | RaiseOutcome::Merged(id) => Some(*id),
            RaiseOutcome::Suppressed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlertLookupError {
    #[error("invalid alert id: {0}")]
    InvalidId(String),
    #[error("alert {0} not found")]
    NotFound(Uuid),
}

/// Enabled and disabled alert types, as exposed by the query interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertTypeConfiguration {
    pub enabled: BTreeSet<AlertType>,
    pub disabled: BTreeSet<AlertType>,
}

/// Page of active alerts with the true total
#[derive(Debug, Clone, Serialize)]
pub struct ActiveAlerts {
    pub total: usize,
    /// Ordered by first seen, then by id
    pub alerts: Vec<AlertInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertStats {
    pub raised: u64,
    pub stored: u64,
    pub merged: u64,
    pub suppressed_disabled: u64,
    pub suppressed_training: u64,
    pub expired: u64,
}

#[derive(Debug)]
struct AlertState {
    alerts: HashMap<Uuid, AlertInstance>,
    /// Correlation index for O(1) merging
    by_key: HashMap<CorrelationKey, Uuid>,
    policy: AlertPolicy,
    stats: AlertStats,
}

impl AlertState {
    fn is_active(&self, alert: &AlertInstance, now: DateTime<Utc>) -> bool {
        now - alert.last_seen <= self.policy.retention
    }

    fn remove(&mut self, id: &Uuid) {
        if let Some(alert) = self.alerts.remove(id) {
            let key = alert.correlation_key();
            if self.by_key.get(&key) == Some(id) {
                self.by_key.remove(&key);
            }
        }
    }
}

/// Owner of all alert state
#[derive(Debug)]
pub struct AlertService {
    started_at: DateTime<Utc>,
    state: RwLock<AlertState>,
}

impl AlertService {
    pub fn new(policy: AlertPolicy) -> Self {
        Self::with_start_time(policy, Utc::now())
    }

    /// Measure the training period from `started_at` instead of now
    pub fn with_start_time(policy: AlertPolicy, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            state: RwLock::new(AlertState {
                alerts: HashMap::new(),
                by_key: HashMap::new(),
                policy,
                stats: AlertStats::default(),
            }),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn policy(&self) -> AlertPolicy {
        self.state.read().policy.clone()
    }

    /// Replace enablement and timing; stored alerts are kept.
    pub fn apply_policy(&self, policy: AlertPolicy) {
        let mut state = self.state.write();
        info!(
            "Applying alert policy: {} enabled types, training {}s, retention {}s",
            policy.enabled.enabled().len(),
            policy.training_period.num_seconds(),
            policy.retention.num_seconds()
        );
        state.policy = policy;
    }

    pub fn raise(&self, candidate: AlertCandidate) -> RaiseOutcome {
        self.raise_at(candidate, Utc::now())
    }

    /// Raise with an explicit clock; lookup and insert happen under one write lock.
    pub fn raise_at(&self, candidate: AlertCandidate, now: DateTime<Utc>) -> RaiseOutcome {
        let mut state = self.state.write();
        state.stats.raised += 1;

        // Training takes precedence over enablement.
        if now - self.started_at < state.policy.training_period {
            state.stats.suppressed_training += 1;
            debug!("Suppressing {} alert during training period", candidate.alert_type);
            return RaiseOutcome::Suppressed(SuppressionReason::Training);
        }

        if !state.policy.enabled.is_enabled(candidate.alert_type) {
            state.stats.suppressed_disabled += 1;
            debug!("Suppressing disabled {} alert", candidate.alert_type);
            return RaiseOutcome::Suppressed(SuppressionReason::Disabled);
        }

        let key = candidate.correlation_key();

        if let Some(id) = state.by_key.get(&key).copied() {
            let active = state
                .alerts
                .get(&id)
                .map(|alert| state.is_active(alert, now))
                .unwrap_or(false);

            if active {
                if let Some(alert) = state.alerts.get_mut(&id) {
                    alert.touch(candidate, now);
                }
                state.stats.merged += 1;
                return RaiseOutcome::Merged(id);
            }

            // Expired but not yet swept; its identity is retired.
            state.remove(&id);
            state.stats.expired += 1;
        }

        let alert = AlertInstance::from_candidate(candidate, now);
        let id = alert.id;
        info!("New alert {}: {}", id, alert.message);
        state.alerts.insert(id, alert);
        state.by_key.insert(key, id);
        state.stats.stored += 1;
        RaiseOutcome::Stored(id)
    }

    pub fn expire(&self) -> usize {
        self.expire_at(Utc::now())
    }

    /// Remove every alert not seen within the retention period
    pub fn expire_at(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.write();
        let expired: Vec<Uuid> = state
            .alerts
            .values()
            .filter(|alert| !state.is_active(alert, now))
            .map(|alert| alert.id)
            .collect();

        for id in &expired {
            state.remove(id);
        }
        state.stats.expired += expired.len() as u64;

        if !expired.is_empty() {
            debug!("Expired {} alerts", expired.len());
        }
        expired.len()
    }

    pub fn configured_alert_types(&self) -> AlertTypeConfiguration {
        let state = self.state.read();
        AlertTypeConfiguration {
            enabled: state.policy.enabled.enabled().clone(),
            disabled: state.policy.enabled.disabled(),
        }
    }

    pub fn list_active(&self, limit: usize) -> ActiveAlerts {
        self.list_active_at(limit, Utc::now())
    }

    pub fn list_active_at(&self, limit: usize, now: DateTime<Utc>) -> ActiveAlerts {
        let state = self.state.read();
        let mut active: Vec<&AlertInstance> = state
            .alerts
            .values()
            .filter(|alert| state.is_active(alert, now))
            .collect();
        active.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.id.cmp(&b.id)));

        ActiveAlerts {
            total: active.len(),
            alerts: active.into_iter().take(limit).cloned().collect(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<AlertInstance> {
        self.get_at(id, Utc::now())
    }

    pub fn get_at(&self, id: &Uuid, now: DateTime<Utc>) -> Option<AlertInstance> {
        let state = self.state.read();
        state
            .alerts
            .get(id)
            .filter(|alert| state.is_active(alert, now))
            .cloned()
    }

    /// Look up an alert by its textual id
    pub fn lookup(&self, id: &str) -> Result<AlertInstance, AlertLookupError> {
        let uuid = Uuid::parse_str(id.trim()).map_err(|_| AlertLookupError::InvalidId(id.to_string()))?;
        self.get(&uuid).ok_or(AlertLookupError::NotFound(uuid))
    }

    /// Number of alerts held, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.state.read().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> AlertStats {
        self.state.read().stats.clone()
    }

    /// Periodically expire alerts until `shutdown` turns true or its sender is dropped
    pub fn spawn_expiry_sweep(
        self: &Arc<Self>,
        every: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = interval.tick() => {
                        service.expire();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            info!("Alert expiry sweep stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wireless::{FrameMeta, MacAddr};

    fn mac(s: &str) -> MacAddr {
        s.parse().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        "2024-05-01T12:00:00Z".parse().unwrap()
    }

    fn candidate(alert_type: AlertType, ssid: &str, tx: &str, at: DateTime<Utc>) -> AlertCandidate {
        AlertCandidate::new(alert_type, ssid, mac(tx), FrameMeta::new(at).with_channel(6))
    }

    fn policy(training_secs: i64, retention_mins: i64) -> AlertPolicy {
        AlertPolicy::new(
            AlertEnablement::new([AlertType::UnexpectedBssidBeacon, AlertType::UnexpectedBssidProberesp]),
            Duration::seconds(training_secs),
            Duration::minutes(retention_mins),
        )
    }

    fn service() -> AlertService {
        AlertService::with_start_time(policy(60, 5), t0())
    }

    #[test]
    fn test_training_suppresses_regardless_of_enablement() {
        let svc = service();
        for t in [AlertType::UnexpectedBssidBeacon, AlertType::CryptoChangeBeacon] {
            let at = t0() + Duration::seconds(59);
            let outcome = svc.raise_at(candidate(t, "Corp", "11:22:33:44:55:66", at), at);
            assert_eq!(outcome, RaiseOutcome::Suppressed(SuppressionReason::Training));
        }
        assert!(svc.is_empty());
        assert_eq!(svc.stats().suppressed_training, 2);
    }

    #[test]
    fn test_training_ends_at_period_boundary() {
        let svc = service();
        let at = t0() + Duration::seconds(60);
        let outcome = svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", at), at);
        assert!(matches!(outcome, RaiseOutcome::Stored(_)));
    }

    #[test]
    fn test_disabled_type_is_suppressed() {
        let svc = service();
        let at = t0() + Duration::minutes(2);
        let outcome = svc.raise_at(candidate(AlertType::CryptoChangeBeacon, "Corp", "11:22:33:44:55:66", at), at);
        assert_eq!(outcome, RaiseOutcome::Suppressed(SuppressionReason::Disabled));
        assert_eq!(svc.stats().suppressed_disabled, 1);
    }

    #[test]
    fn test_same_key_merges() {
        let svc = service();
        let first = t0() + Duration::minutes(2);
        let second = first + Duration::minutes(3);

        let id = match svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", first), first) {
            RaiseOutcome::Stored(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        };
        let outcome = svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", second), second);
        assert_eq!(outcome, RaiseOutcome::Merged(id));

        let alert = svc.get_at(&id, second).unwrap();
        assert_eq!(alert.first_seen, first);
        assert_eq!(alert.last_seen, second);
        assert_eq!(alert.frame_count, 2);
        assert_eq!(svc.list_active_at(10, second).total, 1);
    }

    #[test]
    fn test_different_transmitters_are_separate_alerts() {
        let svc = service();
        let at = t0() + Duration::minutes(2);
        let a = svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", at), at);
        let b = svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:67", at), at);
        assert_ne!(a.alert_id(), b.alert_id());
        assert_eq!(svc.len(), 2);
    }

    #[test]
    fn test_expired_key_mints_new_identity() {
        let svc = service();
        let first = t0() + Duration::minutes(2);
        let later = first + Duration::minutes(6);

        let a = svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", first), first);
        let b = svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", later), later);

        assert!(matches!(b, RaiseOutcome::Stored(_)));
        assert_ne!(a.alert_id(), b.alert_id());
        assert!(svc.get_at(&a.alert_id().unwrap(), later).is_none());
        assert_eq!(svc.len(), 1);
    }

    #[test]
    fn test_expiry_sweep_removes_stale_alerts() {
        let svc = service();
        let first = t0() + Duration::minutes(2);
        let fresh = first + Duration::minutes(4);

        svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", first), first);
        svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:77", fresh), fresh);

        // Exactly at retention the alert is still active.
        assert_eq!(svc.expire_at(first + Duration::minutes(5)), 0);

        let sweep = first + Duration::minutes(5) + Duration::seconds(1);
        assert_eq!(svc.expire_at(sweep), 1);
        let active = svc.list_active_at(10, sweep);
        assert_eq!(active.total, 1);
        assert_eq!(active.alerts[0].transmitter, mac("11:22:33:44:55:77"));
        assert_eq!(svc.stats().expired, 1);
    }

    #[test]
    fn test_reads_hide_unswept_expired_alerts() {
        let svc = service();
        let first = t0() + Duration::minutes(2);
        let id = svc
            .raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", first), first)
            .alert_id()
            .unwrap();

        let later = first + Duration::minutes(10);
        assert!(svc.get_at(&id, later).is_none());
        assert_eq!(svc.list_active_at(10, later).total, 0);
        assert_eq!(svc.len(), 1);
    }

    #[test]
    fn test_list_active_orders_and_limits() {
        let svc = service();
        let base = t0() + Duration::minutes(2);
        let txs = ["11:22:33:44:55:03", "11:22:33:44:55:01", "11:22:33:44:55:02"];
        for (i, tx) in txs.iter().enumerate() {
            let at = base + Duration::seconds(i as i64);
            svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", tx, at), at);
        }

        let now = base + Duration::seconds(10);
        let page = svc.list_active_at(2, now);
        assert_eq!(page.total, 3);
        assert_eq!(page.alerts.len(), 2);
        assert_eq!(page.alerts[0].transmitter, mac(txs[0]));
        assert_eq!(page.alerts[1].transmitter, mac(txs[1]));
        assert_eq!(svc.list_active_at(0, now).alerts.len(), 0);
    }

    #[test]
    fn test_lookup_errors() {
        let svc = service();
        assert!(matches!(svc.lookup("not-a-uuid"), Err(AlertLookupError::InvalidId(_))));
        let id = Uuid::new_v4();
        assert_eq!(svc.lookup(&id.to_string()), Err(AlertLookupError::NotFound(id)));
    }

    #[test]
    fn test_configured_alert_types_partition() {
        let svc = service();
        let types = svc.configured_alert_types();
        assert_eq!(types.enabled.len(), 2);
        assert_eq!(types.disabled.len(), AlertType::ALL.len() - 2);
        assert!(types.enabled.is_disjoint(&types.disabled));
    }

    #[test]
    fn test_apply_policy_keeps_alerts() {
        let svc = service();
        let at = t0() + Duration::minutes(2);
        let id = svc
            .raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", at), at)
            .alert_id()
            .unwrap();

        svc.apply_policy(AlertPolicy::new(AlertEnablement::all(), Duration::seconds(60), Duration::minutes(5)));
        assert!(svc.get_at(&id, at).is_some());
        assert_eq!(svc.configured_alert_types().disabled.len(), 0);
    }

    #[test]
    fn test_concurrent_raises_mint_one_identity() {
        let svc = Arc::new(service());
        let at = t0() + Duration::minutes(2);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                std::thread::spawn(move || {
                    svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", at), at)
                })
            })
            .collect();

        let outcomes: Vec<RaiseOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let stored = outcomes.iter().filter(|o| matches!(o, RaiseOutcome::Stored(_))).count();
        assert_eq!(stored, 1);
        assert_eq!(svc.len(), 1);
        assert_eq!(svc.list_active_at(10, at).alerts[0].frame_count, 8);
    }

    #[tokio::test]
    async fn test_expiry_sweep_task_stops_on_shutdown() {
        let svc = Arc::new(AlertService::with_start_time(
            AlertPolicy::new(AlertEnablement::all(), Duration::zero(), Duration::zero()),
            Utc::now() - Duration::hours(1),
        ));
        let old = Utc::now() - Duration::minutes(1);
        svc.raise_at(candidate(AlertType::UnexpectedBssidBeacon, "Corp", "11:22:33:44:55:66", old), old);
        assert_eq!(svc.len(), 1);

        let (tx, rx) = watch::channel(false);
        let handle = svc.spawn_expiry_sweep(std::time::Duration::from_millis(10), rx);

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(svc.is_empty());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
