pub mod alerts;
pub mod bandits;
pub mod config;
pub mod wireless;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use alerts::{AlertCandidate, AlertPolicy, AlertService, RaiseOutcome};
use config::{ConfigLoader, ConfigurationModel};
use wireless::{Dispatcher, Dot11Frame, FrameParseError};

/// One loaded configuration together with the interceptors built for it
#[derive(Debug)]
pub struct Generation {
    /// Increments on every successful reload, starting at 1
    pub serial: u64,
    pub model: Arc<ConfigurationModel>,
    pub dispatcher: Dispatcher,
    pub loaded_at: DateTime<Utc>,
}

impl Generation {
    fn build(model: ConfigurationModel, serial: u64) -> Self {
        let model = Arc::new(model);
        let mut dispatcher = Dispatcher::new();
        dispatcher.register_all(wireless::interceptors(&model));

        Self {
            serial,
            model,
            dispatcher,
            loaded_at: Utc::now(),
        }
    }
}

/// What happened to a single frame
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Generation the frame was matched against
    pub generation: u64,
    pub candidates: Vec<AlertCandidate>,
    /// One outcome per candidate, in the same order
    pub outcomes: Vec<RaiseOutcome>,
    pub errors: Vec<(&'static str, FrameParseError)>,
}

/// Core dot11guard instance
pub struct Dot11Guard {
    generation: RwLock<Arc<Generation>>,
    alerts: Arc<AlertService>,
    skip_validation: bool,
}

impl Dot11Guard {
    /// Create an engine from an already validated model
    pub fn new(model: ConfigurationModel) -> Self {
        Self::with_start_time(model, Utc::now())
    }

    /// Create an engine whose training period starts at `started_at`
    pub fn with_start_time(model: ConfigurationModel, started_at: DateTime<Utc>) -> Self {
        let alerts = Arc::new(AlertService::with_start_time(AlertPolicy::from_model(&model), started_at));
        Self {
            generation: RwLock::new(Arc::new(Generation::build(model, 1))),
            alerts,
            skip_validation: false,
        }
    }

    /// Load a configuration file and build an engine for it
    pub fn from_path<P: AsRef<Path>>(path: P, skip_validation: bool) -> Result<Self> {
        let path = path.as_ref();
        let model = ConfigLoader::from_path(path, skip_validation)
            .and_then(|loader| loader.load())
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        let mut guard = Self::new(model);
        guard.skip_validation = skip_validation;
        Ok(guard)
    }

    /// Current generation, stable for as long as the caller holds it
    pub fn generation(&self) -> Arc<Generation> {
        self.generation.read().clone()
    }

    pub fn model(&self) -> Arc<ConfigurationModel> {
        self.generation().model.clone()
    }

    pub fn alerts(&self) -> &Arc<AlertService> {
        &self.alerts
    }

    pub fn handle_frame(&self, frame: &Dot11Frame) -> FrameReport {
        self.handle_frame_at(frame, Utc::now())
    }

    /// Dispatch a frame and raise every candidate it produced
    pub fn handle_frame_at(&self, frame: &Dot11Frame, now: DateTime<Utc>) -> FrameReport {
        let generation = self.generation();
        let dispatch = generation.dispatcher.dispatch(frame);

        let outcomes = dispatch
            .candidates
            .iter()
            .map(|candidate| self.alerts.raise_at(candidate.clone(), now))
            .collect();

        FrameReport {
            generation: generation.serial,
            candidates: dispatch.candidates,
            outcomes,
            errors: dispatch.errors,
        }
    }

    /// Publish a new model; in-flight frames finish on the generation they captured
    pub fn reload(&self, model: ConfigurationModel) -> u64 {
        let mut current = self.generation.write();
        let serial = current.serial + 1;
        let policy = AlertPolicy::from_model(&model);
        let next = Generation::build(model, serial);

        self.alerts.apply_policy(policy);
        *current = Arc::new(next);

        info!(
            "Configuration generation {} active: {} networks, {} interceptors",
            serial,
            current.model.networks.len(),
            current.dispatcher.len()
        );
        serial
    }

    /// Validate a document and swap it in; the active generation is kept on error
    pub fn reload_from_str(&self, content: &str) -> config::Result<u64> {
        let model = ConfigLoader::from_str(content, self.skip_validation)
            .and_then(|loader| loader.load())
            .map_err(|e| {
                warn!("Rejected configuration reload: {}", e);
                e
            })?;
        Ok(self.reload(model))
    }

    pub fn reload_from_path<P: AsRef<Path>>(&self, path: P) -> config::Result<u64> {
        let model = ConfigLoader::from_path(path, self.skip_validation)
            .and_then(|loader| loader.load())
            .map_err(|e| {
                warn!("Rejected configuration reload: {}", e);
                e
            })?;
        Ok(self.reload(model))
    }
}

/// Daemon runner feeding captured frames into the engine
pub struct Daemon {
    guard: Arc<Dot11Guard>,
    shutdown_tx: watch::Sender<bool>,
    sweep_interval: std::time::Duration,
    frames_processed: AtomicU64,
}

impl Daemon {
    pub fn new(guard: Arc<Dot11Guard>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            guard,
            shutdown_tx,
            sweep_interval: std::time::Duration::from_secs(60),
            frames_processed: AtomicU64::new(0),
        }
    }

    pub fn with_sweep_interval(mut self, interval: std::time::Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn guard(&self) -> &Arc<Dot11Guard> {
        &self.guard
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    /// Process frames until `stop` is called or the frame source closes
    pub async fn run(&self, mut frames: mpsc::Receiver<Dot11Frame>) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return Ok(());
        }

        let sweep_handle = self
            .guard
            .alerts()
            .spawn_expiry_sweep(self.sweep_interval, self.shutdown_tx.subscribe());

        info!("Daemon started, processing frames...");

        loop {
            tokio::select! {
                frame = frames.recv() => {
                    let Some(frame) = frame else {
                        info!("Frame source closed");
                        break;
                    };

                    self.frames_processed.fetch_add(1, Ordering::Relaxed);
                    let report = self.guard.handle_frame(&frame);
                    if !report.candidates.is_empty() {
                        debug!(
                            "{} frame from {} produced {} alert candidates",
                            frame.subtype,
                            frame.transmitter,
                            report.candidates.len()
                        );
                    }
                }

                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Also ends the sweep when the frame source closed on its own.
        self.shutdown_tx.send_replace(true);
        sweep_handle.await.context("Alert expiry sweep panicked")?;

        info!("Daemon stopped after {} frames", self.frames_processed());
        Ok(())
    }

    /// Signal shutdown
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
