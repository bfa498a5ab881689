use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::warn;

use dot11guard::alerts::{AlertInstance, AlertPolicy, RaiseOutcome};
use dot11guard::config::{self, ConfigLoader, ConfigurationModel};
use dot11guard::wireless::Dot11Frame;
use dot11guard::Dot11Guard;

#[derive(Parser)]
#[command(name = "dot11guard")]
#[command(author, version, about = "802.11 network-integrity monitor")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate a configuration file
    CheckConfig {
        /// Configuration file (defaults to the standard locations)
        path: Option<PathBuf>,

        /// Skip logical validation and skip malformed list entries
        #[arg(long)]
        skip_validation: bool,
    },

    /// Print a sample configuration
    GenConfig {
        /// Output file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Feed recorded frames (JSON lines) through the matchers
    Replay {
        /// Configuration file
        config: PathBuf,

        /// Decoded frames, one JSON object per line
        frames: PathBuf,

        /// Maximum number of alerts to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show enabled and disabled alert types
    AlertTypes {
        /// Configuration file (defaults to the standard locations)
        config: Option<PathBuf>,
    },
}

/// Table row for active alerts
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "BSSID")]
    transmitter: String,
    #[tabled(rename = "First Seen")]
    first_seen: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Frames")]
    frames: u64,
}

impl From<&AlertInstance> for AlertRow {
    fn from(a: &AlertInstance) -> Self {
        Self {
            id: a.id.to_string(),
            alert_type: a.alert_type.to_string(),
            ssid: a.ssid.clone(),
            transmitter: a.transmitter.to_string(),
            first_seen: a.first_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
            last_seen: a.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
            frames: a.frame_count,
        }
    }
}

/// Table row for alert type enablement
#[derive(Tabled)]
struct AlertTypeRow {
    #[tabled(rename = "Alert Type")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub async fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::CheckConfig { path, skip_validation } => cmd_check_config(path, skip_validation),
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Replay {
            config,
            frames,
            limit,
            format,
        } => cmd_replay(config, frames, limit, format),
        Commands::AlertTypes { config } => cmd_alert_types(config),
    }
}

fn resolve_config(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => config::default_config_path()
            .context("No configuration file given and none found in the default locations"),
    }
}

fn load_config(path: &Path, skip_validation: bool) -> Result<ConfigurationModel> {
    ConfigLoader::from_path(path, skip_validation)
        .and_then(|loader| loader.load())
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn cmd_check_config(path: Option<PathBuf>, skip_validation: bool) -> Result<()> {
    let path = resolve_config(path)?;
    let model = load_config(&path, skip_validation)?;

    if skip_validation {
        println!("{} {} (validation skipped)", "Loaded".yellow().bold(), path.display());
    } else {
        println!("{} {}", "Configuration is valid:".green().bold(), path.display());
    }

    println!();
    println!("  Role:          {}", model.role);
    println!("  Node ID:       {}", model.id);
    println!("  Listen URI:    {}", model.interfaces.rest_listen_uri);
    println!("  TLS:           {}", if model.interfaces.use_tls { "enabled" } else { "disabled" });
    println!("  Monitors:      {}", model.monitors.len());
    for monitor in &model.monitors {
        let channels: Vec<String> = monitor.channels.iter().map(|c| c.to_string()).collect();
        println!("    {} -> channels {}", monitor.device.cyan(), channels.join(","));
    }
    println!("  Networks:      {}", model.networks.len());
    for network in &model.networks {
        println!("    {} ({} BSSIDs)", network.ssid.cyan(), network.bssids.len());
    }
    println!("  Trap devices:  {}", model.trap_devices.len());
    println!("  Alerts:        {} enabled", model.alerts.enabled().len());
    println!(
        "  Training:      {}s, retention {}min",
        model.alerting.training_period_seconds, model.alerting.retention_minutes
    );

    Ok(())
}

fn cmd_gen_config(output: Option<PathBuf>) -> Result<()> {
    let sample = config::sample_config("/usr/bin/python3", "/var/lib/dot11guard/scripts");

    match output {
        Some(path) => {
            std::fs::write(&path, &sample)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            println!("{}", sample);
        }
    }

    Ok(())
}

fn read_frames(path: &Path) -> Result<Vec<Dot11Frame>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open frame file: {}", path.display()))?;

    let mut frames = Vec::new();
    for (i, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Dot11Frame>(&line) {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!("Skipping malformed frame on line {}: {}", i + 1, e),
        }
    }
    Ok(frames)
}

fn cmd_replay(config: PathBuf, frames: PathBuf, limit: usize, format: String) -> Result<()> {
    let model = load_config(&config, false)?;
    let frames = read_frames(&frames)?;

    let Some(first) = frames.first() else {
        println!("No frames to replay");
        return Ok(());
    };

    // Training is measured from the first recorded frame.
    let guard = Dot11Guard::with_start_time(model, first.meta.timestamp);
    let mut clock = first.meta.timestamp;
    let (mut stored, mut merged, mut suppressed, mut errors) = (0usize, 0usize, 0usize, 0usize);

    for frame in &frames {
        clock = clock.max(frame.meta.timestamp);
        let report = guard.handle_frame_at(frame, clock);
        errors += report.errors.len();
        for outcome in &report.outcomes {
            match outcome {
                RaiseOutcome::Stored(_) => stored += 1,
                RaiseOutcome::Merged(_) => merged += 1,
                RaiseOutcome::Suppressed(_) => suppressed += 1,
            }
        }
    }

    guard.alerts().expire_at(clock);
    let active = guard.alerts().list_active_at(limit, clock);

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&active)?);
        }
        "table" => {
            println!("{}", "=== Replay Summary ===".bold());
            println!("Frames:      {}", frames.len());
            println!("New alerts:  {}", stored.to_string().red().bold());
            println!("Merged:      {}", merged);
            println!("Suppressed:  {}", suppressed);
            println!("Parse errors: {}", errors);
            println!();

            if active.alerts.is_empty() {
                println!("{}", "No active alerts".green());
            } else {
                let rows: Vec<AlertRow> = active.alerts.iter().map(AlertRow::from).collect();
                println!("{}", Table::new(rows));
                if active.total > active.alerts.len() {
                    println!("... {} more", active.total - active.alerts.len());
                }
            }
        }
        other => bail!("Unknown output format: {} (expected table or json)", other),
    }

    Ok(())
}

fn cmd_alert_types(config: Option<PathBuf>) -> Result<()> {
    let path = resolve_config(config)?;
    let model = load_config(&path, false)?;
    let policy = AlertPolicy::from_model(&model);

    let mut rows: Vec<AlertTypeRow> = policy
        .enabled
        .enabled()
        .iter()
        .map(|t| AlertTypeRow {
            name: t.to_string(),
            status: "enabled".green().to_string(),
        })
        .collect();
    rows.extend(policy.enabled.disabled().iter().map(|t| AlertTypeRow {
        name: t.to_string(),
        status: "disabled".dimmed().to_string(),
    }));

    println!("{}", Table::new(rows));
    Ok(())
}
