use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::envelope::EnvelopeTuning;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. All fields optional so YAML and CLI can be
/// layered Option-by-Option over the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,
    /// Substring match against MIDI input port names; first port otherwise.
    pub midi_port: Option<String>,
    pub display: Option<DisplayConfig>,
    pub meters: Option<MetersConfig>,
    pub envelope: Option<EnvelopeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetersConfig {
    /// Channels to display, 1..=16.
    pub channels: Option<usize>,
    /// Draw a base pixel row for silent channels.
    pub bar_bases: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnvelopeConfig {
    pub decay_release_ms: Option<f32>,
    pub peak_hold_ms: Option<f32>,
    pub peak_falloff_ms: Option<f32>,
}

impl Config {
    pub fn display_size(&self) -> (u32, u32) {
        let display = self.display.as_ref();
        (
            display.and_then(|d| d.width).unwrap_or(128),
            display.and_then(|d| d.height).unwrap_or(64),
        )
    }

    pub fn fps(&self) -> u32 {
        self.display.as_ref().and_then(|d| d.fps).unwrap_or(30)
    }

    pub fn meter_channels(&self) -> usize {
        self.meters.as_ref().and_then(|m| m.channels).unwrap_or(16)
    }

    pub fn bar_bases(&self) -> bool {
        self.meters.as_ref().and_then(|m| m.bar_bases).unwrap_or(true)
    }

    /// Envelope timing with config overrides applied over the defaults.
    pub fn tuning(&self) -> EnvelopeTuning {
        let mut tuning = EnvelopeTuning::default();
        if let Some(envelope) = self.envelope.as_ref() {
            if let Some(v) = envelope.decay_release_ms { tuning.decay_release_ms = v; }
            if let Some(v) = envelope.peak_hold_ms     { tuning.peak_hold_ms = v; }
            if let Some(v) = envelope.peak_falloff_ms  { tuning.peak_falloff_ms = v; }
        }
        tuning
    }
}

/// CLI overrides. All value fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "midivu", version, about = "MIDI channel activity meters")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// MIDI input port name (substring match)
    #[arg(short, long)]
    pub port: Option<String>,
    /// List MIDI input ports and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub list_ports: bool,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    /// Display refresh rate
    #[arg(long)]
    pub fps: Option<u32>,
    /// Number of channel meters to draw (1-16)
    #[arg(long)]
    pub channels: Option<usize>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();

    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, &cli);

    // 4) Validate
    validate(&cfg)?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok((cfg, cli))
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/midivu/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/midivu/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/midivu.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["midivu.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    if src.midi_port.is_some() { dst.midi_port = src.midi_port; }

    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => {
            if s.width.is_some()  { d.width = s.width; }
            if s.height.is_some() { d.height = s.height; }
            if s.fps.is_some()    { d.fps = s.fps; }
        }
        _ => {}
    }
    match (&mut dst.meters, src.meters) {
        (None, Some(c)) => dst.meters = Some(c),
        (Some(d), Some(s)) => {
            if s.channels.is_some()  { d.channels = s.channels; }
            if s.bar_bases.is_some() { d.bar_bases = s.bar_bases; }
        }
        _ => {}
    }
    match (&mut dst.envelope, src.envelope) {
        (None, Some(c)) => dst.envelope = Some(c),
        (Some(d), Some(s)) => {
            if s.decay_release_ms.is_some() { d.decay_release_ms = s.decay_release_ms; }
            if s.peak_hold_ms.is_some()     { d.peak_hold_ms = s.peak_hold_ms; }
            if s.peak_falloff_ms.is_some()  { d.peak_falloff_ms = s.peak_falloff_ms; }
        }
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.port.is_some()      { cfg.midi_port = cli.port.clone(); }

    let any_display = cli.display_width.is_some()
        || cli.display_height.is_some()
        || cli.fps.is_some();
    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.display_width.is_some()  { display.width = cli.display_width; }
        if cli.display_height.is_some() { display.height = cli.display_height; }
        if cli.fps.is_some()            { display.fps = cli.fps; }
    }

    if cli.channels.is_some() && cfg.meters.is_none() {
        cfg.meters = Some(MetersConfig::default());
    }
    if let Some(meters) = cfg.meters.as_mut() {
        if cli.channels.is_some() { meters.channels = cli.channels; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(display) = cfg.display.as_ref() {
        if let (Some(w), Some(h)) = (display.width, display.height) {
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation("display width/height must be > 0".into()));
            }
        }
        if let Some(fps) = display.fps {
            if !(1..=120).contains(&fps) {
                return Err(ConfigError::Validation("display fps must be 1..=120".into()));
            }
        }
    }
    if let Some(meters) = cfg.meters.as_ref() {
        if let Some(channels) = meters.channels {
            if !(1..=16).contains(&channels) {
                return Err(ConfigError::Validation("meters channels must be 1..=16".into()));
            }
        }
    }
    if let Some(envelope) = cfg.envelope.as_ref() {
        for (name, value) in [
            ("decay_release_ms", envelope.decay_release_ms),
            ("peak_hold_ms", envelope.peak_hold_ms),
            ("peak_falloff_ms", envelope.peak_falloff_ms),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(ConfigError::Validation(format!(
                        "envelope {} must be a positive duration",
                        name
                    )));
                }
            }
        }
    }
    Ok(())
}
