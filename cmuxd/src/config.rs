//! Daemon configuration
//!
//! Values come from the command line, an optional JSON settings file, and
//! built-in defaults, in that order of precedence. Everything is validated
//! into a [`BringUpConfig`] before the serial port is touched.

use std::path::{Path, PathBuf};

use clap::Parser;
use cmux_link::{NodeLayout, DEVICE_REGISTRY, MAX_NODES};
use cmux_protocol::{validate_baud_rate, validate_mtu, BringUpPlan, ModemProfile, ProtocolError};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_PORT: &str = "/dev/ttyAPP0";
pub const DEFAULT_SPEED: u32 = 115200;
pub const DEFAULT_DRIVER: &str = "gsmtty";
pub const DEFAULT_NODE_BASE: &str = "/dev/ttyGSM";
pub const DEFAULT_NODES: u8 = 4;

/// Errors in the daemon configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid profile, baud rate or MTU
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// On/off option outside 0 and 1
    #[error("invalid value {value} for {name}, expected 0 or 1")]
    InvalidFlag { name: &'static str, value: u8 },

    /// More nodes than the modem has channels
    #[error("cannot create {count} nodes, at most {max} are supported")]
    TooManyNodes { count: u8, max: u8 },

    /// Settings file could not be read
    #[error("cannot read settings file {path}")]
    ReadSettings {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON for [`Settings`]
    #[error("invalid settings file {path}")]
    ParseSettings {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Command line
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "cmuxd",
    version,
    about = "Switch a GSM modem to CMUX mode and expose its channels as tty nodes"
)]
pub struct Cli {
    /// JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Modem profile: default, sim900 or telit
    #[arg(short = 'm', long = "modem")]
    pub modem: Option<String>,

    /// Serial port the modem is attached to
    #[arg(short, long)]
    pub port: Option<String>,

    /// Line speed in baud
    #[arg(short = 'b', long)]
    pub speed: Option<u32>,

    /// Maximum frame size (defaults to 255 for sim900, 512 otherwise)
    #[arg(short = 'u', long)]
    pub mtu: Option<u32>,

    /// Print debug messages (0 or 1)
    #[arg(short, long)]
    pub debug: Option<u8>,

    /// Detach from the terminal once set up (0 or 1)
    #[arg(short = 'D', long)]
    pub daemon: Option<u8>,

    /// Driver name used to look up the major number
    #[arg(long)]
    pub driver: Option<String>,

    /// Base name of the created nodes
    #[arg(long)]
    pub base: Option<String>,

    /// Number of nodes to create (0 to 4)
    #[arg(short, long)]
    pub nodes: Option<u8>,

    /// Device registry to read majors from
    #[arg(long)]
    pub registry: Option<PathBuf>,
}

/// Settings file contents, every key optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub modem: Option<ModemProfile>,
    pub port: Option<String>,
    pub speed: Option<u32>,
    pub mtu: Option<u32>,
    pub debug: Option<u8>,
    pub daemon: Option<u8>,
    pub driver: Option<String>,
    pub base: Option<String>,
    pub nodes: Option<u8>,
    pub registry: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadSettings {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::ParseSettings {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Validated, immutable configuration for one daemon run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpConfig {
    pub profile: ModemProfile,
    pub port: String,
    pub speed: u32,
    pub mtu: u32,
    pub debug: bool,
    pub daemonize: bool,
    pub driver: String,
    pub node_base: String,
    pub node_count: u8,
    pub registry: PathBuf,
}

impl BringUpConfig {
    /// Read the settings file named on the command line, if any, and merge
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let settings = match &cli.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        Self::from_sources(cli, &settings)
    }

    /// Merge command line over settings over defaults, then validate
    pub fn from_sources(cli: &Cli, settings: &Settings) -> Result<Self, ConfigError> {
        let profile = match &cli.modem {
            Some(name) => name.parse::<ModemProfile>()?,
            None => settings.modem.unwrap_or_default(),
        };

        let speed = validate_baud_rate(cli.speed.or(settings.speed).unwrap_or(DEFAULT_SPEED))?;
        let mtu = validate_mtu(
            cli.mtu
                .or(settings.mtu)
                .unwrap_or_else(|| profile.default_mtu()),
        )?;

        let debug = flag("debug", cli.debug.or(settings.debug).unwrap_or(1))?;
        let daemonize = flag("daemon", cli.daemon.or(settings.daemon).unwrap_or(1))?;

        let node_count = cli.nodes.or(settings.nodes).unwrap_or(DEFAULT_NODES);
        if node_count > MAX_NODES {
            return Err(ConfigError::TooManyNodes {
                count: node_count,
                max: MAX_NODES,
            });
        }

        Ok(Self {
            profile,
            port: pick(&cli.port, &settings.port, DEFAULT_PORT),
            speed,
            mtu,
            debug,
            daemonize,
            driver: pick(&cli.driver, &settings.driver, DEFAULT_DRIVER),
            node_base: pick(&cli.base, &settings.base, DEFAULT_NODE_BASE),
            node_count,
            registry: cli
                .registry
                .clone()
                .or_else(|| settings.registry.clone())
                .unwrap_or_else(|| PathBuf::from(DEVICE_REGISTRY)),
        })
    }

    /// AT command sequence for the configured modem
    pub fn plan(&self) -> BringUpPlan {
        self.profile.plan(self.speed, self.mtu)
    }

    pub fn node_layout(&self) -> NodeLayout {
        NodeLayout::new(self.node_base.clone(), self.node_count)
    }
}

fn pick(cli: &Option<String>, settings: &Option<String>, default: &str) -> String {
    cli.clone()
        .or_else(|| settings.clone())
        .unwrap_or_else(|| default.to_string())
}

fn flag(name: &'static str, value: u8) -> Result<bool, ConfigError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(ConfigError::InvalidFlag { name, value }),
    }
}
