//! Engine configuration, read from a TOML file.
//!
//! Every table is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [moving]
//! strict_horizontal = true
//! max_move_distance = 16.0
//!
//! [moving.violation]
//! decay_factor = 0.95
//! freeze_ticks = 20
//!
//! [moving.workarounds]
//! disabled = ["slime_speed_bruteforce"]
//!
//! [capabilities]
//! server_version = "1.21.2"
//! client_version = "1.8.9"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use sg_sim::{WorkaroundRegistry, WorldBorder};
use sg_utils::{Capabilities, protocol_name_to_protocol_version};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown {side} version `{name}`")]
    UnknownVersion { side: &'static str, name: String },
    #[error("unknown workaround `{0}`")]
    UnknownWorkaround(String),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub moving: MovingConfig,
    pub capabilities: CapabilitiesConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovingConfig {
    pub enabled: bool,
    /// Compare each horizontal axis separately instead of the overall distance.
    pub strict_horizontal: bool,
    pub passable: bool,
    pub ground_margin: f64,
    /// Longer moves are rejected whole instead of replayed.
    pub max_move_distance: f64,
    pub border: Option<BorderConfig>,
    pub velocity: VelocityConfig,
    pub violation: ViolationConfig,
    pub workarounds: WorkaroundConfig,
}

impl Default for MovingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_horizontal: true,
            passable: true,
            ground_margin: sg_sim::location::DEFAULT_GROUND_MARGIN,
            max_move_distance: sg_sim::MAX_MOVE_DISTANCE,
            border: None,
            velocity: VelocityConfig::default(),
            violation: ViolationConfig::default(),
            workarounds: WorkaroundConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct BorderConfig {
    pub center_x: f64,
    pub center_z: f64,
    pub size: f64,
}

impl From<BorderConfig> for WorldBorder {
    fn from(border: BorderConfig) -> Self {
        WorldBorder {
            center_x: border.center_x,
            center_z: border.center_z,
            size: border.size,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct VelocityConfig {
    /// Cleanup passes an entry survives.
    pub activation_count: u32,
    pub window_ticks: u32,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            activation_count: sg_sim::velocity::DEFAULT_ACTIVATION_COUNT,
            window_ticks: sg_sim::velocity::DEFAULT_WINDOW_TICKS,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViolationConfig {
    pub decay_factor: f64,
    /// Clean moves before the level starts to decay.
    pub freeze_ticks: u32,
    pub decay_while_airborne: bool,
    /// Level above which the default sink cancels the move.
    pub cancel_threshold: f64,
}

impl Default for ViolationConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.95,
            freeze_ticks: 20,
            decay_while_airborne: false,
            cancel_threshold: 100.0,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkaroundConfig {
    pub disabled: Vec<String>,
}

impl WorkaroundConfig {
    pub fn build_registry(&self) -> Result<WorkaroundRegistry, ConfigError> {
        let mut registry = WorkaroundRegistry::builtin();
        for name in &self.disabled {
            if !registry.set_enabled(name, false) {
                return Err(ConfigError::UnknownWorkaround(name.clone()));
            }
        }
        Ok(registry)
    }
}

/// Release names such as "1.8.9"; empty means the latest supported release.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CapabilitiesConfig {
    pub server_version: String,
    pub client_version: String,
}

impl CapabilitiesConfig {
    pub fn resolve(&self) -> Result<Capabilities, ConfigError> {
        let version = |side: &'static str, name: &str| {
            protocol_name_to_protocol_version(name).ok_or_else(|| ConfigError::UnknownVersion {
                side,
                name: name.to_string(),
            })
        };
        Ok(Capabilities {
            server_protocol: version("server", &self.server_version)?,
            client_protocol: version("client", &self.client_version)?,
        })
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves every name in the file so mistakes surface at load time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capabilities.resolve()?;
        self.moving.workarounds.build_registry()?;
        Ok(())
    }
}
