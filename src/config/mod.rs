//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::game::{Dimensions, Vector};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    /// Allowed client origins for CORS, `*` for any
    pub client_origin: String,
    /// Max input messages per second per connection
    pub input_rate_limit: u32,
    /// Simulation tuning
    pub simulation: SimulationConfig,
}

/// Settings for the authoritative simulation
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Ticks per second
    pub tick_rate: u32,
    /// Snapshots per second, at most `tick_rate`
    pub snapshot_rate: u32,
    /// Player move speed in units per second
    pub player_speed: f32,
    /// Where new players appear
    pub spawn_position: Vector,
    /// Hitbox radius shared by all players
    pub hitbox_radius: f32,
    pub dimensions: Dimensions,
    /// Per-axis clamp `(min, max)` applied after integration
    pub world_bounds: Option<(f32, f32)>,
    /// Half-extents of the box around a player inside which others are sent
    pub visibility_range: Option<Vector>,
}

impl SimulationConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    /// Ticks between two snapshots
    pub fn snapshot_interval(&self) -> u32 {
        (self.tick_rate / self.snapshot_rate.max(1)).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }
        if self.snapshot_rate == 0 || self.snapshot_rate > self.tick_rate {
            return Err(ConfigError::Invalid("SNAPSHOT_RATE"));
        }
        if !self.player_speed.is_finite() {
            return Err(ConfigError::Invalid("PLAYER_SPEED"));
        }
        if !(self.hitbox_radius >= 0.0) {
            return Err(ConfigError::Invalid("PLAYER_HITBOX"));
        }
        if self.spawn_position.dims() != self.dimensions {
            return Err(ConfigError::Invalid("SPAWN_POSITION"));
        }
        if let Some(range) = &self.visibility_range {
            if range.dims() != self.dimensions {
                return Err(ConfigError::Invalid("VISIBILITY_RANGE"));
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            snapshot_rate: 60,
            player_speed: 100.0,
            spawn_position: Vector::xy(10.0, 10.0),
            hitbox_radius: 10.0,
            dimensions: Dimensions::Two,
            world_bounds: Some((0.0, 2500.0)),
            visibility_range: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            input_rate_limit: parse_var("INPUT_RATE_LIMIT")?.unwrap_or(30),

            simulation: simulation_from_env()?,
        })
    }
}

fn simulation_from_env() -> Result<SimulationConfig, ConfigError> {
    let defaults = SimulationConfig::default();

    let dimensions = match parse_var::<usize>("WORLD_DIMENSIONS")? {
        Some(n) => Dimensions::from_arity(n).ok_or(ConfigError::Invalid("WORLD_DIMENSIONS"))?,
        None => defaults.dimensions,
    };
    let tick_rate = parse_var("TICK_RATE")?.unwrap_or(defaults.tick_rate);

    let world_bounds = match env::var("WORLD_BOUNDS") {
        Ok(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
        Ok(raw) => match parse_list(&raw, "WORLD_BOUNDS")?.as_slice() {
            [min, max] => Some((*min, *max)),
            _ => return Err(ConfigError::Invalid("WORLD_BOUNDS")),
        },
        Err(_) => defaults.world_bounds,
    };

    let config = SimulationConfig {
        tick_rate,
        snapshot_rate: parse_var("SNAPSHOT_RATE")?.unwrap_or(tick_rate),
        player_speed: parse_var("PLAYER_SPEED")?.unwrap_or(defaults.player_speed),
        spawn_position: parse_vector("SPAWN_POSITION")?
            .unwrap_or_else(|| defaults.spawn_position.with_dims(dimensions)),
        hitbox_radius: parse_var("PLAYER_HITBOX")?.unwrap_or(defaults.hitbox_radius),
        dimensions,
        world_bounds,
        visibility_range: parse_vector("VISIBILITY_RANGE")?,
    };
    config.validate()?;
    Ok(config)
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

fn parse_vector(name: &'static str) -> Result<Option<Vector>, ConfigError> {
    match env::var(name) {
        Ok(raw) => {
            let components = parse_list(&raw, name)?;
            Vector::from_slice(&components)
                .map(Some)
                .ok_or(ConfigError::Invalid(name))
        }
        Err(_) => Ok(None),
    }
}

/// Parse a comma-separated list of floats
fn parse_list(raw: &str, name: &'static str) -> Result<Vec<f32>, ConfigError> {
    raw.split(',')
        .map(|part| part.trim().parse::<f32>().map_err(|_| ConfigError::Invalid(name)))
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snapshot_interval(), 1);
        assert_eq!(config.tick_duration(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn snapshot_interval_divides_tick_rate() {
        let config = SimulationConfig {
            snapshot_rate: 20,
            ..SimulationConfig::default()
        };
        assert_eq!(config.snapshot_interval(), 3);
    }

    #[test]
    fn rejects_inconsistent_settings() {
        let faster_snapshots = SimulationConfig {
            snapshot_rate: 120,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            faster_snapshots.validate(),
            Err(ConfigError::Invalid("SNAPSHOT_RATE"))
        ));

        let spatial_spawn = SimulationConfig {
            spawn_position: Vector::xyz(0.0, 0.0, 0.0),
            ..SimulationConfig::default()
        };
        assert!(matches!(
            spatial_spawn.validate(),
            Err(ConfigError::Invalid("SPAWN_POSITION"))
        ));
    }

    #[test]
    fn parses_comma_lists() {
        assert_eq!(parse_list("1, 2.5,3", "X").unwrap(), vec![1.0, 2.5, 3.0]);
        assert!(parse_list("1,,2", "X").is_err());
    }
}
