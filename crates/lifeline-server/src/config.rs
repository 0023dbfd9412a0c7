use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use lifeline_core::geo::Coordinate;
use lifeline_core::{Resource, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if !self.dispatch.default_radius_km.is_finite() || self.dispatch.default_radius_km <= 0.0 {
            return Err("dispatch.default_radius_km must be > 0".into());
        }
        if self.dispatch.event_buffer == 0 {
            return Err("dispatch.event_buffer must be > 0".into());
        }
        for seed in &self.dispatch.seed_resources {
            if seed.id.trim().is_empty() {
                return Err("dispatch.seed_resources entries require an id".into());
            }
            if let Some(c) = seed.coordinate()
                && !c.is_valid()
            {
                return Err(format!(
                    "dispatch.seed_resources '{}' has an invalid coordinate",
                    seed.id
                ));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Search radius used when a nearby query does not pass one
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    /// Buffer size of the dispatch event bus
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Resources provisioned at startup
    #[serde(default)]
    pub seed_resources: Vec<SeedResource>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            event_buffer: default_event_buffer(),
            seed_resources: Vec::new(),
        }
    }
}

/// A resource provisioned from configuration at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResource {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl SeedResource {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
            _ => None,
        }
    }

    pub fn into_resource(self) -> Resource {
        let coordinate = self.coordinate();
        Resource::new(self.id, self.name, self.kind, coordinate)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_radius_km() -> f64 {
    lifeline_core::DEFAULT_RADIUS_KM
}

fn default_event_buffer() -> usize {
    1024
}

pub mod loader {
    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::AppConfig;

    /// Load configuration from an optional TOML file with `LIFELINE__`
    /// environment overrides, e.g. `LIFELINE__SERVER__PORT=9090`.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("lifeline.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("LIFELINE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
