//! Application-level configuration loading: flyer directory, polling hints, bracket layout sizes.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::bracket::layout::LayoutOptions;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TOURNEY_DESK_CONFIG_PATH";
const DEFAULT_CHALLONGE_BASE_URL: &str = "https://api.challonge.com/v1";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    flyers_dir: PathBuf,
    connected_poll: Duration,
    disconnected_poll: Duration,
    layout: LayoutOptions,
    hub_capacity: usize,
    challonge_base_url: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        flyers_dir = %app_config.flyers_dir.display(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Use another flyer directory (tests point this at a temporary directory).
    pub fn with_flyers_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.flyers_dir = dir.into();
        self
    }

    /// Directory holding flyer images.
    pub fn flyers_dir(&self) -> &PathBuf {
        &self.flyers_dir
    }

    /// Polling interval suggested to clients while their socket is connected.
    pub fn connected_poll(&self) -> Duration {
        self.connected_poll
    }

    /// Polling interval suggested to clients without a socket.
    pub fn disconnected_poll(&self) -> Duration {
        self.disconnected_poll
    }

    /// Box sizes used by the bracket preview.
    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    /// Capacity of the realtime broadcast channel.
    pub fn hub_capacity(&self) -> usize {
        self.hub_capacity
    }

    /// Base url of the Challonge API.
    pub fn challonge_base_url(&self) -> &str {
        &self.challonge_base_url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    flyers_dir: String,
    polling: RawPolling,
    layout: RawLayout,
    hub_capacity: usize,
    challonge_base_url: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            flyers_dir: "flyers".to_owned(),
            polling: RawPolling::default(),
            layout: RawLayout::default(),
            hub_capacity: 64,
            challonge_base_url: DEFAULT_CHALLONGE_BASE_URL.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawPolling {
    connected_secs: u64,
    disconnected_secs: u64,
}

impl Default for RawPolling {
    fn default() -> Self {
        Self {
            connected_secs: 30,
            disconnected_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawLayout {
    match_width: u32,
    match_height: u32,
    column_gap: u32,
    row_gap: u32,
}

impl Default for RawLayout {
    fn default() -> Self {
        let defaults = LayoutOptions::default();
        Self {
            match_width: defaults.match_width,
            match_height: defaults.match_height,
            column_gap: defaults.column_gap,
            row_gap: defaults.row_gap,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            flyers_dir: PathBuf::from(value.flyers_dir),
            connected_poll: Duration::from_secs(value.polling.connected_secs.max(1)),
            disconnected_poll: Duration::from_secs(value.polling.disconnected_secs.max(1)),
            layout: LayoutOptions {
                match_width: value.layout.match_width,
                match_height: value.layout.match_height,
                column_gap: value.layout.column_gap,
                row_gap: value.layout.row_gap,
            },
            hub_capacity: value.hub_capacity.max(1),
            challonge_base_url: value.challonge_base_url,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"flyersDir": "/srv/flyers", "polling": {"connectedSecs": 45}}"#)
                .unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.flyers_dir(), &PathBuf::from("/srv/flyers"));
        assert_eq!(config.connected_poll(), Duration::from_secs(45));
        assert_eq!(config.disconnected_poll(), Duration::from_secs(10));
        assert_eq!(config.layout(), &LayoutOptions::default());
        assert_eq!(config.challonge_base_url(), DEFAULT_CHALLONGE_BASE_URL);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let raw: RawConfig = serde_json::from_str(r#"{"hubCapacity": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).hub_capacity(), 1);
    }
}
