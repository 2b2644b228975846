use serde_json::{Map, Value};
use std::env;
use std::time::Duration;

/// Default interval at which the tracking URL of a linear asset is polled
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Asset type of the tracked stream, decides the schedule refresh cadence
#[derive(Clone, Debug, PartialEq)]
pub enum AssetType {
    /// Schedule is fetched once after the source is loaded
    Vod,
    /// Schedule is fetched on load and then polled at `poll_interval`
    Linear { poll_interval: Duration },
}

impl AssetType {
    /// Linear asset polled at the default interval
    pub fn linear() -> Self {
        AssetType::Linear {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Configuration for a single tracking session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Explicit session initialization endpoint of the ad stitcher
    pub session_init_url: String,
    /// Optional parameters sent as the JSON body of the initialization request
    pub session_init_params: Map<String, Value>,
    pub asset_type: AssetType,
    /// Fire schedule-position and player-interaction beacons automatically
    pub automatic_tracking_enabled: bool,
}

impl SessionConfig {
    pub fn new(session_init_url: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            session_init_url: session_init_url.into(),
            session_init_params: Map::new(),
            asset_type,
            automatic_tracking_enabled: true,
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.session_init_params = params;
        self
    }

    pub fn with_automatic_tracking(mut self, enabled: bool) -> Self {
        self.automatic_tracking_enabled = enabled;
        self
    }
}

/// Demo application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub is_dev: bool,
    pub session: SessionConfig,
    /// Port for the Prometheus exporter, disabled when unset
    pub metrics_port: Option<u16>,
    /// Seconds of simulated playback the demo runs for
    pub playback_secs: f64,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, SESSION_INIT_URL is required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let session_init_url = if is_dev {
            env::var("SESSION_INIT_URL")
                .unwrap_or_else(|_| "http://localhost:3000/v1/session/demo/index.m3u8".to_string())
        } else {
            env::var("SESSION_INIT_URL").map_err(|_| "SESSION_INIT_URL is required in production")?
        };

        let poll_interval = env::var("POLL_INTERVAL_SECS")
            .ok()
            .map(|s| parse_poll_interval(&s))
            .transpose()?
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let asset_type = match env::var("ASSET_TYPE")
            .unwrap_or_else(|_| "vod".to_string())
            .to_lowercase()
            .as_str()
        {
            "vod" => AssetType::Vod,
            "linear" => AssetType::Linear { poll_interval },
            other => return Err(format!("Unknown ASSET_TYPE: {}", other).into()),
        };

        let automatic_tracking_enabled = env::var("AUTOMATIC_TRACKING")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let metrics_port = env::var("METRICS_PORT")
            .ok()
            .map(|s| s.parse::<u16>())
            .transpose()?;

        let playback_secs = env::var("PLAYBACK_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .unwrap_or(120.0);

        Ok(Config {
            is_dev,
            session: SessionConfig::new(session_init_url, asset_type)
                .with_automatic_tracking(automatic_tracking_enabled),
            metrics_port,
            playback_secs,
        })
    }
}

/// Parse a poll interval in (fractional) seconds; must be positive and finite
fn parse_poll_interval(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let interval = Duration::try_from_secs_f64(value.trim().parse::<f64>()?)?;
    if interval.is_zero() {
        return Err(format!("POLL_INTERVAL_SECS must be positive, got {}", value).into());
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("https://example.com/v1/session/x", AssetType::Vod);
        assert!(config.automatic_tracking_enabled);
        assert!(config.session_init_params.is_empty());
        assert_eq!(config.asset_type, AssetType::Vod);
    }

    #[test]
    fn test_linear_default_poll_interval() {
        assert_eq!(
            AssetType::linear(),
            AssetType::Linear {
                poll_interval: Duration::from_secs(4)
            }
        );
    }

    #[test]
    fn test_builder_setters() {
        let mut params = Map::new();
        params.insert("adsParams".to_string(), serde_json::json!({"deviceType": "tv"}));
        let config = SessionConfig::new("https://example.com", AssetType::linear())
            .with_params(params)
            .with_automatic_tracking(false);

        assert!(!config.automatic_tracking_enabled);
        assert_eq!(config.session_init_params["adsParams"]["deviceType"], "tv");
    }

    #[test]
    fn test_parse_poll_interval() {
        assert_eq!(parse_poll_interval("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_poll_interval(" 4 ").unwrap(), Duration::from_secs(4));
    }

    #[test]
    fn test_parse_poll_interval_rejects_invalid_values() {
        for value in ["-1", "0", "0.0", "NaN", "inf", "soon"] {
            assert!(parse_poll_interval(value).is_err(), "accepted {}", value);
        }
    }

    #[test]
    fn test_from_env_rejects_non_positive_poll_interval() {
        // Only test in the crate touching the process environment
        unsafe {
            env::set_var("DEV_MODE", "true");
            env::set_var("ASSET_TYPE", "linear");
        }
        for value in ["-1", "0"] {
            unsafe { env::set_var("POLL_INTERVAL_SECS", value) };
            assert!(Config::from_env().is_err(), "accepted {}", value);
        }

        unsafe { env::set_var("POLL_INTERVAL_SECS", "1.5") };
        let config = Config::from_env().unwrap();
        assert_eq!(
            config.session.asset_type,
            AssetType::Linear {
                poll_interval: Duration::from_millis(1500)
            }
        );

        unsafe {
            env::remove_var("DEV_MODE");
            env::remove_var("ASSET_TYPE");
            env::remove_var("POLL_INTERVAL_SECS");
        }
    }
}
