use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "PLAYBEACON_";

/// Fallback hit interval when the host supplies none (or a non-positive one).
pub const DEFAULT_HIT_INTERVAL_SECS: i64 = 30;
pub const DEFAULT_ASSET_TYPE: &str = "media";

/// Reporter configuration, normally handed over by the host player. Can also
/// be loaded from a TOML file with `PLAYBEACON_`-prefixed env overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Root of the collection endpoint. Missing or empty disables reporting.
    pub base_url: Option<String>,
    /// Must be positive for reporting to be enabled.
    pub partner_id: i64,
    /// Session token forwarded on every report.
    pub ks: Option<String>,
    /// Heartbeat interval in seconds; values <= 0 fall back to the default.
    pub timer_interval_secs: i64,
    /// Content category stamped on every report.
    pub asset_type: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            partner_id: 0,
            ks: None,
            timer_interval_secs: DEFAULT_HIT_INTERVAL_SECS,
            asset_type: DEFAULT_ASSET_TYPE.to_string(),
        }
    }
}

impl ReporterConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var(format!("{}BASE_URL", ENV_PREFIX)) {
            self.base_url = Some(val);
        }
        if let Ok(val) = env::var(format!("{}PARTNER_ID", ENV_PREFIX)) {
            if let Ok(id) = val.parse() {
                self.partner_id = id;
            }
        }
        if let Ok(val) = env::var(format!("{}KS", ENV_PREFIX)) {
            self.ks = Some(val);
        }
        if let Ok(val) = env::var(format!("{}TIMER_INTERVAL_SECS", ENV_PREFIX)) {
            if let Ok(interval) = val.parse() {
                self.timer_interval_secs = interval;
            }
        }
        if let Ok(val) = env::var(format!("{}ASSET_TYPE", ENV_PREFIX)) {
            self.asset_type = val;
        }
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.asset_type.trim().is_empty() {
            return Err("asset_type must not be empty".into());
        }
        if let Some(url) = self.base_url.as_deref() {
            if !url.trim().is_empty() && self.partner_id <= 0 {
                return Err("partner_id must be positive when base_url is set".into());
            }
        }
        Ok(())
    }

    /// A missing or empty base url, or a non-positive partner id, disables the
    /// entire reporting path; the host attaches nothing in that case.
    pub fn is_reporting_enabled(&self) -> bool {
        self.base_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
            && self.partner_id > 0
    }

    pub fn hit_interval(&self) -> Duration {
        let secs = if self.timer_interval_secs > 0 {
            self.timer_interval_secs
        } else {
            DEFAULT_HIT_INTERVAL_SECS
        };
        Duration::from_secs(secs as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes_and_validates() {
        let cfg = ReporterConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ReporterConfig = toml::from_str(&toml).unwrap();
        parsed.validate().unwrap();
        assert!(!parsed.is_reporting_enabled());
    }

    #[test]
    fn reporting_requires_base_url_and_positive_partner_id() {
        let mut cfg = ReporterConfig {
            base_url: Some("https://collector.example.test/".to_string()),
            partner_id: 1091,
            ..ReporterConfig::default()
        };
        assert!(cfg.is_reporting_enabled());

        cfg.partner_id = 0;
        assert!(!cfg.is_reporting_enabled());

        cfg.partner_id = 1091;
        cfg.base_url = Some("   ".to_string());
        assert!(!cfg.is_reporting_enabled());
    }

    #[test]
    fn validate_rejects_enabled_url_with_bad_partner_id() {
        let cfg = ReporterConfig {
            base_url: Some("https://collector.example.test/".to_string()),
            partner_id: 0,
            ..ReporterConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_interval_falls_back_to_default() {
        let mut cfg = ReporterConfig::default();
        cfg.timer_interval_secs = -5;
        assert_eq!(
            cfg.hit_interval(),
            Duration::from_secs(DEFAULT_HIT_INTERVAL_SECS as u64)
        );
        cfg.timer_interval_secs = 10;
        assert_eq!(cfg.hit_interval(), Duration::from_secs(10));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ReporterConfig =
            toml::from_str("base_url = \"https://collector.example.test/\"\npartner_id = 7\n")
                .unwrap();
        assert!(cfg.is_reporting_enabled());
        assert_eq!(cfg.asset_type, DEFAULT_ASSET_TYPE);
        assert_eq!(cfg.timer_interval_secs, DEFAULT_HIT_INTERVAL_SECS);
    }
}
