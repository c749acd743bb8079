//! Extractor configuration.
//!
//! Read once at startup from environment variables (a `.env` file is loaded
//! first by `main`) and handed to every poller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use extraction::SourceKind;
use serde::{Deserialize, Serialize};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Parse from string (case-insensitive), defaulting to JSON.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" | "text" | "plain" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Per-source settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub enabled: bool,
    /// Replace the CSV with a `.csv.zip` archive.
    pub compress: bool,
    /// Slots (3-hourly for `ec`) or days (`mfwam`, `smoc`) to look back.
    pub lookback: u32,
}

/// Top-level extractor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Root of the NetCDF input tree
    pub nc_dir: PathBuf,

    /// Root of the CSV output tree
    pub csv_dir: PathBuf,

    /// Seconds between polling cycles
    pub poll_interval_secs: u64,

    pub log_level: String,
    pub log_format: LogFormat,

    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,

    pub ec: SourceSettings,
    pub mfwam: SourceSettings,
    pub smoc: SourceSettings,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            nc_dir: PathBuf::from("/data/nc-files"),
            csv_dir: PathBuf::from("/data/csv-files"),
            poll_interval_secs: 24 * 60 * 60,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_port: None,
            ec: SourceSettings {
                enabled: true,
                compress: false,
                lookback: 24,
            },
            mfwam: SourceSettings {
                enabled: true,
                compress: true,
                lookback: 2,
            },
            smoc: SourceSettings {
                enabled: true,
                compress: true,
                lookback: 2,
            },
        }
    }
}

impl ExtractorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value lookup, falling back to the
    /// default for every key that is absent or fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("NC_DIR") {
            config.nc_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("CSV_DIR") {
            config.csv_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("POLL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                config.poll_interval_secs = secs;
            }
        }

        if let Some(val) = lookup("LOG_LEVEL") {
            config.log_level = val;
        }

        if let Some(val) = lookup("LOG_FORMAT") {
            config.log_format = LogFormat::from_str(&val);
        }

        if let Some(val) = lookup("METRICS_PORT") {
            config.metrics_port = val.parse().ok();
        }

        for kind in SourceKind::ALL {
            let prefix = kind.prefix().to_uppercase();
            let settings = config.source_mut(kind);

            if let Some(val) = lookup(&format!("{prefix}_ENABLED")) {
                settings.enabled = parse_bool(&val);
            }
            if let Some(val) = lookup(&format!("{prefix}_COMPRESS")) {
                settings.compress = parse_bool(&val);
            }
            if let Some(val) = lookup(&format!("{prefix}_LOOKBACK")) {
                if let Ok(n) = val.parse() {
                    settings.lookback = n;
                }
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be > 0".to_string());
        }

        for kind in SourceKind::ALL {
            if self.source(kind).lookback == 0 {
                return Err(format!("{}_LOOKBACK must be > 0", kind.prefix().to_uppercase()));
            }
        }

        if self.nc_dir.as_os_str().is_empty() || self.csv_dir.as_os_str().is_empty() {
            return Err("nc_dir and csv_dir must be set".to_string());
        }

        Ok(())
    }

    pub fn source(&self, kind: SourceKind) -> &SourceSettings {
        match kind {
            SourceKind::Atmosphere => &self.ec,
            SourceKind::Wave => &self.mfwam,
            SourceKind::Current => &self.smoc,
        }
    }

    fn source_mut(&mut self, kind: SourceKind) -> &mut SourceSettings {
        match kind {
            SourceKind::Atmosphere => &mut self.ec,
            SourceKind::Wave => &mut self.mfwam,
            SourceKind::Current => &mut self.smoc,
        }
    }

    /// Sources with `enabled = true`, in a fixed order.
    pub fn enabled_sources(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|kind| self.source(*kind).enabled)
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn nc_dir(&self) -> &Path {
        &self.nc_dir
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    /// The configuration rendered as YAML, for the startup log.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ExtractorConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ExtractorConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config, ExtractorConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(86400));
        assert!(!config.ec.compress);
        assert!(config.mfwam.compress && config.smoc.compress);
        assert_eq!(config.ec.lookback, 24);
        assert_eq!(config.enabled_sources(), SourceKind::ALL.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("NC_DIR", "/mnt/nc"),
            ("CSV_DIR", "/mnt/csv"),
            ("POLL_INTERVAL_SECS", "3600"),
            ("LOG_FORMAT", "pretty"),
            ("METRICS_PORT", "9100"),
            ("EC_COMPRESS", "true"),
            ("MFWAM_ENABLED", "false"),
            ("SMOC_LOOKBACK", "5"),
        ]);

        assert_eq!(config.nc_dir(), Path::new("/mnt/nc"));
        assert_eq!(config.csv_dir(), Path::new("/mnt/csv"));
        assert_eq!(config.poll_interval_secs, 3600);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.metrics_port, Some(9100));
        assert!(config.ec.compress);
        assert!(!config.mfwam.enabled);
        assert_eq!(config.smoc.lookback, 5);
        assert_eq!(
            config.enabled_sources(),
            vec![SourceKind::Atmosphere, SourceKind::Current]
        );
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = from_pairs(&[("POLL_INTERVAL_SECS", "daily"), ("EC_LOOKBACK", "-3")]);
        assert_eq!(config.poll_interval_secs, 86400);
        assert_eq!(config.ec.lookback, 24);
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(from_pairs(&[("POLL_INTERVAL_SECS", "0")]).validate().is_err());

        let err = from_pairs(&[("MFWAM_LOOKBACK", "0")]).validate().unwrap_err();
        assert!(err.contains("MFWAM_LOOKBACK"));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = from_pairs(&[("SMOC_COMPRESS", "0")]);
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("csv_dir: /data/csv-files"));

        let parsed: ExtractorConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
