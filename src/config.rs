//! Service configuration
//!
//! Read once at startup from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::tools::chart::{DEFAULT_CHART_HEIGHT, DEFAULT_CHART_WIDTH, MAX_CHART_DIMENSION};

pub const ENV_CHART_DIR: &str = "DNADIL_CHART_DIR";
pub const ENV_CHART_WIDTH: &str = "DNADIL_CHART_WIDTH";
pub const ENV_CHART_HEIGHT: &str = "DNADIL_CHART_HEIGHT";
pub const ENV_RENDER_PACING_MS: &str = "DNADIL_RENDER_PACING_MS";

/// Runtime configuration for the dilution service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Directory charts are also written to, if set
    pub chart_dir: Option<PathBuf>,
    pub chart_width: u32,
    pub chart_height: u32,
    /// Delay between consecutive step renders
    #[serde(serialize_with = "serialize_millis")]
    pub render_pacing: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            chart_dir: None,
            chart_width: DEFAULT_CHART_WIDTH,
            chart_height: DEFAULT_CHART_HEIGHT,
            render_pacing: Duration::ZERO,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup, falling back to defaults for
    /// missing or unusable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let chart_dir = lookup(ENV_CHART_DIR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let chart_width = chart_dimension(lookup(ENV_CHART_WIDTH), ENV_CHART_WIDTH).unwrap_or(defaults.chart_width);
        let chart_height = chart_dimension(lookup(ENV_CHART_HEIGHT), ENV_CHART_HEIGHT).unwrap_or(defaults.chart_height);

        let render_pacing = lookup(ENV_RENDER_PACING_MS)
            .and_then(|s| match s.trim().parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    tracing::warn!("Ignoring invalid {}='{}'", ENV_RENDER_PACING_MS, s);
                    None
                }
            })
            .unwrap_or(defaults.render_pacing);

        Self {
            chart_dir,
            chart_width,
            chart_height,
            render_pacing,
        }
    }
}

/// Chart width or height in 1..=MAX_CHART_DIMENSION
fn chart_dimension(value: Option<String>, key: &str) -> Option<u32> {
    let raw = value?;
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 && n <= MAX_CHART_DIMENSION => Some(n),
        _ => {
            tracing::warn!("Ignoring invalid {}='{}'", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServiceConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.chart_dir, None);
        assert_eq!(config.chart_width, DEFAULT_CHART_WIDTH);
        assert_eq!(config.chart_height, DEFAULT_CHART_HEIGHT);
        assert_eq!(config.render_pacing, Duration::ZERO);
    }

    #[test]
    fn test_reads_values() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ENV_CHART_DIR, "/tmp/charts"),
            (ENV_CHART_WIDTH, "800"),
            (ENV_CHART_HEIGHT, " 600 "),
            (ENV_RENDER_PACING_MS, "2000"),
        ]));
        assert_eq!(config.chart_dir, Some(PathBuf::from("/tmp/charts")));
        assert_eq!(config.chart_width, 800);
        assert_eq!(config.chart_height, 600);
        assert_eq!(config.render_pacing, Duration::from_millis(2000));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ENV_CHART_DIR, "  "),
            (ENV_CHART_WIDTH, "0"),
            (ENV_CHART_HEIGHT, "tall"),
            (ENV_RENDER_PACING_MS, "-5"),
        ]));
        assert_eq!(config.chart_dir, None);
        assert_eq!(config.chart_width, DEFAULT_CHART_WIDTH);
        assert_eq!(config.chart_height, DEFAULT_CHART_HEIGHT);
        assert_eq!(config.render_pacing, Duration::ZERO);
    }

    #[test]
    fn test_oversized_chart_dimensions_fall_back() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ENV_CHART_WIDTH, "40000"),
            (ENV_CHART_HEIGHT, "4097"),
        ]));
        assert_eq!(config.chart_width, DEFAULT_CHART_WIDTH);
        assert_eq!(config.chart_height, DEFAULT_CHART_HEIGHT);

        let config = ServiceConfig::from_lookup(lookup_from(&[
            (ENV_CHART_WIDTH, "4096"),
            (ENV_CHART_HEIGHT, "4096"),
        ]));
        assert_eq!(config.chart_width, MAX_CHART_DIMENSION);
        assert_eq!(config.chart_height, MAX_CHART_DIMENSION);
    }

    #[test]
    fn test_serializes_pacing_as_millis() {
        let config = ServiceConfig {
            render_pacing: Duration::from_millis(250),
            ..ServiceConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["render_pacing"], 250);
    }
}
