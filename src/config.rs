//! Configuration system.
//!
//! Hierarchical configuration loading, in the same shape as the
//! teacher's storage config: `config.toml` (base), `config.local.toml`
//! (git-ignored local overrides), then `TCLC_`-prefixed environment
//! variables, merged in that order via `figment`.
//!
//! ```toml
//! # config.toml
//! [cases]
//! cases_dir = "./cases"
//! output_dir = "./kernels"
//! skip = [6, 8, 10]
//! ```
//!
//! ```bash
//! TCLC_CASES__CASES_DIR=/custom/path
//! ```

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub cases: CasesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where case JSON files live and where generated output goes, plus
/// the case numbers to skip — defaults match the reference driver's
/// hardcoded `./cases/`, `./kernels/`, and `{6, 8, 10}` exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasesConfig {
    pub cases_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_skip")]
    pub skip: Vec<u32>,
    #[serde(default = "default_case_count")]
    pub case_count: u32,
}

fn default_skip() -> Vec<u32> {
    vec![6, 8, 10]
}

fn default_case_count() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level() }
    }
}

impl Config {
    /// Merge `config.toml`, then `config.local.toml`, then
    /// `TCLC_`-prefixed env vars (`__` as the nesting separator).
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("TCLC_").split("__"))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("TCLC_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cases: CasesConfig {
                cases_dir: PathBuf::from("./cases"),
                output_dir: PathBuf::from("./kernels"),
                skip: default_skip(),
                case_count: default_case_count(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_driver_hardcoding() {
        let config = Config::default();
        assert_eq!(config.cases.cases_dir, PathBuf::from("./cases"));
        assert_eq!(config.cases.output_dir, PathBuf::from("./kernels"));
        assert_eq!(config.cases.skip, vec![6, 8, 10]);
        assert_eq!(config.cases.case_count, 10);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[cases]"));
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.cases.cases_dir, config.cases.cases_dir);
    }
}
