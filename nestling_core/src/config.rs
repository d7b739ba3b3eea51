//! Configuration file support for Nestling.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/nestling/config.toml`.
//! The dosing thresholds live here rather than in the engine: the safety
//! validator fixes the rule shape, while the minimum ages, mg/kg ceilings
//! and re-dosing windows are reference constants a deployment can override.

use crate::{DrugClass, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub dosing: DosingConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Dosing-safety thresholds.
///
/// Defaults follow the WHO/AAP pediatric antipyretic references.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DosingConfig {
    /// Minimum spacing between any two doses, drug class aside
    #[serde(default = "default_any_dose_interval_hours")]
    pub any_dose_interval_hours: i64,

    #[serde(default = "default_acetaminophen_limits")]
    pub acetaminophen: DrugLimits,

    #[serde(default = "default_ibuprofen_limits")]
    pub ibuprofen: DrugLimits,
}

impl Default for DosingConfig {
    fn default() -> Self {
        Self {
            any_dose_interval_hours: default_any_dose_interval_hours(),
            acetaminophen: default_acetaminophen_limits(),
            ibuprofen: default_ibuprofen_limits(),
        }
    }
}

impl DosingConfig {
    /// Threshold table for a drug class
    pub fn limits(&self, drug_class: DrugClass) -> &DrugLimits {
        match drug_class {
            DrugClass::Acetaminophen => &self.acetaminophen,
            DrugClass::Ibuprofen => &self.ibuprofen,
        }
    }
}

/// Per-drug-class safety thresholds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DrugLimits {
    /// Minimum approved age in whole months
    pub min_age_months: u32,
    /// Per-dose ceiling, milligrams per kilogram of body weight
    pub single_dose_max_mg_per_kg: f64,
    /// Trailing-24h cumulative ceiling, milligrams per kilogram
    pub daily_max_mg_per_kg: f64,
    /// Minimum spacing between two doses of this drug class
    pub same_drug_interval_hours: i64,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("nestling")
}

fn default_any_dose_interval_hours() -> i64 {
    2
}

fn default_acetaminophen_limits() -> DrugLimits {
    DrugLimits {
        min_age_months: 3,
        single_dose_max_mg_per_kg: 15.0,
        daily_max_mg_per_kg: 75.0,
        same_drug_interval_hours: 4,
    }
}

fn default_ibuprofen_limits() -> DrugLimits {
    DrugLimits {
        min_age_months: 6,
        single_dose_max_mg_per_kg: 10.0,
        daily_max_mg_per_kg: 40.0,
        same_drug_interval_hours: 6,
    }
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("nestling").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject threshold tables that cannot express a safe dose
    fn validate(&self) -> Result<()> {
        for (name, limits) in [
            ("acetaminophen", &self.dosing.acetaminophen),
            ("ibuprofen", &self.dosing.ibuprofen),
        ] {
            if limits.single_dose_max_mg_per_kg <= 0.0 || limits.daily_max_mg_per_kg <= 0.0 {
                return Err(Error::Config(format!(
                    "{}: dose ceilings must be positive",
                    name
                )));
            }
            if limits.same_drug_interval_hours < 0 {
                return Err(Error::Config(format!(
                    "{}: same-drug interval must not be negative",
                    name
                )));
            }
        }
        if self.dosing.any_dose_interval_hours < 0 {
            return Err(Error::Config(
                "any-dose interval must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dosing.any_dose_interval_hours, 2);
        assert_eq!(config.dosing.acetaminophen.min_age_months, 3);
        assert_eq!(config.dosing.ibuprofen.min_age_months, 6);
        assert_eq!(config.dosing.acetaminophen.same_drug_interval_hours, 4);
    }

    #[test]
    fn test_limits_lookup_by_drug_class() {
        let config = Config::default();
        assert_eq!(
            config.dosing.limits(DrugClass::Ibuprofen).daily_max_mg_per_kg,
            40.0
        );
        assert_eq!(
            config
                .dosing
                .limits(DrugClass::Acetaminophen)
                .single_dose_max_mg_per_kg,
            15.0
        );
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(
            config.dosing.acetaminophen.daily_max_mg_per_kg,
            parsed.dosing.acetaminophen.daily_max_mg_per_kg
        );
        assert_eq!(config.data.data_dir, parsed.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[dosing]
any_dose_interval_hours = 3
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dosing.any_dose_interval_hours, 3);
        assert_eq!(config.dosing.acetaminophen.min_age_months, 3); // default
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[dosing.acetaminophen]
min_age_months = 3
single_dose_max_mg_per_kg = -1.0
daily_max_mg_per_kg = 75.0
same_drug_interval_hours = 4
"#,
        )
        .unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
