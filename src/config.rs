use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{LibraryError, Result};
use crate::selection::QualityTiers;

/// Main configuration structure loaded from prompt_library.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub generation: GenerationConfig,
    pub tiers: TiersConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Locations of the two library files
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub prompts_csv: PathBuf,
    pub influences_csv: PathBuf,
}

/// Cohort ratios and fallbacks for the generator
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub clone_ratio: f64,
    pub hybrid_ratio: f64,
    /// Share of mutation picks drawn from the rating-weighted pool
    pub weighted_share: f64,
    /// Mutation candidates requested per mutation slot
    pub candidate_buffer: usize,
    pub default_count: usize,
    pub default_tempo_min: u32,
    pub default_tempo_max: u32,
}

/// Rating substrings that qualify a prompt
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TiersConfig {
    /// Qualifies a prompt as a generation parent
    pub parent_markers: Vec<String>,
    /// Strictest tier, used to build the instrument vocabulary
    pub top_markers: Vec<String>,
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompts_csv: PathBuf::from("programming_music_prompts.csv"),
            influences_csv: PathBuf::from("influences_library.csv"),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            clone_ratio: 0.5,
            hybrid_ratio: 0.3,
            weighted_share: 0.7,
            candidate_buffer: 2,
            default_count: 20,
            default_tempo_min: 70,
            default_tempo_max: 110,
        }
    }
}

impl Default for TiersConfig {
    fn default() -> Self {
        let markers = vec![
            "excellent".to_string(),
            "⭐".to_string(),
            "very good".to_string(),
        ];
        Self {
            parent_markers: markers.clone(),
            top_markers: markers,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "prompt_library=warn".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            generation: GenerationConfig::default(),
            tiers: TiersConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "prompt_library=warn".to_string()),
        }
    }
}

impl TiersConfig {
    pub fn parents(&self) -> QualityTiers {
        QualityTiers::new(&self.parent_markers)
    }

    pub fn top(&self) -> QualityTiers {
        QualityTiers::new(&self.top_markers)
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    ///
    /// Lookup order for the file: PROMPT_LIBRARY_CONFIG, ./prompt_library.toml,
    /// then <config dir>/prompt-library/config.toml. Missing file means defaults.
    /// Read PROMPT_LIBRARY_ENV_FILE if set, otherwise ./.env when present.
    /// Variables already in the environment win.
    pub fn load_env_file() {
        let env_path = std::env::var("PROMPT_LIBRARY_ENV_FILE").unwrap_or_else(|_| ".env".into());
        let _ = dotenvy::from_path(env_path);
    }

    pub fn load() -> Result<Self> {
        Self::load_env_file();

        let mut config = match Self::config_path() {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| LibraryError::io(&path, e))?;
                tracing::debug!("Loaded config from {}", path.display());
                toml::from_str(&content)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var("PROMPT_LIBRARY_CONFIG") {
            let path = PathBuf::from(explicit);
            if !path.exists() {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                return None;
            }
            return Some(path);
        }

        let local = PathBuf::from("prompt_library.toml");
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("prompt-library").join("config.toml"))
            .filter(|p| p.exists())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PL_PROMPTS_CSV") {
            self.paths.prompts_csv = PathBuf::from(path);
            tracing::debug!("PL_PROMPTS_CSV env override applied");
        }
        if let Ok(path) = std::env::var("PL_INFLUENCES_CSV") {
            self.paths.influences_csv = PathBuf::from(path);
            tracing::debug!("PL_INFLUENCES_CSV env override applied");
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);

        if !in_unit(generation.clone_ratio) || !in_unit(generation.hybrid_ratio) {
            return Err(config_error("clone_ratio and hybrid_ratio must be between 0.0 and 1.0"));
        }
        if generation.clone_ratio + generation.hybrid_ratio > 1.0 {
            return Err(config_error("clone_ratio + hybrid_ratio must not exceed 1.0"));
        }
        if !in_unit(generation.weighted_share) {
            return Err(config_error("weighted_share must be between 0.0 and 1.0"));
        }
        if generation.candidate_buffer == 0 {
            return Err(config_error("candidate_buffer must be at least 1"));
        }
        if generation.default_count == 0 {
            return Err(config_error("default_count must be at least 1"));
        }
        if generation.default_tempo_min > generation.default_tempo_max {
            return Err(config_error("default_tempo_min must not exceed default_tempo_max"));
        }
        if self.tiers.parents().is_empty() || self.tiers.top().is_empty() {
            return Err(config_error("parent_markers and top_markers must not be empty"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> LibraryError {
    LibraryError::Config {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation.clone_ratio, 0.5);
        assert_eq!(config.generation.hybrid_ratio, 0.3);
        assert!(config.tiers.parents().qualifies("Excellent ⭐"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [paths]
            prompts_csv = "/data/prompts.csv"

            [tiers]
            parent_markers = ["excellent", "pretty good"]
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.prompts_csv, PathBuf::from("/data/prompts.csv"));
        assert_eq!(
            config.paths.influences_csv,
            PathBuf::from("influences_library.csv")
        );
        assert!(config.tiers.parents().qualifies("Pretty good"));
        assert!(!config.tiers.top().qualifies("Pretty good"));
        assert_eq!(config.generation.default_count, 20);
    }

    #[test]
    fn test_validate_rejects_bad_ratios() {
        let mut config = Config::default();
        config.generation.clone_ratio = 0.8;
        config.generation.hybrid_ratio = 0.4;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.default_tempo_min = 130;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tiers.top_markers = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }
}
