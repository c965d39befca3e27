//! Runtime settings and the persisted filter configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::{CategoryFilters, ModeFilters};
use crate::model::lenient;

pub const DEFAULT_API_ROOT: &str = "https://api.pota.app";

/// Connection settings read from the environment (`.env` is loaded by the binary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_root: String,
    /// Bearer token for the user's own activation list.
    pub id_token: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let api_root = std::env::var("POTA_API_ROOT")
            .ok()
            .filter(|root| !root.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_ROOT.to_string());
        let id_token = std::env::var("POTA_ID_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        Self {
            api_root: api_root.trim_end_matches('/').to_string(),
            id_token,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            id_token: None,
        }
    }
}

/// Filter state as it is stored on disk:
/// ```json
/// {
///   "potaFilters": { "allParks": false, "currentlyActivating": true },
///   "modeFilters": { "new": true, "cw": true, "ssb": false, "data": true, "unk": true }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub pota_filters: CategoryFilters,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub mode_filters: ModeFilters,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pota_filters: CategoryFilters::all_enabled(),
            mode_filters: ModeFilters::all_enabled(),
        }
    }
}

impl FilterConfig {
    /// Loads the filters from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read filter config {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse filter config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: FilterConfig = serde_json::from_str(content)?;
        Ok(config.with_defaults())
    }

    /// A category set without `allParks`, or a mode set without `new`, was
    /// never saved by a complete filter panel and is replaced by the
    /// everything-on default.
    pub fn with_defaults(self) -> Self {
        let pota_filters = if self.pota_filters.all_parks.is_none() {
            CategoryFilters::all_enabled()
        } else {
            self.pota_filters
        };
        let mode_filters = if self.mode_filters.new.is_none() {
            ModeFilters::all_enabled()
        } else {
            self.mode_filters
        };

        Self {
            pota_filters,
            mode_filters,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body)
            .with_context(|| format!("failed to write filter config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("potamap_engine_{name}_{}.json", std::process::id()))
    }

    #[test]
    fn test_empty_object_gets_everything_enabled() {
        let config = FilterConfig::parse("{}").unwrap();
        assert_eq!(config, FilterConfig::default());
        assert_eq!(config.mode_filters.unk, Some(true));
    }

    #[test]
    fn test_missing_all_parks_resets_categories() {
        let config = FilterConfig::parse(
            r#"{"potaFilters": {"newParks": false}, "modeFilters": {"new": false, "cw": true}}"#,
        )
        .unwrap();

        assert_eq!(config.pota_filters, CategoryFilters::all_enabled());
        assert_eq!(config.mode_filters.new, Some(false));
        assert_eq!(config.mode_filters.cw, Some(true));
        assert_eq!(config.mode_filters.ssb, None);
    }

    #[test]
    fn test_saved_filters_are_kept_as_given() {
        let config = FilterConfig::parse(
            r#"{"potaFilters": {"allParks": false, "currentlyActivating": true}, "modeFilters": {"cw": false}}"#,
        )
        .unwrap();

        assert_eq!(config.pota_filters.all_parks, Some(false));
        assert_eq!(config.pota_filters.currently_activating, Some(true));
        assert_eq!(config.pota_filters.my_activations, None);
        assert_eq!(config.mode_filters, ModeFilters::all_enabled());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("filters_roundtrip");
        let mut config = FilterConfig::default();
        config.pota_filters.all_parks = Some(false);
        config.mode_filters.data = Some(false);

        config.save(&path).unwrap();
        let loaded = FilterConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_fails_with_path() {
        let path = temp_path("does_not_exist");
        let err = FilterConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to read filter config"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(FilterConfig::parse("{not json").is_err());
    }
}
