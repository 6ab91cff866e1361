//! Plugin configuration and the settings screen state.
//!
//! The host supplies the configuration; this module only applies defaults and
//! normalization so every consumer sees the same username and country.

use std::env;

use serde::{Deserialize, Serialize};

pub const DEFAULT_USERNAME: &str = "demo";
pub const DEFAULT_COUNTRY: &str = "BE";

/// Uppercase and keep at most two characters. Empty input falls back to `BE`.
pub fn normalize_country(raw: &str) -> String {
    let country: String = raw.to_uppercase().chars().take(2).collect();
    if country.is_empty() {
        DEFAULT_COUNTRY.to_string()
    } else {
        country
    }
}

/// Parameters stored by the host for this plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geonames_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_cities_by_postcode: Option<bool>,
}

impl PluginConfiguration {
    /// Read configuration from `GEONAMES_USERNAME`, `GEONAMES_COUNTRY` and
    /// `GROUP_CITIES_BY_POSTCODE`.
    pub fn from_env() -> Self {
        Self {
            geonames_username: env::var("GEONAMES_USERNAME").ok().filter(|s| !s.is_empty()),
            country: env::var("GEONAMES_COUNTRY").ok().filter(|s| !s.is_empty()),
            group_cities_by_postcode: env::var("GROUP_CITIES_BY_POSTCODE")
                .ok()
                .map(|v| parse_flag(&v)),
        }
    }

    pub fn username(&self) -> &str {
        self.geonames_username
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_USERNAME)
    }

    pub fn country(&self) -> String {
        normalize_country(self.country.as_deref().unwrap_or_default())
    }

    pub fn group_cities_by_postcode(&self) -> bool {
        self.group_cities_by_postcode.unwrap_or(false)
    }

    /// Copy with the country code normalized in place
    pub fn normalized(&self) -> Self {
        Self {
            country: Some(self.country()),
            ..self.clone()
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Draft state of the settings screen: two text inputs and a save action.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    saved: PluginConfiguration,
    username: String,
    country: String,
}

impl SettingsForm {
    pub fn load(saved: &PluginConfiguration) -> Self {
        Self {
            saved: saved.clone(),
            username: saved_username(saved),
            country: saved_country(saved),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn set_username(&mut self, value: impl Into<String>) {
        self.username = value.into();
    }

    /// Country input is uppercased and limited to two characters as it is typed.
    pub fn set_country(&mut self, value: &str) {
        self.country = value.to_uppercase().chars().take(2).collect();
    }

    pub fn has_changes(&self) -> bool {
        self.username != saved_username(&self.saved) || self.country != saved_country(&self.saved)
    }

    pub fn can_save(&self) -> bool {
        self.has_changes()
    }

    /// Parameters to hand to the host when the user saves
    pub fn to_parameters(&self) -> PluginConfiguration {
        PluginConfiguration {
            geonames_username: Some(self.username.clone()).filter(|s| !s.is_empty()),
            country: Some(if self.country.is_empty() {
                DEFAULT_COUNTRY.to_string()
            } else {
                self.country.clone()
            }),
            group_cities_by_postcode: self.saved.group_cities_by_postcode,
        }
    }

    /// Adopt the draft as the new baseline after a successful save.
    pub fn mark_saved(&mut self) {
        self.saved = self.to_parameters();
        self.username = saved_username(&self.saved);
        self.country = saved_country(&self.saved);
    }
}

fn saved_username(config: &PluginConfiguration) -> String {
    config.geonames_username.clone().unwrap_or_default()
}

fn saved_country(config: &PluginConfiguration) -> String {
    config
        .country
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PluginConfiguration::default();
        assert_eq!(config.username(), "demo");
        assert_eq!(config.country(), "BE");
        assert!(!config.group_cities_by_postcode());
    }

    #[test]
    fn test_country_normalization() {
        assert_eq!(normalize_country("be"), "BE");
        assert_eq!(normalize_country("belgium"), "BE");
        assert_eq!(normalize_country("nl"), "NL");
        assert_eq!(normalize_country(""), "BE");

        let config = PluginConfiguration {
            country: Some("fr".to_string()),
            ..Default::default()
        };
        assert_eq!(config.normalized().country.as_deref(), Some("FR"));
    }

    #[test]
    fn test_empty_username_falls_back_to_demo() {
        let config = PluginConfiguration {
            geonames_username: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.username(), "demo");
    }

    #[test]
    fn test_camel_case_parameters() {
        let config: PluginConfiguration = serde_json::from_str(
            r#"{"geonamesUsername":"alice","country":"nl","groupCitiesByPostcode":true}"#,
        )
        .unwrap();
        assert_eq!(config.username(), "alice");
        assert_eq!(config.country(), "NL");
        assert!(config.group_cities_by_postcode());
    }

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("yes"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_settings_form_tracks_changes() {
        let saved = PluginConfiguration {
            geonames_username: Some("alice".to_string()),
            country: None,
            group_cities_by_postcode: Some(true),
        };
        let mut form = SettingsForm::load(&saved);
        assert_eq!(form.username(), "alice");
        assert_eq!(form.country(), "BE");
        assert!(!form.can_save());

        form.set_country("netherlands");
        assert_eq!(form.country(), "NE");
        assert!(form.has_changes());

        form.set_country("be");
        assert!(!form.has_changes());

        form.set_username("");
        assert!(form.can_save());
        let params = form.to_parameters();
        assert_eq!(params.geonames_username, None);
        assert_eq!(params.country.as_deref(), Some("BE"));
        assert_eq!(params.group_cities_by_postcode, Some(true));

        form.mark_saved();
        assert!(!form.has_changes());
        assert_eq!(form.username(), "");
    }

    #[test]
    fn test_empty_country_saves_default() {
        let mut form = SettingsForm::load(&PluginConfiguration::default());
        form.set_country("");
        assert!(form.has_changes());
        assert_eq!(form.to_parameters().country.as_deref(), Some("BE"));
    }
}
