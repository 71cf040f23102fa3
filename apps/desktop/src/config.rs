use std::{env, fs};

use serde::Deserialize;
use tracing::warn;

/// Shell settings: a `pantry.toml` next to the binary provides defaults, and
/// `PANTRY_*` environment variables override it.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub alert_delay_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/food.db".into(),
            alert_delay_seconds: 2,
        }
    }
}

/// On-disk shape of `pantry.toml`. Every field is optional; absent fields
/// keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    alert_delay_seconds: Option<u64>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("pantry.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = env::var("PANTRY_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = env::var("PANTRY_ALERT_DELAY_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.alert_delay_seconds = parsed;
        }
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => {
            if let Some(v) = file_cfg.database_url {
                settings.database_url = v;
            }
            if let Some(v) = file_cfg.alert_delay_seconds {
                settings.alert_delay_seconds = v;
            }
        }
        Err(err) => warn!(%err, "ignoring malformed pantry.toml"),
    }
}

/// Accepts bare file paths as well as full sqlite URLs.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
    }

    #[test]
    fn keeps_memory_and_full_urls_untouched() {
        assert_eq!(
            normalize_database_url("sqlite::memory:"),
            "sqlite::memory:"
        );
        assert_eq!(
            normalize_database_url("sqlite://./data/food.db"),
            "sqlite://./data/food.db"
        );
    }

    #[test]
    fn empty_url_falls_back_to_default() {
        assert_eq!(
            normalize_database_url("   "),
            Settings::default().database_url
        );
    }

    #[test]
    fn short_sqlite_prefix_is_expanded() {
        assert_eq!(
            normalize_database_url("sqlite:data/food.db"),
            "sqlite://data/food.db"
        );
    }

    #[test]
    fn integer_delay_in_file_keeps_database_url_from_same_file() {
        let mut settings = Settings::default();
        apply_file_config(
            &mut settings,
            "database_url = \"sqlite://./data/custom.db\"\nalert_delay_seconds = 5\n",
        );
        assert_eq!(settings.database_url, "sqlite://./data/custom.db");
        assert_eq!(settings.alert_delay_seconds, 5);
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_fields() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "alert_delay_seconds = 9\n");
        assert_eq!(settings.database_url, Settings::default().database_url);
        assert_eq!(settings.alert_delay_seconds, 9);
    }

    #[test]
    fn malformed_file_leaves_defaults_untouched() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "not valid toml ][");
        assert_eq!(settings.database_url, Settings::default().database_url);
        assert_eq!(
            settings.alert_delay_seconds,
            Settings::default().alert_delay_seconds
        );
    }

    #[test]
    fn env_vars_override_defaults() {
        env::set_var("PANTRY_DATABASE_URL", "sqlite://./env/override.db");
        env::set_var("PANTRY_ALERT_DELAY_SECONDS", "7");

        let settings = load_settings();

        env::remove_var("PANTRY_DATABASE_URL");
        env::remove_var("PANTRY_ALERT_DELAY_SECONDS");

        assert_eq!(settings.database_url, "sqlite://./env/override.db");
        assert_eq!(settings.alert_delay_seconds, 7);
    }
}
