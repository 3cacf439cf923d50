use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Medibot";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Disease id reserved for the "malestar general" fallback row seeded by migration 002.
pub const DEFAULT_GENERIC_DISEASE_ID: i64 = 1;

/// Number of prior messages handed to the LLM as history.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Log filter used when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,medibot=debug"
}

/// Get the application data directory.
/// ~/Medibot/ on all platforms, or ./Medibot when the home directory is unknown.
pub fn app_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(APP_NAME),
        None => PathBuf::from(APP_NAME),
    }
}

/// Default location of the knowledge and conversation database.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("medibot.db")
}

/// Runtime configuration, read once at startup.
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub db_path: PathBuf,
    pub llm_enabled: bool,
    pub ollama_url: String,
    pub ollama_model: String,
    pub llm_timeout_secs: u64,
    pub wiki_lang: String,
    pub wiki_timeout_secs: u64,
    /// Persist reported symptom phrases as synonyms when a user teaches a disease.
    pub learn_synonyms: bool,
    pub generic_disease_id: i64,
    pub history_window: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            llm_enabled: true,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "medgemma".to_string(),
            llm_timeout_secs: 30,
            wiki_lang: "es".to_string(),
            wiki_timeout_secs: 10,
            learn_synonyms: false,
            generic_disease_id: DEFAULT_GENERIC_DISEASE_ID,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl AssistantConfig {
    /// Build the configuration from `MEDIBOT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    /// Unparseable values are logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| -> String {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => v.trim().to_string(),
                _ => default,
            }
        };

        Self {
            db_path: lookup("MEDIBOT_DB_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            llm_enabled: parse_or(&lookup, "MEDIBOT_LLM_ENABLED", defaults.llm_enabled, parse_bool),
            ollama_url: text("MEDIBOT_OLLAMA_URL", defaults.ollama_url),
            ollama_model: text("MEDIBOT_OLLAMA_MODEL", defaults.ollama_model),
            llm_timeout_secs: parse_or(&lookup, "MEDIBOT_LLM_TIMEOUT_SECS", defaults.llm_timeout_secs, parse_positive),
            wiki_lang: text("MEDIBOT_WIKI_LANG", defaults.wiki_lang),
            wiki_timeout_secs: parse_or(&lookup, "MEDIBOT_WIKI_TIMEOUT_SECS", defaults.wiki_timeout_secs, parse_positive),
            learn_synonyms: parse_or(&lookup, "MEDIBOT_LEARN_SYNONYMS", defaults.learn_synonyms, parse_bool),
            generic_disease_id: parse_or(&lookup, "MEDIBOT_GENERIC_DISEASE_ID", defaults.generic_disease_id, |v| {
                v.parse::<i64>().ok().filter(|id| *id > 0)
            }),
            history_window: parse_or(&lookup, "MEDIBOT_HISTORY_WINDOW", defaults.history_window, |v| {
                v.parse::<usize>().ok()
            }),
        }
    }
}

fn parse_or<F, T, P>(lookup: &F, key: &str, default: T, parse: P) -> T
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match parse(raw.trim()) {
            Some(value) => value,
            None => {
                tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
                default
            }
        },
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_positive(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().filter(|v| *v > 0)
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("Medibot"));
    }

    #[test]
    fn default_db_path_under_app_data() {
        let db = default_db_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("medibot.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AssistantConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, AssistantConfig::default());
        assert_eq!(config.generic_disease_id, 1);
        assert_eq!(config.history_window, 10);
        assert!(config.llm_enabled);
        assert!(!config.learn_synonyms);
    }

    #[test]
    fn overrides_are_applied() {
        let config = AssistantConfig::from_lookup(lookup_from(&[
            ("MEDIBOT_DB_PATH", "/tmp/x.db"),
            ("MEDIBOT_LLM_ENABLED", "false"),
            ("MEDIBOT_OLLAMA_MODEL", "llama3"),
            ("MEDIBOT_LLM_TIMEOUT_SECS", "5"),
            ("MEDIBOT_WIKI_LANG", "en"),
            ("MEDIBOT_LEARN_SYNONYMS", "yes"),
            ("MEDIBOT_HISTORY_WINDOW", "4"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert!(!config.llm_enabled);
        assert_eq!(config.ollama_model, "llama3");
        assert_eq!(config.llm_timeout_secs, 5);
        assert_eq!(config.wiki_lang, "en");
        assert!(config.learn_synonyms);
        assert_eq!(config.history_window, 4);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = AssistantConfig::from_lookup(lookup_from(&[
            ("MEDIBOT_LLM_ENABLED", "maybe"),
            ("MEDIBOT_LLM_TIMEOUT_SECS", "0"),
            ("MEDIBOT_GENERIC_DISEASE_ID", "-3"),
            ("MEDIBOT_HISTORY_WINDOW", "lots"),
        ]));
        assert!(config.llm_enabled);
        assert_eq!(config.llm_timeout_secs, 30);
        assert_eq!(config.generic_disease_id, 1);
        assert_eq!(config.history_window, 10);
    }

    #[test]
    fn blank_text_values_use_defaults() {
        let config = AssistantConfig::from_lookup(lookup_from(&[("MEDIBOT_OLLAMA_URL", "   ")]));
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AssistantConfig =
            serde_json::from_str(r#"{"ollama_model": "llama3", "learn_synonyms": true}"#).unwrap();
        assert_eq!(config.ollama_model, "llama3");
        assert!(config.learn_synonyms);
        assert_eq!(config.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn serialized_config_names_every_field() {
        let json = serde_json::to_value(AssistantConfig::default()).unwrap();
        assert_eq!(json["generic_disease_id"], 1);
        assert_eq!(json["wiki_lang"], "es");
        assert!(json["db_path"].as_str().unwrap().ends_with("medibot.db"));
    }
}
