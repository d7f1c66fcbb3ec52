//! Internationalization (i18n) support

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::helpers::DateNames;

/// Language tables shipped with the binary
const BUILTIN_LANGUAGES: &[(&str, &str)] = &[
    ("pt-BR", include_str!("languages/pt-BR.yml")),
    ("en", include_str!("languages/en.yml")),
];

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, serde_yaml::Value>>,
}

impl I18n {
    /// Create a handler for `language` with the built-in tables loaded
    pub fn new(language: &str) -> Self {
        let mut i18n = Self {
            language: language.to_string(),
            translations: HashMap::new(),
        };

        for (lang, source) in BUILTIN_LANGUAGES {
            match serde_yaml::from_str(source) {
                Ok(data) => {
                    i18n.translations.insert(lang.to_string(), data);
                }
                Err(e) => tracing::warn!("Failed to parse built-in language {}: {}", lang, e),
            }
        }

        i18n
    }

    /// Load language files from a directory, overriding built-in keys
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                let ext = path.extension().and_then(|e| e.to_str());
                if matches!(ext, Some("yml") | Some("yaml") | Some("json")) {
                    let lang = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("en")
                        .to_string();

                    let content = fs::read_to_string(&path)?;

                    // Try to parse, skip invalid files
                    let data: Option<HashMap<String, serde_yaml::Value>> = if ext == Some("json") {
                        match serde_json::from_str::<serde_json::Value>(&content) {
                            Ok(json) => Some(convert_json_to_yaml(json)),
                            Err(e) => {
                                tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                                None
                            }
                        }
                    } else {
                        match serde_yaml::from_str(&content) {
                            Ok(data) => Some(data),
                            Err(e) => {
                                tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                                None
                            }
                        }
                    };

                    if let Some(data) = data {
                        self.translations.entry(lang).or_default().extend(data);
                        tracing::debug!("Loaded language file: {:?}", path);
                    }
                }
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key
    /// Key can be nested like "not_found.title"
    pub fn get(&self, key: &str) -> String {
        self.lookup(key)
            .map(yaml_value_to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a list of strings by key, e.g. "date.months_short"
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        match self.lookup(key)? {
            serde_yaml::Value::Sequence(items) => {
                Some(items.iter().map(yaml_value_to_string).collect())
            }
            _ => None,
        }
    }

    /// Month and weekday names for the current language
    ///
    /// Incomplete tables fall back to English names.
    pub fn date_names(&self) -> DateNames {
        let english = DateNames::english();
        let names = DateNames {
            months: self.get_list("date.months").unwrap_or(english.months.clone()),
            months_short: self
                .get_list("date.months_short")
                .unwrap_or(english.months_short.clone()),
            weekdays: self
                .get_list("date.weekdays")
                .unwrap_or(english.weekdays.clone()),
            weekdays_short: self
                .get_list("date.weekdays_short")
                .unwrap_or(english.weekdays_short.clone()),
        };

        if names.is_complete() {
            names
        } else {
            tracing::warn!("Incomplete date names for {}, using English", self.language);
            english
        }
    }

    /// Look a key up in the current language, its base language, then English
    fn lookup(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.fallback_chain()
            .into_iter()
            .filter_map(|lang| self.translations.get(lang))
            .find_map(|data| get_nested_value(data, key))
    }

    fn fallback_chain(&self) -> Vec<&str> {
        let mut chain = vec![self.language.as_str()];
        if let Some((base, _)) = self.language.split_once('-') {
            chain.push(base);
        }
        if self.language != "en" {
            chain.push("en");
        }
        chain
    }
}

/// Get a nested value from a YAML map using dot notation
fn get_nested_value<'a>(
    data: &'a HashMap<String, serde_yaml::Value>,
    key: &str,
) -> Option<&'a serde_yaml::Value> {
    let parts: Vec<&str> = key.split('.').collect();
    let mut current: Option<&serde_yaml::Value> = data.get(parts[0]);

    for part in &parts[1..] {
        match current {
            Some(serde_yaml::Value::Mapping(map)) => {
                current = map.get(serde_yaml::Value::String(part.to_string()));
            }
            _ => return None,
        }
    }

    current
}

/// Convert a YAML value to a string
fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

/// Convert JSON value to YAML HashMap
fn convert_json_to_yaml(json: serde_json::Value) -> HashMap<String, serde_yaml::Value> {
    let mut result = HashMap::new();

    if let serde_json::Value::Object(obj) = json {
        for (key, value) in obj {
            result.insert(key, json_value_to_yaml(value));
        }
    }

    result
}

fn json_value_to_yaml(json: serde_json::Value) -> serde_yaml::Value {
    match json {
        serde_json::Value::Null => serde_yaml::Value::Null,
        serde_json::Value::Bool(b) => serde_yaml::Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_yaml::Value::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                serde_yaml::Value::Number(serde_yaml::Number::from(f))
            } else {
                serde_yaml::Value::Null
            }
        }
        serde_json::Value::String(s) => serde_yaml::Value::String(s),
        serde_json::Value::Array(arr) => {
            serde_yaml::Value::Sequence(arr.into_iter().map(json_value_to_yaml).collect())
        }
        serde_json::Value::Object(obj) => {
            let mut map = serde_yaml::Mapping::new();
            for (k, v) in obj {
                map.insert(serde_yaml::Value::String(k), json_value_to_yaml(v));
            }
            serde_yaml::Value::Mapping(map)
        }
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("pt-BR")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_portuguese() {
        let i18n = I18n::new("pt-BR");
        assert_eq!(i18n.get("loading"), "Carregando...");
        assert_eq!(i18n.get("post.reading_unit"), "min");
        assert_eq!(i18n.get("listing.load_more"), "Carregar mais posts");
        assert_eq!(i18n.get("unknown.key"), "unknown.key");
    }

    #[test]
    fn test_date_names() {
        let names = I18n::new("pt-BR").date_names();
        assert_eq!(names.months_short[4], "Mai");
        assert_eq!(names.weekdays[0], "Domingo");

        let names = I18n::new("en").date_names();
        assert_eq!(names.months_short[4], "May");
    }

    #[test]
    fn test_fallback_to_english() {
        let i18n = I18n::new("fr");
        assert_eq!(i18n.get("loading"), "Loading...");
        assert_eq!(i18n.date_names(), DateNames::english());
    }

    #[test]
    fn test_base_language_fallback() {
        let mut i18n = I18n::new("pt-PT");
        let mut pt = HashMap::new();
        pt.insert(
            "loading".to_string(),
            serde_yaml::Value::String("A carregar...".to_string()),
        );
        i18n.translations.insert("pt".to_string(), pt);
        assert_eq!(i18n.get("loading"), "A carregar...");
        assert_eq!(i18n.get("home"), "Home");
    }

    #[test]
    fn test_load_languages_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pt-BR.yml"), "loading: Aguarde...\n").unwrap();
        std::fs::write(
            dir.path().join("de.json"),
            r#"{ "loading": "Laden...", "date": { "months_short": ["Jan"] } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.yml"), "loading: [unclosed").unwrap();

        let mut i18n = I18n::new("pt-BR");
        i18n.load_languages(dir.path()).unwrap();
        assert_eq!(i18n.get("loading"), "Aguarde...");
        assert_eq!(i18n.get("home"), "Início");

        let mut german = I18n::new("de");
        german.load_languages(dir.path()).unwrap();
        assert_eq!(german.get("loading"), "Laden...");
        assert_eq!(german.get_list("date.months_short"), Some(vec!["Jan".to_string()]));
        assert_eq!(german.date_names(), DateNames::english());
    }
}
