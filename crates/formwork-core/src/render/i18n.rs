//! Label translation

use serde_json::Value;
use std::collections::HashMap;

/// Looks up translated strings for the active locale
pub trait Translator: Send + Sync {
    fn locale(&self) -> &str;

    /// Translation for `key`, or `None` to use the caller's default
    fn translate(&self, key: &str) -> Option<String>;
}

/// Translator that never translates
#[derive(Debug, Clone, Default)]
pub struct NoopTranslator;

impl Translator for NoopTranslator {
    fn locale(&self) -> &str {
        "en"
    }

    fn translate(&self, _key: &str) -> Option<String> {
        None
    }
}

/// In-memory catalogs keyed by locale, with a fallback locale
#[derive(Debug, Clone)]
pub struct StaticTranslator {
    locale: String,
    fallback_locale: String,
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl Default for StaticTranslator {
    fn default() -> Self {
        Self::new("en", "en")
    }
}

impl StaticTranslator {
    pub fn new(locale: impl Into<String>, fallback_locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            fallback_locale: fallback_locale.into(),
            catalogs: HashMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.catalogs
            .entry(locale.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn with(
        mut self,
        locale: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.insert(locale, key, value);
        self
    }

    /// Load catalogs shaped `{"<locale>": {"<key>": "<text>"}}`
    ///
    /// Non-string entries are skipped.
    pub fn load_catalogs(&mut self, catalogs: &Value) {
        let Some(locales) = catalogs.as_object() else {
            return;
        };
        for (locale, entries) in locales {
            for (key, text) in entries.as_object().into_iter().flatten() {
                if let Some(text) = text.as_str() {
                    self.insert(locale.clone(), key.clone(), text);
                }
            }
        }
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<String> {
        self.catalogs.get(locale).and_then(|c| c.get(key)).cloned()
    }
}

impl Translator for StaticTranslator {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn translate(&self, key: &str) -> Option<String> {
        self.lookup(&self.locale, key)
            .or_else(|| self.lookup(&self.fallback_locale, key))
    }
}
