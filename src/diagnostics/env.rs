use std::collections::BTreeMap;

/// Characters of a present value shown in the report.
pub const PREVIEW_CHARS: usize = 50;

/// Keys the connectivity check expects to find.
pub const REQUIRED_KEYS: &[&str] = &["FIREBASE_DB_URL", "NODE_ENV"];

/// An immutable snapshot of configuration values.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentConfig {
    values: BTreeMap<String, String>,
}

impl EnvironmentConfig {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        Self::from_iter(std::env::vars())
    }

    /// Returns the value for `key`, treating empty values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    /// Truncated value, `None` when the key is missing.
    pub preview: Option<String>,
}

impl EnvEntry {
    pub fn line(&self) -> String {
        match &self.preview {
            Some(preview) => format!("✓ {}: {}", self.key, preview),
            None => format!("✗ {}: NOT SET", self.key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvCheck {
    pub entries: Vec<EnvEntry>,
}

impl EnvCheck {
    pub fn all_present(&self) -> bool {
        self.entries.iter().all(|e| e.preview.is_some())
    }

    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.preview.is_none())
            .map(|e| e.key.as_str())
            .collect()
    }
}

/// Checks each required key against the snapshot, in order.
pub fn inspect(env: &EnvironmentConfig, required: &[&str]) -> EnvCheck {
    let entries = required
        .iter()
        .map(|key| EnvEntry {
            key: key.to_string(),
            preview: env.get(key).map(preview),
        })
        .collect();
    EnvCheck { entries }
}

fn preview(value: &str) -> String {
    let prefix: String = value.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", prefix)
}
