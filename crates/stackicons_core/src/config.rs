use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::repair::RepairScope;

pub const DEFAULT_CONFIG_FILENAME: &str = "stackicons.toml";
pub const DEFAULT_PROJECT_ID: &str = "4ddas0r0";
pub const DEFAULT_DATASET: &str = "production";
pub const DEFAULT_API_VERSION: &str = "2024-01-01";
pub const DEFAULT_DOCUMENT_ID: &str = "36c1a7cc-9504-4705-837a-466eaab2a289-ar";
pub const DEFAULT_DOCUMENT_TYPE: &str = "homepage";
pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";
pub const DEFAULT_TARGET_LANGUAGE: &str = "ar";
pub const DEFAULT_USER_AGENT: &str = "stackicons/0.1";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct StackConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub fallback: FallbackSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct StoreSection {
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub api_version: Option<String>,
    pub document_id: Option<String>,
    pub document_type: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FallbackSection {
    pub default_icon: Option<String>,
    #[serde(default)]
    pub icons: BTreeMap<String, String>,
}

/// Fully resolved connection and scope settings for one run.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub document_id: String,
    pub document_type: String,
    pub source_language: String,
    pub target_language: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub token: Option<String>,
    pub sources: Vec<(&'static str, ValueSource)>,
}

impl StoreSettings {
    pub fn scope(&self) -> RepairScope {
        RepairScope {
            document_type: self.document_type.clone(),
            document_id: self.document_id.clone(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
        }
    }

    pub fn source_of(&self, key: &str) -> ValueSource {
        self.sources
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, source)| *source)
            .unwrap_or(ValueSource::Default)
    }

    /// Render settings for `--diagnostics`. The token is never printed.
    pub fn diagnostics(&self) -> String {
        let mut lines = Vec::new();
        for (key, value) in [
            ("project_id", self.project_id.as_str()),
            ("dataset", self.dataset.as_str()),
            ("api_version", self.api_version.as_str()),
            ("document_id", self.document_id.as_str()),
            ("document_type", self.document_type.as_str()),
            ("source_language", self.source_language.as_str()),
            ("target_language", self.target_language.as_str()),
            ("user_agent", self.user_agent.as_str()),
        ] {
            lines.push(format!(
                "{key}={value} ({})",
                self.source_of(key).as_str()
            ));
        }
        lines.push(format!(
            "timeout_ms={} ({})",
            self.timeout_ms,
            self.source_of("timeout_ms").as_str()
        ));
        lines.push(format!(
            "token={}",
            if self.token.is_some() { "<set>" } else { "<missing>" }
        ));
        lines.join("\n")
    }
}

impl StackConfig {
    /// Resolve store settings: env > config > compiled-in default.
    pub fn resolve_store_settings(&self) -> Result<StoreSettings> {
        self.resolve_store_settings_with_lookup(|key| env::var(key).ok())
    }

    pub fn resolve_store_settings_with_lookup<F>(&self, lookup_env: F) -> Result<StoreSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = &self.store;
        let mut sources = Vec::new();
        let mut layer = |key: &'static str,
                         env_key: Option<&str>,
                         configured: Option<&String>,
                         default: &str|
         -> String {
            if let Some(value) = env_key.and_then(|name| non_empty(lookup_env(name))) {
                sources.push((key, ValueSource::Env));
                return value;
            }
            if let Some(value) = non_empty(configured.cloned()) {
                sources.push((key, ValueSource::Config));
                return value;
            }
            sources.push((key, ValueSource::Default));
            default.to_string()
        };

        let project_id = layer(
            "project_id",
            Some("SANITY_PROJECT_ID"),
            store.project_id.as_ref(),
            DEFAULT_PROJECT_ID,
        );
        let dataset = layer(
            "dataset",
            Some("SANITY_DATASET"),
            store.dataset.as_ref(),
            DEFAULT_DATASET,
        );
        let api_version = layer(
            "api_version",
            Some("SANITY_API_VERSION"),
            store.api_version.as_ref(),
            DEFAULT_API_VERSION,
        );
        let document_id = layer(
            "document_id",
            Some("SANITY_DOCUMENT_ID"),
            store.document_id.as_ref(),
            DEFAULT_DOCUMENT_ID,
        );
        let document_type = layer(
            "document_type",
            None,
            store.document_type.as_ref(),
            DEFAULT_DOCUMENT_TYPE,
        );
        let source_language = layer(
            "source_language",
            None,
            store.source_language.as_ref(),
            DEFAULT_SOURCE_LANGUAGE,
        );
        let target_language = layer(
            "target_language",
            None,
            store.target_language.as_ref(),
            DEFAULT_TARGET_LANGUAGE,
        );
        let user_agent = layer(
            "user_agent",
            Some("STACKICONS_USER_AGENT"),
            store.user_agent.as_ref(),
            DEFAULT_USER_AGENT,
        );

        let (timeout_ms, timeout_source) = if let Some(value) =
            non_empty(lookup_env("STACKICONS_HTTP_TIMEOUT_MS")).and_then(|value| value.parse::<u64>().ok())
        {
            (value, ValueSource::Env)
        } else if let Some(value) = store.timeout_ms {
            (value, ValueSource::Config)
        } else {
            (DEFAULT_TIMEOUT_MS, ValueSource::Default)
        };
        sources.push(("timeout_ms", timeout_source));

        if source_language == target_language {
            bail!("source and target language must differ (both are `{source_language}`)");
        }

        Ok(StoreSettings {
            project_id,
            dataset,
            api_version,
            document_id,
            document_type,
            source_language,
            target_language,
            user_agent,
            timeout_ms,
            token: non_empty(lookup_env("SANITY_TOKEN")),
            sources,
        })
    }
}

/// Load and parse a StackConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<StackConfig> {
    if !config_path.exists() {
        return Ok(StackConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: StackConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Pick the config file: flag > env STACKICONS_CONFIG > `<cwd>/stackicons.toml`.
pub fn resolve_config_path(flag: Option<&Path>, cwd: &Path) -> (PathBuf, ValueSource) {
    resolve_config_path_with_lookup(flag, cwd, |key| env::var(key).ok())
}

fn resolve_config_path_with_lookup<F>(
    flag: Option<&Path>,
    cwd: &Path,
    lookup_env: F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = flag {
        return (absolutize(path, cwd), ValueSource::Flag);
    }
    if let Some(value) = non_empty(lookup_env("STACKICONS_CONFIG")) {
        return (absolutize(Path::new(&value), cwd), ValueSource::Env);
    }
    (cwd.join(DEFAULT_CONFIG_FILENAME), ValueSource::Default)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
