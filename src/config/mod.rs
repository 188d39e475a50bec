//! Application configuration.
//!
//! Per-method overrides and cache sizing, loaded from YAML files and
//! environment variables. Overrides reach methods through
//! [`Settings::mixin`], so declarations stay free of deployment detail.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cache::{self, MemoryCache};
use crate::error::ConfigResult;
use crate::method::{ApplyOptions, MethodConfig};
use crate::mixin::Mixin;

pub const DEFAULT_CONFIG_FILE: &str = "validated-method.yaml";
pub const CONFIG_ENV_VAR: &str = "VALIDATED_METHOD_CONFIG";
pub const CONFIG_ENV_PREFIX: &str = "VALIDATED_METHOD";
pub const LOG_ENV_VAR: &str = "VALIDATED_METHOD_LOG";

/// Name of the mixin returned by [`Settings::mixin`].
pub const SETTINGS_MIXIN: &str = "settingsMixin";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    /// Overrides keyed by method name.
    pub methods: HashMap<String, MethodSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Upper bound on entries in the process-wide cache. Unbounded when unset.
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MethodSettings {
    pub cache_ttl_ms: Option<u64>,
    pub apply_options: Map<String, Value>,
}

impl MethodSettings {
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_ms.map(Duration::from_millis)
    }
}

impl Settings {
    /// Load settings from, in increasing precedence:
    /// `validated-method.yaml` in the working directory, `path`, the file
    /// named by `VALIDATED_METHOD_CONFIG`, then `VALIDATED_METHOD__*`
    /// environment variables.
    pub fn load(path: Option<&str>) -> ConfigResult<Self> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Parse settings from a YAML document, without files or environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn method(&self, name: &str) -> Option<&MethodSettings> {
        self.methods.get(name)
    }

    /// Cache sized by these settings.
    pub fn build_cache(&self) -> MemoryCache {
        match self.cache.max_entries {
            Some(max) => MemoryCache::with_max_entries(max),
            None => MemoryCache::new(),
        }
    }

    /// Install [`build_cache`](Self::build_cache) as the process-wide
    /// cache. Returns `false` if one was already in place.
    pub fn install_cache(&self) -> bool {
        cache::init_global(self.build_cache())
    }

    /// Mixin applying the per-method overrides.
    ///
    /// A configured TTL replaces the declared one; configured transport
    /// options win over declared ones key by key. Methods without
    /// overrides pass through untouched.
    pub fn mixin(&self) -> Mixin {
        let methods = self.methods.clone();
        Mixin::named(SETTINGS_MIXIN, move |mut config: MethodConfig| {
            let Some(overrides) = methods.get(&config.name) else {
                return Some(config);
            };

            if let Some(ttl) = overrides.cache_ttl() {
                config.cache_ttl = Some(ttl);
            }
            if !overrides.apply_options.is_empty() {
                let declared = config.apply_options.take().unwrap_or_default();
                let configured = ApplyOptions::from(overrides.apply_options.clone());
                config.apply_options = Some(configured.merged_over(declared));
            }
            Some(config)
        })
    }
}
