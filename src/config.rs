//! Plugin configuration: key maps from the orchestrator and the
//! `ortho-config` loader used by the CLI.

use std::collections::BTreeMap;
use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::fleet::ScalingGroupRef;

/// Access key identifier (required at plugin level).
pub const ACCESS_KEY_ID: &str = "accessKeyId";
/// Access key secret (required at plugin level).
pub const ACCESS_KEY_SECRET: &str = "accessKeySecret";
/// Optional override of the ESS API host.
pub const ENDPOINT: &str = "endpoint";
/// Region of the scaling group (required per call or at plugin level).
pub const REGION: &str = "region";
/// Scaling group identifier (required per call or at plugin level).
pub const SCALING_GROUP_ID: &str = "scalingGroupId";

/// Default ESS API host used when no endpoint override is configured.
pub const DEFAULT_ENDPOINT: &str = "ess.aliyuncs.com";

/// String key/value configuration as handed over by the orchestrator.
pub type ConfigMap = BTreeMap<String, String>;

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

fn non_blank<'a>(map: &'a ConfigMap, key: &str) -> Option<&'a str> {
    map.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn require<'a>(map: &'a ConfigMap, key: &str) -> Result<&'a str, ConfigError> {
    non_blank(map, key).ok_or_else(|| {
        ConfigError::MissingField(format!("required config param {key} not found"))
    })
}

/// API credentials and endpoint for the ESS client.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    /// Access key identifier.
    pub access_key_id: String,
    /// Access key secret used to sign requests.
    pub access_key_secret: String,
    /// API host (without scheme).
    pub endpoint: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Credentials {
    /// Extracts credentials from a plugin key map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when `accessKeyId` or
    /// `accessKeySecret` is absent or blank.
    pub fn from_map(map: &ConfigMap) -> Result<Self, ConfigError> {
        let access_key_id = require(map, ACCESS_KEY_ID)?.to_owned();
        let access_key_secret = require(map, ACCESS_KEY_SECRET)?.to_owned();
        let endpoint = non_blank(map, ENDPOINT).unwrap_or(DEFAULT_ENDPOINT).to_owned();
        Ok(Self {
            access_key_id,
            access_key_secret,
            endpoint,
        })
    }
}

/// Validated plugin-level configuration.
#[derive(Clone, Eq, PartialEq)]
pub struct PluginConfig {
    defaults: ConfigMap,
    credentials: Credentials,
}

impl std::fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginConfig")
            .field("keys", &self.defaults.keys().collect::<Vec<_>>())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl PluginConfig {
    /// Validates a plugin key map and keeps it as the per-call fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when credentials are missing.
    pub fn from_map(defaults: ConfigMap) -> Result<Self, ConfigError> {
        let credentials = Credentials::from_map(&defaults)?;
        Ok(Self {
            defaults,
            credentials,
        })
    }

    /// Credentials parsed from the plugin map.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Plugin-level key map.
    #[must_use]
    pub const fn defaults(&self) -> &ConfigMap {
        &self.defaults
    }

    /// Looks `key` up in the per-call map first, then in the plugin map.
    #[must_use]
    pub fn value<'a>(&'a self, per_call: &'a ConfigMap, key: &str) -> Option<&'a str> {
        non_blank(per_call, key).or_else(|| non_blank(&self.defaults, key))
    }

    /// Resolves the scaling group targeted by a call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when neither map supplies
    /// `region` or `scalingGroupId`.
    pub fn group_ref(&self, per_call: &ConfigMap) -> Result<ScalingGroupRef, ConfigError> {
        let region = self.value(per_call, REGION).ok_or_else(|| {
            ConfigError::MissingField(format!("required config param {REGION} not found"))
        })?;
        let id = self.value(per_call, SCALING_GROUP_ID).ok_or_else(|| {
            ConfigError::MissingField(format!(
                "required config param {SCALING_GROUP_ID} not found"
            ))
        })?;
        Ok(ScalingGroupRef::new(region, id))
    }
}

/// CLI configuration derived from environment variables, configuration
/// files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "ESS")]
pub struct EssConfig {
    /// Access key identifier. This value is required.
    pub access_key_id: String,
    /// Access key secret. This value is required.
    pub access_key_secret: String,
    /// Optional ESS API host override.
    pub endpoint: Option<String>,
    /// Default region for scaling group lookups.
    pub region: Option<String>,
    /// Default scaling group identifier.
    pub scaling_group_id: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl EssConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to the configuration file",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("ess-target")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on the credential fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a credential is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.access_key_id,
            &FieldMetadata::new("ESS access key id", "ESS_ACCESS_KEY_ID", "access_key_id"),
        )?;
        Self::require_field(
            &self.access_key_secret,
            &FieldMetadata::new(
                "ESS access key secret",
                "ESS_ACCESS_KEY_SECRET",
                "access_key_secret",
            ),
        )?;
        Ok(())
    }

    /// Renders the loaded values as a plugin key map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when validation fails.
    pub fn to_config_map(&self) -> Result<ConfigMap, ConfigError> {
        self.validate()?;
        let mut map = ConfigMap::new();
        map.insert(ACCESS_KEY_ID.to_owned(), self.access_key_id.clone());
        map.insert(ACCESS_KEY_SECRET.to_owned(), self.access_key_secret.clone());
        let optional = [
            (ENDPOINT, &self.endpoint),
            (REGION, &self.region),
            (SCALING_GROUP_ID, &self.scaling_group_id),
        ];
        for (key, value) in optional {
            if let Some(set) = value {
                map.insert(key.to_owned(), set.clone());
            }
        }
        Ok(map)
    }
}
