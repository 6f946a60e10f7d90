//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Storage account configuration derived from environment variables and
/// configuration files.
///
/// The driver loads this once and passes it down explicitly; nothing below
/// `main` reads ambient process state.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "FILECYCLE")]
pub struct StorageConfig {
    /// Storage account the samples run against. Defaults to the well-known
    /// development account.
    #[ortho_config(default = "devstoreaccount1".to_owned())]
    pub account_name: String,
    /// DNS suffix of the file service endpoint.
    #[ortho_config(default = "core.windows.net".to_owned())]
    pub endpoint_suffix: String,
    /// Optional connection string. When present, its `Key=Value` pairs
    /// override the account name and endpoint fields.
    pub connection_string: Option<String>,
    /// Name prefix for every share the samples create. Concurrent harness
    /// runs must use distinct prefixes to avoid collisions.
    #[ortho_config(default = "sharesample".to_owned())]
    pub sample_prefix: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(
        description: &'static str,
        env_var: &'static str,
        toml_key: &'static str,
    ) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

/// Connection-string fields recognised by [`StorageConfig::endpoint`].
#[derive(Debug, Default, Eq, PartialEq)]
struct ConnectionOverrides {
    account_name: Option<String>,
    endpoint_suffix: Option<String>,
    file_endpoint: Option<String>,
}

impl StorageConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to filecycle.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("filecycle")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide missing values via environment variables or configuration
    /// files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty,
    /// [`ConfigError::Invalid`] when the sample prefix cannot form valid
    /// share names, and [`ConfigError::Parse`] when the connection string is
    /// malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.account_name,
            &FieldMetadata::new(
                "storage account name",
                "FILECYCLE_ACCOUNT_NAME",
                "account_name",
            ),
        )?;
        Self::require_field(
            &self.endpoint_suffix,
            &FieldMetadata::new(
                "endpoint suffix",
                "FILECYCLE_ENDPOINT_SUFFIX",
                "endpoint_suffix",
            ),
        )?;
        Self::require_field(
            &self.sample_prefix,
            &FieldMetadata::new(
                "sample share prefix",
                "FILECYCLE_SAMPLE_PREFIX",
                "sample_prefix",
            ),
        )?;
        self.validate_sample_prefix()?;
        if let Some(raw) = &self.connection_string {
            parse_connection_string(raw)?;
        }
        Ok(())
    }

    /// Renders the file service endpoint, applying connection-string
    /// overrides when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the connection string is
    /// malformed.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        let overrides = match &self.connection_string {
            Some(raw) => parse_connection_string(raw)?,
            None => ConnectionOverrides::default(),
        };
        if let Some(endpoint) = overrides.file_endpoint {
            return Ok(endpoint.trim_end_matches('/').to_owned());
        }
        let account = overrides.account_name.as_deref().unwrap_or(&self.account_name);
        let suffix = overrides
            .endpoint_suffix
            .as_deref()
            .unwrap_or(&self.endpoint_suffix);
        Ok(format!("https://{account}.file.{suffix}"))
    }

    /// A generated share name is the prefix plus a 32-character suffix, so
    /// the prefix itself must leave room and satisfy the share naming rules.
    fn validate_sample_prefix(&self) -> Result<(), ConfigError> {
        let prefix = &self.sample_prefix;
        if prefix.len() > 31 {
            return Err(ConfigError::Invalid(format!(
                "sample_prefix '{prefix}' is longer than 31 characters and \
                 cannot form a valid share name"
            )));
        }
        let starts_ok = prefix.chars().next().is_some_and(|c| c.is_ascii_lowercase());
        if !starts_ok
            || !prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ConfigError::Invalid(format!(
                "sample_prefix '{prefix}' must start with a lowercase letter \
                 and contain only lowercase letters and digits"
            )));
        }
        Ok(())
    }
}

fn parse_connection_string(raw: &str) -> Result<ConnectionOverrides, ConfigError> {
    let mut overrides = ConnectionOverrides::default();
    for segment in raw.split(';').filter(|segment| !segment.trim().is_empty()) {
        let (key, value) = segment.split_once('=').ok_or_else(|| {
            ConfigError::Parse(format!(
                "connection string segment '{}' is not a Key=Value pair",
                segment.trim()
            ))
        })?;
        match key.trim() {
            "AccountName" => overrides.account_name = Some(value.trim().to_owned()),
            "EndpointSuffix" => overrides.endpoint_suffix = Some(value.trim().to_owned()),
            "FileEndpoint" => overrides.file_endpoint = Some(value.trim().to_owned()),
            // AccountKey, DefaultEndpointsProtocol and other keys are only
            // meaningful to a real client.
            _ => {}
        }
    }
    Ok(overrides)
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field is present but unusable.
    #[error("invalid configuration field: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader or the
    /// connection-string parser.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::test_support::test_config;

    #[rstest]
    fn default_shaped_config_validates_and_renders_the_endpoint() {
        let config = test_config();
        config.validate().expect("config should validate");
        assert_eq!(
            config.endpoint().expect("endpoint should render"),
            "https://devstoreaccount1.file.core.windows.net"
        );
    }

    #[rstest]
    #[case("", "account name")]
    #[case("   ", "account name")]
    fn blank_account_names_are_rejected(#[case] account_name: &str, #[case] fragment: &str) {
        let config = StorageConfig {
            account_name: account_name.to_owned(),
            ..test_config()
        };
        let err = config.validate().expect_err("validation should fail");
        let ConfigError::MissingField(message) = err else {
            panic!("expected MissingField, got {err:?}");
        };
        assert!(message.contains(fragment), "message: {message}");
        assert!(message.contains("FILECYCLE_ACCOUNT_NAME"), "message: {message}");
    }

    #[rstest]
    #[case("Sharesample")]
    #[case("has-hyphen")]
    #[case("1leadingdigit")]
    #[case("waytoolongprefixwaytoolongprefixx")]
    fn unusable_sample_prefixes_are_rejected(#[case] prefix: &str) {
        let config = StorageConfig {
            sample_prefix: prefix.to_owned(),
            ..test_config()
        };
        let err = config.validate().expect_err("validation should fail");
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[rstest]
    fn connection_strings_override_account_and_suffix() {
        let config = StorageConfig {
            connection_string: Some(String::from(
                "DefaultEndpointsProtocol=https;AccountName=prodaccount;\
                 AccountKey=secret;EndpointSuffix=core.example.net",
            )),
            ..test_config()
        };
        assert_eq!(
            config.endpoint().expect("endpoint should render"),
            "https://prodaccount.file.core.example.net"
        );
    }

    #[rstest]
    fn file_endpoint_overrides_win_outright() {
        let config = StorageConfig {
            connection_string: Some(String::from(
                "AccountName=ignored;FileEndpoint=http://127.0.0.1:10004/devstoreaccount1/",
            )),
            ..test_config()
        };
        assert_eq!(
            config.endpoint().expect("endpoint should render"),
            "http://127.0.0.1:10004/devstoreaccount1"
        );
    }

    #[rstest]
    fn malformed_connection_strings_are_rejected() {
        let config = StorageConfig {
            connection_string: Some(String::from("AccountName=ok;garbage")),
            ..test_config()
        };
        let err = config.validate().expect_err("validation should fail");
        let ConfigError::Parse(message) = err else {
            panic!("expected Parse, got {err:?}");
        };
        assert!(message.contains("garbage"), "message: {message}");
    }
}
