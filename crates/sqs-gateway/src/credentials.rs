//! AWS credential resolution.
//!
//! Credentials are looked up in this order:
//!
//! 1. Explicit values in [`GatewayConfig`]
//! 2. `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
//! 3. The shared credentials file (`AWS_SHARED_CREDENTIALS_FILE`, or
//!    `~/.aws/credentials`), section named by the configured profile

use crate::error::ConfigurationError;
use crate::provider::GatewayConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;

/// Static AWS credentials used to sign requests
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve credentials from configuration, process environment and the
/// shared credentials file
pub fn resolve_credentials(config: &GatewayConfig) -> Result<AwsCredentials, ConfigurationError> {
    let file = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")));

    resolve_from(config, |key| std::env::var(key).ok(), file.as_deref())
}

/// Resolution with injectable environment lookup and credentials file path
pub(crate) fn resolve_from<F>(
    config: &GatewayConfig,
    env: F,
    credentials_file: Option<&Path>,
) -> Result<AwsCredentials, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let (Some(access_key), Some(secret_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        debug!("Using AWS credentials from configuration");
        let mut credentials = AwsCredentials::new(access_key.clone(), secret_key.clone());
        credentials.session_token = config.session_token.clone();
        return Ok(credentials);
    }

    if let (Some(access_key), Some(secret_key)) =
        (env("AWS_ACCESS_KEY_ID"), env("AWS_SECRET_ACCESS_KEY"))
    {
        if !access_key.is_empty() && !secret_key.is_empty() {
            debug!("Using AWS credentials from environment");
            let mut credentials = AwsCredentials::new(access_key, secret_key);
            credentials.session_token = env("AWS_SESSION_TOKEN").filter(|t| !t.is_empty());
            return Ok(credentials);
        }
    }

    if let Some(path) = credentials_file {
        if let Some(credentials) = read_profile(path, &config.profile)? {
            debug!(profile = %config.profile, path = %path.display(), "Using AWS credentials from shared credentials file");
            return Ok(credentials);
        }
    }

    Err(ConfigurationError::MissingCredentials {
        profile: config.profile.clone(),
    })
}

/// Read one profile section from an INI-formatted credentials file
///
/// A missing file or a missing profile is not an error; a file that exists
/// but cannot be parsed is.
fn read_profile(path: &Path, profile: &str) -> Result<Option<AwsCredentials>, ConfigurationError> {
    if !path.exists() {
        return Ok(None);
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Ini))
        .build()
        .map_err(|e| ConfigurationError::CredentialsFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let access_key = settings
        .get_string(&format!("{}.aws_access_key_id", profile))
        .ok();
    let secret_key = settings
        .get_string(&format!("{}.aws_secret_access_key", profile))
        .ok();

    match (access_key, secret_key) {
        (Some(access_key), Some(secret_key)) => {
            let mut credentials = AwsCredentials::new(access_key, secret_key);
            credentials.session_token = settings
                .get_string(&format!("{}.aws_session_token", profile))
                .ok();
            Ok(Some(credentials))
        }
        _ => Ok(None),
    }
}
