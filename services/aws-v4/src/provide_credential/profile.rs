use crate::constants::*;
use crate::profile::{config_section, load_section};
use crate::Credential;
use async_trait::async_trait;
use eslog_core::{Context, ProvideCredential, Result};
use std::collections::HashMap;

/// ProfileCredentialProvider loads AWS credentials from configuration files.
///
/// This provider loads credentials from:
/// - `~/.aws/credentials` (or the path specified by `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path specified by `AWS_CONFIG_FILE`)
///
/// The profile to use is determined by:
/// 1. The `AWS_PROFILE` environment variable
/// 2. The profile specified via `with_profile()`
/// 3. Default to "default"
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }
}

fn credential_from(props: &HashMap<String, String>) -> Option<Credential> {
    let ak = props.get("aws_access_key_id").filter(|v| !v.is_empty())?;
    let sk = props
        .get("aws_secret_access_key")
        .filter(|v| !v.is_empty())?;

    Some(Credential {
        access_key_id: ak.clone(),
        secret_access_key: sk.clone(),
        session_token: props.get("aws_session_token").cloned(),
        expires_in: None,
    })
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = ctx
            .env_var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        // The credentials file takes precedence over the config file.
        let path = self
            .credentials_file
            .clone()
            .or_else(|| ctx.env_var(AWS_SHARED_CREDENTIALS_FILE))
            .unwrap_or_else(|| DEFAULT_SHARED_CREDENTIALS_FILE.to_string());
        if let Some(props) = load_section(ctx, &path, &profile).await? {
            if let Some(cred) = credential_from(&props) {
                return Ok(Some(cred));
            }
        }

        let path = self
            .config_file
            .clone()
            .or_else(|| ctx.env_var(AWS_CONFIG_FILE))
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        Ok(load_section(ctx, &path, &config_section(&profile))
            .await?
            .as_ref()
            .and_then(credential_from))
    }
}
