use crate::imds::ImdsClient;
use crate::Credential;
use async_trait::async_trait;
use eslog_core::time::parse_rfc3339;
use eslog_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;

/// IMDSv2CredentialProvider loads the credential of the IAM role attached to
/// the current EC2 instance.
///
/// Skipped when `AWS_EC2_METADATA_DISABLED` is `true`.
#[derive(Debug, Clone, Default)]
pub struct IMDSv2CredentialProvider {
    client: ImdsClient,
}

impl IMDSv2CredentialProvider {
    /// Create a new `IMDSv2CredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an IMDS client, and its session token, with other providers.
    pub fn with_client(mut self, client: ImdsClient) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ProvideCredential for IMDSv2CredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if ImdsClient::is_disabled(ctx) {
            return Ok(None);
        }

        // List all credentials that node has.
        let profile_name = self
            .client
            .get(ctx, "/latest/meta-data/iam/security-credentials/")
            .await?;
        let Some(profile_name) = profile_name.lines().next().filter(|v| !v.is_empty()) else {
            return Err(
                Error::config_invalid("no IAM role attached to EC2 instance")
                    .with_context("hint: attach an IAM role to your EC2 instance"),
            );
        };

        let content = self
            .client
            .get(
                ctx,
                &format!("/latest/meta-data/iam/security-credentials/{profile_name}"),
            )
            .await?;
        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::unexpected("failed to parse IMDS credentials response")
                    .with_source(e)
                    .with_context(format!("profile: {profile_name}"))
            })?;

        match resp.code.as_str() {
            "Success" => {}
            "AssumeRoleUnauthorizedAccess" => {
                return Err(Error::permission_denied(format!(
                    "EC2 instance not authorized to assume role: {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
            code if code.contains("Expired") => {
                return Err(Error::credential_expired(format!(
                    "IMDS credentials expired: {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
            code => {
                return Err(Error::unexpected(format!(
                    "IMDS returned error: [{code}] {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
        }

        Ok(Some(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration)?),
        }))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}
