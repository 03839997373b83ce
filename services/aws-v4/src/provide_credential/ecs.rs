use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use eslog_core::time::parse_rfc3339;
use eslog_core::{Context, Error, ProvideCredential, Result};
use http::header::AUTHORIZATION;
use http::Method;
use serde::Deserialize;

/// EcsCredentialProvider will load credential from ECS task metadata endpoint.
///
/// ECS credential provider provides credentials for ECS tasks using
/// the AWS_CONTAINER_CREDENTIALS_RELATIVE_URI or AWS_CONTAINER_CREDENTIALS_FULL_URI
/// environment variables. `AWS_CONTAINER_AUTHORIZATION_TOKEN`, when set, is
/// sent as the `Authorization` header.
///
/// References:
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Default, Clone)]
pub struct EcsCredentialProvider;

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let url = match (
            ctx.env_var(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI),
            ctx.env_var(AWS_CONTAINER_CREDENTIALS_FULL_URI),
        ) {
            (Some(relative), _) => format!("{DEFAULT_ECS_ENDPOINT}{relative}"),
            (None, Some(full)) => full,
            // Not in an ECS environment
            (None, None) => return Ok(None),
        };

        let mut req = http::Request::builder().uri(&url).method(Method::GET);
        if let Some(token) = ctx.env_var(AWS_CONTAINER_AUTHORIZATION_TOKEN) {
            req = req.header(AUTHORIZATION, token);
        }
        let req = req.body(Bytes::new()).map_err(|e| {
            Error::request_invalid("failed to build ECS metadata request")
                .with_source(e)
                .with_context(format!("url: {url}"))
        })?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != http::StatusCode::OK {
            return Err(Error::unexpected("request to ECS task metadata endpoint failed")
                .with_context(format!("status: {}", resp.status()))
                .with_context(format!("body: {}", resp.body()))
                .set_retryable(resp.status().is_server_error()));
        }

        let content = resp.into_body();
        let cred: EcsTaskCredentials = serde_json::from_str(&content).map_err(|e| {
            Error::unexpected("failed to parse ECS task credentials").with_source(e)
        })?;

        Ok(Some(Credential {
            access_key_id: cred.access_key_id,
            secret_access_key: cred.secret_access_key,
            session_token: Some(cred.token),
            expires_in: Some(parse_rfc3339(&cred.expiration)?),
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsTaskCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}
