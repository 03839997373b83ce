use crate::Credential;
use async_trait::async_trait;
use eslog_core::{Context, ProvideCredential, Result};

/// StaticCredentialProvider returns the same keys on every call.
///
/// Handy when the keys come from the appender's own configuration instead of
/// the environment. Empty keys provide nothing, so the provider can sit in a
/// chain without shadowing the providers after it.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Use a long-term access key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            credential: Credential {
                access_key_id: access_key_id.into(),
                secret_access_key: secret_access_key.into(),
                session_token: None,
                expires_in: None,
            },
        }
    }

    /// Attach the session token of a temporary key pair.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.credential.session_token = Some(token.into()).filter(|v: &String| !v.is_empty());
        self
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        let cred = &self.credential;
        if cred.access_key_id.is_empty() || cred.secret_access_key.is_empty() {
            return Ok(None);
        }
        Ok(Some(cred.clone()))
    }
}
