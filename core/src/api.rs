use crate::{Context, Result};
use std::fmt::Debug;

/// SigningCredential is the trait used by signers as the signing key.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is valid.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential is the trait used to load credentials from the environment.
///
/// Returns `Ok(None)` when the source has nothing to offer, so that a
/// [`ProvideCredentialChain`](crate::ProvideCredentialChain) can move on to
/// the next provider.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load signing credential from current env.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// SignRequest is the trait used to sign a request in place.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request parts, using `body` as the payload.
    ///
    /// Signing without a credential leaves the request untouched.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()>;
}

/// Authentication decorates an outgoing request right before it is sent.
///
/// The appender calls [`Authentication::add_auth`] once per request with the
/// exact body it is about to send. Implementations must not cache their output
/// across requests.
#[async_trait::async_trait]
pub trait Authentication: Debug + Send + Sync + 'static {
    /// Add authentication headers to `req`.
    async fn add_auth(&self, req: &mut http::request::Parts, body: &str) -> Result<()>;
}
