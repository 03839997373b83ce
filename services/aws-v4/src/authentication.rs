use crate::constants::ES_SERVICE_NAME;
use crate::imds::ImdsClient;
use crate::provide_region::{DefaultRegionProvider, ProvideRegion, StaticRegionProvider};
use crate::{Credential, DefaultCredentialProvider, RequestSigner};
use async_trait::async_trait;
use eslog_core::time::DateTime;
use eslog_core::{
    Authentication, Context, Error, ProvideCredential, Result, SigningContext, SigningCredential,
};
use log::debug;
use std::sync::{Mutex, RwLock};

/// AwsAuthentication signs every outgoing request to an AWS managed
/// Elasticsearch domain with SigV4 (service `es`).
///
/// Region and credential come from the default provider chains unless
/// overridden. The region is cached after the first successful lookup and
/// the credential while it stays valid. Headers are computed fresh for
/// every request.
///
/// ```no_run
/// use eslog_aws_v4::AwsAuthentication;
/// use eslog_core::{Authentication, Context, OsEnv};
/// use eslog_file_read_tokio::TokioFileRead;
/// use eslog_http_send_reqwest::ReqwestHttpSend;
///
/// # async fn example() -> eslog_core::Result<()> {
/// let ctx = Context::new()
///     .with_file_read(TokioFileRead)
///     .with_http_send(ReqwestHttpSend::default())
///     .with_env(OsEnv);
/// let auth = AwsAuthentication::new(ctx);
///
/// let (mut parts, body) = http::Request::post("https://search-logs.us-east-1.es.amazonaws.com/_bulk")
///     .body("{}\n".to_string())?
///     .into_parts();
/// auth.add_auth(&mut parts, &body).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AwsAuthentication {
    ctx: Context,
    credential_provider: Box<dyn ProvideCredential<Credential = Credential>>,
    region_provider: Box<dyn ProvideRegion>,
    host_header: bool,
    time: Option<DateTime>,

    credential: Mutex<Option<Credential>>,
    region: RwLock<Option<String>>,
}

impl AwsAuthentication {
    /// Create a new AwsAuthentication using the default region and
    /// credential chains.
    pub fn new(ctx: Context) -> Self {
        let imds = ImdsClient::default();

        Self {
            ctx,
            credential_provider: Box::new(DefaultCredentialProvider::with_imds_client(
                imds.clone(),
            )),
            region_provider: Box::new(DefaultRegionProvider::with_imds_client(imds)),
            host_header: false,
            time: None,

            credential: Mutex::new(None),
            region: RwLock::new(None),
        }
    }

    /// Sign for a fixed region instead of resolving it.
    pub fn with_region(self, region: impl Into<String>) -> Self {
        self.with_region_provider(StaticRegionProvider::new(region))
    }

    /// Replace the region provider.
    pub fn with_region_provider(mut self, provider: impl ProvideRegion) -> Self {
        self.region_provider = Box::new(provider);
        self
    }

    /// Replace the credential provider.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.credential_provider = Box::new(provider);
        self
    }

    /// Also copy the signed `host` header onto the request.
    pub fn with_host_header(mut self, enabled: bool) -> Self {
        self.host_header = enabled;
        self
    }

    /// Pin the signing time.
    ///
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Resolve the region, caching it after the first success.
    pub async fn region(&self) -> Result<String> {
        let cached = self
            .region
            .read()
            .map_err(|_| Error::unexpected("region lock poisoned"))?
            .clone();
        if let Some(region) = cached {
            return Ok(region);
        }

        let region = self
            .region_provider
            .provide_region(&self.ctx)
            .await?
            .ok_or_else(|| {
                Error::config_invalid("no region could be resolved")
                    .with_context("hint: set AWS_REGION or configure a profile region")
            })?;
        debug!("resolved region: {region}");

        *self
            .region
            .write()
            .map_err(|_| Error::unexpected("region lock poisoned"))? = Some(region.clone());
        Ok(region)
    }

    /// Resolve the credential, reusing the cached one while it is valid.
    pub async fn credential(&self) -> Result<Credential> {
        let cached = self
            .credential
            .lock()
            .map_err(|_| Error::unexpected("credential lock poisoned"))?
            .clone()
            .filter(|c| c.is_valid());
        if let Some(cred) = cached {
            return Ok(cred);
        }

        let cred = self
            .credential_provider
            .provide_credential(&self.ctx)
            .await?
            .ok_or_else(|| {
                Error::credential_invalid("no valid credential found").with_context(
                    "hint: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, or configure a profile",
                )
            })?;
        if !cred.is_valid() {
            return Err(Error::credential_expired(
                "loaded credential is already expired or incomplete",
            ));
        }

        *self
            .credential
            .lock()
            .map_err(|_| Error::unexpected("credential lock poisoned"))? = Some(cred.clone());
        Ok(cred)
    }
}

#[async_trait]
impl Authentication for AwsAuthentication {
    async fn add_auth(&self, req: &mut http::request::Parts, body: &str) -> Result<()> {
        // Reject requests we can't sign before touching any provider.
        let signing_ctx = SigningContext::build(req, body.as_bytes())?;

        let region = self.region().await?;
        let cred = self.credential().await?;

        let mut signer = RequestSigner::new(ES_SERVICE_NAME, &region);
        if let Some(time) = self.time {
            signer = signer.with_time(time);
        }
        signer
            .build_headers(&signing_ctx, &cred)?
            .apply(req, self.host_header);
        Ok(())
    }
}
