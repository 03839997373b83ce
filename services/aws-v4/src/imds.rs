use crate::constants::*;
use bytes::Bytes;
use eslog_core::time::{now, DateTime};
use eslog_core::{Context, Error, Result};
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use log::debug;
use std::sync::{Arc, Mutex};

/// Client for the EC2 instance metadata service (IMDSv2).
///
/// The session token is shared by every clone and refreshed ten minutes
/// before it expires.
#[derive(Debug, Clone)]
pub struct ImdsClient {
    endpoint: Option<String>,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for ImdsClient {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }
}

impl ImdsClient {
    /// Use the given endpoint instead of `AWS_EC2_METADATA_SERVICE_ENDPOINT`
    /// or the link-local default.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Whether IMDS lookups are turned off through `AWS_EC2_METADATA_DISABLED`.
    pub fn is_disabled(ctx: &Context) -> bool {
        ctx.env_var(AWS_EC2_METADATA_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    fn endpoint(&self, ctx: &Context) -> String {
        self.endpoint
            .clone()
            .or_else(|| ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT))
            .unwrap_or_else(|| DEFAULT_IMDS_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    async fn token(&self, ctx: &Context) -> Result<String> {
        {
            let (token, expires_in) = self
                .token
                .lock()
                .map_err(|_| Error::unexpected("imds token lock poisoned"))?
                .clone();
            if expires_in > now() {
                return Ok(token);
            }
        }

        let url = format!("{}/latest/api/token", self.endpoint(ctx));
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::PUT)
            .header(CONTENT_LENGTH, "0")
            // 21600s (6h) is recommended by AWS.
            .header(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS, "21600")
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build IMDS token request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to connect to IMDS")
                .with_source(e)
                .with_context(format!("url: {url}"))
                .with_context("hint: check if running on EC2 instance")
                .set_retryable(true)
        })?;
        if resp.status() != StatusCode::OK {
            return Err(imds_error("fetch_imds_token", resp.status(), resp.body()));
        }

        let token = resp.into_body();
        // Refresh 10 minutes before the 6h ttl ends.
        let expires_in = now() + chrono::TimeDelta::seconds(21600 - 600);
        *self
            .token
            .lock()
            .map_err(|_| Error::unexpected("imds token lock poisoned"))? =
            (token.clone(), expires_in);

        Ok(token)
    }

    /// GET `path` (e.g. `/latest/meta-data/placement/region`) and return the
    /// body as string.
    pub async fn get(&self, ctx: &Context, path: &str) -> Result<String> {
        let token = self.token(ctx).await?;

        let url = format!("{}{path}", self.endpoint(ctx));
        debug!("fetching instance metadata: {url}");
        let req = http::Request::builder()
            .uri(&url)
            .method(Method::GET)
            .header(X_AWS_EC2_METADATA_TOKEN, &token)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build IMDS request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::unexpected("failed to send IMDS request")
                .with_source(e)
                .with_context(format!("url: {url}"))
                .set_retryable(true)
        })?;
        if resp.status() != StatusCode::OK {
            return Err(imds_error(path, resp.status(), resp.body()));
        }

        Ok(resp.into_body())
    }
}

fn imds_error(operation: &str, status: StatusCode, body: &str) -> Error {
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::permission_denied(format!("IMDS denied {operation}"))
        }
        StatusCode::NOT_FOUND => Error::config_invalid(format!("IMDS has no data for {operation}")),
        s if s.is_server_error() => {
            Error::unexpected(format!("IMDS failed {operation}")).set_retryable(true)
        }
        _ => Error::unexpected(format!("IMDS failed {operation}")),
    };

    err.with_context(format!("status: {status}"))
        .with_context(format!("body: {body}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use eslog_core::{HttpSend, StaticEnv};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake metadata service answering from a path → body table.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeImds {
        routes: HashMap<String, String>,
        token_requests: Arc<AtomicUsize>,
    }

    impl FakeImds {
        pub(crate) fn with_route(mut self, path: &str, body: &str) -> Self {
            self.routes.insert(path.to_string(), body.to_string());
            self
        }

        pub(crate) fn token_requests(&self) -> usize {
            self.token_requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpSend for FakeImds {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            let path = req.uri().path().to_string();
            if path == "/latest/api/token" {
                assert_eq!(req.method(), Method::PUT);
                self.token_requests.fetch_add(1, Ordering::SeqCst);
                return Ok(http::Response::new(Bytes::from_static(b"fake-token")));
            }

            assert_eq!(
                req.headers()
                    .get(X_AWS_EC2_METADATA_TOKEN)
                    .map(|v| v.as_bytes()),
                Some(b"fake-token".as_slice())
            );
            let resp = match self.routes.get(&path) {
                Some(body) => http::Response::new(Bytes::from(body.clone())),
                None => http::Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Bytes::new())?,
            };
            Ok(resp)
        }
    }

    #[tokio::test]
    async fn test_token_is_cached() -> anyhow::Result<()> {
        let fake =
            FakeImds::default().with_route("/latest/meta-data/placement/region", "eu-west-1");
        let ctx = Context::new()
            .with_http_send(fake.clone())
            .with_env(StaticEnv::default());

        let client = ImdsClient::default();
        for _ in 0..3 {
            let region = client.get(&ctx, "/latest/meta-data/placement/region").await?;
            assert_eq!(region, "eu-west-1");
        }
        assert_eq!(fake.token_requests(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_path() {
        let ctx = Context::new().with_http_send(FakeImds::default());

        let err = ImdsClient::default()
            .get(&ctx, "/latest/meta-data/placement/region")
            .await
            .expect_err("unknown path must fail");
        assert_eq!(err.kind(), eslog_core::ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_is_disabled() {
        let ctx = Context::new().with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(AWS_EC2_METADATA_DISABLED.to_string(), "TRUE".to_string())]),
        });
        assert!(ImdsClient::is_disabled(&ctx));
        assert!(!ImdsClient::is_disabled(&Context::new()));
    }
}
