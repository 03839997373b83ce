use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use async_trait::async_trait;
use eslog_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use eslog_core::time::{format_date, format_iso8601, now, DateTime};
use eslog_core::{Context, Error, Result, SignRequest, SigningContext};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::utf8_percent_encode;
use std::fmt::Write;

/// Headers produced by signing one request.
///
/// A header set is bound to the time and content of the request it was
/// computed for and must be applied to that request only.
#[derive(Debug, Clone)]
pub struct HeaderSet {
    /// Value of `x-amz-date`.
    pub date: HeaderValue,
    /// Value of `authorization`.
    pub authorization: HeaderValue,
    /// Value of `x-amz-security-token`, present only for temporary credentials.
    pub security_token: Option<HeaderValue>,
    /// Value of `host` that took part in the signature.
    pub host: HeaderValue,
}

impl HeaderSet {
    /// Install the headers on `req`.
    ///
    /// `host` is only copied when `include_host` is set; the HTTP client
    /// derives the same value from the URI otherwise. Absent headers are
    /// left untouched.
    pub fn apply(self, req: &mut Parts, include_host: bool) {
        req.headers.insert(X_AMZ_DATE, self.date);
        req.headers.insert(header::AUTHORIZATION, self.authorization);
        if let Some(token) = self.security_token {
            req.headers.insert(X_AMZ_SECURITY_TOKEN, token);
        }
        if include_host {
            req.headers.insert(header::HOST, self.host);
        }
    }
}

/// RequestSigner that implement AWS SigV4.
///
/// Only `host`, `x-amz-date` and `x-amz-security-token` are signed, and the
/// payload hash is the SHA-256 of the body.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,
    host_header: bool,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new builder for AWS V4 signer.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
            host_header: false,

            time: None,
        }
    }

    /// Also copy the signed `host` header onto the request.
    pub fn with_host_header(mut self, enabled: bool) -> Self {
        self.host_header = enabled;
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// The region requests are signed for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Compute the SigV4 headers for `ctx`.
    pub fn build_headers(&self, ctx: &SigningContext, cred: &Credential) -> Result<HeaderSet> {
        let now = self.time.unwrap_or_else(now);
        let date = format_iso8601(now);
        let host = ctx.host_header();

        let mut headers = vec![("host", host.clone()), (X_AMZ_DATE, date.clone())];
        if let Some(token) = &cred.session_token {
            headers.push((X_AMZ_SECURITY_TOKEN, token.trim().to_string()));
        }
        let signed_headers = headers
            .iter()
            .map(|(k, _)| *k)
            .collect::<Vec<_>>()
            .join(";");

        let creq = canonical_request_string(ctx, &headers, &signed_headers)?;
        debug!("calculated canonical request: {creq}");

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{date}\n{scope}\n{}",
            hex_sha256(creq.as_bytes())
        );
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            cred.access_key_id,
        ))?;
        authorization.set_sensitive(true);

        let security_token = match &cred.session_token {
            Some(token) => {
                let mut value = HeaderValue::from_str(token.trim()).map_err(|e| {
                    Error::credential_invalid("session token is not a valid header value")
                        .with_source(e)
                })?;
                // Set token value sensitive to avoid leaking.
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        Ok(HeaderSet {
            date: HeaderValue::from_str(&date)?,
            authorization,
            security_token,
            host: HeaderValue::from_str(&host)?,
        })
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        body: &[u8],
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let signing_ctx = SigningContext::build(req, body)?;

        let Some(cred) = credential else {
            return Ok(());
        };

        self.build_headers(&signing_ctx, cred)?
            .apply(req, self.host_header);
        Ok(())
    }
}

fn canonical_request_string(
    ctx: &SigningContext,
    headers: &[(&str, String)],
    signed_headers: &str,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);
    let write_err = |e: std::fmt::Error| {
        Error::unexpected("failed to write canonical request").with_source(e)
    };

    // Insert method
    writeln!(f, "{}", ctx.method).map_err(write_err)?;
    // The path in the URI is already encoded once, services other than S3
    // expect it to be encoded twice.
    writeln!(f, "{}", utf8_percent_encode(&ctx.path, &AWS_URI_ENCODE_SET))
        .map_err(write_err)?;
    // Insert query
    let mut query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect::<Vec<_>>();
    query.sort();
    writeln!(
        f,
        "{}",
        query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )
    .map_err(write_err)?;
    // Insert signed headers, already in lexical order.
    for (name, value) in headers {
        writeln!(f, "{name}:{value}").map_err(write_err)?;
    }
    writeln!(f).map_err(write_err)?;
    writeln!(f, "{signed_headers}").map_err(write_err)?;
    write!(f, "{}", hex_sha256(&ctx.body)).map_err(write_err)?;

    Ok(f)
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
