use crate::{Error, Result};
use bytes::Bytes;
use http::uri::Scheme;
use http::Method;

/// Signing context for a single outgoing request.
///
/// The endpoint (scheme, host and port) is kept apart from the resource path,
/// and the body is captured so that its digest can be signed. A context is
/// built per request and must never be reused.
#[derive(Debug)]
pub struct SigningContext {
    /// HTTP method of the outgoing request.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// Host without port or user info.
    pub host: String,
    /// Port, if present in the request URI.
    pub port: Option<u16>,
    /// Resource path, `/` if the URI has none.
    pub path: String,
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// Request payload.
    pub body: Bytes,
}

impl SigningContext {
    /// Build a signing context from `http::request::Parts` and the body.
    ///
    /// Request headers are not carried over: only the headers the signer adds
    /// take part in the signature.
    pub fn build(parts: &http::request::Parts, body: &[u8]) -> Result<Self> {
        let uri = &parts.uri;
        let scheme = uri.scheme().cloned().ok_or_else(|| {
            Error::request_invalid("request without scheme is invalid for signing")
                .with_context(format!("uri: {uri}"))
        })?;
        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
                    .with_context(format!("uri: {uri}"))
            })?
            .to_string();

        Ok(SigningContext {
            method: parts.method.clone(),
            scheme,
            host,
            port: uri.port_u16(),
            path: match uri.path() {
                "" => "/".to_string(),
                v => v.to_string(),
            },
            query: uri
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),
            body: Bytes::copy_from_slice(body),
        })
    }

    /// The endpoint of this request: scheme, host and port, without path,
    /// query or fragment.
    pub fn endpoint(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }

    /// The value of the `Host` header for this request.
    ///
    /// The port is kept only when it differs from the scheme default.
    pub fn host_header(&self) -> String {
        let default_port = if self.scheme == Scheme::HTTPS {
            443
        } else if self.scheme == Scheme::HTTP {
            80
        } else {
            0
        };

        match self.port {
            Some(port) if port != default_port => format!("{}:{}", self.host, port),
            _ => self.host.clone(),
        }
    }
}
