use bytes::Bytes;
use eslog_core::{Authentication, Context, Error, Result};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::sync::Arc;

const NDJSON: &str = "application/x-ndjson";

/// Where delivery results are reported.
#[derive(Clone, Debug, Default)]
pub(crate) struct Reporter {
    pub logs_to_stderr: bool,
    pub errors_to_stderr: bool,
    pub logger_name: Option<String>,
    pub error_logger_name: Option<String>,
}

impl Reporter {
    fn shipped(&self, docs: &[String]) {
        if self.logs_to_stderr {
            for doc in docs {
                eprintln!("{doc}");
            }
        }
        if let Some(target) = &self.logger_name {
            info!(target: target.as_str(), "shipped {} documents", docs.len());
        }
    }

    pub(crate) fn failed(&self, err: &Error) {
        if self.errors_to_stderr {
            eprintln!("elasticsearch appender: {err}");
        }
        if let Some(target) = &self.error_logger_name {
            error!(target: target.as_str(), "{err}");
        }
    }
}

/// Ships batches of rendered documents to a `_bulk` endpoint.
#[derive(Debug)]
pub(crate) struct BulkSender {
    pub ctx: Context,
    pub uri: http::Uri,
    pub index: String,
    pub doc_type: Option<String>,
    pub auth: Option<Arc<dyn Authentication>>,
    pub max_retries: usize,
    pub reporter: Reporter,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

impl BulkSender {
    /// Build the NDJSON body: one action line and one document line per
    /// document, each terminated by a newline.
    pub(crate) fn body(&self, docs: &[String]) -> String {
        let mut action = serde_json::Map::new();
        action.insert("_index".to_string(), self.index.clone().into());
        if let Some(doc_type) = &self.doc_type {
            action.insert("_type".to_string(), doc_type.clone().into());
        }
        let action = serde_json::json!({ "index": action }).to_string();

        let mut body = String::new();
        for doc in docs {
            body.push_str(&action);
            body.push('\n');
            body.push_str(doc);
            body.push('\n');
        }
        body
    }

    /// Ship one batch, resending on retryable failures.
    ///
    /// A batch that still fails is dropped and reported; the error is
    /// returned for the caller's bookkeeping only.
    pub(crate) async fn send(&self, docs: &[String]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let body = self.body(docs);

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(()) => {
                    debug!("bulk request with {} documents succeeded", docs.len());
                    self.reporter.shipped(docs);
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!("bulk request failed, retrying ({attempt}/{}): {err}", self.max_retries);
                }
                Err(err) => {
                    if err.is_credential_error() {
                        warn!("bulk request was not authorized: {err}");
                    }
                    let err = err.with_context(format!("dropped documents: {}", docs.len()));
                    self.reporter.failed(&err);
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(&self, body: &str) -> Result<()> {
        let (mut parts, payload) = http::Request::post(self.uri.clone())
            .header(CONTENT_TYPE, NDJSON)
            .body(Bytes::from(body.to_string()))?
            .into_parts();
        if let Some(auth) = &self.auth {
            auth.add_auth(&mut parts, body).await?;
        }

        let resp = self
            .ctx
            .http_send_as_string(http::Request::from_parts(parts, payload))
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(bulk_error(status, resp.body()));
        }

        let result: BulkResponse = serde_json::from_str(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse bulk response")
                .with_source(e)
                .with_context(format!("body: {}", resp.body()))
        })?;
        if result.errors {
            let reason = result
                .items
                .iter()
                .filter_map(|item| item.as_object()?.values().next()?.get("error"))
                .map(|e| e.to_string())
                .next()
                .unwrap_or_default();
            return Err(Error::unexpected("bulk request has failed items")
                .with_context(format!("first error: {reason}")));
        }
        Ok(())
    }
}

fn bulk_error(status: StatusCode, body: &str) -> Error {
    let message = format!("elasticsearch responded with {status}");
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::permission_denied(message),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Error::request_invalid(message),
        StatusCode::TOO_MANY_REQUESTS => Error::unexpected(message).set_retryable(true),
        v if v.is_server_error() => Error::unexpected(message).set_retryable(true),
        _ => Error::unexpected(message),
    };
    err.with_context(format!("body: {body}"))
}
