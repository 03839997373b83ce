//! End-to-end tests of the appender.
//!
//! The offline tests record requests with an in-memory `HttpSend`. The live
//! test is skipped unless `ESLOG_ELASTICSEARCH_TEST=on`; it reads
//! `ESLOG_ELASTICSEARCH_URL` (a `_bulk` endpoint) and, when
//! `ESLOG_ELASTICSEARCH_AUTH` is set, uses it as the authentication class.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use eslog_core::{Context, HttpSend, OsEnv, StaticEnv};
use eslog_elasticsearch::{AppenderConfig, AppenderFactory, LayoutKind};
use eslog_file_read_tokio::TokioFileRead;
use eslog_http_send_reqwest::ReqwestHttpSend;
use http::StatusCode;
use log::{warn, Log};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::env;
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<(http::request::Parts, String)>>>,
}

#[async_trait]
impl HttpSend for Recorder {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
    ) -> eslog_core::Result<http::Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let body = String::from_utf8_lossy(&body).to_string();
        self.requests.lock().unwrap().push((parts, body));

        Ok(http::Response::builder()
            .status(StatusCode::OK)
            .body(Bytes::from_static(br#"{"took":1,"errors":false,"items":[]}"#))
            .expect("response must be valid"))
    }
}

fn record<'a>(target: &'a str, args: std::fmt::Arguments<'a>) -> log::Record<'a> {
    log::Record::builder()
        .level(log::Level::Info)
        .target(target)
        .args(args)
        .build()
}

#[tokio::test]
async fn test_config_file_to_signed_bulk_request() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r#"{{
            "type": "elasticsearch",
            "url": "https://search-logs.us-east-1.es.amazonaws.com/_bulk",
            "index": "logs",
            "estype": "event",
            "properties": {{"user.id": "%X{{userId}}"}},
            "authenticationClass": "aws",
            "threshold": "INFO"
        }}"#
    )?;
    let path = file.path().to_string_lossy().to_string();

    let http = Recorder::default();
    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(http.clone())
        .with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from_iter([
                ("AWS_REGION".to_string(), "us-east-1".to_string()),
                ("AWS_ACCESS_KEY_ID".to_string(), "AKIDEXAMPLE".to_string()),
                ("AWS_SECRET_ACCESS_KEY".to_string(), "secret".to_string()),
                ("AWS_SESSION_TOKEN".to_string(), "token".to_string()),
            ]),
        });

    let cfg = AppenderConfig::load(&ctx, &path).await?;
    let appender = AppenderFactory::new(cfg).build(&ctx)?;

    let kvs = [("userId", "42")];
    appender.log(
        &log::Record::builder()
            .level(log::Level::Warn)
            .target("app")
            .args(format_args!("payment declined"))
            .key_values(&kvs)
            .build(),
    );
    appender.log(&record("app", format_args!("hello")));
    appender.log(
        &log::Record::builder()
            .level(log::Level::Debug)
            .target("app")
            .args(format_args!("below threshold"))
            .build(),
    );
    appender.stop().await?;

    let requests = http.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (parts, body) = &requests[0];

    assert_eq!(parts.method, http::Method::POST);
    assert_eq!(parts.headers["content-type"], "application/x-ndjson");
    let authorization = parts.headers["authorization"].to_str()?;
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(authorization.contains("/us-east-1/es/aws4_request"));
    assert!(authorization.contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
    assert_eq!(parts.headers["x-amz-security-token"], "token");
    assert!(parts.headers.contains_key("x-amz-date"));
    assert!(!parts.headers.contains_key("host"));

    let lines = body.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], r#"{"index":{"_index":"logs","_type":"event"}}"#);
    let doc: serde_json::Value = serde_json::from_str(lines[1])?;
    assert_eq!(doc["message"], "payment declined");
    assert_eq!(doc["level"], "WARN");
    assert_eq!(doc["user.id"], "42");
    let doc: serde_json::Value = serde_json::from_str(lines[3])?;
    assert_eq!(doc["message"], "hello");
    assert_eq!(doc["user.id"], "");

    Ok(())
}

#[tokio::test]
async fn test_access_appender() -> Result<()> {
    let http = Recorder::default();
    let ctx = Context::new().with_http_send(http.clone());

    let cfg = AppenderConfig::new("http://localhost:9200/_bulk", "access");
    let appender = AppenderFactory::new(cfg)
        .with_layout(LayoutKind::Access)
        .build(&ctx)?;

    let (parts, _) = http::Request::get("/health")
        .header("referer", "https://example.com/")
        .body(())?
        .into_parts();
    appender.append_access(
        eslog_elasticsearch::AccessEvent::from_request(&parts, "127.0.0.1")
            .with_status(StatusCode::NO_CONTENT),
    );
    appender.flush_and_wait().await?;

    let requests = http.requests.lock().unwrap();
    let (parts, body) = &requests[0];
    assert!(!parts.headers.contains_key("authorization"));

    let doc: serde_json::Value = serde_json::from_str(body.lines().nth(1).unwrap_or_default())?;
    assert_eq!(doc["@fields.status_code"], "204");
    assert_eq!(doc["@fields.protocol"], "HTTP/1.1");
    // Unknown length is rendered as `-`, which is not empty.
    assert_eq!(doc["@fields.content_length"], "-");
    assert!(doc["@message"]
        .as_str()
        .unwrap_or_default()
        .starts_with(r#"127.0.0.1 - - ["#));
    assert!(doc["@message"]
        .as_str()
        .unwrap_or_default()
        .contains(r#""https://example.com/" "-""#));
    Ok(())
}

#[tokio::test]
async fn test_live_bulk() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("ESLOG_ELASTICSEARCH_TEST").ok().as_deref() != Some("on") {
        warn!("ESLOG_ELASTICSEARCH_TEST is not set, skipped");
        return Ok(());
    }
    let url = env::var("ESLOG_ELASTICSEARCH_URL").expect("ESLOG_ELASTICSEARCH_URL must be set");

    let mut cfg = AppenderConfig::new(url, "eslog-test");
    cfg.authentication_class = env::var("ESLOG_ELASTICSEARCH_AUTH").ok();
    cfg.errors_to_stderr = true;

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let appender = AppenderFactory::new(cfg).build(&ctx)?;

    appender.log(&record("eslog-live-test", format_args!("hello from the live test")));
    appender.stop().await?;
    Ok(())
}
