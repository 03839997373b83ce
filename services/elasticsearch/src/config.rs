use chrono_tz::Tz;
use eslog_core::{Context, Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Default interval between two flushes, in milliseconds.
pub const DEFAULT_SLEEP_TIME_MS: u64 = 1000;
/// Default upper bound of queued documents, in bytes.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100 * 1024 * 1024;
/// Default number of resend attempts for a batch that failed with a
/// retryable error.
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// The only accepted value of the `type` discriminator.
pub const APPENDER_TYPE: &str = "elasticsearch";

/// Config for the elasticsearch appender.
///
/// Keys are camelCase, so the same document works as JSON or TOML:
///
/// ```json
/// {
///   "type": "elasticsearch",
///   "url": "https://search-logs.us-east-1.es.amazonaws.com/_bulk",
///   "index": "logs",
///   "estype": "event",
///   "properties": { "user.id": "%X{userId}" },
///   "authenticationClass": "aws"
/// }
/// ```
///
/// Unknown keys are rejected, so a misspelled `authenticationClass` can't
/// silently ship unsigned requests.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppenderConfig {
    /// Appender discriminator, `elasticsearch` when given.
    ///
    /// Older configs used `type` for the document type; any other value is
    /// still read that way when `estype` is absent.
    #[serde(default, rename = "type")]
    pub appender_type: Option<String>,
    /// Full `_bulk` endpoint, e.g. `http://localhost:9200/_bulk`.
    pub url: String,
    /// Index every document is written to.
    pub index: String,
    /// Document type, only sent when set.
    #[serde(default, rename = "estype")]
    pub doc_type: Option<String>,
    /// Logger target that receives a line for every shipped batch.
    ///
    /// Records to this target go through the global `log` logger. When the
    /// appender itself is that logger, they are not shipped and only
    /// `logsToStderr` shows them.
    #[serde(default)]
    pub logger_name: Option<String>,
    /// Logger target that receives delivery failures at error level.
    ///
    /// Same caveat as `loggerName`: pair it with another logger or with
    /// `errorsToStderr`.
    #[serde(default)]
    pub error_logger_name: Option<String>,
    /// Write delivery failures to stderr.
    #[serde(default)]
    pub errors_to_stderr: bool,
    /// Echo every shipped document to stderr.
    #[serde(default)]
    pub logs_to_stderr: bool,
    /// Capture file and line of every record.
    #[serde(default)]
    pub include_caller_data: bool,
    /// Extra document fields: name to layout pattern.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Name of the authentication adapter, looked up in the
    /// [`AuthenticationRegistry`](crate::AuthenticationRegistry).
    #[serde(default)]
    pub authentication_class: Option<String>,
    /// Lowest level that is shipped: `all`, `trace`, `debug`, `info`,
    /// `warn`, `error` or `off`.
    #[serde(default = "default_threshold")]
    pub threshold: String,
    /// Flush interval in milliseconds.
    #[serde(default = "default_sleep_time")]
    pub sleep_time: u64,
    /// Upper bound of queued documents in bytes; events above it are dropped.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// Resend attempts for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Also send the signed `host` header.
    #[serde(default)]
    pub include_host_header: bool,
    /// Time zone of rendered dates, e.g. `UTC` or `Europe/Berlin`.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_threshold() -> String {
    "all".to_string()
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_sleep_time() -> u64 {
    DEFAULT_SLEEP_TIME_MS
}

fn default_max_queue_size() -> usize {
    DEFAULT_MAX_QUEUE_SIZE
}

fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

impl AppenderConfig {
    /// Create a config with defaults for everything but the endpoint and
    /// the index.
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            appender_type: None,
            url: url.into(),
            index: index.into(),
            doc_type: None,
            logger_name: None,
            error_logger_name: None,
            errors_to_stderr: false,
            logs_to_stderr: false,
            include_caller_data: false,
            properties: BTreeMap::new(),
            authentication_class: None,
            threshold: default_threshold(),
            sleep_time: DEFAULT_SLEEP_TIME_MS,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            include_host_header: false,
            time_zone: default_time_zone(),
        }
    }

    /// Parse config from a JSON document.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            Error::config_invalid("failed to parse appender config as json").with_source(e)
        })
    }

    /// Parse config from a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            Error::config_invalid("failed to parse appender config as toml").with_source(e)
        })
    }

    /// Load config from a file. Files ending with `.toml` are parsed as TOML,
    /// anything else as JSON.
    pub async fn load(ctx: &Context, path: &str) -> Result<Self> {
        let path = ctx.expand_home_dir(path).ok_or_else(|| {
            Error::config_invalid("home dir is required to expand config path")
                .with_context(format!("path: {path}"))
        })?;
        let content = ctx.file_read_as_string(&path).await.map_err(|e| {
            Error::config_invalid("failed to read appender config")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })?;

        if path.ends_with(".toml") {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Check the fields that can't be expressed in types.
    ///
    /// Called once by the factory before anything is built.
    pub fn validate(&self) -> Result<()> {
        if let Some(v) = &self.appender_type {
            if self.doc_type.is_some() && !v.eq_ignore_ascii_case(APPENDER_TYPE) {
                return Err(Error::config_invalid("type must be elasticsearch")
                    .with_context(format!("type: {v}")));
            }
        }
        parse_url(&self.url)?;
        self.level_filter()?;
        self.time_zone()?;
        if self.index.trim().is_empty() {
            return Err(Error::config_invalid("index must not be empty"));
        }
        if self.sleep_time == 0 {
            return Err(Error::config_invalid("sleepTime must be greater than zero"));
        }
        Ok(())
    }

    /// The threshold as a `log::LevelFilter`. `all` means `trace`.
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        if self.threshold.eq_ignore_ascii_case("all") {
            return Ok(log::LevelFilter::Trace);
        }
        log::LevelFilter::from_str(&self.threshold).map_err(|e| {
            Error::config_invalid("threshold is not a valid level")
                .with_source(anyhow::anyhow!(e))
                .with_context(format!("threshold: {}", self.threshold))
        })
    }

    /// The document type sent in every action line.
    ///
    /// `estype` wins. A `type` other than `elasticsearch` is taken as the
    /// document type when `estype` is absent.
    pub fn document_type(&self) -> Option<&str> {
        self.doc_type.as_deref().or_else(|| {
            self.appender_type
                .as_deref()
                .filter(|v| !v.eq_ignore_ascii_case(APPENDER_TYPE))
        })
    }

    /// The time zone of rendered dates.
    pub fn time_zone(&self) -> Result<Tz> {
        self.time_zone.parse::<Tz>().map_err(|e| {
            Error::config_invalid("timeZone is not a known time zone")
                .with_source(anyhow::anyhow!("{e}"))
                .with_context(format!("timeZone: {}", self.time_zone))
        })
    }

    /// The flush interval.
    pub fn sleep_time(&self) -> Duration {
        Duration::from_millis(self.sleep_time)
    }
}

/// Parse and check an endpoint url: it must be absolute, use http or https
/// and carry a host.
pub(crate) fn parse_url(input: &str) -> Result<http::Uri> {
    let url = url::Url::parse(input).map_err(|e| {
        Error::config_invalid("url is malformed")
            .with_source(e)
            .with_context(format!("url: {input}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::config_invalid("url must use http or https")
            .with_context(format!("url: {input}")));
    }
    if url.host_str().unwrap_or_default().is_empty() {
        return Err(Error::config_invalid("url must have a host").with_context(format!("url: {input}")));
    }

    url.as_str().parse::<http::Uri>().map_err(|e| {
        Error::config_invalid("url is not a valid request uri")
            .with_source(e)
            .with_context(format!("url: {input}"))
    })
}
