use eslog_core::time::{now, DateTime};
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use log::kv::{Key, Value, VisitSource};
use std::collections::BTreeMap;
use std::time::Duration;

/// Something the appender can ship.
#[derive(Clone, Debug)]
pub enum Event {
    /// A record emitted through the `log` facade.
    Log(LogEvent),
    /// A request served by an HTTP server.
    Access(AccessEvent),
}

impl Event {
    /// When the event happened.
    pub fn timestamp(&self) -> DateTime {
        match self {
            Event::Log(e) => e.timestamp,
            Event::Access(e) => e.timestamp,
        }
    }
}

/// Where a record was emitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerData {
    /// Source file.
    pub file: Option<String>,
    /// Source line.
    pub line: Option<u32>,
    /// Module path.
    pub module_path: Option<String>,
}

/// An owned copy of a `log::Record`.
#[derive(Clone, Debug)]
pub struct LogEvent {
    /// Record level.
    pub level: log::Level,
    /// Record target, used as the logger name.
    pub target: String,
    /// Formatted message.
    pub message: String,
    /// Name of the emitting thread, `unnamed` when it has none.
    pub thread: String,
    /// Capture time.
    pub timestamp: DateTime,
    /// Structured key-values attached to the record.
    pub key_values: BTreeMap<String, String>,
    /// Present only when caller data is included.
    pub caller: Option<CallerData>,
}

impl LogEvent {
    /// Capture a record on the current thread.
    pub fn from_record(record: &log::Record<'_>, include_caller_data: bool) -> Self {
        let mut key_values = KeyValues::default();
        // Collecting into a map can't fail, so the visitor never errors.
        let _ = record.key_values().visit(&mut key_values);

        Self {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            thread: std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string(),
            timestamp: now(),
            key_values: key_values.0,
            caller: include_caller_data.then(|| CallerData {
                file: record.file().map(str::to_string),
                line: record.line(),
                module_path: record.module_path().map(str::to_string),
            }),
        }
    }
}

#[derive(Default)]
struct KeyValues(BTreeMap<String, String>);

impl<'kvs> VisitSource<'kvs> for KeyValues {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), log::kv::Error> {
        self.0.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A served HTTP request, as an access log sees it.
#[derive(Clone, Debug, Default)]
pub struct AccessEvent {
    /// Client address.
    pub remote_host: String,
    /// Authenticated user, if any.
    pub remote_user: Option<String>,
    /// Request method.
    pub method: Method,
    /// Request target, including the query.
    pub uri: Uri,
    /// Request protocol version.
    pub version: Version,
    /// Response status.
    pub status: StatusCode,
    /// Response body length, if known.
    pub content_length: Option<u64>,
    /// Time spent serving the request.
    pub elapsed: Duration,
    /// Request headers.
    pub headers: HeaderMap,
    /// Time the request was received.
    pub timestamp: DateTime,
}

impl AccessEvent {
    /// Capture the request side of an access event.
    ///
    /// Status, content length and elapsed time are filled by the caller once
    /// the response is known.
    pub fn from_request(parts: &http::request::Parts, remote_host: impl Into<String>) -> Self {
        Self {
            remote_host: remote_host.into(),
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            version: parts.version,
            headers: parts.headers.clone(),
            timestamp: now(),
            ..Default::default()
        }
    }

    /// Set the response status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set the response body length.
    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Set the time spent serving the request.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Set the authenticated user.
    pub fn with_remote_user(mut self, user: impl Into<String>) -> Self {
        self.remote_user = Some(user.into());
        self
    }
}
