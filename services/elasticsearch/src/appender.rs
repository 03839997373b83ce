use crate::bulk::{BulkSender, Reporter};
use crate::config::{parse_url, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_SLEEP_TIME_MS};
use crate::event::{AccessEvent, Event, LogEvent};
use crate::filter::{decide, Filter, FilterReply};
use crate::layout::{LayoutKind, Pattern};
use crate::property::Property;
use chrono_tz::Tz;
use eslog_core::time::format_rfc3339;
use eslog_core::{Authentication, Context, Error, Result};
use log::{debug, warn, Log};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Name every appender built by the factory carries.
pub const APPENDER_NAME: &str = "elasticsearch-appender";

/// Targets of the crates that run inside the flush task. Their records are
/// never shipped, or shipping would feed itself.
const INTERNAL_TARGETS: &[&str] = &["eslog_", "reqwest", "hyper", "h2", "rustls", "tower"];

/// The two appender variants, selected once from the layout kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppenderKind {
    /// Ships records from the `log` facade.
    Standard,
    /// Ships HTTP access events.
    Access,
}

impl From<LayoutKind> for AppenderKind {
    fn from(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::Standard => AppenderKind::Standard,
            LayoutKind::Access => AppenderKind::Access,
        }
    }
}

impl AppenderKind {
    fn layout(self) -> LayoutKind {
        match self {
            AppenderKind::Standard => LayoutKind::Standard,
            AppenderKind::Access => LayoutKind::Access,
        }
    }

    fn accepts(self, event: &Event) -> bool {
        matches!(
            (self, event),
            (AppenderKind::Standard, Event::Log(_)) | (AppenderKind::Access, Event::Access(_))
        )
    }
}

#[derive(Debug)]
struct CompiledProperty {
    property: Property,
    pattern: Pattern,
}

#[derive(Debug, Default)]
struct Queue {
    docs: Vec<String>,
    bytes: usize,
    dropped: usize,
}

impl Queue {
    fn push(&mut self, doc: String, limit: usize) {
        if self.bytes + doc.len() > limit {
            self.dropped += 1;
            return;
        }
        self.bytes += doc.len();
        self.docs.push(doc);
    }

    fn take(&mut self) -> (Vec<String>, usize) {
        self.bytes = 0;
        (
            std::mem::take(&mut self.docs),
            std::mem::take(&mut self.dropped),
        )
    }
}

#[derive(Debug)]
enum Command {
    Flush(Option<oneshot::Sender<()>>),
    Stop(oneshot::Sender<()>),
}

/// An appender that ships events to Elasticsearch.
///
/// Events are rendered into JSON documents when they are appended and queued
/// in memory. A task on the tokio runtime ships the queue as one `_bulk`
/// request every `sleep_time`, calling the authentication adapter right
/// before each send.
///
/// Usually built by [`AppenderFactory`](crate::AppenderFactory); install it
/// with [`ElasticsearchAppender::install`] to receive records from `log`.
#[derive(Debug)]
pub struct ElasticsearchAppender {
    kind: AppenderKind,
    name: String,
    ctx: Context,
    url: Option<http::Uri>,
    index: String,
    doc_type: Option<String>,
    logger_name: Option<String>,
    error_logger_name: Option<String>,
    logs_to_stderr: bool,
    errors_to_stderr: bool,
    include_caller_data: bool,
    sleep_time: Duration,
    max_queue_size: usize,
    max_retries: usize,
    time_zone: Tz,
    properties: Vec<CompiledProperty>,
    authentication: Option<Arc<dyn Authentication>>,
    filters: Vec<Box<dyn Filter>>,

    started: AtomicBool,
    queue: Arc<Mutex<Queue>>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ElasticsearchAppender {
    /// Create an appender of `kind` that is not started yet.
    pub fn new(kind: AppenderKind) -> Self {
        Self {
            kind,
            name: APPENDER_NAME.to_string(),
            ctx: Context::new(),
            url: None,
            index: String::new(),
            doc_type: None,
            logger_name: None,
            error_logger_name: None,
            logs_to_stderr: false,
            errors_to_stderr: false,
            include_caller_data: false,
            sleep_time: Duration::from_millis(DEFAULT_SLEEP_TIME_MS),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            time_zone: Tz::UTC,
            properties: Vec::new(),
            authentication: None,
            filters: Vec::new(),

            started: AtomicBool::new(false),
            queue: Arc::new(Mutex::new(Queue::default())),
            commands: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Set the appender name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach the context used to send requests.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Set the `_bulk` endpoint. A malformed url is a config error.
    pub fn with_url(mut self, url: &str) -> Result<Self> {
        self.url = Some(parse_url(url)?);
        Ok(self)
    }

    /// Set the index.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Set the document type.
    pub fn with_doc_type(mut self, doc_type: Option<String>) -> Self {
        self.doc_type = doc_type;
        self
    }

    /// Log every shipped batch to this logger target.
    pub fn with_logger_name(mut self, name: Option<String>) -> Self {
        self.logger_name = name;
        self
    }

    /// Log delivery failures to this logger target.
    pub fn with_error_logger_name(mut self, name: Option<String>) -> Self {
        self.error_logger_name = name;
        self
    }

    /// Echo shipped documents to stderr.
    pub fn with_logs_to_stderr(mut self, enabled: bool) -> Self {
        self.logs_to_stderr = enabled;
        self
    }

    /// Write delivery failures to stderr.
    pub fn with_errors_to_stderr(mut self, enabled: bool) -> Self {
        self.errors_to_stderr = enabled;
        self
    }

    /// Capture file and line of every record.
    pub fn with_include_caller_data(mut self, enabled: bool) -> Self {
        self.include_caller_data = enabled;
        self
    }

    /// Set the flush interval.
    pub fn with_sleep_time(mut self, sleep_time: Duration) -> Self {
        self.sleep_time = sleep_time;
        self
    }

    /// Set the queue bound in bytes.
    pub fn with_max_queue_size(mut self, bytes: usize) -> Self {
        self.max_queue_size = bytes;
        self
    }

    /// Set the number of resend attempts for retryable failures.
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the time zone of dates rendered by properties.
    pub fn with_time_zone(mut self, tz: Tz) -> Self {
        self.time_zone = tz;
        self
    }

    /// Add a document field. The pattern is compiled with the converters of
    /// this appender's kind.
    pub fn with_property(mut self, property: Property) -> Self {
        let pattern = Pattern::compile(self.kind.layout(), &property.pattern);
        self.properties.push(CompiledProperty { property, pattern });
        self
    }

    /// Attach the authentication adapter called before every request.
    pub fn with_authentication(mut self, auth: Arc<dyn Authentication>) -> Self {
        self.authentication = Some(auth);
        self
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: impl Filter) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Add a boxed filter.
    pub fn with_boxed_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Start shipping on the current tokio runtime.
    ///
    /// Fails if no url is set or if called outside a runtime.
    pub fn start(self) -> Result<Arc<Self>> {
        let uri = self
            .url
            .clone()
            .ok_or_else(|| Error::config_invalid("url is required to start the appender"))?;
        let handle = Handle::try_current().map_err(|e| {
            Error::config_invalid("the appender must be started inside a tokio runtime")
                .with_source(e)
        })?;

        let sender = BulkSender {
            ctx: self.ctx.clone(),
            uri,
            index: self.index.clone(),
            doc_type: self.doc_type.clone(),
            auth: self.authentication.clone(),
            max_retries: self.max_retries,
            reporter: self.reporter(),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let task = handle.spawn(run(sender, self.queue.clone(), self.sleep_time, rx));

        *lock(&self.commands) = Some(tx);
        *lock(&self.task) = Some(task);
        self.started.store(true, Ordering::Release);
        debug!("appender {} started, shipping to {}", self.name, self.index);

        Ok(Arc::new(self))
    }

    /// Install as the global `log` logger, with `max_level` as the global
    /// level filter.
    ///
    /// Delivery reports for `logger_name` and `error_logger_name` go through
    /// the global logger. Once this appender is that logger they are dropped,
    /// so only the stderr flags still surface them.
    pub fn install(self: &Arc<Self>, max_level: log::LevelFilter) -> Result<()> {
        log::set_boxed_logger(Box::new(Installed(self.clone()))).map_err(|e| {
            Error::config_invalid("a global logger is already installed").with_source(e)
        })?;
        log::set_max_level(max_level);

        for name in self.unreported_targets() {
            eprintln!(
                "{}: records to logger {name} are not shipped by the installed appender",
                self.name
            );
        }
        Ok(())
    }

    /// Report targets without a stderr fallback. Nothing surfaces them once
    /// this appender is the global logger.
    fn unreported_targets(&self) -> Vec<&str> {
        [
            (&self.logger_name, self.logs_to_stderr),
            (&self.error_logger_name, self.errors_to_stderr),
        ]
        .into_iter()
        .filter_map(|(name, to_stderr)| name.as_deref().filter(|_| !to_stderr))
        .collect()
    }

    /// The appender name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The appender variant.
    pub fn kind(&self) -> AppenderKind {
        self.kind
    }

    /// The time zone of rendered dates.
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// The registered document fields, defaults first.
    pub fn properties(&self) -> Vec<&Property> {
        self.properties.iter().map(|p| &p.property).collect()
    }

    /// Number of filters, level filter included.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Whether an authentication adapter is attached.
    pub fn has_authentication(&self) -> bool {
        self.authentication.is_some()
    }

    /// Whether the appender is started and not stopped.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Render and queue an event.
    ///
    /// Events of the wrong kind, events denied by a filter and events
    /// appended while the appender is not started are dropped.
    pub fn append(&self, event: &Event) {
        if !self.is_started() || !self.kind.accepts(event) {
            return;
        }
        if decide(&self.filters, event) == FilterReply::Deny {
            return;
        }

        let doc = match serde_json::to_string(&self.render(event)) {
            Ok(v) => v,
            Err(e) => {
                self.reporter()
                    .failed(&Error::unexpected("failed to serialize document").with_source(e));
                return;
            }
        };
        lock(&self.queue).push(doc, self.max_queue_size);
    }

    /// Queue an access event.
    pub fn append_access(&self, event: AccessEvent) {
        self.append(&Event::Access(event))
    }

    /// Build the JSON document of an event.
    pub fn render(&self, event: &Event) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        doc.insert(
            "@timestamp".to_string(),
            format_rfc3339(event.timestamp()).into(),
        );
        if let Event::Log(e) = event {
            doc.insert("message".to_string(), e.message.clone().into());
        }
        for p in &self.properties {
            let value = p.pattern.render(event, self.time_zone);
            if value.is_empty() && !p.property.allow_empty {
                continue;
            }
            doc.insert(p.property.name.clone(), value.into());
        }
        serde_json::Value::Object(doc)
    }

    /// Ship everything queued so far and wait for the result.
    pub async fn flush_and_wait(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Flush(Some(tx)))?;
        rx.await
            .map_err(|e| Error::unexpected("flush task ended before flushing").with_source(e))
    }

    /// Ship everything queued and end the flush task.
    ///
    /// Events appended afterwards are dropped. Stopping twice is a no-op.
    pub async fn stop(&self) -> Result<()> {
        if !self.started.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let (tx, rx) = oneshot::channel();
        self.command(Command::Stop(tx))?;
        lock(&self.commands).take();
        rx.await
            .map_err(|e| Error::unexpected("flush task ended before stopping").with_source(e))?;

        let task = lock(&self.task).take();
        if let Some(task) = task {
            task.await
                .map_err(|e| Error::unexpected("flush task panicked").with_source(e))?;
        }
        debug!("appender {} stopped", self.name);
        Ok(())
    }

    fn command(&self, cmd: Command) -> Result<()> {
        let guard = lock(&self.commands);
        let tx = guard
            .as_ref()
            .ok_or_else(|| Error::unexpected("appender is not started"))?;
        tx.send(cmd)
            .map_err(|_| Error::unexpected("flush task is not running"))
    }

    fn reporter(&self) -> Reporter {
        Reporter {
            logs_to_stderr: self.logs_to_stderr,
            errors_to_stderr: self.errors_to_stderr,
            logger_name: self.logger_name.clone(),
            error_logger_name: self.error_logger_name.clone(),
        }
    }

    fn is_own_target(&self, target: &str) -> bool {
        INTERNAL_TARGETS.iter().any(|t| target.starts_with(t))
            || self.logger_name.as_deref() == Some(target)
            || self.error_logger_name.as_deref() == Some(target)
    }
}

impl Log for ElasticsearchAppender {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.kind == AppenderKind::Standard
            && self.is_started()
            && !self.is_own_target(metadata.target())
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.append(&Event::Log(LogEvent::from_record(
            record,
            self.include_caller_data,
        )));
    }

    fn flush(&self) {
        // The flush task may be busy; don't wait for it.
        let _ = self.command(Command::Flush(None));
    }
}

/// The handle `log` owns once an appender is installed.
struct Installed(Arc<ElasticsearchAppender>);

impl Log for Installed {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.0.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        self.0.log(record)
    }

    fn flush(&self) {
        self.0.flush()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn flush_queue(sender: &BulkSender, queue: &Mutex<Queue>) {
    let (docs, dropped) = lock(queue).take();
    if dropped > 0 {
        warn!("queue is full, dropped {dropped} events");
        sender.reporter.failed(
            &Error::unexpected("queue is full").with_context(format!("dropped events: {dropped}")),
        );
    }
    // Failures are reported by the sender and the batch is dropped.
    let _ = sender.send(&docs).await;
}

async fn run(
    sender: BulkSender,
    queue: Arc<Mutex<Queue>>,
    sleep_time: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let mut ticker = tokio::time::interval(sleep_time);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let command = tokio::select! {
            _ = ticker.tick() => None,
            cmd = commands.recv() => Some(cmd),
        };
        flush_queue(&sender, &queue).await;

        match command {
            None => {}
            Some(Some(Command::Flush(done))) => {
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Some(Some(Command::Stop(done))) => {
                let _ = done.send(());
                break;
            }
            // Every sender is gone.
            Some(None) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::tests::FakeBulk;
    use crate::filter::LevelFilter;
    use crate::property::default_properties;
    use eslog_core::ErrorKind;
    use http::StatusCode;
    use pretty_assertions::assert_eq;

    fn appender(kind: AppenderKind, http: FakeBulk) -> ElasticsearchAppender {
        let mut appender = ElasticsearchAppender::new(kind)
            .with_context(Context::new().with_http_send(http))
            .with_url("http://localhost:9200/_bulk")
            .expect("url must be valid")
            .with_index("logs")
            .with_sleep_time(Duration::from_secs(3600));
        for property in default_properties(kind.layout()) {
            appender = appender.with_property(property);
        }
        appender
    }

    fn record<'a>(level: log::Level, target: &'a str, args: std::fmt::Arguments<'a>) -> log::Record<'a> {
        log::Record::builder()
            .level(level)
            .target(target)
            .args(args)
            .build()
    }

    #[tokio::test]
    async fn test_log_records_are_shipped() -> anyhow::Result<()> {
        let http = FakeBulk::default();
        let appender = appender(AppenderKind::Standard, http.clone())
            .with_property(Property::new("user.id", "%X{userId}").with_allow_empty(true))
            .start()?;

        appender.log(&record(log::Level::Info, "app", format_args!("hello")));
        appender.log(&record(log::Level::Warn, "app::db", format_args!("slow")));
        appender.flush_and_wait().await?;

        let bodies = http.bodies();
        assert_eq!(bodies.len(), 1);
        let lines = bodies[0].lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_index":"logs"}}"#);

        let doc: serde_json::Value = serde_json::from_str(lines[1])?;
        assert_eq!(doc["message"], "hello");
        assert_eq!(doc["level"], "INFO");
        assert_eq!(doc["logger_name"], "app");
        assert_eq!(doc["user.id"], "");
        assert!(doc.get("stack_trace").is_none());
        assert!(doc.get("@timestamp").is_some());

        let doc: serde_json::Value = serde_json::from_str(lines[3])?;
        assert_eq!(doc["message"], "slow");

        appender.stop().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_access_events_are_shipped() -> anyhow::Result<()> {
        let http = FakeBulk::default();
        let appender = appender(AppenderKind::Access, http.clone()).start()?;

        let (parts, _) = http::Request::get("/orders?id=7").body(())?.into_parts();
        appender.append_access(
            AccessEvent::from_request(&parts, "10.0.0.1")
                .with_status(StatusCode::OK)
                .with_content_length(10),
        );
        // Records are not accepted by an access appender.
        appender.log(&record(log::Level::Error, "app", format_args!("ignored")));
        appender.flush_and_wait().await?;

        let bodies = http.bodies();
        assert_eq!(bodies[0].lines().count(), 2);
        let doc: serde_json::Value = serde_json::from_str(bodies[0].lines().nth(1).unwrap_or(""))?;
        assert_eq!(doc["@fields.HOSTNAME"], "10.0.0.1");
        assert_eq!(doc["@fields.method"], "GET");
        assert_eq!(doc["@fields.status_code"], "200");
        assert_eq!(doc["@fields.requested_uri"], "/orders");
        assert!(doc["@message"]
            .as_str()
            .unwrap_or_default()
            .contains("\"GET /orders?id=7 HTTP/1.1\" 200 10"));
        assert!(doc.get("message").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_filters_and_own_targets_are_dropped() -> anyhow::Result<()> {
        let http = FakeBulk::default();
        let appender = appender(AppenderKind::Standard, http.clone())
            .with_logger_name(Some("es-shipping".to_string()))
            .with_filter(LevelFilter::new(log::LevelFilter::Warn))
            .start()?;

        appender.log(&record(log::Level::Info, "app", format_args!("too low")));
        appender.log(&record(log::Level::Error, "es-shipping", format_args!("own")));
        appender.log(&record(log::Level::Error, "eslog_aws_v4::imds", format_args!("own")));
        appender.flush_and_wait().await?;
        assert!(http.requests().is_empty());

        appender.log(&record(log::Level::Error, "app", format_args!("kept")));
        appender.flush_and_wait().await?;
        assert_eq!(http.requests().len(), 1);
        Ok(())
    }

    #[test]
    fn test_unreported_targets() {
        let appender = ElasticsearchAppender::new(AppenderKind::Standard);
        assert!(appender.unreported_targets().is_empty());

        let appender = ElasticsearchAppender::new(AppenderKind::Standard)
            .with_logger_name(Some("es-shipping".to_string()))
            .with_error_logger_name(Some("es-errors".to_string()));
        assert_eq!(appender.unreported_targets(), vec!["es-shipping", "es-errors"]);

        let appender = appender.with_logs_to_stderr(true);
        assert_eq!(appender.unreported_targets(), vec!["es-errors"]);
    }

    #[tokio::test]
    async fn test_transport_targets_are_dropped() -> anyhow::Result<()> {
        let http = FakeBulk::default();
        let appender = appender(AppenderKind::Standard, http.clone()).start()?;

        for target in [
            "rustls::client::hs",
            "h2::codec::framed_write",
            "tower::buffer::worker",
            "hyper_util::client::legacy::pool",
            "reqwest::connect",
        ] {
            appender.log(&record(log::Level::Trace, target, format_args!("transport")));
        }
        appender.flush_and_wait().await?;
        assert!(http.requests().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_access_time_uses_time_zone() -> anyhow::Result<()> {
        let appender = appender(AppenderKind::Access, FakeBulk::default())
            .with_time_zone(Tz::Asia__Tokyo)
            .with_property(Property::new("@fields.time", "%t"));
        assert_eq!(appender.time_zone(), Tz::Asia__Tokyo);

        let (parts, _) = http::Request::get("/").body(())?.into_parts();
        let mut event = AccessEvent::from_request(&parts, "10.0.0.1");
        event.timestamp = eslog_core::time::parse_rfc3339("2024-05-01T20:00:00Z")?;

        let doc = appender.render(&Event::Access(event));
        assert_eq!(doc["@fields.time"], "02/May/2024:05:00:00 +0900");
        assert_eq!(doc["@timestamp"], "2024-05-01T20:00:00.000Z");
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_send_drops_batch() -> anyhow::Result<()> {
        let http = FakeBulk::default()
            .respond(StatusCode::INTERNAL_SERVER_ERROR, "boom")
            .respond(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let appender = appender(AppenderKind::Standard, http.clone())
            .with_max_retries(1)
            .start()?;

        appender.log(&record(log::Level::Error, "app", format_args!("lost")));
        appender.flush_and_wait().await?;
        assert_eq!(http.requests().len(), 2);

        // The appender keeps working after a dropped batch.
        appender.log(&record(log::Level::Error, "app", format_args!("next")));
        appender.flush_and_wait().await?;
        assert_eq!(http.requests().len(), 3);
        assert!(http.bodies()[2].contains("next"));
        Ok(())
    }

    #[tokio::test]
    async fn test_queue_overflow_drops_events() -> anyhow::Result<()> {
        let http = FakeBulk::default();
        let appender = appender(AppenderKind::Standard, http.clone())
            .with_max_queue_size(1)
            .start()?;

        appender.log(&record(log::Level::Error, "app", format_args!("too big")));
        appender.flush_and_wait().await?;
        assert!(http.requests().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_flushes_and_ends() -> anyhow::Result<()> {
        let http = FakeBulk::default();
        let appender = appender(AppenderKind::Standard, http.clone()).start()?;

        appender.log(&record(log::Level::Error, "app", format_args!("last words")));
        appender.stop().await?;
        assert_eq!(http.requests().len(), 1);
        assert!(!appender.is_started());

        appender.log(&record(log::Level::Error, "app", format_args!("too late")));
        assert!(appender.flush_and_wait().await.is_err());
        appender.stop().await?;
        assert_eq!(http.requests().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_flush() -> anyhow::Result<()> {
        let http = FakeBulk::default();
        let appender = appender(AppenderKind::Standard, http.clone())
            .with_sleep_time(Duration::from_millis(100))
            .start()?;

        appender.log(&record(log::Level::Error, "app", format_args!("tick")));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(http.requests().len(), 1);
        Ok(())
    }

    #[test]
    fn test_start_requires_runtime_and_url() {
        let err = ElasticsearchAppender::new(AppenderKind::Standard)
            .with_url("http://localhost:9200/_bulk")
            .expect("url must be valid")
            .start()
            .expect_err("no runtime must fail");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = ElasticsearchAppender::new(AppenderKind::Standard)
            .start()
            .expect_err("no url must fail");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_append_before_start_is_dropped() {
        let appender = ElasticsearchAppender::new(AppenderKind::Standard);
        appender.log(&record(log::Level::Error, "app", format_args!("early")));
        assert!(lock(&appender.queue).docs.is_empty());
    }
}
