use crate::appender::{AppenderKind, ElasticsearchAppender, APPENDER_NAME};
use crate::filter::{Filter, LevelFilter};
use crate::layout::LayoutKind;
use crate::property::{default_properties, Property};
use crate::{AppenderConfig, AuthenticationRegistry};
use eslog_core::{Context, Result};
use log::debug;
use std::sync::Arc;

/// AppenderFactory turns an [`AppenderConfig`] into a started
/// [`ElasticsearchAppender`].
///
/// ```no_run
/// use eslog_core::{Context, OsEnv};
/// use eslog_elasticsearch::{AppenderConfig, AppenderFactory};
/// use eslog_file_read_tokio::TokioFileRead;
/// use eslog_http_send_reqwest::ReqwestHttpSend;
///
/// # async fn example() -> eslog_core::Result<()> {
/// let cfg = AppenderConfig::from_json(
///     r#"{"url": "http://localhost:9200/_bulk", "index": "logs"}"#,
/// )?;
/// let ctx = Context::new()
///     .with_file_read(TokioFileRead)
///     .with_http_send(ReqwestHttpSend::default())
///     .with_env(OsEnv);
///
/// let appender = AppenderFactory::new(cfg).build(&ctx)?;
/// appender.install(log::LevelFilter::Info)?;
///
/// log::info!("shipped to elasticsearch");
/// appender.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AppenderFactory {
    config: AppenderConfig,
    layout: LayoutKind,
    registry: AuthenticationRegistry,
    filters: Vec<Box<dyn Filter>>,
}

impl AppenderFactory {
    /// Create a factory for standard records with the default registry.
    pub fn new(config: AppenderConfig) -> Self {
        Self {
            config,
            layout: LayoutKind::Standard,
            registry: AuthenticationRegistry::default(),
            filters: Vec::new(),
        }
    }

    /// Select the layout kind, and with it the appender variant.
    pub fn with_layout(mut self, layout: LayoutKind) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the authentication registry.
    pub fn with_registry(mut self, registry: AuthenticationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add a filter that runs after the level filter.
    pub fn with_filter(mut self, filter: impl Filter) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Build and start the appender.
    ///
    /// Every config error is returned before the appender is started. Must be
    /// called inside a tokio runtime.
    pub fn build(self, ctx: &Context) -> Result<Arc<ElasticsearchAppender>> {
        let cfg = &self.config;
        cfg.validate()?;

        let kind = AppenderKind::from(self.layout);
        let mut appender = ElasticsearchAppender::new(kind)
            .with_name(APPENDER_NAME)
            .with_context(ctx.clone())
            .with_url(&cfg.url)?
            .with_index(&cfg.index)
            .with_doc_type(cfg.document_type().map(str::to_string))
            .with_logger_name(cfg.logger_name.clone())
            .with_error_logger_name(cfg.error_logger_name.clone())
            .with_logs_to_stderr(cfg.logs_to_stderr)
            .with_errors_to_stderr(cfg.errors_to_stderr)
            .with_include_caller_data(cfg.include_caller_data)
            .with_sleep_time(cfg.sleep_time())
            .with_max_queue_size(cfg.max_queue_size)
            .with_max_retries(cfg.max_retries)
            .with_time_zone(cfg.time_zone()?);

        for property in default_properties(self.layout) {
            appender = appender.with_property(property);
        }
        for (name, pattern) in &cfg.properties {
            appender = appender.with_property(Property::new(name, pattern).with_allow_empty(true));
        }

        if let Some(name) = &cfg.authentication_class {
            appender = appender.with_authentication(self.registry.build(name, ctx, cfg)?);
            debug!("authentication {name} attached");
        }

        appender = appender.with_filter(LevelFilter::new(cfg.level_filter()?));
        for filter in self.filters {
            appender = appender.with_boxed_filter(filter);
        }

        appender.start()
    }
}
