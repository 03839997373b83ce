//! Ship log records and access events to Elasticsearch.
//!
//! [`AppenderFactory`] builds a started [`ElasticsearchAppender`] from an
//! [`AppenderConfig`]:
//!
//! - the layout kind selects the appender variant and its built-in fields,
//! - user `properties` are rendered per event from layout patterns,
//! - `authenticationClass` is resolved through an [`AuthenticationRegistry`];
//!   `aws` signs every `_bulk` request with SigV4.
//!
//! The appender implements [`log::Log`], queues rendered documents in memory
//! and ships them from a tokio task.

mod config;
pub use config::{AppenderConfig, APPENDER_TYPE};

mod event;
pub use event::{AccessEvent, CallerData, Event, LogEvent};

mod layout;
pub use layout::{LayoutKind, Pattern, ACCESS_MESSAGE_PATTERN};

mod property;
pub use property::{default_properties, Property};

mod filter;
pub use filter::{Filter, FilterReply, LevelFilter, TargetFilter};

mod bulk;

mod appender;
pub use appender::{AppenderKind, ElasticsearchAppender, APPENDER_NAME};

mod registry;
pub use registry::{AuthenticationRegistry, AWS_AUTHENTICATION};

mod factory;
pub use factory::AppenderFactory;
