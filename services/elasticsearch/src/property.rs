use crate::layout::{LayoutKind, ACCESS_MESSAGE_PATTERN};

/// A document field rendered from a layout pattern for every event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    /// Field name in the document. Dots are kept as is.
    pub name: String,
    /// Layout pattern.
    pub pattern: String,
    /// Keep the field even when it renders empty.
    pub allow_empty: bool,
}

impl Property {
    /// Create a property that is omitted when it renders empty.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            allow_empty: false,
        }
    }

    /// Keep the field even when it renders empty.
    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }
}

/// The built-in fields of every document for a layout kind.
pub fn default_properties(kind: LayoutKind) -> Vec<Property> {
    match kind {
        LayoutKind::Access => vec![
            Property::new("@message", ACCESS_MESSAGE_PATTERN),
            Property::new("@fields.HOSTNAME", "%h"),
            Property::new("@fields.elapsed_time", "%D"),
            Property::new("@fields.requested_url", "%r"),
            Property::new("@fields.requested_uri", "%U"),
            Property::new("@fields.status_code", "%s"),
            Property::new("@fields.method", "%m"),
            Property::new("@fields.content_length", "%b"),
            Property::new("@fields.protocol", "%H"),
        ],
        LayoutKind::Standard => vec![
            Property::new("level", "%p"),
            Property::new("stack_trace", "%ex{full}"),
            Property::new("logger_name", "%logger"),
            Property::new("thread_name", "%t"),
        ],
    }
}
