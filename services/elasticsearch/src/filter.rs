use crate::event::Event;
use std::fmt::Debug;

/// The decision of a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterReply {
    /// Drop the event without asking the remaining filters.
    Deny,
    /// Let the next filter decide.
    Neutral,
    /// Keep the event without asking the remaining filters.
    Accept,
}

/// Filter decides whether an event is shipped.
///
/// Filters run in the order they were added; the first reply that is not
/// [`FilterReply::Neutral`] wins.
pub trait Filter: Debug + Send + Sync + 'static {
    /// Decide on an event.
    fn decide(&self, event: &Event) -> FilterReply;
}

/// Deny records below a threshold. Access events are neutral.
#[derive(Clone, Copy, Debug)]
pub struct LevelFilter {
    threshold: log::LevelFilter,
}

impl LevelFilter {
    /// Create a filter that keeps records at `threshold` or more severe.
    pub fn new(threshold: log::LevelFilter) -> Self {
        Self { threshold }
    }
}

impl Filter for LevelFilter {
    fn decide(&self, event: &Event) -> FilterReply {
        match event {
            Event::Log(e) if e.level > self.threshold => FilterReply::Deny,
            _ => FilterReply::Neutral,
        }
    }
}

/// Deny records whose target starts with a prefix.
///
/// Useful to keep chatty dependencies out of the index:
///
/// ```
/// use eslog_elasticsearch::TargetFilter;
///
/// let filter = TargetFilter::deny("hyper");
/// ```
#[derive(Clone, Debug)]
pub struct TargetFilter {
    prefix: String,
}

impl TargetFilter {
    /// Deny records whose target starts with `prefix`.
    pub fn deny(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Filter for TargetFilter {
    fn decide(&self, event: &Event) -> FilterReply {
        match event {
            Event::Log(e) if e.target.starts_with(&self.prefix) => FilterReply::Deny,
            _ => FilterReply::Neutral,
        }
    }
}

/// Run `filters` in order and return the first decisive reply.
pub(crate) fn decide(filters: &[Box<dyn Filter>], event: &Event) -> FilterReply {
    filters
        .iter()
        .map(|f| f.decide(event))
        .find(|reply| *reply != FilterReply::Neutral)
        .unwrap_or(FilterReply::Neutral)
}
