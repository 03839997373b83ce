//! A small pattern engine for rendering document fields.
//!
//! Patterns use the familiar `%converter{option}` syntax. A pattern is
//! compiled once into segments and rendered for every event. Format
//! modifiers such as `%-5p` are accepted and ignored. Unknown converters are
//! kept literally. Dates are rendered in the time zone passed to
//! [`Pattern::render`].

use crate::event::{AccessEvent, Event, LogEvent};
use chrono::SecondsFormat;
use chrono_tz::Tz;
use std::fmt::Write;

/// Pattern of the `@message` field for access events: the combined log
/// format followed by the elapsed time.
pub const ACCESS_MESSAGE_PATTERN: &str =
    r#"%h %l %u [%t] "%r" %s %b "%i{Referer}" "%i{User-Agent}" %D"#;

/// The kind of events a layout renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutKind {
    /// Records from the `log` facade.
    #[default]
    Standard,
    /// HTTP access events.
    Access,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Converter {
    // Standard events.
    Level,
    Logger,
    Thread,
    Message,
    Exception,
    KeyValue(Option<String>),
    Date,
    File,
    Line,
    // Access events.
    RemoteHost,
    RemoteLogName,
    RemoteUser,
    AccessTime,
    RequestLine,
    RequestUri,
    Query,
    Status,
    Method,
    ContentLength,
    Protocol,
    ElapsedMillis,
    RequestHeader(String),
    // Both.
    Newline,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Convert(Converter),
}

/// A compiled layout pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile `pattern` with the converters of `kind`.
    pub fn compile(kind: LayoutKind, pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            if let Some((_, '%')) = chars.peek() {
                chars.next();
                literal.push('%');
                continue;
            }

            // Format modifiers.
            while let Some((_, '-' | '.' | '0'..='9')) = chars.peek() {
                chars.next();
            }
            let mut name = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_ascii_alphabetic() {
                    break;
                }
                name.push(c);
                chars.next();
            }
            let mut option = None;
            if let Some((_, '{')) = chars.peek() {
                let mut value = String::new();
                let mut closed = false;
                chars.next();
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    literal.push_str(&pattern[start..]);
                    break;
                }
                option = Some(value);
            }

            match converter(kind, &name, option) {
                Some(converter) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Convert(converter));
                }
                None => {
                    let end = chars.peek().map_or(pattern.len(), |(i, _)| *i);
                    literal.push_str(&pattern[start..end]);
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self {
            source: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render the pattern for an event, with dates in `tz`.
    ///
    /// Converters that don't apply to the event render as empty strings.
    pub fn render(&self, event: &Event, tz: Tz) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(v) => out.push_str(v),
                Segment::Convert(Converter::Newline) => out.push('\n'),
                Segment::Convert(c) => match event {
                    Event::Log(e) => render_log(&mut out, c, e, tz),
                    Event::Access(e) => render_access(&mut out, c, e, tz),
                },
            }
        }
        out
    }
}

fn converter(kind: LayoutKind, name: &str, option: Option<String>) -> Option<Converter> {
    if name == "n" {
        return Some(Converter::Newline);
    }

    let converter = match kind {
        LayoutKind::Standard => match name {
            "p" | "le" | "level" => Converter::Level,
            "c" | "lo" | "logger" => Converter::Logger,
            "t" | "thread" => Converter::Thread,
            "m" | "msg" | "message" => Converter::Message,
            "ex" | "exception" | "throwable" => Converter::Exception,
            "X" | "mdc" => Converter::KeyValue(option),
            "d" | "date" => Converter::Date,
            "F" | "file" => Converter::File,
            "L" | "line" => Converter::Line,
            _ => return None,
        },
        LayoutKind::Access => match name {
            "h" | "clientHost" => Converter::RemoteHost,
            "l" => Converter::RemoteLogName,
            "u" | "user" => Converter::RemoteUser,
            "t" | "date" => Converter::AccessTime,
            "r" | "requestURL" => Converter::RequestLine,
            "U" | "requestURI" => Converter::RequestUri,
            "q" | "queryString" => Converter::Query,
            "s" | "statusCode" => Converter::Status,
            "m" | "requestMethod" => Converter::Method,
            "b" | "B" | "bytesSent" => Converter::ContentLength,
            "H" | "protocol" => Converter::Protocol,
            "D" | "elapsedTime" => Converter::ElapsedMillis,
            "i" | "header" => Converter::RequestHeader(option?),
            _ => return None,
        },
    };
    Some(converter)
}

fn render_log(out: &mut String, converter: &Converter, e: &LogEvent, tz: Tz) {
    let caller = e.caller.as_ref();
    match converter {
        Converter::Level => out.push_str(e.level.as_str()),
        Converter::Logger => out.push_str(&e.target),
        Converter::Thread => out.push_str(&e.thread),
        Converter::Message => out.push_str(&e.message),
        Converter::Exception => {
            if let Some(v) = e.key_values.get("error").or(e.key_values.get("exception")) {
                out.push_str(v);
            }
        }
        Converter::KeyValue(Some(key)) => {
            if let Some(v) = e.key_values.get(key) {
                out.push_str(v);
            }
        }
        Converter::KeyValue(None) => {
            let pairs = e
                .key_values
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>();
            out.push_str(&pairs.join(", "));
        }
        Converter::Date => out.push_str(
            &e.timestamp
                .with_timezone(&tz)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Converter::File => {
            if let Some(file) = caller.and_then(|c| c.file.as_deref()) {
                out.push_str(file);
            }
        }
        Converter::Line => {
            if let Some(line) = caller.and_then(|c| c.line) {
                let _ = write!(out, "{line}");
            }
        }
        _ => {}
    }
}

fn render_access(out: &mut String, converter: &Converter, e: &AccessEvent, tz: Tz) {
    match converter {
        Converter::RemoteHost => out.push_str(&e.remote_host),
        Converter::RemoteLogName => out.push('-'),
        Converter::RemoteUser => out.push_str(e.remote_user.as_deref().unwrap_or("-")),
        Converter::AccessTime => {
            let time = e.timestamp.with_timezone(&tz);
            let _ = write!(out, "{}", time.format("%d/%b/%Y:%H:%M:%S %z"));
        }
        Converter::RequestLine => {
            let target = e
                .uri
                .path_and_query()
                .map_or_else(|| e.uri.path(), |v| v.as_str());
            let _ = write!(out, "{} {} {:?}", e.method, target, e.version);
        }
        Converter::RequestUri => out.push_str(e.uri.path()),
        Converter::Query => {
            if let Some(query) = e.uri.query() {
                out.push('?');
                out.push_str(query);
            }
        }
        Converter::Status => {
            let _ = write!(out, "{}", e.status.as_u16());
        }
        Converter::Method => out.push_str(e.method.as_str()),
        Converter::ContentLength => match e.content_length {
            Some(v) => {
                let _ = write!(out, "{v}");
            }
            None => out.push('-'),
        },
        Converter::Protocol => {
            let _ = write!(out, "{:?}", e.version);
        }
        Converter::ElapsedMillis => {
            let _ = write!(out, "{}", e.elapsed.as_millis());
        }
        Converter::RequestHeader(name) => out.push_str(
            e.headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-"),
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CallerData;
    use eslog_core::time::parse_rfc3339;
    use http::{Method, StatusCode, Version};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn log_event() -> Event {
        Event::Log(LogEvent {
            level: log::Level::Error,
            target: "app::db".to_string(),
            message: "connection lost".to_string(),
            thread: "worker-1".to_string(),
            timestamp: parse_rfc3339("2024-05-01T08:30:00Z").expect("time must parse"),
            key_values: BTreeMap::from([
                ("userId".to_string(), "42".to_string()),
                ("error".to_string(), "broken pipe".to_string()),
            ]),
            caller: Some(CallerData {
                file: Some("src/db.rs".to_string()),
                line: Some(7),
                module_path: None,
            }),
        })
    }

    fn access_event() -> Event {
        Event::Access(AccessEvent {
            remote_host: "10.0.0.1".to_string(),
            remote_user: None,
            method: Method::POST,
            uri: "/orders?id=7".parse().expect("uri must parse"),
            version: Version::HTTP_11,
            status: StatusCode::CREATED,
            content_length: Some(128),
            elapsed: Duration::from_millis(15),
            headers: http::HeaderMap::from_iter([(
                http::header::USER_AGENT,
                http::HeaderValue::from_static("curl/8.0"),
            )]),
            timestamp: parse_rfc3339("2024-05-01T08:30:00Z").expect("time must parse"),
        })
    }

    #[test]
    fn test_standard_converters() {
        let event = log_event();
        let cases = vec![
            ("%p", "ERROR"),
            ("%-5level", "ERROR"),
            ("%logger", "app::db"),
            ("%t", "worker-1"),
            ("[%thread] %m", "[worker-1] connection lost"),
            ("%ex{full}", "broken pipe"),
            ("%X{userId}", "42"),
            ("%mdc{missing}", ""),
            ("%X", "error=broken pipe, userId=42"),
            ("%d", "2024-05-01T08:30:00.000Z"),
            ("%F:%L", "src/db.rs:7"),
            ("100%% %m%n", "100% connection lost\n"),
            ("%unknown %m", "%unknown connection lost"),
            ("%X{userId", "%X{userId"),
        ];

        for (pattern, expected) in cases {
            let compiled = Pattern::compile(LayoutKind::Standard, pattern);
            assert_eq!(compiled.render(&event, Tz::UTC), expected, "pattern: {pattern}");
            assert_eq!(compiled.as_str(), pattern);
        }
    }

    #[test]
    fn test_access_converters() {
        let event = access_event();
        let cases = vec![
            ("%h", "10.0.0.1"),
            ("%l %u", "- -"),
            ("%t", "01/May/2024:08:30:00 +0000"),
            ("%r", "POST /orders?id=7 HTTP/1.1"),
            ("%U%q", "/orders?id=7"),
            ("%s", "201"),
            ("%m", "POST"),
            ("%b", "128"),
            ("%H", "HTTP/1.1"),
            ("%D", "15"),
            ("%i{User-Agent}", "curl/8.0"),
            ("%i{Referer}", "-"),
        ];

        for (pattern, expected) in cases {
            let compiled = Pattern::compile(LayoutKind::Access, pattern);
            assert_eq!(compiled.render(&event, Tz::UTC), expected, "pattern: {pattern}");
        }
    }

    #[test]
    fn test_access_message_pattern() {
        let compiled = Pattern::compile(LayoutKind::Access, ACCESS_MESSAGE_PATTERN);
        assert_eq!(
            compiled.render(&access_event(), Tz::UTC),
            r#"10.0.0.1 - - [01/May/2024:08:30:00 +0000] "POST /orders?id=7 HTTP/1.1" 201 128 "-" "curl/8.0" 15"#
        );
    }

    #[test]
    fn test_converters_depend_on_layout_kind() {
        // `%m` is the message for records and the method for requests.
        let standard = Pattern::compile(LayoutKind::Standard, "%m");
        let access = Pattern::compile(LayoutKind::Access, "%m");
        assert_eq!(standard.render(&log_event(), Tz::UTC), "connection lost");
        assert_eq!(access.render(&access_event(), Tz::UTC), "POST");

        // Converters that don't match the event render empty.
        assert_eq!(standard.render(&access_event(), Tz::UTC), "");
        assert_eq!(
            Pattern::compile(LayoutKind::Standard, "%logger").render(&access_event(), Tz::UTC),
            ""
        );
    }

    #[test]
    fn test_dates_follow_time_zone() {
        let tz: Tz = "America/New_York".parse().expect("zone must parse");

        let access = Pattern::compile(LayoutKind::Access, "[%t]");
        assert_eq!(
            access.render(&access_event(), tz),
            "[01/May/2024:04:30:00 -0400]"
        );
        assert_eq!(
            access.render(&access_event(), Tz::Asia__Kolkata),
            "[01/May/2024:14:00:00 +0530]"
        );

        let standard = Pattern::compile(LayoutKind::Standard, "%d");
        assert_eq!(
            standard.render(&log_event(), tz),
            "2024-05-01T04:30:00.000-04:00"
        );
    }
}
