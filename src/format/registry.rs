//! Formatter registry.

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderValue},
};
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

use super::negotiate::negotiate;

/// Media type denoting "anything", served by the default formatter.
pub const WILDCARD: &str = "*/*";

/// Serialization function for one media type.
pub type FormatFn = fn(&Value) -> Result<Bytes, FormatError>;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML serialization failed: {0}")]
    Xml(String),
}

/// A serializer plus the `Content-Type` it announces.
#[derive(Clone)]
pub struct Formatter {
    content_type: HeaderValue,
    format: FormatFn,
}

impl Formatter {
    pub fn new(content_type: &'static str, format: FormatFn) -> Self {
        Self {
            content_type: HeaderValue::from_static(content_type),
            format,
        }
    }

    pub fn content_type(&self) -> &HeaderValue {
        &self.content_type
    }

    /// Content type with an explicit UTF-8 character set.
    pub fn content_type_utf8(&self) -> HeaderValue {
        let raw = self.content_type.to_str().unwrap_or("application/json");
        if raw.contains("charset") {
            return self.content_type.clone();
        }
        HeaderValue::from_str(&format!("{}; charset=utf-8", raw))
            .unwrap_or_else(|_| self.content_type.clone())
    }

    pub fn format(&self, value: &Value) -> Result<Bytes, FormatError> {
        (self.format)(value)
    }
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Media type chosen for a request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated(pub String);

impl Negotiated {
    pub fn wildcard() -> Self {
        Self(WILDCARD.to_string())
    }

    pub fn media_type(&self) -> &str {
        &self.0
    }
}

/// Maps negotiated media types to formatters.
///
/// Immutable once the server is assembled; shared via `Arc`.
#[derive(Debug, Clone)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Formatter>,
    acceptable: Vec<String>,
    default: Formatter,
}

impl FormatterRegistry {
    /// Registry with the built-in formatters, accepting `extra` media types
    /// on top of the ones it can format.
    pub fn new(extra: &[String]) -> Self {
        let mut registry = Self {
            formatters: HashMap::new(),
            acceptable: Vec::new(),
            // Wildcard responses are JSON and say so, whatever was matched.
            default: Formatter::new("application/json", format_json),
        };

        registry.register("application/json", Formatter::new("application/json", format_json));
        registry.register("text/plain", Formatter::new("text/plain", format_text));
        registry.register(
            "application/octet-stream",
            Formatter::new("application/octet-stream", format_text),
        );
        registry.register("application/xml", Formatter::new("application/xml", format_xml));

        for media_type in extra {
            registry.accept(media_type);
        }
        registry
    }

    /// Add or replace the formatter for `media_type` and make it acceptable.
    pub fn register(&mut self, media_type: &str, formatter: Formatter) {
        let media_type = media_type.to_ascii_lowercase();
        self.accept(&media_type);
        self.formatters.insert(media_type, formatter);
    }

    fn accept(&mut self, media_type: &str) {
        let media_type = media_type.trim().to_ascii_lowercase();
        if !self.acceptable.contains(&media_type) {
            self.acceptable.push(media_type);
        }
    }

    /// Media types the accept stage admits.
    pub fn acceptable(&self) -> &[String] {
        &self.acceptable
    }

    /// Strict negotiation; `None` when nothing acceptable matches.
    pub fn negotiate(&self, headers: &HeaderMap) -> Option<Negotiated> {
        let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
        negotiate(accept, &self.acceptable).map(|m| Negotiated(m.to_string()))
    }

    /// Negotiation that never fails, used when rendering errors.
    pub fn negotiate_or_default(&self, headers: &HeaderMap) -> Negotiated {
        self.negotiate(headers).unwrap_or_else(Negotiated::wildcard)
    }

    pub fn formatter_for(&self, negotiated: &Negotiated) -> &Formatter {
        self.formatters
            .get(negotiated.media_type())
            .unwrap_or(&self.default)
    }

    pub fn default_formatter(&self) -> &Formatter {
        &self.default
    }
}

fn format_json(value: &Value) -> Result<Bytes, FormatError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

fn format_text(value: &Value) -> Result<Bytes, FormatError> {
    match value {
        Value::String(s) => Ok(Bytes::from(s.clone())),
        other => Ok(Bytes::from(other.to_string())),
    }
}

/// XML document rooted at `<response>`.
///
/// Array entries become `<item>` children; object keys that are not XML
/// names have their offending characters replaced with `_`.
fn format_xml(value: &Value) -> Result<Bytes, FormatError> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, "response", value)?;
    Ok(Bytes::from(writer.into_inner()))
}

fn xml_error(e: impl std::fmt::Display) -> FormatError {
    FormatError::Xml(e.to_string())
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), FormatError> {
    let text = match value {
        Value::Null => {
            return writer
                .write_event(Event::Empty(BytesStart::new(name)))
                .map_err(xml_error)
        }
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    };

    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)?;
    match (text, value) {
        (Some(text), _) => writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(xml_error)?,
        (None, Value::Array(items)) => {
            for item in items {
                write_element(writer, "item", item)?;
            }
        }
        (None, Value::Object(fields)) => {
            for (key, field) in fields {
                write_element(writer, &xml_name(key), field)?;
            }
        }
        (None, _) => {}
    }
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

/// `key` made into a valid XML element name.
fn xml_name(key: &str) -> Cow<'_, str> {
    let valid_start = |c: char| c.is_alphabetic() || c == '_';
    let valid = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.');

    match key.chars().next() {
        Some(first) if valid_start(first) && key.chars().all(valid) => Cow::Borrowed(key),
        Some(first) => {
            let mut name = String::with_capacity(key.len() + 1);
            if !valid_start(first) {
                name.push('_');
            }
            name.extend(key.chars().map(|c| if valid(c) { c } else { '_' }));
            Cow::Owned(name)
        }
        None => Cow::Borrowed("_"),
    }
}
