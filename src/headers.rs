//! HTTP header block: parsing, storage and rendering.
//!
//! Field names are normalised to lower case on insert and on lookup.
//! A name inserted twice keeps both values, in order, as a
//! [`Field::Multiple`].

use std::collections::HashMap;
use std::fmt;

use crate::cookie::{self, AttributeMode, Cookie};
use crate::error::Error;
use crate::grammar;

// ── Value / Field ─────────────────────────────────────────────────────────────

/// One header value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    Text(String),
    /// `content-length` values are kept as integers.
    Number(u64),
    /// `cookie` and `set-cookie` values, rendered through the cookie codec.
    Cookie(Cookie),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_cookie(&self) -> Option<&Cookie> {
        match self {
            Self::Cookie(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Cookie(c) => write!(f, "{c}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self { Self::Number(n) }
}

impl From<Cookie> for Value {
    fn from(c: Cookie) -> Self { Self::Cookie(c) }
}

/// All values stored under one field name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Field {
    Single(Value),
    Multiple(Vec<Value>),
}

impl Field {
    /// The values in insertion order.
    pub fn values(&self) -> &[Value] {
        match self {
            Self::Single(v) => std::slice::from_ref(v),
            Self::Multiple(vs) => vs,
        }
    }

    pub fn first(&self) -> &Value {
        &self.values()[0]
    }

    fn push(&mut self, value: Value) {
        match self {
            Self::Multiple(vs) => vs.push(value),
            Self::Single(first) => {
                let first = std::mem::replace(first, Value::Number(0));
                *self = Self::Multiple(vec![first, value]);
            }
        }
    }
}

// ── Headers ───────────────────────────────────────────────────────────────────

/// An insertion-ordered header block.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Headers {
    fields: Vec<(String, Field)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value. A repeated name promotes the stored value to a list.
    ///
    /// Fails with [`Error::InvalidHeaderName`] unless `name` is a token
    /// (visible US-ASCII without `:`), and with [`Error::InvalidHeaderValue`]
    /// if a text value is empty or holds anything but visible US-ASCII,
    /// space and tab. Line breaks in particular are refused.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let (name, value) = checked(name, value.into())?;
        self.append(name, value);
        Ok(())
    }

    /// Replaces every value stored under `name` with `value`. Validated
    /// like [`insert`](Headers::insert).
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let (name, value) = checked(name, value.into())?;
        self.replace(name, value);
        Ok(())
    }

    /// `name` must already be a lower-case token.
    pub(crate) fn replace(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let value = Field::Single(value);
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, field)) => *field = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Appends a `set-cookie` field.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.append("set-cookie".to_owned(), Value::Cookie(cookie));
    }

    fn append(&mut self, name: String, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, field)) => field.push(value),
            None => self.fields.push((name, Field::Single(value))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, field)| field)
    }

    /// The first value of `name` if it is text.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name)?.first().as_text()
    }

    /// The declared body length, if the first `content-length` value is a
    /// number.
    pub fn content_length(&self) -> Option<u64> {
        self.get("content-length")?.first().as_number()
    }

    /// Cookies from the `cookie` field, by name.
    pub fn cookies(&self) -> HashMap<String, Cookie> {
        match self.get("cookie") {
            Some(field) => cookie::by_name(field.values().iter().filter_map(Value::as_cookie)),
            None => HashMap::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let idx = self.fields.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.fields.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses header lines (each with its line terminator) up to and
    /// including the blank line that ends the header block.
    ///
    /// Returns the number of lines consumed, so the caller knows where the
    /// body starts. Lines starting with whitespace continue the previous
    /// field. Malformed lines are skipped.
    pub fn parse<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> usize {
        let mut consumed = 0;
        let mut pending: Option<(String, String)> = None;

        for line in lines {
            consumed += 1;
            let content = line.trim_end_matches(['\r', '\n']);
            if content.is_empty() {
                break;
            }

            if content.starts_with([' ', '\t']) {
                let continuation = content.trim_matches([' ', '\t']);
                if let Some((_, value)) = pending.as_mut() {
                    if !continuation.is_empty() && continuation.bytes().all(grammar::is_field_value_char) {
                        value.push(' ');
                        value.push_str(continuation);
                    }
                }
                continue;
            }

            if let Some((name, value)) = split_field(content) {
                if let Some((name, value)) = pending.take() {
                    self.store_parsed(name, &value);
                }
                pending = Some((name.to_ascii_lowercase(), value.to_owned()));
            }
        }

        if let Some((name, value)) = pending {
            self.store_parsed(name, &value);
        }
        consumed
    }

    fn store_parsed(&mut self, name: String, value: &str) {
        match name.as_str() {
            // Digits only; too many of them saturate so the size limit still
            // applies. Anything else stays text for the caller to reject.
            "content-length" => {
                let length = if value.bytes().all(|b| b.is_ascii_digit()) {
                    Value::Number(value.parse().unwrap_or(u64::MAX))
                } else {
                    Value::Text(value.to_owned())
                };
                self.append(name, length);
            }
            "cookie" => {
                for cookie in Cookie::parse_list(value) {
                    self.append(name.clone(), Value::Cookie(cookie));
                }
            }
            "set-cookie" => {
                if let Ok(cookie) = Cookie::parse(value, AttributeMode::Tolerant) {
                    self.append(name, Value::Cookie(cookie));
                }
            }
            _ => {
                let value = grammar::unescape(value).into_owned();
                self.append(name, Value::Text(value));
            }
        }
    }
}

/// Lower-cases `name` and makes sure the field renders as one line.
fn checked(name: &str, value: Value) -> Result<(String, Value), Error> {
    if !grammar::is_token(name) {
        return Err(Error::InvalidHeaderName(name.to_owned()));
    }
    if let Value::Text(text) = &value {
        if !grammar::is_field_value(text) {
            return Err(Error::InvalidHeaderValue(name.to_owned()));
        }
    }
    Ok((name.to_ascii_lowercase(), value))
}

/// Splits `name: value`. `None` unless the name is a token and the value
/// is non-empty printable text.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let value = value.trim_matches([' ', '\t']);
    if !grammar::is_token(name) || !grammar::is_field_value(value) {
        return None;
    }
    Some((name, value))
}

/// Renders one `name: value` line per value and the terminating blank line.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, field) in &self.fields {
            for value in field.values() {
                write!(f, "{name}: {value}\r\n")?;
            }
        }
        f.write_str("\r\n")
    }
}
