//! Character classes of the HTTP and cookie grammars.
//!
//! Every predicate works on single bytes so the accepted sets can be read
//! off the match arms and tested in isolation. The string-level helpers
//! (`is_token`, `is_cookie_name`, ...) are what the codecs call.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Header field-name character: visible US-ASCII except `:`.
pub(crate) fn is_token_char(b: u8) -> bool {
    matches!(b, 0x21..=0x7e) && b != b':'
}

/// Header field-value character: visible US-ASCII, space and horizontal tab.
pub(crate) fn is_field_value_char(b: u8) -> bool {
    matches!(b, b' '..=b'~' | b'\t')
}

/// Cookie name character: ASCII letters, digits and `_`.
pub(crate) fn is_cookie_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// RFC 6265 cookie-octet: visible US-ASCII excluding DQUOTE, comma,
/// semicolon and backslash.
pub(crate) fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2b | 0x2d..=0x3a | 0x3c..=0x5b | 0x5d..=0x7e)
}

pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

/// A non-empty header field value that renders on a single line.
pub(crate) fn is_field_value(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_field_value_char)
}

pub(crate) fn is_cookie_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_cookie_name_char)
}

pub(crate) fn is_cookie_value(s: &str) -> bool {
    s.bytes().all(is_cookie_octet)
}

/// `[1-9][0-9]*`, the only accepted spelling of a Max-Age value.
pub(crate) fn is_positive_integer(s: &str) -> bool {
    let bytes = s.as_bytes();
    matches!(bytes.first(), Some(b'1'..=b'9')) && bytes.iter().all(u8::is_ascii_digit)
}

// ── Percent escaping ──────────────────────────────────────────────────────────

/// Percent-escapes everything except unreserved characters.
pub(crate) fn escape(s: &str) -> Cow<'_, str> {
    urlencoding::encode(s)
}

/// Bytes that are not cookie-octets, plus `%` itself. Non-ASCII bytes are
/// always escaped.
const NON_OCTETS: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

/// Percent-escapes only what may not appear in a cookie attribute value:
/// non cookie-octets and `%` itself. Keeps `Path=/` readable.
pub(crate) fn escape_octets(s: &str) -> Cow<'_, str> {
    utf8_percent_encode(s, NON_OCTETS).into()
}

/// Reverses [`escape`] and [`escape_octets`]. Input that does not decode to
/// UTF-8 is kept verbatim.
pub(crate) fn unescape(s: &str) -> Cow<'_, str> {
    urlencoding::decode(s).unwrap_or(Cow::Borrowed(s))
}
