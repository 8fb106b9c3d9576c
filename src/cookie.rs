//! HTTP cookies after RFC 6265, plus the `SameSite` extension.
//!
//! A [`Cookie`] is rendered for a `set-cookie` field through its
//! [`Display`](fmt::Display) impl and read back with [`Cookie::parse`].
//! Request `cookie` fields carry bare `name=value` pairs and go through
//! [`Cookie::parse_list`] instead.
//!
//! ```rust
//! use sewes::{AttributeMode, Cookie, SameSite};
//!
//! let mut cookie = Cookie::new("greeting", "hello world").unwrap();
//! cookie.set_max_age(300).unwrap();
//! cookie.set_same_site(SameSite::Lax);
//! assert_eq!(cookie.to_string(), "greeting=hello%20world; Max-age=300; SameSite=Lax");
//!
//! let parsed = Cookie::parse(&cookie.to_string(), AttributeMode::Strict).unwrap();
//! assert_eq!(parsed, cookie);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Error;
use crate::grammar;

/// 9999-12-31 23:59:59 GMT, the last instant an HTTP date can express.
const MAX_HTTP_DATE_SECS: u64 = 253_402_300_799;

// ── SameSite ──────────────────────────────────────────────────────────────────

/// Value of the `SameSite` attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax    => "Lax",
            Self::None   => "None",
        }
    }
}

/// Case-insensitive: `strict`, `LAX` and `None` are all accepted.
impl FromStr for SameSite {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("strict") {
            Ok(Self::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Ok(Self::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Ok(Self::None)
        } else {
            Err(Error::InvalidSameSite(s.to_owned()))
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── AttributeMode ─────────────────────────────────────────────────────────────

/// How attribute errors are treated while assigning or parsing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeMode {
    /// A malformed or unknown attribute is an error.
    Strict,
    /// Malformed or unknown attributes are dropped. Used for untrusted input.
    Tolerant,
}

impl AttributeMode {
    fn apply(self, result: Result<(), Error>) -> Result<(), Error> {
        match (self, result) {
            (Self::Tolerant, Err(_)) => Ok(()),
            (_, result) => result,
        }
    }
}

// ── Cookie ────────────────────────────────────────────────────────────────────

/// A single cookie with its optional attributes.
///
/// Each attribute holds at most one value. When an attribute is assigned
/// twice the last assignment wins.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cookie {
    name: String,
    value: String,
    expires: Option<SystemTime>,
    max_age: Option<u64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl Cookie {
    /// Creates a cookie without attributes.
    ///
    /// Fails with [`Error::InvalidCookieName`] unless `name` matches
    /// `[A-Za-z0-9_]+`. The value is free-form; it is escaped on the wire.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if !grammar::is_cookie_name(&name) {
            return Err(Error::InvalidCookieName(name));
        }
        Ok(Self::with_checked_name(name, value.into()))
    }

    /// `name` must already satisfy the cookie-name grammar.
    pub(crate) fn with_checked_name(name: String, value: String) -> Self {
        debug_assert!(grammar::is_cookie_name(&name));
        Self {
            name,
            value,
            expires: None,
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Builds a cookie from its wire form: the raw value may be wrapped in
    /// double quotes and must consist of cookie-octets before unescaping.
    fn from_wire(name: &str, raw_value: &str) -> Result<Self, Error> {
        let raw_value = raw_value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(raw_value);
        if !grammar::is_cookie_value(raw_value) {
            return Err(Error::InvalidCookieValue(raw_value.to_owned()));
        }
        Self::new(name, grammar::unescape(raw_value))
    }

    /// Parses a `set-cookie` style line: `name=value; Attr=val; Flag`.
    ///
    /// The first pair is the cookie itself; a malformed first pair is always
    /// an error. The remaining fields are assigned as attributes according
    /// to `mode`.
    pub fn parse(header_line: &str, mode: AttributeMode) -> Result<Self, Error> {
        let mut fields = header_line.split(';');
        let first = fields.next().unwrap_or_default();
        let (name, value) = first
            .split_once('=')
            .ok_or_else(|| Error::InvalidCookieName(first.trim().to_owned()))?;
        let mut cookie = Self::from_wire(name.trim(), value.trim())?;

        for field in fields.map(str::trim).filter(|f| !f.is_empty()) {
            match field.split_once('=') {
                Some((name, value)) => cookie.assign_optional_value(name.trim(), value.trim(), mode)?,
                None => cookie.assign_flag(field, mode)?,
            }
        }

        Ok(cookie)
    }

    /// Parses a request `cookie` field: a `;` separated list of
    /// `name=value` pairs. Malformed pairs are dropped.
    pub fn parse_list(header_line: &str) -> Vec<Self> {
        header_line
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                Self::from_wire(name.trim(), value.trim()).ok()
            })
            .collect()
    }

    /// Assigns a `name=value` attribute. Recognised names (case-insensitive)
    /// are `expires`, `max-age`, `domain`, `path` and `samesite`.
    pub fn assign_optional_value(
        &mut self,
        name: &str,
        value: &str,
        mode: AttributeMode,
    ) -> Result<(), Error> {
        mode.apply(self.try_assign_optional_value(name, value))
    }

    fn try_assign_optional_value(&mut self, name: &str, value: &str) -> Result<(), Error> {
        match name.to_ascii_lowercase().as_str() {
            "expires" => {
                let date = grammar::unescape(value);
                let expires = httpdate::parse_http_date(&date)
                    .map_err(|_| Error::InvalidExpires(value.to_owned()))?;
                self.expires = Some(expires);
            }
            "max-age" => {
                if !grammar::is_positive_integer(value) {
                    return Err(Error::InvalidMaxAge(value.to_owned()));
                }
                let seconds = value
                    .parse()
                    .map_err(|_| Error::InvalidMaxAge(value.to_owned()))?;
                self.max_age = Some(seconds);
            }
            "domain" => self.domain = Some(grammar::unescape(value).into_owned()),
            "path" => self.path = Some(grammar::unescape(value).into_owned()),
            "samesite" => self.same_site = Some(value.parse()?),
            _ => return Err(Error::UnknownCookieAttribute(name.to_owned())),
        }
        Ok(())
    }

    /// Assigns a valueless attribute: `secure` or `httponly` (case-insensitive).
    pub fn assign_flag(&mut self, name: &str, mode: AttributeMode) -> Result<(), Error> {
        let result = if name.eq_ignore_ascii_case("secure") {
            self.secure = true;
            Ok(())
        } else if name.eq_ignore_ascii_case("httponly") {
            self.http_only = true;
            Ok(())
        } else {
            Err(Error::UnknownCookieAttribute(name.to_owned()))
        };
        mode.apply(result)
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn value(&self) -> &str { &self.value }
    pub fn expires(&self) -> Option<SystemTime> { self.expires }
    pub fn max_age(&self) -> Option<u64> { self.max_age }
    pub fn domain(&self) -> Option<&str> { self.domain.as_deref() }
    pub fn path(&self) -> Option<&str> { self.path.as_deref() }
    pub fn secure(&self) -> bool { self.secure }
    pub fn http_only(&self) -> bool { self.http_only }
    pub fn same_site(&self) -> Option<SameSite> { self.same_site }

    /// Sets `Expires`, truncated to whole seconds as an HTTP date carries
    /// them. Fails with [`Error::InvalidExpires`] for times an HTTP date
    /// cannot express: before 1970 or after 9999-12-31 23:59:59 GMT.
    pub fn set_expires(&mut self, expires: SystemTime) -> Result<(), Error> {
        let seconds = expires
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|since_epoch| since_epoch.as_secs())
            .filter(|&seconds| seconds <= MAX_HTTP_DATE_SECS)
            .ok_or_else(|| Error::InvalidExpires(format!("{expires:?}")))?;
        self.expires = Some(UNIX_EPOCH + Duration::from_secs(seconds));
        Ok(())
    }

    /// Max-Age must be a positive number of seconds.
    pub fn set_max_age(&mut self, seconds: u64) -> Result<(), Error> {
        if seconds == 0 {
            return Err(Error::InvalidMaxAge(seconds.to_string()));
        }
        self.max_age = Some(seconds);
        Ok(())
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = Some(domain.into());
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    pub fn set_http_only(&mut self, http_only: bool) {
        self.http_only = http_only;
    }

    pub fn set_same_site(&mut self, same_site: SameSite) {
        self.same_site = Some(same_site);
    }
}

/// Renders the escaped wire form. Attributes follow in a fixed order:
/// `Expires`, `Max-age`, `Domain`, `Path`, `SameSite`, `Secure`, `HttpOnly`.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, grammar::escape(&self.value))?;
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", httpdate::fmt_http_date(expires))?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-age={max_age}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", grammar::escape_octets(domain))?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={}", grammar::escape_octets(path))?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={same_site}")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

/// Indexes cookies by name; a later cookie with the same name replaces an
/// earlier one.
pub(crate) fn by_name<'a>(cookies: impl IntoIterator<Item = &'a Cookie>) -> HashMap<String, Cookie> {
    cookies
        .into_iter()
        .map(|c| (c.name.clone(), c.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_attributes_in_fixed_order() {
        let mut cookie = Cookie::new("Animal", "Lion").unwrap();
        cookie.assign_flag("Secure", AttributeMode::Strict).unwrap();
        cookie.set_expires(httpdate::parse_http_date("Sun, 25 Dec 2022 08:15:00 GMT").unwrap()).unwrap();
        cookie.set_domain("kingdom.org");

        assert_eq!(
            cookie.to_string(),
            "Animal=Lion; Expires=Sun, 25 Dec 2022 08:15:00 GMT; Domain=kingdom.org; Secure"
        );
    }

    #[test]
    fn renders_every_attribute() {
        let mut cookie = Cookie::new("session_key", "a+b/c=").unwrap();
        cookie.set_expires(UNIX_EPOCH + Duration::from_secs(1_700_000_000)).unwrap();
        cookie.set_max_age(60).unwrap();
        cookie.set_domain("example.com");
        cookie.set_path("/app");
        cookie.set_same_site(SameSite::Strict);
        cookie.set_secure(true);
        cookie.set_http_only(true);

        assert_eq!(
            cookie.to_string(),
            "session_key=a%2Bb%2Fc%3D; Expires=Tue, 14 Nov 2023 22:13:20 GMT; Max-age=60; \
             Domain=example.com; Path=/app; SameSite=Strict; Secure; HttpOnly"
        );
    }

    #[test]
    fn parse_reverses_render() {
        let mut cookie = Cookie::new("greeting", "hello; world %").unwrap();
        cookie.set_expires(UNIX_EPOCH + Duration::from_secs(1_671_956_100)).unwrap();
        cookie.set_max_age(300).unwrap();
        cookie.set_domain("localhost");
        cookie.set_path("/a b");
        cookie.set_same_site(SameSite::None);
        cookie.set_http_only(true);

        let parsed = Cookie::parse(&cookie.to_string(), AttributeMode::Strict).unwrap();
        assert_eq!(parsed, cookie);

        let bare = Cookie::new("x", "").unwrap();
        assert_eq!(Cookie::parse(&bare.to_string(), AttributeMode::Strict).unwrap(), bare);
    }

    #[test]
    fn expires_keeps_whole_seconds() {
        let mut cookie = Cookie::new("c", "v").unwrap();
        cookie.set_expires(UNIX_EPOCH + Duration::from_millis(1_700_000_000_500)).unwrap();
        assert_eq!(cookie.expires(), Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000)));

        let parsed = Cookie::parse(&cookie.to_string(), AttributeMode::Strict).unwrap();
        assert_eq!(parsed, cookie);

        let mut now = Cookie::new("c", "v").unwrap();
        now.set_expires(SystemTime::now()).unwrap();
        assert_eq!(Cookie::parse(&now.to_string(), AttributeMode::Strict).unwrap(), now);
    }

    #[test]
    fn expires_outside_http_date_range_is_rejected() {
        let mut cookie = Cookie::new("c", "v").unwrap();
        let before_epoch = UNIX_EPOCH - Duration::from_secs(1);
        let year_10000 = UNIX_EPOCH + Duration::from_secs(MAX_HTTP_DATE_SECS + 1);
        for bad in [before_epoch, year_10000] {
            assert!(matches!(cookie.set_expires(bad), Err(Error::InvalidExpires(_))));
        }
        assert_eq!(cookie.expires(), None);
        assert_eq!(cookie.to_string(), "c=v");

        cookie.set_expires(UNIX_EPOCH).unwrap();
        cookie.set_expires(UNIX_EPOCH + Duration::from_secs(MAX_HTTP_DATE_SECS)).unwrap();
        assert_eq!(cookie.to_string(), "c=v; Expires=Fri, 31 Dec 9999 23:59:59 GMT");
    }

    #[test]
    fn rejects_invalid_names() {
        for name in ["", "my-cookie", "a b", "über", "semi;colon", "a=b"] {
            assert!(
                matches!(Cookie::new(name, "v"), Err(Error::InvalidCookieName(_))),
                "{name:?}"
            );
        }
        assert!(matches!(
            Cookie::parse("bad-name=1", AttributeMode::Tolerant),
            Err(Error::InvalidCookieName(_))
        ));
        assert!(Cookie::parse("no_value_here", AttributeMode::Tolerant).is_err());
    }

    #[test]
    fn same_site_is_validated_on_every_path() {
        assert_eq!("STRICT".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert_eq!("lax".parse::<SameSite>().unwrap(), SameSite::Lax);
        assert_eq!("None".parse::<SameSite>().unwrap(), SameSite::None);
        assert!(matches!("sometimes".parse::<SameSite>(), Err(Error::InvalidSameSite(_))));

        let mut cookie = Cookie::new("c", "v").unwrap();
        assert!(matches!(
            cookie.assign_optional_value("SameSite", "always", AttributeMode::Strict),
            Err(Error::InvalidSameSite(_))
        ));
        assert_eq!(cookie.same_site(), None);

        assert!(matches!(
            Cookie::parse("c=v; SameSite=always", AttributeMode::Strict),
            Err(Error::InvalidSameSite(_))
        ));
        let tolerant = Cookie::parse("c=v; SameSite=always", AttributeMode::Tolerant).unwrap();
        assert_eq!(tolerant.same_site(), None);
    }

    #[test]
    fn max_age_must_be_positive() {
        let mut cookie = Cookie::new("c", "v").unwrap();
        for bad in ["0", "-5", "07", "1.5", "soon"] {
            assert!(
                matches!(
                    cookie.assign_optional_value("max-age", bad, AttributeMode::Strict),
                    Err(Error::InvalidMaxAge(_))
                ),
                "{bad}"
            );
        }
        assert!(cookie.set_max_age(0).is_err());
        cookie.assign_optional_value("Max-Age", "42", AttributeMode::Strict).unwrap();
        assert_eq!(cookie.max_age(), Some(42));
    }

    #[test]
    fn tolerant_mode_drops_unknown_attributes() {
        let line = "id=7; Priority=High; Partitioned; Path=/; Expires=whenever";
        assert!(matches!(
            Cookie::parse(line, AttributeMode::Strict),
            Err(Error::UnknownCookieAttribute(a)) if a == "Priority"
        ));

        let cookie = Cookie::parse(line, AttributeMode::Tolerant).unwrap();
        assert_eq!(cookie.value(), "7");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.expires(), None);
    }

    #[test]
    fn duplicate_attributes_last_write_wins() {
        let cookie = Cookie::parse("c=v; SameSite=Lax; Path=/a; samesite=strict; path=/b", AttributeMode::Strict)
            .unwrap();
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/b"));
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let cookie = Cookie::parse("c=\"abc\"; HttpOnly", AttributeMode::Strict).unwrap();
        assert_eq!(cookie.value(), "abc");
        assert!(cookie.http_only());
    }

    #[test]
    fn parse_list_keeps_valid_pairs() {
        let cookies = Cookie::parse_list("foo=bar; valid=true; bad-name=x; broken; foobar=barfoo");
        let names: Vec<_> = cookies.iter().map(|c| (c.name(), c.value())).collect();
        assert_eq!(names, vec![("foo", "bar"), ("valid", "true"), ("foobar", "barfoo")]);
    }
}
