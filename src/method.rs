//! HTTP method as a typed enum.
//!
//! Only `GET` and `POST` are served. Any other method string is rejected at
//! the server level with `405 Method Not Allowed` before routing, and
//! rejected with [`Error::InvalidMethod`] when used to register a route.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A supported HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Every method the server accepts, in the order they are listed in
    /// `405` responses.
    pub const ALL: [Method; 2] = [Method::Get, Method::Post];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get  => "GET",
            Self::Post => "POST",
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET"  => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _      => Err(Error::InvalidMethod(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_methods_only() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
        assert!(matches!("get".parse::<Method>(), Err(Error::InvalidMethod(_))));
        assert!(matches!("HONK".parse::<Method>(), Err(Error::InvalidMethod(m)) if m == "HONK"));
    }
}
