//! Attribute values and namespace validation.

use std::fmt::{self, Display};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single attribute of a session's table.
///
/// An attribute with an empty value and `is_frozen == false` is *unset*;
/// unset is indistinguishable from never-written. A frozen attribute can
/// never change again, neither its value nor the frozen flag itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    /// The attribute key.
    pub key: String,
    /// The attribute value.
    pub value: String,
    /// Whether the attribute is immutable forever.
    pub is_frozen: bool,
}

impl Attr {
    /// An attribute update that sets `key` to `value`.
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attr {
            key: key.into(),
            value: value.into(),
            is_frozen: false,
        }
    }

    /// An attribute update that sets `key` to `value` and freezes it.
    pub fn freeze(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attr {
            key: key.into(),
            value: value.into(),
            is_frozen: true,
        }
    }

    /// The unset sentinel for `key`: empty value, not frozen.
    pub fn unset(key: impl Into<String>) -> Self {
        Attr {
            key: key.into(),
            value: String::new(),
            is_frozen: false,
        }
    }

    /// Whether this attribute is the unset sentinel.
    pub fn is_unset(&self) -> bool {
        self.value.is_empty() && !self.is_frozen
    }
}

impl Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            if self.is_frozen {
                write!(f, "!{}", self.key)
            } else {
                write!(f, "-{}", self.key)
            }
        } else if self.is_frozen {
            write!(f, "{}@{}", self.key, self.value)
        } else {
            write!(f, "{}={}", self.key, self.value)
        }
    }
}

static NAMESPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("namespace pattern is valid"));

/// Checks that `ns` is a valid application namespace name.
///
/// Names match `[A-Za-z0-9_.\-]+`; the leading underscore is reserved for
/// internal namespaces and rejected here.
pub fn validate_namespace(ns: &str) -> Result<(), Error> {
    if ns.is_empty() || !NAMESPACE_PATTERN.is_match(ns) {
        return Err(Error::InvalidNamespace {
            namespace: ns.to_string(),
            reason: "must be a non-empty string of [A-Za-z0-9_.-]".to_string(),
        });
    }
    if ns.starts_with('_') {
        return Err(Error::InvalidNamespace {
            namespace: ns.to_string(),
            reason: "the leading underscore is reserved".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(
            Attr::set("a", "1"),
            Attr {
                key: "a".into(),
                value: "1".into(),
                is_frozen: false
            }
        );
        assert!(Attr::freeze("a", "1").is_frozen);
        assert!(Attr::unset("a").is_unset());
        assert!(!Attr::freeze("a", "").is_unset());
    }

    #[test]
    fn rendering() {
        assert_eq!(Attr::set("a", "1").to_string(), "a=1");
        assert_eq!(Attr::freeze("a", "1").to_string(), "a@1");
        assert_eq!(Attr::set("a", "").to_string(), "-a");
        assert_eq!(Attr::freeze("a", "").to_string(), "!a");
    }

    #[test]
    fn namespace_validation() {
        for ns in ["ns", "my-app.v2", "A_b-c.d", "0"] {
            assert!(validate_namespace(ns).is_ok(), "expected {ns:?} to pass");
        }
        for ns in ["", "_internal", "has space", "a/b", "naïve"] {
            assert!(validate_namespace(ns).is_err(), "expected {ns:?} to fail");
        }
    }
}
