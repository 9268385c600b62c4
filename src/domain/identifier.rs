//! Dotted package identifiers.

use std::fmt;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::namespace::SELF_KEY;

/// A dot-separated package name such as `google.rpc.context`.
///
/// Construction guarantees at least one segment, no empty segments and no
/// segment named `self`, so every `Identifier` maps onto its own path in the
/// namespace tree without clashing with a module's own declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Parse and validate a dotted identifier.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let malformed = |reason: &str| DomainError::MalformedIdentifier {
            identifier: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(malformed("empty identifier"));
        }
        if raw.starts_with('.') || raw.ends_with('.') {
            return Err(malformed("cannot start or end with '.'"));
        }
        if raw.contains("..") {
            return Err(malformed("contains '..'"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(malformed("contains whitespace"));
        }
        if raw.split('.').any(|segment| segment == SELF_KEY) {
            return Err(malformed("segment 'self' is reserved"));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name segments, e.g. `["google", "rpc"]`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True if `other` is a strict dotted descendant (`self` + "." + ...).
    pub fn is_parent_of(&self, other: &Identifier) -> bool {
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
