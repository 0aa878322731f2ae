//! Attribute constraints.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::table::Namespace;

/// A key→value condition over one namespace of an attribute table.
///
/// A namespace satisfies the constraint iff every constrained key has
/// exactly the required value. A key that is absent from the namespace has
/// the implicit value `""`, so `Constraint::new().with("k", "")` matches
/// namespaces that have never written `k`. The empty constraint matches
/// every namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    entries: BTreeMap<String, String>,
}

impl Constraint {
    /// The empty constraint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required `key == value` condition.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Whether this is the empty constraint.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tests the constraint against a namespace.
    pub fn is_satisfied_by(&self, ns: &Namespace) -> bool {
        self.entries.iter().all(|(key, want)| {
            let got = ns.get(key).map(|meta| meta.attr.value.as_str()).unwrap_or("");
            got == want
        })
    }
}

impl FromIterator<(String, String)> for Constraint {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Constraint {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, (key, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}}")
    }
}
