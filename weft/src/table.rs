//! Attribute tables with revision metadata.
//!
//! The catalog stores each attribute together with the revisions it was
//! created and last updated at. That metadata is what lets a [`Revision`]
//! bound to an old revision decide whether the head snapshot can still
//! answer a read consistently.
//!
//! [`Revision`]: crate::Revision

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use weft_base::Rev;

use crate::attrs::Attr;

/// An attribute plus the revisions it was created and last updated at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrMeta {
    /// The attribute itself.
    pub attr: Attr,
    /// The revision the attribute first became non-default.
    pub created_at: Rev,
    /// The revision the attribute was last changed.
    pub updated_at: Rev,
}

impl AttrMeta {
    /// Whether the attribute first appeared at the revision it was last
    /// updated, i.e. this metadata describes its creation.
    pub fn is_fresh(&self) -> bool {
        self.created_at == self.updated_at
    }
}

impl Display for AttrMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.attr.fmt(f)
    }
}

/// One namespace of a session's attribute table: key to attribute-with-
/// metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    entries: BTreeMap<String, AttrMeta>,
}

impl Namespace {
    /// The entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&AttrMeta> {
        self.entries.get(key)
    }

    /// Inserts an entry under its attribute's key.
    pub fn insert(&mut self, meta: AttrMeta) {
        self.entries.insert(meta.attr.key.clone(), meta);
    }

    /// Removes the entry for `key`.
    pub fn remove(&mut self, key: &str) -> Option<AttrMeta> {
        self.entries.remove(key)
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &AttrMeta> {
        self.entries.values()
    }

    /// The number of entries, including unset sentinels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retains only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&AttrMeta) -> bool) {
        self.entries.retain(|_, meta| keep(meta));
    }

    fn write_entries(&self, f: &mut fmt::Formatter<'_>) -> Result<bool, fmt::Error> {
        let mut any = false;
        for meta in self.entries.values() {
            if meta.attr.is_unset() {
                continue;
            }
            if any {
                write!(f, ", ")?;
            }
            any = true;
            write!(f, "{meta}")?;
        }
        Ok(any)
    }
}

impl FromIterator<AttrMeta> for Namespace {
    fn from_iter<I: IntoIterator<Item = AttrMeta>>(iter: I) -> Self {
        let mut ns = Namespace::default();
        for meta in iter {
            ns.insert(meta);
        }
        ns
    }
}

impl Display for Namespace {
    /// Renders `{a=1, b@2}`. Unset attributes are omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        self.write_entries(f)?;
        write!(f, "}}")
    }
}

/// A session's full attribute table: namespace name to [`Namespace`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    namespaces: BTreeMap<String, Namespace>,
}

impl Table {
    /// The namespace called `ns`, if it has ever been written.
    pub fn namespace(&self, ns: &str) -> Option<&Namespace> {
        self.namespaces.get(ns)
    }

    /// Installs `namespace` under `ns`, replacing any previous contents.
    pub fn install(&mut self, ns: impl Into<String>, namespace: Namespace) {
        self.namespaces.insert(ns.into(), namespace);
    }

    /// A mutable handle on the namespace called `ns`, created on demand.
    pub fn namespace_mut(&mut self, ns: &str) -> &mut Namespace {
        self.namespaces.entry(ns.to_string()).or_default()
    }

    /// Iterates over `(name, namespace)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Namespace)> {
        self.namespaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the table has no namespaces at all.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

impl Display for Table {
    /// Renders `ns1::{a=1} ns2::{b=2}`. Namespaces with nothing to show are
    /// omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut any = false;
        for (name, ns) in &self.namespaces {
            if ns.iter().all(|meta| meta.attr.is_unset()) {
                continue;
            }
            if any {
                write!(f, " ")?;
            }
            any = true;
            write!(f, "{name}::{ns}")?;
        }
        Ok(())
    }
}

/// The record of changes applied by one successful update or clear.
///
/// Renders as `ns::{+a=1, b=2, -c}`: entries in application order, `+`
/// marking attributes created by this very update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    namespace: String,
    rev: Rev,
    entries: Vec<AttrMeta>,
}

impl Diff {
    /// An empty diff for the namespace `ns` at revision `rev`.
    pub fn new(ns: impl Into<String>, rev: Rev) -> Self {
        Diff {
            namespace: ns.into(),
            rev,
            entries: Vec::new(),
        }
    }

    /// The namespace the diff applies to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The revision produced by the update that built this diff.
    pub fn rev(&self) -> Rev {
        self.rev
    }

    /// Appends a changed entry.
    pub fn push(&mut self, meta: AttrMeta) {
        self.entries.push(meta);
    }

    /// Whether the update changed nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The changed entries, in application order.
    pub fn entries(&self) -> &[AttrMeta] {
        &self.entries
    }
}

impl Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{{", self.namespace)?;
        for (index, meta) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            if !meta.attr.value.is_empty() && meta.is_fresh() {
                write!(f, "+")?;
            }
            write!(f, "{meta}")?;
        }
        write!(f, "}}")
    }
}
