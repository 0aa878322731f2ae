use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use weft_base::{MessageId, Ref, Rev, SessionId};

use crate::{
    attrs::{validate_namespace, Attr},
    error::Error,
    session::LocalRevision,
    table::{AttrMeta, Diff, Namespace, Table},
};

/// The authority for one local session's attribute table.
///
/// There is a one-to-one relationship between sessions and catalogs. The
/// catalog is the sole writer of its own ref, table, and message sequence:
/// the revision increments by exactly one on every successful
/// [`try_update`](Catalog::try_update) or [`try_clear`](Catalog::try_clear),
/// and never otherwise. Updates carry the ref the caller computed them
/// against and fail with [`Error::StaleUpdate`] when that ref is no longer
/// current, so concurrent writers cannot clobber changes they have not
/// seen.
///
/// All methods take in-process locks only and never suspend. Handles are
/// cheap to clone and share the same underlying state.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<RwLock<Inner>>,
    done: CancellationToken,
}

struct Inner {
    at: Ref,
    table: Table,
    seq: u32,
}

impl Catalog {
    /// A catalog for the session `id`, starting at revision 0 with an empty
    /// table.
    pub fn new(id: SessionId) -> Self {
        Catalog {
            inner: Arc::new(RwLock::new(Inner {
                at: id.at(0),
                table: Table::default(),
                seq: 0,
            })),
            done: CancellationToken::new(),
        }
    }

    /// The most recent session ref.
    pub fn session_ref(&self) -> Ref {
        self.inner.read().at
    }

    /// Mints a unique message ID at the current ref, along with a consistent
    /// snapshot of the table at that ref.
    pub fn next_message_id(&self) -> (MessageId, Table) {
        let mut inner = self.inner.write();
        inner.seq += 1;
        (inner.at.message(inner.seq), inner.table.clone())
    }

    /// A revision at the current head.
    pub fn head(&self) -> LocalRevision {
        let inner = self.inner.read();
        LocalRevision::new(self.clone(), inner.at, inner.table.clone())
    }

    /// A revision at the revision number `rev`, which must not be newer than
    /// the current ref.
    pub fn at(&self, rev: Rev) -> Result<LocalRevision, Error> {
        let inner = self.inner.read();
        if inner.at.rev < rev {
            return Err(Error::FutureRevision {
                at: inner.at.id.at(rev),
            });
        }
        Ok(LocalRevision::new(
            self.clone(),
            inner.at.id.at(rev),
            inner.table.clone(),
        ))
    }

    /// The current ref and a consistent snapshot of the full table.
    pub fn attrs(&self) -> (Ref, Table) {
        let inner = self.inner.read();
        (inner.at, inner.table.clone())
    }

    /// The current ref and a consistent snapshot of one namespace.
    pub fn attrs_in(&self, ns: &str) -> (Ref, Namespace) {
        let inner = self.inner.read();
        (
            inner.at,
            inner.table.namespace(ns).cloned().unwrap_or_default(),
        )
    }

    /// Adds or updates attributes in the namespace `ns` and returns the new
    /// head revision along with a diff of the changes.
    ///
    /// Fails with [`Error::NotFound`] if the catalog is closed,
    /// [`Error::StaleUpdate`] if `at` is not the current ref, and
    /// [`Error::FrozenAttributes`] if any proposed attribute would change a
    /// frozen one. Failures commit nothing. Every successful call advances
    /// the revision by exactly one, even when nothing changed.
    pub fn try_update(
        &self,
        at: Ref,
        ns: &str,
        attrs: Vec<Attr>,
    ) -> Result<(LocalRevision, Diff), Error> {
        validate_namespace(ns)?;

        let mut inner = self.inner.write();

        if self.done.is_cancelled() {
            return Err(Error::NotFound { id: inner.at.id });
        }
        if at != inner.at {
            return Err(Error::StaleUpdate { at });
        }

        let next = inner.at.rev + 1;
        let mut next_attrs = inner.table.namespace(ns).cloned().unwrap_or_default();
        let mut diff = Diff::new(ns, next);

        for attr in attrs {
            let existing = next_attrs.get(&attr.key);

            if let Some(meta) = existing {
                if attr.value == meta.attr.value && attr.is_frozen == meta.attr.is_frozen {
                    continue;
                }
                if meta.attr.is_frozen {
                    return Err(Error::FrozenAttributes {
                        at,
                        keys: vec![attr.key],
                    });
                }
            } else if attr.is_unset() {
                continue;
            }

            let meta = AttrMeta {
                created_at: existing.map(|meta| meta.created_at).unwrap_or(next),
                updated_at: next,
                attr,
            };
            next_attrs.insert(meta.clone());
            diff.push(meta);
        }

        self.commit(&mut inner, ns, next, next_attrs, &diff);
        Ok((
            LocalRevision::new(self.clone(), inner.at, inner.table.clone()),
            diff,
        ))
    }

    /// Sets every non-empty attribute in the namespace `ns` to the empty
    /// value and returns the new head revision along with a diff.
    ///
    /// The error contract matches [`try_update`](Catalog::try_update); any
    /// frozen non-empty attribute in the namespace aborts the clear.
    pub fn try_clear(&self, at: Ref, ns: &str) -> Result<(LocalRevision, Diff), Error> {
        validate_namespace(ns)?;

        let mut inner = self.inner.write();

        if self.done.is_cancelled() {
            return Err(Error::NotFound { id: inner.at.id });
        }
        if at != inner.at {
            return Err(Error::StaleUpdate { at });
        }

        let next = inner.at.rev + 1;
        let mut next_attrs = Namespace::default();
        let mut diff = Diff::new(ns, next);

        if let Some(attrs) = inner.table.namespace(ns) {
            for meta in attrs.iter() {
                let mut meta = meta.clone();
                if !meta.attr.value.is_empty() {
                    if meta.attr.is_frozen {
                        return Err(Error::FrozenAttributes {
                            at,
                            keys: vec![meta.attr.key],
                        });
                    }
                    meta.attr.value = String::new();
                    meta.updated_at = next;
                    diff.push(meta.clone());
                }
                next_attrs.insert(meta);
            }
        }

        self.commit(&mut inner, ns, next, next_attrs, &diff);
        Ok((
            LocalRevision::new(self.clone(), inner.at, inner.table.clone()),
            diff,
        ))
    }

    fn commit(&self, inner: &mut Inner, ns: &str, next: Rev, next_attrs: Namespace, diff: &Diff) {
        inner.at.rev = next;
        inner.seq = 0;

        if !diff.is_empty() {
            inner.table.install(ns, next_attrs);
        }

        debug!(
            session = %inner.at.fmt_short(),
            diff = %diff,
            "session updated",
        );
    }

    /// Closes the catalog if `at` is the current ref. Closing an
    /// already-closed catalog is not an error.
    pub fn try_destroy(&self, at: Ref) -> Result<(), Error> {
        let inner = self.inner.write();

        if at != inner.at {
            return Err(Error::StaleUpdate { at });
        }

        if !self.done.is_cancelled() {
            self.done.cancel();
            debug!(session = %inner.at.fmt_short(), "session catalog closed");
        }
        Ok(())
    }

    /// Forcibly closes the catalog, preventing further updates. Idempotent.
    pub fn close(&self) {
        let inner = self.inner.read();
        if !self.done.is_cancelled() {
            self.done.cancel();
            debug!(session = %inner.at.fmt_short(), "session catalog closed");
        }
    }

    /// Whether the catalog has been closed.
    pub fn is_closed(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Waits until the catalog is closed.
    pub async fn closed(&self) {
        self.done.cancelled().await
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("ref", &self.session_ref())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::Revision;

    fn new_catalog() -> Catalog {
        Catalog::new(SessionId {
            peer: weft_base::PeerId { clock: 1, rand: 0x0BAD },
            seq: 7,
        })
    }

    #[test]
    fn update_advances_and_checks_ref() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        let (rev, diff) = catalog
            .try_update(id.at(0), "ns", vec![Attr::set("a", "1")])
            .unwrap();
        assert_eq!(rev.session_ref(), id.at(1));
        assert_eq!(diff.to_string(), "ns::{+a=1}");

        // A second writer still holding ref@0 must be told it raced.
        let err = catalog
            .try_update(id.at(0), "ns", vec![Attr::set("a", "2")])
            .unwrap_err();
        assert!(matches!(err, Error::StaleUpdate { at } if at == id.at(0)));
        assert_eq!(catalog.session_ref(), id.at(1));

        let (rev, diff) = catalog
            .try_update(id.at(1), "ns", vec![Attr::set("a", "2")])
            .unwrap();
        assert_eq!(rev.session_ref(), id.at(2));
        assert_eq!(diff.to_string(), "ns::{a=2}");
    }

    #[test]
    fn frozen_attributes_abort_with_the_offending_key() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        catalog
            .try_update(id.at(0), "ns", vec![Attr::freeze("x", "v")])
            .unwrap();

        let err = catalog
            .try_update(id.at(1), "ns", vec![Attr::set("x", "w")])
            .unwrap_err();
        match err {
            Error::FrozenAttributes { at, keys } => {
                assert_eq!(at, id.at(1));
                assert_eq!(keys, vec!["x".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The failed update must not commit anything.
        assert_eq!(catalog.session_ref(), id.at(1));
        let (_, attrs) = catalog.attrs_in("ns");
        assert_eq!(attrs.get("x").unwrap().attr, Attr::freeze("x", "v"));

        // Re-proposing the identical frozen value is a no-op, not an error.
        let (rev, diff) = catalog
            .try_update(id.at(1), "ns", vec![Attr::freeze("x", "v")])
            .unwrap();
        assert_eq!(rev.session_ref(), id.at(2));
        assert!(diff.is_empty());
    }

    #[test]
    fn empty_update_still_advances() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        let (rev, diff) = catalog.try_update(id.at(0), "ns", vec![]).unwrap();
        assert!(diff.is_empty());
        assert_eq!(rev.session_ref(), id.at(1));
        assert!(catalog.attrs().1.is_empty());
    }

    #[test]
    fn clear_empties_non_frozen_values() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        catalog
            .try_update(
                id.at(0),
                "ns",
                vec![Attr::set("a", "1"), Attr::set("b", "")],
            )
            .unwrap();

        let (rev, diff) = catalog.try_clear(id.at(1), "ns").unwrap();
        assert_eq!(rev.session_ref(), id.at(2));
        assert_eq!(diff.to_string(), "ns::{-a}");

        let (_, attrs) = catalog.attrs_in("ns");
        assert!(attrs.get("a").unwrap().attr.is_unset());
        assert_eq!(attrs.get("a").unwrap().updated_at, 2);
    }

    #[test]
    fn clear_aborts_on_frozen_non_empty() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        catalog
            .try_update(
                id.at(0),
                "ns",
                vec![Attr::set("a", "1"), Attr::freeze("f", "v")],
            )
            .unwrap();

        let err = catalog.try_clear(id.at(1), "ns").unwrap_err();
        assert!(matches!(err, Error::FrozenAttributes { .. }));
        assert_eq!(catalog.session_ref(), id.at(1));
        let (_, attrs) = catalog.attrs_in("ns");
        assert_eq!(attrs.get("a").unwrap().attr, Attr::set("a", "1"));
    }

    #[test]
    fn message_ids_reset_on_revision_advance() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        catalog.try_update(id.at(0), "ns", vec![]).unwrap();
        catalog.try_update(id.at(1), "ns", vec![]).unwrap();
        catalog.try_update(id.at(2), "ns", vec![]).unwrap();

        let (first, _) = catalog.next_message_id();
        let (second, _) = catalog.next_message_id();
        assert_eq!(first, id.at(3).message(1));
        assert_eq!(second, id.at(3).message(2));

        catalog.try_update(id.at(3), "ns", vec![]).unwrap();
        let (after, _) = catalog.next_message_id();
        assert_eq!(after, id.at(4).message(1));
    }

    #[test]
    fn message_ids_are_unique_across_the_catalog_lifetime() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        let mut seen = std::collections::HashSet::new();
        for rev in 0..5u64 {
            for _ in 0..4 {
                let (message_id, _) = catalog.next_message_id();
                assert!(seen.insert(message_id), "duplicate ID {message_id}");
            }
            catalog.try_update(id.at(rev), "ns", vec![]).unwrap();
        }
    }

    #[test]
    fn at_rejects_future_revisions() {
        let catalog = new_catalog();
        assert!(catalog.at(0).is_ok());
        assert!(matches!(
            catalog.at(1),
            Err(Error::FutureRevision { .. })
        ));
    }

    #[test]
    fn closed_catalog_rejects_updates() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        catalog.close();
        catalog.close();

        assert!(matches!(
            catalog.try_update(id.at(0), "ns", vec![Attr::set("a", "1")]),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            catalog.try_clear(id.at(0), "ns"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn try_destroy_checks_ref_and_is_idempotent() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        catalog.try_update(id.at(0), "ns", vec![]).unwrap();

        assert!(matches!(
            catalog.try_destroy(id.at(0)),
            Err(Error::StaleUpdate { .. })
        ));
        assert!(!catalog.is_closed());

        catalog.try_destroy(id.at(1)).unwrap();
        assert!(catalog.is_closed());
        catalog.try_destroy(id.at(1)).unwrap();
    }

    #[test]
    fn reserved_namespaces_are_rejected() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;
        assert!(matches!(
            catalog.try_update(id.at(0), "_session", vec![]),
            Err(Error::InvalidNamespace { .. })
        ));
        assert_eq!(catalog.session_ref(), id.at(0));
    }

    #[test]
    fn concurrent_updates_from_one_ref_admit_exactly_one_winner() {
        let catalog = new_catalog();
        let at = catalog.session_ref();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|n| {
                    let catalog = catalog.clone();
                    scope.spawn(move || {
                        catalog.try_update(at, "ns", vec![Attr::set("winner", n.to_string())])
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let winners = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(winners, 1);
            for result in results {
                if let Err(err) = result {
                    assert!(matches!(err, Error::StaleUpdate { .. }));
                }
            }
        });

        assert_eq!(catalog.session_ref().rev, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Update { stale: bool, attrs: Vec<(u8, u8, bool)> },
            Clear { stale: bool },
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (
                    any::<bool>(),
                    prop::collection::vec((0u8..4, 0u8..4, any::<bool>()), 0..4)
                )
                    .prop_map(|(stale, attrs)| Op::Update { stale, attrs }),
                any::<bool>().prop_map(|stale| Op::Clear { stale }),
            ]
        }

        proptest! {
            // The final revision equals the number of calls that did not
            // fail, regardless of the interleaving of staleness and frozen
            // conflicts.
            #[test]
            fn revision_counts_successful_operations(ops in prop::collection::vec(op_strategy(), 0..24)) {
                let catalog = new_catalog();
                let id = catalog.session_ref().id;
                let mut successes: u64 = 0;

                for op in ops {
                    let current = catalog.session_ref();
                    let result = match op {
                        Op::Update { stale, attrs } => {
                            let at = if stale { id.at(current.rev + 1) } else { current };
                            let attrs = attrs
                                .into_iter()
                                .map(|(k, v, frozen)| {
                                    let key = format!("k{k}");
                                    let value = format!("v{v}");
                                    if frozen {
                                        Attr::freeze(key, value)
                                    } else {
                                        Attr::set(key, value)
                                    }
                                })
                                .collect();
                            catalog.try_update(at, "ns", attrs).map(|_| ())
                        }
                        Op::Clear { stale } => {
                            let at = if stale { id.at(current.rev + 1) } else { current };
                            catalog.try_clear(at, "ns").map(|_| ())
                        }
                    };
                    if result.is_ok() {
                        successes += 1;
                    }
                }

                prop_assert_eq!(catalog.session_ref().rev, successes);
            }

            // Once frozen, an attribute reads back identically forever.
            #[test]
            fn frozen_attributes_never_change(ops in prop::collection::vec(op_strategy(), 0..24)) {
                let catalog = new_catalog();
                let id = catalog.session_ref().id;

                catalog
                    .try_update(id.at(0), "ns", vec![Attr::freeze("pinned", "forever")])
                    .unwrap();

                for op in ops {
                    let current = catalog.session_ref();
                    let _ = match op {
                        Op::Update { attrs, .. } => {
                            let attrs = attrs
                                .into_iter()
                                .map(|(k, v, frozen)| {
                                    let key = if k == 0 { "pinned".to_string() } else { format!("k{k}") };
                                    let value = format!("v{v}");
                                    if frozen {
                                        Attr::freeze(key, value)
                                    } else {
                                        Attr::set(key, value)
                                    }
                                })
                                .collect();
                            catalog.try_update(current, "ns", attrs).map(|_| ())
                        }
                        Op::Clear { .. } => catalog.try_clear(current, "ns").map(|_| ()),
                    };

                    let (_, attrs) = catalog.attrs_in("ns");
                    prop_assert_eq!(
                        &attrs.get("pinned").unwrap().attr,
                        &Attr::freeze("pinned", "forever")
                    );
                }
            }
        }
    }
}
