use async_trait::async_trait;
use weft_base::Ref;

use crate::{
    attrs::Attr,
    error::Error,
    revision::{BoxRevision, Revision},
    session::Catalog,
    table::{AttrMeta, Namespace, Table},
};

/// A revision of a session owned by the local peer.
///
/// Binds a ref to the owning catalog plus a snapshot of the head table. The
/// catalog only retains the head, so reads at an older revision are served
/// from the head snapshot's metadata: an attribute created after the bound
/// revision reads as unset, and an attribute updated after it cannot be
/// reconstructed and fails with [`Error::StaleFetch`]. Frozen attributes
/// never change, so they are readable at any revision at or after their
/// creation.
#[derive(Debug, Clone)]
pub struct LocalRevision {
    catalog: Catalog,
    at: Ref,
    table: Table,
}

impl LocalRevision {
    pub(crate) fn new(catalog: Catalog, at: Ref, table: Table) -> Self {
        LocalRevision { catalog, at, table }
    }

    fn get_at(&self, ns: &str, key: &str) -> Result<AttrMeta, Error> {
        let unset = |key: &str| AttrMeta {
            attr: Attr::unset(key),
            created_at: 0,
            updated_at: 0,
        };
        if self.at.rev == 0 {
            return Ok(unset(key));
        }
        match self.table.namespace(ns).and_then(|attrs| attrs.get(key)) {
            None => Ok(unset(key)),
            Some(meta) if meta.created_at > self.at.rev => Ok(unset(key)),
            Some(meta) if meta.updated_at > self.at.rev => Err(Error::StaleFetch { at: self.at }),
            Some(meta) => Ok(meta.clone()),
        }
    }
}

#[async_trait]
impl Revision for LocalRevision {
    fn session_ref(&self) -> Ref {
        self.at
    }

    async fn refresh(&self) -> Result<BoxRevision, Error> {
        if self.catalog.is_closed() {
            return Err(Error::NotFound { id: self.at.id });
        }
        Ok(Box::new(self.catalog.head()))
    }

    async fn get(&self, ns: &str, key: &str) -> Result<Attr, Error> {
        Ok(self.get_at(ns, key)?.attr)
    }

    async fn get_many(&self, ns: &str, keys: &[&str]) -> Result<Namespace, Error> {
        keys.iter().map(|key| self.get_at(ns, key)).collect()
    }

    async fn update(&self, ns: &str, attrs: Vec<Attr>) -> Result<BoxRevision, Error> {
        let (rev, _) = self.catalog.try_update(self.at, ns, attrs)?;
        Ok(Box::new(rev))
    }

    async fn clear(&self, ns: &str) -> Result<BoxRevision, Error> {
        let (rev, _) = self.catalog.try_clear(self.at, ns)?;
        Ok(Box::new(rev))
    }

    async fn destroy(&self) -> Result<(), Error> {
        self.catalog.try_destroy(self.at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_base::{PeerId, SessionId};

    fn new_catalog() -> Catalog {
        Catalog::new(SessionId {
            peer: PeerId { clock: 1, rand: 0x0BAD },
            seq: 7,
        })
    }

    #[tokio::test]
    async fn reads_at_old_revisions_follow_metadata() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        let (rev1, _) = catalog
            .try_update(id.at(0), "ns", vec![Attr::set("a", "1")])
            .unwrap();
        let (_rev2, _) = catalog
            .try_update(id.at(1), "ns", vec![Attr::set("a", "2"), Attr::set("b", "x")])
            .unwrap();

        // Through the catalog's eyes, rev1 still exists as a view: `a` was
        // updated after rev 1, `b` did not exist yet.
        let at_rev1 = catalog.at(1).unwrap();
        assert!(matches!(
            at_rev1.get("ns", "a").await,
            Err(Error::StaleFetch { .. })
        ));
        assert!(at_rev1.get("ns", "b").await.unwrap().is_unset());

        // The revision handed out by the first update reads the same way.
        assert_eq!(rev1.session_ref(), id.at(1));

        let head = catalog.head();
        assert_eq!(head.get("ns", "a").await.unwrap(), Attr::set("a", "2"));
        assert_eq!(head.get("ns", "b").await.unwrap(), Attr::set("b", "x"));
    }

    #[tokio::test]
    async fn rev_zero_reads_everything_as_unset() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;
        catalog
            .try_update(id.at(0), "ns", vec![Attr::set("a", "1")])
            .unwrap();

        let at_zero = catalog.at(0).unwrap();
        assert!(at_zero.get("ns", "a").await.unwrap().is_unset());
    }

    #[tokio::test]
    async fn frozen_attributes_are_readable_at_any_later_revision() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        catalog
            .try_update(id.at(0), "ns", vec![Attr::freeze("f", "v")])
            .unwrap();
        catalog
            .try_update(id.at(1), "ns", vec![Attr::set("a", "1")])
            .unwrap();

        let at_rev1 = catalog.at(1).unwrap();
        assert_eq!(at_rev1.get("ns", "f").await.unwrap(), Attr::freeze("f", "v"));
    }

    #[tokio::test]
    async fn update_through_a_revision_uses_its_ref() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;

        let head = catalog.head();
        let next = head.update("ns", vec![Attr::set("a", "1")]).await.unwrap();
        assert_eq!(next.session_ref(), id.at(1));

        // The original revision is now stale.
        let err = head.update("ns", vec![Attr::set("a", "2")]).await.unwrap_err();
        assert!(matches!(err, Error::StaleUpdate { .. }));

        let refreshed = head.refresh().await.unwrap();
        assert_eq!(refreshed.session_ref(), id.at(1));
    }

    #[tokio::test]
    async fn get_many_returns_an_entry_per_key() {
        let catalog = new_catalog();
        let id = catalog.session_ref().id;
        catalog
            .try_update(id.at(0), "ns", vec![Attr::set("a", "1")])
            .unwrap();

        let head = catalog.head();
        let attrs = head.get_many("ns", &["a", "missing"]).await.unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("a").unwrap().attr, Attr::set("a", "1"));
        assert!(attrs.get("missing").unwrap().attr.is_unset());
    }

    #[tokio::test]
    async fn destroy_through_a_revision_checks_the_ref() {
        let catalog = new_catalog();
        let head = catalog.head();

        catalog.try_update(head.session_ref(), "ns", vec![]).unwrap();
        assert!(matches!(
            head.destroy().await,
            Err(Error::StaleUpdate { .. })
        ));

        let head = catalog.head();
        head.destroy().await.unwrap();
        assert!(catalog.is_closed());
    }
}
