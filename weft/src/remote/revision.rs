use async_trait::async_trait;
use tracing::debug;
use weft_base::Ref;

use crate::{
    attrs::{validate_namespace, Attr},
    error::Error,
    remote::cache::RemoteCache,
    revision::{BoxRevision, Revision},
    table::{AttrMeta, Namespace},
};

/// A revision of a session owned by another peer.
///
/// The revision carries the ref it was handed out at and answers reads from
/// the peer's [`RemoteCache`]. The cache is free to be behind or ahead; the
/// read contract bounds what may be returned:
///
/// 1. A frozen attribute cached at or after the bound revision is returned
///    immediately, since frozen values are permanent.
/// 2. An attribute cached at exactly the bound revision is returned.
/// 3. Otherwise the owning peer is fetched and the reply merged forward
///    into the cache (never backward); the merged snapshot is then the best
///    consistent view available and is served as a whole.
/// 4. A session reported gone by its owning peer reads as
///    [`Error::NotFound`], and the cache remembers that without
///    re-fetching.
///
/// Handlers therefore never observe a torn mix of attribute states across
/// revisions.
#[derive(Debug, Clone)]
pub struct RemoteRevision {
    cache: RemoteCache,
    at: Ref,
}

impl RemoteRevision {
    pub(crate) fn new(cache: RemoteCache, at: Ref) -> Self {
        RemoteRevision { cache, at }
    }

    async fn read(&self, ns: &str, keys: &[&str]) -> Result<Namespace, Error> {
        let entry = self.cache.entry(self.at.id);
        let mut state = entry.lock().await;

        if state.is_closed() {
            return Err(Error::NotFound { id: self.at.id });
        }
        if let Some(attrs) = state.try_serve(self.at.rev, ns, keys, false) {
            return Ok(attrs);
        }

        let fetched = self.cache.call(self.cache.client().fetch(self.at.id, ns, keys));
        match fetched.await {
            Ok((at, attrs)) => {
                let mut attrs: Namespace = attrs.into_iter().collect();
                // Record requested keys the reply omitted as explicitly
                // unset, so the next read at this revision hits the cache.
                for key in keys {
                    if attrs.get(key).is_none() {
                        attrs.insert(AttrMeta {
                            attr: Attr::unset(*key),
                            created_at: 0,
                            updated_at: 0,
                        });
                    }
                }
                state.merge(at, ns, attrs.iter().cloned().collect());
            }
            Err(err @ Error::NotFound { .. }) => {
                state.close();
                debug!(session = %self.at.id.fmt_short(), "remote session is gone");
                return Err(err);
            }
            Err(err) => return Err(err),
        }

        state
            .try_serve(self.at.rev, ns, keys, true)
            .ok_or(Error::StaleFetch { at: self.at })
    }
}

#[async_trait]
impl Revision for RemoteRevision {
    fn session_ref(&self) -> Ref {
        self.at
    }

    async fn refresh(&self) -> Result<BoxRevision, Error> {
        let entry = self.cache.entry(self.at.id);
        let mut state = entry.lock().await;

        if state.is_closed() {
            return Err(Error::NotFound { id: self.at.id });
        }

        match self.cache.call(self.cache.client().head(self.at.id)).await {
            Ok(at) => {
                state.merge_ref(at);
                Ok(Box::new(self.cache.lookup(state.at())))
            }
            Err(err @ Error::NotFound { .. }) => {
                state.close();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn get(&self, ns: &str, key: &str) -> Result<Attr, Error> {
        let attrs = self.read(ns, &[key]).await?;
        Ok(attrs
            .get(key)
            .map(|meta| meta.attr.clone())
            .unwrap_or_else(|| Attr::unset(key)))
    }

    async fn get_many(&self, ns: &str, keys: &[&str]) -> Result<Namespace, Error> {
        self.read(ns, keys).await
    }

    async fn update(&self, ns: &str, attrs: Vec<Attr>) -> Result<BoxRevision, Error> {
        validate_namespace(ns)?;

        let entry = self.cache.entry(self.at.id);
        let mut state = entry.lock().await;

        if state.is_closed() {
            return Err(Error::NotFound { id: self.at.id });
        }

        match self.cache.call(self.cache.client().update(self.at, ns, attrs)).await {
            Ok((at, changed)) => {
                state.merge(at, ns, changed);
                debug!(session = %at.fmt_short(), namespace = ns, "updated remote session");
                Ok(Box::new(self.cache.lookup(at)))
            }
            Err(err @ Error::NotFound { .. }) => {
                state.close();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn clear(&self, ns: &str) -> Result<BoxRevision, Error> {
        validate_namespace(ns)?;

        let entry = self.cache.entry(self.at.id);
        let mut state = entry.lock().await;

        if state.is_closed() {
            return Err(Error::NotFound { id: self.at.id });
        }

        match self.cache.call(self.cache.client().clear(self.at, ns)).await {
            Ok((at, changed)) => {
                state.merge(at, ns, changed);
                debug!(session = %at.fmt_short(), namespace = ns, "cleared remote session namespace");
                Ok(Box::new(self.cache.lookup(at)))
            }
            Err(err @ Error::NotFound { .. }) => {
                state.close();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn destroy(&self) -> Result<(), Error> {
        let entry = self.cache.entry(self.at.id);
        let mut state = entry.lock().await;

        self.cache.call(self.cache.client().destroy(self.at)).await?;
        state.close();
        debug!(session = %self.at.fmt_short(), "destroyed remote session");
        Ok(())
    }
}
