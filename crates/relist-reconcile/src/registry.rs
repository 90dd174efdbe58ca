use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use relist_filler::FillerRotation;
use relist_merge::MergeMode;
use relist_types::{Identifiable, ListItem};

use crate::config::ReconcileConfig;
use crate::error::{FetchError, ReconcileResult};
use crate::fetch::{Cursor, DefaultClassifier, ErrorClassifier, FetchProvider};
use crate::reconciler::{ReconcileOutcome, Reconciler};

/// One [`Reconciler`] per owning context, created on first use.
///
/// Contexts whose fetch reports them gone upstream are evicted and their
/// reconcilers closed, so late results for them are dropped.
pub struct ContextRegistry<C, T> {
    provider: Arc<dyn FetchProvider<C, T>>,
    config: ReconcileConfig,
    fillers: Option<Arc<FillerRotation>>,
    classifier: Arc<dyn ErrorClassifier>,
    reconcilers: RwLock<HashMap<C, Arc<Reconciler<C, T>>>>,
}

impl<C, T> ContextRegistry<C, T>
where
    C: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static,
    T: Identifiable + Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(provider: Arc<dyn FetchProvider<C, T>>, config: ReconcileConfig) -> Self {
        Self {
            provider,
            config,
            fillers: None,
            classifier: Arc::new(DefaultClassifier),
            reconcilers: RwLock::new(HashMap::new()),
        }
    }

    /// Rotation shared by every context created after this call.
    pub fn with_fillers(mut self, fillers: Arc<FillerRotation>) -> Self {
        self.fillers = Some(fillers);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// The reconciler for `context`, creating it if needed.
    pub fn reconciler(&self, context: &C) -> Arc<Reconciler<C, T>> {
        if let Some(existing) = self.read().get(context) {
            return Arc::clone(existing);
        }
        let mut map = self.write();
        let entry = map.entry(context.clone()).or_insert_with(|| {
            debug!(%context, "context registered");
            let mut reconciler = Reconciler::new(context.clone(), self.config.clone())
                .with_classifier(Arc::clone(&self.classifier));
            if let Some(fillers) = &self.fillers {
                reconciler = reconciler.with_fillers(Arc::clone(fillers));
            }
            Arc::new(reconciler)
        });
        Arc::clone(entry)
    }

    /// Current list for `context`; empty if it has never been reconciled.
    pub fn get_list(&self, context: &C) -> Vec<ListItem<T>> {
        self.read()
            .get(context)
            .map(|r| r.snapshot())
            .unwrap_or_default()
    }

    /// Reconcile `context` against an arbitrary fetch.
    pub async fn reconcile<F>(
        &self,
        context: &C,
        fetch: F,
        mode: MergeMode,
    ) -> ReconcileResult<ReconcileOutcome<C, T>>
    where
        F: Future<Output = Result<Vec<T>, FetchError>> + Send,
    {
        let reconciler = self.reconciler(context);
        let result = reconciler.reconcile(fetch, mode).await;
        if matches!(&result, Err(err) if err.is_invalid_context()) {
            self.evict_if_current(context, &reconciler);
        }
        result
    }

    /// Fetch from the provider and reconcile.
    ///
    /// `fetch_latest` asks for the authoritative current state. Otherwise the
    /// next page older than the oldest held entity is requested and merged
    /// without deleting anything; an empty list falls back to the latest.
    pub async fn refresh(
        &self,
        context: &C,
        fetch_latest: bool,
    ) -> ReconcileResult<ReconcileOutcome<C, T>> {
        let cursor = if fetch_latest {
            Cursor::Latest
        } else {
            Cursor::continuing(&self.get_list(context))
        };
        debug!(%context, ?cursor, "refreshing");

        let provider = Arc::clone(&self.provider);
        let owner = context.clone();
        let fetch = async move { provider.fetch(&owner, cursor).await };
        self.reconcile(context, fetch, cursor.merge_mode()).await
    }

    /// Drop `context` and close its reconciler. Returns whether it was held.
    pub fn evict(&self, context: &C) -> bool {
        let removed = self.write().remove(context);
        self.close_evicted(context, removed)
    }

    // A reconciler replaced since the failing call started must survive.
    fn evict_if_current(&self, context: &C, reconciler: &Arc<Reconciler<C, T>>) -> bool {
        let removed = {
            let mut map = self.write();
            match map.get(context) {
                Some(held) if Arc::ptr_eq(held, reconciler) => map.remove(context),
                _ => None,
            }
        };
        self.close_evicted(context, removed)
    }

    fn close_evicted(&self, context: &C, removed: Option<Arc<Reconciler<C, T>>>) -> bool {
        match removed {
            Some(reconciler) => {
                reconciler.close();
                info!(%context, "context evicted");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, context: &C) -> bool {
        self.read().contains_key(context)
    }

    pub fn contexts(&self) -> Vec<C> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<C, Arc<Reconciler<C, T>>>> {
        self.reconcilers
            .read()
            .expect("context registry lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<C, Arc<Reconciler<C, T>>>> {
        self.reconcilers
            .write()
            .expect("context registry lock poisoned")
    }
}
