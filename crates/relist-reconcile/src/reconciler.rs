use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use relist_diff::{diff, ListDiff};
use relist_filler::FillerRotation;
use relist_merge::{merge, MergeMode};
use relist_types::{Identifiable, ListItem};

use crate::config::ReconcileConfig;
use crate::error::{FetchError, ReconcileError, ReconcileResult};
use crate::fetch::{DefaultClassifier, ErrorClassifier, FailureClass};

/// Stage of the newest reconciliation of a context. Returns to `Idle`
/// after a publish or a failed fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    #[default]
    Idle,
    Fetching,
    Merging,
    Diffing,
    Published,
}

/// A published list snapshot and the diff that produced it.
#[derive(Clone, Debug)]
pub struct Publication<C, T> {
    pub context: C,
    pub generation: u64,
    pub diff: Arc<ListDiff>,
    pub items: Arc<[ListItem<T>]>,
}

/// Why a finished reconciliation was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    /// A later reconciliation has already published.
    Superseded,
    /// The reconciler was closed while the fetch was in flight.
    Closed,
}

#[derive(Clone, Debug)]
pub enum ReconcileOutcome<C, T> {
    Published(Publication<C, T>),
    Discarded { generation: u64, reason: DiscardReason },
}

impl<C, T> ReconcileOutcome<C, T> {
    pub fn publication(&self) -> Option<&Publication<C, T>> {
        match self {
            Self::Published(p) => Some(p),
            Self::Discarded { .. } => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded { .. })
    }

    pub fn generation(&self) -> u64 {
        match self {
            Self::Published(p) => p.generation,
            Self::Discarded { generation, .. } => *generation,
        }
    }
}

struct ListState<T> {
    items: Vec<ListItem<T>>,
    published_generation: u64,
    phase: ReconcilePhase,
    phase_generation: u64,
}

/// Owns the ordered list of one context and serializes its mutations.
///
/// Every call to [`Reconciler::reconcile`] takes the next generation number
/// before it awaits its fetch. A result is applied only if no newer
/// generation has published in the meantime, so late responses cannot
/// overwrite fresher data. Merging works on a private copy of the list that
/// is swapped in together with the published diff, so the list handed to
/// renderers always matches the last diff they received.
pub struct Reconciler<C, T> {
    context: C,
    config: ReconcileConfig,
    fillers: Option<Arc<FillerRotation>>,
    classifier: Arc<dyn ErrorClassifier>,
    next_generation: AtomicU64,
    closed: AtomicBool,
    state: Mutex<ListState<T>>,
    publisher: broadcast::Sender<Publication<C, T>>,
}

impl<C, T> Reconciler<C, T>
where
    C: Clone + fmt::Display + Send + Sync + 'static,
    T: Identifiable + Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(context: C, config: ReconcileConfig) -> Self {
        let (publisher, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            context,
            config,
            fillers: None,
            classifier: Arc::new(DefaultClassifier),
            next_generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            state: Mutex::new(ListState {
                items: Vec::new(),
                published_generation: 0,
                phase: ReconcilePhase::Idle,
                phase_generation: 0,
            }),
            publisher,
        }
    }

    /// Share a filler rotation with this context.
    pub fn with_fillers(mut self, fillers: Arc<FillerRotation>) -> Self {
        self.fillers = Some(fillers);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Copy of the currently published list.
    pub fn snapshot(&self) -> Vec<ListItem<T>> {
        self.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.lock().phase
    }

    /// Generation of the last applied reconciliation, `0` before the first.
    pub fn published_generation(&self) -> u64 {
        self.lock().published_generation
    }

    /// Highest generation handed out so far.
    pub fn latest_generation(&self) -> u64 {
        self.next_generation.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Publication<C, T>> {
        self.publisher.subscribe()
    }

    /// Stop accepting reconciliations. In-flight results are discarded when
    /// they arrive.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(context = %self.context, "reconciler closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Await `fetch`, fold its rows into the list, and publish the diff.
    ///
    /// Fetch failures leave the list untouched and come back classified:
    /// [`ReconcileError::InvalidContext`] when the context is gone upstream,
    /// [`ReconcileError::Fetch`] otherwise.
    pub async fn reconcile<F>(
        &self,
        fetch: F,
        mode: MergeMode,
    ) -> ReconcileResult<ReconcileOutcome<C, T>>
    where
        F: Future<Output = Result<Vec<T>, FetchError>> + Send,
    {
        if self.is_closed() {
            return Err(ReconcileError::Closed(self.context.to_string()));
        }
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.enter(generation, ReconcilePhase::Fetching);
        debug!(context = %self.context, generation, ?mode, "reconcile started");

        let fresh: Vec<ListItem<T>> = match fetch.await {
            Ok(rows) => rows.into_iter().map(ListItem::Entity).collect(),
            Err(err) => {
                let mut state = self.lock();
                if let Some(outcome) = self.discard_if_stale(&state, generation) {
                    return Ok(outcome);
                }
                self.enter_locked(&mut state, generation, ReconcilePhase::Idle);
                drop(state);
                return Err(self.classify(err));
            }
        };

        loop {
            let (basis, before, after, shown) = {
                let mut state = self.lock();
                if let Some(outcome) = self.discard_if_stale(&state, generation) {
                    return Ok(outcome);
                }
                self.enter_locked(&mut state, generation, ReconcilePhase::Merging);
                let (after, shown) = self.prepare(&state.items, fresh.clone(), mode);
                self.enter_locked(&mut state, generation, ReconcilePhase::Diffing);
                (state.published_generation, state.items.clone(), after, shown)
            };

            let (after, diff) = self.compute_diff(before, after).await?;

            let mut state = self.lock();
            if let Some(outcome) = self.discard_if_stale(&state, generation) {
                return Ok(outcome);
            }
            if state.published_generation != basis {
                // An older generation published while we diffed; redo the
                // merge on top of it.
                debug!(context = %self.context, generation, "list moved during diff, re-merging");
                continue;
            }

            state.items = after;
            state.published_generation = generation;
            // Fillers count as consumed only once a list showing them is out.
            if let Some(fillers) = &self.fillers {
                fillers.rotate(shown);
            }
            self.enter_locked(&mut state, generation, ReconcilePhase::Published);
            let publication = Publication {
                context: self.context.clone(),
                generation,
                diff: Arc::new(diff),
                items: state.items.clone().into(),
            };
            drop(state);

            info!(
                context = %self.context,
                generation,
                len = publication.items.len(),
                ops = publication.diff.len(),
                "list published"
            );
            // No subscribers is not an error.
            let _ = self.publisher.send(publication.clone());
            self.enter(generation, ReconcilePhase::Idle);
            return Ok(ReconcileOutcome::Published(publication));
        }
    }

    /// Merge `fresh` into a copy of `current` and place fillers without
    /// advancing the rotation. Returns the list and the fillers placed.
    fn prepare(
        &self,
        current: &[ListItem<T>],
        fresh: Vec<ListItem<T>>,
        mode: MergeMode,
    ) -> (Vec<ListItem<T>>, usize) {
        let mut next = current.to_vec();
        if let Some(fillers) = &self.fillers {
            fillers.strip(&mut next);
        }
        let report = merge(&mut next, fresh, mode, self.config.order);
        let shown = match &self.fillers {
            Some(fillers) if self.config.interleave_fillers => fillers.place(&mut next).consumed(),
            _ => 0,
        };
        debug!(
            context = %self.context,
            inserted = report.inserted,
            updated = report.updated,
            removed = report.removed,
            fillers = shown,
            "merged"
        );
        (next, shown)
    }

    async fn compute_diff(
        &self,
        before: Vec<ListItem<T>>,
        after: Vec<ListItem<T>>,
    ) -> ReconcileResult<(Vec<ListItem<T>>, ListDiff)> {
        if !self.config.offload_diff {
            let d = diff(&before, &after);
            return Ok((after, d));
        }
        tokio::task::spawn_blocking(move || {
            let d = diff(&before, &after);
            (after, d)
        })
        .await
        .map_err(|e| ReconcileError::Worker(e.to_string()))
    }

    fn discard_if_stale(
        &self,
        state: &ListState<T>,
        generation: u64,
    ) -> Option<ReconcileOutcome<C, T>> {
        let reason = if self.is_closed() {
            DiscardReason::Closed
        } else if state.published_generation > generation {
            DiscardReason::Superseded
        } else {
            return None;
        };
        debug!(
            context = %self.context,
            generation,
            published = state.published_generation,
            ?reason,
            "stale result discarded"
        );
        Some(ReconcileOutcome::Discarded { generation, reason })
    }

    fn classify(&self, err: FetchError) -> ReconcileError {
        match self.classifier.classify(&err) {
            FailureClass::InvalidContext => {
                warn!(context = %self.context, %err, "context no longer exists upstream");
                ReconcileError::InvalidContext {
                    context: self.context.to_string(),
                    source: err,
                }
            }
            FailureClass::Transient => {
                debug!(context = %self.context, %err, "fetch failed");
                ReconcileError::Fetch(err)
            }
        }
    }

    fn enter(&self, generation: u64, phase: ReconcilePhase) {
        let mut state = self.lock();
        self.enter_locked(&mut state, generation, phase);
    }

    // Only the newest generation drives the reported phase.
    fn enter_locked(&self, state: &mut ListState<T>, generation: u64, phase: ReconcilePhase) {
        if generation >= state.phase_generation {
            state.phase = phase;
            state.phase_generation = generation;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState<T>> {
        self.state.lock().expect("reconciler state lock poisoned")
    }
}
