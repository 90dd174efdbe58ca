use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use relist_types::{Filler, FillerKind, ListItem};

use crate::config::FillerConfig;
use crate::error::{FillerError, FillerResult};
use crate::source::FillerSource;

/// Where fillers landed during one interleave pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterleaveReport {
    /// Final list positions of the inserted fillers, ascending.
    pub positions: Vec<usize>,
}

impl InterleaveReport {
    /// Number of fillers consumed from the rotation.
    pub fn consumed(&self) -> usize {
        self.positions.len()
    }
}

/// Round-robin queue of filler rows shared by every reconciler.
///
/// All access goes through one coarse [`Mutex`]; the queue is tiny and the
/// lock is never held across an await point.
pub struct FillerRotation {
    config: FillerConfig,
    queue: Mutex<VecDeque<Filler>>,
    loaded: OnceCell<usize>,
}

impl FillerRotation {
    /// Create an empty rotation.
    pub fn new(config: FillerConfig) -> Self {
        Self {
            config,
            queue: Mutex::new(VecDeque::new()),
            loaded: OnceCell::new(),
        }
    }

    /// Create a rotation pre-populated with `fillers`.
    pub fn with_fillers(config: FillerConfig, fillers: impl IntoIterator<Item = Filler>) -> Self {
        let rotation = Self::new(config);
        rotation.lock().extend(fillers);
        rotation
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    /// Populate the rotation from `source`, at most once per rotation.
    ///
    /// Concurrent callers share a single load. A failed load leaves the
    /// rotation unloaded so a later call may try again; a successful load
    /// is never repeated and later calls return the original count.
    pub async fn load(&self, source: &dyn FillerSource) -> FillerResult<usize> {
        let count = self
            .loaded
            .get_or_try_init(|| async {
                let fillers = source.load().await.inspect_err(|err| {
                    warn!(%err, "filler load failed");
                })?;
                let count = fillers.len();
                self.lock().extend(fillers);
                info!(count, "filler rotation loaded");
                Ok::<_, FillerError>(count)
            })
            .await?;
        Ok(*count)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Append a filler at the back of the rotation.
    pub fn push(&self, filler: Filler) {
        self.lock().push_back(filler);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The rotation in its current order, front first.
    pub fn snapshot(&self) -> Vec<Filler> {
        self.lock().iter().cloned().collect()
    }

    /// Move the first `count` fillers to the back, preserving their order.
    pub fn rotate(&self, count: usize) {
        rotate(&mut self.lock(), count);
    }

    /// Drop every filler of `kind` from the rotation. Returns how many were
    /// dropped.
    pub fn remove_kind(&self, kind: FillerKind) -> usize {
        let mut queue = self.lock();
        let before = queue.len();
        queue.retain(|f| f.kind != kind);
        before - queue.len()
    }

    /// Insert fillers into `list` at the configured stride, then advance
    /// the rotation by the number consumed.
    ///
    /// - Empty list or empty rotation: nothing happens.
    /// - `list.len() <= stride`: the front filler is appended and the
    ///   rotation advances by one.
    /// - Otherwise a filler goes in at `stride`, `2 * stride`, ... (below the
    ///   original length), drawing successive fillers until the rotation is
    ///   exhausted; the rotation then advances by the number consumed.
    pub fn interleave<T>(&self, list: &mut Vec<ListItem<T>>) -> InterleaveReport {
        let mut queue = self.lock();
        let report = place(&queue, self.config.stride, list);
        rotate(&mut queue, report.consumed());
        debug!(consumed = report.consumed(), len = list.len(), "fillers interleaved");
        report
    }

    /// Insert fillers exactly like [`interleave`](Self::interleave) but
    /// leave the rotation untouched. Call [`rotate`](Self::rotate) with the
    /// report's count once the list has actually been shown.
    pub fn place<T>(&self, list: &mut Vec<ListItem<T>>) -> InterleaveReport {
        let queue = self.lock();
        place(&queue, self.config.stride, list)
    }

    /// Remove fillers of the configured stripped kinds from `list`. Returns
    /// how many rows were removed.
    pub fn strip<T>(&self, list: &mut Vec<ListItem<T>>) -> usize {
        let before = list.len();
        list.retain(|item| match item {
            ListItem::Filler(f) => !self.config.stripped_kinds.contains(&f.kind),
            _ => true,
        });
        before - list.len()
    }

    /// Strip stale fillers, then interleave fresh ones.
    pub fn refresh<T>(&self, list: &mut Vec<ListItem<T>>) -> InterleaveReport {
        self.strip(list);
        self.interleave(list)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Filler>> {
        self.queue.lock().expect("filler rotation lock poisoned")
    }
}

fn place<T>(
    queue: &VecDeque<Filler>,
    stride: usize,
    list: &mut Vec<ListItem<T>>,
) -> InterleaveReport {
    let mut report = InterleaveReport::default();
    if list.is_empty() || queue.is_empty() {
        return report;
    }

    let stride = stride.max(1);
    let size = list.len();
    if size <= stride {
        list.push(ListItem::Filler(queue[0].clone()));
        report.positions.push(size);
    } else {
        let mut at = stride;
        while at < size && report.positions.len() < queue.len() {
            list.insert(at, ListItem::Filler(queue[report.positions.len()].clone()));
            report.positions.push(at);
            at += stride;
        }
    }
    report
}

fn rotate(queue: &mut VecDeque<Filler>, count: usize) {
    if !queue.is_empty() {
        let len = queue.len();
        queue.rotate_left(count % len);
    }
}
