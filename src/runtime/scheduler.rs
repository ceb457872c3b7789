use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{ChartError, ChartResult};

pub type PostJob = Box<dyn FnOnce() -> ChartResult<()> + 'static>;

/// Ordered identifier handed out to watchers; lower ids flush first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Pre-flush job queued by a reactive value when it changes.
pub(crate) trait WatchEffect {
    fn run(&self) -> ChartResult<()>;
}

#[derive(Default)]
struct SchedulerState {
    pre: BTreeMap<WatcherId, Rc<dyn WatchEffect>>,
    post: VecDeque<PostJob>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeStats {
    pub cycles: u64,
    pub watcher_runs: u64,
    pub post_jobs: u64,
}

struct RuntimeInner {
    state: RefCell<SchedulerState>,
    flushing: Cell<bool>,
    next_watcher_id: Cell<u64>,
    stats: Cell<RuntimeStats>,
}

/// Single-threaded settling-cycle scheduler.
///
/// Reactive changes queue watcher effects (pre-flush, ordered by watcher id,
/// one entry per watcher), deferred work queues post jobs (FIFO). `flush`
/// runs one settling cycle: every queued watcher first, then post jobs, and
/// keeps going until both queues are empty.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("pending_watchers", &self.pending_watchers())
            .field("pending_post_jobs", &self.pending_post_jobs())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                state: RefCell::new(SchedulerState::default()),
                flushing: Cell::new(false),
                next_watcher_id: Cell::new(0),
                stats: Cell::new(RuntimeStats::default()),
            }),
        }
    }

    pub(crate) fn next_watcher_id(&self) -> WatcherId {
        let id = self.inner.next_watcher_id.get();
        self.inner.next_watcher_id.set(id + 1);
        WatcherId(id)
    }

    pub(crate) fn queue_watcher(&self, id: WatcherId, effect: Rc<dyn WatchEffect>) {
        self.inner.state.borrow_mut().pre.entry(id).or_insert(effect);
    }

    /// Defers `job` until the current settling cycle has run its watchers.
    pub fn queue_post<F>(&self, job: F)
    where
        F: FnOnce() -> ChartResult<()> + 'static,
    {
        self.inner.state.borrow_mut().post.push_back(Box::new(job));
    }

    #[must_use]
    pub fn pending_watchers(&self) -> usize {
        self.inner.state.borrow().pre.len()
    }

    #[must_use]
    pub fn pending_post_jobs(&self) -> usize {
        self.inner.state.borrow().post.len()
    }

    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        let state = self.inner.state.borrow();
        !state.pre.is_empty() || !state.post.is_empty()
    }

    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    #[must_use]
    pub fn stats(&self) -> RuntimeStats {
        self.inner.stats.get()
    }

    /// Runs one settling cycle.
    ///
    /// Every queued job runs even when an earlier one fails; the first
    /// failure is returned once the queues are drained. Calling `flush` from
    /// inside a job is a no-op because the outer flush picks up new work.
    pub fn flush(&self) -> ChartResult<()> {
        if self.inner.flushing.replace(true) {
            return Ok(());
        }
        let _flushing = FlushingGuard(&self.inner.flushing);

        let mut stats = self.inner.stats.get();
        stats.cycles += 1;
        let mut first_error: Option<ChartError> = None;

        loop {
            let next_watcher = self.inner.state.borrow_mut().pre.pop_first();
            if let Some((id, effect)) = next_watcher {
                trace!(watcher = id.get(), "running watcher");
                stats.watcher_runs += 1;
                record_failure(&mut first_error, effect.run());
                continue;
            }

            let next_post = self.inner.state.borrow_mut().post.pop_front();
            if let Some(job) = next_post {
                stats.post_jobs += 1;
                record_failure(&mut first_error, job());
                continue;
            }

            break;
        }

        self.inner.stats.set(stats);

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Clears the flushing flag even when a job unwinds.
struct FlushingGuard<'a>(&'a Cell<bool>);

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn record_failure(slot: &mut Option<ChartError>, result: ChartResult<()>) {
    if let Err(err) = result {
        if slot.is_none() {
            *slot = Some(err);
        } else {
            debug!(error = %err, "additional job failure during flush");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{Runtime, WatchEffect};
    use crate::error::{ChartError, ChartResult};

    struct Recorder {
        label: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl WatchEffect for Recorder {
        fn run(&self) -> ChartResult<()> {
            self.log.borrow_mut().push(self.label);
            Ok(())
        }
    }

    #[test]
    fn watchers_run_in_id_order_before_post_jobs() {
        let runtime = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = runtime.next_watcher_id();
        let second = runtime.next_watcher_id();

        let post_log = Rc::clone(&log);
        runtime.queue_post(move || {
            post_log.borrow_mut().push("post");
            Ok(())
        });
        runtime.queue_watcher(
            second,
            Rc::new(Recorder {
                label: "second",
                log: Rc::clone(&log),
            }),
        );
        runtime.queue_watcher(
            first,
            Rc::new(Recorder {
                label: "first",
                log: Rc::clone(&log),
            }),
        );

        runtime.flush().expect("flush");
        assert_eq!(*log.borrow(), vec!["first", "second", "post"]);
        assert!(!runtime.has_pending_work());
    }

    #[test]
    fn watcher_is_queued_once_per_cycle() {
        let runtime = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = runtime.next_watcher_id();
        for _ in 0..3 {
            runtime.queue_watcher(
                id,
                Rc::new(Recorder {
                    label: "w",
                    log: Rc::clone(&log),
                }),
            );
        }

        assert_eq!(runtime.pending_watchers(), 1);
        runtime.flush().expect("flush");
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn flush_drains_all_jobs_and_reports_first_failure() {
        let runtime = Runtime::new();
        let ran = Rc::new(RefCell::new(0));

        runtime.queue_post(|| Err(ChartError::InvalidConfig("first".to_owned())));
        let counter = Rc::clone(&ran);
        runtime.queue_post(move || {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        runtime.queue_post(|| Err(ChartError::InvalidConfig("second".to_owned())));

        let err = runtime.flush().expect_err("first failure surfaces");
        assert_eq!(err.to_string(), "invalid config: first");
        assert_eq!(*ran.borrow(), 1);
        assert_eq!(runtime.pending_post_jobs(), 0);
    }

    #[test]
    fn runtime_recovers_after_panicking_job() {
        let runtime = Runtime::new();
        runtime.queue_post(|| panic!("transform failed"));
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| runtime.flush()));
        assert!(unwound.is_err());
        assert!(!runtime.is_flushing());

        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        runtime.queue_post(move || {
            *flag.borrow_mut() = true;
            Ok(())
        });
        runtime.flush().expect("flush");
        assert!(*ran.borrow());
    }

    #[test]
    fn post_jobs_queued_during_flush_run_in_same_cycle() {
        let runtime = Runtime::new();
        let ran = Rc::new(RefCell::new(false));

        let nested_runtime = runtime.clone();
        let flag = Rc::clone(&ran);
        runtime.queue_post(move || {
            nested_runtime.queue_post(move || {
                *flag.borrow_mut() = true;
                Ok(())
            });
            nested_runtime.flush()
        });

        runtime.flush().expect("flush");
        assert!(*ran.borrow());
        assert_eq!(runtime.stats().cycles, 1);
    }
}
