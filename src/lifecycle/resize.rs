use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::debug;

use crate::core::RenderTarget;

pub type ResizeCallback = Rc<dyn Fn() + 'static>;

struct ObservedTarget<T> {
    element: T,
    on_resize: ResizeCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeStats {
    pub batches: u64,
    pub callbacks: u64,
    pub dropped_after_disconnect: u64,
}

/// Shared size-change observer for every binding of one scope.
///
/// The platform delivers notification batches through [`deliver`]; each
/// changed element that is still observed gets its stored callback invoked.
/// Callbacks hold weak references back to their owner, so the coordinator
/// never keeps an engine instance alive.
///
/// [`deliver`]: ResizeCoordinator::deliver
pub struct ResizeCoordinator<T: RenderTarget> {
    observed: RefCell<Vec<ObservedTarget<T>>>,
    connected: Cell<bool>,
    coalesce: bool,
    stats: Cell<ResizeStats>,
}

impl<T: RenderTarget> fmt::Debug for ResizeCoordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeCoordinator")
            .field("observed", &self.observed_count())
            .field("connected", &self.is_connected())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T: RenderTarget> ResizeCoordinator<T> {
    #[must_use]
    pub fn new(coalesce: bool) -> Self {
        Self {
            observed: RefCell::new(Vec::new()),
            connected: Cell::new(true),
            coalesce,
            stats: Cell::new(ResizeStats::default()),
        }
    }

    /// Starts observing `element`. Re-observing replaces the stored callback.
    ///
    /// Returns `false` once the coordinator is disconnected.
    pub fn observe<F>(&self, element: T, on_resize: F) -> bool
    where
        F: Fn() + 'static,
    {
        if !self.connected.get() {
            debug!("observe ignored on disconnected resize coordinator");
            return false;
        }
        let on_resize: ResizeCallback = Rc::new(on_resize);
        let mut observed = self.observed.borrow_mut();
        match observed
            .iter_mut()
            .find(|entry| entry.element.same_target(&element))
        {
            Some(entry) => entry.on_resize = on_resize,
            None => observed.push(ObservedTarget {
                element,
                on_resize,
            }),
        }
        true
    }

    pub fn unobserve(&self, element: &T) -> bool {
        let mut observed = self.observed.borrow_mut();
        let before = observed.len();
        observed.retain(|entry| !entry.element.same_target(element));
        observed.len() != before
    }

    #[must_use]
    pub fn is_observing(&self, element: &T) -> bool {
        self.observed
            .borrow()
            .iter()
            .any(|entry| entry.element.same_target(element))
    }

    /// Handles one platform notification batch. Returns the number of
    /// callbacks invoked.
    pub fn deliver(&self, changed: &[T]) -> usize {
        let mut stats = self.stats.get();
        if !self.connected.get() {
            stats.dropped_after_disconnect += 1;
            self.stats.set(stats);
            debug!(
                entries = changed.len(),
                "resize batch dropped after disconnect"
            );
            return 0;
        }

        let mut pending: SmallVec<[(T, ResizeCallback); 4]> = SmallVec::new();
        {
            let observed = self.observed.borrow();
            for element in changed {
                if self.coalesce && pending.iter().any(|(seen, _)| seen.same_target(element)) {
                    continue;
                }
                if let Some(entry) = observed
                    .iter()
                    .find(|entry| entry.element.same_target(element))
                {
                    pending.push((entry.element.clone(), Rc::clone(&entry.on_resize)));
                }
            }
        }

        stats.batches += 1;
        let mut invoked = 0;
        for (_, on_resize) in pending {
            // A callback earlier in the batch may have torn the scope down.
            if !self.connected.get() {
                break;
            }
            on_resize();
            invoked += 1;
        }
        stats.callbacks += invoked as u64;
        self.stats.set(stats);
        invoked
    }

    /// Stops all observation. Later batches are dropped.
    pub fn disconnect(&self) {
        if self.connected.replace(false) {
            self.observed.borrow_mut().clear();
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.observed.borrow().len()
    }

    #[must_use]
    pub fn stats(&self) -> ResizeStats {
        self.stats.get()
    }
}

/// Type-erased view the owning scope uses to disconnect its coordinator.
pub(crate) trait Disconnect {
    fn disconnect(&self);
}

impl<T: RenderTarget> Disconnect for ResizeCoordinator<T> {
    fn disconnect(&self) {
        ResizeCoordinator::disconnect(self);
    }
}
