use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::core::RenderTarget;
use crate::error::{ChartError, ChartResult};

use super::resize::Disconnect;
use super::{CancelHandle, LifecycleConfig, ResizeCoordinator, Subscription};

type DisposeHook = Box<dyn FnOnce() + 'static>;

struct SharedCoordinator {
    typed: Rc<dyn Any>,
    control: Rc<dyn Disconnect>,
}

struct ScopeInner {
    config: LifecycleConfig,
    closed: Cell<bool>,
    cancelables: RefCell<Vec<CancelHandle>>,
    subscriptions: RefCell<Vec<Subscription>>,
    coordinators: RefCell<IndexMap<TypeId, SharedCoordinator>>,
    dispose_hooks: RefCell<Vec<DisposeHook>>,
}

impl ScopeInner {
    fn teardown(&self) -> bool {
        if self.closed.replace(true) {
            return false;
        }

        let cancelables = std::mem::take(&mut *self.cancelables.borrow_mut());
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        let coordinators = std::mem::take(&mut *self.coordinators.borrow_mut());
        let hooks = std::mem::take(&mut *self.dispose_hooks.borrow_mut());

        debug!(
            cancelables = cancelables.len(),
            subscriptions = subscriptions.len(),
            coordinators = coordinators.len(),
            hooks = hooks.len(),
            "tearing down lifecycle scope"
        );

        for handle in &cancelables {
            handle.cancel();
        }
        for subscription in &subscriptions {
            subscription.unsubscribe();
        }
        for shared in coordinators.values() {
            shared.control.disconnect();
        }
        for hook in hooks {
            hook();
        }
        true
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Lifetime boundary for one consumer of the chart facility.
///
/// Owns every cancellation handle and subscription registered into it plus
/// one shared [`ResizeCoordinator`] per target type. `dispose` releases all of them exactly
/// once; dropping the last clone of an undisposed scope disposes it too.
///
/// Registering after teardown fails with [`ChartError::LifecycleClosed`] and
/// the rejected handle is cancelled on the spot, so nothing outlives the
/// scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("closed", &self.is_closed())
            .field("cancelables", &self.cancelable_count())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl Scope {
    #[must_use]
    pub fn new(config: LifecycleConfig) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                config,
                closed: Cell::new(false),
                cancelables: RefCell::new(Vec::new()),
                subscriptions: RefCell::new(Vec::new()),
                coordinators: RefCell::new(IndexMap::new()),
                dispose_hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> LifecycleConfig {
        self.inner.config
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub fn register_cancelable(&self, handle: CancelHandle) -> ChartResult<CancelHandle> {
        if self.is_closed() {
            handle.cancel();
            return Err(ChartError::LifecycleClosed);
        }
        self.inner.cancelables.borrow_mut().push(handle.clone());
        Ok(handle)
    }

    pub fn register_subscription(&self, subscription: Subscription) -> ChartResult<Subscription> {
        if self.is_closed() {
            subscription.unsubscribe();
            return Err(ChartError::LifecycleClosed);
        }
        self.inner
            .subscriptions
            .borrow_mut()
            .push(subscription.clone());
        Ok(subscription)
    }

    /// Runs `hook` after every handle is released at teardown.
    pub fn on_dispose<F>(&self, hook: F) -> ChartResult<()>
    where
        F: FnOnce() + 'static,
    {
        if self.is_closed() {
            return Err(ChartError::LifecycleClosed);
        }
        self.inner.dispose_hooks.borrow_mut().push(Box::new(hook));
        Ok(())
    }

    /// Drops a settled handle without cancelling it.
    pub fn release_cancelable(&self, handle: &CancelHandle) -> bool {
        let mut cancelables = self.inner.cancelables.borrow_mut();
        let before = cancelables.len();
        cancelables.retain(|entry| !entry.same_handle(handle));
        cancelables.len() != before
    }

    /// Returns this scope's resize coordinator for targets of type `T`.
    ///
    /// Each target type gets its own coordinator, created on first use. After
    /// teardown a fresh, already disconnected coordinator is returned so late
    /// observers stay inert.
    #[must_use]
    pub fn resize_coordinator<T: RenderTarget>(&self) -> Rc<ResizeCoordinator<T>> {
        let coalesce = self.inner.config.coalesce_resize_batches;
        if self.is_closed() {
            let inert = ResizeCoordinator::new(coalesce);
            inert.disconnect();
            return Rc::new(inert);
        }

        let key = TypeId::of::<T>();
        let mut slots = self.inner.coordinators.borrow_mut();
        let existing = slots.get(&key).and_then(|shared| {
            Rc::clone(&shared.typed)
                .downcast::<ResizeCoordinator<T>>()
                .ok()
        });
        if let Some(typed) = existing {
            return typed;
        }

        let coordinator = Rc::new(ResizeCoordinator::<T>::new(coalesce));
        slots.insert(
            key,
            SharedCoordinator {
                typed: Rc::clone(&coordinator) as Rc<dyn Any>,
                control: Rc::clone(&coordinator) as Rc<dyn Disconnect>,
            },
        );
        coordinator
    }

    /// Tears the scope down. Returns `false` when it was already disposed.
    pub fn dispose(&self) -> bool {
        self.inner.teardown()
    }

    #[must_use]
    pub fn cancelable_count(&self) -> usize {
        self.inner.cancelables.borrow().len()
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }
}
