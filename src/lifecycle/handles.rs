use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Hook = Box<dyn FnOnce() + 'static>;

struct HandleInner {
    done: Cell<bool>,
    hook: RefCell<Option<Hook>>,
}

impl HandleInner {
    fn new(hook: Option<Hook>) -> Rc<Self> {
        Rc::new(Self {
            done: Cell::new(false),
            hook: RefCell::new(hook),
        })
    }

    fn fire(&self) -> bool {
        if self.done.replace(true) {
            return false;
        }
        let hook = self.hook.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        true
    }
}

/// Cancellation handle for deferred work.
///
/// Clones share state. The optional hook runs on the first `cancel` only.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Rc<HandleInner>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelHandle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: HandleInner::new(None),
        }
    }

    #[must_use]
    pub fn with_hook<F>(hook: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            inner: HandleInner::new(Some(Box::new(hook))),
        }
    }

    /// Cancels the handle. Returns `false` when it was already cancelled.
    pub fn cancel(&self) -> bool {
        self.inner.fire()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.done.get()
    }

    #[must_use]
    pub fn same_handle(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Handle for a watch subscription; `unsubscribe` detaches the watcher.
#[derive(Clone)]
pub struct Subscription {
    inner: Rc<HandleInner>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    #[must_use]
    pub fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            inner: HandleInner::new(Some(Box::new(detach))),
        }
    }

    /// Subscription over a source that never changes.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            inner: HandleInner::new(None),
        }
    }

    /// Returns `false` when it was already unsubscribed.
    pub fn unsubscribe(&self) -> bool {
        self.inner.fire()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.inner.done.get()
    }
}
