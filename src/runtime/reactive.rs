use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::ChartResult;
use crate::lifecycle::Subscription;

use super::scheduler::{Runtime, WatchEffect, WatcherId};

type WatchCallback<T> = Box<dyn FnMut(&T) -> ChartResult<()> + 'static>;

struct ReactiveInner<T> {
    value: RefCell<T>,
    runtime: Runtime,
    watchers: RefCell<Vec<(WatcherId, Rc<DeepWatcher<T>>)>>,
}

/// Mutable reactive container.
///
/// Every write schedules the attached watchers on the owning [`Runtime`];
/// watchers compare snapshots structurally, so in-place mutations that leave
/// the value unchanged do not fire callbacks.
pub struct Reactive<T> {
    inner: Rc<ReactiveInner<T>>,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("value", &self.inner.value.borrow())
            .field("watchers", &self.inner.watchers.borrow().len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Reactive<T> {
    #[must_use]
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            inner: Rc::new(ReactiveInner {
                value: RefCell::new(value),
                runtime: runtime.clone(),
                watchers: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.inner.value.borrow())
    }

    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Mutates the value in place.
    pub fn update(&self, mutate: impl FnOnce(&mut T)) {
        mutate(&mut self.inner.value.borrow_mut());
        self.notify();
    }

    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    /// Deep-watches the value; `callback` runs during the next settling cycle
    /// in which the value differs from the last observed snapshot.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) -> ChartResult<()> + 'static,
    {
        let id = self.inner.runtime.next_watcher_id();
        let watcher = Rc::new(DeepWatcher {
            source: Rc::downgrade(&self.inner),
            last_seen: RefCell::new(self.get()),
            callback: RefCell::new(Box::new(callback)),
            active: Cell::new(true),
        });
        self.inner
            .watchers
            .borrow_mut()
            .push((id, Rc::clone(&watcher)));

        let source = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            watcher.active.set(false);
            if let Some(source) = source.upgrade() {
                source
                    .watchers
                    .borrow_mut()
                    .retain(|(watcher_id, _)| *watcher_id != id);
            }
        })
    }

    fn notify(&self) {
        let watchers = self.inner.watchers.borrow().clone();
        for (id, watcher) in watchers {
            self.inner
                .runtime
                .queue_watcher(id, watcher as Rc<dyn WatchEffect>);
        }
    }
}

struct DeepWatcher<T> {
    source: Weak<ReactiveInner<T>>,
    last_seen: RefCell<T>,
    callback: RefCell<WatchCallback<T>>,
    active: Cell<bool>,
}

impl<T: Clone + PartialEq + 'static> WatchEffect for DeepWatcher<T> {
    fn run(&self) -> ChartResult<()> {
        if !self.active.get() {
            return Ok(());
        }
        let Some(source) = self.source.upgrade() else {
            return Ok(());
        };
        let current = source.value.borrow().clone();
        if *self.last_seen.borrow() == current {
            return Ok(());
        }
        *self.last_seen.borrow_mut() = current.clone();
        (self.callback.borrow_mut())(&current)
    }
}

/// Value a consumer hands in: either a plain constant or a reactive container.
pub enum Source<T> {
    Plain(T),
    Reactive(Reactive<T>),
}

impl<T: Clone> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Plain(value) => Self::Plain(value.clone()),
            Self::Reactive(reactive) => Self::Reactive(reactive.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Self::Reactive(reactive) => f.debug_tuple("Reactive").field(reactive).finish(),
        }
    }
}

impl<T> From<T> for Source<T> {
    fn from(value: T) -> Self {
        Self::Plain(value)
    }
}

impl<T> From<Reactive<T>> for Source<T> {
    fn from(reactive: Reactive<T>) -> Self {
        Self::Reactive(reactive)
    }
}

impl<T: Clone + PartialEq + 'static> Source<T> {
    #[must_use]
    pub fn read_current(&self) -> T {
        match self {
            Self::Plain(value) => value.clone(),
            Self::Reactive(reactive) => reactive.get(),
        }
    }

    #[must_use]
    pub fn is_reactive(&self) -> bool {
        matches!(self, Self::Reactive(_))
    }

    /// Plain sources never change, so their subscription is inert.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) -> ChartResult<()> + 'static,
    {
        match self {
            Self::Plain(_) => Subscription::noop(),
            Self::Reactive(reactive) => reactive.watch(callback),
        }
    }
}
