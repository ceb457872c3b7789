use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::{ChartBinding, EngineInstance, RenderEngine, RenderOptions, RenderTarget};
use crate::error::{ChartError, ChartResult};
use crate::lifecycle::{CancelHandle, LifecycleConfig, ResizeCoordinator, Scope};
use crate::runtime::Runtime;

use super::ChartContext;

pub type InitCallback<E> =
    Rc<dyn Fn(&ChartBinding<E>) -> Result<(), <E as RenderEngine>::Error> + 'static>;

/// Counters describing one factory's binding traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FactoryDiagnostics {
    pub live_bindings: usize,
    pub pending_attaches: usize,
    pub instances_created: u64,
    pub bindings_purged: u64,
    pub ignored_attaches: u64,
    pub option_applications: u64,
    pub resize_calls: u64,
}

struct FactoryState<E: RenderEngine> {
    engine: Rc<E>,
    runtime: Runtime,
    scope: Scope,
    config: LifecycleConfig,
    resize: Rc<ResizeCoordinator<E::Target>>,
    baseline: RenderOptions,
    bindings: RefCell<Vec<ChartBinding<E>>>,
    pending: RefCell<Vec<E::Target>>,
    init_callbacks: RefCell<Vec<(u64, InitCallback<E>)>>,
    next_callback_id: Cell<u64>,
    diagnostics: Cell<FactoryDiagnostics>,
}

impl<E: RenderEngine> FactoryState<E> {
    fn bump(&self, update: impl FnOnce(&mut FactoryDiagnostics)) {
        let mut diagnostics = self.diagnostics.get();
        update(&mut diagnostics);
        self.diagnostics.set(diagnostics);
    }

    fn is_bound(&self, element: &E::Target) -> bool {
        self.bindings
            .borrow()
            .iter()
            .any(|binding| binding.is_bound_to(element))
    }

    fn is_pending(&self, element: &E::Target) -> bool {
        self.pending
            .borrow()
            .iter()
            .any(|pending| pending.same_target(element))
    }

    fn handle_attach(self: &Rc<Self>, element: Option<E::Target>) {
        if self.scope.is_closed() {
            debug!("attach ignored after scope teardown");
            return;
        }
        let Some(element) = element else {
            self.bump(|d| d.ignored_attaches += 1);
            debug!("attach ignored: no element");
            return;
        };
        if self.is_bound(&element) || self.is_pending(&element) {
            self.bump(|d| d.ignored_attaches += 1);
            debug!("attach ignored: element already bound");
            return;
        }

        let cancel = match self.scope.register_cancelable(CancelHandle::new()) {
            Ok(cancel) => cancel,
            Err(_) => {
                debug!("attach ignored: scope closed while registering");
                return;
            }
        };
        self.pending.borrow_mut().push(element.clone());

        let state = Rc::downgrade(self);
        self.runtime.queue_post(move || match state.upgrade() {
            Some(state) => state.materialize(element, &cancel),
            None => Ok(()),
        });
    }

    fn materialize(self: &Rc<Self>, element: E::Target, cancel: &CancelHandle) -> ChartResult<()> {
        self.pending
            .borrow_mut()
            .retain(|pending| !pending.same_target(&element));
        self.scope.release_cancelable(cancel);
        if cancel.is_cancelled() || self.scope.is_closed() {
            debug!("deferred attach dropped after cancellation");
            return Ok(());
        }

        self.purge_stale();
        if self.is_bound(&element) {
            return Ok(());
        }
        if self.config.require_attached_on_settle && !element.is_attached() {
            self.bump(|d| d.ignored_attaches += 1);
            debug!("deferred attach skipped: element left the tree before settling");
            return Ok(());
        }

        let instance = self
            .engine
            .create_instance(&element)
            .map_err(ChartError::engine)?;
        let binding = ChartBinding::new(element.clone(), instance);
        self.bindings.borrow_mut().push(binding.clone());
        self.bump(|d| d.instances_created += 1);
        debug!(
            live = self.bindings.borrow().len(),
            "chart instance created"
        );

        let state = Rc::downgrade(self);
        let observed = element.clone();
        self.resize.observe(element, move || {
            if let Some(state) = state.upgrade() {
                state.resize_bound(&observed);
            }
        });

        binding
            .instance_mut()
            .apply_options(&self.baseline)
            .map_err(ChartError::engine)?;
        self.bump(|d| d.option_applications += 1);

        let callbacks: Vec<InitCallback<E>> = self
            .init_callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(&binding).map_err(ChartError::engine)?;
        }
        Ok(())
    }

    fn resize_bound(&self, element: &E::Target) {
        if self.scope.is_closed() || !element.is_attached() {
            return;
        }
        let binding = self
            .bindings
            .borrow()
            .iter()
            .find(|binding| binding.is_bound_to(element))
            .cloned();
        let Some(binding) = binding else {
            trace!("resize ignored: element no longer bound");
            return;
        };
        if let Err(err) = binding.instance_mut().resize() {
            warn!(error = %err, "engine resize failed");
            return;
        }
        self.bump(|d| d.resize_calls += 1);
    }

    fn purge_stale(&self) {
        let stale: Vec<ChartBinding<E>> = {
            let mut bindings = self.bindings.borrow_mut();
            let (live, stale) = bindings.drain(..).partition(ChartBinding::is_live);
            *bindings = live;
            stale
        };
        if stale.is_empty() {
            return;
        }
        debug!(purged = stale.len(), "purging detached chart bindings");
        for binding in &stale {
            self.release(binding, self.config.dispose_stale_instances);
        }
        self.bump(|d| d.bindings_purged += stale.len() as u64);
    }

    fn release(&self, binding: &ChartBinding<E>, dispose: bool) {
        self.resize.unobserve(binding.element());
        if !dispose {
            return;
        }
        match binding.instance().try_borrow_mut() {
            Ok(mut instance) => instance.dispose(),
            Err(_) => warn!("engine instance busy during release; dispose skipped"),
        }
    }

    fn live_bindings(&self) -> Vec<ChartBinding<E>> {
        self.purge_stale();
        self.bindings.borrow().clone()
    }

    fn set_option(&self, options: &RenderOptions) -> Result<(), E::Error> {
        if self.scope.is_closed() {
            return Ok(());
        }
        for binding in self.live_bindings() {
            trace!("applying chart options");
            binding.instance_mut().apply_options(options)?;
            self.bump(|d| d.option_applications += 1);
        }
        Ok(())
    }

    fn teardown(&self) {
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        self.pending.borrow_mut().clear();
        self.init_callbacks.borrow_mut().clear();
        debug!(bindings = bindings.len(), "releasing chart bindings");
        for binding in &bindings {
            self.release(binding, self.config.dispose_on_teardown);
        }
    }
}

impl<E: RenderEngine> Drop for FactoryState<E> {
    fn drop(&mut self) {
        let bindings = std::mem::take(self.bindings.get_mut());
        if bindings.is_empty() {
            return;
        }
        debug!(
            bindings = bindings.len(),
            "releasing bindings of a dropped chart factory"
        );
        for binding in &bindings {
            self.release(binding, self.config.dispose_on_teardown);
        }
    }
}

/// Creates at most one engine instance per rendering target and keeps the
/// resulting bindings in sync with the visible tree.
///
/// Clones share the same binding list.
pub struct ChartFactory<E: RenderEngine> {
    state: Rc<FactoryState<E>>,
}

impl<E: RenderEngine> Clone for ChartFactory<E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<E: RenderEngine> fmt::Debug for ChartFactory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartFactory")
            .field("diagnostics", &self.diagnostics())
            .finish_non_exhaustive()
    }
}

/// Creates a chart factory whose instances start from `baseline`.
#[must_use]
pub fn create_chart<E: RenderEngine>(cx: &ChartContext<E>, baseline: RenderOptions) -> ChartFactory<E> {
    let scope = cx.scope().clone();
    let state = Rc::new(FactoryState {
        engine: Rc::clone(cx.engine()),
        runtime: cx.runtime().clone(),
        config: scope.config(),
        resize: scope.resize_coordinator::<E::Target>(),
        scope: scope.clone(),
        baseline,
        bindings: RefCell::new(Vec::new()),
        pending: RefCell::new(Vec::new()),
        init_callbacks: RefCell::new(Vec::new()),
        next_callback_id: Cell::new(0),
        diagnostics: Cell::new(FactoryDiagnostics::default()),
    });

    let weak = Rc::downgrade(&state);
    if scope
        .on_dispose(move || {
            if let Some(state) = weak.upgrade() {
                state.teardown();
            }
        })
        .is_err()
    {
        debug!("chart created on a closed scope; attach requests will be ignored");
    }

    ChartFactory { state }
}

impl<E: RenderEngine> ChartFactory<E> {
    /// Placeholder the host materializes into a real element.
    ///
    /// The placeholder keeps the factory alive, so attaches keep working after
    /// the consumer drops its own handles.
    #[must_use]
    pub fn attach_target(&self) -> TargetPlaceholder<E::Target> {
        let state = Rc::clone(&self.state);
        TargetPlaceholder {
            on_attach: Rc::new(move |element: Option<E::Target>| {
                state.handle_attach(element);
            }),
        }
    }

    /// Registers `callback` to run once for every binding created from now on.
    pub fn on_init<F>(&self, callback: F) -> InitRegistration<E>
    where
        F: Fn(&ChartBinding<E>) -> Result<(), E::Error> + 'static,
    {
        let id = self.state.next_callback_id.get();
        self.state.next_callback_id.set(id + 1);
        let callback: InitCallback<E> = Rc::new(callback);
        self.state.init_callbacks.borrow_mut().push((id, callback));
        InitRegistration {
            state: Rc::downgrade(&self.state),
            id,
        }
    }

    /// Applies `options` to every live instance in binding order.
    ///
    /// Engine failures are returned unchanged; instances after the failing
    /// one are not updated.
    pub fn set_option(&self, options: &RenderOptions) -> Result<(), E::Error> {
        self.state.set_option(options)
    }

    /// Live bindings after dropping the ones whose element left the tree.
    #[must_use]
    pub fn bindings(&self) -> Vec<ChartBinding<E>> {
        self.state.live_bindings()
    }

    /// Explicit detach notification for hosts that report removal directly.
    ///
    /// Returns `true` when a binding for `element` was released.
    pub fn detach(&self, element: &E::Target) -> bool {
        let removed = {
            let mut bindings = self.state.bindings.borrow_mut();
            bindings
                .iter()
                .position(|binding| binding.is_bound_to(element))
                .map(|index| bindings.remove(index))
        };
        self.state.purge_stale();
        match removed {
            Some(binding) => {
                self.state
                    .release(&binding, self.state.config.dispose_stale_instances);
                self.state.bump(|d| d.bindings_purged += 1);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.state.scope
    }

    #[must_use]
    pub fn baseline(&self) -> &RenderOptions {
        &self.state.baseline
    }

    #[must_use]
    pub fn resize_coordinator(&self) -> &Rc<ResizeCoordinator<E::Target>> {
        &self.state.resize
    }

    #[must_use]
    pub fn diagnostics(&self) -> FactoryDiagnostics {
        let mut diagnostics = self.state.diagnostics.get();
        diagnostics.live_bindings = self.state.bindings.borrow().len();
        diagnostics.pending_attaches = self.state.pending.borrow().len();
        diagnostics
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakChartFactory<E> {
        WeakChartFactory {
            state: Rc::downgrade(&self.state),
        }
    }
}

/// Non-owning factory handle for callbacks stored inside the factory itself.
pub struct WeakChartFactory<E: RenderEngine> {
    state: Weak<FactoryState<E>>,
}

impl<E: RenderEngine> Clone for WeakChartFactory<E> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<E: RenderEngine> WeakChartFactory<E> {
    #[must_use]
    pub fn upgrade(&self) -> Option<ChartFactory<E>> {
        self.state.upgrade().map(|state| ChartFactory { state })
    }
}

/// Returned by [`ChartFactory::on_init`].
pub struct InitRegistration<E: RenderEngine> {
    state: Weak<FactoryState<E>>,
    id: u64,
}

impl<E: RenderEngine> InitRegistration<E> {
    /// Returns `false` when the callback was already removed.
    pub fn unregister(&self) -> bool {
        let Some(state) = self.state.upgrade() else {
            return false;
        };
        let mut callbacks = state.init_callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(id, _)| *id != self.id);
        callbacks.len() != before
    }
}

/// Attach point handed to the host before an element exists.
///
/// The host calls [`attach`](Self::attach) every time it (re)materializes the
/// element; repeated calls for a bound element are ignored.
pub struct TargetPlaceholder<T> {
    on_attach: Rc<dyn Fn(Option<T>) + 'static>,
}

impl<T> Clone for TargetPlaceholder<T> {
    fn clone(&self) -> Self {
        Self {
            on_attach: Rc::clone(&self.on_attach),
        }
    }
}

impl<T> fmt::Debug for TargetPlaceholder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetPlaceholder").finish_non_exhaustive()
    }
}

impl<T> TargetPlaceholder<T> {
    pub fn attach(&self, element: Option<T>) {
        (self.on_attach)(element);
    }
}
