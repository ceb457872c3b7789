use std::rc::Rc;

use crate::core::RenderEngine;
use crate::lifecycle::{LifecycleConfig, Scope};
use crate::runtime::Runtime;

/// Everything a component setup needs to create charts: the event loop, the
/// consumer's lifecycle scope, and the engine.
pub struct ChartContext<E: RenderEngine> {
    runtime: Runtime,
    scope: Scope,
    engine: Rc<E>,
}

impl<E: RenderEngine> Clone for ChartContext<E> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            scope: self.scope.clone(),
            engine: Rc::clone(&self.engine),
        }
    }
}

impl<E: RenderEngine> ChartContext<E> {
    #[must_use]
    pub fn new(runtime: Runtime, scope: Scope, engine: E) -> Self {
        Self::with_shared_engine(runtime, scope, Rc::new(engine))
    }

    #[must_use]
    pub fn with_shared_engine(runtime: Runtime, scope: Scope, engine: Rc<E>) -> Self {
        Self {
            runtime,
            scope,
            engine,
        }
    }

    /// Fresh runtime and scope around `engine`.
    #[must_use]
    pub fn standalone(engine: E, config: LifecycleConfig) -> Self {
        Self::new(Runtime::new(), Scope::new(config), engine)
    }

    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn engine(&self) -> &Rc<E> {
        &self.engine
    }
}
