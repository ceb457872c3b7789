use std::fmt;
use std::rc::Rc;

use super::{ChartBinding, RenderEngine, RenderOptions};

pub type OptionTransformFn<P, E> = Rc<dyn Fn(&P, &[ChartBinding<E>]) -> RenderOptions + 'static>;

/// Baseline options plus a pure transform from payload to options.
///
/// Clones share the same transform; the template itself never changes after
/// construction.
pub struct OptionTemplate<P, E: RenderEngine> {
    baseline: RenderOptions,
    transform: OptionTransformFn<P, E>,
}

impl<P, E: RenderEngine> Clone for OptionTemplate<P, E> {
    fn clone(&self) -> Self {
        Self {
            baseline: self.baseline.clone(),
            transform: Rc::clone(&self.transform),
        }
    }
}

impl<P, E: RenderEngine> fmt::Debug for OptionTemplate<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionTemplate")
            .field("baseline", &self.baseline)
            .finish_non_exhaustive()
    }
}

impl<P, E: RenderEngine> OptionTemplate<P, E> {
    #[must_use]
    pub fn new<F>(baseline: RenderOptions, transform: F) -> Self
    where
        F: Fn(&P, &[ChartBinding<E>]) -> RenderOptions + 'static,
    {
        Self {
            baseline,
            transform: Rc::new(transform),
        }
    }

    #[must_use]
    pub fn baseline(&self) -> &RenderOptions {
        &self.baseline
    }

    #[must_use]
    pub fn transform(&self, payload: &P, bindings: &[ChartBinding<E>]) -> RenderOptions {
        (self.transform)(payload, bindings)
    }
}
