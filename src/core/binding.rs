use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::{RenderEngine, RenderTarget};

/// Live association between one rendering target and its engine instance.
pub struct ChartBinding<E: RenderEngine> {
    element: E::Target,
    instance: Rc<RefCell<E::Instance>>,
}

impl<E: RenderEngine> Clone for ChartBinding<E> {
    fn clone(&self) -> Self {
        Self {
            element: self.element.clone(),
            instance: Rc::clone(&self.instance),
        }
    }
}

impl<E: RenderEngine> fmt::Debug for ChartBinding<E>
where
    E::Target: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartBinding")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl<E: RenderEngine> ChartBinding<E> {
    pub(crate) fn new(element: E::Target, instance: E::Instance) -> Self {
        Self {
            element,
            instance: Rc::new(RefCell::new(instance)),
        }
    }

    #[must_use]
    pub fn element(&self) -> &E::Target {
        &self.element
    }

    #[must_use]
    pub fn instance(&self) -> &Rc<RefCell<E::Instance>> {
        &self.instance
    }

    /// Mutable access to the engine instance.
    ///
    /// Panics if the instance is already borrowed, which only happens when a
    /// callback re-enters the same binding while it is being updated.
    pub fn instance_mut(&self) -> RefMut<'_, E::Instance> {
        self.instance.borrow_mut()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.element.is_attached()
    }

    #[must_use]
    pub fn is_bound_to(&self, element: &E::Target) -> bool {
        self.element.same_target(element)
    }

    #[must_use]
    pub fn shares_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.instance, &other.instance)
    }
}
