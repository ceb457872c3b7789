use std::error::Error as StdError;

use super::RenderOptions;

/// Host-side element a chart can be drawn into.
///
/// Handles are cheap clones that refer to the same underlying element;
/// `same_target` compares identity, not content.
pub trait RenderTarget: Clone + 'static {
    /// Whether the element is still reachable from the visible tree.
    fn is_attached(&self) -> bool;

    fn same_target(&self, other: &Self) -> bool;
}

/// Live chart instance created by a [`RenderEngine`].
pub trait EngineInstance: 'static {
    type Error: StdError + 'static;

    fn apply_options(&mut self, options: &RenderOptions) -> Result<(), Self::Error>;

    fn resize(&mut self) -> Result<(), Self::Error>;

    /// Releases engine resources. Called at most once per instance.
    fn dispose(&mut self) {}
}

/// Contract implemented by the external visualization engine.
///
/// The lifecycle layer only creates instances and forwards option, resize,
/// and dispose calls; layout and drawing stay inside the engine.
pub trait RenderEngine: 'static {
    type Target: RenderTarget;
    type Instance: EngineInstance<Error = Self::Error>;
    type Error: StdError + 'static;

    fn create_instance(&self, target: &Self::Target) -> Result<Self::Instance, Self::Error>;
}
