pub mod binding;
pub mod engine;
pub mod options;
pub mod template;

pub use binding::ChartBinding;
pub use engine::{EngineInstance, RenderEngine, RenderTarget};
pub use options::RenderOptions;
pub use template::{OptionTemplate, OptionTransformFn};
