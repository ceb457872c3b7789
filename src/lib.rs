//! chart-scope: leak-free chart instance lifecycle for component-based UIs.
//!
//! The crate ties a rendering target's attach/detach events, a shared resize
//! channel, and reactive recomputation of render options into one unit owned
//! by a [`lifecycle::Scope`]. The visualization engine and the host element
//! type stay behind the traits in [`core`].

pub mod api;
pub mod core;
pub mod error;
pub mod lifecycle;
pub mod render;
pub mod runtime;
pub mod telemetry;

pub use api::{
    ChartComponent, ChartContext, ChartElement, ChartFactory, ChartProps, bind_reactive,
    create_chart, create_chart_component, create_chart_element,
};
pub use crate::core::{ChartBinding, OptionTemplate, RenderEngine, RenderOptions};
pub use error::{ChartError, ChartResult};
pub use lifecycle::{LifecycleConfig, Scope};
pub use runtime::{Reactive, Runtime, Source};
