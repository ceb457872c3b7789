//! Consumer-facing chart lifecycle API.
//!
//! [`create_chart`] is the low-level factory; [`create_chart_element`] and
//! [`create_chart_component`] wire a factory to reactive sources through
//! [`bind_reactive`].

mod binder;
mod component;
mod context;
mod element;
mod factory;

pub use binder::bind_reactive;
pub use component::{
    CHART_COMPONENT_PROPS, ChartComponent, ChartProps, PropSpec, create_chart_component,
};
pub use context::ChartContext;
pub use element::{ChartElement, ContainerAttrs, create_chart_element};
pub use factory::{
    ChartFactory, FactoryDiagnostics, InitCallback, InitRegistration, TargetPlaceholder,
    WeakChartFactory, create_chart,
};
