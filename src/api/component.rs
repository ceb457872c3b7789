use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{OptionTemplate, RenderEngine, RenderOptions};
use crate::error::ChartResult;
use crate::runtime::Source;

use super::{ChartContext, ChartElement, ContainerAttrs, create_chart_element};

/// One declared component prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropSpec {
    pub name: &'static str,
    pub required: bool,
}

pub const CHART_COMPONENT_PROPS: [PropSpec; 2] = [
    PropSpec {
        name: "payload",
        required: true,
    },
    PropSpec {
        name: "options",
        required: false,
    },
];

/// Props accepted by a [`ChartComponent`] instance.
pub struct ChartProps<P> {
    pub payload: Source<P>,
    pub options: Option<Source<RenderOptions>>,
    /// Fallthrough attributes applied to the root container.
    pub attrs: ContainerAttrs,
}

impl<P> ChartProps<P> {
    #[must_use]
    pub fn new(payload: impl Into<Source<P>>) -> Self {
        Self {
            payload: payload.into(),
            options: None,
            attrs: ContainerAttrs::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: impl Into<Source<RenderOptions>>) -> Self {
        self.options = Some(options.into());
        self
    }

    #[must_use]
    pub fn with_attrs(mut self, attrs: ContainerAttrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Reusable component definition built around one option template.
pub struct ChartComponent<P, E: RenderEngine> {
    template: OptionTemplate<P, E>,
}

impl<P, E: RenderEngine> Clone for ChartComponent<P, E> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
        }
    }
}

impl<P, E: RenderEngine> fmt::Debug for ChartComponent<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartComponent")
            .field("template", &self.template)
            .field("props", &CHART_COMPONENT_PROPS)
            .finish()
    }
}

/// Component-producing entry point.
#[must_use]
pub fn create_chart_component<P, E>(template: OptionTemplate<P, E>) -> ChartComponent<P, E>
where
    P: Clone + PartialEq + 'static,
    E: RenderEngine,
{
    ChartComponent { template }
}

impl<P, E> ChartComponent<P, E>
where
    P: Clone + PartialEq + 'static,
    E: RenderEngine,
{
    #[must_use]
    pub fn props_schema(&self) -> &'static [PropSpec] {
        &CHART_COMPONENT_PROPS
    }

    #[must_use]
    pub fn template(&self) -> &OptionTemplate<P, E> {
        &self.template
    }

    /// Runs the component's setup for one instance.
    pub fn setup(&self, cx: &ChartContext<E>, props: ChartProps<P>) -> ChartResult<ChartElement<E>> {
        let element = create_chart_element(cx, &self.template, props.payload, props.options)?;
        Ok(element.with_attrs(props.attrs))
    }
}
