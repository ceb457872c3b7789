use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{OptionTemplate, RenderEngine, RenderOptions};
use crate::error::ChartResult;
use crate::runtime::Source;

use super::{ChartContext, ChartFactory, TargetPlaceholder, bind_reactive, create_chart};

/// Presentation attributes forwarded verbatim to the chart's root container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerAttrs {
    pub classes: SmallVec<[String; 4]>,
    pub style: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
}

impl ContainerAttrs {
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    #[must_use]
    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Merges `other` on top of `self`; later values win per key.
    pub fn merge(&mut self, other: &ContainerAttrs) {
        for class in &other.classes {
            if !self.classes.contains(class) {
                self.classes.push(class.clone());
            }
        }
        for (key, value) in &other.style {
            self.style.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn class_list(&self) -> String {
        self.classes.join(" ")
    }

    /// Inline style string in insertion order, e.g. `height: 300px; width: 100%`.
    #[must_use]
    pub fn style_text(&self) -> String {
        self.style
            .iter()
            .map(|(property, value)| format!("{property}: {value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Renderable chart node: a target placeholder plus pass-through container
/// attributes.
pub struct ChartElement<E: RenderEngine> {
    chart: ChartFactory<E>,
    target: TargetPlaceholder<E::Target>,
    attrs: ContainerAttrs,
}

impl<E: RenderEngine> Clone for ChartElement<E> {
    fn clone(&self) -> Self {
        Self {
            chart: self.chart.clone(),
            target: self.target.clone(),
            attrs: self.attrs.clone(),
        }
    }
}

impl<E: RenderEngine> fmt::Debug for ChartElement<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartElement")
            .field("chart", &self.chart)
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl<E: RenderEngine> ChartElement<E> {
    #[must_use]
    pub fn new(chart: ChartFactory<E>) -> Self {
        let target = chart.attach_target();
        Self {
            chart,
            target,
            attrs: ContainerAttrs::default(),
        }
    }

    #[must_use]
    pub fn with_attrs(mut self, attrs: ContainerAttrs) -> Self {
        self.attrs.merge(&attrs);
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.attrs = self.attrs.with_class(class);
        self
    }

    #[must_use]
    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs = self.attrs.with_style(property, value);
        self
    }

    #[must_use]
    pub fn attrs(&self) -> &ContainerAttrs {
        &self.attrs
    }

    #[must_use]
    pub fn target(&self) -> &TargetPlaceholder<E::Target> {
        &self.target
    }

    /// Host hook: the root container was (re)materialized.
    pub fn attach(&self, element: Option<E::Target>) {
        self.target.attach(element);
    }

    #[must_use]
    pub fn chart(&self) -> &ChartFactory<E> {
        &self.chart
    }
}

/// Element-producing entry point for use inside a component setup.
///
/// Builds a factory from `template`'s baseline, binds `payload` and
/// `options` to it, and returns the placeholder element.
pub fn create_chart_element<P, E>(
    cx: &ChartContext<E>,
    template: &OptionTemplate<P, E>,
    payload: Source<P>,
    options: Option<Source<RenderOptions>>,
) -> ChartResult<ChartElement<E>>
where
    P: Clone + PartialEq + 'static,
    E: RenderEngine,
{
    let chart = create_chart(cx, template.baseline().clone());
    bind_reactive(&chart, template, payload, options)?;
    Ok(ChartElement::new(chart))
}

#[cfg(test)]
mod tests {
    use super::ContainerAttrs;

    #[test]
    fn attrs_keep_insertion_order_and_dedupe_classes() {
        let mut attrs = ContainerAttrs::default()
            .with_class("chart")
            .with_class("chart")
            .with_style("height", "300px")
            .with_style("width", "100%");
        attrs.merge(
            &ContainerAttrs::default()
                .with_class("wide")
                .with_style("height", "420px"),
        );

        assert_eq!(attrs.class_list(), "chart wide");
        assert_eq!(attrs.style_text(), "height: 420px; width: 100%");
    }

    #[test]
    fn attrs_serialize_classes_as_plain_list() {
        let attrs = ContainerAttrs::default()
            .with_class("chart")
            .with_attribute("data-role", "sales");
        let json = serde_json::to_value(&attrs).expect("serialize");
        assert_eq!(json["classes"], serde_json::json!(["chart"]));

        let parsed: ContainerAttrs = serde_json::from_value(json).expect("parse");
        assert_eq!(parsed, attrs);
    }
}
