use tracing::debug;

use crate::core::{OptionTemplate, RenderEngine, RenderOptions};
use crate::error::{ChartError, ChartResult};
use crate::lifecycle::CancelHandle;
use crate::runtime::Source;

use super::ChartFactory;

/// Wires `payload` and optional `options` sources to every instance the
/// factory creates.
///
/// On each new binding the transform output is applied first and the direct
/// options second. Afterwards a deep change of the payload re-runs the
/// transform, and a deep change of the options re-applies them. The payload
/// watcher is registered before the options watcher, so when both change in
/// one settling cycle the direct options land last and win.
///
/// Every handle is registered into the factory's scope; binding into a torn
/// down scope fails with [`ChartError::LifecycleClosed`].
pub fn bind_reactive<P, E>(
    factory: &ChartFactory<E>,
    template: &OptionTemplate<P, E>,
    payload: Source<P>,
    options: Option<Source<RenderOptions>>,
) -> ChartResult<()>
where
    P: Clone + PartialEq + 'static,
    E: RenderEngine,
{
    let scope = factory.scope();
    if scope.is_closed() {
        return Err(ChartError::LifecycleClosed);
    }

    let registration = {
        let weak = factory.downgrade();
        let template = template.clone();
        let payload = payload.clone();
        let options = options.clone();
        factory.on_init(move |_| {
            let Some(factory) = weak.upgrade() else {
                return Ok(());
            };
            let bindings = factory.bindings();
            factory.set_option(&template.transform(&payload.read_current(), &bindings))?;
            if let Some(options) = &options {
                factory.set_option(&options.read_current())?;
            }
            Ok(())
        })
    };
    scope.register_cancelable(CancelHandle::with_hook(move || {
        registration.unregister();
    }))?;

    let payload_subscription = {
        let weak = factory.downgrade();
        let template = template.clone();
        payload.watch(move |next: &P| {
            let Some(factory) = weak.upgrade() else {
                return Ok(());
            };
            let bindings = factory.bindings();
            if bindings.is_empty() {
                debug!("payload changed with no live chart bindings");
                return Ok(());
            }
            factory
                .set_option(&template.transform(next, &bindings))
                .map_err(ChartError::engine)
        })
    };
    scope.register_subscription(payload_subscription)?;

    if let Some(options) = options {
        let weak = factory.downgrade();
        let options_subscription = options.watch(move |next: &RenderOptions| {
            let Some(factory) = weak.upgrade() else {
                return Ok(());
            };
            factory.set_option(next).map_err(ChartError::engine)
        });
        scope.register_subscription(options_subscription)?;
    }

    Ok(())
}
