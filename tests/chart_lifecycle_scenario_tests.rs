use chart_scope::api::{ChartContext, create_chart, create_chart_element};
use chart_scope::core::{ChartBinding, OptionTemplate, RenderOptions};
use chart_scope::lifecycle::LifecycleConfig;
use chart_scope::render::{EngineCall, HeadlessEngine, HeadlessError, HeadlessTarget};
use chart_scope::runtime::{Reactive, Source};
use chart_scope::{ChartError, RenderEngine};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
struct SeriesPayload {
    v: Vec<i64>,
}

type Template = OptionTemplate<SeriesPayload, HeadlessEngine>;

fn series_template() -> Template {
    OptionTemplate::new(
        RenderOptions::new(json!({ "animation": false })),
        |payload: &SeriesPayload, bindings: &[ChartBinding<HeadlessEngine>]| {
            RenderOptions::new(json!({
                "series": [{ "type": "line", "data": payload.v }],
                "title": { "text": format!("{} charts", bindings.len()) }
            }))
        },
    )
}

fn context() -> (ChartContext<HeadlessEngine>, HeadlessEngine) {
    let engine = HeadlessEngine::new();
    let cx = ChartContext::standalone(engine.clone(), LifecycleConfig::default());
    (cx, engine)
}

fn applied_targets(calls: &[EngineCall]) -> Vec<u64> {
    calls
        .iter()
        .filter_map(|call| match call {
            EngineCall::Applied { target, .. } => Some(*target),
            _ => None,
        })
        .collect()
}

#[test]
fn payload_change_reaches_instance_until_element_detaches() {
    let (cx, engine) = context();
    let template = series_template();
    let payload = Reactive::new(cx.runtime(), SeriesPayload { v: vec![1] });
    let element = create_chart_element(&cx, &template, Source::Reactive(payload.clone()), None)
        .expect("element");

    let e1 = HeadlessTarget::attached(1);
    element.attach(Some(e1.clone()));
    cx.runtime().flush().expect("settle attach");

    assert_eq!(engine.created_count(), 1);
    assert!(element.chart().resize_coordinator().is_observing(&e1));
    let applied_before = engine.applied_options(1).len();

    payload.update(|p| p.v.push(2));
    cx.runtime().flush().expect("settle payload");

    let applied = engine.applied_options(1);
    assert_eq!(applied.len(), applied_before + 1);
    let bindings = element.chart().bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(
        applied.last(),
        Some(&template.transform(&SeriesPayload { v: vec![1, 2] }, &bindings))
    );

    e1.set_attached(false);
    let applied_after_detach = engine.applied_options(1).len();
    payload.update(|p| p.v.push(3));
    cx.runtime().flush().expect("settle after detach");

    assert_eq!(engine.applied_options(1).len(), applied_after_detach);
    assert!(element.chart().bindings().is_empty());
    assert!(engine.is_disposed(1));
    assert!(!element.chart().resize_coordinator().is_observing(&e1));
}

#[test]
fn options_change_fans_out_in_binding_order() {
    let (cx, engine) = context();
    let template = series_template();
    let options = Reactive::new(cx.runtime(), RenderOptions::new(json!({ "grid": { "top": 8 } })));
    let element = create_chart_element(
        &cx,
        &template,
        Source::Plain(SeriesPayload { v: vec![5] }),
        Some(Source::Reactive(options.clone())),
    )
    .expect("element");

    element.attach(Some(HeadlessTarget::attached(1)));
    element.attach(Some(HeadlessTarget::attached(2)));
    cx.runtime().flush().expect("settle attach");
    assert_eq!(engine.created_count(), 2);

    let journal_len = engine.call_count();
    let next = RenderOptions::new(json!({ "grid": { "top": 24 } }));
    options.set(next.clone());
    cx.runtime().flush().expect("settle options");

    let new_calls = &engine.journal()[journal_len..];
    assert_eq!(applied_targets(new_calls), vec![1, 2]);
    assert_eq!(engine.applied_options(1).last(), Some(&next));
    assert_eq!(engine.applied_options(2).last(), Some(&next));
}

#[test]
fn direct_options_win_over_transform_in_same_cycle() {
    let (cx, engine) = context();
    let template: Template = OptionTemplate::new(RenderOptions::empty(), |p: &SeriesPayload, _| {
        RenderOptions::new(json!({ "title": { "text": format!("points: {}", p.v.len()) } }))
    });
    let payload = Reactive::new(cx.runtime(), SeriesPayload { v: vec![] });
    let options = Reactive::new(
        cx.runtime(),
        RenderOptions::new(json!({ "title": { "text": "initial" } })),
    );
    let element = create_chart_element(
        &cx,
        &template,
        Source::Reactive(payload.clone()),
        Some(Source::Reactive(options.clone())),
    )
    .expect("element");
    element.attach(Some(HeadlessTarget::attached(7)));
    cx.runtime().flush().expect("settle attach");
    assert_eq!(
        engine.merged_options(7).pointer("/title/text"),
        Some(&json!("initial"))
    );

    // Options written first; the payload watcher still flushes before them.
    let direct = RenderOptions::new(json!({ "title": { "text": "direct" } }));
    options.set(direct.clone());
    payload.update(|p| p.v.extend([1, 2, 3]));
    cx.runtime().flush().expect("settle both");

    let applied = engine.applied_options(7);
    assert_eq!(applied.last(), Some(&direct));
    assert_eq!(
        applied[applied.len() - 2].pointer("/title/text"),
        Some(&json!("points: 3"))
    );
    assert_eq!(
        engine.merged_options(7).pointer("/title/text"),
        Some(&json!("direct"))
    );
}

#[test]
fn repeated_attach_creates_one_instance() {
    let (cx, engine) = context();
    let chart = create_chart(&cx, RenderOptions::empty());
    let target = chart.attach_target();
    let element = HeadlessTarget::attached(1);

    target.attach(Some(element.clone()));
    target.attach(Some(element.clone()));
    cx.runtime().flush().expect("first settle");
    target.attach(Some(element.clone()));
    cx.runtime().flush().expect("second settle");

    assert_eq!(engine.created_count(), 1);
    assert_eq!(chart.bindings().len(), 1);
    assert_eq!(chart.diagnostics().ignored_attaches, 2);
}

#[test]
fn reattached_element_after_purge_gets_fresh_instance() {
    let (cx, engine) = context();
    let chart = create_chart(&cx, RenderOptions::empty());
    let element = HeadlessTarget::attached(1);

    chart.attach_target().attach(Some(element.clone()));
    cx.runtime().flush().expect("settle");
    element.set_attached(false);
    assert!(chart.bindings().is_empty());

    element.set_attached(true);
    chart.attach_target().attach(Some(element));
    cx.runtime().flush().expect("settle again");

    assert_eq!(engine.created_count(), 2);
    assert_eq!(chart.bindings().len(), 1);
    assert_eq!(chart.diagnostics().bindings_purged, 1);
}

#[test]
fn teardown_silences_every_notification_path() {
    let (cx, engine) = context();
    let template = series_template();
    let payload = Reactive::new(cx.runtime(), SeriesPayload { v: vec![1] });
    let options = Reactive::new(cx.runtime(), RenderOptions::empty());
    let element = create_chart_element(
        &cx,
        &template,
        Source::Reactive(payload.clone()),
        Some(Source::Reactive(options.clone())),
    )
    .expect("element");
    let e1 = HeadlessTarget::attached(1);
    element.attach(Some(e1.clone()));
    cx.runtime().flush().expect("settle");

    // Queued before teardown, flushed after it.
    payload.update(|p| p.v.push(2));
    element.attach(Some(HeadlessTarget::attached(2)));

    assert!(cx.scope().dispose());
    assert!(!cx.scope().dispose());
    assert!(engine.is_disposed(1));
    let calls_at_teardown = engine.call_count();

    cx.runtime().flush().expect("late flush");
    payload.update(|p| p.v.push(3));
    options.set(RenderOptions::new(json!({ "late": true })));
    element.attach(Some(HeadlessTarget::attached(3)));
    element.chart().resize_coordinator().deliver(&[e1]);
    cx.runtime().flush().expect("post-teardown flush");
    element
        .chart()
        .set_option(&RenderOptions::new(json!({ "late": true })))
        .expect("no-op");

    assert_eq!(engine.call_count(), calls_at_teardown);
    assert_eq!(payload.watcher_count(), 0);
    assert_eq!(options.watcher_count(), 0);
    assert_eq!(cx.scope().cancelable_count(), 0);
    assert_eq!(cx.scope().subscription_count(), 0);
}

#[test]
fn host_placeholder_keeps_chart_working_after_element_handle_drops() {
    let (cx, engine) = context();
    let template = series_template();
    let payload = Reactive::new(cx.runtime(), SeriesPayload { v: vec![1] });
    let element = create_chart_element(&cx, &template, Source::Reactive(payload.clone()), None)
        .expect("element");
    let placeholder = element.target().clone();
    drop(element);

    placeholder.attach(Some(HeadlessTarget::attached(1)));
    cx.runtime().flush().expect("settle attach");
    assert_eq!(engine.created_count(), 1);

    payload.update(|p| p.v.push(2));
    cx.runtime().flush().expect("settle payload");

    let applied = engine.applied_options(1);
    assert_eq!(
        applied.last().and_then(|options| options.pointer("/series/0/data")),
        Some(&json!([1, 2]))
    );
}

#[test]
fn dropped_chart_handles_still_dispose_live_instances() {
    let (cx, engine) = context();
    let chart = create_chart(&cx, RenderOptions::empty());
    chart
        .attach_target()
        .attach(Some(HeadlessTarget::attached(1)));
    cx.runtime().flush().expect("settle");
    assert!(!engine.is_disposed(1));

    drop(chart);
    cx.scope().dispose();

    let disposals = engine
        .calls_for(1)
        .into_iter()
        .filter(|call| matches!(call, EngineCall::Disposed { .. }))
        .count();
    assert_eq!(disposals, 1);
}

#[test]
fn teardown_without_disposal_leaves_instances_to_the_host() {
    let engine = HeadlessEngine::new();
    let cx = ChartContext::standalone(
        engine.clone(),
        LifecycleConfig::default().with_dispose_on_teardown(false),
    );
    let chart = create_chart(&cx, RenderOptions::empty());
    chart
        .attach_target()
        .attach(Some(HeadlessTarget::attached(1)));
    cx.runtime().flush().expect("settle");

    cx.scope().dispose();
    assert!(!engine.is_disposed(1));
    assert!(chart.bindings().is_empty());
}

#[test]
fn creation_failure_surfaces_from_flush_unchanged() {
    let (cx, engine) = context();
    let chart = create_chart(&cx, RenderOptions::empty());
    engine.reject_creation(true);

    chart
        .attach_target()
        .attach(Some(HeadlessTarget::attached(4)));
    let err = cx.runtime().flush().expect_err("creation must fail");

    assert!(matches!(err, ChartError::Engine(_)));
    assert_eq!(
        err.engine_error::<HeadlessError>(),
        Some(&HeadlessError::CreationRejected { target: 4 })
    );
    assert_eq!(err.to_string(), "instance creation rejected for target 4");
    assert!(chart.bindings().is_empty());
}

#[test]
fn set_option_returns_engine_error_as_is() {
    let (cx, engine) = context();
    let chart = create_chart(&cx, RenderOptions::empty());
    chart
        .attach_target()
        .attach(Some(HeadlessTarget::attached(9)));
    cx.runtime().flush().expect("settle");

    engine.reject_options(true);
    let err = chart
        .set_option(&RenderOptions::new(json!({ "x": 1 })))
        .expect_err("rejected");
    assert_eq!(err, HeadlessError::OptionsRejected { target: 9 });
}

#[test]
fn transform_round_trip_matches_every_live_binding() {
    let (cx, engine) = context();
    let template = series_template();
    let chart = create_chart(&cx, template.baseline().clone());
    let live = HeadlessTarget::attached(1);
    let stale = HeadlessTarget::attached(2);
    chart.attach_target().attach(Some(live));
    chart.attach_target().attach(Some(stale.clone()));
    cx.runtime().flush().expect("settle");

    stale.set_attached(false);
    let payload = SeriesPayload { v: vec![4, 5, 6] };
    let bindings = chart.bindings();
    let expected = template.transform(&payload, &bindings);
    let before_stale = engine.applied_options(2).len();
    chart.set_option(&expected).expect("apply");

    assert_eq!(engine.applied_options(1).last(), Some(&expected));
    assert_eq!(engine.applied_options(2).len(), before_stale);
    assert_eq!(expected.pointer("/title/text"), Some(&json!("1 charts")));
}

#[test]
fn headless_engine_satisfies_engine_contract() {
    let engine = HeadlessEngine::new();
    let target = HeadlessTarget::attached(11);
    let instance = engine.create_instance(&target).expect("instance");
    assert_eq!(instance.target_id(), 11);
    assert!(!instance.is_disposed());
}
