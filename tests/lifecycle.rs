//! Integration tests for fragment loading and unloading

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use fragment_composer::page::{ResourceEvent, ResourcePhase};
use fragment_composer::{
    hook_fn, CallbackError, Context, FragmentDefinition, FragmentLoader, Hook, HookContext,
    HookStage, LifecycleError, MemoryPage, Page, ResourceKind,
};

type Log = Rc<RefCell<Vec<String>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn setup() -> FragmentLoader<MemoryPage> {
    let page = MemoryPage::new();
    page.append_element(page.body(), "main", Some("app"))
        .expect("Should create mount point");
    FragmentLoader::new(page)
}

fn data(value: serde_json::Value) -> Context {
    value.as_object().cloned().expect("object")
}

fn roots(loader: &FragmentLoader<MemoryPage>, name: &str) -> usize {
    loader.page().query_attribute("data-module", name).len()
}

/// Hook that records its start and end around a suspension point
struct Recorder {
    label: &'static str,
    log: Log,
}

#[async_trait(?Send)]
impl Hook for Recorder {
    async fn call(&self, _ctx: &mut HookContext) -> Result<(), CallbackError> {
        self.log.borrow_mut().push(format!("{} start", self.label));
        tokio::task::yield_now().await;
        self.log.borrow_mut().push(format!("{} end", self.label));
        Ok(())
    }
}

fn record_stage(loader: &FragmentLoader<MemoryPage>, log: &Log) {
    for stage in HookStage::ALL {
        let log = log.clone();
        loader.add_stage_hook(
            stage,
            hook_fn(move |_| {
                log.borrow_mut().push(stage.to_string());
                Ok(())
            }),
        );
    }
}

#[tokio::test]
async fn test_load_unknown_fragment() {
    let loader = setup();
    let log = new_log();
    record_stage(&loader, &log);

    let ok = loader.load("missing-name", "#app", Context::new()).await;

    assert!(matches!(ok, Ok(false)));
    assert_eq!(roots(&loader, "missing-name"), 0);
    assert!(!loader.is_loaded("missing-name"));
    assert!(log.borrow().is_empty(), "no hooks may run for unknown fragments");
}

#[tokio::test]
async fn test_full_load_sequence() {
    let loader = setup();
    let log = new_log();
    record_stage(&loader, &log);

    let init_log = log.clone();
    loader.register(
        "card",
        FragmentDefinition::new("<h2>{{title}}</h2>")
            .with_style("/card.css")
            .with_script("/card.js")
            .with_data("title", "Default")
            .on_init(move |_, data| {
                init_log
                    .borrow_mut()
                    .push(format!("init {}", data["title"].as_str().unwrap_or("")));
                Ok(())
            }),
    );

    let ok = loader
        .load("card", "#app", data(json!({"title": "Custom"})))
        .await
        .unwrap();

    assert!(ok);
    assert!(loader.is_loaded("card"));
    assert_eq!(*log.borrow(), vec!["beforeLoad", "init Custom", "afterLoad"]);
    assert_eq!(loader.page().resources(ResourceKind::Style), vec!["/card.css"]);
    assert_eq!(loader.page().resources(ResourceKind::Script), vec!["/card.js"]);
}

#[tokio::test]
async fn test_mounted_markup_snapshot() {
    let loader = setup();
    loader.register(
        "nav",
        FragmentDefinition::new(r#"<nav>{{#each items}}<a href="{{url}}">{{label}}</a>{{/each}}</nav>"#),
    );

    let items = json!({"items": [
        {"url": "/", "label": "Home"},
        {"url": "/docs", "label": "Docs"}
    ]});
    assert!(loader.load("nav", "#app", data(items)).await.unwrap());

    let page = loader.page();
    insta::assert_snapshot!(
        page.outer_html(page.body()),
        @r#"<body><main id="app"><div class="module-container" data-module="nav"><nav><a href="/">Home</a><a href="/docs">Docs</a></nav></div></main></body>"#
    );
}

#[tokio::test]
async fn test_missing_target_fails_after_before_load() {
    let loader = setup();
    let log = new_log();
    record_stage(&loader, &log);
    loader.register("card", FragmentDefinition::new("x").with_style("/card.css"));

    let ok = loader.load("card", "#nowhere", Context::new()).await.unwrap();

    assert!(!ok);
    assert_eq!(*log.borrow(), vec!["beforeLoad"]);
    assert!(loader.page().events().is_empty(), "no resources after a failed lookup");
    assert!(!loader.is_loaded("card"));
}

#[tokio::test]
async fn test_script_failure_aborts_load() {
    let loader = setup();
    let log = new_log();
    record_stage(&loader, &log);
    loader.page().fail_resource("/broken.js");

    let init_calls = Rc::new(RefCell::new(0));
    let counter = init_calls.clone();
    loader.register(
        "widget",
        FragmentDefinition::new("<p>widget</p>")
            .with_styles(["/a.css", "/b.css"])
            .with_scripts(["/ok.js", "/broken.js"])
            .on_init(move |_, _| {
                *counter.borrow_mut() += 1;
                Ok(())
            }),
    );

    let ok = loader.load("widget", "#app", Context::new()).await.unwrap();

    assert!(!ok);
    assert!(!loader.is_loaded("widget"));
    assert_eq!(roots(&loader, "widget"), 0);
    assert_eq!(*init_calls.borrow(), 0);
    assert_eq!(*log.borrow(), vec!["beforeLoad"], "afterLoad must not run");
    // Resources attached before the failure stay attached
    assert_eq!(
        loader.page().resources(ResourceKind::Style),
        vec!["/a.css", "/b.css"]
    );
    assert!(loader
        .page()
        .resources(ResourceKind::Script)
        .contains(&"/broken.js".to_string()));
}

#[tokio::test]
async fn test_style_failure_skips_scripts() {
    let loader = setup();
    loader.page().fail_resource("/bad.css");
    loader.register(
        "widget",
        FragmentDefinition::new("")
            .with_style("/bad.css")
            .with_script("/never.js"),
    );

    assert!(!loader.load("widget", "#app", Context::new()).await.unwrap());
    assert!(loader.page().resources(ResourceKind::Script).is_empty());
}

#[tokio::test]
async fn test_styles_finish_before_scripts_start() {
    let loader = setup();
    loader.register(
        "widget",
        FragmentDefinition::new("")
            .with_styles(["/1.css", "/2.css", "/3.css"])
            .with_scripts(["/1.js", "/2.js"]),
    );

    assert!(loader.load("widget", "#app", Context::new()).await.unwrap());

    let events: Vec<ResourceEvent> = loader.page().events();
    let first_script = events
        .iter()
        .position(|e| e.kind == ResourceKind::Script)
        .expect("scripts loaded");
    let last_style_done = events
        .iter()
        .rposition(|e| e.kind == ResourceKind::Style && e.phase == ResourcePhase::Finished)
        .expect("styles loaded");
    assert!(last_style_done < first_script);

    // Within a phase every load starts before any finishes
    let style_phases: Vec<ResourcePhase> = events[..3].iter().map(|e| e.phase).collect();
    assert_eq!(style_phases, vec![ResourcePhase::Started; 3]);
}

#[tokio::test]
async fn test_double_load_then_unload() {
    let loader = setup();
    let destroyed = new_log();
    let sink = destroyed.clone();
    loader.register(
        "toast",
        FragmentDefinition::new("<p>hi</p>").on_destroy(move |root| {
            sink.borrow_mut().push(root.to_string());
            Ok(())
        }),
    );

    assert!(loader.load("toast", "#app", Context::new()).await.unwrap());
    assert!(loader.load("toast", "#app", Context::new()).await.unwrap());

    assert_eq!(roots(&loader, "toast"), 2);
    assert!(loader.is_loaded("toast"));
    assert_eq!(loader.list_loaded(), vec!["toast"]);

    assert!(loader.unload("toast").await.unwrap());

    assert_eq!(roots(&loader, "toast"), 0);
    assert_eq!(destroyed.borrow().len(), 2);
    assert!(!loader.is_loaded("toast"));
    assert!(loader.list_loaded().is_empty());
}

#[tokio::test]
async fn test_concurrent_loads_are_independent() {
    let loader = setup();
    loader.register(
        "card",
        FragmentDefinition::new("{{n}}").with_style("/card.css"),
    );

    let (a, b) = futures::join!(
        loader.load("card", "#app", data(json!({"n": 1}))),
        loader.load("card", "#app", data(json!({"n": 2}))),
    );

    assert!(a.unwrap());
    assert!(b.unwrap());
    assert_eq!(roots(&loader, "card"), 2);
    assert_eq!(loader.list_loaded(), vec!["card"]);
    // No deduplication of resources across loads
    assert_eq!(loader.page().resources(ResourceKind::Style).len(), 2);
}

#[tokio::test]
async fn test_hooks_run_sequentially_in_order() {
    let loader = setup();
    let log = new_log();
    for label in ["first", "second", "third"] {
        loader.add_hook(
            "beforeLoad",
            Recorder {
                label,
                log: log.clone(),
            },
        );
    }
    loader.register("card", FragmentDefinition::new(""));

    assert!(loader.load("card", "#app", Context::new()).await.unwrap());

    assert_eq!(
        *log.borrow(),
        vec![
            "first start",
            "first end",
            "second start",
            "second end",
            "third start",
            "third end",
        ]
    );
}

#[tokio::test]
async fn test_later_hooks_see_earlier_mutations() {
    let loader = setup();
    loader.register("greet", FragmentDefinition::new("{{greeting}}, {{who}}"));
    loader.add_hook(
        "beforeLoad",
        hook_fn(|ctx| {
            if let Some(data) = ctx.data.as_mut() {
                data.insert("who".into(), json!("Ann"));
            }
            Ok(())
        }),
    );
    loader.add_hook(
        "beforeLoad",
        hook_fn(|ctx| {
            let who = ctx
                .data
                .as_ref()
                .and_then(|d| d.get("who"))
                .and_then(|v| v.as_str())
                .unwrap_or("nobody")
                .to_string();
            if let Some(data) = ctx.data.as_mut() {
                data.insert("greeting".into(), json!(format!("Hello from {}", who)));
            }
            Ok(())
        }),
    );

    assert!(loader.load("greet", "#app", Context::new()).await.unwrap());

    let root = loader.page().query_attribute("data-module", "greet")[0];
    assert_eq!(
        loader.page().inner_html(root).as_deref(),
        Some("Hello from Ann, Ann")
    );
}

#[tokio::test]
async fn test_hook_contexts_per_stage() {
    let loader = setup();
    let seen: Rc<RefCell<Vec<HookContext>>> = Rc::new(RefCell::new(Vec::new()));
    for stage in HookStage::ALL {
        let seen = seen.clone();
        loader.add_stage_hook(
            stage,
            hook_fn(move |ctx| {
                seen.borrow_mut().push(ctx.clone());
                Ok(())
            }),
        );
    }
    loader.register("card", FragmentDefinition::new(""));

    loader
        .load("card", "#app", data(json!({"k": "v"})))
        .await
        .unwrap();
    loader.unload("card").await.unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);

    assert_eq!(seen[0].name, "card");
    assert_eq!(seen[0].data, Some(data(json!({"k": "v"}))));
    assert_eq!(seen[0].element, None);

    let root = seen[1].element.expect("afterLoad gets the root");
    assert_eq!(seen[1].data, None);
    assert!(!loader.page().is_attached(root), "root was removed by unload");

    for ctx in &seen[2..] {
        assert_eq!(ctx.name, "card");
        assert_eq!(ctx.data, None);
        assert_eq!(ctx.element, None);
    }
}

#[tokio::test]
async fn test_hook_added_during_stage_runs_same_pass() {
    let loader = Rc::new(setup());
    let log = new_log();
    loader.register("card", FragmentDefinition::new(""));

    let late_log = log.clone();
    let weak = Rc::downgrade(&loader);
    loader.add_hook(
        "beforeLoad",
        hook_fn(move |_| {
            late_log.borrow_mut().push("adder".to_string());
            if let Some(loader) = weak.upgrade() {
                let inner_log = late_log.clone();
                loader.add_hook(
                    "beforeLoad",
                    hook_fn(move |_| {
                        inner_log.borrow_mut().push("added".to_string());
                        Ok(())
                    }),
                );
            }
            Ok(())
        }),
    );

    assert!(loader.load("card", "#app", Context::new()).await.unwrap());
    assert_eq!(*log.borrow(), vec!["adder", "added"]);
}

#[tokio::test]
async fn test_before_load_failure_propagates() {
    let loader = setup();
    let log = new_log();
    loader.register("card", FragmentDefinition::new("x"));
    loader.add_hook("beforeLoad", hook_fn(|_| Err("denied".into())));
    record_stage(&loader, &log);

    let result = loader.load("card", "#app", Context::new()).await;

    match result {
        Err(LifecycleError::Hook { stage, source, .. }) => {
            assert_eq!(stage, HookStage::BeforeLoad);
            assert_eq!(source.message(), "denied");
        }
        other => panic!("expected beforeLoad failure, got {:?}", other),
    }
    assert!(log.borrow().is_empty(), "later beforeLoad hooks are skipped");
    assert_eq!(roots(&loader, "card"), 0);
    assert!(!loader.is_loaded("card"));
}

#[tokio::test]
async fn test_after_load_failure_is_caught_without_rollback() {
    let loader = setup();
    loader.register("card", FragmentDefinition::new("x"));
    loader.add_hook("afterLoad", hook_fn(|_| Err("broken hook".into())));

    let result = loader.load("card", "#app", Context::new()).await;

    assert!(matches!(result, Ok(false)));
    // The root and the loaded flag were both in place before afterLoad ran
    assert_eq!(roots(&loader, "card"), 1);
    assert!(loader.is_loaded("card"));
}

#[tokio::test]
async fn test_init_failure_leaves_root_mounted() {
    let loader = setup();
    loader.register(
        "card",
        FragmentDefinition::new("x").on_init(|_, _| Err("init exploded".into())),
    );

    let ok = loader.load("card", "#app", Context::new()).await.unwrap();

    assert!(!ok);
    assert_eq!(roots(&loader, "card"), 1);
    assert!(!loader.is_loaded("card"));
}

#[tokio::test]
async fn test_unload_unknown_runs_no_hooks() {
    let loader = setup();
    let log = new_log();
    record_stage(&loader, &log);

    assert!(matches!(loader.unload("ghost").await, Ok(false)));
    assert!(log.borrow().is_empty());
}

#[tokio::test]
async fn test_unload_without_roots_succeeds() {
    let loader = setup();
    let log = new_log();
    record_stage(&loader, &log);
    loader.register("card", FragmentDefinition::new("x"));

    assert!(loader.unload("card").await.unwrap());
    assert_eq!(*log.borrow(), vec!["beforeUnload", "afterUnload"]);
}

#[tokio::test]
async fn test_unload_runs_destroy_before_removal() {
    let loader = Rc::new(setup());
    let attached_at_destroy = Rc::new(RefCell::new(Vec::new()));
    let sink = attached_at_destroy.clone();
    let weak = Rc::downgrade(&loader);
    loader.register(
        "card",
        FragmentDefinition::new("x").on_destroy(move |root| {
            if let Some(loader) = weak.upgrade() {
                sink.borrow_mut().push(loader.page().is_attached(root));
            }
            Ok(())
        }),
    );

    assert!(loader.load("card", "#app", Context::new()).await.unwrap());
    assert!(loader.unload("card").await.unwrap());

    assert_eq!(*attached_at_destroy.borrow(), vec![true]);
}

#[tokio::test]
async fn test_before_unload_failure_propagates() {
    let loader = setup();
    loader.register("card", FragmentDefinition::new("x"));
    loader.add_hook("beforeUnload", hook_fn(|_| Err("keep me".into())));

    assert!(loader.load("card", "#app", Context::new()).await.unwrap());
    let result = loader.unload("card").await;

    assert_eq!(
        result.as_ref().err().and_then(LifecycleError::stage),
        Some(HookStage::BeforeUnload)
    );
    assert_eq!(roots(&loader, "card"), 1);
    assert!(loader.is_loaded("card"));
}

#[tokio::test]
async fn test_destroy_failure_stops_unload() {
    let loader = setup();
    loader.register(
        "card",
        FragmentDefinition::new("x").on_destroy(|_| Err("stuck".into())),
    );

    assert!(loader.load("card", "#app", Context::new()).await.unwrap());
    let result = loader.unload("card").await;

    assert!(matches!(result, Err(LifecycleError::Destroy { .. })));
    assert_eq!(roots(&loader, "card"), 1);
    assert!(loader.is_loaded("card"));
}

#[tokio::test]
async fn test_list_loaded_keeps_first_load_order() {
    let loader = setup();
    for name in ["b", "a", "c"] {
        loader.register(name, FragmentDefinition::new(name));
    }
    for name in ["b", "a", "b", "c"] {
        assert!(loader.load(name, "#app", Context::new()).await.unwrap());
    }
    assert_eq!(loader.list_loaded(), vec!["b", "a", "c"]);

    loader.unload("a").await.unwrap();
    assert_eq!(loader.list_loaded(), vec!["b", "c"]);
}

#[tokio::test]
async fn test_mount_point_resolution_by_class() {
    let page = MemoryPage::new();
    let aside = page.append_element(page.body(), "aside", None).unwrap();
    page.add_class(aside, "sidebar").unwrap();
    let loader = FragmentLoader::new(page);
    loader.register("ad", FragmentDefinition::new("buy"));

    assert!(loader.load("ad", ".sidebar", Context::new()).await.unwrap());
    assert_eq!(loader.page().children(aside).len(), 1);
}
