mod common;

use std::sync::{Arc, Mutex};

use common::RecordingTask;
use pretty_assertions::assert_eq;
use spydom_core::{Priority, TaskConfig, TaskFilter};
use spydom_engine::tasks::{builtin_registry, JsRunner, Title};
use spydom_engine::{RegistryError, Task, TaskError, TaskRegistry};

fn registry_of(slugs: &[(&str, u8)]) -> TaskRegistry {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = TaskRegistry::new();
    for (slug, priority) in slugs {
        registry
            .register(RecordingTask::new(slug, *priority, log.clone()).boxed())
            .unwrap();
    }
    registry
}

#[test]
fn duplicate_slugs_are_rejected() {
    let mut registry = registry_of(&[("a", 1)]);
    let log = Arc::new(Mutex::new(Vec::new()));
    let err = registry
        .register(RecordingTask::new("a", 2, log).boxed())
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateSlug(slug) if slug == "a"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn enabled_then_disabled_filtering() {
    let registry = registry_of(&[("a", 1), ("b", 1), ("c", 1)]);
    let filter = TaskFilter::new(["a", "c"], ["c"]);
    let filtered = registry.filter(&filter);
    assert_eq!(filtered.slugs(), vec!["a"]);
}

#[test]
fn empty_enabled_set_keeps_everything_not_disabled() {
    let registry = registry_of(&[("a", 1), ("b", 1), ("c", 1)]);
    let filter = TaskFilter::new(Vec::<String>::new(), ["b", "unknown"]);
    assert_eq!(registry.filter(&filter).slugs(), vec!["a", "c"]);
}

#[test]
fn plan_groups_tasks_into_ascending_tiers() {
    let registry = registry_of(&[("x", 3), ("y", 0), ("z", 3), ("w", 1)]);
    let plan = registry
        .prepare(TaskFilter::default(), &TaskConfig::default())
        .unwrap();

    let tiers: Vec<(u8, Vec<&str>)> = plan
        .by_priority()
        .map(|(priority, tasks)| (priority.value(), tasks.iter().map(|t| t.slug()).collect()))
        .collect();
    assert_eq!(
        tiers,
        vec![(0, vec!["y"]), (1, vec!["w"]), (3, vec!["x", "z"])]
    );
    assert_eq!(plan.slugs(), vec!["y", "w", "x", "z"]);
    assert_eq!(plan.len(), 4);
}

#[test]
fn builtin_tasks_have_unique_slugs() {
    let registry = builtin_registry().unwrap();
    assert_eq!(
        registry.slugs(),
        vec![
            "screenshot",
            "message-listeners",
            "hashchange-listeners",
            "location",
            "title",
            "outerhtml",
            "localstorage",
            "jsrunner",
        ]
    );
}

#[test]
fn jsrunner_is_disabled_without_a_script() {
    let registry = builtin_registry().unwrap();
    assert_eq!(registry.unconfigured(&TaskConfig::default()), vec!["jsrunner"]);

    let plan = registry
        .prepare(TaskFilter::default(), &TaskConfig::default())
        .unwrap();
    assert!(!plan.slugs().contains(&"jsrunner"));
    assert_eq!(plan.len(), 7);
}

#[test]
fn jsrunner_joins_the_plan_at_the_requested_priority() {
    let config = TaskConfig {
        js: Some("document.domain".to_string()),
        js_file: None,
        js_priority: 2,
    };
    let plan = builtin_registry()
        .unwrap()
        .prepare(TaskFilter::new(["jsrunner"], Vec::<String>::new()), &config)
        .unwrap();

    let tiers: Vec<Priority> = plan.by_priority().map(|(p, _)| p).collect();
    assert_eq!(tiers, vec![Priority::LIGHT]);
    assert_eq!(plan.slugs(), vec!["jsrunner"]);
}

#[test]
fn listing_shows_jsrunner_at_the_configured_priority() {
    let registry = builtin_registry().unwrap();
    let listed = |js_priority| {
        let config = TaskConfig {
            js_priority,
            ..TaskConfig::default()
        };
        registry
            .descriptors(&config)
            .into_iter()
            .find(|d| d.slug == "jsrunner")
            .map(|d| d.priority)
    };

    assert_eq!(listed(1), Some(Priority::PASSIVE));
    assert_eq!(listed(4), Some(Priority::MAX));
    assert_eq!(listed(9), Some(Priority::MAX));

    let title = registry
        .descriptors(&TaskConfig::default())
        .into_iter()
        .find(|d| d.slug == "title")
        .unwrap();
    assert_eq!(title.priority, Title.priority());
}

#[test]
fn unreadable_script_file_fails_initialisation() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = TaskConfig {
        js: None,
        js_file: Some(temp.path().join("missing.js")),
        js_priority: 4,
    };
    let err = builtin_registry()
        .unwrap()
        .prepare(TaskFilter::default(), &config)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Init { ref slug, source: TaskError::Config(_) } if slug == "jsrunner"
    ));
}

#[test]
fn script_file_contents_are_loaded() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("probe.js");
    std::fs::write(&path, "window.name").unwrap();

    let mut runner = JsRunner::default();
    runner
        .init(&TaskConfig {
            js: None,
            js_file: Some(path),
            js_priority: 0,
        })
        .unwrap();
    assert_eq!(runner.script(), "window.name");
    assert_eq!(runner.priority(), Priority::MIN);
}

#[test]
fn out_of_range_script_priority_is_rejected() {
    let mut runner = JsRunner::default();
    let err = runner
        .init(&TaskConfig {
            js: Some("1".to_string()),
            js_file: None,
            js_priority: 9,
        })
        .unwrap_err();
    assert!(matches!(err, TaskError::Config(_)));
}
