//! Behavioral tests for snapshot and restore of the host registries

use codemod::runtime::{extension_loader, listener, Handle, Host, Module};
use codemod::snapshot::{AuditSink, RecordingSink};
use codemod::Error;
use serde_json::json;
use std::sync::{Arc, Mutex};

const PATH: &str = "/some/added/file";

fn setup() -> (Host, Arc<RecordingSink>) {
    (Host::new(), Arc::new(RecordingSink::new()))
}

fn noop_loader() -> codemod::runtime::ExtensionLoader {
    extension_loader(|path, _| Ok(Module::new(path)))
}

#[test]
fn test_removes_added_require_entries_from_the_cache() {
    let (host, sink) = setup();
    let snapshot = host.snapshot(sink.clone());

    host.loader.cache().insert(PATH, Handle::new(Module::new(PATH)));
    assert!(host.loader.cache().contains_key(PATH));

    snapshot.restore().unwrap();

    assert_eq!(
        sink.messages(),
        vec!["removing /some/added/file from require cache"]
    );
    assert!(!host.loader.cache().contains_key(PATH));
}

#[test]
fn test_adds_removed_require_entries_to_the_cache() {
    let (host, sink) = setup();
    let module = Handle::new(Module::new(PATH));
    host.loader.cache().insert(PATH, module.clone());

    let snapshot = host.snapshot(sink.clone());
    host.loader.cache().remove(PATH);
    assert!(!host.loader.cache().contains_key(PATH));

    snapshot.restore().unwrap();

    assert_eq!(
        sink.messages(),
        vec!["restoring deleted /some/added/file to require cache"]
    );
    assert_eq!(host.loader.cache().get(PATH), Some(module));
}

#[test]
fn test_replaces_modified_require_entries_in_the_cache() {
    let (host, sink) = setup();
    let original = Handle::new(Module::new(PATH));
    host.loader.cache().insert(PATH, original.clone());

    let snapshot = host.snapshot(sink.clone());
    // Structurally identical, but a different module
    host.loader.cache().insert(PATH, Handle::new(Module::new(PATH)));

    snapshot.restore().unwrap();

    assert_eq!(
        sink.messages(),
        vec!["restoring replaced /some/added/file in require cache"]
    );
    assert!(host.loader.cache().get(PATH).unwrap().ptr_eq(&original));
}

#[test]
fn test_removes_added_require_extensions() {
    let (host, sink) = setup();
    let snapshot = host.snapshot(sink.clone());

    host.loader.extensions().insert(".omg", noop_loader());

    snapshot.restore().unwrap();

    assert_eq!(sink.messages(), vec!["removing .omg from require extensions"]);
    assert!(!host.loader.extensions().contains_key(".omg"));
}

#[test]
fn test_adds_removed_require_extensions() {
    let (host, sink) = setup();
    host.loader.extensions().insert(".omg", noop_loader());

    let snapshot = host.snapshot(sink.clone());
    host.loader.extensions().remove(".omg");

    snapshot.restore().unwrap();

    assert_eq!(
        sink.messages(),
        vec!["restoring deleted .omg to require extensions"]
    );
    assert!(host.loader.extensions().contains_key(".omg"));
}

#[test]
fn test_replaces_modified_require_extensions() {
    let (host, sink) = setup();
    let original = noop_loader();
    host.loader.extensions().insert(".omg", original.clone());

    let snapshot = host.snapshot(sink.clone());
    host.loader.extensions().insert(".omg", noop_loader());

    snapshot.restore().unwrap();

    assert_eq!(
        sink.messages(),
        vec!["restoring replaced .omg in require extensions"]
    );
    assert!(host.loader.extensions().get(".omg").unwrap().ptr_eq(&original));
}

#[test]
fn test_removes_added_process_event_listeners() {
    let (host, sink) = setup();
    let snapshot = host.snapshot(sink.clone());

    let added = listener(|_| {});
    host.process.on("exit", added.clone());

    snapshot.restore().unwrap();

    assert_eq!(sink.messages(), vec!["removing all 'exit' event listeners"]);
    assert!(!host.process.listeners("exit").contains(&added));
}

#[test]
fn test_adds_removed_process_event_listeners() {
    let (host, sink) = setup();
    let existing = listener(|_| {});
    host.process.on("exit", existing.clone());

    let snapshot = host.snapshot(sink.clone());
    host.process.off("exit", &existing);

    snapshot.restore().unwrap();

    assert_eq!(sink.messages(), vec!["restoring removed 'exit' event listener"]);
    assert!(host.process.listeners("exit").contains(&existing));
}

#[test]
fn test_removes_an_added_event_listener_when_there_already_is_one() {
    let (host, sink) = setup();
    let existing = listener(|_| {});
    host.process.on("exit", existing.clone());

    let snapshot = host.snapshot(sink.clone());
    host.process.on("exit", listener(|_| {}));

    snapshot.restore().unwrap();

    assert_eq!(sink.messages(), vec!["removing added 'exit' event listener"]);
    assert_eq!(host.process.listeners("exit"), vec![existing]);
}

#[test]
fn test_restores_global() {
    let (host, sink) = setup();
    let snapshot = host.snapshot(sink.clone());

    host.global.set("foo", json!(123));

    snapshot.restore().unwrap();

    assert_eq!(host.global.get("foo"), None);
    assert_eq!(sink.messages(), vec!["removing foo from global"]);
}

#[test]
fn test_global_cleanup_is_one_directional() {
    let (host, sink) = setup();
    host.global.set("changed", json!(1));
    host.global.set("deleted", json!(2));

    let snapshot = host.snapshot(sink.clone());
    host.global.set("changed", json!("different"));
    host.global.delete("deleted").unwrap();

    snapshot.restore().unwrap();

    assert_eq!(host.global.get("changed"), Some(json!("different")));
    assert!(!host.global.has("deleted"));
    assert!(sink.messages().is_empty());
}

#[test]
fn test_noop_restore_is_silent() {
    let (host, sink) = setup();
    host.loader.cache().insert(PATH, Handle::new(Module::new(PATH)));
    host.process.on("exit", listener(|_| {}));
    host.global.set("foo", json!(1));
    let cache_before = host.loader.cache().keys();

    host.snapshot(sink.clone()).restore().unwrap();

    assert!(sink.messages().is_empty());
    assert_eq!(host.loader.cache().keys(), cache_before);
    assert_eq!(host.process.listener_count("exit"), 1);
    assert!(host.global.has("foo"));
}

#[test]
fn test_duplicate_listeners_restore_multiplicity() {
    let (host, sink) = setup();
    let a = listener(|_| {});
    let b = listener(|_| {});
    host.process.on("exit", a.clone());
    host.process.on("exit", a.clone());
    host.process.on("exit", b.clone());

    let snapshot = host.snapshot(sink.clone());
    host.process.off("exit", &a);
    host.process.on("exit", b.clone());
    host.process.on("exit", b.clone());

    snapshot.restore().unwrap();

    assert_eq!(
        sink.messages(),
        vec![
            "removing added 'exit' event listener",
            "removing added 'exit' event listener",
            "restoring removed 'exit' event listener",
        ]
    );

    let mut ids: Vec<usize> = host.process.listeners("exit").iter().map(Handle::id).collect();
    let mut expected = vec![a.id(), a.id(), b.id()];
    ids.sort();
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn test_event_emptied_since_snapshot_is_refilled() {
    let (host, sink) = setup();
    let a = listener(|_| {});
    let b = listener(|_| {});
    host.process.on("warning", a.clone());
    host.process.on("warning", b.clone());

    let snapshot = host.snapshot(sink.clone());
    host.process.off_all(Some("warning"));

    snapshot.restore().unwrap();

    assert_eq!(sink.messages().len(), 2);
    assert_eq!(host.process.listeners("warning"), vec![a, b]);
}

#[test]
fn test_baseline_is_independent_of_live_registries() {
    let (host, sink) = setup();
    let snapshot = host.snapshot(sink.clone());

    // Changes made after the snapshot, then partially undone by hand
    host.loader.cache().insert("/a", Handle::new(Module::new("/a")));
    host.loader.cache().insert("/b", Handle::new(Module::new("/b")));
    host.loader.cache().remove("/a");

    snapshot.restore().unwrap();

    assert_eq!(sink.messages(), vec!["removing /b from require cache"]);
    assert!(host.loader.cache().is_empty());
}

#[test]
fn test_mixed_changes_across_registries() {
    let (host, sink) = setup();
    let kept = Handle::new(Module::new("/kept"));
    let deleted = Handle::new(Module::new("/deleted"));
    host.loader.cache().insert("/kept", kept.clone());
    host.loader.cache().insert("/deleted", deleted.clone());
    host.global.set("console", json!({}));

    let snapshot = host.snapshot(sink.clone());
    host.loader.cache().remove("/deleted");
    host.loader.cache().insert("/added", Handle::new(Module::new("/added")));
    host.loader.extensions().insert(".omg", noop_loader());
    host.process.on("exit", listener(|_| {}));
    host.global.set("leak", json!(true));

    snapshot.restore().unwrap();

    assert_eq!(
        sink.messages(),
        vec![
            "restoring deleted /deleted to require cache",
            "removing /added from require cache",
            "removing .omg from require extensions",
            "removing all 'exit' event listeners",
            "removing leak from global",
        ]
    );
    assert_eq!(host.loader.cache().keys(), vec!["/deleted", "/kept"]);
    assert!(host.loader.cache().get("/kept").unwrap().ptr_eq(&kept));
    assert!(host.loader.extensions().get(".json").is_some());
    assert!(!host.global.has("leak"));
    assert!(host.global.has("console"));
}

#[test]
fn test_restore_continues_past_failing_category() {
    let (host, sink) = setup();
    let snapshot = host.snapshot(sink.clone());

    host.global.define_non_configurable("sticky", json!(1));
    host.loader.cache().insert(PATH, Handle::new(Module::new(PATH)));

    let err = snapshot.restore().unwrap_err();

    assert!(matches!(err, Error::NonConfigurable(name) if name == "sticky"));
    assert!(!host.loader.cache().contains_key(PATH));
}

#[test]
fn test_closure_sink_receives_fragments() {
    let host = Host::new();
    let fragments = Arc::new(Mutex::new(Vec::new()));
    let recorded = fragments.clone();
    let sink: Arc<dyn AuditSink> = Arc::new(move |parts: &[&str]| {
        recorded
            .lock()
            .unwrap()
            .push(parts.iter().map(|p| p.to_string()).collect::<Vec<_>>());
    });

    let snapshot = host.snapshot(sink);
    host.loader.cache().insert(PATH, Handle::new(Module::new(PATH)));
    snapshot.restore().unwrap();

    assert_eq!(
        *fragments.lock().unwrap(),
        vec![vec!["removing", PATH, "from", "require cache"]]
    );
}

#[test]
fn test_module_loaded_through_require_is_rolled_back() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("helper.json");
    std::fs::write(&path, r#"{"helper": true}"#).unwrap();

    let (host, sink) = setup();
    let snapshot = host.snapshot(sink.clone());
    host.loader.require(&path).unwrap();
    snapshot.restore().unwrap();

    assert!(host.loader.cache().is_empty());
    assert_eq!(
        sink.messages(),
        vec![format!("removing {} from require cache", path.display())]
    );
}

/// Listener registry whose writes always fail
struct FrozenEvents {
    inner: codemod::runtime::EventEmitter,
}

impl codemod::snapshot::ListenerRegistry for FrozenEvents {
    fn event_names(&self) -> Vec<String> {
        self.inner.event_names()
    }

    fn listeners(&self, event: &str) -> Vec<codemod::runtime::Listener> {
        self.inner.listeners(event)
    }

    fn add_listener(&self, _: &str, _: codemod::runtime::Listener) -> codemod::Result<()> {
        Err(Error::Registry("frozen".to_string()))
    }

    fn remove_listener(&self, _: &str, _: &codemod::runtime::Listener) -> codemod::Result<()> {
        Err(Error::Registry("frozen".to_string()))
    }

    fn remove_all_listeners(&self, _: &str) -> codemod::Result<()> {
        Err(Error::Registry("frozen".to_string()))
    }
}

#[test]
fn test_later_categories_run_after_listener_failure() {
    let host = Host::new();
    let sink = Arc::new(RecordingSink::new());
    let events = Arc::new(FrozenEvents {
        inner: codemod::runtime::EventEmitter::new(),
    });

    let snapshot = codemod::ProcessSnapshot::new(
        host.loader.clone(),
        events.clone(),
        host.global.clone(),
        sink.clone(),
    );
    events.inner.on("exit", listener(|_| {}));
    host.global.set("leak", json!(true));

    let err = snapshot.restore().unwrap_err();

    assert!(matches!(err, Error::Registry(_)));
    assert!(!host.global.has("leak"));
    assert_eq!(sink.messages(), vec!["removing leak from global"]);
}
