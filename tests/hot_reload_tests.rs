//! Hot-update bootstrap: re-evaluating an assembled module must be safe and
//! every component must map to one stable record.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use vue_sfc_loader::assemble::HOT_RELOAD_MARKER;
use vue_sfc_loader::plugin::{ModuleRequest, NoDownstream};
use vue_sfc_loader::runtime::HOT_RELOAD_RUNTIME;
use vue_sfc_loader::utils::component_id;

async fn full(h: &Harness, url: &str) -> String {
    h.loader
        .handle(&ModuleRequest::parse(url), &NoDownstream)
        .await
        .unwrap()
        .unwrap()
        .code
        .to_string()
}

fn hot_block(code: &str) -> &str {
    let start = code.find(HOT_RELOAD_MARKER).expect("hot reload block");
    &code[start..]
}

#[tokio::test]
async fn reassembly_is_identical() {
    let h = harness(dev_config());
    h.sources.insert(file("/App.vue"), APP);
    let first = full(&h, "/App.vue").await;

    // a cold loader over the same text produces the same module
    let cold = harness(dev_config());
    cold.sources.insert(file("/App.vue"), APP);
    let second = full(&cold, "/App.vue").await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn record_creation_is_guarded() {
    let h = harness(dev_config());
    h.sources.insert(file("/src/App.vue"), APP);
    let code = full(&h, "/src/App.vue").await;
    let block = hot_block(&code);

    assert!(block.contains("if (import.meta.hot) {"));
    let guard = block
        .find("if (!__VUE_HMR_RUNTIME__.isRecorded(\"/src/App.vue\")) {")
        .expect("record guard");
    let create = block
        .find("__VUE_HMR_RUNTIME__.createRecord(\"/src/App.vue\", component.options)")
        .expect("record creation");
    assert!(guard < create);
    assert_eq!(block.matches("createRecord(").count(), 1);

    // the runtime refuses to replace an existing record as well
    assert!(HOT_RELOAD_RUNTIME.contains("if (map[id]) return"));
}

#[tokio::test]
async fn hot_block_follows_normalization() {
    let h = harness(dev_config());
    h.sources.insert(file("/App.vue"), APP);
    let code = full(&h, "/App.vue").await;

    let normalized = code.find("var component = normalizer(").unwrap();
    let hot = code.find(HOT_RELOAD_MARKER).unwrap();
    let export = code.find("export default component.exports").unwrap();
    assert!(normalized < hot && hot < export);
}

#[tokio::test]
async fn edits_keep_the_record_key() {
    let h = harness(dev_config());
    h.sources.insert(file("/App.vue"), APP);
    let before = full(&h, "/App.vue").await;

    h.sources
        .insert(file("/App.vue"), APP.replace("color: red", "color: blue"));
    let after = full(&h, "/App.vue").await;

    assert_eq!(hot_block(&before), hot_block(&after));
    let id = component_id("/App.vue");
    assert!(before.contains(&id) && after.contains(&id));
}

#[tokio::test]
async fn distinct_paths_get_distinct_keys() {
    let h = harness(dev_config());
    h.sources.insert(file("/a/Button.vue"), APP);
    h.sources.insert(file("/b/Button.vue"), APP);

    let a = full(&h, "/a/Button.vue").await;
    let b = full(&h, "/b/Button.vue").await;

    assert_ne!(hot_block(&a), hot_block(&b));
    assert_ne!(component_id("/a/Button.vue"), component_id("/b/Button.vue"));
    assert!(a.contains(&component_id("/a/Button.vue")));
    assert!(b.contains(&component_id("/b/Button.vue")));
}
