//! Fake collaborators shared by the integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use vue_sfc_loader::compile::{
    ScriptLoader, ScriptTranspiler, TemplateCompileOptions, TemplateCompileOutput,
    TemplateCompiler,
};
use vue_sfc_loader::plugin::{Downstream, MemorySources, ModuleRequest, ServedModule, SfcLoader};
use vue_sfc_loader::LoaderConfig;

pub const ROOT: &str = "/project";

pub const APP: &str = r#"<template>
  <div class="app">{{ msg }}</div>
</template>

<script>
import Child from './Child.vue'
export default {
  components: { Child },
  data() { return { msg: "export default in a string" } }
}
</script>

<style scoped>
.app { color: red }
</style>
"#;

/// Template compiler that echoes the template length into its output.
#[derive(Debug, Clone, Default)]
pub struct FakeTemplateCompiler {
    pub calls: Arc<AtomicUsize>,
    pub tips: Vec<String>,
    pub errors: Vec<String>,
}

impl FakeTemplateCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TemplateCompiler for FakeTemplateCompiler {
    fn compile(
        &self,
        source: &str,
        options: &TemplateCompileOptions,
    ) -> impl Future<Output = anyhow::Result<TemplateCompileOutput>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = TemplateCompileOutput {
            code: format!(
                "/* {} bytes, functional: {}, base: {} */\nvar render = function () {{}}\nvar staticRenderFns = []",
                source.len(),
                options.is_functional,
                options.asset_url_base
            ),
            tips: self.tips.clone(),
            errors: self.errors.clone(),
        };
        async move { Ok(output) }
    }
}

/// Strips `: string` annotations, which is all the TypeScript the tests use.
#[derive(Debug, Clone, Default)]
pub struct FakeTranspiler {
    pub calls: Arc<AtomicUsize>,
}

impl FakeTranspiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScriptTranspiler for FakeTranspiler {
    fn transpile(
        &self,
        source: &str,
        _path: &str,
        _loader: ScriptLoader,
    ) -> impl Future<Output = anyhow::Result<String>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = source.replace(": string", "");
        async move { Ok(out) }
    }
}

/// Downstream handler that records how often it ran and serves a fixed body.
#[derive(Debug, Clone, Default)]
pub struct FakeDownstream {
    pub calls: Arc<AtomicUsize>,
    pub body: Option<String>,
}

impl FakeDownstream {
    pub fn serving(body: &str) -> Self {
        Self {
            calls: Arc::default(),
            body: Some(body.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downstream for FakeDownstream {
    fn handle(
        &self,
        _request: &ModuleRequest,
    ) -> impl Future<Output = anyhow::Result<Option<ServedModule>>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.body.clone().map(ServedModule::js);
        async move { Ok(body) }
    }
}

pub type TestLoader = SfcLoader<MemorySources, FakeTemplateCompiler, FakeTranspiler>;

pub struct Harness {
    pub loader: TestLoader,
    pub sources: MemorySources,
    pub templates: FakeTemplateCompiler,
    pub transpiler: FakeTranspiler,
}

pub fn harness(config: LoaderConfig) -> Harness {
    let sources = MemorySources::new();
    let templates = FakeTemplateCompiler::default();
    let transpiler = FakeTranspiler::default();
    let loader = SfcLoader::new(
        config,
        sources.clone(),
        templates.clone(),
        transpiler.clone(),
    );
    Harness {
        loader,
        sources,
        templates,
        transpiler,
    }
}

pub fn dev_config() -> LoaderConfig {
    LoaderConfig {
        root: PathBuf::from(ROOT),
        ..Default::default()
    }
}

pub fn file(logical_path: &str) -> PathBuf {
    PathBuf::from(ROOT).join(logical_path.trim_start_matches('/'))
}

/// Route loader logs to the test output. `RUST_LOG` overrides the level.
pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vue_sfc_loader=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Log sink for asserting on what the loader reported.
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture this thread's logs until the guard drops. Use with the
/// single-threaded `#[tokio::test]` runtime.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
