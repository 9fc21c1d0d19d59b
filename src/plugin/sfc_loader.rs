//! SFC Loader - routes virtual module requests for single-file components.
//!
//! Routes, in priority order:
//! - fixed infrastructure paths serve the runtime bodies verbatim
//! - the live-reload client path is produced downstream, then rewritten
//! - anything that is not a component is passed through untouched
//! - component paths are loaded, parsed and served by query type:
//!   no `type` assembles the glue module, `type=template` compiles the
//!   template, `type=style` is left to the downstream style pipeline
//!
//! **Invariants:**
//! - No cache mutation happens before the last await of a request, so a
//!   request dropped mid-flight leaves no partial state behind
//! - `type=style` always carries an `index`; `type=template` never does
//! - A template request for a document without a template fails

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arcstr::ArcStr;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::assemble::{assemble, AssembleInput};
use crate::compile::script::compile_script;
use crate::compile::template::compile_template;
use crate::compile::{ScriptTranspiler, TemplateCompiler};
use crate::descriptor;
use crate::plugin::artifact_cache::{ArtifactCache, CacheEntry, TemplateArtifact};
use crate::plugin::sources::SourceLoader;
use crate::runtime;
use crate::utils;
use crate::{LoaderConfig, SfcError};

lazy_static! {
    static ref HMR_RERENDER_RE: Regex =
        Regex::new(r"__VUE_HMR_RUNTIME__\.rerender\(path, (.+)\)").unwrap();
}

// ---------------------------------------------------------------------------
// Requests and routes
// ---------------------------------------------------------------------------

/// An incoming module request: a path plus its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    /// The full request URL, for error messages.
    pub url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Set by upstream middleware to treat a path without the component
    /// extension as a component.
    pub force_component: bool,
}

impl ModuleRequest {
    pub fn parse(url: &str) -> Self {
        let (path, query) = utils::split_url(url);
        Self {
            url: url.to_string(),
            path: path.to_string(),
            query: query.map(utils::parse_query).unwrap_or_default(),
            force_component: false,
        }
    }

    pub fn as_component(mut self) -> Self {
        self.force_component = true;
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_query(&self, key: &str) -> bool {
        self.query.iter().any(|(k, _)| k == key)
    }

    /// Classify the request.
    pub fn route(&self) -> Result<Route, SfcError> {
        match self.path.as_str() {
            utils::NORMALIZER_PATH => return Ok(Route::Infra(InfraModule::Normalizer)),
            utils::HOT_RELOAD_PATH => return Ok(Route::Infra(InfraModule::HotReload)),
            utils::HMR_CLIENT_PATH => return Ok(Route::HmrClient),
            _ => {}
        }

        if !utils::is_sfc_path(&self.path) && !self.force_component {
            return Ok(Route::PassThrough);
        }

        let invalid = |reason: &str| SfcError::InvalidRequest(self.url.clone(), reason.to_string());

        match self.query_value("type") {
            None => Ok(Route::Full),
            Some("template") => {
                if self.has_query("index") {
                    return Err(invalid("`type=template` does not take an index"));
                }
                Ok(Route::Template)
            }
            Some("style") => {
                let raw = self
                    .query_value("index")
                    .ok_or_else(|| invalid("`type=style` requires an index"))?;
                Ok(Route::Style {
                    index: utils::parse_index(&self.url, raw)?,
                    module: self.has_query("module"),
                })
            }
            Some(other) => Err(invalid(&format!("unknown module type `{}`", other))),
        }
    }
}

/// The fixed runtime modules every assembled component imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfraModule {
    Normalizer,
    HotReload,
}

impl InfraModule {
    pub fn body(&self) -> &'static str {
        match self {
            InfraModule::Normalizer => runtime::NORMALIZER_RUNTIME,
            InfraModule::HotReload => runtime::HOT_RELOAD_RUNTIME,
        }
    }
}

/// What a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Infra(InfraModule),
    /// Live-reload client, rewritten after the downstream handler serves it.
    HmrClient,
    /// Not ours.
    PassThrough,
    /// Bare component path: the assembled glue module.
    Full,
    Template,
    /// Delegated to the downstream style pipeline.
    Style { index: usize, module: bool },
}

// ---------------------------------------------------------------------------
// Responses and the downstream handler
// ---------------------------------------------------------------------------

/// A module body ready to be sent to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedModule {
    pub code: ArcStr,
    pub content_type: &'static str,
}

impl ServedModule {
    pub const JS: &'static str = "application/javascript";

    pub fn js(code: impl Into<ArcStr>) -> Self {
        Self {
            code: code.into(),
            content_type: Self::JS,
        }
    }
}

/// The next handler in the host server's chain.
pub trait Downstream: Send + Sync {
    fn handle(
        &self,
        request: &ModuleRequest,
    ) -> impl Future<Output = anyhow::Result<Option<ServedModule>>> + Send;
}

/// End of the chain: serves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDownstream;

impl Downstream for NoDownstream {
    fn handle(
        &self,
        _request: &ModuleRequest,
    ) -> impl Future<Output = anyhow::Result<Option<ServedModule>>> + Send {
        async { Ok(None) }
    }
}

/// Normalize the rerender call-site of the live-reload client so it always
/// passes the freshly imported module `m`.
pub fn rewrite_hmr_client(body: &str) -> String {
    HMR_RERENDER_RE
        .replace_all(body, "__VUE_HMR_RUNTIME__.rerender(path, m)")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Serves component modules. `S` reads documents, `C` compiles templates,
/// `T` transpiles script dialects.
pub struct SfcLoader<S, C, T> {
    config: LoaderConfig,
    cache: ArtifactCache,
    sources: S,
    template_compiler: C,
    transpiler: T,
}

impl<S, C, T> SfcLoader<S, C, T>
where
    S: SourceLoader,
    C: TemplateCompiler,
    T: ScriptTranspiler,
{
    pub fn new(config: LoaderConfig, sources: S, template_compiler: C, transpiler: T) -> Self {
        Self {
            cache: ArtifactCache::new(config.cache_capacity),
            config,
            sources,
            template_compiler,
            transpiler,
        }
    }

    /// Replace the artifact cache, e.g. with one shared between loaders.
    pub fn with_cache(mut self, cache: ArtifactCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Forget everything cached for a file. Returns whether anything was
    /// cached.
    pub fn invalidate(&self, file_path: &Path) -> bool {
        let key = utils::cache_key(file_path);
        let removed = self.cache.invalidate(&key).is_some();
        debug!(key = %key, removed, "invalidated cached component");
        removed
    }

    /// Handle one request. `Ok(None)` means nobody produced a body.
    pub async fn handle<D: Downstream>(
        &self,
        request: &ModuleRequest,
        next: &D,
    ) -> Result<Option<ServedModule>, SfcError> {
        let route = request.route()?;
        debug!(url = %request.url, ?route, "routing module request");

        match route {
            Route::Infra(module) => Ok(Some(ServedModule::js(module.body()))),
            Route::HmrClient => {
                let served = self.downstream(request, next).await?;
                Ok(served.map(|m| ServedModule::js(rewrite_hmr_client(&m.code))))
            }
            Route::PassThrough => self.downstream(request, next).await,
            Route::Full => {
                let code = self.load_component(request, next).await?;
                Ok(Some(ServedModule::js(code)))
            }
            Route::Template => {
                let code = self.load_template(&request.path).await?;
                Ok(Some(ServedModule::js(code)))
            }
            Route::Style { .. } => self.downstream(request, next).await,
        }
    }

    async fn downstream<D: Downstream>(
        &self,
        request: &ModuleRequest,
        next: &D,
    ) -> Result<Option<ServedModule>, SfcError> {
        next.handle(request)
            .await
            .map_err(|e| SfcError::Downstream(format!("{:#}", e)))
    }

    /// Read a document and produce its cache entry: the cached one when the
    /// text is unchanged, a freshly parsed one otherwise. Does not store it.
    async fn document(&self, logical_path: &str) -> Result<(PathBuf, String, CacheEntry), SfcError> {
        let file_path = utils::request_to_file(&self.config.root, logical_path);
        let source = self
            .sources
            .read(&file_path)
            .await
            .map_err(|source| SfcError::Io {
                path: file_path.clone(),
                source,
            })?;
        let key = utils::cache_key(&file_path);

        if let Some(entry) = self.cache.get(&key) {
            if entry.matches(&source) {
                debug!(key = %key, "artifact cache hit");
                return Ok((file_path, key, entry));
            }
        }

        let descriptor = descriptor::parse(&source, &file_path.to_string_lossy())
            .map_err(|source| SfcError::Parse {
                path: key.clone(),
                source,
            })?;
        Ok((file_path, key, CacheEntry::new(&source, descriptor)))
    }

    async fn load_component<D: Downstream>(
        &self,
        request: &ModuleRequest,
        next: &D,
    ) -> Result<ArcStr, SfcError> {
        let logical_path = request.path.as_str();
        let (file_path, key, mut entry) = self.document(logical_path).await?;

        // upstream handlers see the request first; their body is replaced
        self.downstream(request, next).await?;

        let script = match &entry.script {
            Some(script) => script.clone(),
            None => ArcStr::from(
                compile_script(
                    &self.transpiler,
                    entry.descriptor.script.as_ref(),
                    logical_path,
                )
                .await?,
            ),
        };

        let label = self.file_label(&file_path);
        let code = assemble(
            &entry.descriptor,
            AssembleInput {
                logical_path,
                script: &script,
                file_label: label.as_deref(),
            },
        );

        entry.script = Some(script);
        self.cache.set(key, entry);
        Ok(ArcStr::from(code))
    }

    async fn load_template(&self, logical_path: &str) -> Result<ArcStr, SfcError> {
        let (file_path, key, mut entry) = self.document(logical_path).await?;
        let asset_base = utils::posix_dirname(logical_path);

        if let Some(code) = entry.template_for(asset_base) {
            return Ok(code.clone());
        }

        let descriptor = Arc::clone(&entry.descriptor);
        let section = descriptor
            .template
            .as_ref()
            .ok_or_else(|| SfcError::MissingTemplate(logical_path.to_string()))?;

        let module = compile_template(
            &self.template_compiler,
            section,
            &file_path.to_string_lossy(),
            logical_path,
            self.config.is_production,
        )
        .await?;
        if module.has_errors() {
            debug!(
                logical_path,
                diagnostics = module.diagnostics.len(),
                "serving template with compiler errors"
            );
        }

        let code = ArcStr::from(module.code);
        entry.template = Some(TemplateArtifact {
            asset_base: asset_base.to_string(),
            code: code.clone(),
        });
        self.cache.set(key, entry);
        Ok(code)
    }

    /// Value exposed as `component.options.__file`: the root-relative path
    /// in development, the base name in production when opted in.
    fn file_label(&self, file_path: &Path) -> Option<String> {
        if !self.config.is_production {
            let relative = file_path.strip_prefix(&self.config.root).unwrap_or(file_path);
            Some(relative.to_string_lossy().replace('\\', "/"))
        } else if self.config.expose_filename {
            file_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
