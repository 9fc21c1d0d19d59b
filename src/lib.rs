//! # Vue SFC Loader
//!
//! On-demand transform layer that serves single-file components to the
//! browser as native ES modules during development.
//!
//! A request for `/App.vue` is answered with a glue module that imports the
//! separately compiled sections back through virtual sub-requests
//! (`/App.vue?type=template`, `/App.vue?type=style&index=0`), normalizes
//! them into one component object and wires up hot-update bookkeeping.
//!
//! The template compiler, the script transpiler, the style pipeline and the
//! hosting server are collaborators reached through traits; this crate only
//! owns parsing, splitting, assembly and caching.

pub mod assemble;
pub mod compile;
pub mod descriptor;
pub mod plugin;
pub mod runtime;
pub mod utils;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use descriptor::{parse, ParseError, SfcDescriptor};
pub use plugin::artifact_cache::{ArtifactCache, CacheEntry};
pub use plugin::sfc_loader::{ModuleRequest, Route, ServedModule, SfcLoader};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default ceiling of the artifact cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 65535;

/// Describes how components are served.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Project root that logical request paths resolve against.
    pub root: PathBuf,
    /// Production mode. Forwarded to the template compiler and hides
    /// on-disk paths from generated modules.
    pub is_production: bool,
    /// Expose the component's file name in production builds too
    /// (base name only).
    pub expose_filename: bool,
    /// Maximum number of cached documents. Zero disables caching.
    pub cache_capacity: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            is_production: false,
            expose_filename: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl LoaderConfig {
    /// Configuration for `root`, with production mode taken from `NODE_ENV`.
    pub fn from_env(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            is_production: std::env::var("NODE_ENV").map_or(false, |v| v == "production"),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic reported by a section compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// SfcError
// ---------------------------------------------------------------------------

/// Errors that fail a module request.
///
/// Compiler-reported template problems are not errors; they are logged and
/// a degraded module is served instead.
#[derive(Debug, Error)]
pub enum SfcError {
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("No <template> section in '{0}'")]
    MissingTemplate(String),

    #[error("Template compiler failed for '{path}': {message}")]
    TemplateCompiler { path: String, message: String },

    #[error("Script transpile failed for '{path}': {message}")]
    Transpile { path: String, message: String },

    #[error("Unsupported script language `{lang}` in '{path}'")]
    UnsupportedScriptLang { path: String, lang: String },

    #[error("Invalid module request '{0}': {1}")]
    InvalidRequest(String, String),

    #[error("Downstream handler failed: {0}")]
    Downstream(String),
}

impl SfcError {
    /// HTTP-equivalent status for the host server.
    ///
    /// Missing files and missing sections are "not found"; a malformed
    /// request is a client error; everything else is a server-side failure,
    /// including documents that do not parse.
    pub fn status_code(&self) -> u16 {
        match self {
            SfcError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => 404,
            SfcError::MissingTemplate(_) => 404,
            SfcError::InvalidRequest(..) => 400,
            SfcError::Io { .. }
            | SfcError::Parse { .. }
            | SfcError::TemplateCompiler { .. }
            | SfcError::Transpile { .. }
            | SfcError::UnsupportedScriptLang { .. }
            | SfcError::Downstream(_) => 500,
        }
    }
}
