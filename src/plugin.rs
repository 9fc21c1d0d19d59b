//! Dev-server plugin surface: the request dispatcher, its artifact cache
//! and the source loaders it reads documents through.

pub mod artifact_cache;
pub mod sfc_loader;
pub mod sources;

pub use artifact_cache::{ArtifactCache, CacheEntry, TemplateArtifact};
pub use sfc_loader::{
    rewrite_hmr_client, Downstream, InfraModule, ModuleRequest, NoDownstream, Route,
    ServedModule, SfcLoader,
};
pub use sources::{FsSources, MemorySources, SourceLoader};
