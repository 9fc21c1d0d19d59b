//! Utility functions for the loader.
//!
//! - Virtual module paths and query parsing
//! - Component id derivation
//! - JS string escaping (injection-safe)

use std::path::{Path, PathBuf};

use crate::SfcError;

// ---------------------------------------------------------------------------
// Virtual Module Paths
// ---------------------------------------------------------------------------

/// Extension of single-file component documents.
pub const SFC_EXTENSION: &str = ".vue";

/// Fixed path serving the component normalizer runtime.
pub const NORMALIZER_PATH: &str = "/vite/vueComponentNormalizer";

/// Fixed path serving the hot-update runtime.
pub const HOT_RELOAD_PATH: &str = "/vite/vueHotReload";

/// Control path of the live-reload client, rewritten after the downstream
/// handler produced it.
pub const HMR_CLIENT_PATH: &str = "/vite/hmr";

/// Check if a request path addresses a component document.
pub fn is_sfc_path(path: &str) -> bool {
    path.ends_with(SFC_EXTENSION)
}

/// Sub-path serving the compiled template of a component.
pub fn template_request(logical_path: &str) -> String {
    format!("{}?type=template", logical_path)
}

/// Sub-path serving the `index`-th style section of a component.
pub fn style_request(logical_path: &str, index: usize) -> String {
    format!("{}?type=style&index={}", logical_path, index)
}

/// Style sub-path flagged as a CSS module.
pub fn style_module_request(logical_path: &str, index: usize) -> String {
    format!("{}&module", style_request(logical_path, index))
}

/// Split a request URL into its path and raw query string.
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

/// Parse a raw query string into ordered `(key, value)` pairs.
/// Bare keys (`&module`) get an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Resolve a logical request path to a file under `root`.
pub fn request_to_file(root: &Path, logical_path: &str) -> PathBuf {
    root.join(logical_path.trim_start_matches('/'))
}

/// Cache key for a resolved file. Separators are normalized so the same
/// file always maps to the same key.
pub fn cache_key(file_path: &Path) -> String {
    file_path.to_string_lossy().replace('\\', "/")
}

/// POSIX dirname of a logical path (`/a/b.vue` -> `/a`, `/b.vue` -> `/`).
pub fn posix_dirname(logical_path: &str) -> &str {
    match logical_path.rfind('/') {
        Some(0) => "/",
        Some(i) => &logical_path[..i],
        None => ".",
    }
}

// ---------------------------------------------------------------------------
// Component Id
// ---------------------------------------------------------------------------

/// Derive the short component id from a logical path.
///
/// The id scopes CSS and keys hot-update records, so it must only ever
/// depend on the path.
pub fn component_id(logical_path: &str) -> String {
    stable_hash_8(logical_path)
}

fn stable_hash_8(content: &str) -> String {
    let mut hash: i32 = 0;
    for byte in content.bytes() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(byte as i32);
    }
    let normalized = hash.wrapping_abs() as u32;
    format!("{normalized:08x}")
}

// ---------------------------------------------------------------------------
// JS String Escaping
// ---------------------------------------------------------------------------

/// Escape a string for safe embedding inside a JS double-quoted string literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Quote a string as a JS double-quoted literal.
pub fn js_string(s: &str) -> String {
    format!("\"{}\"", escape_js_string(s))
}

/// Parse a style `index` query value.
pub(crate) fn parse_index(url: &str, raw: &str) -> Result<usize, SfcError> {
    raw.parse::<usize>().map_err(|_| {
        SfcError::InvalidRequest(url.to_string(), format!("`index={}` is not a number", raw))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
