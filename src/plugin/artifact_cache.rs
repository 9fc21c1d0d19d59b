//! Thread-safe artifact cache keyed by resolved file path.
//!
//! The main module request parses the document and compiles its script;
//! sub-requests for the same file that follow shortly after reuse the
//! descriptor and memoized compile results instead of redoing the work.
//! Bounded with least-recently-used eviction. Entries are replaced whole,
//! never merged, so concurrent writers for the same key are last-write-wins.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arcstr::ArcStr;
use sha2::{Digest, Sha256};

use crate::descriptor::SfcDescriptor;

/// Everything remembered about one document.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// SHA-256 of the text the descriptor was parsed from.
    pub source_hash: String,
    pub descriptor: Arc<SfcDescriptor>,
    /// Compiled template sub-module.
    pub template: Option<TemplateArtifact>,
    /// Rewritten script binding.
    pub script: Option<ArcStr>,
    /// Custom block types seen in the document.
    pub customs: Vec<String>,
}

impl CacheEntry {
    pub fn new(source: &str, descriptor: SfcDescriptor) -> Self {
        Self {
            source_hash: content_hash(source),
            customs: descriptor.custom_block_types(),
            descriptor: Arc::new(descriptor),
            template: None,
            script: None,
        }
    }

    /// Whether this entry was built from exactly `source`.
    pub fn matches(&self, source: &str) -> bool {
        self.source_hash == content_hash(source)
    }
}

/// A compiled template together with the asset base it was compiled
/// against. The base comes from the requested path, so two paths that
/// resolve to one file may need different modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateArtifact {
    pub asset_base: String,
    pub code: ArcStr,
}

impl CacheEntry {
    /// The memoized template module, if it was compiled for `asset_base`.
    pub fn template_for(&self, asset_base: &str) -> Option<&ArcStr> {
        self.template
            .as_ref()
            .filter(|t| t.asset_base == asset_base)
            .map(|t| &t.code)
    }
}

pub fn content_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug)]
struct LruStore {
    capacity: usize,
    tick: u64,
    entries: HashMap<String, (CacheEntry, u64)>,
    /// Last-use tick -> key, oldest first.
    order: BTreeMap<u64, String>,
}

impl LruStore {
    fn touch(&mut self, key: &str) {
        self.tick += 1;
        let tick = self.tick;
        if let Some((_, last_used)) = self.entries.get_mut(key) {
            self.order.remove(&*last_used);
            *last_used = tick;
            self.order.insert(tick, key.to_string());
        }
    }

    fn evict_if_needed(&mut self) {
        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

/// Bounded LRU cache of [`CacheEntry`] values. Clones share storage.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    inner: Arc<Mutex<LruStore>>,
}

impl ArtifactCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LruStore {
                capacity,
                tick: 0,
                entries: HashMap::new(),
                order: BTreeMap::new(),
            })),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    fn lock(&self) -> MutexGuard<'_, LruStore> {
        // entries are replaced whole, so a poisoned store is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get an entry and mark it as recently used.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut store = self.lock();
        let entry = store.entries.get(key).map(|(entry, _)| entry.clone());
        if entry.is_some() {
            store.touch(key);
        }
        entry
    }

    /// Insert or replace the entry for `key`.
    pub fn set(&self, key: impl Into<String>, entry: CacheEntry) {
        let mut store = self.lock();
        if store.capacity == 0 {
            return;
        }
        let key = key.into();
        store.tick += 1;
        let tick = store.tick;
        if let Some((_, last_used)) = store.entries.insert(key.clone(), (entry, tick)) {
            store.order.remove(&last_used);
        }
        store.order.insert(tick, key);
        store.evict_if_needed();
    }

    /// Drop the entry for `key`. Called when the file changes on disk.
    pub fn invalidate(&self, key: &str) -> Option<CacheEntry> {
        let mut store = self.lock();
        let (entry, last_used) = store.entries.remove(key)?;
        store.order.remove(&last_used);
        Some(entry)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn clear(&self) {
        let mut store = self.lock();
        store.entries.clear();
        store.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CACHE_CAPACITY)
    }
}
