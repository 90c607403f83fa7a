//! A cache of parsed template bodies which is shared between expanders.

use crate::{
    alias::AliasMap, config::Limits, parser::Node, preprocess::Mode, uniq::UniqEntry,
};
use parking_lot::Mutex;
use schnellru::{ByLength, LruMap};
use sha2::{Digest, Sha256};
use std::sync::{Arc, LazyLock};

/// A cache key. See [`ParseCache::key`].
pub type CacheKey = [u8; 32];

/// A parsed body of wikitext.
#[derive(Debug)]
pub struct ParsedBody {
    /// The optimised parse tree.
    pub tree: Node,
    /// The placeholder markers which were registered when the body was
    /// parsed. An expander using the tree must adopt them.
    pub markers: Vec<(String, UniqEntry)>,
}

/// An LRU cache of parse trees.
///
/// Parsing happens outside of the lock, so two threads missing on the same
/// key may both parse it. Trees are pure values, so the last writer wins.
pub struct ParseCache {
    /// The cached trees.
    inner: Mutex<LruMap<CacheKey, Arc<ParsedBody>>>,
}

impl core::fmt::Debug for ParseCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParseCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(Limits::default().parse_cache_size)
    }
}

impl ParseCache {
    /// Creates a new cache holding at most `size` trees.
    pub fn new(size: u32) -> Self {
        Self {
            inner: Mutex::new(LruMap::new(ByLength::new(size))),
        }
    }

    /// The process-wide cache.
    pub fn shared() -> Arc<Self> {
        static SHARED: LazyLock<Arc<ParseCache>> = LazyLock::new(Default::default);
        Arc::clone(&SHARED)
    }

    /// Computes the cache key of a body. Trees are specialised by alias map,
    /// so the map is part of the key.
    pub fn key(mode: Mode, aliases: &AliasMap, body: &str) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(match mode {
            Mode::Included => b"included\0",
            Mode::TopLevel => b"toplevel\0",
        });
        hasher.update(aliases.fingerprint());
        hasher.update(body.as_bytes());
        hasher.finalize().into()
    }

    /// Returns the tree for `key`, calling `parse` to create it if it is not
    /// in the cache.
    pub fn get_or_parse<F>(&self, key: &CacheKey, parse: F) -> Arc<ParsedBody>
    where
        F: FnOnce() -> ParsedBody,
    {
        if let Some(hit) = self.inner.lock().get(key).cloned() {
            log::debug!("Parse cache hit for {}", short_hex(key));
            return hit;
        }

        log::debug!("Parse cache miss for {}", short_hex(key));
        let parsed = Arc::new(parse());
        self.inner.lock().insert(*key, Arc::clone(&parsed));
        parsed
    }

    /// The number of cached trees.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drops every cached tree.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

/// Formats the start of a key for logging.
fn short_hex(key: &CacheKey) -> String {
    key[..6].iter().map(|b| format!("{b:02x}")).collect()
}
