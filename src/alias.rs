//! Resolution of localised magic word and parser function names.

use crate::siteinfo::MagicWord;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// A map from localised magic word aliases to canonical names.
///
/// Every alias is registered in two forms: the bare word (`als` → `if`) and
/// the parser function form (`#als` → `#if`). Trailing colons on aliases are
/// ignored.
#[derive(Clone, Debug)]
pub struct AliasMap {
    /// Aliases which must match exactly.
    exact: BTreeMap<String, String>,
    /// Lowercased aliases which match case-insensitively.
    folded: BTreeMap<String, String>,
    /// Canonical names that the wiki defines aliases for.
    known: HashSet<String>,
    /// A digest of the map contents.
    fingerprint: [u8; 32],
}

impl Default for AliasMap {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl AliasMap {
    /// Creates a new alias map from the given magic words.
    pub fn new(words: &[MagicWord]) -> Self {
        let mut map = Self {
            exact: BTreeMap::new(),
            folded: BTreeMap::new(),
            known: HashSet::new(),
            fingerprint: [0; 32],
        };
        map.extend(words);
        map
    }

    /// Adds more magic words to the map. Later aliases replace earlier ones.
    pub fn extend(&mut self, words: &[MagicWord]) {
        for word in words {
            let name = word.name.to_lowercase();
            for alias in &word.aliases {
                let alias = alias.strip_suffix(':').unwrap_or(alias).trim();
                if alias.is_empty() {
                    continue;
                }
                let target = if word.case_sensitive {
                    &mut self.exact
                } else {
                    &mut self.folded
                };
                let key = if word.case_sensitive {
                    alias.to_string()
                } else {
                    alias.to_lowercase()
                };
                if !key.starts_with('#') {
                    target.insert(format!("#{key}"), format!("#{name}"));
                }
                target.insert(key, name.clone());
            }
            self.known.insert(name);
        }

        let mut hasher = Sha256::new();
        for (kind, map) in [(b'e', &self.exact), (b'f', &self.folded)] {
            for (alias, name) in map {
                hasher.update([kind]);
                hasher.update(alias.as_bytes());
                hasher.update([0]);
                hasher.update(name.as_bytes());
                hasher.update([0]);
            }
        }
        self.fingerprint = hasher.finalize().into();

        log::debug!(
            "Alias map has {} exact and {} case-insensitive aliases for {} words",
            self.exact.len(),
            self.folded.len(),
            self.known.len()
        );
    }

    /// Resolves a (possibly localised) name to its lowercase canonical name.
    ///
    /// Names which are not aliases resolve to their own lowercase form, unless
    /// the wiki defines aliases for that canonical name, in which case the
    /// name only resolves through one of those aliases.
    pub fn resolve(&self, word: &str) -> Option<String> {
        let word = word.trim();
        if word.is_empty() {
            return None;
        }
        if let Some(name) = self.exact.get(word) {
            return Some(name.clone());
        }
        let lower = word.to_lowercase();
        if let Some(name) = self.folded.get(&lower) {
            return Some(name.clone());
        }
        let bare = lower.strip_prefix('#').unwrap_or(&lower);
        (!self.known.contains(bare)).then_some(lower)
    }

    /// Returns true if `word` is the `#default` keyword of `#switch`.
    pub fn is_default(&self, word: &str) -> bool {
        self.resolve(word)
            .is_some_and(|name| name == "default" || name == "#default")
    }

    /// A digest of the map contents, used to distinguish parse trees
    /// specialised with different maps.
    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }
}
