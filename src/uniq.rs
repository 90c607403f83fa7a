//! Placeholder markers for literal content tags.
//!
//! Tags whose content must never be seen by template expansion are swapped
//! out for opaque markers before anything else happens to the text, and
//! swapped back once expansion is finished. A marker looks like
//! `\x7fUNIQ-<name>-<seq>-<random>-QINU\x7f`.

use regex::{Captures, Regex};
use std::{borrow::Cow, collections::HashMap, sync::LazyLock};

/// The start of every marker.
pub const MARKER_PREFIX: &str = "\x7fUNIQ-";

/// The end of every marker.
pub const MARKER_SUFFIX: &str = "-QINU\x7f";

/// Tags whose content is literal.
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(nowiki|math|ref|pre|source|gallery|imagemap)(\s[^>]*?)?\s*(/)?>").unwrap()
});

/// Matches any marker.
static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\x7fUNIQ-[a-z]+-[0-9]+-[0-9a-f]+-QINU\x7f").unwrap());

/// Closing tag matchers, by lowercase tag name.
static CLOSE_TAGS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    ["nowiki", "math", "ref", "pre", "source", "gallery", "imagemap"]
        .into_iter()
        .map(|name| (name, Regex::new(&format!(r"(?i)</{name}\s*>")).unwrap()))
        .collect()
});

/// Markers are only restored this many levels deep.
const MAX_NESTING: usize = 16;

/// A literal region which was replaced by a marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UniqEntry {
    /// The lowercase tag name.
    pub name: String,
    /// The raw attribute text of the opening tag.
    pub attributes: String,
    /// The tag content, or `None` for a self-closing tag.
    pub inner: Option<String>,
    /// The original text of the whole region.
    pub source: String,
}

/// Swaps literal content regions for markers and back again.
#[derive(Debug)]
pub struct Uniquifier {
    /// The random component shared by every marker from this instance.
    random: String,
    /// The next sequence number.
    seq: usize,
    /// Known markers.
    entries: HashMap<String, UniqEntry>,
}

impl Default for Uniquifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Uniquifier {
    /// Creates a new uniquifier with a fresh random marker component.
    pub fn new() -> Self {
        Self {
            random: format!("{:016x}", rand::random::<u64>()),
            seq: 0,
            entries: HashMap::new(),
        }
    }

    /// Replaces every literal content region in `text` with a marker.
    pub fn replace<'a>(&mut self, text: &'a str) -> Cow<'a, str> {
        let (text, added) = self.scan(text);
        self.entries.extend(added);
        text
    }

    /// Replaces every literal content region in `text` with a marker, and
    /// also returns the newly registered markers.
    pub fn replace_collect<'a>(&mut self, text: &'a str) -> (Cow<'a, str>, Vec<(String, UniqEntry)>) {
        let (text, added) = self.scan(text);
        self.entries.extend(added.iter().cloned());
        (text, added)
    }

    /// Finds and registers literal regions.
    fn scan<'a>(&mut self, text: &'a str) -> (Cow<'a, str>, Vec<(String, UniqEntry)>) {
        let mut added = Vec::new();
        let mut out = String::new();
        let mut flushed = 0;
        let mut pos = 0;
        while let Some(caps) = OPEN_TAG.captures_at(text, pos) {
            let open = caps.get(0).map_or(pos..pos, |m| m.range());
            let name = caps[1].to_ascii_lowercase();
            let attributes = caps.get(2).map_or("", |m| m.as_str()).to_string();

            let (inner, end) = if caps.get(3).is_some() {
                (None, open.end)
            } else if let Some(close) = CLOSE_TAGS
                .get(name.as_str())
                .and_then(|close| close.find_at(text, open.end))
            {
                (Some(text[open.end..close.start()].to_string()), close.end())
            } else {
                // Unclosed tags are plain text
                pos = open.end;
                continue;
            };

            let marker = format!(
                "{MARKER_PREFIX}{name}-{}-{}{MARKER_SUFFIX}",
                self.seq, self.random
            );
            self.seq += 1;

            out += &text[flushed..open.start];
            out += &marker;
            added.push((
                marker,
                UniqEntry {
                    name,
                    attributes,
                    inner,
                    source: text[open.start..end].to_string(),
                },
            ));
            flushed = end;
            pos = end;
        }

        let text = if added.is_empty() {
            Cow::Borrowed(text)
        } else {
            out += &text[flushed..];
            Cow::Owned(out)
        };
        (text, added)
    }

    /// Registers markers which were created by another uniquifier, e.g. ones
    /// stored alongside a cached parse tree.
    pub fn adopt<'a, I>(&mut self, markers: I)
    where
        I: IntoIterator<Item = &'a (String, UniqEntry)>,
    {
        for (marker, entry) in markers {
            self.entries
                .entry(marker.clone())
                .or_insert_with(|| entry.clone());
        }
    }

    /// Returns the entry for the given marker.
    pub fn get(&self, marker: &str) -> Option<&UniqEntry> {
        self.entries.get(marker)
    }

    /// The number of registered markers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no markers are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every registered marker.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces every known marker in `text` with its original source.
    /// Unknown markers are left alone.
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for _ in 0..MAX_NESTING {
            if self.entries.is_empty() || !out.contains(MARKER_PREFIX) {
                break;
            }
            let mut changed = false;
            let next = MARKER
                .replace_all(&out, |caps: &Captures<'_>| {
                    if let Some(entry) = self.entries.get(&caps[0]) {
                        changed = true;
                        entry.source.clone()
                    } else {
                        caps[0].to_string()
                    }
                })
                .into_owned();
            if !changed {
                break;
            }
            out = next;
        }
        out
    }

    /// Removes all markers from `text`.
    pub fn kill(text: &str) -> Cow<'_, str> {
        MARKER.replace_all(text, "")
    }

    /// Applies `f` to every part of `text` which is not a marker.
    pub fn for_each_non_marker<F>(text: &str, mut f: F) -> Cow<'_, str>
    where
        F: FnMut(&str) -> String,
    {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for marker in MARKER.find_iter(text) {
            out += &f(&text[last..marker.start()]);
            out += marker.as_str();
            last = marker.end();
        }
        out += &f(&text[last..]);
        if out == text {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn check_round_trip(text: &str) {
        let mut uniq = Uniquifier::new();
        let replaced = uniq.replace(text).into_owned();
        assert_eq!(uniq.restore(&replaced), text, "round trip of {text:?}");
    }

    #[test]
    fn round_trip() {
        check_round_trip("");
        check_round_trip("plain {{text}}");
        check_round_trip("a<nowiki>{{b}}</nowiki>c");
        check_round_trip("<PRE class=\"x\">A{{Pipe}}B</pre >");
        check_round_trip("<ref name=\"a\"/> and <ref>b</ref>");
        check_round_trip("<math>x</math><nowiki>unclosed");
    }

    #[test]
    fn entries() {
        let mut uniq = Uniquifier::new();
        let text = uniq.replace("x<ref name=a />y<nowiki>{{z}}</nowiki>");
        assert!(!text.contains("{{z}}"), "content hidden: {text:?}");
        assert_eq!(uniq.len(), 2);

        let markers = MARKER.find_iter(&text).map(|m| m.as_str().to_string()).collect::<Vec<_>>();
        assert_eq!(markers.len(), 2);

        let reference = uniq.get(&markers[0]).unwrap();
        assert_eq!(reference.name, "ref");
        assert_eq!(reference.attributes, " name=a");
        assert_eq!(reference.inner, None, "self-closing tag has no content");

        let nowiki = uniq.get(&markers[1]).unwrap();
        assert_eq!(nowiki.inner.as_deref(), Some("{{z}}"));
        assert!(markers[1].starts_with("\x7fUNIQ-nowiki-1-"));
    }

    #[test]
    fn unclosed_and_lookalikes() {
        let mut uniq = Uniquifier::new();
        for text in ["<nowiki>open", "<prefix>x</prefix>", "<references/>"] {
            assert_eq!(uniq.replace(text), text);
        }
        assert!(uniq.is_empty());
    }

    #[test]
    fn adopt() {
        let mut first = Uniquifier::new();
        let (text, added) = first.replace_collect("<nowiki>a</nowiki>");
        let mut second = Uniquifier::new();
        assert_eq!(second.restore(&text), text, "unknown markers are left alone");
        second.adopt(&added);
        assert_eq!(second.restore(&text), "<nowiki>a</nowiki>");
    }

    #[test]
    fn nested_restore() {
        let mut uniq = Uniquifier::new();
        let inner = uniq.replace("<nowiki>x</nowiki>").into_owned();
        let outer = uniq.replace(&format!("<ref>{inner}</ref>")).into_owned();
        assert_eq!(uniq.restore(&outer), "<ref><nowiki>x</nowiki></ref>");
    }

    #[test]
    fn non_markers() {
        let mut uniq = Uniquifier::new();
        let text = uniq.replace("ab<nowiki>c</nowiki>de").into_owned();
        let upper = Uniquifier::for_each_non_marker(&text, str::to_uppercase);
        assert_eq!(uniq.restore(&upper), "AB<nowiki>c</nowiki>DE");
        assert_eq!(Uniquifier::kill(&text), "abde");
    }
}
