//! Types and functions for parsing and formatting MediaWiki title strings.

use crate::siteinfo::Siteinfo;
use html_escape::decode_html_entities;
use regex::Regex;
use serde::Deserialize;
use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
};

/// The title casing strategy for a namespace.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceCase {
    /// The first letter of the title is capitalised.
    #[default]
    FirstLetter,
    /// The title is case-sensitive.
    CaseSensitive,
}

/// An article namespace.
#[derive(Clone, Debug, Eq)]
pub struct Namespace {
    /// The namespace ID.
    pub id: i32,
    /// The display name of the namespace.
    pub name: String,
    /// The canonical name of the namespace.
    ///
    /// For example, the canonical 'Project' namespace, present on all MW
    /// installations, is normally given a display name matching the name of the
    /// wiki.
    pub canonical: Option<String>,
    /// The case folding strategy for titles in the namespace.
    pub case: NamespaceCase,
    /// Whether the namespace supports subpages.
    pub subpages: bool,
    /// Named aliases for the namespace.
    pub aliases: Vec<String>,
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Namespace {
    /// The special namespace ID used for direct links to media files.
    pub const MEDIA: i32 = -2;
    /// The special namespace ID used for dynamic pages.
    pub const SPECIAL: i32 = -1;
    /// The main namespace ID.
    pub const MAIN: i32 = 0;
    /// The talk namespace ID.
    pub const TALK: i32 = 1;
    /// The user namespace ID.
    pub const USER: i32 = 2;
    /// The project namespace ID.
    pub const PROJECT: i32 = 4;
    /// The file namespace ID.
    pub const FILE: i32 = 6;
    /// The template namespace ID.
    pub const TEMPLATE: i32 = 10;
    /// The category namespace ID.
    pub const CATEGORY: i32 = 14;

    /// Returns the associated ID (talk -> subject, or subject -> talk) of this
    /// namespace.
    #[inline]
    pub const fn associated_id(&self) -> i32 {
        if self.is_talk() {
            self.id - 1
        } else {
            self.id + 1
        }
    }

    /// Returns true if this is a talk namespace.
    #[inline]
    pub const fn is_talk(&self) -> bool {
        self.id > Namespace::MAIN && self.id % 2 == 1
    }

    /// Returns the talk namespace ID for this namespace. If this namespace
    /// is a talk namespace, it is the same ID as this namespace ID. Virtual
    /// namespaces have no talk namespace.
    #[inline]
    pub const fn talk_id(&self) -> Option<i32> {
        if self.id < Namespace::MAIN {
            None
        } else if self.is_talk() {
            Some(self.id)
        } else {
            Some(self.id + 1)
        }
    }

    /// Returns the subject namespace ID for this namespace. If this namespace
    /// is a subject namespace, it is the same ID as this namespace ID.
    #[inline]
    pub const fn subject_id(&self) -> i32 {
        if self.is_talk() { self.id - 1 } else { self.id }
    }
}

/// A normalised article title.
#[derive(Clone, Debug, Eq)]
pub struct Title {
    /// The namespace ID of the title.
    namespace: i32,

    /// The location of the namespace delimiter in the title, if one exists.
    ///
    /// ```text
    /// Namespace:Title/Sub/Page
    ///          ^
    /// ```
    ns_delimiter: Option<usize>,

    /// Whether the namespace of the title supports subpages.
    subpages: bool,

    /// The full title text.
    text: String,
}

impl PartialEq for Title {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Title {
    /// The parent path of the page.
    ///
    /// ```text
    /// Namespace:Title/Sub/Page
    ///           ^^^^^^^^^
    /// ```
    pub fn base_text(&self) -> &str {
        let text = self.text();
        if self.subpages {
            text.rsplit_once('/').map_or(text, |(base, _)| base)
        } else {
            text
        }
    }

    /// The title’s namespace ID.
    pub fn namespace(&self) -> i32 {
        self.namespace
    }

    /// The root path of the page.
    ///
    /// ```text
    /// Namespace:Title/Sub/Page
    ///           ^^^^^
    /// ```
    pub fn root_text(&self) -> &str {
        let text = self.text();
        if self.subpages {
            text.split_once('/').map_or(text, |(root, _)| root)
        } else {
            text
        }
    }

    /// The subpage path of the page.
    ///
    /// ```text
    /// Namespace:Title/Sub/Page
    ///                     ^^^^
    /// ```
    pub fn subpage_text(&self) -> &str {
        let text = self.text();
        if self.subpages {
            text.rsplit_once('/').map_or(text, |(_, sub)| sub)
        } else {
            text
        }
    }

    /// The path of the page.
    ///
    /// ```text
    /// Namespace:Title/Sub/Page
    ///           ^^^^^^^^^^^^^^
    /// ```
    pub fn text(&self) -> &str {
        let start_at = self.ns_delimiter.map_or(0, |d| d + 1);
        &self.text[start_at..]
    }

    /// The namespace part of the title.
    ///
    /// ```text
    /// Namespace:Title/Sub/Page
    /// ^^^^^^^^^
    /// ```
    pub fn ns_text(&self) -> &str {
        &self.text[..self.ns_delimiter.unwrap_or(0)]
    }

    /// The full text of the title.
    ///
    /// ```text
    /// Namespace:Title/Sub/Page
    /// ^^^^^^^^^^^^^^^^^^^^^^^^
    /// ```
    pub fn full_text(&self) -> &str {
        &self.text
    }
}

impl core::fmt::Display for Title {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Namespace splitter and canonicaliser for a single wiki.
#[derive(Debug)]
pub struct NsHandler {
    /// The wiki’s namespaces, by ID.
    namespaces: BTreeMap<i32, Namespace>,
    /// Lowercased display names, canonical names, and aliases, to ID.
    names: HashMap<String, i32>,
    /// The casing strategy for namespaces which do not declare one.
    case: NamespaceCase,
    /// Matches `#REDIRECT [[Target]]` in any of the wiki’s redirect aliases.
    redirect: Option<Regex>,
}

impl NsHandler {
    /// Creates a new namespace handler from site information.
    pub fn new(siteinfo: &Siteinfo) -> Self {
        let mut namespaces = BTreeMap::new();
        let mut names = HashMap::new();
        for ns in siteinfo.namespaces.values() {
            let namespace = Namespace {
                id: ns.id,
                name: ns.name.clone(),
                canonical: ns.canonical.clone(),
                case: ns.case.unwrap_or(siteinfo.general.case),
                subpages: ns.subpages,
                aliases: Vec::new(),
            };
            for name in [Some(&namespace.name), namespace.canonical.as_ref()]
                .into_iter()
                .flatten()
                .filter(|name| !name.is_empty())
            {
                names.insert(name_key(name), ns.id);
            }
            namespaces.insert(ns.id, namespace);
        }

        for alias in &siteinfo.namespacealiases {
            names.insert(name_key(&alias.alias), alias.id);
            if let Some(ns) = namespaces.get_mut(&alias.id) {
                ns.aliases.push(alias.alias.clone());
            }
        }

        let mut redirects = siteinfo
            .magicwords
            .iter()
            .filter(|word| word.name == "redirect")
            .flat_map(|word| word.aliases.iter())
            .map(|alias| regex::escape(alias))
            .collect::<Vec<_>>();
        if redirects.is_empty() {
            redirects.push(regex::escape("#REDIRECT"));
        }
        let redirect = Regex::new(&format!(
            r"(?i)^\s*(?:{})\s*:?\s*\[\[([^\[\]|]+)(?:\|[^\]]*)?\]\]",
            redirects.join("|")
        ))
        .inspect_err(|err| log::warn!("Could not build redirect matcher: {err}"))
        .ok();

        Self {
            namespaces,
            names,
            case: siteinfo.general.case,
            redirect,
        }
    }

    /// Finds a namespace by its display name, canonical name, or alias.
    pub fn find_by_name(&self, name: &str) -> Option<&Namespace> {
        self.names
            .get(&name_key(name))
            .and_then(|id| self.namespaces.get(id))
    }

    /// Finds a namespace by its ID.
    pub fn namespace(&self, id: i32) -> Option<&Namespace> {
        self.namespaces.get(&id)
    }

    /// Returns the display name of the namespace with the given ID.
    pub fn get_nsname_by_number(&self, id: i32) -> Option<&str> {
        self.namespaces.get(&id).map(|ns| ns.name.as_str())
    }

    /// Splits a title into its namespace ID, its partial (unprefixed) name,
    /// and its fully qualified name. Titles without a namespace prefix are in
    /// `default_ns`, except that a leading colon forces the main namespace.
    pub fn splitname(&self, title: &str, default_ns: i32) -> (i32, String, String) {
        let title = normalize(title);
        let (mut ns, mut rest) = match title.strip_prefix(':') {
            Some(rest) => (Namespace::MAIN, rest.trim_start()),
            None => (default_ns, &*title),
        };

        if let Some((prefix, tail)) = rest.split_once(':')
            && let Some(found) = self.find_by_name(prefix)
        {
            ns = found.id;
            rest = tail.trim_start();
        }

        let case = self.namespaces.get(&ns).map_or(self.case, |ns| ns.case);
        let partial = match case {
            NamespaceCase::FirstLetter => ucfirst(rest),
            NamespaceCase::CaseSensitive => rest.to_string(),
        };
        let fqname = match self.get_nsname_by_number(ns) {
            Some(name) if !name.is_empty() => format!("{name}:{partial}"),
            _ => partial.clone(),
        };
        (ns, partial, fqname)
    }

    /// Returns the fully qualified name of a title.
    pub fn get_fqname(&self, title: &str, default_ns: i32) -> String {
        self.splitname(title, default_ns).2
    }

    /// Parses a title.
    pub fn title(&self, title: &str, default_ns: i32) -> Title {
        let (namespace, partial, text) = self.splitname(title, default_ns);
        let ns = self.namespaces.get(&namespace);
        let ns_delimiter = (text.len() != partial.len()).then(|| text.len() - partial.len() - 1);
        Title {
            namespace,
            ns_delimiter,
            subpages: ns.is_some_and(|ns| ns.subpages),
            text,
        }
    }

    /// Returns the title of the talk page associated with `title`, or `None`
    /// if the title is in a virtual namespace.
    pub fn talk_page(&self, title: &Title) -> Option<String> {
        let id = self.namespace(title.namespace())?.talk_id()?;
        self.with_namespace(id, title.text())
    }

    /// Returns the title of the subject page associated with `title`.
    pub fn subject_page(&self, title: &Title) -> Option<String> {
        let id = self.namespace(title.namespace())?.subject_id();
        self.with_namespace(id, title.text())
    }

    /// Joins a namespace ID and a partial title.
    fn with_namespace(&self, id: i32, text: &str) -> Option<String> {
        let name = self.get_nsname_by_number(id)?;
        Some(if name.is_empty() {
            text.to_string()
        } else {
            format!("{name}:{text}")
        })
    }

    /// Returns the target of a redirect page, or `None` if `text` is not a
    /// redirect.
    pub fn redirect_matcher(&self, text: &str) -> Option<String> {
        let target = self.redirect.as_ref()?.captures(text)?.get(1)?.as_str();
        let target = target.split_once('#').map_or(target, |(target, _)| target);
        let target = normalize(target);
        (!target.is_empty()).then(|| target.into_owned())
    }
}

/// Uppercases the first character of `text`.
pub(crate) fn ucfirst(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}

/// Creates the lookup key for a namespace name.
fn name_key(name: &str) -> String {
    normalize(name).to_lowercase()
}

/// Returns true if the given character `c` is a bidirectional text control
/// character.
fn bidi(c: char) -> bool {
    ('\u{200e}'..='\u{200f}').contains(&c) || ('\u{202a}'..='\u{202e}').contains(&c)
}

/// Normalises a title text part by decoding HTML entities and converting
/// runs of whitespace + underscore to a single space character.
pub fn normalize(text: &str) -> Cow<'_, str> {
    let decoded = decode_html_entities(text);
    let mut out = String::new();
    let mut flushed = 0;
    let mut iter = decoded.char_indices().peekable();

    while let Some((index, c)) = iter.next() {
        // Peek to avoid switching to owned-mode when encountering a single
        // space
        if trimmable(c) && (c != ' ' || matches!(iter.peek(), Some((_, c)) if trimmable(*c))) {
            while iter.next_if(|(_, c)| trimmable(*c)).is_some() {}

            // This acts like `trim`, not emitting a space at the start or end
            // (`peek().is_none()`) of the text.
            if let Some((next_index, _)) = iter.peek() {
                let segment = &decoded[flushed..index];
                if out.is_empty() {
                    out += segment.trim_start_matches(trimmable);
                } else {
                    out += segment;
                }
                flushed = *next_index;
                if !out.is_empty() && spacelike(c) {
                    out.push(' ');
                }
            }
        }
    }

    if flushed == 0 {
        match decoded {
            Cow::Borrowed(b) => Cow::Borrowed(b.trim_matches(trimmable)),
            Cow::Owned(o) => Cow::Owned(o.trim_matches(trimmable).to_string()),
        }
    } else {
        out += decoded[flushed..].trim_end_matches(trimmable);
        Cow::Owned(out)
    }
}

/// Returns true if the character `c` is considered like whitespace in title
/// text.
fn spacelike(c: char) -> bool {
    c == '_' || c.is_whitespace()
}

/// Returns true if the character `c` is trimmable in title text.
fn trimmable(c: char) -> bool {
    bidi(c) || spacelike(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> NsHandler {
        NsHandler::new(&Siteinfo::builtin())
    }

    #[test]
    fn normalize() {
        assert_eq!(super::normalize("A b"), Cow::Borrowed("A b"));
        assert_eq!(super::normalize("A_b"), "A b");
        assert_eq!(super::normalize("A_______b"), "A b");
        assert_eq!(super::normalize("A__  __b"), "A b");
        assert_eq!(super::normalize("A  b"), "A b");
        assert_eq!(super::normalize("   A b   "), Cow::Borrowed("A b"));
        assert_eq!(super::normalize(" \t A b"), Cow::Borrowed("A b"));
        assert_eq!(super::normalize("\u{200e}A b   \u{202e}"), "A b");
        assert_eq!(super::normalize(" x__y"), "x y");
        assert_eq!(super::normalize("&#32;x__y_"), "x y");
        assert_eq!(super::normalize(" x y__z "), "x y z");
    }

    #[test]
    fn splitname() {
        let ns = handler();
        assert_eq!(
            ns.splitname("foo_bar", Namespace::TEMPLATE),
            (10, "Foo bar".into(), "Template:Foo bar".into())
        );
        assert_eq!(
            ns.splitname("user talk: example", Namespace::MAIN),
            (3, "Example".into(), "User talk:Example".into())
        );
        assert_eq!(
            ns.splitname(":Main page", Namespace::TEMPLATE),
            (0, "Main page".into(), "Main page".into())
        );
        assert_eq!(
            ns.splitname(":Template:X", Namespace::MAIN),
            (10, "X".into(), "Template:X".into())
        );
        assert_eq!(
            ns.splitname("WP:Village pump", Namespace::MAIN),
            (4, "Village pump".into(), "Wikipedia:Village pump".into())
        );
        assert_eq!(
            ns.splitname("Nota namespace:x", Namespace::MAIN),
            (0, "Nota namespace:x".into(), "Nota namespace:x".into())
        );
        assert_eq!(ns.get_fqname("image:a.png", Namespace::MAIN), "File:A.png");
        assert_eq!(
            ns.splitname("&#32;foo__bar", Namespace::TEMPLATE),
            (10, "Foo bar".into(), "Template:Foo bar".into()),
            "leading space is trimmed before a collapsed run"
        );
    }

    #[test]
    fn title_parts() {
        let ns = handler();
        let title = ns.title("User:Example/Sub/Page", Namespace::MAIN);
        assert_eq!(title.namespace(), Namespace::USER);
        assert_eq!(title.ns_text(), "User");
        assert_eq!(title.text(), "Example/Sub/Page");
        assert_eq!(title.base_text(), "Example/Sub");
        assert_eq!(title.root_text(), "Example");
        assert_eq!(title.subpage_text(), "Page");
        assert_eq!(title.full_text(), "User:Example/Sub/Page");
        assert_eq!(ns.talk_page(&title).as_deref(), Some("User talk:Example/Sub/Page"));

        let title = ns.title("AC/DC", Namespace::MAIN);
        assert_eq!(title.ns_text(), "");
        assert_eq!(title.base_text(), "AC/DC", "main namespace has no subpages");
        assert_eq!(ns.talk_page(&title).as_deref(), Some("Talk:AC/DC"));
        assert_eq!(ns.subject_page(&title).as_deref(), Some("AC/DC"));

        let title = ns.title("Special:Random", Namespace::MAIN);
        assert_eq!(ns.talk_page(&title), None);
    }

    #[test]
    fn redirects() {
        let ns = handler();
        assert_eq!(
            ns.redirect_matcher("#REDIRECT [[Template:Foo bar#Section|x]]\n"),
            Some("Template:Foo bar".into())
        );
        assert_eq!(
            ns.redirect_matcher("  #redirect:[[Foo_bar]]"),
            Some("Foo bar".into())
        );
        assert_eq!(ns.redirect_matcher("Not #REDIRECT [[Foo]]"), None);
    }
}
