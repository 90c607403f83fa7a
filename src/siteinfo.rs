//! Per-wiki configuration, in the shape of the MediaWiki
//! `action=query&meta=siteinfo` API response.

use crate::title::NamespaceCase;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::sync::{Arc, LazyLock};

/// Site information.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Siteinfo {
    /// General wiki settings.
    pub general: General,
    /// Namespaces, keyed by the string form of their ID.
    #[serde(default)]
    pub namespaces: IndexMap<String, NamespaceInfo>,
    /// Alternative names for namespaces.
    #[serde(default)]
    pub namespacealiases: Vec<NamespaceAlias>,
    /// Magic words and their localised aliases.
    #[serde(default)]
    pub magicwords: Vec<MagicWord>,
    /// Interwiki prefixes.
    #[serde(default)]
    pub interwikimap: Vec<Interwiki>,
}

/// General wiki settings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct General {
    /// The name of the wiki.
    #[serde(default)]
    pub sitename: String,
    /// The content language code.
    #[serde(default = "default_lang")]
    pub lang: String,
    /// The URL of the main page, used to derive server and paths.
    #[serde(default)]
    pub base: String,
    /// The default title case rule.
    #[serde(default)]
    pub case: NamespaceCase,
    /// The server URL, possibly protocol-relative.
    pub server: Option<String>,
    /// The article path, with `$1` for the title.
    pub articlepath: Option<String>,
    /// The script directory path.
    pub scriptpath: Option<String>,
    /// The path to `index.php`.
    pub script: Option<String>,
}

/// The default content language.
fn default_lang() -> String {
    "en".into()
}

/// A namespace definition.
#[derive(Clone, Debug, Deserialize)]
pub struct NamespaceInfo {
    /// The namespace ID.
    pub id: i32,
    /// The localised display name.
    #[serde(rename = "*", default)]
    pub name: String,
    /// The canonical (English) name.
    pub canonical: Option<String>,
    /// The title case rule, if it differs from the wiki default.
    pub case: Option<NamespaceCase>,
    /// Whether the namespace allows subpages.
    #[serde(default, deserialize_with = "flag")]
    pub subpages: bool,
}

/// An alternative namespace name.
#[derive(Clone, Debug, Deserialize)]
pub struct NamespaceAlias {
    /// The namespace ID.
    pub id: i32,
    /// The alias.
    #[serde(rename = "*")]
    pub alias: String,
}

/// A magic word with its localised aliases.
#[derive(Clone, Debug, Deserialize)]
pub struct MagicWord {
    /// The canonical name.
    pub name: String,
    /// The aliases, which usually include the canonical spelling.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Whether the aliases must match exactly.
    #[serde(rename = "case-sensitive", default, deserialize_with = "flag")]
    pub case_sensitive: bool,
}

/// An interwiki prefix.
#[derive(Clone, Debug, Deserialize)]
pub struct Interwiki {
    /// The prefix used in links.
    pub prefix: String,
    /// The target URL with `$1` for the title.
    pub url: String,
    /// Whether the target is considered local.
    #[serde(default, deserialize_with = "flag")]
    pub local: bool,
    /// The language of the target, for language links.
    pub language: Option<String>,
}

/// Deserialises an API boolean. In the legacy API format, a flag is true
/// when present (usually with an empty string value); the newer format uses
/// JSON booleans.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
        Flag::Str(value) => value != "0",
    })
}

impl Siteinfo {
    /// Returns the bundled English Wikipedia site information.
    pub fn builtin() -> Arc<Self> {
        static BUILTIN: LazyLock<Arc<Siteinfo>> = LazyLock::new(|| {
            Arc::new(
                Siteinfo::from_json(include_str!("../res/siteinfo.en.json"))
                    .expect("bundled siteinfo is valid"),
            )
        });
        Arc::clone(&BUILTIN)
    }

    /// Parses site information from JSON, either bare or wrapped in an API
    /// `query` envelope.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Envelope {
            Query { query: Siteinfo },
            Bare(Siteinfo),
        }

        Ok(match serde_json::from_str(json)? {
            Envelope::Query { query } => query,
            Envelope::Bare(siteinfo) => siteinfo,
        })
    }

    /// The server URL, like `//en.wikipedia.org`.
    pub fn server(&self) -> &str {
        if let Some(server) = &self.general.server {
            return server;
        }
        let base = &self.general.base;
        let after_scheme = base.find("//").map_or(0, |i| i + 2);
        let end = base[after_scheme..]
            .find('/')
            .map_or(base.len(), |i| after_scheme + i);
        &base[..end]
    }

    /// The server host name, like `en.wikipedia.org`.
    pub fn server_name(&self) -> &str {
        let server = self.server();
        let host = server.find("//").map_or(server, |i| &server[i + 2..]);
        host.split([':', '/']).next().unwrap_or(host)
    }

    /// The article path, like `/wiki/$1`.
    pub fn article_path(&self) -> &str {
        self.general.articlepath.as_deref().unwrap_or("/wiki/$1")
    }

    /// The script directory, like `/w`.
    pub fn script_path(&self) -> &str {
        self.general.scriptpath.as_deref().unwrap_or("/w")
    }

    /// The path to `index.php`.
    pub fn script(&self) -> String {
        self.general
            .script
            .clone()
            .unwrap_or_else(|| format!("{}/index.php", self.script_path()))
    }

    /// Finds an interwiki by prefix, case-insensitively.
    pub fn interwiki(&self, prefix: &str) -> Option<&Interwiki> {
        let prefix = prefix.trim();
        self.interwikimap
            .iter()
            .find(|iw| iw.prefix.eq_ignore_ascii_case(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin() {
        let siteinfo = Siteinfo::builtin();
        assert_eq!(siteinfo.general.sitename, "Wikipedia");
        assert_eq!(siteinfo.general.case, NamespaceCase::FirstLetter);
        assert_eq!(siteinfo.namespaces["10"].name, "Template");
        assert!(siteinfo.namespaces["2"].subpages);
        assert!(!siteinfo.namespaces["0"].subpages);
        let currentyear = siteinfo
            .magicwords
            .iter()
            .find(|word| word.name == "currentyear")
            .unwrap();
        assert!(currentyear.case_sensitive);
        assert_eq!(siteinfo.server(), "//en.wikipedia.org");
        assert_eq!(siteinfo.server_name(), "en.wikipedia.org");
        assert!(siteinfo.interwiki("WikiPedia").is_some());
    }

    #[test]
    fn envelope_and_flags() {
        let siteinfo = Siteinfo::from_json(
            r#"{"query": {
                "general": {"sitename": "Wiki", "lang": "de", "base": "https://de.example.org/wiki/Hauptseite", "case": "case-sensitive"},
                "magicwords": [
                    {"name": "if", "aliases": ["wenn"]},
                    {"name": "pagename", "aliases": ["SEITENNAME"], "case-sensitive": ""},
                    {"name": "uc", "aliases": ["GROSS:"], "case-sensitive": false}
                ]
            }}"#,
        )
        .unwrap();
        assert_eq!(siteinfo.general.lang, "de");
        assert_eq!(siteinfo.general.case, NamespaceCase::CaseSensitive);
        assert!(!siteinfo.magicwords[0].case_sensitive);
        assert!(siteinfo.magicwords[1].case_sensitive);
        assert!(!siteinfo.magicwords[2].case_sensitive);
        assert_eq!(siteinfo.server(), "https://de.example.org");
        assert_eq!(siteinfo.server_name(), "de.example.org");
        assert_eq!(siteinfo.article_path(), "/wiki/$1");
    }
}
