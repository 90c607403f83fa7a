//! The backend through which the expander reads pages and site information.

use crate::{
    config::Limits,
    siteinfo::{MagicWord, Siteinfo},
    title::{Namespace, NsHandler},
};
use std::{collections::HashMap, sync::Arc};

/// An error from a wiki backend. These are passed through to the caller
/// unchanged.
pub type WikiError = Box<dyn std::error::Error + Send + Sync>;

/// The result type for backend operations.
pub type Result<T, E = WikiError> = core::result::Result<T, E>;

/// A page fetched from a wiki.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Page {
    /// The raw wikitext of the page.
    pub rawtext: String,
    /// The fully qualified titles visited while fetching the page, starting
    /// with the requested title and ending with the title of the page which
    /// was actually returned.
    pub names: Vec<String>,
}

/// Per-page overrides of the site information.
#[derive(Clone, Debug, Default)]
pub struct Source {
    /// The language of the page, if it differs from the content language.
    pub language: Option<String>,
    /// Extra magic word aliases.
    pub magicwords: Vec<MagicWord>,
    /// Extra variables, by lowercase magic word name.
    pub locals: HashMap<String, String>,
}

/// A wiki backend.
///
/// Calls are synchronous. A backend which does I/O is free to block.
pub trait Wiki {
    /// Returns the site information of the wiki.
    fn get_siteinfo(&self) -> Result<Arc<Siteinfo>>;

    /// Returns the raw wikitext of a template. Names without a namespace
    /// prefix are in the Template namespace. Redirects are followed.
    fn get_template(&self, name: &str) -> Result<Option<String>>;

    /// Returns a page. Names without a namespace prefix are in the main
    /// namespace. Redirects are followed.
    fn get_page(&self, name: &str, revision: Option<&str>) -> Result<Option<Page>>;

    /// Returns the per-page overrides for a page, if there are any.
    fn get_source(&self, pagename: &str, revision: Option<&str>) -> Result<Option<Source>> {
        let _ = (pagename, revision);
        Ok(None)
    }
}

/// A wiki which keeps every page in memory.
#[derive(Debug)]
pub struct MemoryWiki {
    /// Site information.
    siteinfo: Arc<Siteinfo>,
    /// Title normaliser.
    nshandler: NsHandler,
    /// Page text, by fully qualified title.
    pages: HashMap<String, String>,
    /// Per-page overrides, by fully qualified title.
    sources: HashMap<String, Source>,
    /// Fetch limits; `max_redirects` bounds redirect chains.
    limits: Limits,
}

impl Default for MemoryWiki {
    fn default() -> Self {
        Self::new(Siteinfo::builtin())
    }
}

impl MemoryWiki {
    /// Creates an empty wiki with the given site information.
    pub fn new(siteinfo: Arc<Siteinfo>) -> Self {
        Self {
            nshandler: NsHandler::new(&siteinfo),
            siteinfo,
            pages: HashMap::new(),
            sources: HashMap::new(),
            limits: Limits::default(),
        }
    }

    /// Sets the limits used when fetching pages.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Adds a page. Titles without a namespace prefix are in the main
    /// namespace.
    #[must_use]
    pub fn with_page(mut self, title: &str, text: impl Into<String>) -> Self {
        self.insert(title, Namespace::MAIN, text);
        self
    }

    /// Adds a template. Names without a namespace prefix are in the Template
    /// namespace.
    #[must_use]
    pub fn with_template(mut self, name: &str, text: impl Into<String>) -> Self {
        self.insert(name, Namespace::TEMPLATE, text);
        self
    }

    /// Adds per-page overrides.
    #[must_use]
    pub fn with_source(mut self, title: &str, source: Source) -> Self {
        let title = self.nshandler.get_fqname(title, Namespace::MAIN);
        self.sources.insert(title, source);
        self
    }

    /// Adds or replaces a page.
    pub fn insert(&mut self, title: &str, default_ns: i32, text: impl Into<String>) {
        let title = self.nshandler.get_fqname(title, default_ns);
        self.pages.insert(title, text.into());
    }

    /// Finds a page, following redirects.
    fn resolve(&self, name: &str, default_ns: i32) -> Option<Page> {
        let mut title = self.nshandler.get_fqname(name, default_ns);
        let mut names = Vec::new();
        loop {
            let text = self.pages.get(&title)?;
            names.push(title);
            let Some(target) = self.nshandler.redirect_matcher(text) else {
                return Some(Page {
                    rawtext: text.clone(),
                    names,
                });
            };
            if names.len() > self.limits.max_redirects {
                log::warn!(
                    "Too many redirects fetching '{name}': {}",
                    names.join(" -> ")
                );
                return None;
            }
            title = self.nshandler.get_fqname(&target, Namespace::MAIN);
        }
    }
}

impl Wiki for MemoryWiki {
    fn get_siteinfo(&self) -> Result<Arc<Siteinfo>> {
        Ok(Arc::clone(&self.siteinfo))
    }

    fn get_template(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .resolve(name, Namespace::TEMPLATE)
            .map(|page| page.rawtext))
    }

    fn get_page(&self, name: &str, _revision: Option<&str>) -> Result<Option<Page>> {
        Ok(self.resolve(name, Namespace::MAIN))
    }

    fn get_source(&self, pagename: &str, _revision: Option<&str>) -> Result<Option<Source>> {
        let title = self.nshandler.get_fqname(pagename, Namespace::MAIN);
        Ok(self.sources.get(&title).cloned())
    }
}
