//! The template expander.
//!
//! An [`Expander`] turns wikitext into wikitext with every template call,
//! template argument, magic word, and parser function replaced by its
//! result. Literal content regions (`<nowiki>`, `<pre>`, and friends) are
//! hidden behind placeholder markers for the duration of the expansion and
//! restored at the end.

pub use args::ArgumentList;
use args::{First, IndexedArgs};
use magic::ParserFn;
use output::Output;

use crate::{
    alias::AliasMap,
    cache::{ParseCache, ParsedBody},
    config::Limits,
    parser::{Node, SwitchKey, SwitchNode, parse},
    php::{DateNames, DateTimeError, fuzzy_cmp},
    preprocess::{Mode, preprocess},
    siteinfo::Siteinfo,
    title::{Namespace, NsHandler, Title},
    uniq::Uniquifier,
    wiki::{Wiki, WikiError},
};
use core::fmt;
use std::{
    borrow::Cow,
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use time::{OffsetDateTime, UtcOffset};

mod args;
mod magic;
mod output;
#[cfg(test)]
mod tests;

/// An expansion error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A template name or argument grew too large.
    #[error("argument of {size} bytes exceeds the {limit} byte limit")]
    MemoryLimit {
        /// The size of the offending text, in bytes.
        size: usize,
        /// The configured limit, in bytes.
        limit: usize,
    },
    /// A template called itself, or the call stack grew too deep.
    #[error("template loop detected: {0}")]
    TemplateRecursion(String),
    /// The caller cancelled the expansion.
    #[error("expansion cancelled")]
    Cancelled,
    /// The wiki backend failed.
    #[error(transparent)]
    Wiki(WikiError),
    /// An expression could not be evaluated.
    #[error("eval error: {0}")]
    Expr(#[from] crate::expr::Error),
    /// A date could not be parsed or formatted.
    #[error(transparent)]
    Time(#[from] DateTimeError),
    /// Writing to a string failed. This should never happen.
    #[error("fmt error: {0}")]
    Fmt(#[from] fmt::Error),
}

/// The result type for expansion operations.
pub type Result<T = (), E = Error> = core::result::Result<T, E>;

/// A handle used to cancel an expansion from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a new token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every expansion using this token. The expansions stop at their
    /// next template call.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true if [`Self::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A template expander for one page.
pub struct Expander<'w> {
    /// The wiki backend.
    wiki: &'w dyn Wiki,
    /// Site information.
    siteinfo: Arc<Siteinfo>,
    /// Title normaliser.
    nshandler: NsHandler,
    /// Magic word aliases.
    aliases: AliasMap,
    /// The title of the page being expanded.
    title: Title,
    /// The page language, if it differs from the content language.
    language: Option<String>,
    /// Month and weekday names in the page language.
    names: &'static DateNames,
    /// Extra variables, by canonical name.
    locals: HashMap<String, String>,
    /// Whether the per-page overrides were fetched yet.
    source_loaded: bool,
    /// Expansion limits.
    limits: Limits,
    /// The parse cache, if one is used.
    cache: Option<Arc<ParseCache>>,
    /// The current time, in UTC.
    now: OffsetDateTime,
    /// The offset used for `LOCAL…` variables.
    local_offset: UtcOffset,
    /// The page revision.
    revision: Option<String>,
    /// The cancellation flag.
    cancel: CancelToken,
    /// Placeholder markers for literal content.
    uniq: Uniquifier,
    /// The fully qualified names of the templates currently being expanded.
    stack: Vec<String>,
    /// The value set by `{{DISPLAYTITLE:…}}`.
    display_title: Option<String>,
    /// The value set by `{{DEFAULTSORT:…}}`.
    default_sort: Option<String>,
}

impl<'w> Expander<'w> {
    /// Creates a new expander for the page `pagename`.
    pub fn new(wiki: &'w dyn Wiki, pagename: &str) -> Result<Self> {
        let siteinfo = wiki.get_siteinfo().map_err(Error::Wiki)?;
        let nshandler = NsHandler::new(&siteinfo);
        let title = nshandler.title(pagename, Namespace::MAIN);
        let aliases = AliasMap::new(&siteinfo.magicwords);
        log::debug!(
            "Loaded {} magic words for '{}'",
            siteinfo.magicwords.len(),
            siteinfo.general.sitename
        );

        Ok(Self {
            wiki,
            names: DateNames::for_language(&siteinfo.general.lang),
            siteinfo,
            nshandler,
            aliases,
            title,
            language: None,
            locals: HashMap::new(),
            source_loaded: false,
            limits: Limits::default(),
            cache: None,
            now: OffsetDateTime::now_utc(),
            local_offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
            revision: None,
            cancel: CancelToken::default(),
            uniq: Uniquifier::new(),
            stack: Vec::new(),
            display_title: None,
            default_sort: None,
        })
    }

    /// Sets the expansion limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the cache used for parsed bodies. Without one, every body is
    /// parsed each time it is used.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ParseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the current time. Its offset becomes the offset of the `LOCAL…`
    /// variables.
    #[must_use]
    pub fn with_now(mut self, now: OffsetDateTime) -> Self {
        self.local_offset = now.offset();
        self.now = now.to_offset(UtcOffset::UTC);
        self
    }

    /// Sets the revision of the page being expanded.
    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Sets the token used to cancel the expansion.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The value set by `{{DISPLAYTITLE:…}}`, if any.
    pub fn display_title(&self) -> Option<&str> {
        self.display_title.as_deref()
    }

    /// The value set by `{{DEFAULTSORT:…}}`, if any.
    pub fn default_sort(&self) -> Option<&str> {
        self.default_sort.as_deref()
    }

    /// Expands the wikitext of the page.
    pub fn expand(&mut self, raw: &str) -> Result<String> {
        self.load_source()?;

        let body = self.parse_cached(Mode::TopLevel, raw);
        let root = ArgumentList::root();
        let mut out = Output::default();
        let result = self.flatten(&mut out, &body.tree, &root);
        if let Err(err) = &result {
            self.debug_backtrace(err);
        }
        self.stack.clear();

        let result = result.map(|()| self.uniq.restore(&out.finish()));
        self.uniq.clear();
        result
    }

    /// Fetches the per-page overrides for the page.
    fn load_source(&mut self) -> Result {
        if self.source_loaded {
            return Ok(());
        }
        self.source_loaded = true;

        let Some(source) = self
            .wiki
            .get_source(self.title.full_text(), self.revision.as_deref())
            .map_err(Error::Wiki)?
        else {
            return Ok(());
        };

        if !source.magicwords.is_empty() {
            self.aliases.extend(&source.magicwords);
            log::debug!(
                "Added {} magic words for '{}'",
                source.magicwords.len(),
                self.title.full_text()
            );
        }
        if let Some(language) = source.language {
            self.names = DateNames::for_language(&language);
            self.language = Some(language);
        }
        self.locals = source
            .locals
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        Ok(())
    }

    /// Parses a body, or fetches it from the cache.
    fn parse_cached(&mut self, mode: Mode, body: &str) -> Arc<ParsedBody> {
        let uniq = &mut self.uniq;
        let aliases = &self.aliases;
        let mut parse_body = || {
            let (text, markers) = uniq.replace_collect(body);
            let text = preprocess(&text, mode);
            ParsedBody {
                tree: parse(&text, aliases),
                markers,
            }
        };

        let parsed = if let Some(cache) = &self.cache {
            cache.get_or_parse(&ParseCache::key(mode, aliases, body), parse_body)
        } else {
            Arc::new(parse_body())
        };
        self.uniq.adopt(&parsed.markers);
        parsed
    }

    /// Expands a node in the given scope.
    pub(super) fn expand_node(&mut self, node: &Node, scope: &ArgumentList<'_>) -> Result<String> {
        let mut out = Output::default();
        self.flatten(&mut out, node, scope)?;
        Ok(out.finish())
    }

    /// Expands a list of nodes in the given scope.
    pub(super) fn expand_slice(
        &mut self,
        nodes: &[Node],
        scope: &ArgumentList<'_>,
    ) -> Result<String> {
        let mut out = Output::default();
        for node in nodes {
            self.flatten(&mut out, node, scope)?;
        }
        Ok(out.finish())
    }

    /// Checks that an expanded name or argument is within the size limit.
    pub(super) fn check_size(&self, text: &str) -> Result {
        if text.len() > self.limits.max_arg_size {
            Err(Error::MemoryLimit {
                size: text.len(),
                limit: self.limits.max_arg_size,
            })
        } else {
            Ok(())
        }
    }

    /// Expands a node into the output.
    fn flatten(&mut self, out: &mut Output, node: &Node, scope: &ArgumentList<'_>) -> Result {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::EqMark => out.push_str("="),
            Node::Seq(nodes) => {
                for node in nodes {
                    self.flatten(out, node, scope)?;
                }
            }
            Node::Variable(variable) => {
                let name = self.expand_node(&variable.name, scope)?;
                self.check_size(&name)?;
                let name = name.trim_ascii();
                if let Some(value) = scope.get(self, name)? {
                    out.push_str(&value);
                } else if let Some(default) = &variable.default {
                    self.flatten(out, default, scope)?;
                } else {
                    out.push_str("{{{");
                    out.push_str(name);
                    out.push_str("}}}");
                }
            }
            Node::Template(template) => {
                let head = self.expand_node(&template.head, scope)?;
                let text = self.call(&head, &template.args, scope)?;
                out.push_expansion(text);
            }
            Node::If(node) => {
                let cond = self.expand_node(&node.cond, scope)?;
                let branch = if magic::is_truthy(&cond) {
                    &node.consequent
                } else {
                    &node.alternate
                };
                if let Some(branch) = branch {
                    let text = self.expand_node(branch, scope)?;
                    out.push_expansion(text.trim_ascii());
                }
            }
            Node::Ifeq(node) => {
                let lhs = self.expand_node(&node.lhs, scope)?;
                let rhs = match &node.rhs {
                    Some(rhs) => self.expand_node(rhs, scope)?,
                    None => String::new(),
                };
                let is_eq = fuzzy_cmp(
                    &magic::decode_trim(Cow::Owned(lhs)),
                    &magic::decode_trim(Cow::Owned(rhs)),
                );
                let branch = if is_eq {
                    &node.consequent
                } else {
                    &node.alternate
                };
                if let Some(branch) = branch {
                    let text = self.expand_node(branch, scope)?;
                    out.push_expansion(text.trim_ascii());
                }
            }
            Node::Switch(node) => {
                let text = self.switch(node, scope)?;
                out.push_expansion(text);
            }
            Node::Magic(node) => {
                let name = node.kind.name();
                let Some(function) = magic::function(name) else {
                    log::warn!("No parser function for '{name}'");
                    return Ok(());
                };
                let arguments = IndexedArgs::new(
                    name,
                    Some(First::Node(&node.first)),
                    ArgumentList::new(&node.args, scope),
                );
                let text = self.call_function(function, &arguments)?;
                out.push_expansion(text);
            }
        }
        Ok(())
    }

    /// Evaluates a `#switch` and returns the trimmed value of the chosen case.
    ///
    /// Literal keys are looked up in the index built by the parser. Keys
    /// which must be expanded are only compared if they come before the
    /// first literal match.
    fn switch(&mut self, node: &SwitchNode, scope: &ArgumentList<'_>) -> Result<String> {
        let value = self.expand_node(&node.value, scope)?;
        let primary = magic::decode_trim(Cow::Owned(value));

        let literal = node.find_literal(&primary);
        let limit = literal.unwrap_or(node.cases.len());
        let mut found = literal;
        for &index in node.dynamic() {
            if index >= limit {
                break;
            }
            let key = self.expand_node(&node.cases[index].key, scope)?;
            if fuzzy_cmp(&magic::decode_trim(Cow::Owned(key)), &primary) {
                found = Some(index);
                break;
            }
        }

        let chosen = if let Some(index) = found {
            match node.target(index) {
                Some(target) => node.cases[target].value.as_ref(),
                None => node.fallback(),
            }
        } else if let Some(fallback) = node.fallback() {
            Some(fallback)
        } else {
            self.switch_default(node, scope)?
        };

        Ok(match chosen {
            Some(chosen) => self.expand_node(chosen, scope)?.trim_ascii().to_string(),
            None => String::new(),
        })
    }

    /// Finds the value of the `#default` case of a switch. A `#default` key
    /// without a value gives the next case with a value. When there are
    /// several defaults, the last one wins.
    fn switch_default<'n>(
        &mut self,
        node: &'n SwitchNode,
        scope: &ArgumentList<'_>,
    ) -> Result<Option<&'n Node>> {
        let mut default = None;
        let mut pending = false;
        for case in &node.cases {
            let is_default = match &case.kind {
                SwitchKey::Literal { is_default, .. } => *is_default,
                SwitchKey::Dynamic => {
                    let key = self.expand_node(&case.key, scope)?;
                    self.aliases.is_default(&key)
                }
            };
            if let Some(value) = &case.value {
                if pending || is_default {
                    default = Some(value);
                    pending = false;
                }
            } else if is_default {
                pending = true;
            }
        }
        Ok(default)
    }

    /// Calls the template, magic word, or parser function named by an
    /// expanded template head.
    pub(super) fn call(
        &mut self,
        head: &str,
        args: &[Node],
        scope: &ArgumentList<'_>,
    ) -> Result<String> {
        self.check_size(head)?;
        let name = head.trim_ascii();
        if name.is_empty() {
            return Ok(String::new());
        }

        if let Some((prefix, rest)) = name.split_once(':')
            && let Some(callee) = self.aliases.resolve(prefix)
            && let Some(function) = magic::function(&callee)
        {
            let arguments = IndexedArgs::new(
                &callee,
                Some(First::Text(Cow::Borrowed(rest))),
                ArgumentList::new(args, scope),
            );
            return self.call_function(function, &arguments);
        }

        // Variables only match when there are no arguments
        if args.is_empty()
            && !name.contains(':')
            && let Some(callee) = self.aliases.resolve(name)
        {
            if let Some(value) = self.locals.get(&callee) {
                return Ok(value.clone());
            }
            if let Some(function) = magic::variable(&callee) {
                let arguments = IndexedArgs::new(&callee, None, ArgumentList::new(args, scope));
                return self.call_function(function, &arguments);
            }
        }

        self.call_template(name, args, scope)
    }

    /// Calls a parser function and returns its output.
    fn call_function(&mut self, function: ParserFn, arguments: &IndexedArgs<'_>) -> Result<String> {
        let mut out = String::new();
        function(&mut out, self, arguments)?;
        Ok(out)
    }

    /// Fetches and expands a template.
    ///
    /// Template loops and calls past the recursion limit are absorbed by the
    /// outermost two template calls, which then expand to nothing.
    fn call_template(
        &mut self,
        name: &str,
        args: &[Node],
        scope: &ArgumentList<'_>,
    ) -> Result<String> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let (ns, _, fqname) = self.nshandler.splitname(name, Namespace::TEMPLATE);
        let body = match ns {
            Namespace::TEMPLATE => self.wiki.get_template(&fqname),
            ..0 => Ok(None),
            _ => self
                .wiki
                .get_page(&fqname, None)
                .map(|page| page.map(|page| page.rawtext)),
        }
        .map_err(Error::Wiki)?;

        let Some(body) = body else {
            log::warn!("No template found for '{fqname}'");
            return self.literal_call(name, args, scope);
        };

        let mark = self.stack.len();
        match self.enter_template(fqname, &body, args, scope) {
            Err(Error::TemplateRecursion(chain)) if mark < 2 => {
                log::warn!("Template loop detected: {chain}");
                self.stack.truncate(mark);
                Ok(String::new())
            }
            result => result,
        }
    }

    /// Pushes a template onto the call stack and expands its body.
    fn enter_template(
        &mut self,
        fqname: String,
        body: &str,
        args: &[Node],
        scope: &ArgumentList<'_>,
    ) -> Result<String> {
        if self.stack.contains(&fqname) || self.stack.len() >= self.limits.recursion_limit {
            let mut chain = self.stack.join(" -> ");
            chain += " -> ";
            chain += &fqname;
            return Err(Error::TemplateRecursion(chain));
        }

        log::trace!("Calling '{fqname}' at depth {}", self.stack.len() + 1);
        self.stack.push(fqname);
        let parsed = self.parse_cached(Mode::Included, body);
        let arguments = ArgumentList::new(args, scope);
        let mut out = Output::default();
        self.flatten(&mut out, &parsed.tree, &arguments)?;
        self.stack.pop();
        Ok(out.finish())
    }

    /// Writes a call to a missing template back out as wikitext.
    fn literal_call(&mut self, name: &str, args: &[Node], scope: &ArgumentList<'_>) -> Result<String> {
        let mut out = format!("{{{{{name}");
        for arg in args {
            out.push('|');
            out += &self.expand_node(arg, scope)?;
        }
        out += "}}";
        Ok(out)
    }

    /// Returns true if the page with the given title exists.
    fn page_exists(&mut self, title: &str) -> Result<bool> {
        let (ns, _, fqname) = self.nshandler.splitname(title, Namespace::MAIN);
        Ok(match ns {
            ..0 => false,
            Namespace::TEMPLATE => self.wiki.get_template(&fqname).map_err(Error::Wiki)?.is_some(),
            _ => self
                .wiki
                .get_page(&fqname, None)
                .map_err(Error::Wiki)?
                .is_some(),
        })
    }

    /// The time snapshot used by date variables, either in UTC or in the
    /// local offset.
    fn base_time(&self, local: bool) -> OffsetDateTime {
        if local {
            self.now.to_offset(self.local_offset)
        } else {
            self.now
        }
    }

    /// Logs the template call stack after a failed expansion.
    fn debug_backtrace(&self, err: &Error) {
        log::error!("Expansion of '{}' failed: {err}", self.title.full_text());
        for (index, name) in self.stack.iter().enumerate().rev() {
            log::error!("{:>2}. {name}", index + 1);
        }
    }
}
