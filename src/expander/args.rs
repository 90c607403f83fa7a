//! Lazily evaluated template and parser function arguments.

use super::{Expander, Result};
use crate::parser::Node;
use std::{borrow::Cow, cell::RefCell, collections::HashMap};

/// Cached key-to-index map.
#[derive(Debug, Default)]
struct KeyMap {
    /// A map from a trimmed key to the index of the last argument with that
    /// key, and whether the key was explicit.
    indices: HashMap<String, (usize, bool)>,
    /// The number of arguments whose keys have been read.
    scanned: usize,
    /// The last used unnamed key.
    last_unnamed_key: usize,
}

/// The arguments of a template call.
///
/// Nothing is expanded until it is asked for, and nothing is expanded
/// twice. Arguments are expanded in the scope of the caller.
#[derive(Debug)]
pub struct ArgumentList<'a> {
    /// The raw arguments.
    raw: &'a [Node],
    /// The arguments of the caller, used to expand [`Self::raw`]. `None` for
    /// the top-level page.
    scope: Option<&'a ArgumentList<'a>>,
    /// A lazily populated key-index map into [`Self::raw`].
    key_map: RefCell<KeyMap>,
    /// Cached values.
    value_cache: RefCell<HashMap<usize, String>>,
}

impl ArgumentList<'static> {
    /// Creates the empty argument list of a top-level page.
    pub(super) fn root() -> Self {
        Self {
            raw: &[],
            scope: None,
            key_map: <_>::default(),
            value_cache: <_>::default(),
        }
    }
}

impl<'a> ArgumentList<'a> {
    /// Creates a new argument list which expands `raw` in `scope`.
    pub(super) fn new(raw: &'a [Node], scope: &'a ArgumentList<'a>) -> Self {
        Self {
            raw,
            scope: Some(scope),
            key_map: <_>::default(),
            value_cache: <_>::default(),
        }
    }

    /// The raw arguments.
    pub(super) fn raw(&self) -> &'a [Node] {
        self.raw
    }

    /// The scope used to expand the arguments.
    pub(super) fn scope(&self) -> &ArgumentList<'a> {
        self.scope.unwrap_or(self)
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns true if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Expands an entire argument at the given index as a single value,
    /// ignoring any `name=` split.
    ///
    /// The returned value includes any leading and trailing whitespace
    /// present in the original text.
    pub fn eval(&self, expander: &mut Expander<'_>, index: usize) -> Result<Option<Cow<'a, str>>> {
        let Some(node) = self.raw.get(index) else {
            return Ok(None);
        };
        if let Node::Text(text) = node {
            return Ok(Some(Cow::Borrowed(text)));
        }
        let value = expander.expand_node(node, self.scope())?;
        expander.check_size(&value)?;
        Ok(Some(Cow::Owned(value)))
    }

    /// Expands the name part of the argument at the given index, or returns
    /// `None` if the argument is not named.
    ///
    /// The returned value includes any leading and trailing whitespace
    /// present in the original text.
    pub fn name(&self, expander: &mut Expander<'_>, index: usize) -> Result<Option<Cow<'a, str>>> {
        let Some((name, _)) = self.raw.get(index).and_then(Node::split_arg) else {
            return Ok(None);
        };
        if let [Node::Text(text)] = name {
            return Ok(Some(Cow::Borrowed(text)));
        }
        let name = expander.expand_slice(name, self.scope())?;
        expander.check_size(&name)?;
        Ok(Some(Cow::Owned(name)))
    }

    /// Expands the value part of the argument at the given index. For an
    /// unnamed argument, this is the whole argument.
    ///
    /// The returned value includes any leading and trailing whitespace
    /// present in the original text.
    pub fn value(&self, expander: &mut Expander<'_>, index: usize) -> Result<Option<String>> {
        if let Some(value) = self.value_cache.borrow().get(&index) {
            return Ok(Some(value.clone()));
        }
        let Some(node) = self.raw.get(index) else {
            return Ok(None);
        };
        let value = match node.split_arg() {
            Some((_, value)) => expander.expand_slice(value, self.scope())?,
            None => expander.expand_node(node, self.scope())?,
        };
        expander.check_size(&value)?;
        self.value_cache.borrow_mut().insert(index, value.clone());
        Ok(Some(value))
    }

    /// Expands the argument with the given key. Named arguments are trimmed,
    /// unnamed arguments are not.
    pub fn get(&self, expander: &mut Expander<'_>, key: &str) -> Result<Option<String>> {
        let Some((index, is_named)) = self.get_index(expander, key)? else {
            return Ok(None);
        };
        Ok(self.value(expander, index)?.map(|value| {
            if is_named {
                value.trim_ascii().to_string()
            } else {
                value
            }
        }))
    }

    /// Returns the index of the argument with the given key, and whether
    /// that key was explicit.
    ///
    /// Unnamed arguments are numbered from 1, skipping named arguments, so
    /// `{{T|a|x=y|b}}` has keys `1`, `x`, and `2`. When a key is repeated,
    /// the last argument wins.
    fn get_index(&self, expander: &mut Expander<'_>, key: &str) -> Result<Option<(usize, bool)>> {
        loop {
            let index = self.key_map.borrow().scanned;
            if index == self.raw.len() {
                break;
            }
            let name = self.name(expander, index)?;
            let mut key_map = self.key_map.borrow_mut();
            let (name, is_named) = if let Some(name) = name {
                (name.trim_ascii().to_string(), true)
            } else {
                key_map.last_unnamed_key += 1;
                (key_map.last_unnamed_key.to_string(), false)
            };
            key_map.indices.insert(name, (index, is_named));
            key_map.scanned += 1;
        }
        Ok(self.key_map.borrow().indices.get(key).copied())
    }
}

/// The first argument of a parser function, which comes from the part of the
/// call before the first `|`.
#[derive(Debug)]
pub(super) enum First<'a> {
    /// Text which was already expanded as part of the call name.
    Text(Cow<'a, str>),
    /// A node which has not been expanded yet.
    Node(&'a Node),
}

/// A helper for calls to parser functions and variables.
#[derive(Debug)]
pub(super) struct IndexedArgs<'a> {
    /// The canonical name of the callee.
    pub callee: &'a str,
    /// The argument after the `:`, if there was one.
    first: Option<First<'a>>,
    /// The remaining arguments.
    pub arguments: ArgumentList<'a>,
}

impl<'a> IndexedArgs<'a> {
    /// Creates a new argument helper.
    pub fn new(callee: &'a str, first: Option<First<'a>>, arguments: ArgumentList<'a>) -> Self {
        Self {
            callee,
            first,
            arguments,
        }
    }

    /// Expands an entire argument at the given index as a single value.
    ///
    /// The returned value includes any leading and trailing whitespace
    /// present in the original text.
    pub fn eval(&self, expander: &mut Expander<'_>, index: usize) -> Result<Option<Cow<'_, str>>> {
        match (&self.first, index) {
            (Some(First::Text(text)), 0) => Ok(Some(Cow::Borrowed(text))),
            (Some(First::Node(node)), 0) => {
                let value = expander.expand_node(node, self.arguments.scope())?;
                expander.check_size(&value)?;
                Ok(Some(Cow::Owned(value)))
            }
            (Some(_), index) => self.arguments.eval(expander, index - 1),
            (None, index) => self.arguments.eval(expander, index),
        }
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        usize::from(self.first.is_some()) + self.arguments.len()
    }

    /// The first argument as an unexpanded node.
    pub fn first_node(&self) -> Node {
        match &self.first {
            Some(First::Text(text)) => Node::Text((**text).into()),
            Some(First::Node(node)) => (*node).clone(),
            None => Node::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alias::AliasMap, parser::parse, wiki::MemoryWiki};

    /// Parses `{{T|...}}` and returns the arguments of the call.
    #[track_caller]
    fn call_args(text: &str) -> Box<[Node]> {
        match parse(text, &AliasMap::default()) {
            Node::Template(template) => template.args,
            node => panic!("expected a template call, got {node:?}"),
        }
    }

    #[test]
    fn numbering() {
        let wiki = MemoryWiki::default();
        let mut expander = Expander::new(&wiki, "Test").unwrap();
        let raw = call_args("{{T| a |x = y |b| 1 = c |d}}");
        let root = ArgumentList::root();
        let args = ArgumentList::new(&raw, &root);
        assert_eq!(args.get(&mut expander, "1").unwrap().as_deref(), Some("c"), "last wins");
        assert_eq!(args.get(&mut expander, "2").unwrap().as_deref(), Some("b"));
        assert_eq!(args.get(&mut expander, "3").unwrap().as_deref(), Some("d"));
        assert_eq!(args.get(&mut expander, "x").unwrap().as_deref(), Some("y"), "named args are trimmed");
        assert_eq!(args.get(&mut expander, "4").unwrap(), None);
        assert_eq!(args.eval(&mut expander, 1).unwrap().as_deref(), Some("x = y "));
        assert_eq!(args.name(&mut expander, 0).unwrap(), None);
        assert_eq!(args.len(), 5);
    }

    #[test]
    fn unnamed_are_not_trimmed() {
        let wiki = MemoryWiki::default();
        let mut expander = Expander::new(&wiki, "Test").unwrap();
        let raw = call_args("{{T| a |1=b| c }}");
        let root = ArgumentList::root();
        let args = ArgumentList::new(&raw, &root);
        assert_eq!(args.get(&mut expander, "1").unwrap().as_deref(), Some("b"));
        assert_eq!(args.get(&mut expander, "2").unwrap().as_deref(), Some(" c "));
    }

    #[test]
    fn caller_scope() {
        let wiki = MemoryWiki::default();
        let mut expander = Expander::new(&wiki, "Test").unwrap();
        let outer_raw = call_args("{{T|outer|k=v}}");
        let root = ArgumentList::root();
        let outer = ArgumentList::new(&outer_raw, &root);
        let inner_raw = call_args("{{U|{{{1}}}-{{{k}}}| {{{k}}} =w}}");
        let inner = ArgumentList::new(&inner_raw, &outer);
        assert_eq!(inner.get(&mut expander, "1").unwrap().as_deref(), Some("outer-v"));
        assert_eq!(inner.get(&mut expander, "v").unwrap().as_deref(), Some("w"), "expanded name");
    }
}
