//! Template syntax tree construction.
//!
//! The parser only understands the constructs which matter for template
//! expansion: template calls, template arguments, and the argument
//! separators inside them. Everything else is plain text.
//!
//! Brace runs are disambiguated the same way MediaWiki does it. When a run of
//! closing braces meets a run of opening braces, as many braces as possible
//! are matched, preferring a template argument (three braces) over a template
//! (two braces). Leftover opening braces become the start of a new construct
//! whose first part is the one just built, and leftover closing braces are
//! matched against the enclosing construct. So `{{{{{1}}}}}` is a template
//! whose name is the value of argument `1`.

use crate::{
    alias::AliasMap,
    common::decode_html,
    php::parse_numeric,
    scanner::{Token, TokenKind, tokenize},
};
use std::collections::HashMap;

/// A literal `=` which separated an argument name from its value at parse
/// time. When an argument is not used as a named argument, it is just `=`.
pub const EQMARK: Node = Node::EqMark;

/// Constructs nested deeper than this are treated as plain text.
const MAX_NESTING: usize = 256;

/// A syntax tree node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Plain text.
    Text(Box<str>),
    /// An argument name separator.
    EqMark,
    /// A sequence of nodes.
    Seq(Box<[Node]>),
    /// `{{name|args}}`
    Template(Box<Template>),
    /// `{{{name|default}}}`
    Variable(Box<Variable>),
    /// `{{#if:cond|consequent|alternate}}`
    If(Box<IfNode>),
    /// `{{#ifeq:lhs|rhs|consequent|alternate}}`
    Ifeq(Box<IfeqNode>),
    /// `{{#switch:value|cases}}`
    Switch(Box<SwitchNode>),
    /// A parser function or magic word with special expansion rules.
    Magic(Box<MagicNode>),
}

impl Default for Node {
    fn default() -> Self {
        Self::Text("".into())
    }
}

impl Node {
    /// Creates a node from a list of nodes, without a wrapper when the list
    /// has fewer than two items.
    pub fn seq(mut nodes: Vec<Node>) -> Self {
        match nodes.len() {
            0 => Self::default(),
            1 => nodes.swap_remove(0),
            _ => Self::Seq(nodes.into_boxed_slice()),
        }
    }

    /// Returns the node as a slice of nodes.
    pub fn as_slice(&self) -> &[Node] {
        match self {
            Self::Seq(nodes) => nodes,
            node => core::slice::from_ref(node),
        }
    }

    /// Returns the text of the node if it is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::EqMark => Some("="),
            _ => None,
        }
    }

    /// Splits an argument at its first [`EQMARK`] into name and value.
    /// Returns `None` if the argument is not named.
    pub fn split_arg(&self) -> Option<(&[Node], &[Node])> {
        let nodes = self.as_slice();
        let index = nodes.iter().position(|node| *node == Node::EqMark)?;
        Some((&nodes[..index], &nodes[index + 1..]))
    }
}

/// A template call.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    /// The template name, possibly including a parser function argument.
    pub head: Node,
    /// The arguments, in source order.
    pub args: Box<[Node]>,
}

/// A template argument reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// The argument name.
    pub name: Node,
    /// The value to use if the argument is missing.
    pub default: Option<Node>,
}

/// `#if`.
#[derive(Clone, Debug, PartialEq)]
pub struct IfNode {
    /// The condition.
    pub cond: Node,
    /// Used if the condition is not blank.
    pub consequent: Option<Node>,
    /// Used if the condition is blank.
    pub alternate: Option<Node>,
}

/// `#ifeq`.
#[derive(Clone, Debug, PartialEq)]
pub struct IfeqNode {
    /// The left-hand side.
    pub lhs: Node,
    /// The right-hand side.
    pub rhs: Option<Node>,
    /// Used if the operands are equal.
    pub consequent: Option<Node>,
    /// Used if the operands differ.
    pub alternate: Option<Node>,
}

/// The kinds of [`MagicNode`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MagicKind {
    /// `#time`
    Time,
    /// `#tag`
    Tag,
    /// `#rel2abs`
    Rel2abs,
    /// `anchorencode`
    Anchorencode,
    /// `formatnum`
    Formatnum,
    /// `displaytitle`
    Displaytitle,
    /// `defaultsort`
    Defaultsort,
    /// `subst`
    Subst,
    /// `safesubst`
    Safesubst,
    /// `#ifexpr`
    Ifexpr,
}

impl MagicKind {
    /// Returns the kind for the given canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "#time" => Self::Time,
            "#tag" | "tag" => Self::Tag,
            "#rel2abs" => Self::Rel2abs,
            "anchorencode" => Self::Anchorencode,
            "formatnum" => Self::Formatnum,
            "displaytitle" => Self::Displaytitle,
            "defaultsort" => Self::Defaultsort,
            "subst" => Self::Subst,
            "safesubst" => Self::Safesubst,
            "#ifexpr" => Self::Ifexpr,
            _ => return None,
        })
    }

    /// The canonical name of the function.
    pub fn name(self) -> &'static str {
        match self {
            Self::Time => "#time",
            Self::Tag => "#tag",
            Self::Rel2abs => "#rel2abs",
            Self::Anchorencode => "anchorencode",
            Self::Formatnum => "formatnum",
            Self::Displaytitle => "displaytitle",
            Self::Defaultsort => "defaultsort",
            Self::Subst => "subst",
            Self::Safesubst => "safesubst",
            Self::Ifexpr => "#ifexpr",
        }
    }
}

/// A parser function call which was recognised at parse time.
#[derive(Clone, Debug, PartialEq)]
pub struct MagicNode {
    /// The function.
    pub kind: MagicKind,
    /// The text after the `:`.
    pub first: Node,
    /// The remaining arguments.
    pub args: Box<[Node]>,
}

/// The key of a `#switch` case.
#[derive(Clone, Debug, PartialEq)]
pub enum SwitchKey {
    /// The key is plain text, decoded and trimmed.
    Literal {
        /// The key text.
        text: Box<str>,
        /// Whether the key is the `#default` keyword.
        is_default: bool,
    },
    /// The key must be expanded before it can be compared.
    Dynamic,
}

/// A `#switch` case.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// The key. For a case without `=`, this is the whole case.
    pub key: Node,
    /// The value, if the case had an `=`.
    pub value: Option<Node>,
    /// The precomputed key.
    pub kind: SwitchKey,
}

/// `#switch`.
///
/// Literal keys are indexed when the node is built so most lookups do not
/// need to walk the case list.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchNode {
    /// The value to match.
    pub value: Node,
    /// The cases, in source order.
    pub cases: Box<[SwitchCase]>,
    /// First case index for each literal key.
    literal: HashMap<Box<str>, usize>,
    /// First case index for each numeric literal key, by bit pattern.
    numeric: HashMap<u64, usize>,
    /// Indexes of cases with dynamic keys.
    dynamic: Box<[usize]>,
    /// For each case, the index of the case holding the value to use if this
    /// case matches, or `None` if the fallback is used.
    targets: Box<[Option<usize>]>,
}

impl SwitchNode {
    /// Builds a switch from the value and its raw case arguments.
    pub fn new(value: Node, args: Vec<Node>, aliases: &AliasMap) -> Self {
        let cases = args
            .into_iter()
            .map(|arg| {
                let (key, value) = match arg.split_arg() {
                    Some((key, value)) => (
                        optimize(Node::seq(key.to_vec())),
                        Some(optimize(Node::seq(value.to_vec()))),
                    ),
                    None => (optimize(arg), None),
                };
                let kind = if let Node::Text(text) = &key {
                    let text = decode_html(text);
                    let text = text.trim_ascii();
                    SwitchKey::Literal {
                        is_default: aliases.is_default(text),
                        text: text.into(),
                    }
                } else {
                    SwitchKey::Dynamic
                };
                SwitchCase { key, value, kind }
            })
            .collect::<Box<[_]>>();

        let mut literal = HashMap::new();
        let mut numeric = HashMap::new();
        let mut dynamic = Vec::new();
        for (index, case) in cases.iter().enumerate() {
            match &case.kind {
                SwitchKey::Literal { text, .. } => {
                    if let Some(n) = parse_numeric(text) {
                        numeric.entry(number_key(n)).or_insert(index);
                    }
                    literal.entry(text.clone()).or_insert(index);
                }
                SwitchKey::Dynamic => dynamic.push(index),
            }
        }

        let mut targets = vec![None; cases.len()];
        let mut next = None;
        for (index, case) in cases.iter().enumerate().rev() {
            if case.value.is_some() {
                next = Some(index);
            }
            targets[index] = next;
        }

        Self {
            value,
            cases,
            literal,
            numeric,
            dynamic: dynamic.into_boxed_slice(),
            targets: targets.into_boxed_slice(),
        }
    }

    /// Returns the index of the first case with a literal key matching
    /// `primary`, which must already be decoded and trimmed.
    pub fn find_literal(&self, primary: &str) -> Option<usize> {
        if let Some(n) = parse_numeric(primary) {
            self.numeric.get(&number_key(n)).copied()
        } else {
            self.literal.get(primary).copied()
        }
    }

    /// Indexes of cases whose keys must be expanded to be compared.
    pub fn dynamic(&self) -> &[usize] {
        &self.dynamic
    }

    /// Returns the index of the case whose value is used when the case at
    /// `index` matches, or `None` if the fallback is used.
    pub fn target(&self, index: usize) -> Option<usize> {
        self.targets.get(index).copied().flatten()
    }

    /// Returns the trailing case without a value, which is used when nothing
    /// else matches.
    pub fn fallback(&self) -> Option<&Node> {
        self.cases
            .last()
            .filter(|case| case.value.is_none())
            .map(|case| &case.key)
    }
}

/// Normalises a number for use as a map key.
fn number_key(n: f64) -> u64 {
    if n == 0.0 { 0.0_f64 } else { n }.to_bits()
}

/// Parses wikitext into a syntax tree, specialising parser functions using
/// the given aliases.
pub fn parse(text: &str, aliases: &AliasMap) -> Node {
    let mut parser = Parser {
        tokens: tokenize(text),
        pos: 0,
        pushback: None,
        aliases,
        depth: 0,
    };
    let mut out = Vec::new();
    loop {
        let token = parser.next();
        match token.kind {
            TokenKind::End => break,
            TokenKind::BraOpen if token.text.len() > 1 => {
                out.extend(parser.parse_braces(token.text.len()));
            }
            TokenKind::Noinclude => {}
            _ => out.push(Node::Text(token.text.into())),
        }
    }
    optimize(Node::seq(out))
}

/// Flattens nested sequences, merges adjacent text, and removes empty text.
pub fn optimize(node: Node) -> Node {
    match node {
        Node::Seq(nodes) => {
            let mut out = Vec::with_capacity(nodes.len());
            optimize_into(&mut out, nodes.into_vec());
            Node::seq(out)
        }
        node => optimize_one(node),
    }
}

/// Appends optimised `nodes` to `out`.
fn optimize_into(out: &mut Vec<Node>, nodes: Vec<Node>) {
    for node in nodes {
        match node {
            Node::Seq(nodes) => optimize_into(out, nodes.into_vec()),
            Node::Text(text) if text.is_empty() => {}
            Node::Text(text) => {
                if let Some(Node::Text(last)) = out.last_mut() {
                    let mut merged = String::from(core::mem::take(last));
                    merged += &text;
                    *last = merged.into();
                } else {
                    out.push(Node::Text(text));
                }
            }
            node => out.push(optimize_one(node)),
        }
    }
}

/// Optimises the children of a single non-sequence node.
fn optimize_one(node: Node) -> Node {
    let opt = |node: Option<Node>| -> Option<Node> { node.map(optimize) };
    let all = |nodes: Box<[Node]>| -> Box<[Node]> { nodes.into_vec().into_iter().map(optimize).collect() };
    match node {
        Node::Template(t) => Node::Template(Box::new(Template {
            head: optimize(t.head),
            args: all(t.args),
        })),
        Node::Variable(v) => Node::Variable(Box::new(Variable {
            name: optimize(v.name),
            default: opt(v.default),
        })),
        Node::If(n) => Node::If(Box::new(IfNode {
            cond: optimize(n.cond),
            consequent: opt(n.consequent),
            alternate: opt(n.alternate),
        })),
        Node::Ifeq(n) => Node::Ifeq(Box::new(IfeqNode {
            lhs: optimize(n.lhs),
            rhs: opt(n.rhs),
            consequent: opt(n.consequent),
            alternate: opt(n.alternate),
        })),
        Node::Switch(mut n) => {
            n.value = optimize(core::mem::take(&mut n.value));
            for case in n.cases.iter_mut() {
                case.key = optimize(core::mem::take(&mut case.key));
                case.value = opt(case.value.take());
            }
            Node::Switch(n)
        }
        Node::Magic(n) => Node::Magic(Box::new(MagicNode {
            kind: n.kind,
            first: optimize(n.first),
            args: all(n.args),
        })),
        node => node,
    }
}

/// The parser state.
struct Parser<'a, 'b> {
    /// The input tokens.
    tokens: Vec<Token<'a>>,
    /// The index of the next token.
    pos: usize,
    /// Closing braces left over from the last match.
    pushback: Option<Token<'a>>,
    /// Magic word aliases.
    aliases: &'b AliasMap,
    /// Current construct nesting depth.
    depth: usize,
}

impl<'a> Parser<'a, '_> {
    /// Returns the next token. The end token is returned forever.
    fn next(&mut self) -> Token<'a> {
        if let Some(token) = self.pushback.take() {
            return token;
        }
        let token = self.tokens[self.pos];
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    /// Parses a brace construct opened by `open` braces, returning the nodes
    /// it produced.
    fn parse_braces(&mut self, open: usize) -> Vec<Node> {
        if self.depth == MAX_NESTING {
            return vec![Node::Text("{".repeat(open).into())];
        }
        self.depth += 1;
        let out = self.parse_frame(open);
        self.depth -= 1;
        out
    }

    /// Parses the inside of a brace construct.
    fn parse_frame(&mut self, mut open: usize) -> Vec<Node> {
        let mut parts = Vec::new();
        let mut part = Vec::new();
        let mut links = 0_usize;
        loop {
            let token = self.next();
            match token.kind {
                TokenKind::BraOpen if token.text.len() > 1 => {
                    part.extend(self.parse_braces(token.text.len()));
                }
                TokenKind::BraClose if token.text.len() > 1 => {
                    let close = token.text.len();
                    parts.push(core::mem::take(&mut part));
                    let parts = core::mem::take(&mut parts);
                    let (node, used) = if open >= 3 && close >= 3 {
                        (self.variable(parts), 3)
                    } else {
                        (self.template(parts), 2)
                    };
                    open -= used;
                    if close > used {
                        self.pushback = Some(Token {
                            kind: TokenKind::BraClose,
                            text: &token.text[used..],
                        });
                    }
                    if open >= 2 {
                        part.push(node);
                        links = 0;
                        continue;
                    }
                    let mut out = Vec::with_capacity(2);
                    if open == 1 {
                        out.push(Node::Text("{".into()));
                    }
                    out.push(node);
                    return out;
                }
                TokenKind::Link => {
                    if token.text == "[[" {
                        links += 1;
                    } else {
                        links = links.saturating_sub(1);
                    }
                    part.push(Node::Text(token.text.into()));
                }
                TokenKind::Pipe if links == 0 => parts.push(core::mem::take(&mut part)),
                TokenKind::Equals if links == 0 => part.push(EQMARK),
                TokenKind::Noinclude => {}
                TokenKind::End => {
                    parts.push(part);
                    return literal("{".repeat(open), parts, None);
                }
                _ => part.push(Node::Text(token.text.into())),
            }
        }
    }

    /// Builds a template argument reference.
    fn variable(&self, parts: Vec<Vec<Node>>) -> Node {
        let mut parts = parts.into_iter();
        let name = Node::seq(parts.next().unwrap_or_default());
        let default = parts.next().map(Node::seq);
        Node::Variable(Box::new(Variable { name, default }))
    }

    /// Builds a template call, or a specialised node if the call is to a
    /// parser function with special expansion rules.
    fn template(&self, parts: Vec<Vec<Node>>) -> Node {
        let mut parts = parts.into_iter();
        let head = parts.next().unwrap_or_default();
        let mut args = parts.map(Node::seq).collect::<Vec<_>>();

        let lead = head.iter().take_while(|node| matches!(node, Node::Text(_))).count();
        let leading = leading_text(&head);
        if let Some((prefix, rest)) = leading.split_once(':')
            && let Some(name) = self.aliases.resolve(prefix)
        {
            let first = Node::seq(
                core::iter::once(Node::Text(rest.into()))
                    .chain(head[lead..].iter().cloned())
                    .collect(),
            );
            let mut args_iter = args.into_iter();
            let mut arg = || args_iter.next();
            match name.as_str() {
                "#if" => {
                    return Node::If(Box::new(IfNode {
                        cond: first,
                        consequent: arg(),
                        alternate: arg(),
                    }));
                }
                "#ifeq" => {
                    return Node::Ifeq(Box::new(IfeqNode {
                        lhs: first,
                        rhs: arg(),
                        consequent: arg(),
                        alternate: arg(),
                    }));
                }
                "#switch" => {
                    let cases = args_iter.collect();
                    return Node::Switch(Box::new(SwitchNode::new(first, cases, self.aliases)));
                }
                name => {
                    if let Some(kind) = MagicKind::from_name(name) {
                        return Node::Magic(Box::new(MagicNode {
                            kind,
                            first,
                            args: args_iter.collect(),
                        }));
                    }
                    args = args_iter.collect();
                }
            }
        }

        let title_part = leading.split_once(':').map_or(leading.as_str(), |(prefix, _)| prefix);
        if title_part.contains(['[', ']']) {
            return Node::seq(literal(
                "{{".into(),
                core::iter::once(head).chain(args.into_iter().map(|arg| arg.as_slice().to_vec())).collect(),
                Some("}}"),
            ));
        }

        Node::Template(Box::new(Template {
            head: Node::seq(head),
            args: args.into_boxed_slice(),
        }))
    }
}

/// Returns the concatenated plain text at the start of a list of nodes.
fn leading_text(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map_while(|node| match node {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}

/// Reconstructs a construct which turned out not to be one as text.
fn literal(open: String, parts: Vec<Vec<Node>>, close: Option<&str>) -> Vec<Node> {
    let mut out = vec![Node::Text(open.into())];
    for (index, part) in parts.into_iter().enumerate() {
        if index != 0 {
            out.push(Node::Text("|".into()));
        }
        out.extend(part.into_iter().map(|node| match node {
            Node::EqMark => Node::Text("=".into()),
            node => node,
        }));
    }
    if let Some(close) = close {
        out.push(Node::Text(close.into()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.into())
    }

    fn var(name: Node, default: Option<Node>) -> Node {
        Node::Variable(Box::new(Variable { name, default }))
    }

    fn tpl(head: Node, args: Vec<Node>) -> Node {
        Node::Template(Box::new(Template {
            head,
            args: args.into_boxed_slice(),
        }))
    }

    #[track_caller]
    fn p(s: &str) -> Node {
        parse(s, &AliasMap::default())
    }

    #[test]
    fn plain() {
        assert_eq!(p("hello [[world|x=y]] }} |="), text("hello [[world|x=y]] }} |="));
        assert_eq!(p(""), text(""));
    }

    #[test]
    fn templates_and_variables() {
        assert_eq!(p("{{a}}"), tpl(text("a"), vec![]));
        assert_eq!(
            p("{{a|b|c=d}}"),
            tpl(
                text("a"),
                vec![text("b"), Node::Seq(vec![text("c"), EQMARK, text("d")].into())]
            )
        );
        assert_eq!(p("{{{1}}}"), var(text("1"), None));
        assert_eq!(p("{{{1|x|y}}}"), var(text("1"), Some(text("x"))));
        assert_eq!(
            p("{{a|[[b|c=d]]}}"),
            tpl(text("a"), vec![text("[[b|c=d]]")]),
            "pipes and equals inside links do not split"
        );
    }

    #[test]
    fn brace_disambiguation() {
        assert_eq!(
            p("{{{{{1}}}}}"),
            tpl(var(text("1"), None), vec![]),
            "five braces"
        );
        assert_eq!(
            p("{{{{x}}}}"),
            Node::Seq(vec![text("{"), var(text("x"), None), text("}")].into()),
            "four braces"
        );
        assert_eq!(
            p("{{{x}}"),
            Node::Seq(vec![text("{"), tpl(text("x"), vec![])].into()),
            "three open, two close"
        );
        assert_eq!(
            p("{{x}}}"),
            Node::Seq(vec![tpl(text("x"), vec![]), text("}")].into()),
            "two open, three close"
        );
        assert_eq!(p("{{a|b"), text("{{a|b"), "unterminated");
        assert_eq!(p("{{a|b=c"), text("{{a|b=c"), "unterminated with equals");
        assert_eq!(
            p("{{{{a}}"),
            Node::Seq(vec![text("{{"), tpl(text("a"), vec![])].into())
        );
        assert_eq!(p("{x}"), text("{x}"));
    }

    #[test]
    fn invalid_title() {
        assert_eq!(p("{{[[a]]}}"), text("{{[[a]]}}"));
        assert_eq!(p("{{a]|b}}"), text("{{a]|b}}"));
    }

    #[test]
    fn specialised() {
        let node = p("{{#if: {{{1}}} | yes | no }}");
        let Node::If(node) = node else {
            panic!("expected #if, got {node:?}");
        };
        assert_eq!(node.cond, Node::Seq(vec![text(" "), var(text("1"), None), text(" ")].into()));
        assert_eq!(node.consequent, Some(text(" yes ")));
        assert_eq!(node.alternate, Some(text(" no ")));

        assert!(matches!(p("{{#IFEQ:a|b}}"), Node::Ifeq(_)));
        assert!(matches!(p("{{ #switch: x | y }}"), Node::Switch(_)));
        let Node::Magic(node) = p("{{#time:Y|2008}}") else {
            panic!("expected magic");
        };
        assert_eq!(node.kind, MagicKind::Time);
        assert_eq!(node.first, text("Y"));
        assert_eq!(node.args[..], [text("2008")]);
        assert!(matches!(p("{{lc:X}}"), Node::Template(_)));
    }

    #[test]
    fn localised() {
        use crate::siteinfo::MagicWord;
        let aliases = AliasMap::new(&[MagicWord {
            name: "if".into(),
            aliases: vec!["als".into()],
            case_sensitive: false,
        }]);
        assert!(matches!(parse("{{#als:1|a|b}}", &aliases), Node::If(_)));
    }

    #[test]
    fn switch_tables() {
        let Node::Switch(node) = p("{{#switch:x|+07|a|7=b|c=d|{{{1}}}=e|#default=f|g}}") else {
            panic!("expected switch");
        };
        assert_eq!(node.find_literal("7"), Some(0), "numeric match on first equivalent key");
        assert_eq!(node.find_literal("a"), Some(1));
        assert_eq!(node.find_literal("c"), Some(3));
        assert_eq!(node.find_literal("zzz"), None);
        assert_eq!(node.target(0), Some(2), "fall through");
        assert_eq!(node.target(3), Some(3));
        assert_eq!(node.dynamic(), &[4]);
        assert_eq!(node.fallback(), Some(&text("g")));
        assert_eq!(node.target(6), None);
    }

    #[test]
    fn optimize_idempotent() {
        for s in [
            "a{{b|c=d|{{{e|f}}}}}g",
            "{{#switch:{{{1}}}|a=b|c}}",
            "{{{{{1}}}}}",
            "x{{#if:a|{{b}}}}y",
        ] {
            let once = p(s);
            assert_eq!(optimize(once.clone()), once, "{s:?}");
        }
        assert_eq!(
            optimize(Node::Seq(
                vec![text("a"), Node::Seq(vec![text(""), text("b")].into()), EQMARK, text("c")]
                    .into()
            )),
            Node::Seq(vec![text("ab"), EQMARK, text("c")].into())
        );
    }
}
