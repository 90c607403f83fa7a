//! Wikitext tokeniser for template expansion.

use regex::Regex;
use std::sync::LazyLock;

/// The kind of a [`Token`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// A run of `{`.
    BraOpen,
    /// A run of `}`.
    BraClose,
    /// `[[` or `]]`.
    Link,
    /// `|`.
    Pipe,
    /// `=`.
    Equals,
    /// A leftover inclusion control tag.
    Noinclude,
    /// Anything else.
    Text,
    /// The end of the input. Always the last token, with empty text.
    End,
}

/// A slice of the input with a kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Token<'a> {
    /// The kind of token.
    pub kind: TokenKind,
    /// The text of the token.
    pub text: &'a str,
}

/// Matches one token.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<open>\{+)
        | (?P<close>\}+)
        | (?P<link>\[\[|\]\])
        | (?P<pipe>\|)
        | (?P<eq>=)
        | (?P<tag>(?i:</?(?:noinclude|includeonly|onlyinclude)(?:\s[^>]*)?/?>))
        | [^{}\[\]|=<]+
        | (?s:.)
        ",
    )
    .unwrap()
});

/// Splits `text` into tokens.
///
/// The concatenated text of the tokens is always equal to the input.
/// Adjacent plain text is coalesced into a single token.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::<(TokenKind, usize, usize)>::new();
    for caps in TOKEN.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let kind = if caps.name("open").is_some() {
            TokenKind::BraOpen
        } else if caps.name("close").is_some() {
            TokenKind::BraClose
        } else if caps.name("link").is_some() {
            TokenKind::Link
        } else if caps.name("pipe").is_some() {
            TokenKind::Pipe
        } else if caps.name("eq").is_some() {
            TokenKind::Equals
        } else if caps.name("tag").is_some() {
            TokenKind::Noinclude
        } else {
            TokenKind::Text
        };

        if kind == TokenKind::Text
            && let Some((TokenKind::Text, _, end)) = tokens.last_mut()
            && *end == whole.start()
        {
            *end = whole.end();
        } else {
            tokens.push((kind, whole.start(), whole.end()));
        }
    }

    tokens
        .into_iter()
        .map(|(kind, start, end)| Token {
            kind,
            text: &text[start..end],
        })
        .chain([Token {
            kind: TokenKind::End,
            text: "",
        }])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn kinds(text: &str) -> Vec<(TokenKind, &str)> {
        tokenize(text).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn basic() {
        use TokenKind::*;
        assert_eq!(
            kinds("a{{{b|c=d}}}[[e]] f"),
            vec![
                (Text, "a"),
                (BraOpen, "{{{"),
                (Text, "b"),
                (Pipe, "|"),
                (Text, "c"),
                (Equals, "="),
                (Text, "d"),
                (BraClose, "}}}"),
                (Link, "[["),
                (Text, "e"),
                (Link, "]]"),
                (Text, " f"),
                (End, ""),
            ]
        );
    }

    #[test]
    fn lone_brackets_and_tags() {
        use TokenKind::*;
        assert_eq!(
            kinds("x[y<b>z</NoInclude>"),
            vec![(Text, "x[y<b>z"), (Noinclude, "</NoInclude>"), (End, "")]
        );
        assert_eq!(kinds(""), vec![(End, "")]);
    }

    #[test]
    fn preserves_input() {
        for text in ["{{{{{1}}}}}", "}}{{ a [[ |=]]\n<", "ünïcödé {{x}}"] {
            let tokens = tokenize(text);
            assert_eq!(tokens.iter().map(|t| t.text).collect::<String>(), text);
            let braces = |s: &str| s.chars().filter(|c| matches!(c, '{' | '}')).count();
            let in_tokens = tokens
                .iter()
                .filter(|t| matches!(t.kind, TokenKind::BraOpen | TokenKind::BraClose))
                .map(|t| t.text.len())
                .sum::<usize>();
            assert_eq!(in_tokens, braces(text), "brace count of {text:?}");
        }
    }
}
