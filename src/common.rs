//! Text helpers shared by the magic word resolver and the title handler
//! which do not correspond to a host language’s standard library functions.

use crate::php::strtr;
use html_escape::NAMED_ENTITIES;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

/// Encodes section heading text into a format suitable for use as a URL
/// anchor, using the legacy MediaWiki fragment encoding.
pub fn anchor_encode(s: &str) -> String {
    let s = decode_html(s.trim_ascii());
    let id = url_encode(&s, UrlStyle::Query);
    strtr(&id, &[("%3A", ":"), ("%", "."), ("+", "_")]).into_owned()
}

/// Decodes HTML entities according to the Wikitext rules.
pub fn decode_html(text: &str) -> Cow<'_, str> {
    const MAX_LEN: usize = {
        let mut max = 0;
        let mut entities = NAMED_ENTITIES.as_slice();
        while let [(name, _), rest @ ..] = entities {
            if name.len() > max {
                max = name.len();
            }
            entities = rest;
        }

        if "רלמ".len() > max {
            max = "רלמ".len();
        }

        if "رلم".len() > max {
            max = "رلم".len();
        }

        max + b";".len()
    };

    let bytes = text.as_bytes();
    let entity_ranges = memchr::memchr_iter(b'&', bytes).filter_map(|start| {
        let next = start + "&".len();
        memchr::memchr(b';', &bytes[next..(next + MAX_LEN).min(bytes.len())])
            .map(|len| start..(next + len + b";".len()))
    });

    let mut flushed = 0;
    let mut out = String::new();
    for range in entity_ranges {
        if range.start < flushed {
            continue;
        }
        let mut char = [0; 4];
        let Some(name) = text.get(range.start + 1..range.end - 1) else {
            continue;
        };
        let value = if let Some(name) = name.strip_prefix('#') {
            if let Some(name) = name.strip_prefix(|c: char| matches!(c, 'X' | 'x')) {
                u32::from_str_radix(name, 16)
            } else {
                name.parse::<u32>()
            }
            .ok()
            .and_then(char::from_u32)
            .map(|c| &*c.encode_utf8(&mut char))
        } else {
            NAMED_ENTITIES
                .binary_search_by(|(t_name, _)| t_name.cmp(&name.as_bytes()))
                .map_or_else(
                    |_| (name == "רלמ" || name == "رلم").then_some("\u{200f}"),
                    |index| Some(NAMED_ENTITIES[index].1),
                )
        };
        if let Some(value) = value {
            out += &text[flushed..range.start];
            out += value;
            flushed = range.end;
        }
    }

    if flushed != 0 {
        out += &text[flushed..];
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

/// Groups the integer part of every number in `text` into thousands, like
/// `Language::formatNum`.
pub fn format_number(text: &str) -> Cow<'_, str> {
    static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").unwrap());

    NUMBER.replace_all(text, |caps: &regex::Captures<'_>| {
        let number = &caps[0];
        let (n, d) = number.split_once('.').unwrap_or((number, ""));
        let mut out = String::new();
        for chunk in n.as_bytes().rchunks(3).rev() {
            if !out.is_empty() {
                out.push(',');
            }
            // SAFETY: The chunk is a run of ASCII digits.
            out += unsafe { str::from_utf8_unchecked(chunk) };
        }
        if !d.is_empty() {
            out.push('.');
            out += d;
        }
        out
    })
}

/// Strips thousands separators from a formatted number, for `FORMATNUM` with
/// the `R` flag.
pub fn unformat_number(text: &str) -> Cow<'_, str> {
    strtr(text, &[("\u{2212}", "-"), (",", "")])
}

/// The encoding rules for [`url_encode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UrlStyle {
    /// Like PHP `urlencode`: spaces become `+`.
    Query,
    /// Like PHP `rawurlencode`: spaces become `%20`.
    Path,
    /// Like `wfUrlencode`: spaces become `_` and path punctuation is kept.
    Wiki,
}

/// Percent-encodes a string in the given style.
pub fn url_encode(input: &str, style: UrlStyle) -> String {
    match style {
        UrlStyle::Query => percent_encoding::utf8_percent_encode(input, &QUERY)
            .to_string()
            .replace("%20", "+"),
        UrlStyle::Path => percent_encoding::utf8_percent_encode(input, &PATH).to_string(),
        UrlStyle::Wiki => {
            percent_encoding::utf8_percent_encode(&input.replace(' ', "_"), &WIKI).to_string()
        }
    }
}

/// Characters that PHP `urlencode` leaves alone.
const QUERY: AsciiSet = NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Characters that PHP `rawurlencode` leaves alone.
const PATH: AsciiSet = QUERY.remove(b'~');

/// Characters that `wfUrlencode` leaves alone.
const WIKI: AsciiSet = PATH
    .remove(b';')
    .remove(b'@')
    .remove(b'$')
    .remove(b'!')
    .remove(b'*')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b'/')
    .remove(b':');

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_html() {
        assert_eq!(
            decode_html("hello & world"),
            Cow::Borrowed("hello & world"),
            "non-entity should remain as-is"
        );
        assert_eq!(
            decode_html("hello&nbsp;world"),
            Cow::Owned::<str>(String::from("hello\u{00a0}world")),
            "entity should decode"
        );
        assert_eq!(
            decode_html("hello&oops;world"),
            Cow::Borrowed("hello&oops;world"),
            "invalid entity should remain as-is"
        );
        assert_eq!(
            decode_html("hello&;world"),
            Cow::Borrowed("hello&;world"),
            "invalid empty entity should remain as-is"
        );
        assert_eq!(
            decode_html("hello&רלמ;world"),
            Cow::Borrowed("hello\u{200f}world"),
            "special Hebrew RTL entity should decode"
        );
        assert_eq!(
            decode_html("hello&#42;world"),
            Cow::Borrowed("hello*world"),
            "decimal entity should decode"
        );
        assert_eq!(
            decode_html("hello&#x42;world"),
            Cow::Borrowed("helloBworld"),
            "hexadecimal entity should decode"
        );
        assert_eq!(
            decode_html("hello&&nbsp;world"),
            Cow::Owned::<str>(String::from("hello&\u{00a0}world")),
            "incomplete entity should not interfere with later entity"
        );
    }

    #[test]
    fn test_anchor_encode() {
        assert_eq!(anchor_encode(" Hello world: a+b "), "Hello_world:_a.2Bb");
        assert_eq!(anchor_encode("Ünïcode"), ".C3.9Cn.C3.AFcode");
        assert_eq!(anchor_encode("a&amp;b"), "a.26b");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number("1234567.891"), "1,234,567.891");
        assert_eq!(format_number("-1000"), "-1,000");
        assert_eq!(format_number("123"), "123");
        assert_eq!(format_number("10000 and 20000"), "10,000 and 20,000");
        assert_eq!(unformat_number("1,234,567.8"), "1234567.8");
    }

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("a b&c/d~", UrlStyle::Query), "a+b%26c%2Fd%7E");
        assert_eq!(url_encode("a b&c/d~", UrlStyle::Path), "a%20b%26c%2Fd~");
        assert_eq!(url_encode("a b&c/d:e", UrlStyle::Wiki), "a_b%26c/d:e");
    }
}
