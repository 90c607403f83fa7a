//! Inclusion control tags and comment removal.

use memchr::memmem;
use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

/// How a body of wikitext is being used.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Mode {
    /// The text is being transcluded into another page.
    Included,
    /// The text is the page being rendered.
    TopLevel,
}

/// An inclusion control tag.
struct Tag {
    /// Matches an opening tag, with optional attributes.
    open: Regex,
    /// Matches a closing tag.
    close: Regex,
    /// Matches either.
    any: Regex,
}

impl Tag {
    /// Creates the matchers for the tag with the given name.
    fn new(name: &str) -> Self {
        let open = format!(r"<{name}(?:\s[^>]*)?/?>");
        let close = format!(r"</{name}\s*>");
        Self {
            open: Regex::new(&format!("(?i){open}")).unwrap(),
            close: Regex::new(&format!("(?i){close}")).unwrap(),
            any: Regex::new(&format!("(?i){open}|{close}")).unwrap(),
        }
    }

    /// Deletes every region opened by this tag, through its closing tag or
    /// the end of the text.
    fn remove_regions<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = String::new();
        let mut flushed = 0;
        let mut pos = 0;
        while let Some(open) = self.open.find_at(text, pos) {
            out += &text[flushed..open.start()];
            flushed = self
                .close
                .find_at(text, open.end())
                .map_or(text.len(), |close| close.end());
            pos = flushed;
            if pos >= text.len() {
                break;
            }
        }
        finish(text, out, flushed)
    }

    /// Returns the concatenated bodies of every region opened by this tag, or
    /// `None` if the tag does not appear.
    fn keep_regions(&self, text: &str) -> Option<String> {
        let mut out = String::new();
        let mut pos = 0;
        let mut found = false;
        while let Some(open) = self.open.find_at(text, pos) {
            found = true;
            let end = self.close.find_at(text, open.end());
            out += &text[open.end()..end.map_or(text.len(), |close| close.start())];
            pos = end.map_or(text.len(), |close| close.end());
            if pos >= text.len() {
                break;
            }
        }
        found.then_some(out)
    }

    /// Deletes the tags themselves, keeping their content.
    fn strip_tags<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.any.replace_all(text, "")
    }
}

/// `<noinclude>`.
static NOINCLUDE: LazyLock<Tag> = LazyLock::new(|| Tag::new("noinclude"));
/// `<includeonly>`.
static INCLUDEONLY: LazyLock<Tag> = LazyLock::new(|| Tag::new("includeonly"));
/// `<onlyinclude>`.
static ONLYINCLUDE: LazyLock<Tag> = LazyLock::new(|| Tag::new("onlyinclude"));

/// Applies inclusion control tags and removes comments from `text`.
pub fn preprocess(text: &str, mode: Mode) -> Cow<'_, str> {
    let text = remove_comments(text);
    match mode {
        Mode::Included => {
            let text = ONLYINCLUDE.keep_regions(&text).map_or(text, Cow::Owned);
            let text = changed(NOINCLUDE.remove_regions(&text)).map_or(text, Cow::Owned);
            changed(INCLUDEONLY.strip_tags(&text)).map_or(text, Cow::Owned)
        }
        Mode::TopLevel => {
            let text = changed(INCLUDEONLY.remove_regions(&text)).map_or(text, Cow::Owned);
            let text = changed(ONLYINCLUDE.strip_tags(&text)).map_or(text, Cow::Owned);
            changed(NOINCLUDE.strip_tags(&text)).map_or(text, Cow::Owned)
        }
    }
}

/// Returns the new text if a transformation changed anything.
fn changed(text: Cow<'_, str>) -> Option<String> {
    match text {
        Cow::Borrowed(_) => None,
        Cow::Owned(text) => Some(text),
    }
}

/// Removes HTML comments.
///
/// When a comment (or a run of comments) is the only thing on its line, the
/// whole line is removed along with one of the surrounding newlines.
/// Otherwise, only the comment is removed. An unterminated comment runs to
/// the end of the text.
pub fn remove_comments(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let Some(first) = memmem::find(bytes, b"<!--") else {
        return Cow::Borrowed(text);
    };

    let is_space = |b: &u8| matches!(b, b' ' | b'\t');
    let mut out = String::with_capacity(text.len());
    let mut flushed = 0;
    let mut next = Some(first);
    while let Some(start) = next {
        let Some(close) = memmem::find(&bytes[start + 4..], b"-->").map(|i| start + 4 + i) else {
            out += &text[flushed..start];
            flushed = text.len();
            break;
        };

        let ws_start = start
            - bytes[flushed..start]
                .iter()
                .rev()
                .take_while(|b| is_space(b))
                .count();
        let mut ws_end = close + 3 + bytes[close + 3..].iter().take_while(|b| is_space(b)).count();

        // Keep looking forward as long as there are more comments
        while bytes[ws_end..].starts_with(b"<!--") {
            let Some(close) = memmem::find(&bytes[ws_end + 4..], b"-->").map(|i| ws_end + 4 + i)
            else {
                break;
            };
            ws_end = close + 3 + bytes[close + 3..].iter().take_while(|b| is_space(b)).count();
        }

        if ws_start > 0 && bytes[ws_start - 1] == b'\n' && bytes.get(ws_end) == Some(&b'\n') {
            out += &text[flushed..ws_start];
            flushed = ws_end + 1;
        } else {
            // Only the comments themselves, not the surrounding whitespace
            let comment_end = text[..ws_end].trim_end_matches([' ', '\t']).len();
            out += &text[flushed..start];
            flushed = comment_end;
        }

        next = memmem::find(&bytes[flushed..], b"<!--").map(|i| flushed + i);
    }

    out += &text[flushed..];
    Cow::Owned(out)
}

/// Returns the remainder of an owned-or-borrowed transformation chain.
fn finish<'a>(text: &'a str, mut out: String, flushed: usize) -> Cow<'a, str> {
    if flushed == 0 {
        Cow::Borrowed(text)
    } else {
        out += &text[flushed.min(text.len())..];
        Cow::Owned(out)
    }
}
