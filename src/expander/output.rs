//! Expansion output with deferred implicit newlines.

/// A piece of output.
#[derive(Debug)]
enum Fragment {
    /// Literal text.
    Text(String),
    /// Inserts a newline if the next fragment starts a block and the output
    /// so far does not end with one.
    MaybeNewline,
}

/// Accumulated output of an expansion.
///
/// The start of the output counts as a line start, so an expansion at the
/// very beginning never gets a newline.
#[derive(Debug, Default)]
pub(super) struct Output {
    /// The fragments, in order.
    fragments: Vec<Fragment>,
}

impl Output {
    /// Appends literal text.
    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Fragment::Text(last)) = self.fragments.last_mut() {
            last.push_str(text);
        } else {
            self.fragments.push(Fragment::Text(text.to_string()));
        }
    }

    /// Appends the expansion of a template, variable, or parser function.
    pub fn push_expansion(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.fragments.push(Fragment::MaybeNewline);
        self.fragments.push(Fragment::Text(text));
    }

    /// Resolves the implicit newlines and returns the text.
    pub fn finish(self) -> String {
        let mut out = String::new();
        let mut fragments = self.fragments.into_iter().peekable();
        while let Some(fragment) = fragments.next() {
            match fragment {
                Fragment::Text(text) => out += &text,
                Fragment::MaybeNewline => {
                    if let Some(Fragment::Text(next)) = fragments.peek()
                        && starts_block(next)
                        && !out.is_empty()
                        && !out.ends_with('\n')
                    {
                        out.push('\n');
                    }
                }
            }
        }
        out
    }
}

/// Returns true if `text` starts with list, definition, or table syntax.
fn starts_block(text: &str) -> bool {
    text.starts_with(['*', '#', ':', ';']) || text.starts_with("{|")
}
