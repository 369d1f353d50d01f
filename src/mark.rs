use alloc::string::String;

/// A position in the input stream.
///
/// `index` counts code points from the start of the stream; `line` and
/// `column` are 0-based. CR, LF and CRLF each end exactly one line.
///
/// A mark does not name its stream, which keeps it `Copy`. The name set with
/// [`LoadSettings::with_label`](crate::LoadSettings::with_label) is carried
/// once per error in [`MarkedError::label`](crate::MarkedError::label) instead.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct Mark {
    /// The position index.
    pub index: usize,
    /// The position line.
    pub line: usize,
    /// The position column.
    pub column: usize,
}

impl Mark {
    pub fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }
}

impl core::fmt::Display for Mark {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

const SNIPPET_INDENT: usize = 4;
const SNIPPET_HALF_WIDTH: usize = 36;

/// The text of one source line around a [`Mark`], captured while the reader
/// still holds it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Snippet {
    pub head: String,
    pub tail: String,
    pub head_truncated: bool,
    pub tail_truncated: bool,
}

impl Snippet {
    pub(crate) fn from_parts(before: &[char], after: &[char]) -> Self {
        let head_truncated = before.len() > SNIPPET_HALF_WIDTH;
        let tail_truncated = after.len() > SNIPPET_HALF_WIDTH;
        let head = before[before.len().saturating_sub(SNIPPET_HALF_WIDTH)..]
            .iter()
            .map(|&ch| printable_or_space(ch))
            .collect();
        let tail = after[..after.len().min(SNIPPET_HALF_WIDTH)]
            .iter()
            .map(|&ch| printable_or_space(ch))
            .collect();
        Self {
            head,
            tail,
            head_truncated,
            tail_truncated,
        }
    }

    /// Renders the line followed by a caret under the marked column.
    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        let mut caret = SNIPPET_INDENT;
        out.extend(core::iter::repeat(' ').take(SNIPPET_INDENT));
        if self.head_truncated {
            out.push_str(" ... ");
            caret += 5;
        }
        out.push_str(&self.head);
        caret += self.head.chars().count();
        out.push_str(&self.tail);
        if self.tail_truncated {
            out.push_str(" ... ");
        }
        out.push('\n');
        out.extend(core::iter::repeat(' ').take(caret));
        out.push('^');
        out
    }
}

fn printable_or_space(ch: char) -> char {
    if ch == '\t' || (crate::chars::is_printable(ch) && ch != '\n') {
        ch
    } else {
        ' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn caret_under_column() {
        let before: Vec<char> = "key: ".chars().collect();
        let after: Vec<char> = "@value".chars().collect();
        let snippet = Snippet::from_parts(&before, &after);
        assert_eq!(snippet.render(), "    key: @value\n         ^");
    }

    #[test]
    fn long_lines_are_truncated() {
        let before: Vec<char> = "x".repeat(50).chars().collect();
        let after: Vec<char> = "y".repeat(50).chars().collect();
        let rendered = Snippet::from_parts(&before, &after).render();
        let mut lines = rendered.lines();
        let text = lines.next().unwrap();
        assert!(text.starts_with("     ... "));
        assert!(text.ends_with(" ... "));
        let caret = lines.next().unwrap();
        assert_eq!(caret.len(), SNIPPET_INDENT + 5 + SNIPPET_HALF_WIDTH + 1);
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(Mark::new(7, 1, 3).to_string(), "line 2, column 4");
    }
}
