use alloc::string::String;

use crate::mark::{Mark, Snippet};

/// A problem located in the input stream.
///
/// The message is rendered when the problem is raised, while the reader still
/// holds the surrounding text, so it embeds the line and a caret under the
/// offending column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedError {
    /// Name of the input stream both marks point into.
    pub label: String,
    /// What was being processed when the problem was found.
    pub context: Option<String>,
    /// Where the context started.
    pub context_mark: Option<Mark>,
    /// What went wrong.
    pub problem: String,
    /// Where it went wrong.
    pub problem_mark: Option<Mark>,
    rendered: String,
}

impl MarkedError {
    pub(crate) fn new(
        label: &str,
        context: Option<(String, Mark, Option<Snippet>)>,
        problem: String,
        problem_mark: Option<(Mark, Option<Snippet>)>,
    ) -> Self {
        let mut rendered = String::new();
        let mut context_mark = None;
        let mut context_text = None;
        if let Some((text, mark, snippet)) = context {
            rendered.push_str(&text);
            rendered.push('\n');
            if problem_mark.as_ref().map_or(true, |(pm, _)| *pm != mark) {
                push_location(&mut rendered, label, mark, snippet.as_ref());
            }
            context_mark = Some(mark);
            context_text = Some(text);
        }
        rendered.push_str(&problem);
        let mut located = None;
        if let Some((mark, snippet)) = problem_mark {
            rendered.push('\n');
            push_location(&mut rendered, label, mark, snippet.as_ref());
            located = Some(mark);
        }
        Self {
            label: String::from(label),
            context: context_text,
            context_mark,
            problem,
            problem_mark: located,
            rendered: rendered.trim_end().to_owned(),
        }
    }

    /// The full message, including locations and snippets.
    pub fn message(&self) -> &str {
        &self.rendered
    }
}

fn push_location(out: &mut String, label: &str, mark: Mark, snippet: Option<&Snippet>) {
    out.push_str(&format!(" in {label}, {mark}:\n"));
    if let Some(snippet) = snippet {
        out.push_str(&snippet.render());
        out.push('\n');
    }
}

impl core::fmt::Display for MarkedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.rendered)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("{problem} (byte offset {offset}, value {value:#x})")]
    Problem {
        problem: &'static str,
        offset: usize,
        value: u32,
    },
    #[error("The incoming YAML document exceeds the limit: {limit} code points (read {size}).")]
    LimitExceeded { limit: usize, size: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{0}")]
    Problem(MarkedError),
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("no more tokens")]
    UnexpectedEof,
    #[error("{0}")]
    Problem(MarkedError),
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("{0}")]
    Problem(MarkedError),
    #[error(transparent)]
    Parser(#[from] ParserError),
}

impl ComposerError {
    /// Whether a document ran over the code point limit.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(
            self,
            ComposerError::Parser(ParserError::Scanner(ScannerError::Reader(
                ReaderError::LimitExceeded { .. }
            )))
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("writer could not flush the entire buffer")]
    Incomplete,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("{0}")]
    Problem(String),
    #[error(transparent)]
    Writer(#[from] WriterError),
}

#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("serializer is not opened")]
    NotOpened,
    #[error("serializer is already opened")]
    AlreadyOpened,
    #[error("serializer is closed")]
    Closed,
    #[error(transparent)]
    Emitter(#[from] EmitterError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConstructorError {
    #[error("{0}")]
    Problem(MarkedError),
}

#[derive(Debug, thiserror::Error)]
pub enum RepresenterError {
    #[error("Representer is not defined for class {type_name}")]
    Undefined { type_name: &'static str },
    #[error("{0}")]
    Problem(String),
}

/// Any failure of a complete load or dump.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Composer(#[from] ComposerError),
    #[error(transparent)]
    Constructor(#[from] ConstructorError),
    #[error(transparent)]
    Representer(#[from] RepresenterError),
    #[error(transparent)]
    Serializer(#[from] SerializerError),
}

impl From<ParserError> for Error {
    fn from(value: ParserError) -> Self {
        Error::Composer(ComposerError::Parser(value))
    }
}

impl From<EmitterError> for Error {
    fn from(value: EmitterError) -> Self {
        Error::Serializer(SerializerError::Emitter(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_context_and_problem() {
        let snippet = Snippet::from_parts(&['['], &[]);
        let error = MarkedError::new(
            "reader",
            Some((
                String::from("while parsing a flow node"),
                Mark::new(2, 1, 1),
                Some(snippet.clone()),
            )),
            String::from("expected the node content, but found '<stream end>'"),
            Some((Mark::new(3, 1, 2), None)),
        );
        assert_eq!(
            error.to_string(),
            "while parsing a flow node\n in reader, line 2, column 2:\n    [\n     ^\n\
             expected the node content, but found '<stream end>'\n in reader, line 2, column 3:"
        );
        assert_eq!(error.problem_mark, Some(Mark::new(3, 1, 2)));
        assert_eq!(error.label, "reader");
    }

    #[test]
    fn same_marks_are_printed_once() {
        let mark = Mark::new(0, 0, 0);
        let error = MarkedError::new(
            "input",
            Some((String::from("while scanning"), mark, None)),
            String::from("oops"),
            Some((mark, None)),
        );
        assert_eq!(error.message(), "while scanning\noops\n in input, line 1, column 1:");
    }
}
