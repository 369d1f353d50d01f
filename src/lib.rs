#![doc = include_str!("../README.md")]
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::fn_params_excessive_bools,
    clippy::manual_range_contains,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::unnecessary_wraps,
    clippy::match_wildcard_for_single_variants
)]
#![deny(unsafe_code)]

extern crate alloc;

mod anchor;
mod api;
mod chars;
mod composer;
mod constructor;
mod emitter;
mod error;
mod event;
mod mark;
mod node;
mod parser;
mod reader;
mod representer;
mod resolver;
mod scanner;
mod serializer;
mod settings;
mod tag;
mod token;
mod value;
mod writer;

pub use crate::anchor::*;
pub use crate::api::*;
pub use crate::composer::*;
pub use crate::constructor::*;
pub use crate::emitter::*;
pub use crate::error::*;
pub use crate::event::*;
pub use crate::mark::*;
pub use crate::node::*;
pub use crate::parser::*;
pub use crate::reader::*;
pub use crate::representer::*;
pub use crate::resolver::*;
pub use crate::scanner::*;
pub use crate::serializer::*;
pub use crate::settings::*;
pub use crate::tag::*;
pub use crate::token::*;
pub use crate::value::*;

pub(crate) const INPUT_BUFFER_SIZE: usize = 16384;
pub(crate) const OUTPUT_BUFFER_SIZE: usize = 16384;

/// The tag `!!null` with the only possible value: `null`.
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
/// The tag `!!bool` with the values: `true` and `false`.
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
/// The tag `!!str` for string values.
pub const STR_TAG: &str = "tag:yaml.org,2002:str";
/// The tag `!!int` for integer values.
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
/// The tag `!!float` for float values.
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
/// The tag `!!binary` for base64 encoded byte strings.
pub const BINARY_TAG: &str = "tag:yaml.org,2002:binary";

/// The tag `!!seq` is used to denote sequences.
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
/// The tag `!!map` is used to denote mapping.
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";

/// The default scalar tag is `!!str`.
pub const DEFAULT_SCALAR_TAG: &str = STR_TAG;
/// The default sequence tag is `!!seq`.
pub const DEFAULT_SEQUENCE_TAG: &str = SEQ_TAG;
/// The default mapping tag is `!!map`.
pub const DEFAULT_MAPPING_TAG: &str = MAP_TAG;

/// The version directive data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct VersionDirective {
    /// The major version number.
    pub major: u32,
    /// The minor version number.
    pub minor: u32,
}

impl VersionDirective {
    /// YAML 1.2, the version this crate implements.
    pub const V1_2: VersionDirective = VersionDirective { major: 1, minor: 2 };

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl core::fmt::Display for VersionDirective {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The tag directive data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TagDirective {
    /// The tag handle.
    pub handle: String,
    /// The tag prefix.
    pub prefix: String,
}

impl TagDirective {
    pub fn new(handle: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            prefix: prefix.into(),
        }
    }
}

/// The stream encoding.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Encoding {
    /// Let the reader detect the encoding from the byte order mark.
    #[default]
    Any,
    /// The default UTF-8 encoding.
    Utf8,
    /// The UTF-16-LE encoding with BOM.
    Utf16Le,
    /// The UTF-16-BE encoding with BOM.
    Utf16Be,
}

/// Line break type.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Break {
    /// Let the emitter choose the break type.
    #[default]
    Any,
    /// Use CR for line breaks (Mac style).
    Cr,
    /// Use LN for line breaks (Unix style).
    Ln,
    /// Use CR LN for line breaks (DOS style).
    CrLn,
}

/// Scalar styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ScalarStyle {
    /// Let the emitter choose the style.
    #[default]
    Any,
    /// The plain scalar style.
    Plain,
    /// The single-quoted scalar style.
    SingleQuoted,
    /// The double-quoted scalar style.
    DoubleQuoted,
    /// The literal scalar style.
    Literal,
    /// The folded scalar style.
    Folded,
}

/// Sequence styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SequenceStyle {
    /// Let the emitter choose the style.
    #[default]
    Any,
    /// The block sequence style.
    Block,
    /// The flow sequence style.
    Flow,
}

/// Mapping styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum MappingStyle {
    /// Let the emitter choose the style.
    #[default]
    Any,
    /// The block mapping style.
    Block,
    /// The flow mapping style.
    Flow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanity() {
        const SANITY_INPUT: &str = r#"unicode: "Sosa did fine.\u263A"
control: "\b1998\t1999\t2000\n"
hex esc: "\x0d\x0a is \r\n"

single: '"Howdy!" he cried.'
quoted: ' # Not a ''comment''.'
tie-fighter: '|\-*-/|'
"#;
        const SANITY_OUTPUT: &str = r#"unicode: "Sosa did fine.\u263A"
control: "\b1998\t1999\t2000\n"
hex esc: "\r\n is \r\n"
single: '"Howdy!" he cried.'
quoted: ' # Not a ''comment''.'
tie-fighter: '|\-*-/|'
"#;
        let mut composer = Composer::new();
        composer.set_input_string(SANITY_INPUT);
        let doc = composer.single_document().unwrap().unwrap();

        let settings = DumpSettings::default().with_unicode(false);
        let mut output = Vec::new();
        let mut emitter = Emitter::with_settings(settings.clone());
        emitter.set_output(&mut output);
        let mut serializer = Serializer::with_settings(&mut emitter, settings);
        serializer.open().unwrap();
        serializer.serialize(&doc).unwrap();
        serializer.close().unwrap();
        drop(serializer);
        drop(emitter);
        let output_str = core::str::from_utf8(&output).expect("invalid UTF-8");
        assert_eq!(output_str, SANITY_OUTPUT);
    }

    #[test]
    fn scanner_marks() {
        const INPUT: &str = "b:
c: true";
        let mut scanner = Scanner::new();
        scanner.set_input_string(INPUT);
        let tokens = scanner.collect::<Result<Vec<_>, _>>().unwrap();
        let mark = |index, line, column| Mark {
            index,
            line,
            column,
        };
        let token = |data, start_mark, end_mark| Token {
            data,
            start_mark,
            end_mark,
        };
        let expected = &[
            token(
                TokenData::StreamStart {
                    encoding: Encoding::Utf8,
                },
                mark(0, 0, 0),
                mark(0, 0, 0),
            ),
            token(TokenData::BlockMappingStart, mark(0, 0, 0), mark(0, 0, 0)),
            token(TokenData::Key, mark(0, 0, 0), mark(0, 0, 0)),
            token(
                TokenData::Scalar {
                    value: String::from("b"),
                    style: ScalarStyle::Plain,
                },
                mark(0, 0, 0),
                mark(1, 0, 1),
            ),
            token(TokenData::Value, mark(1, 0, 1), mark(2, 0, 2)),
            token(TokenData::Key, mark(3, 1, 0), mark(3, 1, 0)),
            token(
                TokenData::Scalar {
                    value: String::from("c"),
                    style: ScalarStyle::Plain,
                },
                mark(3, 1, 0),
                mark(4, 1, 1),
            ),
            token(TokenData::Value, mark(4, 1, 1), mark(5, 1, 2)),
            token(
                TokenData::Scalar {
                    value: String::from("true"),
                    style: ScalarStyle::Plain,
                },
                mark(6, 1, 3),
                mark(10, 1, 7),
            ),
            token(TokenData::BlockEnd, mark(10, 1, 7), mark(10, 1, 7)),
            token(TokenData::StreamEnd, mark(10, 1, 7), mark(10, 1, 7)),
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn crlf_counts_as_one_line() {
        let mut scanner = Scanner::new();
        scanner.set_input_string("a\r\nb\rc\nd");
        let lines = scanner
            .filter_map(Result::ok)
            .filter(|token| matches!(token.data, TokenData::Scalar { .. }))
            .map(|token| (token.start_mark.line, token.start_mark.index))
            .collect::<Vec<_>>();
        // a plain scalar folds across lines, so only one scalar is produced
        assert_eq!(lines, vec![(0, 0)]);

        let mut scanner = Scanner::new();
        scanner.set_input_string("- a\r\n- b\r- c\n- d");
        let lines = scanner
            .filter_map(Result::ok)
            .filter(|token| matches!(token.data, TokenData::Scalar { .. }))
            .map(|token| token.start_mark.line)
            .collect::<Vec<_>>();
        assert_eq!(lines, vec![0, 1, 2, 3]);
    }
}
