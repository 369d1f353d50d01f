use crate::{Anchor, CommentType, Encoding, Mark, ScalarStyle};

/// The token structure.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Token {
    /// The token type.
    pub data: TokenData,
    /// The beginning of the token.
    pub start_mark: Mark,
    /// The end of the token.
    pub end_mark: Mark,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenData {
    /// A STREAM-START token.
    StreamStart {
        /// The stream encoding.
        encoding: Encoding,
    },
    /// A STREAM-END token.
    StreamEnd,
    /// A VERSION-DIRECTIVE token.
    VersionDirective {
        /// The major version number.
        major: u32,
        /// The minor version number.
        minor: u32,
    },
    /// A TAG-DIRECTIVE token.
    TagDirective {
        /// The tag handle.
        handle: String,
        /// The tag prefix.
        prefix: String,
    },
    /// A DOCUMENT-START token.
    DocumentStart,
    /// A DOCUMENT-END token.
    DocumentEnd,
    /// A BLOCK-SEQUENCE-START token.
    BlockSequenceStart,
    /// A BLOCK-MAPPING-START token.
    BlockMappingStart,
    /// A BLOCK-END token.
    BlockEnd,
    /// A FLOW-SEQUENCE-START token.
    FlowSequenceStart,
    /// A FLOW-SEQUENCE-END token.
    FlowSequenceEnd,
    /// A FLOW-MAPPING-START token.
    FlowMappingStart,
    /// A FLOW-MAPPING-END token.
    FlowMappingEnd,
    /// A BLOCK-ENTRY token.
    BlockEntry,
    /// A FLOW-ENTRY token.
    FlowEntry,
    /// A KEY token.
    Key,
    /// A VALUE token.
    Value,
    /// An ALIAS token.
    Alias {
        /// The alias value.
        value: Anchor,
    },
    /// An ANCHOR token.
    Anchor {
        /// The anchor value.
        value: Anchor,
    },
    /// A TAG token.
    Tag {
        /// The tag handle.
        handle: String,
        /// The tag suffix.
        suffix: String,
    },
    /// A SCALAR token.
    Scalar {
        /// The scalar value.
        value: String,
        /// The scalar style.
        style: ScalarStyle,
    },
    /// A COMMENT token, only produced when comments are parsed.
    Comment {
        /// The text after `#`.
        value: String,
        /// Whether the comment has a line to itself.
        comment_type: CommentType,
    },
}

/// The kind of a token, without its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TokenKind {
    StreamStart,
    StreamEnd,
    VersionDirective,
    TagDirective,
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    Alias,
    Anchor,
    Tag,
    Scalar,
    Comment,
}

impl TokenData {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenData::StreamStart { .. } => TokenKind::StreamStart,
            TokenData::StreamEnd => TokenKind::StreamEnd,
            TokenData::VersionDirective { .. } => TokenKind::VersionDirective,
            TokenData::TagDirective { .. } => TokenKind::TagDirective,
            TokenData::DocumentStart => TokenKind::DocumentStart,
            TokenData::DocumentEnd => TokenKind::DocumentEnd,
            TokenData::BlockSequenceStart => TokenKind::BlockSequenceStart,
            TokenData::BlockMappingStart => TokenKind::BlockMappingStart,
            TokenData::BlockEnd => TokenKind::BlockEnd,
            TokenData::FlowSequenceStart => TokenKind::FlowSequenceStart,
            TokenData::FlowSequenceEnd => TokenKind::FlowSequenceEnd,
            TokenData::FlowMappingStart => TokenKind::FlowMappingStart,
            TokenData::FlowMappingEnd => TokenKind::FlowMappingEnd,
            TokenData::BlockEntry => TokenKind::BlockEntry,
            TokenData::FlowEntry => TokenKind::FlowEntry,
            TokenData::Key => TokenKind::Key,
            TokenData::Value => TokenKind::Value,
            TokenData::Alias { .. } => TokenKind::Alias,
            TokenData::Anchor { .. } => TokenKind::Anchor,
            TokenData::Tag { .. } => TokenKind::Tag,
            TokenData::Scalar { .. } => TokenKind::Scalar,
            TokenData::Comment { .. } => TokenKind::Comment,
        }
    }

    /// How the token is named in parser error messages.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            TokenData::StreamStart { .. } => "<stream start>",
            TokenData::StreamEnd => "<stream end>",
            TokenData::VersionDirective { .. } | TokenData::TagDirective { .. } => "<directive>",
            TokenData::DocumentStart => "<document start>",
            TokenData::DocumentEnd => "<document end>",
            TokenData::BlockSequenceStart => "<block sequence start>",
            TokenData::BlockMappingStart => "<block mapping start>",
            TokenData::BlockEnd => "<block end>",
            TokenData::FlowSequenceStart => "[",
            TokenData::FlowSequenceEnd => "]",
            TokenData::FlowMappingStart => "{",
            TokenData::FlowMappingEnd => "}",
            TokenData::BlockEntry => "-",
            TokenData::FlowEntry => ",",
            TokenData::Key => "?",
            TokenData::Value => ":",
            TokenData::Alias { .. } => "<alias>",
            TokenData::Anchor { .. } => "<anchor>",
            TokenData::Tag { .. } => "<tag>",
            TokenData::Scalar { .. } => "<scalar>",
            TokenData::Comment { .. } => "<comment>",
        }
    }
}
