use alloc::borrow::Cow;
use alloc::string::String;

use crate::{BINARY_TAG, BOOL_TAG, FLOAT_TAG, INT_TAG, MAP_TAG, NULL_TAG, SEQ_TAG, STR_TAG};

/// A fully resolved node tag, such as `tag:yaml.org,2002:str` or a local
/// `!custom` tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    pub const NULL: Tag = Tag(Cow::Borrowed(NULL_TAG));
    pub const BOOL: Tag = Tag(Cow::Borrowed(BOOL_TAG));
    pub const STR: Tag = Tag(Cow::Borrowed(STR_TAG));
    pub const INT: Tag = Tag(Cow::Borrowed(INT_TAG));
    pub const FLOAT: Tag = Tag(Cow::Borrowed(FLOAT_TAG));
    pub const BINARY: Tag = Tag(Cow::Borrowed(BINARY_TAG));
    pub const SEQ: Tag = Tag(Cow::Borrowed(SEQ_TAG));
    pub const MAP: Tag = Tag(Cow::Borrowed(MAP_TAG));

    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag is a `!` local tag rather than a URI.
    pub fn is_local(&self) -> bool {
        self.0.starts_with('!')
    }
}

impl core::fmt::Display for Tag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::new(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::new(value)
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
