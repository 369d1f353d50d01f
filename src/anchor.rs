use alloc::string::String;
use std::collections::HashSet;

use crate::{Node, NodeId};

/// The name of an anchor (`&name`) or alias (`*name`).
///
/// It is never empty and contains no whitespace and none of `[ ] { } , * &`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Anchor(String);

/// The reason a string cannot be used as an anchor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAnchor {
    #[error("anchor must not be empty")]
    Empty,
    #[error("invalid character '{ch}' in the anchor: {value}")]
    Character { value: String, ch: char },
}

impl Anchor {
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidAnchor> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Check `value` against the anchor rules without building an anchor.
    pub fn validate(value: &str) -> Result<(), InvalidAnchor> {
        if value.is_empty() {
            return Err(InvalidAnchor::Empty);
        }
        match value
            .chars()
            .find(|&ch| ch.is_whitespace() || matches!(ch, '[' | ']' | '{' | '}' | ',' | '*' | '&'))
        {
            Some(ch) => Err(InvalidAnchor::Character {
                value: String::from(value),
                ch,
            }),
            None => Ok(()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Anchor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Anchor {
    type Error = InvalidAnchor;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Anchor::new(value)
    }
}

impl TryFrom<String> for Anchor {
    type Error = InvalidAnchor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Anchor::new(value)
    }
}

impl AsRef<str> for Anchor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Names the anchors the serializer writes for shared nodes.
pub trait AnchorGenerator {
    fn next_anchor(&mut self, id: NodeId, node: &Node) -> Anchor;

    /// Called with every anchor the document already uses, before the first
    /// [`next_anchor`](Self::next_anchor).
    fn reserve(&mut self, _anchor: &Anchor) {}
}

/// Keeps anchors already present on a node, otherwise generates `id001`,
/// `id002`, and so on, passing over reserved names.
#[derive(Debug, Default)]
pub struct NumberAnchorGenerator {
    last: u32,
    taken: HashSet<Anchor>,
}

impl NumberAnchorGenerator {
    pub fn starting_at(last: u32) -> Self {
        Self {
            last,
            taken: HashSet::new(),
        }
    }
}

impl AnchorGenerator for NumberAnchorGenerator {
    fn next_anchor(&mut self, _id: NodeId, node: &Node) -> Anchor {
        if let Some(anchor) = &node.anchor {
            return anchor.clone();
        }
        loop {
            self.last += 1;
            let anchor = Anchor(format!("id{:03}", self.last));
            if !self.taken.contains(&anchor) {
                return anchor;
            }
        }
    }

    fn reserve(&mut self, anchor: &Anchor) {
        self.taken.insert(anchor.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_invalid_names() {
        assert_eq!(Anchor::new(""), Err(InvalidAnchor::Empty));
        for bad in ["a b", "a\tb", "a[", "]", "{x", "x}", "a,b", "a*", "&a"] {
            assert!(Anchor::new(bad).is_err(), "{bad:?} should be rejected");
        }
        assert_eq!(Anchor::new("anchor-1.ü").unwrap().as_str(), "anchor-1.ü");
    }

    #[test]
    fn error_names_the_character() {
        assert_eq!(
            Anchor::new("a b").unwrap_err().to_string(),
            "invalid character ' ' in the anchor: a b"
        );
    }

    #[test]
    fn sequential_names() {
        let mut document = Document::new();
        let first = document.add_scalar(None, "x", crate::ScalarStyle::Any);
        let second = document.add_scalar(None, "y", crate::ScalarStyle::Any);
        document.get_mut(second).anchor = Some(Anchor::new("kept").unwrap());
        let mut generator = NumberAnchorGenerator::default();
        assert_eq!(generator.next_anchor(first, document.get(first)).as_str(), "id001");
        assert_eq!(generator.next_anchor(second, document.get(second)).as_str(), "kept");
        assert_eq!(generator.next_anchor(first, document.get(first)).as_str(), "id002");
    }

    #[test]
    fn reserved_names_are_skipped() {
        let mut document = Document::new();
        let node = document.add_scalar(None, "x", crate::ScalarStyle::Any);
        let mut generator = NumberAnchorGenerator::default();
        generator.reserve(&Anchor::new("id001").unwrap());
        generator.reserve(&Anchor::new("id003").unwrap());
        let names = (0..3)
            .map(|_| String::from(generator.next_anchor(node, document.get(node)).as_str()))
            .collect::<Vec<_>>();
        assert_eq!(names, ["id002", "id004", "id005"]);
    }
}
