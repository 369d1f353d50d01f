use alloc::string::String;
use alloc::vec::Vec;

use crate::{
    Anchor, CommentType, MappingStyle, Mark, ScalarStyle, SequenceStyle, Tag, TagDirective,
    VersionDirective,
};

/// The position of a node in its document.
///
/// Two nodes are the same node exactly when their ids are equal, whatever
/// their content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The document structure.
///
/// Nodes live in an arena owned by the document. Collections refer to their
/// children by [`NodeId`], so an alias is simply a second reference to the
/// same id and a cycle needs no owning pointer.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Document {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    /// The version directive.
    pub version_directive: Option<VersionDirective>,
    /// The tag directives declared for the document.
    pub tag_directives: Vec<TagDirective>,
    /// Is the document start indicator implicit?
    pub start_implicit: bool,
    /// Is the document end indicator implicit?
    pub end_implicit: bool,
    /// The beginning of the document.
    pub start_mark: Mark,
    /// The end of the document.
    pub end_mark: Mark,
}

/// The node structure.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Node {
    /// The node type.
    pub data: NodeData,
    /// The node tag.
    pub tag: Tag,
    pub anchor: Option<Anchor>,
    /// The tag was inferred rather than written in the source.
    pub resolved: bool,
    /// The node contains itself, directly or through its children.
    pub recursive: bool,
    /// The beginning of the node.
    pub start_mark: Mark,
    /// The end of the node.
    pub end_mark: Mark,
    /// Comments on the lines in front of the node.
    pub block_comments: Vec<CommentLine>,
    /// Comments on the same line, after the node.
    pub inline_comments: Vec<CommentLine>,
    /// Comments after the last entry of a collection.
    pub end_comments: Vec<CommentLine>,
}

/// Node types.
#[derive(Clone, Debug)]
pub enum NodeData {
    /// A scalar node.
    Scalar {
        /// The scalar value.
        value: String,
        /// The scalar style.
        style: ScalarStyle,
    },
    /// A sequence node.
    Sequence {
        /// The sequence items.
        items: Vec<NodeId>,
        /// The sequence style.
        style: SequenceStyle,
    },
    /// A mapping node.
    Mapping {
        /// The mapping pairs, in source order.
        pairs: Vec<NodePair>,
        /// The mapping style.
        style: MappingStyle,
    },
}

/// An element of a mapping node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct NodePair {
    /// The key of the element.
    pub key: NodeId,
    /// The value of the element.
    pub value: NodeId,
}

/// One comment attached to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct CommentLine {
    pub kind: CommentType,
    /// The text after `#`.
    pub value: String,
    pub start_mark: Mark,
    pub end_mark: Mark,
}

impl CommentLine {
    pub fn new(kind: CommentType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            start_mark: Mark::default(),
            end_mark: Mark::default(),
        }
    }
}

impl Node {
    fn new(data: NodeData, tag: Option<Tag>, default_tag: Tag) -> Self {
        Node {
            data,
            resolved: tag.is_none(),
            tag: tag.unwrap_or(default_tag),
            anchor: None,
            recursive: false,
            start_mark: Mark::default(),
            end_mark: Mark::default(),
            block_comments: Vec::new(),
            inline_comments: Vec::new(),
            end_comments: Vec::new(),
        }
    }

    /// The value of a scalar node.
    pub fn as_scalar(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.data, NodeData::Scalar { .. })
    }

    pub fn is_collection(&self) -> bool {
        !self.is_scalar()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with implicit start and end.
    pub fn new() -> Document {
        Document {
            nodes: Vec::with_capacity(16),
            root: None,
            version_directive: None,
            tag_directives: Vec::new(),
            start_implicit: true,
            end_implicit: true,
            start_mark: Mark::default(),
            end_mark: Mark::default(),
        }
    }

    /// The root node id, once set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.root.map(|id| self.get(id))
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Get a node of this document.
    ///
    /// Panics if `id` was not handed out by this document.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Get a node of this document for modification.
    ///
    /// Panics if `id` was not handed out by this document.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their ids, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(index, node)| (NodeId(index), node))
    }

    /// Create a SCALAR node and attach it to the document.
    ///
    /// Without a tag the node gets `!!str` and counts as resolved.
    pub fn add_scalar(&mut self, tag: Option<Tag>, value: &str, style: ScalarStyle) -> NodeId {
        self.push(Node::new(
            NodeData::Scalar {
                value: String::from(value),
                style,
            },
            tag,
            Tag::STR,
        ))
    }

    /// Create a SEQUENCE node and attach it to the document.
    pub fn add_sequence(&mut self, tag: Option<Tag>, style: SequenceStyle) -> NodeId {
        self.push(Node::new(
            NodeData::Sequence {
                items: Vec::new(),
                style,
            },
            tag,
            Tag::SEQ,
        ))
    }

    /// Create a MAPPING node and attach it to the document.
    pub fn add_mapping(&mut self, tag: Option<Tag>, style: MappingStyle) -> NodeId {
        self.push(Node::new(
            NodeData::Mapping {
                pairs: Vec::new(),
                style,
            },
            tag,
            Tag::MAP,
        ))
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Add an item to a SEQUENCE node.
    pub fn append_sequence_item(&mut self, sequence: NodeId, item: NodeId) {
        assert!(item.0 < self.nodes.len());
        match &mut self.get_mut(sequence).data {
            NodeData::Sequence { items, .. } => items.push(item),
            _ => panic!("node {} is not a sequence", sequence.0),
        }
    }

    /// Add a pair of a key and a value to a MAPPING node.
    pub fn append_mapping_pair(&mut self, mapping: NodeId, key: NodeId, value: NodeId) {
        assert!(key.0 < self.nodes.len() && value.0 < self.nodes.len());
        match &mut self.get_mut(mapping).data {
            NodeData::Mapping { pairs, .. } => pairs.push(NodePair { key, value }),
            _ => panic!("node {} is not a mapping", mapping.0),
        }
    }

    /// The items of a sequence node, empty for other nodes.
    pub fn items(&self, sequence: NodeId) -> &[NodeId] {
        match &self.get(sequence).data {
            NodeData::Sequence { items, .. } => items,
            _ => &[],
        }
    }

    /// The pairs of a mapping node, empty for other nodes.
    pub fn pairs(&self, mapping: NodeId) -> &[NodePair] {
        match &self.get(mapping).data {
            NodeData::Mapping { pairs, .. } => pairs,
            _ => &[],
        }
    }

    /// The value stored under the scalar key `key` in a mapping node.
    pub fn lookup(&self, mapping: NodeId, key: &str) -> Option<NodeId> {
        self.pairs(mapping)
            .iter()
            .find(|pair| self.get(pair.key).as_scalar() == Some(key))
            .map(|pair| pair.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn build_and_query() {
        let mut document = Document::new();
        let root = document.add_mapping(None, MappingStyle::Block);
        let key = document.add_scalar(None, "items", ScalarStyle::Plain);
        let items = document.add_sequence(Some(Tag::new("!list")), SequenceStyle::Flow);
        let one = document.add_scalar(Some(Tag::INT), "1", ScalarStyle::Plain);
        document.append_sequence_item(items, one);
        document.append_sequence_item(items, one);
        document.append_mapping_pair(root, key, items);
        document.set_root(root);

        assert_eq!(document.root(), Some(root));
        assert_eq!(document.lookup(root, "items"), Some(items));
        assert_eq!(document.lookup(root, "missing"), None);
        assert_eq!(document.items(items), [one, one]);
        assert_eq!(document.get(items).tag, "!list");
        assert!(!document.get(items).resolved);
        assert!(document.get(key).resolved);
        assert_eq!(document.get(key).tag, Tag::STR);
        assert_eq!(document.len(), 4);
    }

    #[test]
    fn identity_not_content() {
        let mut document = Document::new();
        let first = document.add_scalar(None, "same", ScalarStyle::Any);
        let second = document.add_scalar(None, "same", ScalarStyle::Any);
        assert_ne!(first, second);
        assert_eq!(document.get(first).as_scalar(), document.get(second).as_scalar());
    }

    #[test]
    #[should_panic(expected = "is not a sequence")]
    fn append_to_scalar() {
        let mut document = Document::new();
        let scalar = document.add_scalar(None, "x", ScalarStyle::Any);
        document.append_sequence_item(scalar, scalar);
    }
}
