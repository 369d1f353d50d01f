use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use std::collections::{HashMap, HashSet};

use base64::Engine as _;

use crate::chars::is_allowed_input;
use crate::{
    Anchor, CommentLine, Document, DumpSettings, Emitter, Encoding, Event, FlowStyle,
    MappingStyle, NodeData, NodeId, NonPrintableStyle, ScalarStyle, SequenceStyle,
    SerializerError, Tag,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum SerializerState {
    NotOpened,
    Opened,
    Closed,
}

/// Walks documents and feeds their events to an [`Emitter`].
///
/// A stream is bracketed by [`open`](Serializer::open) and
/// [`close`](Serializer::close); every [`serialize`](Serializer::serialize)
/// call in between writes one document.
pub struct Serializer<'e, 'w> {
    emitter: &'e mut Emitter<'w>,
    settings: DumpSettings,
    state: SerializerState,
}

/// Anchors chosen for one document, plus the nodes already written.
struct Walk {
    anchors: HashMap<NodeId, Anchor>,
    serialized: HashSet<NodeId>,
}

enum Step {
    /// Write a node, or an alias if it was written before.
    Enter(NodeId),
    /// Close a collection.
    Leave(NodeId),
}

impl<'e, 'w> Serializer<'e, 'w> {
    pub fn new(emitter: &'e mut Emitter<'w>) -> Self {
        Self::with_settings(emitter, DumpSettings::default())
    }

    pub fn with_settings(emitter: &'e mut Emitter<'w>, settings: DumpSettings) -> Self {
        Serializer {
            emitter,
            settings,
            state: SerializerState::NotOpened,
        }
    }

    /// Start the stream.
    pub fn open(&mut self) -> Result<(), SerializerError> {
        match self.state {
            SerializerState::NotOpened => {
                self.emitter.emit(Event::stream_start(Encoding::Utf8))?;
                self.state = SerializerState::Opened;
                Ok(())
            }
            SerializerState::Opened => Err(SerializerError::AlreadyOpened),
            SerializerState::Closed => Err(SerializerError::Closed),
        }
    }

    /// Finish the stream. Closing twice is allowed.
    pub fn close(&mut self) -> Result<(), SerializerError> {
        match self.state {
            SerializerState::NotOpened => Err(SerializerError::NotOpened),
            SerializerState::Opened => {
                self.emitter.emit(Event::stream_end())?;
                self.state = SerializerState::Closed;
                Ok(())
            }
            SerializerState::Closed => Ok(()),
        }
    }

    /// Write one document.
    ///
    /// Nodes reached more than once, and nodes that already carry an anchor,
    /// are written once with an anchor and referenced by alias afterwards.
    pub fn serialize(&mut self, document: &Document) -> Result<(), SerializerError> {
        match self.state {
            SerializerState::NotOpened => return Err(SerializerError::NotOpened),
            SerializerState::Closed => return Err(SerializerError::Closed),
            SerializerState::Opened => {}
        }
        let Some(root) = document.root() else {
            tracing::debug!("skipping a document without a root node");
            return Ok(());
        };

        let mut walk = Walk {
            anchors: self.assign_anchors(document, root),
            serialized: HashSet::new(),
        };
        tracing::debug!(anchors = walk.anchors.len(), "serializing document");

        self.emitter.emit(Event::document_start(
            self.settings.version_directive,
            &self.settings.tag_directives,
            !self.settings.explicit_start,
        ))?;
        self.serialize_tree(document, root, &mut walk)?;
        self.emitter
            .emit(Event::document_end(!self.settings.explicit_end))?;
        Ok(())
    }

    fn assign_anchors(&self, document: &Document, root: NodeId) -> HashMap<NodeId, Anchor> {
        let mut references = HashMap::new();
        let mut order = Vec::new();
        count_references(document, root, &mut references, &mut order);

        let mut generator = (self.settings.anchor_generator)();
        for &id in &order {
            if let Some(anchor) = &document.get(id).anchor {
                generator.reserve(anchor);
            }
        }
        let mut anchors = HashMap::new();
        for id in order {
            let node = document.get(id);
            if references[&id] > 1 || node.anchor.is_some() {
                let anchor = generator.next_anchor(id, node);
                tracing::trace!(%anchor, node = id.index(), "anchor assigned");
                anchors.insert(id, anchor);
            }
        }
        anchors
    }

    /// Walk the tree below `root` depth first without recursing, so nesting
    /// depth is bounded by memory rather than the call stack.
    fn serialize_tree(
        &mut self,
        document: &Document,
        root: NodeId,
        walk: &mut Walk,
    ) -> Result<(), SerializerError> {
        let mut steps = vec![Step::Enter(root)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Enter(id) => self.enter_node(document, id, id == root, walk, &mut steps)?,
                Step::Leave(id) => {
                    let node = document.get(id);
                    self.emit_comments(&node.end_comments)?;
                    let end = if matches!(node.data, NodeData::Sequence { .. }) {
                        Event::sequence_end()
                    } else {
                        Event::mapping_end()
                    };
                    self.emitter.emit(end)?;
                    self.emit_comments(&node.inline_comments)?;
                }
            }
        }
        Ok(())
    }

    fn enter_node(
        &mut self,
        document: &Document,
        id: NodeId,
        root: bool,
        walk: &mut Walk,
        steps: &mut Vec<Step>,
    ) -> Result<(), SerializerError> {
        let anchor = walk.anchors.get(&id).cloned();
        if walk.serialized.contains(&id) {
            if let Some(anchor) = anchor {
                self.emitter.emit(Event::alias(anchor))?;
                return Ok(());
            }
        }
        walk.serialized.insert(id);

        let node = document.get(id);
        let forced_tag = if root {
            self.settings.explicit_root_tag.clone()
        } else {
            None
        };
        let force = forced_tag.is_some();
        let tag = forced_tag.unwrap_or_else(|| node.tag.clone());

        self.emit_comments(&node.block_comments)?;
        match &node.data {
            NodeData::Scalar { value, style } => {
                let mut tag = tag;
                let mut style = *style;
                let mut value = Cow::Borrowed(value.as_str());
                if self.settings.non_printable_style == NonPrintableStyle::Binary
                    && tag == Tag::STR
                    && value.chars().any(|ch| !is_allowed_input(ch))
                {
                    value = Cow::Owned(encode_binary(value.as_bytes()));
                    tag = Tag::BINARY;
                    style = ScalarStyle::Literal;
                }
                let resolver = self.settings.scalar_resolver();
                let plain_implicit = !force && resolver.resolve(&value, true) == tag;
                let quoted_implicit = !force && resolver.resolve(&value, false) == tag;
                if style == ScalarStyle::Any {
                    style = self.settings.default_scalar_style;
                }
                self.emitter.emit(Event::scalar(
                    anchor,
                    Some(tag.as_str()),
                    &value,
                    plain_implicit,
                    quoted_implicit,
                    style,
                ))?;
                self.emit_comments(&node.inline_comments)?;
                self.emit_comments(&node.end_comments)?;
            }
            NodeData::Sequence { items, style } => {
                let style = match (style, self.settings.default_flow_style) {
                    (SequenceStyle::Any, FlowStyle::Block) => SequenceStyle::Block,
                    (SequenceStyle::Any, FlowStyle::Flow) => SequenceStyle::Flow,
                    (style, _) => *style,
                };
                self.emitter.emit(Event::sequence_start(
                    anchor,
                    Some(tag.as_str()),
                    !force && tag == Tag::SEQ,
                    style,
                ))?;
                steps.push(Step::Leave(id));
                steps.extend(items.iter().rev().map(|&item| Step::Enter(item)));
            }
            NodeData::Mapping { pairs, style } => {
                let style = match (style, self.settings.default_flow_style) {
                    (MappingStyle::Any, FlowStyle::Block) => MappingStyle::Block,
                    (MappingStyle::Any, FlowStyle::Flow) => MappingStyle::Flow,
                    (style, _) => *style,
                };
                self.emitter.emit(Event::mapping_start(
                    anchor,
                    Some(tag.as_str()),
                    !force && tag == Tag::MAP,
                    style,
                ))?;
                steps.push(Step::Leave(id));
                for pair in pairs.iter().rev() {
                    steps.push(Step::Enter(pair.value));
                    steps.push(Step::Enter(pair.key));
                }
            }
        }
        Ok(())
    }

    fn emit_comments(&mut self, comments: &[CommentLine]) -> Result<(), SerializerError> {
        if !self.settings.dump_comments {
            return Ok(());
        }
        for comment in comments {
            self.emitter
                .emit(Event::comment(&comment.value, comment.kind))?;
        }
        Ok(())
    }
}

/// Count how often each node is reached from `root`, recording first visits
/// in depth-first order. Children of a node are only walked on its first
/// visit.
fn count_references(
    document: &Document,
    root: NodeId,
    references: &mut HashMap<NodeId, usize>,
    order: &mut Vec<NodeId>,
) {
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        let count = references.entry(id).or_insert(0);
        *count += 1;
        if *count > 1 {
            continue;
        }
        order.push(id);
        match &document.get(id).data {
            NodeData::Scalar { .. } => {}
            NodeData::Sequence { items, .. } => pending.extend(items.iter().rev()),
            NodeData::Mapping { pairs, .. } => {
                for pair in pairs.iter().rev() {
                    pending.push(pair.value);
                    pending.push(pair.key);
                }
            }
        }
    }
}

/// Base64 in lines of 76 characters, each ended by a line break.
pub(crate) fn encode_binary(bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    let mut text = String::with_capacity(encoded.len() + encoded.len() / 76 + 1);
    for chunk in encoded.as_bytes().chunks(76) {
        text.extend(chunk.iter().map(|&byte| char::from(byte)));
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Composer;
    use pretty_assertions::assert_eq;

    fn compose(input: &str) -> Document {
        let mut composer = Composer::new();
        composer.set_input_string(input);
        composer.single_document().unwrap().unwrap()
    }

    fn dump(settings: DumpSettings, document: &Document) -> String {
        let mut output = Vec::new();
        let mut emitter = Emitter::with_settings(settings.clone());
        emitter.set_output(&mut output);
        let mut serializer = Serializer::with_settings(&mut emitter, settings);
        serializer.open().unwrap();
        serializer.serialize(document).unwrap();
        serializer.close().unwrap();
        drop(emitter);
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn shared_node_gets_one_anchor() {
        let document = compose("a: &x [1, 2]\nb: *x\nc: *x\n");
        assert_eq!(
            dump(DumpSettings::default(), &document),
            "a: &x [1, 2]\nb: *x\nc: *x\n"
        );

        let mut document = Document::new();
        let map = document.add_mapping(None, MappingStyle::Block);
        let shared = document.add_scalar(None, "v", ScalarStyle::Any);
        for key in ["one", "two"] {
            let key = document.add_scalar(None, key, ScalarStyle::Any);
            document.append_mapping_pair(map, key, shared);
        }
        document.set_root(map);
        assert_eq!(
            dump(DumpSettings::default(), &document),
            "one: &id001 v\ntwo: *id001\n"
        );
    }

    #[test]
    fn generated_anchor_avoids_existing_names() {
        let mut document = Document::new();
        let map = document.add_mapping(None, MappingStyle::Block);
        let shared = document.add_scalar(None, "v", ScalarStyle::Any);
        let named = document.add_scalar(None, "w", ScalarStyle::Any);
        document.get_mut(named).anchor = Some(Anchor::new("id001").unwrap());
        for (key, value) in [("one", shared), ("two", shared), ("three", named)] {
            let key = document.add_scalar(None, key, ScalarStyle::Any);
            document.append_mapping_pair(map, key, value);
        }
        document.set_root(map);
        assert_eq!(
            dump(DumpSettings::default(), &document),
            "one: &id002 v\ntwo: *id002\nthree: &id001 w\n"
        );
    }

    #[test]
    fn deep_nesting() {
        let depth = 20_000;
        let mut document = Document::new();
        let mut inner = document.add_scalar(None, "x", ScalarStyle::Any);
        for _ in 0..depth {
            let sequence = document.add_sequence(None, SequenceStyle::Block);
            document.append_sequence_item(sequence, inner);
            inner = sequence;
        }
        document.set_root(inner);
        let text = dump(DumpSettings::default(), &document);
        assert_eq!(text.matches('-').count(), depth);
        assert!(text.trim_end().ends_with('x'), "{}", &text[text.len() - 20..]);
    }

    #[test]
    fn recursive_sequence() {
        let document = compose("&a [x, *a]");
        assert_eq!(dump(DumpSettings::default(), &document), "&a [x, *a]\n");
    }

    #[test]
    fn lifecycle_errors() {
        let mut output = Vec::new();
        let mut emitter = Emitter::new();
        emitter.set_output(&mut output);
        let mut serializer = Serializer::new(&mut emitter);
        let document = compose("x");

        assert!(matches!(
            serializer.serialize(&document),
            Err(SerializerError::NotOpened)
        ));
        assert!(matches!(serializer.close(), Err(SerializerError::NotOpened)));
        serializer.open().unwrap();
        assert!(matches!(
            serializer.open(),
            Err(SerializerError::AlreadyOpened)
        ));
        serializer.close().unwrap();
        serializer.close().unwrap();
        let error = serializer.serialize(&document).unwrap_err();
        assert_eq!(error.to_string(), "serializer is closed");
    }

    #[test]
    fn tags_only_where_needed() {
        let document = compose("[1, '1', !!str 1, !x y, true, '', ~]");
        assert_eq!(
            dump(DumpSettings::default(), &document),
            "[1, '1', '1', !x y, true, '', ~]\n"
        );
    }

    #[test]
    fn explicit_root_tag_and_markers() {
        let document = compose("a: 1");
        let settings = DumpSettings::default()
            .with_explicit_root_tag(Some(Tag::new("!root")))
            .with_explicit_start(true)
            .with_explicit_end(true);
        assert_eq!(dump(settings, &document), "--- !root\na: 1\n...\n");
    }

    #[test]
    fn binary_for_non_printable() {
        let document = compose("\"bell\\a\"");
        let settings =
            DumpSettings::default().with_non_printable_style(NonPrintableStyle::Binary);
        assert_eq!(dump(settings, &document), "!!binary |\n  YmVsbAc=\n");
        assert_eq!(
            dump(DumpSettings::default(), &document),
            "\"bell\\a\"\n"
        );
    }

    #[test]
    fn default_styles() {
        let document = compose("a: [1, {b: c}]");
        let settings = DumpSettings::default().with_default_flow_style(FlowStyle::Block);
        // styles recorded by the composer win over the default
        assert_eq!(dump(settings, &document), "a: [1, {b: c}]\n");

        let mut document = Document::new();
        let seq = document.add_sequence(None, SequenceStyle::Any);
        let item = document.add_scalar(None, "x", ScalarStyle::Any);
        document.append_sequence_item(seq, item);
        document.set_root(seq);
        let settings = DumpSettings::default().with_default_flow_style(FlowStyle::Flow);
        assert_eq!(dump(settings, &document), "[x]\n");
        let settings = DumpSettings::default().with_default_scalar_style(ScalarStyle::DoubleQuoted);
        assert_eq!(dump(settings, &document), "- \"x\"\n");
    }

    #[test]
    fn comments_round_trip() {
        let input = "# head\nkey: value # tail\n# end\n";
        let mut composer =
            Composer::with_settings(&crate::LoadSettings::default().with_parse_comments(true));
        composer.set_input_string(input);
        let document = composer.single_document().unwrap().unwrap();
        let settings = DumpSettings::default().with_dump_comments(true);
        assert_eq!(dump(settings, &document), input);
    }

    #[test]
    fn binary_lines() {
        assert_eq!(encode_binary(b"bell\x07"), "YmVsbAc=\n");
        let long = encode_binary(&[0u8; 60]);
        let lines = long.lines().map(str::len).collect::<Vec<_>>();
        assert_eq!(lines, vec![76, 4]);
    }
}
