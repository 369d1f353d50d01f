use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::collections::HashMap;

use crate::{
    Anchor, CommentLine, CommentType, ComposerError, Document, Encoding, Event, EventData,
    EventKind, LoadSettings, Mark, NodeData, NodeId, Parser, ScalarResolver, Tag,
};

const RECURSIVE_KEY: &str =
    "Recursive key for mapping is detected but it is not configured to be allowed.";

/// Builds one [`Document`] at a time out of parser events.
///
/// Anchors are remembered only for the document being composed.
pub struct Composer<'r> {
    parser: Parser<'r>,
    resolver: Arc<dyn ScalarResolver>,
    allow_recursive_keys: bool,
    allow_duplicate_keys: bool,
    anchors: HashMap<Anchor, NodeId>,
    /// Comments waiting for the node they precede.
    comments: Vec<CommentLine>,
    failed: bool,
}

/// A collection whose end event has not been seen yet.
struct Open {
    id: NodeId,
    /// For mappings, a key still waiting for its value.
    key: Option<NodeId>,
}

impl<'r> Default for Composer<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Composer<'r> {
    pub fn new() -> Composer<'r> {
        Self::with_settings(&LoadSettings::default())
    }

    pub fn with_settings(settings: &LoadSettings) -> Composer<'r> {
        Composer {
            parser: Parser::with_settings(settings),
            resolver: Arc::clone(&settings.scalar_resolver),
            allow_recursive_keys: settings.allow_recursive_keys,
            allow_duplicate_keys: settings.allow_duplicate_keys,
            anchors: HashMap::new(),
            comments: Vec::new(),
            failed: false,
        }
    }

    pub fn set_input_string(&mut self, input: &'r str) {
        self.parser.set_input_string(input);
    }

    pub fn set_input_bytes(&mut self, input: &'r [u8]) {
        self.parser.set_input_bytes(input);
    }

    pub fn set_input(&mut self, input: &'r mut dyn std::io::BufRead) {
        self.parser.set_input(input);
    }

    pub fn set_input_reader<R: std::io::Read + 'r>(&mut self, input: R) {
        self.parser.set_input_reader(input);
    }

    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.parser.set_encoding(encoding);
    }

    /// Whether another document follows in the stream.
    pub fn has_next(&mut self) -> Result<bool, ComposerError> {
        self.skip_to_document()?;
        Ok(!self.parser.check_event(EventKind::StreamEnd)?)
    }

    /// Compose the next document of the stream.
    ///
    /// Returns `None` once the stream is exhausted.
    pub fn next_document(&mut self) -> Result<Option<Document>, ComposerError> {
        self.skip_to_document()?;
        let event = self.parser.next_event()?;
        let EventData::DocumentStart {
            version_directive,
            tag_directives,
            implicit,
        } = event.data
        else {
            if event.kind() == EventKind::StreamEnd {
                self.comments.clear();
                return Ok(None);
            }
            return Err(self.unexpected(&event));
        };

        let mut document = Document::new();
        document.version_directive = version_directive;
        document.tag_directives = tag_directives;
        document.start_implicit = implicit;
        document.start_mark = event.start_mark;
        self.compose_document(&mut document)?;
        self.anchors.clear();
        tracing::debug!(
            nodes = document.len(),
            start = %document.start_mark,
            "document composed"
        );
        Ok(Some(document))
    }

    /// Compose the only document of the stream.
    ///
    /// An empty stream gives `None`; a second document is an error.
    pub fn single_document(&mut self) -> Result<Option<Document>, ComposerError> {
        let Some(document) = self.next_document()? else {
            return Ok(None);
        };
        self.skip_to_document()?;
        let event = self.parser.peek_event()?;
        if event.kind() != EventKind::StreamEnd {
            let mark = event.start_mark;
            return Err(self.error(
                Some(("expected a single document in the stream", document.start_mark)),
                "but found another document",
                mark,
            ));
        }
        self.parser.next_event()?;
        Ok(Some(document))
    }

    fn compose_document(&mut self, document: &mut Document) -> Result<(), ComposerError> {
        let mut stack: Vec<Open> = Vec::new();
        // The node an in-line comment would belong to.
        let mut last: Option<NodeId> = None;
        loop {
            let event = self.parser.next_event()?;
            let (start_mark, end_mark) = (event.start_mark, event.end_mark);
            match event.data {
                EventData::DocumentEnd { implicit } => {
                    document.end_implicit = implicit;
                    document.end_mark = end_mark;
                    let trailing = core::mem::take(&mut self.comments);
                    if let Some(root) = document.root() {
                        document.get_mut(root).end_comments.extend(trailing);
                    }
                    return Ok(());
                }
                EventData::Comment {
                    value,
                    comment_type,
                } => {
                    let line = CommentLine {
                        kind: comment_type,
                        value,
                        start_mark,
                        end_mark,
                    };
                    match (comment_type, last) {
                        (CommentType::InLine, Some(id)) => {
                            document.get_mut(id).inline_comments.push(line);
                        }
                        _ => self.comments.push(line),
                    }
                }
                EventData::Alias { anchor } => {
                    let Some(&target) = self.anchors.get(&anchor) else {
                        return Err(self.error(
                            None,
                            format!("found undefined alias {anchor}"),
                            start_mark,
                        ));
                    };
                    if stack.iter().any(|open| open.id == target) {
                        tracing::trace!(%anchor, "alias closes a cycle");
                        document.get_mut(target).recursive = true;
                    }
                    self.comments.clear();
                    last = None;
                    self.attach(document, &mut stack, target)?;
                }
                EventData::Scalar {
                    anchor,
                    tag,
                    value,
                    plain_implicit,
                    style,
                    ..
                } => {
                    let (tag, resolved) = match tag.as_deref() {
                        None => (self.resolver.resolve(&value, plain_implicit), true),
                        Some("!") => (Tag::STR, true),
                        Some(tag) => (Tag::new(tag), false),
                    };
                    let id = document.add_scalar(Some(tag), &value, style);
                    self.start_node(document, id, anchor, resolved, start_mark, end_mark);
                    last = Some(id);
                    self.attach(document, &mut stack, id)?;
                }
                EventData::SequenceStart {
                    anchor, tag, style, ..
                } => {
                    let (tag, resolved) = collection_tag(tag, Tag::SEQ);
                    let id = document.add_sequence(Some(tag), style);
                    self.start_node(document, id, anchor, resolved, start_mark, end_mark);
                    last = Some(id);
                    self.attach(document, &mut stack, id)?;
                    stack.push(Open { id, key: None });
                }
                EventData::MappingStart {
                    anchor, tag, style, ..
                } => {
                    let (tag, resolved) = collection_tag(tag, Tag::MAP);
                    let id = document.add_mapping(Some(tag), style);
                    self.start_node(document, id, anchor, resolved, start_mark, end_mark);
                    last = Some(id);
                    self.attach(document, &mut stack, id)?;
                    stack.push(Open { id, key: None });
                }
                EventData::SequenceEnd | EventData::MappingEnd => {
                    let Some(open) = stack.pop() else {
                        return Err(self.error(None, "found unbalanced collection end", start_mark));
                    };
                    let node = document.get_mut(open.id);
                    node.end_mark = end_mark;
                    node.end_comments.append(&mut self.comments);
                    last = Some(open.id);
                }
                data @ (EventData::StreamStart { .. }
                | EventData::StreamEnd
                | EventData::DocumentStart { .. }) => {
                    return Err(self.unexpected(&Event::with_marks(data, start_mark, end_mark)));
                }
            }
        }
    }

    /// Fill in what the arena builder leaves at its defaults.
    fn start_node(
        &mut self,
        document: &mut Document,
        id: NodeId,
        anchor: Option<Anchor>,
        resolved: bool,
        start_mark: Mark,
        end_mark: Mark,
    ) {
        if let Some(anchor) = &anchor {
            if let Some(previous) = self.anchors.insert(anchor.clone(), id) {
                tracing::warn!(
                    %anchor,
                    first = %document.get(previous).start_mark,
                    second = %start_mark,
                    "anchor redefined, the later definition wins"
                );
            }
        }
        let node = document.get_mut(id);
        node.anchor = anchor;
        node.resolved = resolved;
        node.start_mark = start_mark;
        node.end_mark = end_mark;
        node.block_comments = core::mem::take(&mut self.comments);
    }

    /// Place a finished or opened node into its parent.
    fn attach(
        &self,
        document: &mut Document,
        stack: &mut [Open],
        id: NodeId,
    ) -> Result<(), ComposerError> {
        let Some(open) = stack.last_mut() else {
            document.set_root(id);
            return Ok(());
        };
        if let NodeData::Sequence { .. } = document.get(open.id).data {
            document.append_sequence_item(open.id, id);
            return Ok(());
        }
        match open.key.take() {
            None => open.key = Some(id),
            Some(key) => {
                self.check_key(document, open.id, key)?;
                document.append_mapping_pair(open.id, key, id);
            }
        }
        Ok(())
    }

    fn check_key(
        &self,
        document: &Document,
        mapping: NodeId,
        key: NodeId,
    ) -> Result<(), ComposerError> {
        let context = Some(("while composing a mapping", document.get(mapping).start_mark));
        let node = document.get(key);
        if node.recursive && !self.allow_recursive_keys {
            return Err(self.error(context, RECURSIVE_KEY, node.start_mark));
        }
        if self.allow_duplicate_keys {
            return Ok(());
        }
        if let Some(value) = node.as_scalar() {
            let duplicate = document.pairs(mapping).iter().any(|pair| {
                let other = document.get(pair.key);
                other.as_scalar() == Some(value) && other.tag == node.tag
            });
            if duplicate {
                return Err(self.error(
                    context,
                    format!("found duplicate key {value}"),
                    node.start_mark,
                ));
            }
        }
        Ok(())
    }

    /// Consume STREAM-START and any comments in front of the next document.
    fn skip_to_document(&mut self) -> Result<(), ComposerError> {
        loop {
            match self.parser.peek_event()?.kind() {
                EventKind::StreamStart => {
                    self.parser.next_event()?;
                }
                EventKind::Comment => {
                    let event = self.parser.next_event()?;
                    if let EventData::Comment {
                        value,
                        comment_type,
                    } = event.data
                    {
                        self.comments.push(CommentLine {
                            kind: comment_type,
                            value,
                            start_mark: event.start_mark,
                            end_mark: event.end_mark,
                        });
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Drop what is left of a document that ran over the code point limit.
    fn recover(&mut self) -> Result<(), ComposerError> {
        self.anchors.clear();
        self.comments.clear();
        self.parser.skip_to_next_document()?;
        Ok(())
    }

    fn error(
        &self,
        context: Option<(&str, Mark)>,
        problem: impl Into<String>,
        problem_mark: Mark,
    ) -> ComposerError {
        ComposerError::Problem(self.parser.marked_error(context, problem, problem_mark))
    }

    fn unexpected(&self, event: &Event) -> ComposerError {
        self.error(
            None,
            format!("did not expect {:?} here", event.kind()),
            event.start_mark,
        )
    }
}

fn collection_tag(tag: Option<String>, default: Tag) -> (Tag, bool) {
    match tag {
        None => (default, true),
        Some(tag) if tag == "!" => (default, true),
        Some(tag) => (Tag::new(tag), false),
    }
}

impl Iterator for Composer<'_> {
    type Item = Result<Document, ComposerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_document() {
            Ok(document) => document.map(Ok),
            Err(error) => {
                if !error.is_limit_exceeded() || self.recover().is_err() {
                    self.failed = true;
                }
                Some(Err(error))
            }
        }
    }
}

impl core::iter::FusedIterator for Composer<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compose(input: &str) -> Result<Document, ComposerError> {
        let mut composer = Composer::new();
        composer.set_input_string(input);
        Ok(composer.single_document()?.unwrap())
    }

    fn compose_with(settings: &LoadSettings, input: &str) -> Result<Document, ComposerError> {
        let mut composer = Composer::with_settings(settings);
        composer.set_input_string(input);
        Ok(composer.single_document()?.unwrap())
    }

    #[test]
    fn flow_mapping() {
        let document = compose("{a: 1}").unwrap();
        let root = document.root().unwrap();
        assert_eq!(document.get(root).tag, Tag::MAP);
        assert_eq!(document.pairs(root).len(), 1);
        let value = document.lookup(root, "a").unwrap();
        assert_eq!(document.get(value).as_scalar(), Some("1"));
        assert_eq!(document.get(value).tag, Tag::INT);
        assert!(document.get(value).resolved);
        assert!(document.start_implicit);
    }

    #[test]
    fn scalar_tags() {
        let document = compose("[1, '1', !!str 1, ! 1, !x 1, ~]").unwrap();
        let root = document.root().unwrap();
        let tags = document
            .items(root)
            .iter()
            .map(|&id| (document.get(id).tag.clone(), document.get(id).resolved))
            .collect::<Vec<_>>();
        assert_eq!(
            tags,
            [
                (Tag::INT, true),
                (Tag::STR, true),
                (Tag::STR, false),
                (Tag::STR, true),
                (Tag::new("!x"), false),
                (Tag::NULL, true),
            ]
        );
    }

    #[test]
    fn aliases_share_nodes() {
        let document = compose("a: &x [1]\nb: *x\nc: [1]\n").unwrap();
        let root = document.root().unwrap();
        let a = document.lookup(root, "a").unwrap();
        let b = document.lookup(root, "b").unwrap();
        let c = document.lookup(root, "c").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(document.get(a).anchor, Some(Anchor::new("x").unwrap()));
        assert!(!document.get(a).recursive);
    }

    #[test]
    fn self_reference() {
        let document = compose("&loop [a, *loop]").unwrap();
        let root = document.root().unwrap();
        assert!(document.get(root).recursive);
        assert_eq!(document.items(root)[1], root);
    }

    #[test]
    fn recursive_key() {
        let error = compose("&m {*m: 1}").unwrap_err();
        assert!(error.to_string().contains(RECURSIVE_KEY), "{error}");

        let settings = LoadSettings::default().with_allow_recursive_keys(true);
        let document = compose_with(&settings, "&m {*m: 1}").unwrap();
        let root = document.root().unwrap();
        assert_eq!(document.pairs(root)[0].key, root);
    }

    #[test]
    fn undefined_alias() {
        let error = compose("a: *nope\n").unwrap_err();
        let ComposerError::Problem(problem) = &error else {
            panic!("{error:?}");
        };
        assert_eq!(problem.problem, "found undefined alias nope");
        assert_eq!(problem.problem_mark, Some(Mark::new(3, 0, 3)));
    }

    #[test]
    fn redefined_anchor() {
        let document = compose("- &a 1\n- &a 2\n- *a\n").unwrap();
        let root = document.root().unwrap();
        let items = document.items(root);
        assert_eq!(items[2], items[1]);
    }

    #[test]
    fn anchors_do_not_leak() {
        let mut composer = Composer::new();
        composer.set_input_string("a: &x 1\n---\nb: *x\n");
        assert!(composer.next_document().unwrap().is_some());
        let error = composer.next_document().unwrap_err();
        assert!(error.to_string().contains("found undefined alias x"), "{error}");
    }

    #[test]
    fn duplicate_keys() {
        assert!(compose("a: 1\na: 2\n").is_ok());
        let settings = LoadSettings::default().with_allow_duplicate_keys(false);
        let error = compose_with(&settings, "a: 1\na: 2\n").unwrap_err();
        assert!(error.to_string().contains("found duplicate key a"), "{error}");
        assert!(compose_with(&settings, "a: 1\n'1': 2\n1: 3\n").is_ok());
    }

    #[test]
    fn single_document() {
        let error = compose("a\n--- b\n").unwrap_err();
        let ComposerError::Problem(problem) = &error else {
            panic!("{error:?}");
        };
        assert_eq!(
            problem.context.as_deref(),
            Some("expected a single document in the stream")
        );
        assert_eq!(problem.problem, "but found another document");
        assert_eq!(problem.context_mark, Some(Mark::new(0, 0, 0)));
        assert_eq!(problem.problem_mark, Some(Mark::new(2, 1, 0)));

        let mut composer = Composer::new();
        composer.set_input_string("# nothing\n");
        assert!(composer.single_document().unwrap().is_none());
    }

    #[test]
    fn documents_in_order() {
        let mut composer = Composer::new();
        composer.set_input_string("--- 1\n--- !!str 2\n...\n");
        assert!(composer.has_next().unwrap());
        let values = composer
            .by_ref()
            .map(|document| {
                let document = document.unwrap();
                String::from(document.root_node().unwrap().as_scalar().unwrap())
            })
            .collect::<Vec<_>>();
        assert_eq!(values, ["1", "2"]);
        assert!(!composer.has_next().unwrap());
    }

    #[test]
    fn error_stops_iteration() {
        let mut composer = Composer::new();
        composer.set_input_string("--- ok\n--- *missing\n--- never\n");
        assert!(composer.next().unwrap().is_ok());
        assert!(composer.next().unwrap().is_err());
        assert!(composer.next().is_none());
    }

    #[test]
    fn limit_error_resumes_at_next_document() {
        let settings = LoadSettings::default().with_code_point_limit(16);
        let mut composer = Composer::with_settings(&settings);
        composer.set_input_string(
            "--- a\n--- {key: [this one, runs, past the limit]}\n...\n--- &c c\n",
        );
        let scalars = composer
            .by_ref()
            .map(|document| {
                document.map(|document| {
                    String::from(document.root_node().unwrap().as_scalar().unwrap())
                })
            })
            .collect::<Vec<_>>();
        assert_eq!(scalars.len(), 3);
        assert_eq!(scalars[0].as_deref().unwrap(), "a");
        assert!(scalars[1].as_ref().unwrap_err().is_limit_exceeded());
        assert_eq!(scalars[2].as_deref().unwrap(), "c");
        assert!(composer.next().is_none());
    }

    #[test]
    fn comments_attached() {
        let settings = LoadSettings::default().with_parse_comments(true);
        let document =
            compose_with(&settings, "# head\nkey: value # tail\n# end\n").unwrap();
        let root = document.root().unwrap();
        let texts = |lines: &[CommentLine]| {
            lines
                .iter()
                .map(|line| line.value.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(texts(&document.get(root).block_comments), [" head"]);
        assert_eq!(texts(&document.get(root).end_comments), [" end"]);
        let value = document.lookup(root, "key").unwrap();
        assert_eq!(texts(&document.get(value).inline_comments), [" tail"]);
        assert_eq!(document.get(value).inline_comments[0].kind, CommentType::InLine);
    }
}
