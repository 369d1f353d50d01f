use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::scanner::Scanner;
use crate::settings::VersionFunction;
use crate::{
    Anchor, Encoding, Event, EventData, EventKind, LoadSettings, MappingStyle, Mark, MarkedError,
    ParserError, ScalarStyle, SequenceStyle, TagDirective, Token, TokenData, VersionDirective,
};

/// Turns tokens into events.
///
/// The grammar is driven by an explicit state stack so that events are
/// produced one at a time, as the caller asks for them.
pub struct Parser<'r> {
    scanner: Scanner<'r>,
    states: Vec<ParserState>,
    state: ParserState,
    marks: Vec<Mark>,
    /// Handles in scope for the current document, defaults included.
    tag_directives: Vec<TagDirective>,
    version_function: VersionFunction,
    parse_comments: bool,
    /// Events computed but not yet handed out; the front one is the peeked
    /// event.
    pending: VecDeque<Event>,
    stream_end_produced: bool,
}

impl<'r> Default for Parser<'r> {
    fn default() -> Self {
        Self::new()
    }
}

/// The states of the parser.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
enum ParserState {
    #[default]
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockNodeOrIndentlessSequence,
    FlowNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    /// Expect the key of a single-pair mapping inside a flow sequence.
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

impl<'r> Parser<'r> {
    pub fn new() -> Parser<'r> {
        Self::with_settings(&LoadSettings::default())
    }

    pub fn with_settings(settings: &LoadSettings) -> Parser<'r> {
        Parser {
            scanner: Scanner::with_settings(settings),
            states: Vec::with_capacity(16),
            state: ParserState::default(),
            marks: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            version_function: settings.version_function.clone(),
            parse_comments: settings.parse_comments,
            pending: VecDeque::new(),
            stream_end_produced: false,
        }
    }

    /// Set a string input.
    pub fn set_input_string(&mut self, input: &'r str) {
        self.scanner.set_input_string(input);
    }

    /// Set a byte input; the encoding is detected from its BOM.
    pub fn set_input_bytes(&mut self, input: &'r [u8]) {
        self.scanner.set_input_bytes(input);
    }

    /// Set a generic input handler.
    pub fn set_input(&mut self, input: &'r mut dyn std::io::BufRead) {
        self.scanner.set_input(input);
    }

    /// Set an unbuffered input.
    pub fn set_input_reader<R: std::io::Read + 'r>(&mut self, input: R) {
        self.scanner.set_input_reader(input);
    }

    /// Set the source encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.scanner.set_encoding(encoding);
    }

    /// Locate a problem found by a later stage in this parser's input.
    pub(crate) fn marked_error(
        &self,
        context: Option<(&str, Mark)>,
        problem: impl Into<String>,
        problem_mark: Mark,
    ) -> MarkedError {
        self.scanner
            .reader()
            .marked_error(context, problem, problem_mark)
    }

    /// Whether STREAM-END has not been handed out yet.
    pub fn has_next(&self) -> bool {
        !self.stream_end_produced
    }

    /// Abandon the current document and resume at the next document marker.
    pub(crate) fn skip_to_next_document(&mut self) -> Result<(), ParserError> {
        self.pending.clear();
        if matches!(self.state, ParserState::StreamStart | ParserState::End) {
            return Ok(());
        }
        self.states.clear();
        self.marks.clear();
        self.scanner.skip_to_next_document()?;
        self.state = ParserState::DocumentStart;
        Ok(())
    }

    /// Parse the input stream and produce the next parsing event.
    ///
    /// The first event is [`EventData::StreamStart`] and the last one
    /// [`EventData::StreamEnd`]; after that, every call returns STREAM-END
    /// again.
    pub fn next_event(&mut self) -> Result<Event, ParserError> {
        self.fill_pending()?;
        let event = self.pending.pop_front().ok_or(ParserError::UnexpectedEof)?;
        if let EventData::StreamEnd = event.data {
            self.stream_end_produced = true;
        }
        tracing::trace!(kind = ?event.kind(), mark = %event.start_mark, "event");
        Ok(event)
    }

    /// The next event, without consuming it.
    pub fn peek_event(&mut self) -> Result<&Event, ParserError> {
        self.fill_pending()?;
        self.pending.front().ok_or(ParserError::UnexpectedEof)
    }

    /// Whether the next event is of the given kind.
    pub fn check_event(&mut self, kind: EventKind) -> Result<bool, ParserError> {
        Ok(self.peek_event()?.kind() == kind)
    }

    fn fill_pending(&mut self) -> Result<(), ParserError> {
        if !self.pending.is_empty() {
            return Ok(());
        }
        if self.state == ParserState::End {
            let mark = self.scanner.mark();
            self.pending
                .push_back(Event::with_marks(EventData::StreamEnd, mark, mark));
            return Ok(());
        }
        let event = self.state_machine()?;
        if self.parse_comments {
            let index = match event.data {
                EventData::StreamEnd => usize::MAX,
                _ => event.start_mark.index,
            };
            while let Some(token) = self.scanner.take_comment_before(index) {
                if let TokenData::Comment {
                    value,
                    comment_type,
                } = token.data
                {
                    self.pending.push_back(Event::with_marks(
                        EventData::Comment {
                            value,
                            comment_type,
                        },
                        token.start_mark,
                        token.end_mark,
                    ));
                }
            }
        }
        self.pending.push_back(event);
        Ok(())
    }

    fn peek_token(&mut self) -> Result<&mut Token, ParserError> {
        self.scanner.peek_main()?.ok_or(ParserError::UnexpectedEof)
    }

    fn skip_token(&mut self) {
        self.scanner.skip_main();
    }

    fn pop_state(&mut self) -> ParserState {
        self.states.pop().unwrap_or(ParserState::End)
    }

    fn pop_mark(&mut self, fallback: Mark) -> Mark {
        self.marks.pop().unwrap_or(fallback)
    }

    fn error<T>(
        &self,
        context: Option<(&str, Mark)>,
        problem: impl Into<String>,
        problem_mark: Mark,
    ) -> Result<T, ParserError> {
        Err(ParserError::Problem(self.marked_error(
            context,
            problem,
            problem_mark,
        )))
    }

    fn state_machine(&mut self) -> Result<Event, ParserError> {
        match self.state {
            ParserState::StreamStart => self.parse_stream_start(),
            ParserState::ImplicitDocumentStart => self.parse_document_start(true),
            ParserState::DocumentStart => self.parse_document_start(false),
            ParserState::DocumentContent => self.parse_document_content(),
            ParserState::DocumentEnd => self.parse_document_end(),
            ParserState::BlockNode => self.parse_node(true, false),
            ParserState::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            ParserState::FlowNode => self.parse_node(false, false),
            ParserState::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            ParserState::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            ParserState::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            ParserState::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            ParserState::BlockMappingKey => self.parse_block_mapping_key(false),
            ParserState::BlockMappingValue => self.parse_block_mapping_value(),
            ParserState::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            ParserState::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            ParserState::FlowSequenceEntryMappingKey => {
                self.parse_flow_sequence_entry_mapping_key()
            }
            ParserState::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            ParserState::FlowSequenceEntryMappingEnd => {
                self.parse_flow_sequence_entry_mapping_end()
            }
            ParserState::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            ParserState::FlowMappingKey => self.parse_flow_mapping_key(false),
            ParserState::FlowMappingValue => self.parse_flow_mapping_value(false),
            ParserState::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            ParserState::End => Err(ParserError::UnexpectedEof),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::StreamStart { encoding } = token.data {
            let event = Event::with_marks(
                EventData::StreamStart { encoding },
                token.start_mark,
                token.end_mark,
            );
            self.state = ParserState::ImplicitDocumentStart;
            self.skip_token();
            Ok(event)
        } else {
            let mark = token.start_mark;
            self.error(None, "did not find expected <stream-start>", mark)
        }
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, ParserError> {
        let mut token = self.peek_token()?;
        if !implicit {
            while let TokenData::DocumentEnd = token.data {
                self.skip_token();
                token = self.peek_token()?;
            }
        }

        if implicit
            && !matches!(
                token.data,
                TokenData::VersionDirective { .. }
                    | TokenData::TagDirective { .. }
                    | TokenData::DocumentStart
                    | TokenData::StreamEnd
            )
        {
            let start_mark = token.start_mark;
            let event = Event::with_marks(
                EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: Vec::new(),
                    implicit: true,
                },
                start_mark,
                token.end_mark,
            );
            self.process_directives()?;
            tracing::debug!(mark = %start_mark, implicit = true, "document start");
            self.states.push(ParserState::DocumentEnd);
            self.state = ParserState::BlockNode;
            Ok(event)
        } else if !matches!(token.data, TokenData::StreamEnd) {
            let start_mark = token.start_mark;
            let (version_directive, tag_directives) = self.process_directives()?;
            let token = self.peek_token()?;
            if let TokenData::DocumentStart = token.data {
                let event = Event::with_marks(
                    EventData::DocumentStart {
                        version_directive,
                        tag_directives,
                        implicit: false,
                    },
                    start_mark,
                    token.end_mark,
                );
                tracing::debug!(mark = %start_mark, implicit = false, "document start");
                self.states.push(ParserState::DocumentEnd);
                self.state = ParserState::DocumentContent;
                self.skip_token();
                Ok(event)
            } else {
                let mark = token.start_mark;
                self.error(None, "did not find expected <document start>", mark)
            }
        } else {
            let event = Event::with_marks(EventData::StreamEnd, token.start_mark, token.end_mark);
            self.state = ParserState::End;
            self.skip_token();
            Ok(event)
        }
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::VersionDirective { .. }
        | TokenData::TagDirective { .. }
        | TokenData::DocumentStart
        | TokenData::DocumentEnd
        | TokenData::StreamEnd = token.data
        {
            let mark = token.start_mark;
            self.state = self.pop_state();
            Ok(Self::empty_scalar(mark))
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let start_mark = token.start_mark;
        let mut end_mark = start_mark;
        let mut implicit = true;
        if let TokenData::DocumentEnd = token.data {
            end_mark = token.end_mark;
            self.skip_token();
            implicit = false;
        }
        self.tag_directives.clear();
        self.state = ParserState::DocumentStart;
        tracing::debug!(mark = %start_mark, implicit, "document end");
        Ok(Event::with_marks(
            EventData::DocumentEnd { implicit },
            start_mark,
            end_mark,
        ))
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        let mut anchor: Option<Anchor> = None;
        let mut tag_parts: Option<(String, String)> = None;
        let mut tag_mark = Mark::default();

        let token = self.peek_token()?;
        if let TokenData::Alias { value } = &token.data {
            let event = Event::with_marks(
                EventData::Alias {
                    anchor: value.clone(),
                },
                token.start_mark,
                token.end_mark,
            );
            self.state = self.pop_state();
            self.skip_token();
            return Ok(event);
        }

        let mut start_mark = token.start_mark;
        let mut end_mark = start_mark;
        if let TokenData::Anchor { value } = &token.data {
            anchor = Some(value.clone());
            end_mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if let TokenData::Tag { handle, suffix } = &mut token.data {
                tag_parts = Some((core::mem::take(handle), core::mem::take(suffix)));
                tag_mark = token.start_mark;
                end_mark = token.end_mark;
                self.skip_token();
            }
        } else if let TokenData::Tag { handle, suffix } = &mut token.data {
            tag_parts = Some((core::mem::take(handle), core::mem::take(suffix)));
            tag_mark = token.start_mark;
            start_mark = tag_mark;
            end_mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if let TokenData::Anchor { value } = &token.data {
                anchor = Some(value.clone());
                end_mark = token.end_mark;
                self.skip_token();
            }
        }

        let tag = match tag_parts {
            None => None,
            Some((handle, suffix)) if handle.is_empty() => Some(suffix),
            Some((handle, suffix)) => {
                match self.tag_directives.iter().find(|d| d.handle == handle) {
                    Some(directive) => Some(format!("{}{}", directive.prefix, suffix)),
                    None => {
                        return self.error(
                            Some(("while parsing a node", start_mark)),
                            format!("found undefined tag handle {handle}"),
                            tag_mark,
                        )
                    }
                }
            }
        };

        let token = self.peek_token()?;
        let implicit = tag.as_deref().map_or(true, str::is_empty);

        if indentless_sequence && matches!(token.data, TokenData::BlockEntry) {
            end_mark = token.end_mark;
            self.state = ParserState::IndentlessSequenceEntry;
            return Ok(Event::with_marks(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            ));
        }

        let content_end = token.end_mark;
        match &mut token.data {
            TokenData::Scalar { value, style } => {
                let style = *style;
                let mut plain_implicit = false;
                let mut quoted_implicit = false;
                if (style == ScalarStyle::Plain && tag.is_none()) || tag.as_deref() == Some("!") {
                    plain_implicit = true;
                } else if tag.is_none() {
                    quoted_implicit = true;
                }
                let event = Event::with_marks(
                    EventData::Scalar {
                        anchor,
                        tag,
                        value: core::mem::take(value),
                        plain_implicit,
                        quoted_implicit,
                        style,
                    },
                    start_mark,
                    content_end,
                );
                self.state = self.pop_state();
                self.skip_token();
                Ok(event)
            }
            TokenData::FlowSequenceStart => {
                self.state = ParserState::FlowSequenceFirstEntry;
                Ok(Event::with_marks(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: SequenceStyle::Flow,
                    },
                    start_mark,
                    content_end,
                ))
            }
            TokenData::FlowMappingStart => {
                self.state = ParserState::FlowMappingFirstKey;
                Ok(Event::with_marks(
                    EventData::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: MappingStyle::Flow,
                    },
                    start_mark,
                    content_end,
                ))
            }
            TokenData::BlockSequenceStart if block => {
                self.state = ParserState::BlockSequenceFirstEntry;
                Ok(Event::with_marks(
                    EventData::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        style: SequenceStyle::Block,
                    },
                    start_mark,
                    content_end,
                ))
            }
            TokenData::BlockMappingStart if block => {
                self.state = ParserState::BlockMappingFirstKey;
                Ok(Event::with_marks(
                    EventData::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        style: MappingStyle::Block,
                    },
                    start_mark,
                    content_end,
                ))
            }
            _ if anchor.is_some() || tag.is_some() => {
                // properties without content stand for an empty scalar
                self.state = self.pop_state();
                Ok(Event::with_marks(
                    EventData::Scalar {
                        anchor,
                        tag,
                        value: String::new(),
                        plain_implicit: implicit,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start_mark,
                    end_mark,
                ))
            }
            data => {
                let problem = format!(
                    "expected the node content, but found '{}'",
                    data.describe()
                );
                let problem_mark = token.start_mark;
                let context = if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                };
                self.error(Some((context, start_mark)), problem, problem_mark)
            }
        }
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let token = self.peek_token()?;
        match token.data {
            TokenData::BlockEntry => {
                let mark = token.end_mark;
                self.skip_token();
                let token = self.peek_token()?;
                if matches!(token.data, TokenData::BlockEntry | TokenData::BlockEnd) {
                    self.state = ParserState::BlockSequenceEntry;
                    Ok(Self::empty_scalar(mark))
                } else {
                    self.states.push(ParserState::BlockSequenceEntry);
                    self.parse_node(true, false)
                }
            }
            TokenData::BlockEnd => {
                let event = Event::with_marks(EventData::SequenceEnd, token.start_mark, token.end_mark);
                self.state = self.pop_state();
                self.marks.pop();
                self.skip_token();
                Ok(event)
            }
            _ => {
                let token_mark = token.start_mark;
                let mark = self.pop_mark(token_mark);
                self.error(
                    Some(("while parsing a block collection", mark)),
                    "did not find expected '-' indicator",
                    token_mark,
                )
            }
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::BlockEntry = token.data {
            let mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::BlockEntry | TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::IndentlessSequenceEntry;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        } else {
            let event = Event::with_marks(EventData::SequenceEnd, token.start_mark, token.start_mark);
            self.state = self.pop_state();
            Ok(event)
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let token = self.peek_token()?;
        match token.data {
            TokenData::Key => {
                let mark = token.end_mark;
                self.skip_token();
                let token = self.peek_token()?;
                if matches!(
                    token.data,
                    TokenData::Key | TokenData::Value | TokenData::BlockEnd
                ) {
                    self.state = ParserState::BlockMappingValue;
                    Ok(Self::empty_scalar(mark))
                } else {
                    self.states.push(ParserState::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            TokenData::BlockEnd => {
                let event = Event::with_marks(EventData::MappingEnd, token.start_mark, token.end_mark);
                self.state = self.pop_state();
                self.marks.pop();
                self.skip_token();
                Ok(event)
            }
            _ => {
                let token_mark = token.start_mark;
                let mark = self.pop_mark(token_mark);
                self.error(
                    Some(("while parsing a block mapping", mark)),
                    "did not find expected key",
                    token_mark,
                )
            }
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::Value = token.data {
            let mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::BlockMappingKey;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockMappingKey);
                self.parse_node(true, true)
            }
        } else {
            let mark = token.start_mark;
            self.state = ParserState::BlockMappingKey;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowSequenceEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.pop_mark(token_mark);
                    return self.error(
                        Some(("while parsing a flow sequence", mark)),
                        "did not find expected ',' or ']'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                let event = Event::with_marks(
                    EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        style: MappingStyle::Flow,
                    },
                    token.start_mark,
                    token.end_mark,
                );
                self.state = ParserState::FlowSequenceEntryMappingKey;
                self.skip_token();
                return Ok(event);
            } else if !matches!(token.data, TokenData::FlowSequenceEnd) {
                self.states.push(ParserState::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let event = Event::with_marks(EventData::SequenceEnd, token.start_mark, token.end_mark);
        self.state = self.pop_state();
        self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(
            token.data,
            TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd
        ) {
            let mark = token.end_mark;
            self.skip_token();
            self.state = ParserState::FlowSequenceEntryMappingValue;
            Ok(Self::empty_scalar(mark))
        } else {
            self.states.push(ParserState::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        let mut token = self.peek_token()?;
        if let TokenData::Value = token.data {
            self.skip_token();
            token = self.peek_token()?;
            if !matches!(
                token.data,
                TokenData::FlowEntry | TokenData::FlowSequenceEnd
            ) {
                self.states.push(ParserState::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
        }
        let mark = token.start_mark;
        self.state = ParserState::FlowSequenceEntryMappingEnd;
        Ok(Self::empty_scalar(mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let event = Event::with_marks(EventData::MappingEnd, token.start_mark, token.start_mark);
        self.state = ParserState::FlowSequenceEntry;
        Ok(event)
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let mark = self.peek_token()?.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowMappingEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.pop_mark(token_mark);
                    return self.error(
                        Some(("while parsing a flow mapping", mark)),
                        "did not find expected ',' or '}'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                self.skip_token();
                let token = self.peek_token()?;
                if !matches!(
                    token.data,
                    TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd
                ) {
                    self.states.push(ParserState::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                let mark = token.start_mark;
                self.state = ParserState::FlowMappingValue;
                return Ok(Self::empty_scalar(mark));
            } else if !matches!(token.data, TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let event = Event::with_marks(EventData::MappingEnd, token.start_mark, token.end_mark);
        self.state = self.pop_state();
        self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        let mut token = self.peek_token()?;
        if empty {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            return Ok(Self::empty_scalar(mark));
        }
        if let TokenData::Value = token.data {
            self.skip_token();
            token = self.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingKey);
                return self.parse_node(false, false);
            }
        }
        let mark = token.start_mark;
        self.state = ParserState::FlowMappingKey;
        Ok(Self::empty_scalar(mark))
    }

    fn empty_scalar(mark: Mark) -> Event {
        Event::with_marks(
            EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        )
    }

    /// Consume the directives in front of a document, putting their handles
    /// and the default ones in scope. Returns the explicit directives.
    fn process_directives(
        &mut self,
    ) -> Result<(Option<VersionDirective>, Vec<TagDirective>), ParserError> {
        let mut version_directive = None;
        let mut tag_directives = Vec::new();

        loop {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            match &mut token.data {
                TokenData::VersionDirective { major, minor } => {
                    let declared = VersionDirective::new(*major, *minor);
                    if version_directive.is_some() {
                        return self.error(None, "found duplicate %YAML directive", mark);
                    }
                    match (self.version_function)(declared) {
                        Ok(accepted) => version_directive = Some(accepted),
                        Err(problem) => {
                            return self.error(
                                Some(("while parsing a %YAML directive", mark)),
                                problem,
                                mark,
                            )
                        }
                    }
                }
                TokenData::TagDirective { handle, prefix } => {
                    let directive =
                        TagDirective::new(core::mem::take(handle), core::mem::take(prefix));
                    self.append_tag_directive(directive.clone(), false, mark)?;
                    tag_directives.push(directive);
                }
                _ => break,
            }
            self.skip_token();
        }

        let mark = self.peek_token()?.start_mark;
        self.append_tag_directive(TagDirective::new("!", "!"), true, mark)?;
        self.append_tag_directive(TagDirective::new("!!", "tag:yaml.org,2002:"), true, mark)?;
        Ok((version_directive, tag_directives))
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
        mark: Mark,
    ) -> Result<(), ParserError> {
        if self.tag_directives.iter().any(|d| d.handle == value.handle) {
            if allow_duplicates {
                return Ok(());
            }
            return self.error(None, "found duplicate %TAG directive", mark);
        }
        self.tag_directives.push(value);
        Ok(())
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Event, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stream_end_produced {
            return None;
        }
        let event = self.next_event();
        if event.is_err() {
            self.stream_end_produced = true;
        }
        Some(event)
    }
}

impl core::iter::FusedIterator for Parser<'_> {}
