use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::chars::{
    is_allowed_input, is_alpha, is_ascii, is_blank, is_blankz, is_bom, is_break, is_breakz,
    is_printable, is_space,
};
use crate::writer::Writer;
use crate::{
    Anchor, Break, CommentType, DumpSettings, EmitterError, Encoding, Event, EventData, EventKind,
    MappingStyle, NonPrintableStyle, ScalarStyle, SequenceStyle, TagDirective, VersionDirective,
};

/// The states of the emitter.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
enum EmitterState {
    /// Expect STREAM-START.
    #[default]
    StreamStart,
    /// Expect the first DOCUMENT-START or STREAM-END.
    FirstDocumentStart,
    /// Expect DOCUMENT-START or STREAM-END.
    DocumentStart,
    /// Expect the content of a document.
    DocumentContent,
    /// Expect DOCUMENT-END.
    DocumentEnd,
    FlowSequenceFirstItem,
    FlowSequenceItem,
    FlowMappingFirstKey,
    FlowMappingKey,
    /// Expect a value for a simple key of a flow mapping.
    FlowMappingSimpleValue,
    FlowMappingValue,
    BlockSequenceFirstItem,
    BlockSequenceItem,
    BlockMappingFirstKey,
    BlockMappingKey,
    /// Expect a value for a simple key of a block mapping.
    BlockMappingSimpleValue,
    BlockMappingValue,
    /// Expect nothing.
    End,
}

/// Whether the last document may need a `...` marker before what follows.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum OpenEnded {
    No,
    /// The document ended implicitly.
    Implicit,
    /// A keep-chomped block scalar ended the document.
    Required,
}

/// Turns events into YAML text.
///
/// Collection starts are held back until enough of the following events are
/// known to decide between flow and block style, so output lags the input
/// by a few events.
pub struct Emitter<'w> {
    writer: Writer<'w>,
    canonical: bool,
    best_indent: usize,
    indicator_indent: usize,
    indent_with_indicator: bool,
    best_width: usize,
    split_lines: bool,
    unicode: bool,
    multi_line_flow: bool,
    non_printable_style: NonPrintableStyle,
    dump_comments: bool,
    states: Vec<EmitterState>,
    state: EmitterState,
    events: VecDeque<Event>,
    indents: Vec<Option<usize>>,
    tag_directives: Vec<TagDirective>,
    /// The current indentation level; `None` before the first node.
    indent: Option<usize>,
    flow_level: usize,
    root_context: bool,
    sequence_context: bool,
    mapping_context: bool,
    simple_key_context: bool,
    /// If the last character was a whitespace?
    whitespace: bool,
    /// If the last character was an indentation character (' ', '-', '?', ':')?
    indention: bool,
    open_ended: OpenEnded,
    /// Comments waiting for the next line break or the next line.
    inline_comments: Vec<String>,
    block_comments: Vec<String>,
}

#[derive(Default)]
struct Analysis<'a> {
    anchor: Option<AnchorAnalysis<'a>>,
    tag: Option<TagAnalysis>,
    scalar: Option<ScalarAnalysis<'a>>,
}

struct AnchorAnalysis<'a> {
    anchor: &'a str,
    alias: bool,
}

struct TagAnalysis {
    handle: String,
    suffix: String,
}

struct ScalarAnalysis<'a> {
    value: &'a str,
    /// Does the scalar contain line breaks?
    multiline: bool,
    flow_plain_allowed: bool,
    block_plain_allowed: bool,
    single_quoted_allowed: bool,
    /// Can the scalar be expressed in the literal or folded styles?
    block_allowed: bool,
}

fn problem<T>(message: impl Into<String>) -> Result<T, EmitterError> {
    Err(EmitterError::Problem(message.into()))
}

impl<'w> Default for Emitter<'w> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'w> Emitter<'w> {
    pub fn new() -> Emitter<'w> {
        Self::with_settings(DumpSettings::default())
    }

    pub fn with_settings(settings: DumpSettings) -> Emitter<'w> {
        Emitter {
            writer: Writer::new(settings.line_break),
            canonical: settings.canonical,
            best_indent: settings.best_indent(),
            indicator_indent: settings.best_indicator_indent(),
            indent_with_indicator: settings.indent_with_indicator,
            best_width: settings.best_width(),
            split_lines: settings.split_lines,
            unicode: settings.unicode,
            multi_line_flow: settings.multi_line_flow,
            non_printable_style: settings.non_printable_style,
            dump_comments: settings.dump_comments,
            states: Vec::with_capacity(16),
            state: EmitterState::default(),
            events: VecDeque::with_capacity(16),
            indents: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            indent: None,
            flow_level: 0,
            root_context: false,
            sequence_context: false,
            mapping_context: false,
            simple_key_context: false,
            whitespace: true,
            indention: true,
            open_ended: OpenEnded::No,
            inline_comments: Vec::new(),
            block_comments: Vec::new(),
        }
    }

    /// Set the sink the text is written to.
    pub fn set_output(&mut self, output: &'w mut dyn std::io::Write) {
        self.writer.set_output(output);
    }

    /// Set the output encoding, overriding the one in STREAM-START.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        assert_eq!(self.state, EmitterState::StreamStart, "the stream has started");
        self.writer.encoding = encoding;
    }

    /// Write buffered text to the output.
    pub fn flush(&mut self) -> Result<(), EmitterError> {
        Ok(self.writer.flush()?)
    }

    /// Emit an event.
    ///
    /// Events must form a well-nested stream: STREAM-START, then documents,
    /// then STREAM-END.
    pub fn emit(&mut self, event: Event) -> Result<(), EmitterError> {
        if event.kind() == EventKind::Comment && !self.dump_comments {
            return Ok(());
        }
        self.events.push_back(event);
        while let Some(event) = self.next_ready_event() {
            if let EventData::Comment {
                value,
                comment_type,
            } = event.data
            {
                self.queue_comment(value, comment_type);
                continue;
            }
            let mut analysis = self.analyze_event(&event)?;
            self.state_machine(&event, &mut analysis)?;
        }
        Ok(())
    }

    /// Pop the front event once enough lookahead follows it.
    fn next_ready_event(&mut self) -> Option<Event> {
        let first = self.events.front()?;
        let accumulate = match first.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return self.events.pop_front(),
        };

        let queued = self
            .events
            .iter()
            .filter(|event| event.kind() != EventKind::Comment)
            .count();
        if queued > accumulate {
            return self.events.pop_front();
        }

        let mut level = 0i32;
        for event in &self.events {
            match event.data {
                EventData::StreamStart { .. }
                | EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => level += 1,
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => level -= 1,
                EventData::Comment { .. } => continue,
                _ => {}
            }
            if level == 0 {
                return self.events.pop_front();
            }
        }
        None
    }

    /// The first queued event that is not a comment.
    fn peek_content(&self) -> Option<&Event> {
        self.events
            .iter()
            .find(|event| event.kind() != EventKind::Comment)
    }

    fn queue_comment(&mut self, value: String, comment_type: CommentType) {
        // Flow collections and canonical output have no room for comments.
        if self.flow_level > 0 || self.canonical {
            return;
        }
        match comment_type {
            CommentType::InLine => self.inline_comments.push(value),
            CommentType::Block => self.block_comments.push(value),
        }
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
    ) -> Result<(), EmitterError> {
        if self
            .tag_directives
            .iter()
            .any(|directive| directive.handle == value.handle)
        {
            if allow_duplicates {
                return Ok(());
            }
            return problem("duplicate %TAG directive");
        }
        self.tag_directives.push(value);
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        self.indent = Some(match self.indent {
            None if flow => self.best_indent,
            None => 0,
            Some(indent) if indentless => indent,
            Some(indent) => indent + self.best_indent,
        });
    }

    fn decrease_indent(&mut self) {
        self.indent = self.indents.pop().flatten();
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(EmitterState::End);
    }

    fn state_machine(
        &mut self,
        event: &Event,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        match self.state {
            EmitterState::StreamStart => self.emit_stream_start(event),
            EmitterState::FirstDocumentStart => self.emit_document_start(event, true),
            EmitterState::DocumentStart => self.emit_document_start(event, false),
            EmitterState::DocumentContent => self.emit_document_content(event, analysis),
            EmitterState::DocumentEnd => self.emit_document_end(event),
            EmitterState::FlowSequenceFirstItem => {
                self.emit_flow_sequence_item(event, true, analysis)
            }
            EmitterState::FlowSequenceItem => self.emit_flow_sequence_item(event, false, analysis),
            EmitterState::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true, analysis),
            EmitterState::FlowMappingKey => self.emit_flow_mapping_key(event, false, analysis),
            EmitterState::FlowMappingSimpleValue => {
                self.emit_flow_mapping_value(event, true, analysis)
            }
            EmitterState::FlowMappingValue => self.emit_flow_mapping_value(event, false, analysis),
            EmitterState::BlockSequenceFirstItem => {
                self.emit_block_sequence_item(event, true, analysis)
            }
            EmitterState::BlockSequenceItem => {
                self.emit_block_sequence_item(event, false, analysis)
            }
            EmitterState::BlockMappingFirstKey => {
                self.emit_block_mapping_key(event, true, analysis)
            }
            EmitterState::BlockMappingKey => self.emit_block_mapping_key(event, false, analysis),
            EmitterState::BlockMappingSimpleValue => {
                self.emit_block_mapping_value(event, true, analysis)
            }
            EmitterState::BlockMappingValue => {
                self.emit_block_mapping_value(event, false, analysis)
            }
            EmitterState::End => problem("expected nothing after STREAM-END"),
        }
    }

    fn emit_stream_start(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::StreamStart { encoding } = &event.data else {
            return problem("expected STREAM-START");
        };
        if self.writer.encoding == Encoding::Any {
            self.writer.encoding = *encoding;
        }
        if self.writer.encoding == Encoding::Any {
            self.writer.encoding = Encoding::Utf8;
        }
        if self.writer.line_break == Break::Any {
            self.writer.line_break = Break::Ln;
        }
        self.open_ended = OpenEnded::No;
        self.indent = None;
        self.writer.line = 0;
        self.writer.column = 0;
        self.whitespace = true;
        self.indention = true;
        if self.writer.encoding != Encoding::Utf8 {
            self.writer.write_bom()?;
        }
        self.state = EmitterState::FirstDocumentStart;
        Ok(())
    }

    fn emit_document_start(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        match &event.data {
            EventData::DocumentStart {
                version_directive,
                tag_directives,
                implicit,
            } => {
                if let Some(version) = version_directive {
                    analyze_version_directive(*version)?;
                }
                for directive in tag_directives {
                    analyze_tag_directive(directive)?;
                    self.append_tag_directive(directive.clone(), false)?;
                }
                self.append_tag_directive(TagDirective::new("!", "!"), true)?;
                self.append_tag_directive(TagDirective::new("!!", "tag:yaml.org,2002:"), true)?;

                let mut implicit = *implicit && first && !self.canonical;
                if (version_directive.is_some() || !tag_directives.is_empty())
                    && self.open_ended != OpenEnded::No
                {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                }
                self.open_ended = OpenEnded::No;
                if let Some(version) = version_directive {
                    implicit = false;
                    self.write_indicator("%YAML", true, false, false)?;
                    self.write_indicator(&version.to_string(), true, false, false)?;
                    self.write_indent()?;
                }
                for directive in tag_directives {
                    implicit = false;
                    self.write_indicator("%TAG", true, false, false)?;
                    self.write_tag_handle(&directive.handle)?;
                    self.write_tag_content(&directive.prefix, true)?;
                    self.write_indent()?;
                }
                if !implicit {
                    self.write_indent()?;
                    self.write_indicator("---", true, false, false)?;
                    if self.canonical {
                        self.write_indent()?;
                    }
                }
                self.state = EmitterState::DocumentContent;
                Ok(())
            }
            EventData::StreamEnd => {
                self.flush_comments()?;
                if self.open_ended == OpenEnded::Required {
                    self.write_indicator("...", true, false, false)?;
                    self.open_ended = OpenEnded::No;
                    self.write_indent()?;
                } else if !self.indention {
                    self.write_indent()?;
                }
                self.writer.flush()?;
                self.state = EmitterState::End;
                Ok(())
            }
            _ => problem("expected DOCUMENT-START or STREAM-END"),
        }
    }

    fn emit_document_content(
        &mut self,
        event: &Event,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        self.states.push(EmitterState::DocumentEnd);
        if !self.block_comments.is_empty() || !self.inline_comments.is_empty() {
            self.flush_comments()?;
            self.write_indent()?;
        }
        self.emit_node(event, true, false, false, false, analysis)
    }

    fn emit_document_end(&mut self, event: &Event) -> Result<(), EmitterError> {
        let EventData::DocumentEnd { implicit } = &event.data else {
            return problem("expected DOCUMENT-END");
        };
        self.flush_comments()?;
        self.write_indent()?;
        if *implicit {
            if self.open_ended == OpenEnded::No {
                self.open_ended = OpenEnded::Implicit;
            }
        } else {
            self.write_indicator("...", true, false, false)?;
            self.open_ended = OpenEnded::No;
            self.write_indent()?;
        }
        self.writer.flush()?;
        self.state = EmitterState::DocumentStart;
        self.tag_directives.clear();
        Ok(())
    }

    fn emit_flow_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("[", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::SequenceEnd = &event.data {
            self.flow_level -= 1;
            self.decrease_indent();
            if (self.canonical || self.multi_line_flow) && !first {
                if self.canonical {
                    self.write_indicator(",", false, false, false)?;
                }
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.multi_line_flow || self.writer.column > self.best_width {
            self.write_indent()?;
        }
        self.states.push(EmitterState::FlowSequenceItem);
        self.emit_node(event, false, true, false, false, analysis)
    }

    fn emit_flow_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("{", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::MappingEnd = &event.data {
            self.flow_level -= 1;
            self.decrease_indent();
            if (self.canonical || self.multi_line_flow) && !first {
                if self.canonical {
                    self.write_indicator(",", false, false, false)?;
                }
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.multi_line_flow || self.writer.column > self.best_width {
            self.write_indent()?;
        }
        if !self.canonical && self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::FlowMappingSimpleValue);
            self.emit_node(event, false, false, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(EmitterState::FlowMappingValue);
            self.emit_node(event, false, false, true, false, analysis)
        }
    }

    fn emit_flow_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.canonical || self.writer.column > self.best_width {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(EmitterState::FlowMappingKey);
        self.emit_node(event, false, false, true, false, analysis)
    }

    fn emit_block_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        if first {
            let indentless = self.mapping_context && !self.indention;
            self.increase_indent(false, indentless);
            if self.indent_with_indicator {
                self.indent = self.indent.map(|indent| indent + self.indicator_indent);
            }
        }
        if let EventData::SequenceEnd = &event.data {
            self.flush_comments()?;
            self.decrease_indent();
            self.pop_state();
            return Ok(());
        }
        self.flush_comments()?;
        self.write_indent()?;
        if !self.indent_with_indicator {
            for _ in 0..self.indicator_indent {
                self.writer.put(' ')?;
            }
        }
        self.write_indicator("-", true, false, true)?;
        self.states.push(EmitterState::BlockSequenceItem);
        self.emit_node(event, false, true, false, false, analysis)
    }

    fn emit_block_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        if first {
            self.increase_indent(false, false);
        }
        if let EventData::MappingEnd = &event.data {
            self.flush_comments()?;
            self.decrease_indent();
            self.pop_state();
            return Ok(());
        }
        self.flush_comments()?;
        self.write_indent()?;
        if self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::BlockMappingSimpleValue);
            self.emit_node(event, false, false, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(EmitterState::BlockMappingValue);
            self.emit_node(event, false, false, true, false, analysis)
        }
    }

    fn emit_block_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        self.states.push(EmitterState::BlockMappingKey);
        self.emit_node(event, false, false, true, false, analysis)
    }

    fn emit_node(
        &mut self,
        event: &Event,
        root: bool,
        sequence: bool,
        mapping: bool,
        simple_key: bool,
        analysis: &mut Analysis<'_>,
    ) -> Result<(), EmitterError> {
        self.root_context = root;
        self.sequence_context = sequence;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;

        match &event.data {
            EventData::Alias { .. } => self.emit_alias(analysis),
            EventData::Scalar { .. } => self.emit_scalar(event, analysis),
            EventData::SequenceStart { style, .. } => {
                self.process_anchor(analysis.anchor.as_ref())?;
                self.process_tag(analysis.tag.as_ref())?;
                self.state = if self.flow_level > 0
                    || self.canonical
                    || *style == SequenceStyle::Flow
                    || self.check_empty_sequence()
                {
                    EmitterState::FlowSequenceFirstItem
                } else {
                    EmitterState::BlockSequenceFirstItem
                };
                Ok(())
            }
            EventData::MappingStart { style, .. } => {
                self.process_anchor(analysis.anchor.as_ref())?;
                self.process_tag(analysis.tag.as_ref())?;
                self.state = if self.flow_level > 0
                    || self.canonical
                    || *style == MappingStyle::Flow
                    || self.check_empty_mapping()
                {
                    EmitterState::FlowMappingFirstKey
                } else {
                    EmitterState::BlockMappingFirstKey
                };
                Ok(())
            }
            _ => problem("expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS"),
        }
    }

    fn emit_alias(&mut self, analysis: &Analysis<'_>) -> Result<(), EmitterError> {
        self.process_anchor(analysis.anchor.as_ref())?;
        if self.simple_key_context {
            self.writer.put(' ')?;
        }
        self.pop_state();
        Ok(())
    }

    fn emit_scalar(&mut self, event: &Event, analysis: &Analysis<'_>) -> Result<(), EmitterError> {
        let (
            EventData::Scalar {
                plain_implicit,
                quoted_implicit,
                style,
                ..
            },
            Some(scalar),
        ) = (&event.data, &analysis.scalar)
        else {
            return problem("expected SCALAR");
        };
        let (style, show_tag) = self.select_scalar_style(
            *style,
            *plain_implicit,
            *quoted_implicit,
            scalar,
            analysis.tag.is_some(),
        )?;
        self.process_anchor(analysis.anchor.as_ref())?;
        if show_tag {
            self.process_tag(analysis.tag.as_ref())?;
        }
        self.increase_indent(true, false);
        self.process_scalar(style, scalar.value)?;
        self.decrease_indent();
        self.pop_state();
        Ok(())
    }

    fn check_empty_sequence(&self) -> bool {
        self.peek_content()
            .is_some_and(|event| event.kind() == EventKind::SequenceEnd)
    }

    fn check_empty_mapping(&self) -> bool {
        self.peek_content()
            .is_some_and(|event| event.kind() == EventKind::MappingEnd)
    }

    fn check_simple_key(&self, event: &Event, analysis: &Analysis<'_>) -> bool {
        let mut length = analysis.anchor.as_ref().map_or(0, |a| a.anchor.len())
            + analysis
                .tag
                .as_ref()
                .map_or(0, |t| t.handle.len() + t.suffix.len());

        match event.data {
            EventData::Alias { .. } => {}
            EventData::Scalar { .. } => {
                let Some(scalar) = &analysis.scalar else {
                    return false;
                };
                if scalar.multiline {
                    return false;
                }
                length += scalar.value.len();
            }
            EventData::SequenceStart { .. } => {
                if !self.check_empty_sequence() {
                    return false;
                }
            }
            EventData::MappingStart { .. } => {
                if !self.check_empty_mapping() {
                    return false;
                }
            }
            _ => return false,
        }

        length <= 128
    }

    /// Pick the style a scalar is written in and whether its tag must be
    /// shown.
    fn select_scalar_style(
        &self,
        requested: ScalarStyle,
        plain_implicit: bool,
        quoted_implicit: bool,
        scalar: &ScalarAnalysis<'_>,
        has_tag: bool,
    ) -> Result<(ScalarStyle, bool), EmitterError> {
        if !has_tag && !plain_implicit && !quoted_implicit {
            return problem("neither tag nor implicit flags are specified");
        }
        let mut style = match requested {
            ScalarStyle::Any => ScalarStyle::Plain,
            style => style,
        };
        if self.canonical {
            style = ScalarStyle::DoubleQuoted;
        }
        if self.simple_key_context && scalar.multiline {
            style = ScalarStyle::DoubleQuoted;
        }
        if style == ScalarStyle::Plain {
            let flow = self.flow_level > 0;
            if flow && !scalar.flow_plain_allowed || !flow && !scalar.block_plain_allowed {
                style = ScalarStyle::SingleQuoted;
            }
            // An empty plain root would read back as an empty document.
            if scalar.value.is_empty() && (flow || self.simple_key_context || self.root_context) {
                style = ScalarStyle::SingleQuoted;
            }
            if !plain_implicit && (quoted_implicit || !has_tag) {
                style = ScalarStyle::SingleQuoted;
            }
        }
        if style == ScalarStyle::SingleQuoted && !scalar.single_quoted_allowed {
            style = ScalarStyle::DoubleQuoted;
        }
        if matches!(style, ScalarStyle::Literal | ScalarStyle::Folded)
            && (!scalar.block_allowed || self.flow_level > 0 || self.simple_key_context)
        {
            style = ScalarStyle::DoubleQuoted;
        }
        let implicit = if style == ScalarStyle::Plain {
            plain_implicit
        } else {
            quoted_implicit
        };
        Ok((style, has_tag && (self.canonical || !implicit)))
    }

    fn process_anchor(&mut self, analysis: Option<&AnchorAnalysis<'_>>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis else {
            return Ok(());
        };
        self.write_indicator(if analysis.alias { "*" } else { "&" }, true, false, false)?;
        self.write_anchor(analysis.anchor)
    }

    fn process_tag(&mut self, analysis: Option<&TagAnalysis>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis else {
            return Ok(());
        };
        if analysis.handle.is_empty() && analysis.suffix.is_empty() {
            return Ok(());
        }
        if analysis.handle.is_empty() {
            self.write_indicator("!<", true, false, false)?;
            self.write_tag_content(&analysis.suffix, false)?;
            self.write_indicator(">", false, false, false)?;
        } else {
            self.write_tag_handle(&analysis.handle)?;
            if !analysis.suffix.is_empty() {
                self.write_tag_content(&analysis.suffix, false)?;
            }
        }
        Ok(())
    }

    fn process_scalar(&mut self, style: ScalarStyle, value: &str) -> Result<(), EmitterError> {
        let allow_breaks = !self.simple_key_context && self.split_lines;
        match style {
            ScalarStyle::Plain => self.write_plain_scalar(value, allow_breaks),
            ScalarStyle::SingleQuoted => self.write_single_quoted_scalar(value, allow_breaks),
            ScalarStyle::DoubleQuoted | ScalarStyle::Any => {
                self.write_double_quoted_scalar(value, allow_breaks)
            }
            ScalarStyle::Literal => self.write_literal_scalar(value),
            ScalarStyle::Folded => self.write_folded_scalar(value),
        }
    }

    fn analyze_tag(&self, tag: &str) -> Result<TagAnalysis, EmitterError> {
        if tag.is_empty() {
            return problem("tag value must not be empty");
        }
        for directive in &self.tag_directives {
            let prefix = directive.prefix.as_str();
            if prefix.len() < tag.len() && tag.starts_with(prefix) {
                return Ok(TagAnalysis {
                    handle: directive.handle.clone(),
                    suffix: String::from(&tag[prefix.len()..]),
                });
            }
        }
        Ok(TagAnalysis {
            handle: String::new(),
            suffix: String::from(tag),
        })
    }

    fn analyze_scalar<'a>(&self, value: &'a str) -> Result<ScalarAnalysis<'a>, EmitterError> {
        if value.is_empty() {
            return Ok(ScalarAnalysis {
                value: "",
                multiline: false,
                flow_plain_allowed: false,
                block_plain_allowed: true,
                single_quoted_allowed: true,
                block_allowed: false,
            });
        }
        if self.non_printable_style == NonPrintableStyle::Fail
            && value.chars().any(|ch| !is_allowed_input(ch))
        {
            return problem("scalar contains non-printable characters");
        }

        let mut block_indicators = false;
        let mut flow_indicators = false;
        let mut line_breaks = false;
        let mut special_characters = false;
        let mut leading_space = false;
        let mut leading_break = false;
        let mut trailing_space = false;
        let mut trailing_break = false;
        let mut break_space = false;
        let mut space_break = false;
        let mut previous_space = false;
        let mut previous_break = false;

        if value.starts_with("---") || value.starts_with("...") {
            block_indicators = true;
            flow_indicators = true;
        }
        let mut preceded_by_whitespace = true;
        let mut chars = value.chars().peekable();
        let mut first = true;

        while let Some(ch) = chars.next() {
            let next = chars.peek().copied();
            let followed_by_whitespace = is_blankz(next);
            if first {
                match ch {
                    '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\''
                    | '"' | '%' | '@' | '`' => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    '?' | ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '-' if followed_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            } else {
                match ch {
                    ',' | '?' | '[' | ']' | '{' | '}' => flow_indicators = true,
                    ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '#' if preceded_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            }

            if !is_printable(ch) || !is_ascii(ch) && !self.unicode {
                special_characters = true;
            }
            if is_break(ch) {
                line_breaks = true;
            }

            if is_space(ch) {
                leading_space |= first;
                trailing_space |= next.is_none();
                break_space |= previous_break;
                previous_space = true;
                previous_break = false;
            } else if is_break(ch) {
                leading_break |= first;
                trailing_break |= next.is_none();
                space_break |= previous_space;
                previous_space = false;
                previous_break = true;
            } else {
                previous_space = false;
                previous_break = false;
            }

            preceded_by_whitespace = is_blankz(ch);
            first = false;
        }

        let mut analysis = ScalarAnalysis {
            value,
            multiline: line_breaks,
            flow_plain_allowed: true,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: true,
        };
        if leading_space || leading_break || trailing_space || trailing_break {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if trailing_space {
            analysis.block_allowed = false;
        }
        if break_space {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
        }
        if space_break || special_characters {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
            analysis.block_allowed = false;
        }
        if line_breaks {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if flow_indicators {
            analysis.flow_plain_allowed = false;
        }
        if block_indicators {
            analysis.block_plain_allowed = false;
        }
        Ok(analysis)
    }

    fn analyze_event<'a>(&self, event: &'a Event) -> Result<Analysis<'a>, EmitterError> {
        let mut analysis = Analysis::default();
        match &event.data {
            EventData::Alias { anchor } => {
                analysis.anchor = Some(analyze_anchor(anchor, true)?);
            }
            EventData::Scalar {
                anchor, tag, value, ..
            } => {
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(analyze_anchor(anchor, false)?);
                }
                if let Some(tag) = tag {
                    analysis.tag = Some(self.analyze_tag(tag)?);
                }
                analysis.scalar = Some(self.analyze_scalar(value)?);
            }
            EventData::SequenceStart {
                anchor,
                tag,
                implicit,
                ..
            }
            | EventData::MappingStart {
                anchor,
                tag,
                implicit,
                ..
            } => {
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(analyze_anchor(anchor, false)?);
                }
                if let Some(tag) = tag {
                    if self.canonical || !*implicit {
                        analysis.tag = Some(self.analyze_tag(tag)?);
                    }
                }
            }
            _ => {}
        }
        Ok(analysis)
    }

    /// Write the comments gathered since the last line break.
    ///
    /// In-line comments end the current line, block comments get a line each
    /// at the current indentation. The next `write_indent` starts a new line.
    fn flush_comments(&mut self) -> Result<(), EmitterError> {
        for text in core::mem::take(&mut self.inline_comments) {
            self.write_indicator("#", true, false, false)?;
            self.writer.write_str(&text)?;
            self.whitespace = false;
            self.indention = false;
        }
        for text in core::mem::take(&mut self.block_comments) {
            self.write_indent()?;
            self.write_indicator("#", true, false, false)?;
            self.writer.write_str(&text)?;
            self.whitespace = false;
            self.indention = false;
        }
        Ok(())
    }

    fn write_indent(&mut self) -> Result<(), EmitterError> {
        let indent = self.indent.unwrap_or(0);
        if !self.indention
            || self.writer.column > indent
            || self.writer.column == indent && !self.whitespace
        {
            self.writer.put_break()?;
        }
        while self.writer.column < indent {
            self.writer.put(' ')?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> Result<(), EmitterError> {
        if need_whitespace && !self.whitespace {
            self.writer.put(' ')?;
        }
        self.writer.write_str(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        Ok(())
    }

    fn write_anchor(&mut self, value: &str) -> Result<(), EmitterError> {
        self.writer.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_handle(&mut self, value: &str) -> Result<(), EmitterError> {
        if !self.whitespace {
            self.writer.put(' ')?;
        }
        self.writer.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_content(&mut self, value: &str, need_whitespace: bool) -> Result<(), EmitterError> {
        if need_whitespace && !self.whitespace {
            self.writer.put(' ')?;
        }
        for ch in value.chars() {
            if is_alpha(ch)
                || matches!(
                    ch,
                    ';' | '/'
                        | '?'
                        | ':'
                        | '@'
                        | '&'
                        | '='
                        | '+'
                        | '$'
                        | ','
                        | '_'
                        | '.'
                        | '~'
                        | '*'
                        | '\''
                        | '('
                        | ')'
                        | '['
                        | ']'
                )
            {
                self.writer.put(ch)?;
                continue;
            }
            let mut encoded = [0u8; 4];
            for byte in ch.encode_utf8(&mut encoded).bytes() {
                self.writer.write_str(&format!("%{byte:02X}"))?;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_plain_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<(), EmitterError> {
        let mut spaces = false;
        let mut breaks = false;
        if !self.whitespace && (!value.is_empty() || self.flow_level > 0) {
            self.writer.put(' ')?;
        }

        let mut chars = value.chars().peekable();
        while let Some(ch) = chars.next() {
            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.writer.column > self.best_width
                    && !is_space(chars.peek().copied())
                {
                    self.write_indent()?;
                } else {
                    self.writer.put(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.writer.put_break()?;
                }
                self.writer.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.writer.put(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_single_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        let mut spaces = false;
        let mut breaks = false;
        self.write_indicator("'", true, false, false)?;
        let mut chars = value.chars().peekable();
        let mut first = true;
        while let Some(ch) = chars.next() {
            let next = chars.peek().copied();
            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.writer.column > self.best_width
                    && !first
                    && next.is_some()
                    && !is_space(next)
                {
                    self.write_indent()?;
                } else {
                    self.writer.put(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.writer.put_break()?;
                }
                self.writer.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                if ch == '\'' {
                    self.writer.put('\'')?;
                }
                self.writer.put(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
            first = false;
        }
        if breaks {
            self.write_indent()?;
        }
        self.write_indicator("'", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_double_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        let mut spaces = false;
        self.write_indicator("\"", true, false, false)?;
        let mut chars = value.chars().peekable();
        let mut first = true;
        while let Some(ch) = chars.next() {
            if !is_printable(ch)
                || !self.unicode && !is_ascii(ch)
                || is_bom(ch)
                || is_break(ch)
                || ch == '"'
                || ch == '\\'
            {
                self.writer.put('\\')?;
                match escape(ch) {
                    Some(short) => self.writer.put(short)?,
                    None => {
                        let code = u32::from(ch);
                        let escaped = if code <= 0xff {
                            format!("x{code:02X}")
                        } else if code <= 0xffff {
                            format!("u{code:04X}")
                        } else {
                            format!("U{code:08X}")
                        };
                        self.writer.write_str(&escaped)?;
                    }
                }
                spaces = false;
            } else if is_space(ch) {
                let next = chars.peek().copied();
                if allow_breaks
                    && !spaces
                    && self.writer.column > self.best_width
                    && !first
                    && next.is_some()
                {
                    self.write_indent()?;
                    if is_space(next) {
                        self.writer.put('\\')?;
                    }
                } else {
                    self.writer.put(ch)?;
                }
                spaces = true;
            } else {
                self.writer.put(ch)?;
                spaces = false;
            }
            first = false;
        }
        self.write_indicator("\"", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_block_scalar_hints(&mut self, value: &str) -> Result<(), EmitterError> {
        let first = value.chars().next();
        if is_space(first) || is_break(first) {
            let hint = self.best_indent.to_string();
            self.write_indicator(&hint, false, false, false)?;
        }
        self.open_ended = OpenEnded::No;

        let mut tail = value.chars().rev();
        let last = tail.next();
        let chomp = if value.is_empty() || !is_break(last) {
            Some("-")
        } else if is_breakz(tail.next()) {
            self.open_ended = OpenEnded::Required;
            Some("+")
        } else {
            None
        };
        if let Some(chomp) = chomp {
            self.write_indicator(chomp, false, false, false)?;
        }
        Ok(())
    }

    fn write_literal_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        let mut breaks = true;
        self.write_indicator("|", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.flush_comments()?;
        self.writer.put_break()?;
        self.indention = true;
        self.whitespace = true;
        for ch in value.chars() {
            if is_break(ch) {
                self.writer.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.writer.put(ch)?;
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }

    fn write_folded_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        let mut breaks = true;
        let mut leading_spaces = true;
        self.write_indicator(">", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.flush_comments()?;
        self.writer.put_break()?;
        self.indention = true;
        self.whitespace = true;

        let mut chars = value.chars().peekable();
        while let Some(ch) = chars.next() {
            if is_break(ch) {
                if !breaks && !leading_spaces && ch == '\n' {
                    let mut rest = chars.clone();
                    let mut after = rest.next();
                    while is_break(after) {
                        after = rest.next();
                    }
                    if !is_blankz(after) {
                        self.writer.put_break()?;
                    }
                }
                self.writer.write_break(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = is_blank(ch);
                }
                if !breaks
                    && is_space(ch)
                    && !is_space(chars.peek().copied())
                    && self.writer.column > self.best_width
                {
                    self.write_indent()?;
                } else {
                    self.writer.put(ch)?;
                }
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }
}

/// The one-letter escape for `ch` in a double-quoted scalar, if it has one.
fn escape(ch: char) -> Option<char> {
    Some(match ch {
        '\0' => '0',
        '\x07' => 'a',
        '\x08' => 'b',
        '\t' => 't',
        '\n' => 'n',
        '\x0b' => 'v',
        '\x0c' => 'f',
        '\r' => 'r',
        '\x1b' => 'e',
        '"' => '"',
        '\\' => '\\',
        '\u{85}' => 'N',
        '\u{a0}' => '_',
        '\u{2028}' => 'L',
        '\u{2029}' => 'P',
        _ => return None,
    })
}

fn analyze_version_directive(version: VersionDirective) -> Result<(), EmitterError> {
    if version.major != 1 {
        return problem(format!("incompatible %YAML directive {version}"));
    }
    Ok(())
}

fn analyze_tag_directive(directive: &TagDirective) -> Result<(), EmitterError> {
    let handle = directive.handle.as_str();
    if handle.is_empty() {
        return problem("tag handle must not be empty");
    }
    if !handle.starts_with('!') {
        return problem("tag handle must start with '!'");
    }
    if !handle.ends_with('!') {
        return problem("tag handle must end with '!'");
    }
    if handle.len() > 2 && !handle[1..handle.len() - 1].chars().all(is_alpha) {
        return problem("tag handle must contain alphanumerical characters only");
    }
    if directive.prefix.is_empty() {
        return problem("tag prefix must not be empty");
    }
    Ok(())
}

fn analyze_anchor(anchor: &Anchor, alias: bool) -> Result<AnchorAnalysis<'_>, EmitterError> {
    if let Err(error) = Anchor::validate(anchor.as_str()) {
        let what = if alias { "alias" } else { "anchor" };
        return problem(format!("invalid {what}: {error}"));
    }
    Ok(AnchorAnalysis {
        anchor: anchor.as_str(),
        alias,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NULL_TAG, STR_TAG};
    use pretty_assertions::assert_eq;

    fn emit(settings: DumpSettings, events: Vec<Event>) -> Result<String, EmitterError> {
        let mut output = Vec::new();
        let mut emitter = Emitter::with_settings(settings);
        emitter.set_output(&mut output);
        emitter.emit(Event::stream_start(Encoding::Utf8))?;
        emitter.emit(Event::document_start(None, &[], true))?;
        for event in events {
            emitter.emit(event)?;
        }
        emitter.emit(Event::document_end(true))?;
        emitter.emit(Event::stream_end())?;
        drop(emitter);
        Ok(String::from_utf8(output).unwrap())
    }

    fn plain(value: &str) -> Event {
        Event::scalar(None, None, value, true, true, ScalarStyle::Any)
    }

    #[test]
    fn empty_root_scalar() {
        let events = vec![Event::scalar(None, None, "", true, false, ScalarStyle::Plain)];
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), "''\n");
    }

    #[test]
    fn block_and_flow_collections() {
        let events = vec![
            Event::mapping_start(None, None, true, MappingStyle::Block),
            plain("a"),
            Event::sequence_start(None, None, true, SequenceStyle::Flow),
            plain("1"),
            plain("2"),
            Event::sequence_end(),
            plain("b"),
            Event::sequence_start(None, None, true, SequenceStyle::Block),
            plain("x"),
            Event::sequence_end(),
            plain("c"),
            Event::mapping_start(None, None, true, MappingStyle::Any),
            Event::mapping_end(),
            Event::mapping_end(),
        ];
        assert_eq!(
            emit(DumpSettings::default(), events).unwrap(),
            "a: [1, 2]\nb:\n- x\nc: {}\n"
        );
    }

    #[test]
    fn tag_shown_when_style_cannot_imply_it() {
        let events = vec![Event::scalar(
            None,
            Some(NULL_TAG),
            "",
            true,
            false,
            ScalarStyle::Plain,
        )];
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), "!!null ''\n");

        let events = vec![Event::scalar(
            None,
            Some(STR_TAG),
            "123",
            false,
            true,
            ScalarStyle::Any,
        )];
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), "'123'\n");

        let events = vec![Event::scalar(
            None,
            Some("!custom"),
            "x",
            false,
            false,
            ScalarStyle::Any,
        )];
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), "!custom x\n");
    }

    #[test]
    fn escapes_without_unicode() {
        let events = vec![Event::scalar(
            None,
            None,
            "\u{e9}\u{263a}\u{1f600}\t",
            true,
            true,
            ScalarStyle::DoubleQuoted,
        )];
        let settings = DumpSettings::default().with_unicode(false);
        assert_eq!(
            emit(settings, events).unwrap(),
            "\"\\xE9\\u263A\\U0001F600\\t\"\n"
        );
    }

    #[test]
    fn unicode_passes_through() {
        let events = vec![plain("caf\u{e9}")];
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), "caf\u{e9}\n");
    }

    #[test]
    fn literal_and_folded() {
        let events = vec![
            Event::mapping_start(None, None, true, MappingStyle::Block),
            plain("k"),
            Event::scalar(None, None, "a\nb\n", true, true, ScalarStyle::Literal),
            plain("s"),
            Event::scalar(None, None, "x\n\n", true, true, ScalarStyle::Literal),
            Event::mapping_end(),
        ];
        assert_eq!(
            emit(DumpSettings::default(), events).unwrap(),
            "k: |\n  a\n  b\ns: |+\n  x\n\n...\n"
        );

        let events = vec![Event::scalar(None, None, "one two", true, true, ScalarStyle::Folded)];
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), ">-\n  one two\n");
    }

    #[test]
    fn anchors_and_aliases() {
        let anchor = Anchor::new("id001").unwrap();
        let events = vec![
            Event::sequence_start(None, None, true, SequenceStyle::Flow),
            Event::scalar(Some(anchor.clone()), None, "a", true, true, ScalarStyle::Any),
            Event::alias(anchor),
            Event::sequence_end(),
        ];
        assert_eq!(
            emit(DumpSettings::default(), events).unwrap(),
            "[&id001 a, *id001]\n"
        );
    }

    #[test]
    fn documents_and_directives() {
        let mut output = Vec::new();
        let mut emitter = Emitter::new();
        emitter.set_output(&mut output);
        let events = [
            Event::stream_start(Encoding::Any),
            Event::document_start(None, &[], true),
            plain("a"),
            Event::document_end(true),
            Event::document_start(
                Some(VersionDirective::V1_2),
                &[TagDirective::new("!e!", "tag:example.com,2000:")],
                true,
            ),
            Event::scalar(None, Some("tag:example.com,2000:x"), "b", false, false, ScalarStyle::Any),
            Event::document_end(false),
            Event::stream_end(),
        ];
        for event in events {
            emitter.emit(event).unwrap();
        }
        drop(emitter);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "a\n...\n%YAML 1.2\n%TAG !e! tag:example.com,2000:\n--- !e!x b\n...\n"
        );
    }

    #[test]
    fn comments() {
        let events = vec![
            Event::comment(" head", CommentType::Block),
            Event::mapping_start(None, None, true, MappingStyle::Block),
            plain("key"),
            plain("value"),
            Event::comment(" tail", CommentType::InLine),
            Event::comment(" end", CommentType::Block),
            Event::mapping_end(),
        ];
        let settings = DumpSettings::default().with_dump_comments(true);
        assert_eq!(
            emit(settings, events.clone()).unwrap(),
            "# head\nkey: value # tail\n# end\n"
        );
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), "key: value\n");
    }

    #[test]
    fn indicator_indent() {
        let events = vec![
            Event::mapping_start(None, None, true, MappingStyle::Block),
            plain("key"),
            Event::sequence_start(None, None, true, SequenceStyle::Block),
            plain("a"),
            plain("b"),
            Event::sequence_end(),
            Event::mapping_end(),
        ];
        let settings = DumpSettings::default()
            .with_indicator_indent(2)
            .with_indent_with_indicator(true);
        assert_eq!(emit(settings, events).unwrap(), "key:\n  - a\n  - b\n");
    }

    #[test]
    fn multi_line_flow() {
        let events = vec![
            Event::sequence_start(None, None, true, SequenceStyle::Flow),
            plain("a"),
            plain("b"),
            Event::sequence_end(),
        ];
        let settings = DumpSettings::default().with_multi_line_flow(true);
        assert_eq!(emit(settings, events).unwrap(), "[\n  a,\n  b\n]\n");
    }

    #[test]
    fn long_plain_scalar_wraps() {
        let events = vec![plain("aaaa bbbb cccc dddd eeee ffff gggg")];
        let settings = DumpSettings::default().with_width(20);
        assert_eq!(
            emit(settings.clone(), events.clone()).unwrap(),
            "aaaa bbbb cccc dddd eeee\n  ffff gggg\n"
        );
        let settings = settings.with_split_lines(false);
        assert_eq!(
            emit(settings, events).unwrap(),
            "aaaa bbbb cccc dddd eeee ffff gggg\n"
        );
    }

    #[test]
    fn line_breaks() {
        let events = vec![
            Event::sequence_start(None, None, true, SequenceStyle::Block),
            plain("a"),
            plain("b"),
            Event::sequence_end(),
        ];
        let settings = DumpSettings::default().with_line_break(Break::CrLn);
        assert_eq!(emit(settings, events).unwrap(), "- a\r\n- b\r\n");
    }

    #[test]
    fn non_printable_fail() {
        let events = vec![plain("bell\u{7}")];
        let settings = DumpSettings::default().with_non_printable_style(NonPrintableStyle::Fail);
        let error = emit(settings, events.clone()).unwrap_err();
        assert_eq!(error.to_string(), "scalar contains non-printable characters");
        assert_eq!(emit(DumpSettings::default(), events).unwrap(), "\"bell\\a\"\n");
    }

    #[test]
    fn nothing_after_stream_end() {
        let mut output = Vec::new();
        let mut emitter = Emitter::new();
        emitter.set_output(&mut output);
        emitter.emit(Event::stream_start(Encoding::Utf8)).unwrap();
        emitter.emit(Event::stream_end()).unwrap();
        let error = emitter.emit(plain("x")).unwrap_err();
        assert_eq!(error.to_string(), "expected nothing after STREAM-END");
    }
}
