use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::chars::{
    as_hex, is_alpha, is_blank, is_blankz, is_bom, is_break, is_breakz, is_digit,
    is_flow_indicator, is_hex, is_space, is_tab, is_uri_char,
};
use crate::{
    Anchor, CommentType, Encoding, LoadSettings, Mark, ScalarStyle, ScannerError, StreamReader,
    Token, TokenData, TokenKind,
};

const MAX_NUMBER_LENGTH: usize = 9;

/// A position where a plain or quoted scalar could still turn out to be an
/// implicit mapping key.
#[derive(Copy, Clone, Default, Debug)]
struct SimpleKey {
    possible: bool,
    required: bool,
    token_number: usize,
    mark: Mark,
}

/// Turns a character stream into tokens.
///
/// Tokens are produced on demand. The scanner keeps a queue because a `:`
/// may retroactively turn an already scanned scalar into a mapping key, which
/// inserts KEY and BLOCK-MAPPING-START tokens in front of it.
pub struct Scanner<'r> {
    reader: StreamReader<'r>,
    max_simple_key_length: usize,
    parse_comments: bool,
    tokens: VecDeque<Token>,
    comments: VecDeque<Token>,
    tokens_parsed: usize,
    token_available: bool,
    stream_start_produced: bool,
    stream_end_produced: bool,
    /// Column of the innermost block collection, -1 outside of any.
    indent: isize,
    indents: Vec<isize>,
    simple_keys: Vec<SimpleKey>,
    simple_key_allowed: bool,
    flow_level: usize,
    /// Nothing but whitespace has been seen on the current line.
    line_start: bool,
}

impl<'r> Default for Scanner<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Scanner<'r> {
    pub fn new() -> Self {
        Self::with_settings(&LoadSettings::default())
    }

    pub fn with_settings(settings: &LoadSettings) -> Self {
        Self {
            reader: StreamReader::new(settings),
            max_simple_key_length: settings.max_simple_key_length,
            parse_comments: settings.parse_comments,
            tokens: VecDeque::with_capacity(16),
            comments: VecDeque::new(),
            tokens_parsed: 0,
            token_available: false,
            stream_start_produced: false,
            stream_end_produced: false,
            indent: -1,
            indents: Vec::with_capacity(16),
            simple_keys: Vec::with_capacity(16),
            simple_key_allowed: false,
            flow_level: 0,
            line_start: true,
        }
    }

    /// Set a string input.
    pub fn set_input_string(&mut self, input: &'r str) {
        self.reader.set_input_string(input);
    }

    /// Set a byte input; the encoding is detected from its BOM.
    pub fn set_input_bytes(&mut self, input: &'r [u8]) {
        self.reader.set_input_bytes(input);
    }

    /// Set a buffered input.
    pub fn set_input(&mut self, input: &'r mut dyn std::io::BufRead) {
        self.reader.set_input(input);
    }

    /// Set an unbuffered input.
    pub fn set_input_reader<R: std::io::Read + 'r>(&mut self, input: R) {
        self.reader.set_input_reader(input);
    }

    /// Set the source encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.reader.set_encoding(encoding);
    }

    /// The position of the next unread character.
    pub fn mark(&self) -> Mark {
        self.reader.mark()
    }

    pub(crate) fn reader(&self) -> &StreamReader<'r> {
        &self.reader
    }

    /// Whether STREAM-END has not been handed out yet.
    pub fn has_next(&self) -> bool {
        !self.stream_end_produced
    }

    /// Forget the tokens of the current document and continue at the next
    /// `---` or `...` line, or at the end of the stream.
    pub(crate) fn skip_to_next_document(&mut self) -> Result<(), ScannerError> {
        if !self.stream_start_produced || self.stream_end_produced {
            return Ok(());
        }
        self.tokens.clear();
        self.comments.clear();
        self.token_available = false;
        self.indent = -1;
        self.indents.clear();
        self.simple_keys.clear();
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.flow_level = 0;
        self.line_start = true;
        self.reader.skip_to_document_boundary()?;
        tracing::debug!(mark = %self.reader.mark(), "skipped to the next document");
        Ok(())
    }

    /// Scan the input stream and produce the next token.
    ///
    /// The first token is STREAM-START and the last one STREAM-END; once the
    /// stream has ended every further call returns STREAM-END again. Comment
    /// tokens, when enabled, are interleaved at their position in the input.
    pub fn next_token(&mut self) -> Result<Token, ScannerError> {
        if self.stream_end_produced {
            return Ok(self.stream_end_token());
        }
        self.fetch_more_tokens()?;
        if let Some(comment) = self.take_leading_comment() {
            return Ok(comment);
        }
        Ok(match self.pop_token() {
            Some(token) => token,
            None => self.stream_end_token(),
        })
    }

    /// Look at the next token without consuming it. Returns `None` after
    /// STREAM-END has been consumed.
    pub fn peek_token(&mut self) -> Result<Option<&Token>, ScannerError> {
        if !self.stream_end_produced {
            self.fetch_more_tokens()?;
        }
        let token_index = self.tokens.front().map_or(usize::MAX, |t| t.start_mark.index);
        if self
            .comments
            .front()
            .is_some_and(|comment| comment.start_mark.index < token_index)
        {
            return Ok(self.comments.front());
        }
        Ok(self.tokens.front())
    }

    /// Whether the next token is one of `kinds`. With no kinds, whether any
    /// token is left.
    pub fn check_token(&mut self, kinds: &[TokenKind]) -> Result<bool, ScannerError> {
        Ok(match self.peek_token()? {
            Some(token) => kinds.is_empty() || kinds.contains(&token.data.kind()),
            None => false,
        })
    }

    /// The next token that is not a comment, for the parser.
    pub(crate) fn peek_main(&mut self) -> Result<Option<&mut Token>, ScannerError> {
        if !self.stream_end_produced {
            self.fetch_more_tokens()?;
        }
        Ok(self.tokens.front_mut())
    }

    pub(crate) fn skip_main(&mut self) -> Option<Token> {
        self.pop_token()
    }

    /// Hand out the oldest pending comment if it starts before `index`.
    pub(crate) fn take_comment_before(&mut self, index: usize) -> Option<Token> {
        if self.comments.front()?.start_mark.index < index {
            self.comments.pop_front()
        } else {
            None
        }
    }

    fn take_leading_comment(&mut self) -> Option<Token> {
        let token_index = self.tokens.front().map_or(usize::MAX, |t| t.start_mark.index);
        self.take_comment_before(token_index)
    }

    fn pop_token(&mut self) -> Option<Token> {
        let token = self.tokens.pop_front()?;
        self.token_available = false;
        self.tokens_parsed += 1;
        if let TokenData::StreamEnd = token.data {
            self.stream_end_produced = true;
        }
        tracing::trace!(kind = ?token.data.kind(), mark = %token.start_mark, "token");
        Some(token)
    }

    fn stream_end_token(&self) -> Token {
        let mark = self.reader.mark();
        Token {
            data: TokenData::StreamEnd,
            start_mark: mark,
            end_mark: mark,
        }
    }

    fn error(&self, context: &str, context_mark: Mark, problem: impl Into<String>) -> ScannerError {
        ScannerError::Problem(self.reader.marked_error(
            Some((context, context_mark)),
            problem,
            self.reader.mark(),
        ))
    }

    fn error_without_context(&self, problem: &str) -> ScannerError {
        ScannerError::Problem(self.reader.marked_error(None, problem, self.reader.mark()))
    }

    fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        if self.token_available || self.stream_end_produced {
            return Ok(());
        }
        loop {
            let need_more_tokens = if self.tokens.is_empty() {
                true
            } else {
                self.stale_simple_keys()?;
                let tokens_parsed = self.tokens_parsed;
                self.simple_keys
                    .iter()
                    .any(|key| key.possible && key.token_number == tokens_parsed)
            };
            if !need_more_tokens {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        self.reader.cache(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.reader.mark().column as isize);
        self.reader.cache(4)?;
        let Some(ch) = self.reader.peek(0) else {
            return self.fetch_stream_end();
        };
        self.line_start = false;
        let next = self.reader.peek(1);
        let column = self.reader.mark().column;

        if column == 0 && ch == '%' {
            return self.fetch_directive();
        }
        if column == 0 && self.at_document_indicator('-') {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if column == 0 && self.at_document_indicator('.') {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        match ch {
            '[' => self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blankz(next) => self.fetch_block_entry(),
            '?' if self.flow_level > 0 || is_blankz(next) => self.fetch_key(),
            ':' if self.flow_level > 0 || is_blankz(next) => self.fetch_value(),
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(true),
            '"' => self.fetch_flow_scalar(false),
            _ if self.starts_plain_scalar(ch, next) => self.fetch_plain_scalar(),
            _ => Err(self.error(
                "while scanning for the next token",
                self.reader.mark(),
                "found character that cannot start any token",
            )),
        }
    }

    fn starts_plain_scalar(&self, ch: char, next: Option<char>) -> bool {
        let indicator = matches!(
            ch,
            '-' | '?'
                | ':'
                | ','
                | '['
                | ']'
                | '{'
                | '}'
                | '#'
                | '&'
                | '*'
                | '!'
                | '|'
                | '>'
                | '\''
                | '"'
                | '%'
                | '@'
                | '`'
        );
        !(is_blankz(ch) || indicator)
            || (ch == '-' && !is_blank(next))
            || (self.flow_level == 0 && matches!(ch, '?' | ':') && !is_blankz(next))
    }

    /// `---` or `...` followed by a blank. The caller checks the column.
    fn at_document_indicator(&self, ch: char) -> bool {
        self.reader.check(ch)
            && self.reader.check_at(ch, 1)
            && self.reader.check_at(ch, 2)
            && is_blankz(self.reader.peek(3))
    }

    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        let mark = self.reader.mark();
        let max_length = self.max_simple_key_length;
        let mut stale_required = None;
        for key in &mut self.simple_keys {
            if key.possible
                && (key.mark.line < mark.line || key.mark.index + max_length < mark.index)
            {
                if key.required {
                    stale_required = Some(key.mark);
                    break;
                }
                key.possible = false;
            }
        }
        match stale_required {
            Some(key_mark) => Err(self.error(
                "while scanning a simple key",
                key_mark,
                "could not find expected ':'",
            )),
            None => Ok(()),
        }
    }

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        if self.simple_key_allowed {
            let mark = self.reader.mark();
            let key = SimpleKey {
                possible: true,
                required: self.flow_level == 0 && self.indent == mark.column as isize,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark,
            };
            self.remove_simple_key()?;
            if let Some(last) = self.simple_keys.last_mut() {
                *last = key;
            }
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        if let Some(key) = self.simple_keys.last_mut() {
            if key.possible && key.required {
                let key_mark = key.mark;
                return Err(self.error(
                    "while scanning a simple key",
                    key_mark,
                    "could not find expected ':'",
                ));
            }
            key.possible = false;
        }
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::default());
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    /// Open a block collection at `column` if it is deeper than the current
    /// one. `number` places the start token in front of an already queued
    /// token.
    fn roll_indent(&mut self, column: isize, number: Option<usize>, data: TokenData, mark: Mark) {
        if self.flow_level > 0 || self.indent >= column {
            return;
        }
        self.indents.push(self.indent);
        self.indent = column;
        let token = Token {
            data,
            start_mark: mark,
            end_mark: mark,
        };
        match number {
            Some(number) => self.tokens.insert(number - self.tokens_parsed, token),
            None => self.tokens.push_back(token),
        }
    }

    /// Close every block collection deeper than `column`.
    fn unroll_indent(&mut self, column: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.tokens.push_back(Token {
                data: TokenData::BlockEnd,
                start_mark: mark,
                end_mark: mark,
            });
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    fn fetch_stream_start(&mut self) {
        self.indent = -1;
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        let mark = self.reader.mark();
        self.tokens.push_back(Token {
            data: TokenData::StreamStart {
                encoding: self.reader.encoding(),
            },
            start_mark: mark,
            end_mark: mark,
        });
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        self.tokens.push_back(self.stream_end_token());
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        if let Some(token) = self.scan_directive()? {
            self.tokens.push_back(token);
        }
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark();
        self.reader.forward(3);
        self.reader.reset_document_index();
        self.push_token(data, start_mark);
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        self.push_indicator(data);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        self.push_indicator(data);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        self.push_indicator(TokenData::FlowEntry);
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(self.error_without_context(
                    "block sequence entries are not allowed in this context",
                ));
            }
            let mark = self.reader.mark();
            self.roll_indent(
                mark.column as isize,
                None,
                TokenData::BlockSequenceStart,
                mark,
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        self.push_indicator(TokenData::BlockEntry);
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(self.error_without_context(
                    "mapping keys are not allowed in this context",
                ));
            }
            let mark = self.reader.mark();
            self.roll_indent(mark.column as isize, None, TokenData::BlockMappingStart, mark);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        self.push_indicator(TokenData::Key);
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let key = self.simple_keys.last().copied().unwrap_or_default();
        if key.possible {
            self.tokens.insert(
                key.token_number - self.tokens_parsed,
                Token {
                    data: TokenData::Key,
                    start_mark: key.mark,
                    end_mark: key.mark,
                },
            );
            self.roll_indent(
                key.mark.column as isize,
                Some(key.token_number),
                TokenData::BlockMappingStart,
                key.mark,
            );
            if let Some(last) = self.simple_keys.last_mut() {
                last.possible = false;
            }
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(self.error_without_context(
                        "mapping values are not allowed in this context",
                    ));
                }
                let mark = self.reader.mark();
                self.roll_indent(mark.column as isize, None, TokenData::BlockMappingStart, mark);
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        self.push_indicator(TokenData::Value);
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        self.line_start = true;
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let (token, crossed_line) = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        if crossed_line {
            self.simple_key_allowed = true;
            self.line_start = true;
        }
        Ok(())
    }

    /// Consume a one-character indicator and queue its token.
    fn push_indicator(&mut self, data: TokenData) {
        let start_mark = self.reader.mark();
        self.reader.skip();
        self.push_token(data, start_mark);
    }

    fn push_token(&mut self, data: TokenData, start_mark: Mark) {
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark: self.reader.mark(),
        });
    }

    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            self.reader.cache(1)?;
            if self.reader.mark().column == 0 && is_bom(self.reader.peek(0)) {
                self.reader.skip();
                self.reader.cache(1)?;
            }
            let mut indentation_tab = None;
            while is_blank(self.reader.peek(0)) {
                if self.line_start && indentation_tab.is_none() && is_tab(self.reader.peek(0)) {
                    indentation_tab = Some(self.reader.mark());
                }
                self.reader.skip();
                self.reader.cache(1)?;
            }
            if self.reader.check('#') {
                self.scan_comment()?;
            }
            if is_break(self.reader.peek(0)) {
                self.reader.cache(2)?;
                self.reader.skip_line();
                self.line_start = true;
                if self.flow_level == 0 {
                    self.simple_key_allowed = true;
                }
                continue;
            }
            if let Some(tab_mark) = indentation_tab {
                if !self.reader.is_eof() {
                    return Err(ScannerError::Problem(self.reader.marked_error(
                        Some(("while scanning for the next token", tab_mark)),
                        "found character '\t(TAB)' that cannot start any token",
                        tab_mark,
                    )));
                }
            }
            return Ok(());
        }
    }

    /// Consume a `#` comment up to the line break, queueing it when comments
    /// are kept.
    fn scan_comment(&mut self) -> Result<(), ScannerError> {
        let start_mark = self.reader.mark();
        let comment_type = if self.line_start {
            CommentType::Block
        } else {
            CommentType::InLine
        };
        self.reader.skip();
        let mut value = String::new();
        self.reader.cache(1)?;
        while !is_breakz(self.reader.peek(0)) {
            self.reader.read_char(&mut value);
            self.reader.cache(1)?;
        }
        if self.parse_comments {
            self.comments.push_back(Token {
                data: TokenData::Comment {
                    value,
                    comment_type,
                },
                start_mark,
                end_mark: self.reader.mark(),
            });
        }
        Ok(())
    }

    fn skip_blanks(&mut self) -> Result<(), ScannerError> {
        self.reader.cache(1)?;
        while is_blank(self.reader.peek(0)) {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        Ok(())
    }

    fn scan_directive(&mut self) -> Result<Option<Token>, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        let name = self.scan_directive_name(start_mark)?;
        let data = match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_version_directive_value(start_mark)?;
                Some(TokenData::VersionDirective { major, minor })
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
                Some(TokenData::TagDirective { handle, prefix })
            }
            _ => {
                tracing::warn!(%name, mark = %start_mark, "ignoring unknown directive");
                self.reader.cache(1)?;
                while !is_breakz(self.reader.peek(0)) {
                    self.reader.skip();
                    self.reader.cache(1)?;
                }
                None
            }
        };
        let end_mark = self.reader.mark();

        self.skip_blanks()?;
        if self.reader.check('#') {
            self.scan_comment()?;
        }
        if !is_breakz(self.reader.peek(0)) {
            return Err(self.error(
                "while scanning a directive",
                start_mark,
                "did not find expected comment or line break",
            ));
        }
        if is_break(self.reader.peek(0)) {
            self.reader.cache(2)?;
            self.reader.skip_line();
            self.line_start = true;
        }
        Ok(data.map(|data| Token {
            data,
            start_mark,
            end_mark,
        }))
    }

    fn scan_directive_name(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        let mut name = String::new();
        self.reader.cache(1)?;
        while is_alpha(self.reader.peek(0)) {
            self.reader.read_char(&mut name);
            self.reader.cache(1)?;
        }
        if name.is_empty() {
            Err(self.error(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
            ))
        } else if !is_blankz(self.reader.peek(0)) {
            Err(self.error(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
            ))
        } else {
            Ok(name)
        }
    }

    fn scan_version_directive_value(&mut self, start_mark: Mark) -> Result<(u32, u32), ScannerError> {
        self.skip_blanks()?;
        let major = self.scan_version_directive_number(start_mark)?;
        if !self.reader.check('.') {
            return Err(self.error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
            ));
        }
        self.reader.skip();
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Mark) -> Result<u32, ScannerError> {
        let mut value = 0u32;
        let mut length = 0;
        self.reader.cache(1)?;
        while let Some(digit) = self.reader.peek(0).and_then(|ch| ch.to_digit(10)) {
            length += 1;
            if length > MAX_NUMBER_LENGTH {
                return Err(self.error(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                ));
            }
            value = value * 10 + digit;
            self.reader.skip();
            self.reader.cache(1)?;
        }
        if length == 0 {
            return Err(self.error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
            ));
        }
        Ok(value)
    }

    /// Returns `(handle, prefix)`.
    fn scan_tag_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(String, String), ScannerError> {
        self.skip_blanks()?;
        let handle = self.scan_tag_handle(true, start_mark)?;
        self.reader.cache(1)?;
        if !is_blank(self.reader.peek(0)) {
            return Err(self.error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace",
            ));
        }
        self.skip_blanks()?;
        let prefix = self.scan_tag_uri(true, true, None, start_mark)?;
        self.reader.cache(1)?;
        if !is_blankz(self.reader.peek(0)) {
            return Err(self.error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace or line break",
            ));
        }
        Ok((handle, prefix))
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        self.reader.cache(1)?;
        let mut name = String::new();
        while !(is_blankz(self.reader.peek(0)) || is_flow_indicator(self.reader.peek(0))) {
            self.reader.read_char(&mut name);
            self.reader.cache(1)?;
        }
        let end_mark = self.reader.mark();
        let context = if alias {
            "while scanning an alias"
        } else {
            "while scanning an anchor"
        };
        let value = Anchor::new(name).map_err(|err| self.error(context, start_mark, err.to_string()))?;
        Ok(Token {
            data: if alias {
                TokenData::Alias { value }
            } else {
                TokenData::Anchor { value }
            },
            start_mark,
            end_mark,
        })
    }

    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.cache(2)?;

        let (handle, suffix) = if self.reader.check_at('<', 1) {
            self.reader.forward(2);
            let suffix = self.scan_tag_uri(true, false, None, start_mark)?;
            if !self.reader.check('>') {
                return Err(self.error(
                    "while scanning a tag",
                    start_mark,
                    "did not find the expected '>'",
                ));
            }
            self.reader.skip();
            (String::new(), suffix)
        } else {
            let handle = self.scan_tag_handle(false, start_mark)?;
            if handle.len() > 1 && handle.starts_with('!') && handle.ends_with('!') {
                let suffix = self.scan_tag_uri(false, false, None, start_mark)?;
                (handle, suffix)
            } else {
                // `!suffix` or the non-specific `!`
                let suffix = self.scan_tag_uri(false, false, Some(&handle), start_mark)?;
                if suffix.is_empty() {
                    (String::new(), String::from("!"))
                } else {
                    (String::from("!"), suffix)
                }
            }
        };

        self.reader.cache(1)?;
        let next = self.reader.peek(0);
        if !(is_blankz(next) || (self.flow_level > 0 && is_flow_indicator(next))) {
            return Err(self.error(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
            ));
        }
        Ok(Token {
            data: TokenData::Tag { handle, suffix },
            start_mark,
            end_mark: self.reader.mark(),
        })
    }

    fn scan_tag_handle(&mut self, directive: bool, start_mark: Mark) -> Result<String, ScannerError> {
        let context = if directive {
            "while scanning a tag directive"
        } else {
            "while scanning a tag"
        };
        self.reader.cache(1)?;
        if !self.reader.check('!') {
            return Err(self.error(context, start_mark, "did not find expected '!'"));
        }
        let mut handle = String::new();
        self.reader.read_char(&mut handle);
        self.reader.cache(1)?;
        while is_alpha(self.reader.peek(0)) {
            self.reader.read_char(&mut handle);
            self.reader.cache(1)?;
        }
        if self.reader.check('!') {
            self.reader.read_char(&mut handle);
        } else if directive && handle != "!" {
            return Err(self.error(context, start_mark, "did not find expected '!'"));
        }
        Ok(handle)
    }

    /// Scan the URI part of a tag. `head` is a handle-like prefix already
    /// consumed that turned out to belong to the suffix.
    fn scan_tag_uri(
        &mut self,
        verbatim: bool,
        directive: bool,
        head: Option<&str>,
        start_mark: Mark,
    ) -> Result<String, ScannerError> {
        let head = head.unwrap_or("");
        let mut length = head.len();
        let mut uri = head.get(1..).map(String::from).unwrap_or_default();
        self.reader.cache(1)?;
        while is_uri_char(self.reader.peek(0), verbatim) {
            if self.reader.check('%') {
                self.scan_uri_escapes(directive, start_mark, &mut uri)?;
            } else {
                self.reader.read_char(&mut uri);
            }
            length += 1;
            self.reader.cache(1)?;
        }
        if length == 0 {
            return Err(self.error(
                tag_context(directive),
                start_mark,
                "did not find expected tag URI",
            ));
        }
        Ok(uri)
    }

    fn scan_uri_escapes(
        &mut self,
        directive: bool,
        start_mark: Mark,
        uri: &mut String,
    ) -> Result<(), ScannerError> {
        let mut octets = Vec::with_capacity(4);
        let mut width = 0;
        loop {
            self.reader.cache(3)?;
            if !(self.reader.check('%')
                && is_hex(self.reader.peek(1))
                && is_hex(self.reader.peek(2)))
            {
                return Err(self.error(
                    tag_context(directive),
                    start_mark,
                    "did not find URI escaped octet",
                ));
            }
            let octet = ((self.reader.peek(1).map_or(0, as_hex) << 4)
                | self.reader.peek(2).map_or(0, as_hex)) as u8;
            if width == 0 {
                width = match octet {
                    octet if octet & 0x80 == 0 => 1,
                    octet if octet & 0xE0 == 0xC0 => 2,
                    octet if octet & 0xF0 == 0xE0 => 3,
                    octet if octet & 0xF8 == 0xF0 => 4,
                    _ => {
                        return Err(self.error(
                            tag_context(directive),
                            start_mark,
                            "found an incorrect leading UTF-8 octet",
                        ))
                    }
                };
            } else if octet & 0xC0 != 0x80 {
                return Err(self.error(
                    tag_context(directive),
                    start_mark,
                    "found an incorrect trailing UTF-8 octet",
                ));
            }
            octets.push(octet);
            self.reader.forward(3);
            width -= 1;
            if width == 0 {
                break;
            }
        }
        match core::str::from_utf8(&octets) {
            Ok(decoded) => {
                uri.push_str(decoded);
                Ok(())
            }
            Err(_) => Err(self.error(
                tag_context(directive),
                start_mark,
                "found an invalid UTF-8 sequence",
            )),
        }
    }

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        self.reader.cache(1)?;

        // -1 strips the final break, +1 keeps trailing empty lines.
        let mut chomping = 0i8;
        let mut increment = 0isize;
        if self.reader.check('+') || self.reader.check('-') {
            chomping = if self.reader.check('+') { 1 } else { -1 };
            self.reader.skip();
            self.reader.cache(1)?;
            if is_digit(self.reader.peek(0)) {
                increment = self.scan_indentation_indicator(start_mark)?;
            }
        } else if is_digit(self.reader.peek(0)) {
            increment = self.scan_indentation_indicator(start_mark)?;
            self.reader.cache(1)?;
            if self.reader.check('+') || self.reader.check('-') {
                chomping = if self.reader.check('+') { 1 } else { -1 };
                self.reader.skip();
            }
        }

        self.skip_blanks()?;
        if self.reader.check('#') {
            self.scan_comment()?;
        }
        if !is_breakz(self.reader.peek(0)) {
            return Err(self.error(
                "while scanning a block scalar",
                start_mark,
                "did not find expected comment or line break",
            ));
        }
        if is_break(self.reader.peek(0)) {
            self.reader.cache(2)?;
            self.reader.skip_line();
        }

        let mut end_mark = self.reader.mark();
        let mut indent = 0isize;
        if increment != 0 {
            indent = if self.indent >= 0 {
                self.indent + increment
            } else {
                increment
            };
        }
        let mut value = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark, &mut end_mark)?;

        self.reader.cache(1)?;
        let mut leading_blank = false;
        while self.reader.mark().column as isize == indent && self.reader.peek(0).is_some() {
            let trailing_blank = is_blank(self.reader.peek(0));
            if !literal && leading_break.starts_with('\n') && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    value.push(' ');
                }
            } else {
                value.push_str(&leading_break);
            }
            leading_break.clear();
            value.push_str(&trailing_breaks);
            trailing_breaks.clear();

            leading_blank = is_blank(self.reader.peek(0));
            while !is_breakz(self.reader.peek(0)) {
                self.reader.read_char(&mut value);
                self.reader.cache(1)?;
            }
            self.reader.cache(2)?;
            self.reader.read_line(&mut leading_break);
            self.scan_block_scalar_breaks(
                &mut indent,
                &mut trailing_breaks,
                start_mark,
                &mut end_mark,
            )?;
        }

        if chomping != -1 {
            value.push_str(&leading_break);
        }
        if chomping == 1 {
            value.push_str(&trailing_breaks);
        }

        Ok(Token {
            data: TokenData::Scalar {
                value,
                style: if literal {
                    ScalarStyle::Literal
                } else {
                    ScalarStyle::Folded
                },
            },
            start_mark,
            end_mark,
        })
    }

    fn scan_indentation_indicator(&mut self, start_mark: Mark) -> Result<isize, ScannerError> {
        match self.reader.peek(0).and_then(|ch| ch.to_digit(10)) {
            Some(0) => Err(self.error(
                "while scanning a block scalar",
                start_mark,
                "found an indentation indicator equal to 0",
            )),
            Some(digit) => {
                self.reader.skip();
                Ok(digit as isize)
            }
            None => Ok(0),
        }
    }

    /// Consume empty lines and indentation in front of block scalar content,
    /// detecting the indentation when it is not given explicitly.
    fn scan_block_scalar_breaks(
        &mut self,
        indent: &mut isize,
        breaks: &mut String,
        start_mark: Mark,
        end_mark: &mut Mark,
    ) -> Result<(), ScannerError> {
        let mut max_indent = 0isize;
        *end_mark = self.reader.mark();
        loop {
            self.reader.cache(1)?;
            while (*indent == 0 || (self.reader.mark().column as isize) < *indent)
                && is_space(self.reader.peek(0))
            {
                self.reader.skip();
                self.reader.cache(1)?;
            }
            let column = self.reader.mark().column as isize;
            max_indent = max_indent.max(column);
            if (*indent == 0 || column < *indent) && is_tab(self.reader.peek(0)) {
                return Err(self.error(
                    "while scanning a block scalar",
                    start_mark,
                    "found a tab character where an indentation space is expected",
                ));
            }
            if !is_break(self.reader.peek(0)) {
                break;
            }
            self.reader.cache(2)?;
            self.reader.read_line(breaks);
            *end_mark = self.reader.mark();
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent + 1).max(1);
        }
        Ok(())
    }

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let quote = if single { '\'' } else { '"' };
        let start_mark = self.reader.mark();
        self.reader.skip();

        let mut value = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        loop {
            self.reader.cache(4)?;
            if self.reader.mark().column == 0
                && (self.at_document_indicator('-') || self.at_document_indicator('.'))
            {
                return Err(self.error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document indicator",
                ));
            }
            if self.reader.peek(0).is_none() {
                return Err(self.error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected end of stream",
                ));
            }

            self.reader.cache(2)?;
            let mut leading_blanks = false;
            while !is_blankz(self.reader.peek(0)) {
                if single && self.reader.check('\'') && self.reader.check_at('\'', 1) {
                    value.push('\'');
                    self.reader.forward(2);
                } else if self.reader.check(quote) {
                    break;
                } else if !single && self.reader.check('\\') && is_break(self.reader.peek(1)) {
                    // escaped line break: the break and the following
                    // indentation vanish
                    self.reader.cache(3)?;
                    self.reader.skip();
                    self.reader.skip_line();
                    leading_blanks = true;
                    break;
                } else if !single && self.reader.check('\\') {
                    self.scan_escape(start_mark, &mut value)?;
                } else {
                    self.reader.read_char(&mut value);
                }
                self.reader.cache(2)?;
            }

            self.reader.cache(1)?;
            if self.reader.check(quote) {
                break;
            }

            while is_blank(self.reader.peek(0)) || is_break(self.reader.peek(0)) {
                if is_blank(self.reader.peek(0)) {
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read_char(&mut whitespaces);
                    }
                } else {
                    self.reader.cache(2)?;
                    if leading_blanks {
                        self.reader.read_line(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_line(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.cache(1)?;
            }

            if leading_blanks {
                if leading_break.starts_with('\n') {
                    if trailing_breaks.is_empty() {
                        value.push(' ');
                    } else {
                        value.push_str(&trailing_breaks);
                    }
                } else {
                    value.push_str(&leading_break);
                    value.push_str(&trailing_breaks);
                }
                leading_break.clear();
                trailing_breaks.clear();
            } else {
                value.push_str(&whitespaces);
                whitespaces.clear();
            }
        }

        self.reader.skip();
        Ok(Token {
            data: TokenData::Scalar {
                value,
                style: if single {
                    ScalarStyle::SingleQuoted
                } else {
                    ScalarStyle::DoubleQuoted
                },
            },
            start_mark,
            end_mark: self.reader.mark(),
        })
    }

    /// Decode one `\` escape of a double-quoted scalar.
    fn scan_escape(&mut self, start_mark: Mark, value: &mut String) -> Result<(), ScannerError> {
        let code_length = match self.reader.peek(1) {
            Some('0') => {
                value.push('\0');
                0
            }
            Some('a') => {
                value.push('\x07');
                0
            }
            Some('b') => {
                value.push('\x08');
                0
            }
            Some('t' | '\t') => {
                value.push('\t');
                0
            }
            Some('n') => {
                value.push('\n');
                0
            }
            Some('v') => {
                value.push('\x0B');
                0
            }
            Some('f') => {
                value.push('\x0C');
                0
            }
            Some('r') => {
                value.push('\r');
                0
            }
            Some('e') => {
                value.push('\x1B');
                0
            }
            Some(' ') => {
                value.push(' ');
                0
            }
            Some('"') => {
                value.push('"');
                0
            }
            Some('/') => {
                value.push('/');
                0
            }
            Some('\\') => {
                value.push('\\');
                0
            }
            Some('N') => {
                value.push('\u{0085}');
                0
            }
            Some('_') => {
                value.push('\u{00A0}');
                0
            }
            Some('L') => {
                value.push('\u{2028}');
                0
            }
            Some('P') => {
                value.push('\u{2029}');
                0
            }
            Some('x') => 2,
            Some('u') => 4,
            Some('U') => 8,
            _ => {
                return Err(self.error(
                    "while parsing a quoted scalar",
                    start_mark,
                    "found unknown escape character",
                ))
            }
        };
        self.reader.forward(2);
        if code_length == 0 {
            return Ok(());
        }

        let mut code = self.scan_hex_digits(code_length, start_mark)?;
        if code_length == 4 && (0xD800..0xDC00).contains(&code) {
            // a UTF-16 surrogate pair written as two escapes
            self.reader.cache(6)?;
            if self.reader.check('\\')
                && self.reader.check_at('u', 1)
                && (2..6).all(|offset| is_hex(self.reader.peek(offset)))
            {
                let low = (2..6).fold(0u32, |acc, offset| {
                    (acc << 4) | self.reader.peek(offset).map_or(0, as_hex)
                });
                if (0xDC00..0xE000).contains(&low) {
                    code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    self.reader.forward(6);
                }
            }
        }
        match char::from_u32(code) {
            Some(ch) => {
                value.push(ch);
                Ok(())
            }
            None => Err(self.error(
                "while parsing a quoted scalar",
                start_mark,
                "found invalid Unicode character escape code",
            )),
        }
    }

    fn scan_hex_digits(&mut self, length: usize, start_mark: Mark) -> Result<u32, ScannerError> {
        self.reader.cache(length)?;
        let mut code = 0u32;
        for offset in 0..length {
            match self.reader.peek(offset) {
                Some(ch) if is_hex(ch) => code = (code << 4) | as_hex(ch),
                _ => {
                    return Err(self.error(
                        "while parsing a quoted scalar",
                        start_mark,
                        "did not find expected hexdecimal number",
                    ))
                }
            }
        }
        self.reader.forward(length);
        Ok(code)
    }

    /// Returns the scalar and whether it ended on a later line than it
    /// started, having consumed the line break.
    fn scan_plain_scalar(&mut self) -> Result<(Token, bool), ScannerError> {
        let indent = self.indent + 1;
        let start_mark = self.reader.mark();
        let mut end_mark = start_mark;
        let mut value = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;

        loop {
            self.reader.cache(4)?;
            if self.reader.mark().column == 0
                && (self.at_document_indicator('-') || self.at_document_indicator('.'))
            {
                break;
            }
            if self.reader.check('#') {
                break;
            }

            while !is_blankz(self.reader.peek(0)) {
                if self.reader.check(':')
                    && (is_blankz(self.reader.peek(1))
                        || (self.flow_level > 0 && is_flow_indicator(self.reader.peek(1))))
                {
                    break;
                }
                if self.flow_level > 0 && is_flow_indicator(self.reader.peek(0)) {
                    break;
                }

                if leading_blanks {
                    if leading_break.starts_with('\n') {
                        if trailing_breaks.is_empty() {
                            value.push(' ');
                        } else {
                            value.push_str(&trailing_breaks);
                        }
                    } else {
                        value.push_str(&leading_break);
                        value.push_str(&trailing_breaks);
                    }
                    leading_break.clear();
                    trailing_breaks.clear();
                    leading_blanks = false;
                } else if !whitespaces.is_empty() {
                    value.push_str(&whitespaces);
                    whitespaces.clear();
                }

                self.reader.read_char(&mut value);
                end_mark = self.reader.mark();
                self.reader.cache(2)?;
            }

            if !(is_blank(self.reader.peek(0)) || is_break(self.reader.peek(0))) {
                break;
            }

            self.reader.cache(1)?;
            while is_blank(self.reader.peek(0)) || is_break(self.reader.peek(0)) {
                if is_blank(self.reader.peek(0)) {
                    if leading_blanks
                        && (self.reader.mark().column as isize) < indent
                        && is_tab(self.reader.peek(0))
                    {
                        return Err(self.error(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                        ));
                    }
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read_char(&mut whitespaces);
                    }
                } else {
                    self.reader.cache(2)?;
                    if leading_blanks {
                        self.reader.read_line(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_line(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.cache(1)?;
            }

            if self.flow_level == 0 && (self.reader.mark().column as isize) < indent {
                break;
            }
        }

        let token = Token {
            data: TokenData::Scalar {
                value,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        };
        Ok((token, leading_blanks))
    }
}

fn tag_context(directive: bool) -> &'static str {
    if directive {
        "while parsing a %TAG directive"
    } else {
        "while parsing a tag"
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stream_end_produced {
            return None;
        }
        let token = self.next_token();
        if token.is_err() {
            self.stream_end_produced = true;
        }
        Some(token)
    }
}

impl core::iter::FusedIterator for Scanner<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(input: &str) -> Result<Vec<TokenData>, ScannerError> {
        let mut scanner = Scanner::new();
        scanner.set_input_string(input);
        scanner.map(|token| token.map(|token| token.data)).collect()
    }

    fn scalars(input: &str) -> Vec<String> {
        scan(input)
            .unwrap()
            .into_iter()
            .filter_map(|data| match data {
                TokenData::Scalar { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        scan(input)
            .unwrap()
            .iter()
            .map(TokenData::kind)
            .collect()
    }

    #[test]
    fn flow_mapping_with_space_after_colon() {
        use TokenKind::*;
        assert_eq!(
            kinds("{a: 1}"),
            [StreamStart, FlowMappingStart, Key, Scalar, Value, Scalar, FlowMappingEnd, StreamEnd]
        );
    }

    #[test]
    fn colon_inside_flow_plain_scalar() {
        use TokenKind::*;
        assert_eq!(
            kinds("{a:1}"),
            [StreamStart, FlowMappingStart, Scalar, FlowMappingEnd, StreamEnd]
        );
        assert_eq!(scalars("{a:1}"), ["a:1"]);
        assert_eq!(scalars("[http://x, y:]"), ["http://x", "y"]);
    }

    #[test]
    fn tab_at_line_start_cannot_start_a_token() {
        let error = scan("{\n\t\"x\": \"y\"\n}").unwrap_err();
        let message = error.to_string();
        assert!(
            message.contains("found character '\t(TAB)' that cannot start any token"),
            "{message}"
        );
        assert!(message.contains("line 2, column 1"), "{message}");

        assert!(scan("a:\n\tb: 1").is_err());
    }

    #[test]
    fn tabs_as_separation() {
        assert_eq!(scalars("a:\tb"), ["a", "b"]);
        assert_eq!(scalars("- x\t# note\n\t\n- y"), ["x", "y"]);
        assert_eq!(scalars("[1,\t2]"), ["1", "2"]);
    }

    #[test]
    fn double_quoted_escapes() {
        assert_eq!(
            scalars(r#""\x41\u263A\U0001F600\uD83D\uDE00\N\_\t|""#),
            ["A\u{263A}\u{1F600}\u{1F600}\u{85}\u{A0}\t|"]
        );
        let error = scan(r#""\q""#).unwrap_err();
        assert!(error.to_string().contains("found unknown escape character"));
    }

    #[test]
    fn quoted_folding() {
        assert_eq!(scalars("'a\n  b\n\n  c'"), ["a b\nc"]);
        assert_eq!(scalars("\"a\\\n  b\""), ["ab"]);
        assert_eq!(scalars("'it''s'"), ["it's"]);
    }

    #[test]
    fn unterminated_quote() {
        let error = scan("'abc").unwrap_err();
        assert!(error.to_string().contains("found unexpected end of stream"));
    }

    #[test]
    fn block_scalars() {
        assert_eq!(
            scalars("a: |\n  x\n  y\n\nb: >-\n  p\n  q\n\nc: |+\n  keep\n\n"),
            ["a", "x\ny\n", "b", "p q", "c", "keep\n\n"]
        );
        assert_eq!(scalars("- |2\n   indented\n"), [" indented\n"]);
    }

    #[test]
    fn block_scalar_tab_indentation() {
        let error = scan("a: |\n\tx\n").unwrap_err();
        assert!(error
            .to_string()
            .contains("found a tab character where an indentation space is expected"));
    }

    #[test]
    fn anchors_and_tags() {
        let tokens = scan("- &a:b !!str x\n- *a:b\n- !<tag:x> y\n- !local z").unwrap();
        let anchor = Anchor::new("a:b").unwrap();
        assert!(tokens.contains(&TokenData::Anchor {
            value: anchor.clone()
        }));
        assert!(tokens.contains(&TokenData::Alias { value: anchor }));
        assert!(tokens.contains(&TokenData::Tag {
            handle: String::from("!!"),
            suffix: String::from("str"),
        }));
        assert!(tokens.contains(&TokenData::Tag {
            handle: String::new(),
            suffix: String::from("tag:x"),
        }));
        assert!(tokens.contains(&TokenData::Tag {
            handle: String::from("!"),
            suffix: String::from("local"),
        }));
    }

    #[test]
    fn directives() {
        let tokens = scan("%YAML 1.2\n%TAG !e! tag:example.com,2000:\n%FOO bar\n--- x").unwrap();
        assert_eq!(tokens[1], TokenData::VersionDirective { major: 1, minor: 2 });
        assert_eq!(
            tokens[2],
            TokenData::TagDirective {
                handle: String::from("!e!"),
                prefix: String::from("tag:example.com,2000:"),
            }
        );
        assert_eq!(tokens[3], TokenData::DocumentStart);
    }

    #[test]
    fn comments_are_interleaved() {
        let settings = LoadSettings::default().with_parse_comments(true);
        let mut scanner = Scanner::with_settings(&settings);
        scanner.set_input_string("# head\na: 1 # tail\n");
        let tokens = scanner.collect::<Result<Vec<_>, _>>().unwrap();
        let kinds = tokens.iter().map(|t| t.data.kind()).collect::<Vec<_>>();
        use TokenKind::*;
        assert_eq!(
            kinds,
            [
                StreamStart,
                Comment,
                BlockMappingStart,
                Key,
                Scalar,
                Value,
                Scalar,
                Comment,
                BlockEnd,
                StreamEnd
            ]
        );
        assert_eq!(
            tokens[1].data,
            TokenData::Comment {
                value: String::from(" head"),
                comment_type: CommentType::Block,
            }
        );
        assert_eq!(
            tokens[7].data,
            TokenData::Comment {
                value: String::from(" tail"),
                comment_type: CommentType::InLine,
            }
        );
    }

    #[test]
    fn comments_skipped_by_default() {
        assert!(!kinds("# a\nx # b\n").contains(&TokenKind::Comment));
    }

    #[test]
    fn simple_key_must_fit_on_one_line() {
        let error = scan("a\n: b").unwrap_err();
        assert!(error.to_string().contains("could not find expected ':'"));
    }

    #[test]
    fn peek_and_check() {
        let mut scanner = Scanner::new();
        scanner.set_input_string("[x]");
        assert!(scanner.check_token(&[TokenKind::StreamStart]).unwrap());
        scanner.next_token().unwrap();
        assert!(scanner
            .check_token(&[TokenKind::FlowSequenceStart, TokenKind::FlowMappingStart])
            .unwrap());
        assert_eq!(
            scanner.peek_token().unwrap().map(|t| t.data.kind()),
            Some(TokenKind::FlowSequenceStart)
        );
        while scanner.has_next() {
            scanner.next_token().unwrap();
        }
        assert!(!scanner.check_token(&[]).unwrap());
        assert_eq!(scanner.next_token().unwrap().data, TokenData::StreamEnd);
    }
}
