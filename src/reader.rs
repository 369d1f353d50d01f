use std::io::{BufRead, BufReader, Read};

use alloc::collections::VecDeque;
use alloc::string::String;

use crate::chars::{is_allowed_input, is_blankz, is_break};
use crate::mark::Snippet;
use crate::{Encoding, LoadSettings, Mark, MarkedError, ReaderError};

const BOM_UTF8: [u8; 3] = [0xef, 0xbb, 0xbf];
const BOM_UTF16LE: [u8; 2] = [0xff, 0xfe];
const BOM_UTF16BE: [u8; 2] = [0xfe, 0xff];

/// Consumed code points kept around for error snippets.
const HISTORY_LIMIT: usize = 256;
/// How far a snippet looks in either direction for the ends of its line.
const SNIPPET_SCAN: usize = 80;

/// Decodes an input stream into code points and tracks the current position.
///
/// Lookahead is pulled from the underlying source on demand with
/// [`StreamReader::cache`]; everything else works on the decoded buffer.
pub struct StreamReader<'r> {
    input: Option<Box<dyn BufRead + 'r>>,
    encoding: Encoding,
    buffer: VecDeque<char>,
    /// Leading code points of `buffer` already checked against the allowed
    /// input set.
    checked: usize,
    history: VecDeque<char>,
    mark: Mark,
    offset: usize,
    eof: bool,
    document_index: usize,
    code_point_limit: usize,
    buffer_size: usize,
    label: String,
}

impl<'r> StreamReader<'r> {
    pub fn new(settings: &LoadSettings) -> Self {
        Self {
            input: None,
            encoding: Encoding::Any,
            buffer: VecDeque::with_capacity(crate::INPUT_BUFFER_SIZE),
            checked: 0,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            mark: Mark::default(),
            offset: 0,
            eof: false,
            document_index: 0,
            code_point_limit: settings.code_point_limit,
            buffer_size: settings.buffer_size,
            label: settings.label.clone(),
        }
    }

    /// Set a string input.
    pub fn set_input_string(&mut self, input: &'r str) {
        assert!(self.input.is_none());
        self.input = Some(Box::new(input.as_bytes()));
    }

    /// Set a byte slice input; the encoding is detected from its BOM.
    pub fn set_input_bytes(&mut self, input: &'r [u8]) {
        assert!(self.input.is_none());
        self.input = Some(Box::new(input));
    }

    /// Set a buffered input.
    pub fn set_input(&mut self, input: &'r mut dyn BufRead) {
        assert!(self.input.is_none());
        self.input = Some(Box::new(input));
    }

    /// Set an unbuffered input; it is wrapped in a buffer of the configured
    /// size.
    pub fn set_input_reader<R: Read + 'r>(&mut self, input: R) {
        assert!(self.input.is_none());
        self.input = Some(Box::new(BufReader::with_capacity(self.buffer_size, input)));
    }

    /// Set the source encoding instead of detecting it.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        assert!(self.encoding == Encoding::Any);
        self.encoding = encoding;
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// The position of the next unread code point.
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Name of the input used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start counting towards the code point limit from zero.
    pub fn reset_document_index(&mut self) {
        self.document_index = 0;
    }

    /// Drop input up to the next line that starts with `---` or `...`, or to
    /// the end of the stream, and count the code point limit from there.
    pub(crate) fn skip_to_document_boundary(&mut self) -> Result<(), ReaderError> {
        loop {
            self.decode(4)?;
            match self.peek(0) {
                None => break,
                Some(ch @ ('-' | '.'))
                    if self.mark.column == 0
                        && self.check_at(ch, 1)
                        && self.check_at(ch, 2)
                        && is_blankz(self.peek(3)) =>
                {
                    break
                }
                Some(_) => self.forward(1),
            }
        }
        self.document_index = 0;
        Ok(())
    }

    /// Make at least `length` code points available to [`peek`](Self::peek),
    /// unless the stream ends first.
    ///
    /// Only those `length` code points are checked for characters YAML does
    /// not allow, so a bad character fails the read that reaches it and
    /// nothing before.
    pub fn cache(&mut self, length: usize) -> Result<(), ReaderError> {
        if self.document_index > self.code_point_limit {
            return Err(ReaderError::LimitExceeded {
                limit: self.code_point_limit,
                size: self.document_index,
            });
        }
        self.decode(length)?;
        self.validate(length)
    }

    fn decode(&mut self, length: usize) -> Result<(), ReaderError> {
        if self.buffer.len() >= length || self.eof {
            return Ok(());
        }
        let Some(input) = self.input.as_deref_mut() else {
            self.eof = true;
            return Ok(());
        };

        if self.encoding == Encoding::Any {
            if let Some(encoding) = determine_encoding(input)? {
                tracing::debug!(?encoding, "detected input encoding");
                self.encoding = encoding;
            } else {
                self.eof = true;
                return Ok(());
            }
        }

        while self.buffer.len() < length {
            let more = match self.encoding {
                Encoding::Any | Encoding::Utf8 => {
                    read_utf8_buffered(input, &mut self.buffer, &mut self.offset)?
                }
                Encoding::Utf16Le => {
                    read_utf16_buffered::<false>(input, &mut self.buffer, &mut self.offset)?
                }
                Encoding::Utf16Be => {
                    read_utf16_buffered::<true>(input, &mut self.buffer, &mut self.offset)?
                }
            };
            if !more {
                self.eof = true;
                break;
            }
        }

        if self.offset >= usize::MAX / 2 {
            return Err(ReaderError::Problem {
                problem: "input is too long",
                offset: self.offset,
                value: 0,
            });
        }
        Ok(())
    }

    fn validate(&mut self, length: usize) -> Result<(), ReaderError> {
        let end = length.min(self.buffer.len());
        while self.checked < end {
            let ch = self.buffer[self.checked];
            if !is_allowed_input(ch) && ch != '\u{feff}' {
                return Err(ReaderError::Problem {
                    problem: "control characters are not allowed",
                    offset: self.byte_offset(self.checked),
                    value: ch as u32,
                });
            }
            self.checked += 1;
        }
        Ok(())
    }

    /// Byte offset of the buffered code point at `position`.
    fn byte_offset(&self, position: usize) -> usize {
        let utf16 = matches!(self.encoding, Encoding::Utf16Le | Encoding::Utf16Be);
        let pending: usize = self
            .buffer
            .iter()
            .skip(position)
            .map(|ch| if utf16 { ch.len_utf16() * 2 } else { ch.len_utf8() })
            .sum();
        self.offset - pending
    }

    /// The code point `offset` positions ahead, if it has been cached.
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.buffer.get(offset).copied()
    }

    pub(crate) fn check(&self, ch: char) -> bool {
        self.peek(0) == Some(ch)
    }

    pub(crate) fn check_at(&self, ch: char, offset: usize) -> bool {
        self.peek(offset) == Some(ch)
    }

    pub(crate) fn is_crlf(&self) -> bool {
        self.check('\r') && self.check_at('\n', 1)
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.buffer.is_empty() && self.eof
    }

    /// Consume `count` code points. A CR directly followed by LF ends a single
    /// line.
    pub fn forward(&mut self, count: usize) {
        for _ in 0..count {
            let Some(ch) = self.buffer.pop_front() else {
                return;
            };
            self.checked = self.checked.saturating_sub(1);
            self.mark.index += 1;
            self.document_index += 1;
            if ch == '\n' || (ch == '\r' && !self.check('\n')) {
                self.mark.line += 1;
                self.mark.column = 0;
            } else if ch != '\r' {
                self.mark.column += 1;
            }
            if self.history.len() == HISTORY_LIMIT {
                self.history.pop_front();
            }
            self.history.push_back(ch);
        }
    }

    pub(crate) fn skip(&mut self) {
        self.forward(1);
    }

    pub(crate) fn skip_line(&mut self) {
        if self.is_crlf() {
            self.forward(2);
        } else if is_break(self.peek(0)) {
            self.forward(1);
        }
    }

    pub(crate) fn read_char(&mut self, string: &mut String) {
        if let Some(ch) = self.peek(0) {
            string.push(ch);
            self.forward(1);
        }
    }

    /// Consume one line break, appending it to `string` as `\n`.
    pub(crate) fn read_line(&mut self, string: &mut String) {
        if self.is_crlf() {
            string.push('\n');
            self.forward(2);
        } else if is_break(self.peek(0)) {
            string.push('\n');
            self.forward(1);
        }
    }

    fn char_at(&self, index: usize) -> Option<char> {
        let history_start = self.mark.index - self.history.len();
        if index < history_start {
            None
        } else if index < self.mark.index {
            self.history.get(index - history_start).copied()
        } else {
            self.buffer.get(index - self.mark.index).copied()
        }
    }

    /// The source line around `mark`, if the reader still holds it.
    pub(crate) fn snippet(&self, mark: Mark) -> Option<Snippet> {
        let history_start = self.mark.index - self.history.len();
        if mark.index < history_start || mark.index > self.mark.index + self.buffer.len() {
            return None;
        }
        let mut before = VecDeque::new();
        let mut index = mark.index;
        while index > 0 && before.len() < SNIPPET_SCAN {
            match self.char_at(index - 1) {
                Some(ch) if !is_break(ch) => before.push_front(ch),
                _ => break,
            }
            index -= 1;
        }
        let mut after = alloc::vec::Vec::new();
        let mut index = mark.index;
        while after.len() < SNIPPET_SCAN {
            match self.char_at(index) {
                Some(ch) if !is_break(ch) => after.push(ch),
                _ => break,
            }
            index += 1;
        }
        Some(Snippet::from_parts(before.make_contiguous(), &after))
    }

    /// Build a located problem, with snippets for the marks still in reach.
    pub(crate) fn marked_error(
        &self,
        context: Option<(&str, Mark)>,
        problem: impl Into<String>,
        problem_mark: Mark,
    ) -> MarkedError {
        MarkedError::new(
            &self.label,
            context.map(|(text, mark)| (String::from(text), mark, self.snippet(mark))),
            problem.into(),
            Some((problem_mark, self.snippet(problem_mark))),
        )
    }
}

fn determine_encoding(reader: &mut dyn BufRead) -> Result<Option<Encoding>, ReaderError> {
    let initial_bytes = reader.fill_buf()?;
    if initial_bytes.is_empty() {
        return Ok(None);
    }

    if initial_bytes.starts_with(&BOM_UTF8) {
        reader.consume(BOM_UTF8.len());
        Ok(Some(Encoding::Utf8))
    } else if initial_bytes.starts_with(&BOM_UTF16LE) {
        reader.consume(BOM_UTF16LE.len());
        Ok(Some(Encoding::Utf16Le))
    } else if initial_bytes.starts_with(&BOM_UTF16BE) {
        reader.consume(BOM_UTF16BE.len());
        Ok(Some(Encoding::Utf16Be))
    } else {
        Ok(Some(Encoding::Utf8))
    }
}

fn fill(reader: &mut dyn BufRead) -> Result<&[u8], ReaderError> {
    loop {
        match reader.fill_buf() {
            Ok(_) => break,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(reader.fill_buf()?)
}

fn read_utf8_buffered(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    offset: &mut usize,
) -> Result<bool, ReaderError> {
    let available = fill(reader)?;
    if available.is_empty() {
        return Ok(false);
    }

    let (valid_bytes, invalid) = match core::str::from_utf8(available) {
        Ok(valid) => (valid.len(), None),
        Err(err) => (err.valid_up_to(), Some(err)),
    };
    let valid = core::str::from_utf8(&available[..valid_bytes]).map_err(|_| {
        ReaderError::Problem {
            problem: "invalid UTF-8 sequence",
            offset: *offset,
            value: 0,
        }
    })?;
    for ch in valid.chars() {
        out.push_back(ch);
        *offset += ch.len_utf8();
    }

    match invalid {
        None => {
            reader.consume(valid_bytes);
            Ok(true)
        }
        Some(err) if err.error_len().is_some() => Err(ReaderError::Problem {
            problem: "invalid UTF-8 sequence",
            offset: *offset,
            value: u32::from(available[valid_bytes]),
        }),
        Some(_) if valid_bytes != 0 => {
            // The tail is an incomplete sequence; it stays in the buffer for
            // the next call.
            reader.consume(valid_bytes);
            Ok(true)
        }
        Some(_) => {
            let initial = available[0];
            read_utf8_char_unbuffered(reader, out, initial, offset)?;
            Ok(true)
        }
    }
}

fn read_utf8_char_unbuffered(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    initial: u8,
    offset: &mut usize,
) -> Result<(), ReaderError> {
    let width = utf8_char_width(initial);
    let invalid = ReaderError::Problem {
        problem: "invalid UTF-8 sequence",
        offset: *offset,
        value: u32::from(initial),
    };
    if width == 0 {
        return Err(invalid);
    }
    let mut buffer = [0; 4];
    reader.read_exact(&mut buffer[..width]).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ReaderError::Problem {
                problem: "incomplete UTF-8 sequence at end of stream",
                offset: *offset,
                value: u32::from(initial),
            }
        } else {
            err.into()
        }
    })?;
    let ch = core::str::from_utf8(&buffer[..width])
        .ok()
        .and_then(|valid| valid.chars().next())
        .ok_or(invalid)?;
    out.push_back(ch);
    *offset += width;
    Ok(())
}

fn read_utf16_buffered<const BIG_ENDIAN: bool>(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    offset: &mut usize,
) -> Result<bool, ReaderError> {
    let available = fill(reader)?;
    if available.is_empty() {
        return Ok(false);
    }

    let units = available
        .chunks_exact(2)
        .map(|chunk| decode_unit::<BIG_ENDIAN>([chunk[0], chunk[1]]));

    let mut used = 0;
    for ch in core::char::decode_utf16(units) {
        match ch {
            Ok(ch) => {
                out.push_back(ch);
                used += ch.len_utf16() * 2;
            }
            // Either corrupt input or half of a pair split by the buffer
            // boundary; the unbuffered path below tells them apart.
            Err(_) => break,
        }
    }

    if used != 0 {
        reader.consume(used);
        *offset += used;
    } else {
        read_utf16_char_unbuffered::<BIG_ENDIAN>(reader, out, offset)?;
    }
    Ok(true)
}

fn decode_unit<const BIG_ENDIAN: bool>(bytes: [u8; 2]) -> u16 {
    if BIG_ENDIAN {
        u16::from_be_bytes(bytes)
    } else {
        u16::from_le_bytes(bytes)
    }
}

fn read_utf16_char_unbuffered<const BIG_ENDIAN: bool>(
    reader: &mut dyn BufRead,
    out: &mut VecDeque<char>,
    offset: &mut usize,
) -> Result<(), ReaderError> {
    let truncated = |offset: usize| ReaderError::Problem {
        problem: "incomplete UTF-16 character at end of stream",
        offset,
        value: 0,
    };
    let mut buffer = [0; 2];
    reader
        .read_exact(&mut buffer)
        .map_err(|_| truncated(*offset))?;
    let first = decode_unit::<BIG_ENDIAN>(buffer);

    let mut units = alloc::vec![first];
    if matches!(first, 0xD800..=0xDFFF) {
        reader
            .read_exact(&mut buffer)
            .map_err(|_| truncated(*offset))?;
        units.push(decode_unit::<BIG_ENDIAN>(buffer));
    }

    match core::char::decode_utf16(units.iter().copied()).next() {
        Some(Ok(ch)) => {
            out.push_back(ch);
            *offset += units.len() * 2;
            Ok(())
        }
        Some(Err(err)) => Err(ReaderError::Problem {
            problem: "invalid UTF-16 unpaired surrogate",
            offset: *offset,
            value: u32::from(err.unpaired_surrogate()),
        }),
        None => Err(truncated(*offset)),
    }
}

fn utf8_char_width(initial: u8) -> usize {
    if initial & 0x80 == 0 {
        1
    } else if initial & 0xE0 == 0xC0 {
        2
    } else if initial & 0xF0 == 0xE0 {
        3
    } else if initial & 0xF8 == 0xF0 {
        4
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read_all(reader: &mut StreamReader) -> String {
        let mut out = String::new();
        loop {
            reader.cache(1).unwrap();
            if reader.is_eof() {
                return out;
            }
            reader.read_char(&mut out);
        }
    }

    fn read_line_text(reader: &mut StreamReader, count: usize) -> String {
        let mut out = String::new();
        for _ in 0..count {
            reader.read_char(&mut out);
        }
        out
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = alloc::vec![0xff, 0xfe];
        for unit in "a: ☺\u{1F600}".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let settings = LoadSettings::default();
        let mut reader = StreamReader::new(&settings);
        reader.set_input_bytes(&bytes);
        assert_eq!(read_all(&mut reader), "a: ☺\u{1F600}");
        assert_eq!(reader.encoding(), Encoding::Utf16Le);
        assert_eq!(reader.mark().index, 5);
    }

    #[test]
    fn utf8_split_across_buffer_boundary() {
        let text = "ééééééé☺☺☺";
        let settings = LoadSettings::default().with_buffer_size(16);
        let mut reader = StreamReader::new(&settings);
        reader.set_input_reader(std::io::Cursor::new(text.as_bytes().to_vec()));
        assert_eq!(read_all(&mut reader), text);
    }

    #[test]
    fn rejects_control_characters() {
        let settings = LoadSettings::default();
        let mut reader = StreamReader::new(&settings);
        reader.set_input_string("ab\x07");
        let err = reader.cache(3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "control characters are not allowed (byte offset 2, value 0x7)"
        );
    }

    #[test]
    fn control_character_fails_only_when_reached() {
        let settings = LoadSettings::default();
        let mut reader = StreamReader::new(&settings);
        reader.set_input_string("é\nb\x07c");
        reader.cache(3).unwrap();
        assert_eq!(read_line_text(&mut reader, 3), "é\nb");
        let err = reader.cache(1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "control characters are not allowed (byte offset 4, value 0x7)"
        );
    }

    #[test]
    fn control_character_offset_in_utf16() {
        let mut bytes = alloc::vec![0xfe, 0xff];
        for unit in "a☺\x01".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let settings = LoadSettings::default();
        let mut reader = StreamReader::new(&settings);
        reader.set_input_bytes(&bytes);
        reader.cache(2).unwrap();
        let err = reader.cache(3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "control characters are not allowed (byte offset 4, value 0x1)"
        );
    }

    #[test]
    fn line_breaks() {
        let settings = LoadSettings::default();
        let mut reader = StreamReader::new(&settings);
        reader.set_input_string("a\r\nb\rc\nd\u{2028}e");
        read_all(&mut reader);
        assert_eq!(reader.mark(), Mark::new(10, 3, 3));
    }

    #[test]
    fn limit_is_per_document() {
        let settings = LoadSettings::default().with_code_point_limit(4);
        let mut reader = StreamReader::new(&settings);
        reader.set_input_string("abcdefgh");
        reader.cache(1).unwrap();
        reader.forward(4);
        reader.reset_document_index();
        reader.cache(1).unwrap();
        reader.forward(4);
        reader.cache(1).unwrap();
        let mut reader = StreamReader::new(&settings);
        reader.set_input_string("abcdefgh");
        reader.cache(1).unwrap();
        reader.forward(5);
        let err = reader.cache(1).unwrap_err();
        assert!(matches!(err, ReaderError::LimitExceeded { limit: 4, size: 5 }));
    }

    #[test]
    fn skips_to_next_document_marker() {
        let settings = LoadSettings::default().with_code_point_limit(4);
        let mut reader = StreamReader::new(&settings);
        reader.set_input_string("abcdef - --- x\n---x\n...\n--- y");
        reader.cache(1).unwrap();
        reader.forward(5);
        assert!(reader.cache(1).is_err());
        reader.skip_to_document_boundary().unwrap();
        assert_eq!(reader.mark(), Mark::new(20, 2, 0));
        reader.cache(4).unwrap();
        assert_eq!(reader.peek(0), Some('.'));

        reader.forward(4);
        reader.skip_to_document_boundary().unwrap();
        assert_eq!(reader.mark(), Mark::new(24, 3, 0));
        reader.forward(5);
        reader.skip_to_document_boundary().unwrap();
        assert!(reader.is_eof());
    }

    #[test]
    fn snippet_of_current_line() {
        let settings = LoadSettings::default();
        let mut reader = StreamReader::new(&settings);
        reader.set_input_string("first\nkey: @value\nlast");
        reader.cache(64).unwrap();
        reader.forward(11);
        let snippet = reader.snippet(reader.mark()).unwrap();
        assert_eq!(snippet.render(), "    key: @value\n         ^");
    }
}
