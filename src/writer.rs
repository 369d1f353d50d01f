use alloc::string::String;
use alloc::vec::Vec;

use crate::{Break, Encoding, WriterError, OUTPUT_BUFFER_SIZE};

/// The output side of the emitter: a character buffer, the position of the
/// next character and the sink the buffer drains into.
pub(crate) struct Writer<'w> {
    output: Option<&'w mut dyn std::io::Write>,
    /// Pending output, always valid UTF-8.
    buffer: String,
    /// The buffer re-encoded, for UTF-16 output.
    raw_buffer: Vec<u8>,
    pub(crate) encoding: Encoding,
    pub(crate) line_break: Break,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

impl<'w> Writer<'w> {
    pub(crate) fn new(line_break: Break) -> Self {
        Writer {
            output: None,
            buffer: String::with_capacity(OUTPUT_BUFFER_SIZE),
            raw_buffer: Vec::new(),
            encoding: Encoding::Any,
            line_break,
            line: 0,
            column: 0,
        }
    }

    pub(crate) fn set_output(&mut self, output: &'w mut dyn std::io::Write) {
        assert!(self.output.is_none(), "output is already set");
        self.output = Some(output);
    }

    fn reserve(&mut self) -> Result<(), WriterError> {
        if self.buffer.len() < OUTPUT_BUFFER_SIZE - 5 {
            Ok(())
        } else {
            self.flush()
        }
    }

    pub(crate) fn put(&mut self, ch: char) -> Result<(), WriterError> {
        self.reserve()?;
        self.buffer.push(ch);
        self.column += 1;
        Ok(())
    }

    pub(crate) fn put_break(&mut self) -> Result<(), WriterError> {
        self.reserve()?;
        match self.line_break {
            Break::Cr => self.buffer.push('\r'),
            Break::CrLn => self.buffer.push_str("\r\n"),
            Break::Ln | Break::Any => self.buffer.push('\n'),
        }
        self.column = 0;
        self.line += 1;
        Ok(())
    }

    pub(crate) fn write_str(&mut self, string: &str) -> Result<(), WriterError> {
        for ch in string.chars() {
            self.put(ch)?;
        }
        Ok(())
    }

    /// Write a line break that is part of a scalar value.
    pub(crate) fn write_break(&mut self, ch: char) -> Result<(), WriterError> {
        if ch == '\n' {
            self.put_break()
        } else {
            self.put(ch)?;
            self.column = 0;
            self.line += 1;
            Ok(())
        }
    }

    pub(crate) fn write_bom(&mut self) -> Result<(), WriterError> {
        self.reserve()?;
        self.buffer.push('\u{feff}');
        Ok(())
    }

    /// Drain the buffer into the output in the stream encoding.
    pub(crate) fn flush(&mut self) -> Result<(), WriterError> {
        let Some(output) = self.output.as_mut() else {
            return Err(WriterError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no output is set",
            )));
        };
        if self.buffer.is_empty() {
            return Ok(());
        }

        let bytes = match self.encoding {
            Encoding::Any | Encoding::Utf8 => self.buffer.as_bytes(),
            Encoding::Utf16Le | Encoding::Utf16Be => {
                let big_endian = self.encoding == Encoding::Utf16Be;
                self.raw_buffer.clear();
                for unit in self.buffer.encode_utf16() {
                    let bytes = if big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };
                    self.raw_buffer.extend(bytes);
                }
                self.raw_buffer.as_slice()
            }
        };
        if output.write(bytes)? != bytes.len() {
            return Err(WriterError::Incomplete);
        }
        self.buffer.clear();
        self.raw_buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn utf16_output() {
        let mut output = Vec::new();
        let mut writer = Writer::new(Break::CrLn);
        writer.set_output(&mut output);
        writer.encoding = Encoding::Utf16Be;
        writer.write_bom().unwrap();
        writer.write_str("a").unwrap();
        writer.put_break().unwrap();
        writer.flush().unwrap();
        drop(writer);
        assert_eq!(output, [0xfe, 0xff, 0, b'a', 0, b'\r', 0, b'\n']);
    }

    #[test]
    fn positions() {
        let mut output = Vec::new();
        let mut writer = Writer::new(Break::Ln);
        writer.set_output(&mut output);
        writer.write_str("ab").unwrap();
        assert_eq!((writer.line, writer.column), (0, 2));
        writer.write_break('\u{2028}').unwrap();
        assert_eq!((writer.line, writer.column), (1, 0));
        writer.flush().unwrap();
        drop(writer);
        assert_eq!(String::from_utf8(output).unwrap(), "ab\u{2028}");
    }

    #[test]
    fn flush_without_output() {
        let mut writer = Writer::new(Break::Ln);
        writer.put('x').unwrap();
        assert!(matches!(writer.flush(), Err(WriterError::Io(_))));
    }
}
