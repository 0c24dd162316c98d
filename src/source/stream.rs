//! Incremental parsing of JSON sample streams
//!
//! A sample document is either a single JSON object or a JSON array of
//! objects. Arrays are consumed one element at a time: the scanner
//! slices each complete top-level value out of its buffer, hands it to
//! `serde_json`, and drops the consumed bytes, so the whole array never
//! sits in memory. Every step reports a tagged [`ScanEvent`] instead of
//! driving control flow through parse failures.

use std::io::Read;

use serde_json::Value;

use crate::sample::Sample;
use crate::{GraphFeedError, Result};

const CHUNK_SIZE: usize = 8192;

/// Outcome of one scanner step
#[derive(Clone, Debug, PartialEq)]
pub enum ScanEvent {
    /// One array element was parsed
    Parsed(Value),
    /// The buffer ends mid-value; feed more bytes
    NeedMoreInput,
    /// The closing `]` was reached
    EndOfArray,
    /// The stream is not a well-formed JSON array
    Malformed(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ScanState {
    /// Before the opening `[`
    Start,
    /// After `[`; a value or an immediate `]` may follow
    FirstValue,
    /// After `,`; a value must follow
    NextValue,
    /// After a value; `,` or `]` must follow
    Separator,
    /// After the closing `]`
    Done,
}

enum ValueScan {
    Complete(usize),
    Incomplete,
    Invalid(String),
}

/// Pull-free incremental scanner over the bytes of one JSON array
///
/// Feed bytes with [`push`](ArrayScanner::push), mark exhaustion with
/// [`finish`](ArrayScanner::finish), and drain events with
/// [`next_event`](ArrayScanner::next_event). Consumed bytes are dropped
/// eagerly; the buffer never holds more than one element plus one read
/// chunk.
pub struct ArrayScanner {
    buffer: Vec<u8>,
    pos: usize,
    state: ScanState,
    input_complete: bool,
}

impl ArrayScanner {
    /// An empty scanner awaiting the opening bracket
    pub fn new() -> Self {
        ArrayScanner {
            buffer: Vec::new(),
            pos: 0,
            state: ScanState::Start,
            input_complete: false,
        }
    }

    /// Append raw bytes from the underlying stream
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Declare that no further bytes will arrive
    pub fn finish(&mut self) {
        self.input_complete = true;
    }

    /// Advance the scan as far as the buffered bytes allow
    pub fn next_event(&mut self) -> ScanEvent {
        loop {
            match self.state {
                ScanState::Done => return ScanEvent::EndOfArray,
                ScanState::Start => {
                    match self.peek_after_whitespace() {
                        Some(b'[') => {
                            self.pos += 1;
                            self.state = ScanState::FirstValue;
                        }
                        Some(byte) => {
                            return ScanEvent::Malformed(format!(
                                "expected '[' to open the sample array, got '{}'",
                                byte as char
                            ));
                        }
                        None => return self.starve("the opening '['"),
                    }
                }
                ScanState::FirstValue => match self.peek_after_whitespace() {
                    Some(b']') => {
                        self.pos += 1;
                        self.state = ScanState::Done;
                        return ScanEvent::EndOfArray;
                    }
                    Some(_) => match self.take_value() {
                        Ok(Some(event)) => return event,
                        Ok(None) => return ScanEvent::NeedMoreInput,
                        Err(msg) => return ScanEvent::Malformed(msg),
                    },
                    None => return self.starve("a value or ']'"),
                },
                ScanState::NextValue => match self.peek_after_whitespace() {
                    Some(b']') => {
                        return ScanEvent::Malformed(
                            "trailing comma before ']'".to_string(),
                        );
                    }
                    Some(_) => match self.take_value() {
                        Ok(Some(event)) => return event,
                        Ok(None) => return ScanEvent::NeedMoreInput,
                        Err(msg) => return ScanEvent::Malformed(msg),
                    },
                    None => return self.starve("a value after ','"),
                },
                ScanState::Separator => match self.peek_after_whitespace() {
                    Some(b',') => {
                        self.pos += 1;
                        self.state = ScanState::NextValue;
                    }
                    Some(b']') => {
                        self.pos += 1;
                        self.state = ScanState::Done;
                        return ScanEvent::EndOfArray;
                    }
                    Some(byte) => {
                        return ScanEvent::Malformed(format!(
                            "expected ',' or ']' between samples, got '{}'",
                            byte as char
                        ));
                    }
                    None => return self.starve("',' or ']'"),
                },
            }
        }
    }

    /// Skip whitespace, then peek the next byte without consuming it
    fn peek_after_whitespace(&mut self) -> Option<u8> {
        while self.pos < self.buffer.len() {
            let byte = self.buffer[self.pos];
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                return Some(byte);
            }
        }
        None
    }

    fn starve(&self, expectation: &str) -> ScanEvent {
        if self.input_complete {
            ScanEvent::Malformed(format!(
                "stream ended while expecting {}",
                expectation
            ))
        } else {
            ScanEvent::NeedMoreInput
        }
    }

    /// Slice the next complete value out of the buffer and parse it
    fn take_value(&mut self) -> std::result::Result<Option<ScanEvent>, String> {
        match self.scan_value_end() {
            ValueScan::Incomplete => {
                if self.input_complete {
                    Err("stream ended inside a value".to_string())
                } else {
                    Ok(None)
                }
            }
            ValueScan::Invalid(msg) => Err(msg),
            ValueScan::Complete(end) => {
                let parsed = serde_json::from_slice(&self.buffer[self.pos..end])
                    .map_err(|err| format!("invalid JSON value: {}", err))?;
                self.pos = end;
                self.state = ScanState::Separator;
                // Drop everything already consumed
                self.buffer.drain(..self.pos);
                self.pos = 0;
                Ok(Some(ScanEvent::Parsed(parsed)))
            }
        }
    }

    /// Find the exclusive end offset of the value starting at `pos`
    fn scan_value_end(&self) -> ValueScan {
        let bytes = &self.buffer[self.pos..];
        let first = match bytes.first() {
            Some(&b) => b,
            None => return ValueScan::Incomplete,
        };

        match first {
            b'{' | b'[' => self.scan_container_end(bytes),
            b'"' => match string_end(bytes, 0) {
                Some(end) => ValueScan::Complete(self.pos + end),
                None => ValueScan::Incomplete,
            },
            _ => {
                // Number, boolean or null: runs until a delimiter
                for (offset, &byte) in bytes.iter().enumerate() {
                    if matches!(byte, b',' | b']' | b'}') || byte.is_ascii_whitespace() {
                        return ValueScan::Complete(self.pos + offset);
                    }
                }
                if self.input_complete {
                    ValueScan::Complete(self.buffer.len())
                } else {
                    ValueScan::Incomplete
                }
            }
        }
    }

    fn scan_container_end(&self, bytes: &[u8]) -> ValueScan {
        let mut depth = 0usize;
        let mut offset = 0usize;

        while offset < bytes.len() {
            match bytes[offset] {
                b'"' => match string_end(bytes, offset) {
                    Some(end) => offset = end,
                    None => return ValueScan::Incomplete,
                },
                b'{' | b'[' => {
                    depth += 1;
                    offset += 1;
                }
                b'}' | b']' => {
                    if depth == 0 {
                        return ValueScan::Invalid(
                            "unbalanced closing bracket".to_string(),
                        );
                    }
                    depth -= 1;
                    offset += 1;
                    if depth == 0 {
                        return ValueScan::Complete(self.pos + offset);
                    }
                }
                _ => offset += 1,
            }
        }

        ValueScan::Incomplete
    }
}

impl Default for ArrayScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive end offset of the string literal starting at `start`
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut offset = start + 1;
    while offset < bytes.len() {
        match bytes[offset] {
            b'\\' => offset += 2,
            b'"' => return Some(offset + 1),
            _ => offset += 1,
        }
    }
    None
}

/// Lazily yields the samples of one document stream
///
/// The stream may hold either a single JSON object (one sample) or a
/// JSON array of objects, detected from the first non-whitespace byte.
/// Array elements are emitted in array order without buffering the
/// whole document.
pub struct SampleStream<R: Read> {
    inner: StreamKind<R>,
}

enum StreamKind<R: Read> {
    Array { reader: R, scanner: ArrayScanner, done: bool },
    Single(Option<Result<Sample>>),
}

impl<R: Read> SampleStream<R> {
    /// Sniff the document shape and build the matching stream
    pub fn new(mut reader: R) -> Result<Self> {
        let first = skip_whitespace_byte(&mut reader)?;
        match first {
            Some(b'[') => {
                let mut scanner = ArrayScanner::new();
                scanner.push(b"[");
                Ok(SampleStream {
                    inner: StreamKind::Array {
                        reader,
                        scanner,
                        done: false,
                    },
                })
            }
            Some(byte) => {
                // A single sample object: parse the whole document
                let mut text = vec![byte];
                reader.read_to_end(&mut text)?;
                let sample = serde_json::from_slice(&text)
                    .map_err(GraphFeedError::from)
                    .and_then(Sample::from_value);
                Ok(SampleStream {
                    inner: StreamKind::Single(Some(sample)),
                })
            }
            None => Err(GraphFeedError::MalformedSample(
                "empty sample document".to_string(),
            )),
        }
    }
}

impl<R: Read> Iterator for SampleStream<R> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            StreamKind::Single(slot) => slot.take(),
            StreamKind::Array {
                reader,
                scanner,
                done,
            } => {
                if *done {
                    return None;
                }
                loop {
                    match scanner.next_event() {
                        ScanEvent::Parsed(value) => {
                            return Some(Sample::from_value(value));
                        }
                        ScanEvent::EndOfArray => {
                            *done = true;
                            return None;
                        }
                        ScanEvent::Malformed(msg) => {
                            *done = true;
                            return Some(Err(GraphFeedError::MalformedSample(msg)));
                        }
                        ScanEvent::NeedMoreInput => {
                            let mut chunk = [0u8; CHUNK_SIZE];
                            match reader.read(&mut chunk) {
                                Ok(0) => scanner.finish(),
                                Ok(n) => scanner.push(&chunk[..n]),
                                Err(err) => {
                                    *done = true;
                                    return Some(Err(err.into()));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Read until the first non-whitespace byte, returning it
fn skip_whitespace_byte<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte)? {
            0 => return Ok(None),
            _ if byte[0].is_ascii_whitespace() => continue,
            _ => return Ok(Some(byte[0])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_three_samples_in_order() {
        let stream =
            SampleStream::new(Cursor::new(r#"[{"a":1},{"a":2},{"a":3}]"#)).unwrap();
        let values: Vec<i64> = stream
            .map(|sample| sample.unwrap().get("a").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_single_object_document() {
        let mut stream =
            SampleStream::new(Cursor::new(r#"{"a": 7}"#)).unwrap();
        let sample = stream.next().unwrap().unwrap();
        assert_eq!(sample.get("a"), Some(&json!(7)));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_empty_array() {
        let mut stream = SampleStream::new(Cursor::new("[]")).unwrap();
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_chunked_feeding_reports_need_more_input() {
        let mut scanner = ArrayScanner::new();
        scanner.push(b"[{\"a\":");
        assert_eq!(scanner.next_event(), ScanEvent::NeedMoreInput);

        scanner.push(b"1},{\"a\"");
        let first = scanner.next_event();
        assert_eq!(first, ScanEvent::Parsed(json!({"a": 1})));
        assert_eq!(scanner.next_event(), ScanEvent::NeedMoreInput);

        scanner.push(b":2}]");
        assert_eq!(scanner.next_event(), ScanEvent::Parsed(json!({"a": 2})));
        assert_eq!(scanner.next_event(), ScanEvent::EndOfArray);
        // Terminal state is sticky
        assert_eq!(scanner.next_event(), ScanEvent::EndOfArray);
    }

    #[test]
    fn test_buffer_is_drained_between_samples() {
        let mut scanner = ArrayScanner::new();
        scanner.push(br#"[{"blob": "xxxxxxxxxxxxxxxx"}, {"a": 2}]"#);
        assert!(matches!(scanner.next_event(), ScanEvent::Parsed(_)));
        // The first element's bytes are gone from the buffer
        assert!(scanner.buffer.len() < 16);
    }

    #[test]
    fn test_strings_with_brackets_and_escapes() {
        let mut stream = SampleStream::new(Cursor::new(
            r#"[{"name": "a ] tricky \" [ value"}, {"name": "b"}]"#,
        ))
        .unwrap();
        let first = stream.next().unwrap().unwrap();
        assert_eq!(
            first.get("name").unwrap().as_str().unwrap(),
            "a ] tricky \" [ value"
        );
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_truncated_stream_is_malformed() {
        let mut stream =
            SampleStream::new(Cursor::new(r#"[{"a":1},{"a":"#)).unwrap();
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(
            stream.next(),
            Some(Err(GraphFeedError::MalformedSample(_)))
        ));
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let mut scanner = ArrayScanner::new();
        scanner.push(br#"[{"a":1} {"a":2}]"#);
        scanner.finish();
        assert!(matches!(scanner.next_event(), ScanEvent::Parsed(_)));
        assert!(matches!(scanner.next_event(), ScanEvent::Malformed(_)));
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(SampleStream::new(Cursor::new("   ")).is_err());
    }

    #[test]
    fn test_scalar_elements_parse() {
        let mut scanner = ArrayScanner::new();
        scanner.push(b"[1, 2.5, null]");
        scanner.finish();
        assert_eq!(scanner.next_event(), ScanEvent::Parsed(json!(1)));
        assert_eq!(scanner.next_event(), ScanEvent::Parsed(json!(2.5)));
        assert_eq!(scanner.next_event(), ScanEvent::Parsed(json!(null)));
        assert_eq!(scanner.next_event(), ScanEvent::EndOfArray);
    }
}
